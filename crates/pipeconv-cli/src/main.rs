//! pipeconv CLI
//!
//! Converts exported pipeline documents into JavaScript controllers.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// pipeconv - legacy pipeline to controller transpiler
#[derive(Parser)]
#[command(name = "pipeconv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path (optional, defaults apply when absent)
    #[arg(short, long, global = true, default_value = pipeconv_core::config::CONFIG_FILE)]
    config: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert pipeline documents into controller modules
    Convert {
        /// Documents or directories (defaults to the configured input directory)
        paths: Vec<PathBuf>,

        /// Output directory (defaults to the configured output directory)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Rewrite modules even when their source hash is unchanged
        #[arg(long)]
        force: bool,
    },

    /// Compile pipeline documents without writing anything
    Check {
        /// Documents or directories (defaults to the configured input directory)
        paths: Vec<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the supported pipelets
    Pipelets {
        /// Print the registry as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Convert { paths, out, force } => {
            commands::convert::run(&cli.config, &paths, out.as_deref(), force)?;
        }
        Commands::Check { paths, json } => {
            commands::check::run(&cli.config, &paths, json)?;
        }
        Commands::Pipelets { json } => {
            commands::pipelets::run(json)?;
        }
    }

    Ok(())
}
