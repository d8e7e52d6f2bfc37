//! Compile pipeline documents without writing output

use anyhow::{Context, Result};
use pipeconv_codegen::{Compiler, Parser};
use std::path::PathBuf;

use super::convert::report;
use super::{collect_documents, load_config};

/// Run the check command
pub fn run(config_path: &str, paths: &[PathBuf], json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let documents = collect_documents(&config, paths)?;

    let parser = Parser::new();
    let compiler = Compiler::new(config.project.codegen.clone());
    let mut modules = Vec::with_capacity(documents.len());

    for path in &documents {
        let definition = parser
            .parse_file(path)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        modules.push(compiler.compile(&definition));
    }

    if json {
        let report: Vec<serde_json::Value> = modules
            .iter()
            .map(|m| {
                serde_json::json!({
                    "name": m.name,
                    "hash": m.hash,
                    "diagnostics": m.diagnostics,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for module in &modules {
            report(module);
            let marker = if module.has_errors() { "✗" } else { "✓" };
            println!(
                "{} {} ({} diagnostics)",
                marker,
                module.name,
                module.diagnostics.len()
            );
        }
    }

    let broken = modules.iter().filter(|m| m.has_errors()).count();
    if broken > 0 {
        anyhow::bail!("{} pipeline(s) have import conflicts", broken);
    }

    tracing::info!("Checked {} pipelines", modules.len());
    Ok(())
}
