//! CLI command implementations

pub mod check;
pub mod convert;
pub mod pipelets;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pipeconv_core::{Config, PipelineDocument};
use walkdir::WalkDir;

/// Load the project configuration, falling back to defaults
pub(crate) fn load_config(config_path: &str) -> Result<Config> {
    tracing::debug!("Loading configuration from {}", config_path);
    Config::load_or_default(config_path).context("Failed to load configuration")
}

/// Expand the given paths into document files, sorted within each directory.
///
/// With no paths, the configured input directory is searched.
pub(crate) fn collect_documents(config: &Config, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let roots = if paths.is_empty() {
        vec![config.input_dir()]
    } else {
        paths.to_vec()
    };

    let mut documents = Vec::new();
    for root in &roots {
        if root.is_file() {
            documents.push(root.clone());
            continue;
        }
        if !root.exists() {
            anyhow::bail!("Path not found: {}", root.display());
        }
        documents.extend(walk_documents(root)?);
    }
    Ok(documents)
}

fn walk_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to read {}", dir.display()))?;
        if entry.file_type().is_file() && PipelineDocument::is_document_path(entry.path()) {
            found.push(entry.into_path());
        }
    }
    tracing::debug!("Found {} documents in {}", found.len(), dir.display());
    Ok(found)
}
