//! Convert pipeline documents into controller modules

use anyhow::{Context, Result};
use pipeconv_codegen::compiler::header_hash;
use pipeconv_codegen::{CompiledModule, Compiler, Parser};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use super::{collect_documents, load_config};

/// Run the convert command
pub fn run(config_path: &str, paths: &[PathBuf], out: Option<&Path>, force: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let output_dir = out.map(Path::to_path_buf).unwrap_or_else(|| config.output_dir());
    let documents = collect_documents(&config, paths)?;

    if documents.is_empty() {
        tracing::warn!("No pipeline documents found");
        return Ok(());
    }

    let parser = Parser::new();
    let compiler = Compiler::new(config.project.codegen.clone());
    let mut written = 0;
    let mut unchanged = 0;
    let mut failed = 0;
    let mut converted: HashMap<String, &Path> = HashMap::new();

    for path in &documents {
        tracing::debug!("Converting {}", path.display());
        let definition = match parser.parse_file(path) {
            Ok(definition) => definition,
            Err(e) => {
                tracing::error!("✗ {}: {}", path.display(), e);
                failed += 1;
                continue;
            }
        };

        let Some(file_name) = module_file_name(&definition.name) else {
            tracing::error!(
                "✗ {}: module name '{}' is not a valid file name",
                path.display(),
                definition.name
            );
            failed += 1;
            continue;
        };
        if let Some(first) = converted.get(&definition.name) {
            tracing::error!(
                "✗ {}: duplicate module name '{}', already converted from {}",
                path.display(),
                definition.name,
                first.display()
            );
            failed += 1;
            continue;
        }
        converted.insert(definition.name.clone(), path.as_path());

        let module = compiler.compile(&definition);
        report(&module);

        if write_module(&output_dir.join(file_name), &module, force)? {
            tracing::info!("✓ {} (hash: {}...)", module.name, &module.hash[..8]);
            written += 1;
        } else {
            tracing::info!("- {} unchanged", module.name);
            unchanged += 1;
        }
    }

    tracing::info!(
        "Converted {} pipelines ({} unchanged) into {}",
        written,
        unchanged,
        output_dir.display()
    );

    if failed > 0 {
        anyhow::bail!("{} document(s) could not be converted", failed);
    }
    Ok(())
}

/// Log every diagnostic of a module as a warning
pub(crate) fn report(module: &CompiledModule) {
    for diagnostic in &module.diagnostics {
        tracing::warn!("{}: {}", module.name, diagnostic);
    }
}

/// `<name>.js`, if `name` is a single plain path component
fn module_file_name(name: &str) -> Option<String> {
    if name.contains(['/', '\\']) {
        return None;
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(format!("{}.js", name)),
        _ => None,
    }
}

/// Write `module` to `target` unless the file on disk was generated from the
/// same IR. Returns whether the file was written.
fn write_module(target: &Path, module: &CompiledModule, force: bool) -> Result<bool> {
    if !force && target.exists() {
        let existing = std::fs::read_to_string(target)
            .with_context(|| format!("Failed to read {}", target.display()))?;
        if header_hash(&existing) == Some(module.hash.as_str()) {
            return Ok(false);
        }
    }

    if let Some(output_dir) = target.parent() {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    }
    std::fs::write(target, &module.code)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Order", Some("Order.js"))]
    #[case("COSummary.v2", Some("COSummary.v2.js"))]
    #[case("", None)]
    #[case(".", None)]
    #[case("..", None)]
    #[case("../../escape", None)]
    #[case("nested/Order", None)]
    #[case("nested\\Order", None)]
    #[case("/tmp/Order", None)]
    fn test_module_file_name(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(module_file_name(name).as_deref(), expected);
    }
}
