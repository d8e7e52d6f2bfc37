//! List the pipelet registry

use anyhow::Result;
use pipeconv_codegen::registry::all_pipelets;

/// Run the pipelets command
pub fn run(json: bool) -> Result<()> {
    let mappings = all_pipelets();

    if json {
        let entries: Vec<serde_json::Value> = mappings
            .iter()
            .map(|m| {
                serde_json::json!({
                    "name": m.name,
                    "imports": m.required_imports,
                    "outputs": m.outputs,
                    "can_error": m.can_error,
                    "transactional": m.transactional,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for mapping in &mappings {
        let mut flags = Vec::new();
        if mapping.can_error {
            flags.push("error");
        }
        if mapping.transactional {
            flags.push("transactional");
        }
        println!(
            "{:<26} [{}] {}",
            mapping.name,
            flags.join(","),
            mapping.required_imports.join(" ")
        );
    }
    tracing::debug!("{} pipelets registered", mappings.len());
    Ok(())
}
