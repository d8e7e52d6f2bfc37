//! Pipelet mapping registry
//!
//! A read-only table from primitive name to everything the compiler needs to
//! know about it: module imports, output keys, error/transaction behaviour and
//! the generator function. Absence from the table is the normal "unmapped"
//! case during bulk conversion and is signalled with `None`.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::context::GeneratorContext;
use crate::generators;
use crate::ir::{MissingParam, PipeletNodeIR};

/// Output of a generator function: unindented-by-caller code lines, or the
/// parameter that was missing
pub type GenResult = std::result::Result<Vec<String>, MissingParam>;

/// Generator function for one primitive
pub type GeneratorFn = fn(&PipeletNodeIR, &mut GeneratorContext) -> GenResult;

/// Registry entry for one primitive
#[derive(Debug, Clone, Copy)]
pub struct PipeletMapping {
    /// Primitive name
    pub name: &'static str,
    /// Module paths the generated call depends on
    pub required_imports: &'static [&'static str],
    /// Binding keys the primitive writes to
    pub outputs: &'static [&'static str],
    /// Invocation may fail and take the `Error` transition
    pub can_error: bool,
    /// Mutates persistent state and must run inside a transaction
    pub transactional: bool,
    /// Code generator
    pub generate: GeneratorFn,
}

/// Result of generating one pipelet node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated {
    /// Statements were emitted
    Emitted(Vec<String>),
    /// A required parameter was not bound; `line` is the placeholder comment
    MissingParam {
        /// Parameter name
        param: &'static str,
        /// Placeholder comment line
        line: String,
    },
    /// No registry entry; `line` is the placeholder comment
    Unmapped {
        /// Placeholder comment line
        line: String,
    },
}

impl Generated {
    /// Output lines in order
    pub fn lines(&self) -> Vec<String> {
        match self {
            Generated::Emitted(lines) => lines.clone(),
            Generated::MissingParam { line, .. } | Generated::Unmapped { line } => {
                vec![line.clone()]
            }
        }
    }

    /// Output joined into a single string
    pub fn into_code(self) -> String {
        self.lines().join("\n")
    }

    /// Whether actual statements were produced
    pub fn is_emitted(&self) -> bool {
        matches!(self, Generated::Emitted(_))
    }
}

static REGISTRY: Lazy<HashMap<&'static str, &'static PipeletMapping>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for mapping in generators::ALL.iter().flat_map(|group| group.iter()) {
        if map.insert(mapping.name, mapping).is_some() {
            tracing::warn!("Pipelet '{}' registered twice", mapping.name);
        }
    }
    map
});

/// Look up the registry entry for a primitive
pub fn get_pipelet_mapping(name: &str) -> Option<&'static PipeletMapping> {
    REGISTRY.get(name).copied()
}

/// Whether a primitive has a registry entry
pub fn is_pipelet_mapped(name: &str) -> bool {
    REGISTRY.contains_key(name)
}

/// All registry entries, sorted by name
pub fn all_pipelets() -> Vec<&'static PipeletMapping> {
    let mut mappings: Vec<_> = REGISTRY.values().copied().collect();
    mappings.sort_by_key(|m| m.name);
    mappings
}

impl PipeletMapping {
    /// Transaction flag after applying a node-level override
    pub fn is_transactional_for(&self, node: &PipeletNodeIR) -> bool {
        node.transactional.unwrap_or(self.transactional)
    }
}

/// Generate code for one pipelet node at the context's current indentation.
///
/// Imports are registered only when statements are emitted.
pub fn generate_pipelet(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> Generated {
    let Some(mapping) = get_pipelet_mapping(&node.pipelet_type) else {
        return Generated::Unmapped {
            line: ctx.line(format!("// {}: unsupported pipelet", node.pipelet_type)),
        };
    };

    match (mapping.generate)(node, ctx) {
        Ok(lines) => {
            for path in mapping.required_imports {
                ctx.require_module(path);
            }
            Generated::Emitted(lines)
        }
        Err(missing) => Generated::MissingParam {
            param: missing.param,
            line: ctx.line(format!(
                "// {}: missing {} parameter",
                missing.pipelet, missing.param
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_pipelets_are_mapped() {
        for name in ["GetOrder", "CreateOrder", "ClearFormElement", "Script", "LoginCustomer"] {
            assert!(is_pipelet_mapped(name), "{} should be mapped", name);
        }
        assert!(!is_pipelet_mapped("TotallyUnknownPipelet"));
        assert!(!is_pipelet_mapped("getorder"));
    }

    #[test]
    fn test_get_order_mapping() {
        let mapping = get_pipelet_mapping("GetOrder").unwrap();
        assert_eq!(mapping.required_imports, &["dw/order/OrderMgr"]);
        assert!(mapping.can_error);
        assert!(!mapping.transactional);
        assert_eq!(mapping.outputs, &["Order"]);
    }

    #[test]
    fn test_all_pipelets_sorted_and_unique() {
        let all = all_pipelets();
        assert!(all.len() >= 30);
        for pair in all.windows(2) {
            assert!(pair[0].name < pair[1].name);
        }
    }

    #[test]
    fn test_node_override_of_transaction_flag() {
        let mapping = get_pipelet_mapping("Script").unwrap();
        let mut node = PipeletNodeIR::new("Script");
        assert!(!mapping.is_transactional_for(&node));
        node.transactional = Some(true);
        assert!(mapping.is_transactional_for(&node));
    }

    #[test]
    fn test_generate_unmapped() {
        let mut ctx = GeneratorContext::default();
        let generated = generate_pipelet(&PipeletNodeIR::new("TotallyUnknownPipelet"), &mut ctx);
        assert_eq!(
            generated,
            Generated::Unmapped {
                line: "// TotallyUnknownPipelet: unsupported pipelet".to_string()
            }
        );
        assert!(ctx.requires().is_empty());
    }

    #[test]
    fn test_generate_registers_imports_once() {
        let mut ctx = GeneratorContext::default();
        let node = PipeletNodeIR::new("GetOrder").with_binding("OrderNo", "Pipeline/OrderNo");
        assert!(generate_pipelet(&node, &mut ctx).is_emitted());
        assert_eq!(ctx.requires().len(), 1);
        assert!(generate_pipelet(&node, &mut ctx).is_emitted());
        assert_eq!(ctx.requires().len(), 1);
        assert_eq!(
            ctx.requires().get("OrderMgr").map(String::as_str),
            Some("dw/order/OrderMgr")
        );
    }
}
