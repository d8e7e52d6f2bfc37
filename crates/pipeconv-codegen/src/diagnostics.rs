//! Compilation diagnostics
//!
//! Diagnostics travel next to the generated module instead of aborting it.
//! Only [`DiagnosticKind::ImportConflict`] can make the output invalid.

use serde::Serialize;
use std::fmt;

/// A condition found while compiling one pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Document id of the node concerned, if any
    pub node: Option<String>,

    /// What was found
    pub kind: DiagnosticKind,
}

/// Kinds of diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Pipelet type has no registry entry
    UnmappedPipelet {
        /// Pipelet type
        pipelet: String,
    },

    /// A required parameter was not bound
    MissingParameter {
        /// Pipelet type
        pipelet: String,
        /// Parameter name
        param: String,
    },

    /// The same key was bound more than once; the first binding was used
    DuplicateBinding {
        /// Binding key
        key: String,
    },

    /// Two module paths claimed the same import alias
    ImportConflict {
        /// Contested alias
        alias: String,
        /// Path that was kept
        existing: String,
        /// Path that was dropped
        requested: String,
    },

    /// An outgoing transition the node kind cannot express
    UnhandledTransition {
        /// Transition label
        label: String,
    },

    /// Node is not reachable from any start node
    UnreachableNode,

    /// Node reached on several paths and compiled once as a helper function
    SharedTail {
        /// Helper function name
        helper: String,
    },
}

impl Diagnostic {
    /// Diagnostic attached to a node
    pub fn at(node: impl Into<String>, kind: DiagnosticKind) -> Self {
        Self {
            node: Some(node.into()),
            kind,
        }
    }

    /// Diagnostic for the module as a whole
    pub fn module(kind: DiagnosticKind) -> Self {
        Self { node: None, kind }
    }

    /// Whether the generated module may be invalid because of this diagnostic
    pub fn is_error(&self) -> bool {
        matches!(self.kind, DiagnosticKind::ImportConflict { .. })
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::UnmappedPipelet { pipelet } => {
                write!(f, "unsupported pipelet '{}'", pipelet)
            }
            DiagnosticKind::MissingParameter { pipelet, param } => {
                write!(f, "{} is missing its {} parameter", pipelet, param)
            }
            DiagnosticKind::DuplicateBinding { key } => {
                write!(f, "key '{}' bound more than once, first binding used", key)
            }
            DiagnosticKind::ImportConflict {
                alias,
                existing,
                requested,
            } => write!(
                f,
                "import alias '{}' bound to '{}', cannot also bind '{}'",
                alias, existing, requested
            ),
            DiagnosticKind::UnhandledTransition { label } => {
                write!(f, "transition '{}' is not supported here", label)
            }
            DiagnosticKind::UnreachableNode => write!(f, "unreachable from any start node"),
            DiagnosticKind::SharedTail { helper } => {
                write!(f, "shared by several paths, compiled as {}()", helper)
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Some(node) => write!(f, "{}: {}", node, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let diagnostic = Diagnostic::at(
            "n4",
            DiagnosticKind::UnmappedPipelet {
                pipelet: "Foo".to_string(),
            },
        );
        assert_eq!(diagnostic.to_string(), "n4: unsupported pipelet 'Foo'");
        assert!(!diagnostic.is_error());
    }

    #[test]
    fn test_import_conflict_is_error() {
        let diagnostic = Diagnostic::module(DiagnosticKind::ImportConflict {
            alias: "Cart".to_string(),
            existing: "a/Cart".to_string(),
            requested: "b/Cart".to_string(),
        });
        assert!(diagnostic.is_error());
        assert_eq!(
            diagnostic.to_string(),
            "import alias 'Cart' bound to 'a/Cart', cannot also bind 'b/Cart'"
        );
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let diagnostic = Diagnostic::at("x", DiagnosticKind::UnreachableNode);
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["node"], "x");
        assert_eq!(json["kind"]["kind"], "unreachable_node");
    }
}
