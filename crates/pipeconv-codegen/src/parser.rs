//! Document to IR parser
//!
//! Converts a [`PipelineDocument`] into the indexed [`PipelineDefinition`].
//! This is the only fallible stage of the transpiler: duplicate node ids and
//! transitions that name unknown nodes are rejected here so the compiler can
//! assume a well-formed graph.

use std::collections::HashMap;
use std::path::Path;

use pipeconv_core::{NodeKindDocument, PipelineDocument};

use crate::error::{Error, Result};
use crate::ir::*;

/// Parser for pipeline documents
#[derive(Debug, Default)]
pub struct Parser;

impl Parser {
    /// Create a new parser
    pub fn new() -> Self {
        Self
    }

    /// Parse a document file (`.yaml`, `.yml` or `.json`) into IR
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<PipelineDefinition> {
        let document = PipelineDocument::load(path.as_ref())?;
        self.convert(document)
    }

    /// Parse a YAML string into IR
    pub fn parse_yaml(&self, yaml: &str) -> Result<PipelineDefinition> {
        self.convert(PipelineDocument::from_yaml_str(yaml)?)
    }

    /// Parse a JSON string into IR
    pub fn parse_json(&self, json: &str) -> Result<PipelineDefinition> {
        self.convert(PipelineDocument::from_json_str(json)?)
    }

    /// Convert an already-deserialized document into IR
    pub fn convert(&self, document: PipelineDocument) -> Result<PipelineDefinition> {
        let mut ir = PipelineDefinition::new(&document.name);
        ir.description = document.description;

        let mut ids: HashMap<String, NodeId> = HashMap::new();
        for node in document.nodes {
            if ids.contains_key(&node.id) {
                return Err(Error::InvalidPipeline {
                    pipeline: document.name.clone(),
                    message: format!("duplicate node id '{}'", node.id),
                });
            }
            let kind = convert_kind(node.kind);
            let id = ir.add_node(node.id.clone(), kind);
            ids.insert(node.id, id);
        }

        for transition in document.transitions {
            let resolve = |id: &str| {
                ids.get(id).copied().ok_or_else(|| Error::InvalidPipeline {
                    pipeline: document.name.clone(),
                    message: format!(
                        "transition {} -> {} references unknown node '{}'",
                        transition.from, transition.to, id
                    ),
                })
            };
            let from = resolve(&transition.from)?;
            let to = resolve(&transition.to)?;
            ir.connect(from, to, TransitionLabel::parse(transition.label.as_deref()));
        }

        tracing::debug!(
            "Parsed pipeline '{}' ({} nodes, {} transitions)",
            ir.name,
            ir.nodes.len(),
            ir.transitions.len()
        );
        Ok(ir)
    }
}

fn convert_kind(raw: NodeKindDocument) -> NodeKind {
    match raw {
        NodeKindDocument::Start { name, private } => NodeKind::Start { name, private },
        NodeKindDocument::End { name } => NodeKind::End {
            name: name.filter(|n| !n.trim().is_empty()),
        },
        NodeKindDocument::Pipelet {
            pipelet,
            bindings,
            configuration,
            transactional,
        } => NodeKind::Pipelet(PipeletNodeIR {
            pipelet_type: pipelet,
            key_bindings: bindings,
            configuration,
            transactional,
        }),
        NodeKindDocument::Decision {
            key,
            operator,
            value,
        } => NodeKind::Decision(DecisionNode {
            key,
            operator: DecisionOperator::parse(operator.as_deref()),
            value,
        }),
        NodeKindDocument::Assign { assignments } => NodeKind::Assign(
            assignments
                .into_iter()
                .map(|a| (a.from, a.to))
                .collect(),
        ),
        NodeKindDocument::Call { target } => NodeKind::Call { target },
        NodeKindDocument::Jump { target } => NodeKind::Jump { target },
        NodeKindDocument::Interaction { template } => NodeKind::Interaction { template },
        NodeKindDocument::Loop { element, iterator } => NodeKind::Loop { element, iterator },
        NodeKindDocument::Join => NodeKind::Join,
        NodeKindDocument::Stop => NodeKind::Stop,
    }
}
