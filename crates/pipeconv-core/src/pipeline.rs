//! Pipeline documents
//!
//! A pipeline document is the serialized graph the legacy XML exporter hands
//! over: a list of typed nodes plus labeled transitions between them. Documents
//! are plain data; `pipeconv-codegen` turns them into an indexed IR.
//!
//! # Example
//!
//! ```yaml
//! name: Order
//! nodes:
//!   - id: start
//!     type: start
//!     name: Show
//!   - id: get
//!     type: pipelet
//!     pipelet: GetOrder
//!     bindings:
//!       - { key: OrderNo, value: CurrentHttpParameterMap.orderNo.stringValue }
//!       - { key: Order, value: Order }
//! transitions:
//!   - { from: start, to: get }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// A complete pipeline as exported from the legacy platform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineDocument {
    /// Pipeline name (becomes the controller module name)
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Nodes in document order
    #[serde(default)]
    pub nodes: Vec<NodeDocument>,

    /// Directed, labeled transitions between nodes
    #[serde(default)]
    pub transitions: Vec<TransitionDocument>,
}

/// A single node of the pipeline graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeDocument {
    /// Node identifier, unique within the document
    pub id: String,

    /// Node payload, tagged by `type`
    #[serde(flatten)]
    pub kind: NodeKindDocument,
}

/// Node payload by node type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKindDocument {
    /// Entry point of a callable pipeline function
    Start {
        /// Start name (e.g. `Show`)
        name: String,
        /// Private starts are not exposed to HTTP requests
        #[serde(default)]
        private: bool,
    },

    /// Exit point, optionally named
    End {
        /// End name reported back to calling pipelines
        #[serde(default)]
        name: Option<String>,
    },

    /// Invocation of a named primitive
    Pipelet {
        /// Primitive name (e.g. `GetOrder`)
        pipelet: String,
        /// Parameter bindings in declaration order
        #[serde(default)]
        bindings: Vec<KeyBinding>,
        /// Static pipelet configuration properties (e.g. `ScriptFile`)
        #[serde(default)]
        configuration: Vec<KeyBinding>,
        /// Node-level override of the primitive's transaction flag
        #[serde(default)]
        transactional: Option<bool>,
    },

    /// Boolean branch
    Decision {
        /// Expression being tested
        key: String,
        /// Comparison operator (`expr` when omitted)
        #[serde(default)]
        operator: Option<String>,
        /// Right-hand side of binary operators
        #[serde(default)]
        value: Option<String>,
    },

    /// Dictionary assignments
    Assign {
        /// Ordered `from -> to` pairs
        #[serde(default)]
        assignments: Vec<AssignmentDocument>,
    },

    /// Call into another pipeline start (`Pipeline-Start`)
    Call {
        /// Call target
        target: String,
    },

    /// Redirect to another pipeline start
    Jump {
        /// Jump target
        target: String,
    },

    /// Template rendering
    Interaction {
        /// Template path
        template: String,
    },

    /// Iteration over a collection
    Loop {
        /// Dictionary key receiving the current element
        element: String,
        /// Expression yielding the collection
        iterator: String,
    },

    /// Merge point of several transitions
    Join,

    /// Abort processing
    Stop,
}

/// A `key -> value` binding on a pipelet node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyBinding {
    /// Formal parameter name
    pub key: String,
    /// Raw legacy expression
    pub value: String,
}

impl KeyBinding {
    /// Create a new binding
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One assignment of an assign node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignmentDocument {
    /// Source expression
    pub from: String,
    /// Target dictionary key
    pub to: String,
}

/// A directed transition between two nodes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransitionDocument {
    /// Source node id
    pub from: String,
    /// Target node id
    pub to: String,
    /// Outcome name; omitted for the default (`Success`) transition
    #[serde(default)]
    pub label: Option<String>,
}

impl PipelineDocument {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a document from disk, choosing the format by file extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => {
                let contents = std::fs::read_to_string(path)?;
                Self::from_yaml_str(&contents)
            }
            Some("json") => {
                let contents = std::fs::read_to_string(path)?;
                Self::from_json_str(&contents)
            }
            _ => Err(Error::UnsupportedDocument {
                path: path.display().to_string(),
            }),
        }
    }

    /// Whether a path looks like a pipeline document
    pub fn is_document_path(path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml" || ext == "json")
    }
}
