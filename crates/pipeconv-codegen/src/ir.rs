//! Intermediate Representation for pipelines
//!
//! The IR is an indexed graph built from a [`pipeconv_core::PipelineDocument`]:
//! nodes live in a `Vec` addressed by [`NodeId`], and each node keeps the
//! indices of its outgoing and incoming transitions. The definition is
//! immutable once the parser hands it to the compiler.

pub use pipeconv_core::KeyBinding;

/// Index of a node within its [`PipelineDefinition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

/// Intermediate representation of a complete pipeline
#[derive(Debug, Clone)]
pub struct PipelineDefinition {
    /// Pipeline name (used for the module name and same-pipeline calls)
    pub name: String,

    /// Pipeline description
    pub description: Option<String>,

    /// Nodes in document order
    pub nodes: Vec<Node>,

    /// All transitions in document order
    pub transitions: Vec<Transition>,

    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
}

/// A node of the pipeline graph
#[derive(Debug, Clone)]
pub struct Node {
    /// Identifier from the source document
    pub id: String,

    /// Node payload
    pub kind: NodeKind,
}

/// Node payload by node type
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Function entry point
    Start {
        /// Function name
        name: String,
        /// Not exported as a public endpoint
        private: bool,
    },
    /// Function exit, optionally named
    End {
        /// Name returned to callers
        name: Option<String>,
    },
    /// Primitive invocation
    Pipelet(PipeletNodeIR),
    /// Boolean branch
    Decision(DecisionNode),
    /// Ordered dictionary assignments as `(from, to)` pairs
    Assign(Vec<(String, String)>),
    /// Call into a pipeline start
    Call {
        /// `Pipeline-Start` target
        target: String,
    },
    /// Redirect to a pipeline start
    Jump {
        /// `Pipeline-Start` target
        target: String,
    },
    /// Template rendering
    Interaction {
        /// Template path
        template: String,
    },
    /// Iteration over a collection
    Loop {
        /// Element dictionary key
        element: String,
        /// Collection expression
        iterator: String,
    },
    /// Merge point
    Join,
    /// Abort processing
    Stop,
}

/// One primitive invocation
#[derive(Debug, Clone, Default)]
pub struct PipeletNodeIR {
    /// Primitive name, matched against the registry
    pub pipelet_type: String,

    /// Ordered parameter bindings
    pub key_bindings: Vec<KeyBinding>,

    /// Static configuration properties
    pub configuration: Vec<KeyBinding>,

    /// Node-level override of the registry's transaction flag
    pub transactional: Option<bool>,
}

/// Parameter required by a generator but absent on the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingParam {
    /// Primitive name
    pub pipelet: String,
    /// Formal parameter name that was looked for first
    pub param: &'static str,
}

/// Decision node condition
#[derive(Debug, Clone)]
pub struct DecisionNode {
    /// Expression under test
    pub key: String,
    /// Comparison operator
    pub operator: DecisionOperator,
    /// Right-hand operand for binary operators
    pub value: Option<String>,
}

/// Comparison operator of a decision node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOperator {
    /// Truthiness of the key
    Expr,
    /// Key is not null/undefined
    Defined,
    /// Key is null/undefined
    Undefined,
    /// Strict equality
    Eq,
    /// Strict inequality
    Ne,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
}

/// A transition between two nodes
#[derive(Debug, Clone)]
pub struct Transition {
    /// Source node
    pub from: NodeId,
    /// Target node
    pub to: NodeId,
    /// Outcome label
    pub label: TransitionLabel,
}

/// Outcome label of a transition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransitionLabel {
    /// Default continuation (unlabeled, `next` or `Success`)
    Success,
    /// Failure continuation
    Error,
    /// Any other outcome (`yes`, `no`, `do`, end-node names, ...)
    Named(String),
}

impl TransitionLabel {
    /// Interpret a raw document label
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => TransitionLabel::Success,
            Some(label) if label.eq_ignore_ascii_case("next") => TransitionLabel::Success,
            Some(label) if label.eq_ignore_ascii_case("success") => TransitionLabel::Success,
            Some(label) if label.eq_ignore_ascii_case("error") => TransitionLabel::Error,
            Some(label) => TransitionLabel::Named(label.to_string()),
        }
    }

    /// Whether this is a named label equal to `name`, ignoring case
    pub fn is_named(&self, name: &str) -> bool {
        matches!(self, TransitionLabel::Named(n) if n.eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for TransitionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionLabel::Success => write!(f, "Success"),
            TransitionLabel::Error => write!(f, "Error"),
            TransitionLabel::Named(name) => write!(f, "{}", name),
        }
    }
}

impl DecisionOperator {
    /// Interpret a raw document operator; unknown operators fall back to `Expr`
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("defined") | Some("isdefined") => DecisionOperator::Defined,
            Some("undefined") | Some("isundefined") => DecisionOperator::Undefined,
            Some("eq") | Some("==") => DecisionOperator::Eq,
            Some("ne") | Some("!=") => DecisionOperator::Ne,
            Some("lt") | Some("<") => DecisionOperator::Lt,
            Some("le") | Some("<=") => DecisionOperator::Le,
            Some("gt") | Some(">") => DecisionOperator::Gt,
            Some("ge") | Some(">=") => DecisionOperator::Ge,
            _ => DecisionOperator::Expr,
        }
    }

    /// JavaScript operator for binary comparisons
    pub fn js_operator(self) -> Option<&'static str> {
        match self {
            DecisionOperator::Eq => Some("==="),
            DecisionOperator::Ne => Some("!=="),
            DecisionOperator::Lt => Some("<"),
            DecisionOperator::Le => Some("<="),
            DecisionOperator::Gt => Some(">"),
            DecisionOperator::Ge => Some(">="),
            _ => None,
        }
    }
}

/// Binding values the legacy exporter writes for unbound parameters
fn is_unbound(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == "null"
}

impl PipeletNodeIR {
    /// Create a pipelet node without bindings
    pub fn new(pipelet_type: impl Into<String>) -> Self {
        Self {
            pipelet_type: pipelet_type.into(),
            ..Default::default()
        }
    }

    /// Append a key binding
    pub fn with_binding(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.key_bindings.push(KeyBinding::new(key, value));
        self
    }

    /// Append a configuration property
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configuration.push(KeyBinding::new(key, value));
        self
    }

    /// First bound value for `key`
    pub fn binding(&self, key: &str) -> Option<&str> {
        self.key_bindings
            .iter()
            .find(|b| b.key == key && !is_unbound(&b.value))
            .map(|b| b.value.as_str())
    }

    /// First bound value among synonyms, checked in the given priority order
    pub fn binding_any(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.binding(key))
    }

    /// Bound value for a required parameter
    pub fn require(&self, key: &'static str) -> std::result::Result<&str, MissingParam> {
        self.binding(key).ok_or_else(|| self.missing(key))
    }

    /// Bound value for a required parameter with synonyms; the first synonym
    /// names the parameter when none is bound
    pub fn require_any(&self, keys: &[&'static str]) -> std::result::Result<&str, MissingParam> {
        self.binding_any(keys)
            .ok_or_else(|| self.missing(keys.first().copied().unwrap_or("")))
    }

    /// Configuration property value
    pub fn config(&self, key: &str) -> Option<&str> {
        self.configuration
            .iter()
            .find(|b| b.key == key && !is_unbound(&b.value))
            .map(|b| b.value.as_str())
    }

    /// Keys bound more than once, in first-occurrence order
    pub fn duplicate_keys(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        let mut duplicates: Vec<&str> = Vec::new();
        for binding in &self.key_bindings {
            let key = binding.key.as_str();
            if seen.contains(&key) {
                if !duplicates.contains(&key) {
                    duplicates.push(key);
                }
            } else {
                seen.push(key);
            }
        }
        duplicates
    }

    fn missing(&self, param: &'static str) -> MissingParam {
        MissingParam {
            pipelet: self.pipelet_type.clone(),
            param,
        }
    }
}

impl PipelineDefinition {
    /// Create a new empty definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            nodes: Vec::new(),
            transitions: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }

    /// Add a node and return its id
    pub fn add_node(&mut self, id: impl Into<String>, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            id: id.into(),
            kind,
        });
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        NodeId(self.nodes.len() - 1)
    }

    /// Add a transition between two existing nodes
    pub fn connect(&mut self, from: NodeId, to: NodeId, label: TransitionLabel) {
        let index = self.transitions.len();
        self.transitions.push(Transition { from, to, label });
        self.outgoing[from.0].push(index);
        self.incoming[to.0].push(index);
    }

    /// Build a straight-line pipeline of pipelets joined by `Success` edges
    pub fn chain(name: impl Into<String>, pipelets: Vec<PipeletNodeIR>) -> Self {
        let mut definition = Self::new(name);
        let mut previous: Option<NodeId> = None;
        for (index, pipelet) in pipelets.into_iter().enumerate() {
            let id = definition.add_node(format!("n{}", index + 1), NodeKind::Pipelet(pipelet));
            if let Some(prev) = previous {
                definition.connect(prev, id, TransitionLabel::Success);
            }
            previous = Some(id);
        }
        definition
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Find a node by its document id
    pub fn find(&self, id: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.id == id).map(NodeId)
    }

    /// All node ids in document order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Outgoing transitions of a node, in document order
    pub fn outgoing(&self, id: NodeId) -> impl Iterator<Item = &Transition> + '_ {
        self.outgoing[id.0].iter().map(|&t| &self.transitions[t])
    }

    /// Number of incoming transitions
    pub fn in_degree(&self, id: NodeId) -> usize {
        self.incoming[id.0].len()
    }

    /// Target of the first outgoing transition with the given label
    pub fn successor(&self, id: NodeId, label: &TransitionLabel) -> Option<NodeId> {
        self.outgoing(id).find(|t| &t.label == label).map(|t| t.to)
    }

    /// Start nodes in document order
    pub fn start_nodes(&self) -> Vec<NodeId> {
        self.node_ids()
            .filter(|&id| matches!(self.node(id).kind, NodeKind::Start { .. }))
            .collect()
    }

    /// Get a hash of the IR for change detection
    pub fn content_hash(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());

        for node in &self.nodes {
            hasher.update(node.id.as_bytes());
            hasher.update(format!("{:?}", node.kind).as_bytes());
        }

        for transition in &self.transitions {
            hasher.update(
                format!(
                    "{}->{}:{}",
                    transition.from.0, transition.to.0, transition.label
                )
                .as_bytes(),
            );
        }

        hex::encode(hasher.finalize())
    }
}
