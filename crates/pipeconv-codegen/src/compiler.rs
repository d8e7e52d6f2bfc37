//! Graph compiler
//!
//! Walks a [`PipelineDefinition`] from each start node and rebuilds structured
//! JavaScript from its transitions:
//!
//! - sequential `Success` edges concatenate
//! - decisions and labeled call exits become `if` / `else if` chains
//! - `Error` edges of failing pipelets become `try` / `catch`
//! - maximal runs of transactional pipelets share one `Transaction.wrap`
//! - back edges open `for` or `while` loops
//! - nodes reached twice are compiled once as nested helper functions
//!
//! Compilation is infallible. Everything that cannot be expressed ends up as a
//! comment in the code and a [`Diagnostic`] next to it.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use pipeconv_core::{CodegenConfig, ModuleStyle};
use serde::Serialize;

use crate::analysis;
use crate::context::GeneratorContext;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::ir::{DecisionNode, DecisionOperator, NodeId, NodeKind, PipelineDefinition, TransitionLabel};
use crate::registry::{self, Generated};
use crate::rewrite::{is_plain_identifier, transform_expression, transform_variable};

/// Prefix of the header line carrying the IR hash
pub const HASH_MARKER: &str = "// Source hash: ";

const TRANSACTION_MODULE: &str = "dw/system/Transaction";
const URL_UTILS_MODULE: &str = "dw/web/URLUtils";
const ISML_MODULE: &str = "dw/template/ISML";

/// One generated JavaScript module
#[derive(Debug, Clone, Serialize)]
pub struct CompiledModule {
    /// Pipeline name
    pub name: String,

    /// Module source
    pub code: String,

    /// IR hash recorded in the module header
    pub hash: String,

    /// Conditions found during compilation
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledModule {
    /// Whether any diagnostic may make the module invalid
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// IR hash recorded in the header of previously generated code
pub fn header_hash(code: &str) -> Option<&str> {
    code.lines()
        .take(8)
        .find_map(|line| line.strip_prefix(HASH_MARKER))
        .map(str::trim)
}

/// Pipeline to JavaScript compiler
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CodegenConfig,
}

/// A function to generate
struct Entry {
    name: String,
    root: NodeId,
    private: bool,
}

impl Compiler {
    /// Create a compiler with the given output settings
    pub fn new(config: CodegenConfig) -> Self {
        Self { config }
    }

    /// Output settings in use
    pub fn config(&self) -> &CodegenConfig {
        &self.config
    }

    /// Compile one pipeline into a module
    pub fn compile(&self, definition: &PipelineDefinition) -> CompiledModule {
        tracing::debug!("Compiling pipeline: {}", definition.name);

        let hash = definition.content_hash();
        let mut ctx = GeneratorContext::new(self.config.indent_width);
        let mut diagnostics = Vec::new();
        let mut reached = vec![false; definition.nodes.len()];

        let entries = entry_points(definition);
        let roots: Vec<NodeId> = entries.iter().map(|e| e.root).collect();
        let loop_headers = analysis::back_edge_targets(definition, &roots);

        let mut functions = Vec::with_capacity(entries.len());
        for entry in &entries {
            tracing::debug!("Compiling function {}.{}", definition.name, entry.name);
            let builder = FunctionBuilder {
                definition,
                config: &self.config,
                ctx: &mut ctx,
                diagnostics: &mut diagnostics,
                reached: &mut reached,
                loop_headers: &loop_headers,
                entries: &entries,
                lines: Vec::new(),
                locals: Vec::new(),
                temps: Vec::new(),
                visited: HashSet::new(),
                loops: Vec::new(),
                helpers: BTreeMap::new(),
                pending: Vec::new(),
                base_depth: 0,
                results: 0,
                flags: 0,
                labels: 0,
            };
            functions.push(builder.build(entry));
        }

        for conflict in ctx.conflicts() {
            diagnostics.push(Diagnostic::module(DiagnosticKind::ImportConflict {
                alias: conflict.alias.clone(),
                existing: conflict.existing.clone(),
                requested: conflict.requested.clone(),
            }));
        }

        let mut unreachable = Vec::new();
        for id in definition.node_ids() {
            if !reached[id.0] {
                let node_id = &definition.node(id).id;
                tracing::debug!("Node {} is unreachable", node_id);
                unreachable.push(format!("// {}: unreachable from any start node", node_id));
                diagnostics.push(Diagnostic::at(node_id, DiagnosticKind::UnreachableNode));
            }
        }

        let code = self.assemble(definition, &hash, &ctx, &entries, functions, unreachable);

        CompiledModule {
            name: definition.name.clone(),
            code,
            hash,
            diagnostics,
        }
    }

    fn assemble(
        &self,
        definition: &PipelineDefinition,
        hash: &str,
        ctx: &GeneratorContext,
        entries: &[Entry],
        functions: Vec<Vec<String>>,
        unreachable: Vec<String>,
    ) -> String {
        let mut out = vec![
            "'use strict';".to_string(),
            String::new(),
            format!("// Pipeline: {}", definition.name),
            format!("{}{}", HASH_MARKER, hash),
        ];
        if let Some(description) = &definition.description {
            for line in description.lines().filter(|l| !l.trim().is_empty()) {
                out.push(format!("// {}", line.trim()));
            }
        }
        out.push(String::new());

        if !ctx.requires().is_empty() {
            for (alias, path) in ctx.requires() {
                out.push(match self.config.module_style {
                    ModuleStyle::CommonJs => format!("var {} = require('{}');", alias, path),
                    ModuleStyle::Esm => format!("import {} from '{}';", alias, path),
                });
            }
            out.push(String::new());
        }

        for function in functions {
            out.extend(function);
            out.push(String::new());
        }

        if !entries.is_empty() {
            let is_public = |e: &Entry| !e.private && self.config.export_public;
            match self.config.module_style {
                ModuleStyle::CommonJs => {
                    for entry in entries {
                        out.push(format!("exports.{0} = {0};", entry.name));
                        if is_public(entry) {
                            out.push(format!("exports.{}.public = true;", entry.name));
                        }
                    }
                }
                ModuleStyle::Esm => {
                    for entry in entries.iter().filter(|&e| is_public(e)) {
                        out.push(format!("{}.public = true;", entry.name));
                    }
                    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
                    out.push(format!("export {{ {} }};", names.join(", ")));
                }
            }
        }

        if !unreachable.is_empty() {
            out.push(String::new());
            out.extend(unreachable);
        }

        let mut code = out.join("\n");
        while code.ends_with('\n') {
            code.pop();
        }
        code.push('\n');
        code
    }
}

/// Start nodes in document order, or a synthetic `Start` at the first node
fn entry_points(definition: &PipelineDefinition) -> Vec<Entry> {
    let starts: Vec<Entry> = definition
        .start_nodes()
        .into_iter()
        .filter_map(|id| match &definition.node(id).kind {
            NodeKind::Start { name, private } => Some(Entry {
                name: identifier(name),
                root: id,
                private: *private,
            }),
            _ => None,
        })
        .collect();

    if starts.is_empty() && !definition.nodes.is_empty() {
        return vec![Entry {
            name: "Start".to_string(),
            root: NodeId(0),
            private: false,
        }];
    }
    starts
}

/// Make `name` usable as a JavaScript identifier
fn identifier(name: &str) -> String {
    let mut ident: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}

/// Single-quoted JavaScript string literal
fn js_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn negate(condition: &str) -> String {
    let simple = condition
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '[' | ']'));
    if simple {
        format!("!{}", condition)
    } else {
        format!("!({})", condition)
    }
}

fn condition(decision: &DecisionNode) -> String {
    let key = transform_expression(&decision.key);
    match decision.operator {
        DecisionOperator::Expr => key,
        DecisionOperator::Defined => format!("{} != null", key),
        DecisionOperator::Undefined => format!("{} == null", key),
        operator => {
            let value = decision
                .value
                .as_deref()
                .map(transform_expression)
                .unwrap_or_else(|| "null".to_string());
            format!("{} {} {}", key, operator.js_operator().unwrap_or("==="), value)
        }
    }
}

/// What follows a compiled node
enum Flow {
    /// Continue with this node
    Next(NodeId),
    /// No successor
    DeadEnd,
    /// Control already left the block
    Exited,
}

fn flow_to(next: Option<NodeId>) -> Flow {
    next.map_or(Flow::DeadEnd, Flow::Next)
}

/// A loop whose body is being compiled
struct OpenLoop {
    header: NodeId,
    exit: Option<NodeId>,
    body_depth: usize,
    opening_line: usize,
    label: Option<String>,
    breaks: bool,
}

/// Compiles one start node into one function
struct FunctionBuilder<'a> {
    definition: &'a PipelineDefinition,
    config: &'a CodegenConfig,
    ctx: &'a mut GeneratorContext,
    diagnostics: &'a mut Vec<Diagnostic>,
    reached: &'a mut [bool],
    loop_headers: &'a BTreeSet<NodeId>,
    entries: &'a [Entry],
    lines: Vec<String>,
    locals: Vec<String>,
    temps: Vec<String>,
    visited: HashSet<NodeId>,
    loops: Vec<OpenLoop>,
    helpers: BTreeMap<NodeId, String>,
    pending: Vec<NodeId>,
    base_depth: usize,
    results: usize,
    flags: usize,
    labels: usize,
}

impl FunctionBuilder<'_> {
    fn build(mut self, entry: &Entry) -> Vec<String> {
        self.ctx.push_indent();
        self.base_depth = self.ctx.indent();
        self.walk(Some(entry.root), None);

        let mut helper_blocks = Vec::new();
        let mut next = 0;
        while next < self.pending.len() {
            let id = self.pending[next];
            next += 1;
            let name = self.helpers.get(&id).cloned().unwrap_or_default();
            let body = self.build_helper(id);
            helper_blocks.push(self.ctx.line(format!("function {}() {{", name)));
            helper_blocks.extend(body);
            helper_blocks.push(self.ctx.line("}"));
        }

        let mut function = vec![format!("function {}() {{", entry.name)];
        let declared: Vec<&str> = self
            .locals
            .iter()
            .chain(&self.temps)
            .map(String::as_str)
            .collect();
        if !declared.is_empty() {
            function.push(self.ctx.line(format!("var {};", declared.join(", "))));
        }
        function.append(&mut self.lines);
        if !helper_blocks.is_empty() {
            function.push(String::new());
            function.extend(helper_blocks);
        }
        function.push("}".to_string());

        self.ctx.pop_indent();
        function
    }

    fn build_helper(&mut self, id: NodeId) -> Vec<String> {
        let saved_lines = std::mem::take(&mut self.lines);
        let saved_loops = std::mem::take(&mut self.loops);
        let saved_visited = std::mem::take(&mut self.visited);
        let saved_base = self.base_depth;
        self.ctx.push_indent();
        self.base_depth = self.ctx.indent();

        match self.compile_entry(id, None) {
            Flow::Next(next) => {
                self.walk(Some(next), None);
            }
            Flow::DeadEnd | Flow::Exited => {}
        }

        self.ctx.pop_indent();
        self.base_depth = saved_base;
        self.loops = saved_loops;
        self.visited = saved_visited;
        std::mem::replace(&mut self.lines, saved_lines)
    }

    fn emit(&mut self, text: impl AsRef<str>) {
        let line = self.ctx.line(text);
        self.lines.push(line);
    }

    fn diagnose(&mut self, id: NodeId, kind: DiagnosticKind) {
        let diagnostic = Diagnostic::at(&self.definition.node(id).id, kind);
        if !self.diagnostics.contains(&diagnostic) {
            self.diagnostics.push(diagnostic);
        }
    }

    fn declare(&mut self, target: &str) {
        if is_plain_identifier(target) && !self.locals.iter().any(|l| l == target) {
            self.locals.push(target.to_string());
        }
    }

    /// Emit statements from `from` until `stop`. Returns whether control
    /// left the enclosing block (return, break or continue).
    fn walk(&mut self, from: Option<NodeId>, stop: Option<NodeId>) -> bool {
        let mut current = from;
        while let Some(id) = current {
            if let Some(index) = self.loops.iter().rposition(|l| l.exit == Some(id)) {
                self.loop_jump("break", index);
                return true;
            }
            if Some(id) == stop {
                return false;
            }
            if let Some(index) = self.loops.iter().rposition(|l| l.header == id) {
                let innermost = index + 1 == self.loops.len();
                if innermost && self.ctx.indent() == self.loops[index].body_depth {
                    return false;
                }
                self.loop_jump("continue", index);
                return true;
            }
            if self.visited.contains(&id) {
                let helper = self.helper_for(id);
                self.emit(format!("return {}();", helper));
                return true;
            }

            match self.compile_entry(id, stop) {
                Flow::Next(next) => current = Some(next),
                Flow::Exited => return true,
                Flow::DeadEnd => break,
            }
        }

        if self.ctx.indent() > self.base_depth {
            self.emit("return;");
            return true;
        }
        false
    }

    /// Compile a node, opening a `while` loop first if a back edge enters it
    fn compile_entry(&mut self, id: NodeId, stop: Option<NodeId>) -> Flow {
        let is_for_loop = matches!(self.definition.node(id).kind, NodeKind::Loop { .. });
        if self.loop_headers.contains(&id) && !is_for_loop {
            self.compile_while(id, stop)
        } else {
            self.compile_node(id, stop)
        }
    }

    fn loop_jump(&mut self, keyword: &str, index: usize) {
        if keyword == "break" {
            self.loops[index].breaks = true;
        }
        if index + 1 == self.loops.len() {
            self.emit(format!("{};", keyword));
        } else {
            let label = self.loop_label(index);
            self.emit(format!("{} {};", keyword, label));
        }
    }

    /// Label of an open loop, added to its opening line on first use
    fn loop_label(&mut self, index: usize) -> String {
        if let Some(label) = &self.loops[index].label {
            return label.clone();
        }
        self.labels += 1;
        let label = format!("loop{}", self.labels);
        let line = self.loops[index].opening_line;
        let opening = &self.lines[line];
        let indent = opening.len() - opening.trim_start().len();
        self.lines[line].insert_str(indent, &format!("{}: ", label));
        self.loops[index].label = Some(label.clone());
        label
    }

    fn helper_for(&mut self, id: NodeId) -> String {
        if let Some(name) = self.helpers.get(&id) {
            return name.clone();
        }
        let base = format!("step_{}", identifier(&self.definition.node(id).id));
        let mut name = base.clone();
        let mut suffix = 1;
        while self.helpers.values().any(|n| *n == name) {
            suffix += 1;
            name = format!("{}_{}", base, suffix);
        }
        tracing::debug!("Node {} is shared, compiling as {}()", self.definition.node(id).id, name);
        self.diagnose(id, DiagnosticKind::SharedTail { helper: name.clone() });
        self.helpers.insert(id, name.clone());
        self.pending.push(id);
        name
    }

    /// Report outgoing transitions the node cannot express
    fn check_transitions(&mut self, id: NodeId, handled: impl Fn(&TransitionLabel) -> bool) {
        let definition = self.definition;
        for transition in definition.outgoing(id) {
            if !handled(&transition.label) {
                self.emit(format!(
                    "// {}: unhandled '{}' transition",
                    definition.node(id).id,
                    transition.label
                ));
                self.diagnose(
                    id,
                    DiagnosticKind::UnhandledTransition {
                        label: transition.label.to_string(),
                    },
                );
            }
        }
    }

    fn compile_node(&mut self, id: NodeId, stop: Option<NodeId>) -> Flow {
        self.visited.insert(id);
        self.reached[id.0] = true;

        let definition = self.definition;
        let success = definition.successor(id, &TransitionLabel::Success);
        let is_success = |label: &TransitionLabel| *label == TransitionLabel::Success;

        match &definition.node(id).kind {
            NodeKind::Start { .. } | NodeKind::Join => {
                self.check_transitions(id, is_success);
                flow_to(success)
            }
            NodeKind::End { name } => {
                self.check_transitions(id, |_| false);
                match name {
                    Some(name) => self.emit(format!("return {};", js_string(name))),
                    None => self.emit("return;"),
                }
                Flow::Exited
            }
            NodeKind::Stop => {
                self.check_transitions(id, |_| false);
                self.emit("return;");
                Flow::Exited
            }
            NodeKind::Assign(pairs) => {
                self.check_transitions(id, is_success);
                if pairs.is_empty() {
                    self.emit(format!("// {}: no assignments", definition.node(id).id));
                }
                for (from, to) in pairs {
                    let target = transform_variable(to);
                    self.declare(&target);
                    self.emit(format!("{} = {};", target, transform_expression(from)));
                }
                flow_to(success)
            }
            NodeKind::Jump { target } => {
                self.check_transitions(id, |_| false);
                let url_utils = self.ctx.require_module(URL_UTILS_MODULE);
                self.emit(format!(
                    "response.redirect({}.url({}));",
                    url_utils,
                    js_string(target)
                ));
                self.emit("return;");
                Flow::Exited
            }
            NodeKind::Interaction { template } => {
                self.check_transitions(id, |_| false);
                let isml = self.ctx.require_module(ISML_MODULE);
                let locals = if self.locals.is_empty() {
                    "{}".to_string()
                } else {
                    let fields: Vec<String> =
                        self.locals.iter().map(|l| format!("{0}: {0}", l)).collect();
                    format!("{{ {} }}", fields.join(", "))
                };
                self.emit(format!(
                    "{}.renderTemplate({}, {});",
                    isml,
                    js_string(template),
                    locals
                ));
                self.emit("return;");
                Flow::Exited
            }
            NodeKind::Loop { element, iterator } => self.compile_for(id, element, iterator),
            NodeKind::Decision(decision) => self.compile_decision(id, decision, stop),
            NodeKind::Call { target } => self.compile_call(id, target, stop),
            NodeKind::Pipelet(_) => self.compile_pipelet(id),
        }
    }

    fn compile_while(&mut self, id: NodeId, stop: Option<NodeId>) -> Flow {
        self.emit("while (true) {");
        let opening_line = self.lines.len() - 1;
        self.ctx.push_indent();
        self.loops.push(OpenLoop {
            header: id,
            exit: stop,
            body_depth: self.ctx.indent(),
            opening_line,
            label: None,
            breaks: false,
        });

        match self.compile_node(id, stop) {
            Flow::Next(next) => {
                self.walk(Some(next), stop);
            }
            Flow::DeadEnd => self.emit("return;"),
            Flow::Exited => {}
        }

        let open = self.loops.pop();
        self.ctx.pop_indent();
        self.emit("}");

        match open {
            Some(open) if open.breaks => flow_to(stop),
            _ => Flow::Exited,
        }
    }

    fn compile_for(&mut self, id: NodeId, element: &str, iterator: &str) -> Flow {
        let definition = self.definition;
        self.check_transitions(id, |label| {
            *label == TransitionLabel::Success || label.is_named("do")
        });

        let body = definition
            .outgoing(id)
            .find(|t| t.label.is_named("do"))
            .map(|t| t.to);
        let exit = definition.successor(id, &TransitionLabel::Success);

        let element = transform_variable(element);
        self.declare(&element);
        self.emit(format!(
            "for ({} of {}) {{",
            element,
            transform_expression(iterator)
        ));
        let opening_line = self.lines.len() - 1;
        self.ctx.push_indent();
        self.loops.push(OpenLoop {
            header: id,
            exit,
            body_depth: self.ctx.indent(),
            opening_line,
            label: None,
            breaks: false,
        });

        if body.is_some() {
            self.walk(body, exit);
        }

        self.loops.pop();
        self.ctx.pop_indent();
        self.emit("}");
        flow_to(exit)
    }

    fn compile_decision(&mut self, id: NodeId, decision: &DecisionNode, stop: Option<NodeId>) -> Flow {
        let definition = self.definition;
        self.check_transitions(id, |label| {
            *label == TransitionLabel::Success || label.is_named("yes") || label.is_named("no")
        });

        let yes = definition
            .outgoing(id)
            .find(|t| t.label.is_named("yes"))
            .map(|t| t.to);
        let no = definition
            .outgoing(id)
            .find(|t| t.label.is_named("no"))
            .map(|t| t.to)
            .or_else(|| definition.successor(id, &TransitionLabel::Success));
        let condition = condition(decision);

        let (yes, no) = match (yes, no) {
            (None, None) => return Flow::DeadEnd,
            (Some(yes), None) => {
                self.guard_dead_end(&negate(&condition));
                return Flow::Next(yes);
            }
            (None, Some(no)) => {
                self.guard_dead_end(&condition);
                return Flow::Next(no);
            }
            (Some(yes), Some(no)) if yes == no => return Flow::Next(yes),
            (Some(yes), Some(no)) => (yes, no),
        };

        let merge = analysis::merge_point(definition, &[yes, no]);
        let branch_stop = merge.or(stop);

        let exited = if Some(yes) == branch_stop {
            self.branch(&format!("if ({}) {{", negate(&condition)), no, branch_stop);
            false
        } else if Some(no) == branch_stop {
            self.branch(&format!("if ({}) {{", condition), yes, branch_stop);
            false
        } else {
            let yes_exited = self.branch(&format!("if ({}) {{", condition), yes, branch_stop);
            self.lines.pop();
            let no_exited = self.branch("} else {", no, branch_stop);
            yes_exited && no_exited
        };

        if exited {
            Flow::Exited
        } else {
            flow_to(branch_stop)
        }
    }

    /// `<head>` + indented walk + `}`; returns whether the branch exited
    fn branch(&mut self, head: &str, from: NodeId, stop: Option<NodeId>) -> bool {
        self.emit(head);
        self.ctx.push_indent();
        let exited = self.walk(Some(from), stop);
        self.ctx.pop_indent();
        self.emit("}");
        exited
    }

    /// `if (<condition>) { return; }` for a branch with no target
    fn guard_dead_end(&mut self, condition: &str) {
        self.emit(format!("if ({}) {{", condition));
        self.ctx.push_indent();
        self.emit("return;");
        self.ctx.pop_indent();
        self.emit("}");
    }

    fn compile_call(&mut self, id: NodeId, target: &str, stop: Option<NodeId>) -> Flow {
        let definition = self.definition;
        let (pipeline, start) = match target.split_once('-') {
            Some((pipeline, start)) => (pipeline.trim(), start.trim()),
            None => (definition.name.as_str(), target.trim()),
        };
        let start = identifier(start);

        let local = pipeline == definition.name && self.entries.iter().any(|e| e.name == start);
        let callee = if local {
            format!("{}()", start)
        } else {
            let alias = identifier(pipeline);
            let path = format!("{}{}", self.config.controller_prefix, pipeline);
            self.ctx.require_as(&alias, &path);
            format!("{}.{}()", alias, start)
        };

        let success = definition.successor(id, &TransitionLabel::Success);
        let error = definition.successor(id, &TransitionLabel::Error);
        let exits: Vec<(String, NodeId)> = definition
            .outgoing(id)
            .filter_map(|t| match &t.label {
                TransitionLabel::Named(label) => Some((label.clone(), t.to)),
                _ => None,
            })
            .collect();

        if exits.is_empty() {
            return self.guarded(error, success, true, |this| this.emit(format!("{};", callee)));
        }

        self.results += 1;
        let result = format!("result{}", self.results);
        self.temps.push(result.clone());
        let statement = format!("{} = {};", result, callee);

        // Inside a loop the error path becomes the first arm of the chain
        let mut arms: Vec<(String, NodeId)> = Vec::new();
        match error {
            Some(error) if !self.loops.is_empty() => {
                let flag = self.flagged(|this| this.emit(&statement));
                arms.push((flag, error));
            }
            _ => {
                let resume = exits.first().map(|(_, to)| *to);
                self.guarded(error, resume, false, |this| this.emit(&statement));
            }
        }
        arms.extend(
            exits
                .iter()
                .map(|(label, to)| (format!("{} === {}", result, js_string(label)), *to)),
        );

        let mut targets: Vec<NodeId> = arms.iter().map(|(_, to)| *to).collect();
        targets.extend(success);
        let merge = analysis::merge_point(definition, &targets);
        let branch_stop = merge.or(stop);

        let mut exited = true;
        for (index, (condition, to)) in arms.iter().enumerate() {
            if index > 0 {
                self.lines.pop();
            }
            let keyword = if index == 0 { "if" } else { "} else if" };
            let head = format!("{} ({}) {{", keyword, condition);
            exited &= self.branch(&head, *to, branch_stop);
        }
        match success {
            Some(success) => {
                self.lines.pop();
                exited &= self.branch("} else {", success, branch_stop);
            }
            None => exited = false,
        }

        if exited {
            Flow::Exited
        } else {
            flow_to(branch_stop)
        }
    }

    fn compile_pipelet(&mut self, id: NodeId) -> Flow {
        let definition = self.definition;
        let NodeKind::Pipelet(pipelet) = &definition.node(id).kind else {
            return Flow::DeadEnd;
        };
        let mapping = registry::get_pipelet_mapping(&pipelet.pipelet_type);

        if !mapping.is_some_and(|m| m.is_transactional_for(pipelet)) {
            let error = self.handled_error(id);
            let success = definition.successor(id, &TransitionLabel::Success);
            return self.guarded(error, success, true, |this| {
                this.emit_pipelet(id);
            });
        }

        let run = self.transaction_run(id);
        let last = run.last().copied().unwrap_or(id);
        let error = self.handled_error(last);
        let success = definition.successor(last, &TransitionLabel::Success);
        self.guarded(error, success, true, |this| this.emit_transaction(&run))
    }

    /// `Transaction.wrap` around a run, or the bare placeholder comments when
    /// no statement of the run could be generated
    fn emit_transaction(&mut self, run: &[NodeId]) {
        let first_line = self.lines.len();
        self.ctx.push_indent();
        let mut emitted = false;
        for &node in run {
            emitted |= self.emit_pipelet(node);
        }
        self.ctx.pop_indent();

        if emitted {
            let transaction = self.ctx.require_module(TRANSACTION_MODULE);
            let opening = self.ctx.line(format!("{}.wrap(() => {{", transaction));
            self.lines.insert(first_line, opening);
            self.emit("});");
        } else {
            let unit = " ".repeat(self.config.indent_width);
            for line in &mut self.lines[first_line..] {
                if let Some(outdented) = line.strip_prefix(unit.as_str()) {
                    *line = outdented.to_string();
                }
            }
        }
    }

    /// Error successor of a pipelet that can take it; reports the others
    fn handled_error(&mut self, id: NodeId) -> Option<NodeId> {
        let definition = self.definition;
        let can_error = match &definition.node(id).kind {
            NodeKind::Pipelet(pipelet) => {
                registry::get_pipelet_mapping(&pipelet.pipelet_type).is_some_and(|m| m.can_error)
            }
            _ => false,
        };
        self.check_transitions(id, |label| {
            *label == TransitionLabel::Success || (*label == TransitionLabel::Error && can_error)
        });
        if can_error {
            definition.successor(id, &TransitionLabel::Error)
        } else {
            None
        }
    }

    /// Transactional pipelets chained to `first` by single `Success` edges
    fn transaction_run(&mut self, first: NodeId) -> Vec<NodeId> {
        let definition = self.definition;
        let mut run = vec![first];
        let mut current = first;

        loop {
            let mut outgoing = definition.outgoing(current);
            let (Some(transition), None) = (outgoing.next(), outgoing.next()) else {
                break;
            };
            let next = transition.to;
            if transition.label != TransitionLabel::Success
                || definition.in_degree(next) != 1
                || self.visited.contains(&next)
                || self.loop_headers.contains(&next)
                || self.loops.iter().any(|l| l.exit == Some(next) || l.header == next)
            {
                break;
            }
            let NodeKind::Pipelet(pipelet) = &definition.node(next).kind else {
                break;
            };
            let Some(mapping) = registry::get_pipelet_mapping(&pipelet.pipelet_type) else {
                break;
            };
            if !mapping.is_transactional_for(pipelet) {
                break;
            }
            // A failure handler belongs to its own node, so it starts a new run
            if mapping.can_error && definition.successor(next, &TransitionLabel::Error).is_some() {
                break;
            }

            self.visited.insert(next);
            self.reached[next.0] = true;
            run.push(next);
            current = next;
        }
        run
    }

    /// Emit `body`, wrapped in `try`/`catch` when an error successor exists,
    /// and return where compilation continues.
    ///
    /// The catch branch runs until it meets the normal path at `resume`. If
    /// the two paths join further down, the catch either jumps to the open
    /// loop owning the join, or calls the join as a helper. Inside a loop with
    /// `rejoin` set, a failure flag selects between both paths instead, so the
    /// join is compiled once in place.
    fn guarded(
        &mut self,
        error: Option<NodeId>,
        resume: Option<NodeId>,
        rejoin: bool,
        body: impl FnOnce(&mut Self),
    ) -> Flow {
        let Some(error) = error else {
            body(self);
            return flow_to(resume);
        };

        let bounds: HashSet<NodeId> = self
            .loops
            .iter()
            .flat_map(|l| std::iter::once(l.header).chain(l.exit))
            .collect();
        let merge = resume
            .and_then(|resume| analysis::merge_point_within(self.definition, &[error, resume], &bounds));
        let late_merge = merge.filter(|&m| Some(m) != resume);
        if let (Some(merge), Some(resume)) = (late_merge, resume) {
            if rejoin && !self.loops.is_empty() && self.open_loop_jump(merge).is_none() {
                return self.guarded_with_flag(error, resume, merge, body);
            }
        }

        self.emit("try {");
        self.ctx.push_indent();
        body(self);
        self.ctx.pop_indent();
        self.emit("} catch (e) {");
        self.ctx.push_indent();

        let exited = self.walk(Some(error), merge);
        if !exited {
            if let Some(merge) = late_merge {
                match self.open_loop_jump(merge) {
                    Some((keyword, index)) => self.loop_jump(keyword, index),
                    None => {
                        let helper = self.helper_for(merge);
                        self.emit(format!("return {}();", helper));
                    }
                }
            }
        }

        self.ctx.pop_indent();
        self.emit("}");
        flow_to(resume)
    }

    /// `failedN = false; try { body } catch (e) { failedN = true; }`.
    /// Returns the flag name.
    fn flagged(&mut self, body: impl FnOnce(&mut Self)) -> String {
        self.flags += 1;
        let flag = format!("failed{}", self.flags);
        self.temps.push(flag.clone());

        self.emit(format!("{} = false;", flag));
        self.emit("try {");
        self.ctx.push_indent();
        body(self);
        self.ctx.pop_indent();
        self.emit("} catch (e) {");
        self.ctx.push_indent();
        self.emit(format!("{} = true;", flag));
        self.ctx.pop_indent();
        self.emit("}");
        flag
    }

    /// [`Self::flagged`] followed by `if (failedN) { error path } else
    /// { normal path }` up to `merge`
    fn guarded_with_flag(
        &mut self,
        error: NodeId,
        resume: NodeId,
        merge: NodeId,
        body: impl FnOnce(&mut Self),
    ) -> Flow {
        let flag = self.flagged(body);
        let exited = if error == merge {
            self.branch(&format!("if (!{}) {{", flag), resume, Some(merge));
            false
        } else {
            let error_exited = self.branch(&format!("if ({}) {{", flag), error, Some(merge));
            self.lines.pop();
            let resume_exited = self.branch("} else {", resume, Some(merge));
            error_exited && resume_exited
        };

        if exited {
            Flow::Exited
        } else {
            Flow::Next(merge)
        }
    }

    /// `break` or `continue` reaching `id` from inside the open loops
    fn open_loop_jump(&self, id: NodeId) -> Option<(&'static str, usize)> {
        if let Some(index) = self.loops.iter().rposition(|l| l.exit == Some(id)) {
            return Some(("break", index));
        }
        self.loops
            .iter()
            .rposition(|l| l.header == id)
            .map(|index| ("continue", index))
    }

    /// Emit one pipelet statement. Returns false when only a placeholder
    /// comment could be written.
    fn emit_pipelet(&mut self, id: NodeId) -> bool {
        let definition = self.definition;
        let node = definition.node(id);
        let NodeKind::Pipelet(pipelet) = &node.kind else {
            return false;
        };
        self.visited.insert(id);
        self.reached[id.0] = true;

        for key in pipelet.duplicate_keys() {
            tracing::debug!("Node {} binds '{}' more than once", node.id, key);
            self.diagnose(id, DiagnosticKind::DuplicateBinding { key: key.to_string() });
        }

        match registry::generate_pipelet(pipelet, self.ctx) {
            Generated::Emitted(lines) => {
                self.lines.extend(lines);
                if let Some(mapping) = registry::get_pipelet_mapping(&pipelet.pipelet_type) {
                    for output in mapping.outputs {
                        if let Some(target) = pipelet.binding(output) {
                            self.declare(&transform_variable(target));
                        }
                    }
                }
                true
            }
            Generated::MissingParam { param, line } => {
                self.lines.push(line);
                self.diagnose(
                    id,
                    DiagnosticKind::MissingParameter {
                        pipelet: pipelet.pipelet_type.clone(),
                        param: param.to_string(),
                    },
                );
                false
            }
            Generated::Unmapped { line } => {
                tracing::warn!("Unsupported pipelet '{}' at node {}", pipelet.pipelet_type, node.id);
                self.lines.push(line);
                self.diagnose(
                    id,
                    DiagnosticKind::UnmappedPipelet {
                        pipelet: pipelet.pipelet_type.clone(),
                    },
                );
                false
            }
        }
    }
}
