//! Per-compilation generator state
//!
//! A [`GeneratorContext`] is created for one pipeline, threaded by reference
//! through every generator call, and dropped once the module is assembled.
//! Generators read the indentation and register imports; only the compiler
//! changes the nesting depth.

use std::collections::BTreeMap;

/// Two module paths claiming the same import alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConflict {
    /// Contested alias
    pub alias: String,
    /// Path registered first (and kept)
    pub existing: String,
    /// Path that was rejected
    pub requested: String,
}

/// Mutable state shared by all generators of one compilation
#[derive(Debug, Clone)]
pub struct GeneratorContext {
    indent: usize,
    indent_unit: String,
    requires: BTreeMap<String, String>,
    conflicts: Vec<ImportConflict>,
}

impl Default for GeneratorContext {
    fn default() -> Self {
        Self::new(4)
    }
}

impl GeneratorContext {
    /// Create a context indenting by `indent_width` spaces per level
    pub fn new(indent_width: usize) -> Self {
        Self {
            indent: 0,
            indent_unit: " ".repeat(indent_width),
            requires: BTreeMap::new(),
            conflicts: Vec::new(),
        }
    }

    /// Current nesting depth
    pub fn indent(&self) -> usize {
        self.indent
    }

    /// Prefix `text` with the current indentation
    pub fn line(&self, text: impl AsRef<str>) -> String {
        format!("{}{}", self.indent_unit.repeat(self.indent), text.as_ref())
    }

    /// Register an import under the conventional alias (last path segment)
    pub fn require_module(&mut self, path: &str) -> String {
        let alias = alias_for(path);
        self.require_as(&alias, path);
        alias
    }

    /// Register an import under an explicit alias.
    ///
    /// Re-registering the same pair is a no-op. A different path for an
    /// existing alias keeps the first registration and records a conflict.
    pub fn require_as(&mut self, alias: &str, path: &str) {
        match self.requires.get(alias) {
            Some(existing) if existing == path => {}
            Some(existing) => {
                tracing::warn!(
                    "Import alias '{}' already bound to '{}', ignoring '{}'",
                    alias,
                    existing,
                    path
                );
                let conflict = ImportConflict {
                    alias: alias.to_string(),
                    existing: existing.clone(),
                    requested: path.to_string(),
                };
                if !self.conflicts.contains(&conflict) {
                    self.conflicts.push(conflict);
                }
            }
            None => {
                self.requires.insert(alias.to_string(), path.to_string());
            }
        }
    }

    /// Registered imports, ordered by alias
    pub fn requires(&self) -> &BTreeMap<String, String> {
        &self.requires
    }

    /// Alias conflicts recorded so far
    pub fn conflicts(&self) -> &[ImportConflict] {
        &self.conflicts
    }

    pub(crate) fn push_indent(&mut self) {
        self.indent += 1;
    }

    pub(crate) fn pop_indent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }
}

/// Conventional alias of a module path: its last segment without extension
pub fn alias_for(path: &str) -> String {
    let last = path
        .rsplit(['/', ':'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(path);
    let stem = last.split('.').next().unwrap_or(last);

    let mut alias: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if alias.is_empty() || alias.starts_with(|c: char| c.is_ascii_digit()) {
        alias.insert(0, '_');
    }
    alias
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_uses_indentation() {
        let mut ctx = GeneratorContext::new(2);
        assert_eq!(ctx.line("x;"), "x;");
        ctx.push_indent();
        ctx.push_indent();
        assert_eq!(ctx.line("x;"), "    x;");
        ctx.pop_indent();
        assert_eq!(ctx.indent(), 1);
    }

    #[test]
    fn test_pop_indent_saturates() {
        let mut ctx = GeneratorContext::default();
        ctx.pop_indent();
        assert_eq!(ctx.indent(), 0);
    }

    #[test]
    fn test_require_module_dedupes() {
        let mut ctx = GeneratorContext::default();
        assert_eq!(ctx.require_module("dw/order/OrderMgr"), "OrderMgr");
        ctx.require_module("dw/order/OrderMgr");
        assert_eq!(ctx.requires().len(), 1);
        assert!(ctx.conflicts().is_empty());
    }

    #[test]
    fn test_conflicting_alias_is_recorded() {
        let mut ctx = GeneratorContext::default();
        ctx.require_as("Transaction", "dw/system/Transaction");
        ctx.require_as("Transaction", "~/cartridge/controllers/Transaction");

        assert_eq!(
            ctx.requires().get("Transaction").map(String::as_str),
            Some("dw/system/Transaction")
        );
        assert_eq!(ctx.conflicts().len(), 1);
        assert_eq!(ctx.conflicts()[0].requested, "~/cartridge/controllers/Transaction");
    }

    #[test]
    fn test_alias_for() {
        assert_eq!(alias_for("dw/order/OrderMgr"), "OrderMgr");
        assert_eq!(alias_for("app_storefront:checkout/Validate-Cart.ds"), "Validate_Cart");
        assert_eq!(alias_for("~/cartridge/controllers/COBilling"), "COBilling");
        assert_eq!(alias_for("scripts/3dsecure.js"), "_3dsecure");
    }
}
