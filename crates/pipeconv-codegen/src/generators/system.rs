//! Script and expression pipelets
//!
//! `Script` is the only primitive whose import is not fixed in the registry:
//! the module path comes from the node's `ScriptFile` configuration.

use crate::context::GeneratorContext;
use crate::ir::{MissingParam, PipeletNodeIR};
use crate::registry::{GenResult, PipeletMapping};
use crate::rewrite::{transform_expression, transform_variable};

/// Binding key that receives the script's return value
const SCRIPT_RESULT: &str = "Result";

pub(crate) const PIPELETS: &[PipeletMapping] = &[
    PipeletMapping {
        name: "Script",
        required_imports: &[],
        outputs: &[SCRIPT_RESULT],
        can_error: true,
        transactional: false,
        generate: script,
    },
    PipeletMapping {
        name: "Eval",
        required_imports: &[],
        outputs: &[],
        can_error: false,
        transactional: false,
        generate: eval,
    },
];

/// Module path for a `ScriptFile` value.
///
/// `cartridge:path/File.ds` resolves into that cartridge's scripts folder,
/// an unqualified path into the current cartridge's.
pub(crate) fn script_module_path(script_file: &str) -> String {
    let script_file = script_file.trim();
    let without_ext = match script_file.rsplit_once('.') {
        Some((stem, ext)) if !ext.contains('/') => stem,
        _ => script_file,
    };
    match without_ext.split_once(':') {
        Some((cartridge, path)) => format!(
            "{}/cartridge/scripts/{}",
            cartridge,
            path.trim_start_matches('/')
        ),
        None => format!("~/cartridge/scripts/{}", without_ext.trim_start_matches('/')),
    }
}

fn script(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let script_file = node.config("ScriptFile").ok_or_else(|| MissingParam {
        pipelet: node.pipelet_type.clone(),
        param: "ScriptFile",
    })?;
    let alias = ctx.require_module(&script_module_path(script_file));

    let args: Vec<String> = node
        .key_bindings
        .iter()
        .filter(|b| b.key != SCRIPT_RESULT)
        .filter(|b| node.binding(&b.key) == Some(b.value.as_str()))
        .map(|b| format!("{}: {}", b.key, transform_expression(&b.value)))
        .collect();
    let call = if args.is_empty() {
        format!("{}.execute({{}})", alias)
    } else {
        format!("{}.execute({{ {} }})", alias, args.join(", "))
    };

    let line = match node.binding(SCRIPT_RESULT) {
        Some(target) => format!("{} = {};", transform_variable(target), call),
        None => format!("{};", call),
    };
    Ok(vec![ctx.line(line)])
}

fn eval(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let expression = node.require("Expression")?;
    Ok(vec![ctx.line(format!("{};", transform_expression(expression)))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Generated, generate_pipelet};

    #[test]
    fn test_script_module_path() {
        assert_eq!(
            script_module_path("app_storefront:checkout/ValidateCart.ds"),
            "app_storefront/cartridge/scripts/checkout/ValidateCart"
        );
        assert_eq!(
            script_module_path("cart/Calculate.js"),
            "~/cartridge/scripts/cart/Calculate"
        );
    }

    #[test]
    fn test_script_registers_its_module() {
        let mut ctx = GeneratorContext::default();
        let node = PipeletNodeIR::new("Script")
            .with_config("ScriptFile", "app_storefront:checkout/ValidateCart.ds")
            .with_binding("Basket", "Basket")
            .with_binding("Basket", "OtherBasket")
            .with_binding("ValidateTax", "true")
            .with_binding("Result", "Pipeline/ValidationResult");
        assert_eq!(
            generate_pipelet(&node, &mut ctx).into_code(),
            "Pipeline.ValidationResult = ValidateCart.execute({ Basket: Basket, ValidateTax: true });"
        );
        assert_eq!(
            ctx.requires().get("ValidateCart").map(String::as_str),
            Some("app_storefront/cartridge/scripts/checkout/ValidateCart")
        );
    }

    #[test]
    fn test_script_without_file() {
        let mut ctx = GeneratorContext::default();
        let generated = generate_pipelet(&PipeletNodeIR::new("Script"), &mut ctx);
        assert_eq!(
            generated,
            Generated::MissingParam {
                param: "ScriptFile",
                line: "// Script: missing ScriptFile parameter".to_string(),
            }
        );
        assert!(ctx.requires().is_empty());
    }

    #[test]
    fn test_eval() {
        let mut ctx = GeneratorContext::default();
        let node = PipeletNodeIR::new("Eval").with_binding("Expression", "CurrentSession.custom.step = 2");
        assert_eq!(
            generate_pipelet(&node, &mut ctx).into_code(),
            "session.custom.step = 2;"
        );
    }
}
