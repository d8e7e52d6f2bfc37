//! Catalog, content and custom object pipelets

use super::assign;
use crate::context::GeneratorContext;
use crate::ir::PipeletNodeIR;
use crate::registry::{GenResult, PipeletMapping};
use crate::rewrite::transform_expression;

const CUSTOM_OBJECT_MGR: &[&str] = &["dw/object/CustomObjectMgr"];

pub(crate) const PIPELETS: &[PipeletMapping] = &[
    PipeletMapping {
        name: "GetProduct",
        required_imports: &["dw/catalog/ProductMgr"],
        outputs: &["Product"],
        can_error: true,
        transactional: false,
        generate: get_product,
    },
    PipeletMapping {
        name: "GetCategory",
        required_imports: &["dw/catalog/CatalogMgr"],
        outputs: &["Category"],
        can_error: true,
        transactional: false,
        generate: get_category,
    },
    PipeletMapping {
        name: "GetContent",
        required_imports: &["dw/content/ContentMgr"],
        outputs: &["Content"],
        can_error: true,
        transactional: false,
        generate: get_content,
    },
    PipeletMapping {
        name: "GetCustomObject",
        required_imports: CUSTOM_OBJECT_MGR,
        outputs: &["CustomObject"],
        can_error: true,
        transactional: false,
        generate: get_custom_object,
    },
    PipeletMapping {
        name: "CreateCustomObject",
        required_imports: CUSTOM_OBJECT_MGR,
        outputs: &["CustomObject"],
        can_error: true,
        transactional: true,
        generate: create_custom_object,
    },
    PipeletMapping {
        name: "RemoveCustomObject",
        required_imports: CUSTOM_OBJECT_MGR,
        outputs: &[],
        can_error: false,
        transactional: true,
        generate: remove_custom_object,
    },
];

fn get_product(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let id = node.require("ProductID")?;
    let call = format!("ProductMgr.getProduct({})", transform_expression(id));
    Ok(vec![assign(ctx, node.binding("Product"), &call)])
}

fn get_category(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let id = node.require("CategoryID")?;
    let call = format!("CatalogMgr.getCategory({})", transform_expression(id));
    Ok(vec![assign(ctx, node.binding("Category"), &call)])
}

fn get_content(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let id = node.require("ContentID")?;
    let call = format!("ContentMgr.getContent({})", transform_expression(id));
    Ok(vec![assign(ctx, node.binding("Content"), &call)])
}

fn custom_object_call(node: &PipeletNodeIR, ctx: &GeneratorContext, method: &str) -> GenResult {
    let object_type = node.require("Type")?;
    let key = node.require("KeyValue")?;
    let call = format!(
        "CustomObjectMgr.{}({}, {})",
        method,
        transform_expression(object_type),
        transform_expression(key)
    );
    Ok(vec![assign(ctx, node.binding("CustomObject"), &call)])
}

fn get_custom_object(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    custom_object_call(node, ctx, "getCustomObject")
}

fn create_custom_object(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    custom_object_call(node, ctx, "createCustomObject")
}

fn remove_custom_object(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let object = node.require("CustomObject")?;
    Ok(vec![ctx.line(format!(
        "CustomObjectMgr.remove({});",
        transform_expression(object)
    ))])
}
