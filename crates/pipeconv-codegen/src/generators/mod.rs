//! Per-primitive code generators
//!
//! Each generator reads its node's bindings, rewrites them through
//! [`crate::rewrite`], and returns fully indented JavaScript lines. A missing
//! required binding is reported as `Err(MissingParam)`; the registry turns that
//! into the placeholder comment.

pub mod catalog;
pub mod customer;
pub mod forms;
pub mod orders;
pub mod system;

use crate::context::GeneratorContext;
use crate::registry::PipeletMapping;
use crate::rewrite::{transform_expression, transform_variable};

/// Every registry group, in registration order
pub(crate) static ALL: &[&[PipeletMapping]] = &[
    orders::PIPELETS,
    customer::PIPELETS,
    forms::PIPELETS,
    catalog::PIPELETS,
    system::PIPELETS,
];

/// `<target> = <call>;`, or a bare `<call>;` when no output is bound
pub(crate) fn assign(ctx: &GeneratorContext, target: Option<&str>, call: &str) -> String {
    match target {
        Some(target) => ctx.line(format!("{} = {};", transform_variable(target), call)),
        None => ctx.line(format!("{};", call)),
    }
}

/// `<receiver>.<method>(<args>)` with every argument rewritten
pub(crate) fn method_call(receiver: &str, method: &str, args: &[&str]) -> String {
    let args: Vec<String> = args.iter().map(|a| transform_expression(a)).collect();
    format!(
        "{}.{}({})",
        transform_expression(receiver),
        method,
        args.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_with_and_without_target() {
        let ctx = GeneratorContext::default();
        assert_eq!(assign(&ctx, Some("Pipeline/Order"), "f()"), "Pipeline.Order = f();");
        assert_eq!(assign(&ctx, None, "f()"), "f();");
    }

    #[test]
    fn test_method_call_rewrites_arguments() {
        assert_eq!(
            method_call("CurrentForms/billing", "copyFrom", &["#Order/billingAddress#"]),
            "session.forms.billing.copyFrom(Order.billingAddress)"
        );
    }
}
