//! Form handling pipelets
//!
//! Form pipelets operate on form objects reachable from the session, so none
//! of them needs an import. `Form` is always checked before `FormGroup`.

use super::method_call;
use crate::context::GeneratorContext;
use crate::ir::PipeletNodeIR;
use crate::registry::{GenResult, PipeletMapping};

const FORM_KEYS: &[&str] = &["Form", "FormGroup"];

pub(crate) const PIPELETS: &[PipeletMapping] = &[
    PipeletMapping {
        name: "ClearFormElement",
        required_imports: &[],
        outputs: &[],
        can_error: false,
        transactional: false,
        generate: clear_form_element,
    },
    PipeletMapping {
        name: "InvalidateFormElement",
        required_imports: &[],
        outputs: &[],
        can_error: false,
        transactional: false,
        generate: invalidate_form_element,
    },
    PipeletMapping {
        name: "UpdateFormWithObject",
        required_imports: &[],
        outputs: &[],
        can_error: true,
        transactional: false,
        generate: update_form_with_object,
    },
    PipeletMapping {
        name: "UpdateObjectWithForm",
        required_imports: &[],
        outputs: &[],
        can_error: true,
        transactional: true,
        generate: update_object_with_form,
    },
    PipeletMapping {
        name: "SetFormOptions",
        required_imports: &[],
        outputs: &[],
        can_error: false,
        transactional: false,
        generate: set_form_options,
    },
    PipeletMapping {
        name: "AcceptForm",
        required_imports: &[],
        outputs: &[],
        can_error: false,
        transactional: false,
        generate: accept_form,
    },
];

fn clear_form_element(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let element = node.require("FormElement")?;
    Ok(vec![ctx.line(format!("{};", method_call(element, "clearFormElement", &[])))])
}

fn invalidate_form_element(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let element = node.require("FormElement")?;
    Ok(vec![ctx.line(format!(
        "{};",
        method_call(element, "invalidateFormElement", &[])
    ))])
}

fn update_form_with_object(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let form = node.require_any(FORM_KEYS)?;
    let object = node.require("Object")?;
    Ok(vec![ctx.line(format!("{};", method_call(form, "copyFrom", &[object])))])
}

fn update_object_with_form(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let form = node.require_any(FORM_KEYS)?;
    let object = node.require("Object")?;
    Ok(vec![ctx.line(format!("{};", method_call(form, "copyTo", &[object])))])
}

fn set_form_options(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let field = node.require("FormField")?;
    let options = node.require_any(&["Iterator", "Options"])?;
    Ok(vec![ctx.line(format!("{};", method_call(field, "setOptions", &[options])))])
}

fn accept_form(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let form = node.require_any(FORM_KEYS)?;
    Ok(vec![ctx.line(format!("{};", method_call(form, "accept", &[])))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Generated, generate_pipelet};

    fn render(node: PipeletNodeIR) -> String {
        let mut ctx = GeneratorContext::default();
        generate_pipelet(&node, &mut ctx).into_code()
    }

    #[test]
    fn test_clear_form_element() {
        let node = PipeletNodeIR::new("ClearFormElement")
            .with_binding("FormElement", "CurrentForms/billing");
        assert_eq!(render(node), "session.forms.billing.clearFormElement();");
    }

    #[test]
    fn test_clear_form_element_missing() {
        let mut ctx = GeneratorContext::default();
        let generated = generate_pipelet(&PipeletNodeIR::new("ClearFormElement"), &mut ctx);
        assert_eq!(
            generated,
            Generated::MissingParam {
                param: "FormElement",
                line: "// ClearFormElement: missing FormElement parameter".to_string(),
            }
        );
        assert!(ctx.requires().is_empty());
    }

    #[test]
    fn test_update_form_with_object_prefers_form() {
        let node = PipeletNodeIR::new("UpdateFormWithObject")
            .with_binding("FormGroup", "CurrentForms.group")
            .with_binding("Form", "CurrentForms.profile")
            .with_binding("Object", "Customer.profile");
        assert_eq!(
            render(node),
            "session.forms.profile.copyFrom(Customer.profile);"
        );
    }

    #[test]
    fn test_update_object_with_form_accepts_form_group() {
        let node = PipeletNodeIR::new("UpdateObjectWithForm")
            .with_binding("FormGroup", "CurrentForms.address")
            .with_binding("Object", "Address");
        assert_eq!(render(node), "session.forms.address.copyTo(Address);");
    }

    #[test]
    fn test_set_form_options_synonyms() {
        let node = PipeletNodeIR::new("SetFormOptions")
            .with_binding("FormField", "CurrentForms.address.country")
            .with_binding("Options", "Countries");
        assert_eq!(
            render(node),
            "session.forms.address.country.setOptions(Countries);"
        );
    }

    #[test]
    fn test_accept_form() {
        let node = PipeletNodeIR::new("AcceptForm").with_binding("Form", "CurrentForms.cart");
        assert_eq!(render(node), "session.forms.cart.accept();");
    }
}
