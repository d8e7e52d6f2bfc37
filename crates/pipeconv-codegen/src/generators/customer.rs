//! Customer account pipelets

use super::{assign, method_call};
use crate::context::GeneratorContext;
use crate::ir::PipeletNodeIR;
use crate::registry::{GenResult, PipeletMapping};
use crate::rewrite::transform_expression;

const CUSTOMER_MGR: &[&str] = &["dw/customer/CustomerMgr"];

pub(crate) const PIPELETS: &[PipeletMapping] = &[
    PipeletMapping {
        name: "GetCustomer",
        required_imports: CUSTOMER_MGR,
        outputs: &["Customer"],
        can_error: true,
        transactional: false,
        generate: get_customer,
    },
    PipeletMapping {
        name: "CreateCustomer",
        required_imports: CUSTOMER_MGR,
        outputs: &["Customer"],
        can_error: true,
        transactional: true,
        generate: create_customer,
    },
    PipeletMapping {
        name: "LoginCustomer",
        required_imports: CUSTOMER_MGR,
        outputs: &["Customer"],
        can_error: true,
        transactional: true,
        generate: login_customer,
    },
    PipeletMapping {
        name: "LogoutCustomer",
        required_imports: CUSTOMER_MGR,
        outputs: &[],
        can_error: false,
        transactional: false,
        generate: logout_customer,
    },
    PipeletMapping {
        name: "GetCustomerAddress",
        required_imports: &[],
        outputs: &["CustomerAddress"],
        can_error: true,
        transactional: false,
        generate: get_customer_address,
    },
    PipeletMapping {
        name: "CreateCustomerAddress",
        required_imports: &[],
        outputs: &["Address"],
        can_error: true,
        transactional: true,
        generate: create_customer_address,
    },
    PipeletMapping {
        name: "RemoveCustomerAddress",
        required_imports: &[],
        outputs: &[],
        can_error: false,
        transactional: true,
        generate: remove_customer_address,
    },
    PipeletMapping {
        name: "SetCustomerPassword",
        required_imports: &[],
        outputs: &[],
        can_error: true,
        transactional: true,
        generate: set_customer_password,
    },
];

/// Address book of the bound customer, or of the session customer
fn address_book(node: &PipeletNodeIR) -> String {
    let customer = node
        .binding("Customer")
        .map(transform_expression)
        .unwrap_or_else(|| "customer".to_string());
    format!("{}.getProfile().getAddressBook()", customer)
}

fn get_customer(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let call = match node.binding("Login") {
        Some(login) if node.binding("CustomerNo").is_none() => {
            format!("CustomerMgr.getCustomerByLogin({})", transform_expression(login))
        }
        _ => format!(
            "CustomerMgr.getCustomerByCustomerNumber({})",
            transform_expression(node.require("CustomerNo")?)
        ),
    };
    Ok(vec![assign(ctx, node.binding("Customer"), &call)])
}

fn create_customer(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let login = node.require("Login")?;
    let password = node.require("Password")?;
    let call = format!(
        "CustomerMgr.createCustomer({}, {})",
        transform_expression(login),
        transform_expression(password)
    );
    Ok(vec![assign(ctx, node.binding("Customer"), &call)])
}

fn login_customer(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let login = node.require("Login")?;
    let password = node.require("Password")?;
    let remember_me = node
        .binding("RememberMe")
        .map(transform_expression)
        .unwrap_or_else(|| "false".to_string());
    let call = format!(
        "CustomerMgr.loginCustomer({}, {}, {})",
        transform_expression(login),
        transform_expression(password),
        remember_me
    );
    Ok(vec![assign(ctx, node.binding("Customer"), &call)])
}

fn logout_customer(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let remember_me = node
        .binding("RememberMe")
        .map(transform_expression)
        .unwrap_or_else(|| "false".to_string());
    Ok(vec![ctx.line(format!(
        "CustomerMgr.logoutCustomer({});",
        remember_me
    ))])
}

fn get_customer_address(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let address_id = node.require("AddressID")?;
    let call = format!(
        "{}.getAddress({})",
        address_book(node),
        transform_expression(address_id)
    );
    Ok(vec![assign(ctx, node.binding("CustomerAddress"), &call)])
}

fn create_customer_address(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let address_id = node.require("AddressID")?;
    let call = format!(
        "{}.createAddress({})",
        address_book(node),
        transform_expression(address_id)
    );
    Ok(vec![assign(ctx, node.binding("Address"), &call)])
}

fn remove_customer_address(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let address = node.require_any(&["Address", "CustomerAddress"])?;
    Ok(vec![ctx.line(format!(
        "{}.removeAddress({});",
        address_book(node),
        transform_expression(address)
    ))])
}

fn set_customer_password(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let password = node.require("Password")?;
    let old_password = node.require("OldPassword")?;
    let customer = node.binding("Customer").unwrap_or("CurrentCustomer");
    let credentials = format!("{}.profile.credentials", transform_expression(customer));
    Ok(vec![ctx.line(format!(
        "{};",
        method_call(&credentials, "setPassword", &[password, old_password, "true"])
    ))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::generate_pipelet;

    fn render(node: PipeletNodeIR) -> String {
        let mut ctx = GeneratorContext::default();
        generate_pipelet(&node, &mut ctx).into_code()
    }

    #[test]
    fn test_get_customer_by_number_or_login() {
        let node = PipeletNodeIR::new("GetCustomer")
            .with_binding("CustomerNo", "Pipeline/CustomerNo")
            .with_binding("Customer", "Customer");
        assert_eq!(
            render(node),
            "Customer = CustomerMgr.getCustomerByCustomerNumber(Pipeline.CustomerNo);"
        );

        let node = PipeletNodeIR::new("GetCustomer").with_binding("Login", "Login");
        assert_eq!(render(node), "CustomerMgr.getCustomerByLogin(Login);");
    }

    #[test]
    fn test_login_customer_defaults_remember_me() {
        let node = PipeletNodeIR::new("LoginCustomer")
            .with_binding("Login", "CurrentForms.login.username.value")
            .with_binding("Password", "CurrentForms.login.password.value")
            .with_binding("Customer", "TempCustomer");
        assert_eq!(
            render(node),
            "TempCustomer = CustomerMgr.loginCustomer(session.forms.login.username.value, \
             session.forms.login.password.value, false);"
        );
    }

    #[test]
    fn test_logout_customer_needs_no_bindings() {
        assert_eq!(
            render(PipeletNodeIR::new("LogoutCustomer")),
            "CustomerMgr.logoutCustomer(false);"
        );
    }

    #[test]
    fn test_address_book_defaults_to_session_customer() {
        let node = PipeletNodeIR::new("CreateCustomerAddress")
            .with_binding("AddressID", "'home'")
            .with_binding("Address", "Address");
        assert_eq!(
            render(node),
            "Address = customer.getProfile().getAddressBook().createAddress('home');"
        );
    }

    #[test]
    fn test_set_customer_password() {
        let node = PipeletNodeIR::new("SetCustomerPassword")
            .with_binding("Password", "NewPassword")
            .with_binding("OldPassword", "OldPassword");
        assert_eq!(
            render(node),
            "customer.profile.credentials.setPassword(NewPassword, OldPassword, true);"
        );
    }
}
