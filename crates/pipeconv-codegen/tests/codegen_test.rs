use pipeconv_codegen::registry::{Generated, generate_pipelet};
use pipeconv_codegen::{Compiler, DiagnosticKind, GeneratorContext, Parser, PipeletNodeIR};
use rstest::rstest;

#[rstest]
#[case("GetOrder", &[], "OrderNo")]
#[case("CreateOrder", &[], "Basket")]
#[case("PlaceOrder", &[], "Order")]
#[case("FailOrder", &[], "Order")]
#[case("CancelOrder", &[], "Order")]
#[case("SetOrderStatus", &[("Order", "Order")], "Status")]
#[case("AddProductToBasket", &[("Basket", "Basket")], "ProductID")]
#[case("RemoveProductLineItem", &[], "Basket")]
#[case("CreatePaymentInstrument", &[("Basket", "Basket")], "PaymentMethodID")]
#[case("RemovePaymentInstrument", &[], "LineItemCtnr")]
#[case("GetCustomer", &[], "CustomerNo")]
#[case("CreateCustomer", &[("Login", "Login")], "Password")]
#[case("LoginCustomer", &[], "Login")]
#[case("GetCustomerAddress", &[], "AddressID")]
#[case("RemoveCustomerAddress", &[], "Address")]
#[case("SetCustomerPassword", &[], "Password")]
#[case("ClearFormElement", &[], "FormElement")]
#[case("InvalidateFormElement", &[], "FormElement")]
#[case("UpdateFormWithObject", &[], "Form")]
#[case("UpdateFormWithObject", &[("FormGroup", "CurrentForms.profile")], "Object")]
#[case("UpdateObjectWithForm", &[("Object", "Profile")], "Form")]
#[case("SetFormOptions", &[("FormField", "CurrentForms.country")], "Iterator")]
#[case("AcceptForm", &[("Form", "null")], "Form")]
#[case("GetProduct", &[], "ProductID")]
#[case("GetCategory", &[], "CategoryID")]
#[case("GetContent", &[], "ContentID")]
#[case("GetCustomObject", &[("Type", "'Store'")], "KeyValue")]
#[case("RemoveCustomObject", &[], "CustomObject")]
#[case("Script", &[("Basket", "Basket")], "ScriptFile")]
#[case("Eval", &[], "Expression")]
fn test_missing_parameter_comment(
    #[case] pipelet: &str,
    #[case] bindings: &[(&str, &str)],
    #[case] param: &str,
) {
    let mut node = PipeletNodeIR::new(pipelet);
    for (key, value) in bindings {
        node = node.with_binding(*key, *value);
    }

    let mut ctx = GeneratorContext::default();
    let generated = generate_pipelet(&node, &mut ctx);

    match generated {
        Generated::MissingParam { param: missing, line } => {
            assert_eq!(missing, param);
            assert_eq!(
                line,
                format!("// {}: missing {} parameter", pipelet, param)
            );
        }
        other => panic!("expected a missing parameter, got {:?}", other),
    }
    assert!(ctx.requires().is_empty());
}

#[test]
fn test_generation_is_deterministic() {
    let node = PipeletNodeIR::new("CreateOrder")
        .with_binding("Basket", "#Basket#")
        .with_binding("OrderNo", "Pipeline/OrderNo")
        .with_binding("Order", "Order");

    let mut first = GeneratorContext::default();
    let mut second = GeneratorContext::default();
    assert_eq!(
        generate_pipelet(&node, &mut first),
        generate_pipelet(&node, &mut second)
    );
    assert_eq!(first.requires(), second.requires());
}

#[test]
fn test_yaml_document_end_to_end() {
    let yaml = r##"
name: COSummary
description: Order summary and submission
nodes:
  - { id: start, type: start, name: Submit }
  - id: basket
    type: pipelet
    pipelet: GetBasket
    bindings:
      - { key: Basket, value: Basket }
  - id: create
    type: pipelet
    pipelet: CreateOrder
    bindings:
      - { key: Basket, value: "#Basket#" }
      - { key: Order, value: Order }
  - id: place
    type: pipelet
    pipelet: PlaceOrder
    bindings:
      - { key: Order, value: Order }
  - id: clear
    type: pipelet
    pipelet: ClearFormElement
    bindings:
      - { key: FormElement, value: CurrentForms/billing }
  - { id: confirm, type: interaction, template: checkout/confirmation }
  - { id: failed, type: jump, target: COSummary-Start }
  - { id: legacy, type: pipelet, pipelet: SendMail }
transitions:
  - { from: start, to: basket }
  - { from: basket, to: create }
  - { from: create, to: place }
  - { from: place, to: clear }
  - { from: place, to: failed, label: error }
  - { from: clear, to: confirm }
"##;
    let definition = Parser::new().parse_yaml(yaml).unwrap();
    let module = Compiler::default().compile(&definition);

    let expected_body = [
        "function Submit() {",
        "    var Basket, Order;",
        "    Transaction.wrap(() => {",
        "        Basket = BasketMgr.getCurrentOrNewBasket();",
        "        Order = OrderMgr.createOrder(Basket);",
        "    });",
        "    try {",
        "        Transaction.wrap(() => {",
        "            OrderMgr.placeOrder(Order);",
        "        });",
        "    } catch (e) {",
        "        response.redirect(URLUtils.url('COSummary-Start'));",
        "        return;",
        "    }",
        "    session.forms.billing.clearFormElement();",
        "    ISML.renderTemplate('checkout/confirmation', { Basket: Basket, Order: Order });",
        "    return;",
        "}",
    ]
    .join("\n");
    assert!(
        module.code.contains(&expected_body),
        "unexpected output:\n{}",
        module.code
    );

    let imports = [
        "var BasketMgr = require('dw/order/BasketMgr');",
        "var ISML = require('dw/template/ISML');",
        "var OrderMgr = require('dw/order/OrderMgr');",
        "var Transaction = require('dw/system/Transaction');",
        "var URLUtils = require('dw/web/URLUtils');",
    ]
    .join("\n");
    assert!(module.code.contains(&imports));
    assert!(module.code.contains("// Order summary and submission"));
    assert!(module.code.contains("exports.Submit.public = true;"));

    assert!(module.code.contains("// legacy: unreachable from any start node"));
    assert!(
        module
            .diagnostics
            .iter()
            .any(|d| d.node.as_deref() == Some("legacy") && d.kind == DiagnosticKind::UnreachableNode)
    );
    assert!(!module.has_errors());
}
