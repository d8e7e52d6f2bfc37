//! Order and basket pipelets

use super::{assign, method_call};
use crate::context::GeneratorContext;
use crate::ir::PipeletNodeIR;
use crate::registry::{GenResult, PipeletMapping};
use crate::rewrite::transform_expression;

const ORDER_MGR: &[&str] = &["dw/order/OrderMgr"];
const BASKET_MGR: &[&str] = &["dw/order/BasketMgr"];

pub(crate) const PIPELETS: &[PipeletMapping] = &[
    PipeletMapping {
        name: "GetOrder",
        required_imports: ORDER_MGR,
        outputs: &["Order"],
        can_error: true,
        transactional: false,
        generate: get_order,
    },
    PipeletMapping {
        name: "CreateOrder",
        required_imports: ORDER_MGR,
        outputs: &["Order"],
        can_error: true,
        transactional: true,
        generate: create_order,
    },
    PipeletMapping {
        name: "CreateOrderNo",
        required_imports: ORDER_MGR,
        outputs: &["OrderNo"],
        can_error: false,
        transactional: false,
        generate: create_order_no,
    },
    PipeletMapping {
        name: "PlaceOrder",
        required_imports: ORDER_MGR,
        outputs: &["Status"],
        can_error: true,
        transactional: true,
        generate: place_order,
    },
    PipeletMapping {
        name: "FailOrder",
        required_imports: ORDER_MGR,
        outputs: &["Status"],
        can_error: true,
        transactional: true,
        generate: fail_order,
    },
    PipeletMapping {
        name: "CancelOrder",
        required_imports: ORDER_MGR,
        outputs: &["Status"],
        can_error: true,
        transactional: true,
        generate: cancel_order,
    },
    PipeletMapping {
        name: "UndoFailOrder",
        required_imports: ORDER_MGR,
        outputs: &["Status"],
        can_error: true,
        transactional: true,
        generate: undo_fail_order,
    },
    PipeletMapping {
        name: "UndoCancelOrder",
        required_imports: ORDER_MGR,
        outputs: &["Status"],
        can_error: true,
        transactional: true,
        generate: undo_cancel_order,
    },
    PipeletMapping {
        name: "SetOrderStatus",
        required_imports: &[],
        outputs: &[],
        can_error: false,
        transactional: true,
        generate: set_order_status,
    },
    PipeletMapping {
        name: "SetExportStatus",
        required_imports: &[],
        outputs: &[],
        can_error: false,
        transactional: true,
        generate: set_export_status,
    },
    PipeletMapping {
        name: "SetPaymentStatus",
        required_imports: &[],
        outputs: &[],
        can_error: false,
        transactional: true,
        generate: set_payment_status,
    },
    PipeletMapping {
        name: "SetConfirmationStatus",
        required_imports: &[],
        outputs: &[],
        can_error: false,
        transactional: true,
        generate: set_confirmation_status,
    },
    PipeletMapping {
        name: "GetBasket",
        required_imports: BASKET_MGR,
        outputs: &["Basket"],
        can_error: true,
        transactional: true,
        generate: get_basket,
    },
    PipeletMapping {
        name: "AddProductToBasket",
        required_imports: &[],
        outputs: &["ProductLineItem"],
        can_error: true,
        transactional: true,
        generate: add_product_to_basket,
    },
    PipeletMapping {
        name: "RemoveProductLineItem",
        required_imports: &[],
        outputs: &[],
        can_error: false,
        transactional: true,
        generate: remove_product_line_item,
    },
    PipeletMapping {
        name: "CreatePaymentInstrument",
        required_imports: &[],
        outputs: &["PaymentInstrument"],
        can_error: true,
        transactional: true,
        generate: create_payment_instrument,
    },
    PipeletMapping {
        name: "RemovePaymentInstrument",
        required_imports: &[],
        outputs: &[],
        can_error: false,
        transactional: true,
        generate: remove_payment_instrument,
    },
];

fn get_order(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let order_no = node.require("OrderNo")?;
    let call = format!("OrderMgr.getOrder({})", transform_expression(order_no));
    Ok(vec![assign(ctx, node.binding("Order"), &call)])
}

fn create_order(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let basket = transform_expression(node.require("Basket")?);
    let call = match node.binding("OrderNo") {
        Some(order_no) => format!(
            "OrderMgr.createOrder({}, {})",
            basket,
            transform_expression(order_no)
        ),
        None => format!("OrderMgr.createOrder({})", basket),
    };
    Ok(vec![assign(ctx, node.binding("Order"), &call)])
}

fn create_order_no(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    Ok(vec![assign(
        ctx,
        node.binding("OrderNo"),
        "OrderMgr.createOrderNo()",
    )])
}

/// Shared shape of the `OrderMgr.<method>(<order>)` status transitions
fn order_mgr_call(node: &PipeletNodeIR, ctx: &GeneratorContext, method: &str) -> GenResult {
    let order = node.require("Order")?;
    let call = format!("OrderMgr.{}({})", method, transform_expression(order));
    Ok(vec![assign(ctx, node.binding("Status"), &call)])
}

fn place_order(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    order_mgr_call(node, ctx, "placeOrder")
}

fn fail_order(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    order_mgr_call(node, ctx, "failOrder")
}

fn cancel_order(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    order_mgr_call(node, ctx, "cancelOrder")
}

fn undo_fail_order(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    order_mgr_call(node, ctx, "undoFailOrder")
}

fn undo_cancel_order(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    order_mgr_call(node, ctx, "undoCancelOrder")
}

/// `<order>.<setter>(<status>);`
fn order_status_setter(node: &PipeletNodeIR, ctx: &GeneratorContext, setter: &str) -> GenResult {
    let order = node.require("Order")?;
    let status = node.require("Status")?;
    Ok(vec![ctx.line(format!(
        "{};",
        method_call(order, setter, &[status])
    ))])
}

fn set_order_status(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    order_status_setter(node, ctx, "setStatus")
}

fn set_export_status(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    order_status_setter(node, ctx, "setExportStatus")
}

fn set_payment_status(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    order_status_setter(node, ctx, "setPaymentStatus")
}

fn set_confirmation_status(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    order_status_setter(node, ctx, "setConfirmationStatus")
}

fn get_basket(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    Ok(vec![assign(
        ctx,
        node.binding("Basket"),
        "BasketMgr.getCurrentOrNewBasket()",
    )])
}

fn add_product_to_basket(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let basket = node.require("Basket")?;
    let product = node.require_any(&["ProductID", "Product"])?;
    let shipment = node
        .binding("Shipment")
        .map(transform_expression)
        .unwrap_or_else(|| format!("{}.defaultShipment", transform_expression(basket)));

    let call = format!(
        "{}.createProductLineItem({}, {})",
        transform_expression(basket),
        transform_expression(product),
        shipment
    );

    let mut lines = vec![assign(ctx, node.binding("ProductLineItem"), &call)];
    if let (Some(quantity), Some(item)) = (node.binding("Quantity"), node.binding("ProductLineItem")) {
        lines.push(ctx.line(format!(
            "{};",
            method_call(item, "setQuantityValue", &[quantity])
        )));
    }
    Ok(lines)
}

fn remove_product_line_item(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let basket = node.require("Basket")?;
    let item = node.require("ProductLineItem")?;
    Ok(vec![ctx.line(format!(
        "{};",
        method_call(basket, "removeProductLineItem", &[item])
    ))])
}

fn create_payment_instrument(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let container = node.require_any(&["LineItemCtnr", "Basket"])?;
    let method = node.require("PaymentMethodID")?;
    let amount = node
        .binding("Amount")
        .map(transform_expression)
        .unwrap_or_else(|| format!("{}.totalGrossPrice", transform_expression(container)));

    let call = format!(
        "{}.createPaymentInstrument({}, {})",
        transform_expression(container),
        transform_expression(method),
        amount
    );
    Ok(vec![assign(ctx, node.binding("PaymentInstrument"), &call)])
}

fn remove_payment_instrument(node: &PipeletNodeIR, ctx: &mut GeneratorContext) -> GenResult {
    let container = node.require_any(&["LineItemCtnr", "Basket"])?;
    let instrument = node.require("PaymentInstrument")?;
    Ok(vec![ctx.line(format!(
        "{};",
        method_call(container, "removePaymentInstrument", &[instrument])
    ))])
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
    fn test_get_order_with_output() {
        let node = PipeletNodeIR::new("GetOrder")
            .with_binding("OrderNo", "Pipeline/OrderNo")
            .with_binding("Order", "Order");
        let mut ctx = GeneratorContext::default();
        let generated = generate_pipelet(&node, &mut ctx);

        assert_eq!(
            generated,
            Generated::Emitted(vec!["Order = OrderMgr.getOrder(Pipeline.OrderNo);".to_string()])
        );
        assert_eq!(
            ctx.requires().get("OrderMgr").map(String::as_str),
            Some("dw/order/OrderMgr")
        );
    }

    #[test]
    fn test_get_order_bare_call() {
        let node = PipeletNodeIR::new("GetOrder").with_binding("OrderNo", "'00001'");
        assert_eq!(render(node), "OrderMgr.getOrder('00001');");
    }

    #[test]
    fn test_create_order_optional_order_no() {
        let node = PipeletNodeIR::new("CreateOrder")
            .with_binding("Basket", "Basket")
            .with_binding("Order", "Order");
        assert_eq!(render(node.clone()), "Order = OrderMgr.createOrder(Basket);");

        let node = node.with_binding("OrderNo", "OrderNo");
        assert_eq!(render(node), "Order = OrderMgr.createOrder(Basket, OrderNo);");
    }

    #[test]
    fn test_create_order_no() {
        let node = PipeletNodeIR::new("CreateOrderNo").with_binding("OrderNo", "OrderNo");
        assert_eq!(render(node), "OrderNo = OrderMgr.createOrderNo();");
    }

    #[test]
    fn test_order_status_transitions() {
        let node = PipeletNodeIR::new("PlaceOrder").with_binding("Order", "Order");
        assert_eq!(render(node), "OrderMgr.placeOrder(Order);");

        let node = PipeletNodeIR::new("FailOrder").with_binding("Order", "Order");
        assert_eq!(render(node), "OrderMgr.failOrder(Order);");

        let node = PipeletNodeIR::new("CancelOrder")
            .with_binding("Order", "Order")
            .with_binding("Status", "CancelStatus");
        assert_eq!(render(node), "CancelStatus = OrderMgr.cancelOrder(Order);");
    }

    #[test]
    fn test_set_export_status() {
        let node = PipeletNodeIR::new("SetExportStatus")
            .with_binding("Order", "Order")
            .with_binding("Status", "dw.order.Order.EXPORT_STATUS_READY");
        assert_eq!(
            render(node),
            "Order.setExportStatus(dw.order.Order.EXPORT_STATUS_READY);"
        );
    }

    #[test]
    fn test_add_product_defaults_to_default_shipment() {
        let node = PipeletNodeIR::new("AddProductToBasket")
            .with_binding("Basket", "Basket")
            .with_binding("Product", "Product")
            .with_binding("Quantity", "CurrentHttpParameterMap.Quantity.intValue")
            .with_binding("ProductLineItem", "ProductLineItem");
        assert_eq!(
            render(node),
            "ProductLineItem = Basket.createProductLineItem(Product, Basket.defaultShipment);\n\
             ProductLineItem.setQuantityValue(request.httpParameterMap.Quantity.intValue);"
        );
    }

    #[test]
    fn test_create_payment_instrument_default_amount() {
        let node = PipeletNodeIR::new("CreatePaymentInstrument")
            .with_binding("LineItemCtnr", "Basket")
            .with_binding("PaymentMethodID", "'CREDIT_CARD'");
        assert_eq!(
            render(node),
            "Basket.createPaymentInstrument('CREDIT_CARD', Basket.totalGrossPrice);"
        );
    }

    #[test]
    fn test_get_basket_registers_basket_mgr() {
        let mut ctx = GeneratorContext::default();
        let node = PipeletNodeIR::new("GetBasket").with_binding("Basket", "Basket");
        let code = generate_pipelet(&node, &mut ctx).into_code();
        assert_eq!(code, "Basket = BasketMgr.getCurrentOrNewBasket();");
        assert!(ctx.requires().contains_key("BasketMgr"));
    }
}
