//! End-to-end order flows against the in-memory store.

mod common;

use rust_decimal_macros::dec;

use common::Fixture;
use stockflow_core::{DomainError, ErrorKind, OrderItemId};
use stockflow_infra::{
    TransactionFilter,
    services::{AddPurchaseItem, AddSalesItem, FulfillRequest, ReceiveRequest},
};
use stockflow_inventory::TransactionType;
use stockflow_purchasing::{PurchaseOrderStatus, ReceiptLine};
use stockflow_sales::{FulfillmentLine, SalesOrderStatus};

fn receipt(item: OrderItemId, quantity: i64) -> ReceiveRequest {
    ReceiveRequest {
        items: vec![ReceiptLine {
            item_id: item,
            quantity_received: quantity,
            location_id: None,
        }],
        notes: None,
    }
}

fn fulfillment(lines: &[(OrderItemId, i64)]) -> FulfillRequest {
    FulfillRequest {
        items: lines
            .iter()
            .map(|(item, quantity)| FulfillmentLine {
                item_id: *item,
                quantity_fulfilled: *quantity,
                location_id: None,
            })
            .collect(),
        shipping_date: None,
        notes: None,
    }
}

#[test]
fn purchase_order_receives_partially_then_completely() {
    let fx = Fixture::new();
    let product = fx.product("BOLT-10");

    let po = fx
        .service
        .create_purchase_order(fx.actor, fx.new_purchase_order())
        .unwrap();
    assert_eq!(po.order_number(), "PO-000001");
    let po = fx
        .service
        .add_purchase_order_item(
            fx.actor,
            po.id_typed(),
            AddPurchaseItem {
                product_id: product,
                quantity: 10,
                unit_price: None,
            },
        )
        .unwrap();
    assert_eq!(po.total_amount(), dec!(25.00));
    let item = po.items()[0].id;
    fx.service.submit_purchase_order(fx.actor, po.id_typed()).unwrap();

    let po = fx
        .service
        .receive_purchase_order(fx.actor, po.id_typed(), receipt(item, 6))
        .unwrap();
    assert_eq!(po.status(), PurchaseOrderStatus::Partial);
    assert_eq!(fx.on_hand(product), 6);

    let po = fx
        .service
        .receive_purchase_order(fx.actor, po.id_typed(), receipt(item, 4))
        .unwrap();
    assert_eq!(po.status(), PurchaseOrderStatus::Received);
    assert_eq!(po.items()[0].received_quantity, 10);
    assert_eq!(fx.on_hand(product), 10);
    assert_eq!(fx.service.received_to_date(po.id_typed(), item).unwrap(), 10);

    let entries = fx
        .service
        .transactions(&TransactionFilter {
            reference_number: Some("PO-000001".into()),
            ..TransactionFilter::default()
        })
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| {
        e.transaction.transaction_type() == TransactionType::Receive
            && e.transaction.details.notes == "Received from purchase order: PO-000001"
    }));
}

#[test]
fn receiving_more_than_remaining_changes_nothing() {
    let fx = Fixture::new();
    let product = fx.product("BOLT-10");
    let po = fx
        .service
        .create_purchase_order(fx.actor, fx.new_purchase_order())
        .unwrap();
    let po = fx
        .service
        .add_purchase_order_item(
            fx.actor,
            po.id_typed(),
            AddPurchaseItem {
                product_id: product,
                quantity: 5,
                unit_price: Some(dec!(1.00)),
            },
        )
        .unwrap();
    let item = po.items()[0].id;
    let po = fx.service.submit_purchase_order(fx.actor, po.id_typed()).unwrap();

    let err = fx
        .service
        .receive_purchase_order(fx.actor, po.id_typed(), receipt(item, 6))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidQuantity);
    assert_eq!(err.item_id(), Some(item.to_string().as_str()));

    let after = fx.service.purchase_order(po.id_typed()).unwrap();
    assert_eq!(after, po);
    assert_eq!(fx.on_hand(product), 0);
    assert_eq!(fx.service.store().ledger_len().unwrap(), 0);
}

#[test]
fn cannot_receive_a_draft_or_cancelled_order() {
    let fx = Fixture::new();
    let product = fx.product("BOLT-10");
    let po = fx
        .service
        .create_purchase_order(fx.actor, fx.new_purchase_order())
        .unwrap();
    let po = fx
        .service
        .add_purchase_order_item(
            fx.actor,
            po.id_typed(),
            AddPurchaseItem {
                product_id: product,
                quantity: 5,
                unit_price: None,
            },
        )
        .unwrap();
    let item = po.items()[0].id;

    let err = fx
        .service
        .receive_purchase_order(fx.actor, po.id_typed(), receipt(item, 1))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    fx.service.cancel_purchase_order(fx.actor, po.id_typed()).unwrap();
    let err = fx
        .service
        .cancel_purchase_order(fx.actor, po.id_typed())
        .unwrap_err();
    match err {
        DomainError::InvalidState(msg) if msg.contains("already cancelled") => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn sales_item_totals_use_discount_and_tax() {
    let fx = Fixture::new();
    let product = fx.product("WIDGET");
    let so = fx
        .service
        .create_sales_order(fx.actor, fx.new_sales_order())
        .unwrap();
    assert_eq!(so.order_number(), "SO-000001");

    let so = fx
        .service
        .add_sales_order_item(
            fx.actor,
            so.id_typed(),
            AddSalesItem {
                product_id: product,
                quantity: 3,
                unit_price: Some(dec!(100.00)),
                discount: dec!(10),
            },
        )
        .unwrap();
    assert_eq!(so.items()[0].total_price, dec!(270.00));
    assert_eq!(so.subtotal(), dec!(270.00));
    assert_eq!(so.tax_amount(), dec!(27.00));
    assert_eq!(so.total_amount(), dec!(297.00));

    let so = fx
        .service
        .set_sales_order_shipping(fx.actor, so.id_typed(), dec!(5.50))
        .unwrap();
    assert_eq!(so.total_amount(), dec!(302.50));
}

#[test]
fn out_of_range_line_amount_is_a_validation_error() {
    let fx = Fixture::new();
    let product = fx.product("WIDGET");
    let so = fx
        .service
        .create_sales_order(fx.actor, fx.new_sales_order())
        .unwrap();

    let err = fx
        .service
        .add_sales_order_item(
            fx.actor,
            so.id_typed(),
            AddSalesItem {
                product_id: product,
                quantity: i64::MAX,
                unit_price: Some(dec!(100000000000)),
                discount: dec!(0),
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let stored = fx.service.sales_order(so.id_typed()).unwrap();
    assert!(stored.items().is_empty());
    assert_eq!(stored.total_amount(), dec!(0.00));
}

#[test]
fn over_requested_line_rejects_the_whole_fulfillment() {
    let fx = Fixture::new();
    let (a, b) = (fx.product("A"), fx.product("B"));
    fx.stock(a, 20);
    fx.stock(b, 20);

    let so = fx
        .service
        .create_sales_order(fx.actor, fx.new_sales_order())
        .unwrap();
    for product in [a, b] {
        fx.service
            .add_sales_order_item(
                fx.actor,
                so.id_typed(),
                AddSalesItem {
                    product_id: product,
                    quantity: 5,
                    unit_price: None,
                    discount: dec!(0),
                },
            )
            .unwrap();
    }
    let so = fx.service.confirm_sales_order(fx.actor, so.id_typed()).unwrap();
    let (first, second) = (so.items()[0].id, so.items()[1].id);
    let ledger_before = fx.service.store().ledger_len().unwrap();

    let err = fx
        .service
        .fulfill_sales_order(fx.actor, so.id_typed(), fulfillment(&[(first, 2), (second, 6)]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidQuantity);
    assert_eq!(err.item_id(), Some(second.to_string().as_str()));

    let after = fx.service.sales_order(so.id_typed()).unwrap();
    assert!(after.items().iter().all(|i| i.fulfilled_quantity == 0));
    assert_eq!(after.status(), SalesOrderStatus::Confirmed);
    assert_eq!(fx.on_hand(a), 20);
    assert_eq!(fx.service.store().ledger_len().unwrap(), ledger_before);
}

#[test]
fn shortfall_on_a_later_line_rolls_back_earlier_lines() {
    let fx = Fixture::new();
    let (a, b) = (fx.product("A"), fx.product("B"));
    fx.stock(a, 10);
    fx.stock(b, 1);

    let so = fx
        .service
        .create_sales_order(fx.actor, fx.new_sales_order())
        .unwrap();
    for product in [a, b] {
        fx.service
            .add_sales_order_item(
                fx.actor,
                so.id_typed(),
                AddSalesItem {
                    product_id: product,
                    quantity: 3,
                    unit_price: None,
                    discount: dec!(0),
                },
            )
            .unwrap();
    }
    let so = fx.service.confirm_sales_order(fx.actor, so.id_typed()).unwrap();
    let (first, second) = (so.items()[0].id, so.items()[1].id);

    let err = fx
        .service
        .fulfill_sales_order(fx.actor, so.id_typed(), fulfillment(&[(first, 3), (second, 3)]))
        .unwrap_err();
    match err {
        DomainError::InsufficientStock {
            item_id: Some(item),
            requested: 3,
            available: 1,
            ..
        } if item == second.to_string() => {}
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fx.on_hand(a), 10);
    assert_eq!(fx.on_hand(b), 1);
}

#[test]
fn fulfillment_issues_stock_and_stamps_shipping_date() {
    let fx = Fixture::new();
    let product = fx.product("A");
    fx.stock(product, 8);

    let so = fx
        .service
        .create_sales_order(fx.actor, fx.new_sales_order())
        .unwrap();
    let so = fx
        .service
        .add_sales_order_item(
            fx.actor,
            so.id_typed(),
            AddSalesItem {
                product_id: product,
                quantity: 5,
                unit_price: None,
                discount: dec!(0),
            },
        )
        .unwrap();
    let item = so.items()[0].id;
    fx.service.confirm_sales_order(fx.actor, so.id_typed()).unwrap();

    let so = fx
        .service
        .fulfill_sales_order(fx.actor, so.id_typed(), fulfillment(&[(item, 2)]))
        .unwrap();
    assert_eq!(so.status(), SalesOrderStatus::Partial);
    assert!(so.shipping_date().is_some());

    let so = fx
        .service
        .fulfill_sales_order(fx.actor, so.id_typed(), fulfillment(&[(item, 3)]))
        .unwrap();
    assert_eq!(so.status(), SalesOrderStatus::Fulfilled);
    assert_eq!(fx.on_hand(product), 3);
    assert_eq!(fx.service.fulfilled_to_date(so.id_typed(), item).unwrap(), 5);

    let report = fx.service.verify_replay().unwrap();
    assert!(report.is_consistent(), "{report:?}");
    assert_eq!(report.entries_replayed, 3);
}

#[test]
fn item_from_another_order_is_rejected() {
    let fx = Fixture::new();
    let product = fx.product("A");
    fx.stock(product, 5);

    let mut orders = Vec::new();
    for _ in 0..2 {
        let so = fx
            .service
            .create_sales_order(fx.actor, fx.new_sales_order())
            .unwrap();
        fx.service
            .add_sales_order_item(
                fx.actor,
                so.id_typed(),
                AddSalesItem {
                    product_id: product,
                    quantity: 1,
                    unit_price: None,
                    discount: dec!(0),
                },
            )
            .unwrap();
        orders.push(fx.service.confirm_sales_order(fx.actor, so.id_typed()).unwrap());
    }
    let foreign = orders[1].items()[0].id;

    let err = fx
        .service
        .fulfill_sales_order(fx.actor, orders[0].id_typed(), fulfillment(&[(foreign, 1)]))
        .unwrap_err();
    assert!(matches!(err, DomainError::ItemNotInOrder { .. }));
    assert_eq!(fx.on_hand(product), 5);
}
