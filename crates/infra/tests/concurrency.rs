//! Concurrent callers against one store: no oversell, no lost updates.

mod common;

use std::sync::Barrier;
use std::thread;
use std::time::Duration;

use rust_decimal_macros::dec;

use common::Fixture;
use stockflow_core::{DomainError, ErrorKind, ProductId, SalesOrderId};
use stockflow_infra::{
    InventoryConfig, InventoryStore, LockSet,
    services::{AddPurchaseItem, AddSalesItem, FulfillRequest, ReceiveRequest},
};
use stockflow_purchasing::{PurchaseOrderStatus, ReceiptLine};
use stockflow_sales::FulfillmentLine;

fn confirmed_order(fx: &Fixture, product: ProductId, quantity: i64) -> (SalesOrderId, FulfillRequest) {
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
                quantity,
                unit_price: None,
                discount: dec!(0),
            },
        )
        .unwrap();
    let item = so.items()[0].id;
    fx.service.confirm_sales_order(fx.actor, so.id_typed()).unwrap();
    let req = FulfillRequest {
        items: vec![FulfillmentLine {
            item_id: item,
            quantity_fulfilled: quantity,
            location_id: None,
        }],
        shipping_date: None,
        notes: None,
    };
    (so.id_typed(), req)
}

#[test]
fn two_issues_of_three_against_five_never_oversell() {
    for _ in 0..20 {
        let fx = Fixture::new();
        let product = fx.product("HOT");
        fx.stock(product, 5);

        let barrier = Barrier::new(2);
        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let (fx, barrier) = (&fx, &barrier);
                    s.spawn(move || {
                        barrier.wait();
                        fx.service
                            .issue_stock(fx.actor, fx.movement(product, 3, None))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "{results:?}");
        let failure = results.into_iter().find_map(Result::err).unwrap();
        assert!(matches!(
            failure.kind(),
            ErrorKind::InsufficientStock | ErrorKind::ConcurrencyConflict
        ));
        assert_eq!(fx.on_hand(product), 2);
    }
}

#[test]
fn many_single_unit_issues_stop_at_zero() {
    let fx = Fixture::new();
    let product = fx.product("HOT");
    fx.stock(product, 5);

    let barrier = Barrier::new(8);
    let successes = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let (fx, barrier) = (&fx, &barrier);
                s.spawn(move || {
                    barrier.wait();
                    fx.service
                        .issue_stock(fx.actor, fx.movement(product, 1, None))
                        .is_ok()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count()
    });

    assert_eq!(successes, 5);
    assert_eq!(fx.on_hand(product), 0);
    assert!(fx.service.verify_replay().unwrap().is_consistent());
}

#[test]
fn competing_fulfillments_share_one_pool() {
    let fx = Fixture::new();
    let product = fx.product("HOT");
    fx.stock(product, 5);
    let first = confirmed_order(&fx, product, 3);
    let second = confirmed_order(&fx, product, 3);

    let barrier = Barrier::new(2);
    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = [first, second]
            .into_iter()
            .map(|(id, req)| {
                let (fx, barrier) = (&fx, &barrier);
                s.spawn(move || {
                    barrier.wait();
                    fx.service.fulfill_sales_order(fx.actor, id, req)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(fx.on_hand(product), 2);
    assert!(fx.service.verify_replay().unwrap().is_consistent());
}

#[test]
fn cancel_and_receive_never_both_win() {
    let fx = Fixture::new();
    let product = fx.product("P");
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
    let id = po.id_typed();
    fx.service.submit_purchase_order(fx.actor, id).unwrap();

    let barrier = Barrier::new(2);
    let (received, cancelled) = thread::scope(|s| {
        let receive = s.spawn(|| {
            barrier.wait();
            fx.service.receive_purchase_order(
                fx.actor,
                id,
                ReceiveRequest {
                    items: vec![ReceiptLine {
                        item_id: item,
                        quantity_received: 5,
                        location_id: None,
                    }],
                    notes: None,
                },
            )
        });
        let cancel = s.spawn(|| {
            barrier.wait();
            fx.service.cancel_purchase_order(fx.actor, id)
        });
        (receive.join().unwrap(), cancel.join().unwrap())
    });

    let po = fx.service.purchase_order(id).unwrap();
    match (received, cancelled) {
        (Ok(_), Err(DomainError::InvalidState(_))) => {
            assert_eq!(po.status(), PurchaseOrderStatus::Received);
            assert_eq!(fx.on_hand(product), 5);
        }
        (Err(err), Ok(_)) => {
            assert_eq!(err.kind(), ErrorKind::InvalidState);
            assert_eq!(po.status(), PurchaseOrderStatus::Cancelled);
            assert_eq!(fx.on_hand(product), 0);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn lock_wait_timeout_is_a_retryable_conflict() {
    let fx = Fixture::with_config(
        InventoryConfig::default()
            .with_lock_timeout(Duration::from_millis(30))
            .with_conflict_retries(0),
    );
    let product = fx.product("P");
    fx.stock(product, 5);

    let held = fx
        .service
        .store()
        .begin(&LockSet::new().stock(product), Duration::from_millis(30))
        .unwrap();
    let err = fx
        .service
        .issue_stock(fx.actor, fx.movement(product, 1, None))
        .unwrap_err();
    assert!(err.is_retryable(), "{err:?}");

    drop(held);
    fx.service
        .issue_stock(fx.actor, fx.movement(product, 1, None))
        .unwrap();
    assert_eq!(fx.on_hand(product), 4);
}
