//! Ledger laws checked end to end through the guarded service.

mod common;

use common::Fixture;
use proptest::prelude::*;
use stockflow_infra::services::{AdjustmentRequest, TransferRequest};

#[derive(Debug, Clone)]
enum Op {
    Receive { quantity: i64, bin: Option<usize> },
    Issue { quantity: i64, bin: Option<usize> },
    Transfer { from: usize, to: usize, quantity: i64 },
    Adjust { delta: i64, bin: Option<usize> },
}

fn op() -> impl Strategy<Value = Op> {
    let bin = prop::option::of(0usize..2);
    prop_oneof![
        (1i64..10, bin.clone()).prop_map(|(quantity, bin)| Op::Receive { quantity, bin }),
        (1i64..10, bin.clone()).prop_map(|(quantity, bin)| Op::Issue { quantity, bin }),
        (0usize..2, 0usize..2, 1i64..6)
            .prop_map(|(from, to, quantity)| Op::Transfer { from, to, quantity }),
        (-6i64..6, bin).prop_map(|(delta, bin)| Op::Adjust { delta, bin }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 48,
        ..ProptestConfig::default()
    })]

    #[test]
    fn service_movements_keep_stock_replayable(ops in prop::collection::vec(op(), 0..30)) {
        let fx = Fixture::new();
        let product = fx.product("P-PROP");
        let bins = [fx.location("B1"), fx.location("B2")];

        let mut expected = 0i64;
        let mut accepted = 0u64;

        for op in ops {
            let (result, delta) = match op {
                Op::Receive { quantity, bin } => (
                    fx.service
                        .receive_stock(fx.actor, fx.movement(product, quantity, bin.map(|b| bins[b])))
                        .map(|_| ()),
                    quantity,
                ),
                Op::Issue { quantity, bin } => (
                    fx.service
                        .issue_stock(fx.actor, fx.movement(product, quantity, bin.map(|b| bins[b])))
                        .map(|_| ()),
                    -quantity,
                ),
                Op::Transfer { from, to, quantity } => (
                    fx.service
                        .transfer_stock(
                            fx.actor,
                            TransferRequest {
                                product_id: product,
                                warehouse_id: fx.warehouse,
                                source_location_id: bins[from],
                                destination_location_id: bins[to],
                                quantity,
                                reference_number: None,
                                notes: None,
                            },
                        )
                        .map(|_| ()),
                    0,
                ),
                Op::Adjust { delta, bin } => (
                    fx.service
                        .adjust_stock(
                            fx.actor,
                            AdjustmentRequest {
                                product_id: product,
                                warehouse_id: fx.warehouse,
                                quantity: delta,
                                location_id: bin.map(|b| bins[b]),
                                reason: None,
                                reference_number: None,
                                notes: None,
                            },
                        )
                        .map(|_| ()),
                    delta,
                ),
            };

            match result {
                Ok(()) => {
                    expected += delta;
                    accepted += 1;
                }
                // Single-threaded, so a rejection is never a lock conflict.
                Err(err) => prop_assert!(!err.is_retryable(), "unexpected conflict: {}", err),
            }

            let stock = fx.service.product_stock(product).unwrap();
            prop_assert_eq!(stock.quantity, expected);
            prop_assert!(stock.buckets.iter().all(|b| b.quantity >= 0));
            prop_assert_eq!(stock.buckets.iter().map(|b| b.quantity).sum::<i64>(), expected);
        }

        let report = fx.service.verify_replay().unwrap();
        prop_assert!(report.is_consistent());
        prop_assert_eq!(report.entries_replayed, accepted);
    }
}
