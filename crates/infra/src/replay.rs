//! Ledger replay check.
//!
//! Rebuilds every quantity from an empty state by running the ledger in
//! order, then compares the result with live quantities and with the
//! received/fulfilled counters stored on orders.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockflow_core::{DomainError, OrderItemId};
use stockflow_events::ProjectionError;
use stockflow_inventory::{StockLevels, StockMismatch, TransactionType};

use crate::store::StoreSnapshot;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("store read failed: {0}")]
    Store(#[from] DomainError),

    #[error("ledger does not replay: {0}")]
    Projection(#[from] ProjectionError),
}

/// An order item whose stored counter disagrees with its ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemMismatch {
    pub order_number: String,
    pub item_id: OrderItemId,
    pub transaction_type: TransactionType,
    pub stored: i64,
    pub from_ledger: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub entries_replayed: u64,
    pub last_sequence_number: Option<u64>,
    pub mismatches: Vec<StockMismatch>,
    pub order_item_mismatches: Vec<OrderItemMismatch>,
}

impl ReplayReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty() && self.order_item_mismatches.is_empty()
    }
}

pub fn verify(snapshot: &StoreSnapshot) -> Result<ReplayReport, ReplayError> {
    let (rebuilt, cursor) = StockLevels::replay(&snapshot.ledger)?;
    let mismatches = snapshot.stock.diff(&rebuilt);

    let mut per_item: HashMap<(OrderItemId, TransactionType), i64> = HashMap::new();
    for tx in &snapshot.ledger {
        if let Some(item) = tx.order_item_id() {
            *per_item.entry((item, tx.transaction_type())).or_default() += tx.quantity();
        }
    }
    let from_ledger = |item, kind| per_item.get(&(item, kind)).copied().unwrap_or(0);

    let mut order_item_mismatches = Vec::new();
    for po in &snapshot.purchase_orders {
        for item in po.items() {
            let ledger = from_ledger(item.id, TransactionType::Receive);
            if ledger != item.received_quantity {
                order_item_mismatches.push(OrderItemMismatch {
                    order_number: po.order_number().to_string(),
                    item_id: item.id,
                    transaction_type: TransactionType::Receive,
                    stored: item.received_quantity,
                    from_ledger: ledger,
                });
            }
        }
    }
    for so in &snapshot.sales_orders {
        for item in so.items() {
            let ledger = from_ledger(item.id, TransactionType::Issue);
            if ledger != item.fulfilled_quantity {
                order_item_mismatches.push(OrderItemMismatch {
                    order_number: so.order_number().to_string(),
                    item_id: item.id,
                    transaction_type: TransactionType::Issue,
                    stored: item.fulfilled_quantity,
                    from_ledger: ledger,
                });
            }
        }
    }

    Ok(ReplayReport {
        entries_replayed: snapshot.ledger.len() as u64,
        last_sequence_number: cursor.map(|c| c.last_sequence_number()),
        mismatches,
        order_item_mismatches,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use stockflow_core::{ProductId, TransactionId, UserId, WarehouseId};
    use stockflow_inventory::{BucketKey, InventoryTransaction, StockDelta, TransactionDraft};

    use super::*;

    fn snapshot_of(ledger: Vec<InventoryTransaction>, stock: StockLevels) -> StoreSnapshot {
        StoreSnapshot {
            ledger,
            stock,
            purchase_orders: Vec::new(),
            sales_orders: Vec::new(),
        }
    }

    fn receive(product: ProductId, warehouse: WarehouseId, qty: i64) -> InventoryTransaction {
        InventoryTransaction::record(
            TransactionId::new(),
            TransactionDraft::receive(product, warehouse, qty, UserId::new()),
            Utc::now(),
        )
    }

    #[test]
    fn empty_store_is_consistent() {
        let report = verify(&snapshot_of(Vec::new(), StockLevels::new())).unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.entries_replayed, 0);
        assert_eq!(report.last_sequence_number, None);
    }

    #[test]
    fn reports_drift_between_live_and_rebuilt() {
        let (p, w) = (ProductId::new(), WarehouseId::new());
        let mut live = StockLevels::new();
        live.apply_deltas(&[StockDelta {
            key: BucketKey::new(p, w, None),
            delta: 7,
        }])
        .unwrap();

        let report = verify(&snapshot_of(vec![receive(p, w, 5)], live)).unwrap();
        assert!(!report.is_consistent());
        assert_eq!(report.last_sequence_number, Some(1));
        assert!(report
            .mismatches
            .iter()
            .any(|m| m.product_id == p && m.bucket.is_none() && m.live == 7 && m.rebuilt == 5));
    }

    #[test]
    fn unreplayable_ledger_is_an_error() {
        let (p, w) = (ProductId::new(), WarehouseId::new());
        let issue = InventoryTransaction::record(
            TransactionId::new(),
            TransactionDraft::issue(p, w, 1, UserId::new()),
            Utc::now(),
        );

        let err = verify(&snapshot_of(vec![issue], StockLevels::new())).unwrap_err();
        assert!(matches!(err, ReplayError::Projection(ProjectionError::Rejected { .. })));
    }
}
