//! Read-side queries over quantities and the ledger.

use serde::{Deserialize, Serialize};

use stockflow_core::{
    DomainError, DomainResult, LocationId, OrderItemId, ProductId, PurchaseOrderId, SalesOrderId,
    TransactionId, WarehouseId,
};
use stockflow_inventory::{Product, ProductStatus, TransactionType, quantity_for_order_item};

use super::InventoryService;
use crate::replay::{self, ReplayError, ReplayReport};
use crate::store::{InventoryStore, LedgerEntry, TransactionFilter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBucket {
    pub warehouse_id: WarehouseId,
    /// `None` is the warehouse's unassigned stock.
    pub location_id: Option<LocationId>,
    pub quantity: i64,
}

/// A product with its on-hand total and per-location breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStock {
    pub product: Product,
    pub quantity: i64,
    pub buckets: Vec<StockBucket>,
    pub needs_reorder: bool,
}

impl<S: InventoryStore> InventoryService<S> {
    pub fn product_stock(&self, id: ProductId) -> DomainResult<ProductStock> {
        let product = self.store().product(id)?;
        let quantity = self.store().product_quantity(id)?;
        let buckets = self
            .store()
            .stock_buckets(id)?
            .into_iter()
            .filter(|(_, q)| *q != 0)
            .map(|(key, quantity)| StockBucket {
                warehouse_id: key.warehouse_id,
                location_id: key.location_id,
                quantity,
            })
            .collect();

        Ok(ProductStock {
            needs_reorder: product.needs_reorder(quantity),
            product,
            quantity,
            buckets,
        })
    }

    /// Active products at or below their reorder level.
    pub fn low_stock(&self) -> DomainResult<Vec<ProductStock>> {
        let mut out = Vec::new();
        for product in self.store().products()? {
            if product.status() != ProductStatus::Active {
                continue;
            }
            let stock = self.product_stock(product.id())?;
            if stock.needs_reorder {
                out.push(stock);
            }
        }
        Ok(out)
    }

    pub fn transactions(&self, filter: &TransactionFilter) -> DomainResult<Vec<LedgerEntry>> {
        self.store().transactions(filter)
    }

    pub fn transaction(&self, id: TransactionId) -> DomainResult<LedgerEntry> {
        self.store().transaction(id)
    }

    /// Received-to-date for a purchase order item, summed from the ledger.
    pub fn received_to_date(&self, order: PurchaseOrderId, item: OrderItemId) -> DomainResult<i64> {
        let po = self.store().purchase_order(order)?;
        if po.item(item).is_none() {
            return Err(DomainError::ItemNotInOrder {
                order_id: order.to_string(),
                item_id: item.to_string(),
            });
        }
        self.ledger_quantity(item, TransactionType::Receive)
    }

    /// Fulfilled-to-date for a sales order item, summed from the ledger.
    pub fn fulfilled_to_date(&self, order: SalesOrderId, item: OrderItemId) -> DomainResult<i64> {
        let so = self.store().sales_order(order)?;
        if so.item(item).is_none() {
            return Err(DomainError::ItemNotInOrder {
                order_id: order.to_string(),
                item_id: item.to_string(),
            });
        }
        self.ledger_quantity(item, TransactionType::Issue)
    }

    /// Rebuild quantities from the ledger and compare with the live state.
    pub fn verify_replay(&self) -> Result<ReplayReport, ReplayError> {
        let snapshot = self.store().snapshot()?;
        let report = replay::verify(&snapshot)?;
        if report.is_consistent() {
            tracing::info!(entries = report.entries_replayed, "replay matches live state");
        } else {
            tracing::warn!(
                entries = report.entries_replayed,
                stock_mismatches = report.mismatches.len(),
                order_item_mismatches = report.order_item_mismatches.len(),
                "replay diverges from live state"
            );
        }
        Ok(report)
    }

    fn ledger_quantity(&self, item: OrderItemId, kind: TransactionType) -> DomainResult<i64> {
        let filter = TransactionFilter {
            order_item_id: Some(item),
            transaction_type: Some(kind),
            ..TransactionFilter::default()
        };
        let entries = self.store().transactions(&filter)?;
        Ok(quantity_for_order_item(
            entries.iter().map(|e| &e.transaction),
            item,
            kind,
        ))
    }
}
