//! Persistence seam for the inventory engine.
//!
//! A store hands out [`StoreSession`]s: one per transactional scope, holding
//! row locks for its whole lifetime. Writes are staged on the session and
//! become visible atomically on [`StoreSession::commit`]; dropping a session
//! without committing rolls everything back.

mod in_memory;
mod locks;

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::{
    DomainError, DomainResult, LocationId, OrderItemId, ProductId, PurchaseOrderId, SalesOrderId,
    TransactionId, WarehouseId,
};
use stockflow_inventory::{
    BucketKey, InventoryTransaction, Product, StockDelta, StockLevels, StockView, TransactionDraft,
    TransactionType, Warehouse, WarehouseLocation,
};
use stockflow_purchasing::PurchaseOrder;
use stockflow_sales::SalesOrder;

pub use in_memory::{InMemoryInventoryStore, InMemorySession};
pub use locks::LockTable;

/// A row lock.
///
/// `Stock` covers the product row and every bucket of that product.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
    Stock(ProductId),
    PurchaseOrder(PurchaseOrderId),
    SalesOrder(SalesOrderId),
}

/// Locks a scope needs, acquired together or not at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockSet(BTreeSet<LockKey>);

impl LockSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stock(mut self, product: ProductId) -> Self {
        self.0.insert(LockKey::Stock(product));
        self
    }

    pub fn stock_all(mut self, products: impl IntoIterator<Item = ProductId>) -> Self {
        self.0.extend(products.into_iter().map(LockKey::Stock));
        self
    }

    pub fn purchase_order(mut self, id: PurchaseOrderId) -> Self {
        self.0.insert(LockKey::PurchaseOrder(id));
        self
    }

    pub fn sales_order(mut self, id: SalesOrderId) -> Self {
        self.0.insert(LockKey::SalesOrder(id));
        self
    }

    pub fn contains(&self, key: &LockKey) -> bool {
        self.0.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LockKey> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A committed ledger entry and its 1-based position in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub sequence_number: u64,
    #[serde(flatten)]
    pub transaction: InventoryTransaction,
}

/// Page size used when `page` is given without `limit`.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Ledger query; unset fields match everything.
///
/// `created_from` and `created_to` are inclusive. Results are paged only when
/// `page` (1-based) is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub product_id: Option<ProductId>,
    pub warehouse_id: Option<WarehouseId>,
    pub transaction_type: Option<TransactionType>,
    pub reference_number: Option<String>,
    pub order_item_id: Option<OrderItemId>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl TransactionFilter {
    pub fn validate(&self) -> DomainResult<()> {
        if let (Some(from), Some(to)) = (self.created_from, self.created_to) {
            if from > to {
                return Err(DomainError::validation(
                    "created_from must not be after created_to",
                ));
            }
        }
        if self.page == Some(0) {
            return Err(DomainError::validation("page starts at 1"));
        }
        if self.limit == Some(0) {
            return Err(DomainError::validation("limit must be positive"));
        }
        Ok(())
    }

    pub fn matches(&self, tx: &InventoryTransaction) -> bool {
        self.product_id.is_none_or(|p| tx.product_id() == p)
            && self.warehouse_id.is_none_or(|w| tx.warehouse_id() == w)
            && self.transaction_type.is_none_or(|t| tx.transaction_type() == t)
            && self
                .reference_number
                .as_deref()
                .is_none_or(|r| tx.reference_number() == r)
            && self.order_item_id.is_none_or(|i| tx.order_item_id() == Some(i))
            && self.created_from.is_none_or(|from| tx.created_at >= from)
            && self.created_to.is_none_or(|to| tx.created_at <= to)
    }

    /// `(offset, limit)` of the requested page, or `None` for everything.
    pub fn window(&self) -> Option<(usize, usize)> {
        let page = self.page?;
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT) as usize;
        Some(((page.saturating_sub(1) as usize).saturating_mul(limit), limit))
    }
}

/// Ledger, live quantities and orders read under one consistent view.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub ledger: Vec<InventoryTransaction>,
    pub stock: StockLevels,
    pub purchase_orders: Vec<PurchaseOrder>,
    pub sales_orders: Vec<SalesOrder>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OrderKind {
    Purchase,
    Sales,
}

impl OrderKind {
    pub fn prefix(self) -> &'static str {
        match self {
            OrderKind::Purchase => "PO",
            OrderKind::Sales => "SO",
        }
    }
}

/// Durable transactional store.
///
/// Reads on the store itself see committed state only and take no locks;
/// anything that is read in order to write goes through a session.
pub trait InventoryStore: Send + Sync {
    type Session: StoreSession;

    /// Open a scope holding every lock in `locks`, waiting at most `timeout`.
    ///
    /// Fails with `ConcurrencyConflict` when the locks cannot be had in time.
    fn begin(&self, locks: &LockSet, timeout: Duration) -> DomainResult<Self::Session>;

    fn product(&self, id: ProductId) -> DomainResult<Product>;
    fn products(&self) -> DomainResult<Vec<Product>>;
    fn warehouse(&self, id: WarehouseId) -> DomainResult<Warehouse>;
    fn warehouses(&self) -> DomainResult<Vec<Warehouse>>;
    fn location(&self, id: LocationId) -> DomainResult<WarehouseLocation>;
    fn locations(&self, warehouse: WarehouseId) -> DomainResult<Vec<WarehouseLocation>>;
    fn purchase_order(&self, id: PurchaseOrderId) -> DomainResult<PurchaseOrder>;
    fn purchase_orders(&self) -> DomainResult<Vec<PurchaseOrder>>;
    fn sales_order(&self, id: SalesOrderId) -> DomainResult<SalesOrder>;
    fn sales_orders(&self) -> DomainResult<Vec<SalesOrder>>;

    fn product_quantity(&self, id: ProductId) -> DomainResult<i64>;
    fn stock_buckets(&self, id: ProductId) -> DomainResult<Vec<(BucketKey, i64)>>;
    /// Matching entries in ledger order, paged per [`TransactionFilter::window`].
    fn transactions(&self, filter: &TransactionFilter) -> DomainResult<Vec<LedgerEntry>>;
    fn transaction(&self, id: TransactionId) -> DomainResult<LedgerEntry>;
    fn snapshot(&self) -> DomainResult<StoreSnapshot>;

    /// Catalog inserts; SKUs are unique, location codes unique per warehouse.
    fn insert_product(&self, product: Product) -> DomainResult<()>;
    fn insert_warehouse(&self, warehouse: Warehouse) -> DomainResult<()>;
    fn insert_location(&self, location: WarehouseLocation) -> DomainResult<()>;

    /// Next order number (`PO-000001`, `SO-000001`, ...). Gaps are allowed.
    fn next_order_number(&self, kind: OrderKind) -> DomainResult<String>;
}

/// One transactional scope.
///
/// Stock reads reflect committed state plus whatever this session has posted.
pub trait StoreSession: StockView {
    fn product(&self, id: ProductId) -> DomainResult<Product>;
    fn warehouse(&self, id: WarehouseId) -> DomainResult<Warehouse>;
    fn location(&self, id: LocationId) -> DomainResult<WarehouseLocation>;

    /// Load an order; its version is checked again at commit.
    fn purchase_order(&mut self, id: PurchaseOrderId) -> DomainResult<PurchaseOrder>;
    fn sales_order(&mut self, id: SalesOrderId) -> DomainResult<SalesOrder>;

    /// Stage a ledger record with its quantity effect.
    ///
    /// The product must be locked by this session.
    fn post(
        &mut self,
        draft: TransactionDraft,
        deltas: Vec<StockDelta>,
    ) -> DomainResult<InventoryTransaction>;

    fn save_purchase_order(&mut self, order: PurchaseOrder) -> DomainResult<()>;
    fn save_sales_order(&mut self, order: SalesOrder) -> DomainResult<()>;

    /// Apply everything staged atomically; returns the new ledger entries.
    fn commit(self) -> DomainResult<Vec<LedgerEntry>>;
}
