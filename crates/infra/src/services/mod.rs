//! Application services: every core operation as a plain method call.
//!
//! Each ledger-affecting method computes its lock set, runs inside the
//! [`ConsistencyGuard`], and retries from the top on a retryable conflict.

mod catalog;
mod movements;
mod purchasing;
mod queries;
mod sales;

use std::sync::Arc;

use crate::audit::{AuditRecord, AuditSink};
use crate::config::InventoryConfig;
use crate::guard::{ConsistencyGuard, LedgerEnvelope};
use crate::store::InventoryStore;

use stockflow_events::EventBus;

pub use movements::{AdjustmentRequest, MovementRequest, TransferRequest};
pub use purchasing::{AddPurchaseItem, CreatePurchaseOrder, ReceiveRequest};
pub use queries::{ProductStock, StockBucket};
pub use sales::{AddSalesItem, CreateSalesOrder, FulfillRequest};

pub struct InventoryService<S: InventoryStore> {
    guard: ConsistencyGuard<S>,
    audit: Arc<dyn AuditSink>,
}

impl<S: InventoryStore> InventoryService<S> {
    pub fn new(
        store: S,
        bus: Arc<dyn EventBus<LedgerEnvelope>>,
        audit: Arc<dyn AuditSink>,
        config: InventoryConfig,
    ) -> Self {
        Self {
            guard: ConsistencyGuard::new(store, bus, Arc::clone(&audit), config),
            audit,
        }
    }

    pub fn guard(&self) -> &ConsistencyGuard<S> {
        &self.guard
    }

    pub fn store(&self) -> &S {
        self.guard.store()
    }

    /// Audit for changes made outside a guarded scope (catalog inserts).
    fn audit_now(&self, record: AuditRecord) {
        if let Err(err) = self.audit.record(&record) {
            tracing::warn!(action = %record.action, error = %err, "audit write failed");
        }
    }
}
