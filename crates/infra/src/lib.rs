//! Infrastructure layer: transactional store, consistency guard, services.
//!
//! Domain crates decide *what* a movement or order change means; this crate
//! decides *how* it is made durable: which locks are held, what commits
//! together, and what is published afterwards.

pub mod audit;
pub mod config;
pub mod guard;
pub mod ledger;
pub mod replay;
pub mod services;
pub mod store;

use std::sync::Arc;

use stockflow_events::InMemoryEventBus;

pub use audit::{AuditError, AuditRecord, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use config::InventoryConfig;
pub use guard::{ConsistencyGuard, LedgerEnvelope, Scope};
pub use replay::{OrderItemMismatch, ReplayError, ReplayReport};
pub use services::InventoryService;
pub use store::{
    DEFAULT_PAGE_LIMIT, InMemoryInventoryStore, InventoryStore, LedgerEntry, LockKey, LockSet,
    StoreSession, TransactionFilter,
};

/// Service over a fresh in-memory store, plus the bus carrying its ledger feed.
pub fn in_memory(
    config: InventoryConfig,
    audit: Arc<dyn AuditSink>,
) -> (
    InventoryService<InMemoryInventoryStore>,
    Arc<InMemoryEventBus<LedgerEnvelope>>,
) {
    let bus = Arc::new(InMemoryEventBus::new());
    let service = InventoryService::new(
        InMemoryInventoryStore::new(),
        bus.clone(),
        audit,
        config,
    );
    (service, bus)
}
