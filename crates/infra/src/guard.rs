//! Consistency guard: one atomic scope per ledger-affecting operation.
//!
//! ```text
//! begin(locks) → op(scope) → commit ─┬→ publish ledger entries (best effort)
//!                    │               └→ audit records (best effort)
//!                    └─ error → drop session (rollback)
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{instrument, warn};

use stockflow_core::{DomainResult, UserId};
use stockflow_events::{EventBus, EventEnvelope};
use stockflow_inventory::{InventoryTransaction, ledger::envelope};

use crate::audit::{AuditRecord, AuditSink};
use crate::config::InventoryConfig;
use crate::store::{InventoryStore, LedgerEntry, LockSet, StoreSession};

/// Message type of the ledger feed.
pub type LedgerEnvelope = EventEnvelope<InventoryTransaction>;

/// Handle given to an operation running inside the guard.
pub struct Scope<Sess> {
    session: Sess,
    actor: UserId,
    audit: Vec<AuditRecord>,
}

impl<Sess: StoreSession> Scope<Sess> {
    pub fn session(&mut self) -> &mut Sess {
        &mut self.session
    }

    pub fn actor(&self) -> UserId {
        self.actor
    }

    /// Queue an audit record; written only if the scope commits.
    pub fn audit<T: Serialize>(
        &mut self,
        action: &str,
        entity_type: &str,
        entity_id: impl ToString,
        before: Option<&T>,
        after: Option<&T>,
    ) {
        self.audit.push(AuditRecord::new(
            self.actor,
            action,
            entity_type,
            entity_id,
            before,
            after,
        ));
    }
}

pub struct ConsistencyGuard<S> {
    store: S,
    bus: Arc<dyn EventBus<LedgerEnvelope>>,
    audit: Arc<dyn AuditSink>,
    config: InventoryConfig,
}

impl<S: InventoryStore> ConsistencyGuard<S> {
    pub fn new(
        store: S,
        bus: Arc<dyn EventBus<LedgerEnvelope>>,
        audit: Arc<dyn AuditSink>,
        config: InventoryConfig,
    ) -> Self {
        Self {
            store,
            bus,
            audit,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    /// Run `op` inside one transactional scope holding `locks`.
    ///
    /// Either everything `op` staged commits, or nothing does. Side channels
    /// run after commit and cannot fail the operation.
    #[instrument(skip(self, locks, op), fields(locks = locks.len(), actor = %actor), err)]
    pub fn run<T>(
        &self,
        operation: &'static str,
        actor: UserId,
        locks: &LockSet,
        op: impl FnOnce(&mut Scope<S::Session>) -> DomainResult<T>,
    ) -> DomainResult<T> {
        let session = self.store.begin(locks, self.config.lock_timeout)?;
        let mut scope = Scope {
            session,
            actor,
            audit: Vec::new(),
        };

        let value = op(&mut scope)?;

        let Scope { session, audit, .. } = scope;
        let committed = session.commit()?;
        tracing::debug!(operation, entries = committed.len(), "scope committed");

        self.publish(committed);
        self.write_audit(&audit);
        Ok(value)
    }

    /// Re-run `attempt` from the top while it fails with a retryable conflict.
    pub fn retry<T>(&self, mut attempt: impl FnMut() -> DomainResult<T>) -> DomainResult<T> {
        let mut retries = 0;
        loop {
            match attempt() {
                Err(err) if err.is_retryable() && retries < self.config.conflict_retries => {
                    retries += 1;
                    warn!(attempt = retries, error = %err, "retrying after conflict");
                }
                other => return other,
            }
        }
    }

    fn publish(&self, committed: Vec<LedgerEntry>) {
        for entry in committed {
            let seq = entry.sequence_number;
            if let Err(err) = self.bus.publish(envelope(seq, entry.transaction)) {
                warn!(sequence_number = seq, error = %err, "ledger feed publish failed");
            }
        }
    }

    fn write_audit(&self, records: &[AuditRecord]) {
        for record in records {
            if let Err(err) = self.audit.record(record) {
                warn!(
                    action = %record.action,
                    entity_id = %record.entity_id,
                    error = %err,
                    "audit write failed"
                );
            }
        }
    }
}
