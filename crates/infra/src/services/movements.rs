//! Direct stock movements (no order involved).

use serde::{Deserialize, Serialize};
use tracing::instrument;

use stockflow_core::{DomainResult, LocationId, ProductId, UserId, WarehouseId};
use stockflow_inventory::{AdjustmentReason, InventoryTransaction, TransactionDraft};

use super::InventoryService;
use crate::ledger;
use crate::store::{InventoryStore, LockSet};

/// Receive or issue outside an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRequest {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub quantity: i64,
    /// Destination for a receive, source for an issue.
    #[serde(default)]
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub reference_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub source_location_id: LocationId,
    pub destination_location_id: LocationId,
    pub quantity: i64,
    #[serde(default)]
    pub reference_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentRequest {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    /// Signed delta to the on-hand total.
    pub quantity: i64,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub reason: Option<AdjustmentReason>,
    #[serde(default)]
    pub reference_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn annotate(
    draft: TransactionDraft,
    reference: Option<String>,
    notes: Option<String>,
) -> TransactionDraft {
    draft
        .with_reference(reference.unwrap_or_default())
        .with_notes(notes.unwrap_or_default())
}

impl<S: InventoryStore> InventoryService<S> {
    pub fn receive_stock(
        &self,
        actor: UserId,
        req: MovementRequest,
    ) -> DomainResult<InventoryTransaction> {
        let mut draft = TransactionDraft::receive(req.product_id, req.warehouse_id, req.quantity, actor);
        if let Some(location) = req.location_id {
            draft = draft.into_location(location);
        }
        self.record_movement(actor, annotate(draft, req.reference_number, req.notes))
    }

    pub fn issue_stock(
        &self,
        actor: UserId,
        req: MovementRequest,
    ) -> DomainResult<InventoryTransaction> {
        let mut draft = TransactionDraft::issue(req.product_id, req.warehouse_id, req.quantity, actor);
        if let Some(location) = req.location_id {
            draft = draft.from_location(location);
        }
        self.record_movement(actor, annotate(draft, req.reference_number, req.notes))
    }

    pub fn transfer_stock(
        &self,
        actor: UserId,
        req: TransferRequest,
    ) -> DomainResult<InventoryTransaction> {
        let draft = TransactionDraft::transfer(
            req.product_id,
            req.warehouse_id,
            req.source_location_id,
            req.destination_location_id,
            req.quantity,
            actor,
        );
        self.record_movement(actor, annotate(draft, req.reference_number, req.notes))
    }

    pub fn adjust_stock(
        &self,
        actor: UserId,
        req: AdjustmentRequest,
    ) -> DomainResult<InventoryTransaction> {
        let mut draft =
            TransactionDraft::adjustment(req.product_id, req.warehouse_id, req.quantity, actor);
        if let Some(location) = req.location_id {
            draft = draft.at_location(location);
        }
        if let Some(reason) = req.reason {
            draft = draft.with_reason(reason);
        }
        self.record_movement(actor, annotate(draft, req.reference_number, req.notes))
    }

    #[instrument(
        skip(self, draft),
        fields(product_id = %draft.product_id, kind = %draft.transaction_type),
        err
    )]
    fn record_movement(
        &self,
        actor: UserId,
        draft: TransactionDraft,
    ) -> DomainResult<InventoryTransaction> {
        let locks = LockSet::new().stock(draft.product_id);
        self.guard.retry(|| {
            self.guard.run("inventory.movement", actor, &locks, |scope| {
                let tx = ledger::append(scope.session(), draft.clone())?;
                scope.audit("create", "inventory_transaction", tx.id, None, Some(&tx));
                Ok(tx)
            })
        })
    }
}
