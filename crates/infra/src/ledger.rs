//! Ledger writer: the only code path that changes quantities.

use tracing::instrument;

use stockflow_core::{DomainError, DomainResult};
use stockflow_inventory::{InventoryTransaction, TransactionDraft, plan};

use crate::store::StoreSession;

/// Append one transaction inside an open scope.
///
/// Checks that the product, warehouse and any referenced locations exist (and
/// that locations belong to the warehouse), plans the quantity effect against
/// what the scope currently sees, then stages record and deltas together.
#[instrument(
    skip(session, draft),
    fields(
        product_id = %draft.product_id,
        warehouse_id = %draft.warehouse_id,
        kind = %draft.transaction_type,
        quantity = draft.quantity
    ),
    err
)]
pub fn append<S: StoreSession>(
    session: &mut S,
    draft: TransactionDraft,
) -> DomainResult<InventoryTransaction> {
    draft.validate()?;
    session.product(draft.product_id)?;
    session.warehouse(draft.warehouse_id)?;

    for location_id in [draft.source_location_id, draft.destination_location_id]
        .into_iter()
        .flatten()
    {
        let location = session.location(location_id)?;
        if location.warehouse_id() != draft.warehouse_id {
            return Err(DomainError::validation(format!(
                "location {} belongs to warehouse {}, not {}",
                location.code(),
                location.warehouse_id(),
                draft.warehouse_id
            )));
        }
    }

    let deltas = plan(&draft, &*session)?;
    session.post(draft, deltas)
}
