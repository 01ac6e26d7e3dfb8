use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use stockflow_core::DomainError;
use stockflow_events::InMemoryEventBus;
use stockflow_infra::{
    InMemoryInventoryStore, InventoryConfig, InventoryService, LedgerEnvelope, TracingAuditSink,
};

use crate::app::errors;

pub type Inventory = InventoryService<InMemoryInventoryStore>;

pub struct AppServices {
    pub inventory: Inventory,
    pub ledger_feed: Arc<InMemoryEventBus<LedgerEnvelope>>,
}

pub fn build_services(config: InventoryConfig) -> AppServices {
    tracing::info!(
        lock_timeout_ms = config.lock_timeout.as_millis() as u64,
        conflict_retries = config.conflict_retries,
        sales_tax_rate = %config.sales_tax_rate,
        "building in-memory inventory engine"
    );
    let (inventory, ledger_feed) = stockflow_infra::in_memory(config, Arc::new(TracingAuditSink));
    AppServices {
        inventory,
        ledger_feed,
    }
}

/// Run a blocking engine call off the async workers and map its outcome.
///
/// The engine waits on row locks, so it must not run on a runtime thread.
pub async fn call<T, F>(services: Arc<AppServices>, status: StatusCode, f: F) -> Response
where
    T: Serialize + Send + 'static,
    F: FnOnce(&Inventory) -> Result<T, DomainError> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || f(&services.inventory)).await {
        Ok(Ok(value)) => (status, Json(value)).into_response(),
        Ok(Err(err)) => errors::domain_error_to_response(err),
        Err(join) => {
            tracing::error!(error = %join, "engine task failed");
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "engine task failed")
        }
    }
}
