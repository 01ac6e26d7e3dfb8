use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use stockflow_core::TransactionId;
use stockflow_infra::TransactionFilter;

use crate::app::errors;
use crate::app::services::{self, AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_transactions))
        .route("/replay-check", get(replay_check))
        .route("/:id", get(get_transaction))
}

/// Ledger entries in sequence order, filtered by any of
/// `product_id`, `warehouse_id`, `transaction_type`, `reference_number`, `order_item_id`,
/// and the inclusive `created_from` / `created_to` bounds (RFC 3339).
/// `page` (1-based) and `limit` (default 10) select one page.
pub async fn list_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Query(filter): Query<TransactionFilter>,
) -> axum::response::Response {
    services::call(services, StatusCode::OK, move |inv| inv.transactions(&filter)).await
}

pub async fn get_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: TransactionId = match errors::parse_id(&id, "transaction") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    services::call(services, StatusCode::OK, move |inv| inv.transaction(id)).await
}

/// Rebuild quantities from the ledger and report drift against live state.
pub async fn replay_check(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let outcome =
        tokio::task::spawn_blocking(move || services.inventory.verify_replay()).await;
    match outcome {
        Ok(Ok(report)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "consistent": report.is_consistent(),
                "report": report,
            })),
        )
            .into_response(),
        Ok(Err(err)) => errors::replay_error_to_response(err),
        Err(join) => {
            tracing::error!(error = %join, "replay task failed");
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "replay task failed")
        }
    }
}
