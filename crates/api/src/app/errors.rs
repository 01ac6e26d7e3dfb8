use std::str::FromStr;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{json, Value};

use stockflow_core::DomainError;
use stockflow_infra::ReplayError;

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        DomainError::NotFound { entity, id } => json_error_with(
            StatusCode::NOT_FOUND,
            "not_found",
            message,
            json!({ "entity": entity, "id": id }),
        ),
        DomainError::ItemNotInOrder { order_id, item_id } => json_error_with(
            StatusCode::CONFLICT,
            "item_not_in_order",
            message,
            json!({ "order_id": order_id, "item_id": item_id }),
        ),
        DomainError::InvalidState(_) => json_error(StatusCode::CONFLICT, "invalid_state", message),
        DomainError::InvalidQuantity {
            item_id, requested, ..
        } => json_error_with(
            StatusCode::BAD_REQUEST,
            "invalid_quantity",
            message,
            json!({ "item_id": item_id, "requested": requested }),
        ),
        DomainError::InsufficientStock {
            product_id,
            item_id,
            requested,
            available,
        } => json_error_with(
            StatusCode::UNPROCESSABLE_ENTITY,
            "insufficient_stock",
            message,
            json!({
                "product_id": product_id,
                "item_id": item_id,
                "requested": requested,
                "available": available,
            }),
        ),
        DomainError::ConcurrencyConflict(_) => (
            StatusCode::CONFLICT,
            axum::Json(json!({
                "error": "conflict",
                "message": message,
                "retryable": true,
            })),
        )
            .into_response(),
        DomainError::Validation(_) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", message)
        }
    }
}

pub fn replay_error_to_response(err: ReplayError) -> axum::response::Response {
    match err {
        ReplayError::Store(e) => domain_error_to_response(e),
        ReplayError::Projection(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "ledger_corrupt",
            e.to_string(),
        ),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn json_error_with(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    details: Value,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
            "details": details,
        })),
    )
        .into_response()
}

/// Parse a path id, answering 400 `invalid_id` on failure.
pub fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, axum::response::Response> {
    raw.parse().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("invalid {what} id: {raw}"),
        )
    })
}
