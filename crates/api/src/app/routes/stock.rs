//! Direct stock movements.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    routing::post,
    Json, Router,
};

use stockflow_infra::services::{AdjustmentRequest, MovementRequest, TransferRequest};

use crate::app::services::{self, AppServices};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/receive", post(receive))
        .route("/issue", post(issue))
        .route("/transfer", post(transfer))
        .route("/adjust", post(adjust))
}

pub async fn receive(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<MovementRequest>,
) -> axum::response::Response {
    let actor = actor.user_id();
    services::call(services, StatusCode::CREATED, move |inv| {
        inv.receive_stock(actor, body)
    })
    .await
}

pub async fn issue(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<MovementRequest>,
) -> axum::response::Response {
    let actor = actor.user_id();
    services::call(services, StatusCode::CREATED, move |inv| {
        inv.issue_stock(actor, body)
    })
    .await
}

pub async fn transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<TransferRequest>,
) -> axum::response::Response {
    let actor = actor.user_id();
    services::call(services, StatusCode::CREATED, move |inv| {
        inv.transfer_stock(actor, body)
    })
    .await
}

pub async fn adjust(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<AdjustmentRequest>,
) -> axum::response::Response {
    let actor = actor.user_id();
    services::call(services, StatusCode::CREATED, move |inv| {
        inv.adjust_stock(actor, body)
    })
    .await
}
