use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};

use stockflow_core::{OrderItemId, PurchaseOrderId};
use stockflow_infra::services::{AddPurchaseItem, CreatePurchaseOrder, ReceiveRequest};
use stockflow_purchasing::ItemUpdate;

use crate::app::services::{self, AppServices};
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order))
        .route("/:id/items", post(add_item))
        .route("/:id/items/:item_id", patch(update_item).delete(remove_item))
        .route("/:id/items/:item_id/received", get(received_to_date))
        .route("/:id/submit", post(submit))
        .route("/:id/approve", post(approve))
        .route("/:id/cancel", post(cancel))
        .route("/:id/receive", post(receive))
}

fn order_id(raw: &str) -> Result<PurchaseOrderId, axum::response::Response> {
    errors::parse_id(raw, "purchase order")
}

fn order_and_item(
    (id, item): &(String, String),
) -> Result<(PurchaseOrderId, OrderItemId), axum::response::Response> {
    Ok((order_id(id)?, errors::parse_id(item, "order item")?))
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<CreatePurchaseOrder>,
) -> axum::response::Response {
    let actor = actor.user_id();
    services::call(services, StatusCode::CREATED, move |inv| {
        inv.create_purchase_order(actor, body)
    })
    .await
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    services::call(services, StatusCode::OK, |inv| inv.purchase_orders()).await
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    services::call(services, StatusCode::OK, move |inv| inv.purchase_order(id)).await
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<AddPurchaseItem>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let actor = actor.user_id();
    services::call(services, StatusCode::OK, move |inv| {
        inv.add_purchase_order_item(actor, id, body)
    })
    .await
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(path): Path<(String, String)>,
    Json(body): Json<ItemUpdate>,
) -> axum::response::Response {
    let (id, item) = match order_and_item(&path) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let actor = actor.user_id();
    services::call(services, StatusCode::OK, move |inv| {
        inv.update_purchase_order_item(actor, id, item, body)
    })
    .await
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(path): Path<(String, String)>,
) -> axum::response::Response {
    let (id, item) = match order_and_item(&path) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let actor = actor.user_id();
    services::call(services, StatusCode::OK, move |inv| {
        inv.remove_purchase_order_item(actor, id, item)
    })
    .await
}

pub async fn received_to_date(
    Extension(services): Extension<Arc<AppServices>>,
    Path(path): Path<(String, String)>,
) -> axum::response::Response {
    let (id, item) = match order_and_item(&path) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    services::call(services, StatusCode::OK, move |inv| {
        inv.received_to_date(id, item).map(|quantity| dto::ItemProgress {
            item_id: item,
            quantity,
        })
    })
    .await
}

pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let actor = actor.user_id();
    services::call(services, StatusCode::OK, move |inv| {
        inv.submit_purchase_order(actor, id)
    })
    .await
}

pub async fn approve(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let actor = actor.user_id();
    services::call(services, StatusCode::OK, move |inv| {
        inv.approve_purchase_order(actor, id)
    })
    .await
}

pub async fn cancel(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let actor = actor.user_id();
    services::call(services, StatusCode::OK, move |inv| {
        inv.cancel_purchase_order(actor, id)
    })
    .await
}

/// `POST /purchase-orders/:id/receive` with `{ items: [{item_id, quantity_received, location_id?}], notes }`.
pub async fn receive(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<ReceiveRequest>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let actor = actor.user_id();
    services::call(services, StatusCode::OK, move |inv| {
        inv.receive_purchase_order(actor, id, body)
    })
    .await
}
