use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, patch, post, put},
    Json, Router,
};

use stockflow_core::{OrderItemId, SalesOrderId};
use stockflow_infra::services::{AddSalesItem, CreateSalesOrder, FulfillRequest};
use stockflow_sales::SalesItemUpdate;

use crate::app::services::{self, AppServices};
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order))
        .route("/:id/items", post(add_item))
        .route("/:id/items/:item_id", patch(update_item).delete(remove_item))
        .route("/:id/items/:item_id/fulfilled", get(fulfilled_to_date))
        .route("/:id/shipping", put(set_shipping))
        .route("/:id/confirm", post(confirm))
        .route("/:id/cancel", post(cancel))
        .route("/:id/fulfill", post(fulfill))
}

fn order_id(raw: &str) -> Result<SalesOrderId, axum::response::Response> {
    errors::parse_id(raw, "sales order")
}

fn order_and_item(
    (id, item): &(String, String),
) -> Result<(SalesOrderId, OrderItemId), axum::response::Response> {
    Ok((order_id(id)?, errors::parse_id(item, "order item")?))
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<CreateSalesOrder>,
) -> axum::response::Response {
    let actor = actor.user_id();
    services::call(services, StatusCode::CREATED, move |inv| {
        inv.create_sales_order(actor, body)
    })
    .await
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    services::call(services, StatusCode::OK, |inv| inv.sales_orders()).await
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    services::call(services, StatusCode::OK, move |inv| inv.sales_order(id)).await
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<AddSalesItem>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let actor = actor.user_id();
    services::call(services, StatusCode::OK, move |inv| {
        inv.add_sales_order_item(actor, id, body)
    })
    .await
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(path): Path<(String, String)>,
    Json(body): Json<SalesItemUpdate>,
) -> axum::response::Response {
    let (id, item) = match order_and_item(&path) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let actor = actor.user_id();
    services::call(services, StatusCode::OK, move |inv| {
        inv.update_sales_order_item(actor, id, item, body)
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
        inv.remove_sales_order_item(actor, id, item)
    })
    .await
}

pub async fn fulfilled_to_date(
    Extension(services): Extension<Arc<AppServices>>,
    Path(path): Path<(String, String)>,
) -> axum::response::Response {
    let (id, item) = match order_and_item(&path) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    services::call(services, StatusCode::OK, move |inv| {
        inv.fulfilled_to_date(id, item).map(|quantity| dto::ItemProgress {
            item_id: item,
            quantity,
        })
    })
    .await
}

pub async fn set_shipping(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetShippingRequest>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let actor = actor.user_id();
    services::call(services, StatusCode::OK, move |inv| {
        inv.set_sales_order_shipping(actor, id, body.shipping_cost)
    })
    .await
}

pub async fn confirm(
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
        inv.confirm_sales_order(actor, id)
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
        inv.cancel_sales_order(actor, id)
    })
    .await
}

/// `POST /sales-orders/:id/fulfill` with
/// `{ items: [{item_id, quantity_fulfilled, location_id?}], shipping_date?, notes }`.
pub async fn fulfill(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<FulfillRequest>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let actor = actor.user_id();
    services::call(services, StatusCode::OK, move |inv| {
        inv.fulfill_sales_order(actor, id, body)
    })
    .await
}
