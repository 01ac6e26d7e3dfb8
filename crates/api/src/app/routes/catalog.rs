use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use stockflow_core::{ProductId, WarehouseId};
use stockflow_inventory::{NewLocation, NewProduct, NewWarehouse};

use crate::app::services::{self, AppServices};
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn products_router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/low-stock", get(low_stock))
        .route("/:id", get(get_product))
        .route("/:id/stock", get(product_stock))
}

pub fn warehouses_router() -> Router {
    Router::new()
        .route("/", get(list_warehouses).post(create_warehouse))
        .route("/:id/locations", get(list_locations).post(create_location))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<NewProduct>,
) -> axum::response::Response {
    let actor = actor.user_id();
    services::call(services, StatusCode::CREATED, move |inv| {
        inv.create_product(actor, body)
    })
    .await
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    services::call(services, StatusCode::OK, |inv| inv.products()).await
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match errors::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    services::call(services, StatusCode::OK, move |inv| inv.product(id)).await
}

pub async fn product_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match errors::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    services::call(services, StatusCode::OK, move |inv| inv.product_stock(id)).await
}

pub async fn low_stock(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    services::call(services, StatusCode::OK, |inv| inv.low_stock()).await
}

pub async fn create_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<NewWarehouse>,
) -> axum::response::Response {
    let actor = actor.user_id();
    services::call(services, StatusCode::CREATED, move |inv| {
        inv.create_warehouse(actor, body)
    })
    .await
}

pub async fn list_warehouses(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    services::call(services, StatusCode::OK, |inv| inv.warehouses()).await
}

pub async fn create_location(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::CreateLocationRequest>,
) -> axum::response::Response {
    let warehouse_id: WarehouseId = match errors::parse_id(&id, "warehouse") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let actor = actor.user_id();
    services::call(services, StatusCode::CREATED, move |inv| {
        inv.create_location(
            actor,
            NewLocation {
                warehouse_id,
                code: body.code,
            },
        )
    })
    .await
}

pub async fn list_locations(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let warehouse_id: WarehouseId = match errors::parse_id(&id, "warehouse") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    services::call(services, StatusCode::OK, move |inv| inv.locations(warehouse_id)).await
}
