use axum::Router;

pub mod catalog;
pub mod ledger;
pub mod purchases;
pub mod sales;
pub mod stock;
pub mod system;

/// Router for all endpoints that act on behalf of a user.
pub fn router() -> Router {
    Router::new()
        .nest("/products", catalog::products_router())
        .nest("/warehouses", catalog::warehouses_router())
        .nest("/stock", stock::router())
        .nest("/purchase-orders", purchases::router())
        .nest("/sales-orders", sales::router())
        .nest("/ledger", ledger::router())
}
