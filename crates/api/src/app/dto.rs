use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockflow_core::OrderItemId;
use stockflow_inventory::LocationCode;

#[derive(Debug, Deserialize)]
pub struct SetShippingRequest {
    pub shipping_cost: Decimal,
}

/// Location body; the warehouse comes from the path.
#[derive(Debug, Deserialize)]
pub struct CreateLocationRequest {
    #[serde(flatten)]
    pub code: LocationCode,
}

#[derive(Debug, Serialize)]
pub struct ItemProgress {
    pub item_id: OrderItemId,
    pub quantity: i64,
}
