//! Catalog records that stock is kept against.
//!
//! These are thin collaborators: creation and validation only. Quantities are
//! never stored here; they live in [`StockLevels`](crate::StockLevels) and only
//! the ledger changes them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockflow_core::{DomainError, DomainResult, LocationId, ProductId, WarehouseId};

/// Product status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Inactive,
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub reorder_level: i64,
    #[serde(default)]
    pub unit_cost: Decimal,
    #[serde(default)]
    pub unit_price: Decimal,
}

/// Product record. The SKU is immutable once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    sku: String,
    name: String,
    reorder_level: i64,
    unit_cost: Decimal,
    unit_price: Decimal,
    status: ProductStatus,
    created_at: DateTime<Utc>,
}

impl Product {
    pub fn create(id: ProductId, input: NewProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        let sku = input.sku.trim().to_string();
        if sku.is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if input.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if input.reorder_level < 0 {
            return Err(DomainError::validation("reorder_level cannot be negative"));
        }
        if input.unit_cost.is_sign_negative() || input.unit_price.is_sign_negative() {
            return Err(DomainError::validation("unit cost/price cannot be negative"));
        }

        Ok(Self {
            id,
            sku,
            name: input.name.trim().to_string(),
            reorder_level: input.reorder_level,
            unit_cost: input.unit_cost,
            unit_price: input.unit_price,
            status: ProductStatus::Active,
            created_at: now,
        })
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reorder_level(&self) -> i64 {
        self.reorder_level
    }

    pub fn unit_cost(&self) -> Decimal {
        self.unit_cost
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// At or below the reorder level.
    pub fn needs_reorder(&self, on_hand: i64) -> bool {
        on_hand <= self.reorder_level
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWarehouse {
    pub name: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    id: WarehouseId,
    name: String,
    address: String,
    created_at: DateTime<Utc>,
}

impl Warehouse {
    pub fn create(id: WarehouseId, input: NewWarehouse, now: DateTime<Utc>) -> DomainResult<Self> {
        if input.name.trim().is_empty() {
            return Err(DomainError::validation("warehouse name cannot be empty"));
        }
        Ok(Self {
            id,
            name: input.name.trim().to_string(),
            address: input.address,
            created_at: now,
        })
    }

    pub fn id(&self) -> WarehouseId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Physical address of a location inside a warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationCode {
    pub zone: String,
    pub aisle: String,
    pub rack: String,
    pub shelf: String,
    pub bin: String,
}

impl LocationCode {
    fn parts(&self) -> [&str; 5] {
        [
            self.zone.as_str(),
            self.aisle.as_str(),
            self.rack.as_str(),
            self.shelf.as_str(),
            self.bin.as_str(),
        ]
    }

    /// `zone-aisle-rack-shelf-bin`.
    pub fn code(&self) -> String {
        self.parts().map(str::trim).join("-")
    }

    fn validate(&self) -> DomainResult<()> {
        if self.parts().iter().any(|p| p.trim().is_empty()) {
            return Err(DomainError::validation(
                "zone, aisle, rack, shelf and bin are all required",
            ));
        }
        if self.parts().iter().any(|p| p.contains('-')) {
            return Err(DomainError::validation("location code parts cannot contain '-'"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLocation {
    pub warehouse_id: WarehouseId,
    #[serde(flatten)]
    pub code: LocationCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseLocation {
    id: LocationId,
    warehouse_id: WarehouseId,
    #[serde(flatten)]
    address: LocationCode,
    code: String,
    created_at: DateTime<Utc>,
}

impl WarehouseLocation {
    /// Uniqueness of `code` within the warehouse is checked by the store.
    pub fn create(id: LocationId, input: NewLocation, now: DateTime<Utc>) -> DomainResult<Self> {
        input.code.validate()?;
        Ok(Self {
            id,
            warehouse_id: input.warehouse_id,
            code: input.code.code(),
            address: input.code,
            created_at: now,
        })
    }

    pub fn id(&self) -> LocationId {
        self.id
    }

    pub fn warehouse_id(&self) -> WarehouseId {
        self.warehouse_id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn address(&self) -> &LocationCode {
        &self.address
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
