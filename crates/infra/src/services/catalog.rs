//! Catalog setup. Thin: no quantities, no ledger.

use chrono::Utc;

use stockflow_core::{DomainResult, LocationId, ProductId, UserId, WarehouseId};
use stockflow_inventory::{
    NewLocation, NewProduct, NewWarehouse, Product, Warehouse, WarehouseLocation,
};

use super::InventoryService;
use crate::audit::AuditRecord;
use crate::store::InventoryStore;

impl<S: InventoryStore> InventoryService<S> {
    pub fn create_product(&self, actor: UserId, input: NewProduct) -> DomainResult<Product> {
        let product = Product::create(ProductId::new(), input, Utc::now())?;
        self.store().insert_product(product.clone())?;
        self.audit_now(AuditRecord::new(
            actor,
            "create",
            "product",
            product.id(),
            None::<&Product>,
            Some(&product),
        ));
        Ok(product)
    }

    pub fn create_warehouse(&self, actor: UserId, input: NewWarehouse) -> DomainResult<Warehouse> {
        let warehouse = Warehouse::create(WarehouseId::new(), input, Utc::now())?;
        self.store().insert_warehouse(warehouse.clone())?;
        self.audit_now(AuditRecord::new(
            actor,
            "create",
            "warehouse",
            warehouse.id(),
            None::<&Warehouse>,
            Some(&warehouse),
        ));
        Ok(warehouse)
    }

    pub fn create_location(
        &self,
        actor: UserId,
        input: NewLocation,
    ) -> DomainResult<WarehouseLocation> {
        let location = WarehouseLocation::create(LocationId::new(), input, Utc::now())?;
        self.store().insert_location(location.clone())?;
        self.audit_now(AuditRecord::new(
            actor,
            "create",
            "warehouse_location",
            location.id(),
            None::<&WarehouseLocation>,
            Some(&location),
        ));
        Ok(location)
    }

    pub fn product(&self, id: ProductId) -> DomainResult<Product> {
        self.store().product(id)
    }

    pub fn products(&self) -> DomainResult<Vec<Product>> {
        self.store().products()
    }

    pub fn warehouses(&self) -> DomainResult<Vec<Warehouse>> {
        self.store().warehouses()
    }

    pub fn locations(&self, warehouse: WarehouseId) -> DomainResult<Vec<WarehouseLocation>> {
        self.store().warehouse(warehouse)?;
        self.store().locations(warehouse)
    }
}
