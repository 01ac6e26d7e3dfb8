#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;

use stockflow_core::{CustomerId, LocationId, ProductId, SupplierId, UserId, WarehouseId};
use stockflow_infra::{
    InMemoryAuditSink, InMemoryInventoryStore, InventoryConfig, InventoryService, LedgerEnvelope,
    services::{CreatePurchaseOrder, CreateSalesOrder, MovementRequest},
};
use stockflow_events::InMemoryEventBus;
use stockflow_inventory::{LocationCode, NewLocation, NewProduct, NewWarehouse};
use stockflow_purchasing::NewPurchaseOrder;
use stockflow_sales::NewSalesOrder;

pub struct Fixture {
    pub service: InventoryService<InMemoryInventoryStore>,
    pub bus: Arc<InMemoryEventBus<LedgerEnvelope>>,
    pub audit: Arc<InMemoryAuditSink>,
    pub actor: UserId,
    pub warehouse: WarehouseId,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(InventoryConfig::default())
    }

    pub fn with_config(config: InventoryConfig) -> Self {
        let audit = Arc::new(InMemoryAuditSink::new());
        let (service, bus) = stockflow_infra::in_memory(config, audit.clone());
        let actor = UserId::new();
        let warehouse = service
            .create_warehouse(
                actor,
                NewWarehouse {
                    name: "Main".into(),
                    address: "1 Dock Road".into(),
                },
            )
            .unwrap()
            .id();
        Self {
            service,
            bus,
            audit,
            actor,
            warehouse,
        }
    }

    pub fn product(&self, sku: &str) -> ProductId {
        self.service
            .create_product(
                self.actor,
                NewProduct {
                    sku: sku.into(),
                    name: format!("Product {sku}"),
                    reorder_level: 2,
                    unit_cost: Decimal::new(250, 2),
                    unit_price: Decimal::new(10000, 2),
                },
            )
            .unwrap()
            .id()
    }

    pub fn location(&self, bin: &str) -> LocationId {
        self.service
            .create_location(
                self.actor,
                NewLocation {
                    warehouse_id: self.warehouse,
                    code: LocationCode {
                        zone: "A".into(),
                        aisle: "01".into(),
                        rack: "R1".into(),
                        shelf: "S1".into(),
                        bin: bin.into(),
                    },
                },
            )
            .unwrap()
            .id()
    }

    pub fn stock(&self, product: ProductId, quantity: i64) {
        self.service
            .receive_stock(self.actor, self.movement(product, quantity, None))
            .unwrap();
    }

    pub fn movement(
        &self,
        product: ProductId,
        quantity: i64,
        location: Option<LocationId>,
    ) -> MovementRequest {
        MovementRequest {
            product_id: product,
            warehouse_id: self.warehouse,
            quantity,
            location_id: location,
            reference_number: None,
            notes: None,
        }
    }

    pub fn on_hand(&self, product: ProductId) -> i64 {
        self.service.product_stock(product).unwrap().quantity
    }

    pub fn new_purchase_order(&self) -> CreatePurchaseOrder {
        CreatePurchaseOrder {
            order_number: None,
            order: NewPurchaseOrder {
                supplier_id: SupplierId::new(),
                warehouse_id: self.warehouse,
                order_date: None,
                expected_date: None,
                payment_terms: "net 30".into(),
                shipping_terms: String::new(),
                notes: String::new(),
            },
        }
    }

    pub fn new_sales_order(&self) -> CreateSalesOrder {
        CreateSalesOrder {
            order_number: None,
            order: NewSalesOrder {
                customer_id: CustomerId::new(),
                warehouse_id: self.warehouse,
                order_date: None,
                shipping_date: None,
                shipping_cost: Decimal::ZERO,
                notes: String::new(),
            },
        }
    }
}
