//! Inventory domain module.
//!
//! This crate contains the catalog records stock is kept against, the ledger
//! record types, and the quantity store derived from the ledger. Everything is
//! deterministic domain logic (no IO, no threads, no storage).

pub mod catalog;
pub mod ledger;
pub mod stock;
pub mod transaction;

pub use catalog::{
    LocationCode, NewLocation, NewProduct, NewWarehouse, Product, ProductStatus, Warehouse,
    WarehouseLocation,
};
pub use ledger::{LEDGER_STREAM, plan, quantity_for_order_item};
pub use stock::{BucketKey, StockDelta, StockLevels, StockMismatch, StockView};
pub use transaction::{AdjustmentReason, InventoryTransaction, TransactionDraft, TransactionType};
