//! `stockflow-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod id;
pub mod money;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult, ErrorKind};
pub use id::{
    CustomerId, LocationId, OrderItemId, ProductId, PurchaseOrderId, SalesOrderId, SupplierId,
    TransactionId, UserId, WarehouseId,
};
pub use money::{percent, round_money, MONEY_SCALE};
