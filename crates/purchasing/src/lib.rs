//! Purchasing domain module (purchase orders and receiving).
//!
//! This crate contains business rules for purchase orders, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). Receiving is split
//! in two: [`PurchaseOrder::plan_receipt`] validates a whole call up front, and
//! [`PurchaseOrder::apply_receipt`] is only run once the ledger accepted it.

pub mod order;

pub use order::{
    ItemUpdate, NewPurchaseOrder, PlannedReceipt, PurchaseOrder, PurchaseOrderItem,
    PurchaseOrderStatus, ReceiptLine,
};
