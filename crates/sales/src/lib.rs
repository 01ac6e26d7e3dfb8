//! Sales domain module (sales orders and fulfillment).
//!
//! Pure domain logic. Fulfillment mirrors purchasing: plan the whole call,
//! let the ledger issue the stock, then apply.

pub mod order;

pub use order::{
    FulfillmentLine, NewSalesOrder, PaymentStatus, PlannedIssue, SalesItemUpdate, SalesOrder,
    SalesOrderItem, SalesOrderStatus,
};
