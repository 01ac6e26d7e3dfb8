//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Coarse classification of a [`DomainError`].
///
/// Boundaries (HTTP, CLI) branch on the kind; the variant carries the context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    InvalidQuantity,
    InsufficientStock,
    ConcurrencyConflict,
    Validation,
}

/// Domain-level error.
///
/// Every variant is deterministic for a given input and store state, except
/// `ConcurrencyConflict`, which depends on what ran concurrently and is the only
/// one that is worth retrying unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A referenced product/warehouse/location/order/item does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The operation is not allowed in the current status.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A line references an item that belongs to a different order.
    #[error("item {item_id} does not belong to order {order_id}")]
    ItemNotInOrder { order_id: String, item_id: String },

    /// Zero, negative, or over-remaining quantity.
    #[error("invalid quantity {requested}{}: {reason}", item_suffix(.item_id))]
    InvalidQuantity {
        item_id: Option<String>,
        requested: i64,
        reason: String,
    },

    /// Applying the movement would drive a quantity negative.
    #[error(
        "insufficient stock for product {product_id}{}: requested {requested}, available {available}",
        item_suffix(.item_id)
    )]
    InsufficientStock {
        product_id: String,
        item_id: Option<String>,
        requested: i64,
        available: i64,
    },

    /// Lock wait timed out or an optimistic version check failed.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Malformed input that is none of the above.
    #[error("validation failed: {0}")]
    Validation(String),
}

fn item_suffix(item_id: &Option<String>) -> String {
    match item_id {
        Some(id) => format!(" (item {id})"),
        None => String::new(),
    }
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn invalid_quantity(requested: i64, reason: impl Into<String>) -> Self {
        Self::InvalidQuantity {
            item_id: None,
            requested,
            reason: reason.into(),
        }
    }

    pub fn insufficient_stock(product_id: impl ToString, requested: i64, available: i64) -> Self {
        Self::InsufficientStock {
            product_id: product_id.to_string(),
            item_id: None,
            requested,
            available,
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::ConcurrencyConflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Attach the order item a quantity/stock failure belongs to.
    ///
    /// Other variants are returned unchanged.
    pub fn for_item(self, item: impl ToString) -> Self {
        match self {
            Self::InvalidQuantity {
                requested, reason, ..
            } => Self::InvalidQuantity {
                item_id: Some(item.to_string()),
                requested,
                reason,
            },
            Self::InsufficientStock {
                product_id,
                requested,
                available,
                ..
            } => Self::InsufficientStock {
                product_id,
                item_id: Some(item.to_string()),
                requested,
                available,
            },
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidState(_) | Self::ItemNotInOrder { .. } => ErrorKind::InvalidState,
            Self::InvalidQuantity { .. } => ErrorKind::InvalidQuantity,
            Self::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            Self::ConcurrencyConflict(_) => ErrorKind::ConcurrencyConflict,
            Self::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Only conflicts may be retried from the top of the operation.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ConcurrencyConflict
    }

    /// Order item the failure refers to, when known.
    pub fn item_id(&self) -> Option<&str> {
        match self {
            Self::ItemNotInOrder { item_id, .. } => Some(item_id),
            Self::InvalidQuantity { item_id, .. } | Self::InsufficientStock { item_id, .. } => {
                item_id.as_deref()
            }
            _ => None,
        }
    }
}
