//! Ledger record types and the per-type input rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::{
    DomainError, DomainResult, LocationId, OrderItemId, ProductId, TransactionId, UserId,
    WarehouseId,
};
use stockflow_events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Receive,
    Issue,
    Transfer,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Receive => "receive",
            TransactionType::Issue => "issue",
            TransactionType::Transfer => "transfer",
            TransactionType::Adjustment => "adjustment",
        }
    }
}

impl core::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "receive" => Ok(TransactionType::Receive),
            "issue" => Ok(TransactionType::Issue),
            "transfer" => Ok(TransactionType::Transfer),
            "adjustment" => Ok(TransactionType::Adjustment),
            other => Err(DomainError::validation(format!(
                "unknown transaction type: {other}"
            ))),
        }
    }
}

/// Why an adjustment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentReason {
    /// Count corrected after a stock take.
    Recount,
    /// Stock turned up that was not on the books.
    Found,
    Damaged,
    Lost,
    Other,
}

/// A requested movement, before the ledger accepts it.
///
/// `quantity` is positive for receive/issue/transfer; for adjustments it is the
/// signed delta to the product total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    #[serde(default)]
    pub source_location_id: Option<LocationId>,
    #[serde(default)]
    pub destination_location_id: Option<LocationId>,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub quantity: i64,
    #[serde(default)]
    pub reference_number: String,
    pub user_id: UserId,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_item_id: Option<OrderItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<AdjustmentReason>,
}

impl TransactionDraft {
    fn new(
        transaction_type: TransactionType,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        quantity: i64,
        user_id: UserId,
    ) -> Self {
        Self {
            product_id,
            warehouse_id,
            source_location_id: None,
            destination_location_id: None,
            transaction_type,
            quantity,
            reference_number: String::new(),
            user_id,
            notes: String::new(),
            order_item_id: None,
            reason: None,
        }
    }

    pub fn receive(product: ProductId, warehouse: WarehouseId, quantity: i64, user: UserId) -> Self {
        Self::new(TransactionType::Receive, product, warehouse, quantity, user)
    }

    pub fn issue(product: ProductId, warehouse: WarehouseId, quantity: i64, user: UserId) -> Self {
        Self::new(TransactionType::Issue, product, warehouse, quantity, user)
    }

    pub fn transfer(
        product: ProductId,
        warehouse: WarehouseId,
        from: LocationId,
        to: LocationId,
        quantity: i64,
        user: UserId,
    ) -> Self {
        Self::new(TransactionType::Transfer, product, warehouse, quantity, user)
            .from_location(from)
            .into_location(to)
    }

    pub fn adjustment(product: ProductId, warehouse: WarehouseId, delta: i64, user: UserId) -> Self {
        Self::new(TransactionType::Adjustment, product, warehouse, delta, user)
    }

    pub fn from_location(mut self, location: LocationId) -> Self {
        self.source_location_id = Some(location);
        self
    }

    pub fn into_location(mut self, location: LocationId) -> Self {
        self.destination_location_id = Some(location);
        self
    }

    /// Location for an adjustment: credited when the delta is positive, debited otherwise.
    pub fn at_location(self, location: LocationId) -> Self {
        if self.quantity >= 0 {
            self.into_location(location)
        } else {
            self.from_location(location)
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference_number = reference.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn for_order_item(mut self, item: OrderItemId) -> Self {
        self.order_item_id = Some(item);
        self
    }

    pub fn with_reason(mut self, reason: AdjustmentReason) -> Self {
        self.reason = Some(reason);
        self
    }

    /// Change to the product total this movement causes once accepted.
    pub fn total_delta(&self) -> i64 {
        match self.transaction_type {
            TransactionType::Receive | TransactionType::Adjustment => self.quantity,
            TransactionType::Issue => -self.quantity,
            TransactionType::Transfer => 0,
        }
    }

    /// Shape checks that need no stock or catalog lookups.
    pub fn validate(&self) -> DomainResult<()> {
        use TransactionType::*;

        match self.transaction_type {
            Receive | Issue | Transfer if self.quantity <= 0 => {
                return Err(DomainError::invalid_quantity(
                    self.quantity,
                    format!("{} quantity must be positive", self.transaction_type),
                ));
            }
            Adjustment if self.quantity == 0 => {
                return Err(DomainError::invalid_quantity(0, "adjustment cannot be zero"));
            }
            // A debit is planned from the negated quantity.
            Adjustment if self.quantity == i64::MIN => {
                return Err(DomainError::invalid_quantity(
                    self.quantity,
                    "adjustment out of range",
                ));
            }
            _ => {}
        }

        match (
            self.transaction_type,
            self.source_location_id,
            self.destination_location_id,
        ) {
            (Receive, Some(_), _) => {
                return Err(DomainError::validation("receive has no source location"));
            }
            (Issue, _, Some(_)) => {
                return Err(DomainError::validation("issue has no destination location"));
            }
            (Transfer, Some(from), Some(to)) if from == to => {
                return Err(DomainError::validation(
                    "transfer source and destination must differ",
                ));
            }
            (Transfer, None, _) | (Transfer, _, None) => {
                return Err(DomainError::validation(
                    "transfer requires source and destination locations",
                ));
            }
            (Adjustment, Some(_), Some(_)) => {
                return Err(DomainError::validation("adjustment takes at most one location"));
            }
            (Adjustment, Some(_), None) if self.quantity > 0 => {
                return Err(DomainError::validation(
                    "positive adjustment credits a destination location",
                ));
            }
            (Adjustment, None, Some(_)) if self.quantity < 0 => {
                return Err(DomainError::validation(
                    "negative adjustment debits a source location",
                ));
            }
            _ => {}
        }

        if self.reason.is_some() && self.transaction_type != Adjustment {
            return Err(DomainError::validation("only adjustments carry a reason"));
        }
        if self.order_item_id.is_some() && !matches!(self.transaction_type, Receive | Issue) {
            return Err(DomainError::validation(
                "only receive and issue entries reference an order item",
            ));
        }
        Ok(())
    }
}

/// Immutable ledger entry. Never updated or deleted once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: TransactionId,
    #[serde(flatten)]
    pub details: TransactionDraft,
    pub created_at: DateTime<Utc>,
}

impl InventoryTransaction {
    pub fn record(id: TransactionId, details: TransactionDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            details,
            created_at,
        }
    }

    pub fn product_id(&self) -> ProductId {
        self.details.product_id
    }

    pub fn warehouse_id(&self) -> WarehouseId {
        self.details.warehouse_id
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.details.transaction_type
    }

    pub fn quantity(&self) -> i64 {
        self.details.quantity
    }

    pub fn reference_number(&self) -> &str {
        &self.details.reference_number
    }

    pub fn order_item_id(&self) -> Option<OrderItemId> {
        self.details.order_item_id
    }
}

impl Event for InventoryTransaction {
    fn event_type(&self) -> &'static str {
        match self.details.transaction_type {
            TransactionType::Receive => "inventory.transaction.receive",
            TransactionType::Issue => "inventory.transaction.issue",
            TransactionType::Transfer => "inventory.transaction.transfer",
            TransactionType::Adjustment => "inventory.transaction.adjustment",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
