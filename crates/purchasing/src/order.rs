use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockflow_core::{
    AggregateRoot, DomainError, DomainResult, LocationId, OrderItemId, ProductId, PurchaseOrderId,
    SupplierId, UserId, WarehouseId,
};
use stockflow_inventory::TransactionDraft;
use stockflow_pricing::{LineInput, purchase_totals, validate_line};

/// Purchase order status lifecycle.
///
/// ```text
/// draft → pending → approved ─┬→ partial → received
///            └────────────────┘
/// any non-terminal → cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Draft,
    Pending,
    Approved,
    Partial,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Partial => "partial",
            Self::Received => "received",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Received | Self::Cancelled)
    }

    pub fn can_receive(self) -> bool {
        matches!(self, Self::Pending | Self::Approved | Self::Partial)
    }
}

impl core::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Purchase order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    /// Received-to-date; always equals the sum of receive entries for this item.
    pub received_quantity: i64,
}

impl PurchaseOrderItem {
    pub fn remaining(&self) -> i64 {
        self.quantity - self.received_quantity
    }

    fn line(&self) -> LineInput {
        LineInput::new(self.quantity, self.unit_price)
    }
}

/// Input for creating a purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPurchaseOrder {
    pub supplier_id: SupplierId,
    pub warehouse_id: WarehouseId,
    #[serde(default)]
    pub order_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expected_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_terms: String,
    #[serde(default)]
    pub shipping_terms: String,
    #[serde(default)]
    pub notes: String,
}

/// Partial edit of a draft item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub quantity: Option<i64>,
    pub unit_price: Option<Decimal>,
}

/// One line of a receive call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub item_id: OrderItemId,
    pub quantity_received: i64,
    /// Put-away location; the warehouse's unassigned stock when absent.
    #[serde(default)]
    pub location_id: Option<LocationId>,
}

/// A validated receipt line, ready for the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedReceipt {
    pub item_id: OrderItemId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub quantity: i64,
    pub location_id: Option<LocationId>,
}

impl PlannedReceipt {
    pub fn to_draft(&self, reference: &str, user: UserId, notes: &str) -> TransactionDraft {
        let mut draft =
            TransactionDraft::receive(self.product_id, self.warehouse_id, self.quantity, user)
                .with_reference(reference)
                .with_notes(notes)
                .for_order_item(self.item_id);
        if let Some(location) = self.location_id {
            draft = draft.into_location(location);
        }
        draft
    }
}

/// Aggregate root: PurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    order_number: String,
    supplier_id: SupplierId,
    warehouse_id: WarehouseId,
    status: PurchaseOrderStatus,
    order_date: DateTime<Utc>,
    expected_date: Option<DateTime<Utc>>,
    payment_terms: String,
    shipping_terms: String,
    notes: String,
    total_amount: Decimal,
    items: Vec<PurchaseOrderItem>,
    created_by: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl PurchaseOrder {
    pub fn create(
        id: PurchaseOrderId,
        order_number: impl Into<String>,
        input: NewPurchaseOrder,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let order_number = order_number.into();
        if order_number.trim().is_empty() {
            return Err(DomainError::validation("order number cannot be empty"));
        }

        Ok(Self {
            id,
            order_number,
            supplier_id: input.supplier_id,
            warehouse_id: input.warehouse_id,
            status: PurchaseOrderStatus::Draft,
            order_date: input.order_date.unwrap_or(now),
            expected_date: input.expected_date,
            payment_terms: input.payment_terms,
            shipping_terms: input.shipping_terms,
            notes: input.notes,
            total_amount: Decimal::ZERO,
            items: Vec::new(),
            created_by,
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn supplier_id(&self) -> SupplierId {
        self.supplier_id
    }

    pub fn warehouse_id(&self) -> WarehouseId {
        self.warehouse_id
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn expected_date(&self) -> Option<DateTime<Utc>> {
        self.expected_date
    }

    pub fn payment_terms(&self) -> &str {
        &self.payment_terms
    }

    pub fn shipping_terms(&self) -> &str {
        &self.shipping_terms
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn items(&self) -> &[PurchaseOrderItem] {
        &self.items
    }

    pub fn item(&self, item_id: OrderItemId) -> Option<&PurchaseOrderItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Products touched by this order, sorted and deduplicated.
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.items.iter().map(|i| i.product_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Default ledger note for receipts against this order.
    pub fn receipt_note(&self) -> String {
        format!("Received from purchase order: {}", self.order_number)
    }
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl PurchaseOrder {
    fn ensure_draft(&self, action: &str) -> DomainResult<()> {
        if self.status != PurchaseOrderStatus::Draft {
            return Err(DomainError::invalid_state(format!(
                "cannot {action} on a {} purchase order",
                self.status
            )));
        }
        Ok(())
    }

    fn item_index(&self, item_id: OrderItemId) -> DomainResult<usize> {
        self.items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| DomainError::ItemNotInOrder {
                order_id: self.id.to_string(),
                item_id: item_id.to_string(),
            })
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.version += 1;
    }

    /// Price `items` and install them with the new header total.
    ///
    /// Nothing changes when an amount leaves the decimal range.
    fn replace_items(&mut self, mut items: Vec<PurchaseOrderItem>) -> DomainResult<()> {
        for item in &mut items {
            item.total_price = item.line().total_price()?;
        }
        let lines: Vec<LineInput> = items.iter().map(PurchaseOrderItem::line).collect();
        let totals = purchase_totals(&lines)?;
        self.items = items;
        self.total_amount = totals.total_amount;
        Ok(())
    }

    pub fn add_item(
        &mut self,
        item_id: OrderItemId,
        product_id: ProductId,
        quantity: i64,
        unit_price: Decimal,
        now: DateTime<Utc>,
    ) -> DomainResult<&PurchaseOrderItem> {
        self.ensure_draft("add items")?;
        let line = LineInput::new(quantity, unit_price);
        validate_line(&line)?;

        let mut items = self.items.clone();
        items.push(PurchaseOrderItem {
            id: item_id,
            product_id,
            quantity,
            unit_price,
            total_price: Decimal::ZERO,
            received_quantity: 0,
        });
        self.replace_items(items)?;
        self.touch(now);

        let idx = self.items.len() - 1;
        Ok(&self.items[idx])
    }

    pub fn update_item(
        &mut self,
        item_id: OrderItemId,
        update: ItemUpdate,
        now: DateTime<Utc>,
    ) -> DomainResult<&PurchaseOrderItem> {
        self.ensure_draft("update items")?;
        let idx = self.item_index(item_id)?;

        let current = &self.items[idx];
        let line = LineInput::new(
            update.quantity.unwrap_or(current.quantity),
            update.unit_price.unwrap_or(current.unit_price),
        );
        validate_line(&line).map_err(|e| e.for_item(item_id))?;

        let mut items = self.items.clone();
        items[idx].quantity = line.quantity;
        items[idx].unit_price = line.unit_price;
        self.replace_items(items)?;
        self.touch(now);
        Ok(&self.items[idx])
    }

    pub fn remove_item(&mut self, item_id: OrderItemId, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_draft("remove items")?;
        let idx = self.item_index(item_id)?;
        let mut items = self.items.clone();
        items.remove(idx);
        self.replace_items(items)?;
        self.touch(now);
        Ok(())
    }

    /// draft → pending.
    pub fn submit(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_draft("submit")?;
        if self.items.is_empty() {
            return Err(DomainError::validation(
                "cannot submit purchase order without items",
            ));
        }
        self.status = PurchaseOrderStatus::Pending;
        self.touch(now);
        Ok(())
    }

    /// pending → approved.
    pub fn approve(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != PurchaseOrderStatus::Pending {
            return Err(DomainError::invalid_state(format!(
                "only pending purchase orders can be approved (status: {})",
                self.status
            )));
        }
        self.status = PurchaseOrderStatus::Approved;
        self.touch(now);
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_state(format!(
                "purchase order {} already {}",
                self.order_number, self.status
            )));
        }
        self.status = PurchaseOrderStatus::Cancelled;
        self.touch(now);
        Ok(())
    }

    /// Validate a whole receive call without changing anything.
    ///
    /// Lines are checked in caller order; repeated lines for the same item are
    /// checked against what the earlier lines already claimed.
    pub fn plan_receipt(&self, lines: &[ReceiptLine]) -> DomainResult<Vec<PlannedReceipt>> {
        if !self.status.can_receive() {
            return Err(DomainError::invalid_state(format!(
                "cannot receive against a {} purchase order",
                self.status
            )));
        }
        if lines.is_empty() {
            return Err(DomainError::validation("receipt has no lines"));
        }

        let mut claimed: HashMap<OrderItemId, i64> = HashMap::new();
        let mut planned = Vec::with_capacity(lines.len());

        for line in lines {
            let item = &self.items[self.item_index(line.item_id)?];
            if line.quantity_received <= 0 {
                return Err(DomainError::invalid_quantity(
                    line.quantity_received,
                    "quantity received must be positive",
                )
                .for_item(item.id));
            }

            let already = claimed.entry(item.id).or_insert(0);
            let remaining = item.remaining() - *already;
            if line.quantity_received > remaining {
                return Err(DomainError::invalid_quantity(
                    line.quantity_received,
                    format!("exceeds remaining quantity {remaining}"),
                )
                .for_item(item.id));
            }
            *already += line.quantity_received;

            planned.push(PlannedReceipt {
                item_id: item.id,
                product_id: item.product_id,
                warehouse_id: self.warehouse_id,
                quantity: line.quantity_received,
                location_id: line.location_id,
            });
        }
        Ok(planned)
    }

    /// Record accepted receipts and recompute status.
    pub fn apply_receipt(
        &mut self,
        planned: &[PlannedReceipt],
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        for p in planned {
            let idx = self.item_index(p.item_id)?;
            self.items[idx].received_quantity += p.quantity;
        }

        self.status = if self.items.iter().all(|i| i.remaining() == 0) {
            PurchaseOrderStatus::Received
        } else {
            PurchaseOrderStatus::Partial
        };
        self.touch(now);
        Ok(())
    }
}
