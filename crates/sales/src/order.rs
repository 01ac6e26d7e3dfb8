use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockflow_core::{
    AggregateRoot, CustomerId, DomainError, DomainResult, LocationId, OrderItemId, ProductId,
    SalesOrderId, UserId, WarehouseId,
};
use stockflow_inventory::TransactionDraft;
use stockflow_pricing::{LineInput, sales_totals, validate_line};

/// Sales order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalesOrderStatus {
    Draft,
    Confirmed,
    Partial,
    Fulfilled,
    Cancelled,
}

impl SalesOrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Confirmed => "confirmed",
            Self::Partial => "partial",
            Self::Fulfilled => "fulfilled",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Fulfilled | Self::Cancelled)
    }

    pub fn can_fulfill(self) -> bool {
        matches!(self, Self::Confirmed | Self::Partial)
    }
}

impl core::fmt::Display for SalesOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Partial,
    Paid,
}

/// Sales order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Decimal,
    /// Percent, 0..=100.
    pub discount: Decimal,
    pub total_price: Decimal,
    /// Fulfilled-to-date; always equals the sum of issue entries for this item.
    pub fulfilled_quantity: i64,
}

impl SalesOrderItem {
    pub fn remaining(&self) -> i64 {
        self.quantity - self.fulfilled_quantity
    }

    fn line(&self) -> LineInput {
        LineInput::new(self.quantity, self.unit_price).with_discount(self.discount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSalesOrder {
    pub customer_id: CustomerId,
    pub warehouse_id: WarehouseId,
    #[serde(default)]
    pub order_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shipping_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shipping_cost: Decimal,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesItemUpdate {
    pub quantity: Option<i64>,
    pub unit_price: Option<Decimal>,
    pub discount: Option<Decimal>,
}

/// One line of a fulfill call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentLine {
    pub item_id: OrderItemId,
    pub quantity_fulfilled: i64,
    /// Pick location; picked across the warehouse when absent.
    #[serde(default)]
    pub location_id: Option<LocationId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedIssue {
    pub item_id: OrderItemId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub quantity: i64,
    pub location_id: Option<LocationId>,
}

impl PlannedIssue {
    pub fn to_draft(&self, reference: &str, user: UserId, notes: &str) -> TransactionDraft {
        let mut draft =
            TransactionDraft::issue(self.product_id, self.warehouse_id, self.quantity, user)
                .with_reference(reference)
                .with_notes(notes)
                .for_order_item(self.item_id);
        if let Some(location) = self.location_id {
            draft = draft.from_location(location);
        }
        draft
    }
}

/// Aggregate root: SalesOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrder {
    id: SalesOrderId,
    order_number: String,
    customer_id: CustomerId,
    warehouse_id: WarehouseId,
    status: SalesOrderStatus,
    payment_status: PaymentStatus,
    order_date: DateTime<Utc>,
    shipping_date: Option<DateTime<Utc>>,
    tax_rate: Decimal,
    subtotal: Decimal,
    tax_amount: Decimal,
    shipping_cost: Decimal,
    total_amount: Decimal,
    notes: String,
    items: Vec<SalesOrderItem>,
    created_by: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl SalesOrder {
    /// `tax_rate` is fixed on the order at creation.
    pub fn create(
        id: SalesOrderId,
        order_number: impl Into<String>,
        input: NewSalesOrder,
        tax_rate: Decimal,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let order_number = order_number.into();
        if order_number.trim().is_empty() {
            return Err(DomainError::validation("order number cannot be empty"));
        }
        if input.shipping_cost.is_sign_negative() {
            return Err(DomainError::validation("shipping cost cannot be negative"));
        }

        let mut order = Self {
            id,
            order_number,
            customer_id: input.customer_id,
            warehouse_id: input.warehouse_id,
            status: SalesOrderStatus::Draft,
            payment_status: PaymentStatus::Unpaid,
            order_date: input.order_date.unwrap_or(now),
            shipping_date: input.shipping_date,
            tax_rate,
            subtotal: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            shipping_cost: input.shipping_cost,
            total_amount: Decimal::ZERO,
            notes: input.notes,
            items: Vec::new(),
            created_by,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        order.replace_items(Vec::new(), input.shipping_cost)?;
        Ok(order)
    }

    pub fn id_typed(&self) -> SalesOrderId {
        self.id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn warehouse_id(&self) -> WarehouseId {
        self.warehouse_id
    }

    pub fn status(&self) -> SalesOrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn shipping_date(&self) -> Option<DateTime<Utc>> {
        self.shipping_date
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    pub fn tax_amount(&self) -> Decimal {
        self.tax_amount
    }

    pub fn shipping_cost(&self) -> Decimal {
        self.shipping_cost
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn items(&self) -> &[SalesOrderItem] {
        &self.items
    }

    pub fn item(&self, item_id: OrderItemId) -> Option<&SalesOrderItem> {
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

    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.items.iter().map(|i| i.product_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn fulfillment_note(&self) -> String {
        format!("Fulfilled for sales order: {}", self.order_number)
    }
}

impl AggregateRoot for SalesOrder {
    type Id = SalesOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl SalesOrder {
    fn ensure_draft(&self, action: &str) -> DomainResult<()> {
        if self.status != SalesOrderStatus::Draft {
            return Err(DomainError::invalid_state(format!(
                "cannot {action} on a {} sales order",
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

    /// Price `items` with `shipping` and install both with the new header.
    ///
    /// Nothing changes when an amount leaves the decimal range.
    fn replace_items(
        &mut self,
        mut items: Vec<SalesOrderItem>,
        shipping: Decimal,
    ) -> DomainResult<()> {
        for item in &mut items {
            item.total_price = item.line().total_price()?;
        }
        let lines: Vec<LineInput> = items.iter().map(SalesOrderItem::line).collect();
        let totals = sales_totals(&lines, self.tax_rate, shipping)?;
        self.items = items;
        self.subtotal = totals.subtotal;
        self.tax_amount = totals.tax;
        self.shipping_cost = totals.shipping;
        self.total_amount = totals.total;
        Ok(())
    }

    pub fn add_item(
        &mut self,
        item_id: OrderItemId,
        product_id: ProductId,
        quantity: i64,
        unit_price: Decimal,
        discount: Decimal,
        now: DateTime<Utc>,
    ) -> DomainResult<&SalesOrderItem> {
        self.ensure_draft("add items")?;
        let line = LineInput::new(quantity, unit_price).with_discount(discount);
        validate_line(&line)?;

        let mut items = self.items.clone();
        items.push(SalesOrderItem {
            id: item_id,
            product_id,
            quantity,
            unit_price,
            discount,
            total_price: Decimal::ZERO,
            fulfilled_quantity: 0,
        });
        self.replace_items(items, self.shipping_cost)?;
        self.touch(now);

        let idx = self.items.len() - 1;
        Ok(&self.items[idx])
    }

    pub fn update_item(
        &mut self,
        item_id: OrderItemId,
        update: SalesItemUpdate,
        now: DateTime<Utc>,
    ) -> DomainResult<&SalesOrderItem> {
        self.ensure_draft("update items")?;
        let idx = self.item_index(item_id)?;

        let current = &self.items[idx];
        let line = LineInput::new(
            update.quantity.unwrap_or(current.quantity),
            update.unit_price.unwrap_or(current.unit_price),
        )
        .with_discount(update.discount.unwrap_or(current.discount));
        validate_line(&line).map_err(|e| e.for_item(item_id))?;

        let mut items = self.items.clone();
        items[idx].quantity = line.quantity;
        items[idx].unit_price = line.unit_price;
        items[idx].discount = line.discount;
        self.replace_items(items, self.shipping_cost)?;
        self.touch(now);
        Ok(&self.items[idx])
    }

    pub fn remove_item(&mut self, item_id: OrderItemId, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_draft("remove items")?;
        let idx = self.item_index(item_id)?;
        let mut items = self.items.clone();
        items.remove(idx);
        self.replace_items(items, self.shipping_cost)?;
        self.touch(now);
        Ok(())
    }

    /// Shipping is set externally; allowed until the order is terminal.
    pub fn set_shipping_cost(&mut self, shipping: Decimal, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_state(format!(
                "cannot change shipping on a {} sales order",
                self.status
            )));
        }
        if shipping.is_sign_negative() {
            return Err(DomainError::validation("shipping cost cannot be negative"));
        }
        self.replace_items(self.items.clone(), shipping)?;
        self.touch(now);
        Ok(())
    }

    /// draft → confirmed.
    pub fn confirm(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_draft("confirm")?;
        if self.items.is_empty() {
            return Err(DomainError::validation(
                "cannot confirm sales order without items",
            ));
        }
        self.status = SalesOrderStatus::Confirmed;
        self.touch(now);
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_state(format!(
                "sales order {} already {}",
                self.order_number, self.status
            )));
        }
        self.status = SalesOrderStatus::Cancelled;
        self.touch(now);
        Ok(())
    }

    /// Validate a whole fulfill call without changing anything.
    ///
    /// Stock availability is not checked here; the ledger does that when the
    /// issues are appended inside the same scope.
    pub fn plan_fulfillment(&self, lines: &[FulfillmentLine]) -> DomainResult<Vec<PlannedIssue>> {
        if !self.status.can_fulfill() {
            return Err(DomainError::invalid_state(format!(
                "cannot fulfill a {} sales order",
                self.status
            )));
        }
        if lines.is_empty() {
            return Err(DomainError::validation("fulfillment has no lines"));
        }

        let mut claimed: HashMap<OrderItemId, i64> = HashMap::new();
        let mut planned = Vec::with_capacity(lines.len());

        for line in lines {
            let item = &self.items[self.item_index(line.item_id)?];
            if line.quantity_fulfilled <= 0 {
                return Err(DomainError::invalid_quantity(
                    line.quantity_fulfilled,
                    "quantity fulfilled must be positive",
                )
                .for_item(item.id));
            }

            let already = claimed.entry(item.id).or_insert(0);
            let remaining = item.remaining() - *already;
            if line.quantity_fulfilled > remaining {
                return Err(DomainError::invalid_quantity(
                    line.quantity_fulfilled,
                    format!("exceeds remaining quantity {remaining}"),
                )
                .for_item(item.id));
            }
            *already += line.quantity_fulfilled;

            planned.push(PlannedIssue {
                item_id: item.id,
                product_id: item.product_id,
                warehouse_id: self.warehouse_id,
                quantity: line.quantity_fulfilled,
                location_id: line.location_id,
            });
        }
        Ok(planned)
    }

    /// Record accepted issues, stamp the shipping date and recompute status.
    pub fn apply_fulfillment(
        &mut self,
        planned: &[PlannedIssue],
        shipping_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        for p in planned {
            let idx = self.item_index(p.item_id)?;
            self.items[idx].fulfilled_quantity += p.quantity;
        }

        self.shipping_date = Some(shipping_date.unwrap_or(now));
        self.status = if self.items.iter().all(|i| i.remaining() == 0) {
            SalesOrderStatus::Fulfilled
        } else {
            SalesOrderStatus::Partial
        };
        self.touch(now);
        Ok(())
    }
}
