//! Sales order workflow and fulfillment.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use stockflow_core::{
    AggregateRoot, DomainResult, ExpectedVersion, OrderItemId, ProductId, SalesOrderId, UserId,
};
use stockflow_sales::{FulfillmentLine, NewSalesOrder, SalesItemUpdate, SalesOrder};

use super::InventoryService;
use crate::ledger;
use crate::store::{InventoryStore, LockSet, OrderKind, StoreSession};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSalesOrder {
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(flatten)]
    pub order: NewSalesOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddSalesItem {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Defaults to the product's list price.
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    /// Percent, 0..=100.
    #[serde(default)]
    pub discount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillRequest {
    pub items: Vec<FulfillmentLine>,
    #[serde(default)]
    pub shipping_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl<S: InventoryStore> InventoryService<S> {
    /// The order's tax rate is taken from configuration at creation.
    pub fn create_sales_order(
        &self,
        actor: UserId,
        req: CreateSalesOrder,
    ) -> DomainResult<SalesOrder> {
        self.store().warehouse(req.order.warehouse_id)?;
        let number = match req.order_number {
            Some(n) => n,
            None => self.store().next_order_number(OrderKind::Sales)?,
        };
        let order = SalesOrder::create(
            SalesOrderId::new(),
            number,
            req.order,
            self.guard.config().sales_tax_rate,
            actor,
            Utc::now(),
        )?;

        let locks = LockSet::new().sales_order(order.id_typed());
        self.guard.run("sales_order.create", actor, &locks, |scope| {
            scope.session().save_sales_order(order.clone())?;
            scope.audit("create", "sales_order", order.id(), None, Some(&order));
            Ok(order)
        })
    }

    pub fn sales_order(&self, id: SalesOrderId) -> DomainResult<SalesOrder> {
        self.store().sales_order(id)
    }

    pub fn sales_orders(&self) -> DomainResult<Vec<SalesOrder>> {
        self.store().sales_orders()
    }

    pub fn add_sales_order_item(
        &self,
        actor: UserId,
        id: SalesOrderId,
        req: AddSalesItem,
    ) -> DomainResult<SalesOrder> {
        let product = self.store().product(req.product_id)?;
        let unit_price = req.unit_price.unwrap_or_else(|| product.unit_price());
        let item_id = OrderItemId::new();
        self.edit_sales_order(actor, id, "sales_order.add_item", |order| {
            order
                .add_item(
                    item_id,
                    req.product_id,
                    req.quantity,
                    unit_price,
                    req.discount,
                    Utc::now(),
                )
                .map(|_| ())
        })
    }

    pub fn update_sales_order_item(
        &self,
        actor: UserId,
        id: SalesOrderId,
        item_id: OrderItemId,
        update: SalesItemUpdate,
    ) -> DomainResult<SalesOrder> {
        self.edit_sales_order(actor, id, "sales_order.update_item", |order| {
            order
                .update_item(item_id, update.clone(), Utc::now())
                .map(|_| ())
        })
    }

    pub fn remove_sales_order_item(
        &self,
        actor: UserId,
        id: SalesOrderId,
        item_id: OrderItemId,
    ) -> DomainResult<SalesOrder> {
        self.edit_sales_order(actor, id, "sales_order.remove_item", |order| {
            order.remove_item(item_id, Utc::now())
        })
    }

    pub fn set_sales_order_shipping(
        &self,
        actor: UserId,
        id: SalesOrderId,
        shipping_cost: Decimal,
    ) -> DomainResult<SalesOrder> {
        self.edit_sales_order(actor, id, "sales_order.set_shipping", |order| {
            order.set_shipping_cost(shipping_cost, Utc::now())
        })
    }

    pub fn confirm_sales_order(&self, actor: UserId, id: SalesOrderId) -> DomainResult<SalesOrder> {
        self.edit_sales_order(actor, id, "sales_order.confirm", |order| {
            order.confirm(Utc::now())
        })
    }

    pub fn cancel_sales_order(&self, actor: UserId, id: SalesOrderId) -> DomainResult<SalesOrder> {
        self.edit_sales_order(actor, id, "sales_order.cancel", |order| {
            order.cancel(Utc::now())
        })
    }

    /// Ship stock against an order.
    ///
    /// Availability is checked per line against what the scope already
    /// staged, so two lines for the same product draw from one pool. Any
    /// shortfall aborts the whole call.
    #[instrument(skip(self, req), fields(order_id = %id, lines = req.items.len()), err)]
    pub fn fulfill_sales_order(
        &self,
        actor: UserId,
        id: SalesOrderId,
        req: FulfillRequest,
    ) -> DomainResult<SalesOrder> {
        let fulfilled = self.guard.retry(|| {
            let snapshot = self.store().sales_order(id)?;
            let locks = LockSet::new()
                .sales_order(id)
                .stock_all(snapshot.product_ids());

            self.guard.run("sales_order.fulfill", actor, &locks, |scope| {
                let mut order = scope.session().sales_order(id)?;
                ExpectedVersion::Exact(snapshot.version()).check(order.version())?;

                let planned = order.plan_fulfillment(&req.items)?;
                let notes = req
                    .notes
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| order.fulfillment_note());
                for line in &planned {
                    let draft = line.to_draft(order.order_number(), actor, &notes);
                    ledger::append(scope.session(), draft).map_err(|e| e.for_item(line.item_id))?;
                }

                let before = order.clone();
                order.apply_fulfillment(&planned, req.shipping_date, Utc::now())?;
                scope.session().save_sales_order(order.clone())?;
                scope.audit("fulfill", "sales_order", id, Some(&before), Some(&order));
                Ok(order)
            })
        })?;

        info!(
            order_number = fulfilled.order_number(),
            status = %fulfilled.status(),
            "sales order fulfilled"
        );
        Ok(fulfilled)
    }

    fn edit_sales_order(
        &self,
        actor: UserId,
        id: SalesOrderId,
        operation: &'static str,
        mut edit: impl FnMut(&mut SalesOrder) -> DomainResult<()>,
    ) -> DomainResult<SalesOrder> {
        let locks = LockSet::new().sales_order(id);
        self.guard.retry(|| {
            self.guard.run(operation, actor, &locks, |scope| {
                let mut order = scope.session().sales_order(id)?;
                let before = order.clone();
                edit(&mut order)?;
                scope.session().save_sales_order(order.clone())?;
                scope.audit(operation, "sales_order", id, Some(&before), Some(&order));
                Ok(order)
            })
        })
    }
}
