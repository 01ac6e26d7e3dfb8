//! Purchase order workflow and receiving.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use stockflow_core::{
    AggregateRoot, DomainResult, ExpectedVersion, OrderItemId, ProductId, PurchaseOrderId, UserId,
};
use stockflow_purchasing::{ItemUpdate, NewPurchaseOrder, PurchaseOrder, ReceiptLine};

use super::InventoryService;
use crate::ledger;
use crate::store::{InventoryStore, LockSet, OrderKind, StoreSession};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePurchaseOrder {
    /// Generated (`PO-000001`, ...) when absent.
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(flatten)]
    pub order: NewPurchaseOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddPurchaseItem {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Defaults to the product's unit cost.
    #[serde(default)]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveRequest {
    pub items: Vec<ReceiptLine>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl<S: InventoryStore> InventoryService<S> {
    pub fn create_purchase_order(
        &self,
        actor: UserId,
        req: CreatePurchaseOrder,
    ) -> DomainResult<PurchaseOrder> {
        self.store().warehouse(req.order.warehouse_id)?;
        let number = match req.order_number {
            Some(n) => n,
            None => self.store().next_order_number(OrderKind::Purchase)?,
        };
        let order = PurchaseOrder::create(PurchaseOrderId::new(), number, req.order, actor, Utc::now())?;

        let locks = LockSet::new().purchase_order(order.id_typed());
        self.guard.run("purchase_order.create", actor, &locks, |scope| {
            scope.session().save_purchase_order(order.clone())?;
            scope.audit("create", "purchase_order", order.id(), None, Some(&order));
            Ok(order)
        })
    }

    pub fn purchase_order(&self, id: PurchaseOrderId) -> DomainResult<PurchaseOrder> {
        self.store().purchase_order(id)
    }

    pub fn purchase_orders(&self) -> DomainResult<Vec<PurchaseOrder>> {
        self.store().purchase_orders()
    }

    pub fn add_purchase_order_item(
        &self,
        actor: UserId,
        id: PurchaseOrderId,
        req: AddPurchaseItem,
    ) -> DomainResult<PurchaseOrder> {
        let product = self.store().product(req.product_id)?;
        let unit_price = req.unit_price.unwrap_or_else(|| product.unit_cost());
        let item_id = OrderItemId::new();
        self.edit_purchase_order(actor, id, "purchase_order.add_item", |order| {
            order
                .add_item(item_id, req.product_id, req.quantity, unit_price, Utc::now())
                .map(|_| ())
        })
    }

    pub fn update_purchase_order_item(
        &self,
        actor: UserId,
        id: PurchaseOrderId,
        item_id: OrderItemId,
        update: ItemUpdate,
    ) -> DomainResult<PurchaseOrder> {
        self.edit_purchase_order(actor, id, "purchase_order.update_item", |order| {
            order
                .update_item(item_id, update.clone(), Utc::now())
                .map(|_| ())
        })
    }

    pub fn remove_purchase_order_item(
        &self,
        actor: UserId,
        id: PurchaseOrderId,
        item_id: OrderItemId,
    ) -> DomainResult<PurchaseOrder> {
        self.edit_purchase_order(actor, id, "purchase_order.remove_item", |order| {
            order.remove_item(item_id, Utc::now())
        })
    }

    pub fn submit_purchase_order(
        &self,
        actor: UserId,
        id: PurchaseOrderId,
    ) -> DomainResult<PurchaseOrder> {
        self.edit_purchase_order(actor, id, "purchase_order.submit", |order| {
            order.submit(Utc::now())
        })
    }

    pub fn approve_purchase_order(
        &self,
        actor: UserId,
        id: PurchaseOrderId,
    ) -> DomainResult<PurchaseOrder> {
        self.edit_purchase_order(actor, id, "purchase_order.approve", |order| {
            order.approve(Utc::now())
        })
    }

    /// Cancel takes the order lock, so it serializes with an in-flight receive.
    pub fn cancel_purchase_order(
        &self,
        actor: UserId,
        id: PurchaseOrderId,
    ) -> DomainResult<PurchaseOrder> {
        self.edit_purchase_order(actor, id, "purchase_order.cancel", |order| {
            order.cancel(Utc::now())
        })
    }

    /// Receive stock against an order.
    ///
    /// All lines are validated before anything is posted; one receive
    /// transaction is appended per line and the order's received quantities
    /// and status change in the same scope.
    #[instrument(skip(self, req), fields(order_id = %id, lines = req.items.len()), err)]
    pub fn receive_purchase_order(
        &self,
        actor: UserId,
        id: PurchaseOrderId,
        req: ReceiveRequest,
    ) -> DomainResult<PurchaseOrder> {
        let received = self.guard.retry(|| {
            let snapshot = self.store().purchase_order(id)?;
            let locks = LockSet::new()
                .purchase_order(id)
                .stock_all(snapshot.product_ids());

            self.guard.run("purchase_order.receive", actor, &locks, |scope| {
                let mut order = scope.session().purchase_order(id)?;
                ExpectedVersion::Exact(snapshot.version()).check(order.version())?;

                let planned = order.plan_receipt(&req.items)?;
                let notes = req
                    .notes
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| order.receipt_note());
                for line in &planned {
                    let draft = line.to_draft(order.order_number(), actor, &notes);
                    ledger::append(scope.session(), draft).map_err(|e| e.for_item(line.item_id))?;
                }

                let before = order.clone();
                order.apply_receipt(&planned, Utc::now())?;
                scope.session().save_purchase_order(order.clone())?;
                scope.audit("receive", "purchase_order", id, Some(&before), Some(&order));
                Ok(order)
            })
        })?;

        info!(
            order_number = received.order_number(),
            status = %received.status(),
            "purchase order received"
        );
        Ok(received)
    }

    fn edit_purchase_order(
        &self,
        actor: UserId,
        id: PurchaseOrderId,
        operation: &'static str,
        mut edit: impl FnMut(&mut PurchaseOrder) -> DomainResult<()>,
    ) -> DomainResult<PurchaseOrder> {
        let locks = LockSet::new().purchase_order(id);
        self.guard.retry(|| {
            self.guard.run(operation, actor, &locks, |scope| {
                let mut order = scope.session().purchase_order(id)?;
                let before = order.clone();
                edit(&mut order)?;
                scope.session().save_purchase_order(order.clone())?;
                scope.audit(operation, "purchase_order", id, Some(&before), Some(&order));
                Ok(order)
            })
        })
    }
}
