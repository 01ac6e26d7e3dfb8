//! In-memory transactional store for tests/dev.
//!
//! Committed state sits behind one `RwLock`; row locks live in a separate
//! [`LockTable`] and are held by sessions for their whole lifetime. Sessions
//! stage writes privately and publish them under a single write lock.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;

use stockflow_core::{
    AggregateRoot, DomainError, DomainResult, LocationId, ProductId, PurchaseOrderId,
    SalesOrderId, TransactionId, WarehouseId,
};
use stockflow_inventory::{
    BucketKey, InventoryTransaction, Product, StockDelta, StockLevels, StockView,
    TransactionDraft, Warehouse, WarehouseLocation,
};
use stockflow_purchasing::PurchaseOrder;
use stockflow_sales::SalesOrder;

use super::locks::LockTable;
use super::{
    InventoryStore, LedgerEntry, LockKey, LockSet, OrderKind, StoreSession, StoreSnapshot,
    TransactionFilter,
};

#[derive(Debug, Default)]
struct StoreState {
    products: BTreeMap<ProductId, Product>,
    skus: HashMap<String, ProductId>,
    warehouses: BTreeMap<WarehouseId, Warehouse>,
    locations: BTreeMap<LocationId, WarehouseLocation>,
    location_codes: HashSet<(WarehouseId, String)>,
    purchase_orders: BTreeMap<PurchaseOrderId, PurchaseOrder>,
    sales_orders: BTreeMap<SalesOrderId, SalesOrder>,
    ledger: Vec<InventoryTransaction>,
    stock: StockLevels,
    purchase_order_seq: u64,
    sales_order_seq: u64,
}

#[derive(Debug, Default)]
struct Inner {
    state: RwLock<StoreState>,
    locks: LockTable,
}

impl Inner {
    fn read(&self) -> DomainResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| DomainError::conflict("store lock poisoned"))
    }

    fn write(&self) -> DomainResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| DomainError::conflict("store lock poisoned"))
    }

    /// Infallible read for `StockView`; committed state is only written after
    /// validation, so a poisoned guard still holds consistent data.
    fn read_unpoisoned(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// In-memory implementation of [`InventoryStore`].
///
/// Cheap to clone; clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryStore {
    inner: Arc<Inner>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed ledger entries.
    pub fn ledger_len(&self) -> DomainResult<usize> {
        Ok(self.inner.read()?.ledger.len())
    }
}

fn not_found(entity: &'static str, id: impl ToString) -> DomainError {
    DomainError::not_found(entity, id)
}

impl InventoryStore for InMemoryInventoryStore {
    type Session = InMemorySession;

    fn begin(&self, locks: &LockSet, timeout: Duration) -> DomainResult<InMemorySession> {
        self.inner.locks.acquire(locks, timeout)?;
        Ok(InMemorySession::new(Arc::clone(&self.inner), locks.clone()))
    }

    fn product(&self, id: ProductId) -> DomainResult<Product> {
        self.inner
            .read()?
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("product", id))
    }

    fn products(&self) -> DomainResult<Vec<Product>> {
        Ok(self.inner.read()?.products.values().cloned().collect())
    }

    fn warehouse(&self, id: WarehouseId) -> DomainResult<Warehouse> {
        self.inner
            .read()?
            .warehouses
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("warehouse", id))
    }

    fn warehouses(&self) -> DomainResult<Vec<Warehouse>> {
        Ok(self.inner.read()?.warehouses.values().cloned().collect())
    }

    fn location(&self, id: LocationId) -> DomainResult<WarehouseLocation> {
        self.inner
            .read()?
            .locations
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("location", id))
    }

    fn locations(&self, warehouse: WarehouseId) -> DomainResult<Vec<WarehouseLocation>> {
        Ok(self
            .inner
            .read()?
            .locations
            .values()
            .filter(|l| l.warehouse_id() == warehouse)
            .cloned()
            .collect())
    }

    fn purchase_order(&self, id: PurchaseOrderId) -> DomainResult<PurchaseOrder> {
        self.inner
            .read()?
            .purchase_orders
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("purchase order", id))
    }

    fn purchase_orders(&self) -> DomainResult<Vec<PurchaseOrder>> {
        Ok(self.inner.read()?.purchase_orders.values().cloned().collect())
    }

    fn sales_order(&self, id: SalesOrderId) -> DomainResult<SalesOrder> {
        self.inner
            .read()?
            .sales_orders
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("sales order", id))
    }

    fn sales_orders(&self) -> DomainResult<Vec<SalesOrder>> {
        Ok(self.inner.read()?.sales_orders.values().cloned().collect())
    }

    fn product_quantity(&self, id: ProductId) -> DomainResult<i64> {
        let state = self.inner.read()?;
        if !state.products.contains_key(&id) {
            return Err(not_found("product", id));
        }
        Ok(state.stock.product_quantity(id))
    }

    fn stock_buckets(&self, id: ProductId) -> DomainResult<Vec<(BucketKey, i64)>> {
        Ok(self.inner.read()?.stock.product_buckets(id))
    }

    fn transactions(&self, filter: &TransactionFilter) -> DomainResult<Vec<LedgerEntry>> {
        filter.validate()?;
        let (offset, limit) = filter.window().unwrap_or((0, usize::MAX));
        Ok(self
            .inner
            .read()?
            .ledger
            .iter()
            .enumerate()
            .filter(|(_, tx)| filter.matches(tx))
            .skip(offset)
            .take(limit)
            .map(|(i, tx)| LedgerEntry {
                sequence_number: i as u64 + 1,
                transaction: tx.clone(),
            })
            .collect())
    }

    fn transaction(&self, id: TransactionId) -> DomainResult<LedgerEntry> {
        self.inner
            .read()?
            .ledger
            .iter()
            .enumerate()
            .find(|(_, tx)| tx.id == id)
            .map(|(i, tx)| LedgerEntry {
                sequence_number: i as u64 + 1,
                transaction: tx.clone(),
            })
            .ok_or_else(|| not_found("inventory transaction", id))
    }

    fn snapshot(&self) -> DomainResult<StoreSnapshot> {
        let state = self.inner.read()?;
        Ok(StoreSnapshot {
            ledger: state.ledger.clone(),
            stock: state.stock.clone(),
            purchase_orders: state.purchase_orders.values().cloned().collect(),
            sales_orders: state.sales_orders.values().cloned().collect(),
        })
    }

    fn insert_product(&self, product: Product) -> DomainResult<()> {
        let mut state = self.inner.write()?;
        if state.skus.contains_key(product.sku()) {
            return Err(DomainError::validation(format!(
                "sku already exists: {}",
                product.sku()
            )));
        }
        if state.products.contains_key(&product.id()) {
            return Err(DomainError::validation(format!(
                "product already exists: {}",
                product.id()
            )));
        }
        state.skus.insert(product.sku().to_string(), product.id());
        state.products.insert(product.id(), product);
        Ok(())
    }

    fn insert_warehouse(&self, warehouse: Warehouse) -> DomainResult<()> {
        let mut state = self.inner.write()?;
        if state.warehouses.contains_key(&warehouse.id()) {
            return Err(DomainError::validation(format!(
                "warehouse already exists: {}",
                warehouse.id()
            )));
        }
        state.warehouses.insert(warehouse.id(), warehouse);
        Ok(())
    }

    fn insert_location(&self, location: WarehouseLocation) -> DomainResult<()> {
        let mut state = self.inner.write()?;
        if !state.warehouses.contains_key(&location.warehouse_id()) {
            return Err(not_found("warehouse", location.warehouse_id()));
        }
        let code_key = (location.warehouse_id(), location.code().to_string());
        if state.location_codes.contains(&code_key) {
            return Err(DomainError::validation(format!(
                "location code {} already exists in warehouse {}",
                location.code(),
                location.warehouse_id()
            )));
        }
        state.location_codes.insert(code_key);
        state.locations.insert(location.id(), location);
        Ok(())
    }

    fn next_order_number(&self, kind: OrderKind) -> DomainResult<String> {
        let mut state = self.inner.write()?;
        let seq = match kind {
            OrderKind::Purchase => {
                state.purchase_order_seq += 1;
                state.purchase_order_seq
            }
            OrderKind::Sales => {
                state.sales_order_seq += 1;
                state.sales_order_seq
            }
        };
        Ok(format!("{}-{seq:06}", kind.prefix()))
    }
}

/// A transactional scope over [`InMemoryInventoryStore`].
///
/// Releases its row locks when dropped, committed or not.
#[derive(Debug)]
pub struct InMemorySession {
    inner: Arc<Inner>,
    locks: LockSet,
    bucket_deltas: BTreeMap<BucketKey, i64>,
    total_deltas: BTreeMap<ProductId, i64>,
    deltas: Vec<StockDelta>,
    records: Vec<InventoryTransaction>,
    purchase_orders: BTreeMap<PurchaseOrderId, PurchaseOrder>,
    sales_orders: BTreeMap<SalesOrderId, SalesOrder>,
    purchase_order_versions: HashMap<PurchaseOrderId, u64>,
    sales_order_versions: HashMap<SalesOrderId, u64>,
}

impl InMemorySession {
    fn new(inner: Arc<Inner>, locks: LockSet) -> Self {
        Self {
            inner,
            locks,
            bucket_deltas: BTreeMap::new(),
            total_deltas: BTreeMap::new(),
            deltas: Vec::new(),
            records: Vec::new(),
            purchase_orders: BTreeMap::new(),
            sales_orders: BTreeMap::new(),
            purchase_order_versions: HashMap::new(),
            sales_order_versions: HashMap::new(),
        }
    }

    fn require_lock(&self, key: LockKey) -> DomainResult<()> {
        if !self.locks.contains(&key) {
            return Err(DomainError::invalid_state(format!(
                "{key:?} is not locked in this scope"
            )));
        }
        Ok(())
    }

    /// Records staged so far, in posting order.
    pub fn staged(&self) -> &[InventoryTransaction] {
        &self.records
    }
}

impl Drop for InMemorySession {
    fn drop(&mut self) {
        self.inner.locks.release(&self.locks);
    }
}

impl StockView for InMemorySession {
    fn product_quantity(&self, product: ProductId) -> i64 {
        let committed = self.inner.read_unpoisoned().stock.product_quantity(product);
        committed + self.total_deltas.get(&product).copied().unwrap_or(0)
    }

    fn bucket_quantity(&self, key: &BucketKey) -> i64 {
        let committed = self.inner.read_unpoisoned().stock.bucket_quantity(key);
        committed + self.bucket_deltas.get(key).copied().unwrap_or(0)
    }

    fn warehouse_buckets(&self, product: ProductId, warehouse: WarehouseId) -> Vec<(BucketKey, i64)> {
        let mut merged: BTreeMap<BucketKey, i64> = self
            .inner
            .read_unpoisoned()
            .stock
            .warehouse_buckets(product, warehouse)
            .into_iter()
            .collect();
        for (key, delta) in &self.bucket_deltas {
            if key.product_id == product && key.warehouse_id == warehouse {
                *merged.entry(*key).or_insert(0) += delta;
            }
        }
        merged.into_iter().collect()
    }
}

impl StoreSession for InMemorySession {
    fn product(&self, id: ProductId) -> DomainResult<Product> {
        self.inner
            .read()?
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("product", id))
    }

    fn warehouse(&self, id: WarehouseId) -> DomainResult<Warehouse> {
        self.inner
            .read()?
            .warehouses
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("warehouse", id))
    }

    fn location(&self, id: LocationId) -> DomainResult<WarehouseLocation> {
        self.inner
            .read()?
            .locations
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("location", id))
    }

    fn purchase_order(&mut self, id: PurchaseOrderId) -> DomainResult<PurchaseOrder> {
        if let Some(staged) = self.purchase_orders.get(&id) {
            return Ok(staged.clone());
        }
        let order = self
            .inner
            .read()?
            .purchase_orders
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("purchase order", id))?;
        self.purchase_order_versions
            .entry(id)
            .or_insert(order.version());
        Ok(order)
    }

    fn sales_order(&mut self, id: SalesOrderId) -> DomainResult<SalesOrder> {
        if let Some(staged) = self.sales_orders.get(&id) {
            return Ok(staged.clone());
        }
        let order = self
            .inner
            .read()?
            .sales_orders
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("sales order", id))?;
        self.sales_order_versions.entry(id).or_insert(order.version());
        Ok(order)
    }

    fn post(
        &mut self,
        draft: TransactionDraft,
        deltas: Vec<StockDelta>,
    ) -> DomainResult<InventoryTransaction> {
        let product = draft.product_id;
        self.require_lock(LockKey::Stock(product))?;
        if let Some(d) = deltas.iter().find(|d| d.key.product_id != product) {
            return Err(DomainError::invalid_state(format!(
                "delta for product {} posted with a {product} record",
                d.key.product_id
            )));
        }

        let mut scratch: BTreeMap<BucketKey, i64> = BTreeMap::new();
        let mut total = self.product_quantity(product);
        for d in &deltas {
            let bucket = scratch
                .entry(d.key)
                .or_insert_with(|| self.bucket_quantity(&d.key));
            let available = *bucket;
            *bucket = d.applied_to(*bucket)?;
            total = d.applied_to(total)?;
            if *bucket < 0 || total < 0 {
                return Err(DomainError::insufficient_stock(product, -d.delta, available));
            }
        }

        for d in &deltas {
            *self.bucket_deltas.entry(d.key).or_insert(0) += d.delta;
            *self.total_deltas.entry(product).or_insert(0) += d.delta;
        }
        self.deltas.extend(deltas);

        let record = InventoryTransaction::record(TransactionId::new(), draft, Utc::now());
        self.records.push(record.clone());
        Ok(record)
    }

    fn save_purchase_order(&mut self, order: PurchaseOrder) -> DomainResult<()> {
        self.require_lock(LockKey::PurchaseOrder(order.id_typed()))?;
        self.purchase_orders.insert(order.id_typed(), order);
        Ok(())
    }

    fn save_sales_order(&mut self, order: SalesOrder) -> DomainResult<()> {
        self.require_lock(LockKey::SalesOrder(order.id_typed()))?;
        self.sales_orders.insert(order.id_typed(), order);
        Ok(())
    }

    fn commit(mut self) -> DomainResult<Vec<LedgerEntry>> {
        let mut state = self.inner.write()?;

        // Optimistic check on every order this scope read or wrote.
        for id in self.purchase_orders.keys() {
            let committed = state.purchase_orders.get(id).map(|o| o.version());
            let loaded = self.purchase_order_versions.get(id).copied();
            if committed != loaded {
                return Err(DomainError::conflict(format!(
                    "purchase order {id} changed concurrently"
                )));
            }
        }
        for id in self.sales_orders.keys() {
            let committed = state.sales_orders.get(id).map(|o| o.version());
            let loaded = self.sales_order_versions.get(id).copied();
            if committed != loaded {
                return Err(DomainError::conflict(format!(
                    "sales order {id} changed concurrently"
                )));
            }
        }

        state.stock.apply_deltas(&self.deltas)?;

        let first = state.ledger.len() as u64 + 1;
        let records = std::mem::take(&mut self.records);
        let entries: Vec<LedgerEntry> = records
            .iter()
            .enumerate()
            .map(|(i, tx)| LedgerEntry {
                sequence_number: first + i as u64,
                transaction: tx.clone(),
            })
            .collect();
        state.ledger.extend(records);

        for (id, order) in std::mem::take(&mut self.purchase_orders) {
            state.purchase_orders.insert(id, order);
        }
        for (id, order) in std::mem::take(&mut self.sales_orders) {
            state.sales_orders.insert(id, order);
        }

        Ok(entries)
    }
}
