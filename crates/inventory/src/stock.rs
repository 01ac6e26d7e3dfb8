//! Quantity store: on-hand quantity per product and per bucket.
//!
//! A bucket is (product, warehouse, location?). `location = None` is the
//! warehouse's unassigned stock (received without a put-away location). The
//! product total is always the sum of its buckets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use stockflow_core::{DomainError, DomainResult, LocationId, ProductId, WarehouseId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketKey {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub location_id: Option<LocationId>,
}

impl BucketKey {
    pub fn new(
        product_id: ProductId,
        warehouse_id: WarehouseId,
        location_id: Option<LocationId>,
    ) -> Self {
        Self {
            product_id,
            warehouse_id,
            location_id,
        }
    }
}

/// Signed change to one bucket.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDelta {
    pub key: BucketKey,
    pub delta: i64,
}

impl StockDelta {
    /// `current` moved by this delta.
    ///
    /// Fails with `InvalidQuantity` when the result does not fit an `i64`.
    pub fn applied_to(&self, current: i64) -> DomainResult<i64> {
        current
            .checked_add(self.delta)
            .ok_or_else(|| DomainError::invalid_quantity(self.delta, "quantity overflow"))
    }
}

/// Read access to current quantities.
///
/// Implemented by [`StockLevels`] and by store sessions, so the ledger planner
/// sees exactly what the enclosing transaction sees.
pub trait StockView {
    fn product_quantity(&self, product: ProductId) -> i64;

    fn bucket_quantity(&self, key: &BucketKey) -> i64;

    /// Buckets of `product` inside `warehouse`, unassigned first, then by location id.
    fn warehouse_buckets(&self, product: ProductId, warehouse: WarehouseId) -> Vec<(BucketKey, i64)>;

    fn warehouse_quantity(&self, product: ProductId, warehouse: WarehouseId) -> i64 {
        self.warehouse_buckets(product, warehouse)
            .iter()
            .map(|(_, q)| *q)
            .sum()
    }
}

/// A bucket whose live value differs from a rebuilt one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMismatch {
    pub product_id: ProductId,
    /// `None` when the product total itself differs.
    pub bucket: Option<BucketKey>,
    pub live: i64,
    pub rebuilt: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockLevels {
    totals: BTreeMap<ProductId, i64>,
    buckets: BTreeMap<BucketKey, i64>,
}

impl StockLevels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a set of deltas all-or-nothing.
    ///
    /// Deltas to the same bucket are netted in order; if any bucket or product
    /// total would go negative nothing is changed.
    pub fn apply_deltas(&mut self, deltas: &[StockDelta]) -> DomainResult<()> {
        let mut next_buckets: BTreeMap<BucketKey, i64> = BTreeMap::new();
        let mut next_totals: BTreeMap<ProductId, i64> = BTreeMap::new();

        for d in deltas {
            let bucket = next_buckets
                .entry(d.key)
                .or_insert_with(|| self.bucket_quantity(&d.key));
            let total = next_totals
                .entry(d.key.product_id)
                .or_insert_with(|| self.product_quantity(d.key.product_id));

            let available = *bucket;
            *bucket = d.applied_to(*bucket)?;
            *total = d.applied_to(*total)?;
            if *bucket < 0 || *total < 0 {
                return Err(DomainError::insufficient_stock(
                    d.key.product_id,
                    -d.delta,
                    available,
                ));
            }
        }

        self.buckets.extend(next_buckets);
        self.totals.extend(next_totals);
        Ok(())
    }

    pub fn products(&self) -> impl Iterator<Item = (ProductId, i64)> + '_ {
        self.totals.iter().map(|(p, q)| (*p, *q))
    }

    pub fn buckets(&self) -> impl Iterator<Item = (BucketKey, i64)> + '_ {
        self.buckets.iter().map(|(k, q)| (*k, *q))
    }

    /// Buckets of one product across all warehouses.
    pub fn product_buckets(&self, product: ProductId) -> Vec<(BucketKey, i64)> {
        self.buckets
            .iter()
            .filter(|(k, _)| k.product_id == product)
            .map(|(k, q)| (*k, *q))
            .collect()
    }

    /// Differences between `self` (live) and `rebuilt`; empty when they agree.
    ///
    /// Missing entries count as zero, so a lazily created empty bucket is not a mismatch.
    pub fn diff(&self, rebuilt: &StockLevels) -> Vec<StockMismatch> {
        let mut out = Vec::new();

        let mut products: Vec<ProductId> = self
            .totals
            .keys()
            .chain(rebuilt.totals.keys())
            .copied()
            .collect();
        products.sort();
        products.dedup();
        for p in products {
            let (live, re) = (self.product_quantity(p), rebuilt.product_quantity(p));
            if live != re {
                out.push(StockMismatch {
                    product_id: p,
                    bucket: None,
                    live,
                    rebuilt: re,
                });
            }
        }

        let mut keys: Vec<BucketKey> = self
            .buckets
            .keys()
            .chain(rebuilt.buckets.keys())
            .copied()
            .collect();
        keys.sort();
        keys.dedup();
        for k in keys {
            let (live, re) = (self.bucket_quantity(&k), rebuilt.bucket_quantity(&k));
            if live != re {
                out.push(StockMismatch {
                    product_id: k.product_id,
                    bucket: Some(k),
                    live,
                    rebuilt: re,
                });
            }
        }
        out
    }
}

impl StockView for StockLevels {
    fn product_quantity(&self, product: ProductId) -> i64 {
        self.totals.get(&product).copied().unwrap_or(0)
    }

    fn bucket_quantity(&self, key: &BucketKey) -> i64 {
        self.buckets.get(key).copied().unwrap_or(0)
    }

    fn warehouse_buckets(&self, product: ProductId, warehouse: WarehouseId) -> Vec<(BucketKey, i64)> {
        // `None` sorts before every `Some`, so range order is the pick order.
        let start = BucketKey::new(product, warehouse, None);
        self.buckets
            .range(start..)
            .take_while(|(k, _)| k.product_id == product && k.warehouse_id == warehouse)
            .map(|(k, q)| (*k, *q))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(p: ProductId, w: WarehouseId, l: Option<LocationId>) -> BucketKey {
        BucketKey::new(p, w, l)
    }

    #[test]
    fn deltas_update_bucket_and_total() {
        let (p, w, l) = (ProductId::new(), WarehouseId::new(), LocationId::new());
        let mut s = StockLevels::new();
        s.apply_deltas(&[
            StockDelta { key: key(p, w, None), delta: 5 },
            StockDelta { key: key(p, w, Some(l)), delta: 2 },
        ])
        .unwrap();

        assert_eq!(s.product_quantity(p), 7);
        assert_eq!(s.bucket_quantity(&key(p, w, Some(l))), 2);
        assert_eq!(s.warehouse_quantity(p, w), 7);
    }

    #[test]
    fn overflowing_total_is_rejected_without_changes() {
        let (p, w1, w2) = (ProductId::new(), WarehouseId::new(), WarehouseId::new());
        let mut s = StockLevels::new();
        s.apply_deltas(&[StockDelta { key: key(p, w1, None), delta: i64::MAX }]).unwrap();
        let before = s.clone();

        // The second warehouse's bucket fits, the product total does not.
        let err = s
            .apply_deltas(&[StockDelta { key: key(p, w2, None), delta: 1 }])
            .unwrap_err();
        match err {
            DomainError::InvalidQuantity { requested: 1, reason, .. } => {
                assert_eq!(reason, "quantity overflow");
            }
            other => panic!("expected overflow, got {other:?}"),
        }
        assert_eq!(s, before);
    }

    #[test]
    fn failing_delta_leaves_everything_unchanged() {
        let (p, w) = (ProductId::new(), WarehouseId::new());
        let mut s = StockLevels::new();
        s.apply_deltas(&[StockDelta { key: key(p, w, None), delta: 3 }]).unwrap();
        let before = s.clone();

        let err = s
            .apply_deltas(&[
                StockDelta { key: key(p, w, None), delta: 1 },
                StockDelta { key: key(p, w, None), delta: -5 },
            ])
            .unwrap_err();

        match err {
            DomainError::InsufficientStock { requested, available, .. } => {
                assert_eq!(requested, 5);
                assert_eq!(available, 4);
            }
            _ => panic!("expected insufficient stock"),
        }
        assert_eq!(s, before);
    }

    #[test]
    fn warehouse_buckets_put_unassigned_first() {
        let (p, w) = (ProductId::new(), WarehouseId::new());
        let other_w = WarehouseId::new();
        let (l1, l2) = (LocationId::new(), LocationId::new());
        let mut s = StockLevels::new();
        s.apply_deltas(&[
            StockDelta { key: key(p, w, Some(l2)), delta: 1 },
            StockDelta { key: key(p, w, Some(l1)), delta: 1 },
            StockDelta { key: key(p, w, None), delta: 1 },
            StockDelta { key: key(p, other_w, None), delta: 9 },
        ])
        .unwrap();

        let order: Vec<Option<LocationId>> = s
            .warehouse_buckets(p, w)
            .into_iter()
            .map(|(k, _)| k.location_id)
            .collect();
        let mut located = vec![l1, l2];
        located.sort();
        assert_eq!(order, vec![None, Some(located[0]), Some(located[1])]);
        assert_eq!(s.warehouse_quantity(p, w), 3);
    }

    #[test]
    fn diff_reports_total_and_bucket() {
        let (p, w) = (ProductId::new(), WarehouseId::new());
        let mut live = StockLevels::new();
        live.apply_deltas(&[StockDelta { key: key(p, w, None), delta: 2 }]).unwrap();
        let rebuilt = StockLevels::new();

        let diff = live.diff(&rebuilt);
        assert_eq!(diff.len(), 2);
        assert_eq!(diff[0].bucket, None);
        assert_eq!(diff[0].live, 2);
        assert_eq!(diff[0].rebuilt, 0);
        assert!(live.diff(&live.clone()).is_empty());
    }
}
