//! Row-lock table with bounded, all-or-nothing acquisition.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use stockflow_core::{DomainError, DomainResult};

use super::{LockKey, LockSet};

/// Set of currently held row locks.
///
/// A caller either gets every key it asked for or waits; it never holds a
/// partial set, so two scopes cannot deadlock on each other.
#[derive(Debug, Default)]
pub struct LockTable {
    held: Mutex<HashSet<LockKey>>,
    released: Condvar,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn held(&self) -> MutexGuard<'_, HashSet<LockKey>> {
        // Lock bookkeeping stays valid even if a holder panicked.
        self.held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Block until every key in `locks` is free, then take them all.
    pub fn acquire(&self, locks: &LockSet, timeout: Duration) -> DomainResult<()> {
        let deadline = Instant::now() + timeout;
        let mut held = self.held();

        loop {
            if locks.iter().all(|k| !held.contains(k)) {
                held.extend(locks.iter().copied());
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                let busy: Vec<String> = locks
                    .iter()
                    .filter(|k| held.contains(k))
                    .map(|k| format!("{k:?}"))
                    .collect();
                tracing::debug!(?busy, "lock wait timed out");
                return Err(DomainError::conflict(format!(
                    "timed out after {}ms waiting for {}",
                    timeout.as_millis(),
                    busy.join(", ")
                )));
            }

            held = match self.released.wait_timeout(held, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    pub fn release(&self, locks: &LockSet) {
        let mut held = self.held();
        for k in locks.iter() {
            held.remove(k);
        }
        drop(held);
        self.released.notify_all();
    }

    pub fn is_held(&self, key: &LockKey) -> bool {
        self.held().contains(key)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use stockflow_core::ProductId;

    use super::*;

    #[test]
    fn overlapping_sets_time_out_as_conflicts() {
        let table = LockTable::new();
        let p = ProductId::new();
        let first = LockSet::new().stock(p);
        table.acquire(&first, Duration::from_millis(10)).unwrap();

        let err = table
            .acquire(&LockSet::new().stock(p).stock(ProductId::new()), Duration::from_millis(20))
            .unwrap_err();
        assert!(err.is_retryable());
        // Nothing from the failed request was taken.
        assert_eq!(table.held().len(), 1);
    }

    #[test]
    fn disjoint_sets_do_not_block() {
        let table = LockTable::new();
        table
            .acquire(&LockSet::new().stock(ProductId::new()), Duration::ZERO)
            .unwrap();
        table
            .acquire(&LockSet::new().stock(ProductId::new()), Duration::ZERO)
            .unwrap();
    }

    #[test]
    fn waiter_wakes_on_release() {
        let table = Arc::new(LockTable::new());
        let set = LockSet::new().stock(ProductId::new());
        table.acquire(&set, Duration::ZERO).unwrap();

        let waiter = {
            let table = Arc::clone(&table);
            let set = set.clone();
            thread::spawn(move || table.acquire(&set, Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(20));
        table.release(&set);

        waiter.join().unwrap().unwrap();
        assert!(table.is_held(set.iter().next().unwrap()));
    }
}
