//! Engine configuration loaded from the environment.

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use stockflow_pricing::DEFAULT_SALES_TAX_RATE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryConfig {
    /// Bounded wait for row locks before failing with a retryable conflict.
    pub lock_timeout: Duration,
    /// Whole-operation retries on `ConcurrencyConflict`.
    pub conflict_retries: u32,
    /// Tax rate fixed on new sales orders.
    pub sales_tax_rate: Decimal,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(5_000),
            conflict_retries: 2,
            sales_tax_rate: DEFAULT_SALES_TAX_RATE,
        }
    }
}

impl InventoryConfig {
    /// Reads `STOCKFLOW_LOCK_TIMEOUT_MS`, `STOCKFLOW_CONFLICT_RETRIES` and
    /// `STOCKFLOW_SALES_TAX_RATE`; unset or invalid values keep the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let lock_timeout = parse_or(&lookup, "STOCKFLOW_LOCK_TIMEOUT_MS", 5_000u64);
        let sales_tax_rate = parse_or(&lookup, "STOCKFLOW_SALES_TAX_RATE", defaults.sales_tax_rate);
        let sales_tax_rate = if sales_tax_rate.is_sign_negative() || sales_tax_rate > Decimal::ONE {
            tracing::warn!(%sales_tax_rate, "sales tax rate out of range; using default");
            defaults.sales_tax_rate
        } else {
            sales_tax_rate
        };

        Self {
            lock_timeout: Duration::from_millis(lock_timeout),
            conflict_retries: parse_or(&lookup, "STOCKFLOW_CONFLICT_RETRIES", defaults.conflict_retries),
            sales_tax_rate,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.conflict_retries = retries;
        self
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "invalid configuration value; using default");
                default
            }
        },
    }
}
