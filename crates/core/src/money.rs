//! Money representation.
//!
//! Amounts are `rust_decimal::Decimal` end to end. Nothing is rounded until a
//! value is persisted on an order header or item, and then only to two
//! fractional digits.

use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits kept on persisted amounts.
pub const MONEY_SCALE: u32 = 2;

/// Round an amount for persistence (half away from zero) and fix its scale
/// at [`MONEY_SCALE`], so `270` is stored and rendered as `270.00`.
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Percentage (e.g. `10` for 10%) as a multiplier fraction (`0.10`).
pub fn percent(value: Decimal) -> Decimal {
    value / Decimal::ONE_HUNDRED
}
