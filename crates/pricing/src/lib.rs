//! Order item calculator.
//!
//! Pure functions over an order's item set. Line amounts are kept at full
//! decimal precision and summed unrounded; only the values that end up on an
//! order header or item are rounded (2 dp, half away from zero).

pub mod calculator;

pub use calculator::{
    DEFAULT_SALES_TAX_RATE, LineInput, PurchaseTotals, SalesTotals, line_amount, purchase_totals,
    sales_totals, validate_line,
};
