use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use stockflow_core::{DomainError, DomainResult, round_money};

/// Sales tax applied to the subtotal unless configured otherwise.
pub const DEFAULT_SALES_TAX_RATE: Decimal = dec!(0.10);

/// One order line as the calculator sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    pub quantity: i64,
    pub unit_price: Decimal,
    /// Percent, 0..=100. Always zero for purchase lines.
    pub discount: Decimal,
}

impl LineInput {
    pub fn new(quantity: i64, unit_price: Decimal) -> Self {
        Self {
            quantity,
            unit_price,
            discount: Decimal::ZERO,
        }
    }

    pub fn with_discount(mut self, discount: Decimal) -> Self {
        self.discount = discount;
        self
    }

    /// Rounded amount stored as the item's `total_price`.
    pub fn total_price(&self) -> DomainResult<Decimal> {
        line_amount(self).map(round_money)
    }
}

/// `quantity × unit_price × (1 − discount/100)`, unrounded.
///
/// Fails with `Validation` when the amount does not fit a `Decimal`.
pub fn line_amount(line: &LineInput) -> DomainResult<Decimal> {
    let out_of_range = || DomainError::validation("line amount out of range");
    let gross = Decimal::from(line.quantity)
        .checked_mul(line.unit_price)
        .ok_or_else(out_of_range)?;
    if line.discount.is_zero() {
        return Ok(gross);
    }
    gross
        .checked_mul(Decimal::ONE - stockflow_core::percent(line.discount))
        .ok_or_else(out_of_range)
}

fn checked_sum<'a>(lines: impl IntoIterator<Item = &'a LineInput>) -> DomainResult<Decimal> {
    lines.into_iter().try_fold(Decimal::ZERO, |sum, line| {
        sum.checked_add(line_amount(line)?)
            .ok_or_else(|| DomainError::validation("order total out of range"))
    })
}

pub fn validate_line(line: &LineInput) -> DomainResult<()> {
    if line.quantity <= 0 {
        return Err(DomainError::invalid_quantity(
            line.quantity,
            "item quantity must be positive",
        ));
    }
    if line.unit_price <= Decimal::ZERO {
        return Err(DomainError::validation("unit price must be positive"));
    }
    if line.discount < Decimal::ZERO || line.discount > Decimal::ONE_HUNDRED {
        return Err(DomainError::validation("discount must be between 0 and 100"));
    }
    line_amount(line).map(|_| ())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseTotals {
    pub total_amount: Decimal,
}

pub fn purchase_totals<'a>(
    lines: impl IntoIterator<Item = &'a LineInput>,
) -> DomainResult<PurchaseTotals> {
    Ok(PurchaseTotals {
        total_amount: round_money(checked_sum(lines)?),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

/// Subtotal, tax and total for a sales order.
///
/// `total` is the sum of the three rounded header amounts, so a persisted
/// header always adds up.
pub fn sales_totals<'a>(
    lines: impl IntoIterator<Item = &'a LineInput>,
    tax_rate: Decimal,
    shipping: Decimal,
) -> DomainResult<SalesTotals> {
    let out_of_range = || DomainError::validation("order total out of range");
    let subtotal = checked_sum(lines)?;
    let tax = round_money(subtotal.checked_mul(tax_rate).ok_or_else(out_of_range)?);
    let subtotal = round_money(subtotal);
    let shipping = round_money(shipping);
    let total = subtotal
        .checked_add(tax)
        .and_then(|t| t.checked_add(shipping))
        .ok_or_else(out_of_range)?;

    Ok(SalesTotals {
        subtotal,
        tax,
        shipping,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn discounted_line_matches_worked_example() {
        let line = LineInput::new(3, dec!(100.00)).with_discount(dec!(10));
        assert_eq!(line.total_price().unwrap(), dec!(270.00));

        let totals = sales_totals([&line], DEFAULT_SALES_TAX_RATE, Decimal::ZERO).unwrap();
        assert_eq!(totals.subtotal, dec!(270.00));
        assert_eq!(totals.tax, dec!(27.00));
        assert_eq!(totals.total, dec!(297.00));
    }

    #[test]
    fn shipping_is_added_to_total() {
        let line = LineInput::new(1, dec!(10));
        let totals = sales_totals([&line], DEFAULT_SALES_TAX_RATE, dec!(4.99)).unwrap();
        assert_eq!(totals.total, dec!(15.99));
    }

    #[test]
    fn line_amounts_are_not_rounded_before_summing() {
        // Each line is 0.333..; rounding first would give 0.99.
        let line = LineInput::new(1, dec!(1)).with_discount(dec!(66.6666666666666666666666667));
        let lines = [line, line, line];
        assert_eq!(purchase_totals(&lines).unwrap().total_amount, dec!(1.00));
    }

    #[test]
    fn empty_order_totals_are_zero() {
        let lines: [LineInput; 0] = [];
        assert_eq!(purchase_totals(&lines).unwrap().total_amount, Decimal::ZERO);
        let s = sales_totals(&lines, DEFAULT_SALES_TAX_RATE, Decimal::ZERO).unwrap();
        assert_eq!(s.total, Decimal::ZERO);
    }

    #[test]
    fn invalid_lines_are_rejected() {
        match validate_line(&LineInput::new(0, dec!(1))) {
            Err(DomainError::InvalidQuantity { requested: 0, .. }) => {}
            other => panic!("expected invalid quantity, got {other:?}"),
        }
        assert!(matches!(
            validate_line(&LineInput::new(1, dec!(0))),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            validate_line(&LineInput::new(1, dec!(1)).with_discount(dec!(101))),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn oversized_line_amount_is_rejected() {
        let line = LineInput::new(i64::MAX, dec!(100000000000));
        match validate_line(&line) {
            Err(DomainError::Validation(msg)) if msg == "line amount out of range" => {}
            other => panic!("expected out of range, got {other:?}"),
        }
        assert!(line.total_price().is_err());
    }

    #[test]
    fn totals_that_leave_the_decimal_range_are_rejected() {
        // Each line fits; their sum does not.
        let line = LineInput::new(i64::MAX, dec!(5000000000));
        assert!(validate_line(&line).is_ok());
        let lines = [line, line];
        match purchase_totals(&lines) {
            Err(DomainError::Validation(msg)) if msg == "order total out of range" => {}
            other => panic!("expected out of range, got {other:?}"),
        }
        assert!(sales_totals(&lines, DEFAULT_SALES_TAX_RATE, Decimal::ZERO).is_err());
    }

    fn line() -> impl Strategy<Value = LineInput> {
        (1i64..1_000, 1i64..100_000, 0i64..=100).prop_map(|(qty, cents, discount)| {
            LineInput::new(qty, Decimal::new(cents, 2)).with_discount(Decimal::from(discount))
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: header totals always add up, and the subtotal never drifts
        /// from the sum of stored item totals by more than half a cent per line.
        #[test]
        fn sales_header_is_consistent(
            lines in prop::collection::vec(line(), 0..20),
            shipping_cents in 0i64..10_000
        ) {
            let shipping = Decimal::new(shipping_cents, 2);
            let t = sales_totals(&lines, DEFAULT_SALES_TAX_RATE, shipping).unwrap();
            prop_assert_eq!(t.total, t.subtotal + t.tax + t.shipping);
            prop_assert!(t.subtotal >= Decimal::ZERO);

            let stored: Decimal = lines.iter().map(|l| l.total_price().unwrap()).sum();
            let drift = (stored - t.subtotal).abs();
            prop_assert!(drift <= dec!(0.005) * Decimal::from(lines.len() as i64) + dec!(0.005));
        }

        /// Property: purchase total equals the undiscounted sales subtotal.
        #[test]
        fn purchase_total_matches_undiscounted_subtotal(
            lines in prop::collection::vec(line(), 0..20)
        ) {
            let plain: Vec<LineInput> = lines.iter().map(|l| LineInput::new(l.quantity, l.unit_price)).collect();
            let p = purchase_totals(&plain).unwrap();
            let s = sales_totals(&plain, Decimal::ZERO, Decimal::ZERO).unwrap();
            prop_assert_eq!(p.total_amount, s.subtotal);
            prop_assert_eq!(s.tax, Decimal::ZERO);
        }
    }
}
