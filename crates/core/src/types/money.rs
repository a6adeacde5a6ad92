//! Money helpers using decimal arithmetic.
//!
//! Amounts are plain [`Decimal`] values in the currency's standard unit
//! (roubles, not kopecks). Catalog prices are always RUB; payments carry an
//! explicit [`Currency`].

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes accepted by the payment providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    RUB,
    USD,
    EUR,
}

impl Currency {
    /// The ISO code as sent to payment providers.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::RUB => "RUB",
            Self::USD => "USD",
            Self::EUR => "EUR",
        }
    }
}

/// Apply a percentage markup and round to kopecks (half away from zero).
///
/// ```
/// use rust_decimal::Decimal;
/// use nexx_core::apply_markup;
///
/// let price = apply_markup(Decimal::new(1000, 0), Decimal::new(15, 0));
/// assert_eq!(price, Decimal::new(115_000, 2));
/// ```
#[must_use]
pub fn apply_markup(amount: Decimal, percent: Decimal) -> Decimal {
    let factor = Decimal::ONE + percent / Decimal::ONE_HUNDRED;
    (amount * factor).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format an amount with exactly two decimals, as payment APIs expect.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_markup_rounds_to_kopecks() {
        // 333.33 * 1.10 = 366.663
        let price = apply_markup(Decimal::new(33_333, 2), Decimal::new(10, 0));
        assert_eq!(price, Decimal::new(36_666, 2));
    }

    #[test]
    fn test_apply_zero_markup() {
        let price = apply_markup(Decimal::new(8500, 0), Decimal::ZERO);
        assert_eq!(price, Decimal::new(8500, 0));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::new(8500, 0)), "8500.00");
        assert_eq!(format_amount(Decimal::new(12_345, 3)), "12.35");
    }

    #[test]
    fn test_currency_code() {
        assert_eq!(Currency::default().code(), "RUB");
    }
}
