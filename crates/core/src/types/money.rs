//! Price display formatting.
//!
//! The storefront renders all amounts in Kenyan shillings, two decimal
//! places, with thousands separators: `KSh 1,234.50`.

use rust_decimal::{Decimal, RoundingStrategy};

/// Format an amount for display, e.g. `KSh 1,234.50`.
#[must_use]
pub fn format_ksh(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative();
    let fixed = format!("{:.2}", rounded.abs());
    let (digits, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}KSh {grouped}.{fraction}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_amount() {
        assert_eq!(format_ksh(Decimal::new(5000, 2)), "KSh 50.00");
    }

    #[test]
    fn test_thousands_grouping() {
        assert_eq!(format_ksh(Decimal::new(123_456_789, 2)), "KSh 1,234,567.89");
    }

    #[test]
    fn test_rounding_to_cents() {
        assert_eq!(format_ksh(Decimal::new(10_005, 3)), "KSh 10.01");
    }

    #[test]
    fn test_zero() {
        assert_eq!(format_ksh(Decimal::ZERO), "KSh 0.00");
    }

    #[test]
    fn test_negative() {
        assert_eq!(format_ksh(Decimal::new(-150, 2)), "-KSh 1.50");
    }
}
