//! Exact conversion between human-entered decimal amounts and integer base units.
//!
//! Amounts never pass through floating point. A string such as `"0.2"` with 18 decimals is
//! split into its integer and fractional digits and scaled with checked `u128` arithmetic, so
//! the value handed to a transfer is exactly the value the user typed.

use thiserror::Error;

/// Largest precision a `u128` can carry with at least one whole unit to spare.
pub const MAX_DECIMALS: u8 = 36;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("invalid amount \"{input}\": {reason}")]
    InvalidAmountFormat { input: String, reason: &'static str },
}

impl AmountError {
    fn invalid(input: &str, reason: &'static str) -> Self {
        AmountError::InvalidAmountFormat {
            input: input.to_string(),
            reason,
        }
    }
}

/// Converts a positive decimal string into base units of an asset with `decimals` precision.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<u128, AmountError> {
    if decimals > MAX_DECIMALS {
        return Err(AmountError::invalid(amount, "unsupported decimal precision"));
    }

    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(AmountError::invalid(amount, "amount is empty"));
    }
    if trimmed.starts_with('-') {
        return Err(AmountError::invalid(amount, "amount must be positive"));
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(AmountError::invalid(amount, "amount has no digits"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(AmountError::invalid(amount, "amount is not a decimal number"));
    }

    // Digits past the asset precision are only acceptable when they are zeros.
    let significant_fraction = fraction.trim_end_matches('0');
    if significant_fraction.len() > decimals as usize {
        return Err(AmountError::invalid(
            amount,
            "amount has more fractional digits than the asset supports",
        ));
    }

    let scale = 10u128
        .checked_pow(decimals as u32)
        .ok_or_else(|| AmountError::invalid(amount, "unsupported decimal precision"))?;

    let whole_units = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u128>()
            .map_err(|_| AmountError::invalid(amount, "amount is too large"))?
    };

    let fraction_units = if significant_fraction.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", significant_fraction, width = decimals as usize);
        padded
            .parse::<u128>()
            .map_err(|_| AmountError::invalid(amount, "amount is too large"))?
    };

    let total = whole_units
        .checked_mul(scale)
        .and_then(|units| units.checked_add(fraction_units))
        .ok_or_else(|| AmountError::invalid(amount, "amount is too large"))?;

    if total == 0 {
        return Err(AmountError::invalid(amount, "amount must be positive"));
    }

    Ok(total)
}

/// Renders base units as a decimal string, without trailing fractional zeros.
pub fn from_base_units(value: u128, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }

    let digits = format!("{:0>width$}", value, width = decimals as usize + 1);
    let (whole, fraction) = digits.split_at(digits.len() - decimals as usize);
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(result: Result<u128, AmountError>) -> &'static str {
        match result {
            Err(AmountError::InvalidAmountFormat { reason, .. }) => reason,
            Ok(value) => panic!("expected an error, got {}", value),
        }
    }

    #[test]
    fn test_fractional_amount_is_exact() {
        assert_eq!(to_base_units("0.2", 18).unwrap(), 200_000_000_000_000_000);
        assert_eq!(to_base_units("1.000000000000000001", 18).unwrap(), 1_000_000_000_000_000_001);
        assert_eq!(to_base_units("10", 6).unwrap(), 10_000_000);
        assert_eq!(to_base_units(".5", 2).unwrap(), 50);
        assert_eq!(to_base_units("3.", 2).unwrap(), 300);
    }

    #[test]
    fn test_rejects_non_numeric_and_non_positive() {
        assert!(to_base_units("abc", 18).is_err());
        assert!(to_base_units("-1", 18).is_err());
        assert_eq!(reason(to_base_units("0", 18)), "amount must be positive");
        assert_eq!(reason(to_base_units("0.000", 18)), "amount must be positive");
        assert_eq!(reason(to_base_units("", 18)), "amount is empty");
        assert_eq!(reason(to_base_units(".", 18)), "amount has no digits");
    }

    #[test]
    fn test_rejects_non_finite_and_exponent_forms() {
        for input in ["NaN", "inf", "Infinity", "1e18", "+1", "1.2.3", "1,5", "0x10"] {
            assert!(to_base_units(input, 18).is_err(), "{} should be rejected", input);
        }
    }

    #[test]
    fn test_excess_precision_is_rejected_not_rounded() {
        assert_eq!(
            reason(to_base_units("0.123", 2)),
            "amount has more fractional digits than the asset supports"
        );
        assert_eq!(to_base_units("0.1200", 2).unwrap(), 12);
    }

    #[test]
    fn test_overflow_is_rejected() {
        let huge = "9".repeat(40);
        assert_eq!(reason(to_base_units(&huge, 18)), "amount is too large");
        assert_eq!(reason(to_base_units("1", 40)), "unsupported decimal precision");
    }

    #[test]
    fn test_format_base_units() {
        assert_eq!(from_base_units(200_000_000_000_000_000, 18), "0.2");
        assert_eq!(from_base_units(10_000_000, 6), "10");
        assert_eq!(from_base_units(1, 3), "0.001");
        assert_eq!(from_base_units(150, 0), "150");
    }
}
