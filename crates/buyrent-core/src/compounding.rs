use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::BuyRentError;
use crate::types::{Rate, Years};
use crate::BuyRentResult;

/// Months per year; all loans and DCA contributions are monthly.
pub const MONTHS_PER_YEAR: u32 = 12;

/// Compute (1 + r)^n, failing instead of panicking when the result leaves
/// the Decimal range.
pub fn compound(rate: Rate, n: u32, context: &str) -> BuyRentResult<Decimal> {
    (Decimal::ONE + rate)
        .checked_powu(u64::from(n))
        .ok_or_else(|| BuyRentError::NumericOverflow {
            context: format!("{context}: (1 + {rate})^{n}"),
        })
}

/// Unwrap a checked Decimal operation, reporting overflow for `context`.
pub fn in_range(value: Option<Decimal>, context: &str) -> BuyRentResult<Decimal> {
    value.ok_or_else(|| BuyRentError::NumericOverflow {
        context: context.to_string(),
    })
}

/// Raise `base` to a fractional exponent. `base` must be positive.
pub fn pow_fractional(base: Decimal, exponent: Decimal, context: &str) -> BuyRentResult<Decimal> {
    if base <= Decimal::ZERO {
        return Err(BuyRentError::InvalidConfiguration {
            field: context.to_string(),
            reason: format!("cannot raise non-positive base {base} to a fractional power"),
        });
    }
    // Whole exponents go through exact repeated multiplication.
    if exponent.fract().is_zero() {
        if let Some(n) = exponent.to_u64() {
            return base.checked_powu(n).ok_or_else(|| BuyRentError::NumericOverflow {
                context: format!("{context}: {base}^{exponent}"),
            });
        }
    }
    base.checked_powd(exponent)
        .ok_or_else(|| BuyRentError::NumericOverflow {
            context: format!("{context}: {base}^{exponent}"),
        })
}

/// Convert a periodic monthly rate to its compounded annual equivalent.
pub fn annualize_monthly(monthly_rate: Rate) -> BuyRentResult<Rate> {
    Ok(compound(monthly_rate, MONTHS_PER_YEAR, "annualize")? - Decimal::ONE)
}

/// Number of whole monthly periods in a loan term.
///
/// Fractional months are truncated; a term shorter than one month is rejected.
pub fn months_in_term(term_years: Years) -> BuyRentResult<u32> {
    let months = (term_years * Decimal::from(MONTHS_PER_YEAR)).trunc();
    if months < Decimal::ONE {
        return Err(BuyRentError::InvalidConfiguration {
            field: "loan_term_years".into(),
            reason: format!("loan term {term_years} years is shorter than one month"),
        });
    }
    if months > dec!(12000) {
        return Err(BuyRentError::InvalidConfiguration {
            field: "loan_term_years".into(),
            reason: format!("loan term {term_years} years exceeds 1000 years"),
        });
    }
    months.to_u32().ok_or_else(|| BuyRentError::InvalidConfiguration {
        field: "loan_term_years".into(),
        reason: format!("loan term {term_years} years is not representable in months"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_compound_basic() {
        assert_eq!(compound(dec!(0.1), 2, "t").unwrap(), dec!(1.21));
        assert_eq!(compound(dec!(0.05), 0, "t").unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_compound_overflow_is_error() {
        let err = compound(dec!(0.5), 400, "t").unwrap_err();
        assert!(matches!(err, BuyRentError::NumericOverflow { .. }));
    }

    #[test]
    fn test_annualize_monthly() {
        let annual = annualize_monthly(dec!(0.01)).unwrap();
        // 1.01^12 - 1 = 0.12682503...
        assert!((annual - dec!(0.126825030131969720661201)).abs() < dec!(0.0000000001));
    }

    #[test]
    fn test_months_in_term_truncates() {
        assert_eq!(months_in_term(dec!(30)).unwrap(), 360);
        assert_eq!(months_in_term(dec!(2.55)).unwrap(), 30);
        assert!(months_in_term(dec!(0.05)).is_err());
    }

    #[test]
    fn test_pow_fractional_integer_path() {
        assert_eq!(pow_fractional(dec!(1.1), dec!(2), "t").unwrap(), dec!(1.21));
        let root = pow_fractional(dec!(4), dec!(0.5), "t").unwrap();
        assert!((root - dec!(2)).abs() < dec!(0.0000001));
    }
}
