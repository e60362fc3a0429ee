use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::compounding::pow_fractional;
use crate::error::BuyRentError;
use crate::types::*;
use crate::BuyRentResult;

/// Annualized rate that grows a unit cost basis into `total_return` over
/// `period_count_years` yearly compounding periods: R^(1/N) − 1.
///
/// A non-positive total return yields 0. That is a policy choice: no
/// positive multiple means no required rate.
pub fn required_irr(total_return: Decimal, period_count_years: Years) -> BuyRentResult<Rate> {
    if period_count_years <= Decimal::ZERO {
        return Err(BuyRentError::InvalidConfiguration {
            field: "period_count_years".into(),
            reason: "Compounding horizon must be positive".into(),
        });
    }
    if total_return <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    let growth = pow_fractional(total_return, Decimal::ONE / period_count_years, "required IRR")?;
    Ok(growth - Decimal::ONE)
}

/// Multiple the renter's invested capital must reach to match the buyer:
/// house value divided by what buying costs over and above the rent avoided.
///
/// A net cost of zero or less (renting costs as much as buying, or more)
/// yields a multiple of 0 and therefore a required IRR of 0.
pub fn return_multiple(house_future_value: Money, total_payment: Money, total_rent: Money) -> Decimal {
    let net_cost = total_payment - total_rent;
    if net_cost <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    house_future_value / net_cost
}

/// Input for a standalone required-return calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredReturnInput {
    pub house_future_value: Money,
    /// Down payment plus all loan payments.
    pub total_payment: Money,
    /// Rent that would have been paid over the same horizon.
    pub total_rent: Money,
    pub years: Years,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredReturnOutput {
    pub net_cost: Money,
    pub return_multiple: Decimal,
    pub required_irr: Rate,
}

/// Required annual return for the "rent and invest" alternative to match
/// buying (equal-budget lump-sum comparison).
pub fn calculate_required_return(
    input: &RequiredReturnInput,
) -> BuyRentResult<ComputationOutput<RequiredReturnOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let net_cost = input.total_payment - input.total_rent;
    let multiple = return_multiple(input.house_future_value, input.total_payment, input.total_rent);
    if net_cost <= Decimal::ZERO {
        warnings.push(format!(
            "Rent paid ({}) is at least the cost of buying ({}); required IRR set to 0",
            input.total_rent, input.total_payment
        ));
    }
    let irr = required_irr(multiple, input.years)?;

    let output = RequiredReturnOutput {
        net_cost,
        return_multiple: multiple,
        required_irr: irr,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Required IRR: (house value / (total payment − total rent))^(1/years) − 1",
        input,
        warnings,
        elapsed,
        output,
    ))
}
