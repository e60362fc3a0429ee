use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::compounding::{compound, in_range};
use crate::error::BuyRentError;
use crate::types::*;
use crate::BuyRentResult;

/// Future value of an initial lump sum plus a level contribution made at the
/// start of every period, all compounding at `periodic_rate`:
///
/// `(F·(1+i) + f·(1 + 1/i))·(1+i)^(N−1) − f·(1 + 1/i)`
///
/// A zero rate is the plain sum `F + f·N`. The switch is discrete: the
/// closed form tends to `F + f·(N−1)` as `i → 0`, and its `1/i` terms lose
/// precision for very small non-zero rates.
pub fn dca_future_value(
    initial_fund: Money,
    periodic_rate: Rate,
    periodic_contribution: Money,
    period_count: u32,
) -> BuyRentResult<Money> {
    let context = format!("DCA future value at periodic rate {periodic_rate} over {period_count} periods");
    if periodic_rate.is_zero() {
        return in_range(
            periodic_contribution
                .checked_mul(Decimal::from(period_count))
                .and_then(|paid| initial_fund.checked_add(paid)),
            &context,
        );
    }
    if period_count == 0 {
        return Ok(initial_fund);
    }

    let one_plus_i = Decimal::ONE + periodic_rate;
    let annuity = in_range(
        Decimal::ONE
            .checked_div(periodic_rate)
            .and_then(|inv| periodic_contribution.checked_mul(Decimal::ONE + inv)),
        &context,
    )?;
    let growth = compound(periodic_rate, period_count - 1, "DCA future value")?;

    in_range(
        initial_fund
            .checked_mul(one_plus_i)
            .and_then(|seed| seed.checked_add(annuity))
            .and_then(|base| base.checked_mul(growth))
            .and_then(|grown| grown.checked_sub(annuity)),
        &context,
    )
}

/// Input for a standalone DCA projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcaInput {
    #[serde(default)]
    pub initial_fund: Money,
    pub periodic_rate: Rate,
    pub periodic_contribution: Money,
    pub period_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcaOutput {
    pub future_value: Money,
    pub total_contributed: Money,
    pub investment_gain: Money,
}

/// Project a dollar-cost-averaging plan and split the result into money put
/// in and growth earned.
pub fn project_dca(input: &DcaInput) -> BuyRentResult<ComputationOutput<DcaOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.periodic_rate <= Decimal::NEGATIVE_ONE {
        return Err(BuyRentError::InvalidConfiguration {
            field: "periodic_rate".into(),
            reason: "Periodic rate must be greater than -100%".into(),
        });
    }
    if input.periodic_contribution < Decimal::ZERO {
        warnings.push("Negative contribution: the plan withdraws every period".into());
    }

    let future_value = dca_future_value(
        input.initial_fund,
        input.periodic_rate,
        input.periodic_contribution,
        input.period_count,
    )?;
    let total_contributed = in_range(
        input
            .periodic_contribution
            .checked_mul(Decimal::from(input.period_count))
            .and_then(|paid| input.initial_fund.checked_add(paid)),
        "DCA total contributed",
    )?;

    let output = DcaOutput {
        future_value,
        total_contributed,
        investment_gain: future_value - total_contributed,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Dollar-cost averaging future value (annuity-due)",
        input,
        warnings,
        elapsed,
        output,
    ))
}
