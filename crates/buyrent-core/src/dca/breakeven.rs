use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, trace};

use crate::compounding::{annualize_monthly, in_range};
use crate::dca::accumulator::dca_future_value;
use crate::error::{BuyRentError, Outflow};
use crate::types::*;
use crate::BuyRentResult;

/// Monthly rate increment of the breakeven search.
pub const DEFAULT_RATE_STEP: Rate = dec!(0.0001);

/// Highest monthly rate the search tries before giving up.
pub const MONTHLY_RATE_CEILING: Rate = dec!(0.5);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How the rate grid is walked. Both strategies return the same grid rate
/// because the renter's advantage only grows with the rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Try 0, step, 2·step, … in order.
    #[default]
    LinearScan,
    /// Bracket by doubling, then bisect on grid indices.
    GridBisection,
}

/// Precision and bounds of the breakeven search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_rate_step")]
    pub rate_step: Rate,
    #[serde(default = "default_ceiling")]
    pub ceiling: Rate,
    #[serde(default)]
    pub strategy: SearchStrategy,
}

fn default_rate_step() -> Rate {
    DEFAULT_RATE_STEP
}

fn default_ceiling() -> Rate {
    MONTHLY_RATE_CEILING
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            rate_step: DEFAULT_RATE_STEP,
            ceiling: MONTHLY_RATE_CEILING,
            strategy: SearchStrategy::LinearScan,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> BuyRentResult<()> {
        if self.rate_step <= Decimal::ZERO {
            return Err(BuyRentError::InvalidConfiguration {
                field: "search.rate_step".into(),
                reason: "Search step must be positive".into(),
            });
        }
        if self.ceiling < self.rate_step {
            return Err(BuyRentError::InvalidConfiguration {
                field: "search.ceiling".into(),
                reason: format!(
                    "Ceiling {} must be at least one step ({})",
                    self.ceiling, self.rate_step
                ),
            });
        }
        Ok(())
    }

    /// Index of the last grid rate that does not exceed the ceiling.
    fn last_index(&self) -> BuyRentResult<u32> {
        (self.ceiling / self.rate_step)
            .floor()
            .to_u32()
            .ok_or_else(|| BuyRentError::InvalidConfiguration {
                field: "search.rate_step".into(),
                reason: format!(
                    "Step {} is too fine for ceiling {}",
                    self.rate_step, self.ceiling
                ),
            })
    }
}

/// The two DCA investors sharing one monthly budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakevenParams {
    /// Capital the renter keeps invested instead of putting it into the house.
    pub down_payment: Money,
    pub house_future_value: Money,
    pub rent_per_month: Money,
    pub avg_loan_per_month: Money,
    pub period_count: u32,
    pub monthly_budget: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakevenInput {
    #[serde(flatten)]
    pub params: BreakevenParams,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakevenResult {
    /// Buyer's DCA portfolio value at the breakeven rate, `None` when it is
    /// beyond the Decimal range.
    pub buyer_invest_return: Option<Money>,
    /// Renter's DCA portfolio value at the breakeven rate.
    pub renter_invest_return: Option<Money>,
    pub monthly_rate: Rate,
    /// (1 + monthly_rate)^12 − 1
    pub annualized_breakeven_rate: Rate,
    pub rates_evaluated: u32,
}

enum Standing {
    Behind,
    Ahead {
        buyer: Option<Money>,
        renter: Option<Money>,
    },
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

impl BreakevenParams {
    fn buyer_contribution(&self) -> Money {
        self.monthly_budget - self.avg_loan_per_month
    }

    fn renter_contribution(&self) -> Money {
        self.monthly_budget - self.rent_per_month
    }

    fn check_budget(&self) -> BuyRentResult<()> {
        if self.monthly_budget < self.avg_loan_per_month {
            return Err(BuyRentError::InfeasibleBudget {
                outflow: Outflow::LoanPayment,
                monthly_budget: self.monthly_budget,
                required: self.avg_loan_per_month,
            });
        }
        if self.monthly_budget < self.rent_per_month {
            return Err(BuyRentError::InfeasibleBudget {
                outflow: Outflow::Rent,
                monthly_budget: self.monthly_budget,
                required: self.rent_per_month,
            });
        }
        Ok(())
    }

    /// Does renting and investing beat buying and investing at `rate`?
    fn standing_at(&self, rate: Rate) -> BuyRentResult<Standing> {
        let buyer = dca_future_value(Decimal::ZERO, rate, self.buyer_contribution(), self.period_count).ok();
        let renter = dca_future_value(
            self.down_payment,
            rate,
            self.renter_contribution(),
            self.period_count,
        )
        .ok();
        let compared = match (buyer, renter) {
            (Some(buyer), Some(renter)) => buyer
                .checked_add(self.house_future_value)
                .map(|hurdle| renter > hurdle),
            _ => None,
        };
        let ahead = match compared {
            Some(ahead) => ahead,
            None if rate.is_zero() => {
                return Err(BuyRentError::NumericOverflow {
                    context: "breakeven comparison at zero market rate".into(),
                })
            }
            None => self.renter_ahead_discounted(rate)?,
        };
        Ok(if ahead {
            Standing::Ahead { buyer, renter }
        } else {
            Standing::Behind
        })
    }

    /// Same comparison with both sides divided by `(1+i)^(N−1)`, for rates
    /// where the portfolios themselves leave the Decimal range. With
    /// `c = 1 + 1/i` and `s = f_renter − f_buyer` the renter is ahead iff
    /// `F·(1+i) + s·c > (H + s·c)·(1+i)^−(N−1)`.
    fn renter_ahead_discounted(&self, rate: Rate) -> BuyRentResult<bool> {
        let context = format!("discounted breakeven comparison at monthly rate {rate}");
        let spread = in_range(
            self.renter_contribution().checked_sub(self.buyer_contribution()),
            &context,
        )?;
        let annuity = in_range(
            Decimal::ONE
                .checked_div(rate)
                .and_then(|inv| spread.checked_mul(Decimal::ONE + inv)),
            &context,
        )?;
        let lead = in_range(
            self.down_payment
                .checked_mul(Decimal::ONE + rate)
                .and_then(|seed| seed.checked_add(annuity)),
            &context,
        )?;
        let hurdle = in_range(self.house_future_value.checked_add(annuity), &context)?;

        // A base below one cannot overflow, only vanish
        let discount = (Decimal::ONE / (Decimal::ONE + rate))
            .checked_powu(u64::from(self.period_count - 1))
            .unwrap_or(Decimal::ZERO);
        let hurdle_now = in_range(hurdle.checked_mul(discount), &context)?;
        Ok(lead > hurdle_now)
    }

    fn divergence(&self, config: &SearchConfig, last_rate: Rate) -> BuyRentError {
        BuyRentError::SearchDivergence {
            ceiling: config.ceiling,
            last_rate,
            down_payment: self.down_payment,
            house_future_value: self.house_future_value,
            rent_per_month: self.rent_per_month,
            avg_loan_per_month: self.avg_loan_per_month,
            monthly_budget: self.monthly_budget,
            period_count: self.period_count,
        }
    }

    fn found(
        &self,
        rate: Rate,
        buyer: Option<Money>,
        renter: Option<Money>,
        evaluated: u32,
    ) -> BuyRentResult<BreakevenResult> {
        let annualized = annualize_monthly(rate)?;
        debug!(
            monthly_rate = %rate,
            annualized = %annualized,
            evaluated,
            "breakeven market rate found"
        );
        Ok(BreakevenResult {
            buyer_invest_return: buyer,
            renter_invest_return: renter,
            monthly_rate: rate,
            annualized_breakeven_rate: annualized,
            rates_evaluated: evaluated,
        })
    }

    fn linear_scan(&self, config: &SearchConfig) -> BuyRentResult<BreakevenResult> {
        let last = config.last_index()?;
        let mut rate = Decimal::ZERO;
        let mut evaluated = 0u32;

        for _ in 0..=last {
            evaluated += 1;
            match self.standing_at(rate)? {
                Standing::Ahead { buyer, renter } => return self.found(rate, buyer, renter, evaluated),
                Standing::Behind => trace!(rate = %rate, "renter still behind"),
            }
            rate += config.rate_step;
        }

        Err(self.divergence(config, config.rate_step * Decimal::from(last)))
    }

    fn grid_bisection(&self, config: &SearchConfig) -> BuyRentResult<BreakevenResult> {
        let last = config.last_index()?;
        let rate_at = |k: u32| config.rate_step * Decimal::from(k);
        let mut evaluated = 1u32;

        if let Standing::Ahead { buyer, renter } = self.standing_at(Decimal::ZERO)? {
            return self.found(Decimal::ZERO, buyer, renter, evaluated);
        }

        // Grid index known to be behind, and one known not to be.
        let mut lo = 0u32;
        let mut hi = None;
        let mut next_index = 1u32;
        loop {
            let k = next_index.min(last);
            evaluated += 1;
            match self.standing_at(rate_at(k))? {
                Standing::Behind => lo = k,
                Standing::Ahead { .. } => {
                    hi = Some(k);
                    break;
                }
            }
            if k == last {
                break;
            }
            next_index = next_index.saturating_mul(2);
        }
        let Some(mut hi) = hi else {
            return Err(self.divergence(config, rate_at(last)));
        };

        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            evaluated += 1;
            match self.standing_at(rate_at(mid))? {
                Standing::Behind => lo = mid,
                Standing::Ahead { .. } => hi = mid,
            }
            trace!(lo, hi, "bisection bracket");
        }

        evaluated += 1;
        match self.standing_at(rate_at(hi))? {
            Standing::Ahead { buyer, renter } => self.found(rate_at(hi), buyer, renter, evaluated),
            Standing::Behind => Err(self.divergence(config, rate_at(hi))),
        }
    }
}

/// Smallest grid monthly rate at which renting and investing
/// `budget − rent` (starting from the down payment) ends ahead of buying and
/// investing `budget − loan payment` plus owning the house.
pub fn solve_breakeven(params: &BreakevenParams, config: &SearchConfig) -> BuyRentResult<BreakevenResult> {
    config.validate()?;
    if params.period_count == 0 {
        return Err(BuyRentError::InvalidConfiguration {
            field: "period_count".into(),
            reason: "Number of periods must be at least 1".into(),
        });
    }
    params.check_budget()?;

    debug!(
        down_payment = %params.down_payment,
        buyer_contribution = %params.buyer_contribution(),
        renter_contribution = %params.renter_contribution(),
        strategy = ?config.strategy,
        "searching breakeven market rate"
    );

    match config.strategy {
        SearchStrategy::LinearScan => params.linear_scan(config),
        SearchStrategy::GridBisection => params.grid_bisection(config),
    }
}

/// Breakeven search at the default 0.0001 monthly precision, returning the
/// buyer's portfolio value (`None` past the Decimal range) and the
/// annualized breakeven rate.
pub fn solve_breakeven_market_rate(
    down_payment: Money,
    house_future_value: Money,
    rent_per_month: Money,
    avg_loan_per_month: Money,
    period_count: u32,
    monthly_budget: Money,
) -> BuyRentResult<(Option<Money>, Rate)> {
    let params = BreakevenParams {
        down_payment,
        house_future_value,
        rent_per_month,
        avg_loan_per_month,
        period_count,
        monthly_budget,
    };
    let result = solve_breakeven(&params, &SearchConfig::default())?;
    Ok((result.buyer_invest_return, result.annualized_breakeven_rate))
}

/// Standalone breakeven search with the computation envelope.
pub fn calculate_breakeven(input: &BreakevenInput) -> BuyRentResult<ComputationOutput<BreakevenResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let result = solve_breakeven(&input.params, &input.search)?;
    if result.monthly_rate.is_zero() {
        warnings.push("Renting is ahead even with zero market return".into());
    }
    if result.buyer_invest_return.is_none() || result.renter_invest_return.is_none() {
        warnings.push(format!(
            "Portfolio values at monthly rate {} exceed the Decimal range and are omitted",
            result.monthly_rate
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Breakeven market rate: fixed-budget DCA, rent vs buy",
        input,
        warnings,
        elapsed,
        result,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// 10M house, 70% loan at 1.6% over 30 years (equal total payment),
    /// 30k rent, 50k budget, 12M exit price.
    fn reference_params() -> BreakevenParams {
        BreakevenParams {
            down_payment: dec!(3_000_000),
            house_future_value: dec!(12_000_000),
            rent_per_month: dec!(30_000),
            avg_loan_per_month: dec!(24495.732916874174),
            period_count: 360,
            monthly_budget: dec!(50_000),
        }
    }

    #[test]
    fn test_reference_breakeven() {
        let result = solve_breakeven(&reference_params(), &SearchConfig::default()).unwrap();
        assert_eq!(result.monthly_rate, dec!(0.0049));
        assert_eq!(result.rates_evaluated, 50);
        // 1.0049^12 − 1 ≈ 6.041%
        assert!((result.annualized_breakeven_rate - dec!(0.0604108303877)).abs() < dec!(0.0000001));
        assert!(result.renter_invest_return.unwrap() > result.buyer_invest_return.unwrap() + dec!(12_000_000));
    }

    #[test]
    fn test_spec_signature_matches_config_search() {
        let p = reference_params();
        let (buyer, annual) = solve_breakeven_market_rate(
            p.down_payment,
            p.house_future_value,
            p.rent_per_month,
            p.avg_loan_per_month,
            p.period_count,
            p.monthly_budget,
        )
        .unwrap();
        let full = solve_breakeven(&p, &SearchConfig::default()).unwrap();
        assert_eq!(buyer, full.buyer_invest_return);
        assert_eq!(annual, full.annualized_breakeven_rate);
    }

    #[test]
    fn test_previous_step_is_behind() {
        let p = reference_params();
        let result = solve_breakeven(&p, &SearchConfig::default()).unwrap();
        let before = result.monthly_rate - DEFAULT_RATE_STEP;
        assert!(matches!(p.standing_at(before).unwrap(), Standing::Behind));
    }

    #[test]
    fn test_bisection_agrees_with_scan() {
        let p = reference_params();
        let scan = solve_breakeven(&p, &SearchConfig::default()).unwrap();
        let bisect = solve_breakeven(
            &p,
            &SearchConfig {
                strategy: SearchStrategy::GridBisection,
                ..SearchConfig::default()
            },
        )
        .unwrap();
        assert_eq!(scan.monthly_rate, bisect.monthly_rate);
        assert_eq!(scan.buyer_invest_return, bisect.buyer_invest_return);
        assert!(bisect.rates_evaluated < scan.rates_evaluated);
    }

    #[test]
    fn test_coarser_step_rounds_up() {
        let result = solve_breakeven(
            &reference_params(),
            &SearchConfig {
                rate_step: dec!(0.001),
                ..SearchConfig::default()
            },
        )
        .unwrap();
        assert_eq!(result.monthly_rate, dec!(0.005));
    }

    #[test]
    fn test_renter_ahead_at_zero_rate() {
        let p = BreakevenParams {
            down_payment: dec!(3_000_000),
            house_future_value: dec!(1_000_000),
            rent_per_month: dec!(10_000),
            avg_loan_per_month: dec!(20_000),
            period_count: 240,
            monthly_budget: dec!(30_000),
        };
        let result = solve_breakeven(&p, &SearchConfig::default()).unwrap();
        assert_eq!(result.monthly_rate, Decimal::ZERO);
        assert_eq!(result.annualized_breakeven_rate, Decimal::ZERO);
        assert_eq!(result.rates_evaluated, 1);
    }

    #[test]
    fn test_budget_below_loan_payment() {
        let mut p = reference_params();
        p.monthly_budget = dec!(24_000);
        p.rent_per_month = dec!(10_000);
        let err = solve_breakeven(&p, &SearchConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            BuyRentError::InfeasibleBudget { outflow: Outflow::LoanPayment, .. }
        ));
    }

    #[test]
    fn test_budget_below_rent() {
        let mut p = reference_params();
        p.monthly_budget = dec!(28_000);
        let err = solve_breakeven(&p, &SearchConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            BuyRentError::InfeasibleBudget { outflow: Outflow::Rent, .. }
        ));
    }

    #[test]
    fn test_divergence_when_renter_cannot_catch_up() {
        // No down payment to invest and almost no monthly surplus for the renter
        let p = BreakevenParams {
            down_payment: Decimal::ZERO,
            house_future_value: dec!(12_000_000),
            rent_per_month: dec!(39_999),
            avg_loan_per_month: dec!(20_000),
            period_count: 360,
            monthly_budget: dec!(40_000),
        };
        for strategy in [SearchStrategy::LinearScan, SearchStrategy::GridBisection] {
            let config = SearchConfig {
                strategy,
                ..SearchConfig::default()
            };
            // Portfolios leave the Decimal range near 20% a month; the scan
            // still runs to the ceiling
            match solve_breakeven(&p, &config).unwrap_err() {
                BuyRentError::SearchDivergence { last_rate, ceiling, .. } => {
                    assert_eq!(last_rate, dec!(0.5));
                    assert_eq!(ceiling, dec!(0.5));
                }
                other => panic!("expected divergence, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_breakeven_beyond_decimal_range() {
        // Rent nearly eats the budget, so the renter only wins at a third a month
        let p = BreakevenParams {
            down_payment: dec!(3_000_000),
            house_future_value: dec!(12_000_000),
            rent_per_month: dec!(1_020_000),
            avg_loan_per_month: dec!(20_000),
            period_count: 360,
            monthly_budget: dec!(1_100_000),
        };
        let scan = solve_breakeven(&p, &SearchConfig::default()).unwrap();
        assert_eq!(scan.monthly_rate, dec!(0.3334));
        assert_eq!(scan.rates_evaluated, 3335);
        assert_eq!(scan.buyer_invest_return, None);
        assert_eq!(scan.renter_invest_return, None);
        assert!(matches!(p.standing_at(dec!(0.3333)).unwrap(), Standing::Behind));

        let bisect = solve_breakeven(
            &p,
            &SearchConfig {
                strategy: SearchStrategy::GridBisection,
                ..SearchConfig::default()
            },
        )
        .unwrap();
        assert_eq!(bisect.monthly_rate, scan.monthly_rate);
    }

    #[test]
    fn test_divergence_within_short_horizon_hits_ceiling() {
        // Short horizon: compounding never leaves the Decimal range, so the
        // scan runs to the ceiling itself
        let p = BreakevenParams {
            down_payment: Decimal::ZERO,
            house_future_value: dec!(12_000_000),
            rent_per_month: dec!(39_999),
            avg_loan_per_month: dec!(20_000),
            period_count: 12,
            monthly_budget: dec!(40_000),
        };
        let err = solve_breakeven(&p, &SearchConfig::default()).unwrap_err();
        match err {
            BuyRentError::SearchDivergence { last_rate, ceiling, .. } => {
                assert_eq!(last_rate, dec!(0.5));
                assert_eq!(ceiling, dec!(0.5));
            }
            other => panic!("expected divergence, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_step_rejected() {
        let config = SearchConfig {
            rate_step: Decimal::ZERO,
            ..SearchConfig::default()
        };
        let err = solve_breakeven(&reference_params(), &config).unwrap_err();
        assert!(matches!(err, BuyRentError::InvalidConfiguration { .. }));
    }
}
