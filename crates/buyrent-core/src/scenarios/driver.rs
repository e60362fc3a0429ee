use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::amortization::{amortize_terms, LoanTerms};
use crate::compounding::{months_in_term, MONTHS_PER_YEAR};
use crate::dca::breakeven::{solve_breakeven, BreakevenParams};
use crate::error::BuyRentError;
use crate::returns::{required_irr, return_multiple};
use crate::scenarios::inputs::{FailurePolicy, ScenarioInputs};
use crate::scenarios::parallel::maybe_parallel_map;
use crate::types::*;
use crate::BuyRentResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Outcome of the fixed-budget DCA comparison at one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DcaComparison {
    Breakeven {
        /// Buyer's DCA portfolio at the breakeven rate, if within Decimal range
        buyer_invest_return: Option<Money>,
        renter_invest_return: Option<Money>,
        monthly_rate: Rate,
        /// Annualized breakeven market rate
        dca_market_irr: Rate,
    },
    Failed {
        kind: String,
        reason: String,
    },
}

/// Everything computed for one (rate, term) grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub point: GridPoint,
    pub monthly_interest_rate: Rate,
    pub period_count: u32,
    /// Principal plus interest over the whole loan
    pub principal_and_interest: Money,
    pub avg_monthly_payment: Money,
    /// Down payment plus principal and interest
    pub total_payment: Money,
    /// House value at the end of the term
    pub total_return: Money,
    pub total_margin: Money,
    pub total_rent: Money,
    /// Annual return renting must earn to match buying (equal budget, lump sum)
    pub required_irr: Rate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dca: Option<DcaComparison>,
}

impl ComparisonResult {
    /// Annualized breakeven market rate, when the DCA comparison succeeded.
    pub fn dca_market_irr(&self) -> Option<Rate> {
        match &self.dca {
            Some(DcaComparison::Breakeven { dca_market_irr, .. }) => Some(*dca_market_irr),
            _ => None,
        }
    }
}

/// Results for the complete grid, in grid order (rates outer, terms inner).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutput {
    pub down_payment: Money,
    pub principal: Money,
    pub payment_method: PaymentMethod,
    pub yearly_interest_rates: Vec<Rate>,
    pub loan_terms: Vec<Years>,
    pub results: Vec<ComparisonResult>,
    pub failed_points: usize,
}

impl ScenarioOutput {
    /// Result by input list indices.
    pub fn get(&self, rate_index: usize, term_index: usize) -> Option<&ComparisonResult> {
        if rate_index >= self.yearly_interest_rates.len() || term_index >= self.loan_terms.len() {
            return None;
        }
        self.results.get(rate_index * self.loan_terms.len() + term_index)
    }

    /// Result by the exact rate and term values given as input.
    pub fn find(&self, yearly_interest_rate: Rate, loan_term_years: Years) -> Option<&ComparisonResult> {
        self.results.iter().find(|r| {
            r.point.yearly_interest_rate == yearly_interest_rate
                && r.point.loan_term_years == loan_term_years
        })
    }

    /// All rates for one loan term, in rate order: one chart panel's worth.
    pub fn series_for_term(&self, term_index: usize) -> Vec<&ComparisonResult> {
        self.results
            .iter()
            .filter(|r| r.point.term_index == term_index)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Case 1 figures plus the DCA search outcome, with the DCA error kept
/// aside so the caller can apply its failure policy.
fn evaluate_cell(
    inputs: &ScenarioInputs,
    point: &GridPoint,
) -> BuyRentResult<(ComparisonResult, Option<BuyRentError>)> {
    let down_payment = inputs.down_payment();
    let monthly_interest_rate = point.yearly_interest_rate / Decimal::from(MONTHS_PER_YEAR);
    let period_count = months_in_term(point.loan_term_years)?;
    let periods = Decimal::from(period_count);

    let terms = LoanTerms::new(inputs.principal(), monthly_interest_rate, period_count)?;
    let amortized = amortize_terms(inputs.payment_method, &terms)?;
    let principal_and_interest = amortized.total_interest;
    // Whole months, matching the schedule length
    let avg_monthly_payment = principal_and_interest / periods;

    let total_payment = down_payment + principal_and_interest;
    let total_return = inputs
        .terminal_value
        .value_after(inputs.house_price, point.loan_term_years)?;
    let total_rent = inputs.rent_per_month * periods;

    // Case 1 ignores what the down payment could have earned elsewhere
    let multiple = return_multiple(total_return, total_payment, total_rent);
    let required = required_irr(multiple, point.loan_term_years)?;

    let mut dca_error = None;
    let dca = inputs.monthly_budget.map(|budget| {
        let params = BreakevenParams {
            down_payment,
            house_future_value: total_return,
            rent_per_month: inputs.rent_per_month,
            avg_loan_per_month: avg_monthly_payment,
            period_count,
            monthly_budget: budget,
        };
        match solve_breakeven(&params, &inputs.search) {
            Ok(found) => DcaComparison::Breakeven {
                buyer_invest_return: found.buyer_invest_return,
                renter_invest_return: found.renter_invest_return,
                monthly_rate: found.monthly_rate,
                dca_market_irr: found.annualized_breakeven_rate,
            },
            Err(e) => {
                let failed = DcaComparison::Failed {
                    kind: e.kind().to_string(),
                    reason: e.to_string(),
                };
                dca_error = Some(e);
                failed
            }
        }
    });

    debug!(
        rate = %point.yearly_interest_rate,
        term = %point.loan_term_years,
        required_irr = %required,
        "grid point evaluated"
    );

    let result = ComparisonResult {
        point: *point,
        monthly_interest_rate,
        period_count,
        principal_and_interest,
        avg_monthly_payment,
        total_payment,
        total_return,
        total_margin: total_return - total_payment,
        total_rent,
        required_irr: required,
        dca,
    };
    Ok((result, dca_error))
}

/// Evaluate a single grid point; any failure, DCA included, is an error
/// tagged with the point.
pub fn evaluate_point(inputs: &ScenarioInputs, point: &GridPoint) -> BuyRentResult<ComparisonResult> {
    match evaluate_cell(inputs, point) {
        Ok((result, None)) => Ok(result),
        Ok((_, Some(e))) | Err(e) => Err(e.at(*point)),
    }
}

/// Run the full interest-rate × loan-term comparison.
///
/// Every grid point yields exactly one result. Configuration errors abort
/// before any point runs. DCA failures at a point follow
/// `inputs.failure_policy`.
pub fn run_scenario(inputs: &ScenarioInputs) -> BuyRentResult<ComputationOutput<ScenarioOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    inputs.validate()?;
    if inputs.monthly_budget.is_none() {
        warnings.push("No monthly_budget given: DCA breakeven comparison skipped".into());
    }
    if inputs.parallel && !cfg!(feature = "parallel") {
        warnings.push("Parallel evaluation requested but the parallel feature is disabled".into());
    }

    let points = inputs.grid_points();
    info!(points = points.len(), parallel = inputs.parallel, "running scenario grid");

    let evaluated = maybe_parallel_map(&points, inputs.parallel, |p| evaluate_cell(inputs, p));

    let mut results = Vec::with_capacity(points.len());
    let mut failed_points = 0usize;
    for (point, outcome) in points.iter().zip(evaluated) {
        let (result, dca_error) = outcome.map_err(|e| e.at(*point))?;
        if let Some(e) = dca_error {
            if inputs.failure_policy == FailurePolicy::Abort {
                return Err(e.at(*point));
            }
            warn!(
                rate = %point.yearly_interest_rate,
                term = %point.loan_term_years,
                error = %e,
                "DCA comparison skipped"
            );
            warnings.push(format!(
                "DCA comparison failed at (rate {}, term {} years): {e}",
                point.yearly_interest_rate, point.loan_term_years
            ));
            failed_points += 1;
        }
        results.push(result);
    }

    let output = ScenarioOutput {
        down_payment: inputs.down_payment(),
        principal: inputs.principal(),
        payment_method: inputs.payment_method,
        yearly_interest_rates: inputs.yearly_interest_rate_list.clone(),
        loan_terms: inputs.loan_term_list.clone(),
        results,
        failed_points,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Buy vs rent: required IRR (equal budget) and DCA breakeven market rate (fixed budget)",
        inputs,
        warnings,
        elapsed,
        output,
    ))
}
