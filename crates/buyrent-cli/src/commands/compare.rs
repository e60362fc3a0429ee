use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use buyrent_core::dca::{SearchConfig, SearchStrategy};
use buyrent_core::scenarios::{self, FailurePolicy, ScenarioInputs, TerminalValue};
use buyrent_core::PaymentMethod;

use crate::input;

/// Arguments for the rate × term buy-vs-rent comparison
#[derive(Args)]
pub struct CompareArgs {
    /// Path to JSON scenario file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Yearly loan interest rates (comma-separated, e.g. "0.014,0.016,0.018")
    #[arg(long, value_delimiter = ',')]
    pub rates: Option<Vec<Decimal>>,

    /// Loan terms in years (comma-separated, e.g. "20,30,40")
    #[arg(long, value_delimiter = ',')]
    pub terms: Option<Vec<Decimal>>,

    /// House purchase price
    #[arg(long)]
    pub house_price: Option<Decimal>,

    /// Share of the price financed by the loan (0 to 1)
    #[arg(long)]
    pub loan_proportion: Option<Decimal>,

    /// Resale price at the end of the loan term
    #[arg(long, conflicts_with = "house_growth")]
    pub price_after_loan_term: Option<Decimal>,

    /// Yearly house price growth, instead of a fixed resale price
    #[arg(long)]
    pub house_growth: Option<Decimal>,

    /// equal_total_payment or equal_principal_payment
    #[arg(long)]
    pub payment_method: Option<String>,

    /// Monthly rent paid when not buying
    #[arg(long)]
    pub rent_per_month: Option<Decimal>,

    /// Monthly budget shared by buyer and renter (enables the DCA comparison)
    #[arg(long)]
    pub monthly_budget: Option<Decimal>,

    /// Monthly rate precision of the breakeven search
    #[arg(long)]
    pub rate_step: Option<Decimal>,

    /// Use grid bisection instead of the linear rate scan
    #[arg(long)]
    pub bisect: bool,

    /// Stop at the first grid point whose DCA comparison fails
    #[arg(long)]
    pub abort_on_failure: bool,

    /// Evaluate grid points in parallel
    #[arg(long)]
    pub parallel: bool,
}

impl CompareArgs {
    fn into_inputs(self) -> Result<ScenarioInputs, Box<dyn std::error::Error>> {
        let mut inputs = ScenarioInputs::default();

        if let Some(rates) = self.rates {
            inputs.yearly_interest_rate_list = rates;
        }
        if let Some(terms) = self.terms {
            inputs.loan_term_list = terms;
        }
        if let Some(price) = self.house_price {
            inputs.house_price = price;
        }
        if let Some(proportion) = self.loan_proportion {
            inputs.loan_proportion = proportion;
        }
        if let Some(price) = self.price_after_loan_term {
            inputs.terminal_value = TerminalValue::FixedPrice { price };
        }
        if let Some(rate) = self.house_growth {
            inputs.terminal_value = TerminalValue::AnnualGrowth { rate };
        }
        if let Some(ref method) = self.payment_method {
            inputs.payment_method = method.parse::<PaymentMethod>()?;
        }
        if let Some(rent) = self.rent_per_month {
            inputs.rent_per_month = rent;
        }
        inputs.monthly_budget = self.monthly_budget;
        inputs.search = SearchConfig {
            rate_step: self.rate_step.unwrap_or(inputs.search.rate_step),
            strategy: if self.bisect {
                SearchStrategy::GridBisection
            } else {
                SearchStrategy::LinearScan
            },
            ..inputs.search
        };
        if self.abort_on_failure {
            inputs.failure_policy = FailurePolicy::Abort;
        }
        inputs.parallel = self.parallel;

        Ok(inputs)
    }
}

pub fn run_compare(args: CompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let scenario_input: ScenarioInputs = if let Some(loaded) = input::load(args.input.as_deref())? {
        loaded
    } else {
        args.into_inputs()?
    };

    let result = scenarios::run_scenario(&scenario_input)?;
    Ok(serde_json::to_value(result)?)
}
