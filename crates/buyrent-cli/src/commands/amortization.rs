use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use buyrent_core::amortization::{self, AmortizationInput};
use buyrent_core::PaymentMethod;

use crate::input;

/// Arguments for a monthly amortization table
#[derive(Args)]
pub struct AmortizeArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Yearly interest rate (e.g. 0.016 for 1.6%)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Loan term in years
    #[arg(long)]
    pub term: Option<Decimal>,

    /// equal_total_payment or equal_principal_payment
    #[arg(long, default_value = "equal_total_payment")]
    pub payment_method: String,

    /// Print only the totals, without the per-period table
    #[arg(long)]
    pub summary: bool,
}

pub fn run_amortize(args: AmortizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let amort_input: AmortizationInput = if let Some(loaded) = input::load(args.input.as_deref())? {
        loaded
    } else {
        let principal = args
            .principal
            .ok_or("--principal is required (or provide --input)")?;
        let rate = args.rate.ok_or("--rate is required (or provide --input)")?;
        let term = args.term.ok_or("--term is required (or provide --input)")?;

        AmortizationInput {
            principal,
            yearly_interest_rate: rate,
            loan_term_years: term,
            payment_method: args.payment_method.parse::<PaymentMethod>()?,
        }
    };

    let mut result = amortization::build_schedule(&amort_input)?;
    if args.summary {
        result.result.periods.clear();
    }
    Ok(serde_json::to_value(result)?)
}
