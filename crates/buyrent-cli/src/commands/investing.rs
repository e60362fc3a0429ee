use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use buyrent_core::dca::accumulator::{self, DcaInput};
use buyrent_core::dca::breakeven::{self, BreakevenInput, BreakevenParams};
use buyrent_core::dca::{SearchConfig, SearchStrategy};
use buyrent_core::returns::{self, RequiredReturnInput};

use crate::input;

/// Arguments for the required-return back-solve
#[derive(Args)]
pub struct RequiredIrrArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// House value at the end of the horizon
    #[arg(long)]
    pub house_future_value: Option<Decimal>,

    /// Down payment plus all loan payments
    #[arg(long)]
    pub total_payment: Option<Decimal>,

    /// Rent paid over the same horizon
    #[arg(long, default_value = "0")]
    pub total_rent: Decimal,

    /// Horizon in years
    #[arg(long)]
    pub years: Option<Decimal>,
}

pub fn run_required_irr(args: RequiredIrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let rr_input: RequiredReturnInput = if let Some(loaded) = input::load(args.input.as_deref())? {
        loaded
    } else {
        RequiredReturnInput {
            house_future_value: args
                .house_future_value
                .ok_or("--house-future-value is required (or provide --input)")?,
            total_payment: args
                .total_payment
                .ok_or("--total-payment is required (or provide --input)")?,
            total_rent: args.total_rent,
            years: args.years.ok_or("--years is required (or provide --input)")?,
        }
    };

    let result = returns::calculate_required_return(&rr_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for a dollar-cost-averaging projection
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct DcaArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Lump sum invested at the start
    #[arg(long, default_value = "0")]
    pub initial_fund: Decimal,

    /// Periodic (monthly) return
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Amount invested every period
    #[arg(long)]
    pub contribution: Option<Decimal>,

    /// Number of periods
    #[arg(long)]
    pub periods: Option<u32>,
}

pub fn run_dca(args: DcaArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let dca_input: DcaInput = if let Some(loaded) = input::load(args.input.as_deref())? {
        loaded
    } else {
        DcaInput {
            initial_fund: args.initial_fund,
            periodic_rate: args.rate.ok_or("--rate is required (or provide --input)")?,
            periodic_contribution: args
                .contribution
                .ok_or("--contribution is required (or provide --input)")?,
            period_count: args.periods.ok_or("--periods is required (or provide --input)")?,
        }
    };

    let result = accumulator::project_dca(&dca_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for a single breakeven market-rate search
#[derive(Args)]
pub struct BreakevenArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Down payment the renter keeps invested
    #[arg(long)]
    pub down_payment: Option<Decimal>,

    /// House value at the end of the loan
    #[arg(long)]
    pub house_future_value: Option<Decimal>,

    /// Monthly rent
    #[arg(long)]
    pub rent_per_month: Option<Decimal>,

    /// Average monthly loan payment
    #[arg(long)]
    pub avg_loan_per_month: Option<Decimal>,

    /// Number of monthly periods
    #[arg(long)]
    pub periods: Option<u32>,

    /// Monthly budget shared by buyer and renter
    #[arg(long)]
    pub monthly_budget: Option<Decimal>,

    /// Monthly rate precision of the search
    #[arg(long)]
    pub rate_step: Option<Decimal>,

    /// Use grid bisection instead of the linear rate scan
    #[arg(long)]
    pub bisect: bool,
}

pub fn run_breakeven(args: BreakevenArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let be_input: BreakevenInput = if let Some(loaded) = input::load(args.input.as_deref())? {
        loaded
    } else {
        let defaults = SearchConfig::default();
        BreakevenInput {
            params: BreakevenParams {
                down_payment: args
                    .down_payment
                    .ok_or("--down-payment is required (or provide --input)")?,
                house_future_value: args
                    .house_future_value
                    .ok_or("--house-future-value is required (or provide --input)")?,
                rent_per_month: args
                    .rent_per_month
                    .ok_or("--rent-per-month is required (or provide --input)")?,
                avg_loan_per_month: args
                    .avg_loan_per_month
                    .ok_or("--avg-loan-per-month is required (or provide --input)")?,
                period_count: args.periods.ok_or("--periods is required (or provide --input)")?,
                monthly_budget: args
                    .monthly_budget
                    .ok_or("--monthly-budget is required (or provide --input)")?,
            },
            search: SearchConfig {
                rate_step: args.rate_step.unwrap_or(defaults.rate_step),
                strategy: if args.bisect {
                    SearchStrategy::GridBisection
                } else {
                    SearchStrategy::LinearScan
                },
                ..defaults
            },
        }
    };

    let result = breakeven::calculate_breakeven(&be_input)?;
    Ok(serde_json::to_value(result)?)
}
