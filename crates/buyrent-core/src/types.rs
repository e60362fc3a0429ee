use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BuyRentError;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Year counts, possibly fractional (e.g. a 27.5 year loan term)
pub type Years = Decimal;

/// Loan repayment convention. Loans are assumed to be paid monthly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Constant payment (principal + interest) every period
    #[default]
    #[serde(alias = "equal_total")]
    EqualTotalPayment,
    /// Constant principal portion every period; interest declines with the balance
    #[serde(alias = "equal_principal")]
    EqualPrincipalPayment,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::EqualTotalPayment => "equal_total_payment",
            PaymentMethod::EqualPrincipalPayment => "equal_principal_payment",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = BuyRentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "equal_total_payment" | "equal_total" | "etp" => Ok(PaymentMethod::EqualTotalPayment),
            "equal_principal_payment" | "equal_principal" | "epp" => {
                Ok(PaymentMethod::EqualPrincipalPayment)
            }
            _ => Err(BuyRentError::InvalidMethod(s.to_string())),
        }
    }
}

/// One (yearly interest rate, loan term) combination of the scenario grid.
///
/// Identity is the index pair into the caller's input lists; the rate and
/// term are the caller's values, carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPoint {
    pub rate_index: usize,
    pub term_index: usize,
    pub yearly_interest_rate: Rate,
    pub loan_term_years: Years,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
