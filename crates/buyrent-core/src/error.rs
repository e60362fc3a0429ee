use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::GridPoint;

/// Which mandatory monthly outflow the budget failed to cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outflow {
    LoanPayment,
    Rent,
}

impl std::fmt::Display for Outflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outflow::LoanPayment => write!(f, "average monthly loan payment"),
            Outflow::Rent => write!(f, "monthly rent"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BuyRentError {
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Invalid payment method '{0}' (expected equal_total_payment or equal_principal_payment)")]
    InvalidMethod(String),

    #[error("Infeasible budget: monthly budget {monthly_budget} is below the {outflow} of {required}")]
    InfeasibleBudget {
        outflow: Outflow,
        monthly_budget: Decimal,
        required: Decimal,
    },

    #[error(
        "Search divergence: no breakeven monthly rate up to {ceiling} \
         (last tried {last_rate}; down payment {down_payment}, house value {house_future_value}, \
         rent {rent_per_month}, loan {avg_loan_per_month}, budget {monthly_budget}, periods {period_count})"
    )]
    SearchDivergence {
        ceiling: Decimal,
        last_rate: Decimal,
        down_payment: Decimal,
        house_future_value: Decimal,
        rent_per_month: Decimal,
        avg_loan_per_month: Decimal,
        monthly_budget: Decimal,
        period_count: u32,
    },

    #[error("Numeric overflow in {context}")]
    NumericOverflow { context: String },

    #[error("Grid point (rate {}, term {} years): {source}", .point.yearly_interest_rate, .point.loan_term_years)]
    AtGridPoint {
        point: GridPoint,
        #[source]
        source: Box<BuyRentError>,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl BuyRentError {
    /// Attach the grid point that produced this error.
    pub fn at(self, point: GridPoint) -> Self {
        BuyRentError::AtGridPoint {
            point,
            source: Box::new(self),
        }
    }

    /// Short machine-readable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            BuyRentError::InvalidConfiguration { .. } => "invalid_configuration",
            BuyRentError::InvalidMethod(_) => "invalid_method",
            BuyRentError::InfeasibleBudget { .. } => "infeasible_budget",
            BuyRentError::SearchDivergence { .. } => "search_divergence",
            BuyRentError::NumericOverflow { .. } => "numeric_overflow",
            BuyRentError::AtGridPoint { source, .. } => source.kind(),
            BuyRentError::SerializationError(_) => "serialization_error",
        }
    }
}

impl From<serde_json::Error> for BuyRentError {
    fn from(e: serde_json::Error) -> Self {
        BuyRentError::SerializationError(e.to_string())
    }
}
