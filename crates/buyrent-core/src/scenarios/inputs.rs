use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::compounding::{in_range, months_in_term, pow_fractional};
use crate::dca::SearchConfig;
use crate::error::BuyRentError;
use crate::types::*;
use crate::BuyRentResult;

/// What the house is worth at the end of the loan term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminalValue {
    /// Same resale price whatever the term.
    FixedPrice { price: Money },
    /// Purchase price compounded yearly over the term.
    AnnualGrowth { rate: Rate },
}

impl Default for TerminalValue {
    fn default() -> Self {
        TerminalValue::FixedPrice {
            price: dec!(12_000_000),
        }
    }
}

impl TerminalValue {
    pub fn value_after(&self, house_price: Money, term_years: Years) -> BuyRentResult<Money> {
        match self {
            TerminalValue::FixedPrice { price } => Ok(*price),
            TerminalValue::AnnualGrowth { rate } => {
                let growth = pow_fractional(Decimal::ONE + rate, term_years, "house price growth")?;
                in_range(
                    house_price.checked_mul(growth),
                    &format!("house price {house_price} grown at {rate} for {term_years} years"),
                )
            }
        }
    }
}

/// What to do when the DCA comparison cannot be evaluated at a grid point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure on the grid point, add a warning and carry on.
    #[default]
    SkipAndReport,
    /// Stop at the first failing grid point (in grid order).
    Abort,
}

/// Assumptions shared by every point of the rate × term grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioInputs {
    /// Fixed yearly loan rates to compare
    #[serde(default = "default_rates")]
    pub yearly_interest_rate_list: Vec<Rate>,
    /// Loan terms in years
    #[serde(default = "default_terms")]
    pub loan_term_list: Vec<Years>,
    #[serde(default = "default_house_price")]
    pub house_price: Money,
    /// Share of the price financed by the loan, in [0, 1]
    #[serde(default = "default_loan_proportion")]
    pub loan_proportion: Rate,
    #[serde(default)]
    pub terminal_value: TerminalValue,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default = "default_rent")]
    pub rent_per_month: Money,
    /// Monthly budget shared by the buyer and the renter. Without it only
    /// the lump-sum comparison runs.
    #[serde(default)]
    pub monthly_budget: Option<Money>,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Evaluate grid points on the rayon pool (needs the `parallel` feature)
    #[serde(default)]
    pub parallel: bool,
}

fn default_rates() -> Vec<Rate> {
    vec![dec!(0.014), dec!(0.015), dec!(0.016), dec!(0.017), dec!(0.018)]
}

fn default_terms() -> Vec<Years> {
    vec![dec!(20), dec!(25), dec!(30), dec!(35), dec!(40)]
}

fn default_house_price() -> Money {
    dec!(10_000_000)
}

fn default_loan_proportion() -> Rate {
    dec!(0.7)
}

fn default_rent() -> Money {
    dec!(30_000)
}

impl Default for ScenarioInputs {
    fn default() -> Self {
        ScenarioInputs {
            yearly_interest_rate_list: default_rates(),
            loan_term_list: default_terms(),
            house_price: default_house_price(),
            loan_proportion: default_loan_proportion(),
            terminal_value: TerminalValue::default(),
            payment_method: PaymentMethod::default(),
            rent_per_month: default_rent(),
            monthly_budget: None,
            search: SearchConfig::default(),
            failure_policy: FailurePolicy::default(),
            parallel: false,
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> BuyRentError {
    BuyRentError::InvalidConfiguration {
        field: field.to_string(),
        reason: reason.into(),
    }
}

impl ScenarioInputs {
    /// house_price × (1 − loan_proportion)
    pub fn down_payment(&self) -> Money {
        self.house_price * (Decimal::ONE - self.loan_proportion)
    }

    /// house_price − down_payment
    pub fn principal(&self) -> Money {
        self.house_price - self.down_payment()
    }

    pub fn grid_size(&self) -> usize {
        self.yearly_interest_rate_list.len() * self.loan_term_list.len()
    }

    /// Every grid point, rates outer and terms inner.
    pub fn grid_points(&self) -> Vec<GridPoint> {
        let mut points = Vec::with_capacity(self.grid_size());
        for (rate_index, rate) in self.yearly_interest_rate_list.iter().enumerate() {
            for (term_index, term) in self.loan_term_list.iter().enumerate() {
                points.push(GridPoint {
                    rate_index,
                    term_index,
                    yearly_interest_rate: *rate,
                    loan_term_years: *term,
                });
            }
        }
        points
    }

    /// Reject assumptions that make the whole run meaningless.
    pub fn validate(&self) -> BuyRentResult<()> {
        if self.yearly_interest_rate_list.is_empty() {
            return Err(invalid("yearly_interest_rate_list", "At least one interest rate is required"));
        }
        if let Some(r) = self.yearly_interest_rate_list.iter().find(|r| **r < Decimal::ZERO) {
            return Err(invalid("yearly_interest_rate_list", format!("Negative interest rate {r}")));
        }
        if self.loan_term_list.is_empty() {
            return Err(invalid("loan_term_list", "At least one loan term is required"));
        }
        for term in &self.loan_term_list {
            months_in_term(*term).map_err(|_| {
                invalid("loan_term_list", format!("Loan term {term} years is shorter than one month"))
            })?;
        }
        if self.house_price <= Decimal::ZERO {
            return Err(invalid("house_price", "House price must be positive"));
        }
        if self.loan_proportion < Decimal::ZERO || self.loan_proportion > Decimal::ONE {
            return Err(invalid(
                "loan_proportion",
                format!("Loan proportion {} is outside [0, 1]", self.loan_proportion),
            ));
        }
        if self.rent_per_month < Decimal::ZERO {
            return Err(invalid("rent_per_month", "Rent must be non-negative"));
        }
        if let Some(budget) = self.monthly_budget {
            if budget < Decimal::ZERO {
                return Err(invalid("monthly_budget", "Monthly budget must be non-negative"));
            }
        }
        match self.terminal_value {
            TerminalValue::FixedPrice { price } if price < Decimal::ZERO => {
                return Err(invalid("terminal_value.price", "Future price must be non-negative"));
            }
            TerminalValue::AnnualGrowth { rate } if rate <= Decimal::NEGATIVE_ONE => {
                return Err(invalid("terminal_value.rate", "Growth rate must be greater than -100%"));
            }
            _ => {}
        }
        self.search.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_are_valid() {
        let inputs = ScenarioInputs::default();
        inputs.validate().unwrap();
        assert_eq!(inputs.down_payment(), dec!(3_000_000));
        assert_eq!(inputs.principal(), dec!(7_000_000));
        assert_eq!(inputs.grid_size(), 25);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let inputs: ScenarioInputs = serde_json::from_str("{}").unwrap();
        assert_eq!(inputs.yearly_interest_rate_list.len(), 5);
        assert_eq!(inputs.payment_method, PaymentMethod::EqualTotalPayment);
        assert!(inputs.monthly_budget.is_none());
    }

    #[test]
    fn test_unknown_payment_method_rejected_at_parse() {
        let parsed: Result<ScenarioInputs, _> =
            serde_json::from_str(r#"{"payment_method": "interest_only"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_growth_past_decimal_range_is_an_error() {
        let growth = TerminalValue::AnnualGrowth { rate: dec!(3) };
        let err = growth.value_after(dec!(10_000_000_000), dec!(40)).unwrap_err();
        assert!(matches!(err, BuyRentError::NumericOverflow { .. }));
        // 4^20 still fits
        assert_eq!(
            growth.value_after(dec!(1), dec!(20)).unwrap(),
            dec!(1_099_511_627_776)
        );
    }

    #[test]
    fn test_terminal_value_json() {
        let inputs: ScenarioInputs = serde_json::from_str(
            r#"{"terminal_value": {"kind": "annual_growth", "rate": "0.02"}}"#,
        )
        .unwrap();
        assert_eq!(
            inputs.terminal_value,
            TerminalValue::AnnualGrowth { rate: dec!(0.02) }
        );
    }

    #[test]
    fn test_growth_terminal_value() {
        let tv = TerminalValue::AnnualGrowth { rate: dec!(0.1) };
        assert_eq!(tv.value_after(dec!(1_000_000), dec!(2)).unwrap(), dec!(1_210_000));
        let fixed = TerminalValue::FixedPrice { price: dec!(5) };
        assert_eq!(fixed.value_after(dec!(1_000_000), dec!(30)).unwrap(), dec!(5));
    }

    #[test]
    fn test_grid_points_order() {
        let inputs = ScenarioInputs {
            yearly_interest_rate_list: vec![dec!(0.01), dec!(0.02)],
            loan_term_list: vec![dec!(10), dec!(20), dec!(30)],
            ..ScenarioInputs::default()
        };
        let points = inputs.grid_points();
        assert_eq!(points.len(), 6);
        assert_eq!((points[0].rate_index, points[0].term_index), (0, 0));
        assert_eq!((points[2].rate_index, points[2].term_index), (0, 2));
        assert_eq!((points[3].rate_index, points[3].term_index), (1, 0));
        assert_eq!(points[5].yearly_interest_rate, dec!(0.02));
        assert_eq!(points[5].loan_term_years, dec!(30));
    }

    #[test]
    fn test_validation_failures() {
        let cases = [
            ScenarioInputs {
                yearly_interest_rate_list: vec![],
                ..ScenarioInputs::default()
            },
            ScenarioInputs {
                loan_term_list: vec![],
                ..ScenarioInputs::default()
            },
            ScenarioInputs {
                loan_proportion: dec!(1.2),
                ..ScenarioInputs::default()
            },
            ScenarioInputs {
                loan_proportion: dec!(-0.1),
                ..ScenarioInputs::default()
            },
            ScenarioInputs {
                house_price: Decimal::ZERO,
                ..ScenarioInputs::default()
            },
            ScenarioInputs {
                loan_term_list: vec![dec!(30), dec!(0.01)],
                ..ScenarioInputs::default()
            },
            ScenarioInputs {
                yearly_interest_rate_list: vec![dec!(-0.01)],
                ..ScenarioInputs::default()
            },
        ];
        for inputs in cases {
            let err = inputs.validate().unwrap_err();
            assert!(matches!(err, BuyRentError::InvalidConfiguration { .. }));
        }
    }
}
