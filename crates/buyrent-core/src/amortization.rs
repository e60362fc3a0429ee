use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::compounding::{compound, in_range, months_in_term, MONTHS_PER_YEAR};
use crate::error::BuyRentError;
use crate::types::*;
use crate::BuyRentResult;

/// Decimal places kept on every scheduled payment. Keeps the schedule sum
/// exact in 96-bit Decimal arithmetic.
pub const SCHEDULE_DP: u32 = 10;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Principal, periodic rate and number of periods of a loan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    pub periodic_rate: Rate,
    pub period_count: u32,
}

impl LoanTerms {
    pub fn new(principal: Money, periodic_rate: Rate, period_count: u32) -> BuyRentResult<Self> {
        let terms = LoanTerms {
            principal,
            periodic_rate,
            period_count,
        };
        terms.validate()?;
        Ok(terms)
    }

    /// Monthly loan terms from a yearly rate and a term in years.
    pub fn monthly(principal: Money, yearly_rate: Rate, term_years: Years) -> BuyRentResult<Self> {
        let period_count = months_in_term(term_years)?;
        Self::new(
            principal,
            yearly_rate / Decimal::from(MONTHS_PER_YEAR),
            period_count,
        )
    }

    fn validate(&self) -> BuyRentResult<()> {
        if self.principal < Decimal::ZERO {
            return Err(BuyRentError::InvalidConfiguration {
                field: "principal".into(),
                reason: "Principal must be non-negative".into(),
            });
        }
        if self.periodic_rate < Decimal::ZERO {
            return Err(BuyRentError::InvalidConfiguration {
                field: "periodic_rate".into(),
                reason: "Interest rate must be non-negative".into(),
            });
        }
        if self.period_count == 0 {
            return Err(BuyRentError::InvalidConfiguration {
                field: "period_count".into(),
                reason: "Number of periods must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Total principal + interest over the life of the loan and the payment due
/// each period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationResult {
    /// Principal plus interest paid over all periods.
    pub total_interest: Money,
    pub payment_schedule: Vec<Money>,
}

impl AmortizationResult {
    pub fn average_payment(&self) -> Money {
        if self.payment_schedule.is_empty() {
            return Decimal::ZERO;
        }
        self.total_interest / Decimal::from(self.payment_schedule.len() as u64)
    }
}

/// One period of a fully broken-down amortization table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulePeriod {
    pub period: u32,
    pub opening_balance: Money,
    pub payment: Money,
    pub interest: Money,
    pub principal_repaid: Money,
    pub closing_balance: Money,
}

/// Amortization table with totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub method: PaymentMethod,
    pub principal: Money,
    pub periodic_rate: Rate,
    pub period_count: u32,
    pub total_payment: Money,
    pub interest_paid: Money,
    pub average_payment: Money,
    pub first_payment: Money,
    pub last_payment: Money,
    pub periods: Vec<SchedulePeriod>,
}

/// Input for building an amortization table from yearly loan terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationInput {
    pub principal: Money,
    pub yearly_interest_rate: Rate,
    pub loan_term_years: Years,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

// ---------------------------------------------------------------------------
// Closed forms
// ---------------------------------------------------------------------------

/// Equal total payment: (i·A·N) / (1 − (1+i)^(−N)). Zero rate repays the
/// principal with no interest.
fn equal_total_closed_form(terms: &LoanTerms) -> BuyRentResult<Money> {
    let a = terms.principal;
    let i = terms.periodic_rate;
    let n = Decimal::from(terms.period_count);

    if i.is_zero() {
        return Ok(a);
    }

    let growth = compound(i, terms.period_count, "equal total payment")?;
    let denominator = Decimal::ONE - Decimal::ONE / growth;
    if denominator.is_zero() {
        return Err(BuyRentError::NumericOverflow {
            context: format!("equal total payment annuity factor at rate {i}"),
        });
    }
    in_range(
        i.checked_mul(a)
            .and_then(|x| x.checked_mul(n))
            .and_then(|x| x.checked_div(denominator)),
        &format!("equal total payment on principal {a} at rate {i}"),
    )
}

/// Equal principal payment: A·(1 + i·(N+1)/2).
fn equal_principal_closed_form(terms: &LoanTerms) -> BuyRentResult<Money> {
    let n = Decimal::from(terms.period_count);
    let factor = terms
        .periodic_rate
        .checked_mul(n + Decimal::ONE)
        .map(|x| Decimal::ONE + x / dec!(2));
    in_range(
        factor.and_then(|f| terms.principal.checked_mul(f)),
        &format!(
            "equal principal payment on principal {} at rate {}",
            terms.principal, terms.periodic_rate
        ),
    )
}

/// Closed-form principal + interest for a convention, unrounded.
pub fn closed_form_total(method: PaymentMethod, terms: &LoanTerms) -> BuyRentResult<Money> {
    match method {
        PaymentMethod::EqualTotalPayment => equal_total_closed_form(terms),
        PaymentMethod::EqualPrincipalPayment => equal_principal_closed_form(terms),
    }
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

/// Total principal + interest and per-period payments of a loan.
///
/// Every payment but the last is rounded to `SCHEDULE_DP` places; the last
/// one absorbs the rounding so the schedule sums exactly to `total_interest`.
pub fn amortize(
    method: PaymentMethod,
    principal: Money,
    periodic_rate: Rate,
    period_count: u32,
) -> BuyRentResult<AmortizationResult> {
    let terms = LoanTerms::new(principal, periodic_rate, period_count)?;
    amortize_terms(method, &terms)
}

/// As [`amortize`], for already validated terms.
pub fn amortize_terms(method: PaymentMethod, terms: &LoanTerms) -> BuyRentResult<AmortizationResult> {
    let total = closed_form_total(method, terms)?.round_dp(SCHEDULE_DP);
    let n = terms.period_count;
    let n_dec = Decimal::from(n);

    let mut payment_schedule = Vec::with_capacity(n as usize);
    let mut scheduled = Decimal::ZERO;

    for k in 0..n - 1 {
        let payment = match method {
            PaymentMethod::EqualTotalPayment => total / n_dec,
            PaymentMethod::EqualPrincipalPayment => {
                let a = terms.principal;
                let k_dec = Decimal::from(k);
                a / n_dec + a * (Decimal::ONE - k_dec / n_dec) * terms.periodic_rate
            }
        }
        .round_dp(SCHEDULE_DP);
        scheduled += payment;
        payment_schedule.push(payment);
    }
    payment_schedule.push(total - scheduled);

    Ok(AmortizationResult {
        total_interest: total,
        payment_schedule,
    })
}

/// Full amortization table: interest and principal split of each payment
/// and the running balance.
pub fn build_schedule(
    input: &AmortizationInput,
) -> BuyRentResult<ComputationOutput<AmortizationSchedule>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let terms = LoanTerms::monthly(input.principal, input.yearly_interest_rate, input.loan_term_years)?;
    if Decimal::from(terms.period_count) != input.loan_term_years * Decimal::from(MONTHS_PER_YEAR) {
        warnings.push(format!(
            "Loan term {} years truncated to {} whole months",
            input.loan_term_years, terms.period_count
        ));
    }

    let amortized = amortize_terms(input.payment_method, &terms)?;

    let mut periods = Vec::with_capacity(terms.period_count as usize);
    let mut balance = terms.principal;
    for (idx, payment) in amortized.payment_schedule.iter().enumerate() {
        let opening = balance;
        let interest = (opening * terms.periodic_rate).round_dp(SCHEDULE_DP);
        let principal_repaid = *payment - interest;
        balance = opening - principal_repaid;
        periods.push(SchedulePeriod {
            period: idx as u32 + 1,
            opening_balance: opening,
            payment: *payment,
            interest,
            principal_repaid,
            closing_balance: balance,
        });
    }

    if balance.abs() > dec!(0.01) {
        warnings.push(format!("Residual balance {} after final payment", balance.round_dp(6)));
    }

    let output = AmortizationSchedule {
        method: input.payment_method,
        principal: terms.principal,
        periodic_rate: terms.periodic_rate,
        period_count: terms.period_count,
        total_payment: amortized.total_interest,
        interest_paid: amortized.total_interest - terms.principal,
        average_payment: amortized.average_payment(),
        first_payment: amortized.payment_schedule.first().copied().unwrap_or_default(),
        last_payment: amortized.payment_schedule.last().copied().unwrap_or_default(),
        periods,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monthly amortization (equal total / equal principal payment)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tolerance() -> Decimal {
        dec!(0.000001)
    }

    #[test]
    fn test_equal_total_matches_closed_form() {
        let i = dec!(0.016) / dec!(12);
        let result = amortize(PaymentMethod::EqualTotalPayment, dec!(7_000_000), i, 360).unwrap();
        // (i·A·N) / (1 − (1+i)^(−N)) ≈ 8,818,463.8500747
        assert!((result.total_interest - dec!(8818463.8500747)).abs() < dec!(0.001));
        assert_eq!(result.payment_schedule.len(), 360);
    }

    #[test]
    fn test_equal_total_schedule_sums_exactly() {
        let result =
            amortize(PaymentMethod::EqualTotalPayment, dec!(7_000_000), dec!(0.0015), 300).unwrap();
        let sum: Decimal = result.payment_schedule.iter().sum();
        assert_eq!(sum, result.total_interest);
    }

    #[test]
    fn test_equal_total_constant_payments() {
        let result =
            amortize(PaymentMethod::EqualTotalPayment, dec!(1_000_000), dec!(0.004), 120).unwrap();
        let first = result.payment_schedule[0];
        for p in &result.payment_schedule {
            assert!((*p - first).abs() < tolerance());
        }
    }

    #[test]
    fn test_equal_total_zero_rate_repays_principal() {
        let result =
            amortize(PaymentMethod::EqualTotalPayment, dec!(7_000_000), Decimal::ZERO, 360).unwrap();
        assert_eq!(result.total_interest, dec!(7_000_000));
        let sum: Decimal = result.payment_schedule.iter().sum();
        assert_eq!(sum, dec!(7_000_000));
    }

    #[test]
    fn test_equal_principal_closed_form() {
        let i = dec!(0.016) / dec!(12);
        let result =
            amortize(PaymentMethod::EqualPrincipalPayment, dec!(7_000_000), i, 360).unwrap();
        // A·(1 + i·(N+1)/2) = 7,000,000 · (1 + 0.0013333·180.5) ≈ 8,684,666.67
        assert!((result.total_interest - dec!(8684666.6666666667)).abs() < tolerance());
        let sum: Decimal = result.payment_schedule.iter().sum();
        assert_eq!(sum, result.total_interest);
    }

    #[test]
    fn test_oversized_principal_reports_overflow() {
        let principal = dec!(50_000_000_000_000_000_000_000_000_000);
        for method in [PaymentMethod::EqualTotalPayment, PaymentMethod::EqualPrincipalPayment] {
            let err = amortize(method, principal, dec!(0.01), 480).unwrap_err();
            assert_eq!(err.kind(), "numeric_overflow", "{method}: {err}");
        }
    }

    #[test]
    fn test_equal_principal_is_declining() {
        let result =
            amortize(PaymentMethod::EqualPrincipalPayment, dec!(7_000_000), dec!(0.0015), 240)
                .unwrap();
        for pair in result.payment_schedule.windows(2) {
            assert!(pair[1] < pair[0], "payments must strictly decline: {:?}", pair);
        }
        // First payment: A/N + A·i
        assert_eq!(result.payment_schedule[0], dec!(29166.6666666667) + dec!(10500));
    }

    #[test]
    fn test_equal_principal_zero_rate_is_constant() {
        let result =
            amortize(PaymentMethod::EqualPrincipalPayment, dec!(7_200_000), Decimal::ZERO, 360)
                .unwrap();
        assert!(result.payment_schedule.iter().all(|p| *p == dec!(20000)));
        assert_eq!(result.total_interest, dec!(7_200_000));
    }

    #[test]
    fn test_conventions_differ() {
        let i = dec!(0.002);
        let etp = amortize(PaymentMethod::EqualTotalPayment, dec!(500_000), i, 180).unwrap();
        let epp = amortize(PaymentMethod::EqualPrincipalPayment, dec!(500_000), i, 180).unwrap();
        // Front-loaded principal repayment always costs less interest
        assert!(epp.total_interest < etp.total_interest);
    }

    #[test]
    fn test_single_period() {
        let result = amortize(PaymentMethod::EqualTotalPayment, dec!(1000), dec!(0.01), 1).unwrap();
        assert_eq!(result.total_interest, dec!(1010));
        assert_eq!(result.payment_schedule, vec![dec!(1010)]);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(amortize(PaymentMethod::EqualTotalPayment, dec!(1000), dec!(0.01), 0).is_err());
        assert!(amortize(PaymentMethod::EqualTotalPayment, dec!(-1), dec!(0.01), 12).is_err());
        assert!(amortize(PaymentMethod::EqualTotalPayment, dec!(1000), dec!(-0.01), 12).is_err());
    }

    #[test]
    fn test_build_schedule_pays_down_balance() {
        let input = AmortizationInput {
            principal: dec!(1_000_000),
            yearly_interest_rate: dec!(0.024),
            loan_term_years: dec!(10),
            payment_method: PaymentMethod::EqualTotalPayment,
        };
        let out = build_schedule(&input).unwrap();
        let sched = &out.result;
        assert_eq!(sched.periods.len(), 120);
        assert_eq!(sched.periods[0].opening_balance, dec!(1_000_000));
        assert_eq!(sched.periods[0].interest, dec!(2000));
        assert!(sched.periods[119].closing_balance.abs() < dec!(0.01));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_build_schedule_warns_on_truncated_term() {
        let input = AmortizationInput {
            principal: dec!(100_000),
            yearly_interest_rate: dec!(0.03),
            loan_term_years: dec!(2.55),
            payment_method: PaymentMethod::EqualPrincipalPayment,
        };
        let out = build_schedule(&input).unwrap();
        assert_eq!(out.result.period_count, 30);
        assert_eq!(out.warnings.len(), 1);
        assert!(out.result.periods.last().unwrap().closing_balance.abs() < dec!(0.01));
    }
}
