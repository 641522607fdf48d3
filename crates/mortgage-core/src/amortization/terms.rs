//! Loan terms: raw purchase inputs and the quantities derived from them.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::MortgageError;
use crate::time_value;
use crate::types::{Money, Periods, Rate};
use crate::MortgageResult;

/// Longest accepted loan term; bounds the schedule at 1,200 periods.
pub const MAX_TERM_YEARS: u32 = 100;

/// Raw loan inputs as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanInput {
    /// Purchase price of the property.
    pub house_price: Money,
    /// Cash contributed up front.
    pub down_payment: Money,
    /// Nominal annual interest rate in percent (4 = 4%).
    pub annual_rate_pct: Rate,
    /// Loan term in whole years.
    pub term_years: u32,
    /// One-time transaction cost (notary, registry, agency).
    #[serde(default)]
    pub one_time_cost: Money,
    /// Property transfer tax in percent of the price.
    #[serde(default)]
    pub tax_rate_pct: Rate,
    /// Bank opening fee, financed with the loan.
    #[serde(default)]
    pub one_time_bank_fee: Option<Money>,
    /// Recurring monthly bank fee, paid alongside each instalment.
    #[serde(default)]
    pub monthly_bank_fee: Option<Money>,
}

/// Immutable loan terms derived from a [`LoanInput`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub house_price: Money,
    pub down_payment: Money,
    pub one_time_cost: Money,
    pub one_time_bank_fee: Money,
    pub monthly_bank_fee: Money,
    /// Annual rate as a fraction.
    pub annual_rate: Rate,
    /// Monthly rate as a fraction.
    pub periodic_rate: Rate,
    pub period_count: Periods,
    /// Transfer tax amount.
    pub tax_amount: Money,
    /// Tax plus one-time cost plus the bank opening fee.
    pub tax_and_fee_cost: Money,
    /// Total amount financed.
    pub principal_debt: Money,
    baseline_payment: Money,
}

impl LoanTerms {
    /// Validate `input` and derive the loan terms.
    pub fn new(input: &LoanInput) -> MortgageResult<Self> {
        validate_input(input)?;

        let annual_rate = input.annual_rate_pct / dec!(100);
        let periodic_rate = annual_rate / dec!(12);
        let period_count = input.term_years * 12;

        let one_time_bank_fee = input.one_time_bank_fee.unwrap_or(Decimal::ZERO);
        let monthly_bank_fee = input.monthly_bank_fee.unwrap_or(Decimal::ZERO);

        let tax_amount = input.tax_rate_pct / dec!(100) * input.house_price;
        let tax_and_fee_cost = tax_amount + input.one_time_cost + one_time_bank_fee;
        let principal_debt = tax_and_fee_cost + input.house_price - input.down_payment;

        let baseline_payment = time_value::pmt(periodic_rate, period_count, principal_debt)?;

        tracing::debug!(
            principal_debt = %principal_debt,
            periodic_rate = %periodic_rate,
            period_count,
            baseline_payment = %baseline_payment,
            "derived loan terms"
        );

        Ok(LoanTerms {
            house_price: input.house_price,
            down_payment: input.down_payment,
            one_time_cost: input.one_time_cost,
            one_time_bank_fee,
            monthly_bank_fee,
            annual_rate,
            periodic_rate,
            period_count,
            tax_amount,
            tax_and_fee_cost,
            principal_debt,
            baseline_payment,
        })
    }

    /// Level monthly payment that retires the principal over the full term.
    pub fn baseline_payment(&self) -> Money {
        self.baseline_payment
    }

    /// Whether any bank fee stream exists, which makes an APR meaningful.
    pub fn has_fees(&self) -> bool {
        self.one_time_bank_fee > Decimal::ZERO || self.monthly_bank_fee > Decimal::ZERO
    }
}

fn validate_input(input: &LoanInput) -> MortgageResult<()> {
    let non_negative = [
        ("house_price", input.house_price),
        ("down_payment", input.down_payment),
        ("annual_rate_pct", input.annual_rate_pct),
        ("one_time_cost", input.one_time_cost),
        ("tax_rate_pct", input.tax_rate_pct),
        (
            "one_time_bank_fee",
            input.one_time_bank_fee.unwrap_or(Decimal::ZERO),
        ),
        (
            "monthly_bank_fee",
            input.monthly_bank_fee.unwrap_or(Decimal::ZERO),
        ),
    ];
    for (field, value) in non_negative {
        if value < Decimal::ZERO {
            return Err(MortgageError::invalid(field, "Must be non-negative"));
        }
    }

    if input.down_payment > input.house_price {
        return Err(MortgageError::invalid(
            "down_payment",
            "Down payment cannot be greater than house price",
        ));
    }
    if input.term_years == 0 {
        return Err(MortgageError::invalid(
            "term_years",
            "Loan term must be at least one year",
        ));
    }
    if input.term_years > MAX_TERM_YEARS {
        return Err(MortgageError::invalid(
            "term_years",
            format!("Loan term cannot exceed {MAX_TERM_YEARS} years"),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_input() -> LoanInput {
        LoanInput {
            house_price: dec!(300000),
            down_payment: dec!(60000),
            annual_rate_pct: dec!(4),
            term_years: 30,
            one_time_cost: dec!(5000),
            tax_rate_pct: dec!(1.25),
            one_time_bank_fee: None,
            monthly_bank_fee: None,
        }
    }

    #[test]
    fn test_derived_quantities() {
        let terms = LoanTerms::new(&sample_input()).unwrap();
        assert_eq!(terms.tax_amount, dec!(3750));
        assert_eq!(terms.tax_and_fee_cost, dec!(8750));
        assert_eq!(terms.principal_debt, dec!(248750));
        assert_eq!(terms.period_count, 360);
        assert_eq!(terms.annual_rate, dec!(0.04));
        assert!((terms.periodic_rate - dec!(0.003333)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_baseline_payment() {
        let terms = LoanTerms::new(&sample_input()).unwrap();
        let payment = terms.baseline_payment();
        assert!((payment - dec!(1187.57)).abs() < dec!(0.02), "got {payment}");
    }

    #[test]
    fn test_bank_fee_is_financed() {
        let mut input = sample_input();
        input.one_time_bank_fee = Some(dec!(1250));
        let terms = LoanTerms::new(&input).unwrap();
        assert_eq!(terms.tax_and_fee_cost, dec!(10000));
        assert_eq!(terms.principal_debt, dec!(250000));
        assert!(terms.has_fees());
    }

    #[test]
    fn test_zero_rate_payment_is_straight_line() {
        let mut input = sample_input();
        input.annual_rate_pct = Decimal::ZERO;
        let terms = LoanTerms::new(&input).unwrap();
        assert_eq!(terms.periodic_rate, Decimal::ZERO);
        assert_eq!(terms.baseline_payment(), dec!(248750) / dec!(360));
        assert!(!terms.has_fees());
    }

    #[test]
    fn test_down_payment_exceeds_price() {
        let mut input = sample_input();
        input.down_payment = dec!(300001);
        let err = LoanTerms::new(&input).unwrap_err();
        match err {
            MortgageError::InvalidInput { field, .. } => assert_eq!(field, "down_payment"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_down_payment_equal_to_price_is_allowed() {
        let mut input = sample_input();
        input.down_payment = dec!(300000);
        let terms = LoanTerms::new(&input).unwrap();
        assert_eq!(terms.principal_debt, dec!(8750));
    }

    #[test]
    fn test_negative_rate_rejected() {
        let mut input = sample_input();
        input.annual_rate_pct = dec!(-1);
        assert!(matches!(
            LoanTerms::new(&input),
            Err(MortgageError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_zero_term_rejected() {
        let mut input = sample_input();
        input.term_years = 0;
        assert!(matches!(
            LoanTerms::new(&input),
            Err(MortgageError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_term_cap() {
        let mut input = sample_input();
        input.annual_rate_pct = Decimal::ZERO;
        input.term_years = MAX_TERM_YEARS;
        assert_eq!(LoanTerms::new(&input).unwrap().period_count, 1200);

        input.term_years = 300_000_000;
        match LoanTerms::new(&input).unwrap_err() {
            MortgageError::InvalidInput { field, .. } => assert_eq!(field, "term_years"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }
}
