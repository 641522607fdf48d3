//! Post-processing of a finished schedule: summary totals, APR, and the
//! per-year breakdown.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::engine::{PeriodRecord, Schedule};
use super::terms::LoanTerms;
use crate::time_value;
use crate::types::{round_money, Money, Periods, Rate};
use crate::MortgageResult;

/// Upper bound of the monthly-rate bracket searched by the APR solve.
const APR_MONTHLY_RATE_CEILING: Rate = dec!(1);

/// Aggregates shown next to a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryTotals {
    pub principal_debt: Money,
    pub tax_amount: Money,
    pub tax_and_fee_cost: Money,
    /// Price plus taxes and fees.
    pub total_property_cost: Money,
    /// Price plus taxes plus one-time cost, less the down payment.
    pub total_mortgage: Money,
    /// Principal debt plus down payment.
    pub total_paid: Money,
    /// Mortgage as a percentage of the total property cost.
    pub financing_percentage: Decimal,
    pub total_interest_paid: Money,
    pub total_extra_paid: Money,
    pub total_fees_paid: Money,
    /// Down payment plus mortgage plus interest.
    pub total_cost_with_mortgage: Money,
    pub initial_payment: Money,
    pub final_payment: Money,
    pub periods_elapsed: Periods,
    /// Nominal annual rate including bank fees; only when fees exist.
    pub apr: Option<Rate>,
}

/// One loan year of the schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualSummary {
    pub year: u32,
    pub periods: u32,
    /// Instalment in force at the end of the year.
    pub scheduled_payment: Money,
    pub interest: Money,
    pub regular_principal: Money,
    pub extra_principal: Money,
    pub total_paid: Money,
    pub closing_balance: Money,
}

/// Derive the summary totals from the terms and a finished schedule.
pub fn summarize(terms: &LoanTerms, schedule: &Schedule) -> MortgageResult<SummaryTotals> {
    let totals = &schedule.totals;

    let total_property_cost = terms.house_price + terms.tax_and_fee_cost;
    let total_mortgage =
        terms.house_price + terms.tax_amount + terms.one_time_cost - terms.down_payment;
    let financing_percentage = if total_property_cost.is_zero() {
        Decimal::ZERO
    } else {
        (total_mortgage / total_property_cost * dec!(100)).round_dp(2)
    };

    let total_fees_paid =
        terms.one_time_bank_fee + terms.monthly_bank_fee * Decimal::from(totals.periods_elapsed);

    let apr = annual_percentage_rate(terms, &schedule.records)?;

    Ok(SummaryTotals {
        principal_debt: round_money(terms.principal_debt),
        tax_amount: round_money(terms.tax_amount),
        tax_and_fee_cost: round_money(terms.tax_and_fee_cost),
        total_property_cost: round_money(total_property_cost),
        total_mortgage: round_money(total_mortgage),
        total_paid: round_money(terms.principal_debt + terms.down_payment),
        financing_percentage,
        total_interest_paid: round_money(totals.total_interest),
        total_extra_paid: round_money(totals.total_extra_paid),
        total_fees_paid: round_money(total_fees_paid),
        total_cost_with_mortgage: round_money(
            terms.down_payment + total_mortgage + totals.total_interest,
        ),
        initial_payment: round_money(totals.initial_payment),
        final_payment: round_money(totals.final_payment),
        periods_elapsed: totals.periods_elapsed,
        apr,
    })
}

/// Annual percentage rate when a bank fee stream exists.
///
/// Solves for the monthly rate at which the present value of the actual
/// cash paid each period plus the recurring fee equals the amount actually
/// disbursed (principal debt less the financed opening fee), then annualises
/// it nominally (`12 * r`). Returns `None` when the loan carries no fees.
pub fn annual_percentage_rate(
    terms: &LoanTerms,
    records: &[PeriodRecord],
) -> MortgageResult<Option<Rate>> {
    if !terms.has_fees() || records.is_empty() {
        return Ok(None);
    }

    let disbursed = terms.principal_debt - terms.one_time_bank_fee;
    if disbursed <= Decimal::ZERO {
        return Ok(None);
    }

    let flows: Vec<Money> = records
        .iter()
        .map(|r| r.total_paid + terms.monthly_bank_fee)
        .collect();

    let monthly = time_value::solve_rate(
        &flows,
        disbursed,
        Decimal::ZERO,
        APR_MONTHLY_RATE_CEILING,
    )?;

    let apr = (monthly * dec!(12)).round_dp(6);
    tracing::debug!(apr = %apr, "solved annual percentage rate");
    Ok(Some(apr))
}

/// Group period records into loan years of twelve periods.
pub fn annual_breakdown(records: &[PeriodRecord]) -> Vec<AnnualSummary> {
    records
        .chunks(12)
        .enumerate()
        .filter_map(|(i, year)| {
            let last = year.last()?;
            Some(AnnualSummary {
                year: i as u32 + 1,
                periods: year.len() as u32,
                scheduled_payment: last.scheduled_payment,
                interest: year.iter().map(|r| r.interest).sum(),
                regular_principal: year.iter().map(|r| r.regular_principal).sum(),
                extra_principal: year.iter().map(|r| r.extra_principal).sum(),
                total_paid: year.iter().map(|r| r.total_paid).sum(),
                closing_balance: last.remaining_balance,
            })
        })
        .collect()
}
