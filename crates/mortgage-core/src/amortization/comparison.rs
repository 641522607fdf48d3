//! Baseline versus extra-payment comparison.
//!
//! Runs the engine twice over the same terms: once with no extra payments and
//! once with the supplied plan, then reports what the extra payments saved
//! and a year-by-year view of both schedules.

use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::engine::{AmortizationEngine, Schedule};
use super::plan::ExtraPaymentPlan;
use super::summary::{annual_breakdown, summarize, AnnualSummary, SummaryTotals};
use super::terms::LoanTerms;
use super::AmortizationInput;
use crate::types::{round_money, with_metadata, ComputationOutput, Money, Periods};
use crate::MortgageResult;

/// One loan year of both schedules side by side. Years past the end of the
/// shorter schedule carry zeros for that side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearComparison {
    pub year: u32,
    pub baseline_interest: Money,
    pub baseline_principal: Money,
    pub baseline_balance: Money,
    pub enhanced_interest: Money,
    pub enhanced_principal: Money,
    pub enhanced_extra: Money,
    pub enhanced_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonOutput {
    pub baseline: SummaryTotals,
    pub enhanced: SummaryTotals,
    pub interest_saved: Money,
    pub periods_saved: Periods,
    /// Baseline instalment less the instalment in force at the end of the
    /// enhanced schedule.
    pub payment_reduction: Money,
    pub yearly: Vec<YearComparison>,
}

/// Compare the schedule without extra payments against the one with them.
pub fn compare_schedules(
    input: &AmortizationInput,
) -> MortgageResult<ComputationOutput<ComparisonOutput>> {
    let start = Instant::now();

    let terms = LoanTerms::new(&input.loan)?;
    let (plan, warnings) = ExtraPaymentPlan::from_rows(&input.extra_payments, terms.period_count);
    let empty = ExtraPaymentPlan::empty(terms.period_count);

    let baseline = run(&terms, &empty, input)?;
    let enhanced = run(&terms, &plan, input)?;

    let baseline_summary = summarize(&terms, &baseline)?;
    let enhanced_summary = summarize(&terms, &enhanced)?;

    let yearly = side_by_side(
        &annual_breakdown(&baseline.records),
        &annual_breakdown(&enhanced.records),
    );

    let output = ComparisonOutput {
        interest_saved: round_money(baseline.totals.total_interest - enhanced.totals.total_interest),
        periods_saved: baseline
            .totals
            .periods_elapsed
            .saturating_sub(enhanced.totals.periods_elapsed),
        payment_reduction: round_money(
            baseline.totals.final_payment - enhanced.totals.final_payment,
        ),
        baseline: baseline_summary,
        enhanced: enhanced_summary,
        yearly,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Baseline vs extra-payment amortization comparison",
        input,
        warnings,
        elapsed,
        output,
    ))
}

fn run(
    terms: &LoanTerms,
    plan: &ExtraPaymentPlan,
    input: &AmortizationInput,
) -> MortgageResult<Schedule> {
    AmortizationEngine::new(terms, plan)
        .with_first_payment_date(input.first_payment_date)
        .run()
}

fn side_by_side(baseline: &[AnnualSummary], enhanced: &[AnnualSummary]) -> Vec<YearComparison> {
    let years = baseline.len().max(enhanced.len());
    (0..years)
        .map(|i| {
            let b = baseline.get(i);
            let e = enhanced.get(i);
            let pick = |s: Option<&AnnualSummary>, f: fn(&AnnualSummary) -> Money| {
                s.map(f).unwrap_or(Decimal::ZERO)
            };
            YearComparison {
                year: i as u32 + 1,
                baseline_interest: pick(b, |s| s.interest),
                baseline_principal: pick(b, |s| s.regular_principal + s.extra_principal),
                baseline_balance: pick(b, |s| s.closing_balance),
                enhanced_interest: pick(e, |s| s.interest),
                enhanced_principal: pick(e, |s| s.regular_principal + s.extra_principal),
                enhanced_extra: pick(e, |s| s.extra_principal),
                enhanced_balance: pick(e, |s| s.closing_balance),
            }
        })
        .collect()
}
