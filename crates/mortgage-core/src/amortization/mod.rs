//! Fixed-rate mortgage amortization with optional extra payments.
//!
//! [`amortize`] is the JSON-friendly entry point: it derives the
//! [`LoanTerms`], folds the extra-payment rows into an [`ExtraPaymentPlan`],
//! runs the [`AmortizationEngine`] and summarises the result. The pieces are
//! public for callers that want to drive them directly.

pub mod engine;
pub mod plan;
pub mod summary;
pub mod terms;

#[cfg(feature = "comparison")]
pub mod comparison;

use std::time::Instant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{with_metadata, ComputationOutput};
use crate::MortgageResult;

#[cfg(feature = "comparison")]
pub use comparison::{compare_schedules, ComparisonOutput, YearComparison};
pub use engine::{AmortizationEngine, PeriodRecord, RunTotals, Schedule, BALANCE_EPSILON};
pub use plan::{ExtraPayment, ExtraPaymentKind, ExtraPaymentPlan, ExtraPaymentRow};
pub use summary::{annual_breakdown, summarize, AnnualSummary, SummaryTotals};
pub use terms::{LoanInput, LoanTerms, MAX_TERM_YEARS};

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

/// Everything needed for one schedule computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationInput {
    pub loan: LoanInput,
    /// Extra-payment table rows; empty means no extra payments.
    #[serde(default)]
    pub extra_payments: Vec<ExtraPaymentRow>,
    /// Due date of the first instalment, used to date each period.
    #[serde(default)]
    pub first_payment_date: Option<NaiveDate>,
}

/// Schedule, summary and yearly breakdown of one computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationOutput {
    pub summary: SummaryTotals,
    pub schedule: Vec<PeriodRecord>,
    pub annual: Vec<AnnualSummary>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute the full amortization schedule for `input`.
pub fn amortize(input: &AmortizationInput) -> MortgageResult<ComputationOutput<AmortizationOutput>> {
    let start = Instant::now();

    let terms = LoanTerms::new(&input.loan)?;
    let (plan, warnings) = ExtraPaymentPlan::from_rows(&input.extra_payments, terms.period_count);

    let schedule = AmortizationEngine::new(&terms, &plan)
        .with_first_payment_date(input.first_payment_date)
        .run()?;
    let summary = summarize(&terms, &schedule)?;
    let annual = annual_breakdown(&schedule.records);

    let output = AmortizationOutput {
        summary,
        schedule: schedule.records,
        annual,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        methodology(&plan),
        input,
        warnings,
        elapsed,
        output,
    ))
}

fn methodology(plan: &ExtraPaymentPlan) -> &'static str {
    if plan.is_empty() {
        "Fixed-rate annuity amortization"
    } else {
        "Fixed-rate annuity amortization with extra principal payments"
    }
}
