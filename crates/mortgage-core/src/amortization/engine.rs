//! Month-by-month amortization simulation.
//!
//! The running state (balance, remaining periods, current payment, cumulative
//! interest) lives in an explicit accumulator that is advanced once per
//! period. Each period may carry an extra principal payment from the plan,
//! after which either the remaining term (TERM_REDUCTION) or the payment
//! (FEE_ADJUSTED_PAYMENT) is recomputed.

use chrono::{Months, NaiveDate};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::plan::{ExtraPaymentKind, ExtraPaymentPlan};
use super::terms::LoanTerms;
use crate::error::MortgageError;
use crate::time_value;
use crate::types::{round_money, Money, Periods, Rate};
use crate::MortgageResult;

/// Balance below which the loan is considered fully repaid.
pub const BALANCE_EPSILON: Decimal = dec!(0.01);

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One simulated period. Monetary fields are rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRecord {
    pub period: Periods,
    pub payment_date: Option<NaiveDate>,
    /// Scheduled instalment in force after this period's recomputation.
    pub scheduled_payment: Money,
    pub interest: Money,
    pub regular_principal: Money,
    pub extra_principal: Money,
    pub extra_payment_kind: Option<ExtraPaymentKind>,
    pub total_principal: Money,
    /// Cash paid this period, extra payment included.
    pub total_paid: Money,
    pub remaining_balance: Money,
    pub cumulative_interest: Money,
    pub remaining_periods: Periods,
}

/// Unrounded aggregates of one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunTotals {
    pub total_interest: Money,
    pub total_principal: Money,
    pub total_extra_paid: Money,
    pub total_cash_paid: Money,
    pub initial_payment: Money,
    pub final_payment: Money,
    pub periods_elapsed: Periods,
}

/// The ordered period records of one run plus its aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub records: Vec<PeriodRecord>,
    pub totals: RunTotals,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Running state threaded through the simulation loop.
#[derive(Debug, Clone, Copy)]
struct LoanState {
    balance: Money,
    remaining_periods: Periods,
    payment: Money,
    cumulative_interest: Money,
}

/// Quantities settled in one period before rounding.
#[derive(Debug, Clone, Copy)]
struct PeriodFlows {
    interest: Money,
    regular_principal: Money,
    extra_principal: Money,
    total_principal: Money,
    cash: Money,
}

/// Cent-rounded row amounts. The interest, the total principal and the
/// regular part are rounded; the rest is derived so every row adds up.
#[derive(Debug, Clone, Copy)]
struct RoundedFlows {
    interest: Money,
    regular_principal: Money,
    extra_principal: Money,
    total_principal: Money,
    total_paid: Money,
}

impl From<&PeriodFlows> for RoundedFlows {
    fn from(flows: &PeriodFlows) -> Self {
        let interest = round_money(flows.interest);
        let total_principal = round_money(flows.total_principal);
        let regular_principal = round_money(flows.regular_principal).min(total_principal);
        RoundedFlows {
            interest,
            regular_principal,
            extra_principal: total_principal - regular_principal,
            total_principal,
            total_paid: total_principal + interest,
        }
    }
}

/// Simulates the schedule for one set of terms and one extra-payment plan.
///
/// Holds only borrowed inputs; every call to [`run`](Self::run) starts from a
/// fresh state, so an engine can be reused or discarded freely.
#[derive(Debug, Clone)]
pub struct AmortizationEngine<'a> {
    terms: &'a LoanTerms,
    plan: &'a ExtraPaymentPlan,
    first_payment_date: Option<NaiveDate>,
}

impl<'a> AmortizationEngine<'a> {
    pub fn new(terms: &'a LoanTerms, plan: &'a ExtraPaymentPlan) -> Self {
        AmortizationEngine {
            terms,
            plan,
            first_payment_date: None,
        }
    }

    /// Date the first instalment falls due; later periods follow monthly.
    pub fn with_first_payment_date(mut self, date: Option<NaiveDate>) -> Self {
        self.first_payment_date = date;
        self
    }

    /// Run the simulation to completion.
    pub fn run(&self) -> MortgageResult<Schedule> {
        let rate = self.terms.periodic_rate;
        let initial_payment = self.terms.baseline_payment();

        let mut state = LoanState {
            balance: self.terms.principal_debt,
            remaining_periods: self.terms.period_count,
            payment: initial_payment,
            cumulative_interest: Decimal::ZERO,
        };

        let mut records = Vec::with_capacity(self.terms.period_count as usize);
        let mut total_principal = Decimal::ZERO;
        let mut total_extra = Decimal::ZERO;
        let mut total_cash = Decimal::ZERO;
        let mut period: Periods = 0;

        while state.balance > BALANCE_EPSILON && state.remaining_periods > 0 {
            period += 1;
            let extra = self.plan.get(period).copied();
            let extra_amount = extra.map(|e| e.amount).unwrap_or(Decimal::ZERO);

            let flows = settle_period(&mut state, rate, extra_amount);

            if !extra_amount.is_zero() {
                match extra.map(|e| e.kind) {
                    Some(ExtraPaymentKind::TermReduction) => {
                        let rounded = rounded_period_count(rate, state.payment, state.balance)?;
                        // a balance under half an instalment still needs one period
                        state.remaining_periods = if state.balance > BALANCE_EPSILON {
                            rounded.max(1)
                        } else {
                            rounded
                        };
                        tracing::debug!(
                            period,
                            remaining_periods = state.remaining_periods,
                            "term recomputed after extra payment"
                        );
                    }
                    Some(ExtraPaymentKind::FeeAdjustedPayment) => {
                        state.remaining_periods = state.remaining_periods.saturating_sub(1);
                        if state.remaining_periods > 0 && state.balance > BALANCE_EPSILON {
                            state.payment =
                                time_value::pmt(rate, state.remaining_periods, state.balance)?;
                        }
                        tracing::debug!(
                            period,
                            payment = %state.payment,
                            "payment recomputed after extra payment"
                        );
                    }
                    None => {
                        state.remaining_periods = state.remaining_periods.saturating_sub(1);
                    }
                }
            } else {
                state.remaining_periods = state.remaining_periods.saturating_sub(1);
            }

            total_principal += flows.total_principal;
            total_extra += flows.extra_principal;
            total_cash += flows.cash;

            tracing::trace!(
                period,
                balance = %state.balance,
                remaining_periods = state.remaining_periods,
                "period settled"
            );

            let row = RoundedFlows::from(&flows);
            records.push(PeriodRecord {
                period,
                payment_date: self.payment_date(period),
                scheduled_payment: round_money(state.payment),
                interest: row.interest,
                regular_principal: row.regular_principal,
                extra_principal: row.extra_principal,
                extra_payment_kind: extra.filter(|_| !extra_amount.is_zero()).map(|e| e.kind),
                total_principal: row.total_principal,
                total_paid: row.total_paid,
                remaining_balance: round_money(state.balance),
                cumulative_interest: round_money(state.cumulative_interest),
                remaining_periods: state.remaining_periods,
            });
        }

        Ok(Schedule {
            records,
            totals: RunTotals {
                total_interest: state.cumulative_interest,
                total_principal,
                total_extra_paid: total_extra,
                total_cash_paid: total_cash,
                initial_payment,
                final_payment: state.payment,
                periods_elapsed: period,
            },
        })
    }

    fn payment_date(&self, period: Periods) -> Option<NaiveDate> {
        self.first_payment_date
            .and_then(|d| d.checked_add_months(Months::new(period - 1)))
    }
}

/// Accrue interest, apply the scheduled and extra principal, and clamp the
/// payment so the balance never goes below zero. The last scheduled period
/// settles whatever balance remains, which a rounded-down term can leave.
fn settle_period(state: &mut LoanState, rate: Rate, extra_amount: Money) -> PeriodFlows {
    let interest = state.balance * rate;
    let regular = state.payment - interest;
    let mut principal_due = regular + extra_amount;

    let overpaid = state.balance - principal_due < BALANCE_EPSILON;
    let (regular_principal, extra_principal) = if overpaid || state.remaining_periods == 1 {
        principal_due = state.balance;
        let extra_applied = extra_amount.min(principal_due - regular.min(principal_due));
        (principal_due - extra_applied, extra_applied)
    } else {
        (regular, extra_amount)
    };

    state.cumulative_interest += interest;
    state.balance = (state.balance - principal_due).max(Decimal::ZERO);

    PeriodFlows {
        interest,
        regular_principal,
        extra_principal,
        total_principal: principal_due,
        cash: principal_due + interest,
    }
}

/// Periods needed to retire `balance` at `payment`, rounded to the nearest
/// whole period.
fn rounded_period_count(rate: Rate, payment: Money, balance: Money) -> MortgageResult<Periods> {
    let n = time_value::nper(rate, payment, balance)?;
    n.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .ok_or_else(|| MortgageError::unstable(format!("period count {n} out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amortization::plan::ExtraPaymentRow;
    use crate::amortization::terms::LoanInput;
    use rust_decimal_macros::dec;

    fn small_loan() -> LoanTerms {
        // 10,000 over one year at 6%
        LoanTerms::new(&LoanInput {
            house_price: dec!(10000),
            down_payment: Decimal::ZERO,
            annual_rate_pct: dec!(6),
            term_years: 1,
            one_time_cost: Decimal::ZERO,
            tax_rate_pct: Decimal::ZERO,
            one_time_bank_fee: None,
            monthly_bank_fee: None,
        })
        .unwrap()
    }

    #[test]
    fn test_small_loan_first_and_last_rows() {
        let terms = small_loan();
        let plan = ExtraPaymentPlan::empty(terms.period_count);
        let schedule = AmortizationEngine::new(&terms, &plan).run().unwrap();

        assert_eq!(schedule.records.len(), 12);
        let first = &schedule.records[0];
        assert_eq!(first.period, 1);
        assert_eq!(first.scheduled_payment, dec!(860.66));
        assert_eq!(first.interest, dec!(50.00));
        assert_eq!(first.regular_principal, dec!(810.66));
        assert_eq!(first.remaining_balance, dec!(9189.34));
        assert_eq!(first.remaining_periods, 11);
        assert_eq!(first.extra_payment_kind, None);

        let last = schedule.records.last().unwrap();
        assert_eq!(last.period, 12);
        assert_eq!(last.remaining_balance, Decimal::ZERO);
        assert_eq!(last.remaining_periods, 0);
        assert_eq!(last.cumulative_interest, dec!(327.97));
    }

    #[test]
    fn test_settle_period_clamps_overpayment() {
        let mut state = LoanState {
            balance: dec!(500),
            remaining_periods: 10,
            payment: dec!(100),
            cumulative_interest: Decimal::ZERO,
        };
        let flows = settle_period(&mut state, dec!(0.01), dec!(1000));
        assert_eq!(flows.total_principal, dec!(500));
        assert_eq!(flows.cash, dec!(505));
        assert_eq!(flows.regular_principal, dec!(95));
        assert_eq!(flows.extra_principal, dec!(405));
        assert_eq!(state.balance, Decimal::ZERO);
        assert_eq!(state.cumulative_interest, dec!(5));
    }

    #[test]
    fn test_rounded_row_adds_up() {
        let flows = PeriodFlows {
            interest: dec!(829.165),
            regular_principal: dec!(358.405),
            extra_principal: dec!(0.0049),
            total_principal: dec!(358.4099),
            cash: dec!(1187.5749),
        };
        let row = RoundedFlows::from(&flows);
        assert_eq!(row.interest, dec!(829.17));
        assert_eq!(row.total_principal, dec!(358.41));
        assert_eq!(row.regular_principal, dec!(358.41));
        assert_eq!(row.extra_principal, Decimal::ZERO);
        assert_eq!(row.total_paid, dec!(1187.58));
        assert_eq!(row.total_paid, row.total_principal + row.interest);
    }

    #[test]
    fn test_last_scheduled_period_settles_residual() {
        let mut state = LoanState {
            balance: dec!(1000),
            remaining_periods: 1,
            payment: dec!(100),
            cumulative_interest: Decimal::ZERO,
        };
        let flows = settle_period(&mut state, dec!(0.01), Decimal::ZERO);
        assert_eq!(flows.regular_principal, dec!(1000));
        assert_eq!(flows.extra_principal, Decimal::ZERO);
        assert_eq!(flows.cash, dec!(1010));
        assert_eq!(state.balance, Decimal::ZERO);
    }

    #[test]
    fn test_lump_sum_retires_loan_early() {
        let terms = small_loan();
        let rows = vec![ExtraPaymentRow::new(3, dec!(20000), "Term")];
        let (plan, _) = ExtraPaymentPlan::from_rows(&rows, terms.period_count);
        let schedule = AmortizationEngine::new(&terms, &plan).run().unwrap();

        assert_eq!(schedule.records.len(), 3);
        let last = schedule.records.last().unwrap();
        assert_eq!(last.remaining_balance, Decimal::ZERO);
        assert_eq!(last.remaining_periods, 0);
        assert_eq!(last.total_paid, last.total_principal + last.interest);
        assert_eq!(
            last.extra_payment_kind,
            Some(ExtraPaymentKind::TermReduction)
        );
    }

    #[test]
    fn test_payment_dates_follow_monthly() {
        let terms = small_loan();
        let plan = ExtraPaymentPlan::empty(terms.period_count);
        let start = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let schedule = AmortizationEngine::new(&terms, &plan)
            .with_first_payment_date(Some(start))
            .run()
            .unwrap();
        assert_eq!(schedule.records[0].payment_date, Some(start));
        assert_eq!(
            schedule.records[1].payment_date,
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(
            schedule.records[11].payment_date,
            NaiveDate::from_ymd_opt(2024, 12, 31)
        );
    }

    #[test]
    fn test_rounded_period_count() {
        let rate = dec!(0.005);
        let payment = time_value::pmt(rate, 24, dec!(5000)).unwrap();
        assert_eq!(rounded_period_count(rate, payment, dec!(5000)).unwrap(), 24);
        assert_eq!(rounded_period_count(rate, payment, Decimal::ZERO).unwrap(), 0);
    }
}
