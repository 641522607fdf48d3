//! Extra-payment plan: per-period out-of-schedule principal payments.
//!
//! Rows arrive from an external table (CSV, JSON array, dashboard grid) and
//! are folded once into a lookup by period. Malformed rows are dropped with a
//! warning rather than failing the calculation: an unknown kind, a period
//! outside `1..=period_count`, a negative amount, or a non-zero amount with no
//! kind all mean "no extra payment" for that period.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Periods};

/// How the loan reacts to an extra principal payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtraPaymentKind {
    /// Keep the payment, shorten the remaining term.
    TermReduction,
    /// Keep the term (minus the elapsed period), lower the payment.
    FeeAdjustedPayment,
}

impl ExtraPaymentKind {
    /// Parse a table label. Accepts the short dashboard labels (`Term`,
    /// `Fee`) as well as the full names, case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "term" | "term_reduction" => Some(ExtraPaymentKind::TermReduction),
            "fee" | "payment" | "fee_adjusted_payment" => {
                Some(ExtraPaymentKind::FeeAdjustedPayment)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ExtraPaymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtraPaymentKind::TermReduction => write!(f, "TERM_REDUCTION"),
            ExtraPaymentKind::FeeAdjustedPayment => write!(f, "FEE_ADJUSTED_PAYMENT"),
        }
    }
}

/// A validated extra payment for one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraPayment {
    pub amount: Money,
    pub kind: ExtraPaymentKind,
}

/// One row of the extra-payment table as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtraPaymentRow {
    /// 1-based period index. When absent, the row's position is used.
    #[serde(default, alias = "Month", alias = "month", alias = "Period")]
    pub period: Option<u32>,
    #[serde(default, alias = "Amortization", alias = "Amount")]
    pub amount: Option<Money>,
    #[serde(default, alias = "Type", alias = "Kind")]
    pub kind: Option<String>,
}

impl ExtraPaymentRow {
    pub fn new(period: u32, amount: Money, kind: &str) -> Self {
        ExtraPaymentRow {
            period: Some(period),
            amount: Some(amount),
            kind: Some(kind.to_string()),
        }
    }
}

/// Extra payments indexed by period, immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraPaymentPlan {
    entries: Vec<Option<ExtraPayment>>,
}

impl ExtraPaymentPlan {
    /// A plan with no extra payments.
    pub fn empty(period_count: Periods) -> Self {
        ExtraPaymentPlan {
            entries: vec![None; period_count as usize],
        }
    }

    /// Fold table rows into a plan covering `1..=period_count`.
    ///
    /// Returns the plan and one warning per dropped or overridden row.
    pub fn from_rows(rows: &[ExtraPaymentRow], period_count: Periods) -> (Self, Vec<String>) {
        let mut plan = Self::empty(period_count);
        let mut warnings = Vec::new();

        for (position, row) in rows.iter().enumerate() {
            let period = row.period.unwrap_or(position as u32 + 1);
            let amount = row.amount.unwrap_or(Decimal::ZERO);
            let label = row
                .kind
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty() && !k.eq_ignore_ascii_case("none"));

            if amount.is_zero() {
                continue;
            }

            let reason = if period == 0 || period > period_count {
                Some(format!("period outside 1..={period_count}"))
            } else if amount < Decimal::ZERO {
                Some("negative amount".to_string())
            } else {
                None
            };
            if let Some(reason) = reason {
                warn_dropped(&mut warnings, period, amount, &reason);
                continue;
            }

            let kind = match label {
                None => {
                    warn_dropped(&mut warnings, period, amount, "missing kind");
                    continue;
                }
                Some(label) => match ExtraPaymentKind::from_label(label) {
                    Some(kind) => kind,
                    None => {
                        warn_dropped(
                            &mut warnings,
                            period,
                            amount,
                            &format!("unrecognised kind '{label}'"),
                        );
                        continue;
                    }
                },
            };

            let slot = &mut plan.entries[(period - 1) as usize];
            if slot.is_some() {
                let msg = format!("Extra payment for period {period} listed twice; the later row wins");
                tracing::warn!("{msg}");
                warnings.push(msg);
            }
            *slot = Some(ExtraPayment { amount, kind });
        }

        (plan, warnings)
    }

    /// Extra payment scheduled for `period` (1-based), if any.
    pub fn get(&self, period: Periods) -> Option<&ExtraPayment> {
        if period == 0 {
            return None;
        }
        self.entries.get((period - 1) as usize).and_then(Option::as_ref)
    }

    /// Number of periods carrying an extra payment.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of all planned extra payments.
    pub fn total_amount(&self) -> Money {
        self.entries.iter().flatten().map(|e| e.amount).sum()
    }
}

fn warn_dropped(warnings: &mut Vec<String>, period: u32, amount: Money, reason: &str) {
    let msg = format!("Ignored extra payment of {amount} in period {period}: {reason}");
    tracing::warn!("{msg}");
    warnings.push(msg);
}
