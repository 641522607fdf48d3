use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_core::amortization::comparison;
use mortgage_core::amortization::{self, AmortizationInput, LoanInput};

use crate::input;

/// Arguments shared by `schedule` and `compare`
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// House price
    #[arg(long, default_value = "300000")]
    pub house_price: Decimal,

    /// Down payment (cash contributed)
    #[arg(long, alias = "cash", default_value = "60000")]
    pub down_payment: Decimal,

    /// Annual interest rate in percent
    #[arg(long, alias = "rate", default_value = "3.5")]
    pub interest_rate: Decimal,

    /// Loan term in years
    #[arg(long, alias = "years", default_value_t = 30)]
    pub term_years: u32,

    /// One-time transaction cost
    #[arg(long, default_value = "0")]
    pub cost: Decimal,

    /// Property transfer tax in percent of the price
    #[arg(long, alias = "taxes", default_value = "0")]
    pub tax_rate: Decimal,

    /// One-time bank opening fee (financed)
    #[arg(long)]
    pub bank_fee: Option<Decimal>,

    /// Recurring monthly bank fee
    #[arg(long)]
    pub monthly_fee: Option<Decimal>,

    /// Due date of the first instalment (YYYY-MM-DD)
    #[arg(long)]
    pub first_payment_date: Option<NaiveDate>,

    /// Extra-payment table (CSV with period, amount and kind columns)
    #[arg(long)]
    pub plan: Option<String>,

    /// Field delimiter of the extra-payment table
    #[arg(long, default_value_t = ';')]
    pub delimiter: char,

    /// Print only the summary totals
    #[arg(long)]
    pub summary_only: bool,
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let summary_only = args.summary_only;
    let schedule_input = build_input(args)?;
    let result = amortization::amortize(&schedule_input)?;
    let mut value = serde_json::to_value(result)?;
    if summary_only {
        if let Some(Value::Object(res)) = value.get_mut("result") {
            res.remove("schedule");
            res.remove("annual");
        }
    }
    Ok(value)
}

pub fn run_compare(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let summary_only = args.summary_only;
    let compare_input = build_input(args)?;
    if compare_input.extra_payments.is_empty() {
        tracing::warn!("comparison requested without extra payments; both schedules are identical");
    }
    let result = comparison::compare_schedules(&compare_input)?;
    let mut value = serde_json::to_value(result)?;
    if summary_only {
        if let Some(Value::Object(res)) = value.get_mut("result") {
            res.remove("yearly");
        }
    }
    Ok(value)
}

/// Resolve the input document (file, stdin, or flags) and merge the plan.
fn build_input(args: ScheduleArgs) -> Result<AmortizationInput, Box<dyn std::error::Error>> {
    let mut schedule_input: AmortizationInput = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        AmortizationInput {
            loan: LoanInput {
                house_price: args.house_price,
                down_payment: args.down_payment,
                annual_rate_pct: args.interest_rate,
                term_years: args.term_years,
                one_time_cost: args.cost,
                tax_rate_pct: args.tax_rate,
                one_time_bank_fee: args.bank_fee,
                monthly_bank_fee: args.monthly_fee,
            },
            extra_payments: Vec::new(),
            first_payment_date: args.first_payment_date,
        }
    };

    if let Some(ref path) = args.plan {
        let delimiter = plan_delimiter(args.delimiter)?;
        let rows = input::plan::read_plan(path, delimiter)?;
        tracing::info!(rows = rows.len(), path = %path, "loaded extra-payment table");
        schedule_input.extra_payments.extend(rows);
    }

    Ok(schedule_input)
}

/// The csv reader splits on a single byte, so only ASCII delimiters work.
fn plan_delimiter(delimiter: char) -> Result<u8, String> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(format!("Delimiter '{delimiter}' must be a single ASCII character"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_delimiter_accepts_ascii() {
        assert_eq!(plan_delimiter(';'), Ok(b';'));
        assert_eq!(plan_delimiter('\t'), Ok(b'\t'));
    }

    #[test]
    fn test_plan_delimiter_rejects_non_ascii() {
        assert!(plan_delimiter('é').is_err());
        assert!(plan_delimiter('€').is_err());
    }
}
