use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

use crate::error::MortgageError;
use crate::types::{Money, Periods, Rate};
use crate::MortgageResult;

/// Absolute tolerance on the present-value residual of a rate solve.
pub const RATE_SOLVE_TOLERANCE: Decimal = dec!(0.000001);

/// Bracket half-width below which a rate solve is considered converged.
const RATE_BRACKET_TOLERANCE: Decimal = dec!(0.000000000001);

/// Iteration cap for the bisection rate solve.
pub const MAX_RATE_ITERATIONS: u32 = 100;

/// `(1 + rate)^nper`, or `NumericInstability` when it leaves Decimal range.
fn growth_factor(rate: Rate, nper: Periods, context: &str) -> MortgageResult<Decimal> {
    (Decimal::ONE + rate)
        .checked_powi(i64::from(nper))
        .ok_or_else(|| MortgageError::unstable(format!("{context}: (1 + rate)^{nper} overflows")))
}

/// Level payment that retires `principal` over `nper` periods at `rate`.
///
/// Uses the closed form `rate * P / (1 - (1 + rate)^-n)`, rewritten as
/// `P * rate * f / (f - 1)` with `f = (1 + rate)^n`; degenerates to `P / n`
/// for a zero rate. Payments are returned as positive amounts.
pub fn pmt(rate: Rate, nper: Periods, principal: Money) -> MortgageResult<Money> {
    if nper == 0 {
        return Err(MortgageError::invalid(
            "nper",
            "Number of periods must be > 0",
        ));
    }

    if rate.is_zero() {
        return Ok(principal / Decimal::from(nper));
    }

    let factor = growth_factor(rate, nper, "payment")?;
    let denominator = factor - Decimal::ONE;
    if denominator <= Decimal::ZERO {
        return Err(MortgageError::unstable("payment annuity denominator"));
    }

    principal
        .checked_mul(rate)
        .and_then(|v| v.checked_mul(factor))
        .and_then(|v| v.checked_div(denominator))
        .ok_or_else(|| MortgageError::unstable("payment formula"))
}

/// Number of periods (fractional) needed to retire `balance` with a level
/// `payment` at `rate`: `-ln(1 - rate * B / P) / ln(1 + rate)`.
pub fn nper(rate: Rate, payment: Money, balance: Money) -> MortgageResult<Decimal> {
    if balance <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    if payment <= Decimal::ZERO {
        return Err(MortgageError::unstable(
            "period count: payment must be positive",
        ));
    }

    if rate.is_zero() {
        return Ok(balance / payment);
    }

    let ratio = Decimal::ONE - rate * balance / payment;
    if ratio <= Decimal::ZERO {
        return Err(MortgageError::unstable(
            "period count: payment does not cover interest",
        ));
    }

    let numerator = ratio
        .checked_ln()
        .ok_or_else(|| MortgageError::unstable("period count logarithm"))?;
    let denominator = (Decimal::ONE + rate)
        .checked_ln()
        .ok_or_else(|| MortgageError::unstable("period count logarithm"))?;
    if denominator.is_zero() {
        return Err(MortgageError::unstable("period count denominator"));
    }

    Ok(-numerator / denominator)
}

/// Present value of end-of-period flows `flows[0..]` discounted at `rate`.
///
/// Flows whose discount factor overflows contribute nothing.
pub fn present_value(rate: Rate, flows: &[Money]) -> Money {
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;
    let mut pv = Decimal::ZERO;

    for flow in flows {
        discount = match discount.checked_mul(one_plus_r) {
            Some(d) => d,
            None => break,
        };
        if let Some(term) = flow.checked_div(discount) {
            pv += term;
        }
    }

    pv
}

/// Periodic rate at which `present_value(rate, flows) == target`.
///
/// Bisection over `[lower, upper]`; the present value must be decreasing in
/// the rate across the bracket (all flows positive). Converges when the
/// residual is below [`RATE_SOLVE_TOLERANCE`] or the bracket collapses.
pub fn solve_rate(
    flows: &[Money],
    target: Money,
    lower: Rate,
    upper: Rate,
) -> MortgageResult<Rate> {
    if flows.is_empty() {
        return Err(MortgageError::invalid(
            "flows",
            "Rate solve requires at least one cash flow",
        ));
    }

    let mut lo = lower;
    let mut hi = upper;
    let residual_lo = present_value(lo, flows) - target;
    let residual_hi = present_value(hi, flows) - target;

    if residual_lo.abs() < RATE_SOLVE_TOLERANCE {
        return Ok(lo);
    }
    if residual_lo.is_sign_negative() == residual_hi.is_sign_negative() {
        return Err(MortgageError::ConvergenceFailure {
            function: "rate bisection".into(),
            iterations: 0,
            last_delta: residual_lo,
        });
    }

    let mut residual = residual_lo;
    for i in 0..MAX_RATE_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        residual = present_value(mid, flows) - target;

        if residual.abs() < RATE_SOLVE_TOLERANCE || (hi - lo) / dec!(2) < RATE_BRACKET_TOLERANCE {
            tracing::trace!(iterations = i + 1, rate = %mid, "rate bisection converged");
            return Ok(mid);
        }

        if residual.is_sign_negative() == residual_lo.is_sign_negative() {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Err(MortgageError::ConvergenceFailure {
        function: "rate bisection".into(),
        iterations: MAX_RATE_ITERATIONS,
        last_delta: residual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pmt_standard_mortgage() {
        let rate = dec!(0.04) / dec!(12);
        let result = pmt(rate, 360, dec!(248750)).unwrap();
        // 248,750 over 30 years at 4% ≈ 1,187.57 per month
        assert!((result - dec!(1187.57)).abs() < dec!(0.01), "got {result}");
    }

    #[test]
    fn test_pmt_zero_rate_is_straight_line() {
        let result = pmt(Decimal::ZERO, 240, dec!(120000)).unwrap();
        assert_eq!(result, dec!(500));
    }

    #[test]
    fn test_pmt_zero_periods_rejected() {
        assert!(matches!(
            pmt(dec!(0.01), 0, dec!(1000)),
            Err(MortgageError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_pmt_overflow_is_numeric_instability() {
        let result = pmt(dec!(50), 600, dec!(1000));
        assert!(matches!(result, Err(MortgageError::NumericInstability { .. })));
    }

    #[test]
    fn test_nper_inverts_pmt() {
        let rate = dec!(0.05) / dec!(12);
        let payment = pmt(rate, 180, dec!(100000)).unwrap();
        let n = nper(rate, payment, dec!(100000)).unwrap();
        assert!((n - dec!(180)).abs() < dec!(0.0001), "got {n}");
    }

    #[test]
    fn test_nper_zero_balance() {
        assert_eq!(nper(dec!(0.01), dec!(100), Decimal::ZERO).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_nper_payment_below_interest() {
        // 1% of 100k is 1,000 interest; a 900 payment never amortises
        let result = nper(dec!(0.01), dec!(900), dec!(100000));
        assert!(matches!(result, Err(MortgageError::NumericInstability { .. })));
    }

    #[test]
    fn test_present_value_annuity() {
        let flows = vec![dec!(100); 10];
        let pv = present_value(dec!(0.08), &flows);
        // 100 * (1 - 1/1.08^10) / 0.08 ≈ 671.01
        assert!((pv - dec!(671.01)).abs() < dec!(0.01), "got {pv}");
    }

    #[test]
    fn test_solve_rate_recovers_known_rate() {
        let rate = dec!(0.06) / dec!(12);
        let payment = pmt(rate, 120, dec!(50000)).unwrap();
        let flows = vec![payment; 120];
        let solved = solve_rate(&flows, dec!(50000), Decimal::ZERO, Decimal::ONE).unwrap();
        assert!((solved - rate).abs() < dec!(0.0000001), "got {solved}");
    }

    #[test]
    fn test_solve_rate_unbracketed() {
        let flows = vec![dec!(10); 5];
        let result = solve_rate(&flows, dec!(1000), Decimal::ZERO, Decimal::ONE);
        assert!(matches!(result, Err(MortgageError::ConvergenceFailure { .. })));
    }
}
