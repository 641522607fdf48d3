use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MortgageError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Numeric instability in {context}")]
    NumericInstability { context: String },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl MortgageError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        MortgageError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unstable(context: impl Into<String>) -> Self {
        MortgageError::NumericInstability {
            context: context.into(),
        }
    }
}

impl From<serde_json::Error> for MortgageError {
    fn from(e: serde_json::Error) -> Self {
        MortgageError::SerializationError(e.to_string())
    }
}
