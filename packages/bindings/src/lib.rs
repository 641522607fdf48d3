use napi::Result as NapiResult;
use napi_derive::napi;

use mortgage_core::amortization::{self, AmortizationInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse_input(input_json: &str) -> NapiResult<AmortizationInput> {
    serde_json::from_str(input_json).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Amortization
// ---------------------------------------------------------------------------

#[napi]
pub fn amortization_schedule(input_json: String) -> NapiResult<String> {
    let input = parse_input(&input_json)?;
    let output = amortization::amortize(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compare_schedules(input_json: String) -> NapiResult<String> {
    let input = parse_input(&input_json)?;
    let output = amortization::compare_schedules(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
