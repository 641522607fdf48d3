use serde_json::Value;

use super::format_cell;

/// Headline fields, most specific first. A comparison reports its savings,
/// a single schedule its opening payment.
const PRIORITY_KEYS: [&str; 4] = [
    "interest_saved",
    "initial_payment",
    "total_interest_paid",
    "apr",
];

/// Print just the key answer value from the output.
///
/// Looks for the headline fields in the result and then in its `summary`,
/// falling back to the first scalar field of the result.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_line(value));
}

fn minimal_line(value: &Value) -> String {
    let result = value.get("result").unwrap_or(value);

    let Value::Object(map) = result else {
        return format_cell(result);
    };

    let summary = map.get("summary").and_then(Value::as_object);
    for key in PRIORITY_KEYS {
        let hit = map
            .get(key)
            .or_else(|| summary.and_then(|s| s.get(key)))
            .filter(|v| !v.is_null());
        if let Some(val) = hit {
            return format_cell(val);
        }
    }

    map.iter()
        .find(|(_, v)| !v.is_object() && !v.is_array())
        .map(|(key, val)| format!("{}: {}", key, format_cell(val)))
        .unwrap_or_default()
}
