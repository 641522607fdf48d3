use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{format_cell, ROW_SECTIONS};

/// Format output as tables using the tabled crate: headline scalars first,
/// then each nested summary, then the row sections (schedule, yearly).
pub fn print_table(value: &Value) {
    let result = value.get("result").unwrap_or(value);

    let Value::Object(res) = result else {
        println!("{}", format_cell(result));
        return;
    };

    let scalars: Vec<(&String, &Value)> = res
        .iter()
        .filter(|(_, v)| !v.is_object() && !v.is_array())
        .collect();
    if !scalars.is_empty() {
        print_fields(scalars);
    }

    for (key, val) in res {
        if let Value::Object(map) = val {
            println!("\n{}", section_title(key));
            print_fields(map.iter().collect());
        }
    }

    for key in ROW_SECTIONS {
        if let Some(Value::Array(rows)) = res.get(key) {
            println!("\n{}", section_title(key));
            print_rows(rows);
        }
    }

    if let Value::Object(envelope) = value {
        print_envelope_notes(envelope);
    }
}

fn print_fields(fields: Vec<(&String, &Value)>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in fields {
        builder.push_record([key.as_str(), &format_cell(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_rows(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        println!("(empty)");
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);

    for row in rows {
        if let Value::Object(map) = row {
            let cells: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_cell).unwrap_or_default())
                .collect();
            builder.push_record(cells);
        }
    }

    println!("{}", Table::from(builder));
}

fn print_envelope_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn section_title(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect::<String>().replace('_', " "),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_title() {
        assert_eq!(section_title("schedule"), "Schedule");
        assert_eq!(section_title("interest_saved"), "Interest saved");
        assert_eq!(section_title(""), "");
    }
}
