use serde_json::{Map, Value};
use std::io::{self, Write};

use super::{format_cell, ROW_SECTIONS};

/// Write output as CSV to stdout.
///
/// The first row section present (schedule, yearly comparison, annual
/// breakdown) is written as a table; without one, the result is written as
/// `field,value` pairs with nested summaries flattened to `section.field`.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    let _ = write_csv(&mut wtr, value);
    let _ = wtr.flush();
}

fn write_csv<W: Write>(wtr: &mut csv::Writer<W>, value: &Value) -> csv::Result<()> {
    let result = value.get("result").unwrap_or(value);

    let Value::Object(res) = result else {
        return wtr.write_record([format_cell(result)]);
    };

    if let Some(rows) = ROW_SECTIONS
        .iter()
        .find_map(|key| res.get(*key).and_then(Value::as_array))
    {
        return write_rows(wtr, rows);
    }

    wtr.write_record(["field", "value"])?;
    write_fields(wtr, "", res)
}

fn write_rows<W: Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) -> csv::Result<()> {
    let Some(Value::Object(first)) = rows.first() else {
        return Ok(());
    };

    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    wtr.write_record(&headers)?;

    for row in rows {
        if let Value::Object(map) = row {
            let cells: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_cell).unwrap_or_default())
                .collect();
            wtr.write_record(&cells)?;
        }
    }
    Ok(())
}

fn write_fields<W: Write>(
    wtr: &mut csv::Writer<W>,
    prefix: &str,
    map: &Map<String, Value>,
) -> csv::Result<()> {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match val {
            Value::Object(nested) => write_fields(wtr, &name, nested)?,
            Value::Array(_) => {}
            _ => wtr.write_record([name.as_str(), &format_cell(val)])?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(value: &Value) -> String {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_csv(&mut wtr, value).unwrap();
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_schedule_rows_become_csv_table() {
        let value = json!({
            "result": {
                "summary": { "initial_payment": "1187.57" },
                "schedule": [
                    { "interest": "829.17", "period": 1 },
                    { "interest": "827.98", "period": 2 }
                ]
            }
        });
        assert_eq!(
            render(&value),
            "interest,period\n829.17,1\n827.98,2\n"
        );
    }

    #[test]
    fn test_summary_only_flattens_fields() {
        let value = json!({
            "result": {
                "baseline": { "periods_elapsed": 360 },
                "interest_saved": "100.00"
            }
        });
        assert_eq!(
            render(&value),
            "field,value\nbaseline.periods_elapsed,360\ninterest_saved,100.00\n"
        );
    }
}
