use std::fs::File;
use std::io::Read;

use mortgage_core::amortization::ExtraPaymentRow;

use super::file::resolve_path;

/// Read the extra-payment table from a delimited file.
///
/// The header row names the columns (`period`, `amount`, `kind`; the
/// dashboard export's `Month`, `Amortization` and `Type` are also accepted).
/// Without a period column, rows are taken as consecutive periods from 1.
pub fn read_plan(path: &str, delimiter: u8) -> Result<Vec<ExtraPaymentRow>, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let file = File::open(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    parse_plan(file, delimiter)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e).into())
}

pub fn parse_plan<R: Read>(reader: R, delimiter: u8) -> Result<Vec<ExtraPaymentRow>, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    rdr.deserialize().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_explicit_period_column() {
        let data = "period;amount;kind\n12;10000;Term\n24;5000.50;Fee\n";
        let rows = parse_plan(data.as_bytes(), b';').unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], ExtraPaymentRow::new(12, dec!(10000), "Term"));
        assert_eq!(rows[1].amount, Some(dec!(5000.50)));
    }

    #[test]
    fn test_dashboard_export_is_positional() {
        let data = "Amortization;Type\n0;\n0;\n2500;Fee\n";
        let rows = parse_plan(data.as_bytes(), b';').unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].period, None);
        assert_eq!(rows[0].kind, None);
        assert_eq!(rows[2].amount, Some(dec!(2500)));
        assert_eq!(rows[2].kind.as_deref(), Some("Fee"));
    }

    #[test]
    fn test_comma_delimited_with_blank_amount() {
        let data = "period,amount,kind\n3,,\n4,100,term\n";
        let rows = parse_plan(data.as_bytes(), b',').unwrap();
        assert_eq!(rows[0].amount, None);
        assert_eq!(rows[1].kind.as_deref(), Some("term"));
    }

    #[test]
    fn test_non_numeric_amount_is_an_error() {
        let data = "period;amount;kind\n1;lots;Term\n";
        assert!(parse_plan(data.as_bytes(), b';').is_err());
    }
}
