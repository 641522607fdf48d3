use serde_json::Value;
use std::io::{self, Read};

/// Read a piped input document from stdin, as JSON or else YAML.
/// Returns None if stdin is a TTY or nothing was piped.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_document(&buffer)
}

fn parse_document(buffer: &str) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(Some(value)),
        Err(json_err) => {
            let value: Value = serde_yaml::from_str(trimmed)
                .map_err(|_| format!("stdin is neither JSON nor YAML: {json_err}"))?;
            Ok(Some(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stdin_is_none() {
        assert!(parse_document("  \n").unwrap().is_none());
    }

    #[test]
    fn test_json_and_yaml_documents() {
        let json = parse_document(r#"{"loan": {"term_years": 25}}"#).unwrap().unwrap();
        assert_eq!(json["loan"]["term_years"], 25);

        let yaml = parse_document("loan:\n  term_years: 25\n").unwrap().unwrap();
        assert_eq!(yaml["loan"]["term_years"], 25);
    }
}
