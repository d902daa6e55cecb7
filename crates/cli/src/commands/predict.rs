//! Prediction command

use anyhow::{bail, Context, Result};
use colored::Colorize;
use mediscan_lib::{Disease, RawInputRecord, RawValue};
use std::path::Path;

use crate::client::ApiClient;
use crate::output::{color_confidence, color_result, print_json, print_warning, OutputFormat};

/// Parse a `name=value` pair; numeric text becomes a number, empty is missing
pub fn parse_field(pair: &str) -> Result<(String, RawValue)> {
    let Some((name, value)) = pair.split_once('=') else {
        bail!("Invalid field '{}', expected name=value", pair);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Invalid field '{}', name is empty", pair);
    }
    Ok((name.to_string(), RawValue::from_cell(value)))
}

/// Build the record from an optional JSON file, then `-f` pairs on top
pub fn build_record(fields: &[String], input: Option<&Path>) -> Result<RawInputRecord> {
    let mut record = match input {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read input file {:?}", path))?;
            serde_json::from_str::<RawInputRecord>(&content).with_context(|| {
                format!("Input file {:?} must be a JSON object of field values", path)
            })?
        }
        None => RawInputRecord::new(),
    };
    for pair in fields {
        let (name, value) = parse_field(pair)?;
        record.insert(name, value);
    }
    Ok(record)
}

pub async fn predict(
    client: &ApiClient,
    disease: Disease,
    fields: &[String],
    input: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let record = build_record(fields, input)?;
    if record.is_empty() {
        print_warning("No input fields given; the model will see imputed defaults only");
    }

    let response = client.predict(disease, record).await?;

    match format {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Table => {
            println!("{}", format!("{} Prediction", response.display_name).bold());
            println!("{}", "=".repeat(40));
            println!(
                "Result:        {}",
                color_result(&response.result, response.label)
            );
            println!(
                "Confidence:    {}",
                color_confidence(response.confidence, &response.confidence_display)
            );
            println!("Model version: {}", response.model_version.dimmed());
            if let Some(note) = &response.note {
                println!();
                print_warning(note);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_field() {
        assert_eq!(
            parse_field("age=63").unwrap(),
            ("age".to_string(), RawValue::Number(63.0))
        );
        assert_eq!(
            parse_field("thal=fixed").unwrap(),
            ("thal".to_string(), RawValue::Text("fixed".to_string()))
        );
        assert_eq!(
            parse_field("bmi=").unwrap(),
            ("bmi".to_string(), RawValue::Missing)
        );
        assert!(parse_field("age").is_err());
        assert!(parse_field("=5").is_err());
    }

    #[test]
    fn test_flags_override_input_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input.json");
        std::fs::write(&path, r#"{"age": 50, "sex": "1", "chol": null}"#).unwrap();

        let record = build_record(&["age=61".to_string()], Some(&path)).unwrap();
        assert_eq!(record["age"], RawValue::Number(61.0));
        assert_eq!(record["sex"], RawValue::Text("1".to_string()));
        assert_eq!(record["chol"], RawValue::Missing);
    }

    #[test]
    fn test_input_file_must_be_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(build_record(&[], Some(&path)).is_err());
    }
}
