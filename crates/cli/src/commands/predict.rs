//! Prediction command

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::Value;
use std::path::Path;
use tabled::Tabled;

use crate::client::{ApiClient, FeatureRecord};
use crate::output::{color_outcome, color_probability, print_json, print_table, OutputFormat};

/// Row for the prediction table
#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Class")]
    class: u8,
    #[tabled(rename = "Probability")]
    probability: String,
}

/// Read a feature record body from a JSON file.
///
/// The body is forwarded as-is so the service reports any field errors.
pub fn read_input(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;
    let body: Value = serde_json::from_str(&content)
        .with_context(|| format!("Input file {} is not valid JSON", path.display()))?;

    if !body.is_object() {
        anyhow::bail!("Input file {} must contain a JSON object", path.display());
    }
    Ok(body)
}

/// Submit a record and print the outcome
pub async fn run_prediction(client: &ApiClient, body: &Value, format: OutputFormat) -> Result<()> {
    let result = client.predict(body).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{}", "Diabetes Prediction".bold());
            print_table(&[PredictionRow {
                outcome: color_outcome(result.is_diabetic),
                class: result.is_diabetic,
                probability: color_probability(result.probability),
            }]);
        }
    }

    Ok(())
}

/// Request body from a typed record
pub fn record_body(record: &FeatureRecord) -> Result<Value> {
    serde_json::to_value(record).context("Failed to encode feature record")
}
