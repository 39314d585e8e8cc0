//! Service status command

use anyhow::Result;
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{print_json, print_success, OutputFormat};

/// Query the service status endpoint
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status = client.status().await?;

    match format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Table => {
            if status.status == "ok" {
                print_success("Prediction service is up");
            } else {
                println!("Service status: {}", status.status.yellow());
            }
        }
    }

    Ok(())
}
