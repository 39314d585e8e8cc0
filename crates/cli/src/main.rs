//! Diabetes Prediction CLI
//!
//! A command-line client for checking the prediction service and
//! submitting patient feature records.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{health, predict};
use std::path::PathBuf;

/// Diabetes Prediction CLI
#[derive(Parser)]
#[command(name = "dpred")]
#[command(author, version, about = "CLI for the Diabetes Prediction Service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via DPRED_API_URL or ~/.config/dpred/config.json)
    #[arg(long, env = "DPRED_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that the prediction service is up
    Health,

    /// Predict diabetes status for one patient
    Predict {
        #[command(flatten)]
        features: FeatureArgs,

        /// Read the feature record from a JSON file instead of flags
        #[arg(
            long,
            short,
            conflicts_with_all = [
                "pregnancies",
                "glucose",
                "blood_pressure",
                "skin_thickness",
                "insulin",
                "bmi",
                "diabetes_pedigree_function",
                "age",
            ]
        )]
        input: Option<PathBuf>,
    },
}

/// Feature flags; all eight are required unless --input is given
#[derive(Args)]
pub struct FeatureArgs {
    /// Number of pregnancies
    #[arg(long, required_unless_present = "input")]
    pub pregnancies: Option<f64>,

    /// Plasma glucose concentration
    #[arg(long, required_unless_present = "input")]
    pub glucose: Option<f64>,

    /// Diastolic blood pressure (mm Hg)
    #[arg(long, required_unless_present = "input")]
    pub blood_pressure: Option<f64>,

    /// Triceps skin fold thickness (mm)
    #[arg(long, required_unless_present = "input")]
    pub skin_thickness: Option<f64>,

    /// 2-hour serum insulin (mu U/ml)
    #[arg(long, required_unless_present = "input")]
    pub insulin: Option<f64>,

    /// Body mass index
    #[arg(long, required_unless_present = "input")]
    pub bmi: Option<f64>,

    /// Diabetes pedigree function
    #[arg(long, required_unless_present = "input")]
    pub diabetes_pedigree_function: Option<f64>,

    /// Age in years
    #[arg(long, required_unless_present = "input")]
    pub age: Option<f64>,
}

impl FeatureArgs {
    fn to_record(&self) -> Result<client::FeatureRecord> {
        let field = |value: Option<f64>, flag: &str| {
            value.ok_or_else(|| anyhow::anyhow!("--{} is required", flag))
        };

        Ok(client::FeatureRecord {
            pregnancies: field(self.pregnancies, "pregnancies")?,
            glucose: field(self.glucose, "glucose")?,
            blood_pressure: field(self.blood_pressure, "blood-pressure")?,
            skin_thickness: field(self.skin_thickness, "skin-thickness")?,
            insulin: field(self.insulin, "insulin")?,
            bmi: field(self.bmi, "bmi")?,
            diabetes_pedigree_function: field(
                self.diabetes_pedigree_function,
                "diabetes-pedigree-function",
            )?,
            age: field(self.age, "age")?,
        })
    }
}

async fn run(cli: Cli) -> Result<()> {
    let api_url = config::Config::load()?.resolve_api_url(cli.api_url);

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Health => {
            health::show_health(&client, cli.format).await?;
        }
        Commands::Predict { features, input } => {
            let body = match input {
                Some(path) => predict::read_input(&path)?,
                None => predict::record_body(&features.to_record()?)?,
            };
            predict::run_prediction(&client, &body, cli.format).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
