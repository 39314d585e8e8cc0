//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of rows
pub fn print_table<T: Tabled>(rows: &[T]) {
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Format a probability as a percentage
pub fn format_probability(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

/// Human label for a predicted class
pub fn outcome_label(is_diabetic: u8) -> &'static str {
    if is_diabetic == 1 {
        "diabetic"
    } else {
        "non-diabetic"
    }
}

/// Color the outcome label
pub fn color_outcome(is_diabetic: u8) -> String {
    let label = outcome_label(is_diabetic);
    if is_diabetic == 1 {
        label.red().bold().to_string()
    } else {
        label.green().to_string()
    }
}

/// Color probability based on risk band
pub fn color_probability(probability: f64) -> String {
    let formatted = format_probability(probability);
    if probability >= 0.7 {
        formatted.red().to_string()
    } else if probability >= 0.4 {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}
