//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print rows as a table, or the underlying values as JSON
pub fn print_table<T: Tabled, S: Serialize + ?Sized>(rows: &[T], raw: &S, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
        OutputFormat::Json => print_json(raw),
    }
}

pub fn print_json<S: Serialize + ?Sized>(value: &S) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => print_error(&format!("Failed to serialize output: {}", e)),
    }
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Availability as a colored word
pub fn color_availability(available: bool) -> String {
    if available {
        "available".green().to_string()
    } else {
        "unavailable".red().to_string()
    }
}

/// Positive results in red, negative in green
pub fn color_result(result: &str, label: u8) -> String {
    if label == 1 {
        result.red().bold().to_string()
    } else {
        result.green().bold().to_string()
    }
}

/// Confidence (percent) colored by how decisive it is
pub fn color_confidence(confidence: f64, display: &str) -> String {
    if confidence >= 80.0 {
        display.green().to_string()
    } else if confidence >= 60.0 {
        display.yellow().to_string()
    } else {
        display.red().to_string()
    }
}

/// Compact number for ranges and defaults
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.3}", value)
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}
