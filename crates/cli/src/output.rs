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

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_table<T: Tabled>(rows: &[T]) {
    if rows.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    println!("{}", Table::new(rows).with(Style::rounded()));
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Human-readable duration from whole seconds, e.g. `2h 5m`
pub fn format_duration_secs(secs: i64) -> String {
    if secs <= 0 {
        return "-".to_string();
    }
    let (hours, rem) = (secs / 3600, secs % 3600);
    let (mins, secs) = (rem / 60, rem % 60);
    match (hours, mins) {
        (0, 0) => format!("{}s", secs),
        (0, m) => format!("{}m {}s", m, secs),
        (h, m) => format!("{}h {}m", h, m),
    }
}

pub fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// Color a pod or component status
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "running" | "succeeded" => status.green().to_string(),
        "degraded" | "pending" => status.yellow().to_string(),
        "unhealthy" | "failed" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color a stability score against the analyzer thresholds
pub fn color_stability(score: f64) -> String {
    let formatted = format!("{:.2}", score);
    if score > 0.8 {
        formatted.green().to_string()
    } else if score >= 0.7 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_secs() {
        assert_eq!(format_duration_secs(0), "-");
        assert_eq!(format_duration_secs(42), "42s");
        assert_eq!(format_duration_secs(125), "2m 5s");
        assert_eq!(format_duration_secs(7500), "2h 5m");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.125), "12.5%");
    }
}
