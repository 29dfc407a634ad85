pub mod human;
pub mod json;

use crate::auditor::Residual;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output format for conversion reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON format for machine processing
    Json,
}

/// Trait for formatting residual-directive reports
pub trait OutputFormatter {
    /// Format per-file residuals for output
    fn format_results(&self, results: &[(PathBuf, Vec<Residual>)]) -> String;
}

/// Get the appropriate formatter for the given format
pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Human => Box::new(human::HumanFormatter::new()),
        OutputFormat::Json => Box::new(json::JsonFormatter::new()),
    }
}

/// Statistics about a conversion or audit run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConvertStats {
    pub total_files: usize,
    pub files_with_residuals: usize,
    pub total_residuals: usize,
}

impl ConvertStats {
    /// Calculate statistics from per-file residuals
    pub fn from_results(results: &[(PathBuf, Vec<Residual>)]) -> Self {
        Self {
            total_files: results.len(),
            files_with_residuals: results.iter().filter(|(_, residuals)| !residuals.is_empty()).count(),
            total_residuals: results.iter().map(|(_, residuals)| residuals.len()).sum(),
        }
    }

    /// Zero residuals across the run is the success signal
    pub fn is_success(&self) -> bool {
        self.total_residuals == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_stats_empty() {
        let stats = ConvertStats::from_results(&[]);

        assert_eq!(stats, ConvertStats::default());
        assert!(stats.is_success());
    }

    #[test]
    fn test_convert_stats_with_residuals() {
        let results = vec![
            (
                PathBuf::from("deployment.yaml"),
                vec![
                    Residual::new(3, 10, "{{repl ConfigOption \"missing\"}}"),
                    Residual::new(7, 5, "repl{{ LicenseFieldValue \"x\" }}"),
                ],
            ),
            (PathBuf::from("service.yaml"), vec![]),
            (PathBuf::from("secret.yaml"), vec![Residual::new(1, 1, "{{repl Foo}}")]),
        ];

        let stats = ConvertStats::from_results(&results);

        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.files_with_residuals, 2);
        assert_eq!(stats.total_residuals, 3);
        assert!(!stats.is_success());
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Human);
    }
}
