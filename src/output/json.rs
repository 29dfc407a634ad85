use super::{ConvertStats, OutputFormatter};
use crate::auditor::Residual;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// JSON output formatter
#[derive(Debug, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonOutput {
    generated_at: DateTime<Utc>,
    success: bool,
    stats: JsonStats,
    files: Vec<JsonFileResult>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonStats {
    total_files: usize,
    files_with_residuals: usize,
    total_residuals: usize,
}

impl From<&ConvertStats> for JsonStats {
    fn from(stats: &ConvertStats) -> Self {
        Self {
            total_files: stats.total_files,
            files_with_residuals: stats.files_with_residuals,
            total_residuals: stats.total_residuals,
        }
    }
}

/// Results for a single file, path relative to the conversion root
#[derive(Debug, Serialize, Deserialize)]
struct JsonFileResult {
    path: String,
    residual_count: usize,
    residuals: Vec<Residual>,
}

impl OutputFormatter for JsonFormatter {
    fn format_results(&self, results: &[(PathBuf, Vec<Residual>)]) -> String {
        let stats = ConvertStats::from_results(results);

        let json_output = JsonOutput {
            generated_at: Utc::now(),
            success: stats.is_success(),
            stats: JsonStats::from(&stats),
            files: results
                .iter()
                .map(|(path, residuals)| JsonFileResult {
                    path: path.display().to_string(),
                    residual_count: residuals.len(),
                    residuals: residuals.clone(),
                })
                .collect(),
        };

        serde_json::to_string_pretty(&json_output)
            .unwrap_or_else(|e| format!(r#"{{"error": "Failed to serialize JSON: {e}"}}"#))
    }
}
