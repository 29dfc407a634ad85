use super::{ConvertStats, OutputFormatter};
use crate::auditor::Residual;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Human-readable output formatter
#[derive(Debug, Default)]
pub struct HumanFormatter {
    use_colors: bool,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: Self::should_use_colors(),
        }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self { use_colors }
    }

    fn should_use_colors() -> bool {
        std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
    }

    fn format_path(&self, path: &Path) -> String {
        if self.use_colors {
            format!("\x1b[1m{}\x1b[0m", path.display()) // Bold
        } else {
            path.display().to_string()
        }
    }

    fn format_position(&self, line: usize, column: usize) -> String {
        if self.use_colors {
            format!("\x1b[36m{}:{}\x1b[0m", line, column) // Cyan
        } else {
            format!("{}:{}", line, column)
        }
    }

    fn format_label(&self) -> &'static str {
        if self.use_colors {
            "\x1b[31mresidual\x1b[0m"
        } else {
            "residual"
        }
    }

    fn format_stats(&self, stats: &ConvertStats) -> String {
        if stats.is_success() {
            let text = format!(
                "No residual directives in {} file{}",
                stats.total_files,
                plural(stats.total_files)
            );
            return if self.use_colors {
                format!("\x1b[32m{text}\x1b[0m") // Green
            } else {
                text
            };
        }

        let text = format!(
            "Found {} residual directive{} in {} file{}",
            stats.total_residuals,
            plural(stats.total_residuals),
            stats.files_with_residuals,
            plural(stats.files_with_residuals)
        );
        if self.use_colors {
            format!("\x1b[31m{text}\x1b[0m")
        } else {
            text
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

impl OutputFormatter for HumanFormatter {
    fn format_results(&self, results: &[(PathBuf, Vec<Residual>)]) -> String {
        let mut output = Vec::new();
        let stats = ConvertStats::from_results(results);

        for (file_path, residuals) in results {
            if residuals.is_empty() {
                continue;
            }

            output.push(self.format_path(file_path));
            for residual in residuals {
                output.push(format!(
                    "  {}: {} {}",
                    self.format_position(residual.line, residual.column),
                    self.format_label(),
                    residual.excerpt
                ));
            }
            output.push(String::new());
        }

        output.push(self.format_stats(&stats));
        output.join("\n")
    }
}
