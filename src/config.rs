use crate::directive::{EqualsMode, TranslateOptions};
use eyre::{Context, ContextCompat, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Conversion settings read from `.kots2helm.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// File patterns left out of conversion (copied as-is)
    pub ignore: Vec<String>,
    /// File extensions never read as templates
    pub skip_extensions: Vec<String>,
    /// Render ConfigOptionEquals as a full if/else block rather than a bare comparison
    pub expand_config_option_equals: bool,
    /// Convert templates on the rayon pool
    pub parallel: bool,
}

impl Config {
    /// Load configuration from a file path, or the first default candidate
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let config_file = match config_path {
            Some(path) => path.clone(),
            None => Self::default_config_path()?,
        };

        if !config_file.exists() {
            if config_path.is_some() {
                return Err(eyre::eyre!("Config file not found: {}", config_file.display()));
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_file)
            .with_context(|| format!("Failed to read config file: {}", config_file.display()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_file.display()))
    }

    fn default_config_path() -> Result<PathBuf> {
        let candidates = [
            PathBuf::from(".kots2helm.yaml"),
            PathBuf::from(".kots2helm.yml"),
        ];

        for candidate in candidates {
            if candidate.exists() {
                return Ok(candidate);
            }
        }

        let config_dir = dirs::config_local_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .context("Could not determine config directory")?;

        Ok(config_dir.join("kots2helm").join("config.yaml"))
    }

    /// Check if a file should be ignored based on ignore patterns
    pub fn is_file_ignored(&self, file_path: &Path) -> bool {
        let path_str = file_path.to_string_lossy();

        self.ignore.iter().any(|pattern| {
            if pattern.contains('*') {
                let pattern_regex = format!("{}$", regex::escape(pattern).replace(r"\*", ".*"));
                regex::Regex::new(&pattern_regex)
                    .map(|re| re.is_match(&path_str))
                    .unwrap_or(false)
            } else {
                path_str.contains(pattern.as_str())
            }
        })
    }

    /// Archives and other opaque payloads are copied but never translated
    pub fn is_skipped_extension(&self, file_path: &Path) -> bool {
        let name = file_path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        self.skip_extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }

    pub fn translate_options(&self) -> TranslateOptions {
        TranslateOptions {
            equals_mode: if self.expand_config_option_equals {
                EqualsMode::Expanded
            } else {
                EqualsMode::Inline
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignore: Vec::new(),
            skip_extensions: vec![".tgz".to_string()],
            expand_config_option_equals: true,
            parallel: false,
        }
    }
}
