//! Turns a directory of KOTS manifests into a Helm chart directory.
//!
//! Layout produced under the output directory:
//!
//! ```text
//! Chart.yaml
//! values.yaml
//! templates/   (the input tree, translated in place)
//! ```

use super::engine::{ConversionReport, Converter, FileStatus};
use crate::config::Config;
use crate::schema::{ConfigSchema, SchemaDecoder, locate_schema, render_values};
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub const CHART_FILE: &str = "Chart.yaml";
pub const VALUES_FILE: &str = "values.yaml";
pub const TEMPLATES_DIR: &str = "templates";

/// Contents of `Chart.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartMetadata {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub name: String,
    pub version: String,
}

impl ChartMetadata {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            api_version: "v2".to_string(),
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Everything a finished chart conversion produced
#[derive(Debug, Clone)]
pub struct ChartReport {
    pub chart_dir: PathBuf,
    /// Schema document the values were projected from, relative to `templates/`
    pub schema_path: Option<PathBuf>,
    pub conversion: ConversionReport,
    /// Control-plane documents dropped from `templates/`
    pub removed: Vec<PathBuf>,
}

impl ChartReport {
    pub fn templates_dir(&self) -> PathBuf {
        self.chart_dir.join(TEMPLATES_DIR)
    }

    pub fn is_success(&self) -> bool {
        self.conversion.is_success()
    }
}

/// Build a chart from `input` into `output` with the given schema decoders
pub fn convert_chart(
    input: &Path,
    output: &Path,
    metadata: &ChartMetadata,
    config: &Config,
    decoders: &[&dyn SchemaDecoder],
) -> Result<ChartReport> {
    if !input.is_dir() {
        return Err(eyre!("Input is not a directory: {}", input.display()));
    }

    check_not_nested(input, output)?;
    fs::create_dir_all(output).with_context(|| format!("Failed to create {}", output.display()))?;

    let templates_dir = output.join(TEMPLATES_DIR);
    fs::create_dir_all(&templates_dir)
        .with_context(|| format!("Failed to create {}", templates_dir.display()))?;

    copy_tree(input, &templates_dir)?;

    let located = locate_schema(&templates_dir, decoders)
        .with_context(|| format!("Failed to load config schema from {}", input.display()))?;
    let (schema, schema_path) = match located {
        Some(located) => {
            let relative = located.path.strip_prefix(&templates_dir).unwrap_or(&located.path).to_path_buf();
            (located.schema, Some(relative))
        }
        None => {
            warn!("no config schema found in {}; options will not be substituted", input.display());
            (ConfigSchema::default(), None)
        }
    };

    write_chart_file(output, metadata)?;
    write_values_file(output, &schema)?;

    let converter = Converter::new(config.clone(), schema);
    let conversion = converter.convert_tree(&templates_dir)?;

    let removed = remove_control_plane(&templates_dir, &conversion)?;

    info!(
        "chart {} {} written to {} ({} files, {} removed, {} residual directives)",
        metadata.name,
        metadata.version,
        output.display(),
        conversion.files.len(),
        removed.len(),
        conversion.total_residuals()
    );

    Ok(ChartReport {
        chart_dir: output.to_path_buf(),
        schema_path,
        conversion,
        removed,
    })
}

fn check_not_nested(input: &Path, output: &Path) -> Result<()> {
    let input = input
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", input.display()))?;
    let output = resolve_pending(output)?;

    if output.starts_with(&input) {
        return Err(eyre!(
            "Output directory {} must not be inside the input directory {}",
            output.display(),
            input.display()
        ));
    }
    Ok(())
}

/// Canonical form of a path that may not exist yet: the nearest existing
/// ancestor is resolved and the missing components are appended to it.
fn resolve_pending(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path).with_context(|| format!("Failed to resolve {}", path.display()))?;

    for existing in absolute.ancestors() {
        if !existing.exists() {
            continue;
        }
        let resolved = existing
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", existing.display()))?;
        let missing = absolute.strip_prefix(existing)?;
        return Ok(resolved.join(missing));
    }
    Ok(absolute)
}

/// Copy a directory tree; `fs::copy` carries permission bits across
fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from).min_depth(1) {
        let entry = entry.with_context(|| format!("Failed to walk {}", from.display()))?;
        let relative = entry.path().strip_prefix(from)?;
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).with_context(|| format!("Failed to create {}", target.display()))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {} to {}", entry.path().display(), target.display()))?;
        }
    }
    Ok(())
}

fn write_chart_file(output: &Path, metadata: &ChartMetadata) -> Result<()> {
    let path = output.join(CHART_FILE);
    let content = serde_yaml::to_string(metadata).context("Failed to serialize chart metadata")?;
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))
}

fn write_values_file(output: &Path, schema: &ConfigSchema) -> Result<()> {
    let path = output.join(VALUES_FILE);
    let content = render_values(schema).context("Failed to render default values")?;
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))
}

fn remove_control_plane(templates_dir: &Path, conversion: &ConversionReport) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for outcome in conversion.with_status(FileStatus::ControlPlane) {
        let path = templates_dir.join(&outcome.path);
        fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))?;
        removed.push(outcome.path.clone());
    }
    Ok(removed)
}
