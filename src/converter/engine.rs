use crate::auditor::{self, Residual};
use crate::config::Config;
use crate::directive::Translator;
use crate::error::ConvertResult;
use crate::expander::{AnnotationExpander, ConditionalAnnotation};
use crate::manifest;
use crate::schema::ConfigSchema;
use eyre::{Context, Result};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Output of translating a single document
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationResult {
    pub content: String,
    pub residuals: Vec<Residual>,
    pub annotations: Vec<ConditionalAnnotation>,
}

impl TranslationResult {
    pub fn residual_count(&self) -> usize {
        self.residuals.len()
    }
}

/// What happened to one file of the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Rewritten in place
    Converted,
    /// Translated, but nothing changed
    Unchanged,
    /// Auxiliary control-plane document, not translated
    ControlPlane,
    /// Matched an ignore pattern
    Ignored,
    /// Archive or non-UTF-8 payload
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    /// Path relative to the conversion root
    pub path: PathBuf,
    pub status: FileStatus,
    pub residuals: Vec<Residual>,
    pub annotations: Vec<ConditionalAnnotation>,
}

impl FileOutcome {
    fn untouched(path: PathBuf, status: FileStatus) -> Self {
        Self {
            path,
            status,
            residuals: Vec::new(),
            annotations: Vec::new(),
        }
    }
}

/// Every file outcome of a run, ordered by path
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionReport {
    pub files: Vec<FileOutcome>,
}

impl ConversionReport {
    /// Per-file residuals in the shape the output formatters take
    pub fn residuals(&self) -> Vec<(PathBuf, Vec<Residual>)> {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Converted | FileStatus::Unchanged))
            .map(|f| (f.path.clone(), f.residuals.clone()))
            .collect()
    }

    pub fn total_residuals(&self) -> usize {
        self.files.iter().map(|f| f.residuals.len()).sum()
    }

    pub fn is_success(&self) -> bool {
        self.total_residuals() == 0
    }

    pub fn with_status(&self, status: FileStatus) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(move |f| f.status == status)
    }
}

/// Drives the expander, translator and auditor over documents
pub struct Converter {
    config: Config,
    schema: ConfigSchema,
}

impl Converter {
    pub fn new(config: Config, schema: ConfigSchema) -> Self {
        Self { config, schema }
    }

    /// Translate one document. Residuals are collected, not raised.
    pub fn convert_document(&self, content: &str) -> ConvertResult<TranslationResult> {
        let expansion = AnnotationExpander::new(&self.schema).expand(content)?;
        let translator = Translator::new(&self.schema, self.config.translate_options());
        let content = translator.translate(&expansion.content)?;
        let residuals = auditor::audit(&content);

        Ok(TranslationResult {
            content,
            residuals,
            annotations: expansion.annotations,
        })
    }

    /// Convert a file in place, keeping its permission bits
    pub fn convert_file(&self, root: &Path, file_path: &Path) -> Result<FileOutcome> {
        let relative = file_path.strip_prefix(root).unwrap_or(file_path).to_path_buf();

        if self.config.is_file_ignored(&relative) {
            debug!("ignoring {}", relative.display());
            return Ok(FileOutcome::untouched(relative, FileStatus::Ignored));
        }
        if self.config.is_skipped_extension(&relative) {
            debug!("skipping archive {}", relative.display());
            return Ok(FileOutcome::untouched(relative, FileStatus::Skipped));
        }

        let bytes = fs::read(file_path).with_context(|| format!("Failed to read file {}", file_path.display()))?;
        let Ok(content) = String::from_utf8(bytes) else {
            debug!("skipping non-UTF-8 file {}", relative.display());
            return Ok(FileOutcome::untouched(relative, FileStatus::Skipped));
        };

        if manifest::is_control_plane_manifest(&content) {
            debug!("{} is a control-plane document", relative.display());
            return Ok(FileOutcome::untouched(relative, FileStatus::ControlPlane));
        }

        let result = self
            .convert_document(&content)
            .with_context(|| format!("Failed to convert {}", file_path.display()))?;

        let status = if result.content == content {
            FileStatus::Unchanged
        } else {
            let permissions = fs::metadata(file_path)
                .with_context(|| format!("Failed to stat {}", file_path.display()))?
                .permissions();
            fs::write(file_path, &result.content)
                .with_context(|| format!("Failed to write {}", file_path.display()))?;
            fs::set_permissions(file_path, permissions)
                .with_context(|| format!("Failed to restore permissions on {}", file_path.display()))?;
            FileStatus::Converted
        };

        info!(
            "{}: {:?}, {} residual directive(s)",
            relative.display(),
            status,
            result.residual_count()
        );

        Ok(FileOutcome {
            path: relative,
            status,
            residuals: result.residuals,
            annotations: result.annotations,
        })
    }

    /// Convert every file under `root`
    pub fn convert_tree(&self, root: &Path) -> Result<ConversionReport> {
        let file_paths: Vec<PathBuf> = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();

        let mut files = if self.config.parallel {
            self.convert_files_parallel(root, &file_paths)?
        } else {
            file_paths
                .iter()
                .map(|path| self.convert_file(root, path))
                .collect::<Result<Vec<_>>>()?
        };

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(ConversionReport { files })
    }

    /// Documents share nothing but the read-only schema, so they convert independently
    fn convert_files_parallel(&self, root: &Path, file_paths: &[PathBuf]) -> Result<Vec<FileOutcome>> {
        file_paths
            .par_iter()
            .map(|path| self.convert_file(root, path))
            .collect()
    }
}

/// Count residual directives in files or directories without converting them.
///
/// Files named directly are reported as given; files found under a
/// directory are reported relative to it, like [`Converter::convert_tree`].
pub fn audit_paths<P: AsRef<Path>>(config: &Config, paths: &[P]) -> Result<Vec<(PathBuf, Vec<Residual>)>> {
    let mut file_paths = Vec::new();

    for path in paths {
        let path = path.as_ref();

        if path.is_file() {
            file_paths.push((path.to_path_buf(), path.to_path_buf()));
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                let file_path = entry.path();
                if config.is_file_ignored(file_path) || config.is_skipped_extension(file_path) {
                    continue;
                }
                let relative = file_path.strip_prefix(path).unwrap_or(file_path).to_path_buf();
                file_paths.push((file_path.to_path_buf(), relative));
            }
        } else {
            return Err(eyre::eyre!("Path does not exist: {}", path.display()));
        }
    }

    let mut results = Vec::with_capacity(file_paths.len());
    for (file_path, reported) in file_paths {
        let bytes = fs::read(&file_path).with_context(|| format!("Failed to read file {}", file_path.display()))?;
        let Ok(content) = String::from_utf8(bytes) else {
            debug!("skipping non-UTF-8 file {}", file_path.display());
            continue;
        };
        let residuals = auditor::audit(&content);
        results.push((reported, residuals));
    }

    Ok(results)
}
