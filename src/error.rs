//! Error types for the conversion engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the engine.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Fatal conditions raised while converting a chart.
///
/// An option name that is missing from the schema is deliberately absent
/// here: the directive is left in place and counted by the auditor.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("failed to decode config schema {path}: {source}")]
    SchemaDecode {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("ConfigOptionEquals on boolean item {item}: cannot parse {literal:?} as a boolean")]
    MalformedBooleanLiteral { item: String, literal: String },

    #[error("failed to parse document metadata: {0}")]
    AnnotationDecode(#[source] serde_yaml::Error),

    #[error("failed to remarshal document: {0}")]
    Remarshal(#[source] serde_yaml::Error),

    #[error("document carries both {when} and {exclude} annotations")]
    ConflictingAnnotations {
        when: &'static str,
        exclude: &'static str,
    },

    #[error("annotation {key} has a non-scalar value")]
    InvalidAnnotationValue { key: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
