pub mod chart;
pub mod engine;

pub use chart::{ChartMetadata, ChartReport, convert_chart};
pub use engine::{ConversionReport, Converter, FileOutcome, FileStatus, TranslationResult, audit_paths};
