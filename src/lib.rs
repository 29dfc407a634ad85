//! Converts KOTS application manifests into a Helm chart.
//!
//! The pipeline for each document is: [`expander`] turns `kots.io/when` and
//! `kots.io/exclude` annotations into a wrapping conditional, the
//! [`directive`] translator rewrites `{{repl ...}}` / `repl{{ ...}}`
//! directives into Helm syntax, and the [`auditor`] counts whatever legacy
//! syntax is left. [`converter`] runs that pipeline over a chart workspace.

pub mod auditor;
pub mod config;
pub mod converter;
pub mod directive;
pub mod error;
pub mod expander;
pub mod manifest;
pub mod output;
pub mod schema;

pub use error::{ConvertError, ConvertResult};
