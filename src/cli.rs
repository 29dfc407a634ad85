use clap::{Args, Parser, Subcommand};
use kots2helm::output::OutputFormat;
use std::path::PathBuf;

/// Command-line interface for the KOTS to Helm converter
#[derive(Parser)]
#[command(
    name = "kots2helm",
    about = "Convert KOTS application manifests into a Helm chart",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, global = true, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable debug logging")]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Convert a directory of KOTS manifests into a Helm chart
    Convert(ConvertArgs),
    /// Report legacy directives left in files without converting them
    Audit {
        /// Files or directories to audit
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[derive(Args)]
pub struct ConvertArgs {
    /// Directory holding the KOTS manifests
    pub input: PathBuf,

    /// Chart name written to Chart.yaml
    #[arg(short, long)]
    pub name: String,

    /// Chart version written to Chart.yaml
    #[arg(long = "chart-version")]
    pub chart_version: String,

    /// Chart directory to create (defaults to the chart name)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Convert templates in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Emit ConfigOptionEquals as a bare comparison instead of an if/else block
    #[arg(long)]
    pub inline_equals: bool,

    /// Show configuration and exit
    #[arg(long, help = "Show effective configuration and exit")]
    pub show_config: bool,
}

impl ConvertArgs {
    pub fn output_dir(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| PathBuf::from(&self.name))
    }
}

// Provide a default implementation for testing
impl Default for ConvertArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::from("."),
            name: "chart".to_string(),
            chart_version: "0.1.0".to_string(),
            output: None,
            parallel: false,
            inline_equals: false,
            show_config: false,
        }
    }
}
