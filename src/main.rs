use clap::Parser;
use eyre::{Context, Result};
use kots2helm::auditor::Residual;
use kots2helm::config::Config;
use kots2helm::converter::{self, ChartMetadata};
use kots2helm::output::{ConvertStats, get_formatter};
use kots2helm::schema::KotsConfigDecoder;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cli;

use cli::{Cli, Commands, ConvertArgs};

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    let results = match &cli.command {
        Commands::Convert(args) => {
            apply_cli_overrides(&mut config, args);

            if args.show_config {
                return show_config(&config);
            }

            convert(args, &config)?
        }
        Commands::Audit { paths } => converter::audit_paths(&config, paths).context("Audit failed")?,
    };

    let formatter = get_formatter(cli.format);
    println!("{}", formatter.format_results(&results));

    // Leftover directives fail the run, after the full report is out
    let stats = ConvertStats::from_results(&results);
    if !stats.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

/// Logs go to stderr so JSON on stdout stays parseable
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("kots2helm=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Apply CLI overrides to the configuration
fn apply_cli_overrides(config: &mut Config, args: &ConvertArgs) {
    if args.parallel {
        config.parallel = true;
    }
    if args.inline_equals {
        config.expand_config_option_equals = false;
    }
}

fn convert(args: &ConvertArgs, config: &Config) -> Result<Vec<(PathBuf, Vec<Residual>)>> {
    let metadata = ChartMetadata::new(&args.name, &args.chart_version);
    let output = args.output_dir();

    let report = converter::convert_chart(&args.input, &output, &metadata, config, &[&KotsConfigDecoder])
        .with_context(|| format!("Failed to convert {}", args.input.display()))?;

    for removed in &report.removed {
        info!("removed control-plane manifest {}", removed.display());
    }

    Ok(report.conversion.residuals())
}

/// Show the effective configuration
fn show_config(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;

    println!("Effective configuration:");
    println!("{}", yaml);

    Ok(())
}
