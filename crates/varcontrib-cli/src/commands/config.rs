//! Config command implementation.
//!
//! Shows the effective analysis configuration or prints a template.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use varcontrib_risk::config::{AnalysisConfig, Validate};

use crate::cli::OutputFormat;
use crate::commands::load_config;
use crate::output::{
    print_header, print_json_value, print_output, print_success, print_warning, KeyValue,
};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration and validate it
    Show(ShowArgs),

    /// Print a configuration template with the default values
    Template,
}

/// Arguments for show subcommand.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// TOML analysis configuration (defaults when omitted)
    #[arg(short, long, env = "VARCONTRIB_CONFIG")]
    pub config: Option<PathBuf>,
}

fn describe(config: &AnalysisConfig) -> Vec<KeyValue> {
    let mut rows = vec![
        KeyValue::new("assets", config.effective_assets().to_string()),
        KeyValue::new("simulations", config.simulations.to_string()),
        KeyValue::new("degrees_of_freedom", config.degrees_of_freedom.to_string()),
        KeyValue::new("confidence", config.confidence.to_string()),
        KeyValue::new(
            "seed",
            config.seed.map_or_else(|| "random".to_string(), |s| s.to_string()),
        ),
        KeyValue::new("estimators.perturbation", config.estimators.perturbation.to_string()),
        KeyValue::new(
            "estimators.bandwidth_divisor",
            config.estimators.bandwidth_divisor.to_string(),
        ),
        KeyValue::new(
            "market",
            if config.market.is_some() { "explicit" } else { "generated demo" },
        ),
    ];
    if config.allocation.is_some() {
        rows.push(KeyValue::new("allocation", "explicit"));
    }
    rows
}

fn show(args: ShowArgs, format: OutputFormat) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let errors = config.validate();

    match format {
        OutputFormat::Json => print_json_value(&config)?,
        OutputFormat::Table => {
            print_header("Analysis Configuration");
            print_output(&describe(&config), format)?;
            println!();
            if errors.is_empty() {
                print_success("Configuration is valid");
            }
        }
        OutputFormat::Csv | OutputFormat::Minimal => print_output(&describe(&config), format)?,
    }

    for error in &errors {
        print_warning(&error.to_string());
    }
    if !errors.is_empty() {
        anyhow::bail!("configuration has {} validation error(s)", errors.len());
    }
    Ok(())
}

fn template(format: OutputFormat) -> Result<()> {
    let config = AnalysisConfig::default();
    match format {
        OutputFormat::Json => print_json_value(&config)?,
        _ => {
            println!("# VarContrib analysis configuration");
            println!("# Add [market] with `mean` and `covariance` to replace the demo market.");
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

/// Execute the config command.
pub fn execute(args: ConfigArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        ConfigCommand::Show(show_args) => show(show_args, format),
        ConfigCommand::Template => template(format),
    }
}
