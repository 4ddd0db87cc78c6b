//! VarContrib CLI - Command-line interface for VaR contribution analytics.
//!
//! # Usage
//!
//! ```bash
//! # Compare the three estimators on the default 40-asset demo market
//! varcontrib compare
//!
//! # Smaller run from a config file, with one override
//! varcontrib compare --config analysis.toml --simulations 20000
//!
//! # Diagnose a P&L series, one value per line
//! varcontrib diagnose --file pnl.csv --windows 4 --max-lag 20
//!
//! # Print a config template
//! varcontrib config template > analysis.toml
//! ```

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod chart;
mod cli;
mod commands;
mod error;
mod output;

use cli::{Cli, Commands};

fn init_logging(verbose: bool) {
    let fallback = if verbose {
        "warn,varcontrib=debug,varcontrib_risk=debug,varcontrib_math=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| fallback.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let format = cli.format;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Compare(args) => commands::compare::execute(args, format, quiet)?,
        Commands::Diagnose(args) => commands::diagnose::execute(args, format, quiet)?,
        Commands::Config(args) => commands::config::execute(args, format)?,
    }

    Ok(())
}
