//! Compare command implementation.
//!
//! Runs the analytical, naive and refined estimators on one scenario set and
//! reports their contributions side by side.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;
use tracing::info;

use varcontrib_risk::analysis::{AnalysisReport, VaRContributionAnalysis};
use varcontrib_risk::config::AnalysisConfig;
use varcontrib_risk::var::VaRMethod;

use crate::chart::BarChart;
use crate::cli::OutputFormat;
use crate::commands::load_config;
use crate::output::{format_sci, print_header, print_info, print_output, KeyValue};

/// Arguments for the compare command.
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// TOML analysis configuration; flags below override its values
    #[arg(short, long, env = "VARCONTRIB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of assets of the generated demo market
    #[arg(short = 'n', long)]
    pub assets: Option<usize>,

    /// Number of simulated scenarios (positive, even)
    #[arg(short, long)]
    pub simulations: Option<usize>,

    /// Student-t degrees of freedom
    #[arg(short, long)]
    pub dof: Option<f64>,

    /// Confidence level, e.g. 0.99
    #[arg(long)]
    pub confidence: Option<f64>,

    /// RNG seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Finite-difference step of the naive estimator
    #[arg(long)]
    pub epsilon: Option<f64>,

    /// Kernel bandwidth is simulations / divisor
    #[arg(long)]
    pub bandwidth_divisor: Option<f64>,

    /// Skip the bar charts
    #[arg(long)]
    pub no_chart: bool,

    /// Number of bar columns in the charts
    #[arg(long, default_value_t = BarChart::DEFAULT_WIDTH)]
    pub chart_width: usize,
}

impl CompareArgs {
    /// Applies command-line overrides on top of `config`.
    fn apply(&self, mut config: AnalysisConfig) -> AnalysisConfig {
        if let Some(assets) = self.assets {
            config.assets = assets;
        }
        if let Some(simulations) = self.simulations {
            config.simulations = simulations;
        }
        if let Some(dof) = self.dof {
            config.degrees_of_freedom = dof;
        }
        if let Some(confidence) = self.confidence {
            config.confidence = confidence;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(epsilon) = self.epsilon {
            config.estimators.perturbation = epsilon;
        }
        if let Some(divisor) = self.bandwidth_divisor {
            config.estimators.bandwidth_divisor = divisor;
        }
        config
    }
}

/// Per-asset contribution row.
#[derive(Debug, Clone, Serialize, Tabled)]
struct ContributionRow {
    #[tabled(rename = "Asset")]
    asset: usize,
    #[tabled(rename = "Weight")]
    #[tabled(display_with = "fixed6")]
    weight: f64,
    #[tabled(rename = "Analytical")]
    #[tabled(display_with = "fixed6")]
    analytical: f64,
    #[tabled(rename = "Naive")]
    #[tabled(display_with = "fixed6")]
    naive: f64,
    #[tabled(rename = "Refined")]
    #[tabled(display_with = "fixed6")]
    refined: f64,
}

fn fixed6(value: &f64) -> String {
    format!("{value:.6}")
}

fn contribution_rows(report: &AnalysisReport) -> Vec<ContributionRow> {
    let c = &report.comparison;
    (0..report.assets)
        .map(|i| ContributionRow {
            asset: i + 1,
            weight: report.allocation[i],
            analytical: c.analytical.contributions[i],
            naive: c.naive.contributions[i],
            refined: c.refined.contributions[i],
        })
        .collect()
}

fn summary(report: &AnalysisReport) -> Vec<KeyValue> {
    let c = &report.comparison;
    vec![
        KeyValue::new("Assets", report.assets.to_string()),
        KeyValue::new("Scenarios", report.simulations.to_string()),
        KeyValue::from_f64("Degrees of Freedom", report.degrees_of_freedom, 2),
        KeyValue::new("Confidence", report.confidence.to_string()),
        KeyValue::new("Seed", report.seed.to_string()),
        KeyValue::from_f64("Perturbation (ε)", report.perturbation, 4),
        KeyValue::from_f64("Kernel Bandwidth", report.bandwidth, 2),
        KeyValue::new("", ""),
        KeyValue::from_f64("VaR (Analytical)", c.analytical.var, 6),
        KeyValue::from_f64("VaR (Naive)", c.naive.var, 6),
        KeyValue::from_f64("VaR (Refined)", c.refined.var, 6),
        KeyValue::new("", ""),
        KeyValue::from_sci("Naive MSE", c.naive_mse),
        KeyValue::from_sci("Refined MSE", c.refined_mse),
        KeyValue::from_f64("Improvement (naive / refined)", c.improvement(), 2),
    ]
}

fn chart_title(report: &AnalysisReport, method: VaRMethod) -> String {
    let estimate = report.comparison.estimate(method);
    match method {
        VaRMethod::Analytical => format!("Analytical contributions (VaR {:.6})", estimate.var),
        _ => format!(
            "{} contributions (VaR {:.6}, MSE {})",
            capitalize(method.as_str()),
            estimate.var,
            format_sci(report.comparison.mse(method))
        ),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

fn print_charts(report: &AnalysisReport, width: usize) {
    let range = report.comparison.axis_range();
    for method in AnalysisReport::methods() {
        let values = report.comparison.estimate(method).contributions.as_slice();
        let chart = BarChart::new(chart_title(report, method), values, range)
            .with_width(width)
            .render();
        let (title, body) = chart.split_once('\n').unwrap_or((chart.as_str(), ""));
        println!("\n{}", title.bold());
        print!("{body}");
    }
}

/// Execute the compare command.
pub fn execute(args: CompareArgs, format: OutputFormat, quiet: bool) -> Result<()> {
    let config = args.apply(load_config(args.config.as_deref())?);
    let analysis = VaRContributionAnalysis::new(config)?;
    info!(
        config = ?args.config,
        assets = analysis.market().assets(),
        simulations = analysis.config().simulations,
        seed = analysis.seed(),
        "running comparison"
    );
    if !quiet && format == OutputFormat::Table {
        print_info(&format!(
            "Simulating {} scenarios for {} assets",
            analysis.config().simulations,
            analysis.market().assets()
        ));
    }
    let report = analysis.run()?;

    match format {
        OutputFormat::Table => {
            print_header("VaR Contribution Comparison");
            print_output(&summary(&report), format)?;

            print_header("Contributions by Asset");
            print_output(&contribution_rows(&report), format)?;

            if !args.no_chart && !quiet {
                print_charts(&report, args.chart_width);
            }
        }
        OutputFormat::Json => {
            crate::output::print_json_value(&report)?;
        }
        OutputFormat::Csv => {
            print_output(&contribution_rows(&report), format)?;
        }
        OutputFormat::Minimal => {
            let c = &report.comparison;
            println!(
                "VaR: {:.6}, Naive MSE: {}, Refined MSE: {}",
                c.analytical.var,
                format_sci(c.naive_mse),
                format_sci(c.refined_mse)
            );
        }
    }

    Ok(())
}
