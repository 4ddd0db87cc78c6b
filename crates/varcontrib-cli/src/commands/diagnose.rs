//! Diagnose command implementation.
//!
//! Reads a numeric series and reports its distributional stability and
//! serial dependence.

use std::io::Read;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use tracing::info;

use varcontrib_risk::diagnostics::{diagnose, DiagnosticsConfig, SeriesDiagnostics};

use crate::cli::OutputFormat;
use crate::error::{CliError, CliResult};
use crate::output::{
    format_percent, print_header, print_json_value, print_output, print_success, print_warning,
    KeyValue,
};

/// Significance level used for the verdict lines.
const ALPHA: f64 = 0.05;

/// Arguments for the diagnose command.
#[derive(Args, Debug)]
pub struct DiagnoseArgs {
    /// Input file, one value per line or CSV with the series in the first
    /// column. Reads stdin when omitted.
    #[arg(short = 'i', long)]
    pub file: Option<PathBuf>,

    /// Number of contiguous windows for the stability check
    #[arg(short, long, default_value = "2")]
    pub windows: usize,

    /// Highest autocorrelation lag
    #[arg(short = 'l', long, default_value = "10")]
    pub max_lag: usize,
}

/// Parses the first column of CSV-like input.
///
/// Blank lines and `#` comments are skipped; a non-numeric first row is
/// treated as a header.
pub fn parse_series<R: Read>(reader: R) -> CliResult<Vec<f64>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut values = Vec::new();
    for (index, record) in rdr.records().enumerate() {
        let record = record?;
        let Some(field) = record.get(0).filter(|f| !f.is_empty()) else {
            continue;
        };
        match field.parse::<f64>() {
            Ok(v) => values.push(v),
            Err(_) if index == 0 => continue,
            Err(_) => {
                let line = record.position().map_or(index + 1, |p| p.line() as usize);
                return Err(CliError::InvalidNumber {
                    line,
                    value: field.to_string(),
                });
            }
        }
    }

    if values.is_empty() {
        return Err(CliError::EmptySeries);
    }
    Ok(values)
}

fn read_series(args: &DiagnoseArgs) -> CliResult<Vec<f64>> {
    match &args.file {
        Some(path) => {
            let file = std::fs::File::open(path).map_err(|source| CliError::ReadFile {
                path: path.clone(),
                source,
            })?;
            parse_series(file)
        }
        None => parse_series(std::io::stdin().lock()),
    }
}

/// Autocorrelation row.
#[derive(Debug, Clone, Serialize, Tabled)]
struct LagRow {
    #[tabled(rename = "Lag")]
    lag: usize,
    #[tabled(rename = "ACF(x)")]
    #[tabled(display_with = "fixed4")]
    levels: f64,
    #[tabled(rename = "ACF(x²)")]
    #[tabled(display_with = "fixed4_opt")]
    squares: Option<f64>,
    #[tabled(rename = "Outside Band")]
    flag: String,
}

/// Window row.
#[derive(Debug, Clone, Serialize, Tabled)]
struct WindowRow {
    #[tabled(rename = "Window")]
    window: usize,
    #[tabled(rename = "Start")]
    start: usize,
    #[tabled(rename = "Length")]
    len: usize,
    #[tabled(rename = "Mean")]
    #[tabled(display_with = "fixed6")]
    mean: f64,
    #[tabled(rename = "Std Dev")]
    #[tabled(display_with = "fixed6")]
    std_dev: f64,
}

fn fixed4(value: &f64) -> String {
    format!("{value:.4}")
}

fn fixed4_opt(value: &Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}

fn fixed6(value: &f64) -> String {
    format!("{value:.6}")
}

fn lag_rows(report: &SeriesDiagnostics) -> Vec<LagRow> {
    let band = report.confidence_band;
    report
        .levels
        .autocorrelations
        .iter()
        .enumerate()
        .map(|(i, &rho)| {
            let squares = report.squares.as_ref().map(|s| s.autocorrelations[i]);
            let mut flag = String::new();
            if rho.abs() > band {
                flag.push('x');
            }
            if squares.is_some_and(|r| r.abs() > band) {
                flag.push_str(if flag.is_empty() { "x²" } else { ", x²" });
            }
            LagRow {
                lag: i + 1,
                levels: rho,
                squares,
                flag,
            }
        })
        .collect()
}

fn window_rows(report: &SeriesDiagnostics) -> Vec<WindowRow> {
    report
        .stability
        .windows
        .iter()
        .enumerate()
        .map(|(i, w)| WindowRow {
            window: i + 1,
            start: w.start,
            len: w.len,
            mean: w.mean,
            std_dev: w.std_dev,
        })
        .collect()
}

fn summary(report: &SeriesDiagnostics) -> Vec<KeyValue> {
    let s = &report.summary;
    let mut rows = vec![
        KeyValue::new("Observations", s.count.to_string()),
        KeyValue::from_f64("Mean", s.mean, 6),
        KeyValue::from_f64("Std Dev", s.std_dev, 6),
        KeyValue::from_f64("Skewness", s.skewness, 4),
        KeyValue::from_f64("Excess Kurtosis", s.excess_kurtosis, 4),
        KeyValue::from_f64("Min", s.min, 6),
        KeyValue::from_f64("Max", s.max, 6),
        KeyValue::new("", ""),
        KeyValue::from_f64("Max Window Mean Shift (σ)", report.stability.max_mean_shift, 4),
        KeyValue::from_f64("Window Std Dev Ratio", report.stability.std_dev_ratio, 4),
        KeyValue::new("", ""),
        KeyValue::from_f64("ACF 95% Band", report.confidence_band, 4),
        KeyValue::from_f64("Ljung-Box Q (x)", report.levels.ljung_box, 4),
        KeyValue::new("p-value (x)", format_percent(report.levels.p_value)),
    ];
    if let Some(squares) = &report.squares {
        rows.push(KeyValue::from_f64("Ljung-Box Q (x²)", squares.ljung_box, 4));
        rows.push(KeyValue::new("p-value (x²)", format_percent(squares.p_value)));
    }
    rows
}

fn print_verdicts(report: &SeriesDiagnostics) {
    if report.levels.rejects_independence(ALPHA) {
        print_warning("Serial correlation detected in the values");
    } else {
        print_success("No serial correlation detected in the values");
    }
    match &report.squares {
        Some(sq) if sq.rejects_independence(ALPHA) => {
            print_warning("Volatility clustering detected (squared values are correlated)");
        }
        Some(_) => print_success("No volatility clustering detected"),
        None => print_warning("Squared values are constant; volatility test skipped"),
    }
}

/// Execute the diagnose command.
pub fn execute(args: DiagnoseArgs, format: OutputFormat, quiet: bool) -> Result<()> {
    let values = read_series(&args)?;
    info!(
        source = ?args.file,
        observations = values.len(),
        windows = args.windows,
        max_lag = args.max_lag,
        "series loaded"
    );
    let config = DiagnosticsConfig {
        windows: args.windows,
        max_lag: args.max_lag,
    };
    let report = diagnose(&values, &config)?;

    match format {
        OutputFormat::Table => {
            print_header("Series Diagnostics");
            print_output(&summary(&report), format)?;

            print_header("Stability by Window");
            print_output(&window_rows(&report), format)?;

            print_header("Autocorrelation");
            print_output(&lag_rows(&report), format)?;

            if !quiet {
                println!();
                print_verdicts(&report);
            }
        }
        OutputFormat::Json => print_json_value(&report)?,
        OutputFormat::Csv => print_output(&lag_rows(&report), format)?,
        OutputFormat::Minimal => {
            println!(
                "Q: {:.4}, p-value: {:.4}",
                report.levels.ljung_box, report.levels.p_value
            );
        }
    }

    Ok(())
}
