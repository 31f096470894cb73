//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - decides between the warehouse and sample data
//! - runs the comparison pipeline
//! - prints reports and writes optional exports

use std::time::Duration;

use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, ExportArgs, RunArgs};
use crate::data::{SourceAdapter, WarehouseConfig};
use crate::domain::{DateRange, FilterCriteria, ReferenceVocabulary};
use crate::error::AppError;
use crate::io::ingest::parse_date;

pub mod pipeline;
pub mod session;

use pipeline::PipelineConfig;
use session::Session;

/// Entry point for the `pricewatch` binary.
pub fn run() -> Result<(), AppError> {
    // `pricewatch` and `pricewatch --country DE` behave like `pricewatch compare ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    init_tracing(cli.verbose);

    match cli.command {
        Command::Compare(args) => handle_compare(&args, OutputMode::Full),
        Command::Quality(args) => handle_compare(&args, OutputMode::QualityOnly),
        Command::Export(args) => handle_export(&args),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Full,
    QualityOnly,
}

fn handle_compare(args: &RunArgs, mode: OutputMode) -> Result<(), AppError> {
    let config = pipeline_config_from_args(args)?;
    let criteria = criteria_from_args(args)?;
    let adapter = adapter_from_config(args.offline, &config);

    let mut session = Session::new(config);
    let min_quality = session.config().min_quality;
    let report = session.query(&adapter, &criteria);
    let quality = [report.inflation_quality.clone(), report.product_quality.clone()];

    println!("{}", crate::report::format_status(&report.status));
    println!("{}", crate::report::format_quality(&quality, min_quality));

    if mode == OutputMode::Full {
        println!(
            "{}",
            crate::report::format_summary(report.inflation_summary.as_ref(), report.product_summary.as_ref())
        );
        println!("{}", crate::report::format_series(&report.series, args.limit));
    }
    Ok(())
}

fn handle_export(args: &ExportArgs) -> Result<(), AppError> {
    if args.csv.is_none() && args.json.is_none() {
        return Err(AppError::new(2, "export needs --csv and/or --json"));
    }

    let config = pipeline_config_from_args(&args.run)?;
    let criteria = criteria_from_args(&args.run)?;
    let adapter = adapter_from_config(args.run.offline, &config);
    let report = pipeline::run_pipeline(&adapter, &criteria, &config);

    println!("{}", crate::report::format_status(&report.status));
    if let Some(path) = &args.csv {
        crate::io::export::write_comparison_csv(path, &report.series)?;
        println!("Wrote {} comparison rows to {}", report.series.len(), path.display());
    }
    if let Some(path) = &args.json {
        crate::io::export::write_report_json(path, &report)?;
        println!("Wrote report to {}", path.display());
    }
    Ok(())
}

pub fn pipeline_config_from_args(args: &RunArgs) -> Result<PipelineConfig, AppError> {
    if !(0.0..=1.0).contains(&args.min_quality) {
        return Err(AppError::new(2, format!("--min-quality must be within [0, 1], got {}", args.min_quality)));
    }
    let today = match &args.today {
        Some(raw) => parse_date_arg("--today", raw)?,
        None => Local::now().date_naive(),
    };
    Ok(PipelineConfig {
        seed: args.seed,
        timeout: Duration::from_secs(args.timeout_secs),
        today,
        vocabulary: ReferenceVocabulary::default(),
        min_quality: args.min_quality,
    })
}

/// Build filter criteria from CLI arguments.
///
/// A missing `--from`/`--to` bound is open on that side.
pub fn criteria_from_args(args: &RunArgs) -> Result<FilterCriteria, AppError> {
    let mut criteria = FilterCriteria::default()
        .with_countries(&args.countries)
        .with_categories(&args.categories)
        .with_brands(&args.brands);

    let from = args.from.as_deref().map(|raw| parse_date_arg("--from", raw)).transpose()?;
    let to = args.to.as_deref().map(|raw| parse_date_arg("--to", raw)).transpose()?;
    if from.is_some() || to.is_some() {
        let start = from.unwrap_or(NaiveDate::MIN);
        let end = to.unwrap_or(NaiveDate::MAX);
        let range = DateRange::new(start, end)
            .ok_or_else(|| AppError::new(2, format!("--from {start} is after --to {end}")))?;
        criteria = criteria.with_date_range(range);
    }
    Ok(criteria)
}

fn parse_date_arg(flag: &str, raw: &str) -> Result<NaiveDate, AppError> {
    parse_date(raw).ok_or_else(|| AppError::new(2, format!("Invalid {flag} date '{raw}'")))
}

fn adapter_from_config(offline: bool, config: &PipelineConfig) -> SourceAdapter {
    if offline {
        return SourceAdapter::offline(config.seed);
    }
    SourceAdapter::from_config(WarehouseConfig::from_env(), config.timeout, config.seed)
}

/// Log to stderr; `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Rewrite argv so `pricewatch` defaults to `pricewatch compare`.
///
/// Rules:
/// - `pricewatch`                         -> `pricewatch compare`
/// - `pricewatch --country DE ...`        -> `pricewatch compare --country DE ...`
/// - `pricewatch --help/--version/-h`     -> unchanged (show top-level help/version)
/// - `pricewatch -v quality ...`          -> unchanged (subcommand after global flags)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("compare".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    // Global flags may precede the subcommand (`pricewatch -v quality`).
    let has_subcommand = argv[1..]
        .iter()
        .any(|arg| matches!(arg.as_str(), "compare" | "quality" | "export"));
    if has_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "compare".to_string());
        return argv;
    }

    argv
}
