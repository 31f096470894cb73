//! Command-line parsing for the price/inflation comparison.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the pipeline code.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::app::pipeline::DEFAULT_MIN_QUALITY;
use crate::data::DEFAULT_SEED;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "pricewatch",
    version,
    about = "Compare product price movements with food inflation (live or sample data)"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print data status, quality, inflation summary and the comparison table.
    Compare(RunArgs),
    /// Print data status and quality metrics only.
    Quality(RunArgs),
    /// Write the comparison series (CSV) and/or the full report (JSON).
    Export(ExportArgs),
}

/// Options shared by every command.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Skip the warehouse and use sample data.
    #[arg(long)]
    pub offline: bool,

    /// Seed for sample data generation.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Warehouse request timeout in seconds.
    #[arg(long, default_value_t = 15)]
    pub timeout_secs: u64,

    /// Country code to include (repeatable; default all).
    #[arg(long = "country", value_name = "CODE")]
    pub countries: Vec<String>,

    /// Category to include (repeatable; default all).
    #[arg(long = "category", value_name = "NAME")]
    pub categories: Vec<String>,

    /// Brand to include (repeatable; default all).
    #[arg(long = "brand", value_name = "NAME")]
    pub brands: Vec<String>,

    /// Start of the date range (inclusive).
    #[arg(long, value_name = "DATE")]
    pub from: Option<String>,

    /// End of the date range (inclusive).
    #[arg(long, value_name = "DATE")]
    pub to: Option<String>,

    /// Reference date for freshness (default: today).
    #[arg(long, value_name = "DATE")]
    pub today: Option<String>,

    /// Ratio both quality scores must reach to PASS.
    #[arg(long, default_value_t = DEFAULT_MIN_QUALITY)]
    pub min_quality: f64,

    /// Maximum comparison rows to print (0 = all).
    #[arg(long, default_value_t = 40)]
    pub limit: usize,
}

/// Options for `export`.
#[derive(Debug, Parser, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Write the comparison series to this CSV file.
    #[arg(long, value_name = "CSV")]
    pub csv: Option<PathBuf>,

    /// Write the full report to this JSON file.
    #[arg(long, value_name = "JSON")]
    pub json: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn repeatable_filters_collect() {
        let cli = Cli::parse_from([
            "pricewatch",
            "compare",
            "--country",
            "DE",
            "--country",
            "fr",
            "--from",
            "2023-01-01",
            "-v",
        ]);
        assert_eq!(cli.verbose, 1);
        let Command::Compare(args) = cli.command else {
            panic!("expected compare");
        };
        assert_eq!(args.countries, vec!["DE", "fr"]);
        assert_eq!(args.from.as_deref(), Some("2023-01-01"));
        assert_eq!(args.seed, DEFAULT_SEED);
        assert!(!args.offline);
    }

    #[test]
    fn export_flattens_run_args() {
        let cli = Cli::parse_from(["pricewatch", "export", "--offline", "--csv", "out.csv"]);
        let Command::Export(args) = cli.command else {
            panic!("expected export");
        };
        assert!(args.run.offline);
        assert_eq!(args.csv, Some(PathBuf::from("out.csv")));
        assert!(args.json.is_none());
    }
}
