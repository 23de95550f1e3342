//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use crossstat::report::OutputFormat;
use std::path::{Path, PathBuf};

/// Crossstat - monthly border crossing statistics
///
/// Sums crossing counts per border, measure and month, and pairs each
/// month with the rounded average of all earlier months.
///
/// Examples:
///   crossstat --input Border_Crossing_Entry_Data.csv
///   crossstat --input data.csv --output report.json --format json
///   crossstat --input data.csv --shards 4
///   crossstat --input data.csv --dry-run
///   crossstat --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Input CSV file with Border, Date, Measure and Value columns
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub input: Option<PathBuf>,

    /// Output file path for the report
    ///
    /// Defaults to the path in .crossstat.toml, or border_crossing_statistics.csv
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (csv, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .crossstat.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of parallel aggregation shards
    #[arg(long, value_name = "NUM", env = "CROSSSTAT_SHARDS")]
    pub shards: Option<usize>,

    /// Date format for the Date column (chrono syntax, repeatable)
    ///
    /// Example: --date-format "%m/%d/%Y %I:%M:%S %p"
    #[arg(long, value_name = "FMT")]
    pub date_format: Vec<String>,

    /// Input field delimiter
    #[arg(long, value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: read and aggregate without writing a report
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .crossstat.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The input path (empty when only --init-config was given).
    pub fn input_path(&self) -> &Path {
        self.input.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let input = self.input_path();
        if !input.exists() {
            return Err(format!("Input file does not exist: {}", input.display()));
        }
        if !input.is_file() {
            return Err(format!("Input path is not a file: {}", input.display()));
        }

        if self.shards == Some(0) {
            return Err("Shards must be at least 1".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref output) = self.output {
            if output == input {
                return Err("Output file must differ from the input file".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
