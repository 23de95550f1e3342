//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.crossstat.toml` files.

use anyhow::{bail, Context, Result};
use crossstat::reader::{ReaderOptions, DEFAULT_DATE_FORMATS};
use crossstat::report::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".crossstat.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input settings.
    #[serde(default)]
    pub input: InputConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Input file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Field delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Date formats tried in order (chrono syntax).
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            date_formats: default_date_formats(),
        }
    }
}

fn default_delimiter() -> char {
    ','
}

fn default_date_formats() -> Vec<String> {
    DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect()
}

impl InputConfig {
    /// Build reader options from these settings.
    pub fn reader_options(&self, show_progress: bool) -> Result<ReaderOptions> {
        if !self.delimiter.is_ascii() {
            bail!("Delimiter must be a single ASCII character, got '{}'", self.delimiter);
        }
        if self.date_formats.is_empty() {
            bail!("At least one date format is required");
        }

        Ok(ReaderOptions {
            delimiter: self.delimiter as u8,
            date_formats: self.date_formats.clone(),
            show_progress,
        })
    }
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub path: String,

    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output(),
            format: OutputFormat::default(),
        }
    }
}

fn default_output() -> String {
    "border_crossing_statistics.csv".to_string()
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Number of parallel aggregation shards (1 = sequential).
    #[serde(default = "default_shards")]
    pub shards: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            shards: default_shards(),
        }
    }
}

fn default_shards() -> usize {
    1
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values given explicitly on the command line override.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.output.path = output.display().to_string();
        }
        if let Some(format) = args.format {
            self.output.format = format;
        }

        if let Some(delimiter) = args.delimiter {
            self.input.delimiter = delimiter;
        }
        if !args.date_format.is_empty() {
            self.input.date_formats = args.date_format.clone();
        }

        if let Some(shards) = args.shards {
            self.aggregation.shards = shards;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check settings that serde cannot, once CLI overrides are applied.
    pub fn validate(&self, input: &Path) -> Result<()> {
        if self.aggregation.shards == 0 {
            bail!("Shards must be at least 1");
        }
        if same_file(Path::new(&self.output.path), input) {
            bail!(
                "Output path {} would overwrite the input file",
                self.output.path
            );
        }
        self.input.reader_options(false).map(|_| ())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// Whether two paths name the same file, following links when both exist.
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
