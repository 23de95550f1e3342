//! Output rendering.

pub mod generator;

pub use generator::{generate_report, write_report, HEADER};

use serde::{Deserialize, Serialize};

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// CSV with a header row (default)
    #[default]
    Csv,
    /// JSON array of rows
    Json,
}

impl OutputFormat {
    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}
