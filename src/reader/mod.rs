//! CSV reader for border crossing records.
//!
//! Rows are decoded with `csv` + `serde`, validated, and converted into
//! [`Record`]s. Every row is checked before any aggregation starts, so a
//! single malformed row aborts the run without partial output.

use crate::error::StatsError;
use crate::models::{parse_count, Record};
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Date formats tried in order when none are configured.
pub const DEFAULT_DATE_FORMATS: &[&str] =
    &["%d/%m/%Y %I:%M:%S %p", "%d/%m/%Y %H:%M:%S", "%d/%m/%Y"];

/// Options for reading an input file.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Field delimiter.
    pub delimiter: u8,
    /// `chrono` formats tried in order for the Date column.
    pub date_formats: Vec<String>,
    /// Whether to show a spinner while reading.
    pub show_progress: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
            show_progress: false,
        }
    }
}

/// The columns we need; any other column is ignored.
#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "Border", default)]
    border: String,
    #[serde(rename = "Date", default)]
    date: String,
    #[serde(rename = "Measure", default)]
    measure: String,
    #[serde(rename = "Value", default)]
    value: String,
}

impl RawRow {
    fn into_record(self, line: u64, formats: &[String]) -> Result<Record, StatsError> {
        for (name, field) in [
            ("Border", &self.border),
            ("Date", &self.date),
            ("Measure", &self.measure),
            ("Value", &self.value),
        ] {
            if field.trim().is_empty() {
                return Err(StatsError::malformed(line, format!("empty {} field", name)));
            }
        }

        let date_text = self.date.trim().to_string();
        let date = parse_timestamp(&date_text, formats).ok_or_else(|| {
            StatsError::malformed(line, format!("unrecognized date '{}'", date_text))
        })?;

        let value = parse_count(&self.value);
        if value.is_none() && self.value.trim().bytes().all(|b| b.is_ascii_digit()) {
            return Err(StatsError::malformed(
                line,
                format!("value {} is out of range", self.value.trim()),
            ));
        }

        Ok(Record {
            border: self.border.trim().to_string(),
            date,
            date_text,
            measure: self.measure.trim().to_string(),
            value,
        })
    }
}

/// Parse a timestamp with the first matching format.
///
/// Formats without a time of day are accepted and mean midnight.
pub fn parse_timestamp(text: &str, formats: &[String]) -> Option<NaiveDateTime> {
    formats.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(text, format)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(text, format)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    })
}

/// Read every record from a CSV file.
pub fn read_records(path: &Path, options: &ReaderOptions) -> Result<Vec<Record>> {
    info!("Reading records from: {}", path.display());

    let file = File::open(path)
        .with_context(|| format!("Failed to open input file: {}", path.display()))?;

    let records = read_from(file, options)
        .with_context(|| format!("Failed to read records from {}", path.display()))?;

    info!("Read {} records", records.len());
    Ok(records)
}

/// Read every record from any CSV source.
pub fn read_from<R: Read>(source: R, options: &ReaderOptions) -> Result<Vec<Record>, StatsError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(options.delimiter)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| StatsError::malformed(1, e.to_string()))?
        .clone();
    debug!("Input columns: {:?}", headers);

    let progress = spinner(options.show_progress);
    let mut records = Vec::new();

    for row in reader.records() {
        let row = row.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(0);
            StatsError::malformed(line, e.to_string())
        })?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);

        let raw: RawRow = row
            .deserialize(Some(&headers))
            .map_err(|e| StatsError::malformed(line, e.to_string()))?;
        records.push(raw.into_record(line, &options.date_formats)?);
        progress.inc(1);
    }

    progress.finish_and_clear();
    Ok(records)
}

fn spinner(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {pos} rows read")
    {
        pb.set_style(style);
    }
    pb
}
