//! Report generation.
//!
//! Ranked rows are rendered as CSV (the column layout downstream
//! consumers depend on) or as a JSON array.

use super::OutputFormat;
use crate::models::ResultRow;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Output columns, in order.
pub const HEADER: [&str; 5] = ["Border", "Date", "Measure", "Value", "Average"];

/// Render rows as CSV with a header line.
pub fn generate_csv_report(rows: &[ResultRow]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(HEADER)?;
    for row in rows {
        let value = row.value.to_string();
        let average = row.average.to_string();
        writer.write_record([
            row.border.as_str(),
            row.date.as_str(),
            row.measure.as_str(),
            value.as_str(),
            average.as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV report: {}", e))?;
    String::from_utf8(bytes).context("CSV report is not valid UTF-8")
}

/// Render rows as a pretty-printed JSON array.
pub fn generate_json_report(rows: &[ResultRow]) -> Result<String> {
    serde_json::to_string_pretty(rows).map_err(Into::into)
}

/// Render rows in the requested format.
pub fn generate_report(rows: &[ResultRow], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Csv => generate_csv_report(rows),
        OutputFormat::Json => generate_json_report(rows),
    }
}

/// Write the report to a file.
pub fn write_report(rows: &[ResultRow], path: &Path, format: OutputFormat) -> Result<()> {
    let content = generate_report(rows, format)?;

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report file: {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn create_test_rows() -> Vec<ResultRow> {
        let at = |m: u32| {
            NaiveDate::from_ymd_opt(2019, m, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        vec![
            ResultRow {
                border: "US-Canada Border".to_string(),
                date: "01/02/2019".to_string(),
                measure: "Trains".to_string(),
                value: 20,
                average: 8,
                at: at(2),
            },
            ResultRow {
                border: "US-Canada Border".to_string(),
                date: "01/01/2019".to_string(),
                measure: "Trains".to_string(),
                value: 8,
                average: 0,
                at: at(1),
            },
        ]
    }

    #[test]
    fn test_generate_csv_report() {
        let csv = generate_csv_report(&create_test_rows()).unwrap();
        assert_eq!(
            csv,
            "Border,Date,Measure,Value,Average\n\
             US-Canada Border,01/02/2019,Trains,20,8\n\
             US-Canada Border,01/01/2019,Trains,8,0\n"
        );
    }

    #[test]
    fn test_csv_report_quotes_embedded_commas() {
        let mut rows = create_test_rows();
        rows.truncate(1);
        rows[0].measure = "Trucks, Full".to_string();
        let csv = generate_csv_report(&rows).unwrap();
        assert!(csv.contains("\"Trucks, Full\""));
    }

    #[test]
    fn test_empty_csv_report_has_header() {
        let csv = generate_csv_report(&[]).unwrap();
        assert_eq!(csv, "Border,Date,Measure,Value,Average\n");
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_rows()).unwrap();
        assert!(json.contains("\"Border\": \"US-Canada Border\""));
        assert!(json.contains("\"Average\": 8"));
        assert!(!json.contains("\"at\""));
    }

    #[test]
    fn test_write_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.csv");

        write_report(&create_test_rows(), &path, OutputFormat::Csv).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Border,Date,Measure,Value,Average\n"));
        assert_eq!(written.lines().count(), 3);
    }
}
