//! Data models for border crossing statistics.
//!
//! This module contains the records read from the input, the keys used
//! to group them, and the rows written to the output.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// One input row: a count of crossings at a border for a measure and period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Border name, e.g. `US-Canada Border`.
    pub border: String,
    /// Parsed timestamp of the period.
    pub date: NaiveDateTime,
    /// The date exactly as it appeared in the input.
    pub date_text: String,
    /// Traffic measure, e.g. `Trucks` or `Pedestrians`.
    pub measure: String,
    /// Crossing count, `None` when the input held a non-numeric value.
    pub value: Option<u64>,
}

impl Record {
    /// The amount this record adds to its group sum.
    ///
    /// Zero and non-numeric values contribute nothing.
    pub fn contribution(&self) -> u64 {
        self.value.unwrap_or(0)
    }

    /// Whether the value is skipped by aggregation.
    pub fn is_skipped(&self) -> bool {
        self.contribution() == 0
    }

    pub fn key(&self) -> GroupKey {
        GroupKey {
            border: self.border.clone(),
            measure: self.measure.clone(),
            date: self.date,
        }
    }
}

/// Parse a raw count. Anything that is not a plain unsigned integer is `None`.
pub fn parse_count(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// One segment of a group store path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    /// A border or measure name.
    Name(String),
    /// A reporting period.
    Period(NaiveDateTime),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Name(name) => write!(f, "{}", name),
            Segment::Period(at) => write!(f, "{}", at.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Identifies one aggregation bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub border: String,
    pub measure: String,
    pub date: NaiveDateTime,
}

impl GroupKey {
    /// Store path for this key: `[border, measure, period]`.
    pub fn path(&self) -> [Segment; 3] {
        [
            Segment::Name(self.border.clone()),
            Segment::Name(self.measure.clone()),
            Segment::Period(self.date),
        ]
    }

    /// Rebuild a key from a store path. Paths of any other shape yield `None`.
    pub fn from_path(path: &[Segment]) -> Option<Self> {
        match path {
            [Segment::Name(border), Segment::Name(measure), Segment::Period(date)] => Some(Self {
                border: border.clone(),
                measure: measure.clone(),
                date: *date,
            }),
            _ => None,
        }
    }
}

/// One output row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultRow {
    pub border: String,
    /// Period label, rendered as it appeared in the input.
    pub date: String,
    pub measure: String,
    /// Sum of the period's counts.
    pub value: u64,
    /// Rounded mean of all earlier period sums for the same border and measure.
    pub average: u64,
    /// Parsed period, used for ordering.
    #[serde(skip)]
    pub at: NaiveDateTime,
}

/// Number of distinct periods reported for each measure.
///
/// Measures are not always reported every period, so this is a map even
/// when every measure happens to share the same count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PeriodCounts(pub BTreeMap<String, usize>);

impl PeriodCounts {
    /// The shared period count when every measure has the same one.
    pub fn uniform(&self) -> Option<usize> {
        let mut counts = self.0.values();
        let first = *counts.next()?;
        counts.all(|c| *c == first).then_some(first)
    }

    pub fn get(&self, measure: &str) -> Option<usize> {
        self.0.get(measure).copied()
    }
}

/// Figures reported after a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Records read from the input.
    pub records: usize,
    /// Records whose value was zero or non-numeric.
    pub skipped_values: usize,
    /// Distinct (border, measure, date) groups.
    pub groups: usize,
    /// Distinct (border, measure) series.
    pub series: usize,
    /// Distinct periods per measure.
    pub period_counts: PeriodCounts,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("42"), Some(42));
        assert_eq!(parse_count(" 7 "), Some(7));
        assert_eq!(parse_count("0"), Some(0));
        assert_eq!(parse_count("-3"), None);
        assert_eq!(parse_count("4.5"), None);
        assert_eq!(parse_count("n/a"), None);
        assert_eq!(parse_count(""), None);
    }

    #[test]
    fn test_record_contribution() {
        let mut record = Record {
            border: "US-Canada Border".to_string(),
            date: at(2019, 1, 1),
            date_text: "01/01/2019".to_string(),
            measure: "Trains".to_string(),
            value: Some(5),
        };
        assert_eq!(record.contribution(), 5);
        assert!(!record.is_skipped());

        record.value = Some(0);
        assert!(record.is_skipped());

        record.value = None;
        assert_eq!(record.contribution(), 0);
        assert!(record.is_skipped());
    }

    #[test]
    fn test_group_key_path_round_trip() {
        let key = GroupKey {
            border: "US-Mexico Border".to_string(),
            measure: "Pedestrians".to_string(),
            date: at(2019, 3, 1),
        };
        assert_eq!(GroupKey::from_path(&key.path()), Some(key));
        assert_eq!(
            GroupKey::from_path(&[Segment::Name("x".to_string())]),
            None
        );
    }

    #[test]
    fn test_segment_display() {
        assert_eq!(Segment::Name("Trucks".to_string()).to_string(), "Trucks");
        assert_eq!(
            Segment::Period(at(2019, 2, 1)).to_string(),
            "2019-02-01 00:00:00"
        );
    }

    #[test]
    fn test_period_counts_uniform() {
        let mut counts = PeriodCounts::default();
        assert_eq!(counts.uniform(), None);

        counts.0.insert("Trains".to_string(), 3);
        counts.0.insert("Trucks".to_string(), 3);
        assert_eq!(counts.uniform(), Some(3));

        counts.0.insert("Buses".to_string(), 2);
        assert_eq!(counts.uniform(), None);
        assert_eq!(counts.get("Buses"), Some(2));
    }

    #[test]
    fn test_result_row_serializes_in_column_order() {
        let row = ResultRow {
            border: "US-Canada Border".to_string(),
            date: "01/02/2019".to_string(),
            measure: "Trains".to_string(),
            value: 20,
            average: 8,
            at: at(2019, 2, 1),
        };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(
            json,
            r#"{"Border":"US-Canada Border","Date":"01/02/2019","Measure":"Trains","Value":20,"Average":8}"#
        );
    }
}
