//! Statistics pipeline.
//!
//! Records are aggregated into group sums, every group receives the
//! average of its earlier periods, and the rows are ranked for output.

pub mod aggregator;
pub mod history;
pub mod ranking;

pub use aggregator::{aggregate, aggregate_sharded, GroupSums};
pub use history::historical_averages;
pub use ranking::rank;

use crate::error::StatsError;
use crate::models::{Record, ResultRow, RunSummary};
use tracing::info;

/// Ranked rows plus the figures describing how they were produced.
#[derive(Debug, Clone)]
pub struct Statistics {
    pub rows: Vec<ResultRow>,
    pub summary: RunSummary,
}

/// Run the full pipeline over a complete set of records.
///
/// Aggregation finishes before any average is computed.
pub fn compute(records: &[Record], shards: usize) -> Result<Statistics, StatsError> {
    let sums = aggregate_sharded(records, shards)?;

    let mut rows = historical_averages(&sums)?;
    rank(&mut rows);

    let summary = RunSummary {
        records: sums.records(),
        skipped_values: sums.skipped(),
        groups: sums.len(),
        series: sums.series_count(),
        period_counts: sums.period_counts(),
    };

    info!(
        "Computed {} rows from {} records ({} series)",
        rows.len(),
        summary.records,
        summary.series
    );

    Ok(Statistics { rows, summary })
}
