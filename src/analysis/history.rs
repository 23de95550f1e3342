//! Historical averages over earlier periods.
//!
//! For every (border, measure) series the periods are taken in
//! chronological order; each period's average is the rounded mean of the
//! sums of all strictly earlier periods of the same series, or 0 for the
//! first one.

use super::aggregator::GroupSums;
use crate::error::StatsError;
use crate::models::{GroupKey, ResultRow};
use chrono::NaiveDateTime;
use tracing::debug;

/// Mean of `count` values summing to `total`, rounded half up.
///
/// Computed in integers: `floor(total / count + 1/2)`. The total is a
/// `u128` so summing many `u64` period sums cannot overflow.
pub fn rounded_mean(total: u128, count: u64) -> u64 {
    if count == 0 {
        return 0;
    }
    let count = u128::from(count);
    let mean = total / count + u128::from(total % count * 2 >= count);
    u64::try_from(mean).unwrap_or(u64::MAX)
}

/// The periods of one (border, measure) pair, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    pub border: String,
    pub measure: String,
    pub periods: Vec<(NaiveDateTime, u64)>,
}

impl Series {
    /// Average of the strictly earlier periods, for every period in order.
    pub fn prior_averages(&self) -> Result<Vec<u64>, StatsError> {
        if self.periods.is_empty() {
            return Err(StatsError::EmptySeries {
                border: self.border.clone(),
                measure: self.measure.clone(),
            });
        }

        let mut total = 0u128;
        let mut averages = Vec::with_capacity(self.periods.len());
        for (seen, (_, sum)) in self.periods.iter().enumerate() {
            averages.push(rounded_mean(total, seen as u64));
            total += u128::from(*sum);
        }
        Ok(averages)
    }
}

/// Split group sums into series, ordered by border then measure.
pub fn series(sums: &GroupSums) -> Vec<Series> {
    let mut out: Vec<Series> = Vec::new();

    for (GroupKey { border, measure, date }, sum) in sums.groups() {
        match out.last_mut() {
            Some(current) if current.border == border && current.measure == measure => {
                current.periods.push((date, sum));
            }
            _ => out.push(Series {
                border,
                measure,
                periods: vec![(date, sum)],
            }),
        }
    }

    out
}

/// One result row per group, carrying its historical average.
pub fn historical_averages(sums: &GroupSums) -> Result<Vec<ResultRow>, StatsError> {
    let all = series(sums);
    let mut rows = Vec::with_capacity(sums.len());

    for series in &all {
        let averages = series.prior_averages()?;
        for ((at, value), average) in series.periods.iter().zip(averages) {
            rows.push(ResultRow {
                border: series.border.clone(),
                date: period_label(sums, at),
                measure: series.measure.clone(),
                value: *value,
                average,
                at: *at,
            });
        }
    }

    debug!("Computed averages for {} series", all.len());
    Ok(rows)
}

fn period_label(sums: &GroupSums, at: &NaiveDateTime) -> String {
    sums.label(at)
        .map(str::to_string)
        .unwrap_or_else(|| at.format("%d/%m/%Y %I:%M:%S %p").to_string())
}
