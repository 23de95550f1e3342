//! Record aggregation into per-period group sums.
//!
//! Records are folded into a [`GroupStore`] addressed by
//! `[border, measure, period]`. Zero and non-numeric values add nothing,
//! but the group they name still exists.

use crate::error::{StatsError, StoreError};
use crate::models::{GroupKey, PeriodCounts, Record, Segment};
use crate::store::{GroupStore, Policy, SetOutcome};
use chrono::NaiveDateTime;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Summed counts for every (border, measure, period) group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupSums {
    store: GroupStore<Segment, u64>,
    labels: BTreeMap<NaiveDateTime, String>,
    records: usize,
    skipped: usize,
}

impl GroupSums {
    /// The underlying store.
    pub fn store(&self) -> &GroupStore<Segment, u64> {
        &self.store
    }

    /// Sum for one group, if it exists.
    pub fn get(&self, key: &GroupKey) -> Option<u64> {
        self.store.get_path(&key.path()).ok().copied()
    }

    /// Every group with its sum, ordered by border, measure, then period.
    pub fn groups(&self) -> Vec<(GroupKey, u64)> {
        self.store
            .leaves()
            .into_iter()
            .filter_map(|(path, sum)| GroupKey::from_path(&path).map(|key| (key, *sum)))
            .collect()
    }

    /// The input spelling of a period.
    pub fn label(&self, at: &NaiveDateTime) -> Option<&str> {
        self.labels.get(at).map(String::as_str)
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Records folded in.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Records whose value was zero or non-numeric.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Number of distinct (border, measure) series.
    pub fn series_count(&self) -> usize {
        let Ok(borders) = self.store.children(&[]) else {
            return 0;
        };
        borders
            .into_iter()
            .map(|border| {
                self.store
                    .children(std::slice::from_ref(border))
                    .map(|measures| measures.len())
                    .unwrap_or(0)
            })
            .sum()
    }

    /// Distinct periods per measure, across all borders.
    pub fn period_counts(&self) -> PeriodCounts {
        let mut periods: BTreeMap<String, BTreeSet<NaiveDateTime>> = BTreeMap::new();
        for (key, _) in self.groups() {
            periods.entry(key.measure).or_default().insert(key.date);
        }
        PeriodCounts(
            periods
                .into_iter()
                .map(|(measure, dates)| (measure, dates.len()))
                .collect(),
        )
    }

    /// Keep the smallest spelling of a period so the choice is order-independent.
    fn note_label(&mut self, at: NaiveDateTime, text: &str) {
        self.labels
            .entry(at)
            .and_modify(|existing| {
                if text < existing.as_str() {
                    *existing = text.to_string();
                }
            })
            .or_insert_with(|| text.to_string());
    }

    /// Merge a finalized shard into these sums.
    ///
    /// Each shard's borders are locked once merged, so a later shard that
    /// touches the same subtree is refused and reported as a conflict.
    fn absorb(&mut self, shard: GroupSums) -> Result<(), StatsError> {
        let report = self
            .store
            .merge(&shard.store, Policy::Always, Policy::Unlocked, Policy::Never)?;
        if report.refused() > 0 {
            return Err(StatsError::ShardConflict {
                rejected: report.refused(),
            });
        }

        for border in shard.store.children(&[])? {
            self.store.lock(std::slice::from_ref(border), true)?;
        }

        for (at, text) in &shard.labels {
            self.note_label(*at, text);
        }
        self.records += shard.records;
        self.skipped += shard.skipped;
        Ok(())
    }
}

/// Accumulates records into group sums.
#[derive(Debug, Default)]
pub struct Aggregator {
    sums: GroupSums,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record into its group.
    pub fn add(&mut self, record: &Record) -> Result<(), StatsError> {
        let path = record.key().path();
        let current = match self.sums.store.get_path(&path) {
            Ok(sum) => *sum,
            Err(StoreError::KeyNotFound { .. }) => 0,
            Err(e) => return Err(e.into()),
        };

        if record.is_skipped() {
            self.sums.skipped += 1;
        }

        let sum = current
            .checked_add(record.contribution())
            .ok_or_else(|| StatsError::Overflow {
                border: record.border.clone(),
                measure: record.measure.clone(),
                period: record.date_text.clone(),
            })?;

        let outcome = self.sums.store.set_path(&path, sum, true, false)?;
        if outcome == SetOutcome::Rejected {
            return Err(StatsError::ShardConflict { rejected: 1 });
        }

        self.sums.note_label(record.date, &record.date_text);
        self.sums.records += 1;
        Ok(())
    }

    /// Finish aggregation. The returned sums are locked against further changes.
    pub fn finish(mut self) -> GroupSums {
        self.sums.store.lock_all(true);
        self.sums
    }
}

/// Aggregate records sequentially.
pub fn aggregate<'a, I>(records: I) -> Result<GroupSums, StatsError>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut aggregator = Aggregator::new();
    for record in records {
        aggregator.add(record)?;
    }
    let sums = aggregator.finish();
    debug!(
        "Aggregated {} records into {} groups",
        sums.records(),
        sums.len()
    );
    Ok(sums)
}

/// Aggregate records across `shards` parallel workers.
///
/// Records are partitioned by border, so every (border, measure, period)
/// group lives in exactly one shard. Shards are merged only after all of
/// them are finished.
pub fn aggregate_sharded(records: &[Record], shards: usize) -> Result<GroupSums, StatsError> {
    if shards <= 1 {
        return aggregate(records);
    }

    let mut assignment: BTreeMap<&str, usize> = BTreeMap::new();
    let mut buckets: Vec<Vec<&Record>> = vec![Vec::new(); shards];
    for record in records {
        let next = assignment.len() % shards;
        let shard = *assignment.entry(record.border.as_str()).or_insert(next);
        buckets[shard].push(record);
    }

    info!(
        "Aggregating {} records across {} shards ({} borders)",
        records.len(),
        shards,
        assignment.len()
    );

    let partials: Vec<Result<GroupSums, StatsError>> = buckets
        .into_par_iter()
        .map(|bucket| aggregate(bucket))
        .collect();

    let mut merged = GroupSums::default();
    for partial in partials {
        merged.absorb(partial?)?;
    }
    merged.store.lock_all(true);

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(border: &str, day: u32, month: u32, measure: &str, value: Option<u64>) -> Record {
        Record {
            border: border.to_string(),
            date: NaiveDate::from_ymd_opt(2019, month, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            date_text: format!("{:02}/{:02}/2019", day, month),
            measure: measure.to_string(),
            value,
        }
    }

    fn key(border: &str, day: u32, month: u32, measure: &str) -> GroupKey {
        record(border, day, month, measure, None).key()
    }

    fn sample() -> Vec<Record> {
        vec![
            record("US-Canada Border", 1, 1, "Trains", Some(5)),
            record("US-Canada Border", 1, 1, "Trains", Some(3)),
            record("US-Canada Border", 1, 2, "Trains", Some(20)),
            record("US-Mexico Border", 1, 2, "Pedestrians", Some(100)),
            record("US-Mexico Border", 1, 2, "Pedestrians", None),
            record("US-Mexico Border", 1, 3, "Trucks", Some(0)),
            record("US-Mexico Border", 1, 3, "Pedestrians", Some(7)),
        ]
    }

    #[test]
    fn test_sums_per_group() {
        let sums = aggregate(&sample()).unwrap();

        assert_eq!(sums.len(), 5);
        assert_eq!(sums.records(), 7);
        assert_eq!(sums.get(&key("US-Canada Border", 1, 1, "Trains")), Some(8));
        assert_eq!(sums.get(&key("US-Canada Border", 1, 2, "Trains")), Some(20));
        assert_eq!(
            sums.get(&key("US-Mexico Border", 1, 2, "Pedestrians")),
            Some(100)
        );
    }

    #[test]
    fn test_zero_and_non_numeric_values_add_nothing() {
        let sums = aggregate(&sample()).unwrap();

        assert_eq!(sums.skipped(), 2);
        // The group survives even though its only record was zero.
        assert_eq!(sums.get(&key("US-Mexico Border", 1, 3, "Trucks")), Some(0));
    }

    #[test]
    fn test_overflowing_sum_is_an_error() {
        let records = vec![
            record("B", 1, 1, "Trains", Some(u64::MAX)),
            record("B", 1, 1, "Trains", Some(1)),
        ];
        let err = aggregate(&records).unwrap_err();
        assert!(matches!(err, StatsError::Overflow { ref border, .. } if border == "B"));

        // Separate groups near the limit are fine.
        let records = vec![
            record("B", 1, 1, "Trains", Some(u64::MAX)),
            record("B", 1, 2, "Trains", Some(1)),
        ];
        let sums = aggregate(&records).unwrap();
        assert_eq!(sums.get(&key("B", 1, 1, "Trains")), Some(u64::MAX));
    }

    #[test]
    fn test_empty_input() {
        let records: Vec<Record> = Vec::new();
        let sums = aggregate(&records).unwrap();
        assert!(sums.is_empty());
        assert_eq!(sums.series_count(), 0);
        assert_eq!(sums.period_counts(), PeriodCounts::default());
    }

    #[test]
    fn test_order_independent() {
        let records = sample();
        let forward = aggregate(&records).unwrap();

        let mut reversed = records.clone();
        reversed.reverse();
        assert_eq!(aggregate(&reversed).unwrap(), forward);

        let mut rotated = records.clone();
        rotated.rotate_left(3);
        assert_eq!(aggregate(&rotated).unwrap(), forward);
    }

    #[test]
    fn test_label_choice_is_order_independent() {
        let mut a = record("B", 1, 1, "M", Some(1));
        a.date_text = "01/01/2019 12:00:00 AM".to_string();
        let mut b = record("B", 1, 1, "M", Some(1));
        b.date_text = "01/01/2019".to_string();

        let first = aggregate(&[a.clone(), b.clone()]).unwrap();
        let second = aggregate(&[b, a]).unwrap();
        assert_eq!(first.label(&key("B", 1, 1, "M").date), Some("01/01/2019"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_finished_sums_are_locked() {
        let sums = aggregate(&sample()).unwrap();
        let path = key("US-Canada Border", 1, 1, "Trains").path();
        assert!(sums.store().is_locked(&path));
    }

    #[test]
    fn test_series_and_period_counts() {
        let sums = aggregate(&sample()).unwrap();

        assert_eq!(sums.series_count(), 3);
        let counts = sums.period_counts();
        assert_eq!(counts.get("Trains"), Some(2));
        assert_eq!(counts.get("Pedestrians"), Some(2));
        assert_eq!(counts.get("Trucks"), Some(1));
        assert_eq!(counts.uniform(), None);
    }

    #[test]
    fn test_sharded_matches_sequential() {
        let mut records = sample();
        records.push(record("Other Border", 1, 1, "Buses", Some(4)));
        records.push(record("Other Border", 1, 2, "Buses", Some(6)));

        let sequential = aggregate(&records).unwrap();
        for shards in 2..=4 {
            let sharded = aggregate_sharded(&records, shards).unwrap();
            assert_eq!(sharded.groups(), sequential.groups());
            assert_eq!(sharded.records(), sequential.records());
            assert_eq!(sharded.skipped(), sequential.skipped());
        }
    }

    #[test]
    fn test_absorb_rejects_overlapping_shard() {
        let first = aggregate(&[record("B", 1, 1, "M", Some(1))]).unwrap();
        let overlapping = aggregate(&[record("B", 1, 1, "M", Some(2))]).unwrap();

        let mut merged = GroupSums::default();
        merged.absorb(first).unwrap();
        let err = merged.absorb(overlapping).unwrap_err();
        assert_eq!(err, StatsError::ShardConflict { rejected: 1 });
        assert_eq!(merged.get(&key("B", 1, 1, "M")), Some(1));
    }
}
