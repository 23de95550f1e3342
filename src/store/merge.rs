//! Structural merge of two group stores.

use super::{GroupStore, SetOutcome, Slot};
use crate::error::{describe_path, StoreError};
use std::fmt;
use tracing::debug;

/// Permission for one kind of merge step, decided per leaf path.
pub enum Policy<'a, K, V> {
    Always,
    Never,
    /// Allowed only where the receiving path is not locked.
    Unlocked,
    /// Decided by a predicate over the leaf path and the receiving store.
    When(&'a dyn Fn(&[K], &GroupStore<K, V>) -> bool),
}

impl<K, V> From<bool> for Policy<'_, K, V> {
    fn from(allowed: bool) -> Self {
        if allowed {
            Policy::Always
        } else {
            Policy::Never
        }
    }
}

impl<K, V> fmt::Debug for Policy<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Always => write!(f, "Always"),
            Policy::Never => write!(f, "Never"),
            Policy::Unlocked => write!(f, "Unlocked"),
            Policy::When(_) => write!(f, "When(..)"),
        }
    }
}

impl<K, V> Policy<'_, K, V>
where
    K: Ord + Clone + fmt::Display,
    V: Clone + PartialEq,
{
    pub fn allows(&self, path: &[K], store: &GroupStore<K, V>) -> bool {
        match self {
            Policy::Always => true,
            Policy::Never => false,
            Policy::Unlocked => !store.is_locked(path),
            Policy::When(predicate) => predicate(path, store),
        }
    }
}

/// Counts of what a merge did with each leaf of the incoming store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Leaves added at paths the receiver did not have.
    pub inserted: usize,
    /// Leaves that replaced a different value.
    pub overwritten: usize,
    /// Leaves already present with an equal value.
    pub unchanged: usize,
    /// Leaves refused by a lock in the receiver.
    pub rejected: usize,
    /// Leaves the extend or overwrite policy declined.
    pub skipped: usize,
}

impl MergeReport {
    /// Leaves that did not end up in the receiver.
    pub fn refused(&self) -> usize {
        self.rejected + self.skipped
    }
}

/// What a merge will do with one leaf of the incoming store.
enum Step {
    Unchanged,
    Skip,
    Insert,
    Overwrite { restructure: bool },
}

impl<K, V> GroupStore<K, V>
where
    K: Ord + Clone + fmt::Display,
    V: Clone + PartialEq,
{
    /// Merge every leaf of `other` into this store.
    ///
    /// Leaves missing here are inserted when `extend` allows. Leaves that
    /// differ, or whose path is blocked by a value, are replaced when
    /// `overwrite` allows; a blocked path additionally needs `restructure`,
    /// otherwise the merge fails with [`StoreError::PathBlocked`].
    ///
    /// Policies are evaluated against the store as it was before the merge,
    /// and a failing merge leaves the store untouched.
    pub fn merge(
        &mut self,
        other: &GroupStore<K, V>,
        extend: Policy<'_, K, V>,
        overwrite: Policy<'_, K, V>,
        restructure: Policy<'_, K, V>,
    ) -> Result<MergeReport, StoreError> {
        let mut plan = Vec::new();
        for (path, value) in other.leaves() {
            let step = match self.slot(&path, value) {
                Slot::Equal => Step::Unchanged,
                Slot::Vacant if extend.allows(&path, self) => Step::Insert,
                Slot::Different if overwrite.allows(&path, self) => Step::Overwrite {
                    restructure: false,
                },
                Slot::Blocked if overwrite.allows(&path, self) => {
                    if !restructure.allows(&path, self) {
                        let depth = self.blocking_depth(&path).unwrap_or(0);
                        return Err(StoreError::PathBlocked {
                            path: describe_path(&path[..=depth]),
                        });
                    }
                    Step::Overwrite { restructure: true }
                }
                Slot::Vacant | Slot::Different | Slot::Blocked => Step::Skip,
            };
            plan.push((path, value, step));
        }

        let mut report = MergeReport::default();
        for (path, value, step) in plan {
            let (restructure, counter) = match step {
                Step::Unchanged => {
                    report.unchanged += 1;
                    continue;
                }
                Step::Skip => {
                    report.skipped += 1;
                    continue;
                }
                Step::Insert => (false, &mut report.inserted),
                Step::Overwrite { restructure } => (restructure, &mut report.overwritten),
            };
            match self.set_path(&path, value.clone(), true, restructure)? {
                SetOutcome::Rejected => report.rejected += 1,
                _ => *counter += 1,
            }
        }

        debug!("Merge finished: {:?}", report);
        Ok(report)
    }
}
