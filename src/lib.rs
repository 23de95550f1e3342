//! Crossstat - border crossing statistics.
//!
//! Aggregates per-crossing count records into monthly sums per border
//! and measure, and pairs each sum with the rounded average of all
//! earlier months of the same series.

pub mod analysis;
pub mod error;
pub mod models;
pub mod reader;
pub mod report;
pub mod store;

pub use analysis::{compute, Statistics};
pub use error::{StatsError, StoreError};
pub use models::{Record, ResultRow, RunSummary};
pub use store::{GroupStore, MergeReport, Policy, SetOutcome};
