//! Result of one simulation run.

use serde::{Deserialize, Serialize};

/// Totals of a finished run, with all costs in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Name of the merge policy.
    pub policy: String,

    /// Disk label.
    pub disk: String,

    /// Update buffer capacity in postings.
    pub buffer_postings: u64,

    /// Number of buffer evictions.
    pub evictions: u64,

    /// Postings ingested (buffered plus evicted).
    pub seen_postings: u64,

    /// Queries issued.
    pub queries: u64,

    /// Disk time spent answering queries.
    pub query_minutes: f64,

    /// Disk time spent flushing and merging segments.
    pub merge_minutes: f64,

    /// Sum of query and merge time.
    pub total_minutes: f64,
}

impl Report {
    /// Share of the total cost spent on merges, in `[0, 1]`.
    pub fn merge_share(&self) -> f64 {
        if self.total_minutes > 0.0 {
            self.merge_minutes / self.total_minutes
        } else {
            0.0
        }
    }
}
