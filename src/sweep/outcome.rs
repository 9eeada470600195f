//! Outcomes of sweep runs.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SimError;
use crate::report::Report;

/// Result of one (policy, buffer) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Unique identifier of this run.
    pub run_id: Uuid,

    /// Name of the merge policy.
    pub policy: String,

    /// Update buffer capacity in postings.
    pub buffer_postings: u64,

    /// Report if the run completed.
    pub report: Option<Report>,

    /// Error message if the run failed.
    pub error: Option<String>,

    /// Wall-clock time of the run in milliseconds.
    pub elapsed_ms: u64,
}

impl RunOutcome {
    /// Create a successful outcome.
    pub fn success(policy: String, buffer_postings: u64, report: Report, elapsed: Duration) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            policy,
            buffer_postings,
            report: Some(report),
            error: None,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// Create a failed outcome.
    pub fn failure(policy: String, buffer_postings: u64, error: SimError, elapsed: Duration) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            policy,
            buffer_postings,
            report: None,
            error: Some(error.to_string()),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// Check if the run was successful.
    pub fn is_success(&self) -> bool {
        self.report.is_some() && self.error.is_none()
    }

    /// Total cost in minutes if successful.
    pub fn total_minutes(&self) -> Option<f64> {
        self.report.as_ref().map(|r| r.total_minutes)
    }
}

/// Every outcome of a sweep, ordered by buffer size then policy position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<RunOutcome>,
}

impl SweepReport {
    pub fn successful(&self) -> impl Iterator<Item = &RunOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &RunOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Distinct buffer sizes, in sweep order.
    pub fn buffer_sizes(&self) -> Vec<u64> {
        let mut sizes: Vec<u64> = Vec::new();
        for outcome in &self.outcomes {
            if !sizes.contains(&outcome.buffer_postings) {
                sizes.push(outcome.buffer_postings);
            }
        }
        sizes
    }

    /// Cheapest successful run for a buffer size.
    pub fn best_for_buffer(&self, buffer_postings: u64) -> Option<&RunOutcome> {
        self.successful()
            .filter(|o| o.buffer_postings == buffer_postings)
            .min_by(|a, b| {
                let a = a.total_minutes().unwrap_or(f64::INFINITY);
                let b = b.total_minutes().unwrap_or(f64::INFINITY);
                a.total_cmp(&b)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(policy: &str, total: f64) -> Report {
        Report {
            policy: policy.to_string(),
            disk: "HD".to_string(),
            buffer_postings: 100,
            evictions: 1,
            seen_postings: 100,
            queries: 1,
            query_minutes: total / 2.0,
            merge_minutes: total / 2.0,
            total_minutes: total,
        }
    }

    #[test]
    fn test_best_for_buffer_skips_failures() {
        let sweep = SweepReport {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            outcomes: vec![
                RunOutcome::success("A".into(), 100, report("A", 3.0), Duration::ZERO),
                RunOutcome::failure(
                    "B".into(),
                    100,
                    SimError::not_implemented("B"),
                    Duration::ZERO,
                ),
                RunOutcome::success("C".into(), 100, report("C", 1.5), Duration::ZERO),
                RunOutcome::success("A".into(), 200, report("A", 0.5), Duration::ZERO),
            ],
        };

        assert_eq!(sweep.best_for_buffer(100).unwrap().policy, "C");
        assert_eq!(sweep.best_for_buffer(200).unwrap().policy, "A");
        assert!(sweep.best_for_buffer(300).is_none());
        assert_eq!(sweep.failed().count(), 1);
        assert_eq!(sweep.buffer_sizes(), vec![100, 200]);
    }
}
