//! Configuration for experiment sweeps.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::merge_policy::MergePolicy;

/// Buffer sizes are expressed as percentages of this many postings.
pub const DEFAULT_BUFFER_BASE: u64 = 1 << 31;

/// Configuration for a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Buffer capacities to try, as percentages of `buffer_base`.
    pub buffer_percents: Vec<u64>,

    /// Postings corresponding to 100%.
    pub buffer_base: u64,

    /// Policies to compare. Order is kept in the report.
    pub policies: Vec<MergePolicy>,

    /// Thread pool size for concurrent runs.
    /// If None, uses the number of CPU cores.
    pub thread_pool_size: Option<usize>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            buffer_percents: vec![16, 25, 32, 50, 75, 96],
            buffer_base: DEFAULT_BUFFER_BASE,
            policies: MergePolicy::standard_set(),
            thread_pool_size: None,
        }
    }
}

impl SweepConfig {
    /// Set the buffer percentages.
    pub fn with_buffer_percents(mut self, percents: Vec<u64>) -> Self {
        self.buffer_percents = percents;
        self
    }

    /// Set the postings corresponding to 100%.
    pub fn with_buffer_base(mut self, base: u64) -> Self {
        self.buffer_base = base;
        self
    }

    /// Set the policies to compare.
    pub fn with_policies(mut self, policies: Vec<MergePolicy>) -> Self {
        self.policies = policies;
        self
    }

    /// Set the thread pool size.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.thread_pool_size = Some(threads);
        self
    }

    /// Buffer capacities in postings, in configured order.
    pub fn buffer_sizes(&self) -> Vec<u64> {
        self.buffer_percents
            .iter()
            .map(|&p| (self.buffer_base * p) / 100)
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_percents.is_empty() {
            return Err(SimError::config("buffer_percents", "no buffer sizes to sweep"));
        }
        if self.policies.is_empty() {
            return Err(SimError::config("policies", "no policies to compare"));
        }
        if self.thread_pool_size == Some(0) {
            return Err(SimError::config("thread_pool_size", "thread pool cannot be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_buffer_sizes() {
        let config = SweepConfig::default();
        let sizes = config.buffer_sizes();
        assert_eq!(sizes.len(), 6);
        assert_eq!(sizes[0], ((1u64 << 31) * 16) / 100);
        assert_eq!(sizes[5], ((1u64 << 31) * 96) / 100);
    }

    #[test]
    fn test_validate() {
        assert!(SweepConfig::default().validate().is_ok());
        assert!(SweepConfig::default().with_policies(vec![]).validate().is_err());
        assert!(SweepConfig::default().with_threads(0).validate().is_err());
    }
}
