//! Merge policies deciding what to consolidate on every buffer eviction.
//!
//! The set of policies is closed: [`MergePolicy`] is matched exhaustively
//! everywhere, so giving `Prognosticator` a real decision function only
//! touches this module.
//!
//! Policies come in two eviction modes:
//! - **monolithic** ([`MergePolicy::NeverMerge`], [`MergePolicy::AlwaysMerge`],
//!   [`MergePolicy::LogMerge`]): the whole buffer becomes one global segment
//!   and the decision is taken over the global segment history;
//! - **per class** ([`MergePolicy::SkiBased`], [`MergePolicy::Prognosticator`]):
//!   classes are flushed one by one into their own segment lists and the
//!   decision is taken per class.
//!
//! In both modes a decision is "merge the newly flushed segment with the
//! trailing `depth` on-disk segments", plus the consolidation cost of doing so.

pub mod ski_rental;
pub mod telescoping;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cost::{ConsolidationStats, DiskModel};
use crate::error::{Result, SimError};
use crate::term_class::TermClass;

pub use ski_rental::SkiRentalConfig;
pub use telescoping::TelescopingConfig;

/// How a policy evicts the update buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionMode {
    /// Flush the entire buffer into one global segment.
    Monolithic,

    /// Flush classes one at a time, down to a target occupancy.
    PerClass,
}

/// Outcome of one merge decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeDecision {
    /// Trailing on-disk segments merged into the new one.
    pub depth: usize,

    /// Disk work charged for the eviction.
    pub stats: ConsolidationStats,
}

impl MergeDecision {
    /// Merge the incoming segment with the tail of `segments` of length `depth`.
    pub fn merge(segments: &[u64], incoming: u64, depth: usize) -> Result<Self> {
        let keep = segments.len().checked_sub(depth).ok_or_else(|| {
            SimError::contract(format!(
                "merge depth {depth} exceeds segment count {}",
                segments.len()
            ))
        })?;
        Ok(MergeDecision {
            depth,
            stats: ConsolidationStats::merge(incoming, &segments[keep..]),
        })
    }

    /// Flush the incoming segment without merging.
    pub fn flush(incoming: u64) -> Self {
        MergeDecision {
            depth: 0,
            stats: ConsolidationStats::write_back(incoming),
        }
    }
}

/// A compaction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergePolicy {
    /// Keep every flushed segment separate.
    NeverMerge,

    /// Consolidate the whole history on every eviction.
    AlwaysMerge,

    /// Telescoping merge keeping segment sizes roughly geometric.
    LogMerge(TelescopingConfig),

    /// Online rent-vs-buy merge per term class.
    SkiBased(SkiRentalConfig),

    /// Forecast-driven merge per term class. Declared, not yet available.
    Prognosticator,
}

impl MergePolicy {
    /// Telescoping merge with the default ratio.
    pub fn log_merge() -> Self {
        MergePolicy::LogMerge(TelescopingConfig::default())
    }

    /// Ski-rental merge with the default token rate.
    pub fn ski_based() -> Self {
        MergePolicy::SkiBased(SkiRentalConfig::default())
    }

    /// The four policies that can currently be simulated.
    pub fn standard_set() -> Vec<MergePolicy> {
        vec![
            MergePolicy::NeverMerge,
            MergePolicy::AlwaysMerge,
            MergePolicy::log_merge(),
            MergePolicy::ski_based(),
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            MergePolicy::NeverMerge => "NeverMerge",
            MergePolicy::AlwaysMerge => "AlwaysMerge",
            MergePolicy::LogMerge(_) => "LogMerge",
            MergePolicy::SkiBased(_) => "SkiBased",
            MergePolicy::Prognosticator => "Prognosticator",
        }
    }

    pub fn mode(&self) -> EvictionMode {
        match self {
            MergePolicy::NeverMerge | MergePolicy::AlwaysMerge | MergePolicy::LogMerge(_) => {
                EvictionMode::Monolithic
            }
            MergePolicy::SkiBased(_) | MergePolicy::Prognosticator => EvictionMode::PerClass,
        }
    }

    /// Check the policy parameters.
    pub fn validate(&self) -> Result<()> {
        match self {
            MergePolicy::NeverMerge | MergePolicy::AlwaysMerge | MergePolicy::Prognosticator => {
                Ok(())
            }
            MergePolicy::LogMerge(config) => config.validate(),
            MergePolicy::SkiBased(config) => config.validate(),
        }
    }

    /// Decide a monolithic eviction of `incoming` postings against the
    /// global segment history.
    pub fn decide_global(&self, segments: &[u64], incoming: u64) -> Result<MergeDecision> {
        match self {
            MergePolicy::NeverMerge => Ok(MergeDecision::flush(incoming)),
            MergePolicy::AlwaysMerge => MergeDecision::merge(segments, incoming, segments.len()),
            MergePolicy::LogMerge(config) => {
                let depth = config.carry_depth(segments, incoming);
                MergeDecision::merge(segments, incoming, depth)
            }
            MergePolicy::SkiBased(_) | MergePolicy::Prognosticator => {
                Err(SimError::contract(format!(
                    "{} evicts per term class, not monolithically",
                    self.name()
                )))
            }
        }
    }

    /// Decide the eviction of `incoming` postings of `class` into its own
    /// segment list. May update the class's rent account.
    pub fn decide_class(
        &self,
        class: &mut TermClass,
        incoming: u64,
        disk: &DiskModel,
    ) -> Result<MergeDecision> {
        match self {
            MergePolicy::SkiBased(config) => config.decide(class, incoming, disk),
            MergePolicy::Prognosticator => Err(SimError::not_implemented(
                "the Prognosticator merge policy has no decision function yet",
            )),
            MergePolicy::NeverMerge | MergePolicy::AlwaysMerge | MergePolicy::LogMerge(_) => {
                Err(SimError::contract(format!(
                    "{} evicts monolithically, not per term class",
                    self.name()
                )))
            }
        }
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk() -> DiskModel {
        DiskModel::new(150.0, 7.0, 4)
    }

    #[test]
    fn test_modes() {
        assert_eq!(MergePolicy::NeverMerge.mode(), EvictionMode::Monolithic);
        assert_eq!(MergePolicy::AlwaysMerge.mode(), EvictionMode::Monolithic);
        assert_eq!(MergePolicy::log_merge().mode(), EvictionMode::Monolithic);
        assert_eq!(MergePolicy::ski_based().mode(), EvictionMode::PerClass);
        assert_eq!(MergePolicy::Prognosticator.mode(), EvictionMode::PerClass);
    }

    #[test]
    fn test_never_merge_flushes() {
        let decision = MergePolicy::NeverMerge
            .decide_global(&[100, 50, 10], 20)
            .unwrap();
        assert_eq!(decision, MergeDecision::flush(20));
    }

    #[test]
    fn test_always_merge_reads_everything() {
        let decision = MergePolicy::AlwaysMerge
            .decide_global(&[100, 50], 20)
            .unwrap();
        assert_eq!(decision.depth, 2);
        assert_eq!(decision.stats.read.postings, 150);
        assert_eq!(decision.stats.read.seeks, 2);
        assert_eq!(decision.stats.write.postings, 170);

        let first = MergePolicy::AlwaysMerge.decide_global(&[], 20).unwrap();
        assert_eq!(first, MergeDecision::flush(20));
    }

    #[test]
    fn test_modes_are_not_interchangeable() {
        let mut class = TermClass::new(0, 1, 1, 1);
        let err = MergePolicy::NeverMerge
            .decide_class(&mut class, 10, &disk())
            .unwrap_err();
        assert!(matches!(err, SimError::Contract(_)));

        let err = MergePolicy::ski_based().decide_global(&[], 10).unwrap_err();
        assert!(matches!(err, SimError::Contract(_)));
    }

    #[test]
    fn test_prognosticator_is_not_implemented() {
        let mut class = TermClass::new(0, 1, 1, 1);
        let err = MergePolicy::Prognosticator
            .decide_class(&mut class, 10, &disk())
            .unwrap_err();
        assert!(matches!(err, SimError::NotImplemented(_)));
    }

    #[test]
    fn test_merge_depth_beyond_history() {
        assert!(MergeDecision::merge(&[1, 2], 3, 3).is_err());
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_string(&MergePolicy::log_merge()).unwrap();
        assert_eq!(json, r#"{"kind":"log_merge","ratio":1.0}"#);

        let policy: MergePolicy = serde_json::from_str(r#"{"kind":"never_merge"}"#).unwrap();
        assert_eq!(policy, MergePolicy::NeverMerge);
    }
}
