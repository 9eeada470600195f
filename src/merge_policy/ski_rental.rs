//! Ski-rental merge: an online rent-vs-buy decision per term class.
//!
//! Renting is paying one extra seek per query for every un-merged trailing
//! segment. Buying is paying the one-time read and write of merging them.
//! Seeks paid as rent are converted into tokens; on eviction the class buys
//! the deepest merge its tokens can cover and spends exactly that merge's
//! premium over the mandatory write-back.

use serde::{Deserialize, Serialize};

use crate::cost::{ConsolidationStats, DiskModel, ReadIo};
use crate::error::{Result, SimError};
use crate::merge_policy::MergeDecision;
use crate::term_class::TermClass;

/// Parameters of the ski-rental merge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkiRentalConfig {
    /// Tokens earned per minute of rent paid. Must be positive.
    pub token_rate: f64,
}

impl Default for SkiRentalConfig {
    fn default() -> Self {
        SkiRentalConfig { token_rate: 1.0 }
    }
}

impl SkiRentalConfig {
    pub fn new(token_rate: f64) -> Self {
        SkiRentalConfig { token_rate }
    }

    pub fn validate(&self) -> Result<()> {
        if self.token_rate > 0.0 && self.token_rate.is_finite() {
            Ok(())
        } else {
            Err(SimError::config(
                "token_rate",
                format!("token rate must be positive and finite, got {}", self.token_rate),
            ))
        }
    }

    /// Tokens bought by `rent_seeks` seeks of rent.
    pub fn tokens_for(&self, rent_seeks: u64, disk: &DiskModel) -> f64 {
        self.token_rate * disk.cost_in_minutes(ReadIo::new(0, rent_seeks))
    }

    /// Decide the eviction of `incoming` postings of `class`.
    pub fn decide(
        &self,
        class: &mut TermClass,
        incoming: u64,
        disk: &DiskModel,
    ) -> Result<MergeDecision> {
        let account = class.account_mut();
        let rent_seeks = std::mem::take(&mut account.rent_seeks);
        account.tokens += self.tokens_for(rent_seeks, disk);

        if class.segments().len() < 2 {
            return Ok(MergeDecision::flush(incoming));
        }

        let prices = price_vector(class.segments(), incoming, disk);
        let floor = prices[0];
        let tokens = class.account().tokens;

        // prices[0] - floor is zero, so at least one depth is affordable.
        let depth = prices.partition_point(|&price| price - floor <= tokens) - 1;
        let decision = MergeDecision::merge(class.segments(), incoming, depth)?;

        let account = class.account_mut();
        account.tokens = (account.tokens - (prices[depth] - floor)).max(0.0);

        log::trace!(
            "ski-rental class {}: depth {} of {}, tokens left {:.6}",
            class.id(),
            depth,
            prices.len() - 1,
            class.account().tokens
        );
        Ok(decision)
    }
}

/// Minutes of merging the incoming segment with the trailing `d` on-disk
/// segments, for `d` in `0..=segments.len()`. Entry 0 is the write-back
/// floor; the vector is non-decreasing.
pub fn price_vector(segments: &[u64], incoming: u64, disk: &DiskModel) -> Vec<f64> {
    let n = segments.len();
    (0..=n)
        .map(|depth| ConsolidationStats::merge(incoming, &segments[n - depth..]).minutes(disk))
        .collect()
}
