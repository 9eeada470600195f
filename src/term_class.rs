//! Term classes: partitions of the key space with their own rates.
//!
//! A [`TermClass`] tracks how many of its postings sit in the update buffer,
//! how many were evicted, and the sizes of its on-disk segments (oldest
//! first). Everything the class ever ingested is either buffered or evicted,
//! and the evicted postings are exactly the sum of its segment sizes.

use serde::{Deserialize, Serialize};

use crate::cost::ReadIo;
use crate::error::{Result, SimError};

/// Default per-tick increment of the slowest class after normalization.
pub const DEFAULT_TARGET_TICK: u64 = 1 << 14;

/// Ski-rental bookkeeping of one class.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RentAccount {
    /// Seeks paid by queries for un-merged segments, not yet converted.
    pub rent_seeks: u64,

    /// Accumulated token balance. Never negative.
    pub tokens: f64,
}

/// Per-class mutable state of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct TermClass {
    id: usize,
    members: u64,
    epoch_updates: u64,
    epoch_queries: u64,
    normalized_updates: u64,
    buffered: u64,
    evicted: u64,
    ingested: u64,
    segments: Vec<u64>,
    account: RentAccount,
}

impl TermClass {
    /// Create a class with raw epoch rates. It must be normalized before it
    /// can take postings.
    pub fn new(id: usize, members: u64, epoch_updates: u64, epoch_queries: u64) -> Self {
        TermClass {
            id,
            members,
            epoch_updates,
            epoch_queries,
            normalized_updates: 0,
            buffered: 0,
            evicted: 0,
            ingested: 0,
            segments: Vec::new(),
            account: RentAccount::default(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn members(&self) -> u64 {
        self.members
    }

    pub fn epoch_updates(&self) -> u64 {
        self.epoch_updates
    }

    pub fn epoch_queries(&self) -> u64 {
        self.epoch_queries
    }

    /// Postings added per round-robin tick.
    pub fn normalized_updates(&self) -> u64 {
        self.normalized_updates
    }

    pub fn buffered(&self) -> u64 {
        self.buffered
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Every posting this class has taken so far.
    pub fn ingested(&self) -> u64 {
        self.ingested
    }

    /// On-disk segment sizes, oldest first.
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    pub fn account(&self) -> &RentAccount {
        &self.account
    }

    pub fn account_mut(&mut self) -> &mut RentAccount {
        &mut self.account
    }

    /// Add one normalized increment to the buffer.
    pub fn add_buffered_postings(&mut self) -> Result<u64> {
        self.add_buffered_postings_capped(u64::MAX)
    }

    /// Add one normalized increment, but never more than `cap` postings.
    pub fn add_buffered_postings_capped(&mut self, cap: u64) -> Result<u64> {
        if self.normalized_updates == 0 {
            return Err(SimError::contract(format!(
                "term class {} was never normalized",
                self.id
            )));
        }
        let added = self.normalized_updates.min(cap);
        self.buffered += added;
        self.ingested += added;
        Ok(added)
    }

    /// Move every buffered posting to the evicted side.
    pub fn evict_all(&mut self) -> u64 {
        let evicted = self.buffered;
        self.evicted += evicted;
        self.buffered = 0;
        evicted
    }

    /// Disk work of one point query against this class: the class's share of
    /// evicted postings plus one probe per on-disk segment.
    pub fn query_cost(&self) -> Result<ReadIo> {
        if self.members == 0 {
            return Err(SimError::contract(format!(
                "term class {} has no members to query",
                self.id
            )));
        }
        Ok(ReadIo::new(
            self.evicted / self.members,
            self.segments.len() as u64,
        ))
    }

    /// Charge a query's probes of un-merged segments as rent.
    pub fn record_query_rent(&mut self) {
        self.account.rent_seeks += self.segments.len().saturating_sub(1) as u64;
    }

    /// Append a fresh on-disk segment.
    pub fn push_segment(&mut self, postings: u64) {
        self.segments.push(postings);
    }

    /// Fold the trailing `depth` segments and the `incoming` postings into
    /// one new segment. Returns the size of the result.
    pub fn merge_tail(&mut self, depth: usize, incoming: u64) -> Result<u64> {
        let keep = self.segments.len().checked_sub(depth).ok_or_else(|| {
            SimError::contract(format!(
                "merge depth {depth} exceeds the {} segments of term class {}",
                self.segments.len(),
                self.id
            ))
        })?;
        let merged = incoming + self.segments.drain(keep..).sum::<u64>();
        self.segments.push(merged);
        Ok(merged)
    }

    /// Rescale raw epoch update rates into per-tick increments. The ratio
    /// between classes is kept and the slowest class advances by about
    /// `target_tick` postings per tick.
    pub fn normalize(classes: &mut [TermClass], target_tick: u64) -> Result<()> {
        let slowest = classes
            .iter()
            .map(|c| c.epoch_updates)
            .min()
            .ok_or_else(|| SimError::contract("no term classes to normalize"))?;
        if slowest == 0 {
            return Err(SimError::contract("cannot normalize a zero update rate"));
        }

        let scale = target_tick as f64 / slowest as f64;
        for class in classes.iter_mut() {
            let increment = (class.epoch_updates as f64 * scale).round() as u64;
            class.normalized_updates = increment.max(1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(members: u64, updates: u64) -> TermClass {
        let mut classes = vec![TermClass::new(0, members, updates, 1)];
        TermClass::normalize(&mut classes, DEFAULT_TARGET_TICK).unwrap();
        classes.remove(0)
    }

    #[test]
    fn test_add_requires_normalization() {
        let mut class = TermClass::new(3, 10, 100, 1);
        let err = class.add_buffered_postings().unwrap_err();
        assert!(matches!(err, SimError::Contract(_)));
        assert_eq!(class.buffered(), 0);
    }

    #[test]
    fn test_add_and_evict() {
        let mut class = normalized(10, 100);
        assert_eq!(class.add_buffered_postings().unwrap(), DEFAULT_TARGET_TICK);
        assert_eq!(class.add_buffered_postings_capped(10).unwrap(), 10);
        assert_eq!(class.buffered(), DEFAULT_TARGET_TICK + 10);

        let moved = class.evict_all();
        assert_eq!(moved, DEFAULT_TARGET_TICK + 10);
        assert_eq!(class.buffered(), 0);
        assert_eq!(class.evicted(), class.ingested());
    }

    #[test]
    fn test_query_cost() {
        let mut class = normalized(4, 100);
        class.add_buffered_postings_capped(10).unwrap();
        class.evict_all();
        class.push_segment(10);
        class.push_segment(0);

        // 10 / 4 truncates to 2, two segments to probe.
        assert_eq!(class.query_cost().unwrap(), ReadIo::new(2, 2));
    }

    #[test]
    fn test_query_cost_zero_members_fails() {
        let class = TermClass::new(1, 0, 100, 1);
        let err = class.query_cost().unwrap_err();
        assert!(matches!(err, SimError::Contract(_)));
    }

    #[test]
    fn test_merge_tail() {
        let mut class = TermClass::new(0, 1, 1, 1);
        class.push_segment(8);
        class.push_segment(4);
        class.push_segment(2);

        assert_eq!(class.merge_tail(2, 1).unwrap(), 7);
        assert_eq!(class.segments(), &[8, 7]);

        assert_eq!(class.merge_tail(0, 3).unwrap(), 3);
        assert_eq!(class.segments(), &[8, 7, 3]);

        assert!(class.merge_tail(4, 1).is_err());
        assert_eq!(class.segments(), &[8, 7, 3]);
    }

    #[test]
    fn test_record_query_rent() {
        let mut class = TermClass::new(0, 1, 1, 1);
        class.record_query_rent();
        assert_eq!(class.account().rent_seeks, 0);

        class.push_segment(1);
        class.push_segment(1);
        class.push_segment(1);
        class.record_query_rent();
        assert_eq!(class.account().rent_seeks, 2);
    }

    #[test]
    fn test_normalize_preserves_ratio() {
        let mut classes = vec![
            TermClass::new(0, 1, 200_000, 1),
            TermClass::new(1, 1, 100_000, 1),
            TermClass::new(2, 1, 50_000_000, 1),
        ];
        TermClass::normalize(&mut classes, DEFAULT_TARGET_TICK).unwrap();

        assert_eq!(classes[1].normalized_updates(), DEFAULT_TARGET_TICK);
        assert_eq!(classes[0].normalized_updates(), 2 * DEFAULT_TARGET_TICK);
        assert_eq!(classes[2].normalized_updates(), 500 * DEFAULT_TARGET_TICK);
    }

    #[test]
    fn test_normalize_empty_fails() {
        let mut classes: Vec<TermClass> = Vec::new();
        assert!(TermClass::normalize(&mut classes, DEFAULT_TARGET_TICK).is_err());
    }
}
