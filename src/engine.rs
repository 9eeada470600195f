//! The simulation engine.
//!
//! One [`SimulationEngine`] owns all mutable state of one run: the term
//! classes, the global segment history, the round-robin cursors and the cost
//! accumulators. A run cycles through
//!
//! ```text
//! fill buffer (checking queries after every fill step)
//!   -> handle queries
//!   -> evict (applying the merge policy)
//! ```
//!
//! until the configured volume has been ingested. Nothing is shared between
//! engines, so independent runs can execute on different threads.
//!
//! # Example
//!
//! ```
//! use compaction_sim::engine::run_simulation;
//! use compaction_sim::merge_policy::MergePolicy;
//! use compaction_sim::settings::Settings;
//!
//! let settings = Settings::default()
//!     .with_buffer(1_000_000)
//!     .with_total_postings(10_000_000)
//!     .with_updates_quantum(100_000);
//! let report = run_simulation(&settings, MergePolicy::NeverMerge).unwrap();
//! assert_eq!(report.seen_postings, 10_000_000);
//! ```

use crate::cost::{ConsolidationStats, DiskModel, ReadIo};
use crate::error::{Result, SimError};
use crate::merge_policy::{EvictionMode, MergePolicy};
use crate::report::Report;
use crate::settings::Settings;
use crate::term_class::{DEFAULT_TARGET_TICK, TermClass};

/// Run one simulation to completion.
pub fn run_simulation(settings: &Settings, policy: MergePolicy) -> Result<Report> {
    let mut engine = SimulationEngine::new(settings.clone(), policy)?;
    engine.run()
}

/// Per-run simulation state.
#[derive(Debug, Clone)]
pub struct SimulationEngine {
    settings: Settings,
    disk: DiskModel,
    policy: MergePolicy,
    classes: Vec<TermClass>,

    /// Global segment sizes, oldest first. Only used in monolithic mode.
    global_segments: Vec<u64>,

    fill_cursor: usize,
    query_cursor: usize,

    /// Ingested volume at which queries were last settled.
    query_mark: u64,

    buffered: u64,
    evicted: u64,
    queries: u64,
    evictions: u64,
    query_io: ReadIo,
    consolidation: ConsolidationStats,
}

impl SimulationEngine {
    /// Validate the configuration and build the term classes.
    pub fn new(settings: Settings, policy: MergePolicy) -> Result<Self> {
        settings.validate()?;
        policy.validate()?;

        let mut classes: Vec<TermClass> = (0..settings.class_count())
            .map(|i| {
                TermClass::new(
                    i,
                    settings.class_members[i],
                    settings.class_updates[i],
                    settings.class_queries[i],
                )
            })
            .collect();
        TermClass::normalize(&mut classes, DEFAULT_TARGET_TICK)?;

        Ok(SimulationEngine {
            disk: settings.disk_model(),
            settings,
            policy,
            classes,
            global_segments: Vec::new(),
            fill_cursor: 0,
            query_cursor: 0,
            query_mark: 0,
            buffered: 0,
            evicted: 0,
            queries: 0,
            evictions: 0,
            query_io: ReadIo::zero(),
            consolidation: ConsolidationStats::default(),
        })
    }

    /// Run until the experiment volume is reached.
    pub fn run(&mut self) -> Result<Report> {
        while !self.finished() {
            self.step()?;
        }

        let report = self.report();
        log::info!(
            "{} on {} with buffer {}: {} evictions, {} queries, {:.3} min total",
            report.policy,
            report.disk,
            report.buffer_postings,
            report.evictions,
            report.queries,
            report.total_minutes
        );
        Ok(report)
    }

    /// One fill, query, evict cycle.
    pub fn step(&mut self) -> Result<()> {
        self.fill_buffer()?;
        self.handle_queries()?;
        self.evict_from_buffer()
    }

    /// Whether the configured volume has been ingested.
    pub fn finished(&self) -> bool {
        self.seen_postings() >= self.settings.total_experiment_postings
    }

    /// Fill the buffer round-robin until it is full or the experiment volume
    /// is reached. The last increment is cut short so the volume is never
    /// exceeded.
    pub fn fill_buffer(&mut self) -> Result<()> {
        let capacity = self.settings.update_buffer_postings;
        let total = self.settings.total_experiment_postings;

        while self.buffered < capacity && self.seen_postings() < total {
            let remaining = total - self.seen_postings();
            let class = &mut self.classes[self.fill_cursor];
            self.buffered += class.add_buffered_postings_capped(remaining)?;
            self.fill_cursor = (self.fill_cursor + 1) % self.classes.len();
            self.handle_queries()?;
        }
        Ok(())
    }

    /// Issue the queries owed for every whole quantum ingested since the
    /// last call, continuing the shared round-robin cursor.
    pub fn handle_queries(&mut self) -> Result<()> {
        let quantum = self.settings.updates_quantum;
        let elapsed = self
            .seen_postings()
            .checked_sub(self.query_mark)
            .ok_or_else(|| SimError::contract("query mark is ahead of ingested postings"))?;
        if elapsed < quantum {
            return Ok(());
        }

        let quanta = elapsed / quantum;
        self.query_mark += quanta * quantum;
        let owed = self
            .settings
            .queries_per_quantum
            .checked_mul(quanta)
            .ok_or_else(|| SimError::contract("query count overflows"))?;

        for _ in 0..owed {
            let class = &mut self.classes[self.query_cursor];
            self.query_io += class.query_cost()?;
            class.record_query_rent();
            self.query_cursor = (self.query_cursor + 1) % self.classes.len();
        }
        self.queries += owed;
        Ok(())
    }

    /// Evict according to the policy's eviction mode.
    pub fn evict_from_buffer(&mut self) -> Result<()> {
        if self.buffered == 0 {
            return Ok(());
        }
        let flushed = match self.policy.mode() {
            EvictionMode::Monolithic => self.evict_monolithic()?,
            EvictionMode::PerClass => self.evict_per_class()?,
        };
        if flushed {
            self.evictions += 1;
        }
        Ok(())
    }

    fn evict_monolithic(&mut self) -> Result<bool> {
        let incoming = self.buffered;
        let decision = self.policy.decide_global(&self.global_segments, incoming)?;

        let keep = self
            .global_segments
            .len()
            .checked_sub(decision.depth)
            .ok_or_else(|| SimError::contract("merge depth exceeds global segment count"))?;
        let merged = incoming + self.global_segments.drain(keep..).sum::<u64>();
        self.global_segments.push(merged);

        // Every class mirrors the global decision on its own share.
        for class in &mut self.classes {
            let moved = class.evict_all();
            class.merge_tail(decision.depth, moved)?;
        }

        self.evicted += incoming;
        self.buffered = 0;
        self.consolidation += decision.stats;

        log::debug!(
            "{} eviction {}: {} postings, merged depth {}, {} segments",
            self.policy,
            self.evictions + 1,
            incoming,
            decision.depth,
            self.global_segments.len()
        );
        Ok(true)
    }

    /// Returns whether anything was flushed: the final, partial buffer may
    /// already sit below the target.
    fn evict_per_class(&mut self) -> Result<bool> {
        let target = (self.settings.update_buffer_postings as f64
            * self.settings.evict_to_fraction) as u64;
        let mut flushed = false;

        // Larger class ids are evicted first.
        for idx in (0..self.classes.len()).rev() {
            if self.buffered <= target {
                break;
            }
            let class = &mut self.classes[idx];
            if class.buffered() == 0 {
                continue;
            }

            let moved = class.evict_all();
            let decision = self.policy.decide_class(class, moved, &self.disk)?;
            class.merge_tail(decision.depth, moved)?;

            self.buffered -= moved;
            self.evicted += moved;
            self.consolidation += decision.stats;
            flushed = true;

            log::debug!(
                "{} eviction {}: class {} flushed {} postings, merged depth {}, {} segments",
                self.policy,
                self.evictions + 1,
                idx,
                moved,
                decision.depth,
                class.segments().len()
            );
        }
        Ok(flushed)
    }

    /// Totals of the run so far, converted to minutes.
    pub fn report(&self) -> Report {
        let query_minutes = self.disk.cost_in_minutes(self.query_io);
        let merge_minutes = self.consolidation.minutes(&self.disk);
        Report {
            policy: self.policy.name().to_string(),
            disk: self.settings.disk.to_string(),
            buffer_postings: self.settings.update_buffer_postings,
            evictions: self.evictions,
            seen_postings: self.seen_postings(),
            queries: self.queries,
            query_minutes,
            merge_minutes,
            total_minutes: query_minutes + merge_minutes,
        }
    }

    /// Postings ingested so far, buffered or evicted.
    pub fn seen_postings(&self) -> u64 {
        self.buffered + self.evicted
    }

    pub fn buffered(&self) -> u64 {
        self.buffered
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    pub fn queries(&self) -> u64 {
        self.queries
    }

    pub fn classes(&self) -> &[TermClass] {
        &self.classes
    }

    pub fn global_segments(&self) -> &[u64] {
        &self.global_segments
    }

    pub fn query_io(&self) -> ReadIo {
        self.query_io
    }

    pub fn consolidation(&self) -> ConsolidationStats {
        self.consolidation
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn policy(&self) -> &MergePolicy {
        &self.policy
    }
}
