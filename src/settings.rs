//! Run configuration for the simulator.
//!
//! [`Settings`] is created once by the caller and only read afterwards.
//! The engine checks its invariants when a run is initialised, see
//! [`Settings::validate`].

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::cost::DiskModel;
use crate::error::{Result, SimError};

/// Smallest accepted update quantum, in postings.
pub const MIN_UPDATE_QUANTUM: u64 = 1 << 10;

/// Kind of disk being modelled. Only used to label reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskKind {
    /// Rotational hard drive.
    Hdd,
    /// Solid state drive.
    Ssd,
}

impl fmt::Display for DiskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskKind::Hdd => write!(f, "HD"),
            DiskKind::Ssd => write!(f, "SSD"),
        }
    }
}

/// Immutable configuration of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Sequential disk throughput in MB/s.
    pub io_mbs: f64,

    /// Average seek latency in milliseconds.
    pub io_seek_ms: f64,

    /// Size of one posting in bytes.
    pub posting_bytes: u64,

    /// Total postings to push through the index.
    pub total_experiment_postings: u64,

    /// Update buffer capacity in postings.
    pub update_buffer_postings: u64,

    /// Postings between two batches of queries.
    pub updates_quantum: u64,

    /// Queries issued per elapsed quantum.
    pub queries_per_quantum: u64,

    /// Members per term class.
    pub class_members: Vec<u64>,

    /// Update rate per term class and epoch.
    pub class_updates: Vec<u64>,

    /// Query rate per term class and epoch.
    pub class_queries: Vec<u64>,

    /// Disk label.
    pub disk: DiskKind,

    /// Per-class eviction drains the buffer down to this fraction of its
    /// capacity.
    pub evict_to_fraction: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            io_mbs: 150.0,
            io_seek_ms: 7.0,
            posting_bytes: 4,
            total_experiment_postings: 64 * 1000 * 1000 * 1000,
            update_buffer_postings: ((1u64 << 31) * 16) / 100,
            updates_quantum: 1_000_000,
            queries_per_quantum: 64,
            class_members: vec![10_000, 10_000],
            class_updates: vec![100_000, 100_000],
            class_queries: vec![20_123, 10_000],
            disk: DiskKind::Hdd,
            evict_to_fraction: 0.5,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Write settings to a JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Set the update buffer capacity.
    pub fn with_buffer(mut self, postings: u64) -> Self {
        self.update_buffer_postings = postings;
        self
    }

    /// Set the total experiment volume.
    pub fn with_total_postings(mut self, postings: u64) -> Self {
        self.total_experiment_postings = postings;
        self
    }

    /// Set the update quantum.
    pub fn with_updates_quantum(mut self, postings: u64) -> Self {
        self.updates_quantum = postings;
        self
    }

    /// Set the queries issued per quantum.
    pub fn with_queries_per_quantum(mut self, queries: u64) -> Self {
        self.queries_per_quantum = queries;
        self
    }

    /// Replace the term classes.
    pub fn with_classes(mut self, members: Vec<u64>, updates: Vec<u64>, queries: Vec<u64>) -> Self {
        self.class_members = members;
        self.class_updates = updates;
        self.class_queries = queries;
        self
    }

    /// Set the disk constants and label.
    pub fn with_disk(mut self, disk: DiskKind, io_mbs: f64, io_seek_ms: f64) -> Self {
        self.disk = disk;
        self.io_mbs = io_mbs;
        self.io_seek_ms = io_seek_ms;
        self
    }

    /// Set the target buffer fraction after a per-class eviction.
    pub fn with_evict_to_fraction(mut self, fraction: f64) -> Self {
        self.evict_to_fraction = fraction;
        self
    }

    /// Number of term classes.
    pub fn class_count(&self) -> usize {
        self.class_members.len()
    }

    /// Disk constants used for cost conversion.
    pub fn disk_model(&self) -> DiskModel {
        DiskModel::new(self.io_mbs, self.io_seek_ms, self.posting_bytes)
    }

    /// Check every invariant a run relies on.
    pub fn validate(&self) -> Result<()> {
        if !(self.io_mbs > 0.0) {
            return Err(SimError::config(
                "io_mbs",
                format!("throughput must be positive, got {}", self.io_mbs),
            ));
        }
        if !(self.io_seek_ms > 0.0) {
            return Err(SimError::config(
                "io_seek_ms",
                format!("seek latency must be positive, got {}", self.io_seek_ms),
            ));
        }
        if self.posting_bytes == 0 {
            return Err(SimError::config("posting_bytes", "posting size must be positive"));
        }
        if self.total_experiment_postings == 0 {
            return Err(SimError::config(
                "total_experiment_postings",
                "experiment volume must be positive",
            ));
        }
        if self.updates_quantum < MIN_UPDATE_QUANTUM {
            return Err(SimError::config(
                "updates_quantum",
                format!(
                    "quantum {} is below the minimum of {MIN_UPDATE_QUANTUM}",
                    self.updates_quantum
                ),
            ));
        }
        if self.update_buffer_postings <= self.updates_quantum {
            return Err(SimError::config(
                "update_buffer_postings",
                format!(
                    "buffer of {} postings must exceed the quantum of {}",
                    self.update_buffer_postings, self.updates_quantum
                ),
            ));
        }
        if self.class_members.is_empty() {
            return Err(SimError::config("class_members", "at least one term class is required"));
        }
        if self.class_members.len() != self.class_updates.len()
            || self.class_members.len() != self.class_queries.len()
        {
            return Err(SimError::config(
                "class_lengths",
                format!(
                    "members ({}), updates ({}) and queries ({}) must have equal length",
                    self.class_members.len(),
                    self.class_updates.len(),
                    self.class_queries.len()
                ),
            ));
        }
        if let Some(i) = self.class_members.iter().position(|&m| m == 0) {
            return Err(SimError::config(
                "class_members",
                format!("term class {i} has no members"),
            ));
        }
        if let Some(i) = self.class_updates.iter().position(|&u| u == 0) {
            return Err(SimError::config(
                "class_updates",
                format!("term class {i} has a non-positive update rate"),
            ));
        }
        if let Some(i) = self.class_queries.iter().position(|&q| q == 0) {
            return Err(SimError::config(
                "class_queries",
                format!("term class {i} has a non-positive query rate"),
            ));
        }
        if !(0.0..1.0).contains(&self.evict_to_fraction) {
            return Err(SimError::config(
                "evict_to_fraction",
                format!("fraction must lie in [0, 1), got {}", self.evict_to_fraction),
            ));
        }
        Ok(())
    }
}
