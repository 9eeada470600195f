//! # compaction-sim
//!
//! Discrete-event simulation of the I/O cost of segment merge (compaction)
//! policies in a write-optimized inverted index that buffers postings before
//! flushing them to disk.
//!
//! ## Features
//!
//! - Analytic disk cost model (postings transferred, seeks performed)
//! - Heterogeneous term classes with their own update and query rates
//! - Never, always, telescoping and ski-rental merge policies
//! - Concurrent sweeps over policies and buffer sizes
//!
//! The core entry point is [`engine::run_simulation`].

pub mod cli;
pub mod cost;
pub mod engine;
pub mod error;
pub mod merge_policy;
pub mod report;
pub mod settings;
pub mod sweep;
pub mod term_class;

pub mod prelude {
    pub use crate::engine::{SimulationEngine, run_simulation};
    pub use crate::error::{Result, SimError};
    pub use crate::merge_policy::{MergePolicy, SkiRentalConfig, TelescopingConfig};
    pub use crate::report::Report;
    pub use crate::settings::{DiskKind, Settings};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
