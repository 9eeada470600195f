//! Experiment sweeps over merge policies and buffer sizes.
//!
//! This module provides functionality to:
//! - Expand a sweep configuration into independent (policy, buffer) runs
//! - Execute the runs concurrently on a dedicated thread pool
//! - Collect every outcome, successful or failed, in a stable order

pub mod config;
pub mod outcome;
pub mod runner;

pub use config::SweepConfig;
pub use outcome::{RunOutcome, SweepReport};
pub use runner::{SweepRunner, run_sweep};
