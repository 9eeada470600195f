//! Error types for the compaction simulator.
//!
//! Every failure of a simulation run is represented by the [`SimError`] enum.
//! A run never retries: the first error aborts that run and is handed back to
//! the caller, which may keep going with other runs.
//!
//! # Examples
//!
//! ```
//! use compaction_sim::error::{SimError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(SimError::config("update_quantum", "must be at least 1024"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use anyhow;
use thiserror::Error;

/// The main error type for simulator operations.
///
/// Configuration errors are detected when an engine is initialised, contract
/// errors are arithmetic or logic violations detected while a run is in
/// progress. Neither kind is recoverable for the run that raised it.
#[derive(Error, Debug)]
pub enum SimError {
    /// I/O errors (reading settings, writing reports)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed settings, with the violated invariant named
    #[error("Invalid configuration ({invariant}): {detail}")]
    Config {
        invariant: &'static str,
        detail: String,
    },

    /// Arithmetic or logic contract violated during a run
    #[error("Contract violation: {0}")]
    Contract(String),

    /// Policy declared but without a decision function
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Thread pool construction errors
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with SimError.
pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    /// Create a new configuration error naming the violated invariant.
    pub fn config<S: Into<String>>(invariant: &'static str, detail: S) -> Self {
        SimError::Config {
            invariant,
            detail: detail.into(),
        }
    }

    /// Create a new contract violation error.
    pub fn contract<S: Into<String>>(msg: S) -> Self {
        SimError::Contract(msg.into())
    }

    /// Create a new not implemented error.
    pub fn not_implemented<S: Into<String>>(msg: S) -> Self {
        SimError::NotImplemented(msg.into())
    }

    /// Create a new thread pool error.
    pub fn thread_pool<S: Into<String>>(msg: S) -> Self {
        SimError::ThreadPool(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        SimError::Other(msg.into())
    }

    /// Name of the violated invariant, for configuration errors.
    pub fn invariant(&self) -> Option<&'static str> {
        match self {
            SimError::Config { invariant, .. } => Some(invariant),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = SimError::config("buffer_capacity", "must exceed the update quantum");
        assert_eq!(
            error.to_string(),
            "Invalid configuration (buffer_capacity): must exceed the update quantum"
        );
        assert_eq!(error.invariant(), Some("buffer_capacity"));

        let error = SimError::contract("member count is zero");
        assert_eq!(error.to_string(), "Contract violation: member count is zero");
        assert_eq!(error.invariant(), None);

        let error = SimError::not_implemented("prognosticator");
        assert_eq!(error.to_string(), "Not implemented: prognosticator");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let sim_error = SimError::from(io_error);

        match sim_error {
            SimError::Io(_) => {} // Expected
            _ => panic!("Expected IO error variant"),
        }
    }
}
