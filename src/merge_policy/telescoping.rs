//! Telescoping (logarithmic) merge.
//!
//! Segment sizes are kept roughly geometric, newest smallest. After a flush
//! the newest segment absorbs its predecessor for as long as it is not
//! smaller than `ratio` times that predecessor, the way incrementing a binary
//! counter collapses its trailing one bits. The carry is charged as a single
//! multi-way merge of exactly the absorbed segments.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Parameters of the telescoping merge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelescopingConfig {
    /// Comparability ratio in `(0, 1]`. After every eviction each segment is
    /// strictly smaller than `ratio` times the one before it.
    pub ratio: f64,
}

impl Default for TelescopingConfig {
    fn default() -> Self {
        TelescopingConfig { ratio: 1.0 }
    }
}

impl TelescopingConfig {
    pub fn new(ratio: f64) -> Self {
        TelescopingConfig { ratio }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ratio > 0.0 && self.ratio <= 1.0 {
            Ok(())
        } else {
            Err(SimError::config(
                "telescoping_ratio",
                format!("ratio must lie in (0, 1], got {}", self.ratio),
            ))
        }
    }

    /// Number of trailing segments the incoming one absorbs.
    pub fn carry_depth(&self, segments: &[u64], incoming: u64) -> usize {
        let mut newest = incoming;
        let mut depth = 0;
        for &older in segments.iter().rev() {
            if (newest as f64) < self.ratio * older as f64 {
                break;
            }
            newest += older;
            depth += 1;
        }
        depth
    }

    /// Whether `segments` (oldest first) satisfy the geometric invariant.
    pub fn holds_for(&self, segments: &[u64]) -> bool {
        segments
            .windows(2)
            .all(|pair| (pair[1] as f64) < self.ratio * pair[0] as f64)
    }
}
