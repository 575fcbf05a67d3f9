// src/sync/drift.rs

//! Drift detection against the external reference clock
//!
//! The host reports the video player's position as it plays. Small
//! differences to the last reported position are clock skew and only update
//! the tracked reference; a jump past the threshold (a user seek in the
//! player, a stall) makes the engine reseek.

use serde::Serialize;

/// Divergence above which the engine reseeks, in milliseconds.
pub const DEFAULT_DRIFT_THRESHOLD_MS: u64 = 200;

/// Outcome of comparing a reported reference position with the tracked one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "drift", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Drift {
    /// Within tolerance; only the tracked reference position was updated
    Tracked { diff_ms: u64 },
    /// Beyond tolerance; the engine was reseeked to the reported position
    Reseeked { diff_ms: u64 },
}

impl Drift {
    pub fn is_reseek(&self) -> bool {
        matches!(self, Drift::Reseeked { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftCorrector {
    threshold_ms: u64,
}

impl Default for DriftCorrector {
    fn default() -> Self {
        Self::new(DEFAULT_DRIFT_THRESHOLD_MS)
    }
}

impl DriftCorrector {
    pub fn new(threshold_ms: u64) -> Self {
        Self { threshold_ms }
    }

    /// Decides whether `reported` has drifted too far from `tracked`.
    pub fn assess(&self, tracked: u64, reported: u64) -> Drift {
        let diff_ms = tracked.abs_diff(reported);
        if diff_ms > self.threshold_ms {
            Drift::Reseeked { diff_ms }
        } else {
            Drift::Tracked { diff_ms }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_differences_are_tracked() {
        let corrector = DriftCorrector::default();
        assert_eq!(corrector.assess(1000, 1150), Drift::Tracked { diff_ms: 150 });
        assert_eq!(corrector.assess(1000, 850), Drift::Tracked { diff_ms: 150 });
        assert_eq!(corrector.assess(1000, 1200), Drift::Tracked { diff_ms: 200 });
    }

    #[test]
    fn large_differences_reseek() {
        let corrector = DriftCorrector::default();
        assert_eq!(corrector.assess(1000, 1250), Drift::Reseeked { diff_ms: 250 });
        assert!(corrector.assess(5000, 0).is_reseek());
    }

    #[test]
    fn threshold_is_configurable() {
        let corrector = DriftCorrector::new(50);
        assert!(corrector.assess(1000, 1060).is_reseek());
        assert!(!corrector.assess(1000, 1040).is_reseek());
    }
}
