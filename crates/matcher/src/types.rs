use std::time::Duration;

use ctph::{CtphError, Similarity};
use index::IndexError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Per-detection thresholds.
///
/// `DetectionOptions` is cheap to clone and serde-friendly so it can be
/// embedded in higher-level configs or shipped to worker threads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionOptions {
    /// Matches scoring below this are dropped. Also bounds the mismatch
    /// budget of each comparison.
    pub min_confidence_threshold: f64,
    /// Stop scanning the corpus as soon as one comparison reaches this
    /// confidence. `None` scans the whole corpus. Must not be negative:
    /// aborted comparisons never trigger an early exit.
    pub early_exit_threshold: Option<f64>,
}

impl DetectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_confidence(mut self, threshold: f64) -> Self {
        self.min_confidence_threshold = threshold;
        self
    }

    pub fn with_early_exit(mut self, threshold: f64) -> Self {
        self.early_exit_threshold = Some(threshold);
        self
    }

    pub fn without_early_exit(mut self) -> Self {
        self.early_exit_threshold = None;
        self
    }

    /// Validate the thresholds.
    pub fn validate(&self) -> Result<(), MatchError> {
        let min = self.min_confidence_threshold;
        if !min.is_finite() || !(0.0..=1.0).contains(&min) {
            return Err(MatchError::InvalidConfig(format!(
                "min_confidence_threshold must be within [0, 1] (got {min})"
            )));
        }
        if let Some(early) = self.early_exit_threshold {
            if early.is_nan() {
                return Err(MatchError::InvalidConfig(
                    "early_exit_threshold must not be NaN".into(),
                ));
            }
            if early < 0.0 {
                return Err(MatchError::InvalidConfig(format!(
                    "early_exit_threshold must not be negative (got {early})"
                )));
            }
        }
        Ok(())
    }
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            min_confidence_threshold: 0.1,
            early_exit_threshold: None,
        }
    }
}

/// One detected license.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LicenseMatch {
    /// Corpus entry name, e.g. an SPDX identifier.
    pub name: String,
    /// Share of aligned blocks that matched, in [0, 1].
    pub confidence: f64,
    pub common_blocks: usize,
    pub total_blocks: usize,
}

impl LicenseMatch {
    /// Builds a match from a completed comparison. Returns `None` for the
    /// aborted sentinel.
    pub fn from_similarity(name: impl Into<String>, sim: &Similarity) -> Option<Self> {
        let common_blocks = usize::try_from(sim.common_blocks).ok()?;
        Some(Self {
            name: name.into(),
            confidence: sim.confidence,
            common_blocks,
            total_blocks: sim.total_blocks,
        })
    }
}

/// Orders matches by descending confidence.
///
/// The sort is stable, so equally confident matches keep corpus order.
pub fn sort_by_confidence(matches: &mut [LicenseMatch]) {
    matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
}

/// Errors produced by the matching layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    /// Invalid configuration (per-request or global).
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
    /// Hashing the incoming document failed, usually because a corpus entry
    /// carries a zero block size or hash length.
    #[error("hashing error: {0}")]
    Ctph(#[from] CtphError),
    /// The corpus store could not be read.
    #[error("corpus store unavailable: {0}")]
    Store(#[from] IndexError),
    /// A scheduled request did not complete in time. The caller may retry.
    #[error("detection request {request_id} timed out after {after:?}")]
    Timeout { request_id: Uuid, after: Duration },
    /// A worker thread is gone or could not be started.
    #[error("detection worker unavailable: {0}")]
    WorkerUnavailable(String),
}

impl MatchError {
    /// Whether retrying the same request can succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MatchError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        let opts = DetectionOptions::default();
        assert!(opts.validate().is_ok());
        assert_eq!(opts.min_confidence_threshold, 0.1);
        assert_eq!(opts.early_exit_threshold, None);
    }

    #[test]
    fn out_of_range_minimum_rejected() {
        for min in [-0.1, 1.5, f64::NAN, f64::INFINITY] {
            let err = DetectionOptions::new()
                .with_min_confidence(min)
                .validate()
                .expect_err("options should be invalid");
            match err {
                MatchError::InvalidConfig(msg) => {
                    assert!(msg.contains("min_confidence_threshold"))
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn nan_early_exit_rejected() {
        let err = DetectionOptions::new()
            .with_early_exit(f64::NAN)
            .validate()
            .expect_err("options should be invalid");
        assert!(matches!(err, MatchError::InvalidConfig(msg) if msg.contains("early_exit")));
    }

    #[test]
    fn negative_early_exit_rejected() {
        for early in [-0.25, -1.0, f64::NEG_INFINITY] {
            let err = DetectionOptions::new()
                .with_early_exit(early)
                .validate()
                .expect_err("options should be invalid");
            assert!(matches!(err, MatchError::InvalidConfig(msg) if msg.contains("negative")));
        }
        assert!(DetectionOptions::new().with_early_exit(0.0).validate().is_ok());
    }

    #[test]
    fn early_exit_above_one_is_allowed() {
        // Never reached, which is the same as no early exit.
        assert!(DetectionOptions::new().with_early_exit(1.5).validate().is_ok());
    }

    #[test]
    fn sort_is_descending_and_stable() {
        let mk = |name: &str, confidence: f64| LicenseMatch {
            name: name.into(),
            confidence,
            common_blocks: 0,
            total_blocks: 0,
        };
        let mut matches = vec![mk("a", 0.2), mk("b", 0.9), mk("c", 0.2), mk("d", 1.0)];
        sort_by_confidence(&mut matches);
        let names: Vec<&str> = matches.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn aborted_similarity_is_not_a_match() {
        assert!(LicenseMatch::from_similarity("x", &Similarity::aborted(4)).is_none());
    }

    #[test]
    fn only_timeouts_are_recoverable() {
        let timeout = MatchError::Timeout {
            request_id: Uuid::new_v4(),
            after: Duration::from_millis(5),
        };
        assert!(timeout.is_recoverable());
        assert!(!MatchError::WorkerUnavailable("gone".into()).is_recoverable());
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: DetectionOptions =
            serde_json::from_str(r#"{"early_exit_threshold": 0.95}"#).unwrap();
        assert_eq!(opts.min_confidence_threshold, 0.1);
        assert_eq!(opts.early_exit_threshold, Some(0.95));
    }
}
