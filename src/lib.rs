//! Workspace umbrella crate for license fingerprinting (`licensefp`).
//!
//! This crate stitches together text normalization, fuzzy hashing, corpus
//! storage and detection so callers can go from license text to a ranked
//! list of known licenses through a single API entry point.

pub mod batch;
pub mod config;
pub mod logging;

pub use canonical::{
    CanonicalError, CanonicalText, CanonicalizeConfig, canonicalize, collapse_whitespace,
    strip_spdx_heading, strip_whitespace,
};
pub use ctph::{
    CtphConfig, CtphError, Digest, FuzzyHash, Similarity, compare_hashes, fuzzy_hash,
    fuzzy_hash_with, hash_block,
};
#[cfg(feature = "redb")]
pub use index::RedbCorpus;
pub use index::{
    CorpusEntry, CorpusStore, FlatFileCorpus, InMemoryCorpus, IndexError, StoreConfig,
};
pub use matcher::{
    DetectionEngine, DetectionOptions, DetectionScheduler, LicenseMatch, MatchError, MatchMetrics,
    ScheduleMode, SchedulerConfig, set_match_metrics, sort_by_confidence,
};

use std::error::Error;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

/// Errors that can occur while running text through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    Canonical(CanonicalError),
    Fingerprint(CtphError),
    Detect(MatchError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Canonical(err) => write!(f, "canonicalization failure: {err}"),
            PipelineError::Fingerprint(err) => write!(f, "fuzzy hashing failed: {err}"),
            PipelineError::Detect(err) => write!(f, "license detection failed: {err}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Canonical(err) => Some(err),
            PipelineError::Fingerprint(err) => Some(err),
            PipelineError::Detect(err) => Some(err),
        }
    }
}

impl From<CanonicalError> for PipelineError {
    fn from(value: CanonicalError) -> Self {
        PipelineError::Canonical(value)
    }
}

impl From<CtphError> for PipelineError {
    fn from(value: CtphError) -> Self {
        PipelineError::Fingerprint(value)
    }
}

impl From<MatchError> for PipelineError {
    fn from(value: MatchError) -> Self {
        PipelineError::Detect(value)
    }
}

/// Metrics observer for pipeline stages.
pub trait PipelineMetrics: Send + Sync {
    fn record_canonical(&self, latency: Duration, result: Result<(), CanonicalError>);
    fn record_fingerprint(&self, latency: Duration, result: Result<(), CtphError>);
    fn record_detect(&self, latency: Duration, result: Result<usize, MatchError>);
}

/// Install or clear the global pipeline metrics recorder.
pub fn set_pipeline_metrics(recorder: Option<Arc<dyn PipelineMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn PipelineMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn PipelineMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn PipelineMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

struct MetricsSpan {
    recorder: Arc<dyn PipelineMetrics>,
    start: Instant,
}

impl MetricsSpan {
    fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    fn record_canonical(self, result: Result<(), CanonicalError>) {
        self.recorder.record_canonical(self.start.elapsed(), result);
    }

    fn record_fingerprint(self, result: Result<(), CtphError>) {
        self.recorder.record_fingerprint(self.start.elapsed(), result);
    }

    fn record_detect(self, result: Result<usize, MatchError>) {
        self.recorder.record_detect(self.start.elapsed(), result);
    }
}

/// Normalize license text with explicit configuration.
pub fn canonicalize_text(
    text: &str,
    canonical_cfg: &CanonicalizeConfig,
) -> Result<CanonicalText, PipelineError> {
    let span = MetricsSpan::start();
    let result = canonicalize(text, canonical_cfg);
    if let Some(span) = span {
        span.record_canonical(result.as_ref().map(|_| ()).map_err(Clone::clone));
    }
    Ok(result?)
}

/// Fuzzy-hash raw bytes into a corpus entry, without any normalization.
pub fn fingerprint_bytes(
    name: &str,
    bytes: &[u8],
    ctph_cfg: &CtphConfig,
) -> Result<CorpusEntry, PipelineError> {
    let span = MetricsSpan::start();
    let result = CorpusEntry::compute_with(name, bytes, ctph_cfg);
    if let Some(span) = span {
        span.record_fingerprint(result.as_ref().map(|_| ()).map_err(Clone::clone));
    }
    Ok(result?)
}

/// Normalize `text`, then fuzzy-hash it into a corpus entry named `name`.
///
/// ```
/// use licensefp::{fingerprint_text, CanonicalizeConfig, CtphConfig};
///
/// let entry = fingerprint_text(
///     "MIT",
///     "Permission is hereby granted,\nfree of charge",
///     &CanonicalizeConfig::default(),
///     &CtphConfig::default(),
/// )
/// .unwrap();
/// assert_eq!(entry.name, "MIT");
/// assert_eq!((entry.block_size, entry.hash_length), (10, 7));
/// ```
pub fn fingerprint_text(
    name: &str,
    text: &str,
    canonical_cfg: &CanonicalizeConfig,
    ctph_cfg: &CtphConfig,
) -> Result<CorpusEntry, PipelineError> {
    let canonical = canonicalize_text(text, canonical_cfg)?;
    fingerprint_bytes(name, canonical.as_bytes(), ctph_cfg)
}

/// Normalize `text` and detect it against every entry of `store`.
///
/// The store must have been built from text normalized the same way,
/// otherwise block boundaries will not line up. Matches come back in corpus
/// order.
pub fn detect_text(
    text: &str,
    store: &dyn CorpusStore,
    canonical_cfg: &CanonicalizeConfig,
    options: &DetectionOptions,
) -> Result<Vec<LicenseMatch>, PipelineError> {
    let canonical = canonicalize_text(text, canonical_cfg)?;

    let span = MetricsSpan::start();
    let result = DetectionEngine::new(*options)
        .and_then(|engine| engine.detect_in_store(canonical.as_bytes(), store));
    if let Some(span) = span {
        span.record_detect(result.as_ref().map(Vec::len).map_err(Clone::clone));
    }
    Ok(result?)
}
