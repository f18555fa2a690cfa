// Metrics hooks for the matcher crate.
//
// Callers install a global `MatchMetrics` implementation via [`set_match_metrics`],
// then every detection pass reports its latency, scan size and hit count.
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;

/// Metrics observer for detection passes.
pub trait MatchMetrics: Send + Sync {
    /// Record the outcome of one detection pass.
    ///
    /// `entries_scanned` counts corpus entries compared before the pass
    /// ended, `hit_count` the matches returned, and `early_exit` whether the
    /// early-exit threshold cut the scan short.
    fn record_detection(
        &self,
        latency: Duration,
        entries_scanned: usize,
        hit_count: usize,
        early_exit: bool,
    );
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn MatchMetrics>>> {
    static METRICS: OnceCell<RwLock<Option<Arc<dyn MatchMetrics>>>> = OnceCell::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn MatchMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the global match metrics recorder.
///
/// This is typically called once at start-up so every engine and scheduler
/// worker shares the same metrics backend.
pub fn set_match_metrics(recorder: Option<Arc<dyn MatchMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}
