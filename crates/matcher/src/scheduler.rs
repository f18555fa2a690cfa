//! Detection across a pool of worker threads.
//!
//! Each worker is an OS thread that owns a read-only view of the corpus and
//! runs a [`DetectionEngine`] per request. Requests travel over a typed tokio
//! channel and carry their own reply channel, so the async caller awaits
//! replies without blocking a runtime thread.
//!
//! In [`ScheduleMode::FanOut`] the corpus is cut into contiguous shards, one
//! per worker, every request goes to every worker, and the shard results are
//! concatenated in shard order. In [`ScheduleMode::LeastLoaded`] every worker
//! sees the whole corpus and a request goes to the worker with the fewest
//! requests in flight.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use index::{CorpusEntry, CorpusStore};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::engine::DetectionEngine;
use crate::types::{DetectionOptions, LicenseMatch, MatchError};

/// How requests are spread over workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMode {
    /// Shard the corpus; every request visits every worker.
    #[default]
    FanOut,
    /// Whole corpus per worker; one worker per request.
    LeastLoaded,
}

/// Scheduler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Worker thread count. `0` uses the available parallelism.
    pub workers: usize,
    pub mode: ScheduleMode,
    pub options: DetectionOptions,
    /// Deadline applied by [`DetectionScheduler::detect`], in milliseconds.
    pub default_timeout_ms: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            mode: ScheduleMode::FanOut,
            options: DetectionOptions::default(),
            default_timeout_ms: None,
        }
    }
}

impl SchedulerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_mode(mut self, mode: ScheduleMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_options(mut self, options: DetectionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        self.options.validate()?;
        if self.default_timeout_ms == Some(0) {
            return Err(MatchError::InvalidConfig(
                "default_timeout_ms must be positive when set".into(),
            ));
        }
        Ok(())
    }

    /// Worker count after resolving `0` to the machine's parallelism.
    pub fn resolved_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }
}

struct DetectionRequest {
    id: Uuid,
    incoming: Arc<[u8]>,
    reply: mpsc::UnboundedSender<WorkerReply>,
}

struct WorkerReply {
    request_id: Uuid,
    worker: usize,
    result: Result<Vec<LicenseMatch>, MatchError>,
}

struct WorkerHandle {
    sender: Option<mpsc::UnboundedSender<DetectionRequest>>,
    in_flight: Arc<AtomicUsize>,
    thread: Option<JoinHandle<()>>,
}

/// Pool of detection workers over one corpus.
pub struct DetectionScheduler {
    workers: Vec<WorkerHandle>,
    mode: ScheduleMode,
    default_timeout: Option<Duration>,
}

impl DetectionScheduler {
    /// Spawn the workers over an in-memory corpus.
    pub fn new(corpus: Vec<CorpusEntry>, config: SchedulerConfig) -> Result<Self, MatchError> {
        config.validate()?;
        let engine = DetectionEngine::new(config.options)?;
        let worker_count = config.resolved_workers();
        let corpus: Arc<[CorpusEntry]> = corpus.into();

        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let range = match config.mode {
                ScheduleMode::FanOut => shard_range(corpus.len(), worker_count, index),
                ScheduleMode::LeastLoaded => 0..corpus.len(),
            };
            let (sender, receiver) = mpsc::unbounded_channel();
            let in_flight = Arc::new(AtomicUsize::new(0));
            let worker = Worker {
                index,
                corpus: Arc::clone(&corpus),
                range,
                engine: engine.clone(),
                in_flight: Arc::clone(&in_flight),
            };
            let thread = std::thread::Builder::new()
                .name(format!("licensefp-detect-{index}"))
                .spawn(move || worker.run(receiver))
                .map_err(|e| {
                    MatchError::WorkerUnavailable(format!("spawning worker {index}: {e}"))
                })?;
            workers.push(WorkerHandle {
                sender: Some(sender),
                in_flight,
                thread: Some(thread),
            });
        }

        tracing::debug!(
            workers = worker_count,
            entries = corpus.len(),
            mode = ?config.mode,
            "detection scheduler started"
        );

        Ok(Self {
            workers,
            mode: config.mode,
            default_timeout: config.default_timeout(),
        })
    }

    /// Load the whole store once, then spawn the workers.
    pub fn from_store(
        store: &dyn CorpusStore,
        config: SchedulerConfig,
    ) -> Result<Self, MatchError> {
        let corpus = store.entries()?;
        Self::new(corpus, config)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn mode(&self) -> ScheduleMode {
        self.mode
    }

    /// Run a detection, applying the configured default timeout if any.
    pub async fn detect(
        &self,
        incoming: impl Into<Arc<[u8]>>,
    ) -> Result<Vec<LicenseMatch>, MatchError> {
        match self.default_timeout {
            Some(after) => self.detect_with_timeout(incoming, after).await,
            None => self.detect_with_id(Uuid::new_v4(), incoming).await,
        }
    }

    /// Run a detection, giving up after `after`.
    ///
    /// Giving up only stops the wait. Workers finish the request anyway and
    /// their replies are dropped.
    pub async fn detect_with_timeout(
        &self,
        incoming: impl Into<Arc<[u8]>>,
        after: Duration,
    ) -> Result<Vec<LicenseMatch>, MatchError> {
        let request_id = Uuid::new_v4();
        match tokio::time::timeout(after, self.detect_with_id(request_id, incoming)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(%request_id, ?after, "detection request timed out");
                Err(MatchError::Timeout { request_id, after })
            }
        }
    }

    /// Run a detection under a caller-supplied request id, without a deadline.
    pub async fn detect_with_id(
        &self,
        request_id: Uuid,
        incoming: impl Into<Arc<[u8]>>,
    ) -> Result<Vec<LicenseMatch>, MatchError> {
        let incoming: Arc<[u8]> = incoming.into();
        let targets: Vec<usize> = match self.mode {
            ScheduleMode::FanOut => (0..self.workers.len()).collect(),
            ScheduleMode::LeastLoaded => self.least_loaded().into_iter().collect(),
        };
        if targets.is_empty() {
            return Err(MatchError::WorkerUnavailable("scheduler has no workers".into()));
        }

        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
        for &worker in &targets {
            self.dispatch(
                worker,
                DetectionRequest {
                    id: request_id,
                    incoming: Arc::clone(&incoming),
                    reply: reply_tx.clone(),
                },
            )?;
        }
        drop(reply_tx);
        tracing::trace!(%request_id, workers = targets.len(), "dispatched detection request");

        let mut shards: Vec<Option<Vec<LicenseMatch>>> = vec![None; self.workers.len()];
        let mut pending = targets.len();
        while pending > 0 {
            let reply = reply_rx.recv().await.ok_or_else(|| {
                MatchError::WorkerUnavailable(format!(
                    "worker exited before answering request {request_id}"
                ))
            })?;
            if reply.request_id != request_id {
                tracing::trace!(%request_id, other = %reply.request_id, "discarding stray reply");
                continue;
            }
            shards[reply.worker] = Some(reply.result?);
            pending -= 1;
        }

        Ok(shards.into_iter().flatten().flatten().collect())
    }

    /// In-flight request count per worker, by worker index.
    pub fn load_info(&self) -> Vec<usize> {
        self.workers
            .iter()
            .map(|w| w.in_flight.load(Ordering::SeqCst))
            .collect()
    }

    /// Close the request channels and join every worker.
    ///
    /// Requests already queued, including ones whose callers timed out, are
    /// still answered first, and this call blocks the current thread until
    /// they are. From async code prefer dropping the scheduler, which moves
    /// the joins onto the runtime's blocking pool. Later calls to `detect`
    /// fail with [`MatchError::WorkerUnavailable`].
    pub fn shutdown(&mut self) {
        join_workers(self.close());
        tracing::debug!("detection scheduler stopped");
    }

    /// Drop every request sender and take the worker threads.
    fn close(&mut self) -> Vec<(usize, JoinHandle<()>)> {
        for worker in &mut self.workers {
            worker.sender.take();
        }
        self.workers
            .iter_mut()
            .enumerate()
            .filter_map(|(index, worker)| worker.thread.take().map(|thread| (index, thread)))
            .collect()
    }

    fn least_loaded(&self) -> Option<usize> {
        // `min_by_key` keeps the first minimum, so ties go to the lowest index.
        self.workers
            .iter()
            .enumerate()
            .min_by_key(|(_, w)| w.in_flight.load(Ordering::SeqCst))
            .map(|(index, _)| index)
    }

    fn dispatch(&self, index: usize, request: DetectionRequest) -> Result<(), MatchError> {
        let worker = &self.workers[index];
        let sender = worker.sender.as_ref().ok_or_else(|| {
            MatchError::WorkerUnavailable(format!("worker {index} has shut down"))
        })?;
        worker.in_flight.fetch_add(1, Ordering::SeqCst);
        if sender.send(request).is_err() {
            worker.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(MatchError::WorkerUnavailable(format!(
                "worker {index} is not accepting requests"
            )));
        }
        Ok(())
    }
}

impl Drop for DetectionScheduler {
    /// Inside a Tokio runtime the workers are joined on the blocking pool,
    /// so the dropping task returns without waiting for queued requests.
    fn drop(&mut self) {
        let threads = self.close();
        if threads.is_empty() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(move || {
                    join_workers(threads);
                    tracing::debug!("detection scheduler stopped");
                });
            }
            Err(_) => {
                join_workers(threads);
                tracing::debug!("detection scheduler stopped");
            }
        }
    }
}

fn join_workers(threads: Vec<(usize, JoinHandle<()>)>) {
    for (index, thread) in threads {
        if thread.join().is_err() {
            tracing::warn!(worker = index, "detection worker panicked");
        }
    }
}

struct Worker {
    index: usize,
    corpus: Arc<[CorpusEntry]>,
    range: Range<usize>,
    engine: DetectionEngine,
    in_flight: Arc<AtomicUsize>,
}

impl Worker {
    fn run(self, mut requests: mpsc::UnboundedReceiver<DetectionRequest>) {
        let shard = &self.corpus[self.range.clone()];
        while let Some(request) = requests.blocking_recv() {
            let result = self.engine.detect(&request.incoming, shard);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            let reply = WorkerReply {
                request_id: request.id,
                worker: self.index,
                result,
            };
            if request.reply.send(reply).is_err() {
                tracing::trace!(
                    worker = self.index,
                    request_id = %request.id,
                    "caller stopped waiting"
                );
            }
        }
    }
}

/// Contiguous near-equal split of `len` items over `parts` shards.
fn shard_range(len: usize, parts: usize, index: usize) -> Range<usize> {
    let start = index * len / parts;
    let end = (index + 1) * len / parts;
    start..end
}
