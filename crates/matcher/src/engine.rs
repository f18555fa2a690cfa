use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::time::Instant;

use ctph::{compare_hashes, fuzzy_hash, CtphError, FuzzyHash};
use index::{CorpusEntry, CorpusStore};

use crate::metrics::metrics_recorder;
use crate::types::{DetectionOptions, LicenseMatch, MatchError};


/// Scans a corpus of precomputed fingerprints against one incoming document.
///
/// The engine itself is stateless apart from its options. Every call to
/// [`DetectionEngine::detect`] hashes the incoming bytes lazily, once per
/// distinct `(block_size, hash_length)` pair found in the corpus.
#[derive(Debug, Clone)]
pub struct DetectionEngine {
    options: DetectionOptions,
}

impl DetectionEngine {
    /// Build an engine, rejecting invalid thresholds up front.
    pub fn new(options: DetectionOptions) -> Result<Self, MatchError> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &DetectionOptions {
        &self.options
    }

    /// Compare `incoming` against every entry of `corpus`, in the order given.
    ///
    /// Matches come back in corpus order. Use [`crate::sort_by_confidence`]
    /// to rank them. With an early-exit threshold set, the scan stops at the
    /// first entry whose confidence reaches it; that entry is included when it
    /// also clears the minimum threshold.
    pub fn detect<'a, I>(
        &self,
        incoming: &[u8],
        corpus: I,
    ) -> Result<Vec<LicenseMatch>, MatchError>
    where
        I: IntoIterator<Item = &'a CorpusEntry>,
    {
        let span = tracing::debug_span!("detect", incoming_len = incoming.len());
        let _guard = span.enter();

        let mut pass = DetectionPass::new(incoming, &self.options);
        for entry in corpus {
            if pass.visit(entry)?.is_break() {
                break;
            }
        }
        Ok(pass.finish())
    }

    /// Like [`DetectionEngine::detect`], streaming entries out of a store.
    ///
    /// Store failures surface as [`MatchError::Store`]; a partially scanned
    /// store never yields a partial result.
    pub fn detect_in_store(
        &self,
        incoming: &[u8],
        store: &dyn CorpusStore,
    ) -> Result<Vec<LicenseMatch>, MatchError> {
        let span = tracing::debug_span!("detect_in_store", incoming_len = incoming.len());
        let _guard = span.enter();

        let mut pass = DetectionPass::new(incoming, &self.options);
        let mut hash_error: Option<CtphError> = None;
        store.scan(&mut |entry| match pass.visit(entry) {
            Ok(flow) => Ok(flow),
            Err(err) => {
                hash_error = Some(err);
                Ok(ControlFlow::Break(()))
            }
        })?;
        if let Some(err) = hash_error {
            return Err(err.into());
        }
        Ok(pass.finish())
    }
}

/// State of one detection call. The hash cache never outlives it.
struct DetectionPass<'a> {
    incoming: &'a [u8],
    options: &'a DetectionOptions,
    cache: HashMap<(usize, usize), FuzzyHash>,
    matches: Vec<LicenseMatch>,
    scanned: usize,
    early_exit: bool,
    start: Instant,
}

impl<'a> DetectionPass<'a> {
    fn new(incoming: &'a [u8], options: &'a DetectionOptions) -> Self {
        Self {
            incoming,
            options,
            cache: HashMap::new(),
            matches: Vec::new(),
            scanned: 0,
            early_exit: false,
            start: Instant::now(),
        }
    }

    fn visit(&mut self, entry: &CorpusEntry) -> Result<ControlFlow<()>, CtphError> {
        self.scanned += 1;

        let key = (entry.block_size, entry.hash_length);
        let incoming_hash = match self.cache.entry(key) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => slot.insert(fuzzy_hash(self.incoming, key.0, key.1)?),
        };

        let min = self.options.min_confidence_threshold;
        let sim = compare_hashes(incoming_hash, &entry.hash, min);
        let Some(found) = LicenseMatch::from_similarity(entry.name.as_str(), &sim) else {
            return Ok(ControlFlow::Continue(()));
        };

        tracing::trace!(
            name = %entry.name,
            confidence = found.confidence,
            common_blocks = found.common_blocks,
            total_blocks = found.total_blocks,
            "compared corpus entry"
        );

        let reached_exit = self
            .options
            .early_exit_threshold
            .is_some_and(|threshold| found.confidence >= threshold);
        if found.confidence >= min {
            self.matches.push(found);
        }
        if reached_exit {
            self.early_exit = true;
            return Ok(ControlFlow::Break(()));
        }
        Ok(ControlFlow::Continue(()))
    }

    fn finish(self) -> Vec<LicenseMatch> {
        let latency = self.start.elapsed();
        tracing::debug!(
            entries = self.scanned,
            hits = self.matches.len(),
            early_exit = self.early_exit,
            hash_settings = self.cache.len(),
            ?latency,
            "detection pass finished"
        );
        if let Some(recorder) = metrics_recorder() {
            recorder.record_detection(latency, self.scanned, self.matches.len(), self.early_exit);
        }
        self.matches
    }
}
