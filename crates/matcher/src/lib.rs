//! # License Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` sits on top of the fuzzy-hash layer (`ctph`) and the corpus
//! stores (`index`). Given the bytes of an incoming document it answers
//! "which known licenses does this look like, and how confidently".
//!
//! ## Core Types
//!
//! - [`DetectionOptions`]: minimum confidence (default `0.1`) and an optional
//!   early-exit threshold.
//! - [`DetectionEngine`]: scans a corpus in order, hashing the incoming
//!   document once per distinct `(block_size, hash_length)` pair.
//! - [`LicenseMatch`]: name, confidence and block counts of one hit.
//! - [`DetectionScheduler`]: spreads detections over worker threads, either
//!   sharding the corpus ([`ScheduleMode::FanOut`]) or routing each request
//!   to the least busy worker ([`ScheduleMode::LeastLoaded`]).
//! - [`MatchMetrics`]: optional global observer, installed with
//!   [`set_match_metrics`].
//!
//! ## Example Usage
//!
//! ```
//! use index::CorpusEntry;
//! use matcher::{sort_by_confidence, DetectionEngine, DetectionOptions};
//!
//! let corpus = vec![
//!     CorpusEntry::compute("MIT", b"Permission is hereby granted, free of charge", 10, 7).unwrap(),
//!     CorpusEntry::compute("ISC", b"Permission to use, copy, modify, and/or distribute", 10, 7).unwrap(),
//! ];
//!
//! let engine = DetectionEngine::new(DetectionOptions::default()).unwrap();
//! let mut hits = engine
//!     .detect(b"Permission is hereby granted, free of charge", &corpus)
//!     .unwrap();
//! sort_by_confidence(&mut hits);
//!
//! assert_eq!(hits[0].name, "MIT");
//! assert_eq!(hits[0].confidence, 1.0);
//! ```
//!
//! Matches are returned in corpus order; ranking is left to the caller.

mod engine;
mod metrics;
mod scheduler;
mod types;

pub use crate::engine::DetectionEngine;
pub use crate::metrics::{set_match_metrics, MatchMetrics};
pub use crate::scheduler::{DetectionScheduler, ScheduleMode, SchedulerConfig};
pub use crate::types::{sort_by_confidence, DetectionOptions, LicenseMatch, MatchError};
