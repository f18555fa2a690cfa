//! # License corpus storage
//!
//! A corpus is an ordered list of [`CorpusEntry`] values: a license name, the
//! license's fuzzy hash, and the block settings the hash was computed with.
//! Detection walks the whole corpus for every incoming document, so the only
//! access pattern stores need to be good at is "iterate everything in
//! insertion order".
//!
//! ## Stores
//!
//! All stores implement [`CorpusStore`]:
//!
//! - [`InMemoryCorpus`]: a `Vec` behind a lock, for tests and for corpora
//!   built on the fly.
//! - [`FlatFileCorpus`]: the append-only text log that license corpora are
//!   shipped as. See [`record`] for the byte layout.
//! - `RedbCorpus`: an embedded key-value store (enabled via the
//!   `backend-redb` feature, on by default).
//!
//! [`StoreConfig`] selects one at runtime.
//!
//! ## Example
//!
//! ```
//! use index::{CorpusEntry, CorpusStore, StoreConfig};
//!
//! let store = StoreConfig::in_memory().build().unwrap();
//! let entry = CorpusEntry::compute("MIT", b"Permission is hereby granted", 10, 7).unwrap();
//! store.append(&entry).unwrap();
//!
//! assert_eq!(store.count().unwrap(), 1);
//! assert_eq!(store.entries().unwrap()[0].name, "MIT");
//! ```

mod backend;
pub mod record;

pub use backend::flat_file::FlatFileCorpus;
#[cfg(feature = "backend-redb")]
pub use backend::RedbCorpus;
pub use backend::{CorpusStore, InMemoryCorpus, StoreConfig};

use ctph::{fuzzy_hash, fuzzy_hash_with, CtphConfig, CtphError, FuzzyHash};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One fingerprinted reference license.
///
/// Names are not required to be unique: the same license may appear several
/// times, hashed with different block settings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub name: String,
    pub hash: FuzzyHash,
    pub block_size: usize,
    pub hash_length: usize,
}

impl CorpusEntry {
    pub fn new(
        name: impl Into<String>,
        hash: FuzzyHash,
        block_size: usize,
        hash_length: usize,
    ) -> Self {
        Self {
            name: name.into(),
            hash,
            block_size,
            hash_length,
        }
    }

    /// Hashes `bytes` and records the settings used.
    pub fn compute(
        name: impl Into<String>,
        bytes: &[u8],
        block_size: usize,
        hash_length: usize,
    ) -> Result<Self, CtphError> {
        let hash = fuzzy_hash(bytes, block_size, hash_length)?;
        Ok(Self::new(name, hash, block_size, hash_length))
    }

    /// Like [`CorpusEntry::compute`], driven by a [`CtphConfig`].
    pub fn compute_with(
        name: impl Into<String>,
        bytes: &[u8],
        cfg: &CtphConfig,
    ) -> Result<Self, CtphError> {
        let hash = fuzzy_hash_with(bytes, cfg)?;
        Ok(Self::new(name, hash, cfg.block_size, cfg.hash_length))
    }
}

/// Custom error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Record encode error: {0}")]
    Encode(String),
    #[error("Record decode error: {0}")]
    Decode(String),
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Io(e.to_string())
    }
}

impl From<bincode::error::EncodeError> for IndexError {
    fn from(e: bincode::error::EncodeError) -> Self {
        IndexError::Encode(e.to_string())
    }
}

impl From<bincode::error::DecodeError> for IndexError {
    fn from(e: bincode::error::DecodeError) -> Self {
        IndexError::Decode(e.to_string())
    }
}

impl IndexError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }

    pub fn decode<E: std::fmt::Display>(err: E) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_records_settings() {
        let entry = CorpusEntry::compute("Apache-2.0", b"abcdefghij", 4, 5).expect("hash");
        assert_eq!(entry.name, "Apache-2.0");
        assert_eq!(entry.hash.to_string(), "1s0ua:1unuq:2ld");
        assert_eq!(entry.block_size, 4);
        assert_eq!(entry.hash_length, 5);
    }

    #[test]
    fn compute_with_config_matches_compute() {
        let cfg = CtphConfig::default().with_parallel(true);
        let a = CorpusEntry::compute_with("x", b"some license text", &cfg).expect("hash");
        let b = CorpusEntry::compute("x", b"some license text", 10, 7).expect("hash");
        assert_eq!(a, b);
    }

    #[test]
    fn compute_rejects_zero_block_size() {
        assert!(matches!(
            CorpusEntry::compute("x", b"abc", 0, 5),
            Err(CtphError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn entry_serializes_hash_as_text() {
        let entry = CorpusEntry::compute("MIT", b"hello world", 5, 3).expect("hash");
        let json = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(json["hash"], "27m7:qns:2s");
        let back: CorpusEntry = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, entry);
    }

    #[test]
    fn io_errors_map_to_io_variant() {
        let err: IndexError = std::io::Error::other("disk gone").into();
        assert!(matches!(err, IndexError::Io(msg) if msg.contains("disk gone")));
    }
}
