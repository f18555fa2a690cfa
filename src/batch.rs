//! Batch corpus computation.
//!
//! Turns a folder of license texts into [`CorpusEntry`] values, one per file,
//! named after the file. Per-file hash settings come from an override map
//! shaped like
//!
//! ```json
//! { "GPL-3.0": { "blockSize": 20 }, "Zlib": { "blockSize": 6, "fuzzyHashLength": 4 } }
//! ```
//!
//! Either field may be omitted; omitted or zero values use the defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use canonical::CanonicalizeConfig;
use ctph::CtphConfig;
use index::{CorpusEntry, CorpusStore, IndexError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{PipelineError, fingerprint_bytes, fingerprint_text};

/// Per-file hash settings, keyed by file name.
pub type Overrides = BTreeMap<String, CtphOverride>;

/// Hash settings for one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtphOverride {
    #[serde(
        rename = "blockSize",
        alias = "block_size",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub block_size: Option<usize>,
    #[serde(
        rename = "fuzzyHashLength",
        alias = "hash_length",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub hash_length: Option<usize>,
}

impl CtphOverride {
    /// Apply this override on top of `defaults`.
    pub fn resolve(&self, defaults: &CtphConfig) -> CtphConfig {
        let mut cfg = defaults.clone();
        if let Some(block_size) = self.block_size.filter(|&n| n > 0) {
            cfg.block_size = block_size;
        }
        if let Some(hash_length) = self.hash_length.filter(|&n| n > 0) {
            cfg.hash_length = hash_length;
        }
        cfg
    }
}

/// Settings shared by every file of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusDefaults {
    pub ctph: CtphConfig,
    /// Normalization applied before hashing. `None` hashes the raw bytes.
    pub canonical: Option<CanonicalizeConfig>,
}

impl Default for CorpusDefaults {
    fn default() -> Self {
        Self {
            ctph: CtphConfig::default(),
            canonical: Some(CanonicalizeConfig::default()),
        }
    }
}

impl CorpusDefaults {
    pub fn new(ctph: CtphConfig) -> Self {
        Self {
            ctph,
            ..Self::default()
        }
    }

    pub fn with_canonical(mut self, canonical: CanonicalizeConfig) -> Self {
        self.canonical = Some(canonical);
        self
    }

    /// Hash file contents exactly as stored on disk.
    pub fn raw(mut self) -> Self {
        self.canonical = None;
        self
    }
}

/// Errors from batch computation.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse overrides {path}: {source}")]
    Overrides {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to fingerprint {file}: {source}")]
    Fingerprint {
        file: String,
        #[source]
        source: PipelineError,
    },

    #[error("failed to write corpus: {0}")]
    Store(#[from] IndexError),
}

/// Load an override map from a JSON file.
pub fn load_overrides<P: AsRef<Path>>(path: P) -> Result<Overrides, BatchError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| BatchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| BatchError::Overrides {
        path: path.to_path_buf(),
        source,
    })
}

/// Fingerprint every regular file directly inside `dir`.
///
/// Files are processed in file-name order so the resulting corpus, and any
/// store written from it, is the same on every platform. Subdirectories are
/// skipped.
pub fn compute_corpus<P: AsRef<Path>>(
    dir: P,
    defaults: &CorpusDefaults,
    overrides: &Overrides,
) -> Result<Vec<CorpusEntry>, BatchError> {
    let dir = dir.as_ref();
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| BatchError::Io { path, source }
    };

    let mut files = Vec::new();
    for item in fs::read_dir(dir).map_err(io_err(dir))? {
        let item = item.map_err(io_err(dir))?;
        if !item.file_type().map_err(io_err(&item.path()))?.is_file() {
            continue;
        }
        files.push((item.file_name().to_string_lossy().into_owned(), item.path()));
    }
    files.sort();

    let mut entries = Vec::with_capacity(files.len());
    for (name, path) in &files {
        let bytes = fs::read(path).map_err(io_err(path))?;
        let ctph = match overrides.get(name) {
            Some(over) => over.resolve(&defaults.ctph),
            None => defaults.ctph.clone(),
        };
        let entry = match &defaults.canonical {
            Some(canonical) => {
                fingerprint_text(name, &String::from_utf8_lossy(&bytes), canonical, &ctph)
            }
            None => fingerprint_bytes(name, &bytes, &ctph),
        }
        .map_err(|source| BatchError::Fingerprint {
            file: name.clone(),
            source,
        })?;

        tracing::debug!(
            file = %name,
            block_size = entry.block_size,
            hash_length = entry.hash_length,
            blocks = entry.hash.len(),
            "fingerprinted license"
        );
        entries.push(entry);
    }

    for name in overrides.keys() {
        if !files.iter().any(|(file, _)| file == name) {
            tracing::warn!(file = %name, "override does not match any file");
        }
    }

    tracing::info!(
        dir = %dir.display(),
        licenses = entries.len(),
        overridden = entries.iter().filter(|e| overrides.contains_key(&e.name)).count(),
        "computed license corpus"
    );
    Ok(entries)
}

/// Replace the contents of `store` with `entries` and flush it.
pub fn replace_corpus(store: &dyn CorpusStore, entries: &[CorpusEntry]) -> Result<(), BatchError> {
    store.clear()?;
    store.append_batch(entries)?;
    store.flush()?;
    Ok(())
}
