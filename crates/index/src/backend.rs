use crate::{CorpusEntry, IndexError};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Storage for a license corpus.
///
/// Stores are append-only between clears and always yield entries in
/// insertion order.
pub trait CorpusStore: Send + Sync {
    /// Append one entry durably.
    fn append(&self, entry: &CorpusEntry) -> Result<(), IndexError>;

    /// Append several entries. Stores may override this to batch writes.
    fn append_batch(&self, entries: &[CorpusEntry]) -> Result<(), IndexError> {
        for entry in entries {
            self.append(entry)?;
        }
        Ok(())
    }

    /// Visit every entry in insertion order.
    ///
    /// Returning `ControlFlow::Break` from the visitor ends the scan early.
    /// The visitor must not call back into the same store.
    fn scan(
        &self,
        visitor: &mut dyn FnMut(&CorpusEntry) -> Result<ControlFlow<()>, IndexError>,
    ) -> Result<(), IndexError>;

    /// Number of stored entries.
    fn count(&self) -> Result<usize, IndexError>;

    /// Remove every entry.
    fn clear(&self) -> Result<(), IndexError>;

    /// Collect the whole corpus into memory.
    fn entries(&self) -> Result<Vec<CorpusEntry>, IndexError> {
        let mut out = Vec::new();
        self.scan(&mut |entry| {
            out.push(entry.clone());
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(out)
    }

    /// Flush any buffered writes.
    fn flush(&self) -> Result<(), IndexError> {
        Ok(())
    }
}

/// Configuration for selecting and building a store.
///
/// # Example
/// ```
/// use index::StoreConfig;
///
/// // In-memory (for testing)
/// let config = StoreConfig::in_memory();
///
/// // The text log license corpora ship as
/// let config = StoreConfig::flat_file("licenses.db");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Keep entries in a `Vec`. Nothing survives the process.
    #[default]
    InMemory,
    /// Append-only text file, see [`crate::record`].
    FlatFile { path: PathBuf },
    /// Redb database file.
    ///
    /// Requires the `backend-redb` feature (enabled by default).
    Redb { path: PathBuf },
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        StoreConfig::InMemory
    }

    pub fn flat_file<P: Into<PathBuf>>(path: P) -> Self {
        StoreConfig::FlatFile { path: path.into() }
    }

    pub fn redb<P: Into<PathBuf>>(path: P) -> Self {
        StoreConfig::Redb { path: path.into() }
    }

    /// The same backend at another location. An in-memory config has no
    /// location, so it becomes a flat file.
    pub fn at_path<P: Into<PathBuf>>(&self, path: P) -> Self {
        match self {
            StoreConfig::Redb { .. } => StoreConfig::redb(path),
            StoreConfig::InMemory | StoreConfig::FlatFile { .. } => StoreConfig::flat_file(path),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            StoreConfig::InMemory => None,
            StoreConfig::FlatFile { path } | StoreConfig::Redb { path } => Some(path),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.path().is_some()
    }

    /// Open (or create) the configured store.
    pub fn build(&self) -> Result<Box<dyn CorpusStore>, IndexError> {
        match self {
            StoreConfig::InMemory => Ok(Box::new(InMemoryCorpus::new())),
            StoreConfig::FlatFile { path } => Ok(Box::new(flat_file::FlatFileCorpus::open(path)?)),
            StoreConfig::Redb { path } => {
                #[cfg(feature = "backend-redb")]
                {
                    Ok(Box::new(RedbCorpus::open(path)?))
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = path;
                    Err(IndexError::backend("redb backend disabled at compile time"))
                }
            }
        }
    }
}

/// An in-memory store using a `RwLock` around a `Vec`.
pub struct InMemoryCorpus {
    entries: RwLock<Vec<CorpusEntry>>,
}

impl InMemoryCorpus {
    pub fn new() -> Self {
        Self::from_entries(Vec::new())
    }

    pub fn from_entries(entries: Vec<CorpusEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }
}

impl Default for InMemoryCorpus {
    fn default() -> Self {
        Self::new()
    }
}

impl CorpusStore for InMemoryCorpus {
    fn append(&self, entry: &CorpusEntry) -> Result<(), IndexError> {
        self.entries
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?
            .push(entry.clone());
        Ok(())
    }

    fn append_batch(&self, entries: &[CorpusEntry]) -> Result<(), IndexError> {
        // One write lock for the whole batch.
        self.entries
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?
            .extend_from_slice(entries);
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&CorpusEntry) -> Result<ControlFlow<()>, IndexError>,
    ) -> Result<(), IndexError> {
        let guard = self
            .entries
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        for entry in guard.iter() {
            if visitor(entry)?.is_break() {
                break;
            }
        }
        Ok(())
    }

    fn count(&self) -> Result<usize, IndexError> {
        let guard = self
            .entries
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        Ok(guard.len())
    }

    fn clear(&self) -> Result<(), IndexError> {
        self.entries
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?
            .clear();
        Ok(())
    }

    fn entries(&self) -> Result<Vec<CorpusEntry>, IndexError> {
        let guard = self
            .entries
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        Ok(guard.clone())
    }
}

pub mod flat_file;

/// Redb-backed corpus store.
#[cfg(feature = "backend-redb")]
pub mod redb;

#[cfg(feature = "backend-redb")]
pub use self::redb::RedbCorpus;
