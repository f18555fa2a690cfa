//! Redb (Rust embedded database) corpus store.
//!
//! Entries live in one table keyed by a big-endian `u64` sequence number, so
//! redb's key order is insertion order. Values are bincode-encoded
//! [`CorpusEntry`] records. The entry count sits in a separate metadata table
//! and is updated in the same transaction as every write.
//!
//! # Configuration Example
//! ```yaml
//! index:
//!   backend: redb
//!   path: /data/licenses.redb
//! ```

use crate::{CorpusEntry, CorpusStore, IndexError};
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;

const ENTRIES_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("corpus_entries");
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("corpus_meta");
const COUNT_KEY: &str = "count";

/// Redb-backed [`CorpusStore`].
///
/// Every write is its own ACID transaction. The `Arc<Database>` wrapper
/// allows sharing across threads; redb handles its own locking.
pub struct RedbCorpus {
    db: Arc<Database>,
}

impl RedbCorpus {
    /// Open or create a Redb database at the given path.
    ///
    /// # Example
    /// ```no_run
    /// use index::RedbCorpus;
    ///
    /// let store = RedbCorpus::open("/tmp/licenses.redb").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let db = Database::create(path).map_err(IndexError::backend)?;

        // Create both tables up front so read transactions never miss them.
        let write_txn = db.begin_write().map_err(IndexError::backend)?;
        {
            write_txn
                .open_table(ENTRIES_TABLE)
                .map_err(IndexError::backend)?;
            write_txn
                .open_table(META_TABLE)
                .map_err(IndexError::backend)?;
        }
        write_txn.commit().map_err(IndexError::backend)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn stored_count(txn: &WriteTransaction) -> Result<u64, IndexError> {
        let meta = txn.open_table(META_TABLE).map_err(IndexError::backend)?;
        let count = meta
            .get(COUNT_KEY)
            .map_err(IndexError::backend)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        Ok(count)
    }
}

impl CorpusStore for RedbCorpus {
    fn append(&self, entry: &CorpusEntry) -> Result<(), IndexError> {
        self.append_batch(std::slice::from_ref(entry))
    }

    fn append_batch(&self, entries: &[CorpusEntry]) -> Result<(), IndexError> {
        let write_txn = self.db.begin_write().map_err(IndexError::backend)?;
        let start = Self::stored_count(&write_txn)?;
        let mut next = start;
        {
            let mut table = write_txn
                .open_table(ENTRIES_TABLE)
                .map_err(IndexError::backend)?;
            for entry in entries {
                let value = encode_to_vec(entry, standard())?;
                table
                    .insert(&next.to_be_bytes()[..], value.as_slice())
                    .map_err(IndexError::backend)?;
                next += 1;
            }
        }
        {
            let mut meta = write_txn
                .open_table(META_TABLE)
                .map_err(IndexError::backend)?;
            meta.insert(COUNT_KEY, next).map_err(IndexError::backend)?;
        }
        write_txn.commit().map_err(IndexError::backend)?;

        tracing::trace!(appended = next - start, total = next, "appended redb corpus entries");
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&CorpusEntry) -> Result<ControlFlow<()>, IndexError>,
    ) -> Result<(), IndexError> {
        let read_txn = self.db.begin_read().map_err(IndexError::backend)?;
        let table = read_txn
            .open_table(ENTRIES_TABLE)
            .map_err(IndexError::backend)?;

        for item in table.iter().map_err(IndexError::backend)? {
            let (_, value) = item.map_err(IndexError::backend)?;
            let (entry, _): (CorpusEntry, usize) = decode_from_slice(value.value(), standard())?;
            if visitor(&entry)?.is_break() {
                break;
            }
        }

        Ok(())
    }

    fn count(&self) -> Result<usize, IndexError> {
        let read_txn = self.db.begin_read().map_err(IndexError::backend)?;
        let meta = read_txn
            .open_table(META_TABLE)
            .map_err(IndexError::backend)?;
        let count = meta
            .get(COUNT_KEY)
            .map_err(IndexError::backend)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        usize::try_from(count).map_err(IndexError::backend)
    }

    fn clear(&self) -> Result<(), IndexError> {
        let write_txn = self.db.begin_write().map_err(IndexError::backend)?;
        write_txn
            .delete_table(ENTRIES_TABLE)
            .map_err(IndexError::backend)?;
        {
            write_txn
                .open_table(ENTRIES_TABLE)
                .map_err(IndexError::backend)?;
            let mut meta = write_txn
                .open_table(META_TABLE)
                .map_err(IndexError::backend)?;
            meta.insert(COUNT_KEY, 0u64).map_err(IndexError::backend)?;
        }
        write_txn.commit().map_err(IndexError::backend)?;
        tracing::debug!("cleared redb corpus");
        Ok(())
    }

    fn flush(&self) -> Result<(), IndexError> {
        // Commits are durable on return.
        Ok(())
    }
}
