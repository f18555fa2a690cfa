//! Flat-file corpus store.
//!
//! The file is a 14 byte header holding the entry count, followed by
//! length-prefixed records (see [`crate::record`]). Appends go to the end of
//! the file and then rewrite the header, so `count` never has to walk the
//! records.

use crate::record::{decode_body, decode_header, decode_length, encode_header, encode_record};
use crate::record::{HEADER_LEN, LENGTH_WIDTH};
use crate::{CorpusEntry, CorpusStore, IndexError};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Files this small cannot hold a header and are (re)initialized empty.
const MIN_INITIALIZED_LEN: u64 = 2;

pub struct FlatFileCorpus {
    path: PathBuf,
    file: Mutex<File>,
}

impl FlatFileCorpus {
    /// Open or create a corpus file at `path`.
    ///
    /// # Example
    /// ```no_run
    /// use index::FlatFileCorpus;
    ///
    /// let store = FlatFileCorpus::open("/tmp/licenses.db").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if file.metadata()?.len() <= MIN_INITIALIZED_LEN {
            write_header(&mut file, 0)?;
            tracing::debug!(path = %path.display(), "initialized empty corpus file");
        } else {
            // Fail early on files that are not corpora at all.
            read_header(&mut file)?;
        }

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, File>, IndexError> {
        self.file
            .lock()
            .map_err(|_| IndexError::backend("poisoned lock"))
    }
}

fn read_header(file: &mut File) -> Result<usize, IndexError> {
    file.seek(SeekFrom::Start(0))?;
    let mut buf = [0u8; HEADER_LEN];
    file.read_exact(&mut buf)
        .map_err(|e| IndexError::decode(format!("reading corpus header: {e}")))?;
    decode_header(&buf)
}

fn write_header(file: &mut File, count: usize) -> Result<(), IndexError> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(encode_header(count).as_bytes())?;
    Ok(())
}

impl CorpusStore for FlatFileCorpus {
    fn append(&self, entry: &CorpusEntry) -> Result<(), IndexError> {
        self.append_batch(std::slice::from_ref(entry))
    }

    fn append_batch(&self, entries: &[CorpusEntry]) -> Result<(), IndexError> {
        let mut buf = Vec::new();
        for entry in entries {
            buf.extend(encode_record(entry)?);
        }

        let mut file = self.lock()?;
        let count = read_header(&mut file)?;
        file.seek(SeekFrom::End(0))?;
        file.write_all(&buf)?;
        write_header(&mut file, count + entries.len())?;

        tracing::trace!(
            path = %self.path.display(),
            appended = entries.len(),
            total = count + entries.len(),
            "appended corpus records"
        );
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&CorpusEntry) -> Result<ControlFlow<()>, IndexError>,
    ) -> Result<(), IndexError> {
        let mut file = self.lock()?;
        let count = read_header(&mut file)?;
        let mut reader = BufReader::new(&mut *file);

        let mut prefix = [0u8; LENGTH_WIDTH];
        let mut body = Vec::new();
        for index in 0..count {
            reader.read_exact(&mut prefix).map_err(|e| {
                IndexError::decode(format!("record {index} of {count}: length prefix: {e}"))
            })?;
            let len = decode_length(&prefix)?;
            body.resize(len, 0);
            reader.read_exact(&mut body).map_err(|e| {
                IndexError::decode(format!("record {index} of {count}: body: {e}"))
            })?;

            let entry = decode_body(&body)?;
            if visitor(&entry)?.is_break() {
                break;
            }
        }
        Ok(())
    }

    fn count(&self) -> Result<usize, IndexError> {
        let mut file = self.lock()?;
        read_header(&mut file)
    }

    fn clear(&self) -> Result<(), IndexError> {
        let mut file = self.lock()?;
        file.set_len(0)?;
        write_header(&mut file, 0)?;
        tracing::debug!(path = %self.path.display(), "cleared corpus file");
        Ok(())
    }

    fn flush(&self) -> Result<(), IndexError> {
        let mut file = self.lock()?;
        file.flush()?;
        file.sync_data()?;
        Ok(())
    }
}
