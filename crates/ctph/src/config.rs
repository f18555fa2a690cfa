//! Configuration and error types for fuzzy hashing.
//!
//! The block size and per-block hash length are the only knobs that change
//! the output. Both travel with every stored fingerprint, so a corpus can mix
//! entries hashed under different settings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for [`fuzzy_hash_with`](crate::fuzzy_hash_with).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CtphConfig {
    /// Configuration schema version.
    pub version: u32,
    /// Bytes per block. The last block of an input may be shorter.
    ///
    /// Smaller blocks tolerate more edits but make the hash longer and raise
    /// the chance of accidental block collisions.
    pub block_size: usize,
    /// Maximum number of bytes of each block fed to the accumulator.
    ///
    /// Bytes past this cap do not influence the digest.
    pub hash_length: usize,
    /// Hash blocks on the rayon pool. Output is identical either way.
    pub use_parallel: bool,
}

impl CtphConfig {
    /// Create a new configuration with the default block settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Block settings used by the first generation of the license corpus
    /// (block size 4, hash length 5).
    pub fn legacy() -> Self {
        Self {
            block_size: 4,
            hash_length: 5,
            ..Self::default()
        }
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_hash_length(mut self, hash_length: usize) -> Self {
        self.hash_length = hash_length;
        self
    }

    /// Enable or disable parallel block hashing.
    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), CtphError> {
        if self.version < 1 {
            return Err(CtphError::InvalidConfigVersion {
                version: self.version,
            });
        }
        check_block_params(self.block_size, self.hash_length)
    }
}

impl Default for CtphConfig {
    fn default() -> Self {
        Self {
            version: 1,
            block_size: 10,
            hash_length: 7,
            use_parallel: false,
        }
    }
}

pub(crate) fn check_block_params(block_size: usize, hash_length: usize) -> Result<(), CtphError> {
    if block_size == 0 {
        return Err(CtphError::InvalidArgument {
            parameter: "block_size",
            value: block_size,
        });
    }
    check_hash_length(hash_length)
}

pub(crate) fn check_hash_length(hash_length: usize) -> Result<(), CtphError> {
    if hash_length == 0 {
        return Err(CtphError::InvalidArgument {
            parameter: "hash_length",
            value: hash_length,
        });
    }
    Ok(())
}

/// Errors returned by the hashing layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CtphError {
    #[error("invalid argument: {parameter} must be >= 1 (got {value})")]
    InvalidArgument {
        parameter: &'static str,
        value: usize,
    },

    #[error("malformed digest {input:?}")]
    MalformedDigest { input: String },

    #[error("invalid config version {version}; expected >= 1")]
    InvalidConfigVersion { version: u32 },
}
