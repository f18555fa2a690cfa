//! Whole-document fuzzy hashes.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::{check_block_params, CtphConfig, CtphError};
use crate::digest::{accumulate, capped, Digest};

/// Separator between digests in the textual form.
pub const DIGEST_SEPARATOR: char = ':';

/// Ordered block digests for one document.
///
/// The textual form joins digests with `:`. An empty hash (from an empty
/// input) renders as the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FuzzyHash(Vec<Digest>);

impl FuzzyHash {
    pub fn new(digests: Vec<Digest>) -> Self {
        Self(digests)
    }

    pub fn digests(&self) -> &[Digest] {
        &self.0
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Digest> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<Digest> {
        self.0
    }
}

impl From<Vec<Digest>> for FuzzyHash {
    fn from(digests: Vec<Digest>) -> Self {
        Self(digests)
    }
}

impl FromIterator<Digest> for FuzzyHash {
    fn from_iter<I: IntoIterator<Item = Digest>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl AsRef<[Digest]> for FuzzyHash {
    fn as_ref(&self) -> &[Digest] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a FuzzyHash {
    type Item = &'a Digest;
    type IntoIter = std::slice::Iter<'a, Digest>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for FuzzyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for digest in &self.0 {
            if !first {
                write!(f, "{DIGEST_SEPARATOR}")?;
            }
            first = false;
            write!(f, "{digest}")?;
        }
        Ok(())
    }
}

impl FromStr for FuzzyHash {
    type Err = CtphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::default());
        }
        s.split(DIGEST_SEPARATOR)
            .map(str::parse::<Digest>)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl Serialize for FuzzyHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FuzzyHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Splits `input` into consecutive `block_size` byte blocks and hashes each.
///
/// The result has `ceil(input.len() / block_size)` digests, in input order.
/// Zero for either parameter is an error.
///
/// ```rust
/// use ctph::fuzzy_hash;
///
/// let hash = fuzzy_hash(b"abcdefghij", 4, 5).unwrap();
/// assert_eq!(hash.len(), 3);
/// assert_eq!(hash.to_string(), "1s0ua:1unuq:2ld");
/// ```
pub fn fuzzy_hash(
    input: &[u8],
    block_size: usize,
    hash_length: usize,
) -> Result<FuzzyHash, CtphError> {
    check_block_params(block_size, hash_length)?;
    let hash: FuzzyHash = input
        .chunks(block_size)
        .map(|block| accumulate(capped(block, hash_length)))
        .collect();
    tracing::trace!(
        input_len = input.len(),
        block_size,
        hash_length,
        blocks = hash.len(),
        "fuzzy hash computed"
    );
    Ok(hash)
}

/// Config-driven variant of [`fuzzy_hash`].
///
/// With `use_parallel` set, blocks are hashed on the rayon pool. Block order
/// is preserved, so the output equals the sequential result.
pub fn fuzzy_hash_with(input: &[u8], cfg: &CtphConfig) -> Result<FuzzyHash, CtphError> {
    cfg.validate()?;
    if !cfg.use_parallel {
        return fuzzy_hash(input, cfg.block_size, cfg.hash_length);
    }
    let hash_length = cfg.hash_length;
    let digests: Vec<Digest> = input
        .par_chunks(cfg.block_size)
        .map(|block| accumulate(capped(block, hash_length)))
        .collect();
    Ok(FuzzyHash(digests))
}
