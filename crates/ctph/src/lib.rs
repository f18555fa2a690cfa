//! # Fixed-block fuzzy hashing
//!
//! Context-triggered piecewise hashing, simplified to fixed, non-overlapping
//! blocks. A document is cut into `block_size` byte blocks, each block is
//! reduced to a short [`Digest`], and the ordered digests form the document's
//! [`FuzzyHash`]. Two hashes are compared position by position; the share of
//! equal positions is the confidence that the documents are the same text.
//!
//! The scheme is tuned for license texts that have been minified (see the
//! `canonical` crate): small edits change a handful of blocks and leave the
//! rest aligned. Insertions shift every later block, so heavily re-flowed
//! texts score low.
//!
//! The accumulator is deliberately weak and fast. It offers no collision
//! resistance and must not be used where an adversary picks the input.
//!
//! ## Example
//!
//! ```
//! use ctph::{compare_hashes, fuzzy_hash};
//!
//! let original = fuzzy_hash(b"Permission is hereby granted, free of charge", 10, 7).unwrap();
//! let edited = fuzzy_hash(b"Permission is hereby granted, free of charges", 10, 7).unwrap();
//!
//! let sim = compare_hashes(&original, &edited, 0.5);
//! assert_eq!(sim.common_blocks, 4);
//! assert_eq!(sim.total_blocks, 5);
//! ```

pub mod compare;
pub mod config;
pub mod digest;
pub mod fuzzy;

pub use crate::compare::{compare_digests, compare_hashes, Similarity};
pub use crate::config::{CtphConfig, CtphError};
pub use crate::digest::{hash_block, Digest};
pub use crate::fuzzy::{fuzzy_hash, fuzzy_hash_with, FuzzyHash, DIGEST_SEPARATOR};
