//! Canonical text layer for license fingerprinting.
//!
//! Fuzzy hashes are computed over fixed-size byte blocks, so a single extra
//! space near the top of a file shifts every block after it. This crate
//! removes the formatting noise that license files typically differ in before
//! they are hashed.
//!
//! ## What we do
//!
//! - SPDX front-matter removal (`---` fenced metadata)
//! - Optional Unicode NFKC normalization and lowercasing
//! - Whitespace stripping (space, tab, CR, LF)
//!
//! ## Pure function guarantee
//!
//! No I/O, no clock calls, no locale dependence. Same text plus same config
//! gives the same output on any machine.

mod config;
mod error;
mod heading;
mod pipeline;
mod whitespace;

pub use crate::config::CanonicalizeConfig;
pub use crate::error::CanonicalError;
pub use crate::heading::strip_spdx_heading;
pub use crate::pipeline::{canonicalize, CanonicalText};
pub use crate::whitespace::{collapse_whitespace, strip_whitespace, STRIPPED_CHARS};
