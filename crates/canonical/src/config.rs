//! Configuration types for the canonical text pipeline.
//!
//! [`CanonicalizeConfig`] decides which normalization steps run before a
//! license text is fingerprinted. The steps always run in the same order:
//! SPDX front matter first, then Unicode normalization, then lowercasing,
//! then whitespace stripping.
//!
//! # Versioning
//!
//! Any change to canonicalization output must come with a version bump, so
//! corpora built under an older version can be told apart.
//!
//! # Examples
//!
//! ```rust
//! use canonical::CanonicalizeConfig;
//!
//! let config = CanonicalizeConfig::default();
//! assert_eq!(config.version, 1);
//! assert!(config.strip_spdx_heading);
//! assert!(config.strip_whitespace);
//! assert!(!config.normalize_unicode);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CanonicalError;

/// Configuration for the canonical text pipeline.
///
/// The defaults reproduce the minification used to build the reference
/// license corpus: front matter and layout whitespace removed, everything else
/// byte-for-byte.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CanonicalizeConfig {
    /// Configuration schema version. Must be >= 1.
    pub version: u32,

    /// Remove a `---\n ... ---\n` front-matter block before anything else.
    pub strip_spdx_heading: bool,

    /// Apply Unicode NFKC normalization.
    ///
    /// Off by default: a corpus hashed without NFKC will not match inputs
    /// hashed with it whenever the text contains compatibility characters.
    pub normalize_unicode: bool,

    /// Apply locale-free Unicode lowercasing.
    pub lowercase: bool,

    /// Remove spaces, tabs, carriage returns and line feeds.
    pub strip_whitespace: bool,
}

impl CanonicalizeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spdx_heading_stripped(mut self, strip: bool) -> Self {
        self.strip_spdx_heading = strip;
        self
    }

    pub fn with_unicode_normalization(mut self, normalize: bool) -> Self {
        self.normalize_unicode = normalize;
        self
    }

    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    pub fn with_whitespace_stripped(mut self, strip: bool) -> Self {
        self.strip_whitespace = strip;
        self
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), CanonicalError> {
        if self.version == 0 {
            return Err(CanonicalError::InvalidConfig(
                "config version must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CanonicalizeConfig {
    fn default() -> Self {
        Self {
            version: 1,
            strip_spdx_heading: true,
            normalize_unicode: false,
            lowercase: false,
            strip_whitespace: true,
        }
    }
}
