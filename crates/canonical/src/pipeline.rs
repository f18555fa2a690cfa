use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::config::CanonicalizeConfig;
use crate::error::CanonicalError;
use crate::heading::strip_spdx_heading;
use crate::whitespace::strip_whitespace;

/// Text ready for fingerprinting, together with the config that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalText {
    pub text: String,
    pub canonical_version: u32,
    pub config: CanonicalizeConfig,
}

impl CanonicalText {
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Main entry point. Runs the enabled normalization steps in order and
/// returns the resulting text.
///
/// Empty output is not an error: an empty document simply hashes to an empty
/// fuzzy hash downstream.
pub fn canonicalize(
    input: &str,
    cfg: &CanonicalizeConfig,
) -> Result<CanonicalText, CanonicalError> {
    cfg.validate()?;

    let mut text: Cow<str> = Cow::Borrowed(input);

    if cfg.strip_spdx_heading {
        text = Cow::Owned(strip_spdx_heading(&text));
    }
    if cfg.normalize_unicode {
        text = Cow::Owned(text.nfkc().collect::<String>());
    }
    if cfg.lowercase {
        text = Cow::Owned(text.to_lowercase());
    }
    if cfg.strip_whitespace {
        text = Cow::Owned(strip_whitespace(&text));
    }

    tracing::trace!(
        input_len = input.len(),
        output_len = text.len(),
        "canonicalized text"
    );

    Ok(CanonicalText {
        text: text.into_owned(),
        canonical_version: cfg.version,
        config: cfg.clone(),
    })
}
