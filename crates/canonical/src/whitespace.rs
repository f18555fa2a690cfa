//! Whitespace normalization utilities.
//!
//! Two flavours live here:
//!
//! - [`strip_whitespace`] removes layout characters entirely. This is what
//!   runs before fuzzy hashing, so that re-wrapping or re-indenting a license
//!   text does not shift its block boundaries.
//! - [`collapse_whitespace`] folds runs of Unicode whitespace into single
//!   spaces, for display and logging.
//!
//! # Examples
//!
//! ```rust
//! use canonical::{collapse_whitespace, strip_whitespace};
//!
//! assert_eq!(strip_whitespace("MIT\r\nLicense\t "), "MITLicense");
//! assert_eq!(collapse_whitespace("  hello   world  "), "hello world");
//! ```

/// Characters removed by [`strip_whitespace`].
///
/// CRLF and LFCR sequences need no special casing: both halves are in the set.
pub const STRIPPED_CHARS: [char; 4] = [' ', '\t', '\n', '\r'];

/// Removes every space, tab, carriage return and line feed from `text`.
///
/// Only those four characters are affected. Other Unicode whitespace (for
/// example U+00A0) is kept, which matches how the reference corpus was built.
///
/// ```rust
/// use canonical::strip_whitespace;
///
/// assert_eq!(strip_whitespace("a b\tc\r\nd\n\re"), "abcde");
/// assert_eq!(strip_whitespace("a\u{00A0}b"), "a\u{00A0}b");
/// assert_eq!(strip_whitespace(""), "");
/// ```
pub fn strip_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    out.extend(text.chars().filter(|c| !STRIPPED_CHARS.contains(c)));
    out
}

/// Collapses repeated whitespace, trims edges, and normalizes newlines to
/// single spaces.
///
/// All Unicode whitespace characters are treated as delimiters.
///
/// ```rust
/// use canonical::collapse_whitespace;
///
/// assert_eq!(collapse_whitespace("hello\r\n\r\nworld"), "hello world");
/// assert_eq!(collapse_whitespace("   \n\t   "), "");
/// assert_eq!(collapse_whitespace("hello\u{00A0}world"), "hello world");
/// ```
pub fn collapse_whitespace(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for segment in text.split_whitespace() {
        if !normalized.is_empty() {
            normalized.push(' ');
        }
        normalized.push_str(segment);
    }
    normalized
}
