//! Per-block digests.
//!
//! A digest is a 32-bit signed rolling accumulator over the first
//! `hash_length` bytes of a block: `h = h * 31 + byte`, wrapping on overflow.
//! Its textual form is the accumulator in base 36.

use std::fmt;
use std::str::FromStr;

use crate::config::{check_hash_length, CtphError};

const RADIX: u32 = 36;
const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// The hash of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Digest(i32);

impl Digest {
    /// Digest of an empty block.
    pub const ZERO: Digest = Digest(0);

    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i32 {
        self.0
    }
}

impl From<i32> for Digest {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // i32::MIN needs 6 base-36 digits plus the sign.
        let mut buf = [0u8; 8];
        let mut pos = buf.len();
        let mut n = self.0.unsigned_abs();
        loop {
            pos -= 1;
            buf[pos] = ALPHABET[(n % RADIX) as usize];
            n /= RADIX;
            if n == 0 {
                break;
            }
        }
        if self.0 < 0 {
            pos -= 1;
            buf[pos] = b'-';
        }
        // Only ASCII bytes from ALPHABET and '-' were written.
        f.write_str(std::str::from_utf8(&buf[pos..]).map_err(|_| fmt::Error)?)
    }
}

impl FromStr for Digest {
    type Err = CtphError;

    /// Parses exactly the form produced by `Display`: lowercase base 36, an
    /// optional leading `-`, no leading zeros, and a value that fits in `i32`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CtphError::MalformedDigest {
            input: s.to_string(),
        };
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        if digits.is_empty() || digits.len() > 7 {
            return Err(malformed());
        }

        let mut magnitude: i64 = 0;
        for b in digits.bytes() {
            let d = match b {
                b'0'..=b'9' => b - b'0',
                b'a'..=b'z' => b - b'a' + 10,
                _ => return Err(malformed()),
            };
            magnitude = magnitude * i64::from(RADIX) + i64::from(d);
        }
        let value = if negative { -magnitude } else { magnitude };
        let digest = i32::try_from(value).map(Digest).map_err(|_| malformed())?;

        // Rejects "-0", "007" and other non-canonical spellings.
        if digest.to_string() != s {
            return Err(malformed());
        }
        Ok(digest)
    }
}

/// Folds bytes into the 32-bit accumulator.
pub(crate) fn accumulate(bytes: &[u8]) -> Digest {
    let h = bytes.iter().fold(0i32, |h, &b| {
        (h << 5).wrapping_sub(h).wrapping_add(i32::from(b))
    });
    Digest(h)
}

/// Truncates `block` to the bytes that contribute to its digest.
#[inline]
pub(crate) fn capped(block: &[u8], hash_length: usize) -> &[u8] {
    &block[..block.len().min(hash_length)]
}

/// Hashes a single block, reading at most `hash_length` bytes of it.
///
/// An empty block hashes to [`Digest::ZERO`]. `hash_length == 0` is rejected
/// rather than clamped.
///
/// ```rust
/// use ctph::hash_block;
///
/// assert_eq!(hash_block(b"abc", 5).unwrap().to_string(), "22ci");
/// assert_eq!(hash_block(b"", 5).unwrap().to_string(), "0");
/// ```
pub fn hash_block(block: &[u8], hash_length: usize) -> Result<Digest, CtphError> {
    check_hash_length(hash_length)?;
    Ok(accumulate(capped(block, hash_length)))
}
