//! Positional similarity between two fuzzy hashes.

use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::fuzzy::FuzzyHash;

/// Outcome of comparing two fuzzy hashes.
///
/// `common_blocks == -1` together with `confidence == -1.0` means the
/// comparison was abandoned because the minimum confidence could no longer be
/// reached. That is different from a completed comparison with zero overlap,
/// which has `confidence == 0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Similarity {
    pub confidence: f64,
    pub common_blocks: i64,
    pub total_blocks: usize,
}

impl Similarity {
    /// The "aborted" sentinel for a comparison over `total_blocks` blocks.
    pub const fn aborted(total_blocks: usize) -> Self {
        Self {
            confidence: -1.0,
            common_blocks: -1,
            total_blocks,
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.common_blocks < 0
    }
}

/// Compares two fuzzy hashes block by block.
///
/// See [`compare_digests`].
pub fn compare_hashes(a: &FuzzyHash, b: &FuzzyHash, min_confidence: f64) -> Similarity {
    compare_digests(a.digests(), b.digests(), min_confidence)
}

/// Counts positions where `a[i] == b[i]` over the longer of the two slices.
///
/// A position past the end of the shorter slice counts as a mismatch. The
/// length difference also seeds the mismatch counter, so it is effectively
/// charged twice. The comparison stops with [`Similarity::aborted`] as soon as
/// the mismatch count exceeds the budget derived from `min_confidence`
/// (`2 * max_len` when `min_confidence` is zero, so that case never aborts).
///
/// ```rust
/// use ctph::{compare_hashes, FuzzyHash};
///
/// let a: FuzzyHash = "a:b:c:d".parse().unwrap();
/// let b: FuzzyHash = "a:b:x:x".parse().unwrap();
/// let sim = compare_hashes(&a, &b, 0.0);
/// assert_eq!(sim.confidence, 0.5);
/// assert_eq!(sim.common_blocks, 2);
/// assert_eq!(sim.total_blocks, 4);
/// ```
pub fn compare_digests(a: &[Digest], b: &[Digest], min_confidence: f64) -> Similarity {
    let max_blocks = a.len().max(b.len());
    let max_uncommon = mismatch_budget(max_blocks, min_confidence);

    let mut uncommon = a.len().abs_diff(b.len());
    if uncommon > max_uncommon {
        return Similarity::aborted(max_blocks);
    }

    let mut common = 0usize;
    for i in 0..max_blocks {
        match (a.get(i), b.get(i)) {
            (Some(x), Some(y)) if x == y => common += 1,
            _ => {
                uncommon += 1;
                if uncommon > max_uncommon {
                    return Similarity::aborted(max_blocks);
                }
            }
        }
    }

    let confidence = if max_blocks == 0 {
        0.0
    } else {
        common as f64 / max_blocks as f64
    };
    Similarity {
        confidence,
        common_blocks: common as i64,
        total_blocks: max_blocks,
    }
}

fn mismatch_budget(max_blocks: usize, min_confidence: f64) -> usize {
    if min_confidence == 0.0 {
        return max_blocks.saturating_mul(2);
    }
    let budget = (min_confidence * max_blocks as f64).ceil();
    if budget.is_nan() || budget <= 0.0 {
        0
    } else {
        // Saturates for huge or infinite budgets.
        budget as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(s: &str) -> FuzzyHash {
        s.parse().expect("valid hash")
    }

    fn repeated(token: &str, n: usize) -> String {
        vec![token; n].join(":")
    }

    #[test]
    fn identical_hashes_are_full_confidence() {
        let h = hash("a:b:c:d");
        let sim = compare_hashes(&h, &h, 0.5);
        assert_eq!(sim.confidence, 1.0);
        assert_eq!(sim.common_blocks, 4);
        assert_eq!(sim.total_blocks, 4);
        assert!(!sim.is_aborted());
    }

    #[test]
    fn half_matching_hashes() {
        let sim = compare_hashes(&hash("a:b:c:d"), &hash("a:b:x:x"), 0.5);
        assert_eq!(sim.confidence, 0.5);
        assert_eq!(sim.common_blocks, 2);
        assert_eq!(sim.total_blocks, 4);
    }

    #[test]
    fn mismatches_within_budget_do_not_abort() {
        let a = hash(&repeated("o", 10));
        let b = hash(&format!("{}:{}", repeated("x", 5), repeated("o", 5)));
        for min in [0.6, 0.5] {
            let sim = compare_hashes(&a, &b, min);
            assert!(!sim.is_aborted(), "min {min} should not abort");
            assert_eq!(sim.confidence, 0.5);
        }
    }

    #[test]
    fn mismatches_over_budget_abort() {
        let a = hash(&repeated("o", 10));
        let b = hash(&format!("{}:{}", repeated("x", 6), repeated("o", 4)));
        let sim = compare_hashes(&a, &b, 0.5);
        assert!(sim.is_aborted());
        assert_eq!(sim.confidence, -1.0);
        assert_eq!(sim.common_blocks, -1);
        assert_eq!(sim.total_blocks, 10);
    }

    #[test]
    fn zero_minimum_never_aborts_on_length_gap() {
        let a = hash(&repeated("o", 10));
        let b = hash(&repeated("o", 16));
        let sim = compare_hashes(&a, &b, 0.0);
        assert!(!sim.is_aborted());
        assert_eq!(sim.common_blocks, 10);
        assert_eq!(sim.total_blocks, 16);
        assert_eq!(sim.confidence, 10.0 / 16.0);
    }

    #[test]
    fn length_gap_over_budget_aborts_upfront() {
        let a = hash(&repeated("o", 2));
        let b = hash(&repeated("o", 10));
        let sim = compare_hashes(&a, &b, 0.5);
        assert_eq!(sim, Similarity::aborted(10));
    }

    #[test]
    fn empty_hashes_have_zero_confidence() {
        let empty = FuzzyHash::default();
        let sim = compare_hashes(&empty, &empty, 0.5);
        assert_eq!(sim.confidence, 0.0);
        assert_eq!(sim.common_blocks, 0);
        assert_eq!(sim.total_blocks, 0);
        assert!(!sim.is_aborted());
    }

    #[test]
    fn no_overlap_is_zero_not_aborted() {
        let sim = compare_hashes(&hash("a:b"), &hash("c:d"), 0.0);
        assert_eq!(sim.confidence, 0.0);
        assert_eq!(sim.common_blocks, 0);
        assert!(!sim.is_aborted());
    }

    #[test]
    fn negative_minimum_gets_no_budget() {
        let sim = compare_hashes(&hash("a:b"), &hash("a:c"), -0.5);
        assert!(sim.is_aborted());
        let same = compare_hashes(&hash("a:b"), &hash("a:b"), -0.5);
        assert_eq!(same.confidence, 1.0);
    }

    #[test]
    fn comparison_is_symmetric() {
        let a = hash("a:b:c:d:e");
        let b = hash("a:x:c");
        assert_eq!(compare_hashes(&a, &b, 0.0), compare_hashes(&b, &a, 0.0));
    }
}
