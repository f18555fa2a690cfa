//! Property-based tests for the hashing and comparison invariants.
//!
//! - Block count is `ceil(len / block_size)`
//! - Hashing is deterministic and parallel output equals sequential output
//! - A non-empty hash compared with itself scores 1.0
//! - Confidence stays in [0, 1] unless the comparison aborted

use ctph::{compare_hashes, fuzzy_hash, fuzzy_hash_with, CtphConfig, FuzzyHash};
use proptest::prelude::*;

prop_compose! {
    fn arb_params()(block_size in 1usize..64, hash_length in 1usize..64) -> (usize, usize) {
        (block_size, hash_length)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn block_count_is_ceiling(
        input in prop::collection::vec(any::<u8>(), 0..2048),
        (block_size, hash_length) in arb_params(),
    ) {
        let hash = fuzzy_hash(&input, block_size, hash_length).unwrap();
        prop_assert_eq!(hash.len(), input.len().div_ceil(block_size));
    }

    #[test]
    fn hashing_is_deterministic(
        input in prop::collection::vec(any::<u8>(), 0..2048),
        (block_size, hash_length) in arb_params(),
    ) {
        let once = fuzzy_hash(&input, block_size, hash_length).unwrap();
        let twice = fuzzy_hash(&input, block_size, hash_length).unwrap();
        prop_assert_eq!(&once, &twice);

        let cfg = CtphConfig::new()
            .with_block_size(block_size)
            .with_hash_length(hash_length)
            .with_parallel(true);
        let parallel = fuzzy_hash_with(&input, &cfg).unwrap();
        prop_assert_eq!(&once, &parallel);
    }

    #[test]
    fn self_match_is_full_confidence(
        input in prop::collection::vec(any::<u8>(), 1..1024),
        (block_size, hash_length) in arb_params(),
        min in 0.0f64..=1.0,
    ) {
        let hash = fuzzy_hash(&input, block_size, hash_length).unwrap();
        let sim = compare_hashes(&hash, &hash, min);
        prop_assert_eq!(sim.confidence, 1.0);
        prop_assert_eq!(sim.common_blocks as usize, hash.len());
    }

    #[test]
    fn confidence_in_unit_range_or_sentinel(
        a in prop::collection::vec(any::<u8>(), 0..512),
        b in prop::collection::vec(any::<u8>(), 0..512),
        min in 0.0f64..=1.0,
    ) {
        let ha = fuzzy_hash(&a, 8, 8).unwrap();
        let hb = fuzzy_hash(&b, 8, 8).unwrap();
        let sim = compare_hashes(&ha, &hb, min);
        if sim.is_aborted() {
            prop_assert_eq!(sim.confidence, -1.0);
        } else {
            prop_assert!((0.0..=1.0).contains(&sim.confidence));
            prop_assert_eq!(sim.total_blocks, ha.len().max(hb.len()));
        }
    }

    #[test]
    fn zero_minimum_never_aborts(
        a in prop::collection::vec(any::<u8>(), 0..512),
        b in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        let ha = fuzzy_hash(&a, 4, 5).unwrap();
        let hb = fuzzy_hash(&b, 4, 5).unwrap();
        prop_assert!(!compare_hashes(&ha, &hb, 0.0).is_aborted());
    }

    #[test]
    fn text_form_round_trips(
        input in prop::collection::vec(any::<u8>(), 0..512),
        (block_size, hash_length) in arb_params(),
    ) {
        let hash = fuzzy_hash(&input, block_size, hash_length).unwrap();
        let parsed: FuzzyHash = hash.to_string().parse().unwrap();
        prop_assert_eq!(parsed, hash);
    }
}
