mod common;

use licensefp::batch::{CorpusDefaults, CtphOverride, Overrides, compute_corpus, replace_corpus};
use licensefp::{
    CanonicalizeConfig, CorpusStore, DetectionOptions, FlatFileCorpus, detect_text,
    sort_by_confidence, strip_whitespace,
};
use tempfile::TempDir;

use common::{LICENSES, fixture_corpus, input_text, license_text};

fn flat_file_corpus(dir: &TempDir) -> FlatFileCorpus {
    let store = FlatFileCorpus::open(dir.path().join("licenses.db")).expect("open store");
    replace_corpus(&store, &fixture_corpus()).expect("write corpus");
    store
}

#[test]
fn fixture_corpus_is_named_after_files() {
    let names: Vec<String> = fixture_corpus().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["apache-2.0", "bsd-3-clause", "mit"]);
}

#[test]
fn known_license_is_detected_exactly() {
    let dir = TempDir::new().unwrap();
    let store = flat_file_corpus(&dir);

    let matches = detect_text(
        &license_text("apache-2.0"),
        &store,
        &CanonicalizeConfig::default(),
        &DetectionOptions::default(),
    )
    .expect("detection");

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].name, "apache-2.0");
    assert_eq!(matches[0].confidence, 1.0);
    assert_eq!(matches[0].common_blocks, matches[0].total_blocks);
}

#[test]
fn reformatted_license_still_matches_fully() {
    let dir = TempDir::new().unwrap();
    let store = flat_file_corpus(&dir);

    // Rewrapping only moves whitespace around, which normalization removes.
    let rewrapped = license_text("mit").split_whitespace().collect::<Vec<_>>().join("\n   ");
    let matches = detect_text(
        &rewrapped,
        &store,
        &CanonicalizeConfig::default(),
        &DetectionOptions::default(),
    )
    .unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].name, "mit");
    assert_eq!(matches[0].confidence, 1.0);
}

#[test]
fn small_edit_lowers_confidence_slightly() {
    let dir = TempDir::new().unwrap();
    let store = flat_file_corpus(&dir);

    // Same length, so only the blocks covering the edit change.
    let edited = license_text("mit").replacen(
        "Permission is hereby granted",
        "PERMISSION IS HEREBY GRANTED",
        1,
    );
    let matches = detect_text(
        &edited,
        &store,
        &CanonicalizeConfig::default(),
        &DetectionOptions::default(),
    )
    .unwrap();

    assert_eq!(matches.len(), 1);
    let hit = &matches[0];
    assert_eq!(hit.name, "mit");
    assert!((2..=4).contains(&(hit.total_blocks - hit.common_blocks)));
    assert!(hit.confidence > 0.9 && hit.confidence < 1.0);
}

#[test]
fn unrelated_text_matches_nothing() {
    let dir = TempDir::new().unwrap();
    let store = flat_file_corpus(&dir);

    let options = DetectionOptions::new().with_min_confidence(0.2);
    let matches = detect_text(
        &input_text("lorem.txt"),
        &store,
        &CanonicalizeConfig::default(),
        &options,
    )
    .unwrap();
    assert!(matches.is_empty());
}

#[test]
fn zero_minimum_reports_every_entry() {
    let dir = TempDir::new().unwrap();
    let store = flat_file_corpus(&dir);

    let options = DetectionOptions::new().with_min_confidence(0.0);
    let mut matches = detect_text(
        &license_text("bsd-3-clause"),
        &store,
        &CanonicalizeConfig::default(),
        &options,
    )
    .unwrap();
    assert_eq!(matches.len(), 3);

    sort_by_confidence(&mut matches);
    assert_eq!(matches[0].name, "bsd-3-clause");
    assert_eq!(matches[0].confidence, 1.0);
    assert!(matches[1..].iter().all(|m| m.confidence < 0.1));
}

#[test]
fn spdx_heading_does_not_affect_detection() {
    let dir = TempDir::new().unwrap();
    let store = flat_file_corpus(&dir);

    let bare = license_text("bsd-3-clause")
        .splitn(3, "---\n")
        .last()
        .expect("fixture has a heading")
        .to_string();
    let matches = detect_text(
        &bare,
        &store,
        &CanonicalizeConfig::default(),
        &DetectionOptions::default(),
    )
    .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].name, "bsd-3-clause");
    assert_eq!(matches[0].confidence, 1.0);
}

#[test]
fn overridden_entry_is_hashed_with_its_own_settings() {
    let dir = TempDir::new().unwrap();
    let mut overrides = Overrides::new();
    overrides.insert(
        "mit".into(),
        CtphOverride {
            block_size: Some(20),
            hash_length: Some(4),
        },
    );
    let entries = compute_corpus(LICENSES, &CorpusDefaults::default(), &overrides).unwrap();
    let store = FlatFileCorpus::open(dir.path().join("licenses.db")).unwrap();
    replace_corpus(&store, &entries).unwrap();

    let mit = store
        .entries()
        .unwrap()
        .into_iter()
        .find(|e| e.name == "mit")
        .unwrap();
    assert_eq!((mit.block_size, mit.hash_length), (20, 4));
    let stripped = strip_whitespace(&license_text("mit"));
    assert_eq!(mit.hash.len(), stripped.len().div_ceil(20));

    let matches = detect_text(
        &license_text("mit"),
        &store,
        &CanonicalizeConfig::default(),
        &DetectionOptions::default(),
    )
    .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].name, "mit");
    assert_eq!(matches[0].confidence, 1.0);
}

#[test]
fn store_survives_reopening() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("licenses.db");
    {
        let store = FlatFileCorpus::open(&path).unwrap();
        replace_corpus(&store, &fixture_corpus()).unwrap();
    }

    let reopened = FlatFileCorpus::open(&path).unwrap();
    assert_eq!(reopened.count().unwrap(), 3);
    assert_eq!(reopened.entries().unwrap(), fixture_corpus());
}
