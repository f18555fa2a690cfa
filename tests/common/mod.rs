#![allow(dead_code)]

use std::path::{Path, PathBuf};

use licensefp::batch::{CorpusDefaults, Overrides, compute_corpus};
use licensefp::CorpusEntry;

pub const LICENSES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/licenses");
pub const INPUTS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/inputs");

pub fn licenses_dir() -> &'static Path {
    Path::new(LICENSES)
}

pub fn license_text(name: &str) -> String {
    read(Path::new(LICENSES).join(name))
}

pub fn input_text(name: &str) -> String {
    read(Path::new(INPUTS).join(name))
}

fn read(path: PathBuf) -> String {
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("reading {}: {e}", path.display()))
}

/// The fixture corpus hashed with default settings.
pub fn fixture_corpus() -> Vec<CorpusEntry> {
    compute_corpus(LICENSES, &CorpusDefaults::default(), &Overrides::new())
        .expect("fixture corpus")
}
