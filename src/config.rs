//! YAML configuration file support for licensefp.
//!
//! One YAML file can carry the settings of every stage (normalization, fuzzy
//! hashing, corpus store, detection, scheduling) plus per-license hash
//! overrides. Every section is optional and falls back to the per-crate
//! defaults.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "spdx corpus"
//!
//! canonical:
//!   version: 1
//!   strip_spdx_heading: true
//!   normalize_unicode: false
//!   lowercase: false
//!   strip_whitespace: true
//!
//! ctph:
//!   version: 1
//!   block_size: 10
//!   hash_length: 7
//!   use_parallel: false
//!
//! index:
//!   backend: flat_file
//!   path: "licenses.db"
//!
//! matcher:
//!   min_confidence_threshold: 0.1
//!   early_exit_threshold: 0.98
//!
//! scheduler:
//!   workers: 4
//!   mode: least_loaded
//!   default_timeout_ms: 2000
//!
//! overrides:
//!   GPL-3.0:
//!     blockSize: 20
//!   Zlib:
//!     blockSize: 6
//!     fuzzyHashLength: 4
//! ```

use std::fs;
use std::path::Path;

use canonical::CanonicalizeConfig;
use ctph::CtphConfig;
use index::StoreConfig;
use matcher::{DetectionOptions, ScheduleMode, SchedulerConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::batch::{CorpusDefaults, Overrides};

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LicenseFpConfig {
    /// Configuration format version, `"1"` or `"1.0"`.
    pub version: String,

    /// Optional configuration name/description
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub canonical: CanonicalizeConfig,

    /// Default hash settings for corpus computation and `hash`.
    #[serde(default)]
    pub ctph: CtphConfig,

    /// Corpus store. A store path given on the command line replaces
    /// `path` but keeps `backend`.
    #[serde(default)]
    pub index: StoreConfig,

    #[serde(default)]
    pub matcher: DetectionOptions,

    #[serde(default)]
    pub scheduler: SchedulerYamlConfig,

    /// Per-license hash settings, keyed by file name.
    #[serde(default)]
    pub overrides: Overrides,
}

impl LicenseFpConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: LicenseFpConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.canonical
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("canonical: {e}")))?;
        self.ctph
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("ctph: {e}")))?;
        validate_store(&self.index)?;
        self.matcher
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("matcher: {e}")))?;
        self.scheduler.validate()?;

        Ok(())
    }

    pub fn canonical_config(&self) -> CanonicalizeConfig {
        self.canonical.clone()
    }

    pub fn ctph_config(&self) -> CtphConfig {
        self.ctph.clone()
    }

    pub fn store_config(&self) -> StoreConfig {
        self.index.clone()
    }

    /// Store for a command: `cli_path` opened with the configured backend,
    /// or the configured store itself. The CLI needs a store that outlives
    /// the process, so an in-memory one is rejected.
    pub fn resolve_store(&self, cli_path: Option<&Path>) -> Result<StoreConfig, ConfigLoadError> {
        let store = match cli_path {
            Some(path) => self.index.at_path(path),
            None => self.store_config(),
        };
        if !store.is_persistent() {
            return Err(ConfigLoadError::Validation(
                "no store path given and index.backend is in_memory".to_string(),
            ));
        }
        Ok(store)
    }

    pub fn detection_options(&self) -> DetectionOptions {
        self.matcher
    }

    /// Scheduler settings, carrying the `matcher` thresholds.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            workers: self.scheduler.workers,
            mode: self.scheduler.mode,
            options: self.matcher,
            default_timeout_ms: self.scheduler.default_timeout_ms,
        }
    }

    /// Batch defaults: `ctph` settings, normalized with `canonical`.
    pub fn corpus_defaults(&self) -> CorpusDefaults {
        CorpusDefaults::new(self.ctph_config()).with_canonical(self.canonical_config())
    }
}

impl Default for LicenseFpConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            canonical: CanonicalizeConfig::default(),
            ctph: CtphConfig::default(),
            index: StoreConfig::default(),
            matcher: DetectionOptions::default(),
            scheduler: SchedulerYamlConfig::default(),
            overrides: Overrides::new(),
        }
    }
}

fn validate_store(store: &StoreConfig) -> Result<(), ConfigLoadError> {
    match store {
        StoreConfig::InMemory => Ok(()),
        StoreConfig::FlatFile { path } | StoreConfig::Redb { path } => {
            if path.as_os_str().is_empty() {
                return Err(ConfigLoadError::Validation(
                    "index.path must not be empty".to_string(),
                ));
            }
            Ok(())
        }
    }
}

/// Scheduler YAML configuration. Thresholds come from the `matcher` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerYamlConfig {
    /// Worker threads; `0` uses the available parallelism.
    #[serde(default)]
    pub workers: usize,

    #[serde(default)]
    pub mode: ScheduleMode,

    #[serde(default)]
    pub default_timeout_ms: Option<u64>,
}

impl SchedulerYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.default_timeout_ms == Some(0) {
            return Err(ConfigLoadError::Validation(
                "scheduler.default_timeout_ms must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SchedulerYamlConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            mode: ScheduleMode::FanOut,
            default_timeout_ms: None,
        }
    }
}
