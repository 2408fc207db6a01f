//! Configuration management for the TaskMaster application.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use taskmaster_core::validation::ValidationRules;
use taskmaster_runtime::seed::DEFAULT_SEED_URL;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Where and under which key tasks are saved
    pub storage: StorageConfig,
    /// Sample and remote seed data
    pub seed: SeedConfig,
    /// Input limits checked before an add or edit is dispatched
    pub validation: ValidationConfig,
    /// How long to wait for async effects (seed fetch, shutdown) in seconds
    pub effect_timeout_secs: u64,
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the data files
    pub data_dir: PathBuf,
    /// Storage key; the file is `<data_dir>/<key>.json`
    pub key: String,
}

/// Seed configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Endpoint serving `{id, title, completed}` todos
    pub url: String,
    /// Write a few sample tasks when storage is empty
    pub samples_on_first_run: bool,
}

/// Validation limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Minimum title length
    pub min_title_len: usize,
    /// Maximum title length
    pub max_title_len: usize,
    /// Minimum description length
    pub min_description_len: usize,
}

impl ValidationConfig {
    /// Limits as the core validation rules
    #[must_use]
    pub const fn rules(&self) -> ValidationRules {
        ValidationRules {
            min_title_len: self.min_title_len,
            max_title_len: self.max_title_len,
            min_description_len: self.min_description_len,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = ValidationRules::default();

        Self {
            storage: StorageConfig {
                data_dir: lookup("TASKMASTER_DATA_DIR")
                    .map_or_else(|| PathBuf::from("./.taskmaster"), PathBuf::from),
                key: lookup("TASKMASTER_STORAGE_KEY")
                    .unwrap_or_else(|| "taskmaster_tasks".to_string()),
            },
            seed: SeedConfig {
                url: lookup("TASKMASTER_SEED_URL").unwrap_or_else(|| DEFAULT_SEED_URL.to_string()),
                samples_on_first_run: parse_var(&lookup, "TASKMASTER_SEED_SAMPLES").unwrap_or(true),
            },
            validation: ValidationConfig {
                min_title_len: parse_var(&lookup, "TASKMASTER_MIN_TITLE_LEN").unwrap_or(defaults.min_title_len),
                max_title_len: parse_var(&lookup, "TASKMASTER_MAX_TITLE_LEN").unwrap_or(defaults.max_title_len),
                min_description_len: parse_var(&lookup, "TASKMASTER_MIN_DESCRIPTION_LEN")
                    .unwrap_or(defaults.min_description_len),
            },
            effect_timeout_secs: parse_var(&lookup, "TASKMASTER_EFFECT_TIMEOUT_SECS").unwrap_or(10),
        }
    }

    /// Effect timeout as a [`Duration`]
    #[must_use]
    pub const fn effect_timeout(&self) -> Duration {
        Duration::from_secs(self.effect_timeout_secs)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name).and_then(|s| s.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
