//! Harness configuration.
//!
//! Built-in defaults are overridden by `SDV_*` environment variables, which
//! the CLI in turn overrides with flags.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use sdv_core::SchemaLayout;

use crate::error::ConfigError;
use crate::reconcile::MatchMode;

/// Settings for one conformance run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Root of the schema tree.
    pub schema_root: PathBuf,
    /// Root of the sample tree.
    pub sample_root: PathBuf,
    pub layout: SchemaLayout,
    pub match_mode: MatchMode,
    /// Worker threads for loading and validation.
    pub concurrency: usize,
    /// Extra attempts for file reads that fail transiently.
    pub io_retries: u32,
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            schema_root: PathBuf::from("schema"),
            sample_root: PathBuf::from("test-data"),
            layout: SchemaLayout::default(),
            match_mode: MatchMode::default(),
            concurrency: default_concurrency(),
            io_retries: 2,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SDV_SCHEMA_ROOT` (default: `schema`)
    /// - `SDV_SAMPLE_ROOT` (default: `test-data`)
    /// - `SDV_LAYOUT`: `nested` or `flat` (default: `nested`)
    /// - `SDV_MATCH_MODE`: `exact` or `minor-compatible` (default: `exact`)
    /// - `SDV_CONCURRENCY` (default: available parallelism)
    /// - `SDV_IO_RETRIES` (default: 2)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`HarnessConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(root) = lookup("SDV_SCHEMA_ROOT") {
            config.schema_root = PathBuf::from(root);
        }
        if let Some(root) = lookup("SDV_SAMPLE_ROOT") {
            config.sample_root = PathBuf::from(root);
        }
        if let Some(layout) = env_parse(&lookup, "SDV_LAYOUT")? {
            config.layout = layout;
        }
        if let Some(mode) = env_parse(&lookup, "SDV_MATCH_MODE")? {
            config.match_mode = mode;
        }
        if let Some(n) = env_parse(&lookup, "SDV_CONCURRENCY")? {
            config.concurrency = n;
        }
        if let Some(n) = env_parse(&lookup, "SDV_IO_RETRIES")? {
            config.io_retries = n;
        }
        Ok(config)
    }

    /// Reject settings the harness cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }
}

fn env_parse<T>(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
}
