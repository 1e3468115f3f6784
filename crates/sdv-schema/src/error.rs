//! # Error Types
//!
//! Two classes of failure flow through the pipeline:
//!
//! - **Structural** errors (`CatalogError`, `HarnessError`) stop a run.
//!   A malformed corpus path or two schemas claiming one identity make every
//!   later result untrustworthy.
//! - **Per-file** errors (`LoadError`) are collected and reported together,
//!   so a single run shows every unreadable schema and sample.
//!
//! Per-sample failures (mismatch, missing schema, engine error) are not
//! errors at all; they are outcomes recorded in the report.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use sdv_core::{MalformedPathError, SchemaIdentity};

/// Which catalog a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Schema,
    Sample,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema => f.write_str("schema"),
            Self::Sample => f.write_str("sample"),
        }
    }
}

/// A file that was discovered but could not be read or parsed as JSON.
///
/// With `kind == Schema` this is a schema load error, with `kind == Sample`
/// a sample load error. Neither aborts the catalog build.
#[derive(Error, Debug, Clone, Serialize)]
#[error("{kind} load error for '{}': {detail}", location.display())]
pub struct LoadError {
    pub kind: DocumentKind,
    pub location: PathBuf,
    pub detail: String,
}

/// Two schema files resolve to the same identity.
///
/// `first` and `second` are ordered by location so the error reads the same
/// on every run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "duplicate schema identity {identity}: '{}' and '{}'",
    first.display(),
    second.display()
)]
pub struct DuplicateSchemaError {
    pub identity: SchemaIdentity,
    pub first: PathBuf,
    pub second: PathBuf,
}

/// The run was cancelled before it completed. No partial results survive.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("run cancelled")]
pub struct Cancelled;

/// A catalog build failed as a whole.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// A discovered file's location does not follow the naming convention.
    #[error(transparent)]
    MalformedPath(#[from] MalformedPathError),

    /// Two schema files declare the same identity.
    #[error(transparent)]
    DuplicateSchema(#[from] DuplicateSchemaError),

    /// The base directory could not be walked.
    #[error("cannot walk '{}': {detail}", root.display())]
    Walk { root: PathBuf, detail: String },

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Invalid harness configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    /// An environment variable holds a value that cannot be parsed.
    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: String, reason: String },
}

/// Top-level error for a conformance run.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("schema catalog: {0}")]
    SchemaCatalog(#[source] CatalogError),

    #[error("sample catalog: {0}")]
    SampleCatalog(#[source] CatalogError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("worker pool could not be started: {0}")]
    WorkerPool(String),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl HarnessError {
    /// True if the run stopped because it was cancelled, at any stage.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Cancelled(_)
                | Self::SchemaCatalog(CatalogError::Cancelled(_))
                | Self::SampleCatalog(CatalogError::Cancelled(_))
        )
    }
}
