//! # sdv-schema — Conformance Pipeline
//!
//! Checks a corpus of sample JSON documents against a corpus of JSON
//! Schemas. The expected verdict for each sample is encoded in its location
//! (`shouldPass` / `shouldFail`).
//!
//! ## Pipeline
//!
//! 1. [`SchemaCatalog`] and [`SampleCatalog`] are built concurrently from
//!    their roots. Structural problems (malformed location, duplicate schema
//!    identity, unwalkable root) abort the run; unreadable files are
//!    collected.
//! 2. [`JsonSchemaEngine`] compiles every catalog schema, resolving
//!    cross-schema references against the catalog only.
//! 3. [`Reconciler`] checks each sample and produces an ordered [`Report`].
//!
//! [`Harness`] runs all three on a bounded [`WorkerPool`] and returns a
//! [`ConformanceRun`].

pub mod catalog;
pub mod config;
mod discover;
pub mod engine;
pub mod error;
pub mod harness;
pub mod pool;
pub mod reconcile;
pub mod samples;

pub use catalog::{SchemaCatalog, SchemaDocument};
pub use config::HarnessConfig;
pub use engine::{EngineVerdict, JsonSchemaEngine, ValidationEngine, Violation};
pub use error::{
    Cancelled, CatalogError, ConfigError, DocumentKind, DuplicateSchemaError, HarnessError,
    LoadError,
};
pub use harness::{ConformanceRun, Harness};
pub use pool::{CancellationFlag, LoadOptions, WorkerPool};
pub use reconcile::{
    MatchMode, OutcomeEntry, Reconciler, Report, ReportSummary, ValidationOutcome, Verdict,
};
pub use samples::{DataSample, SampleCatalog};
