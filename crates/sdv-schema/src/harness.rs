//! # Conformance Run
//!
//! Wires the pipeline together: both catalogs are built concurrently on a
//! bounded worker pool, every catalog schema is compiled, and the samples are
//! reconciled. Structural failures and cancellation abort the run; everything
//! else ends up in the returned [`ConformanceRun`].

use serde::Serialize;

use sdv_core::{OffsetTimestamp, SchemaLocator};

use crate::catalog::SchemaCatalog;
use crate::config::HarnessConfig;
use crate::engine::JsonSchemaEngine;
use crate::error::{HarnessError, LoadError};
use crate::pool::{CancellationFlag, LoadOptions, WorkerPool};
use crate::reconcile::{MatchMode, Reconciler, Report};
use crate::samples::SampleCatalog;

/// The end-to-end result of a run.
#[derive(Debug, Clone, Serialize)]
pub struct ConformanceRun {
    pub started_at: OffsetTimestamp,
    pub finished_at: OffsetTimestamp,
    pub match_mode: MatchMode,
    pub schema_count: usize,
    pub sample_count: usize,
    pub schema_load_errors: Vec<LoadError>,
    pub sample_load_errors: Vec<LoadError>,
    pub report: Report,
}

impl ConformanceRun {
    /// No file failed to load and every outcome is a match.
    pub fn is_success(&self) -> bool {
        self.schema_load_errors.is_empty()
            && self.sample_load_errors.is_empty()
            && self.report.all_passed()
    }
}

/// Runs the conformance pipeline for one configuration.
pub struct Harness {
    config: HarnessConfig,
    locator: Box<dyn SchemaLocator>,
    cancel: CancellationFlag,
}

impl Harness {
    /// # Errors
    ///
    /// Returns `HarnessError::Config` if `config` does not validate.
    pub fn new(config: HarnessConfig) -> Result<Self, HarnessError> {
        config.validate()?;
        Ok(Self {
            locator: Box::new(config.layout),
            config,
            cancel: CancellationFlag::default(),
        })
    }

    /// Replace the layout-derived schema locator.
    pub fn with_locator(mut self, locator: impl SchemaLocator + 'static) -> Self {
        self.locator = Box::new(locator);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// A handle that cancels this harness's runs.
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Execute one run.
    pub fn run(&self) -> Result<ConformanceRun, HarnessError> {
        let started_at = OffsetTimestamp::now_utc();
        self.cancel.check()?;

        let pool = WorkerPool::new(self.config.concurrency)?;
        let options = LoadOptions {
            io_retries: self.config.io_retries,
            cancel: self.cancel.clone(),
        };
        let locator: &dyn SchemaLocator = self.locator.as_ref();

        tracing::info!(
            schema_root = %self.config.schema_root.display(),
            sample_root = %self.config.sample_root.display(),
            layout = %self.config.layout,
            concurrency = pool.threads(),
            "starting conformance run"
        );

        let (schemas, samples) = pool.install(|| {
            rayon::join(
                || SchemaCatalog::build(&self.config.schema_root, locator, &options),
                || SampleCatalog::build(&self.config.sample_root, &options),
            )
        });
        let schemas = schemas.map_err(HarnessError::SchemaCatalog)?;
        let samples = samples.map_err(HarnessError::SampleCatalog)?;
        self.cancel.check()?;

        let report = pool.install(|| {
            let engine = JsonSchemaEngine::new(&schemas);
            self.cancel.check()?;
            Reconciler::new(&engine)
                .with_mode(self.config.match_mode)
                .with_cancellation(self.cancel.clone())
                .reconcile(&schemas, &samples)
        })?;

        let run = ConformanceRun {
            started_at,
            finished_at: OffsetTimestamp::now_utc(),
            match_mode: self.config.match_mode,
            schema_count: schemas.len(),
            sample_count: samples.len(),
            schema_load_errors: schemas.load_errors().to_vec(),
            sample_load_errors: samples.load_errors().to_vec(),
            report,
        };
        tracing::info!(success = run.is_success(), "conformance run finished");
        Ok(run)
    }
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
