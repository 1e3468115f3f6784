//! # Run Subcommand
//!
//! Builds a [`HarnessConfig`] from `SDV_*` environment variables and flags,
//! executes one conformance run, and renders the report to stdout.
//!
//! Ctrl-C cancels the run: workers stop at their next checkpoint, nothing
//! partial is printed, and the command exits with status 2.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use sdv_core::SchemaLayout;
use sdv_schema::{CancellationFlag, Harness, HarnessConfig, MatchMode};

use crate::render::{render, OutputFormat};
use crate::{EXIT_FAILURE, EXIT_SUCCESS};

/// Arguments for the `sdv run` subcommand. Unset flags fall back to the
/// environment, then to built-in defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Root of the schema tree.
    #[arg(long, value_name = "DIR")]
    pub schema_root: Option<PathBuf>,

    /// Root of the sample tree.
    #[arg(long, value_name = "DIR")]
    pub sample_root: Option<PathBuf>,

    /// Schema directory layout: nested or flat.
    #[arg(long, value_parser = parse_layout)]
    pub layout: Option<SchemaLayout>,

    /// Which schemas each sample is checked against: exact or minor-compatible.
    #[arg(long, value_parser = parse_match_mode)]
    pub match_mode: Option<MatchMode>,

    /// Worker threads for loading and validation.
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Extra attempts for reads that fail transiently.
    #[arg(long, value_name = "N")]
    pub io_retries: Option<u32>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

fn parse_layout(s: &str) -> Result<SchemaLayout, String> {
    s.parse()
}

fn parse_match_mode(s: &str) -> Result<MatchMode, String> {
    s.parse()
}

impl RunArgs {
    /// Apply the flags that were given on top of `base`.
    pub fn apply(&self, mut base: HarnessConfig) -> HarnessConfig {
        if let Some(root) = &self.schema_root {
            base.schema_root = root.clone();
        }
        if let Some(root) = &self.sample_root {
            base.sample_root = root.clone();
        }
        if let Some(layout) = self.layout {
            base.layout = layout;
        }
        if let Some(mode) = self.match_mode {
            base.match_mode = mode;
        }
        if let Some(n) = self.concurrency {
            base.concurrency = n;
        }
        if let Some(n) = self.io_retries {
            base.io_retries = n;
        }
        base
    }
}

/// Execute the run subcommand against an explicit base configuration.
///
/// Returns exit code: 0 on success, 1 on conformance failure. Pipeline
/// failures (including cancellation) are returned as errors.
pub fn run_with_config(
    args: &RunArgs,
    base: HarnessConfig,
    cancel: CancellationFlag,
    out: &mut dyn Write,
) -> Result<u8> {
    let config = args.apply(base);
    tracing::debug!(?config, "resolved configuration");

    let harness = Harness::new(config)
        .context("invalid configuration")?
        .with_cancellation(cancel);
    let run = harness.run().context("conformance run failed")?;

    render(&run, args.format, out).context("failed to write report")?;

    Ok(if run.is_success() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}

/// Execute the run subcommand with configuration from the environment.
pub fn run_run(args: &RunArgs, cancel: CancellationFlag, out: &mut dyn Write) -> Result<u8> {
    let base = HarnessConfig::from_env().context("invalid SDV_* environment variable")?;
    run_with_config(args, base, cancel, out)
}

/// Execute the run subcommand on a blocking thread, cancelling it on Ctrl-C.
pub fn run_interruptible(args: RunArgs) -> Result<u8> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        let cancel = CancellationFlag::new();
        let worker_cancel = cancel.clone();
        let mut work = tokio::task::spawn_blocking(move || {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            run_run(&args, worker_cancel, &mut out)
        });

        tokio::select! {
            joined = &mut work => joined.context("run task panicked")?,
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("interrupt received, cancelling run");
                cancel.cancel();
                work.await.context("run task panicked")?
            }
        }
    })
}
