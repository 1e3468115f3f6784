//! Report rendering for `sdv run`.

use std::io::Write;

use anyhow::Result;
use clap::ValueEnum;

use sdv_schema::{ConformanceRun, ValidationOutcome};

/// Output format for the run report.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable lines, one `FAIL:` line per problem.
    #[default]
    Text,
    /// The full run as a JSON document.
    Json,
}

pub fn render(run: &ConformanceRun, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    match format {
        OutputFormat::Text => render_text(run, out),
        OutputFormat::Json => render_json(run, out),
    }
}

pub fn render_json(run: &ConformanceRun, out: &mut dyn Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, run)?;
    writeln!(out)?;
    Ok(())
}

pub fn render_text(run: &ConformanceRun, out: &mut dyn Write) -> Result<()> {
    for e in run.schema_load_errors.iter().chain(&run.sample_load_errors) {
        writeln!(out, "FAIL: {e}")?;
    }

    for entry in run.report.failures() {
        let location = entry.location.display();
        match &entry.outcome {
            ValidationOutcome::Mismatch { expected, actual } => {
                let schema = entry
                    .schema
                    .as_ref()
                    .map_or_else(|| entry.sample.identity().to_string(), ToString::to_string);
                writeln!(
                    out,
                    "FAIL: {location} [{schema}] expected {expected}, engine said {actual}"
                )?;
                for v in &entry.violations {
                    writeln!(out, "      {v}")?;
                }
            }
            ValidationOutcome::SchemaNotFound => {
                writeln!(
                    out,
                    "FAIL: {location} [{}] schema not found",
                    entry.sample.identity()
                )?;
            }
            ValidationOutcome::EngineError { detail } => {
                let schema = entry
                    .schema
                    .as_ref()
                    .map_or_else(|| entry.sample.identity().to_string(), ToString::to_string);
                writeln!(out, "FAIL: {location} [{schema}] engine error: {detail}")?;
            }
            ValidationOutcome::Match => {}
        }
    }

    let untested = run.report.untested_schemas();
    if !untested.is_empty() {
        let names: Vec<String> = untested.iter().map(ToString::to_string).collect();
        writeln!(out, "Untested schemas: {}", names.join(", "))?;
    }

    let summary = run.report.summary();
    writeln!(
        out,
        "Samples: {}/{} passed ({} schemas, {} samples, {} load errors)",
        summary.succeeded,
        summary.attempted,
        run.schema_count,
        run.sample_count,
        run.schema_load_errors.len() + run.sample_load_errors.len(),
    )?;
    writeln!(out, "Summary: {summary}")?;
    writeln!(out, "Result: {}", if run.is_success() { "PASS" } else { "FAIL" })?;
    Ok(())
}
