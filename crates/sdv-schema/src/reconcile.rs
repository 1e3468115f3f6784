//! # Reconciliation
//!
//! Checks every sample against its schema and compares the engine's verdict
//! with the outcome the sample's location claims. Every sample is processed;
//! nothing short-circuits. Entries come out in sample-catalog order no matter
//! how many workers ran.
//!
//! In [`MatchMode::MinorCompatible`] a sample for `M.m` is checked against
//! every catalog schema `M.n` with `n >= m`, one entry per pair.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use sdv_core::{ExpectedOutcome, SamplePath, SchemaIdentity};

use crate::catalog::{SchemaCatalog, SchemaDocument};
use crate::engine::{EngineVerdict, ValidationEngine, Violation};
use crate::error::Cancelled;
use crate::pool::CancellationFlag;
use crate::samples::{DataSample, SampleCatalog};

/// Which schemas a sample is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Only the schema whose identity the sample names.
    #[default]
    Exact,
    /// The named schema and every later minor version of the same major.
    MinorCompatible,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => f.write_str("exact"),
            Self::MinorCompatible => f.write_str("minor-compatible"),
        }
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Self::Exact),
            "minor-compatible" => Ok(Self::MinorCompatible),
            other => Err(format!(
                "unknown match mode '{other}' (expected exact or minor-compatible)"
            )),
        }
    }
}

/// A pass/fail verdict, either claimed by a sample or produced by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Valid,
    Invalid,
}

impl From<ExpectedOutcome> for Verdict {
    fn from(expected: ExpectedOutcome) -> Self {
        if expected.expects_valid() {
            Self::Valid
        } else {
            Self::Invalid
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => f.write_str("valid"),
            Self::Invalid => f.write_str("invalid"),
        }
    }
}

/// Result of checking one sample against one schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Match,
    Mismatch { expected: Verdict, actual: Verdict },
    SchemaNotFound,
    EngineError { detail: String },
}

impl ValidationOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Match => f.write_str("match"),
            Self::Mismatch { expected, actual } => {
                write!(f, "expected {expected}, engine said {actual}")
            }
            Self::SchemaNotFound => f.write_str("schema not found"),
            Self::EngineError { detail } => write!(f, "engine error: {detail}"),
        }
    }
}

/// One line of the report.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeEntry {
    pub location: PathBuf,
    pub sample: SamplePath,
    /// The schema the sample was checked against; `None` when none was found.
    pub schema: Option<SchemaIdentity>,
    pub outcome: ValidationOutcome,
    /// Engine violations, kept when the sample was rejected but should pass.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

/// Counters over a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub schema_not_found: usize,
    pub engine_errors: usize,
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} attempted, {} succeeded, {} failed, {} schema not found, {} engine errors",
            self.attempted, self.succeeded, self.failed, self.schema_not_found, self.engine_errors
        )
    }
}

/// The ordered outcome of a reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    all_passed: bool,
    summary: ReportSummary,
    entries: Vec<OutcomeEntry>,
    untested_schemas: Vec<SchemaIdentity>,
}

impl Report {
    pub fn new(entries: Vec<OutcomeEntry>, untested_schemas: Vec<SchemaIdentity>) -> Self {
        let mut summary = ReportSummary {
            attempted: entries.len(),
            ..ReportSummary::default()
        };
        for entry in &entries {
            match entry.outcome {
                ValidationOutcome::Match => summary.succeeded += 1,
                ValidationOutcome::Mismatch { .. } => summary.failed += 1,
                ValidationOutcome::SchemaNotFound => summary.schema_not_found += 1,
                ValidationOutcome::EngineError { .. } => summary.engine_errors += 1,
            }
        }
        Self {
            all_passed: summary.succeeded == summary.attempted,
            summary,
            entries,
            untested_schemas,
        }
    }

    /// True iff every entry is a [`ValidationOutcome::Match`]. An empty
    /// report passes.
    pub fn all_passed(&self) -> bool {
        self.all_passed
    }

    pub fn summary(&self) -> ReportSummary {
        self.summary
    }

    pub fn entries(&self) -> &[OutcomeEntry] {
        &self.entries
    }

    pub fn failures(&self) -> impl Iterator<Item = &OutcomeEntry> {
        self.entries.iter().filter(|e| !e.outcome.is_match())
    }

    /// Catalog schemas that no sample was checked against.
    pub fn untested_schemas(&self) -> &[SchemaIdentity] {
        &self.untested_schemas
    }
}

/// Runs samples through a [`ValidationEngine`].
pub struct Reconciler<'a> {
    engine: &'a dyn ValidationEngine,
    mode: MatchMode,
    cancel: CancellationFlag,
}

impl<'a> Reconciler<'a> {
    pub fn new(engine: &'a dyn ValidationEngine) -> Self {
        Self {
            engine,
            mode: MatchMode::default(),
            cancel: CancellationFlag::default(),
        }
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Reconcile every sample on the current rayon pool.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if cancellation is requested before every
    /// sample has been checked; no partial report is produced.
    pub fn reconcile(
        &self,
        schemas: &SchemaCatalog,
        samples: &SampleCatalog,
    ) -> Result<Report, Cancelled> {
        let per_sample: Vec<Vec<OutcomeEntry>> = samples
            .samples()
            .par_iter()
            .map(|sample| -> Result<_, Cancelled> {
                self.cancel.check()?;
                Ok(self.check_sample(schemas, sample))
            })
            .collect::<Result<_, Cancelled>>()?;
        let entries: Vec<OutcomeEntry> = per_sample.into_iter().flatten().collect();

        let tested: BTreeSet<&SchemaIdentity> =
            entries.iter().filter_map(|e| e.schema.as_ref()).collect();
        let untested: Vec<SchemaIdentity> = schemas
            .identities()
            .filter(|id| !tested.contains(id))
            .cloned()
            .collect();
        for id in &untested {
            tracing::info!(schema = %id, "schema has no samples");
        }

        let report = Report::new(entries, untested);
        tracing::info!(
            mode = %self.mode,
            attempted = report.summary().attempted,
            failed = report.summary().attempted - report.summary().succeeded,
            "reconciliation finished"
        );
        Ok(report)
    }

    fn targets<'c>(&self, schemas: &'c SchemaCatalog, sample: &DataSample) -> Vec<&'c SchemaDocument> {
        let wanted = sample.schema_identity();
        match self.mode {
            MatchMode::Exact => schemas.get(wanted).into_iter().collect(),
            MatchMode::MinorCompatible => schemas
                .by_major(wanted.namespace(), wanted.name(), wanted.version().major())
                .into_iter()
                .filter(|doc| {
                    let v = doc.identity().version();
                    v == wanted.version() || v.minor() > wanted.version().minor()
                })
                .collect(),
        }
    }

    /// One entry per target schema. A sample whose named schema is absent
    /// always gets a [`ValidationOutcome::SchemaNotFound`] entry, even when
    /// later minors were checked in its place.
    fn check_sample(&self, schemas: &SchemaCatalog, sample: &DataSample) -> Vec<OutcomeEntry> {
        let mut entries = Vec::new();
        if schemas.get(sample.schema_identity()).is_none() {
            tracing::error!(
                location = %sample.location().display(),
                schema = %sample.schema_identity(),
                "schema not found"
            );
            entries.push(OutcomeEntry {
                location: sample.location().to_path_buf(),
                sample: sample.path().clone(),
                schema: None,
                outcome: ValidationOutcome::SchemaNotFound,
                violations: Vec::new(),
            });
        }

        entries.extend(
            self.targets(schemas, sample)
                .into_iter()
                .map(|schema| self.check_pair(schema, sample)),
        );
        entries
    }

    fn check_pair(&self, schema: &SchemaDocument, sample: &DataSample) -> OutcomeEntry {
        let expected = Verdict::from(sample.expected());
        let (outcome, violations) = match self.engine.validate(schema, sample) {
            EngineVerdict::EngineError(detail) => {
                tracing::error!(
                    location = %sample.location().display(),
                    schema = %schema.identity(),
                    error = %detail,
                    "validation engine error"
                );
                (ValidationOutcome::EngineError { detail }, Vec::new())
            }
            EngineVerdict::Valid if expected == Verdict::Valid => (ValidationOutcome::Match, Vec::new()),
            EngineVerdict::Invalid(_) if expected == Verdict::Invalid => {
                (ValidationOutcome::Match, Vec::new())
            }
            EngineVerdict::Valid => (
                ValidationOutcome::Mismatch {
                    expected,
                    actual: Verdict::Valid,
                },
                Vec::new(),
            ),
            EngineVerdict::Invalid(violations) => (
                ValidationOutcome::Mismatch {
                    expected,
                    actual: Verdict::Invalid,
                },
                violations,
            ),
        };

        match &outcome {
            ValidationOutcome::Match => tracing::debug!(
                location = %sample.location().display(),
                schema = %schema.identity(),
                "sample matches expectation"
            ),
            ValidationOutcome::Mismatch { expected, actual } => {
                let details: Vec<String> = violations.iter().map(ToString::to_string).collect();
                tracing::error!(
                    location = %sample.location().display(),
                    schema = %schema.identity(),
                    %expected,
                    %actual,
                    violations = ?details,
                    "sample does not match expectation"
                );
            }
            _ => {}
        }

        OutcomeEntry {
            location: sample.location().to_path_buf(),
            sample: sample.path().clone(),
            schema: Some(schema.identity().clone()),
            outcome,
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdv_core::SchemaVersion;
    use serde_json::{json, Value};

    /// Accepts a sample iff its content is `true` for every schema.
    struct BoolEngine;

    impl ValidationEngine for BoolEngine {
        fn validate(&self, _schema: &SchemaDocument, sample: &DataSample) -> EngineVerdict {
            match sample.content() {
                Value::Bool(true) => EngineVerdict::Valid,
                Value::Bool(false) => EngineVerdict::Invalid(vec![Violation {
                    instance_path: String::new(),
                    schema_path: "/const".into(),
                    message: "false is not allowed".into(),
                }]),
                _ => EngineVerdict::EngineError("not a boolean".into()),
            }
        }
    }

    fn schema(name: &str, major: u32, minor: u32) -> SchemaDocument {
        SchemaDocument::new(
            SchemaIdentity::new("omh", name, SchemaVersion::new(major, minor)),
            format!("/schema/omh/{name}/{major}.{minor}/schema.json"),
            json!({}),
        )
    }

    fn sample(rel: &str, content: Value) -> DataSample {
        DataSample::new(format!("/data/{rel}"), content).unwrap()
    }

    fn schemas(docs: Vec<SchemaDocument>) -> SchemaCatalog {
        SchemaCatalog::from_documents(docs).unwrap()
    }

    #[test]
    fn test_match_and_mismatch() {
        let schemas = schemas(vec![schema("bp", 1, 0)]);
        let samples = SampleCatalog::from_samples(vec![
            sample("omh/bp/1.0/shouldPass/a.json", json!(true)),
            sample("omh/bp/1.0/shouldFail/b.json", json!(false)),
            sample("omh/bp/1.0/shouldFail/c.json", json!(true)),
            sample("omh/bp/1.0/shouldPass/d.json", json!(false)),
        ]);
        let report = Reconciler::new(&BoolEngine).reconcile(&schemas, &samples).unwrap();

        let outcomes: Vec<&ValidationOutcome> = report.entries().iter().map(|e| &e.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                &ValidationOutcome::Match,
                &ValidationOutcome::Mismatch {
                    expected: Verdict::Invalid,
                    actual: Verdict::Valid
                },
                &ValidationOutcome::Match,
                &ValidationOutcome::Mismatch {
                    expected: Verdict::Valid,
                    actual: Verdict::Invalid
                },
            ]
        );
        assert!(!report.all_passed());
        assert_eq!(report.entries()[3].violations.len(), 1);
        assert!(report.entries()[1].violations.is_empty());
    }

    #[test]
    fn test_schema_not_found_does_not_stop_processing() {
        let schemas = schemas(vec![schema("bp", 1, 0)]);
        let samples = SampleCatalog::from_samples(vec![
            sample("omh/bp/1.0/shouldPass/a.json", json!(true)),
            sample("omh/hr/1.0/shouldPass/b.json", json!(true)),
            sample("omh/bp/1.0/shouldPass/c.json", json!(true)),
        ]);
        let report = Reconciler::new(&BoolEngine).reconcile(&schemas, &samples).unwrap();
        assert_eq!(report.entries().len(), 3);
        assert_eq!(report.entries()[2].outcome, ValidationOutcome::SchemaNotFound);
        assert!(report.entries()[2].schema.is_none());
        assert_eq!(report.summary().schema_not_found, 1);
        assert!(!report.all_passed());
    }

    #[test]
    fn test_engine_error_is_distinct() {
        let schemas = schemas(vec![schema("bp", 1, 0)]);
        let samples =
            SampleCatalog::from_samples(vec![sample("omh/bp/1.0/shouldFail/a.json", json!(3))]);
        let report = Reconciler::new(&BoolEngine).reconcile(&schemas, &samples).unwrap();
        assert!(matches!(
            report.entries()[0].outcome,
            ValidationOutcome::EngineError { .. }
        ));
        assert_eq!(report.summary().engine_errors, 1);
        assert_eq!(report.summary().failed, 0);
    }

    #[test]
    fn test_all_passed_iff_all_match() {
        let schemas = schemas(vec![schema("bp", 1, 0)]);
        let samples = SampleCatalog::from_samples(vec![
            sample("omh/bp/1.0/shouldPass/a.json", json!(true)),
            sample("omh/bp/1.0/shouldFail/b.json", json!(false)),
        ]);
        let report = Reconciler::new(&BoolEngine).reconcile(&schemas, &samples).unwrap();
        assert!(report.all_passed());
        assert_eq!(report.failures().count(), 0);

        let empty = Reconciler::new(&BoolEngine)
            .reconcile(&schemas, &SampleCatalog::default())
            .unwrap();
        assert!(empty.all_passed());
        assert_eq!(empty.untested_schemas().len(), 1);
    }

    #[test]
    fn test_minor_compatible_fan_out() {
        let schemas = schemas(vec![
            schema("bp", 1, 0),
            schema("bp", 1, 1),
            schema("bp", 1, 2),
            schema("bp", 2, 0),
        ]);
        let samples = SampleCatalog::from_samples(vec![
            sample("omh/bp/1.1/shouldPass/a.json", json!(true)),
        ]);

        let report = Reconciler::new(&BoolEngine)
            .with_mode(MatchMode::MinorCompatible)
            .reconcile(&schemas, &samples)
            .unwrap();
        let checked: Vec<String> = report
            .entries()
            .iter()
            .filter_map(|e| e.schema.as_ref().map(ToString::to_string))
            .collect();
        assert_eq!(checked, vec!["omh:bp:1.1", "omh:bp:1.2"]);
        let untested: Vec<String> = report.untested_schemas().iter().map(ToString::to_string).collect();
        assert_eq!(untested, vec!["omh:bp:1.0", "omh:bp:2.0"]);
    }

    #[test]
    fn test_minor_compatible_without_candidates() {
        let schemas = schemas(vec![schema("bp", 1, 0)]);
        let samples =
            SampleCatalog::from_samples(vec![sample("omh/bp/1.3/shouldPass/a.json", json!(true))]);
        let report = Reconciler::new(&BoolEngine)
            .with_mode(MatchMode::MinorCompatible)
            .reconcile(&schemas, &samples)
            .unwrap();
        assert_eq!(report.entries()[0].outcome, ValidationOutcome::SchemaNotFound);
    }

    #[test]
    fn test_minor_compatible_reports_missing_named_schema() {
        let schemas = schemas(vec![schema("bp", 1, 2)]);
        let samples =
            SampleCatalog::from_samples(vec![sample("omh/bp/1.1/shouldPass/a.json", json!(true))]);
        let report = Reconciler::new(&BoolEngine)
            .with_mode(MatchMode::MinorCompatible)
            .reconcile(&schemas, &samples)
            .unwrap();

        assert_eq!(report.entries().len(), 2);
        assert_eq!(report.entries()[0].outcome, ValidationOutcome::SchemaNotFound);
        assert!(report.entries()[0].schema.is_none());
        assert_eq!(report.entries()[1].outcome, ValidationOutcome::Match);
        assert_eq!(
            report.entries()[1].schema.as_ref().map(ToString::to_string).as_deref(),
            Some("omh:bp:1.2")
        );
        assert_eq!(report.summary().schema_not_found, 1);
        assert!(!report.all_passed());
    }

    #[test]
    fn test_cancelled_reconciliation() {
        let schemas = schemas(vec![schema("bp", 1, 0)]);
        let samples =
            SampleCatalog::from_samples(vec![sample("omh/bp/1.0/shouldPass/a.json", json!(true))]);
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let result = Reconciler::new(&BoolEngine)
            .with_cancellation(cancel)
            .reconcile(&schemas, &samples);
        assert_eq!(result.unwrap_err(), Cancelled);
    }

    #[test]
    fn test_outcome_serialization() {
        let v = serde_json::to_value(ValidationOutcome::Mismatch {
            expected: Verdict::Invalid,
            actual: Verdict::Valid,
        })
        .unwrap();
        assert_eq!(v, json!({"outcome": "mismatch", "expected": "invalid", "actual": "valid"}));
        assert_eq!("minor-compatible".parse::<MatchMode>().unwrap(), MatchMode::MinorCompatible);
    }
}
