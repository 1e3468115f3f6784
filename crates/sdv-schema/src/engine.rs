//! # Validation Engine
//!
//! [`ValidationEngine`] is the seam between reconciliation and a concrete
//! JSON Schema implementation. [`JsonSchemaEngine`] backs it with the
//! `jsonschema` crate.
//!
//! ## Schema Resolution
//!
//! Cross-schema `$ref`s never touch the network. Every catalog schema is
//! registered with a local retriever under:
//!
//! - its own `$id`, when it declares one
//! - `<name>-<version>.json` and `<namespace>/<name>-<version>.json`
//! - `<namespace>/<name>/<version>/schema.json` and `<name>/<version>/schema.json`
//! - the wildcard alias `<name>-<major>.x.json` (and its namespaced form),
//!   which points at the highest version of that major
//!
//! A reference is looked up by its full URI first, then by ever shorter
//! trailing path suffixes. A reference that matches nothing is an error, so
//! the schema fails to compile and every sample checked against it gets an
//! `EngineError` verdict.
//!
//! ## Drafts and Formats
//!
//! The draft comes from the schema's `$schema` keyword, defaulting to Draft
//! 2020-12. Format assertions (`date-time`, `email`, ...) are enabled.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use jsonschema::{Retrieve, Uri, Validator};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

use sdv_core::SchemaIdentity;

use crate::catalog::{SchemaCatalog, SchemaDocument};
use crate::samples::DataSample;

/// A single schema violation reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON Pointer to the offending value in the sample.
    pub instance_path: String,
    /// JSON Pointer to the schema keyword that rejected it.
    pub schema_path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

/// What the engine concluded about one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineVerdict {
    Valid,
    Invalid(Vec<Violation>),
    /// The engine could not reach a verdict: the schema did not compile, a
    /// reference did not resolve, or the engine panicked.
    EngineError(String),
}

/// Checks a sample document against a schema document.
pub trait ValidationEngine: Send + Sync {
    fn validate(&self, schema: &SchemaDocument, sample: &DataSample) -> EngineVerdict;
}

/// Resolves `$ref` URIs against the schema catalog only.
#[derive(Clone)]
struct LocalSchemaRetriever {
    index: Arc<HashMap<String, Value>>,
}

impl LocalSchemaRetriever {
    fn from_catalog(catalog: &SchemaCatalog) -> Self {
        let mut index: HashMap<String, Value> = HashMap::new();
        let mut highest: BTreeMap<(&str, &str, u32), &SchemaDocument> = BTreeMap::new();

        // Identity order; on a key collision the first schema keeps it.
        for doc in catalog.iter() {
            let id = doc.identity();
            let (ns, name, version) = (id.namespace(), id.name(), id.version());
            let content = doc.content();

            let mut keys = vec![
                format!("{ns}/{name}-{version}.json"),
                format!("{name}-{version}.json"),
                format!("{ns}/{name}/{version}/schema.json"),
                format!("{name}/{version}/schema.json"),
            ];
            if let Some(declared) = content.get("$id").and_then(Value::as_str) {
                keys.insert(0, declared.trim_end_matches('#').to_string());
            }
            for key in keys {
                index.entry(key).or_insert_with(|| content.clone());
            }

            // Ascending iteration leaves the highest version in place.
            highest.insert((ns, name, version.major()), doc);
        }

        for ((ns, name, major), doc) in highest {
            for key in [
                format!("{name}-{major}.x.json"),
                format!("{ns}/{name}-{major}.x.json"),
            ] {
                index.entry(key).or_insert_with(|| doc.content().clone());
            }
        }

        Self {
            index: Arc::new(index),
        }
    }

    fn lookup(&self, uri: &str) -> Option<&Value> {
        if let Some(value) = self.index.get(uri) {
            return Some(value);
        }
        let without_fragment = uri.split('#').next().unwrap_or(uri);
        let path = without_fragment
            .split_once("://")
            .map_or(without_fragment, |(_, rest)| rest);
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        (0..segments.len()).find_map(|start| self.index.get(&segments[start..].join("/")))
    }
}

impl Retrieve for LocalSchemaRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        match self.lookup(uri.as_str()) {
            Some(value) => Ok(value.clone()),
            None => Err(format!("unresolvable schema reference '{}'", uri.as_str()).into()),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

struct CompiledSchema {
    location: PathBuf,
    validator: Result<Validator, String>,
}

/// [`ValidationEngine`] backed by the `jsonschema` crate.
///
/// Every catalog schema is compiled once, up front. A schema document that
/// did not come from the catalog is compiled on each call.
pub struct JsonSchemaEngine {
    retriever: LocalSchemaRetriever,
    compiled: HashMap<SchemaIdentity, CompiledSchema>,
}

impl JsonSchemaEngine {
    /// Compile every schema in `catalog` on the current rayon pool.
    pub fn new(catalog: &SchemaCatalog) -> Self {
        let retriever = LocalSchemaRetriever::from_catalog(catalog);
        let docs: Vec<&SchemaDocument> = catalog.iter().collect();

        let compiled: HashMap<SchemaIdentity, CompiledSchema> = docs
            .into_par_iter()
            .map(|doc| {
                let validator = compile(&retriever, doc.content());
                match &validator {
                    Ok(_) => tracing::debug!(schema = %doc.identity(), "compiled schema"),
                    Err(e) => tracing::warn!(schema = %doc.identity(), error = %e, "schema does not compile"),
                }
                (
                    doc.identity().clone(),
                    CompiledSchema {
                        location: doc.location().to_path_buf(),
                        validator,
                    },
                )
            })
            .collect();

        Self {
            retriever,
            compiled,
        }
    }

    /// Number of catalog schemas that compiled.
    pub fn compiled_count(&self) -> usize {
        self.compiled
            .values()
            .filter(|c| c.validator.is_ok())
            .count()
    }
}

impl fmt::Debug for JsonSchemaEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaEngine")
            .field("schemas", &self.compiled.len())
            .field("references", &self.retriever.index.len())
            .finish()
    }
}

fn compile(retriever: &LocalSchemaRetriever, schema: &Value) -> Result<Validator, String> {
    let mut opts = jsonschema::options();
    if schema.get("$schema").is_none() {
        opts.with_draft(jsonschema::Draft::Draft202012);
    }
    opts.should_validate_formats(true);
    opts.with_retriever(retriever.clone());

    catch_unwind(AssertUnwindSafe(|| opts.build(schema)))
        .map_err(|payload| format!("engine panicked while compiling: {}", panic_message(&*payload)))?
        .map_err(|e| e.to_string())
}

fn run(validator: &Validator, instance: &Value) -> EngineVerdict {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        validator
            .iter_errors(instance)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect::<Vec<_>>()
    }));
    match outcome {
        Ok(violations) if violations.is_empty() => EngineVerdict::Valid,
        Ok(violations) => EngineVerdict::Invalid(violations),
        Err(payload) => EngineVerdict::EngineError(format!(
            "engine panicked while validating: {}",
            panic_message(&*payload)
        )),
    }
}

impl ValidationEngine for JsonSchemaEngine {
    fn validate(&self, schema: &SchemaDocument, sample: &DataSample) -> EngineVerdict {
        let cached = self
            .compiled
            .get(schema.identity())
            .filter(|c| c.location.as_path() == schema.location());

        match cached {
            Some(CompiledSchema {
                validator: Ok(v), ..
            }) => run(v, sample.content()),
            Some(CompiledSchema {
                validator: Err(e), ..
            }) => EngineVerdict::EngineError(e.clone()),
            None => match compile(&self.retriever, schema.content()) {
                Ok(v) => run(&v, sample.content()),
                Err(e) => EngineVerdict::EngineError(e),
            },
        }
    }
}
