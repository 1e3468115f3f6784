//! # Sample Catalog
//!
//! Walks a sample root and loads every file that sits in a `shouldPass` or
//! `shouldFail` directory and has the `json` extension. Each candidate's
//! identity comes from [`parse_sample_location`] applied to its location
//! relative to the root; a candidate that does not parse fails the whole
//! build. Unreadable files are collected as
//! [`LoadError`]s.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_json::Value;

use sdv_core::{
    parse_sample_location, ExpectedOutcome, MalformedPathError, SamplePath, SchemaIdentity,
};

use crate::discover::{files_under, location_string, parse_relative};
use crate::error::{CatalogError, DocumentKind, LoadError};
use crate::pool::{load_json, LoadOptions};

/// A loaded sample document.
#[derive(Debug, Clone)]
pub struct DataSample {
    location: PathBuf,
    path: SamplePath,
    content: Value,
}

impl DataSample {
    /// Parse `location` and wrap already-loaded content.
    pub fn new(location: impl Into<PathBuf>, content: Value) -> Result<Self, MalformedPathError> {
        let location = location.into();
        let path = parse_sample_location(&location_string(&location))?;
        Ok(Self {
            location,
            path,
            content,
        })
    }

    pub fn name(&self) -> &str {
        self.path.sample_name()
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn path(&self) -> &SamplePath {
        &self.path
    }

    pub fn schema_identity(&self) -> &SchemaIdentity {
        self.path.identity()
    }

    pub fn expected(&self) -> ExpectedOutcome {
        self.path.expected()
    }

    pub fn content(&self) -> &Value {
        &self.content
    }
}

/// Samples ordered by location.
#[derive(Debug, Clone, Default)]
pub struct SampleCatalog {
    samples: Vec<DataSample>,
    load_errors: Vec<LoadError>,
}

fn is_outcome_dir(path: &Path) -> bool {
    path.parent()
        .and_then(Path::file_name)
        .and_then(|n| n.to_str())
        .and_then(ExpectedOutcome::from_segment)
        .is_some()
}

fn has_json_extension(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "json")
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

impl SampleCatalog {
    /// Walk `root` and build the catalog. Loading runs on the current rayon
    /// pool.
    pub fn build(root: &Path, options: &LoadOptions) -> Result<Self, CatalogError> {
        options.cancel.check()?;

        let mut candidates = Vec::new();
        for path in files_under(root)? {
            if is_hidden(&path) || !has_json_extension(&path) {
                continue;
            }
            if !is_outcome_dir(&path) {
                tracing::warn!(
                    location = %path.display(),
                    "skipping JSON file outside a shouldPass/shouldFail directory"
                );
                continue;
            }
            let sample_path = parse_relative(root, &path, parse_sample_location)?;
            candidates.push((path, sample_path));
        }

        let loaded: Vec<Result<DataSample, LoadError>> = candidates
            .into_par_iter()
            .map(|(location, path)| -> Result<_, CatalogError> {
                options.cancel.check()?;
                Ok(match load_json(&location, options) {
                    Ok(content) => Ok(DataSample {
                        location,
                        path,
                        content,
                    }),
                    Err(detail) => Err(LoadError {
                        kind: DocumentKind::Sample,
                        location,
                        detail,
                    }),
                })
            })
            .collect::<Result<_, CatalogError>>()?;

        let mut catalog = Self::default();
        for result in loaded {
            match result {
                Ok(sample) => catalog.samples.push(sample),
                Err(e) => {
                    tracing::error!(location = %e.location.display(), detail = %e.detail, "sample load error");
                    catalog.load_errors.push(e);
                }
            }
        }

        tracing::info!(
            root = %root.display(),
            sample_count = catalog.len(),
            load_errors = catalog.load_errors.len(),
            "loaded sample catalog"
        );
        Ok(catalog)
    }

    pub fn from_samples(samples: impl IntoIterator<Item = DataSample>) -> Self {
        let mut samples: Vec<DataSample> = samples.into_iter().collect();
        samples.sort_by_cached_key(|s| location_string(&s.location));
        Self {
            samples,
            load_errors: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DataSample> {
        self.samples.iter()
    }

    pub fn samples(&self) -> &[DataSample] {
        &self.samples
    }

    pub fn load_errors(&self) -> &[LoadError] {
        &self.load_errors
    }
}

impl<'a> IntoIterator for &'a SampleCatalog {
    type Item = &'a DataSample;
    type IntoIter = std::slice::Iter<'a, DataSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
