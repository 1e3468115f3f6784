//! # Schema Catalog
//!
//! Walks a schema root, asks a [`SchemaLocator`] which files are schema
//! documents and what identity each declares, and loads their JSON.
//!
//! ## Failure Policy
//!
//! - A recognised file whose location does not yield an identity fails the
//!   build (`CatalogError::MalformedPath`).
//! - Two files with one identity fail the build
//!   (`CatalogError::DuplicateSchema`). The check runs on the sorted file
//!   list before any worker starts, so the reported pair is the same on
//!   every run.
//! - Unreadable or non-JSON files are collected as [`LoadError`]s and the
//!   build carries on.
//!
//! The finished catalog is immutable.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_json::Value;

use sdv_core::{SchemaIdentity, SchemaLocator};

use crate::discover::{files_under, location_string, parse_relative, relative_location};
use crate::error::{CatalogError, DocumentKind, DuplicateSchemaError, LoadError};
use crate::pool::{load_json, LoadOptions};

/// A loaded schema file.
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    identity: SchemaIdentity,
    location: PathBuf,
    content: Value,
}

impl SchemaDocument {
    pub fn new(identity: SchemaIdentity, location: impl Into<PathBuf>, content: Value) -> Self {
        Self {
            identity,
            location: location.into(),
            content,
        }
    }

    pub fn identity(&self) -> &SchemaIdentity {
        &self.identity
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn content(&self) -> &Value {
        &self.content
    }
}

/// Identity-indexed, frozen set of schema documents.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    schemas: BTreeMap<SchemaIdentity, SchemaDocument>,
    load_errors: Vec<LoadError>,
}

impl SchemaCatalog {
    /// Walk `root` and build the catalog.
    ///
    /// Per-file loading runs on the current rayon pool; call this inside
    /// [`crate::pool::WorkerPool::install`] to bound it.
    ///
    /// # Errors
    ///
    /// See the module documentation for which failures abort the build.
    pub fn build(
        root: &Path,
        locator: &dyn SchemaLocator,
        options: &LoadOptions,
    ) -> Result<Self, CatalogError> {
        options.cancel.check()?;

        let mut claimed: BTreeMap<SchemaIdentity, PathBuf> = BTreeMap::new();
        for path in files_under(root)? {
            if !locator.recognizes(&relative_location(root, &path)) {
                continue;
            }
            let identity = parse_relative(root, &path, |loc| locator.identify(loc))?;
            match claimed.entry(identity) {
                Entry::Vacant(slot) => {
                    slot.insert(path);
                }
                Entry::Occupied(slot) => {
                    return Err(DuplicateSchemaError {
                        identity: slot.key().clone(),
                        first: slot.get().clone(),
                        second: path,
                    }
                    .into());
                }
            }
        }

        let mut candidates: Vec<(SchemaIdentity, PathBuf)> = claimed.into_iter().collect();
        candidates.sort_by_cached_key(|(_, path)| location_string(path));

        let loaded: Vec<Result<SchemaDocument, LoadError>> = candidates
            .into_par_iter()
            .map(|(identity, path)| -> Result<_, CatalogError> {
                options.cancel.check()?;
                Ok(match load_json(&path, options) {
                    Ok(content) => Ok(SchemaDocument::new(identity, path, content)),
                    Err(detail) => Err(LoadError {
                        kind: DocumentKind::Schema,
                        location: path,
                        detail,
                    }),
                })
            })
            .collect::<Result<_, CatalogError>>()?;

        let mut catalog = Self::default();
        for result in loaded {
            match result {
                Ok(doc) => {
                    catalog.schemas.insert(doc.identity.clone(), doc);
                }
                Err(e) => {
                    tracing::error!(location = %e.location.display(), detail = %e.detail, "schema load error");
                    catalog.load_errors.push(e);
                }
            }
        }

        tracing::info!(
            root = %root.display(),
            schema_count = catalog.len(),
            load_errors = catalog.load_errors.len(),
            "loaded schema catalog"
        );
        Ok(catalog)
    }

    /// Build a catalog from documents already in memory.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateSchemaError`] if two documents share an identity.
    pub fn from_documents(
        documents: impl IntoIterator<Item = SchemaDocument>,
    ) -> Result<Self, DuplicateSchemaError> {
        let mut docs: Vec<SchemaDocument> = documents.into_iter().collect();
        docs.sort_by_cached_key(|d| location_string(&d.location));

        let mut schemas = BTreeMap::new();
        for doc in docs {
            match schemas.entry(doc.identity.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(doc);
                }
                Entry::Occupied(slot) => {
                    let existing: &SchemaDocument = slot.get();
                    return Err(DuplicateSchemaError {
                        identity: doc.identity.clone(),
                        first: existing.location.clone(),
                        second: doc.location,
                    });
                }
            }
        }
        Ok(Self {
            schemas,
            load_errors: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn get(&self, identity: &SchemaIdentity) -> Option<&SchemaDocument> {
        self.schemas.get(identity)
    }

    /// Documents in identity order.
    pub fn iter(&self) -> impl Iterator<Item = &SchemaDocument> {
        self.schemas.values()
    }

    pub fn identities(&self) -> impl Iterator<Item = &SchemaIdentity> {
        self.schemas.keys()
    }

    /// Files that were discovered but could not be loaded, by location.
    pub fn load_errors(&self) -> &[LoadError] {
        &self.load_errors
    }

    /// All versions of `namespace:name` with the given major, ascending.
    pub fn by_major(&self, namespace: &str, name: &str, major: u32) -> Vec<&SchemaDocument> {
        self.schemas
            .values()
            .filter(|d| {
                let id = &d.identity;
                id.namespace() == namespace && id.name() == name && id.version().major() == major
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdv_core::{SchemaLayout, SchemaVersion};
    use serde_json::json;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    fn id(ns: &str, name: &str, major: u32, minor: u32) -> SchemaIdentity {
        SchemaIdentity::new(ns, name, SchemaVersion::new(major, minor))
    }

    #[test]
    fn test_build_nested_catalog() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "omh/blood-pressure/1.0/schema.json", r#"{"type":"object"}"#);
        write(dir.path(), "omh/blood-pressure/2.0/schema.json", r#"{"type":"object"}"#);
        write(dir.path(), "omh/blood-pressure/2.0/notes.md", "ignored");

        let catalog =
            SchemaCatalog::build(dir.path(), &SchemaLayout::Nested, &LoadOptions::default()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.get(&id("omh", "blood-pressure", 1, 0)).is_some());
        assert!(catalog.load_errors().is_empty());
    }

    #[test]
    fn test_build_flat_catalog() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "omh/step-count-1.0.json", "{}");
        write(dir.path(), "omh/step-count-1.x.json", "{}");
        let catalog =
            SchemaCatalog::build(dir.path(), &SchemaLayout::Flat, &LoadOptions::default()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get(&id("omh", "step-count", 1, 0)).is_some());
    }

    #[test]
    fn test_duplicate_identity_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "omh/heart-rate/1.0/schema.json", "{}");
        write(dir.path(), "omh/heart-rate/01.0/schema.json", "{}");

        let err = SchemaCatalog::build(dir.path(), &SchemaLayout::Nested, &LoadOptions::default())
            .unwrap_err();
        match err {
            CatalogError::DuplicateSchema(dup) => {
                assert_eq!(dup.identity, id("omh", "heart-rate", 1, 0));
                assert!(location_string(&dup.first).contains("01.0"));
                assert!(dup.second.ends_with("heart-rate/1.0/schema.json"));
            }
            other => panic!("expected DuplicateSchema, got {other}"),
        }
    }

    #[test]
    fn test_load_errors_are_collected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "omh/a/1.0/schema.json", "{ broken");
        write(dir.path(), "omh/b/1.0/schema.json", "[1, 2,");
        write(dir.path(), "omh/c/1.0/schema.json", "{}");

        let catalog =
            SchemaCatalog::build(dir.path(), &SchemaLayout::Nested, &LoadOptions::default()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.load_errors().len(), 2);
        assert!(catalog.load_errors().iter().all(|e| e.kind == DocumentKind::Schema));
        assert!(catalog.load_errors()[0].location.ends_with("omh/a/1.0/schema.json"));
    }

    #[test]
    fn test_shallow_schema_does_not_borrow_root_segment() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("schema");
        write(&root, "omh/1.0/schema.json", "{}");

        let err = SchemaCatalog::build(&root, &SchemaLayout::Nested, &LoadOptions::default())
            .unwrap_err();
        match err {
            CatalogError::MalformedPath(e) => {
                assert_eq!(e.location, location_string(&root.join("omh/1.0/schema.json")));
            }
            other => panic!("expected MalformedPath, got {other}"),
        }
    }

    #[test]
    fn test_malformed_schema_location_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "omh/Blood-Pressure/1.0/schema.json", "{}");
        let err = SchemaCatalog::build(dir.path(), &SchemaLayout::Nested, &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, CatalogError::MalformedPath(_)));
    }

    #[test]
    fn test_cancelled_before_build() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "omh/a/1.0/schema.json", "{}");
        let options = LoadOptions::default();
        options.cancel.cancel();
        let err = SchemaCatalog::build(dir.path(), &SchemaLayout::Nested, &options).unwrap_err();
        assert!(matches!(err, CatalogError::Cancelled(_)));
    }

    #[test]
    fn test_from_documents_detects_duplicates() {
        let a = SchemaDocument::new(id("omh", "x", 1, 0), "/b/schema.json", json!({}));
        let b = SchemaDocument::new(id("omh", "x", 1, 0), "/a/schema.json", json!({}));
        let err = SchemaCatalog::from_documents(vec![a, b]).unwrap_err();
        assert_eq!(err.first, PathBuf::from("/a/schema.json"));
        assert_eq!(err.second, PathBuf::from("/b/schema.json"));
    }

    #[test]
    fn test_by_major_ascending() {
        let docs = [(1, 2), (1, 0), (2, 0), (1, 1)]
            .into_iter()
            .map(|(ma, mi)| {
                SchemaDocument::new(id("omh", "x", ma, mi), format!("/s/{ma}.{mi}"), json!({}))
            });
        let catalog = SchemaCatalog::from_documents(docs).unwrap();
        let minors: Vec<u32> = catalog
            .by_major("omh", "x", 1)
            .iter()
            .map(|d| d.identity().version().minor())
            .collect();
        assert_eq!(minors, vec![0, 1, 2]);
        assert!(catalog.by_major("omh", "y", 1).is_empty());
    }
}
