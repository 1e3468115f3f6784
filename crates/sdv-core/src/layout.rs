//! # Schema Locations
//!
//! Decides which files under a schema root are schema documents and which
//! identity each one declares through its location.
//!
//! Two layouts are built in:
//!
//! - [`SchemaLayout::Nested`]: `.../<namespace>/<name>/<version>/schema.json`
//! - [`SchemaLayout::Flat`]: `.../<namespace>/<name>-<version>.json`
//!
//! Hidden files and wildcard aliases (`*.x.json`) are never schema documents
//! in either layout. Callers with a different convention implement
//! [`SchemaLocator`] themselves.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::MalformedPathError;
use crate::identity::{SchemaIdentity, SchemaVersion};
use crate::path::normalize_separators;

/// File name of a schema document in the nested layout.
pub const NESTED_SCHEMA_FILE_NAME: &str = "schema.json";

const NESTED_PATTERN: &str = r"(?:^|/)([a-z0-9-]+)/([a-z0-9-]+)/([^/]+)/schema\.json$";
const FLAT_PATTERN: &str = r"(?:^|/)([a-z0-9-]+)/([a-z0-9-]+)-([0-9][^/-]*)\.json$";

fn nested_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Literal pattern; compilation cannot fail.
    RE.get_or_init(|| Regex::new(NESTED_PATTERN).expect("nested layout pattern is a valid regex"))
}

fn flat_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Literal pattern; compilation cannot fail.
    RE.get_or_init(|| Regex::new(FLAT_PATTERN).expect("flat layout pattern is a valid regex"))
}

/// Identification rule for schema documents.
///
/// `recognizes` is a cheap filter applied during the directory walk;
/// `identify` is only called on recognised locations and must fail rather
/// than guess when the location does not carry a complete identity.
pub trait SchemaLocator: Send + Sync {
    /// Whether the file at `location` is a schema document.
    fn recognizes(&self, location: &str) -> bool;

    /// Extract the identity a recognised schema location declares.
    fn identify(&self, location: &str) -> Result<SchemaIdentity, MalformedPathError>;
}

/// Built-in schema directory layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaLayout {
    /// `<namespace>/<name>/<version>/schema.json`
    #[default]
    Nested,
    /// `<namespace>/<name>-<version>.json`
    Flat,
}

fn file_name(location: &str) -> &str {
    location.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(location)
}

impl SchemaLocator for SchemaLayout {
    fn recognizes(&self, location: &str) -> bool {
        let name = file_name(location);
        if name.starts_with('.') || name.ends_with(".x.json") {
            return false;
        }
        match self {
            Self::Nested => name == NESTED_SCHEMA_FILE_NAME,
            Self::Flat => name.ends_with(".json"),
        }
    }

    fn identify(&self, location: &str) -> Result<SchemaIdentity, MalformedPathError> {
        let normalized = normalize_separators(location);
        let (re, expected) = match self {
            Self::Nested => (nested_regex(), ".../<namespace>/<name>/<version>/schema.json"),
            Self::Flat => (flat_regex(), ".../<namespace>/<name>-<version>.json"),
        };

        let caps = re
            .captures(&normalized)
            .ok_or_else(|| MalformedPathError::new(location, format!("expected {expected}")))?;
        let group = |idx: usize| caps.get(idx).map(|m| m.as_str()).unwrap_or_default();

        let version = SchemaVersion::parse(group(3))
            .map_err(|e| MalformedPathError::new(location, e.to_string()))?;

        Ok(SchemaIdentity::new(group(1), group(2), version))
    }
}

impl fmt::Display for SchemaLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nested => f.write_str("nested"),
            Self::Flat => f.write_str("flat"),
        }
    }
}

impl FromStr for SchemaLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nested" => Ok(Self::Nested),
            "flat" => Ok(Self::Flat),
            other => Err(format!("unknown schema layout '{other}' (expected nested or flat)")),
        }
    }
}
