//! # Schema Identity Types
//!
//! `SchemaIdentity` names exactly one schema document: a namespace (`omh`,
//! `ieee`, ...), a schema name (`blood-pressure`) and a `SchemaVersion`.
//! Samples carry the identity of the schema they claim conformance to, and
//! the reconciliation step joins the two catalogs on it.
//!
//! Versions are stored structurally. Two tokens that differ only in
//! incidental formatting (`1.0` vs `01.0`) produce equal identities, so a
//! catalog lookup never misses because of how a directory was spelled.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::VersionParseError;

/// Version grammar: `major.minor` with an optional alphanumeric qualifier.
const VERSION_PATTERN: &str = r"^(\d+)\.(\d+)(?:\.([a-zA-Z0-9]+))?$";

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Literal pattern; compilation cannot fail.
    RE.get_or_init(|| Regex::new(VERSION_PATTERN).expect("version pattern is a valid regex"))
}

/// A schema version, e.g. `1.0`, `2.1` or `1.0.RC1`.
///
/// # Ordering
///
/// Major, then minor. A qualified version sorts before the unqualified
/// release with the same major and minor (`1.0.RC1 < 1.0`); two qualifiers
/// compare lexically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaVersion {
    major: u32,
    minor: u32,
    qualifier: Option<String>,
}

impl SchemaVersion {
    /// Create a release version without a qualifier.
    pub fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            qualifier: None,
        }
    }

    /// Create a version with a qualifier.
    ///
    /// # Errors
    ///
    /// Returns [`VersionParseError::Malformed`] if the qualifier is empty or
    /// contains anything other than ASCII letters and digits.
    pub fn with_qualifier(
        major: u32,
        minor: u32,
        qualifier: impl Into<String>,
    ) -> Result<Self, VersionParseError> {
        let qualifier = qualifier.into();
        if qualifier.is_empty() || !qualifier.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(VersionParseError::Malformed(format!(
                "{major}.{minor}.{qualifier}"
            )));
        }
        Ok(Self {
            major,
            minor,
            qualifier: Some(qualifier),
        })
    }

    /// Parse a version token such as `1.0` or `1.2.beta1`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionParseError`] when the token does not match
    /// `major.minor[.qualifier]` or a component overflows `u32`.
    pub fn parse(token: &str) -> Result<Self, VersionParseError> {
        let caps = version_regex()
            .captures(token)
            .ok_or_else(|| VersionParseError::Malformed(token.to_string()))?;

        let component = |idx: usize| -> Result<u32, VersionParseError> {
            caps.get(idx)
                .map(|m| m.as_str())
                .unwrap_or_default()
                .parse::<u32>()
                .map_err(|_| VersionParseError::OutOfRange(token.to_string()))
        };

        Ok(Self {
            major: component(1)?,
            minor: component(2)?,
            qualifier: caps.get(3).map(|m| m.as_str().to_string()),
        })
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }
}

impl Ord for SchemaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then_with(|| match (&self.qualifier, &other.qualifier) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for SchemaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(q) = &self.qualifier {
            write!(f, ".{q}")?;
        }
        Ok(())
    }
}

impl FromStr for SchemaVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for SchemaVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SchemaVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// The `(namespace, name, version)` triple that names a schema document.
///
/// Ordering is by namespace, then name, then version, so a `BTreeMap` keyed
/// by identity iterates schemas grouped by family and ascending version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaIdentity {
    namespace: String,
    name: String,
    version: SchemaVersion,
}

impl SchemaIdentity {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, version: SchemaVersion) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            version,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &SchemaVersion {
        &self.version
    }

    /// True if `other` names the same schema family and major version.
    pub fn same_major(&self, other: &SchemaIdentity) -> bool {
        self.namespace == other.namespace
            && self.name == other.name
            && self.version.major == other.version.major
    }
}

impl fmt::Display for SchemaIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.name, self.version)
    }
}

/// The verdict a sample's location claims validation should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExpectedOutcome {
    ShouldPass,
    ShouldFail,
}

impl ExpectedOutcome {
    /// The directory literal that encodes this outcome.
    pub fn as_segment(self) -> &'static str {
        match self {
            Self::ShouldPass => "shouldPass",
            Self::ShouldFail => "shouldFail",
        }
    }

    /// Map a directory literal back to an outcome. Matching is exact.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "shouldPass" => Some(Self::ShouldPass),
            "shouldFail" => Some(Self::ShouldFail),
            _ => None,
        }
    }

    /// Whether a sample with this expectation should be accepted by the engine.
    pub fn expects_valid(self) -> bool {
        matches!(self, Self::ShouldPass)
    }
}

impl fmt::Display for ExpectedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_segment())
    }
}
