//! # Error Types — Structural Corpus Errors
//!
//! Errors raised while turning file locations into structured identities.
//! These are the "broken corpus layout" class: a catalog build that meets
//! one of them stops, because every result computed afterwards would be
//! untrustworthy.

use thiserror::Error;

/// A file location does not follow the corpus naming convention.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed location '{location}': {reason}")]
pub struct MalformedPathError {
    /// The location string as it was given to the parser.
    pub location: String,
    /// What part of the grammar the location violates.
    pub reason: String,
}

impl MalformedPathError {
    pub(crate) fn new(location: &str, reason: impl Into<String>) -> Self {
        Self {
            location: location.to_string(),
            reason: reason.into(),
        }
    }
}

/// A version token is not of the form `major.minor[.qualifier]`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    /// The token does not match the version grammar at all.
    #[error("malformed version '{0}': expected major.minor[.qualifier]")]
    Malformed(String),

    /// A numeric component does not fit in 32 bits.
    #[error("version component out of range in '{0}'")]
    OutOfRange(String),
}
