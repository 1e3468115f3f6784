//! # Sample Location Parsing
//!
//! A sample's identity and expected outcome are encoded in the trailing
//! segments of its location:
//!
//! ```text
//! .../<namespace>/<name>/<version>/(shouldPass|shouldFail)/<sampleName>.json
//! ```
//!
//! `namespace`, `name` and `sampleName` are lowercase ASCII letters, digits
//! and hyphens. `version` is any non-slash token that parses as a
//! [`SchemaVersion`]. Matching is anchored to the end of the location, so an
//! absolute filesystem path, a relative path and a `file://` URI all parse
//! the same way.
//!
//! The parser is pure: the same input always yields the same identity or
//! the same error, and a failure never yields a partial identity.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::MalformedPathError;
use crate::identity::{ExpectedOutcome, SchemaIdentity, SchemaVersion};

/// Trailing-segment grammar. The namespace must start a segment.
const SAMPLE_LOCATION_PATTERN: &str =
    r"(?:^|/)([a-z0-9-]+)/([a-z0-9-]+)/([^/]+)/(shouldPass|shouldFail)/([a-z0-9-]+)\.json$";

fn sample_location_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Literal pattern; compilation cannot fail.
    RE.get_or_init(|| {
        Regex::new(SAMPLE_LOCATION_PATTERN).expect("sample location pattern is a valid regex")
    })
}

/// Normalise platform separators so the grammar only deals with `/`.
pub(crate) fn normalize_separators(location: &str) -> std::borrow::Cow<'_, str> {
    if location.contains('\\') {
        std::borrow::Cow::Owned(location.replace('\\', "/"))
    } else {
        std::borrow::Cow::Borrowed(location)
    }
}

/// The structured identity extracted from a sample location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SamplePath {
    identity: SchemaIdentity,
    expected: ExpectedOutcome,
    sample_name: String,
}

impl SamplePath {
    pub fn identity(&self) -> &SchemaIdentity {
        &self.identity
    }

    pub fn expected(&self) -> ExpectedOutcome {
        self.expected
    }

    pub fn sample_name(&self) -> &str {
        &self.sample_name
    }

    /// Rebuild the relative location this identity was parsed from, e.g.
    /// `omh/blood-pressure/1.0/shouldPass/example-1.json`.
    pub fn to_relative_location(&self) -> String {
        format!(
            "{}/{}/{}/{}/{}.json",
            self.identity.namespace(),
            self.identity.name(),
            self.identity.version(),
            self.expected.as_segment(),
            self.sample_name
        )
    }
}

impl fmt::Display for SamplePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.identity, self.expected, self.sample_name)
    }
}

/// Parse a sample location into its structured identity.
///
/// # Errors
///
/// Returns [`MalformedPathError`] if the trailing segments do not match the
/// grammar (missing segment, wrong outcome literal, uppercase characters,
/// wrong extension) or the version token is not a valid [`SchemaVersion`].
pub fn parse_sample_location(location: &str) -> Result<SamplePath, MalformedPathError> {
    let normalized = normalize_separators(location);

    let caps = sample_location_regex().captures(&normalized).ok_or_else(|| {
        MalformedPathError::new(
            location,
            "expected .../<namespace>/<name>/<version>/(shouldPass|shouldFail)/<sample-name>.json",
        )
    })?;

    // Groups 1..=5 are mandatory in the pattern, so each is present on a match.
    let group = |idx: usize| caps.get(idx).map(|m| m.as_str()).unwrap_or_default();

    let version = SchemaVersion::parse(group(3))
        .map_err(|e| MalformedPathError::new(location, e.to_string()))?;

    let expected = ExpectedOutcome::from_segment(group(4))
        .ok_or_else(|| MalformedPathError::new(location, "unknown outcome segment"))?;

    Ok(SamplePath {
        identity: SchemaIdentity::new(group(1), group(2), version),
        expected,
        sample_name: group(5).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute_path() {
        let p = parse_sample_location(
            "/srv/corpus/test-data/omh/blood-pressure/1.0/shouldPass/example-1.json",
        )
        .unwrap();
        assert_eq!(p.identity().namespace(), "omh");
        assert_eq!(p.identity().name(), "blood-pressure");
        assert_eq!(p.identity().version(), &SchemaVersion::new(1, 0));
        assert_eq!(p.expected(), ExpectedOutcome::ShouldPass);
        assert_eq!(p.sample_name(), "example-1");
    }

    #[test]
    fn test_parse_uri() {
        let p = parse_sample_location(
            "file:///home/ci/test-data/ieee/heart-rate/2.1/shouldFail/negative-value.json",
        )
        .unwrap();
        assert_eq!(p.identity().to_string(), "ieee:heart-rate:2.1");
        assert_eq!(p.expected(), ExpectedOutcome::ShouldFail);
        assert_eq!(p.sample_name(), "negative-value");
    }

    #[test]
    fn test_parse_relative_path_without_prefix() {
        let p = parse_sample_location("omh/step-count/1.0/shouldPass/walk.json").unwrap();
        assert_eq!(p.identity().name(), "step-count");
    }

    #[test]
    fn test_parse_windows_separators() {
        let p = parse_sample_location(
            r"C:\corpus\omh\body-weight\1.0\shouldPass\adult.json",
        )
        .unwrap();
        assert_eq!(p.identity().to_string(), "omh:body-weight:1.0");
        assert_eq!(p.sample_name(), "adult");
    }

    #[test]
    fn test_parse_qualified_version() {
        let p = parse_sample_location("omh/step-count/1.0.RC1/shouldFail/x.json").unwrap();
        assert_eq!(p.identity().version().qualifier(), Some("RC1"));
    }

    #[test]
    fn test_relative_location_roundtrip() {
        let loc = "omh/blood-glucose/3.2/shouldFail/missing-unit.json";
        let p = parse_sample_location(&format!("/data/{loc}")).unwrap();
        assert_eq!(p.to_relative_location(), loc);
    }

    #[test]
    fn test_rejects_missing_segment() {
        assert!(parse_sample_location("blood-pressure/1.0/shouldPass/example.json").is_err());
        assert!(parse_sample_location("/omh/blood-pressure/shouldPass/example.json").is_err());
    }

    #[test]
    fn test_rejects_wrong_outcome_literal() {
        for outcome in ["shouldpass", "ShouldPass", "should-pass", "pass", "shouldSucceed"] {
            let loc = format!("/d/omh/blood-pressure/1.0/{outcome}/example.json");
            assert!(parse_sample_location(&loc).is_err(), "accepted {loc}");
        }
    }

    #[test]
    fn test_rejects_uppercase() {
        assert!(parse_sample_location("/d/OMH/blood-pressure/1.0/shouldPass/a.json").is_err());
        assert!(parse_sample_location("/d/omh/Blood-Pressure/1.0/shouldPass/a.json").is_err());
        assert!(parse_sample_location("/d/omh/blood-pressure/1.0/shouldPass/Example.json").is_err());
    }

    #[test]
    fn test_rejects_bad_version_and_extension() {
        let err = parse_sample_location("/d/omh/blood-pressure/latest/shouldPass/a.json")
            .unwrap_err();
        assert!(err.reason.contains("malformed version"));
        assert!(parse_sample_location("/d/omh/blood-pressure/1.0/shouldPass/a.yaml").is_err());
        assert!(parse_sample_location("/d/omh/blood-pressure/1.0/shouldPass/a.json.bak").is_err());
    }

    #[test]
    fn test_rejects_underscore_in_names() {
        assert!(parse_sample_location("/d/omh/blood_pressure/1.0/shouldPass/a.json").is_err());
    }

    #[test]
    fn test_error_carries_original_location() {
        let loc = r"C:\x\omh\bp\1.0\maybe\a.json";
        let err = parse_sample_location(loc).unwrap_err();
        assert_eq!(err.location, loc);
    }
}
