//! # Temporal Types — Offset-Preserving RFC 3339 Timestamps
//!
//! Defines `OffsetTimestamp`, the date-time type used wherever this
//! workspace writes a timestamp into a JSON document.
//!
//! ## Format Invariant
//!
//! JSON Schema `date-time` format checks reject truncated timestamps, so the
//! rendered form is always
//!
//! ```text
//! YYYY-MM-DDTHH:MM:SS[.fff|.ffffff|.fffffffff](Z|±HH:MM)
//! ```
//!
//! - The seconds field is always present, even when seconds and nanoseconds
//!   are both zero: `2013-02-05T07:35:00Z`, never `2013-02-05T07:35Z`.
//! - Sub-second digits appear only when non-zero, in groups of three.
//! - A zero offset renders as `Z`.
//!
//! ## Offset Invariant
//!
//! Parsing keeps the offset found in the input. Nothing here converts to the
//! local time zone, so a document loaded and written back keeps its wall
//! clock and offset.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An RFC 3339 timestamp that remembers its UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OffsetTimestamp(DateTime<FixedOffset>);

impl OffsetTimestamp {
    /// The current instant, in UTC.
    pub fn now_utc() -> Self {
        Self(Utc::now().fixed_offset())
    }

    /// Wrap an existing offset date-time.
    pub fn from_datetime(dt: DateTime<FixedOffset>) -> Self {
        Self(dt)
    }

    /// Parse an RFC 3339 string, preserving its offset.
    ///
    /// # Errors
    ///
    /// Returns the underlying `chrono` parse error for anything that is not
    /// a complete RFC 3339 date-time.
    pub fn parse(s: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s).map(Self)
    }

    /// Access the inner `DateTime<FixedOffset>`.
    pub fn as_datetime(&self) -> &DateTime<FixedOffset> {
        &self.0
    }

    /// Render in the format described in the module documentation.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

impl std::fmt::Display for OffsetTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for OffsetTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for OffsetTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn utc(h: u32, m: u32, s: u32, nanos: u32) -> OffsetTimestamp {
        let dt = Utc
            .with_ymd_and_hms(2013, 2, 5, h, m, s)
            .unwrap()
            .with_nanosecond(nanos)
            .unwrap();
        OffsetTimestamp::from_datetime(dt.fixed_offset())
    }

    #[test]
    fn test_nonzero_seconds() {
        let ts = utc(7, 35, 12, 0);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "\"2013-02-05T07:35:12Z\"");
    }

    #[test]
    fn test_zero_seconds_still_rendered() {
        let ts = utc(7, 35, 0, 0);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "\"2013-02-05T07:35:00Z\"");
    }

    #[test]
    fn test_millis_with_zero_seconds() {
        let ts = utc(7, 35, 0, 123_000_000);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "\"2013-02-05T07:35:00.123Z\"");
    }

    #[test]
    fn test_micro_and_nano_groups() {
        assert_eq!(utc(7, 35, 0, 123_456_000).to_rfc3339(), "2013-02-05T07:35:00.123456Z");
        assert_eq!(utc(7, 35, 0, 1).to_rfc3339(), "2013-02-05T07:35:00.000000001Z");
    }

    #[test]
    fn test_midnight() {
        assert_eq!(utc(0, 0, 0, 0).to_rfc3339(), "2013-02-05T00:00:00Z");
    }

    #[test]
    fn test_parse_preserves_offset() {
        let ts = OffsetTimestamp::parse("2013-02-05T07:35:00+05:30").unwrap();
        assert_eq!(ts.as_datetime().offset().local_minus_utc(), 5 * 3600 + 30 * 60);
        assert_eq!(ts.as_datetime().hour(), 7);
        assert_eq!(ts.to_rfc3339(), "2013-02-05T07:35:00+05:30");
    }

    #[test]
    fn test_parse_negative_offset() {
        let ts = OffsetTimestamp::parse("2013-02-05T07:35:00.5-04:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2013-02-05T07:35:00.500-04:00");
    }

    #[test]
    fn test_parse_rejects_truncated() {
        assert!(OffsetTimestamp::parse("2013-02-05T07:35Z").is_err());
        assert!(OffsetTimestamp::parse("2013-02-05").is_err());
        assert!(OffsetTimestamp::parse("").is_err());
    }

    #[test]
    fn test_serde_roundtrip_keeps_offset() {
        let json = "\"2020-06-30T23:59:59+02:00\"";
        let ts: OffsetTimestamp = serde_json::from_str(json).unwrap();
        assert_eq!(serde_json::to_string(&ts).unwrap(), json);
    }

    #[test]
    fn test_now_is_utc() {
        let ts = OffsetTimestamp::now_utc();
        assert_eq!(ts.as_datetime().offset().local_minus_utc(), 0);
        assert!(ts.to_rfc3339().ends_with('Z'));
    }
}
