use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Wire format for all repository timestamps.
pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// A UTC instant with millisecond precision.
///
/// Every timestamp the repository creates is truncated to milliseconds so
/// that it survives a round trip through the wire format unchanged.
/// Ordering is chronological.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current instant, truncated to milliseconds.
    pub fn now() -> Self {
        Self::from_millis(Utc::now().timestamp_millis())
    }

    /// Build from milliseconds since the UNIX epoch. Out-of-range values
    /// clamp to the epoch.
    pub fn from_millis(millis: i64) -> Self {
        Self(DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self::from_millis(dt.timestamp_millis())
    }

    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// The current instant, or one millisecond after `prev` if the clock has
    /// not moved past it. Used to keep version dates strictly increasing.
    pub fn now_after(prev: Option<Timestamp>) -> Self {
        let now = Self::now();
        match prev {
            Some(p) if now <= p => Self::from_millis(p.as_millis() + 1),
            _ => now,
        }
    }

    /// Parse a timestamp. Accepts RFC 3339, the wire format, a zone-less
    /// date-time (read as UTC), and a bare date (midnight UTC).
    pub fn parse(value: &str) -> Result<Self, TypeError> {
        let value = value.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Ok(Self::from_datetime(dt.with_timezone(&Utc)));
        }
        let zoneless = value.strip_suffix('Z').unwrap_or(value);
        if let Ok(naive) = NaiveDateTime::parse_from_str(zoneless, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(Self::from_datetime(Utc.from_utc_datetime(&naive)));
        }
        if let Ok(date) = NaiveDate::parse_from_str(zoneless, "%Y-%m-%d") {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Ok(Self::from_datetime(Utc.from_utc_datetime(&naive)));
            }
        }
        Err(TypeError::InvalidDate(value.to_string()))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({self})")
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(WIRE_FORMAT))
    }
}

impl FromStr for Timestamp {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_roundtrip() {
        let ts = Timestamp::parse("2005-01-01T12:30:45.123Z").unwrap();
        assert_eq!(ts.to_string(), "2005-01-01T12:30:45.123Z");
        assert_eq!(Timestamp::parse(&ts.to_string()).unwrap(), ts);
    }

    #[test]
    fn lenient_forms() {
        let a = Timestamp::parse("2005-01-01T00:00:00Z").unwrap();
        let b = Timestamp::parse("2005-01-01T00:00:00").unwrap();
        let c = Timestamp::parse("2005-01-01").unwrap();
        let d = Timestamp::parse("2005-01-01T01:00:00+01:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, d);
    }

    #[test]
    fn truncates_to_millis() {
        let ts = Timestamp::parse("2005-01-01T00:00:00.123456Z").unwrap();
        assert_eq!(ts.to_string(), "2005-01-01T00:00:00.123Z");
    }

    #[test]
    fn rejects_garbage() {
        assert!(Timestamp::parse("yesterday").is_err());
    }

    #[test]
    fn now_after_is_strictly_later() {
        let future = Timestamp::from_millis(Timestamp::now().as_millis() + 60_000);
        let next = Timestamp::now_after(Some(future));
        assert!(next > future);
        assert_eq!(next.as_millis(), future.as_millis() + 1);
    }

    #[test]
    fn ordering_is_chronological() {
        assert!(Timestamp::from_millis(1) < Timestamp::from_millis(2));
    }
}
