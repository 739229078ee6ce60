use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Naive layouts accepted after RFC 3339, all interpreted as UTC.
/// The space-separated forms are what the message store emits.
const NAIVE_FORMATS: &[&str] =
    &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];

/// A message timestamp as delivered by the transport.
///
/// The raw text is kept verbatim so it can be echoed back as a pagination
/// cursor in the source's own encoding. Ordering is only defined between
/// timestamps that parse; an unparsable timestamp still round-trips but never
/// takes part in comparisons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<RawTimestamp>", into = "String")]
pub struct Timestamp {
    raw: String,
    instant: Option<DateTime<Utc>>,
}

impl Timestamp {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let instant = parse_instant(&raw).ok();
        Self { raw, instant }
    }

    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        Self { raw: instant.to_rfc3339(), instant: Some(instant) }
    }

    pub fn from_millis(millis: i64) -> Self {
        let instant = Utc.timestamp_millis_opt(millis).single();
        Self { raw: millis.to_string(), instant }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.instant
    }

    /// Whether this timestamp can be ordered against other timestamps.
    pub fn is_comparable(&self) -> bool {
        self.instant.is_some()
    }

    /// Chronological comparison. `None` when either side failed to parse.
    pub fn compare(&self, other: &Timestamp) -> Option<Ordering> {
        match (self.instant, other.instant) {
            (Some(lhs), Some(rhs)) => Some(lhs.cmp(&rhs)),
            _ => None,
        }
    }

    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.compare(other) == Some(Ordering::Less)
    }

    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.compare(other) == Some(Ordering::Greater)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for Timestamp {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Timestamp {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<Timestamp> for String {
    fn from(value: Timestamp) -> Self {
        value.raw
    }
}

/// Wire forms a timestamp may arrive in: text, or epoch milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(i64),
    Text(String),
}

impl From<Option<RawTimestamp>> for Timestamp {
    fn from(value: Option<RawTimestamp>) -> Self {
        match value {
            Some(RawTimestamp::Millis(millis)) => Self::from_millis(millis),
            Some(RawTimestamp::Text(raw)) => Self::new(raw),
            None => Self::default(),
        }
    }
}

/// Parse a raw timestamp into a UTC instant.
///
/// Accepts RFC 3339, naive ISO 8601 (`T` or space separated, optional
/// fractional seconds), and digit-only epoch milliseconds.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TimestampError::Empty);
    }

    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let millis: i64 =
            trimmed.parse().map_err(|_| TimestampError::Unrecognized(trimmed.to_string()))?;
        return Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or(TimestampError::MillisOutOfRange(millis));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TimestampError::Unrecognized(trimmed.to_string()))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    #[error("timestamp is empty")]
    Empty,
    #[error("epoch milliseconds out of range: {0}")]
    MillisOutOfRange(i64),
    #[error("unrecognized timestamp `{0}`")]
    Unrecognized(String),
}
