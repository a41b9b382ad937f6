//! `@timestamp` rendering
//!
//! Logstash wants a string timestamp in UTC. The default reproduces the
//! host's JSON time encoding, `2014-01-01T00:00:00.000Z`, so lines written by
//! this crate sort and parse the same as lines the host used to write.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// How `@timestamp` is written
///
/// In configuration files the variants are spelled `"iso8601"`,
/// `"iso8601_micros"`, `"rfc3339"` and `{"custom": "<strftime>"}`.
///
/// ```
/// use stasher::core::TimestampFormat;
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.with_ymd_and_hms(2014, 1, 1, 0, 0, 0).unwrap();
/// assert_eq!(TimestampFormat::Iso8601.format(&at), "2014-01-01T00:00:00.000Z");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampFormat {
    /// Milliseconds with a `Z` suffix
    #[default]
    Iso8601,
    /// Microseconds with a `Z` suffix
    Iso8601Micros,
    /// Milliseconds with a `+00:00` offset
    Rfc3339,
    /// Any strftime pattern, rendered in UTC
    Custom(String),
}

impl TimestampFormat {
    #[must_use]
    pub fn format(&self, at: &DateTime<Utc>) -> String {
        match self {
            TimestampFormat::Iso8601 => at.to_rfc3339_opts(SecondsFormat::Millis, true),
            TimestampFormat::Iso8601Micros => at.to_rfc3339_opts(SecondsFormat::Micros, true),
            TimestampFormat::Rfc3339 => at.to_rfc3339_opts(SecondsFormat::Millis, false),
            TimestampFormat::Custom(pattern) => at.format(pattern).to_string(),
        }
    }
}
