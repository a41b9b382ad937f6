//! Logstash event model

use super::error::Result;
use super::scope::Fields;
use super::timestamp::TimestampFormat;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Value of the `@version` key
pub const SCHEMA_VERSION: &str = "1";

/// One emission, assembled right before it is rendered
///
/// Hooks passed to [`EventFormatter::format_with`](super::EventFormatter::format_with)
/// receive a mutable reference and may add tags or fields.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub source: String,
    pub tags: Vec<String>,
    /// Free-text message, rendered as `@message` when present
    pub message: Option<String>,
    pub fields: Fields,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct WireEvent<'a> {
    #[serde(rename = "@source")]
    source: &'a str,
    tags: &'a [String],
    #[serde(rename = "@message", skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(rename = "@fields")]
    fields: &'a Fields,
    #[serde(rename = "@timestamp")]
    timestamp: String,
    #[serde(rename = "@version")]
    version: &'static str,
}

impl LogEvent {
    pub fn new(source: impl Into<String>, tags: Vec<String>, fields: Fields) -> Self {
        Self {
            source: source.into(),
            tags,
            message: None,
            fields,
            timestamp: Utc::now(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Serialize to a single-line JSON object
    ///
    /// Key order is fixed: `@source`, `tags`, `@message` (if any), `@fields`,
    /// `@timestamp`, `@version`.
    pub fn to_json(&self, timestamp_format: &TimestampFormat) -> Result<String> {
        let wire = WireEvent {
            source: &self.source,
            tags: &self.tags,
            message: self.message.as_deref(),
            fields: &self.fields,
            timestamp: timestamp_format.format(&self.timestamp),
            version: SCHEMA_VERSION,
        };
        Ok(serde_json::to_string(&wire)?)
    }
}
