//! Rendering of events into logstash JSON lines

use super::error::Result;
use super::event::LogEvent;
use super::scope::Fields;
use super::timestamp::TimestampFormat;
use chrono::{DateTime, Utc};

/// Assembles `@source`, tags, fields and timestamp into the canonical line
///
/// Rendering is pure: the caller writes the result to a sink and appends the
/// line terminator.
#[derive(Debug, Clone)]
pub struct EventFormatter {
    source: String,
    timestamp_format: TimestampFormat,
}

impl EventFormatter {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            timestamp_format: TimestampFormat::default(),
        }
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn timestamp_format(&self) -> &TimestampFormat {
        &self.timestamp_format
    }

    /// Build the event without rendering it
    pub fn event(&self, tags: &[&str], fields: Fields, timestamp: DateTime<Utc>) -> LogEvent {
        LogEvent::new(
            self.source.clone(),
            tags.iter().map(|t| t.to_string()).collect(),
            fields,
        )
        .with_timestamp(timestamp)
    }

    pub fn render(&self, event: &LogEvent) -> Result<String> {
        event.to_json(&self.timestamp_format)
    }

    pub fn format(&self, tags: &[&str], fields: Fields, timestamp: DateTime<Utc>) -> Result<String> {
        self.render(&self.event(tags, fields, timestamp))
    }

    /// Like [`format`](Self::format), but lets `hook` adjust the assembled
    /// event before it is serialized.
    pub fn format_with<F>(
        &self,
        tags: &[&str],
        fields: Fields,
        timestamp: DateTime<Utc>,
        hook: F,
    ) -> Result<String>
    where
        F: FnOnce(&mut LogEvent),
    {
        let mut event = self.event(tags, fields, timestamp);
        hook(&mut event);
        self.render(&event)
    }
}
