//! Field extractors
//!
//! One pure function per event category. Extractors tolerate missing
//! payload values: request keys are always present (as `null` when unknown)
//! so every line of a category carries the same schema.

use super::{RequestPayload, SqlPayload};
use crate::core::{CurrentScope, Fields};
use serde_json::{json, Value};
use std::time::Duration;

/// Query names that are housekeeping noise and never logged
pub const IGNORED_SQL_NAMES: [&str; 3] = ["", "SCHEMA", "ActiveRecord::SessionStore"];

/// Parameter keys removed from request params by default
pub const DEFAULT_FILTER_PARAMETERS: [&str; 2] = ["password", "password_confirmation"];

/// Removes denylisted keys from request params
///
/// Matching keys are dropped entirely at every nesting level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamFilter {
    denylist: Vec<String>,
}

impl ParamFilter {
    pub fn new<I, S>(denylist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            denylist: denylist.into_iter().map(Into::into).collect(),
        }
    }

    pub fn denylist(&self) -> &[String] {
        &self.denylist
    }

    pub fn is_filtered(&self, key: &str) -> bool {
        self.denylist.iter().any(|denied| denied == key)
    }

    pub fn filter(&self, params: &Fields) -> Fields {
        params
            .iter()
            .filter(|(key, _)| !self.is_filtered(key))
            .map(|(key, value)| (key.clone(), self.filter_value(value)))
            .collect()
    }

    fn filter_value(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .filter(|(key, _)| !self.is_filtered(key))
                    .map(|(key, value)| (key.clone(), self.filter_value(value)))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.filter_value(v)).collect()),
            other => other.clone(),
        }
    }
}

impl Default for ParamFilter {
    fn default() -> Self {
        Self::new(DEFAULT_FILTER_PARAMETERS)
    }
}

/// Round seconds to microsecond precision
pub fn round_seconds(seconds: f64) -> f64 {
    (seconds * 1_000_000.0).round() / 1_000_000.0
}

fn duration_seconds(duration: Duration) -> f64 {
    round_seconds(duration.as_secs_f64())
}

fn millis_to_seconds(millis: Option<f64>) -> f64 {
    millis.map_or(0.0, |ms| round_seconds(ms / 1000.0))
}

/// Client address: first `X-Forwarded-For` hop, else the peer address
pub fn client_ip(payload: &RequestPayload) -> Option<String> {
    payload
        .forwarded_for
        .as_deref()
        .and_then(|header| header.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| payload.remote_ip.clone())
}

/// `{method, ip, params, path, format, controller, action}`
pub fn extract_request(payload: &RequestPayload, filter: &ParamFilter) -> Fields {
    Fields::new()
        .with_field("method", payload.method.clone())
        .with_field("ip", client_ip(payload))
        .with_field("params", filter.filter(&payload.params))
        .with_field("path", payload.path.clone())
        .with_field("format", payload.format.clone())
        .with_field("controller", payload.controller.clone())
        .with_field("action", payload.action.clone())
}

pub fn extract_status(payload: &RequestPayload) -> Fields {
    Fields::new().with_field("status", payload.status)
}

/// `{duration, view, db}` in seconds; absent runtimes are `0.0`
pub fn extract_runtimes(duration: Duration, payload: &RequestPayload) -> Fields {
    Fields::new()
        .with_field("duration", duration_seconds(duration))
        .with_field("view", millis_to_seconds(payload.view_runtime))
        .with_field("db", millis_to_seconds(payload.db_runtime))
}

/// `{exception: {...}}` when the request raised, otherwise empty
pub fn extract_exception(payload: &RequestPayload) -> Fields {
    payload
        .exception
        .as_ref()
        .map(|e| format_exception(&e.name, &e.message, &e.backtrace))
        .unwrap_or_default()
}

/// `{name, sql, duration}`, or `None` when the query must not be logged
pub fn extract_sql(payload: &SqlPayload) -> Option<Fields> {
    if IGNORED_SQL_NAMES.contains(&payload.name.as_str()) {
        return None;
    }

    Some(
        Fields::new()
            .with_field("name", payload.name.clone())
            .with_field("sql", payload.sql.clone())
            .with_field("duration", duration_seconds(payload.duration)),
    )
}

pub fn extract_current_scope() -> Fields {
    CurrentScope::fields()
}

/// Backtrace lines are joined with `\n`; an empty backtrace renders as `null`.
pub fn format_exception(name: &str, message: &str, backtrace: &[String]) -> Fields {
    let backtrace = if backtrace.is_empty() {
        Value::Null
    } else {
        Value::String(backtrace.join("\n"))
    };

    Fields::new().with_field(
        "exception",
        json!({
            "name": name,
            "message": message,
            "backtrace": backtrace,
        }),
    )
}
