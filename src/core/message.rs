//! Inputs accepted by the logging calls

use super::scope::Fields;
use crate::notifications::extract::format_exception;
use std::fmt;

/// Error value logged in place of a text message
///
/// Rendered into the `exception` field instead of `@message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub name: String,
    pub message: String,
    pub backtrace: Vec<String>,
}

impl ErrorReport {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            backtrace: Vec::new(),
        }
    }

    pub fn with_backtrace<I, S>(mut self, backtrace: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.backtrace = backtrace.into_iter().map(Into::into).collect();
        self
    }

    /// Capture a Rust error: its type path becomes the name and its
    /// `source()` chain becomes the backtrace.
    pub fn from_error<E: std::error::Error>(err: &E) -> Self {
        let mut backtrace = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            backtrace.push(cause.to_string());
            source = cause.source();
        }

        Self {
            name: std::any::type_name::<E>().to_string(),
            message: err.to_string(),
            backtrace,
        }
    }

    /// `{exception: {name, message, backtrace}}`
    pub fn to_fields(&self) -> Fields {
        format_exception(&self.name, &self.message, &self.backtrace)
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

/// A log message: either text or an error value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Error(ErrorReport),
}

impl Message {
    pub fn is_error(&self) -> bool {
        matches!(self, Message::Error(_))
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::Text(s)
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message::Text(s.to_string())
    }
}

impl From<&String> for Message {
    fn from(s: &String) -> Self {
        Message::Text(s.clone())
    }
}

impl From<ErrorReport> for Message {
    fn from(report: ErrorReport) -> Self {
        Message::Error(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "could not load user")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_report_fields() {
        let report = ErrorReport::new("Exception", "Message").with_backtrace(["first", "second"]);

        let value = serde_json::to_value(report.to_fields()).unwrap();
        assert_eq!(
            value,
            json!({ "exception": { "name": "Exception", "message": "Message", "backtrace": "first\nsecond" } })
        );
    }

    #[test]
    fn test_from_error_walks_source_chain() {
        let err = Outer(std::io::Error::new(std::io::ErrorKind::NotFound, "no such row"));
        let report = ErrorReport::from_error(&err);

        assert!(report.name.ends_with("Outer"));
        assert_eq!(report.message, "could not load user");
        assert_eq!(report.backtrace, vec!["no such row".to_string()]);
    }

    #[test]
    fn test_message_conversions() {
        assert_eq!(Message::from("hi"), Message::Text("hi".to_string()));
        assert!(Message::from(ErrorReport::new("E", "m")).is_error());
    }
}
