//! Core pipeline types and traits

pub mod ansi;
pub mod error;
pub mod event;
pub mod formatter;
pub mod message;
pub mod pipeline;
pub mod scope;
pub mod severity;
pub mod severity_logger;
pub mod sink;
pub mod timestamp;

pub use ansi::strip_ansi;
pub use error::{Result, StasherError};
pub use event::{LogEvent, SCHEMA_VERSION};
pub use formatter::EventFormatter;
pub use message::{ErrorReport, Message};
pub use pipeline::{Clock, CustomFieldsHook, Pipeline, PipelineBuilder};
pub use scope::{CurrentScope, Fields, ScopeGuard};
pub use severity::Severity;
pub use severity_logger::{MessageFormatter, SeverityLogger};
pub use sink::Sink;
pub use timestamp::TimestampFormat;
