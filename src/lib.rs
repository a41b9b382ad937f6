//! # Stasher
//!
//! Structured-event logging pipeline for request-driven applications.
//!
//! Host lifecycle notifications (request started, request finished, query
//! executed, redirect issued) and direct log calls are normalized into one
//! flat field set, merged with per-request scope fields, and written as
//! one-line logstash JSON:
//!
//! ```text
//! {"@source":"rails://web-1/shop","tags":["request"],"@fields":{...},"@timestamp":"2014-01-01T00:00:00.000Z","@version":"1"}
//! ```
//!
//! ## Features
//!
//! - **Exactly once**: the host's default log subscribers are detached so
//!   each event produces a single line
//! - **Request scope**: thread-local fields merged into every line of a request
//! - **Severity filtering**: messages below the level are never formatted
//! - **Pluggable sinks**: console, file, in-memory, or your own

pub mod config;
pub mod core;
pub mod macros;
pub mod notifications;
pub mod setup;
pub mod sinks;

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::core::{
        CurrentScope, ErrorReport, EventFormatter, Fields, LogEvent, Message, Pipeline,
        PipelineBuilder, Result, ScopeGuard, Severity, SeverityLogger, Sink, StasherError,
        TimestampFormat,
    };
    pub use crate::notifications::{
        InMemoryBus, Notification, NotificationBus, RedirectPayload, RequestPayload, SqlPayload,
        SubscriptionManager,
    };
    pub use crate::setup::setup;
    pub use crate::sinks::MemorySink;
    #[cfg(feature = "console")]
    pub use crate::sinks::ConsoleSink;
    #[cfg(feature = "file")]
    pub use crate::sinks::FileSink;
}

pub use crate::config::Config;
pub use crate::core::{
    CurrentScope, ErrorReport, EventFormatter, Fields, LogEvent, Message, Pipeline,
    PipelineBuilder, Result, ScopeGuard, Severity, SeverityLogger, Sink, StasherError,
    TimestampFormat,
};
pub use crate::notifications::{InMemoryBus, Notification, NotificationBus, SubscriptionManager};
pub use crate::setup::setup;
