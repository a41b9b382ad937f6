//! Level-gated logger that forwards into the pipeline
//!
//! This is the logger handed to the host application in place of its own.
//! It filters by its own level before doing any work, runs text through the
//! host-style message formatter, and passes error values through untouched.

use super::{
    error::{Result, StasherError},
    message::Message,
    pipeline::{in_sink, Pipeline},
    severity::Severity,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Formats a text message: `(severity, time, progname, message) -> line`
pub type MessageFormatter =
    Arc<dyn Fn(Severity, DateTime<Utc>, Option<&str>, &str) -> String + Send + Sync>;

pub struct SeverityLogger {
    pipeline: Arc<Pipeline>,
    level: RwLock<Severity>,
    progname: Option<String>,
    formatter: Option<MessageFormatter>,
}

impl SeverityLogger {
    /// Create a logger using the pipeline's current level
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        let level = pipeline.min_level();
        Self {
            pipeline,
            level: RwLock::new(level),
            progname: None,
            formatter: None,
        }
    }

    #[must_use]
    pub fn with_level(self, level: Severity) -> Self {
        *self.level.write() = level;
        self
    }

    #[must_use]
    pub fn with_progname(mut self, progname: impl Into<String>) -> Self {
        self.progname = Some(progname.into());
        self
    }

    #[must_use]
    pub fn with_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(Severity, DateTime<Utc>, Option<&str>, &str) -> String + Send + Sync + 'static,
    {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    pub fn level(&self) -> Severity {
        *self.level.read()
    }

    pub fn set_level(&self, level: Severity) {
        *self.level.write() = level;
    }

    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.level()
    }

    /// Log `message` at `severity`
    ///
    /// A missing message falls back to the progname. Always reports `true`,
    /// including for filtered calls; only a sink failure is an error.
    pub fn add<M: Into<Message>>(&self, severity: Severity, message: Option<M>) -> Result<bool> {
        if !self.enabled(severity) {
            return Ok(true);
        }

        let message = match message {
            Some(message) => message.into(),
            None => Message::Text(self.progname.clone().unwrap_or_default()),
        };
        self.dispatch(severity, message)
    }

    /// Log the value returned by `message`, which only runs if `severity` passes
    pub fn add_with<M, F>(&self, severity: Severity, message: F) -> Result<bool>
    where
        M: Into<Message>,
        F: FnOnce() -> M,
    {
        if !self.enabled(severity) {
            return Ok(true);
        }
        self.dispatch(severity, message().into())
    }

    pub fn debug(&self, message: impl Into<Message>) -> Result<bool> {
        self.add(Severity::Debug, Some(message))
    }

    pub fn info(&self, message: impl Into<Message>) -> Result<bool> {
        self.add(Severity::Info, Some(message))
    }

    pub fn warn(&self, message: impl Into<Message>) -> Result<bool> {
        self.add(Severity::Warn, Some(message))
    }

    pub fn error(&self, message: impl Into<Message>) -> Result<bool> {
        self.add(Severity::Error, Some(message))
    }

    pub fn fatal(&self, message: impl Into<Message>) -> Result<bool> {
        self.add(Severity::Fatal, Some(message))
    }

    pub fn unknown(&self, message: impl Into<Message>) -> Result<bool> {
        self.add(Severity::Unknown, Some(message))
    }

    fn format_message(&self, severity: Severity, text: &str) -> String {
        match &self.formatter {
            Some(formatter) => formatter(severity, Utc::now(), self.progname.as_deref(), text),
            None => text.to_string(),
        }
    }

    fn dispatch(&self, severity: Severity, message: Message) -> Result<bool> {
        let message = match message {
            Message::Text(text) => Message::Text(self.format_message(severity, &text)),
            error => error,
        };
        self.pipeline.log(severity, message)?;
        Ok(true)
    }

    /// Install this logger as the process-wide `log` crate logger
    ///
    /// Can succeed once per process.
    pub fn install(self) -> Result<()> {
        let max_level = level_filter(self.level());
        log::set_boxed_logger(Box::new(self)).map_err(|_| StasherError::HostLoggerInstalled)?;
        log::set_max_level(max_level);
        Ok(())
    }
}

fn level_filter(level: Severity) -> log::LevelFilter {
    match level {
        Severity::Debug => log::LevelFilter::Trace,
        Severity::Info => log::LevelFilter::Info,
        Severity::Warn => log::LevelFilter::Warn,
        Severity::Error | Severity::Fatal | Severity::Unknown => log::LevelFilter::Error,
    }
}

impl fmt::Debug for SeverityLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeverityLogger")
            .field("level", &self.level())
            .field("progname", &self.progname)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl log::Log for SeverityLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        SeverityLogger::enabled(self, metadata.level().into())
    }

    fn log(&self, record: &log::Record<'_>) {
        let severity = Severity::from(record.level());
        if !SeverityLogger::enabled(self, severity) || in_sink() {
            return;
        }

        if let Err(e) = self.dispatch(severity, Message::Text(record.args().to_string())) {
            eprintln!("[STASHER ERROR] Failed to write host log record: {}", e);
        }
    }

    fn flush(&self) {
        if in_sink() {
            return;
        }
        if let Err(e) = self.pipeline.flush() {
            eprintln!("[STASHER ERROR] Flush failed: {}", e);
        }
    }
}
