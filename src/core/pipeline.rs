//! The logging pipeline
//!
//! Turns host notifications and direct log calls into logstash lines and
//! writes them to the configured sink, one write per event.

use super::{
    ansi::strip_ansi,
    error::{Result, StasherError},
    event::LogEvent,
    formatter::EventFormatter,
    message::Message,
    scope::{CurrentScope, Fields, ScopeGuard},
    severity::Severity,
    sink::Sink,
    timestamp::TimestampFormat,
};
use crate::notifications::{
    extract::{
        extract_current_scope, extract_exception, extract_request, extract_runtimes,
        extract_sql, extract_status,
    },
    Notification, ParamFilter, RedirectPayload, RequestPayload, SqlPayload,
};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Source of event timestamps
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Adds application fields to the scope when a request starts
pub type CustomFieldsHook = Arc<dyn Fn(&mut Fields, &RequestPayload) + Send + Sync>;

thread_local! {
    static IN_SINK: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is inside a sink call
///
/// The sink lock is not reentrant, so the `log` bridge drops records raised
/// from inside a sink instead of waiting on it.
pub(crate) fn in_sink() -> bool {
    IN_SINK.with(Cell::get)
}

/// Marks the current thread as inside a sink call until dropped
struct SinkCall;

impl SinkCall {
    fn enter() -> Self {
        IN_SINK.with(|flag| flag.set(true));
        SinkCall
    }
}

impl Drop for SinkCall {
    fn drop(&mut self) {
        IN_SINK.with(|flag| flag.set(false));
    }
}

pub struct Pipeline {
    min_level: RwLock<Severity>,
    enabled: AtomicBool,
    sink: Mutex<Box<dyn Sink>>,
    formatter: EventFormatter,
    param_filter: ParamFilter,
    clock: Clock,
    custom_fields: Option<CustomFieldsHook>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn source(&self) -> &str {
        self.formatter.source()
    }

    pub fn formatter(&self) -> &EventFormatter {
        &self.formatter
    }

    pub fn param_filter(&self) -> &ParamFilter {
        &self.param_filter
    }

    pub fn min_level(&self) -> Severity {
        *self.min_level.read()
    }

    pub fn set_min_level(&self, level: Severity) {
        *self.min_level.write() = level;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Whether a direct log call at `severity` would be emitted
    pub fn is_enabled_for(&self, severity: Severity) -> bool {
        self.is_enabled() && severity >= self.min_level()
    }

    /// Log a text message or an error value
    ///
    /// Text is stripped of ANSI sequences and rendered as `@message` with
    /// `{severity}` in the fields. Errors are rendered into the `exception`
    /// field and tagged `exception`. Calls below the minimum level return
    /// `Ok(())` without building an event.
    pub fn log(&self, severity: Severity, message: impl Into<Message>) -> Result<()> {
        if !self.is_enabled_for(severity) {
            return Ok(());
        }
        self.emit_log(severity, message.into())
    }

    /// Like [`log`](Self::log) but only builds the message if it will be emitted
    pub fn log_with<M, F>(&self, severity: Severity, message: F) -> Result<()>
    where
        M: Into<Message>,
        F: FnOnce() -> M,
    {
        if !self.is_enabled_for(severity) {
            return Ok(());
        }
        self.emit_log(severity, message().into())
    }

    fn emit_log(&self, severity: Severity, message: Message) -> Result<()> {
        match message {
            Message::Error(report) => self.emit(
                &["log", severity.as_tag(), "exception"],
                None,
                report.to_fields(),
                |_| {},
            ),
            Message::Text(text) => self.emit(
                &["log", severity.as_tag()],
                Some(strip_ansi(&text).into_owned()),
                Fields::new().with_field("severity", severity.to_str()),
                |_| {},
            ),
        }
    }

    pub fn debug(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Severity::Debug, message)
    }

    pub fn info(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Severity::Info, message)
    }

    pub fn warn(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Severity::Warn, message)
    }

    pub fn error(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Severity::Error, message)
    }

    pub fn fatal(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Severity::Fatal, message)
    }

    pub fn unknown(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Severity::Unknown, message)
    }

    /// Emit an arbitrary event with the current scope merged in
    pub fn log_event(&self, tags: &[&str], fields: Fields) -> Result<()> {
        self.log_event_with(tags, fields, |_| {})
    }

    /// Emit an arbitrary event, letting `hook` adjust it before rendering
    pub fn log_event_with<F>(&self, tags: &[&str], fields: Fields, hook: F) -> Result<()>
    where
        F: FnOnce(&mut LogEvent),
    {
        if !self.is_enabled() {
            return Ok(());
        }
        self.emit(tags, None, fields, hook)
    }

    /// Route a host notification to its handler
    pub fn handle(&self, notification: &Notification) -> Result<()> {
        match notification {
            Notification::StartProcessing(payload) => self.start_processing(payload),
            Notification::ProcessAction { payload, duration } => {
                self.process_action(payload, *duration)
            }
            Notification::Sql(payload) => self.sql(payload),
            Notification::RedirectTo(payload) => {
                self.redirect_to(payload);
                Ok(())
            }
            Notification::Log { severity, message } => self.log(*severity, message.clone()),
            Notification::Other { .. } => Ok(()),
        }
    }

    /// Request began: `request` tag with the request fields
    pub fn start_processing(&self, payload: &RequestPayload) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        let fields = extract_request(payload, &self.param_filter);
        self.emit(&["request"], None, fields, |_| {})
    }

    /// Query executed: `sql` tag, unless the query is housekeeping noise
    pub fn sql(&self, payload: &SqlPayload) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        match extract_sql(payload) {
            Some(fields) => self.emit(&["sql"], None, fields, |_| {}),
            None => Ok(()),
        }
    }

    /// Redirect issued: remembered in the scope for the closing response line
    pub fn redirect_to(&self, payload: &RedirectPayload) {
        if !self.is_enabled() {
            return;
        }
        CurrentScope::set("location", payload.location.clone());
    }

    /// Request finished: `response` tag (plus `exception` if it raised)
    ///
    /// The current scope is cleared afterwards, even when the write fails.
    pub fn process_action(&self, payload: &RequestPayload, duration: Duration) -> Result<()> {
        let _unit_end = ScopeGuard::new();
        if !self.is_enabled() {
            return Ok(());
        }

        let mut fields = extract_request(payload, &self.param_filter);
        fields.merge(extract_status(payload));
        fields.merge(extract_runtimes(duration, payload));

        let exception = extract_exception(payload);
        let raised = !exception.is_empty();
        fields.merge(exception);

        let tags: &[&str] = if raised {
            &["response", "exception"]
        } else {
            &["response"]
        };
        self.emit(tags, None, fields, |_| {})
    }

    /// Start a request unit on the current thread
    ///
    /// Clears the scope, records the request id as `uuid`, runs the custom
    /// fields hook and returns a guard that clears the scope again on drop.
    #[must_use = "the scope is cleared as soon as the guard is dropped"]
    pub fn begin_request(&self, payload: &RequestPayload) -> ScopeGuard {
        let guard = CurrentScope::enter();
        let mut fields = Fields::new();
        if let Some(id) = &payload.request_id {
            fields.insert("uuid", id.clone());
        }
        CurrentScope::set_fields(fields);

        // The hook may log or read the scope, so it edits a detached copy.
        if let Some(hook) = &self.custom_fields {
            let mut custom = CurrentScope::fields();
            hook(&mut custom, payload);
            CurrentScope::with_mut(|scope| scope.merge(custom));
        }
        guard
    }

    /// Run `f` as one request unit (see [`begin_request`](Self::begin_request))
    pub fn process_request<T>(&self, payload: &RequestPayload, f: impl FnOnce() -> T) -> T {
        let _guard = self.begin_request(payload);
        f()
    }

    pub fn flush(&self) -> Result<()> {
        let mut sink = self.sink.lock();
        let _call = SinkCall::enter();
        sink.flush()
    }

    fn emit<F>(
        &self,
        tags: &[&str],
        message: Option<String>,
        mut fields: Fields,
        hook: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut LogEvent),
    {
        fields.merge(extract_current_scope());

        let line = self
            .formatter
            .format_with(tags, fields, (self.clock)(), |event| {
                event.message = message;
                hook(event);
            })?;

        let mut sink = self.sink.lock();
        let _call = SinkCall::enter();
        sink.write(&format!("{}\n", line))
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("source", &self.source())
            .field("min_level", &self.min_level())
            .field("enabled", &self.is_enabled())
            .field("sink", &self.sink.lock().name())
            .finish()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        let _ = self.sink.get_mut().flush();
    }
}

/// Builder for a [`Pipeline`]
///
/// # Example
///
/// ```
/// use stasher::prelude::*;
///
/// let sink = MemorySink::new();
/// let pipeline = Pipeline::builder()
///     .source("rails://web-1/shop")
///     .min_level(Severity::Info)
///     .sink(sink.clone())
///     .build()
///     .unwrap();
///
/// pipeline.info("Server started").unwrap();
/// assert_eq!(sink.lines().len(), 1);
/// ```
pub struct PipelineBuilder {
    source: Option<String>,
    sink: Option<Box<dyn Sink>>,
    min_level: Severity,
    enabled: bool,
    param_filter: ParamFilter,
    timestamp_format: TimestampFormat,
    clock: Option<Clock>,
    custom_fields: Option<CustomFieldsHook>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            sink: None,
            min_level: Severity::default(),
            enabled: true,
            param_filter: ParamFilter::default(),
            timestamp_format: TimestampFormat::default(),
            clock: None,
            custom_fields: None,
        }
    }

    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    #[must_use]
    pub fn boxed_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn min_level(mut self, level: Severity) -> Self {
        self.min_level = level;
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn filter_parameters<I, S>(mut self, denylist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.param_filter = ParamFilter::new(denylist);
        self
    }

    #[must_use]
    pub fn timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    /// Override the timestamp source, e.g. with a fixed instant in tests
    #[must_use]
    pub fn clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Some(Arc::new(clock));
        self
    }

    #[must_use]
    pub fn custom_fields<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Fields, &RequestPayload) + Send + Sync + 'static,
    {
        self.custom_fields = Some(Arc::new(hook));
        self
    }

    /// Fails if no sink was given or the source is empty
    pub fn build(self) -> Result<Pipeline> {
        let sink = self
            .sink
            .ok_or_else(|| StasherError::config("pipeline", "no sink configured"))?;

        let source = self
            .source
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| StasherError::config("pipeline", "source must not be empty"))?;

        let clock: Clock = match self.clock {
            Some(clock) => clock,
            None => Arc::new(Utc::now),
        };

        Ok(Pipeline {
            min_level: RwLock::new(self.min_level),
            enabled: AtomicBool::new(self.enabled),
            sink: Mutex::new(sink),
            formatter: EventFormatter::new(source).with_timestamp_format(self.timestamp_format),
            param_filter: self.param_filter,
            clock,
            custom_fields: self.custom_fields,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
