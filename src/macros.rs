//! Logging macros with deferred formatting.
//!
//! The format arguments are only evaluated when the pipeline would emit at
//! the given severity, so filtered calls cost a level comparison. Each macro
//! evaluates to `stasher::Result<()>`.
//!
//! # Examples
//!
//! ```
//! use stasher::prelude::*;
//! use stasher::warn;
//!
//! let pipeline = Pipeline::builder()
//!     .source("rails://web-1/shop")
//!     .sink(MemorySink::new())
//!     .build()
//!     .unwrap();
//!
//! let attempt = 3;
//! warn!(pipeline, "Retry attempt {} of {}", attempt, 5).unwrap();
//! ```

/// Log a formatted message at the given severity.
///
/// # Examples
///
/// ```
/// # use stasher::prelude::*;
/// # let pipeline = Pipeline::builder().source("s").sink(MemorySink::new()).build().unwrap();
/// use stasher::log;
/// log!(pipeline, Severity::Error, "Error code: {}", 500).unwrap();
/// ```
#[macro_export]
macro_rules! log {
    ($pipeline:expr, $level:expr, $($arg:tt)+) => {{
        let pipeline = &$pipeline;
        let level = $level;
        if pipeline.is_enabled_for(level) {
            pipeline.log(level, format!($($arg)+))
        } else {
            ::std::result::Result::Ok(())
        }
    }};
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($pipeline:expr, $($arg:tt)+) => {
        $crate::log!($pipeline, $crate::Severity::Debug, $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use stasher::prelude::*;
/// # let pipeline = Pipeline::builder().source("s").sink(MemorySink::new()).build().unwrap();
/// use stasher::info;
/// info!(pipeline, "Processing {} items", 100).unwrap();
/// ```
#[macro_export]
macro_rules! info {
    ($pipeline:expr, $($arg:tt)+) => {
        $crate::log!($pipeline, $crate::Severity::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($pipeline:expr, $($arg:tt)+) => {
        $crate::log!($pipeline, $crate::Severity::Warn, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($pipeline:expr, $($arg:tt)+) => {
        $crate::log!($pipeline, $crate::Severity::Error, $($arg)+)
    };
}

/// Log a fatal-level message.
#[macro_export]
macro_rules! fatal {
    ($pipeline:expr, $($arg:tt)+) => {
        $crate::log!($pipeline, $crate::Severity::Fatal, $($arg)+)
    };
}

/// Log a message of unknown severity; passes every level filter.
#[macro_export]
macro_rules! unknown {
    ($pipeline:expr, $($arg:tt)+) => {
        $crate::log!($pipeline, $crate::Severity::Unknown, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{Pipeline, Severity};
    use crate::sinks::MemorySink;
    use std::cell::Cell;
    use std::fmt;

    fn pipeline() -> (Pipeline, MemorySink) {
        let sink = MemorySink::new();
        let pipeline = Pipeline::builder()
            .source("source")
            .sink(sink.clone())
            .build()
            .expect("valid pipeline");
        (pipeline, sink)
    }

    struct Counted<'a>(&'a Cell<usize>);

    impl fmt::Display for Counted<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            self.0.set(self.0.get() + 1);
            write!(f, "counted")
        }
    }

    #[test]
    fn test_log_macro() {
        let (pipeline, sink) = pipeline();
        log!(pipeline, Severity::Error, "Formatted: {}", 42).unwrap();
        assert!(sink.lines()[0].contains(r#""@message":"Formatted: 42""#));
    }

    #[test]
    fn test_filtered_macro_does_not_format() {
        let (pipeline, sink) = pipeline();
        let formatted = Cell::new(0);

        debug!(pipeline, "{}", Counted(&formatted)).unwrap();
        info!(pipeline, "{}", Counted(&formatted)).unwrap();
        assert_eq!(formatted.get(), 0);
        assert!(sink.is_empty());

        warn!(pipeline, "{}", Counted(&formatted)).unwrap();
        assert_eq!(formatted.get(), 1);
    }

    #[test]
    fn test_severity_macros() {
        let (pipeline, sink) = pipeline();
        pipeline.set_min_level(Severity::Debug);

        debug!(pipeline, "debug").unwrap();
        info!(pipeline, "info").unwrap();
        warn!(pipeline, "warn").unwrap();
        error!(pipeline, "error").unwrap();
        fatal!(pipeline, "fatal").unwrap();
        unknown!(pipeline, "unknown").unwrap();

        assert_eq!(sink.len(), 6);
        assert!(sink.lines()[5].contains(r#""severity":"UNKNOWN""#));
    }
}
