//! Sink trait for finished log lines

use super::error::Result;

/// Destination for rendered JSON lines
///
/// `line` already carries its trailing newline. Each call receives exactly
/// one complete event.
///
/// Sinks run under the pipeline's sink lock. They must not log through the
/// pipeline themselves; records a sink sends through the `log` facade while
/// the bridge is installed are dropped.
pub trait Sink: Send {
    fn write(&mut self, line: &str) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}
