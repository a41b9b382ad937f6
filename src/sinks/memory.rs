//! In-memory sink

use crate::core::{Result, Sink, StasherError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Collects lines in memory
///
/// Clones share the same buffer, so a clone kept by the caller sees every
/// line written through the pipeline. Lines are stored exactly as written,
/// trailing newline included.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Remove and return all collected lines
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    /// Make every later write fail
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl Sink for MemorySink {
    fn write(&mut self, line: &str) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StasherError::sink("memory", "sink is closed"));
        }
        self.lines.lock().push(line.to_string());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
