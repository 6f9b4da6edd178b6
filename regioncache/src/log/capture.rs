//! Logger that keeps every message in memory.

use crate::log::{LogLevel, Logger};
use parking_lot::Mutex;
use std::fmt::Arguments;

/// Records `(level, message)` pairs in arrival order.
///
/// Intended for tests that need to assert a warning was emitted when the
/// disk tier was disabled, or that engine chatter was downgraded.
///
/// ```
/// use regioncache::log::{CapturingLogger, LogLevel, Logger};
///
/// let logger = CapturingLogger::new();
/// logger.warn(format_args!("Cannot lock cache directory"));
/// assert!(logger.contains(LogLevel::Warn, "Cannot lock"));
/// ```
#[derive(Debug, Default)]
pub struct CapturingLogger {
    records: Mutex<Vec<(LogLevel, String)>>,
}

impl CapturingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far.
    pub fn records(&self) -> Vec<(LogLevel, String)> {
        self.records.lock().clone()
    }

    /// Whether a message at `level` containing `needle` was logged.
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.records
            .lock()
            .iter()
            .any(|(l, msg)| *l == level && msg.contains(needle))
    }

    /// Number of messages logged at `level`.
    pub fn count(&self, level: LogLevel) -> usize {
        self.records.lock().iter().filter(|(l, _)| *l == level).count()
    }
}

impl Logger for CapturingLogger {
    fn log(&self, level: LogLevel, args: Arguments<'_>) {
        self.records.lock().push((level, args.to_string()));
    }
}
