//! Tracing library adapter implementation.

use crate::log::{LogLevel, Logger};
use std::fmt::Arguments;

/// Logger implementation that delegates to the `tracing` crate.
///
/// Events are emitted under the `regioncache` target so the cache can be
/// filtered separately, e.g. `RUST_LOG=regioncache=debug`.
///
/// ```ignore
/// use regioncache::log::{Logger, TracingLogger};
/// use std::sync::Arc;
///
/// // Assumes a tracing subscriber is already installed
/// let logger: Arc<dyn Logger> = Arc::new(TracingLogger);
/// logger.info(format_args!("Using tracing backend"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    /// Create a new tracing logger adapter.
    pub fn new() -> Self {
        Self
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, args: Arguments<'_>) {
        match level {
            LogLevel::Trace => tracing::trace!(target: "regioncache", "{}", args),
            LogLevel::Debug => tracing::debug!(target: "regioncache", "{}", args),
            LogLevel::Info => tracing::info!(target: "regioncache", "{}", args),
            LogLevel::Warn => tracing::warn!(target: "regioncache", "{}", args),
            LogLevel::Error => tracing::error!(target: "regioncache", "{}", args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_logger_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TracingLogger>();
    }

    #[test]
    fn test_tracing_logger_as_trait_object() {
        // No subscriber installed; events are dropped
        let logger: Box<dyn Logger> = Box::new(TracingLogger::new());
        logger.info(format_args!("test info"));
        logger.warn(format_args!("test warn"));
    }
}
