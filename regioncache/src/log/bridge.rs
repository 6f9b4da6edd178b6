//! Adapter from the engine's log scale onto the host `Logger`.
//!
//! The engine reports at seven severities and is chatty at `Info`. The
//! bridge shifts everything one tier down: `Severe` becomes an error,
//! `Warning` a warning, `Info` a debug message and anything finer a trace.
//! Records below the configured threshold (default `Info`) are dropped
//! before they are formatted.

use crate::engine::{EngineLevel, EngineLog};
use crate::log::{LogLevel, Logger};
use std::fmt::Arguments;
use std::sync::Arc;

/// `EngineLog` sink that forwards into a host `Logger`.
pub struct EngineLogBridge {
    logger: Arc<dyn Logger>,
    threshold: EngineLevel,
}

impl EngineLogBridge {
    /// Bridge with the default `Info` threshold.
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            logger,
            threshold: EngineLevel::Info,
        }
    }

    /// Change the least severe level that is still forwarded.
    pub fn with_threshold(mut self, threshold: EngineLevel) -> Self {
        self.threshold = threshold;
        self
    }

    /// Host level an engine record is reported at.
    pub fn map_level(level: EngineLevel) -> LogLevel {
        if level >= EngineLevel::Severe {
            LogLevel::Error
        } else if level >= EngineLevel::Warning {
            LogLevel::Warn
        } else if level >= EngineLevel::Info {
            LogLevel::Debug
        } else {
            LogLevel::Trace
        }
    }
}

impl EngineLog for EngineLogBridge {
    fn enabled(&self, level: EngineLevel) -> bool {
        level >= self.threshold
    }

    fn record(&self, level: EngineLevel, args: Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        self.logger.log(Self::map_level(level), args);
    }
}

impl std::fmt::Debug for EngineLogBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineLogBridge")
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}
