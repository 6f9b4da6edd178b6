//! The engine's own diagnostic channel.
//!
//! Engine internals report on a seven-step scale and never reach `tracing`
//! directly; whoever builds the engine decides where records go by handing
//! it an `EngineLog`. See [`crate::log::EngineLogBridge`] for the host
//! adapter.

use std::fmt::Arguments;

/// Engine severities, least severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EngineLevel {
    Finest,
    Finer,
    Fine,
    Config,
    Info,
    Warning,
    Severe,
}

/// Sink for engine diagnostics.
pub trait EngineLog: Send + Sync {
    /// Whether records at `level` are wanted. Checked before formatting.
    fn enabled(&self, level: EngineLevel) -> bool {
        let _ = level;
        true
    }

    /// Deliver one record.
    fn record(&self, level: EngineLevel, args: Arguments<'_>);
}

/// Sink that drops everything. Used when the engine is built standalone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentEngineLog;

impl EngineLog for SilentEngineLog {
    fn enabled(&self, _level: EngineLevel) -> bool {
        false
    }

    fn record(&self, _level: EngineLevel, _args: Arguments<'_>) {}
}

macro_rules! engine_log {
    ($log:expr, $level:ident, $($arg:tt)*) => {{
        let level = $crate::engine::EngineLevel::$level;
        if $log.enabled(level) {
            $log.record(level, format_args!($($arg)*));
        }
    }};
}

pub(crate) use engine_log;
