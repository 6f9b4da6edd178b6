//! Logging abstraction layer.
//!
//! Cache components never talk to `tracing` directly. They accept an
//! `Arc<dyn Logger>` and log through the `log_*!` macros, which keeps the
//! embedded engine and the provisioner testable without a global subscriber.
//!
//! # Architecture
//!
//! - `Logger` trait: the host-side interface every component logs through
//! - `TracingLogger`: production adapter that delegates to `tracing`
//! - `NoOpLogger`: silent logger for tests and benchmarks
//! - `CapturingLogger`: records messages so tests can assert on them
//! - `EngineLogBridge`: adapts the engine's own severity scale onto `Logger`
//!
//! ```
//! use regioncache::log::{Logger, NoOpLogger};
//! use regioncache::{log_debug, log_warn};
//! use std::sync::Arc;
//!
//! let logger: Arc<dyn Logger> = Arc::new(NoOpLogger);
//! log_warn!(logger, "Cannot lock cache directory {}", "/tmp/jcs");
//! log_debug!(logger, "Will not use disk cache");
//! ```

mod bridge;
mod capture;
mod noop;
mod tracing_adapter;
mod r#trait;

pub use bridge::EngineLogBridge;
pub use capture::CapturingLogger;
pub use noop::NoOpLogger;
pub use r#trait::{LogLevel, Logger};
pub use tracing_adapter::TracingLogger;
