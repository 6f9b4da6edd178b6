//! regioncache - tiered object caching with named regions
//!
//! A region keeps a bounded LRU set of objects in memory and, optionally,
//! a bounded set on disk. Disk files of all regions share one cache root
//! guarded by an advisory lock, so a second process using the same root
//! falls back to memory-only caching instead of corrupting the files.
//!
//! # High-Level API
//!
//! ```
//! use regioncache::log::TracingLogger;
//! use regioncache::manager::{CacheManager, CacheOptions};
//! use std::sync::Arc;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let manager = CacheManager::initialize(CacheOptions::new(dir.path()), Arc::new(TracingLogger));
//!
//! let geocoder = manager.get_cache::<String, (f64, f64)>("geocoder").unwrap();
//! geocoder.put(&"Kraków".to_string(), &(50.06, 19.94)).unwrap();
//!
//! manager.shutdown();
//! ```
//!
//! # Modules
//!
//! - [`manager`]: initialisation, region provisioning, shutdown
//! - [`access`]: typed handle over a region
//! - [`engine`]: regions, memory tier, disk caches
//! - [`log`]: logger abstraction and the engine log bridge
//! - [`config`]: config.ini handling
//! - [`logging`]: `tracing` subscriber setup

pub mod access;
pub mod config;
pub mod engine;
pub mod log;
pub mod logging;
pub mod manager;

pub use access::{CacheAccess, CacheError};
pub use manager::{CacheManager, CacheOptions, TierAvailability};

/// Version of the library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
