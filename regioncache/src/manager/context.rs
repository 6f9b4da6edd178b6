//! Options and the state fixed at initialisation.

use crate::config::default_cache_directory;
use crate::engine::{AuxiliaryCacheFactory, CacheEngine, DEFAULT_MAX_OBJECTS};
use crate::manager::attributes::DiskFormat;
use crate::manager::lock::DiskLock;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Subdirectory of the cache directory that holds the lock file.
pub const CACHE_ROOT_DIR: &str = "jcs";

/// Inputs to [`CacheManager::initialize`](crate::manager::CacheManager::initialize).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Base cache directory; the cache root is `<cache_directory>/jcs`
    pub cache_directory: PathBuf,
    /// Block disk format when true, indexed when false
    pub use_block_cache: bool,
    /// Memory size for [`get_cache`](crate::manager::CacheManager::get_cache)
    pub default_max_objects_in_memory: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            cache_directory: default_cache_directory(),
            use_block_cache: true,
            default_max_objects_in_memory: DEFAULT_MAX_OBJECTS,
        }
    }
}

impl CacheOptions {
    pub fn new(cache_directory: impl Into<PathBuf>) -> Self {
        Self {
            cache_directory: cache_directory.into(),
            ..Self::default()
        }
    }

    pub fn with_block_cache(mut self, use_block_cache: bool) -> Self {
        self.use_block_cache = use_block_cache;
        self
    }

    pub fn with_max_objects_in_memory(mut self, max_objects: usize) -> Self {
        self.default_max_objects_in_memory = max_objects;
        self
    }

    /// `<cache_directory>/jcs`
    pub fn cache_root(&self) -> PathBuf {
        self.cache_directory.join(CACHE_ROOT_DIR)
    }
}

/// Which tiers the manager can hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierAvailability {
    pub memory: bool,
    pub disk: bool,
}

/// Everything decided once at initialisation.
///
/// The lock token, disk format, and factory never change afterwards.
pub struct CacheContext {
    pub(crate) engine: CacheEngine,
    pub(crate) disk_lock: Option<DiskLock>,
    pub(crate) format: DiskFormat,
    pub(crate) factory: Option<Arc<dyn AuxiliaryCacheFactory>>,
    pub(crate) options: CacheOptions,
}

impl CacheContext {
    pub fn engine(&self) -> &CacheEngine {
        &self.engine
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    pub fn format(&self) -> DiskFormat {
        self.format
    }

    pub fn has_disk_lock(&self) -> bool {
        self.disk_lock.is_some()
    }

    pub fn lock_path(&self) -> Option<&Path> {
        self.disk_lock.as_ref().map(DiskLock::path)
    }

    pub fn factory_name(&self) -> Option<&'static str> {
        self.factory.as_ref().map(|f| f.name())
    }

    pub fn availability(&self) -> TierAvailability {
        TierAvailability {
            memory: !self.engine.is_shut_down(),
            disk: self.disk_lock.is_some() && self.factory.is_some(),
        }
    }
}

impl fmt::Debug for CacheContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheContext")
            .field("format", &self.format)
            .field("disk_lock", &self.disk_lock)
            .field("factory", &self.factory_name())
            .field("regions", &self.engine.region_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options = CacheOptions::default();
        assert!(options.use_block_cache);
        assert_eq!(options.default_max_objects_in_memory, 1000);
        assert!(options.cache_directory.ends_with("regioncache"));
    }

    #[test]
    fn test_cache_root_is_jcs_subdirectory() {
        let options = CacheOptions::new("/var/cache/app");
        assert_eq!(options.cache_root(), PathBuf::from("/var/cache/app/jcs"));
    }

    #[test]
    fn test_options_builder() {
        let options = CacheOptions::new("/tmp/x")
            .with_block_cache(false)
            .with_max_objects_in_memory(5);
        assert!(!options.use_block_cache);
        assert_eq!(options.default_max_objects_in_memory, 5);
    }
}
