//! Cache manager: provisions regions on top of the engine.
//!
//! [`CacheManager::initialize`] resolves the cache root, takes the
//! cross-process disk lock, picks the disk format, and routes engine
//! diagnostics into the host [`Logger`]. Regions are then handed out by
//! [`CacheManager::get_region`], which never fails loudly: a region that
//! cannot get a disk tier runs from memory, and a region that cannot be
//! created at all comes back as `None`.
//!
//! ```
//! use regioncache::log::NoOpLogger;
//! use regioncache::manager::{CacheManager, CacheOptions};
//! use std::sync::Arc;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let manager = CacheManager::initialize(CacheOptions::new(dir.path()), Arc::new(NoOpLogger));
//!
//! let tiles = manager
//!     .get_region::<String, Vec<u8>>("TMS", 100, 1024, Some(&dir.path().join("tiles")))
//!     .unwrap();
//! tiles.put(&"15/100/200".to_string(), &vec![1, 2, 3]).unwrap();
//! assert_eq!(tiles.get(&"15/100/200".to_string()), Some(vec![1, 2, 3]));
//!
//! manager.shutdown();
//! ```

mod attributes;
mod context;
mod error;
mod inventory;
mod lock;
mod reaper;

pub use attributes::{build_disk_attributes, memory_attributes, DiskFormat};
pub use context::{CacheContext, CacheOptions, TierAvailability, CACHE_ROOT_DIR};
pub use error::ProvisionError;
pub use inventory::{scan_region_files, RegionFiles};
pub use lock::{acquire_disk_lock, is_locked, DiskLock, LOCK_FILE_NAME};
pub use reaper::{delete_cache_files, remove_stale_files};

use crate::access::CacheAccess;
use crate::engine::{
    AuxiliaryCacheFactory, BlockDiskCacheFactory, CacheEngine, CompositeCache, ElementAttributes,
    EngineConfig, EngineLog, IndexedDiskCacheFactory,
};
use crate::log::{EngineLogBridge, Logger};
use crate::{log_debug, log_error, log_info};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Factory for the configured format.
pub fn disk_cache_factory(format: DiskFormat) -> Arc<dyn AuxiliaryCacheFactory> {
    match format {
        DiskFormat::Block => Arc::new(BlockDiskCacheFactory),
        DiskFormat::Index => Arc::new(IndexedDiskCacheFactory),
    }
}

/// Entry point of the library.
///
/// Dropping the manager does not flush the disk tier; call
/// [`shutdown`](Self::shutdown) first.
pub struct CacheManager {
    context: CacheContext,
    logger: Arc<dyn Logger>,
    // Serialises disk attachment so a region gets at most one disk cache
    provisioning: Mutex<()>,
}

impl CacheManager {
    /// Set up the engine, the disk lock, and the disk format.
    pub fn initialize(options: CacheOptions, logger: Arc<dyn Logger>) -> Self {
        let format = DiskFormat::from_use_block_cache(options.use_block_cache);
        Self::initialize_with_factory(options, logger, Some(disk_cache_factory(format)))
    }

    /// As [`initialize`](Self::initialize), with an explicit disk cache
    /// factory. `None` disables the disk tier.
    pub fn initialize_with_factory(
        options: CacheOptions,
        logger: Arc<dyn Logger>,
        factory: Option<Arc<dyn AuxiliaryCacheFactory>>,
    ) -> Self {
        let engine_log: Arc<dyn EngineLog> = Arc::new(EngineLogBridge::new(logger.clone()));
        let engine = CacheEngine::new(
            EngineConfig {
                default_region: memory_attributes(options.default_max_objects_in_memory),
                default_element: ElementAttributes::default(),
                ..EngineConfig::default()
            },
            engine_log,
        );

        let root = options.cache_root();
        let disk_lock = acquire_disk_lock(&root, &logger);
        let format = DiskFormat::from_use_block_cache(options.use_block_cache);

        log_info!(
            logger,
            "Cache initialised at {} ({} format, disk tier {})",
            root.display(),
            format,
            if disk_lock.is_some() && factory.is_some() {
                "enabled"
            } else {
                "disabled"
            }
        );

        Self {
            context: CacheContext {
                engine,
                disk_lock,
                format,
                factory,
                options,
            },
            logger,
            provisioning: Mutex::new(()),
        }
    }

    pub fn context(&self) -> &CacheContext {
        &self.context
    }

    pub fn availability(&self) -> TierAvailability {
        self.context.availability()
    }

    /// Memory-only region sized by `default_max_objects_in_memory`.
    pub fn get_cache<K, V>(&self, name: &str) -> Option<CacheAccess<K, V>>
    where
        K: Serialize,
        V: Serialize + DeserializeOwned,
    {
        self.get_region(
            name,
            self.context.options.default_max_objects_in_memory,
            0,
            None,
        )
    }

    /// Region `name` with `max_memory_objects` in memory and, if
    /// `cache_path` is given and the disk tier is available, up to
    /// `max_disk_kb` kilobytes on disk.
    ///
    /// An existing region is returned as is; its sizes are not changed.
    pub fn get_region<K, V>(
        &self,
        name: &str,
        max_memory_objects: usize,
        max_disk_kb: usize,
        cache_path: Option<&Path>,
    ) -> Option<CacheAccess<K, V>>
    where
        K: Serialize,
        V: Serialize + DeserializeOwned,
    {
        let region = match self
            .context
            .engine
            .get_instance(name, Some(memory_attributes(max_memory_objects)))
        {
            Ok(region) => region,
            Err(e) => {
                log_error!(self.logger, "Cannot create cache region {}: {}", name, e);
                return None;
            }
        };

        if let (Some(path), true, Some(factory)) = (
            cache_path,
            self.context.disk_lock.is_some(),
            self.context.factory.as_ref(),
        ) {
            if let Err(e) = self.attach_disk_tier(&region, factory.as_ref(), max_disk_kb, path) {
                region.set_aux_caches(Vec::new());
                log_debug!(self.logger, "Region {} runs without disk cache: {}", name, e);
            }
        }

        Some(CacheAccess::new(region))
    }

    fn attach_disk_tier(
        &self,
        region: &Arc<CompositeCache>,
        factory: &dyn AuxiliaryCacheFactory,
        max_disk_kb: usize,
        cache_path: &Path,
    ) -> Result<(), ProvisionError> {
        let _guard = self.provisioning.lock();

        let descriptor = build_disk_attributes(
            self.context.format,
            max_disk_kb,
            cache_path,
            region.name(),
            &self.logger,
        )?;
        if region.aux_caches().is_empty() {
            let cache = factory.create_cache(&descriptor, self.context.engine.log())?;
            log_debug!(
                self.logger,
                "Attached {} disk cache {} ({} KB) to region {}",
                descriptor.format_name(),
                descriptor.cache_name(),
                descriptor.max_key_size(),
                region.name()
            );
            region.set_aux_caches(vec![cache]);
        }
        Ok(())
    }

    /// Flush and close every region. Safe to call more than once.
    pub fn shutdown(&self) {
        if self.context.engine.is_shut_down() {
            return;
        }
        let regions = self.context.engine.region_names().len();
        self.context.engine.shutdown();
        log_info!(self.logger, "Cache shut down ({} regions)", regions);
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("context", &self.context)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{CapturingLogger, LogLevel, NoOpLogger};
    use tempfile::TempDir;

    fn manager(temp: &TempDir) -> CacheManager {
        CacheManager::initialize(CacheOptions::new(temp.path()), Arc::new(NoOpLogger))
    }

    #[test]
    fn test_initialize_takes_lock() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp);

        assert!(temp.path().join("jcs").join(".lock").exists());
        assert_eq!(
            manager.availability(),
            TierAvailability {
                memory: true,
                disk: true
            }
        );
        assert_eq!(manager.context().format(), DiskFormat::Block);
    }

    #[test]
    fn test_get_cache_is_memory_only() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp);

        let cache = manager.get_cache::<u32, u32>("geocoder").unwrap();
        assert!(cache.cache_control().aux_caches().is_empty());
        assert_eq!(cache.cache_control().attributes().max_objects, 1000);
    }

    #[test]
    fn test_no_factory_disables_disk() {
        let temp = TempDir::new().unwrap();
        let manager =
            CacheManager::initialize_with_factory(CacheOptions::new(temp.path()), Arc::new(NoOpLogger), None);

        let path = temp.path().join("tiles");
        let region = manager.get_region::<u32, u32>("r", 10, 100, Some(&path)).unwrap();

        assert!(!manager.availability().disk);
        assert!(region.cache_control().aux_caches().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_engine_failure_returns_none_with_error() {
        let temp = TempDir::new().unwrap();
        let capture = Arc::new(CapturingLogger::new());
        let manager = CacheManager::initialize(CacheOptions::new(temp.path()), capture.clone());

        assert!(manager.get_region::<u32, u32>("", 10, 0, None).is_none());
        assert!(capture.contains(LogLevel::Error, "Cannot create cache region"));
    }

    #[test]
    fn test_shutdown_twice_logs_once() {
        let temp = TempDir::new().unwrap();
        let capture = Arc::new(CapturingLogger::new());
        let manager = CacheManager::initialize(CacheOptions::new(temp.path()), capture.clone());

        manager.shutdown();
        manager.shutdown();

        let shutdowns = capture
            .records()
            .iter()
            .filter(|(_, msg)| msg.starts_with("Cache shut down"))
            .count();
        assert_eq!(shutdowns, 1);
        assert!(!manager.availability().memory);
    }
}
