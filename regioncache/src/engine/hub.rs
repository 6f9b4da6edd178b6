//! The engine: a registry of named regions.

use crate::engine::attributes::{EngineConfig, RegionAttributes};
use crate::engine::error::EngineError;
use crate::engine::log::{engine_log, EngineLog, SilentEngineLog};
use crate::engine::region::CompositeCache;
use crate::engine::shrinker::{MemoryShrinker, RegionMap};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Owns every region of one cache instance.
///
/// Regions are singletons per name: asking for a name that already exists
/// returns the existing region and ignores the attributes passed.
pub struct CacheEngine {
    config: EngineConfig,
    regions: RegionMap,
    shrinker: Mutex<Option<MemoryShrinker>>,
    shut_down: AtomicBool,
    log: Arc<dyn EngineLog>,
}

impl CacheEngine {
    /// Create an engine. The shrinker thread starts with the first region.
    pub fn new(config: EngineConfig, log: Arc<dyn EngineLog>) -> Self {
        Self {
            config,
            regions: Arc::new(RwLock::new(HashMap::new())),
            shrinker: Mutex::new(None),
            shut_down: AtomicBool::new(false),
            log,
        }
    }

    /// Engine with default configuration and no diagnostics.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default(), Arc::new(SilentEngineLog))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn log(&self) -> Arc<dyn EngineLog> {
        self.log.clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Region named `name`, created with `attributes` (or the engine
    /// default) if it does not exist yet.
    pub fn get_instance(
        &self,
        name: &str,
        attributes: Option<RegionAttributes>,
    ) -> Result<Arc<CompositeCache>, EngineError> {
        validate_region_name(name)?;

        let region = {
            let mut regions = self.regions.write();
            // Checked under the write lock so shutdown cannot race a create
            if self.is_shut_down() {
                return Err(EngineError::ShutDown);
            }
            if let Some(existing) = regions.get(name) {
                return Ok(existing.clone());
            }

            let attributes = attributes.unwrap_or_else(|| self.config.default_region.clone());
            engine_log!(
                self.log,
                Config,
                "Creating region {} with max_objects={} disk_usage={:?}",
                name,
                attributes.max_objects,
                attributes.disk_usage
            );
            let region = Arc::new(CompositeCache::new(
                name,
                attributes,
                self.config.default_element,
                self.log.clone(),
            ));
            regions.insert(name.to_string(), region.clone());
            region
        };

        self.ensure_shrinker();
        Ok(region)
    }

    fn ensure_shrinker(&self) {
        if !self.config.use_memory_shrinker {
            return;
        }
        let mut shrinker = self.shrinker.lock();
        if shrinker.is_some() || self.is_shut_down() {
            return;
        }
        match MemoryShrinker::start(
            self.regions.clone(),
            self.config.shrinker_interval,
            self.log.clone(),
        ) {
            Ok(started) => *shrinker = Some(started),
            Err(e) => {
                engine_log!(self.log, Warning, "Could not start memory shrinker: {}", e);
            }
        }
    }

    /// Existing region, without creating one.
    pub fn region(&self, name: &str) -> Option<Arc<CompositeCache>> {
        self.regions.read().get(name).cloned()
    }

    /// Names of all regions, sorted.
    pub fn region_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.regions.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn shrinker_running(&self) -> bool {
        self.shrinker
            .lock()
            .as_ref()
            .is_some_and(MemoryShrinker::is_running)
    }

    /// Stop the shrinker and dispose every region. Later calls do nothing.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(mut shrinker) = self.shrinker.lock().take() {
            shrinker.stop();
        }

        let regions: Vec<Arc<CompositeCache>> = {
            let mut map = self.regions.write();
            map.drain().map(|(_, region)| region).collect()
        };
        let count = regions.len();
        for region in regions {
            region.dispose();
        }
        engine_log!(self.log, Info, "Cache engine shut down, {} region(s) disposed", count);
    }
}

fn validate_region_name(name: &str) -> Result<(), EngineError> {
    if name.is_empty() || name.chars().any(char::is_control) {
        return Err(EngineError::InvalidRegionName(name.to_string()));
    }
    Ok(())
}
