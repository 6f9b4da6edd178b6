//! A named cache region: memory tier plus optional auxiliary caches.

use crate::engine::attributes::{DiskUsagePattern, ElementAttributes, RegionAttributes};
use crate::engine::auxiliary::AuxiliaryCache;
use crate::engine::element::CacheElement;
use crate::engine::error::EngineError;
use crate::engine::log::{engine_log, EngineLog};
use crate::engine::memory::{Lookup, LruMemoryCache};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Counters kept per region.
#[derive(Debug, Default)]
struct RegionCounters {
    memory_hits: AtomicU64,
    aux_hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    puts: AtomicU64,
    removes: AtomicU64,
    spool_failures: AtomicU64,
}

impl RegionCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of a region's counters and sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionStats {
    pub name: String,
    pub memory_entries: usize,
    pub memory_capacity: usize,
    pub aux_caches: usize,
    pub aux_entries: usize,
    pub memory_hits: u64,
    pub aux_hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub puts: u64,
    pub removes: u64,
    pub spool_failures: u64,
}

impl RegionStats {
    /// Fraction of lookups answered by any tier (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.memory_hits + self.aux_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// One-line summary for logs and the CLI.
    pub fn format(&self) -> String {
        format!(
            "{}: memory {}/{}, disk {} entries in {} cache(s), hits {} memory / {} disk, misses {}, hit rate {:.1}%",
            self.name,
            self.memory_entries,
            self.memory_capacity,
            self.aux_entries,
            self.aux_caches,
            self.memory_hits,
            self.aux_hits,
            self.misses,
            self.hit_rate() * 100.0
        )
    }
}

/// What a shrinker pass removed from memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShrinkReport {
    pub expired: usize,
    pub idle: usize,
    /// Idle elements written to auxiliaries (swap regions only)
    pub spooled: usize,
}

/// One cache region.
///
/// Lookups check memory first, then each auxiliary in order; an auxiliary
/// hit is promoted back into memory. Under [`DiskUsagePattern::Update`]
/// every put is written through to the auxiliaries; under
/// [`DiskUsagePattern::Swap`] elements reach disk only when pushed out of
/// memory.
pub struct CompositeCache {
    name: String,
    attributes: RegionAttributes,
    element_defaults: ElementAttributes,
    memory: Mutex<LruMemoryCache>,
    // Bumped under the memory lock by every put and remove
    generation: AtomicU64,
    aux: RwLock<Vec<Arc<dyn AuxiliaryCache>>>,
    counters: RegionCounters,
    disposed: AtomicBool,
    log: Arc<dyn EngineLog>,
}

impl CompositeCache {
    pub(crate) fn new(
        name: impl Into<String>,
        attributes: RegionAttributes,
        element_defaults: ElementAttributes,
        log: Arc<dyn EngineLog>,
    ) -> Self {
        Self {
            name: name.into(),
            memory: Mutex::new(LruMemoryCache::new(attributes.max_objects)),
            generation: AtomicU64::new(0),
            attributes,
            element_defaults,
            aux: RwLock::new(Vec::new()),
            counters: RegionCounters::default(),
            disposed: AtomicBool::new(false),
            log,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &RegionAttributes {
        &self.attributes
    }

    /// Attributes applied to puts that do not carry their own.
    pub fn element_defaults(&self) -> ElementAttributes {
        self.element_defaults
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn ensure_live(&self) -> Result<(), EngineError> {
        if self.is_disposed() {
            Err(EngineError::Disposed(self.name.clone()))
        } else {
            Ok(())
        }
    }

    /// Value stored under `key`, if any tier has an unexpired copy.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, EngineError> {
        Ok(self.get_element(key)?.map(|element| element.value))
    }

    pub fn get_element(&self, key: &[u8]) -> Result<Option<CacheElement>, EngineError> {
        self.ensure_live()?;

        let (lookup, seen) = {
            let mut memory = self.memory.lock();
            (memory.get(key), self.generation.load(Ordering::Acquire))
        };
        match lookup {
            Lookup::Hit(element) => {
                RegionCounters::bump(&self.counters.memory_hits);
                return Ok(Some(element));
            }
            Lookup::Expired => {
                RegionCounters::bump(&self.counters.expired);
                // Stale copies on disk would resurrect the element
                self.remove_from_aux(key);
                RegionCounters::bump(&self.counters.misses);
                return Ok(None);
            }
            Lookup::Miss => {}
        }

        let aux = self.aux.read().clone();
        for cache in &aux {
            match cache.get(key) {
                Ok(Some(mut element)) => {
                    if element.is_expired() {
                        RegionCounters::bump(&self.counters.expired);
                        if let Err(e) = cache.remove(key) {
                            engine_log!(self.log, Warning, "Could not drop expired element from {}: {}", cache.name(), e);
                        }
                        continue;
                    }
                    RegionCounters::bump(&self.counters.aux_hits);
                    element.touch();
                    self.promote(element.clone(), seen);
                    return Ok(Some(element));
                }
                Ok(None) => {}
                Err(e) => {
                    engine_log!(self.log, Warning, "Read from {} failed in region {}: {}", cache.name(), self.name, e);
                }
            }
        }

        RegionCounters::bump(&self.counters.misses);
        Ok(None)
    }

    /// Put a disk hit back into memory without writing it through again.
    ///
    /// Skipped if the region was written since `seen`, or if memory already
    /// holds the key, so a read racing a put or remove cannot restore an
    /// older value.
    fn promote(&self, element: CacheElement, seen: u64) -> bool {
        let evicted = {
            let mut memory = self.memory.lock();
            if self.generation.load(Ordering::Acquire) != seen || memory.contains(&element.key) {
                return false;
            }
            memory.put(element)
        };
        if self.attributes.disk_usage == DiskUsagePattern::Swap {
            self.spool_all(&evicted);
        }
        true
    }

    fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Store `value` under `key` with the region's default element attributes.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), EngineError> {
        self.put_with(key, value, self.element_defaults)
    }

    pub fn put_with(
        &self,
        key: Vec<u8>,
        value: Vec<u8>,
        attributes: ElementAttributes,
    ) -> Result<(), EngineError> {
        self.put_element(CacheElement::new(key, value, attributes))
    }

    pub fn put_element(&self, element: CacheElement) -> Result<(), EngineError> {
        self.ensure_live()?;
        RegionCounters::bump(&self.counters.puts);

        match self.attributes.disk_usage {
            DiskUsagePattern::Update => {
                self.spool(&element);
                let mut memory = self.memory.lock();
                memory.put(element);
                self.bump_generation();
            }
            DiskUsagePattern::Swap => {
                let evicted = {
                    let mut memory = self.memory.lock();
                    let evicted = memory.put(element);
                    self.bump_generation();
                    evicted
                };
                self.spool_all(&evicted);
            }
        }
        Ok(())
    }

    /// Write one element to every auxiliary. Failures are counted and logged.
    fn spool(&self, element: &CacheElement) {
        if !element.attributes.spool {
            return;
        }
        for cache in self.aux.read().iter() {
            if let Err(e) = cache.update(element) {
                RegionCounters::bump(&self.counters.spool_failures);
                engine_log!(self.log, Warning, "Could not spool to {} in region {}: {}", cache.name(), self.name, e);
            }
        }
    }

    fn spool_all(&self, elements: &[CacheElement]) -> usize {
        let mut spooled = 0;
        for element in elements {
            if element.attributes.spool && !element.is_expired() {
                self.spool(element);
                spooled += 1;
            }
        }
        spooled
    }

    fn remove_from_aux(&self, key: &[u8]) -> bool {
        let mut found = false;
        for cache in self.aux.read().iter() {
            match cache.remove(key) {
                Ok(removed) => found |= removed,
                Err(e) => {
                    engine_log!(self.log, Warning, "Remove from {} failed: {}", cache.name(), e);
                }
            }
        }
        found
    }

    /// Remove `key` from every tier. Returns whether any tier held it.
    pub fn remove(&self, key: &[u8]) -> Result<bool, EngineError> {
        self.ensure_live()?;
        RegionCounters::bump(&self.counters.removes);
        // Disk first: a reader that fetched the old copy sees the new
        // generation when it tries to promote
        let on_disk = self.remove_from_aux(key);
        let in_memory = {
            let mut memory = self.memory.lock();
            let removed = memory.remove(key).is_some();
            self.bump_generation();
            removed
        };
        Ok(in_memory || on_disk)
    }

    /// Empty every tier.
    pub fn remove_all(&self) -> Result<(), EngineError> {
        self.ensure_live()?;
        for cache in self.aux.read().iter() {
            cache.remove_all()?;
        }
        {
            let mut memory = self.memory.lock();
            memory.clear();
            self.bump_generation();
        }
        engine_log!(self.log, Info, "Cleared region {}", self.name);
        Ok(())
    }

    pub fn memory_len(&self) -> usize {
        self.memory.lock().len()
    }

    pub fn memory_contains(&self, key: &[u8]) -> bool {
        self.memory.lock().contains(key)
    }

    pub fn aux_caches(&self) -> Vec<Arc<dyn AuxiliaryCache>> {
        self.aux.read().clone()
    }

    /// Replace the auxiliary list. Caches dropped from the list are disposed.
    pub fn set_aux_caches(&self, caches: Vec<Arc<dyn AuxiliaryCache>>) {
        let previous = std::mem::replace(&mut *self.aux.write(), caches);
        let current = self.aux.read().clone();

        for old in previous {
            if current.iter().any(|c| Arc::ptr_eq(c, &old)) {
                continue;
            }
            if let Err(e) = old.dispose() {
                engine_log!(self.log, Warning, "Could not dispose {}: {}", old.name(), e);
            }
        }
    }

    /// Drop expired and idle elements from memory.
    ///
    /// Idle elements of a swap region are spooled to the auxiliaries first.
    pub fn shrink(&self) -> ShrinkReport {
        if self.is_disposed() {
            return ShrinkReport::default();
        }
        let shrunk = self.memory.lock().shrink(self.attributes.max_memory_idle);

        let spooled = match self.attributes.disk_usage {
            DiskUsagePattern::Swap => self.spool_all(&shrunk.idle),
            DiskUsagePattern::Update => 0,
        };
        let report = ShrinkReport {
            expired: shrunk.expired.len(),
            idle: shrunk.idle.len(),
            spooled,
        };
        self.counters
            .expired
            .fetch_add(report.expired as u64, Ordering::Relaxed);

        if report.expired > 0 || report.idle > 0 {
            engine_log!(
                self.log,
                Fine,
                "Shrinker removed {} expired and {} idle elements from {}",
                report.expired,
                report.idle,
                self.name
            );
        }
        report
    }

    pub fn stats(&self) -> RegionStats {
        let memory = self.memory.lock();
        let aux = self.aux.read();
        let c = &self.counters;
        RegionStats {
            name: self.name.clone(),
            memory_entries: memory.len(),
            memory_capacity: memory.max_objects(),
            aux_caches: aux.len(),
            aux_entries: aux.iter().map(|a| a.len()).sum(),
            memory_hits: c.memory_hits.load(Ordering::Relaxed),
            aux_hits: c.aux_hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            expired: c.expired.load(Ordering::Relaxed),
            puts: c.puts.load(Ordering::Relaxed),
            removes: c.removes.load(Ordering::Relaxed),
            spool_failures: c.spool_failures.load(Ordering::Relaxed),
        }
    }

    /// Flush and close the region. Later calls are no-ops.
    pub(crate) fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let remaining = self.memory.lock().drain();
        if self.attributes.disk_usage == DiskUsagePattern::Swap {
            let spooled = self.spool_all(&remaining);
            engine_log!(self.log, Fine, "Spooled {} elements of {} on dispose", spooled, self.name);
        }

        let aux = std::mem::take(&mut *self.aux.write());
        for cache in aux {
            if let Err(e) = cache.dispose() {
                engine_log!(self.log, Severe, "Failed to dispose {} of region {}: {}", cache.name(), self.name, e);
            }
        }
        engine_log!(self.log, Info, "Disposed region {}", self.name);
    }
}
