//! In-memory tier with LRU eviction by object count.

use crate::engine::element::{now_millis, CacheElement};
use lru::LruCache;
use std::time::Duration;

/// Outcome of a memory lookup.
#[derive(Debug)]
pub(crate) enum Lookup {
    Hit(CacheElement),
    /// Found but past its lifetime; already removed.
    Expired,
    Miss,
}

/// Elements removed by a shrinker pass.
#[derive(Debug, Default)]
pub(crate) struct Shrunk {
    pub expired: Vec<CacheElement>,
    pub idle: Vec<CacheElement>,
}

/// Memory tier of a region.
///
/// Holds at most `max_objects` elements. Inserting past the ceiling pushes
/// out the least recently used elements, which are handed back to the
/// caller so the region can spool them. A ceiling of zero keeps nothing.
pub(crate) struct LruMemoryCache {
    entries: LruCache<Vec<u8>, CacheElement>,
    max_objects: usize,
}

impl LruMemoryCache {
    pub fn new(max_objects: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            max_objects,
        }
    }

    pub fn get(&mut self, key: &[u8]) -> Lookup {
        match self.entries.get_mut(key) {
            None => return Lookup::Miss,
            Some(element) if !element.is_expired() => {
                element.touch();
                return Lookup::Hit(element.clone());
            }
            Some(_) => {}
        }

        self.entries.pop(key);
        Lookup::Expired
    }

    /// Insert or replace an element, returning whatever fell out.
    pub fn put(&mut self, element: CacheElement) -> Vec<CacheElement> {
        let mut evicted = Vec::new();
        self.entries.push(element.key.clone(), element);

        while self.entries.len() > self.max_objects {
            match self.entries.pop_lru() {
                Some((_, old)) => evicted.push(old),
                None => break,
            }
        }
        evicted
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<CacheElement> {
        self.entries.pop(key)
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.entries.contains(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Empty the tier, least recently used first.
    pub fn drain(&mut self) -> Vec<CacheElement> {
        let mut drained = Vec::with_capacity(self.entries.len());
        while let Some((_, element)) = self.entries.pop_lru() {
            drained.push(element);
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn max_objects(&self) -> usize {
        self.max_objects
    }

    /// Drop expired elements and, if `max_idle` is set, elements idle for
    /// longer than that.
    pub fn shrink(&mut self, max_idle: Option<Duration>) -> Shrunk {
        let now = now_millis();
        let idle_ms = max_idle.map(|d| d.as_millis() as u64);

        let mut expired_keys = Vec::new();
        let mut idle_keys = Vec::new();
        for (key, element) in self.entries.iter() {
            if element.is_expired_at(now) {
                expired_keys.push(key.clone());
            } else if idle_ms.is_some_and(|ms| element.idle_for_at_least(ms, now)) {
                idle_keys.push(key.clone());
            }
        }

        let mut shrunk = Shrunk::default();
        for key in expired_keys {
            if let Some(element) = self.entries.pop(&key) {
                shrunk.expired.push(element);
            }
        }
        for key in idle_keys {
            if let Some(element) = self.entries.pop(&key) {
                shrunk.idle.push(element);
            }
        }
        shrunk
    }
}
