//! Region and element attributes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default memory ceiling per region, in objects.
pub const DEFAULT_MAX_OBJECTS: usize = 1000;

/// Default period between memory shrinker passes.
pub const DEFAULT_SHRINKER_INTERVAL: Duration = Duration::from_secs(30);

/// When elements are written to the auxiliary caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiskUsagePattern {
    /// Only when evicted from memory.
    Swap,
    /// On every put.
    #[default]
    Update,
}

/// Per-region memory tier configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionAttributes {
    /// Maximum number of elements held in memory
    pub max_objects: usize,
    /// When elements reach the auxiliary caches
    pub disk_usage: DiskUsagePattern,
    /// Elements untouched for longer are dropped from memory by the shrinker
    pub max_memory_idle: Option<Duration>,
}

impl RegionAttributes {
    pub fn new(max_objects: usize) -> Self {
        Self {
            max_objects,
            ..Self::default()
        }
    }

    pub fn with_disk_usage(mut self, pattern: DiskUsagePattern) -> Self {
        self.disk_usage = pattern;
        self
    }

    pub fn with_max_memory_idle(mut self, idle: Duration) -> Self {
        self.max_memory_idle = Some(idle);
        self
    }
}

impl Default for RegionAttributes {
    fn default() -> Self {
        Self {
            max_objects: DEFAULT_MAX_OBJECTS,
            disk_usage: DiskUsagePattern::Update,
            max_memory_idle: None,
        }
    }
}

/// Expiration and spooling policy attached to each element.
///
/// `None` lifetimes never expire. Eternal elements ignore both lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementAttributes {
    pub eternal: bool,
    pub max_life: Option<Duration>,
    pub idle_time: Option<Duration>,
    /// Whether the element may be written to auxiliary caches
    pub spool: bool,
}

impl ElementAttributes {
    pub fn with_max_life(mut self, max_life: Duration) -> Self {
        self.max_life = Some(max_life);
        self
    }

    pub fn with_idle_time(mut self, idle_time: Duration) -> Self {
        self.idle_time = Some(idle_time);
        self
    }

    pub fn eternal(mut self) -> Self {
        self.eternal = true;
        self
    }

    pub fn memory_only(mut self) -> Self {
        self.spool = false;
        self
    }
}

impl Default for ElementAttributes {
    fn default() -> Self {
        Self {
            eternal: false,
            max_life: None,
            idle_time: None,
            spool: true,
        }
    }
}

/// Engine-wide defaults.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Used when a region is requested without explicit attributes
    pub default_region: RegionAttributes,
    /// Attached to puts that carry no attributes of their own
    pub default_element: ElementAttributes,
    pub use_memory_shrinker: bool,
    pub shrinker_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_region: RegionAttributes::default(),
            default_element: ElementAttributes::default(),
            use_memory_shrinker: true,
            shrinker_interval: DEFAULT_SHRINKER_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_defaults_are_not_eternal_and_spool() {
        let attrs = ElementAttributes::default();
        assert!(!attrs.eternal);
        assert!(attrs.spool);
        assert!(attrs.max_life.is_none());
        assert!(attrs.idle_time.is_none());
    }

    #[test]
    fn test_region_defaults() {
        let attrs = RegionAttributes::default();
        assert_eq!(attrs.max_objects, 1000);
        assert_eq!(attrs.disk_usage, DiskUsagePattern::Update);
    }

    #[test]
    fn test_region_builder() {
        let attrs = RegionAttributes::new(5)
            .with_disk_usage(DiskUsagePattern::Swap)
            .with_max_memory_idle(Duration::from_secs(60));
        assert_eq!(attrs.max_objects, 5);
        assert_eq!(attrs.disk_usage, DiskUsagePattern::Swap);
        assert_eq!(attrs.max_memory_idle, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert!(config.use_memory_shrinker);
        assert_eq!(config.shrinker_interval, Duration::from_secs(30));
    }
}
