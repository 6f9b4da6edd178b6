//! Secondary stores attached behind a region's memory tier.

use crate::engine::disk::DiskTierDescriptor;
use crate::engine::element::CacheElement;
use crate::engine::error::EngineError;
use crate::engine::log::EngineLog;
use std::sync::Arc;

/// Which implementation backs an auxiliary cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxiliaryKind {
    BlockDisk,
    IndexedDisk,
}

impl std::fmt::Display for AuxiliaryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuxiliaryKind::BlockDisk => write!(f, "block disk"),
            AuxiliaryKind::IndexedDisk => write!(f, "indexed disk"),
        }
    }
}

/// Point-in-time view of an auxiliary cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryStats {
    pub name: String,
    pub kind: AuxiliaryKind,
    pub entries: usize,
    /// Bytes occupied by the data file
    pub data_file_bytes: u64,
    /// Configured ceiling; 0 is unbounded
    pub capacity: usize,
    pub evictions: u64,
    pub disposed: bool,
}

/// A secondary store for a region.
///
/// Implementations must tolerate calls after `dispose`: reads miss and
/// writes are dropped.
pub trait AuxiliaryCache: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> AuxiliaryKind;

    fn get(&self, key: &[u8]) -> Result<Option<CacheElement>, EngineError>;

    /// Insert or replace an element.
    fn update(&self, element: &CacheElement) -> Result<(), EngineError>;

    /// Returns whether the key was present.
    fn remove(&self, key: &[u8]) -> Result<bool, EngineError>;

    fn remove_all(&self) -> Result<(), EngineError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stats(&self) -> AuxiliaryStats;

    /// Persist indexes and release file handles. Idempotent.
    fn dispose(&self) -> Result<(), EngineError>;
}

/// Builds auxiliary caches from disk tier descriptors.
pub trait AuxiliaryCacheFactory: Send + Sync {
    fn name(&self) -> &'static str;

    fn create_cache(
        &self,
        descriptor: &DiskTierDescriptor,
        log: Arc<dyn EngineLog>,
    ) -> Result<Arc<dyn AuxiliaryCache>, EngineError>;
}
