//! Embedded region cache engine.
//!
//! A [`CacheEngine`] owns named [`CompositeCache`] regions. Each region
//! keeps an LRU memory tier bounded by object count and, optionally, a list
//! of [`AuxiliaryCache`]s behind it. Two disk auxiliaries are provided:
//!
//! - [`BlockDiskCache`]: fixed-size blocks, file never truncated
//! - [`IndexedDiskCache`]: length-prefixed records, compacted on dispose
//!
//! Diagnostics go to an injected [`EngineLog`].

mod attributes;
mod auxiliary;
pub mod disk;
mod element;
mod error;
mod hub;
pub(crate) mod log;
mod memory;
mod region;
mod shrinker;

pub use attributes::{
    DiskUsagePattern, ElementAttributes, EngineConfig, RegionAttributes, DEFAULT_MAX_OBJECTS,
    DEFAULT_SHRINKER_INTERVAL,
};
pub use auxiliary::{AuxiliaryCache, AuxiliaryCacheFactory, AuxiliaryKind, AuxiliaryStats};
pub use disk::{
    BlockDiskCache, BlockDiskCacheFactory, DiskCacheAttributes, DiskLimitType, DiskTierDescriptor,
    IndexedDiskCache, IndexedDiskCacheFactory, DEFAULT_BLOCK_SIZE_BYTES,
};
pub use element::CacheElement;
pub use error::EngineError;
pub use hub::CacheEngine;
pub use log::{EngineLevel, EngineLog, SilentEngineLog};
pub use region::{CompositeCache, RegionStats, ShrinkReport};
pub use shrinker::MemoryShrinker;
