//! Disk-backed auxiliary caches.
//!
//! Two mutually incompatible file formats are offered, each storing a
//! region in `<name>.data` plus a `<name>.key` index:
//!
//! - [`BlockDiskCache`]: the data file is an array of fixed-size blocks and
//!   is never truncated when the cache shrinks
//! - [`IndexedDiskCache`]: length-prefixed records appended to the data
//!   file, with freed slots recycled and the file compacted on dispose

mod block;
mod indexed;
mod key_file;

pub use block::BlockDiskCache;
pub use indexed::IndexedDiskCache;

use crate::engine::auxiliary::{AuxiliaryCache, AuxiliaryCacheFactory};
use crate::engine::error::EngineError;
use crate::engine::log::EngineLog;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Block size used unless a descriptor says otherwise.
pub const DEFAULT_BLOCK_SIZE_BYTES: usize = 4096;

/// Smallest block that still fits a length header and some payload.
pub const MIN_BLOCK_SIZE_BYTES: usize = 64;

/// How the `max_key_size` ceiling is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiskLimitType {
    /// Number of stored elements
    Count,
    /// Kilobytes of stored data
    #[default]
    Size,
}

/// Settings shared by both disk formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskCacheAttributes {
    /// File stem on disk, including the format suffix
    pub cache_name: String,
    /// Directory holding the files; a cache cannot be opened without one
    pub disk_path: Option<PathBuf>,
    /// Ceiling in units of `disk_limit_type`; 0 is unbounded
    pub max_key_size: usize,
    pub disk_limit_type: DiskLimitType,
}

impl DiskCacheAttributes {
    pub fn new(cache_name: impl Into<String>) -> Self {
        Self {
            cache_name: cache_name.into(),
            disk_path: None,
            max_key_size: 0,
            disk_limit_type: DiskLimitType::default(),
        }
    }

    pub fn data_file(&self) -> Option<PathBuf> {
        self.disk_path
            .as_deref()
            .map(|dir| data_file_path(dir, &self.cache_name))
    }

    pub fn key_file(&self) -> Option<PathBuf> {
        self.disk_path
            .as_deref()
            .map(|dir| key_file_path(dir, &self.cache_name))
    }
}

/// Disk tier configuration for one region, in one of the two formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskTierDescriptor {
    Block {
        common: DiskCacheAttributes,
        block_size_bytes: usize,
    },
    Indexed {
        common: DiskCacheAttributes,
    },
}

impl DiskTierDescriptor {
    pub fn common(&self) -> &DiskCacheAttributes {
        match self {
            DiskTierDescriptor::Block { common, .. } => common,
            DiskTierDescriptor::Indexed { common } => common,
        }
    }

    pub fn common_mut(&mut self) -> &mut DiskCacheAttributes {
        match self {
            DiskTierDescriptor::Block { common, .. } => common,
            DiskTierDescriptor::Indexed { common } => common,
        }
    }

    pub fn format_name(&self) -> &'static str {
        match self {
            DiskTierDescriptor::Block { .. } => "block",
            DiskTierDescriptor::Indexed { .. } => "indexed",
        }
    }

    pub fn cache_name(&self) -> &str {
        &self.common().cache_name
    }

    pub fn max_key_size(&self) -> usize {
        self.common().max_key_size
    }

    pub fn disk_path(&self) -> Option<&Path> {
        self.common().disk_path.as_deref()
    }
}

/// `<dir>/<name>.data`
pub fn data_file_path(dir: &Path, cache_name: &str) -> PathBuf {
    dir.join(format!("{}.data", cache_name))
}

/// `<dir>/<name>.key`
pub fn key_file_path(dir: &Path, cache_name: &str) -> PathBuf {
    dir.join(format!("{}.key", cache_name))
}

/// Creates [`BlockDiskCache`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockDiskCacheFactory;

impl AuxiliaryCacheFactory for BlockDiskCacheFactory {
    fn name(&self) -> &'static str {
        "BlockDiskCacheFactory"
    }

    fn create_cache(
        &self,
        descriptor: &DiskTierDescriptor,
        log: Arc<dyn EngineLog>,
    ) -> Result<Arc<dyn AuxiliaryCache>, EngineError> {
        match descriptor {
            DiskTierDescriptor::Block {
                common,
                block_size_bytes,
            } => Ok(Arc::new(BlockDiskCache::open(
                common,
                *block_size_bytes,
                log,
            )?)),
            other => Err(EngineError::AttributeMismatch {
                factory: self.name(),
                descriptor: other.format_name(),
            }),
        }
    }
}

/// Creates [`IndexedDiskCache`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexedDiskCacheFactory;

impl AuxiliaryCacheFactory for IndexedDiskCacheFactory {
    fn name(&self) -> &'static str {
        "IndexedDiskCacheFactory"
    }

    fn create_cache(
        &self,
        descriptor: &DiskTierDescriptor,
        log: Arc<dyn EngineLog>,
    ) -> Result<Arc<dyn AuxiliaryCache>, EngineError> {
        match descriptor {
            DiskTierDescriptor::Indexed { common } => {
                Ok(Arc::new(IndexedDiskCache::open(common, log)?))
            }
            other => Err(EngineError::AttributeMismatch {
                factory: self.name(),
                descriptor: other.format_name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::log::SilentEngineLog;
    use tempfile::TempDir;

    fn common(dir: &Path, name: &str) -> DiskCacheAttributes {
        DiskCacheAttributes {
            disk_path: Some(dir.to_path_buf()),
            max_key_size: 1024,
            ..DiskCacheAttributes::new(name)
        }
    }

    #[test]
    fn test_file_paths() {
        let attrs = common(Path::new("/tmp/tiles"), "TMS_BLOCK_v2");
        assert_eq!(
            attrs.data_file(),
            Some(PathBuf::from("/tmp/tiles/TMS_BLOCK_v2.data"))
        );
        assert_eq!(
            attrs.key_file(),
            Some(PathBuf::from("/tmp/tiles/TMS_BLOCK_v2.key"))
        );
        assert_eq!(DiskCacheAttributes::new("x").data_file(), None);
    }

    #[test]
    fn test_block_factory_rejects_indexed_descriptor() {
        let temp = TempDir::new().unwrap();
        let descriptor = DiskTierDescriptor::Indexed {
            common: common(temp.path(), "r_INDEX_v2"),
        };
        let err = BlockDiskCacheFactory
            .create_cache(&descriptor, Arc::new(SilentEngineLog))
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::AttributeMismatch { .. }));
    }

    #[test]
    fn test_factories_create_matching_caches() {
        let temp = TempDir::new().unwrap();

        let block = DiskTierDescriptor::Block {
            common: common(temp.path(), "r_BLOCK_v2"),
            block_size_bytes: DEFAULT_BLOCK_SIZE_BYTES,
        };
        let cache = BlockDiskCacheFactory
            .create_cache(&block, Arc::new(SilentEngineLog))
            .unwrap();
        assert_eq!(cache.name(), "r_BLOCK_v2");

        let indexed = DiskTierDescriptor::Indexed {
            common: common(temp.path(), "r_INDEX_v2"),
        };
        let cache = IndexedDiskCacheFactory
            .create_cache(&indexed, Arc::new(SilentEngineLog))
            .unwrap();
        assert_eq!(cache.name(), "r_INDEX_v2");

        assert!(temp.path().join("r_BLOCK_v2.data").exists());
        assert!(temp.path().join("r_INDEX_v2.key").exists());
    }

    #[test]
    fn test_missing_disk_path_is_an_error() {
        let descriptor = DiskTierDescriptor::Indexed {
            common: DiskCacheAttributes::new("nowhere_INDEX_v2"),
        };
        let err = IndexedDiskCacheFactory
            .create_cache(&descriptor, Arc::new(SilentEngineLog))
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::MissingDiskPath(_)));
    }
}
