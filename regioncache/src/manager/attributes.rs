//! Translation of region sizing into engine attributes.

use crate::engine::{
    DiskCacheAttributes, DiskLimitType, DiskTierDescriptor, DiskUsagePattern, RegionAttributes,
    DEFAULT_BLOCK_SIZE_BYTES,
};
use crate::log::Logger;
use crate::log_warn;
use crate::manager::error::ProvisionError;
use crate::manager::reaper::remove_stale_files;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// On-disk format, chosen once per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskFormat {
    Block,
    Index,
}

impl DiskFormat {
    pub fn from_use_block_cache(use_block_cache: bool) -> Self {
        if use_block_cache {
            DiskFormat::Block
        } else {
            DiskFormat::Index
        }
    }

    /// Appended to the region name to form the file stem.
    pub fn suffix(self) -> &'static str {
        match self {
            DiskFormat::Block => "_BLOCK_v2",
            DiskFormat::Index => "_INDEX_v2",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            DiskFormat::Block => DiskFormat::Index,
            DiskFormat::Index => DiskFormat::Block,
        }
    }

    /// File stem for `region_name` in this format.
    pub fn disk_name(self, region_name: &str) -> String {
        format!("{}{}", region_name, self.suffix())
    }

    pub fn all() -> [DiskFormat; 2] {
        [DiskFormat::Block, DiskFormat::Index]
    }
}

impl fmt::Display for DiskFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskFormat::Block => write!(f, "block"),
            DiskFormat::Index => write!(f, "index"),
        }
    }
}

/// Memory tier attributes: `max_objects` elements, written through to disk
/// on every put.
pub fn memory_attributes(max_objects: usize) -> RegionAttributes {
    RegionAttributes::new(max_objects).with_disk_usage(DiskUsagePattern::Update)
}

/// Disk tier descriptor for `region_name` under `cache_path`.
///
/// Removes files of the other format for the same region first. Block
/// capacity is raised to the size of an existing data file, since block
/// files never shrink. If `cache_path` cannot be created the descriptor has
/// no disk path and the engine will refuse it.
pub fn build_disk_attributes(
    format: DiskFormat,
    max_disk_kb: usize,
    cache_path: &Path,
    region_name: &str,
    logger: &Arc<dyn Logger>,
) -> Result<DiskTierDescriptor, ProvisionError> {
    if region_name.contains(['/', '\\']) || region_name == "." || region_name == ".." {
        return Err(ProvisionError::UnsafeRegionName(region_name.to_string()));
    }

    remove_stale_files(
        &cache_path.join(region_name),
        format.opposite().suffix(),
        logger,
    );

    let disk_name = format.disk_name(region_name);
    let mut common = DiskCacheAttributes {
        disk_limit_type: DiskLimitType::Size,
        ..DiskCacheAttributes::new(disk_name.clone())
    };

    let mut descriptor = match format {
        DiskFormat::Block => {
            let existing_kb = fs::metadata(cache_path.join(format!("{}.data", disk_name)))
                .map(|m| (m.len() / 1024) as usize)
                .unwrap_or(0);
            common.max_key_size = max_disk_kb.max(existing_kb);
            if common.max_key_size > max_disk_kb {
                log_warn!(
                    logger,
                    "Disk cache {} is {} KB, larger than the configured {} KB; using the whole file",
                    disk_name,
                    common.max_key_size,
                    max_disk_kb
                );
            }
            DiskTierDescriptor::Block {
                common,
                block_size_bytes: DEFAULT_BLOCK_SIZE_BYTES,
            }
        }
        DiskFormat::Index => {
            common.max_key_size = max_disk_kb;
            DiskTierDescriptor::Indexed { common }
        }
    };

    match fs::create_dir_all(cache_path) {
        Ok(()) => descriptor.common_mut().disk_path = Some(cache_path.to_path_buf()),
        Err(e) => {
            log_warn!(logger, "Failed to create cache path {}: {}", cache_path.display(), e);
        }
    }

    Ok(descriptor)
}
