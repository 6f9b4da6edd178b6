//! Default values for every setting.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;
use crate::engine::DEFAULT_MAX_OBJECTS;

pub const DEFAULT_USE_BLOCK_CACHE: bool = true;
pub const DEFAULT_MAX_OBJECTS_IN_MEMORY: usize = DEFAULT_MAX_OBJECTS;
pub const DEFAULT_LOG_FILE_NAME: &str = "regioncache.log";

/// Platform cache directory for this library (`~/.cache/regioncache` on Linux).
pub fn default_cache_directory() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("regioncache")
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            cache: CacheSettings {
                directory: default_cache_directory(),
                use_block_cache: DEFAULT_USE_BLOCK_CACHE,
                max_objects_in_memory: DEFAULT_MAX_OBJECTS_IN_MEMORY,
            },
            logging: LoggingSettings {
                file: config_directory().join(DEFAULT_LOG_FILE_NAME),
            },
        }
    }
}
