//! User configuration.
//!
//! `config.ini` carries the options [`CacheManager`](crate::manager::CacheManager)
//! is initialised with, plus the log file location.
//!
//! ```
//! use regioncache::config::ConfigFile;
//! use regioncache::manager::CacheOptions;
//!
//! let config = ConfigFile::default();
//! let options = CacheOptions::from(&config);
//! assert!(options.use_block_cache);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod size;
mod writer;

pub use defaults::{
    default_cache_directory, DEFAULT_LOG_FILE_NAME, DEFAULT_MAX_OBJECTS_IN_MEMORY,
    DEFAULT_USE_BLOCK_CACHE,
};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{CacheSettings, ConfigFile, LoggingSettings};
pub use size::format_size;

use crate::manager::CacheOptions;

impl From<&ConfigFile> for CacheOptions {
    fn from(config: &ConfigFile) -> Self {
        Self {
            cache_directory: config.cache.directory.clone(),
            use_block_cache: config.cache.use_block_cache,
            default_max_objects_in_memory: config.cache.max_objects_in_memory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_options_from_config() {
        let mut config = ConfigFile::default();
        config.cache.directory = PathBuf::from("/data/cache");
        config.cache.use_block_cache = false;
        config.cache.max_objects_in_memory = 12;

        let options = CacheOptions::from(&config);
        assert_eq!(options.cache_directory, PathBuf::from("/data/cache"));
        assert!(!options.use_block_cache);
        assert_eq!(options.default_max_objects_in_memory, 12);
        assert_eq!(options.cache_root(), PathBuf::from("/data/cache/jcs"));
    }
}
