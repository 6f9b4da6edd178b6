//! Settings structs for each `[section]` of config.ini.

use std::path::PathBuf;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub logging: LoggingSettings,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Base cache directory; the lock lives in `<directory>/jcs`
    pub directory: PathBuf,
    /// Block disk format when true, indexed when false
    pub use_block_cache: bool,
    /// Memory size of regions created without explicit sizing
    pub max_objects_in_memory: usize,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
