//! Helpers shared by the cache subcommands.

use regioncache::config::{config_file_path, ConfigFile};
use regioncache::manager::{scan_region_files, RegionFiles, CACHE_ROOT_DIR};
use std::path::{Path, PathBuf};

use crate::error::CliError;

/// Load `path`, or the default config file.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_file_path);
    Ok(ConfigFile::load_from(&path)?)
}

/// `[logging] file` of the config, if it loads.
///
/// An unreadable config is reported by the command itself, not here.
pub fn configured_log_file(path: Option<&Path>) -> Option<PathBuf> {
    load_config(path).ok().map(|config| config.logging.file)
}

/// Directories a command works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLocation {
    /// `<cache directory>/jcs`, where the lock file lives
    pub root: PathBuf,
    /// Where region files are searched
    pub region_dir: PathBuf,
}

impl CacheLocation {
    /// `--path` overrides the region directory; it defaults to the
    /// configured cache directory.
    pub fn resolve(config: &ConfigFile, path: Option<PathBuf>) -> Self {
        let directory = &config.cache.directory;
        Self {
            root: directory.join(CACHE_ROOT_DIR),
            region_dir: path.unwrap_or_else(|| directory.clone()),
        }
    }

    pub fn scan(&self) -> Result<Vec<RegionFiles>, CliError> {
        scan_region_files(&self.region_dir).map_err(|error| CliError::Io {
            path: self.region_dir.clone(),
            error,
        })
    }
}
