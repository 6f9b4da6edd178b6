//! INI serialization: `ConfigFile` → commented config.ini text.

use std::path::Path;

use super::settings::ConfigFile;

/// Render a `ConfigFile` as the commented INI written to disk.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[cache]
; Base cache directory. The cross-process lock lives in <directory>/jcs/.lock
; If empty, defaults to the platform cache directory (~/.cache/regioncache on Linux)
directory = {}
; Disk format for region files (default: true)
;   true  - block files (<region>_BLOCK_v2.data/.key), never shrink on disk
;   false - indexed files (<region>_INDEX_v2.data/.key), compacted on shutdown
; Switching deletes the other format's files the next time a region is opened
use_block_cache = {}
; Objects kept in memory by regions opened without explicit sizing (default: 1000)
max_objects_in_memory = {}

[logging]
; Log file path (default: <config directory>/regioncache.log)
file = {}
"#,
        path_to_string(&config.cache.directory),
        config.cache.use_block_cache,
        config.cache.max_objects_in_memory,
        path_to_string(&config.logging.file),
    )
}

/// Display a path, abbreviating the home directory to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
