//! Removal of region files left behind by the other disk format.

use crate::log::Logger;
use crate::{log_debug, log_warn};
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Delete `<base><suffix>.key` and `<base><suffix>.data`.
///
/// `base` is `<cache path>/<region name>`; `suffix` is the format that is
/// *not* in use.
pub fn remove_stale_files(base: &Path, suffix: &str, logger: &Arc<dyn Logger>) {
    delete_cache_files(&with_suffix(base, suffix), logger);
}

/// Delete `<stem>.key` and `<stem>.data`. Returns how many files went away.
///
/// Missing files are fine; other failures are logged and skipped.
pub fn delete_cache_files(stem: &Path, logger: &Arc<dyn Logger>) -> usize {
    let mut deleted = 0;
    for extension in [".key", ".data"] {
        let path = with_suffix(stem, extension);
        match fs::remove_file(&path) {
            Ok(()) => {
                log_debug!(logger, "Deleted stale cache file {}", path.display());
                deleted += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                log_warn!(logger, "Could not delete {}: {}", path.display(), e);
            }
        }
    }
    deleted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::NoOpLogger;
    use tempfile::TempDir;

    fn logger() -> Arc<dyn Logger> {
        Arc::new(NoOpLogger)
    }

    #[test]
    fn test_reaper_removes_only_foreign_format() {
        let temp = TempDir::new().unwrap();
        for name in [
            "TMS_INDEX_v2.key",
            "TMS_INDEX_v2.data",
            "TMS_BLOCK_v2.key",
            "TMS_BLOCK_v2.data",
        ] {
            fs::write(temp.path().join(name), b"x").unwrap();
        }

        remove_stale_files(&temp.path().join("TMS"), "_INDEX_v2", &logger());

        assert!(!temp.path().join("TMS_INDEX_v2.key").exists());
        assert!(!temp.path().join("TMS_INDEX_v2.data").exists());
        assert!(temp.path().join("TMS_BLOCK_v2.key").exists());
        assert!(temp.path().join("TMS_BLOCK_v2.data").exists());
    }

    #[test]
    fn test_reaper_missing_files_are_fine() {
        let temp = TempDir::new().unwrap();
        assert_eq!(delete_cache_files(&temp.path().join("nothing"), &logger()), 0);
    }

    #[test]
    fn test_reaper_counts_deleted_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("r.data"), b"x").unwrap();
        assert_eq!(delete_cache_files(&temp.path().join("r"), &logger()), 1);
    }
}
