//! Cross-process advisory lock on the cache root.

use crate::log::Logger;
use crate::{log_debug, log_warn};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the lock file inside the cache root.
pub const LOCK_FILE_NAME: &str = ".lock";

/// An exclusive lock on `<root>/.lock`.
///
/// The lock is released when the token is dropped.
#[derive(Debug)]
pub struct DiskLock {
    path: PathBuf,
    _file: File,
}

impl DiskLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Try once to take the disk lock under `root`.
///
/// Creates `root` and the lock file if needed. Every failure is logged as a
/// warning and yields `None`; the caller then runs without a disk tier.
pub fn acquire_disk_lock(root: &Path, logger: &Arc<dyn Logger>) -> Option<DiskLock> {
    if let Err(e) = fs::create_dir_all(root) {
        log_warn!(
            logger,
            "Cache directory {} does not exist and could not be created: {}",
            root.display(),
            e
        );
        return None;
    }

    let path = root.join(LOCK_FILE_NAME);
    let file = match OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
    {
        Ok(file) => file,
        Err(e) => {
            log_warn!(logger, "Cannot create cache lock file {}: {}", path.display(), e);
            log_warn!(logger, "Will not use disk cache");
            return None;
        }
    };

    match file.try_lock_exclusive() {
        Ok(()) => {
            log_debug!(logger, "Acquired cache lock {}", path.display());
            Some(DiskLock { path, _file: file })
        }
        Err(e) if e.kind() == ErrorKind::WouldBlock => {
            log_warn!(
                logger,
                "Cannot lock cache directory {}, another instance holds it. Will not use disk cache",
                root.display()
            );
            None
        }
        Err(e) => {
            log_warn!(logger, "Failed to lock {}: {}. Will not use disk cache", path.display(), e);
            None
        }
    }
}

/// Whether some process currently holds the lock under `root`.
///
/// Used by tools that must not touch files in use. A missing lock file
/// counts as unlocked.
pub fn is_locked(root: &Path) -> bool {
    let path = root.join(LOCK_FILE_NAME);
    let Ok(file) = OpenOptions::new().write(true).open(&path) else {
        return false;
    };
    match file.try_lock_exclusive() {
        Ok(()) => {
            let _ = file.unlock();
            false
        }
        Err(_) => true,
    }
}
