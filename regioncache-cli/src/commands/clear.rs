//! `regioncache clear`: delete region files while no process uses them.

use regioncache::log::{Logger, TracingLogger};
use regioncache::manager::{delete_cache_files, is_locked};
use std::sync::Arc;

use super::common::CacheLocation;
use crate::error::CliError;

/// What a clear removed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ClearResult {
    pub regions: usize,
    pub files_deleted: usize,
    pub bytes_freed: u64,
}

/// Delete the files of `region` (both formats) or of every region.
///
/// Refuses while the cache lock is held.
pub fn clear_regions(
    location: &CacheLocation,
    region: Option<&str>,
    logger: &Arc<dyn Logger>,
) -> Result<ClearResult, CliError> {
    if is_locked(&location.root) {
        return Err(CliError::CacheLocked(location.root.clone()));
    }

    let targets: Vec<_> = location
        .scan()?
        .into_iter()
        .filter(|files| region.map_or(true, |name| files.region == name))
        .collect();

    if let Some(name) = region {
        if targets.is_empty() {
            return Err(CliError::RegionNotFound {
                region: name.to_string(),
                path: location.region_dir.clone(),
            });
        }
    }

    let mut result = ClearResult::default();
    for files in &targets {
        let deleted = delete_cache_files(&files.stem(), logger);
        if deleted > 0 {
            result.regions += 1;
            result.files_deleted += deleted;
            result.bytes_freed += files.total_bytes();
        }
    }
    Ok(result)
}

pub fn run(location: CacheLocation, region: Option<String>) -> Result<(), CliError> {
    let logger: Arc<dyn Logger> = Arc::new(TracingLogger);
    match &region {
        Some(name) => println!(
            "Clearing region '{}' under: {}",
            name,
            location.region_dir.display()
        ),
        None => println!("Clearing all regions under: {}", location.region_dir.display()),
    }

    let result = clear_regions(&location, region.as_deref(), &logger)?;
    tracing::info!(
        dir = %location.region_dir.display(),
        region = region.as_deref().unwrap_or("*"),
        files = result.files_deleted,
        bytes = result.bytes_freed,
        "cleared region files"
    );
    println!(
        "Deleted {} files from {} region(s), freed {}",
        result.files_deleted,
        result.regions,
        regioncache::config::format_size(result.bytes_freed)
    );
    Ok(())
}
