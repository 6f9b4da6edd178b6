//! Provisioning errors. These never leave the manager: every one of them
//! degrades a region to memory-only.

use crate::engine::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The region name cannot be used as a file stem
    #[error("Region name '{0}' cannot be used as a disk file name")]
    UnsafeRegionName(String),

    /// The engine refused to create or attach the disk cache
    #[error("Disk cache setup failed: {0}")]
    Engine(#[from] EngineError),
}
