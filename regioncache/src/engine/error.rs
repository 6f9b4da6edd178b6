//! Engine error type.

use thiserror::Error;

/// Errors raised inside the embedded cache engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// I/O error on a disk cache file
    #[error("Cache engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Element or key file could not be encoded or decoded
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Region names must be non-empty and free of control characters
    #[error("Invalid region name '{0}'")]
    InvalidRegionName(String),

    /// The engine was shut down; no new regions can be created
    #[error("Cache engine has been shut down")]
    ShutDown,

    /// The region was disposed during shutdown
    #[error("Cache region '{0}' has been disposed")]
    Disposed(String),

    /// A disk cache was requested without a directory to live in
    #[error("Disk cache '{0}' has no disk path configured")]
    MissingDiskPath(String),

    /// A factory was handed attributes for the other disk strategy
    #[error("{factory} cannot create a cache from {descriptor} attributes")]
    AttributeMismatch {
        factory: &'static str,
        descriptor: &'static str,
    },

    /// A single element does not fit the on-disk record format
    #[error("Element of {size} bytes exceeds the disk record limit")]
    ElementTooLarge { size: usize },

    /// On-disk structures are inconsistent
    #[error("Corrupt disk cache '{name}': {reason}")]
    Corrupt { name: String, reason: String },
}

impl EngineError {
    pub(crate) fn corrupt(name: &str, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
