//! CLI error handling with user-friendly messages.

use regioncache::config::ConfigFileError;
use std::fmt;
use std::path::PathBuf;
use std::process;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Failed to read or write the config file
    Config(ConfigFileError),
    /// Another process holds the cache lock
    CacheLocked(PathBuf),
    /// Filesystem error on a cache path
    Io { path: PathBuf, error: std::io::Error },
    /// No files for the named region
    RegionNotFound { region: String, path: PathBuf },
}

impl CliError {
    /// Exit the process with an error message and code 1.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::CacheLocked(root) = self {
            eprintln!();
            eprintln!("Close the application using the cache, or remove the stale");
            eprintln!("lock holder, then retry. Lock file: {}", root.display());
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::CacheLocked(root) => {
                write!(f, "Cache at '{}' is in use by another process", root.display())
            }
            CliError::Io { path, error } => write!(f, "'{}': {}", path.display(), error),
            CliError::RegionNotFound { region, path } => {
                write!(
                    f,
                    "No cache files for region '{}' under '{}'",
                    region,
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Io { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}
