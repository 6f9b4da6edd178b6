//! Logging initialisation for applications embedding the cache.
//!
//! Library code never installs a subscriber; it logs through
//! [`crate::log::Logger`]. Hosts pick one of:
//! - [`init_logging`]: file (cleared on start) plus stdout
//! - [`init_console_logging`]: stderr for command-line tools, plus an
//!   optional log file that is appended to
//!
//! Both honour `RUST_LOG`. The log file normally comes from the
//! `[logging] file` setting of [`crate::config::ConfigFile`].

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Level recorded in the log file of command-line tools.
const CONSOLE_FILE_LEVEL: &str = "info";

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Log to `log_path` and stdout.
///
/// Creates the parent directory if needed and clears the previous file.
///
/// # Errors
///
/// Returns error if the directory cannot be created or the file cleared.
pub fn init_logging(log_path: &Path) -> Result<LoggingGuard, io::Error> {
    let (log_dir, log_file) = split_log_path(log_path)?;
    fs::create_dir_all(log_dir)?;
    fs::write(log_path, "")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true)
        .compact();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Log to stderr at `warn`, or `debug` when `verbose`, and append `info`
/// and above to `log_file` when given.
///
/// If a global subscriber is already installed nothing changes. The
/// returned guard, if any, must be kept alive to flush the file.
///
/// # Errors
///
/// Returns error if the log file cannot be opened for appending; nothing
/// is installed in that case.
pub fn init_console_logging(
    verbose: bool,
    log_file: Option<&Path>,
) -> Result<Option<LoggingGuard>, io::Error> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (log_dir, file_name) = prepare_append(path)?;
            let appender = tracing_appender::rolling::never(log_dir, file_name);
            let (non_blocking_file, file_guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_filter(EnvFilter::new(CONSOLE_FILE_LEVEL));
            (
                Some(layer),
                Some(LoggingGuard {
                    _file_guard: file_guard,
                }),
            )
        }
        None => (None, None),
    };

    let default_level = if verbose { "debug" } else { "warn" };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .with_filter(console_filter);

    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init();
    Ok(guard)
}

/// Create the parent directory and check `log_path` opens for appending.
fn prepare_append(log_path: &Path) -> Result<(&Path, &std::ffi::OsStr), io::Error> {
    let (log_dir, file_name) = split_log_path(log_path)?;
    fs::create_dir_all(log_dir)?;
    OpenOptions::new().create(true).append(true).open(log_path)?;
    Ok((log_dir, file_name))
}

fn split_log_path(log_path: &Path) -> Result<(&Path, &std::ffi::OsStr), io::Error> {
    let file = log_path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("log path {} has no file name", log_path.display()),
        )
    })?;
    let dir = match log_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok((dir, file))
}
