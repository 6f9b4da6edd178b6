//! regioncache CLI
//!
//! Inspects and clears regioncache directories and manages the config file.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::common::{configured_log_file, load_config, CacheLocation};
use commands::config::ConfigAction;
use error::CliError;

#[derive(Parser)]
#[command(name = "regioncache")]
#[command(version = regioncache::VERSION)]
#[command(about = "Inspect and clear regioncache directories", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/regioncache/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cache root, lock state, and region files with sizes
    Status {
        /// Directory holding region files (default: configured cache directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Delete region files; refuses while the cache is in use
    Clear {
        /// Directory holding region files (default: configured cache directory)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Only this region, in both disk formats
        region: Option<String>,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_file = configured_log_file(cli.config.as_deref());
    let _log_guard =
        match regioncache::logging::init_console_logging(cli.verbose, log_file.as_deref()) {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Warning: not writing log file: {}", e);
                regioncache::logging::init_console_logging(cli.verbose, None)
                    .ok()
                    .flatten()
            }
        };

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Status { path } => {
            let config = load_config(cli.config.as_deref())?;
            let location = CacheLocation::resolve(&config, path);
            tracing::debug!(root = %location.root.display(), "status");
            commands::status::run(location)
        }
        Commands::Clear { path, region } => {
            let config = load_config(cli.config.as_deref())?;
            let location = CacheLocation::resolve(&config, path);
            tracing::debug!(root = %location.root.display(), ?region, "clear");
            commands::clear::run(location, region)
        }
        Commands::Config { action } => commands::config::run(action, cli.config),
    }
}
