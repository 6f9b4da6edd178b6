//! `regioncache config`: locate, print, and create the config file.

use clap::Subcommand;
use regioncache::config::{config_file_path, ConfigFile};
use std::path::{Path, PathBuf};

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the config file path
    Path,
    /// Print the effective configuration
    Show,
    /// Write a default config file if none exists
    Init,
}

pub fn run(action: ConfigAction, config_path: Option<PathBuf>) -> Result<(), CliError> {
    let path = config_path.unwrap_or_else(config_file_path);

    match action {
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Show => print!("{}", show(&path)?),
        ConfigAction::Init => {
            if ConfigFile::ensure_exists_at(&path)? {
                println!("Created {}", path.display());
            } else {
                println!("Config file already exists: {}", path.display());
            }
        }
    }
    Ok(())
}

fn show(path: &Path) -> Result<String, CliError> {
    let config = ConfigFile::load_from(path)?;
    let source = if path.exists() {
        path.display().to_string()
    } else {
        "defaults (no config file)".to_string()
    };

    Ok(format!(
        "# {}\n\
         [cache]\n\
         directory = {}\n\
         use_block_cache = {}\n\
         max_objects_in_memory = {}\n\
         \n\
         [logging]\n\
         file = {}\n",
        source,
        config.cache.directory.display(),
        config.cache.use_block_cache,
        config.cache.max_objects_in_memory,
        config.logging.file.display(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_show_defaults_without_file() {
        let temp = TempDir::new().unwrap();
        let text = show(&temp.path().join("config.ini")).unwrap();
        assert!(text.starts_with("# defaults (no config file)"));
        assert!(text.contains("use_block_cache = true"));
    }

    #[test]
    fn test_show_reads_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(
            &path,
            "[cache]\ndirectory = /data/cache\nuse_block_cache = false\n",
        )
        .unwrap();

        let text = show(&path).unwrap();
        assert!(text.contains("directory = /data/cache"));
        assert!(text.contains("use_block_cache = false"));
    }

    #[test]
    fn test_show_invalid_value_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(&path, "[cache]\nmax_objects_in_memory = lots\n").unwrap();

        assert!(matches!(show(&path), Err(CliError::Config(_))));
    }

    #[test]
    fn test_init_creates_once() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sub").join("config.ini");

        run(ConfigAction::Init, Some(path.clone())).unwrap();
        assert!(path.exists());
        fs::write(&path, "[cache]\nuse_block_cache = false\n").unwrap();
        run(ConfigAction::Init, Some(path.clone())).unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert!(!config.cache.use_block_cache);
    }
}
