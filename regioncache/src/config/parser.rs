//! INI parsing: `Ini` → `ConfigFile`.
//!
//! The single place where INI key names map to struct fields.

use ini::Ini;
use std::path::PathBuf;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` into a `ConfigFile`, starting from defaults.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.cache.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("use_block_cache") {
            config.cache.use_block_cache = parse_bool(v).ok_or_else(|| ConfigFileError::InvalidValue {
                section: "cache".to_string(),
                key: "use_block_cache".to_string(),
                value: v.to_string(),
                reason: "must be 'true' or 'false'".to_string(),
            })?;
        }
        if let Some(v) = section.get("max_objects_in_memory") {
            config.cache.max_objects_in_memory =
                v.trim().parse().map_err(|_| ConfigFileError::InvalidValue {
                    section: "cache".to_string(),
                    key: "max_objects_in_memory".to_string(),
                    value: v.to_string(),
                    reason: "must be a non-negative integer".to_string(),
                })?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;

    fn parse(text: &str) -> Result<ConfigFile, ConfigFileError> {
        parse_ini(&Ini::load_from_str(text).unwrap())
    }

    #[test]
    fn test_parse_empty_gives_defaults() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_parse_cache_section() {
        let config = parse(
            "[cache]\ndirectory = /srv/cache\nuse_block_cache = false\nmax_objects_in_memory = 250\n",
        )
        .unwrap();

        assert_eq!(config.cache.directory, PathBuf::from("/srv/cache"));
        assert!(!config.cache.use_block_cache);
        assert_eq!(config.cache.max_objects_in_memory, 250);
    }

    #[test]
    fn test_parse_bool_spellings() {
        assert!(parse("[cache]\nuse_block_cache = yes\n").unwrap().cache.use_block_cache);
        assert!(!parse("[cache]\nuse_block_cache = OFF\n").unwrap().cache.use_block_cache);
    }

    #[test]
    fn test_parse_empty_directory_keeps_default() {
        let config = parse("[cache]\ndirectory =\n").unwrap();
        assert_eq!(config.cache.directory, default_cache_directory());
    }

    #[test]
    fn test_parse_invalid_bool() {
        let err = parse("[cache]\nuse_block_cache = maybe\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue { section, key, value, .. } => {
                assert_eq!(section, "cache");
                assert_eq!(key, "use_block_cache");
                assert_eq!(value, "maybe");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_invalid_object_count() {
        assert!(matches!(
            parse("[cache]\nmax_objects_in_memory = -5\n"),
            Err(ConfigFileError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_parse_logging_file() {
        let config = parse("[logging]\nfile = /var/log/rc.log\n").unwrap();
        assert_eq!(config.logging.file, PathBuf::from("/var/log/rc.log"));
        assert_eq!(
            parse("").unwrap().logging.file.file_name().unwrap(),
            DEFAULT_LOG_FILE_NAME
        );
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/x"), home.join("x"));
        }
        assert_eq!(expand_tilde("/abs"), PathBuf::from("/abs"));
    }
}
