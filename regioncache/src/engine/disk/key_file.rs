//! `.key` index files shared by both disk formats.
//!
//! A key file is a bincode blob: a magic number followed by
//! `(key, locator)` pairs in least-recently-used-first order, so that
//! replaying them into an LRU restores recency.

use crate::engine::error::EngineError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

const KEY_FILE_MAGIC: u32 = 0x5243_4B32;

#[derive(Serialize)]
struct KeyFileRef<'a, D> {
    magic: u32,
    entries: &'a [(Vec<u8>, D)],
}

#[derive(Deserialize)]
struct KeyFile<D> {
    magic: u32,
    entries: Vec<(Vec<u8>, D)>,
}

/// Read a key file. `Ok(None)` when the file is absent or empty.
pub(super) fn read_keys<D: DeserializeOwned>(
    path: &Path,
    cache_name: &str,
) -> Result<Option<Vec<(Vec<u8>, D)>>, EngineError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if bytes.is_empty() {
        return Ok(None);
    }

    let file: KeyFile<D> = bincode::deserialize(&bytes)
        .map_err(|e| EngineError::corrupt(cache_name, format!("unreadable key file: {}", e)))?;
    if file.magic != KEY_FILE_MAGIC {
        return Err(EngineError::corrupt(cache_name, "key file magic mismatch"));
    }
    Ok(Some(file.entries))
}

pub(super) fn write_keys<D: Serialize>(
    path: &Path,
    entries: &[(Vec<u8>, D)],
) -> Result<(), EngineError> {
    let bytes = bincode::serialize(&KeyFileRef {
        magic: KEY_FILE_MAGIC,
        entries,
    })?;
    fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_and_empty_key_files() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("r.key");

        assert!(read_keys::<u64>(&path, "r").unwrap().is_none());

        fs::write(&path, b"").unwrap();
        assert!(read_keys::<u64>(&path, "r").unwrap().is_none());
    }

    #[test]
    fn test_write_then_read_preserves_order() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("r.key");
        let entries = vec![(b"a".to_vec(), 1u64), (b"b".to_vec(), 2u64)];

        write_keys(&path, &entries).unwrap();
        assert_eq!(read_keys::<u64>(&path, "r").unwrap(), Some(entries));
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("r.key");
        fs::write(&path, [1u8, 2, 3]).unwrap();

        let err = read_keys::<u64>(&path, "r").unwrap_err();
        assert!(matches!(err, EngineError::Corrupt { .. }));
    }
}
