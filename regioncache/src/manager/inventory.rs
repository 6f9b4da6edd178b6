//! Discovery of region files on disk, for tools that inspect or clear a
//! cache without opening it.

use crate::manager::attributes::DiskFormat;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The `.data` / `.key` pair of one region in one format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionFiles {
    pub directory: PathBuf,
    pub region: String,
    pub format: DiskFormat,
    pub data_bytes: Option<u64>,
    pub key_bytes: Option<u64>,
}

impl RegionFiles {
    /// `<directory>/<region><suffix>`, without extension.
    pub fn stem(&self) -> PathBuf {
        self.directory.join(self.format.disk_name(&self.region))
    }

    pub fn total_bytes(&self) -> u64 {
        self.data_bytes.unwrap_or(0) + self.key_bytes.unwrap_or(0)
    }

    /// Only one of the two files exists.
    pub fn is_incomplete(&self) -> bool {
        self.data_bytes.is_none() || self.key_bytes.is_none()
    }
}

/// Split `<region><suffix>.<ext>` into its parts.
fn parse_file_name(name: &str) -> Option<(&str, DiskFormat, bool)> {
    let (stem, is_data) = if let Some(stem) = name.strip_suffix(".data") {
        (stem, true)
    } else {
        (name.strip_suffix(".key")?, false)
    };
    DiskFormat::all().into_iter().find_map(|format| {
        stem.strip_suffix(format.suffix())
            .filter(|region| !region.is_empty())
            .map(|region| (region, format, is_data))
    })
}

/// Every region file under `dir`, recursively, sorted by directory, region,
/// and format. A missing `dir` yields an empty list.
pub fn scan_region_files(dir: &Path) -> io::Result<Vec<RegionFiles>> {
    let mut found = BTreeMap::new();
    if dir.is_dir() {
        scan_directory(dir, &mut found)?;
    }
    Ok(found.into_values().collect())
}

type ScanKey = (PathBuf, String, &'static str);

fn scan_directory(dir: &Path, found: &mut BTreeMap<ScanKey, RegionFiles>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            scan_directory(&path, found)?;
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some((region, format, is_data)) = parse_file_name(name) else {
            continue;
        };
        let len = entry.metadata()?.len();

        let files = found
            .entry((dir.to_path_buf(), region.to_string(), format.suffix()))
            .or_insert_with(|| RegionFiles {
                directory: dir.to_path_buf(),
                region: region.to_string(),
                format,
                data_bytes: None,
                key_bytes: None,
            });
        if is_data {
            files.data_bytes = Some(len);
        } else {
            files.key_bytes = Some(len);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_file_name() {
        assert_eq!(
            parse_file_name("TMS_BLOCK_v2.data"),
            Some(("TMS", DiskFormat::Block, true))
        );
        assert_eq!(
            parse_file_name("geo_names_INDEX_v2.key"),
            Some(("geo_names", DiskFormat::Index, false))
        );
        assert_eq!(parse_file_name("_BLOCK_v2.key"), None);
        assert_eq!(parse_file_name("TMS.data"), None);
        assert_eq!(parse_file_name(".lock"), None);
    }

    #[test]
    fn test_scan_groups_pairs_recursively() {
        let temp = TempDir::new().unwrap();
        let tiles = temp.path().join("tiles");
        fs::create_dir_all(&tiles).unwrap();
        fs::write(tiles.join("TMS_BLOCK_v2.data"), vec![0u8; 4096]).unwrap();
        fs::write(tiles.join("TMS_BLOCK_v2.key"), vec![0u8; 10]).unwrap();
        fs::write(temp.path().join("WMS_INDEX_v2.data"), vec![0u8; 5]).unwrap();
        fs::write(temp.path().join("notes.txt"), b"x").unwrap();

        let files = scan_region_files(temp.path()).unwrap();
        assert_eq!(files.len(), 2);

        let tms = files.iter().find(|f| f.region == "TMS").unwrap();
        assert_eq!(tms.format, DiskFormat::Block);
        assert_eq!(tms.total_bytes(), 4106);
        assert!(!tms.is_incomplete());
        assert_eq!(tms.stem(), tiles.join("TMS_BLOCK_v2"));

        let wms = files.iter().find(|f| f.region == "WMS").unwrap();
        assert!(wms.is_incomplete());
    }

    #[test]
    fn test_scan_missing_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(scan_region_files(&temp.path().join("absent")).unwrap().is_empty());
    }
}
