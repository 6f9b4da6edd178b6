//! Integration tests for data surviving shutdown, in both disk formats.

use proptest::prelude::*;
use regioncache::log::NoOpLogger;
use regioncache::manager::{CacheManager, CacheOptions};
use regioncache::CacheAccess;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Tile {
    zoom: u8,
    x: u32,
    y: u32,
}

fn open(temp: &TempDir, block: bool) -> CacheManager {
    CacheManager::initialize(
        CacheOptions::new(temp.path().join("cache")).with_block_cache(block),
        Arc::new(NoOpLogger),
    )
}

fn tiles(manager: &CacheManager, path: &Path, max_memory: usize) -> CacheAccess<Tile, Vec<u8>> {
    manager
        .get_region("tiles", max_memory, 64 * 1024, Some(path))
        .unwrap()
}

fn tile(i: u32) -> Tile {
    Tile {
        zoom: 15,
        x: i,
        y: i * 2,
    }
}

fn round_trip(block: bool) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tiles");

    {
        let manager = open(&temp, block);
        let region = tiles(&manager, &path, 5);
        for i in 0..40 {
            region.put(&tile(i), &vec![i as u8; 1000 + i as usize]).unwrap();
        }
        region.remove(&tile(3)).unwrap();
        manager.shutdown();
    }

    let manager = open(&temp, block);
    let region = tiles(&manager, &path, 5);
    for i in 0..40 {
        let expected = if i == 3 {
            None
        } else {
            Some(vec![i as u8; 1000 + i as usize])
        };
        assert_eq!(region.get(&tile(i)), expected, "tile {}", i);
    }
    assert!(region.stats().aux_hits > 0);
}

#[test]
fn test_block_format_survives_restart() {
    round_trip(true);
}

#[test]
fn test_index_format_survives_restart() {
    round_trip(false);
}

#[test]
fn test_clear_empties_disk_tier() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tiles");

    {
        let manager = open(&temp, false);
        let region = tiles(&manager, &path, 5);
        region.put(&tile(1), &vec![1; 10]).unwrap();
        region.clear().unwrap();
        manager.shutdown();
    }

    let manager = open(&temp, false);
    assert_eq!(tiles(&manager, &path, 5).get(&tile(1)), None);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_memory_tier_bounded(max in 1usize..20, puts in 0u32..80) {
        let temp = TempDir::new().unwrap();
        let manager = open(&temp, true);
        let region = manager.get_region::<u32, u32>("bounded", max, 0, None).unwrap();

        for i in 0..puts {
            region.put(&i, &i).unwrap();
        }
        prop_assert!(region.stats().memory_entries <= max);
    }
}
