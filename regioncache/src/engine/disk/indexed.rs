//! Indexed disk cache: length-prefixed records in a single data file.
//!
//! ```text
//! <name>.data   [u32 len][payload][u32 len][payload]...
//! <name>.key    key -> (offset, len), written on dispose
//! ```
//!
//! Overwritten and evicted records leave holes that are recycled by later
//! writes of equal or smaller size; the unused tail of a reused hole goes
//! back on the free list. Once holes outweigh live records the file is
//! compacted in place, and dispose always compacts.

use super::key_file::{read_keys, write_keys};
use super::{DiskCacheAttributes, DiskLimitType};
use crate::engine::auxiliary::{AuxiliaryCache, AuxiliaryKind, AuxiliaryStats};
use crate::engine::element::CacheElement;
use crate::engine::error::EngineError;
use crate::engine::log::{engine_log, EngineLog};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::Arc;

const RECORD_HEADER_BYTES: u64 = 4;

/// Holes smaller than this never trigger compaction on their own.
const MIN_COMPACT_HOLE_BYTES: u64 = 64 * 1024;

/// Location of one record in the data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Slot {
    pos: u64,
    len: u32,
}

impl Slot {
    fn end(&self) -> u64 {
        self.pos + RECORD_HEADER_BYTES + self.len as u64
    }
}

struct IndexedState {
    data: File,
    keys: LruCache<Vec<u8>, Slot>,
    recycle: Vec<Slot>,
    payload_bytes: u64,
    end_of_file: u64,
    evictions: u64,
    disposed: bool,
}

/// Auxiliary cache storing each element as one contiguous record.
pub struct IndexedDiskCache {
    name: String,
    key_path: PathBuf,
    max_key_size: usize,
    limit_type: DiskLimitType,
    log: Arc<dyn EngineLog>,
    state: Mutex<IndexedState>,
}

impl IndexedDiskCache {
    /// Open or create `<name>.data` / `<name>.key` under the disk path.
    ///
    /// An index that does not match the data file resets both.
    pub fn open(attrs: &DiskCacheAttributes, log: Arc<dyn EngineLog>) -> Result<Self, EngineError> {
        let name = attrs.cache_name.clone();
        let (data_path, key_path) = match (attrs.data_file(), attrs.key_file()) {
            (Some(d), Some(k)) => (d, k),
            _ => return Err(EngineError::MissingDiskPath(name)),
        };
        if let Some(dir) = &attrs.disk_path {
            fs::create_dir_all(dir)?;
        }

        let data = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&data_path)?;
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&key_path)?;

        let data_len = data.metadata()?.len();
        let mut keys = LruCache::unbounded();
        let mut payload_bytes = 0u64;
        let mut end_of_file = data_len;

        match read_keys::<Slot>(&key_path, &name) {
            Ok(Some(entries)) => match entries.iter().find(|(_, slot)| slot.end() > data_len) {
                None => {
                    for (key, slot) in entries {
                        payload_bytes += slot.len as u64;
                        keys.push(key, slot);
                    }
                    engine_log!(log, Info, "Loaded {} keys for disk cache {}", keys.len(), name);
                }
                Some(_) => {
                    engine_log!(log, Warning, "Key file of {} points past the data file, resetting", name);
                    data.set_len(0)?;
                    end_of_file = 0;
                }
            },
            Ok(None) => {
                if data_len > 0 {
                    engine_log!(log, Warning, "Disk cache {} has data but no keys, resetting", name);
                    data.set_len(0)?;
                    end_of_file = 0;
                }
            }
            Err(e) => {
                engine_log!(log, Warning, "Resetting disk cache {}: {}", name, e);
                data.set_len(0)?;
                end_of_file = 0;
            }
        }

        Ok(Self {
            name,
            key_path,
            max_key_size: attrs.max_key_size,
            limit_type: attrs.disk_limit_type,
            log,
            state: Mutex::new(IndexedState {
                data,
                keys,
                recycle: Vec::new(),
                payload_bytes,
                end_of_file,
                evictions: 0,
                disposed: false,
            }),
        })
    }

    fn over_limit(&self, state: &IndexedState) -> bool {
        if self.max_key_size == 0 {
            return false;
        }
        match self.limit_type {
            DiskLimitType::Count => state.keys.len() > self.max_key_size,
            DiskLimitType::Size => state.payload_bytes.div_ceil(1024) > self.max_key_size as u64,
        }
    }

    fn release(state: &mut IndexedState, slot: Slot) {
        state.payload_bytes = state.payload_bytes.saturating_sub(slot.len as u64);
        state.recycle.push(slot);
    }

    /// Bytes in live records, headers included.
    fn live_bytes(state: &IndexedState) -> u64 {
        state.payload_bytes + RECORD_HEADER_BYTES * state.keys.len() as u64
    }

    /// Whether dead space has grown past the live data (and a floor).
    fn wants_compaction(state: &IndexedState) -> bool {
        let live = Self::live_bytes(state);
        let holes = state.end_of_file.saturating_sub(live);
        holes > live.max(MIN_COMPACT_HOLE_BYTES)
    }

    /// Smallest recycled slot that fits, else the end of the file.
    ///
    /// A reused slot is split when its remainder can hold another record.
    fn allocate(state: &mut IndexedState, len: u32) -> Slot {
        let best = state
            .recycle
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.len >= len)
            .min_by_key(|(_, slot)| slot.len)
            .map(|(i, _)| i);

        match best {
            Some(i) => {
                let hole = state.recycle.swap_remove(i);
                let slot = Slot { pos: hole.pos, len };
                let spare = (hole.len - len) as u64;
                if spare > RECORD_HEADER_BYTES {
                    state.recycle.push(Slot {
                        pos: slot.end(),
                        len: (spare - RECORD_HEADER_BYTES) as u32,
                    });
                }
                slot
            }
            None => {
                let slot = Slot {
                    pos: state.end_of_file,
                    len,
                };
                state.end_of_file = slot.end();
                slot
            }
        }
    }

    fn read_record(&self, state: &mut IndexedState, slot: Slot) -> Result<Vec<u8>, EngineError> {
        state.data.seek(SeekFrom::Start(slot.pos))?;
        let mut header = [0u8; RECORD_HEADER_BYTES as usize];
        state.data.read_exact(&mut header)?;
        if u32::from_le_bytes(header) != slot.len {
            return Err(EngineError::corrupt(&self.name, "record length mismatch"));
        }
        let mut payload = vec![0u8; slot.len as usize];
        state.data.read_exact(&mut payload)?;
        Ok(payload)
    }

    fn write_record(state: &mut IndexedState, slot: Slot, payload: &[u8]) -> Result<(), EngineError> {
        state.data.seek(SeekFrom::Start(slot.pos))?;
        state.data.write_all(&slot.len.to_le_bytes())?;
        state.data.write_all(payload)?;
        Ok(())
    }

    /// Slide live records to the front of the file and truncate the tail.
    fn compact(&self, state: &mut IndexedState) -> Result<(), EngineError> {
        if Self::live_bytes(state) == state.end_of_file {
            state.recycle.clear();
            return Ok(());
        }

        let mut live: Vec<(Vec<u8>, Slot)> =
            state.keys.iter().map(|(k, s)| (k.clone(), *s)).collect();
        live.sort_by_key(|(_, slot)| slot.pos);

        let mut write_pos = 0u64;
        for (key, slot) in live {
            if slot.pos != write_pos {
                let payload = self.read_record(state, slot)?;
                let moved = Slot {
                    pos: write_pos,
                    len: slot.len,
                };
                Self::write_record(state, moved, &payload)?;
                if let Some(entry) = state.keys.peek_mut(&key) {
                    *entry = moved;
                }
            }
            write_pos += RECORD_HEADER_BYTES + slot.len as u64;
        }

        state.data.set_len(write_pos)?;
        state.end_of_file = write_pos;
        state.recycle.clear();
        engine_log!(self.log, Fine, "Compacted disk cache {} to {} bytes", self.name, write_pos);
        Ok(())
    }
}

impl AuxiliaryCache for IndexedDiskCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AuxiliaryKind {
        AuxiliaryKind::IndexedDisk
    }

    fn get(&self, key: &[u8]) -> Result<Option<CacheElement>, EngineError> {
        let mut state = self.state.lock();
        if state.disposed {
            return Ok(None);
        }
        let Some(slot) = state.keys.get(key).copied() else {
            return Ok(None);
        };

        let decoded = self
            .read_record(&mut state, slot)
            .and_then(|payload| CacheElement::decode(&payload));
        match decoded {
            Ok(element) if element.key == key => Ok(Some(element)),
            Ok(_) => {
                state.keys.pop(key);
                Self::release(&mut state, slot);
                Err(EngineError::corrupt(&self.name, "record holds a different key"))
            }
            Err(e) => {
                state.keys.pop(key);
                Self::release(&mut state, slot);
                Err(e)
            }
        }
    }

    fn update(&self, element: &CacheElement) -> Result<(), EngineError> {
        let payload = element.encode()?;
        let len = u32::try_from(payload.len())
            .map_err(|_| EngineError::ElementTooLarge { size: payload.len() })?;

        let mut state = self.state.lock();
        if state.disposed {
            engine_log!(self.log, Fine, "Dropping write to disposed disk cache {}", self.name);
            return Ok(());
        }

        if let Some(old) = state.keys.pop(element.key.as_slice()) {
            Self::release(&mut state, old);
        }
        let slot = Self::allocate(&mut state, len);
        Self::write_record(&mut state, slot, &payload)?;
        state.keys.push(element.key.clone(), slot);
        state.payload_bytes += len as u64;

        while self.over_limit(&state) {
            match state.keys.pop_lru() {
                Some((_, victim)) => {
                    Self::release(&mut state, victim);
                    state.evictions += 1;
                }
                None => break,
            }
        }

        if Self::wants_compaction(&state) {
            self.compact(&mut state)?;
        }
        Ok(())
    }

    fn remove(&self, key: &[u8]) -> Result<bool, EngineError> {
        let mut state = self.state.lock();
        if state.disposed {
            return Ok(false);
        }
        match state.keys.pop(key) {
            Some(slot) => {
                Self::release(&mut state, slot);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove_all(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if state.disposed {
            return Ok(());
        }
        state.keys.clear();
        state.recycle.clear();
        state.payload_bytes = 0;
        state.end_of_file = 0;
        state.data.set_len(0)?;
        Ok(())
    }

    fn len(&self) -> usize {
        self.state.lock().keys.len()
    }

    fn stats(&self) -> AuxiliaryStats {
        let state = self.state.lock();
        AuxiliaryStats {
            name: self.name.clone(),
            kind: AuxiliaryKind::IndexedDisk,
            entries: state.keys.len(),
            data_file_bytes: state.end_of_file,
            capacity: self.max_key_size,
            evictions: state.evictions,
            disposed: state.disposed,
        }
    }

    fn dispose(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if state.disposed {
            return Ok(());
        }
        state.disposed = true;

        if let Err(e) = self.compact(&mut state) {
            engine_log!(self.log, Warning, "Could not compact disk cache {}: {}", self.name, e);
        }

        // Least recently used first
        let mut entries: Vec<(Vec<u8>, Slot)> =
            state.keys.iter().map(|(k, s)| (k.clone(), *s)).collect();
        entries.reverse();
        write_keys(&self.key_path, &entries)?;
        state.data.sync_all()?;

        engine_log!(self.log, Info, "Disposed disk cache {} with {} keys", self.name, entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::attributes::ElementAttributes;
    use crate::engine::log::SilentEngineLog;
    use tempfile::TempDir;

    fn attrs(temp: &TempDir, max_key_size: usize, limit: DiskLimitType) -> DiskCacheAttributes {
        DiskCacheAttributes {
            disk_path: Some(temp.path().to_path_buf()),
            max_key_size,
            disk_limit_type: limit,
            ..DiskCacheAttributes::new("test_INDEX_v2")
        }
    }

    fn open(temp: &TempDir, max_key_size: usize, limit: DiskLimitType) -> IndexedDiskCache {
        IndexedDiskCache::open(&attrs(temp, max_key_size, limit), Arc::new(SilentEngineLog)).unwrap()
    }

    fn element(key: &str, size: usize) -> CacheElement {
        CacheElement::new(
            key.as_bytes().to_vec(),
            vec![0xAB; size],
            ElementAttributes::default(),
        )
    }

    #[test]
    fn test_indexed_update_and_get() {
        let temp = TempDir::new().unwrap();
        let cache = open(&temp, 0, DiskLimitType::Size);

        cache.update(&element("a", 100)).unwrap();
        let got = cache.get(b"a").unwrap().unwrap();
        assert_eq!(got.value.len(), 100);
        assert!(cache.get(b"missing").unwrap().is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_indexed_overwrite_recycles_slot() {
        let temp = TempDir::new().unwrap();
        let cache = open(&temp, 0, DiskLimitType::Size);

        cache.update(&element("a", 500)).unwrap();
        let end_after_first = cache.stats().data_file_bytes;

        // Smaller replacement lands in the freed slot of the first write
        cache.update(&element("b", 10)).unwrap();
        cache.update(&element("a", 400)).unwrap();
        cache.update(&element("c", 300)).unwrap();

        let stats = cache.stats();
        assert_eq!(stats.entries, 3);
        assert!(stats.data_file_bytes > end_after_first);
        assert_eq!(cache.get(b"a").unwrap().unwrap().value.len(), 400);
        assert_eq!(cache.get(b"c").unwrap().unwrap().value.len(), 300);
    }

    #[test]
    fn test_indexed_reused_slot_remainder_is_recycled() {
        let temp = TempDir::new().unwrap();
        let cache = open(&temp, 0, DiskLimitType::Size);

        cache.update(&element("a", 1000)).unwrap();
        cache.update(&element("pin", 1)).unwrap();
        let end = cache.stats().data_file_bytes;
        cache.remove(b"a").unwrap();

        // Both fit in the hole left by "a", one after the other
        cache.update(&element("b", 100)).unwrap();
        cache.update(&element("c", 700)).unwrap();

        assert_eq!(cache.stats().data_file_bytes, end);
        assert_eq!(cache.get(b"b").unwrap().unwrap().value.len(), 100);
        assert_eq!(cache.get(b"c").unwrap().unwrap().value.len(), 700);
        assert_eq!(cache.get(b"pin").unwrap().unwrap().value.len(), 1);
    }

    #[test]
    fn test_indexed_churn_keeps_file_bounded() {
        let temp = TempDir::new().unwrap();
        let limit_kb = 64;
        let cache = open(&temp, limit_kb, DiskLimitType::Size);
        let data_path = temp.path().join("test_INDEX_v2.data");

        for i in 0..20_000usize {
            let key = format!("k{}", i % 50);
            let size = 100 + (i * 397) % 2000;
            cache.update(&element(&key, size)).unwrap();

            let file_len = fs::metadata(&data_path).unwrap().len();
            assert!(
                file_len <= 3 * (limit_kb as u64) * 1024,
                "data file grew to {} bytes after {} updates",
                file_len,
                i + 1
            );
        }

        assert!(cache.len() <= 50);
        let last = cache.get(b"k49").unwrap().unwrap();
        assert_eq!(last.value.len(), 100 + (19_999 * 397) % 2000);
    }

    #[test]
    fn test_indexed_count_limit_evicts_lru() {
        let temp = TempDir::new().unwrap();
        let cache = open(&temp, 2, DiskLimitType::Count);

        cache.update(&element("a", 10)).unwrap();
        cache.update(&element("b", 10)).unwrap();
        cache.get(b"a").unwrap();
        cache.update(&element("c", 10)).unwrap();

        assert!(cache.get(b"a").unwrap().is_some());
        assert!(cache.get(b"b").unwrap().is_none());
        assert!(cache.get(b"c").unwrap().is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_indexed_size_limit_in_kilobytes() {
        let temp = TempDir::new().unwrap();
        let cache = open(&temp, 4, DiskLimitType::Size);

        for key in ["a", "b", "c", "d", "e", "f"] {
            cache.update(&element(key, 1000)).unwrap();
        }

        // Each record is a bit over 1000 bytes, so at most 4 KB survive
        assert!(cache.len() <= 4);
        assert!(cache.get(b"f").unwrap().is_some());
        assert!(cache.get(b"a").unwrap().is_none());
    }

    #[test]
    fn test_indexed_persists_across_dispose() {
        let temp = TempDir::new().unwrap();
        {
            let cache = open(&temp, 0, DiskLimitType::Size);
            cache.update(&element("a", 50)).unwrap();
            cache.update(&element("b", 60)).unwrap();
            cache.remove(b"a").unwrap();
            cache.dispose().unwrap();
        }

        let cache = open(&temp, 0, DiskLimitType::Size);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(b"b").unwrap().unwrap().value.len(), 60);
        assert!(cache.get(b"a").unwrap().is_none());
    }

    #[test]
    fn test_indexed_dispose_compacts() {
        let temp = TempDir::new().unwrap();
        let cache = open(&temp, 0, DiskLimitType::Size);
        cache.update(&element("a", 1000)).unwrap();
        cache.update(&element("b", 10)).unwrap();
        cache.remove(b"a").unwrap();
        cache.dispose().unwrap();

        let data_len = fs::metadata(temp.path().join("test_INDEX_v2.data")).unwrap().len();
        assert!(data_len < 1000);
    }

    #[test]
    fn test_indexed_missing_keys_resets_data() {
        let temp = TempDir::new().unwrap();
        {
            let cache = open(&temp, 0, DiskLimitType::Size);
            cache.update(&element("a", 50)).unwrap();
            // Dropped without dispose: key file stays empty
        }

        let cache = open(&temp, 0, DiskLimitType::Size);
        assert_eq!(cache.len(), 0);
        let data_len = fs::metadata(temp.path().join("test_INDEX_v2.data")).unwrap().len();
        assert_eq!(data_len, 0);
    }

    #[test]
    fn test_indexed_disposed_cache_ignores_io() {
        let temp = TempDir::new().unwrap();
        let cache = open(&temp, 0, DiskLimitType::Size);
        cache.update(&element("a", 5)).unwrap();
        cache.dispose().unwrap();
        cache.dispose().unwrap();

        assert!(cache.get(b"a").unwrap().is_none());
        cache.update(&element("b", 5)).unwrap();
        assert!(cache.stats().disposed);
    }

    #[test]
    fn test_indexed_remove_all() {
        let temp = TempDir::new().unwrap();
        let cache = open(&temp, 0, DiskLimitType::Size);
        cache.update(&element("a", 5)).unwrap();
        cache.update(&element("b", 5)).unwrap();
        cache.remove_all().unwrap();

        assert!(cache.is_empty());
        assert_eq!(cache.stats().data_file_bytes, 0);
    }
}
