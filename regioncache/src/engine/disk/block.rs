//! Block disk cache: the data file is an array of fixed-size blocks.
//!
//! An element is written as a `u32` length header followed by its encoded
//! bytes, spread over as many blocks as needed. The blocks of one element
//! need not be contiguous. Freed blocks go back to a free set and are
//! handed out lowest index first, so the file only grows when no freed
//! block is left. It is never truncated while the cache is live.

use super::key_file::{read_keys, write_keys};
use super::{DiskCacheAttributes, DiskLimitType, MIN_BLOCK_SIZE_BYTES};
use crate::engine::auxiliary::{AuxiliaryCache, AuxiliaryKind, AuxiliaryStats};
use crate::engine::element::CacheElement;
use crate::engine::error::EngineError;
use crate::engine::log::{engine_log, EngineLog};
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::Arc;

const LENGTH_HEADER_BYTES: usize = 4;

struct BlockState {
    data: File,
    keys: LruCache<Vec<u8>, Vec<u32>>,
    free: BTreeSet<u32>,
    block_count: u32,
    evictions: u64,
    disposed: bool,
}

impl BlockState {
    fn allocated_blocks(&self) -> u64 {
        (self.block_count as usize - self.free.len()) as u64
    }
}

/// Auxiliary cache storing elements in chains of fixed-size blocks.
pub struct BlockDiskCache {
    name: String,
    key_path: PathBuf,
    block_size: usize,
    max_key_size: usize,
    limit_type: DiskLimitType,
    log: Arc<dyn EngineLog>,
    state: Mutex<BlockState>,
}

impl BlockDiskCache {
    /// Open or create `<name>.data` / `<name>.key` under the disk path.
    pub fn open(
        attrs: &DiskCacheAttributes,
        block_size: usize,
        log: Arc<dyn EngineLog>,
    ) -> Result<Self, EngineError> {
        let name = attrs.cache_name.clone();
        if block_size < MIN_BLOCK_SIZE_BYTES {
            return Err(EngineError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("block size {} is below {}", block_size, MIN_BLOCK_SIZE_BYTES),
            )));
        }
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
        let mut block_count = u32::try_from(data_len / block_size as u64).unwrap_or(u32::MAX);
        let mut keys = LruCache::unbounded();
        let mut used = HashSet::new();

        let loaded = match read_keys::<Vec<u32>>(&key_path, &name) {
            Ok(Some(entries)) => {
                let valid = entries.iter().all(|(_, blocks)| {
                    !blocks.is_empty()
                        && blocks
                            .iter()
                            .all(|b| *b < block_count && used.insert(*b))
                });
                if valid {
                    Some(entries)
                } else {
                    engine_log!(log, Warning, "Key file of {} references invalid blocks, resetting", name);
                    None
                }
            }
            Ok(None) => {
                if data_len > 0 {
                    engine_log!(log, Warning, "Disk cache {} has data but no keys, resetting", name);
                }
                None
            }
            Err(e) => {
                engine_log!(log, Warning, "Resetting disk cache {}: {}", name, e);
                None
            }
        };

        match loaded {
            Some(entries) => {
                for (key, blocks) in entries {
                    keys.push(key, blocks);
                }
                engine_log!(log, Info, "Loaded {} keys for disk cache {}", keys.len(), name);
            }
            None => {
                used.clear();
                if data_len > 0 {
                    data.set_len(0)?;
                    block_count = 0;
                }
            }
        }

        let free = (0..block_count).filter(|b| !used.contains(b)).collect();

        Ok(Self {
            name,
            key_path,
            block_size,
            max_key_size: attrs.max_key_size,
            limit_type: attrs.disk_limit_type,
            log,
            state: Mutex::new(BlockState {
                data,
                keys,
                free,
                block_count,
                evictions: 0,
                disposed: false,
            }),
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    fn blocks_needed(&self, payload_len: usize) -> usize {
        (payload_len + LENGTH_HEADER_BYTES).div_ceil(self.block_size)
    }

    fn over_limit(&self, state: &BlockState) -> bool {
        if self.max_key_size == 0 {
            return false;
        }
        match self.limit_type {
            DiskLimitType::Count => state.keys.len() > self.max_key_size,
            DiskLimitType::Size => {
                state.allocated_blocks() * self.block_size as u64 / 1024 > self.max_key_size as u64
            }
        }
    }

    fn allocate(state: &mut BlockState, count: usize) -> Result<Vec<u32>, EngineError> {
        let mut blocks = Vec::with_capacity(count);
        for _ in 0..count {
            let block = match state.free.pop_first() {
                Some(block) => block,
                None => {
                    let block = state.block_count;
                    state.block_count = block.checked_add(1).ok_or_else(|| {
                        EngineError::Io(io::Error::new(io::ErrorKind::Other, "block index overflow"))
                    })?;
                    block
                }
            };
            blocks.push(block);
        }
        Ok(blocks)
    }

    fn block_offset(&self, block: u32) -> u64 {
        block as u64 * self.block_size as u64
    }

    fn write_blocks(&self, state: &mut BlockState, blocks: &[u32], payload: &[u8]) -> Result<(), EngineError> {
        let mut bytes = Vec::with_capacity(blocks.len() * self.block_size);
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes.resize(blocks.len() * self.block_size, 0);

        for (block, chunk) in blocks.iter().zip(bytes.chunks(self.block_size)) {
            state.data.seek(SeekFrom::Start(self.block_offset(*block)))?;
            state.data.write_all(chunk)?;
        }
        Ok(())
    }

    fn read_blocks(&self, state: &mut BlockState, blocks: &[u32]) -> Result<Vec<u8>, EngineError> {
        let mut bytes = Vec::with_capacity(blocks.len() * self.block_size);
        let mut chunk = vec![0u8; self.block_size];
        for block in blocks {
            state.data.seek(SeekFrom::Start(self.block_offset(*block)))?;
            state.data.read_exact(&mut chunk)?;
            bytes.extend_from_slice(&chunk);
        }

        let mut header = [0u8; LENGTH_HEADER_BYTES];
        header.copy_from_slice(&bytes[..LENGTH_HEADER_BYTES]);
        let len = u32::from_le_bytes(header) as usize;
        if self.blocks_needed(len) != blocks.len() {
            return Err(EngineError::corrupt(&self.name, "length header does not match block chain"));
        }
        Ok(bytes[LENGTH_HEADER_BYTES..LENGTH_HEADER_BYTES + len].to_vec())
    }

    fn release(state: &mut BlockState, blocks: Vec<u32>) {
        state.free.extend(blocks);
    }
}

impl AuxiliaryCache for BlockDiskCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AuxiliaryKind {
        AuxiliaryKind::BlockDisk
    }

    fn get(&self, key: &[u8]) -> Result<Option<CacheElement>, EngineError> {
        let mut state = self.state.lock();
        if state.disposed {
            return Ok(None);
        }
        let Some(blocks) = state.keys.get(key).cloned() else {
            return Ok(None);
        };

        let decoded = self
            .read_blocks(&mut state, &blocks)
            .and_then(|payload| CacheElement::decode(&payload));
        match decoded {
            Ok(element) if element.key == key => Ok(Some(element)),
            Ok(_) => {
                state.keys.pop(key);
                Self::release(&mut state, blocks);
                Err(EngineError::corrupt(&self.name, "block chain holds a different key"))
            }
            Err(e) => {
                state.keys.pop(key);
                Self::release(&mut state, blocks);
                Err(e)
            }
        }
    }

    fn update(&self, element: &CacheElement) -> Result<(), EngineError> {
        let payload = element.encode()?;
        if u32::try_from(payload.len()).is_err() {
            return Err(EngineError::ElementTooLarge { size: payload.len() });
        }

        let mut state = self.state.lock();
        if state.disposed {
            engine_log!(self.log, Fine, "Dropping write to disposed disk cache {}", self.name);
            return Ok(());
        }

        if let Some(old) = state.keys.pop(element.key.as_slice()) {
            Self::release(&mut state, old);
        }
        let blocks = Self::allocate(&mut state, self.blocks_needed(payload.len()))?;
        if let Err(e) = self.write_blocks(&mut state, &blocks, &payload) {
            Self::release(&mut state, blocks);
            return Err(e);
        }
        state.keys.push(element.key.clone(), blocks);

        while self.over_limit(&state) {
            match state.keys.pop_lru() {
                Some((_, victim)) => {
                    Self::release(&mut state, victim);
                    state.evictions += 1;
                }
                None => break,
            }
        }
        Ok(())
    }

    fn remove(&self, key: &[u8]) -> Result<bool, EngineError> {
        let mut state = self.state.lock();
        if state.disposed {
            return Ok(false);
        }
        match state.keys.pop(key) {
            Some(blocks) => {
                Self::release(&mut state, blocks);
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
        state.free = (0..state.block_count).collect();
        Ok(())
    }

    fn len(&self) -> usize {
        self.state.lock().keys.len()
    }

    fn stats(&self) -> AuxiliaryStats {
        let state = self.state.lock();
        AuxiliaryStats {
            name: self.name.clone(),
            kind: AuxiliaryKind::BlockDisk,
            entries: state.keys.len(),
            data_file_bytes: state.block_count as u64 * self.block_size as u64,
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

        let mut entries: Vec<(Vec<u8>, Vec<u32>)> =
            state.keys.iter().map(|(k, b)| (k.clone(), b.clone())).collect();
        entries.reverse();
        write_keys(&self.key_path, &entries)?;
        state.data.sync_all()?;

        engine_log!(
            self.log,
            Info,
            "Disposed disk cache {} with {} keys in {} blocks",
            self.name,
            entries.len(),
            state.block_count
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::attributes::ElementAttributes;
    use crate::engine::disk::DEFAULT_BLOCK_SIZE_BYTES;
    use crate::engine::log::SilentEngineLog;
    use tempfile::TempDir;

    fn open_with(temp: &TempDir, block_size: usize, max_kb: usize) -> BlockDiskCache {
        let attrs = DiskCacheAttributes {
            disk_path: Some(temp.path().to_path_buf()),
            max_key_size: max_kb,
            ..DiskCacheAttributes::new("test_BLOCK_v2")
        };
        BlockDiskCache::open(&attrs, block_size, Arc::new(SilentEngineLog)).unwrap()
    }

    fn element(key: &str, size: usize) -> CacheElement {
        CacheElement::new(
            key.as_bytes().to_vec(),
            vec![7u8; size],
            ElementAttributes::default(),
        )
    }

    fn data_len(temp: &TempDir) -> u64 {
        fs::metadata(temp.path().join("test_BLOCK_v2.data")).unwrap().len()
    }

    #[test]
    fn test_block_small_element_uses_one_block() {
        let temp = TempDir::new().unwrap();
        let cache = open_with(&temp, DEFAULT_BLOCK_SIZE_BYTES, 0);

        cache.update(&element("a", 100)).unwrap();
        assert_eq!(data_len(&temp), 4096);
        assert_eq!(cache.get(b"a").unwrap().unwrap().value.len(), 100);
    }

    #[test]
    fn test_block_large_element_spans_blocks() {
        let temp = TempDir::new().unwrap();
        let cache = open_with(&temp, 256, 0);

        cache.update(&element("big", 1000)).unwrap();
        let got = cache.get(b"big").unwrap().unwrap();
        assert_eq!(got.value, vec![7u8; 1000]);
        assert_eq!(data_len(&temp) % 256, 0);
        assert!(data_len(&temp) >= 1024);
    }

    #[test]
    fn test_block_freed_blocks_are_reused() {
        let temp = TempDir::new().unwrap();
        let cache = open_with(&temp, 256, 0);

        cache.update(&element("a", 100)).unwrap();
        cache.update(&element("b", 100)).unwrap();
        let before = data_len(&temp);

        cache.remove(b"a").unwrap();
        cache.update(&element("c", 100)).unwrap();
        assert_eq!(data_len(&temp), before);
        assert!(cache.get(b"c").unwrap().is_some());
    }

    #[test]
    fn test_block_file_never_truncated() {
        let temp = TempDir::new().unwrap();
        let cache = open_with(&temp, 256, 0);
        cache.update(&element("a", 1000)).unwrap();
        let before = data_len(&temp);

        cache.remove_all().unwrap();
        cache.dispose().unwrap();
        assert_eq!(data_len(&temp), before);
    }

    #[test]
    fn test_block_size_limit_evicts_lru() {
        let temp = TempDir::new().unwrap();
        // Two 4 KB blocks allowed
        let cache = open_with(&temp, DEFAULT_BLOCK_SIZE_BYTES, 8);

        cache.update(&element("a", 10)).unwrap();
        cache.update(&element("b", 10)).unwrap();
        cache.get(b"a").unwrap();
        cache.update(&element("c", 10)).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.get(b"b").unwrap().is_none());
        assert!(cache.get(b"a").unwrap().is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_block_persists_across_dispose() {
        let temp = TempDir::new().unwrap();
        {
            let cache = open_with(&temp, 256, 0);
            cache.update(&element("a", 600)).unwrap();
            cache.update(&element("b", 20)).unwrap();
            cache.dispose().unwrap();
        }

        let cache = open_with(&temp, 256, 0);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(b"a").unwrap().unwrap().value.len(), 600);

        // New writes must not clobber loaded chains
        cache.update(&element("c", 600)).unwrap();
        assert_eq!(cache.get(b"a").unwrap().unwrap().value, vec![7u8; 600]);
        assert_eq!(cache.get(b"b").unwrap().unwrap().value.len(), 20);
    }

    #[test]
    fn test_block_invalid_key_file_resets() {
        let temp = TempDir::new().unwrap();
        {
            let cache = open_with(&temp, 256, 0);
            cache.update(&element("a", 600)).unwrap();
            cache.dispose().unwrap();
        }
        // Shrink the data file so the stored chain points past its end
        let file = OpenOptions::new()
            .write(true)
            .open(temp.path().join("test_BLOCK_v2.data"))
            .unwrap();
        file.set_len(256).unwrap();

        let cache = open_with(&temp, 256, 0);
        assert_eq!(cache.len(), 0);
        assert_eq!(data_len(&temp), 0);
    }

    #[test]
    fn test_block_rejects_tiny_block_size() {
        let temp = TempDir::new().unwrap();
        let attrs = DiskCacheAttributes {
            disk_path: Some(temp.path().to_path_buf()),
            ..DiskCacheAttributes::new("tiny_BLOCK_v2")
        };
        assert!(BlockDiskCache::open(&attrs, 16, Arc::new(SilentEngineLog)).is_err());
    }
}
