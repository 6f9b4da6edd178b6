//! Typed handle over a cache region.

use crate::engine::{CompositeCache, ElementAttributes, EngineError, RegionStats};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

/// Errors from typed cache access.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Key or value could not be serialized
    #[error("Failed to encode cache entry: {0}")]
    Encode(#[source] bincode::Error),

    /// Stored bytes do not decode as the requested value type
    #[error("Failed to decode cached value: {0}")]
    Decode(#[source] bincode::Error),

    /// The region rejected the operation
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Access to one region with typed keys and values.
///
/// Keys and values are stored bincode-encoded, so any two handles on the
/// same region must agree on `K` and `V`. Cloning the handle is cheap; all
/// clones share the region.
pub struct CacheAccess<K, V> {
    region: Arc<CompositeCache>,
    _types: PhantomData<fn(K) -> V>,
}

impl<K, V> Clone for CacheAccess<K, V> {
    fn clone(&self) -> Self {
        Self {
            region: self.region.clone(),
            _types: PhantomData,
        }
    }
}

impl<K, V> fmt::Debug for CacheAccess<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheAccess")
            .field("region", &self.region.name())
            .finish()
    }
}

impl<K, V> CacheAccess<K, V>
where
    K: Serialize,
    V: Serialize + DeserializeOwned,
{
    pub fn new(region: Arc<CompositeCache>) -> Self {
        Self {
            region,
            _types: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.region.name()
    }

    /// The underlying region.
    pub fn cache_control(&self) -> &Arc<CompositeCache> {
        &self.region
    }

    fn encode_key(key: &K) -> Result<Vec<u8>, CacheError> {
        bincode::serialize(key).map_err(CacheError::Encode)
    }

    /// Cached value for `key`.
    ///
    /// Misses, errors, and values that no longer decode all come back as
    /// `None`; an undecodable value is also dropped from the region.
    pub fn get(&self, key: &K) -> Option<V> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(CacheError::Decode(_)) => {
                if let Ok(bytes) = Self::encode_key(key) {
                    let _ = self.region.remove(&bytes);
                }
                None
            }
            Err(_) => None,
        }
    }

    pub fn try_get(&self, key: &K) -> Result<Option<V>, CacheError> {
        let bytes = Self::encode_key(key)?;
        match self.region.get(&bytes)? {
            Some(value) => bincode::deserialize(&value)
                .map(Some)
                .map_err(CacheError::Decode),
            None => Ok(None),
        }
    }

    /// Store `value` with the region's default element attributes.
    pub fn put(&self, key: &K, value: &V) -> Result<(), CacheError> {
        self.put_with_attributes(key, value, self.region.element_defaults())
    }

    pub fn put_with_attributes(
        &self,
        key: &K,
        value: &V,
        attributes: ElementAttributes,
    ) -> Result<(), CacheError> {
        let key = Self::encode_key(key)?;
        let value = bincode::serialize(value).map_err(CacheError::Encode)?;
        self.region.put_with(key, value, attributes)?;
        Ok(())
    }

    /// Returns whether the key was present.
    pub fn remove(&self, key: &K) -> Result<bool, CacheError> {
        let key = Self::encode_key(key)?;
        Ok(self.region.remove(&key)?)
    }

    /// Remove every entry from memory and disk.
    pub fn clear(&self) -> Result<(), CacheError> {
        Ok(self.region.remove_all()?)
    }

    pub fn contains(&self, key: &K) -> bool {
        matches!(self.try_get(key), Ok(Some(_)))
    }

    pub fn stats(&self) -> RegionStats {
        self.region.stats()
    }
}
