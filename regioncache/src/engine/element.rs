//! Cached element with its expiration bookkeeping.

use crate::engine::attributes::ElementAttributes;
use crate::engine::error::EngineError;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A key/value pair as stored in every tier.
///
/// Timestamps are wall-clock milliseconds so that lifetimes keep counting
/// across restarts when the element is read back from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheElement {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub attributes: ElementAttributes,
    created_ms: u64,
    last_access_ms: u64,
}

impl CacheElement {
    pub fn new(key: Vec<u8>, value: Vec<u8>, attributes: ElementAttributes) -> Self {
        let now = now_millis();
        Self {
            key,
            value,
            attributes,
            created_ms: now,
            last_access_ms: now,
        }
    }

    pub fn created_ms(&self) -> u64 {
        self.created_ms
    }

    pub fn last_access_ms(&self) -> u64 {
        self.last_access_ms
    }

    pub fn touch(&mut self) {
        self.last_access_ms = now_millis();
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        if self.attributes.eternal {
            return false;
        }
        if let Some(max_life) = self.attributes.max_life {
            if now_ms.saturating_sub(self.created_ms) >= max_life.as_millis() as u64 {
                return true;
            }
        }
        if let Some(idle) = self.attributes.idle_time {
            if now_ms.saturating_sub(self.last_access_ms) >= idle.as_millis() as u64 {
                return true;
            }
        }
        false
    }

    /// Untouched for at least `idle_ms` at `now_ms`.
    pub fn idle_for_at_least(&self, idle_ms: u64, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_access_ms) >= idle_ms
    }

    pub fn encode(&self) -> Result<Vec<u8>, EngineError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EngineError> {
        Ok(bincode::deserialize(bytes)?)
    }

    #[cfg(test)]
    pub(crate) fn backdate(&mut self, by_ms: u64) {
        self.created_ms = self.created_ms.saturating_sub(by_ms);
        self.last_access_ms = self.last_access_ms.saturating_sub(by_ms);
    }
}
