//! The persistent key-value store the cache sits on.

use crate::cache::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Durable storage with get/put/delete and an expiry hint.
///
/// Implementations may drop entries once `ttl_hint` has passed, but callers
/// never rely on that for correctness: validity is always recomputed from the
/// stored entry itself.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn put(&self, key: &str, value: Vec<u8>, ttl_hint: Duration) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// An in-process store backed by a concurrent map.
///
/// Expired values are dropped lazily on read. An entry whose expiry lies
/// beyond what `Instant` can represent never expires.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, (Vec<u8>, Option<Instant>)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            let (bytes, expires_at) = entry.value();
            if is_live(*expires_at, now) {
                return Ok(Some(bytes.clone()));
            }
        }
        // Either absent or expired; the guard above is released before removal.
        self.entries
            .remove_if(key, |_, (_, expires_at)| !is_live(*expires_at, now));
        Ok(None)
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl_hint: Duration) -> Result<(), StoreError> {
        let expires_at = Instant::now().checked_add(ttl_hint);
        self.entries.insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

fn is_live(expires_at: Option<Instant>, now: Instant) -> bool {
    expires_at.map_or(true, |at| now < at)
}
