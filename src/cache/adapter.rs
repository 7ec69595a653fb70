//! Cache Store Adapter: typed forecast entries over a raw key-value store.
//!
//! The adapter performs pass-through I/O only. It keeps no memory cache of its
//! own and never filters entries by age; the caller decides validity with
//! [`CacheEntry::is_valid_at`].

use crate::cache::error::StoreError;
use crate::cache::key::CacheKey;
use crate::cache::store::KeyValueStore;
use crate::types::forecast::ForecastDocument;
use bincode::config::{Configuration, Fixint, LittleEndian};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// A stored forecast document with the metadata needed to judge its age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub forecast: ForecastDocument,
    pub stored_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    /// `now < stored_at + ttl`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => match self.stored_at.checked_add_signed(ttl) {
                Some(expires_at) => now < expires_at,
                None => true,
            },
            // A TTL too large for chrono never expires in practice.
            Err(_) => true,
        }
    }
}

#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Returns the stored entry if one is present, whatever its age.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        let store_key = key.as_store_key();
        let Some(bytes) = self.backend.get(&store_key).await? else {
            return Ok(None);
        };
        let (entry, _) = bincode::serde::decode_from_slice::<CacheEntry, _>(&bytes, BINCODE_CONFIG)
            .map_err(|e| StoreError::Decode(store_key, Box::new(e)))?;
        Ok(Some(entry))
    }

    /// Writes `forecast` under `key`, replacing any existing entry.
    pub async fn put(
        &self,
        key: &CacheKey,
        forecast: &ForecastDocument,
        stored_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let store_key = key.as_store_key();
        let entry = CacheEntry {
            key: store_key.clone(),
            forecast: forecast.clone(),
            stored_at,
            ttl,
        };
        let bytes = bincode::serde::encode_to_vec(&entry, BINCODE_CONFIG)
            .map_err(|e| StoreError::Encode(store_key.clone(), Box::new(e)))?;
        self.backend.put(&store_key, bytes, ttl).await
    }

    pub async fn invalidate(&self, key: &CacheKey) -> Result<(), StoreError> {
        self.backend.delete(&key.as_store_key()).await
    }
}
