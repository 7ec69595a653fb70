//! A durable key-value store keeping one bincode file per key.

use crate::cache::error::StoreError;
use crate::cache::store::KeyValueStore;
use async_trait::async_trait;
use bincode::config::{Configuration, Fixint, LittleEndian};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::{fs, task};

const FILE_EXTENSION: &str = "bin";
const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

#[derive(Serialize, Deserialize)]
struct StoredValue {
    expires_at: DateTime<Utc>,
    bytes: Vec<u8>,
}

/// Stores each key as `<dir>/<sanitized key>.bin`.
///
/// Writes go through a temporary file in the same directory and are renamed
/// into place, so readers never observe a half-written value. Files whose
/// expiry hint has passed are removed when read.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| StoreError::DirCreation(dir.to_path_buf(), e))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file_name}.{FILE_EXTENSION}"))
    }

    async fn remove_file(path: &Path) -> Result<(), StoreError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Delete(path.to_path_buf(), e)),
        }
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Read(path, e)),
        };

        let (stored, _) =
            bincode::serde::decode_from_slice::<StoredValue, _>(&raw, BINCODE_CONFIG)
                .map_err(|e| StoreError::Decode(key.to_string(), Box::new(e)))?;

        if Utc::now() >= stored.expires_at {
            debug!("Dropping expired store file {:?}", path);
            if let Err(e) = Self::remove_file(&path).await {
                warn!("{e}");
            }
            return Ok(None);
        }
        Ok(Some(stored.bytes))
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl_hint: Duration) -> Result<(), StoreError> {
        let ttl = chrono::Duration::from_std(ttl_hint).unwrap_or(chrono::Duration::MAX);
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let stored = StoredValue {
            expires_at,
            bytes: value,
        };
        let encoded = bincode::serde::encode_to_vec(&stored, BINCODE_CONFIG)
            .map_err(|e| StoreError::Encode(key.to_string(), Box::new(e)))?;

        let dir = self.dir.clone();
        let path = self.path_for(key);
        task::spawn_blocking(move || {
            let mut temp_file =
                NamedTempFile::new_in(&dir).map_err(|e| StoreError::Write(path.clone(), e))?;
            temp_file
                .write_all(&encoded)
                .map_err(|e| StoreError::Write(path.clone(), e))?;
            temp_file
                .flush()
                .map_err(|e| StoreError::Write(path.clone(), e))?;
            temp_file
                .persist(&path)
                .map_err(|e| StoreError::Write(path.clone(), e.error))?;
            Ok::<(), StoreError>(())
        })
        .await??;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        Self::remove_file(&self.path_for(key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_round_trip_and_overwrite() -> Result<(), StoreError> {
        let dir = TempDir::new().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let store = FileStore::open(dir.path()).await?;

        let key = "forecast:p2:4000:-10500:1748779200";
        assert!(store.get(key).await?.is_none());

        store.put(key, b"first".to_vec(), Duration::from_secs(60)).await?;
        store.put(key, b"second".to_vec(), Duration::from_secs(60)).await?;
        assert_eq!(store.get(key).await?, Some(b"second".to_vec()));
        assert!(dir
            .path()
            .join("forecast_p2_4000_-10500_1748779200.bin")
            .exists());

        store.delete(key).await?;
        assert!(store.get(key).await?.is_none());
        // Deleting a missing key is not an error.
        store.delete(key).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_file_is_removed_on_read() -> Result<(), StoreError> {
        let dir = TempDir::new().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let store = FileStore::open(dir.path()).await?;

        store.put("k", vec![7], Duration::ZERO).await?;
        assert!(store.get("k").await?.is_none());
        assert!(!store.path_for("k").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_decode_error() -> Result<(), StoreError> {
        let dir = TempDir::new().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let store = FileStore::open(dir.path()).await?;

        std::fs::write(store.path_for("k"), [0xFF]).unwrap();
        assert!(matches!(
            store.get("k").await,
            Err(StoreError::Decode(..))
        ));
        Ok(())
    }
}
