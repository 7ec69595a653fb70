use std::path::PathBuf;
use thiserror::Error;

/// The backing key-value store could not serve a request.
///
/// The resolver treats every variant as a cache miss and falls back to a live
/// fetch.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Key-value store unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to create store directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to read store file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to write store file '{0}'")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("Failed to delete store file '{0}'")]
    Delete(PathBuf, #[source] std::io::Error),

    #[error("Failed to decode stored value for key '{0}'")]
    Decode(String, #[source] Box<bincode::error::DecodeError>),

    #[error("Failed to encode value for key '{0}'")]
    Encode(String, #[source] Box<bincode::error::EncodeError>),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
