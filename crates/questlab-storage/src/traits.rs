//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use async_trait::async_trait;
use questlab_core::AppError;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("File {} not found", key)),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Storage abstraction trait
///
/// Backends persist accepted uploads under a caller-chosen key (the generated
/// storage name). Writes never replace an existing object.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist `data` under `storage_key`; fails with `AlreadyExists` on collision.
    /// Returns the key the object is reachable under.
    async fn put(&self, storage_key: &str, data: Vec<u8>) -> StorageResult<String>;

    /// Read back a stored object
    async fn get(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Check if an object exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;
}
