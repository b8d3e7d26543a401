#[cfg(feature = "storage-local")]
use crate::LocalStorage;
use crate::{Storage, StorageResult};
use questlab_core::QuestlabConfig;
use std::sync::Arc;

/// Create the storage backend for accepted uploads
#[cfg(feature = "storage-local")]
pub async fn create_storage(config: &QuestlabConfig) -> StorageResult<Arc<dyn Storage>> {
    let storage = LocalStorage::new(config.upload_folder.clone()).await?;
    tracing::debug!(
        upload_folder = %config.upload_folder.display(),
        "Using local upload storage"
    );
    Ok(Arc::new(storage))
}

#[cfg(not(feature = "storage-local"))]
pub async fn create_storage(_config: &QuestlabConfig) -> StorageResult<Arc<dyn Storage>> {
    Err(crate::StorageError::ConfigError(
        "No storage backend available (storage-local feature not enabled)".to_string(),
    ))
}
