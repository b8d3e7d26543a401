//! Shared key validation for storage backends.

use crate::traits::{StorageError, StorageResult};

/// Longest key accepted; matches the width of the `media_filename` column.
pub const MAX_KEY_LENGTH: usize = 255;

/// Reject keys that could address anything other than a single file directly
/// under the backend's root.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() || storage_key.len() > MAX_KEY_LENGTH {
        return Err(StorageError::InvalidKey(format!(
            "Storage key must be 1-{} bytes",
            MAX_KEY_LENGTH
        )));
    }
    if storage_key.contains("..")
        || storage_key.starts_with('.')
        || storage_key
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control())
    {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
