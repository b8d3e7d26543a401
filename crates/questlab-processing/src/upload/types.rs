//! Types for the upload pipeline.

use serde::Serialize;

/// Result of a successful upload.
#[derive(Clone, Debug, Serialize)]
pub struct StoredUpload {
    /// Server-generated name, `<uuid><ext>`
    pub storage_name: String,
    /// Key returned by the storage backend
    pub storage_key: String,
    pub size_bytes: u64,
}
