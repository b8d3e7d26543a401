use std::io::Cursor;
use std::sync::Arc;

use questlab_core::{AppError, RateLimitAction};
use questlab_infra::ActionRateLimiter;
use questlab_storage::Storage;

use super::types::StoredUpload;
use crate::filename::generate_storage_name;
use crate::validator::{UploadValidator, ValidationError};

/// Validate-then-store flow for uploaded media
///
/// Nothing reaches storage unless the client is within its upload budget and
/// the file passes every validator check.
#[derive(Clone)]
pub struct UploadPipeline {
    validator: Arc<UploadValidator>,
    limiter: ActionRateLimiter,
    storage: Arc<dyn Storage>,
}

impl UploadPipeline {
    pub fn new(
        validator: Arc<UploadValidator>,
        limiter: ActionRateLimiter,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            validator,
            limiter,
            storage,
        }
    }

    pub fn validator(&self) -> &UploadValidator {
        &self.validator
    }

    /// Run the upload pipeline: rate limit → validate → name → store.
    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    pub async fn store(
        &self,
        client: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<StoredUpload, AppError> {
        self.limiter.enforce(RateLimitAction::Upload, client)?;

        let mut cursor = Cursor::new(data);
        let size_bytes = self.validator.validate(filename, &mut cursor).map_err(|e| {
            tracing::warn!(error = %e, "Upload rejected");
            AppError::from(e)
        })?;

        let storage_name = generate_storage_name(filename);
        let storage_key = self
            .storage
            .put(&storage_name, cursor.into_inner())
            .await?;

        tracing::info!(
            storage_name = %storage_name,
            size_bytes = size_bytes,
            "Upload stored"
        );

        Ok(StoredUpload {
            storage_name,
            storage_key,
            size_bytes,
        })
    }

    /// Validation only, without touching the rate limiter or storage.
    pub fn check(&self, filename: &str, data: &[u8]) -> Result<u64, ValidationError> {
        self.validator.validate(filename, &mut Cursor::new(data))
    }
}
