//! Upload pipeline: rate limit, validate, name, store.

pub mod pipeline;
pub mod types;

pub use pipeline::UploadPipeline;
pub use types::StoredUpload;
