//! QuestLab Services Layer
//!
//! Business services on top of processing and storage: keyword feedback for
//! reflections and submission intake. Re-exports the upload types so the CLI
//! depends on a single service facade.

pub mod services;

pub use questlab_infra::{ActionRateLimiter, RateLimiter};
pub use questlab_processing::{StoredUpload, UploadPipeline, UploadValidator};
pub use questlab_storage::{create_storage, LocalStorage, Storage, StorageError, StorageResult};
pub use services::analysis::FeedbackAnalyzer;
pub use services::submission::{SubmissionIntake, SubmissionReceipt, SubmissionService};
