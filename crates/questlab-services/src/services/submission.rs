//! Submission intake
//!
//! A submission pairs stored media with the learner's reflection. Intake
//! sanitises the reflection and tags and attaches keyword feedback; persisting
//! the record is left to the caller.

use chrono::{DateTime, Utc};
use serde::Serialize;

use questlab_core::validation::{normalize_tags, sanitize_input};
use questlab_core::AppError;
use questlab_processing::UploadPipeline;

use super::analysis::FeedbackAnalyzer;

/// Accepted submission, ready to persist
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub media_filename: String,
    pub reflection: String,
    pub tags: Vec<String>,
    pub feedback: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SubmissionIntake {
    analyzer: FeedbackAnalyzer,
}

impl SubmissionIntake {
    pub fn new(analyzer: FeedbackAnalyzer) -> Self {
        Self { analyzer }
    }

    /// Accept a submission for media that is already stored.
    ///
    /// `quest_tags` is the quest's comma-separated tag list.
    pub fn accept(
        &self,
        media_filename: &str,
        reflection: &str,
        quest_tags: &str,
    ) -> Result<SubmissionReceipt, AppError> {
        let media_filename = media_filename.trim();
        if media_filename.is_empty() {
            return Err(AppError::InvalidInput("No file selected".into()));
        }

        let reflection = self.sanitize_reflection(reflection)?;
        let tags = normalize_tags(quest_tags);
        let feedback = self.analyzer.analyze(&reflection, &tags);

        tracing::debug!(
            media_filename = %media_filename,
            tags = ?tags,
            "Submission accepted"
        );

        Ok(SubmissionReceipt {
            media_filename: media_filename.to_string(),
            reflection,
            tags,
            feedback,
            submitted_at: Utc::now(),
        })
    }

    fn sanitize_reflection(&self, reflection: &str) -> Result<String, AppError> {
        let reflection = sanitize_input(reflection);
        if reflection.is_empty() {
            return Err(AppError::InvalidInput("Reflection is required".into()));
        }
        Ok(reflection)
    }
}

/// Upload plus intake in one step
#[derive(Clone)]
pub struct SubmissionService {
    pipeline: UploadPipeline,
    intake: SubmissionIntake,
}

impl SubmissionService {
    pub fn new(pipeline: UploadPipeline, intake: SubmissionIntake) -> Self {
        Self { pipeline, intake }
    }

    /// Store the media through the upload pipeline, then accept the submission.
    ///
    /// The reflection is checked first so a rejected submission leaves no
    /// stored file behind.
    pub async fn submit(
        &self,
        client: &str,
        filename: &str,
        data: Vec<u8>,
        reflection: &str,
        quest_tags: &str,
    ) -> Result<SubmissionReceipt, AppError> {
        self.intake.sanitize_reflection(reflection)?;
        let stored = self.pipeline.store(client, filename, data).await?;
        self.intake
            .accept(&stored.storage_name, reflection, quest_tags)
    }
}
