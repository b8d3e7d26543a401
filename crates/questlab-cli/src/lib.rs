//! Output helpers for the `questlab` binary.

use std::io::{self, Read, Seek};

use clap::ValueEnum;
use serde::Serialize;

use questlab_infra::ErrorResponse;
use questlab_processing::{generate_storage_name, stream_len, StoredUpload, UploadValidator};
use questlab_services::SubmissionReceipt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

/// Human-readable rendering of a command result
pub trait TextReport {
    fn to_text(&self) -> String;
}

/// Outcome of `questlab check`
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub filename: String,
    pub size_bytes: u64,
    pub allowed_extension: bool,
    pub within_size_limit: bool,
    pub content_valid: bool,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sniffer: Option<&'static str>,
    /// Name the file would be stored under, when accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_name: Option<String>,
}

/// Run the upload checks on `stream` without storing it.
///
/// The size is measured by seeking, before anything is read. Content is only
/// inspected for a file that passes the extension and size checks.
pub fn check_upload<R: Read + Seek>(
    validator: &UploadValidator,
    filename: &str,
    stream: &mut R,
) -> io::Result<CheckReport> {
    let size_bytes = stream_len(stream)?;
    let allowed_extension = validator.is_allowed_extension(filename);
    let within_size_limit = size_bytes <= validator.max_file_size();
    let content_valid =
        allowed_extension && within_size_limit && validator.validate_content(stream, filename);
    let accepted = allowed_extension && within_size_limit && content_valid;

    Ok(CheckReport {
        filename: filename.to_string(),
        size_bytes,
        allowed_extension,
        within_size_limit,
        content_valid,
        accepted,
        sniffer: validator.sniffer_name(),
        storage_name: accepted.then(|| generate_storage_name(filename)),
    })
}

#[derive(Debug, Serialize)]
pub struct FeedbackReport {
    pub tags: Vec<String>,
    pub concepts: Vec<&'static str>,
    pub feedback: String,
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

impl TextReport for CheckReport {
    fn to_text(&self) -> String {
        let mut lines = vec![
            format!("File:              {}", self.filename),
            format!("Size:              {} bytes", self.size_bytes),
            format!("Allowed extension: {}", yes_no(self.allowed_extension)),
            format!("Within size limit: {}", yes_no(self.within_size_limit)),
            format!("Content valid:     {}", yes_no(self.content_valid)),
            format!("Sniffer:           {}", self.sniffer.unwrap_or("none")),
            format!(
                "Verdict:           {}",
                if self.accepted { "accepted" } else { "rejected" }
            ),
        ];
        if let Some(name) = &self.storage_name {
            lines.push(format!("Storage name:      {}", name));
        }
        lines.join("\n")
    }
}

impl TextReport for StoredUpload {
    fn to_text(&self) -> String {
        format!(
            "Stored {} ({} bytes) at {}",
            self.storage_name, self.size_bytes, self.storage_key
        )
    }
}

impl TextReport for SubmissionReceipt {
    fn to_text(&self) -> String {
        format!(
            "Media:      {}\nTags:       {}\nReflection: {}\n\n{}",
            self.media_filename,
            self.tags.join(", "),
            self.reflection,
            self.feedback
        )
    }
}

impl TextReport for FeedbackReport {
    fn to_text(&self) -> String {
        self.feedback.clone()
    }
}

impl TextReport for ErrorResponse {
    fn to_text(&self) -> String {
        match &self.details {
            Some(details) => format!("Error [{}]: {} ({})", self.code, self.error, details),
            None => format!("Error [{}]: {}", self.code, self.error),
        }
    }
}

pub fn render<T: Serialize + TextReport>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Text => value.to_text(),
    })
}
