//! QuestLab Core Library
//!
//! This crate provides the configuration, error types, rate-limit action names and
//! text validation helpers that are shared across all QuestLab components.

pub mod action;
pub mod config;
pub mod error;
pub mod validation;

// Re-export commonly used types
pub use action::{rate_limit_key, RateLimitAction};
pub use config::{QuestlabConfig, RateLimitRule};
pub use error::{AppError, ErrorMetadata, LogLevel};
