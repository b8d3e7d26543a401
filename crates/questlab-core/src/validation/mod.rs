//! Validation modules

pub mod text;

pub use text::{normalize_tags, sanitize_input, MAX_TAGS};
