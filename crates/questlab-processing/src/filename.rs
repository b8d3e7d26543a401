//! Storage names for accepted uploads
//!
//! The stored name is a server-generated identifier plus the extension of the
//! client's filename. Nothing else from the client's name survives, so path
//! components and traversal sequences cannot reach storage.

use uuid::Uuid;

/// Longest name a stored file may have
pub const MAX_STORAGE_NAME_LEN: usize = 255;

/// Longest extension carried over, including the dot
pub const MAX_EXTENSION_LEN: usize = 16;

/// Extension of the client's filename, with its dot and original case.
///
/// Taken from the text after the last dot, the same suffix the validator checks
/// against the allow-list, so the stem never decides whether it survives.
/// Control characters and surrounding whitespace are dropped. Empty when there
/// is no extension or it is not plain ASCII alphanumerics.
pub fn storage_extension(filename: &str) -> String {
    let Some((_, raw)) = filename.rsplit_once('.') else {
        return String::new();
    };
    let ext: String = raw.chars().filter(|c| !c.is_control()).collect();
    let ext = ext.trim();
    if ext.is_empty()
        || ext.len() + 1 > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        String::new()
    } else {
        format!(".{}", ext)
    }
}

/// Build the stored name from a generated identifier and the client's filename.
///
/// `build_storage_name("../../etc/passwd.png", "abc123")` is `"abc123.png"`.
pub fn build_storage_name(original_filename: &str, generated_id: &str) -> String {
    let ext = storage_extension(original_filename);
    let id: String = generated_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(MAX_STORAGE_NAME_LEN - ext.len())
        .collect();
    format!("{}{}", id, ext)
}

/// Stored name with a fresh random identifier.
pub fn generate_storage_name(original_filename: &str) -> String {
    build_storage_name(original_filename, &Uuid::new_v4().to_string())
}
