//! Free-text input validation
//!
//! Reflection text and quest tags are user-authored and end up rendered in
//! pages owned by the surrounding web layer. Angle brackets are removed so the
//! text can never open a tag; everything else is preserved.

/// Maximum number of tags kept by [`normalize_tags`]
pub const MAX_TAGS: usize = 20;

/// Strip `<` and `>` and surrounding whitespace.
pub fn sanitize_input(text: &str) -> String {
    text.chars()
        .filter(|c| *c != '<' && *c != '>')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Split a comma-separated tag list into sanitised, lowercased, unique tags.
///
/// Order of first appearance is preserved and empty entries are dropped.
pub fn normalize_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for part in raw.split(',') {
        let tag = sanitize_input(part).to_lowercase();
        if tag.is_empty() || tags.contains(&tag) {
            continue;
        }
        tags.push(tag);
        if tags.len() == MAX_TAGS {
            break;
        }
    }
    tags
}
