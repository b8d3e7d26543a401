//! Keyword feedback for reflections

/// How many matched concepts the feedback names
pub const MAX_MENTIONED_CONCEPTS: usize = 3;

pub const GENERIC_FEEDBACK: &str = "Good reflection! Consider connecting your observations to specific scientific concepts in your next submission.";

const KEYWORDS: &[(&str, &[&str])] = &[
    (
        "science",
        &["observe", "experiment", "hypothesis", "data", "results"],
    ),
    (
        "physics",
        &["energy", "motion", "force", "velocity", "acceleration"],
    ),
    (
        "biology",
        &["cell", "organism", "ecosystem", "evolution", "DNA"],
    ),
    (
        "chemistry",
        &["element", "compound", "reaction", "molecule", "atom"],
    ),
];

/// Matches a reflection against the concept keywords of its quest tags.
///
/// Matching is case-insensitive substring search, so "observed" counts for
/// "observe". Tags without a keyword list are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackAnalyzer;

impl FeedbackAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Tags that have a keyword list.
    pub fn known_tags(&self) -> impl Iterator<Item = &'static str> {
        KEYWORDS.iter().map(|(tag, _)| *tag)
    }

    /// Keywords found in `text`, in tag order then list order, without repeats.
    pub fn matched_concepts<S: AsRef<str>>(&self, text: &str, tags: &[S]) -> Vec<&'static str> {
        let text = text.to_lowercase();
        let mut found: Vec<&'static str> = Vec::new();

        for tag in tags {
            let tag = tag.as_ref().trim().to_lowercase();
            let Some((_, keywords)) = KEYWORDS.iter().find(|(name, _)| *name == tag) else {
                continue;
            };
            for keyword in keywords.iter() {
                if text.contains(&keyword.to_lowercase()) && !found.contains(keyword) {
                    found.push(*keyword);
                }
            }
        }

        found
    }

    pub fn analyze<S: AsRef<str>>(&self, text: &str, tags: &[S]) -> String {
        let found = self.matched_concepts(text, tags);
        if found.is_empty() {
            return GENERIC_FEEDBACK.to_string();
        }

        let mentioned: Vec<&str> = found.into_iter().take(MAX_MENTIONED_CONCEPTS).collect();
        format!(
            "Great work! You used relevant concepts like: {}. Keep exploring!",
            mentioned.join(", ")
        )
    }
}
