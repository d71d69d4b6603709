//! Utterance normalization.

use unicode_normalization::UnicodeNormalization;

/// One turn's input text, NFKC-normalized and lowercased.
///
/// Every matcher in the pipeline works on this form, so keyword and cue
/// lists must be lowercase. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    normalized: String,
}

impl Utterance {
    pub fn new(raw: &str) -> Self {
        let normalized = raw.nfkc().collect::<String>().to_lowercase();
        Self { normalized }
    }

    pub fn text(&self) -> &str {
        &self.normalized
    }

    /// Plain substring test; "it" matches inside "with".
    pub fn contains(&self, needle: &str) -> bool {
        self.normalized.contains(needle)
    }

    pub fn contains_any<S: AsRef<str>>(&self, needles: &[S]) -> bool {
        needles.iter().any(|n| self.contains(n.as_ref()))
    }
}
