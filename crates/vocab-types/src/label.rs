//! Label type.

use crate::TermId;

/// A language-specific display string for a term.
///
/// A term holds at most one label per language code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Label {
    /// The term this label belongs to.
    pub term_id: TermId,
    /// Two-letter language code (e.g. "en").
    pub lang: String,
    /// Display text.
    pub label: String,
}

impl Label {
    /// Creates a label value.
    pub fn new(term_id: TermId, lang: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            term_id,
            lang: lang.into(),
            label: label.into(),
        }
    }

    /// Returns true if the label text contains `needle`, ignoring case.
    pub fn contains_ignore_case(&self, needle: &str) -> bool {
        self.label.to_lowercase().contains(&needle.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_ignore_case() {
        let label = Label::new(1, "en", "Italy");
        assert!(label.contains_ignore_case("ITA"));
        assert!(label.contains_ignore_case("aly"));
        assert!(!label.contains_ignore_case("france"));
    }
}
