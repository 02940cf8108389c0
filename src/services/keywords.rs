// src/services/keywords.rs

//! Keyword filter.
//!
//! Case-insensitive substring matching with no tokenization. "ui" matches
//! "Build" as well as "UI Designer"; postings are reviewed by a human, so
//! recall wins over precision here.

/// Precomputed, case-folded keyword set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    /// Build a filter from raw keywords. Blank keywords are dropped.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    /// Check whether any keyword occurs in `text`.
    pub fn matches(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let folded = text.to_lowercase();
        self.keywords.iter().any(|k| folded.contains(k.as_str()))
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

/// One-shot form of [`KeywordFilter::matches`].
pub fn matches<S: AsRef<str>>(text: &str, keywords: &[S]) -> bool {
    KeywordFilter::new(keywords).matches(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_never_matches() {
        assert!(!matches("", &["design"]));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(matches("Senior UX Designer", &["ux"]));
        assert!(matches("senior ux designer", &["UX"]));
    }

    #[test]
    fn test_no_match() {
        assert!(!matches("Engineer", &["design"]));
    }

    #[test]
    fn test_substring_is_permissive() {
        assert!(matches("Build Engineer", &["ui"]));
    }

    #[test]
    fn test_non_latin_keywords() {
        assert!(matches("高级视觉设计师", &["设计"]));
    }

    #[test]
    fn test_blank_keywords_dropped() {
        let filter = KeywordFilter::new(["", "  ", "Design"]);
        assert_eq!(filter.keywords(), ["design".to_string()]);
        assert!(!filter.matches("Engineer"));
        assert!(!KeywordFilter::new(Vec::<String>::new()).matches("Designer"));
    }
}
