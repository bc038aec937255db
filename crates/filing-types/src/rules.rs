//! Court filing rules used by scrutiny and translation

use serde::{Deserialize, Serialize};

use crate::types::PaperSize;

/// Per-court formatting and language requirements.
///
/// Loaded from JSON by the CLI; `Default` models an English-language
/// appellate registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourtRules {
    /// Languages the registry accepts without translation. The first entry
    /// is the translation target.
    pub accepted_languages: Vec<String>,
    pub paper: PaperSize,
    pub min_font_size_pt: f32,
    pub min_line_spacing: f32,
    pub min_margin_mm: u32,
    /// Share of letters in non-Latin scripts above which a document counts
    /// as vernacular, regardless of its declared language.
    pub vernacular_script_threshold: f32,
    /// Require true-copy certification on every document, not only annexures
    pub certification_required_for_all: bool,
}

impl Default for CourtRules {
    fn default() -> Self {
        Self {
            accepted_languages: vec!["en".to_string()],
            paper: PaperSize::A4,
            min_font_size_pt: 14.0,
            min_line_spacing: 1.5,
            min_margin_mm: 40,
            vernacular_script_threshold: 0.2,
            certification_required_for_all: false,
        }
    }
}

impl CourtRules {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Language translations are drafted into
    pub fn target_language(&self) -> &str {
        self.accepted_languages
            .first()
            .map(String::as_str)
            .unwrap_or("en")
    }

    pub fn accepts_language(&self, language: &str) -> bool {
        self.accepted_languages
            .iter()
            .any(|l| l.eq_ignore_ascii_case(language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let rules = CourtRules::from_json(r#"{"accepted_languages":["en","hi"]}"#).unwrap();
        assert_eq!(rules.target_language(), "en");
        assert!(rules.accepts_language("HI"));
        assert_eq!(rules.min_margin_mm, 40);
    }

    #[test]
    fn test_empty_language_list_falls_back_to_english() {
        let rules = CourtRules {
            accepted_languages: vec![],
            ..CourtRules::default()
        };
        assert_eq!(rules.target_language(), "en");
        assert!(!rules.accepts_language("en"));
    }
}
