//! Regex patterns for script and certification detection

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Letters in the scripts courts typically require translated
    static ref VERNACULAR_SCRIPT: Regex = Regex::new(
        r"[\p{Devanagari}\p{Bengali}\p{Gurmukhi}\p{Gujarati}\p{Oriya}\p{Tamil}\p{Telugu}\p{Kannada}\p{Malayalam}\p{Arabic}]"
    )
    .unwrap();

    static ref LATIN_SCRIPT: Regex = Regex::new(r"\p{Latin}").unwrap();

    /// True-copy certification endorsements
    static ref CERTIFICATION: Regex = Regex::new(
        r"(?i)(certified\s+(?:to\s+be\s+)?(?:a\s+)?true\s+copy|true\s+copy\s+of\s+the\s+original|attested\s+true\s+copy)"
    )
    .unwrap();
}

/// Share of script letters that are vernacular (0.0 when the text has none)
pub fn vernacular_ratio(text: &str) -> f32 {
    let vernacular = VERNACULAR_SCRIPT.find_iter(text).count();
    let latin = LATIN_SCRIPT.find_iter(text).count();
    let total = vernacular + latin;
    if total == 0 {
        return 0.0;
    }
    vernacular as f32 / total as f32
}

pub fn has_certification(text: &str) -> bool {
    CERTIFICATION.is_match(text)
}
