// Vernacular content must be translated into a language the registry accepts
use crate::patterns::vernacular_ratio;
use filing_types::{CourtRules, DefectItem, DefectKind, Severity, SourceDocument};

/// Flags documents declared in, or written in, a language the court does
/// not accept.
pub fn check_translation(doc: &SourceDocument, rules: &CourtRules) -> Vec<DefectItem> {
    let mut defects = Vec::new();

    if !rules.accepts_language(&doc.language) {
        defects.push(DefectItem::open(
            doc,
            DefectKind::UntranslatedAnnexure,
            Severity::Critical,
            format!(
                "'{}' is in '{}'; the registry accepts {} and requires a translation into '{}'",
                doc.name,
                doc.language,
                rules.accepted_languages.join(", "),
                rules.target_language()
            ),
        ));
        return defects;
    }

    // Declared language is accepted but the text layer says otherwise
    let ratio = vernacular_ratio(&doc.text);
    if ratio > rules.vernacular_script_threshold {
        defects.push(DefectItem::open(
            doc,
            DefectKind::UntranslatedAnnexure,
            Severity::Critical,
            format!(
                "'{}' is declared '{}' but {:.0}% of its text is in a vernacular script",
                doc.name,
                doc.language,
                ratio * 100.0
            ),
        ));
    }

    defects
}
