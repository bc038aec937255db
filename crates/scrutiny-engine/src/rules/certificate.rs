// True-copy certification for annexures
use crate::patterns::has_certification;
use filing_types::{CourtRules, DefectItem, DefectKind, DocumentKind, Severity, SourceDocument};

pub fn check_certificate(doc: &SourceDocument, rules: &CourtRules) -> Vec<DefectItem> {
    let required = doc.kind.is_annexure()
        || (rules.certification_required_for_all && doc.kind != DocumentKind::Certificate);
    if !required || doc.certified || has_certification(&doc.text) {
        return Vec::new();
    }

    let severity = if doc.kind.is_annexure() {
        Severity::Critical
    } else {
        Severity::Moderate
    };

    vec![DefectItem::open(
        doc,
        DefectKind::MissingCertificate,
        severity,
        format!("'{}' is not certified as a true copy of the original", doc.name),
    )]
}
