use filing_types::{DefectItem, DefectKind, Severity, SourceDocument};

/// Image-only scans are flagged as a suggestion; OCR during compilation
/// adds the text layer.
pub fn check_text_layer(doc: &SourceDocument) -> Vec<DefectItem> {
    if !doc.text.trim().is_empty() {
        return Vec::new();
    }
    vec![DefectItem::open(
        doc,
        DefectKind::MissingTextLayer,
        Severity::Suggestion,
        format!(
            "'{}' has no text layer; its {} page(s) will be OCR'd during compilation",
            doc.name, doc.page_count
        ),
    )]
}
