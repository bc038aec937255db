// Page format requirements: paper, font size, line spacing, margins
use filing_types::{CourtRules, DefectItem, DefectKind, Severity, SourceDocument};

/// Reports every format breach of a document as a single defect.
pub fn check_format(doc: &SourceDocument, rules: &CourtRules) -> Vec<DefectItem> {
    let format = &doc.format;
    let mut breaches = Vec::new();

    if format.paper != rules.paper {
        breaches.push(format!(
            "paper size {:?} (required {:?})",
            format.paper, rules.paper
        ));
    }
    if format.font_size_pt < rules.min_font_size_pt {
        breaches.push(format!(
            "font size {}pt (minimum {}pt)",
            format.font_size_pt, rules.min_font_size_pt
        ));
    }
    if format.line_spacing < rules.min_line_spacing {
        breaches.push(format!(
            "line spacing {} (minimum {})",
            format.line_spacing, rules.min_line_spacing
        ));
    }
    if format.margin_mm < rules.min_margin_mm {
        breaches.push(format!(
            "margin {}mm (minimum {}mm)",
            format.margin_mm, rules.min_margin_mm
        ));
    }

    if breaches.is_empty() {
        return Vec::new();
    }

    vec![DefectItem::open(
        doc,
        DefectKind::FormatViolation,
        Severity::Moderate,
        format!("'{}' breaches format rules: {}", doc.name, breaches.join("; ")),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::document;
    use filing_types::{DocumentKind, PaperSize};

    #[test]
    fn test_default_format_is_compliant() {
        let doc = document("p1", "Petition", DocumentKind::Petition, "en");
        assert!(check_format(&doc, &CourtRules::default()).is_empty());
    }

    #[test]
    fn test_all_breaches_reported_in_one_defect() {
        let mut doc = document("p1", "Petition", DocumentKind::Petition, "en");
        doc.format.paper = PaperSize::Letter;
        doc.format.font_size_pt = 11.0;
        doc.format.margin_mm = 20;

        let defects = check_format(&doc, &CourtRules::default());
        assert_eq!(defects.len(), 1);
        let message = &defects[0].message;
        assert!(message.contains("paper size Letter"));
        assert!(message.contains("font size 11pt"));
        assert!(message.contains("margin 20mm"));
        assert!(!message.contains("line spacing"));
        assert_eq!(defects[0].severity, Severity::Moderate);
    }
}
