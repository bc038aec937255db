//! Pre-filing defect scrutiny
//!
//! Runs every rule over every document of an intake and returns the defects
//! sorted critical-first. Scrutiny is a pure function of the intake and the
//! court rules: no clock, no randomness, so the same intake always yields
//! the same defect list.

pub mod patterns;
pub mod rules;
pub mod validate;

pub use validate::validate_intake;

use filing_types::{CaseIntake, CourtRules, DefectItem, SourceDocument, ValidationError};

/// ScrutinyEngine entry point
#[derive(Debug, Clone, Default)]
pub struct ScrutinyEngine {
    rules: CourtRules,
}

impl ScrutinyEngine {
    pub fn new(rules: CourtRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &CourtRules {
        &self.rules
    }

    /// Validate the intake, then collect and sort defects.
    ///
    /// Order: severity (critical, moderate, suggestion), then the document's
    /// position in the intake, then rule order.
    pub fn scrutinize(&self, intake: &CaseIntake) -> Result<Vec<DefectItem>, ValidationError> {
        validate_intake(intake)?;

        let mut ranked: Vec<(usize, DefectItem)> = Vec::new();
        for (position, doc) in intake.documents.iter().enumerate() {
            ranked.extend(self.check_document(doc).into_iter().map(|d| (position, d)));
        }

        // Stable sort keeps rule order within a document
        ranked.sort_by_key(|(position, defect)| (defect.severity, *position));

        Ok(ranked.into_iter().map(|(_, defect)| defect).collect())
    }

    /// Run all rules on one document, in rule order
    pub fn check_document(&self, doc: &SourceDocument) -> Vec<DefectItem> {
        let mut defects = Vec::new();
        defects.extend(rules::translation::check_translation(doc, &self.rules));
        defects.extend(rules::certificate::check_certificate(doc, &self.rules));
        defects.extend(rules::format::check_format(doc, &self.rules));
        defects.extend(rules::text_layer::check_text_layer(doc));
        defects
    }
}
