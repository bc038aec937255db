//! Intake validation, run before any scrutiny rule

use std::collections::HashSet;

use filing_types::{CaseIntake, ValidationError, MAX_DOCUMENT_PAGES, MAX_FILING_PAGES};

/// Reject intakes missing case fields or carrying unusable documents.
///
/// Validation errors block scrutiny entirely; they are never reported as
/// defects.
pub fn validate_intake(intake: &CaseIntake) -> Result<(), ValidationError> {
    let required = [
        ("court", &intake.court),
        ("case_type", &intake.case_type),
        ("petitioner", &intake.petitioner),
        ("respondent", &intake.respondent),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ValidationError::MissingField(field));
        }
    }

    if intake.documents.is_empty() {
        return Err(ValidationError::NoDocuments);
    }

    let mut seen = HashSet::new();
    for doc in &intake.documents {
        if doc.id.trim().is_empty() {
            return Err(ValidationError::InvalidDocument {
                id: doc.name.clone(),
                reason: "document id is blank".to_string(),
            });
        }
        if !seen.insert(doc.id.as_str()) {
            return Err(ValidationError::DuplicateDocumentId(doc.id.clone()));
        }
        if doc.name.trim().is_empty() {
            return Err(ValidationError::InvalidDocument {
                id: doc.id.clone(),
                reason: "document name is blank".to_string(),
            });
        }
        if doc.page_count == 0 {
            return Err(ValidationError::InvalidDocument {
                id: doc.id.clone(),
                reason: "page count must be at least 1".to_string(),
            });
        }
        if doc.page_count > MAX_DOCUMENT_PAGES {
            return Err(ValidationError::InvalidDocument {
                id: doc.id.clone(),
                reason: format!("page count exceeds {}", MAX_DOCUMENT_PAGES),
            });
        }
    }

    let pages: u64 = intake.documents.iter().map(|d| u64::from(d.page_count)).sum();
    if pages > u64::from(MAX_FILING_PAGES) {
        return Err(ValidationError::TooManyPages {
            pages,
            limit: MAX_FILING_PAGES,
        });
    }

    Ok(())
}
