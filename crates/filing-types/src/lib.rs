pub mod audit;
pub mod error;
pub mod rules;
pub mod step;
pub mod types;

pub use error::ValidationError;
pub use rules::CourtRules;
pub use step::{StepId, StepStatus};
pub use types::{
    CaseIntake, CaseMetadata, DefectItem, DefectKind, DocumentKind, PageFormat, PaperSize,
    Resolution, ResolutionState, ResolutionStrategy, Severity, SourceDocument, MAX_DOCUMENT_PAGES,
    MAX_FILING_PAGES,
};
