use thiserror::Error;

use crate::types::ResolutionStrategy;
use crate::step::StepId;

/// Malformed input or an illegal state transition.
///
/// Always reported synchronously to the caller and never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Intake is missing required field: {0}")]
    MissingField(&'static str),

    #[error("Intake contains no documents")]
    NoDocuments,

    #[error("Duplicate document id in intake: {0}")]
    DuplicateDocumentId(String),

    #[error("Invalid document '{id}': {reason}")]
    InvalidDocument { id: String, reason: String },

    #[error("Filing has {pages} pages; at most {limit} are allowed")]
    TooManyPages { pages: u64, limit: u32 },

    #[error("Unknown document: {0}")]
    UnknownDocument(String),

    #[error("Unknown defect: {0}")]
    UnknownDefect(String),

    #[error("Defect {0} is waived and cannot be changed")]
    DefectWaived(String),

    #[error("Defect {0} is already resolved; supply an instruction to redo it")]
    AlreadyResolved(String),

    #[error("Defect {defect_id} was resolved with {active:?}; redo must use the same strategy, not {requested:?}")]
    StrategyMismatch {
        defect_id: String,
        active: ResolutionStrategy,
        requested: ResolutionStrategy,
    },

    #[error("{0:?} requires an instruction")]
    InstructionRequired(ResolutionStrategy),

    #[error("{strategy:?} cannot resolve defect {defect_id}")]
    StrategyNotApplicable {
        defect_id: String,
        strategy: ResolutionStrategy,
    },

    #[error("Defect {0} has a draft in progress")]
    DefectDrafting(String),

    #[error("Defects still open: {}", .0.join(", "))]
    DefectsOutstanding(Vec<String>),

    #[error("Step '{0}' cannot be skipped")]
    NotSkippable(StepId),

    #[error("Step '{0}' is not complete")]
    StepIncomplete(StepId),

    #[error("Operation requires step '{expected}', but the current step is '{current}'")]
    WrongStep { expected: StepId, current: StepId },

    #[error("Index {index} out of range for {len} documents")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Already at the first step")]
    NoPreviousStep,

    #[error("Compilation run is finished")]
    RunFinished,

    #[error("OCR is {progress}% complete; 100% required")]
    OcrIncomplete { progress: u8 },

    #[error("Compilation run is busy with another operation")]
    StepperBusy,

    #[error("Compilation run has been archived")]
    RunArchived,

    #[error("Command '{0}' is not valid at this point of the pipeline")]
    CommandOutOfPhase(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_step() {
        assert_eq!(
            ValidationError::NotSkippable(StepId::Ocr).to_string(),
            "Step 'ocr' cannot be skipped"
        );
        let err = ValidationError::DefectsOutstanding(vec!["a/x".into(), "b/y".into()]);
        assert_eq!(err.to_string(), "Defects still open: a/x, b/y");
    }
}
