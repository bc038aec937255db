use filing_types::{StepId, StepStatus, ValidationError};
use thiserror::Error;

/// A resolution task failed or was cancelled. The defect keeps its last
/// stable state and the caller may retry with a new instruction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionFailure {
    #[error("Resolution of {defect_id} was cancelled")]
    Cancelled { defect_id: String },

    #[error("Resolution of {defect_id} failed: {message}")]
    Capability { defect_id: String, message: String },
}

/// OCR task failure; pages of the interrupted document are discarded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OcrFailure {
    #[error("OCR cancelled at page {page} of {document_id}")]
    Cancelled { document_id: String, page: u32 },

    #[error("OCR failed at page {page} of {document_id}: {message}")]
    Capability {
        document_id: String,
        page: u32,
        message: String,
    },
}

/// Completeness or invariant violation found by final validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PackagingError {
    #[error("Compilation run has no documents")]
    NoDocuments,

    #[error("Step '{step}' is {status:?}; it must be completed or skipped")]
    StepUnsettled { step: StepId, status: StepStatus },

    #[error("Step 'ocr' must be completed; it is {status:?} at {progress}%")]
    OcrNotCompleted { status: StepStatus, progress: u8 },

    #[error("Document order is not contiguous from 1: {orders:?}")]
    OrderNotContiguous { orders: Vec<u32> },

    #[error("Page numbering is not contiguous at document '{document_id}'")]
    PagesNotContiguous { document_id: String },
}

impl PackagingError {
    /// Step the user should be routed back to
    pub fn failing_step(&self) -> Option<StepId> {
        match self {
            PackagingError::NoDocuments => None,
            PackagingError::StepUnsettled { step, .. } => Some(*step),
            PackagingError::OcrNotCompleted { .. } => Some(StepId::Ocr),
            PackagingError::OrderNotContiguous { .. } => Some(StepId::Order),
            PackagingError::PagesNotContiguous { .. } => Some(StepId::Pagination),
        }
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("Invalid file name: {0}")]
    InvalidFilename(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability (translator, OCR engine) failure
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct CapabilityError(pub String);

#[derive(Error, Debug)]
pub enum FilingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Resolution(#[from] ResolutionFailure),

    #[error(transparent)]
    Ocr(#[from] OcrFailure),

    #[error(transparent)]
    Packaging(#[from] PackagingError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packaging_error_routes_to_step() {
        let err = PackagingError::OcrNotCompleted {
            status: StepStatus::Current,
            progress: 60,
        };
        assert_eq!(err.failing_step(), Some(StepId::Ocr));
        assert!(err.to_string().contains("'ocr'"));
        assert!(err.to_string().contains("60%"));

        let err = PackagingError::StepUnsettled {
            step: StepId::Bookmarking,
            status: StepStatus::Pending,
        };
        assert_eq!(err.failing_step(), Some(StepId::Bookmarking));
    }
}
