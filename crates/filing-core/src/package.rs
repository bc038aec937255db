//! Final validation and packaging of a compilation run

use chrono::{DateTime, Utc};
use filing_types::{CaseMetadata, StepId, StepStatus};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::document::{Bookmark, CompiledDocument, IndexEntry};
use crate::error::PackagingError;
use crate::layout::{self, PaginationMode};
use crate::stepper::CompilationRun;

/// Which optional features were applied to the filing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    /// Mode used, or `None` when pagination was skipped
    pub pagination: Option<PaginationMode>,
    pub indexation: bool,
    pub bookmarking: bool,
    pub ocr: bool,
    pub document_count: u32,
    pub total_pages: u32,
}

/// Immutable, validated filing ready for export
#[derive(Debug, Clone, Serialize)]
pub struct FilingPackage {
    pub package_id: String,
    pub assembled_at: DateTime<Utc>,
    pub case: CaseMetadata,
    documents: Vec<CompiledDocument>,
    pub manifest: Manifest,
    index: Vec<IndexEntry>,
    bookmarks: Vec<Bookmark>,
}

impl FilingPackage {
    pub fn documents(&self) -> &[CompiledDocument] {
        &self.documents
    }

    /// Generated index rows; empty when indexation was skipped or disabled
    pub fn index(&self) -> &[IndexEntry] {
        &self.index
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    /// Index rows used for rendering. Falls back to the document list so
    /// every export carries a readable table of contents.
    pub fn index_rows(&self) -> Vec<IndexEntry> {
        if self.index.is_empty() {
            layout::build_index(&self.documents)
        } else {
            self.index.clone()
        }
    }

    /// Plain-text index, one line per document
    pub fn index_text(&self) -> String {
        let mut out = format!("{}\n{}\n\n", self.case.court, self.case.caption());
        for entry in self.index_rows() {
            let pages = entry
                .page_range
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(
                "{:>3}. {}  {}\n",
                entry.index, entry.document_name, pages
            ));
        }
        out
    }
}

fn settled(run: &CompilationRun, step: StepId) -> Result<bool, PackagingError> {
    match run.status(step) {
        StepStatus::Completed => Ok(true),
        StepStatus::Skipped => Ok(false),
        status => Err(PackagingError::StepUnsettled { step, status }),
    }
}

/// Validate a run and freeze it into a `FilingPackage`.
///
/// Checks run in a fixed order and the first failure is returned.
pub fn package(run: &CompilationRun) -> Result<FilingPackage, PackagingError> {
    let documents = run.documents();
    if documents.is_empty() {
        return Err(PackagingError::NoDocuments);
    }

    settled(run, StepId::Order)?;
    let paginated = settled(run, StepId::Pagination)?;
    let indexed = settled(run, StepId::Indexation)?;
    let bookmarked = settled(run, StepId::Bookmarking)?;

    let ocr_status = run.status(StepId::Ocr);
    if ocr_status != StepStatus::Completed {
        return Err(PackagingError::OcrNotCompleted {
            status: ocr_status,
            progress: run.ocr_progress(),
        });
    }

    if !layout::orders_contiguous(documents) {
        return Err(PackagingError::OrderNotContiguous {
            orders: documents.iter().map(|d| d.order).collect(),
        });
    }

    let mode = run.settings().pagination_mode;
    if paginated && mode == PaginationMode::Continuous {
        if let Some(doc) = layout::first_page_gap(documents) {
            return Err(PackagingError::PagesNotContiguous {
                document_id: doc.id.clone(),
            });
        }
    }

    let indexation = indexed && run.settings().indexation_enabled;
    let bookmarking = bookmarked && run.settings().bookmarking_enabled;
    let manifest = Manifest {
        pagination: paginated.then_some(mode),
        indexation,
        bookmarking,
        ocr: true,
        document_count: documents.len() as u32,
        total_pages: run.total_pages(),
    };

    let filing = FilingPackage {
        package_id: Uuid::new_v4().to_string(),
        assembled_at: Utc::now(),
        case: run.case().clone(),
        documents: documents.to_vec(),
        manifest,
        index: if indexation { run.index().to_vec() } else { Vec::new() },
        bookmarks: if bookmarking {
            run.bookmarks().to_vec()
        } else {
            Vec::new()
        },
    };

    info!(
        package = %filing.package_id,
        documents = filing.documents.len(),
        pages = filing.manifest.total_pages,
        "Filing package assembled"
    );
    Ok(filing)
}
