//! Compilation stepper
//!
//! A `CompilationRun` moves through `order → pagination → indexation →
//! bookmarking → ocr`. Every transition takes `&self` and returns a new run,
//! so a rejected transition leaves the caller's run exactly as it was.
//!
//! Invariants:
//! - `order` fields are always `1..N`.
//! - Reordering resets page ranges, index and bookmarks; those steps are
//!   `pending` at that point and must be re-applied against the new order.
//! - `back()` keeps settings and outputs, so re-applying without changes
//!   reproduces the same output.

use std::collections::{BTreeMap, HashSet};

use filing_types::{CaseMetadata, StepId, StepStatus, ValidationError, MAX_FILING_PAGES};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::{Bookmark, CompiledDocument, IndexEntry, OcrStatus};
use crate::layout::{self, PaginationMode};
use crate::resolution::ResolvedDocumentSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSettings {
    pub pagination_mode: PaginationMode,
    pub indexation_enabled: bool,
    pub bookmarking_enabled: bool,
}

impl Default for StepSettings {
    fn default() -> Self {
        Self {
            pagination_mode: PaginationMode::Continuous,
            indexation_enabled: true,
            bookmarking_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationRun {
    case: CaseMetadata,
    documents: Vec<CompiledDocument>,
    current: StepId,
    statuses: BTreeMap<StepId, StepStatus>,
    settings: StepSettings,
    index: Vec<IndexEntry>,
    bookmarks: Vec<Bookmark>,
    finished: bool,
}

impl CompilationRun {
    pub fn new(resolved: &ResolvedDocumentSet) -> Result<Self, ValidationError> {
        if resolved.documents.is_empty() {
            return Err(ValidationError::NoDocuments);
        }

        let mut ids = HashSet::new();
        if let Some(doc) = resolved.documents.iter().find(|d| !ids.insert(d.id.as_str())) {
            return Err(ValidationError::DuplicateDocumentId(doc.id.clone()));
        }

        let pages: u64 = resolved
            .documents
            .iter()
            .map(|d| u64::from(d.page_count))
            .sum();
        if pages > u64::from(MAX_FILING_PAGES) {
            return Err(ValidationError::TooManyPages {
                pages,
                limit: MAX_FILING_PAGES,
            });
        }

        let documents = resolved
            .documents
            .iter()
            .enumerate()
            .map(|(i, doc)| CompiledDocument::from_source(doc, i as u32 + 1))
            .collect();

        let mut statuses: BTreeMap<StepId, StepStatus> = StepId::ALL
            .iter()
            .map(|step| (*step, StepStatus::Pending))
            .collect();
        statuses.insert(StepId::Order, StepStatus::Current);

        Ok(Self {
            case: resolved.case.clone(),
            documents,
            current: StepId::Order,
            statuses,
            settings: StepSettings::default(),
            index: Vec::new(),
            bookmarks: Vec::new(),
            finished: false,
        })
    }

    pub fn case(&self) -> &CaseMetadata {
        &self.case
    }

    pub fn documents(&self) -> &[CompiledDocument] {
        &self.documents
    }

    pub fn current_step(&self) -> StepId {
        self.current
    }

    pub fn status(&self, step: StepId) -> StepStatus {
        self.statuses
            .get(&step)
            .copied()
            .unwrap_or(StepStatus::Pending)
    }

    pub fn settings(&self) -> &StepSettings {
        &self.settings
    }

    pub fn index(&self) -> &[IndexEntry] {
        &self.index
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn total_pages(&self) -> u32 {
        self.documents.iter().map(|d| d.page_count).sum()
    }

    /// Pages belonging to documents whose OCR is complete
    pub fn recognized_pages(&self) -> u32 {
        self.documents
            .iter()
            .filter(|d| d.ocr_status == OcrStatus::Complete)
            .map(|d| d.page_count)
            .sum()
    }

    /// OCR completion percentage; 100 only when every document is complete
    pub fn ocr_progress(&self) -> u8 {
        let total = self.total_pages();
        if total == 0 {
            return 0;
        }
        (u64::from(self.recognized_pages()) * 100 / u64::from(total)) as u8
    }

    fn ensure_open(&self) -> Result<(), ValidationError> {
        if self.finished {
            return Err(ValidationError::RunFinished);
        }
        Ok(())
    }

    fn ensure_step(&self, expected: StepId) -> Result<(), ValidationError> {
        if self.current != expected {
            return Err(ValidationError::WrongStep {
                expected,
                current: self.current,
            });
        }
        Ok(())
    }

    fn set_status(&mut self, step: StepId, status: StepStatus) {
        self.statuses.insert(step, status);
    }

    /// Move a document; only while the `order` step is open.
    pub fn reorder(&self, from: usize, to: usize) -> Result<Self, ValidationError> {
        self.ensure_open()?;
        self.ensure_step(StepId::Order)?;

        let mut next = self.clone();
        next.documents = layout::clear_pagination(&layout::reorder(&self.documents, from, to)?);
        next.index.clear();
        next.bookmarks.clear();
        next.set_status(StepId::Order, StepStatus::Current);
        for step in &StepId::ALL[1..] {
            next.set_status(*step, StepStatus::Pending);
        }
        debug!(from, to, "Documents reordered");
        Ok(next)
    }

    /// Run the current step and mark it completed.
    ///
    /// Only the current step's field of `settings` is stored; settings that
    /// earlier steps were applied with are kept.
    pub fn apply(&self, settings: StepSettings) -> Result<Self, ValidationError> {
        self.ensure_open()?;

        let mut next = self.clone();

        match self.current {
            StepId::Order => {
                layout::renumber(&mut next.documents);
            }
            StepId::Pagination => {
                next.settings.pagination_mode = settings.pagination_mode;
                next.documents = layout::paginate(&next.documents, settings.pagination_mode);
            }
            StepId::Indexation => {
                next.settings.indexation_enabled = settings.indexation_enabled;
                next.index = if settings.indexation_enabled {
                    layout::build_index(&next.documents)
                } else {
                    Vec::new()
                };
            }
            StepId::Bookmarking => {
                next.settings.bookmarking_enabled = settings.bookmarking_enabled;
                next.bookmarks = if settings.bookmarking_enabled {
                    layout::build_bookmarks(&next.documents)
                } else {
                    Vec::new()
                };
            }
            StepId::Ocr => {
                let progress = self.ocr_progress();
                if progress < 100 {
                    return Err(ValidationError::OcrIncomplete { progress });
                }
            }
        }

        next.set_status(self.current, StepStatus::Completed);
        info!(step = %self.current, "Step applied");
        Ok(next)
    }

    /// Re-apply the current step with the stored settings
    pub fn reapply(&self) -> Result<Self, ValidationError> {
        self.apply(self.settings.clone())
    }

    /// Skip the current step, discarding its output.
    pub fn skip(&self) -> Result<Self, ValidationError> {
        self.ensure_open()?;
        if !self.current.skippable() {
            return Err(ValidationError::NotSkippable(self.current));
        }

        let mut next = self.clone();
        match self.current {
            StepId::Pagination => next.documents = layout::clear_pagination(&next.documents),
            StepId::Indexation => next.index.clear(),
            StepId::Bookmarking => next.bookmarks.clear(),
            StepId::Order | StepId::Ocr => {}
        }
        next.set_status(self.current, StepStatus::Skipped);
        info!(step = %self.current, "Step skipped");
        Ok(next)
    }

    /// Advance past a completed or skipped step. Leaving `ocr` finishes the run.
    pub fn next(&self) -> Result<Self, ValidationError> {
        self.ensure_open()?;

        let status = self.status(self.current);
        if self.current == StepId::Ocr && status != StepStatus::Completed {
            return Err(ValidationError::OcrIncomplete {
                progress: self.ocr_progress(),
            });
        }
        if !status.is_settled() {
            return Err(ValidationError::StepIncomplete(self.current));
        }

        let mut next = self.clone();
        match self.current.next() {
            Some(step) => {
                next.current = step;
                next.set_status(step, StepStatus::Current);
                info!(step = %step, "Entered step");
            }
            None => {
                next.finished = true;
                info!("Compilation run finished");
            }
        }
        Ok(next)
    }

    /// Reopen the previous step. The step being left returns to `pending`.
    pub fn back(&self) -> Result<Self, ValidationError> {
        self.ensure_open()?;
        let previous = self.current.previous().ok_or(ValidationError::NoPreviousStep)?;

        let mut next = self.clone();
        next.set_status(self.current, StepStatus::Pending);
        next.set_status(previous, StepStatus::Current);
        next.current = previous;
        info!(step = %previous, "Reopened step");
        Ok(next)
    }

    /// Mark one document as fully OCR'd. Reaching 100% completes the step.
    pub fn record_ocr(&self, document_id: &str) -> Result<Self, ValidationError> {
        self.ensure_open()?;
        self.ensure_step(StepId::Ocr)?;

        let mut next = self.clone();
        let doc = next
            .documents
            .iter_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(|| ValidationError::UnknownDocument(document_id.to_string()))?;
        doc.ocr_status = OcrStatus::Complete;

        if next.ocr_progress() == 100 {
            next.set_status(StepId::Ocr, StepStatus::Completed);
            info!("OCR complete");
        }
        Ok(next)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::document::PageRange;
    use crate::resolution::tests::source;
    use filing_types::DocumentKind;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap as Map;

    pub fn resolved(pages: &[u32]) -> ResolvedDocumentSet {
        ResolvedDocumentSet {
            case: CaseMetadata {
                court: "High Court of Delhi".to_string(),
                case_type: "Civil Writ".to_string(),
                petitioner: "M. Khan".to_string(),
                respondent: "GNCTD".to_string(),
            },
            documents: pages
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let mut doc = source(&format!("d{}", i + 1), DocumentKind::Petition, "en", "text");
                    doc.page_count = *p;
                    doc
                })
                .collect(),
            retained_originals: Map::new(),
            defects: Vec::new(),
        }
    }

    pub fn run(pages: &[u32]) -> CompilationRun {
        CompilationRun::new(&resolved(pages)).unwrap()
    }

    /// Drive a run to the OCR step with every optional step applied
    pub fn at_ocr(pages: &[u32]) -> CompilationRun {
        let settings = StepSettings::default();
        let mut run = run(pages);
        for _ in 0..4 {
            run = run.apply(settings.clone()).unwrap().next().unwrap();
        }
        assert_eq!(run.current_step(), StepId::Ocr);
        run
    }

    pub fn ocr_all(mut run: CompilationRun) -> CompilationRun {
        let ids: Vec<String> = run.documents().iter().map(|d| d.id.clone()).collect();
        for id in ids {
            run = run.record_ocr(&id).unwrap();
        }
        run
    }

    #[test]
    fn test_new_run_starts_at_order() {
        let run = run(&[3, 4]);
        assert_eq!(run.current_step(), StepId::Order);
        assert_eq!(run.status(StepId::Order), StepStatus::Current);
        assert_eq!(run.status(StepId::Ocr), StepStatus::Pending);
        assert_eq!(run.ocr_progress(), 0);
    }

    #[test]
    fn test_empty_resolved_set_rejected() {
        assert_eq!(
            CompilationRun::new(&resolved(&[])),
            Err(ValidationError::NoDocuments)
        );
    }

    #[test]
    fn test_next_requires_settled_step() {
        let run = run(&[3]);
        assert_eq!(
            run.next(),
            Err(ValidationError::StepIncomplete(StepId::Order))
        );
    }

    #[test]
    fn test_skipping_mandatory_steps_fails_and_leaves_run_unchanged() {
        let run = run(&[3, 2]);
        let before = run.clone();
        assert_eq!(run.skip(), Err(ValidationError::NotSkippable(StepId::Order)));
        assert_eq!(run, before);

        let ocr = at_ocr(&[3, 2]);
        let before = ocr.clone();
        assert_eq!(ocr.skip(), Err(ValidationError::NotSkippable(StepId::Ocr)));
        assert_eq!(ocr, before);
    }

    #[test]
    fn test_skip_optional_step_allows_next() {
        let run = run(&[3, 2])
            .apply(StepSettings::default())
            .unwrap()
            .next()
            .unwrap()
            .skip()
            .unwrap();
        assert_eq!(run.status(StepId::Pagination), StepStatus::Skipped);
        let run = run.next().unwrap();
        assert_eq!(run.current_step(), StepId::Indexation);
        assert!(run.documents().iter().all(|d| d.page_range.is_none()));
    }

    #[test]
    fn test_reorder_only_during_order_step() {
        let run = run(&[1, 2, 3]).apply(StepSettings::default()).unwrap().next().unwrap();
        assert_eq!(
            run.reorder(0, 1),
            Err(ValidationError::WrongStep {
                expected: StepId::Order,
                current: StepId::Pagination
            })
        );
    }

    #[test]
    fn test_reorder_after_back_invalidates_downstream() {
        let settings = StepSettings::default();
        let run = run(&[2, 3, 4]);
        let run = run.apply(settings.clone()).unwrap().next().unwrap();
        let run = run.apply(settings.clone()).unwrap().next().unwrap();
        let run = run.apply(settings.clone()).unwrap();
        assert_eq!(run.index().len(), 3);

        let run = run.back().unwrap().back().unwrap();
        assert_eq!(run.current_step(), StepId::Order);
        let run = run.reorder(2, 0).unwrap();

        assert!(run.index().is_empty());
        assert!(run.documents().iter().all(|d| d.page_range.is_none()));
        assert_eq!(run.status(StepId::Pagination), StepStatus::Pending);
        assert_eq!(run.status(StepId::Indexation), StepStatus::Pending);
        assert_eq!(run.documents()[0].id, "d3");
    }

    #[test]
    fn test_back_then_reapply_is_idempotent() {
        let settings = StepSettings {
            pagination_mode: PaginationMode::Continuous,
            indexation_enabled: true,
            bookmarking_enabled: false,
        };
        let run = run(&[5, 1, 7]).apply(settings.clone()).unwrap().next().unwrap();
        let paginated = run.apply(settings).unwrap();
        let first_pass = paginated.documents().to_vec();

        let again = paginated
            .next()
            .unwrap()
            .back()
            .unwrap()
            .reapply()
            .unwrap();
        assert_eq!(again.documents(), first_pass.as_slice());
        assert_eq!(again.settings().pagination_mode, PaginationMode::Continuous);
        assert_eq!(again.status(StepId::Indexation), StepStatus::Pending);
        assert_eq!(
            again.documents()[2].page_range,
            Some(PageRange { start: 7, end: 13 })
        );
    }

    #[test]
    fn test_back_from_first_step_fails() {
        assert_eq!(run(&[1]).back(), Err(ValidationError::NoPreviousStep));
    }

    #[test]
    fn test_ocr_blocks_next_until_complete() {
        let run = at_ocr(&[6, 4]);
        let run = run.record_ocr("d1").unwrap();
        assert_eq!(run.ocr_progress(), 60);
        assert_eq!(run.next(), Err(ValidationError::OcrIncomplete { progress: 60 }));
        assert_eq!(
            run.apply(StepSettings::default()),
            Err(ValidationError::OcrIncomplete { progress: 60 })
        );

        let run = run.record_ocr("d2").unwrap();
        assert_eq!(run.ocr_progress(), 100);
        assert_eq!(run.status(StepId::Ocr), StepStatus::Completed);
    }

    #[test]
    fn test_next_out_of_ocr_succeeds_exactly_once() {
        let run = ocr_all(at_ocr(&[2, 2]));
        let finished = run.next().unwrap();
        assert!(finished.is_finished());
        assert_eq!(finished.next(), Err(ValidationError::RunFinished));
        assert_eq!(finished.back(), Err(ValidationError::RunFinished));
        assert_eq!(finished.reorder(0, 1), Err(ValidationError::RunFinished));
    }

    #[test]
    fn test_record_ocr_outside_ocr_step() {
        assert_eq!(
            run(&[1]).record_ocr("d1"),
            Err(ValidationError::WrongStep {
                expected: StepId::Ocr,
                current: StepId::Order
            })
        );
        assert_eq!(
            at_ocr(&[1]).record_ocr("nope"),
            Err(ValidationError::UnknownDocument("nope".to_string()))
        );
    }

    #[test]
    fn test_disabled_indexation_produces_empty_index() {
        let settings = StepSettings {
            indexation_enabled: false,
            ..StepSettings::default()
        };
        let mut run = run(&[1, 1]);
        for _ in 0..2 {
            run = run.apply(settings.clone()).unwrap().next().unwrap();
        }
        let run = run.apply(settings).unwrap();
        assert_eq!(run.status(StepId::Indexation), StepStatus::Completed);
        assert!(run.index().is_empty());
    }

    #[test]
    fn test_later_steps_keep_pagination_mode() {
        let sectional = StepSettings {
            pagination_mode: PaginationMode::Sectional,
            ..StepSettings::default()
        };
        let run = run(&[2, 3]).apply(StepSettings::default()).unwrap().next().unwrap();
        let run = run.apply(sectional).unwrap().next().unwrap();
        let run = run.apply(StepSettings::default()).unwrap().next().unwrap();
        let run = run
            .apply(StepSettings {
                bookmarking_enabled: false,
                ..StepSettings::default()
            })
            .unwrap();

        assert_eq!(
            run.settings(),
            &StepSettings {
                pagination_mode: PaginationMode::Sectional,
                indexation_enabled: true,
                bookmarking_enabled: false,
            }
        );
        assert_eq!(run.reapply().unwrap().settings(), run.settings());
    }

    #[test]
    fn test_new_run_rejects_duplicate_ids() {
        let mut resolved = resolved(&[1, 1]);
        resolved.documents[1].id = "d1".to_string();
        assert_eq!(
            CompilationRun::new(&resolved),
            Err(ValidationError::DuplicateDocumentId("d1".to_string()))
        );
    }

    #[test]
    fn test_new_run_rejects_page_total_beyond_limit() {
        let resolved = resolved(&[3_000_000_000, 3_000_000_000]);
        assert_eq!(
            CompilationRun::new(&resolved),
            Err(ValidationError::TooManyPages {
                pages: 6_000_000_000,
                limit: MAX_FILING_PAGES,
            })
        );
    }
}
