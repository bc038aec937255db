//! Compilation session: owns the live `CompilationRun`
//!
//! The stepper is not reentrant. While an operation (including a running
//! OCR task) holds the session, every other call is rejected with
//! `StepperBusy` instead of being interleaved.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use filing_types::audit::{hash_content, AuditAction};
use filing_types::{StepId, StepStatus, ValidationError};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::audit::{record, SharedAudit};
use crate::capability::{CancelToken, OcrEngine};
use crate::document::OcrStatus;
use crate::error::{FilingError, OcrFailure};
use crate::package::{package, FilingPackage};
use crate::stepper::{CompilationRun, StepSettings};

const ACTOR: &str = "stepper";

/// Progress event emitted after every recognised page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrProgress {
    pub document_id: String,
    pub page: u32,
    pub pages_done: u32,
    pub total_pages: u32,
    pub percent: u8,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ValidationError> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ValidationError::StepperBusy)?;
        Ok(Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct CompilationSession {
    run: Mutex<Option<CompilationRun>>,
    busy: AtomicBool,
    audit: SharedAudit,
}

impl CompilationSession {
    pub fn new(run: CompilationRun, audit: SharedAudit) -> Self {
        Self {
            run: Mutex::new(Some(run)),
            busy: AtomicBool::new(false),
            audit,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<CompilationRun>> {
        self.run.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Copy of the current run
    pub fn snapshot(&self) -> Result<CompilationRun, ValidationError> {
        self.lock().clone().ok_or(ValidationError::RunArchived)
    }

    fn commit(
        &self,
        transition: impl FnOnce(&CompilationRun) -> Result<CompilationRun, ValidationError>,
    ) -> Result<CompilationRun, ValidationError> {
        let mut guard = self.lock();
        let current = guard.as_ref().ok_or(ValidationError::RunArchived)?;
        let next = transition(current)?;
        self.audit_settled(current, &next);
        *guard = Some(next.clone());
        Ok(next)
    }

    fn transition(
        &self,
        transition: impl FnOnce(&CompilationRun) -> Result<CompilationRun, ValidationError>,
    ) -> Result<CompilationRun, ValidationError> {
        let _busy = BusyGuard::acquire(&self.busy)?;
        self.commit(transition)
    }

    fn audit_settled(&self, before: &CompilationRun, after: &CompilationRun) {
        for step in StepId::ALL {
            let (was, now) = (before.status(step), after.status(step));
            if was == now {
                continue;
            }
            let action = match now {
                StepStatus::Completed => AuditAction::StepCompleted { step },
                StepStatus::Skipped => AuditAction::StepSkipped { step },
                StepStatus::Pending | StepStatus::Current => continue,
            };
            let order: Vec<&str> = after.documents().iter().map(|d| d.id.as_str()).collect();
            record(
                &self.audit,
                action,
                ACTOR,
                &hash_content(order.join(",").as_bytes()),
                None,
            );
        }
    }

    pub fn reorder(&self, from: usize, to: usize) -> Result<CompilationRun, ValidationError> {
        self.transition(|run| run.reorder(from, to))
    }

    pub fn apply(&self, settings: StepSettings) -> Result<CompilationRun, ValidationError> {
        self.transition(|run| run.apply(settings))
    }

    pub fn reapply(&self) -> Result<CompilationRun, ValidationError> {
        self.transition(CompilationRun::reapply)
    }

    pub fn skip(&self) -> Result<CompilationRun, ValidationError> {
        self.transition(CompilationRun::skip)
    }

    pub fn next(&self) -> Result<CompilationRun, ValidationError> {
        self.transition(CompilationRun::next)
    }

    pub fn back(&self) -> Result<CompilationRun, ValidationError> {
        self.transition(CompilationRun::back)
    }

    /// OCR every pending document page by page.
    ///
    /// A document is committed only once all its pages are recognised, so
    /// cancellation or failure keeps earlier documents and discards the
    /// partial one. Progress is reported per page on `progress`.
    pub async fn run_ocr(
        &self,
        engine: &dyn OcrEngine,
        cancel: CancelToken,
        progress: Option<mpsc::UnboundedSender<OcrProgress>>,
    ) -> Result<CompilationRun, FilingError> {
        let _busy = BusyGuard::acquire(&self.busy)?;
        let run = self.snapshot()?;
        if run.is_finished() {
            return Err(ValidationError::RunFinished.into());
        }
        if run.current_step() != StepId::Ocr {
            return Err(ValidationError::WrongStep {
                expected: StepId::Ocr,
                current: run.current_step(),
            }
            .into());
        }

        let total_pages = run.total_pages();
        let mut pages_done = run.recognized_pages();
        let mut cancel = cancel;
        info!(
            total_pages,
            already_done = pages_done,
            "Starting OCR"
        );

        for doc in run
            .documents()
            .iter()
            .filter(|d| d.ocr_status == OcrStatus::Pending)
        {
            for page in 1..=doc.page_count {
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        warn!(document = %doc.id, page, "OCR cancelled");
                        return Err(OcrFailure::Cancelled {
                            document_id: doc.id.clone(),
                            page,
                        }
                        .into());
                    }
                    result = engine.recognize_page(doc, page) => result,
                };
                if let Err(e) = result {
                    warn!(document = %doc.id, page, error = %e, "OCR failed");
                    return Err(OcrFailure::Capability {
                        document_id: doc.id.clone(),
                        page,
                        message: e.to_string(),
                    }
                    .into());
                }

                pages_done += 1;
                let percent = (u64::from(pages_done) * 100 / u64::from(total_pages)) as u8;
                debug!(document = %doc.id, page, percent, "Page recognised");
                if let Some(tx) = &progress {
                    // A dropped receiver only means nobody is watching
                    let _ = tx.send(OcrProgress {
                        document_id: doc.id.clone(),
                        page,
                        pages_done,
                        total_pages,
                        percent,
                    });
                }
            }
            self.commit(|run| run.record_ocr(&doc.id))?;
        }

        let run = self.snapshot()?;
        if run.status(StepId::Ocr) != StepStatus::Completed {
            // Nothing was pending, e.g. the step was re-entered after `back()`
            info!("All documents already recognised");
            return Ok(self.commit(CompilationRun::reapply)?);
        }
        Ok(run)
    }

    /// Validate and package the run. Success archives the run; failure keeps
    /// it open at its current step.
    pub fn package(&self) -> Result<FilingPackage, FilingError> {
        let _busy = BusyGuard::acquire(&self.busy)?;
        let mut guard = self.lock();
        let run = guard.as_ref().ok_or(ValidationError::RunArchived)?;

        let filing = package(run).map_err(|e| {
            warn!(error = %e, step = ?e.failing_step(), "Packaging rejected");
            e
        })?;

        record(
            &self.audit,
            AuditAction::PackageAssembled {
                documents: filing.documents().len() as u32,
            },
            "packager",
            &hash_content(filing.index_text().as_bytes()),
            Some(filing.package_id.clone()),
        );
        *guard = None;
        info!(package = %filing.package_id, "Run archived");
        Ok(filing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{new_audit, snapshot};
    use crate::document::CompiledDocument;
    use crate::error::{CapabilityError, PackagingError};
    use crate::stepper::tests::{at_ocr, ocr_all, run};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;
    use std::time::Duration;

    struct CountingOcr {
        pages: AtomicU32,
    }

    #[async_trait]
    impl OcrEngine for CountingOcr {
        async fn recognize_page(
            &self,
            _document: &CompiledDocument,
            _page: u32,
        ) -> Result<(), CapabilityError> {
            self.pages.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Recognises the first document, then waits forever on the second
    struct StallOnSecond;

    #[async_trait]
    impl OcrEngine for StallOnSecond {
        async fn recognize_page(
            &self,
            document: &CompiledDocument,
            _page: u32,
        ) -> Result<(), CapabilityError> {
            if document.order == 1 {
                return Ok(());
            }
            std::future::pending().await
        }
    }

    struct BrokenOcr;

    #[async_trait]
    impl OcrEngine for BrokenOcr {
        async fn recognize_page(
            &self,
            _document: &CompiledDocument,
            page: u32,
        ) -> Result<(), CapabilityError> {
            Err(CapabilityError(format!("page {} unreadable", page)))
        }
    }

    #[tokio::test]
    async fn test_run_ocr_reports_each_page_and_completes_step() {
        let session = CompilationSession::new(at_ocr(&[2, 3]), new_audit("f"));
        let engine = CountingOcr {
            pages: AtomicU32::new(0),
        };
        let (tx, mut rx) = mpsc::unbounded_channel();

        let run = session
            .run_ocr(&engine, CancelToken::never(), Some(tx))
            .await
            .unwrap();

        assert_eq!(engine.pages.load(Ordering::SeqCst), 5);
        assert_eq!(run.ocr_progress(), 100);
        assert_eq!(run.status(StepId::Ocr), StepStatus::Completed);

        let mut percents = Vec::new();
        while let Ok(event) = rx.try_recv() {
            percents.push(event.percent);
        }
        assert_eq!(percents, vec![20, 40, 60, 80, 100]);
    }

    #[tokio::test]
    async fn test_cancelled_ocr_keeps_completed_documents_only() {
        let session = Arc::new(CompilationSession::new(at_ocr(&[6, 4]), new_audit("f")));
        let (handle, token) = CancelToken::pair();

        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.run_ocr(&StallOnSecond, token, None).await })
        };

        // The first document commits before the engine stalls
        while session.snapshot().unwrap().ocr_progress() < 60 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(session.is_busy());
        assert_eq!(session.next().unwrap_err(), ValidationError::StepperBusy);

        handle.cancel();
        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            FilingError::Ocr(OcrFailure::Cancelled { page: 1, .. })
        ));

        let run = session.snapshot().unwrap();
        assert_eq!(run.ocr_progress(), 60);
        assert_eq!(run.status(StepId::Ocr), StepStatus::Current);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_ocr_failure_surfaces_page() {
        let session = CompilationSession::new(at_ocr(&[1]), new_audit("f"));
        let err = session
            .run_ocr(&BrokenOcr, CancelToken::never(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FilingError::Ocr(OcrFailure::Capability { page: 1, .. })
        ));
        assert_eq!(session.snapshot().unwrap().ocr_progress(), 0);
    }

    #[tokio::test]
    async fn test_run_ocr_outside_ocr_step_rejected() {
        let session = CompilationSession::new(run(&[1]), new_audit("f"));
        let err = session
            .run_ocr(&BrokenOcr, CancelToken::never(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FilingError::Validation(ValidationError::WrongStep { .. })
        ));
    }

    #[test]
    fn test_package_at_sixty_percent_names_ocr_and_keeps_run() {
        let run = at_ocr(&[6, 4]).record_ocr("d1").unwrap();
        let session = CompilationSession::new(run, new_audit("f"));

        let err = session.package().unwrap_err();
        match err {
            FilingError::Packaging(e) => {
                assert_eq!(e.failing_step(), Some(StepId::Ocr));
                assert_eq!(
                    e,
                    PackagingError::OcrNotCompleted {
                        status: StepStatus::Current,
                        progress: 60
                    }
                );
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(session.snapshot().unwrap().current_step(), StepId::Ocr);
    }

    #[tokio::test]
    async fn test_package_archives_run_and_audits() {
        let audit = new_audit("f");
        let session = CompilationSession::new(at_ocr(&[1, 1]), audit.clone());
        let engine = CountingOcr {
            pages: AtomicU32::new(0),
        };
        session.run_ocr(&engine, CancelToken::never(), None).await.unwrap();

        let filing = session.package().unwrap();
        assert_eq!(filing.documents().len(), 2);
        assert_eq!(session.snapshot(), Err(ValidationError::RunArchived));
        assert!(matches!(
            session.package(),
            Err(FilingError::Validation(ValidationError::RunArchived))
        ));

        let chain = snapshot(&audit);
        assert!(chain.verify().is_ok());
        assert!(chain
            .events
            .iter()
            .any(|e| e.action == AuditAction::StepCompleted { step: StepId::Ocr }));
        assert!(matches!(
            chain.events.last().map(|e| &e.action),
            Some(AuditAction::PackageAssembled { documents: 2 })
        ));
    }

    #[test]
    fn test_session_transitions_audit_skips() {
        let audit = new_audit("f");
        let session = CompilationSession::new(run(&[2]), audit.clone());
        session.apply(StepSettings::default()).unwrap();
        session.next().unwrap();
        session.skip().unwrap();

        let actions: Vec<_> = snapshot(&audit).events.into_iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::StepCompleted { step: StepId::Order },
                AuditAction::StepSkipped {
                    step: StepId::Pagination
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_run_ocr_completes_step_when_reentered_fully_recognised() {
        let run = ocr_all(at_ocr(&[2, 1]))
            .back()
            .unwrap()
            .reapply()
            .unwrap()
            .next()
            .unwrap();
        assert_eq!(run.ocr_progress(), 100);
        assert_eq!(run.status(StepId::Ocr), StepStatus::Current);

        let audit = new_audit("f");
        let session = CompilationSession::new(run, audit.clone());
        let engine = CountingOcr {
            pages: AtomicU32::new(0),
        };
        let run = session
            .run_ocr(&engine, CancelToken::never(), None)
            .await
            .unwrap();

        assert_eq!(engine.pages.load(Ordering::SeqCst), 0);
        assert_eq!(run.status(StepId::Ocr), StepStatus::Completed);
        assert!(session.next().unwrap().is_finished());
        assert!(snapshot(&audit)
            .events
            .iter()
            .any(|e| e.action == AuditAction::StepCompleted { step: StepId::Ocr }));
    }
}
