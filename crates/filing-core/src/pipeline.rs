//! End-to-end filing pipeline
//!
//! Scrutiny, then resolution, then compilation, then packaging. A plan is a
//! flat command list; resolution commands must all come before the first
//! compilation command, since the compilation run is built from the
//! finalized document set.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use filing_types::audit::{hash_content, AuditAction, AuditChain};
use filing_types::{CaseIntake, DefectItem, ValidationError};
use scrutiny_engine::ScrutinyEngine;
use tracing::{info, warn};

use crate::audit::{new_audit, record, snapshot, SharedAudit};
use crate::capability::{CancelToken, OcrEngine, Translator};
use crate::command::{PipelineCommand, PipelinePlan};
use crate::error::FilingError;
use crate::export::{save_package, ExportFormat};
use crate::package::FilingPackage;
use crate::resolution::ResolutionCoordinator;
use crate::session::CompilationSession;
use crate::stepper::CompilationRun;

pub struct FilingPipeline {
    engine: ScrutinyEngine,
    translator: Arc<dyn Translator>,
    ocr: Arc<dyn OcrEngine>,
    audit: SharedAudit,
}

impl FilingPipeline {
    pub fn new(
        engine: ScrutinyEngine,
        translator: Arc<dyn Translator>,
        ocr: Arc<dyn OcrEngine>,
        filing_id: &str,
    ) -> Self {
        Self {
            engine,
            translator,
            ocr,
            audit: new_audit(filing_id),
        }
    }

    /// Snapshot of the audit chain so far
    pub fn audit(&self) -> AuditChain {
        snapshot(&self.audit)
    }

    pub fn scrutinize(&self, intake: &CaseIntake) -> Result<Vec<DefectItem>, ValidationError> {
        let defects = self.engine.scrutinize(intake)?;
        let ids: Vec<&str> = defects.iter().map(|d| d.id.as_str()).collect();
        record(
            &self.audit,
            AuditAction::ScrutinyCompleted {
                defects_found: defects.len() as u32,
            },
            "scrutiny",
            &hash_content(ids.join("\n").as_bytes()),
            None,
        );
        info!(defects = defects.len(), "Scrutiny complete");
        Ok(defects)
    }

    /// Build a resolution coordinator over freshly scrutinized defects
    pub fn coordinator(&self, intake: Arc<CaseIntake>) -> Result<ResolutionCoordinator, ValidationError> {
        let defects = self.scrutinize(&intake)?;
        Ok(ResolutionCoordinator::new(
            intake,
            defects,
            self.engine.rules().target_language(),
            self.translator.clone(),
            self.audit.clone(),
        ))
    }

    /// Finalize resolution and open a compilation session
    pub fn start_compilation(
        &self,
        coordinator: &ResolutionCoordinator,
    ) -> Result<CompilationSession, ValidationError> {
        let resolved = coordinator.finalize()?;
        let run = CompilationRun::new(&resolved)?;
        info!(documents = run.documents().len(), "Compilation started");
        Ok(CompilationSession::new(run, self.audit.clone()))
    }

    /// Run a whole plan against an intake and package the result.
    pub async fn execute(
        &self,
        intake: CaseIntake,
        plan: &PipelinePlan,
    ) -> Result<FilingPackage, FilingError> {
        let coordinator = self.coordinator(Arc::new(intake))?;
        let mut session: Option<CompilationSession> = None;

        for command in &plan.commands {
            if let PipelineCommand::Resolve {
                defect_id,
                strategy,
                instruction,
            } = command
            {
                if session.is_some() {
                    return Err(ValidationError::CommandOutOfPhase("resolve").into());
                }
                coordinator
                    .resolve(
                        defect_id,
                        *strategy,
                        instruction.as_deref(),
                        CancelToken::never(),
                    )
                    .await?;
                continue;
            }

            let active = match session.take() {
                Some(active) => active,
                None => self.start_compilation(&coordinator)?,
            };
            let active = session.insert(active);
            self.apply_command(active, command).await.map_err(|e| {
                warn!(?command, error = %e, "Command failed");
                e
            })?;
        }

        let active = match session {
            Some(active) => active,
            None => self.start_compilation(&coordinator)?,
        };
        active.package()
    }

    async fn apply_command(
        &self,
        session: &CompilationSession,
        command: &PipelineCommand,
    ) -> Result<(), FilingError> {
        match command {
            PipelineCommand::Resolve { .. } => {
                return Err(ValidationError::CommandOutOfPhase("resolve").into())
            }
            PipelineCommand::Reorder { from, to } => {
                session.reorder(*from, *to)?;
            }
            PipelineCommand::Apply { settings } => {
                match settings {
                    Some(settings) => session.apply(settings.clone())?,
                    None => session.reapply()?,
                };
            }
            PipelineCommand::Skip => {
                session.skip()?;
            }
            PipelineCommand::Next => {
                session.next()?;
            }
            PipelineCommand::Back => {
                session.back()?;
            }
            PipelineCommand::RunOcr => {
                session
                    .run_ocr(self.ocr.as_ref(), CancelToken::never(), None)
                    .await?;
            }
        }
        Ok(())
    }

    /// Export and store a package, recording the export in the audit chain
    pub fn save(
        &self,
        filing: &FilingPackage,
        format: ExportFormat,
        dir: &Path,
        filename: &str,
    ) -> Result<PathBuf, FilingError> {
        let path = save_package(filing, format, dir, filename)?;
        record(
            &self.audit,
            AuditAction::PackageExported {
                format: format.to_string(),
            },
            "export",
            &hash_content(filing.index_text().as_bytes()),
            Some(path.display().to_string()),
        );
        Ok(path)
    }
}
