//! Defect resolution coordinator
//!
//! Each defect sits behind its own async mutex: redo requests on one defect
//! queue behind each other while different defects resolve concurrently.
//! A draft only replaces the defect's state once the strategy completes, so
//! a cancelled or failed attempt leaves the previous stable state (and its
//! draft) untouched.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use filing_types::audit::{hash_content, AuditAction};
use filing_types::{
    CaseIntake, CaseMetadata, DefectItem, DefectKind, Resolution, ResolutionState,
    ResolutionStrategy, SourceDocument, ValidationError,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::audit::{record, SharedAudit};
use crate::capability::{CancelToken, Translator};
use crate::error::{FilingError, ResolutionFailure};

const ACTOR: &str = "resolution";
const DEFAULT_WAIVER_NOTE: &str = "waived by filer";

struct DefectSlot {
    id: String,
    defect: Mutex<DefectItem>,
    drafting: AtomicBool,
}

/// Clears the drafting flag however the draft ends
struct DraftingGuard<'a>(&'a AtomicBool);

impl<'a> DraftingGuard<'a> {
    fn start(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for DraftingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct ResolutionCoordinator {
    intake: Arc<CaseIntake>,
    target_language: String,
    translator: Arc<dyn Translator>,
    slots: Vec<DefectSlot>,
    audit: SharedAudit,
    /// Documents whose retained original is already in the audit chain
    retained_recorded: std::sync::Mutex<BTreeSet<String>>,
}

impl ResolutionCoordinator {
    pub fn new(
        intake: Arc<CaseIntake>,
        defects: Vec<DefectItem>,
        target_language: impl Into<String>,
        translator: Arc<dyn Translator>,
        audit: SharedAudit,
    ) -> Self {
        let slots = defects
            .into_iter()
            .map(|d| DefectSlot {
                id: d.id.clone(),
                defect: Mutex::new(d),
                drafting: AtomicBool::new(false),
            })
            .collect();
        Self {
            intake,
            target_language: target_language.into(),
            translator,
            slots,
            audit,
            retained_recorded: std::sync::Mutex::new(BTreeSet::new()),
        }
    }

    fn slot(&self, defect_id: &str) -> Result<&DefectSlot, ValidationError> {
        self.slots
            .iter()
            .find(|s| s.id == defect_id)
            .ok_or_else(|| ValidationError::UnknownDefect(defect_id.to_string()))
    }

    pub fn is_drafting(&self, defect_id: &str) -> bool {
        self.slot(defect_id)
            .map(|s| s.drafting.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    pub async fn defect(&self, defect_id: &str) -> Result<DefectItem, ValidationError> {
        Ok(self.slot(defect_id)?.defect.lock().await.clone())
    }

    /// All defects in scrutiny order
    pub async fn defects(&self) -> Vec<DefectItem> {
        let mut defects = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            defects.push(slot.defect.lock().await.clone());
        }
        defects
    }

    /// Apply a strategy to a defect, or redo it with a refined instruction.
    pub async fn resolve(
        &self,
        defect_id: &str,
        strategy: ResolutionStrategy,
        instruction: Option<&str>,
        cancel: CancelToken,
    ) -> Result<DefectItem, FilingError> {
        let slot = self.slot(defect_id)?;
        let mut defect = slot.defect.lock().await;
        check_transition(&defect, strategy, instruction)?;

        if strategy == ResolutionStrategy::Waive {
            let note = instruction.unwrap_or(DEFAULT_WAIVER_NOTE).to_string();
            defect.resolution_state = ResolutionState::Waived;
            defect.resolution = Some(Resolution {
                strategy,
                draft: None,
                instruction: None,
                revision: 0,
                note: Some(note.clone()),
            });
            record(
                &self.audit,
                AuditAction::DefectWaived {
                    defect_id: defect_id.to_string(),
                },
                ACTOR,
                &hash_content(defect.message.as_bytes()),
                Some(note),
            );
            info!(defect = defect_id, "Defect waived");
            return Ok(defect.clone());
        }

        let revision = defect.resolution.as_ref().map_or(1, |r| r.revision + 1);
        let outcome = {
            let _drafting = DraftingGuard::start(&slot.drafting);
            let mut cancel = cancel;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ResolutionFailure::Cancelled {
                    defect_id: defect_id.to_string(),
                }),
                draft = self.draft(&defect, strategy, instruction) => draft,
            }
        };

        match outcome {
            Ok(draft) => {
                let subject = hash_content(draft.as_bytes());
                defect.resolution = Some(Resolution {
                    strategy,
                    draft: Some(draft),
                    instruction: instruction.map(str::to_string),
                    revision,
                    note: None,
                });
                defect.resolution_state = ResolutionState::Resolved;
                record(
                    &self.audit,
                    AuditAction::DraftRecorded {
                        defect_id: defect_id.to_string(),
                        strategy,
                        revision,
                    },
                    ACTOR,
                    &subject,
                    instruction.map(|i| format!("instruction: {}", i)),
                );
                info!(defect = defect_id, ?strategy, revision, "Draft recorded");
                Ok(defect.clone())
            }
            Err(failure) => {
                warn!(defect = defect_id, error = %failure, "Resolution failed");
                record(
                    &self.audit,
                    AuditAction::ResolutionFailed {
                        defect_id: defect_id.to_string(),
                    },
                    ACTOR,
                    &hash_content(defect.message.as_bytes()),
                    Some(failure.to_string()),
                );
                Err(failure.into())
            }
        }
    }

    async fn draft(
        &self,
        defect: &DefectItem,
        strategy: ResolutionStrategy,
        instruction: Option<&str>,
    ) -> Result<String, ResolutionFailure> {
        match strategy {
            ResolutionStrategy::ManualEdit => Ok(instruction.unwrap_or_default().to_string()),
            _ => {
                let document = self.intake.document(&defect.document_id).ok_or_else(|| {
                    ResolutionFailure::Capability {
                        defect_id: defect.id.clone(),
                        message: format!("document {} not in intake", defect.document_id),
                    }
                })?;
                self.translator
                    .translate(&document.text, &self.target_language, instruction)
                    .await
                    .map_err(|e| ResolutionFailure::Capability {
                        defect_id: defect.id.clone(),
                        message: e.to_string(),
                    })
            }
        }
    }

    /// Snapshot the cured document set once every defect is resolved or
    /// waived and no draft is in flight.
    pub fn finalize(&self) -> Result<ResolvedDocumentSet, ValidationError> {
        let mut defects = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let guard = slot
                .defect
                .try_lock()
                .map_err(|_| ValidationError::DefectDrafting(slot.id.clone()))?;
            defects.push(guard.clone());
        }

        let outstanding: Vec<String> = defects
            .iter()
            .filter(|d| !d.resolution_state.is_terminal())
            .map(|d| d.id.clone())
            .collect();
        if !outstanding.is_empty() {
            return Err(ValidationError::DefectsOutstanding(outstanding));
        }

        let mut documents = Vec::with_capacity(self.intake.documents.len());
        let mut retained_originals = BTreeMap::new();
        let mut taken: HashSet<String> =
            self.intake.documents.iter().map(|d| d.id.clone()).collect();

        for source in &self.intake.documents {
            let translation = defects.iter().find_map(|d| {
                let resolution = d.resolution.as_ref()?;
                let draft = resolution.draft.as_ref()?;
                (d.document_id == source.id
                    && d.kind == DefectKind::UntranslatedAnnexure
                    && d.resolution_state == ResolutionState::Resolved)
                    .then_some((resolution.strategy, draft))
            });

            match translation {
                Some((ResolutionStrategy::TranslateAppend, draft)) => {
                    let copy = self.translated_copy(source, draft, &taken);
                    taken.insert(copy.id.clone());
                    documents.push(source.clone());
                    documents.push(copy);
                }
                Some((_, draft)) => {
                    // Replace (or manual edit) swaps the text; the original is kept for audit
                    let original = RetainedOriginal::of(source);
                    self.record_retained(&source.id, &original.text_hash);
                    retained_originals.insert(source.id.clone(), original);
                    let mut replaced = source.clone();
                    replaced.text = draft.clone();
                    replaced.language = self.target_language.clone();
                    documents.push(replaced);
                }
                None => documents.push(source.clone()),
            }
        }

        info!(
            documents = documents.len(),
            retained = retained_originals.len(),
            "Resolved document set finalized"
        );

        Ok(ResolvedDocumentSet {
            case: self.intake.metadata(),
            documents,
            retained_originals,
            defects,
        })
    }

    /// Audit a retained original once, however often `finalize` runs
    fn record_retained(&self, document_id: &str, text_hash: &str) {
        let mut recorded = self
            .retained_recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !recorded.insert(document_id.to_string()) {
            return;
        }
        record(
            &self.audit,
            AuditAction::OriginalRetained {
                document_id: document_id.to_string(),
            },
            ACTOR,
            text_hash,
            None,
        );
    }

    /// Translated copy inserted after its source. The id is
    /// `{id}-{lang}`, suffixed `-2`, `-3`, ... when that id is `taken`.
    fn translated_copy(
        &self,
        source: &SourceDocument,
        draft: &str,
        taken: &HashSet<String>,
    ) -> SourceDocument {
        let base = format!("{}-{}", source.id, self.target_language);
        let mut id = base.clone();
        let mut suffix = 1;
        while taken.contains(&id) {
            suffix += 1;
            id = format!("{}-{}", base, suffix);
        }
        SourceDocument {
            id,
            name: format!("{} ({} translation)", source.name, self.target_language),
            language: self.target_language.clone(),
            text: draft.to_string(),
            ..source.clone()
        }
    }
}

fn check_transition(
    defect: &DefectItem,
    strategy: ResolutionStrategy,
    instruction: Option<&str>,
) -> Result<(), ValidationError> {
    match defect.resolution_state {
        ResolutionState::Waived => return Err(ValidationError::DefectWaived(defect.id.clone())),
        ResolutionState::Resolved => {
            if strategy == ResolutionStrategy::Waive || instruction.is_none() {
                return Err(ValidationError::AlreadyResolved(defect.id.clone()));
            }
            if let Some(active) = defect.resolution.as_ref().map(|r| r.strategy) {
                if active != strategy {
                    return Err(ValidationError::StrategyMismatch {
                        defect_id: defect.id.clone(),
                        active,
                        requested: strategy,
                    });
                }
            }
        }
        ResolutionState::Open => {}
    }

    if strategy.is_translation() && defect.kind != DefectKind::UntranslatedAnnexure {
        return Err(ValidationError::StrategyNotApplicable {
            defect_id: defect.id.clone(),
            strategy,
        });
    }
    if strategy == ResolutionStrategy::ManualEdit
        && instruction.map_or(true, |i| i.trim().is_empty())
    {
        return Err(ValidationError::InstructionRequired(strategy));
    }
    Ok(())
}

/// Original-language document kept when a translation replaces it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetainedOriginal {
    pub document: SourceDocument,
    pub text_hash: String,
}

impl RetainedOriginal {
    fn of(document: &SourceDocument) -> Self {
        Self {
            document: document.clone(),
            text_hash: hash_content(document.text.as_bytes()),
        }
    }
}

/// Cured document set handed to the compilation stepper
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedDocumentSet {
    pub case: CaseMetadata,
    pub documents: Vec<SourceDocument>,
    /// Originals replaced by translation, keyed by document id
    pub retained_originals: BTreeMap<String, RetainedOriginal>,
    pub defects: Vec<DefectItem>,
}
