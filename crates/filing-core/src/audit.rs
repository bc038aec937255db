//! Audit chain shared by the pipeline stages

use std::sync::{Arc, Mutex, MutexGuard};

use filing_types::audit::{AuditAction, AuditChain};

pub type SharedAudit = Arc<Mutex<AuditChain>>;

pub fn new_audit(filing_id: &str) -> SharedAudit {
    Arc::new(Mutex::new(AuditChain::new(filing_id)))
}

fn lock(audit: &SharedAudit) -> MutexGuard<'_, AuditChain> {
    // A panic while appending cannot leave a half-linked event behind
    audit.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn record(
    audit: &SharedAudit,
    action: AuditAction,
    actor: &str,
    subject_hash: &str,
    details: Option<String>,
) {
    lock(audit).append(action, actor, subject_hash, details);
}

pub fn snapshot(audit: &SharedAudit) -> AuditChain {
    lock(audit).clone()
}
