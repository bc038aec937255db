//! Tamper-evident audit log for filing events

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::step::StepId;
use crate::types::ResolutionStrategy;

/// Types of auditable events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    ScrutinyCompleted {
        defects_found: u32,
    },
    DraftRecorded {
        defect_id: String,
        strategy: ResolutionStrategy,
        revision: u32,
    },
    DefectWaived {
        defect_id: String,
    },
    ResolutionFailed {
        defect_id: String,
    },
    OriginalRetained {
        document_id: String,
    },
    StepCompleted {
        step: StepId,
    },
    StepSkipped {
        step: StepId,
    },
    PackageAssembled {
        documents: u32,
    },
    PackageExported {
        format: String,
    },
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub timestamp: String,
    pub action: AuditAction,
    pub actor: String,
    /// Hash of the artifact the event concerns (document text, draft, package)
    pub subject_hash: String,
    pub previous_hash: Option<String>,
    pub details: Option<String>,
}

impl AuditEvent {
    pub fn new(
        action: AuditAction,
        actor: &str,
        subject_hash: &str,
        previous_hash: Option<String>,
        details: Option<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339(),
            action,
            actor: actor.to_string(),
            subject_hash: subject_hash.to_string(),
            previous_hash,
            details,
        }
    }

    /// Compute the hash of this event (for chain linking)
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.event_id.as_bytes());
        hasher.update(self.timestamp.as_bytes());
        hasher.update(format!("{:?}", self.action).as_bytes());
        hasher.update(self.actor.as_bytes());
        hasher.update(self.subject_hash.as_bytes());
        if let Some(ref prev) = self.previous_hash {
            hasher.update(prev.as_bytes());
        }
        if let Some(ref details) = self.details {
            hasher.update(details.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// Chain of audit events with hash linking, one per filing
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AuditChain {
    pub events: Vec<AuditEvent>,
    pub filing_id: String,
    pub created_at: String,
}

impl AuditChain {
    pub fn new(filing_id: &str) -> Self {
        Self {
            events: Vec::new(),
            filing_id: filing_id.to_string(),
            created_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn last_hash(&self) -> Option<String> {
        self.events.last().map(|e| e.compute_hash())
    }

    /// Append an event, automatically linking to previous hash
    pub fn append(
        &mut self,
        action: AuditAction,
        actor: &str,
        subject_hash: &str,
        details: Option<String>,
    ) -> &AuditEvent {
        let previous_hash = self.last_hash();
        let event = AuditEvent::new(action, actor, subject_hash, previous_hash, details);
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    /// Verify the integrity of the chain
    pub fn verify(&self) -> Result<(), String> {
        let mut expected_prev: Option<String> = None;

        for (i, event) in self.events.iter().enumerate() {
            if event.previous_hash != expected_prev {
                return Err(format!(
                    "Chain broken at event {}: expected prev {:?}, got {:?}",
                    i, expected_prev, event.previous_hash
                ));
            }
            expected_prev = Some(event.compute_hash());
        }

        Ok(())
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize audit chain: {}", e))
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Failed to deserialize audit chain: {}", e))
    }

    /// One line per event for display
    pub fn summary(&self) -> Vec<String> {
        self.events
            .iter()
            .map(|e| {
                format!(
                    "[{}] {} - {:?}",
                    e.timestamp.split('T').next().unwrap_or(&e.timestamp),
                    e.actor,
                    e.action
                )
            })
            .collect()
    }
}

/// Compute SHA-256 hash of arbitrary content (document text, drafts)
pub fn hash_content(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_integrity() {
        let mut chain = AuditChain::new("filing-123");

        chain.append(
            AuditAction::ScrutinyCompleted { defects_found: 2 },
            "scrutiny",
            "hash1",
            None,
        );
        chain.append(
            AuditAction::DraftRecorded {
                defect_id: "annex-a/untranslated-annexure".to_string(),
                strategy: ResolutionStrategy::TranslateAppend,
                revision: 1,
            },
            "resolution",
            "hash2",
            Some("instruction: formal register".to_string()),
        );
        chain.append(
            AuditAction::StepCompleted { step: StepId::Order },
            "stepper",
            "hash3",
            None,
        );

        assert!(chain.verify().is_ok());
        assert_eq!(chain.events.len(), 3);
    }

    #[test]
    fn test_chain_tamper_detection() {
        let mut chain = AuditChain::new("filing-123");

        chain.append(
            AuditAction::DefectWaived {
                defect_id: "p1/format-violation".to_string(),
            },
            "clerk",
            "hash1",
            Some("accepted by registry".to_string()),
        );
        chain.append(AuditAction::PackageAssembled { documents: 3 }, "packager", "hash2", None);

        chain.events[0].details = Some("nothing to see".to_string());

        assert!(chain.verify().is_err());
    }

    #[test]
    fn test_summary_uses_date_only() {
        let mut chain = AuditChain::new("filing-123");
        chain.append(
            AuditAction::PackageExported {
                format: "pdf".to_string(),
            },
            "export",
            "hash1",
            None,
        );
        let summary = chain.summary();
        assert_eq!(summary.len(), 1);
        assert!(summary[0].contains("export - PackageExported"));
        assert!(!summary[0].contains('T'));
    }
}
