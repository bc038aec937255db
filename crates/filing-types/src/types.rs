use serde::{Deserialize, Serialize};

/// Case metadata plus the source documents supplied by the intake surface.
///
/// An intake is never mutated once scrutiny begins; restarting a filing
/// means building a new intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseIntake {
    pub court: String,
    pub case_type: String,
    pub petitioner: String,
    pub respondent: String,
    pub documents: Vec<SourceDocument>,
}

impl CaseIntake {
    pub fn metadata(&self) -> CaseMetadata {
        CaseMetadata {
            court: self.court.clone(),
            case_type: self.case_type.clone(),
            petitioner: self.petitioner.clone(),
            respondent: self.respondent.clone(),
        }
    }

    /// Position of a document in the intake, used as the scrutiny tie-breaker
    pub fn position_of(&self, document_id: &str) -> Option<usize> {
        self.documents.iter().position(|d| d.id == document_id)
    }

    pub fn document(&self, document_id: &str) -> Option<&SourceDocument> {
        self.documents.iter().find(|d| d.id == document_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseMetadata {
    pub court: String,
    pub case_type: String,
    pub petitioner: String,
    pub respondent: String,
}

impl CaseMetadata {
    /// Cause title, e.g. "A. Sharma v. State of Maharashtra"
    pub fn caption(&self) -> String {
        format!("{} v. {}", self.petitioner, self.respondent)
    }
}

/// Largest page count accepted for a single document
pub const MAX_DOCUMENT_PAGES: u32 = 100_000;

/// Largest page count of a whole filing, appended translations included.
/// Keeps page numbering within `u32`.
pub const MAX_FILING_PAGES: u32 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: String,
    pub name: String,
    pub kind: DocumentKind,
    pub page_count: u32,
    /// ISO-639-1 language code of the document body
    pub language: String,
    /// Extracted text layer; empty for image-only scans
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub format: PageFormat,
    /// True-copy certification attached to the document
    #[serde(default)]
    pub certified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Petition,
    Affidavit,
    Annexure,
    Vakalatnama,
    Certificate,
    Other,
}

impl DocumentKind {
    /// Annexures are compiled into their own section after the main papers.
    pub fn is_annexure(&self) -> bool {
        matches!(self, DocumentKind::Annexure)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFormat {
    pub paper: PaperSize,
    pub font_size_pt: f32,
    pub line_spacing: f32,
    pub margin_mm: u32,
}

impl Default for PageFormat {
    fn default() -> Self {
        Self {
            paper: PaperSize::A4,
            font_size_pt: 14.0,
            line_spacing: 1.5,
            margin_mm: 40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperSize {
    A4,
    Legal,
    Letter,
}

/// Defect severity. Declaration order is the scrutiny sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Moderate,
    Suggestion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefectKind {
    UntranslatedAnnexure,
    MissingCertificate,
    FormatViolation,
    MissingTextLayer,
}

impl DefectKind {
    pub fn code(&self) -> &'static str {
        match self {
            DefectKind::UntranslatedAnnexure => "untranslated-annexure",
            DefectKind::MissingCertificate => "missing-certificate",
            DefectKind::FormatViolation => "format-violation",
            DefectKind::MissingTextLayer => "missing-text-layer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionState {
    Open,
    Resolved,
    Waived,
}

impl ResolutionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResolutionState::Open)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    TranslateAppend,
    TranslateReplace,
    ManualEdit,
    Waive,
}

impl ResolutionStrategy {
    pub fn is_translation(&self) -> bool {
        matches!(
            self,
            ResolutionStrategy::TranslateAppend | ResolutionStrategy::TranslateReplace
        )
    }
}

/// The single active draft held by a defect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub strategy: ResolutionStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    /// 1 for the first draft, incremented on every redo
    pub revision: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectItem {
    pub id: String,
    pub document_id: String,
    pub document_name: String,
    pub severity: Severity,
    pub kind: DefectKind,
    pub message: String,
    pub resolution_state: ResolutionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

impl DefectItem {
    /// Open defect with the deterministic id `"{document_id}/{kind}"`.
    pub fn open(
        document: &SourceDocument,
        kind: DefectKind,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("{}/{}", document.id, kind.code()),
            document_id: document.id.clone(),
            document_name: document.name.clone(),
            severity,
            kind,
            message: message.into(),
            resolution_state: ResolutionState::Open,
            resolution: None,
        }
    }
}
