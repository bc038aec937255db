//! File-backed translator and text-layer OCR engine for batch runs

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use filing_core::{CapabilityError, CompiledDocument, OcrEngine, Translator};
use filing_types::CaseIntake;

/// Serves translations prepared ahead of time.
///
/// For each intake document, `<dir>/<id>.<lang>.txt` is preferred over
/// `<dir>/<id>.txt`. The translator is keyed by source text, since that
/// is all a translation request carries, so two documents with the same
/// text cannot both have prepared translations.
#[derive(Debug, Default)]
pub struct FileTranslator {
    by_text: HashMap<String, Vec<(Option<String>, String)>>,
}

impl FileTranslator {
    pub fn load(dir: &Path, intake: &CaseIntake) -> std::io::Result<Self> {
        let mut by_text: HashMap<String, Vec<(Option<String>, String)>> = HashMap::new();
        let mut owners: HashMap<&str, &str> = HashMap::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            // Ids may contain dots; only the last segment can be a language
            let (id, language) = match stem.rsplit_once('.') {
                Some((id, lang)) if intake.document(stem).is_none() => {
                    (id, Some(lang.to_string()))
                }
                _ => (stem, None),
            };
            let Some(doc) = intake.document(id) else {
                continue;
            };
            match owners.insert(doc.text.as_str(), doc.id.as_str()) {
                Some(owner) if owner != doc.id => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!(
                            "documents '{}' and '{}' have the same text; their translations cannot be told apart",
                            owner, doc.id
                        ),
                    ));
                }
                _ => {}
            }
            let translation = std::fs::read_to_string(&path)?;
            tracing::debug!(document = id, path = %path.display(), "Loaded translation");
            by_text
                .entry(doc.text.clone())
                .or_default()
                .push((language, translation));
        }
        Ok(Self { by_text })
    }

    pub fn is_empty(&self) -> bool {
        self.by_text.is_empty()
    }
}

#[async_trait]
impl Translator for FileTranslator {
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
        instruction: Option<&str>,
    ) -> Result<String, CapabilityError> {
        if let Some(instruction) = instruction {
            tracing::info!(instruction, "Prepared translations ignore redo instructions");
        }
        let candidates = self
            .by_text
            .get(text)
            .ok_or_else(|| CapabilityError("no prepared translation for document".to_string()))?;

        candidates
            .iter()
            .find(|(lang, _)| lang.as_deref() == Some(target_language))
            .or_else(|| candidates.iter().find(|(lang, _)| lang.is_none()))
            .map(|(_, translation)| translation.clone())
            .ok_or_else(|| {
                CapabilityError(format!("no prepared '{}' translation", target_language))
            })
    }
}

/// Accepts pages of documents that already carry a text layer; scans are
/// passed through with a warning since no recognition backend is wired in.
#[derive(Debug, Default)]
pub struct TextLayerOcr {
    with_text: HashSet<String>,
}

impl TextLayerOcr {
    pub fn new(intake: &CaseIntake) -> Self {
        Self {
            with_text: intake
                .documents
                .iter()
                .filter(|d| !d.text.trim().is_empty())
                .map(|d| d.id.clone())
                .collect(),
        }
    }
}

#[async_trait]
impl OcrEngine for TextLayerOcr {
    async fn recognize_page(
        &self,
        document: &CompiledDocument,
        page: u32,
    ) -> Result<(), CapabilityError> {
        if page == 0 || page > document.page_count {
            return Err(CapabilityError(format!(
                "page {} outside 1-{}",
                page, document.page_count
            )));
        }
        if !self.with_text.contains(&document.id) {
            tracing::warn!(document = %document.id, page, "No text layer; page passed through");
        }
        tokio::task::yield_now().await;
        Ok(())
    }
}
