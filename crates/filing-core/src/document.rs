//! Compiled documents and the artifacts derived from their order

use std::fmt;

use filing_types::SourceDocument;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn len(&self) -> u32 {
        self.end + 1 - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrStatus {
    Pending,
    Complete,
}

/// Logical section used by sectional pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Main,
    Annexures,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledDocument {
    pub id: String,
    pub name: String,
    /// 1-based position in the compilation
    pub order: u32,
    pub page_count: u32,
    pub page_range: Option<PageRange>,
    pub ocr_status: OcrStatus,
    pub bookmark_path: String,
    pub section: Section,
}

impl CompiledDocument {
    pub fn from_source(doc: &SourceDocument, order: u32) -> Self {
        let section = if doc.kind.is_annexure() {
            Section::Annexures
        } else {
            Section::Main
        };
        Self {
            id: doc.id.clone(),
            name: doc.name.clone(),
            order,
            page_count: doc.page_count,
            page_range: None,
            ocr_status: OcrStatus::Pending,
            bookmark_path: bookmark_path(order, &doc.name),
            section,
        }
    }
}

pub fn bookmark_path(order: u32, name: &str) -> String {
    format!("{:02}. {}", order, name)
}

/// One row of the filing index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub index: u32,
    pub document_id: String,
    pub document_name: String,
    pub page_range: Option<PageRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub order: u32,
    pub document_id: String,
    pub title: String,
    /// First page of the document, when paginated
    pub page: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_range_display() {
        assert_eq!(PageRange { start: 4, end: 4 }.to_string(), "4");
        assert_eq!(PageRange { start: 5, end: 12 }.to_string(), "5-12");
        assert_eq!(PageRange { start: 5, end: 12 }.len(), 8);
    }

    #[test]
    fn test_bookmark_path_zero_pads_order() {
        assert_eq!(bookmark_path(3, "Annexure P-1"), "03. Annexure P-1");
    }
}
