//! Export of a filing package to PDF or Word-readable RTF, and storage

use std::fmt;
use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ExportError;
use crate::package::FilingPackage;

/// A4 portrait in points
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 72;
const LINE_HEIGHT: i64 = 18;
const INDEX_ROWS_PER_PAGE: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Doc,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Doc => "rtf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Pdf => write!(f, "pdf"),
            ExportFormat::Doc => write!(f, "doc"),
        }
    }
}

pub fn export(filing: &FilingPackage, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Pdf => export_pdf(filing),
        ExportFormat::Doc => Ok(export_rtf(filing).into_bytes()),
    }
}

/// Write the export to `dir/filename.<ext>` and return the path
pub fn save_package(
    filing: &FilingPackage,
    format: ExportFormat,
    dir: &Path,
    filename: &str,
) -> Result<PathBuf, ExportError> {
    let filename = with_extension(&validate_filename(filename)?, format);
    let bytes = export(filing, format)?;

    std::fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    std::fs::write(&path, &bytes)?;

    info!(path = %path.display(), bytes = bytes.len(), %format, "Filing saved");
    Ok(path)
}

fn validate_filename(filename: &str) -> Result<String, ExportError> {
    let trimmed = filename.trim();
    if trimmed.is_empty()
        || trimmed.contains(|c: char| c == '/' || c == '\\')
        || trimmed.contains("..")
        || trimmed.chars().any(char::is_control)
    {
        return Err(ExportError::InvalidFilename(filename.to_string()));
    }
    Ok(trimmed.to_string())
}

fn with_extension(filename: &str, format: ExportFormat) -> String {
    let suffix = format!(".{}", format.extension());
    if filename.to_ascii_lowercase().ends_with(&suffix) {
        filename.to_string()
    } else {
        format!("{}{}", filename, suffix)
    }
}

// ---------------------------------------------------------------------------
// PDF
// ---------------------------------------------------------------------------

/// Standard 14 fonts only cover Latin-1; anything else becomes '?'
fn pdf_text(text: &str) -> Object {
    let bytes = text
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c as u8 } else { b'?' })
        .collect();
    Object::String(bytes, StringFormat::Literal)
}

fn text_page(lines: &[(i64, String)]) -> Content {
    let mut operations = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN;
    for (size, line) in lines {
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(*size)]),
            Operation::new("Td", vec![Object::Integer(MARGIN), Object::Integer(y)]),
            Operation::new("Tj", vec![pdf_text(line)]),
            Operation::new("ET", vec![]),
        ]);
        y -= LINE_HEIGHT.max(*size + 6);
    }
    Content { operations }
}

struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    resources_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl PdfBuilder {
    fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ]));
        let resources_id = doc.add_object(Dictionary::from_iter(vec![(
            "Font",
            Object::Dictionary(Dictionary::from_iter(vec![("F1", Object::Reference(font_id))])),
        )]));
        Self {
            doc,
            pages_id,
            resources_id,
            page_ids: Vec::new(),
        }
    }

    fn add_page(&mut self, content: Content) -> Result<ObjectId, ExportError> {
        let encoded = content
            .encode()
            .map_err(|e| ExportError::Pdf(format!("Failed to encode page: {}", e)))?;
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), encoded));
        let page_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(self.pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(PAGE_WIDTH),
                    Object::Integer(PAGE_HEIGHT),
                ]),
            ),
            ("Resources", Object::Reference(self.resources_id)),
            ("Contents", Object::Reference(content_id)),
        ]));
        self.page_ids.push(page_id);
        Ok(page_id)
    }

    /// Flat outline, one item per (title, destination page)
    fn add_outline(&mut self, items: &[(String, ObjectId)]) -> Option<ObjectId> {
        if items.is_empty() {
            return None;
        }
        let outlines_id = self.doc.new_object_id();
        let item_ids: Vec<ObjectId> = items.iter().map(|_| self.doc.new_object_id()).collect();

        for (i, ((title, page_id), item_id)) in items.iter().zip(&item_ids).enumerate() {
            let mut item = Dictionary::from_iter(vec![
                ("Title", pdf_text(title)),
                ("Parent", Object::Reference(outlines_id)),
                (
                    "Dest",
                    Object::Array(vec![
                        Object::Reference(*page_id),
                        Object::Name(b"Fit".to_vec()),
                    ]),
                ),
            ]);
            if i > 0 {
                item.set("Prev", Object::Reference(item_ids[i - 1]));
            }
            if let Some(next) = item_ids.get(i + 1) {
                item.set("Next", Object::Reference(*next));
            }
            self.doc.objects.insert(*item_id, Object::Dictionary(item));
        }

        let outlines = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Outlines".to_vec())),
            ("First", Object::Reference(item_ids[0])),
            ("Last", Object::Reference(item_ids[item_ids.len() - 1])),
            ("Count", Object::Integer(item_ids.len() as i64)),
        ]);
        self.doc.objects.insert(outlines_id, Object::Dictionary(outlines));
        Some(outlines_id)
    }

    fn finish(mut self, title: &str, outlines: Option<ObjectId>) -> Result<Vec<u8>, ExportError> {
        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(self.page_ids.len() as i64)),
            (
                "Kids",
                Object::Array(self.page_ids.iter().map(|id| Object::Reference(*id)).collect()),
            ),
        ]);
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]);
        if let Some(outlines_id) = outlines {
            catalog.set("Outlines", Object::Reference(outlines_id));
            catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));
        }
        let catalog_id = self.doc.add_object(catalog);
        let info_id = self
            .doc
            .add_object(Dictionary::from_iter(vec![("Title", pdf_text(title))]));
        self.doc.trailer.set("Root", Object::Reference(catalog_id));
        self.doc.trailer.set("Info", Object::Reference(info_id));

        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| ExportError::Pdf(format!("Failed to write PDF: {}", e)))?;
        Ok(buffer)
    }
}

fn export_pdf(filing: &FilingPackage) -> Result<Vec<u8>, ExportError> {
    let case = &filing.case;
    let mut pdf = PdfBuilder::new();

    pdf.add_page(text_page(&[
        (20, format!("IN THE {}", case.court.to_uppercase())),
        (14, case.case_type.clone()),
        (14, String::new()),
        (16, format!("{} ... Petitioner", case.petitioner)),
        (14, "versus".to_string()),
        (16, format!("{} ... Respondent", case.respondent)),
        (10, String::new()),
        (10, format!("Package {}", filing.package_id)),
        (
            10,
            format!("Assembled {}", filing.assembled_at.format("%Y-%m-%d %H:%M UTC")),
        ),
    ]))?;

    let rows = filing.index_rows();
    for (i, chunk) in rows.chunks(INDEX_ROWS_PER_PAGE).enumerate() {
        let mut lines = vec![(
            16,
            if i == 0 { "INDEX".to_string() } else { "INDEX (continued)".to_string() },
        )];
        lines.extend(chunk.iter().map(|entry| {
            let pages = entry
                .page_range
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string());
            (11, format!("{:>3}.  {}  ....  {}", entry.index, entry.document_name, pages))
        }));
        pdf.add_page(text_page(&lines))?;
    }

    let mut separators = Vec::with_capacity(filing.documents().len());
    for doc in filing.documents() {
        let mut lines = vec![(18, doc.bookmark_path.clone())];
        if let Some(range) = doc.page_range {
            lines.push((12, format!("Pages {}", range)));
        }
        lines.push((12, format!("{} page(s)", doc.page_count)));
        separators.push((doc.id.clone(), pdf.add_page(text_page(&lines))?));
    }

    let items: Vec<(String, ObjectId)> = filing
        .bookmarks()
        .iter()
        .filter_map(|b| {
            separators
                .iter()
                .find(|(id, _)| *id == b.document_id)
                .map(|(_, page)| (b.title.clone(), *page))
        })
        .collect();
    let outlines = pdf.add_outline(&items);

    pdf.finish(&case.caption(), outlines)
}

// ---------------------------------------------------------------------------
// RTF
// ---------------------------------------------------------------------------

fn rtf_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\line "),
            c if c.is_ascii() => out.push(c),
            c => {
                // RTF \u takes a signed 16-bit value; astral chars need surrogates
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{}?", *unit as i16));
                }
            }
        }
    }
    out
}

fn export_rtf(filing: &FilingPackage) -> String {
    let case = &filing.case;
    let mut out = String::from("{\\rtf1\\ansi\\deff0{\\fonttbl{\\f0 Times New Roman;}}\n");

    out.push_str(&format!(
        "{{\\pard\\qc\\b\\fs32 IN THE {}\\par}}\n",
        rtf_escape(&case.court.to_uppercase())
    ));
    out.push_str(&format!("{{\\pard\\qc\\fs28 {}\\par}}\n", rtf_escape(&case.case_type)));
    out.push_str(&format!(
        "{{\\pard\\qc\\fs28 {} ... Petitioner\\par versus\\par {} ... Respondent\\par}}\n",
        rtf_escape(&case.petitioner),
        rtf_escape(&case.respondent)
    ));
    out.push_str("{\\pard\\qc\\b\\fs28 INDEX\\par}\n");

    for entry in filing.index_rows() {
        let pages = entry
            .page_range
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "\\trowd\\cellx900\\cellx7200\\cellx9000\n\\intbl {}.\\cell {}\\cell {}\\cell\\row\n",
            entry.index,
            rtf_escape(&entry.document_name),
            pages
        ));
    }

    out.push_str("\\pard\\par}\n");
    out
}
