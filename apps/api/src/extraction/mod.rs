//! Document text extraction: turns an uploaded resume (PDF, DOCX, TXT) into plain text.
//!
//! The document kind is picked from the file extension, case-insensitively.
//! Parsing is CPU-bound: async callers go through [`extract_from_bytes`] /
//! [`extract_resume_text`], which run the parsers inside `spawn_blocking`.

pub mod handlers;

use std::path::{Path, PathBuf};

use docx_rs::{DocumentChild, Paragraph, ParagraphChild, Run, RunChild};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("DOCX extraction failed: {0}")]
    Docx(String),

    #[error("Text file is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Extraction task failed: {0}")]
    Join(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    /// Both `.docx` and legacy `.doc` resolve here; the DOCX parser rejects
    /// binary `.doc` files with a parse error.
    Docx,
    Txt,
}

impl DocumentKind {
    /// Resolves the kind from a path or bare file name.
    pub fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();

        match ext.as_str() {
            ".pdf" => Ok(DocumentKind::Pdf),
            ".doc" | ".docx" => Ok(DocumentKind::Docx),
            ".txt" => Ok(DocumentKind::Txt),
            _ => Err(ExtractionError::UnsupportedFileType(ext)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
            DocumentKind::Txt => "txt",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentKind::Txt => "text/plain; charset=utf-8",
        }
    }

    /// Runs the parser for this kind synchronously.
    pub fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        match self {
            DocumentKind::Pdf => extract_text_from_pdf(bytes),
            DocumentKind::Docx => extract_text_from_docx(bytes),
            DocumentKind::Txt => extract_text_from_txt(bytes),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedDocument {
    pub kind: DocumentKind,
    pub text: String,
}

/// Concatenates the text of every page, in page order.
pub fn extract_text_from_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    let text =
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractionError::Pdf(e.to_string()))?;
    Ok(clean_text(&text))
}

/// Joins the body paragraphs with newlines. Tables, headers and footers are skipped.
pub fn extract_text_from_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| ExtractionError::Docx(e.to_string()))?;

    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(paragraph) => Some(paragraph_text(paragraph)),
            _ => None,
        })
        .collect();

    Ok(clean_text(&paragraphs.join("\n")))
}

pub fn extract_text_from_txt(bytes: &[u8]) -> Result<String, ExtractionError> {
    let text = String::from_utf8(bytes.to_vec())?;
    Ok(clean_text(&text))
}

/// Trims the text and drops NUL characters, which Postgres `TEXT` rejects.
fn clean_text(text: &str) -> String {
    text.replace('\0', "").trim().to_string()
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut out = String::new();
    for child in &paragraph.children {
        push_paragraph_child(child, &mut out);
    }
    out
}

fn push_paragraph_child(child: &ParagraphChild, out: &mut String) {
    match child {
        ParagraphChild::Run(run) => push_run(run, out),
        ParagraphChild::Hyperlink(link) => {
            for nested in &link.children {
                push_paragraph_child(nested, out);
            }
        }
        _ => {}
    }
}

fn push_run(run: &Run, out: &mut String) {
    for child in &run.children {
        match child {
            RunChild::Text(text) => out.push_str(&text.text),
            RunChild::Tab(_) => out.push('\t'),
            RunChild::Break(_) => out.push('\n'),
            _ => {}
        }
    }
}

/// Extracts text from an in-memory upload, dispatching on `file_name`'s extension.
pub async fn extract_from_bytes(
    file_name: &str,
    bytes: Vec<u8>,
) -> Result<ExtractedDocument, ExtractionError> {
    let kind = DocumentKind::from_path(Path::new(file_name))?;

    let text = tokio::task::spawn_blocking(move || kind.extract(&bytes))
        .await
        .map_err(|e| ExtractionError::Join(e.to_string()))??;

    Ok(ExtractedDocument { kind, text })
}

/// Reads `path` and extracts its text. The extension is checked before any I/O.
pub async fn extract_resume_text(path: impl AsRef<Path>) -> Result<String, ExtractionError> {
    let path = path.as_ref();
    let kind = DocumentKind::from_path(path)?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    tokio::task::spawn_blocking(move || kind.extract(&bytes))
        .await
        .map_err(|e| ExtractionError::Join(e.to_string()))?
}
