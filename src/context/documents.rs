//! Uploaded document text extraction.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

/// Page separator emitted by pdf-extract between pages.
const PAGE_BREAK: char = '\x0c';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaType {
    Pdf,
    PlainText,
}

impl MediaType {
    pub fn from_mime(mime: &str) -> Self {
        if mime.trim().eq_ignore_ascii_case("application/pdf") {
            MediaType::Pdf
        } else {
            MediaType::PlainText
        }
    }

    pub fn from_file_name(name: &str) -> Self {
        let is_pdf = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            MediaType::Pdf
        } else {
            MediaType::PlainText
        }
    }
}

/// An uploaded file as raw bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub name: String,
    pub media_type: MediaType,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(name: impl Into<String>, media_type: MediaType, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type,
            bytes,
        }
    }

    /// Media type inferred from the file extension.
    pub fn from_upload(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let media_type = MediaType::from_file_name(&name);
        Self::new(name, media_type, bytes)
    }
}

/// A document that could not be read. Non-fatal.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractWarning {
    pub file: String,
    pub message: String,
}

impl fmt::Display for ExtractWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error reading {}: {}", self.file, self.message)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extraction {
    pub text: String,
    pub warnings: Vec<ExtractWarning>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Concatenate the text of every readable document.
///
/// A document that fails contributes no text and a warning; the rest are still read.
pub fn extract(documents: &[Document]) -> Extraction {
    let mut parts = Vec::with_capacity(documents.len());
    let mut warnings = Vec::new();

    for doc in documents {
        match extract_one(doc) {
            Ok(text) => {
                tracing::debug!(file = %doc.name, chars = text.chars().count(), "extracted document");
                if !text.is_empty() {
                    parts.push(text);
                }
            }
            Err(message) => {
                tracing::warn!(file = %doc.name, error = %message, "document extraction failed");
                warnings.push(ExtractWarning {
                    file: doc.name.clone(),
                    message,
                });
            }
        }
    }

    Extraction {
        text: parts.join("\n\n"),
        warnings,
    }
}

fn extract_one(doc: &Document) -> Result<String, String> {
    match doc.media_type {
        MediaType::Pdf => extract_pdf(&doc.bytes),
        MediaType::PlainText => String::from_utf8(doc.bytes.clone())
            .map_err(|e| format!("Not valid UTF-8 text: {}", e)),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, String> {
    // pdf-extract panics on some malformed inputs instead of returning an error.
    let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(bytes)
    }))
    .map_err(|_| "PDF parser crashed on this file".to_string())?;

    let text = extracted.map_err(|e| format!("Failed to extract PDF text: {}", e))?;
    Ok(join_pages(&text))
}

/// Join non-empty pages with a newline.
fn join_pages(text: &str) -> String {
    text.split(PAGE_BREAK)
        .map(str::trim)
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut `text` to at most `budget` characters.
pub fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
