//! Recognizer reading the embedded text layer of PDF documents.

use lopdf::Document;
use tracing::debug;

use crate::error::RecognitionError;

use super::{ImageSource, Recognition, Recognizer, SourceFormat};

/// Reads text from PDFs that carry a text layer.
///
/// Scanned PDFs without one are reported as unreadable so the caller can
/// route them to an OCR backend.
pub struct PdfTextRecognizer {
    min_text_length: usize,
}

impl PdfTextRecognizer {
    pub fn new(min_text_length: usize) -> Self {
        Self { min_text_length }
    }
}

impl Recognizer for PdfTextRecognizer {
    fn name(&self) -> &str {
        "pdf-text"
    }

    fn recognize(&self, source: &ImageSource) -> Result<Recognition, RecognitionError> {
        let data = source.read_bytes()?;
        let format = SourceFormat::sniff(&data);
        if format != SourceFormat::Pdf {
            return Err(RecognitionError::UnsupportedFormat(format!(
                "expected a PDF, got {}",
                format
            )));
        }

        let text = extract_text(&data)?;
        let length = text.trim().chars().count();
        if length < self.min_text_length {
            return Err(RecognitionError::Unreadable(format!(
                "PDF has no usable text layer ({} chars); scan it with an OCR backend",
                length
            )));
        }

        Ok(Recognition::new(text, 100.0))
    }
}

/// Extract the text layer of a PDF, decrypting empty-password documents first.
fn extract_text(data: &[u8]) -> Result<String, RecognitionError> {
    let mut doc = Document::load_mem(data)
        .map_err(|e| RecognitionError::Unreadable(format!("failed to parse PDF: {}", e)))?;

    let raw = if doc.is_encrypted() {
        if doc.decrypt("").is_err() {
            return Err(RecognitionError::Unreadable("PDF is encrypted".to_string()));
        }
        debug!("Decrypted PDF with empty password");

        let mut decrypted = Vec::new();
        doc.save_to(&mut decrypted).map_err(|e| {
            RecognitionError::Unreadable(format!("failed to save decrypted PDF: {}", e))
        })?;
        decrypted
    } else {
        data.to_vec()
    };

    let page_count = doc.get_pages().len();
    if page_count == 0 {
        return Err(RecognitionError::Unreadable("PDF has no pages".to_string()));
    }
    debug!("Loaded PDF with {} pages", page_count);

    pdf_extract::extract_text_from_mem(&raw)
        .map_err(|e| RecognitionError::Unreadable(format!("failed to extract text: {}", e)))
}
