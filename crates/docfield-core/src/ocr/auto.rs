//! Recognizer that picks a backend by source format.

use tracing::{debug, warn};

use crate::error::RecognitionError;
use crate::models::config::RecognizerSettings;

use super::{
    ImageSource, PdfTextRecognizer, PlainTextRecognizer, Recognition, Recognizer, SourceFormat,
    TesseractRecognizer,
};

/// Routes PDFs to the text layer reader, text to the pass-through reader
/// and images to tesseract.
///
/// A missing tesseract binary does not prevent construction; only image
/// sources fail in that case.
pub struct AutoRecognizer {
    pdf: PdfTextRecognizer,
    text: PlainTextRecognizer,
    images: Option<TesseractRecognizer>,
}

impl AutoRecognizer {
    pub fn new(settings: &RecognizerSettings) -> Self {
        let images = match TesseractRecognizer::new(settings.clone()) {
            Ok(recognizer) => Some(recognizer),
            Err(e) => {
                warn!("Image recognition unavailable: {}", e);
                None
            }
        };

        Self {
            pdf: PdfTextRecognizer::new(settings.min_pdf_text_length),
            text: PlainTextRecognizer::new(settings.text_confidence),
            images,
        }
    }
}

impl Recognizer for AutoRecognizer {
    fn name(&self) -> &str {
        "auto"
    }

    fn recognize(&self, source: &ImageSource) -> Result<Recognition, RecognitionError> {
        let format = source.format()?;
        debug!("Detected {} source: {}", format, source.describe());

        match format {
            SourceFormat::Pdf => self.pdf.recognize(source),
            SourceFormat::Text => self.text.recognize(source),
            SourceFormat::Image(_) => match &self.images {
                Some(tesseract) => tesseract.recognize(source),
                None => Err(RecognitionError::UnsupportedFormat(
                    "image sources need tesseract, which is not available".to_string(),
                )),
            },
            SourceFormat::Unknown => Err(RecognitionError::UnsupportedFormat(format!(
                "cannot identify {}",
                source.describe()
            ))),
        }
    }

    fn terminate(&self) {
        if let Some(tesseract) = &self.images {
            tesseract.terminate();
        }
    }
}
