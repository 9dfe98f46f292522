//! Recognizer for sources that already are text.

use crate::error::RecognitionError;

use super::{ImageSource, Recognition, Recognizer};

/// Passes UTF-8 text through unchanged, with a fixed confidence.
pub struct PlainTextRecognizer {
    confidence: f32,
}

impl PlainTextRecognizer {
    pub fn new(confidence: f32) -> Self {
        Self { confidence }
    }
}

impl Recognizer for PlainTextRecognizer {
    fn name(&self) -> &str {
        "text"
    }

    fn recognize(&self, source: &ImageSource) -> Result<Recognition, RecognitionError> {
        let data = source.read_bytes()?;
        let text = std::str::from_utf8(&data)
            .map_err(|e| RecognitionError::UnsupportedFormat(format!("not UTF-8 text: {}", e)))?;
        Ok(Recognition::new(text.strip_prefix('\u{feff}').unwrap_or(text), self.confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "\u{feff}Référence: A1").unwrap();

        let recognition = PlainTextRecognizer::new(92.0)
            .recognize(&ImageSource::path(&path))
            .unwrap();
        assert_eq!(recognition.text, "Référence: A1");
        assert_eq!(recognition.confidence, 92.0);
    }

    #[test]
    fn test_rejects_binary() {
        let result = PlainTextRecognizer::new(100.0).recognize(&ImageSource::buffer(vec![0xff, 0xfe, 0x00]));
        assert!(matches!(result, Err(RecognitionError::UnsupportedFormat(_))));
    }
}
