//! Text recognition: the recognizer capability, its implementations and the
//! bounded pool that owns them.

mod auto;
mod pdf;
mod pool;
mod retry;
mod tesseract;
mod text;

#[cfg(feature = "onnx")]
mod onnx;

pub use auto::AutoRecognizer;
pub use pdf::PdfTextRecognizer;
pub use pool::{RecognizerFactory, RecognizerPool};
pub use retry::RetryPolicy;
pub use tesseract::{TesseractRecognizer, is_tesseract_available, parse_tsv};
pub use text::PlainTextRecognizer;

#[cfg(feature = "onnx")]
pub use onnx::OnnxRecognizer;

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::error::RecognitionError;
use crate::models::config::{RecognizerBackend, RecognizerSettings};

/// Where the document to recognize comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// A file on disk.
    Path(PathBuf),
    /// Document bytes held in memory, with an optional original file name.
    Buffer { data: Vec<u8>, name: Option<String> },
}

impl ImageSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn buffer(data: Vec<u8>) -> Self {
        Self::Buffer { data, name: None }
    }

    pub fn named_buffer(data: Vec<u8>, name: impl Into<String>) -> Self {
        Self::Buffer {
            data,
            name: Some(name.into()),
        }
    }

    /// Short human-readable description for logs and messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Buffer { data, name } => match name {
                Some(name) => format!("{} ({} bytes)", name, data.len()),
                None => format!("<buffer> ({} bytes)", data.len()),
            },
        }
    }

    /// Read the source contents.
    pub fn read_bytes(&self) -> Result<Cow<'_, [u8]>, RecognitionError> {
        match self {
            Self::Path(path) => {
                if !path.exists() {
                    return Err(RecognitionError::SourceNotFound(path.clone()));
                }
                Ok(Cow::Owned(std::fs::read(path)?))
            }
            Self::Buffer { data, .. } => Ok(Cow::Borrowed(data.as_slice())),
        }
    }

    /// Path of a file source.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            Self::Buffer { .. } => None,
        }
    }

    /// Detect the format of the source from its contents.
    pub fn format(&self) -> Result<SourceFormat, RecognitionError> {
        Ok(SourceFormat::sniff(&self.read_bytes()?))
    }
}

/// Content type of a source, detected from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Pdf,
    Image(ImageFormat),
    Text,
    Unknown,
}

impl SourceFormat {
    pub fn sniff(data: &[u8]) -> Self {
        if data.starts_with(b"%PDF") {
            return Self::Pdf;
        }
        if let Ok(format) = image::guess_format(data) {
            return Self::Image(format);
        }
        match std::str::from_utf8(data) {
            Ok(text) if !text.chars().any(|c| c.is_control() && !c.is_whitespace()) => Self::Text,
            _ => Self::Unknown,
        }
    }

    /// File extension conventionally used for the format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image(format) => format.extensions_str().first().copied().unwrap_or("img"),
            Self::Text => "txt",
            Self::Unknown => "bin",
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pdf => f.write_str("pdf"),
            Self::Image(format) => write!(f, "{:?}", format),
            Self::Text => f.write_str("text"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Text produced by a recognizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    pub text: String,

    /// Engine-reported confidence (0 - 100).
    pub confidence: f32,
}

impl Recognition {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.clamp(0.0, 100.0),
        }
    }
}

/// Capability turning a document into raw text.
///
/// Implementations must tolerate concurrent calls: the pool hands the same
/// instance to several callers once it is full.
pub trait Recognizer: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Recognize the text of `source`.
    fn recognize(&self, source: &ImageSource) -> Result<Recognition, RecognitionError>;

    /// Release engine resources. Called once by the pool on shutdown.
    fn terminate(&self) {}
}

/// Construct a recognizer for `backend`.
pub fn create_recognizer(
    backend: RecognizerBackend,
    settings: &RecognizerSettings,
) -> Result<Arc<dyn Recognizer>, RecognitionError> {
    let recognizer: Arc<dyn Recognizer> = match backend {
        RecognizerBackend::Auto => Arc::new(AutoRecognizer::new(settings)),
        RecognizerBackend::Tesseract => Arc::new(TesseractRecognizer::new(settings.clone())?),
        RecognizerBackend::PdfText => Arc::new(PdfTextRecognizer::new(settings.min_pdf_text_length)),
        RecognizerBackend::Text => Arc::new(PlainTextRecognizer::new(settings.text_confidence)),
        #[cfg(feature = "onnx")]
        RecognizerBackend::Onnx => Arc::new(OnnxRecognizer::from_dir(&settings.model_dir)?),
        #[cfg(not(feature = "onnx"))]
        RecognizerBackend::Onnx => {
            return Err(RecognitionError::Engine(
                "the onnx backend requires the `onnx` feature".to_string(),
            ));
        }
    };
    Ok(recognizer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_formats() {
        assert_eq!(SourceFormat::sniff(b"%PDF-1.7\n..."), SourceFormat::Pdf);
        assert_eq!(
            SourceFormat::sniff(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0]),
            SourceFormat::Image(ImageFormat::Png)
        );
        assert_eq!(SourceFormat::sniff("Référence: A1\n".as_bytes()), SourceFormat::Text);
        assert_eq!(SourceFormat::sniff(&[0x00, 0x01, 0xFF, 0xFE]), SourceFormat::Unknown);
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let source = ImageSource::path("/definitely/not/here.png");
        assert!(matches!(source.read_bytes(), Err(RecognitionError::SourceNotFound(_))));
    }

    #[test]
    fn test_recognition_clamps_confidence() {
        assert_eq!(Recognition::new("x", 140.0).confidence, 100.0);
        assert_eq!(Recognition::new("x", -3.0).confidence, 0.0);
    }

    #[test]
    fn test_describe() {
        assert_eq!(ImageSource::named_buffer(vec![1, 2, 3], "scan.png").describe(), "scan.png (3 bytes)");
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_onnx_backend_needs_feature() {
        let result = create_recognizer(RecognizerBackend::Onnx, &RecognizerSettings::default());
        assert!(matches!(result, Err(RecognitionError::Engine(_))));
    }
}
