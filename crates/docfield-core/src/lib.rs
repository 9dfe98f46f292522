//! Core library for reading fields out of scanned business documents.
//!
//! This crate provides:
//! - A bounded, lazily filled pool of text recognizers (Tesseract, PDF text
//!   layer, plain text, optional pure-Rust ONNX)
//! - Label correction by synonyms and by edit distance
//! - Field extraction by ordered regular expressions and line-item tables
//! - Confidence scoring and built-in profiles for articles, invoices,
//!   payments and quotations

pub mod error;
pub mod extraction;
pub mod models;
pub mod ocr;
pub mod profiles;

pub use error::{DocfieldError, PoolError, ProfileError, RecognitionError, Result};
pub use extraction::{ExtractOptions, ExtractionEngine};
pub use models::{
    DocfieldConfig, DocumentProfile, ExtractedField, ExtractionResponse, FieldConfig, LineItem,
    PatternConfig,
};
pub use ocr::{ImageSource, Recognition, Recognizer, RecognizerPool};
pub use profiles::DocumentKind;
