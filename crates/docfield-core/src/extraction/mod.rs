//! Field extraction from recognized text.
//!
//! The pieces run in this order for one document:
//! 1. [`TextNormalizer`] - whitespace and layout cleanup
//! 2. [`FieldCorrector`] - synonym rewriting, then edit-distance repair
//! 3. [`TableExtractor`] - line items, cut out of the text
//! 4. [`PatternExtractor`] - ordered regular expressions per field
//! 5. [`ConfidenceScorer`] - overall 0 - 100 score
//!
//! [`ExtractionEngine`] wires them to a [`RecognizerPool`](crate::ocr::RecognizerPool).

mod corrector;
mod engine;
pub mod fuzzy;
mod normalizer;
mod patterns;
mod processors;
mod scorer;
mod table;

pub use corrector::{Correction, FieldCorrector};
pub use engine::{ExtractOptions, ExtractionEngine};
pub use normalizer::TextNormalizer;
pub use patterns::{FieldExtraction, PatternExtractor};
pub use processors::{parse_amount, parse_date, CustomProcessor, LookupEntry, ValueProcessor};
pub use scorer::ConfidenceScorer;
pub use table::{TableExtraction, TableExtractor};
