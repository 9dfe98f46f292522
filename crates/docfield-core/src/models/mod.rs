//! Data models: configuration, document profiles and extraction results.

pub mod config;
pub mod profile;
pub mod response;

pub use config::DocfieldConfig;
pub use profile::{
    ColumnRole, ColumnSpec, DocumentProfile, FieldConfig, PatternConfig, SemanticGroup, TableSpec,
};
pub use response::{
    CorrectionLogEntry, DebugTrace, DiscountType, ExtractedField, ExtractionResponse,
    ExtractionStage, FieldRecognitionResult, LineItem, PatternOutcome,
};
