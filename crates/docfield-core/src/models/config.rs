//! Configuration structures for the extraction pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DocfieldError, Result};

/// Main configuration for docfield.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocfieldConfig {
    /// Recognizer pool configuration.
    pub pool: PoolConfig,

    /// Retry policy for recognition calls.
    pub retry: RetryConfig,

    /// Text normalization configuration.
    pub normalizer: NormalizerConfig,

    /// Label correction configuration.
    pub correction: CorrectionConfig,

    /// Field-level confidence configuration.
    pub extraction: ExtractionConfig,

    /// Overall confidence scoring configuration.
    pub scoring: ScoringConfig,
}

/// Which recognizer implementation the pool constructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecognizerBackend {
    /// Pick by source format: PDF text, plain text, otherwise tesseract.
    #[default]
    Auto,
    /// External `tesseract` command.
    Tesseract,
    /// Embedded PDF text layer.
    PdfText,
    /// Already-recognized UTF-8 text.
    Text,
    /// In-process ONNX models (requires the `onnx` feature).
    Onnx,
}

/// Page segmentation mode handed to the recognition engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationMode {
    /// Fully automatic page segmentation.
    Auto,
    /// A single column of text of variable sizes.
    SingleColumn,
    /// A single uniform block of text.
    #[default]
    UniformBlock,
    /// A single text line.
    SingleLine,
    /// As much text as possible in no particular order.
    SparseText,
}

impl SegmentationMode {
    /// Numeric value understood by tesseract's `--psm`.
    pub fn as_psm(&self) -> u8 {
        match self {
            Self::Auto => 3,
            Self::SingleColumn => 4,
            Self::UniformBlock => 6,
            Self::SingleLine => 7,
            Self::SparseText => 11,
        }
    }
}

/// Recognition engine mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    /// Legacy engine only.
    Legacy,
    /// Neural net LSTM engine only.
    #[default]
    Lstm,
    /// Legacy and LSTM combined.
    Combined,
    /// Whatever the engine has available.
    EngineDefault,
}

impl EngineMode {
    /// Numeric value understood by tesseract's `--oem`.
    pub fn as_oem(&self) -> u8 {
        match self {
            Self::Legacy => 0,
            Self::Lstm => 1,
            Self::Combined => 2,
            Self::EngineDefault => 3,
        }
    }
}

/// Characters commonly found on French business documents.
pub const DEFAULT_CHAR_WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz\
ÀÂÄÇÉÈÊËÎÏÔÖÙÛÜàâäçéèêëîïôöùûü0123456789.,:;/-_%€$£()#°'&+*@ ";

/// Settings every recognizer instance is configured with once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerSettings {
    /// Recognition languages (tesseract codes).
    pub languages: Vec<String>,

    /// Page segmentation mode.
    pub segmentation_mode: SegmentationMode,

    /// Engine mode.
    pub engine_mode: EngineMode,

    /// Characters the engine may emit (`None` = unrestricted).
    pub char_whitelist: Option<String>,

    /// Path or name of the tesseract binary.
    pub tesseract_path: String,

    /// Directory holding ONNX models for the in-process backend.
    pub model_dir: PathBuf,

    /// Confidence (0 - 100) reported for plain text sources.
    pub text_confidence: f32,

    /// Minimum embedded text length for a PDF to count as readable.
    pub min_pdf_text_length: usize,
}

impl Default for RecognizerSettings {
    fn default() -> Self {
        Self {
            languages: vec!["fra".to_string(), "eng".to_string()],
            segmentation_mode: SegmentationMode::default(),
            engine_mode: EngineMode::default(),
            char_whitelist: Some(DEFAULT_CHAR_WHITELIST.to_string()),
            tesseract_path: "tesseract".to_string(),
            model_dir: PathBuf::from("models"),
            text_confidence: 100.0,
            min_pdf_text_length: 20,
        }
    }
}

impl RecognizerSettings {
    /// Languages joined the way tesseract expects them (`fra+eng`).
    pub fn language_arg(&self) -> String {
        self.languages.join("+")
    }
}

/// Recognizer pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of recognizer instances.
    pub max_instances: usize,

    /// Recognizer implementation.
    pub backend: RecognizerBackend,

    /// Settings applied to each instance.
    pub recognizer: RecognizerSettings,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_instances: 2,
            backend: RecognizerBackend::default(),
            recognizer: RecognizerSettings::default(),
        }
    }
}

/// Retry configuration for recognition calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts after the first one.
    pub max_retries: u32,

    /// Delay before the first retry.
    pub initial_backoff_ms: u64,

    /// Factor applied to the delay after each retry.
    pub multiplier: f64,

    /// Upper bound for a single delay.
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 200,
            multiplier: 2.0,
            max_backoff_ms: 2_000,
        }
    }
}

impl RetryConfig {
    /// Initial backoff as a duration.
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Maximum backoff as a duration.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Text normalization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Keep a single line break where a whitespace run contained one.
    pub preserve_line_breaks: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            preserve_line_breaks: true,
        }
    }
}

/// Label correction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Confidence attached to a direct synonym rewrite.
    pub synonym_confidence: f64,

    /// Enable edit-distance correction against semantic groups.
    pub enable_fuzzy: bool,

    /// Maximum edit distance for a fuzzy correction.
    pub max_edit_distance: usize,

    /// Tokens inspected on each side of a fuzzy candidate.
    pub context_window: usize,

    /// Share of context tokens that must belong to the candidate's group.
    pub min_context_ratio: f64,

    /// Shortest token considered for fuzzy correction.
    pub min_token_length: usize,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            synonym_confidence: 0.9,
            enable_fuzzy: true,
            max_edit_distance: 2,
            context_window: 2,
            min_context_ratio: 0.25,
            min_token_length: 4,
        }
    }
}

/// Field-level confidence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Contribution when a synonym of the field occurs in the text.
    pub synonym_weight: f64,

    /// Contribution when a pattern of the field matched.
    pub pattern_weight: f64,

    /// Bonus when the matched label resembles the pattern example's label.
    pub label_bonus: f64,

    /// Minimum similarity (0 - 1) for two labels to resemble each other.
    pub label_similarity: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            synonym_weight: 0.4,
            pattern_weight: 0.6,
            label_bonus: 0.3,
            label_similarity: 0.5,
        }
    }
}

/// Overall confidence scoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Share of the total weight given to the recognizer's own confidence.
    pub recognizer_share: f64,

    /// Weight of matched fields missing from the profile's weight table.
    pub default_field_weight: f64,

    /// Bonus per applied correction.
    pub correction_bonus: f64,

    /// Cap on the total correction bonus.
    pub max_correction_bonus: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            recognizer_share: 0.4,
            default_field_weight: 1.0,
            correction_bonus: 0.01,
            max_correction_bonus: 0.05,
        }
    }
}

impl DocfieldConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| DocfieldError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| DocfieldError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.pool.max_instances == 0 {
            return Err(DocfieldError::Config(
                "pool.max_instances must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.scoring.recognizer_share) {
            return Err(DocfieldError::Config(
                "scoring.recognizer_share must be in [0, 1)".to_string(),
            ));
        }
        if self.retry.multiplier < 1.0 {
            return Err(DocfieldError::Config(
                "retry.multiplier must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.correction.min_context_ratio) {
            return Err(DocfieldError::Config(
                "correction.min_context_ratio must be in [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}
