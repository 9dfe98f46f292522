//! Values produced by one extraction run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Record of one label rewrite performed before extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionLogEntry {
    /// Text as it appeared before the rewrite.
    pub original: String,

    /// Replacement text.
    pub corrected: String,

    /// Field the replacement labels, if known.
    pub field: Option<String>,

    /// Confidence in the rewrite (0.0 - 1.0).
    pub confidence: f64,

    /// Tags describing how the rewrite was found.
    pub context: Vec<String>,

    /// Byte offset of `original` in the text the rewrite was applied to.
    ///
    /// Synonym rewrites (`context[0] == "synonym"`) apply to the layout
    /// text, whose corrected form is [`DebugTrace::labelled_text`].
    /// Semantic rewrites apply to the field text with the table removed,
    /// whose corrected form is [`DebugTrace::corrected_text`].
    pub offset: usize,

    /// When the rewrite happened.
    pub timestamp: DateTime<Utc>,
}

/// Outcome of evaluating one pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternOutcome {
    /// Priority of the evaluated pattern.
    pub priority: u32,

    /// Whether the pattern matched.
    pub matched: bool,

    /// Full text of the match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_text: Option<String>,

    /// Confidence added because the match carried the expected label.
    pub confidence_boost: f64,
}

/// How a field was recognized, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecognitionResult {
    pub field_name: String,

    /// Field-level confidence (0.0 - 1.0).
    pub confidence: f64,

    /// Synonyms (or the canonical name) found in the text.
    pub matched_synonyms: Vec<String>,

    /// One entry per evaluated pattern, in evaluation order.
    pub pattern_outcomes: Vec<PatternOutcome>,
}

impl FieldRecognitionResult {
    /// Whether any pattern matched.
    pub fn matched(&self) -> bool {
        self.pattern_outcomes.iter().any(|o| o.matched)
    }
}

/// A field value found in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub value: String,

    /// Confidence (0 - 100).
    pub confidence: u8,
}

/// How a line discount is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Amount,
}

/// A row of a line-item table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_type: Option<DiscountType>,
}

impl LineItem {
    /// `quantity × unit_price`, less the discount if there is one.
    pub fn computed_total(
        quantity: Decimal,
        unit_price: Decimal,
        discount: Option<(Decimal, DiscountType)>,
    ) -> Decimal {
        let gross = quantity * unit_price;
        match discount {
            Some((rate, DiscountType::Percentage)) => {
                gross - gross * rate / Decimal::ONE_HUNDRED
            }
            Some((amount, DiscountType::Amount)) => gross - amount,
            None => gross,
        }
    }
}

/// Pipeline stage of an extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStage {
    NotStarted,
    Recognizing,
    Normalizing,
    Correcting,
    ExtractingTable,
    ExtractingFields,
    Scoring,
    Done,
}

impl std::fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotStarted => "not started",
            Self::Recognizing => "recognizing",
            Self::Normalizing => "normalizing",
            Self::Correcting => "correcting",
            Self::ExtractingTable => "extracting table",
            Self::ExtractingFields => "extracting fields",
            Self::Scoring => "scoring",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Intermediate texts and warnings of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugTrace {
    pub raw_text: String,
    pub normalized_text: String,

    /// Layout text after synonym rewrites, as handed to table extraction.
    #[serde(default)]
    pub labelled_text: String,

    /// Field text after semantic rewrites, as seen by the final pattern pass.
    pub corrected_text: String,
    pub warnings: Vec<String>,
}

/// Answer to one extraction request. Always well formed, also on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResponse {
    pub success: bool,

    /// Extracted fields by name.
    pub data: BTreeMap<String, ExtractedField>,

    /// Line items of the document's table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,

    /// Per-field recognition details (debug runs only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recognition_details: Option<Vec<FieldRecognitionResult>>,

    /// Label rewrites applied before extraction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub corrections: Vec<CorrectionLogEntry>,

    /// Overall confidence (0 - 100).
    pub overall_confidence: u8,

    /// Confidence reported by the recognizer (0 - 100).
    pub recognizer_confidence: f32,

    pub processing_time_ms: u64,

    pub message: String,

    /// Stage that failed, for unsuccessful runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<ExtractionStage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugTrace>,
}

impl ExtractionResponse {
    /// Response for a run that could not read the document.
    pub fn failure(stage: ExtractionStage, message: impl Into<String>, processing_time_ms: u64) -> Self {
        Self {
            success: false,
            data: BTreeMap::new(),
            line_items: Vec::new(),
            recognition_details: None,
            corrections: Vec::new(),
            overall_confidence: 0,
            recognizer_confidence: 0.0,
            processing_time_ms,
            message: message.into(),
            failed_stage: Some(stage),
            debug: None,
        }
    }

    /// Value of a field, if extracted.
    pub fn value(&self, field: &str) -> Option<&str> {
        self.data.get(field).map(|f| f.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_computed_total() {
        let qty = Decimal::from(4);
        let price = Decimal::from_str("12.50").unwrap();

        assert_eq!(LineItem::computed_total(qty, price, None), Decimal::from(50));
        assert_eq!(
            LineItem::computed_total(qty, price, Some((Decimal::from(10), DiscountType::Percentage))),
            Decimal::from(45)
        );
        assert_eq!(
            LineItem::computed_total(qty, price, Some((Decimal::from(5), DiscountType::Amount))),
            Decimal::from(45)
        );
    }

    #[test]
    fn test_failure_shape() {
        let response = ExtractionResponse::failure(ExtractionStage::Recognizing, "no such file", 3);
        assert!(!response.success);
        assert!(response.data.is_empty());
        assert_eq!(response.overall_confidence, 0);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["failed_stage"], "recognizing");
        assert!(json.get("line_items").is_none());
    }
}
