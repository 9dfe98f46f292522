//! Field extraction by ordered regular expressions.

use regex::{Captures, Regex};
use tracing::{debug, trace};

use crate::models::config::ExtractionConfig;
use crate::models::profile::{FieldConfig, PatternConfig};
use crate::models::response::{ExtractedField, FieldRecognitionResult, PatternOutcome};

use super::fuzzy::{contains_word, fold, labels_resemble};

/// Outcome of extracting one field.
#[derive(Debug, Clone)]
pub struct FieldExtraction {
    /// The value, if a pattern matched and processing left something.
    pub value: Option<ExtractedField>,

    /// How the field was recognized.
    pub details: FieldRecognitionResult,

    /// Problems that did not prevent the run.
    pub warnings: Vec<String>,
}

/// Evaluates field patterns against corrected text.
#[derive(Debug, Clone, Default)]
pub struct PatternExtractor {
    config: ExtractionConfig,
}

impl PatternExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Extract `field` from `text`. Synonyms are looked up in `text` too.
    pub fn extract_field(&self, text: &str, field: &FieldConfig) -> Option<ExtractedField> {
        self.recognize_field(text, text, field).value
    }

    /// Extract `field` from the corrected text, looking for its labels in
    /// the text as it was before correction.
    ///
    /// Patterns run in ascending priority and the first one that matches
    /// decides: later patterns are not evaluated, even when the matched
    /// value processes to nothing.
    pub fn recognize_field(
        &self,
        corrected: &str,
        original: &str,
        field: &FieldConfig,
    ) -> FieldExtraction {
        let matched_synonyms = labels_present(original, field);
        let mut outcomes = Vec::new();
        let mut warnings = Vec::new();
        let mut value = None;
        let mut pattern_score = 0.0;

        for pattern in field.ordered_patterns() {
            let Some(caps) = first_participating(&pattern.regex, corrected, pattern.group) else {
                trace!("{}: pattern {} did not match", field.name, pattern.priority);
                outcomes.push(PatternOutcome {
                    priority: pattern.priority,
                    matched: false,
                    matched_text: None,
                    confidence_boost: 0.0,
                });
                continue;
            };

            let (full, raw) = match (caps.get(0), caps.get(pattern.group)) {
                (Some(full), Some(raw)) => (full, raw),
                _ => continue,
            };

            let label = &corrected[full.start()..raw.start()];
            let boost = if labels_resemble(label, &example_label(pattern), self.config.label_similarity) {
                self.config.label_bonus
            } else {
                0.0
            };

            outcomes.push(PatternOutcome {
                priority: pattern.priority,
                matched: true,
                matched_text: Some(full.as_str().to_string()),
                confidence_boost: boost,
            });

            let processed = match &pattern.processor {
                Some(processor) => processor.apply(raw.as_str()),
                None => raw.as_str().trim().to_string(),
            };

            pattern_score = self.config.pattern_weight + boost;
            if processed.is_empty() {
                warnings.push(format!(
                    "{}: pattern {} matched {:?} but the value could not be processed",
                    field.name,
                    pattern.priority,
                    raw.as_str()
                ));
            } else {
                debug!("{} = {:?} (pattern {})", field.name, processed, pattern.priority);
                value = Some(processed);
            }
            break;
        }

        let synonym_score = if matched_synonyms.is_empty() {
            0.0
        } else {
            self.config.synonym_weight
        };
        let confidence = if value.is_some() {
            (synonym_score + pattern_score).clamp(0.0, 1.0)
        } else {
            0.0
        };

        FieldExtraction {
            value: value.map(|value| ExtractedField {
                value,
                confidence: (confidence * 100.0).round() as u8,
            }),
            details: FieldRecognitionResult {
                field_name: field.name.clone(),
                confidence,
                matched_synonyms,
                pattern_outcomes: outcomes,
            },
            warnings,
        }
    }
}

/// First match of `regex` in `text` whose capture `group` took part.
fn first_participating<'t>(regex: &Regex, text: &'t str, group: usize) -> Option<Captures<'t>> {
    regex.captures_iter(text).find(|caps| caps.get(group).is_some())
}

/// Label part of the pattern's example: what precedes the value when the
/// pattern matches its own example, else the whole example.
fn example_label(pattern: &PatternConfig) -> String {
    pattern
        .regex
        .captures(&pattern.example)
        .and_then(|caps| {
            let full = caps.get(0)?;
            let raw = caps.get(pattern.group)?;
            Some(pattern.example[full.start()..raw.start()].to_string())
        })
        .unwrap_or_else(|| pattern.example.clone())
}

/// Synonyms, and the canonical name, occurring as whole words in `text`
/// once both sides are accent-folded.
fn labels_present(text: &str, field: &FieldConfig) -> Vec<String> {
    let folded_text = fold(text);
    let canonical = field.name.replace('_', " ");

    std::iter::once(&canonical)
        .chain(field.synonyms.iter())
        .filter(|label| contains_word(&folded_text, &fold(label)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::ValueProcessor;
    use pretty_assertions::assert_eq;

    fn reference_field() -> FieldConfig {
        FieldConfig::new("reference")
            .with_synonyms(&["réf", "ref"])
            .with_pattern(
                PatternConfig::parse(r"(?i)\breference\s*:\s*([A-Z0-9-]+)", "Référence: PROD-1", 1)
                    .unwrap()
                    .with_processor(ValueProcessor::Uppercase),
            )
            .with_pattern(PatternConfig::parse(r"\b([A-Z]{3}\d{3})\b", "ABC123", 2).unwrap())
    }

    #[test]
    fn test_first_pattern_wins() {
        let extractor = PatternExtractor::default();
        let result = extractor.recognize_field(
            "reference: prod-9 and XYZ999",
            "réf: prod-9 and XYZ999",
            &reference_field(),
        );

        let value = result.value.unwrap();
        assert_eq!(value.value, "PROD-9");
        assert_eq!(value.confidence, 100);
        assert_eq!(result.details.pattern_outcomes.len(), 1);
        // "réf" and "ref" fold to the same word.
        assert_eq!(
            result.details.matched_synonyms,
            vec!["réf".to_string(), "ref".to_string()]
        );
    }

    #[test]
    fn test_lower_priority_number_wins_regardless_of_order() {
        let field = FieldConfig::new("n")
            .with_pattern(PatternConfig::parse(r"(\d+)", "1", 5).unwrap())
            .with_pattern(PatternConfig::parse(r"n=(\d+)", "n=1", 1).unwrap());
        let value = PatternExtractor::default().extract_field("7 n=42", &field).unwrap();
        assert_eq!(value.value, "42");
    }

    #[test]
    fn test_falls_through_to_next_pattern() {
        let extractor = PatternExtractor::default();
        let result = extractor.recognize_field("code XYZ999", "code XYZ999", &reference_field());

        let value = result.value.unwrap();
        assert_eq!(value.value, "XYZ999");
        // Pattern only, no label bonus, no synonym.
        assert_eq!(value.confidence, 60);
        assert_eq!(result.details.pattern_outcomes.len(), 2);
        assert!(!result.details.pattern_outcomes[0].matched);
        assert!(result.details.pattern_outcomes[1].matched);
    }

    #[test]
    fn test_no_match_has_zero_confidence() {
        let result = PatternExtractor::default().recognize_field("réf", "réf", &reference_field());
        assert!(result.value.is_none());
        assert_eq!(result.details.confidence, 0.0);
        assert!(!result.details.matched());
    }

    #[test]
    fn test_empty_processed_value_is_a_miss() {
        let field = FieldConfig::new("amount").with_pattern(
            PatternConfig::parse(r"Montant\s*:\s*(\S+)", "Montant: 12,00", 1)
                .unwrap()
                .with_processor(ValueProcessor::Amount),
        );
        let result = PatternExtractor::default().recognize_field("Montant: abc", "Montant: abc", &field);
        assert!(result.value.is_none());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_group_must_participate() {
        let field = FieldConfig::new("x")
            .with_pattern(PatternConfig::parse(r"a(b)?c", "abc", 1).unwrap());
        let value = PatternExtractor::default().extract_field("ac then abc", &field).unwrap();
        assert_eq!(value.value, "b");
    }
}
