//! Overall confidence of an extraction run.

use tracing::debug;

use crate::models::config::ScoringConfig;
use crate::models::profile::DocumentProfile;
use crate::models::response::{CorrectionLogEntry, FieldRecognitionResult};

/// Combines field confidences, the recognizer's own confidence and a small
/// bonus per correction into a 0 - 100 score.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer {
    config: ScoringConfig,
}

impl ConfidenceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Score a run. Zero when no field was extracted.
    ///
    /// Matched fields enter a weighted mean with the profile's weights; the
    /// recognizer confidence is one more term carrying `recognizer_share`
    /// of the total weight.
    pub fn score(
        &self,
        profile: &DocumentProfile,
        fields: &[FieldRecognitionResult],
        corrections: &[CorrectionLogEntry],
        recognizer_confidence: f32,
    ) -> u8 {
        let matched: Vec<(f64, f64)> = fields
            .iter()
            .filter(|f| f.confidence > 0.0)
            .map(|f| {
                let weight = profile
                    .weight(&f.field_name)
                    .unwrap_or(self.config.default_field_weight)
                    .max(0.0);
                (weight, f.confidence.clamp(0.0, 1.0))
            })
            .collect();
        if matched.is_empty() {
            return 0;
        }

        let mut total_weight: f64 = matched.iter().map(|(w, _)| w).sum();
        let mut weighted: f64 = matched.iter().map(|(w, c)| w * c).sum();
        if total_weight <= 0.0 {
            total_weight = matched.len() as f64;
            weighted = matched.iter().map(|(_, c)| c).sum();
        }

        let share = self.config.recognizer_share.clamp(0.0, 0.99);
        let recognizer_weight = share / (1.0 - share) * total_weight;
        let recognizer = (f64::from(recognizer_confidence) / 100.0).clamp(0.0, 1.0);

        let base = (weighted + recognizer_weight * recognizer) / (total_weight + recognizer_weight);
        let bonus = (corrections.len() as f64 * self.config.correction_bonus)
            .min(self.config.max_correction_bonus);
        let score = ((base + bonus).clamp(0.0, 1.0) * 100.0).round() as u8;

        debug!(
            "Confidence {} (fields {:.3}, recognizer {:.3}, bonus {:.3})",
            score,
            weighted / total_weight,
            recognizer,
            bonus
        );
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn field(name: &str, confidence: f64) -> FieldRecognitionResult {
        FieldRecognitionResult {
            field_name: name.to_string(),
            confidence,
            matched_synonyms: Vec::new(),
            pattern_outcomes: Vec::new(),
        }
    }

    fn correction() -> CorrectionLogEntry {
        CorrectionLogEntry {
            original: "réf".to_string(),
            corrected: "reference".to_string(),
            field: Some("reference".to_string()),
            confidence: 0.9,
            context: vec!["synonym".to_string()],
            offset: 0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_zero_without_matches() {
        let scorer = ConfidenceScorer::default();
        let profile = DocumentProfile::new("p");
        assert_eq!(scorer.score(&profile, &[], &[correction()], 100.0), 0);
        assert_eq!(scorer.score(&profile, &[field("a", 0.0)], &[], 100.0), 0);
    }

    #[test]
    fn test_recognizer_share() {
        let scorer = ConfidenceScorer::default();
        let profile = DocumentProfile::new("p");
        // 0.6 * 1.0 + 0.4 * 0.5
        assert_eq!(scorer.score(&profile, &[field("a", 1.0)], &[], 50.0), 80);
        assert_eq!(scorer.score(&profile, &[field("a", 1.0)], &[], 100.0), 100);
    }

    #[test]
    fn test_weights_apply() {
        let scorer = ConfidenceScorer::new(ScoringConfig {
            recognizer_share: 0.0,
            ..Default::default()
        });
        let profile = DocumentProfile::new("p").with_weight("a", 3.0).with_weight("b", 1.0);
        let fields = [field("a", 1.0), field("b", 0.6)];
        // (3 * 1.0 + 1 * 0.6) / 4
        assert_eq!(scorer.score(&profile, &fields, &[], 0.0), 90);
    }

    #[test]
    fn test_zero_weights_fall_back_to_equal() {
        let scorer = ConfidenceScorer::new(ScoringConfig {
            recognizer_share: 0.0,
            ..Default::default()
        });
        let profile = DocumentProfile::new("p").with_weight("a", 0.0).with_weight("b", 0.0);
        let fields = [field("a", 1.0), field("b", 0.6)];
        assert_eq!(scorer.score(&profile, &fields, &[], 0.0), 80);
    }

    #[test]
    fn test_correction_bonus_is_capped() {
        let scorer = ConfidenceScorer::default();
        let profile = DocumentProfile::new("p");
        let fields = [field("a", 0.6)];
        let base = scorer.score(&profile, &fields, &[], 60.0);
        assert_eq!(base, 60);
        assert_eq!(scorer.score(&profile, &fields, &vec![correction(); 2], 60.0), 62);
        assert_eq!(scorer.score(&profile, &fields, &vec![correction(); 20], 60.0), 65);
    }

    #[test]
    fn test_score_stays_in_range() {
        let scorer = ConfidenceScorer::default();
        let profile = DocumentProfile::new("p");
        let fields = [field("a", 1.0)];
        assert_eq!(scorer.score(&profile, &fields, &vec![correction(); 5], 100.0), 100);
        assert!(scorer.score(&profile, &[field("a", 0.01)], &[], 0.0) <= 100);
    }
}
