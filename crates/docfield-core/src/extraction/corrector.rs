//! Label correction: rewrites synonyms and mangled labels to canonical
//! field names before pattern extraction.

use std::collections::HashSet;

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, trace, warn};

use crate::models::config::CorrectionConfig;
use crate::models::profile::{DocumentProfile, SemanticGroup};
use crate::models::response::CorrectionLogEntry;

use super::fuzzy::{fold, levenshtein};

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"[\p{L}\p{N}_]+").unwrap();
}

/// Corrected text and the log of rewrites that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    pub text: String,

    /// One entry per rewrite, in ascending offset order.
    pub corrections: Vec<CorrectionLogEntry>,
}

/// A pending rewrite of `text[start..end]`.
#[derive(Debug, Clone)]
struct Rewrite {
    start: usize,
    end: usize,
    replacement: String,
    field: Option<String>,
    confidence: f64,
    context: Vec<String>,
}

/// Rewrites field labels found in recognized text.
#[derive(Debug, Clone, Default)]
pub struct FieldCorrector {
    config: CorrectionConfig,
}

impl FieldCorrector {
    pub fn new(config: CorrectionConfig) -> Self {
        Self { config }
    }

    /// Replace whole-word synonym occurrences in label position with their
    /// field's canonical name.
    ///
    /// Of overlapping occurrences the longest is kept. Occurrences already
    /// spelled as the canonical name are left alone, and so are occurrences
    /// inside values (`Banque: Banque Populaire`, `REF-889`).
    pub fn correct(&self, text: &str, profile: &DocumentProfile) -> Correction {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for field in &profile.fields {
            for synonym in &field.synonyms {
                // The first field declaring a synonym owns it.
                if !seen.insert(synonym.to_lowercase()) {
                    continue;
                }
                let Some(regex) = synonym_regex(synonym) else {
                    warn!("Skipping synonym {:?} of {}: cannot build matcher", synonym, field.name);
                    continue;
                };

                for m in regex.find_iter(text) {
                    if !is_whole_word(text, m.start(), m.end())
                        || !is_label_position(text, m.start(), m.end())
                    {
                        trace!("Skipping {:?} at {}: not a label", m.as_str(), m.start());
                        continue;
                    }
                    if m.as_str().to_lowercase() == field.name.to_lowercase() {
                        continue;
                    }
                    candidates.push(Rewrite {
                        start: m.start(),
                        end: m.end(),
                        replacement: field.name.clone(),
                        field: Some(field.name.clone()),
                        confidence: self.config.synonym_confidence,
                        context: vec!["synonym".to_string()],
                    });
                }
            }
        }

        let rewrites = keep_longest(candidates);
        debug!("Synonym correction: {} rewrites", rewrites.len());
        apply(text, rewrites)
    }

    /// Repair labels mangled by recognition, using the profile's semantic
    /// groups that target one of `missing_fields` (or no field at all).
    ///
    /// A token is rewritten to the closest group word when the edit distance
    /// is small enough and its neighbours contain words of the same group.
    pub fn fuzzy_correct(
        &self,
        text: &str,
        profile: &DocumentProfile,
        missing_fields: &[&str],
    ) -> Correction {
        if !self.config.enable_fuzzy || missing_fields.is_empty() {
            return Correction {
                text: text.to_string(),
                corrections: Vec::new(),
            };
        }

        let groups: Vec<&SemanticGroup> = profile
            .semantic_groups
            .iter()
            .filter(|g| match &g.field {
                Some(field) => missing_fields.contains(&field.as_str()),
                None => true,
            })
            .collect();
        if groups.is_empty() {
            return Correction {
                text: text.to_string(),
                corrections: Vec::new(),
            };
        }

        let group_words: Vec<Vec<(String, String)>> = groups
            .iter()
            .map(|g| {
                g.words
                    .iter()
                    .flat_map(|w| w.split_whitespace())
                    .map(|w| (w.to_string(), fold(w)))
                    .collect()
            })
            .collect();
        let known = known_words(profile);

        let tokens: Vec<(usize, usize, String)> = TOKEN
            .find_iter(text)
            .map(|m| (m.start(), m.end(), fold(m.as_str())))
            .collect();

        let mut rewrites = Vec::new();
        for (i, (start, end, folded)) in tokens.iter().enumerate() {
            let length = folded.chars().count();
            if length < self.config.min_token_length
                || folded.chars().filter(|c| c.is_alphabetic()).count() < 2
                || known.contains(folded)
            {
                continue;
            }

            let threshold = self.config.max_edit_distance.min(length / 3);
            if threshold == 0 {
                continue;
            }

            let mut best: Option<(usize, usize, &str)> = None;
            for (g, words) in group_words.iter().enumerate() {
                for (word, folded_word) in words {
                    let distance = levenshtein(folded, folded_word);
                    if distance == 0 || distance > threshold {
                        continue;
                    }
                    if best.is_none_or(|(d, _, _)| distance < d) {
                        best = Some((distance, g, word.as_str()));
                    }
                }
            }
            let Some((distance, g, word)) = best else {
                continue;
            };

            let ratio = context_ratio(&tokens, i, self.config.context_window, &group_words[g]);
            trace!(
                "Fuzzy candidate {:?} -> {:?} (distance {}, context {:.2})",
                &text[*start..*end],
                word,
                distance,
                ratio
            );
            if ratio < self.config.min_context_ratio {
                continue;
            }

            let confidence = self.config.synonym_confidence
                * (1.0 - distance as f64 / (self.config.max_edit_distance as f64 + 1.0));
            rewrites.push(Rewrite {
                start: *start,
                end: *end,
                replacement: word.to_string(),
                field: groups[g].field.clone(),
                confidence,
                context: vec!["semantic-correction".to_string(), groups[g].name.clone()],
            });
        }

        debug!("Semantic correction: {} rewrites", rewrites.len());
        apply(text, rewrites)
    }
}

/// Case-insensitive matcher for a synonym; words of a multi-word synonym
/// may be separated by any horizontal whitespace.
fn synonym_regex(synonym: &str) -> Option<Regex> {
    let words: Vec<String> = synonym.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }
    Regex::new(&format!("(?i){}", words.join(r"[ \t]+"))).ok()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

/// Whether `text[start..end]` reads as a label rather than part of a value.
///
/// A label is followed by `:`, `#`, `n°` or a digit-led value, carries its
/// own marker (`facture n°`), or stands at the start of a line with nothing
/// but a line break or a column gap after it.
fn is_label_position(text: &str, start: usize, end: usize) -> bool {
    if text[start..end].ends_with(['°', ':', '#']) {
        return true;
    }

    let rest = &text[end..];
    let after = rest.trim_start_matches([' ', '\t']);
    if after.starts_with([':', '#'])
        || after.starts_with("n°")
        || after.starts_with("N°")
        || after.starts_with(|c: char| c.is_ascii_digit())
    {
        return true;
    }

    let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
    let starts_line = text[line_start..start].trim_start_matches([' ', '\t']).is_empty();
    starts_line && (after.is_empty() || after.starts_with('\n') || rest.starts_with('\t') || rest.starts_with("  "))
}

/// Resolve overlaps in favour of the longest occurrence (earliest on ties).
fn keep_longest(mut candidates: Vec<Rewrite>) -> Vec<Rewrite> {
    candidates.sort_by(|a, b| {
        (b.end - b.start)
            .cmp(&(a.end - a.start))
            .then(a.start.cmp(&b.start))
    });

    let mut kept: Vec<Rewrite> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if kept
            .iter()
            .all(|k| candidate.end <= k.start || candidate.start >= k.end)
        {
            kept.push(candidate);
        }
    }
    kept
}

/// Apply non-overlapping rewrites right to left so earlier offsets stay valid.
fn apply(text: &str, mut rewrites: Vec<Rewrite>) -> Correction {
    rewrites.sort_by(|a, b| b.start.cmp(&a.start));

    let mut corrected = text.to_string();
    let mut corrections = Vec::with_capacity(rewrites.len());
    for rewrite in rewrites {
        let original = text[rewrite.start..rewrite.end].to_string();
        corrected.replace_range(rewrite.start..rewrite.end, &rewrite.replacement);
        debug!("Corrected {:?} -> {:?} at {}", original, rewrite.replacement, rewrite.start);
        corrections.push(CorrectionLogEntry {
            original,
            corrected: rewrite.replacement,
            field: rewrite.field,
            confidence: rewrite.confidence,
            context: rewrite.context,
            offset: rewrite.start,
            timestamp: Utc::now(),
        });
    }
    corrections.reverse();

    Correction {
        text: corrected,
        corrections,
    }
}

/// Folded words the profile already knows, which are never fuzzy targets.
fn known_words(profile: &DocumentProfile) -> HashSet<String> {
    let mut known = HashSet::new();
    for field in &profile.fields {
        known.extend(field.name.split('_').map(fold));
        for synonym in &field.synonyms {
            known.extend(synonym.split_whitespace().map(fold));
        }
    }
    for group in &profile.semantic_groups {
        for word in &group.words {
            known.extend(word.split_whitespace().map(fold));
        }
    }
    known
}

/// Share of the tokens around `index` that are words of the group.
fn context_ratio(
    tokens: &[(usize, usize, String)],
    index: usize,
    window: usize,
    group: &[(String, String)],
) -> f64 {
    let from = index.saturating_sub(window);
    let to = (index + window + 1).min(tokens.len());
    let neighbours: Vec<&String> = (from..to)
        .filter(|&j| j != index)
        .map(|j| &tokens[j].2)
        .collect();
    if neighbours.is_empty() {
        return 0.0;
    }

    let hits = neighbours
        .iter()
        .filter(|n| group.iter().any(|(_, folded)| folded == n.as_str()))
        .count();
    hits as f64 / neighbours.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::FieldConfig;
    use pretty_assertions::assert_eq;

    fn profile() -> DocumentProfile {
        DocumentProfile::new("test")
            .with_field(FieldConfig::new("reference").with_synonyms(&["réf", "ref", "code article"]))
            .with_field(FieldConfig::new("quantity").with_synonyms(&["qté", "qty"]))
            .with_field(FieldConfig::new("price").with_synonyms(&["pu", "p.u.", "prix unitaire"]))
            .with_semantic_group(SemanticGroup::new(
                "price",
                Some("price"),
                &["prix", "unitaire", "tarif", "eur"],
            ))
    }

    /// Undo every logged rewrite on the corrected text.
    ///
    /// Offsets refer to the uncorrected text and entries are in ascending
    /// order, so once the prefix is restored each offset is exact.
    fn undo(text: &str, corrections: &[CorrectionLogEntry]) -> String {
        let mut text = text.to_string();
        for entry in corrections {
            let at = entry.offset;
            assert_eq!(&text[at..at + entry.corrected.len()], entry.corrected);
            text.replace_range(at..at + entry.corrected.len(), &entry.original);
        }
        text
    }

    #[test]
    fn test_single_synonym() {
        let correction = FieldCorrector::default().correct("réf: ABC123", &profile());
        assert_eq!(correction.text, "reference: ABC123");
        assert_eq!(correction.corrections.len(), 1);

        let entry = &correction.corrections[0];
        assert_eq!(entry.original, "réf");
        assert_eq!(entry.corrected, "reference");
        assert_eq!(entry.field.as_deref(), Some("reference"));
        assert_eq!(entry.confidence, 0.9);
        assert_eq!(entry.context, vec!["synonym".to_string()]);
        assert_eq!(entry.offset, 0);
    }

    #[test]
    fn test_whole_words_only() {
        let correction = FieldCorrector::default().correct("refund pure quantity", &profile());
        assert_eq!(correction.text, "refund pure quantity");
        assert!(correction.corrections.is_empty());
    }

    #[test]
    fn test_multi_word_synonym_spans_whitespace() {
        let correction = FieldCorrector::default().correct("Code \t Article: X-1\nPrix  unitaire: 3", &profile());
        assert_eq!(correction.text, "reference: X-1\nprice: 3");
        assert_eq!(correction.corrections.len(), 2);
        assert_eq!(correction.corrections[0].original, "Code \t Article");
        assert_eq!(correction.corrections[1].original, "Prix  unitaire");
    }

    #[test]
    fn test_canonical_spelling_not_rewritten() {
        let profile = DocumentProfile::new("t")
            .with_field(FieldConfig::new("total").with_synonyms(&["TOTAL", "montant"]));
        let correction = FieldCorrector::default().correct("Total: 5 montant: 6", &profile);
        assert_eq!(correction.text, "Total: 5 total: 6");
        assert_eq!(correction.corrections.len(), 1);
    }

    #[test]
    fn test_log_matches_rewrites_one_to_one() {
        let text = "Réf: A-1 qté 4 p.u. 2,50\nREF: B-2 qty: 1 PU 9,90 prix unitaire 1";
        let correction = FieldCorrector::default().correct(text, &profile());

        assert_eq!(correction.corrections.len(), 7);
        let offsets: Vec<usize> = correction.corrections.iter().map(|c| c.offset).collect();
        let mut sorted = offsets.clone();
        sorted.sort();
        assert_eq!(offsets, sorted);
        assert_eq!(undo(&correction.text, &correction.corrections), text);
    }

    #[test]
    fn test_values_are_not_rewritten() {
        let profile = DocumentProfile::new("t")
            .with_field(FieldConfig::new("bank").with_synonyms(&["banque"]))
            .with_field(FieldConfig::new("reference").with_synonyms(&["ref"]));

        let correction = FieldCorrector::default().correct("Banque: Banque Populaire", &profile);
        assert_eq!(correction.text, "bank: Banque Populaire");
        assert_eq!(correction.corrections.len(), 1);

        let correction = FieldCorrector::default().correct("reference: REF-889\nREF 12", &profile);
        assert_eq!(correction.text, "reference: REF-889\nreference 12");
        assert_eq!(correction.corrections.len(), 1);
        assert_eq!(correction.corrections[0].offset, 19);
    }

    #[test]
    fn test_label_on_its_own_line() {
        let correction = FieldCorrector::default().correct("Réf\nA-1\nRéf B-2", &profile());
        assert_eq!(correction.text, "reference\nA-1\nRéf B-2");
    }

    #[test]
    fn test_correct_is_deterministic() {
        let corrector = FieldCorrector::default();
        let text = "réf: A qté: 2 pu: 3";
        let a = corrector.correct(text, &profile());
        let b = corrector.correct(text, &profile());
        assert_eq!(a.text, b.text);
        assert_eq!(a.corrections.len(), b.corrections.len());
    }

    #[test]
    fn test_fuzzy_repairs_with_context() {
        let correction =
            FieldCorrector::default().fuzzy_correct("Prlx unitaire: 12,00", &profile(), &["price"]);
        assert_eq!(correction.text, "prix unitaire: 12,00");
        assert_eq!(correction.corrections.len(), 1);

        let entry = &correction.corrections[0];
        assert_eq!(entry.original, "Prlx");
        assert_eq!(entry.field.as_deref(), Some("price"));
        assert_eq!(
            entry.context,
            vec!["semantic-correction".to_string(), "price".to_string()]
        );
        assert!(entry.confidence < 0.9);
        assert!((entry.confidence - 0.6).abs() < 1e-9);
        assert_eq!(undo(&correction.text, &correction.corrections), "Prlx unitaire: 12,00");
    }

    #[test]
    fn test_fuzzy_needs_context() {
        let correction =
            FieldCorrector::default().fuzzy_correct("Prlx: 12,00", &profile(), &["price"]);
        assert!(correction.corrections.is_empty());
    }

    #[test]
    fn test_fuzzy_only_for_missing_fields() {
        let correction =
            FieldCorrector::default().fuzzy_correct("Prlx unitaire: 12,00", &profile(), &["quantity"]);
        assert!(correction.corrections.is_empty());
    }

    #[test]
    fn test_fuzzy_disabled() {
        let corrector = FieldCorrector::new(CorrectionConfig {
            enable_fuzzy: false,
            ..Default::default()
        });
        let correction = corrector.fuzzy_correct("Prlx unitaire: 12,00", &profile(), &["price"]);
        assert!(correction.corrections.is_empty());
    }
}
