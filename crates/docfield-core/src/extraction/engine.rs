//! The extraction pipeline: recognition, normalization, correction, table
//! and field extraction, scoring.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::models::config::DocfieldConfig;
use crate::models::profile::DocumentProfile;
use crate::models::response::{
    DebugTrace, ExtractedField, ExtractionResponse, ExtractionStage, FieldRecognitionResult,
};
use crate::ocr::{ImageSource, RecognizerPool};

use super::corrector::FieldCorrector;
use super::normalizer::TextNormalizer;
use super::patterns::{FieldExtraction, PatternExtractor};
use super::scorer::ConfidenceScorer;
use super::table::TableExtractor;

/// Per-call options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Attach intermediate texts, warnings and per-field details.
    pub debug: bool,
}

impl ExtractOptions {
    pub fn debug() -> Self {
        Self { debug: true }
    }
}

/// Runs one document through the pipeline for a given profile.
///
/// The engine holds no per-document state; concurrent calls share only the
/// recognizer pool.
pub struct ExtractionEngine {
    pool: Arc<RecognizerPool>,
    normalizer: TextNormalizer,
    corrector: FieldCorrector,
    extractor: PatternExtractor,
    tables: TableExtractor,
    scorer: ConfidenceScorer,
}

impl ExtractionEngine {
    pub fn new(pool: Arc<RecognizerPool>, config: &DocfieldConfig) -> Self {
        Self {
            pool,
            normalizer: TextNormalizer::new(config.normalizer.clone()),
            corrector: FieldCorrector::new(config.correction.clone()),
            extractor: PatternExtractor::new(config.extraction.clone()),
            tables: TableExtractor::new(),
            scorer: ConfidenceScorer::new(config.scoring.clone()),
        }
    }

    pub fn pool(&self) -> &Arc<RecognizerPool> {
        &self.pool
    }

    /// Recognize `source` and extract the profile's fields from it.
    ///
    /// Never fails: problems reading the document are reported through
    /// `success: false` and `failed_stage`.
    pub fn extract(
        &self,
        source: &ImageSource,
        profile: &DocumentProfile,
        options: &ExtractOptions,
    ) -> ExtractionResponse {
        let start = Instant::now();
        info!("Extracting {} with profile {}", source.describe(), profile.name);

        if let Err(e) = profile.validate() {
            warn!("Rejected profile {}: {}", profile.name, e);
            return ExtractionResponse::failure(ExtractionStage::NotStarted, e.to_string(), elapsed_ms(start));
        }

        let recognition = match self.pool.recognize(source) {
            Ok(recognition) => recognition,
            Err(e) => {
                warn!("Recognition of {} failed: {}", source.describe(), e);
                return ExtractionResponse::failure(
                    ExtractionStage::Recognizing,
                    e.to_string(),
                    elapsed_ms(start),
                );
            }
        };

        self.run(&recognition.text, recognition.confidence, profile, options, start)
    }

    /// Extract the profile's fields from text recognized elsewhere.
    pub fn extract_text(
        &self,
        raw_text: &str,
        recognizer_confidence: f32,
        profile: &DocumentProfile,
        options: &ExtractOptions,
    ) -> ExtractionResponse {
        let start = Instant::now();
        if let Err(e) = profile.validate() {
            warn!("Rejected profile {}: {}", profile.name, e);
            return ExtractionResponse::failure(ExtractionStage::NotStarted, e.to_string(), elapsed_ms(start));
        }
        self.run(raw_text, recognizer_confidence, profile, options, start)
    }

    fn run(
        &self,
        raw_text: &str,
        recognizer_confidence: f32,
        profile: &DocumentProfile,
        options: &ExtractOptions,
        start: Instant,
    ) -> ExtractionResponse {
        let mut stage = ExtractionStage::Normalizing;
        debug!("{}: {} chars", stage, raw_text.len());
        let normalized = self.normalizer.normalize(raw_text);
        let layout = self.normalizer.canonicalize_layout(raw_text);

        stage = ExtractionStage::Correcting;
        let correction = self.corrector.correct(&layout, profile);
        let mut corrections = correction.corrections;
        debug!("{}: {} rewrites", stage, corrections.len());

        stage = ExtractionStage::ExtractingTable;
        let mut warnings = Vec::new();
        let labelled = correction.text;
        let (line_items, body) = match &profile.table {
            Some(spec) => {
                let table = self.tables.extract_table(&labelled, spec);
                debug!("{}: {} line items", stage, table.items.len());
                warnings.extend(table.warnings);
                (table.items, table.remaining_text)
            }
            None => (Vec::new(), labelled.clone()),
        };

        stage = ExtractionStage::ExtractingFields;
        let mut text = self.normalizer.normalize(&body);
        let mut extractions: Vec<FieldExtraction> = profile
            .fields
            .iter()
            .map(|field| self.extractor.recognize_field(&text, &normalized, field))
            .collect();

        let missing: Vec<&str> = extractions
            .iter()
            .filter(|e| e.value.is_none())
            .map(|e| e.details.field_name.as_str())
            .collect();
        if !missing.is_empty() {
            debug!("{}: missing {:?}, trying semantic correction", stage, missing);
            let fuzzy = self.corrector.fuzzy_correct(&text, profile, &missing);
            if !fuzzy.corrections.is_empty() {
                text = fuzzy.text;
                for (extraction, field) in extractions.iter_mut().zip(&profile.fields) {
                    if extraction.value.is_none() {
                        *extraction = self.extractor.recognize_field(&text, &normalized, field);
                    }
                }
                corrections.extend(fuzzy.corrections);
            }
        }

        stage = ExtractionStage::Scoring;
        let mut data = BTreeMap::new();
        let mut details: Vec<FieldRecognitionResult> = Vec::with_capacity(extractions.len());
        for extraction in extractions {
            if let Some(value) = extraction.value {
                data.insert(extraction.details.field_name.clone(), value);
            }
            warnings.extend(extraction.warnings);
            details.push(extraction.details);
        }
        let overall_confidence =
            self.scorer
                .score(profile, &details, &corrections, recognizer_confidence);
        debug!("{}: {}", stage, overall_confidence);

        stage = ExtractionStage::Done;
        let message = summary_message(&data, profile, line_items.len());
        info!("{}: {} (confidence {})", stage, message, overall_confidence);

        ExtractionResponse {
            success: true,
            data,
            line_items,
            recognition_details: options.debug.then(|| details),
            corrections,
            overall_confidence,
            recognizer_confidence,
            processing_time_ms: elapsed_ms(start),
            message,
            failed_stage: None,
            debug: options.debug.then(|| DebugTrace {
                raw_text: raw_text.to_string(),
                normalized_text: normalized,
                labelled_text: labelled,
                corrected_text: text,
                warnings,
            }),
        }
    }
}

fn summary_message(
    data: &BTreeMap<String, ExtractedField>,
    profile: &DocumentProfile,
    line_items: usize,
) -> String {
    let mut message = format!(
        "extracted {}/{} fields",
        data.len(),
        profile.fields.len()
    );
    if profile.table.is_some() {
        message.push_str(&format!(", {} line items", line_items));
    }
    message
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::RecognizerSettings;
    use crate::models::profile::{FieldConfig, PatternConfig};
    use crate::models::response::CorrectionLogEntry;
    use crate::ocr::{PlainTextRecognizer, Recognizer, RecognizerFactory};
    use crate::profiles::DocumentKind;
    use pretty_assertions::assert_eq;

    const ARTICLE: &str = "Référence: PROD-2024-789 Quantite: 25 Prix unitaire: 89.99 EUR";

    fn engine() -> ExtractionEngine {
        let factory: RecognizerFactory = Box::new(|settings: &RecognizerSettings| {
            Ok(Arc::new(PlainTextRecognizer::new(settings.text_confidence)) as Arc<dyn Recognizer>)
        });
        let pool = RecognizerPool::new(2, RecognizerSettings::default(), factory).unwrap();
        ExtractionEngine::new(Arc::new(pool), &DocfieldConfig::default())
    }

    #[test]
    fn test_article_example() {
        let engine = engine();
        let response = engine.extract(
            &ImageSource::buffer(ARTICLE.as_bytes().to_vec()),
            &DocumentKind::Article.profile(),
            &ExtractOptions::default(),
        );

        assert!(response.success);
        assert_eq!(response.value("reference"), Some("PROD-2024-789"));
        assert_eq!(response.value("quantity"), Some("25"));
        assert_eq!(response.value("price"), Some("89.99"));
        for field in ["reference", "quantity", "price"] {
            assert!(response.data[field].confidence > 0, "{} has no confidence", field);
        }
        assert!(response.corrections.is_empty());
        assert!(response.overall_confidence > 0);
        assert!(response.recognition_details.is_none());
        assert!(response.debug.is_none());
    }

    #[test]
    fn test_correction_without_extraction() {
        let profile = DocumentProfile::new("strict").with_field(
            FieldConfig::new("reference")
                .with_synonyms(&["réf"])
                .with_pattern(PatternConfig::parse(r"reference\s*=\s*(\w+)", "reference = A1", 1).unwrap()),
        );

        let response = engine().extract_text("réf: ABC123", 100.0, &profile, &ExtractOptions::default());

        assert!(response.success);
        assert_eq!(response.corrections.len(), 1);
        assert_eq!(response.corrections[0].original, "réf");
        assert_eq!(response.corrections[0].corrected, "reference");
        assert!(response.data.get("reference").is_none());
        assert_eq!(response.overall_confidence, 0);
    }

    #[test]
    fn test_correction_then_extraction() {
        let response = engine().extract_text(
            "réf: ABC123",
            100.0,
            &DocumentKind::Article.profile(),
            &ExtractOptions::default(),
        );

        assert_eq!(response.corrections.len(), 1);
        assert_eq!(response.value("reference"), Some("ABC123"));
        assert!(response.overall_confidence > 0);
    }

    #[test]
    fn test_unreadable_path() {
        let response = engine().extract(
            &ImageSource::path("/definitely/not/here.png"),
            &DocumentKind::Article.profile(),
            &ExtractOptions::debug(),
        );

        assert!(!response.success);
        assert!(response.data.is_empty());
        assert_eq!(response.overall_confidence, 0);
        assert_eq!(response.failed_stage, Some(ExtractionStage::Recognizing));
        assert!(response.message.contains("not found"));
    }

    #[test]
    fn test_deterministic_across_instances() {
        let engine = engine();
        let profile = DocumentKind::Article.profile();
        let source = ImageSource::buffer(ARTICLE.as_bytes().to_vec());

        let runs: Vec<ExtractionResponse> = (0..4)
            .map(|_| engine.extract(&source, &profile, &ExtractOptions::default()))
            .collect();

        assert_eq!(engine.pool().size(), 2);
        for run in &runs[1..] {
            assert_eq!(run.data, runs[0].data);
            assert_eq!(run.overall_confidence, runs[0].overall_confidence);
        }
    }

    #[test]
    fn test_confidence_zero_iff_no_match() {
        let engine = engine();
        let profile = DocumentKind::Article.profile();

        let empty = engine.extract_text("rien à voir ici", 95.0, &profile, &ExtractOptions::default());
        assert!(empty.data.is_empty());
        assert_eq!(empty.overall_confidence, 0);

        let some = engine.extract_text(ARTICLE, 95.0, &profile, &ExtractOptions::default());
        assert!(!some.data.is_empty());
        assert!(some.overall_confidence > 0 && some.overall_confidence <= 100);
    }

    #[test]
    fn test_semantic_fallback_recovers_label() {
        let response = engine().extract_text(
            "Prlx unitaire: 12,00",
            90.0,
            &DocumentKind::Article.profile(),
            &ExtractOptions::debug(),
        );

        assert_eq!(response.value("price"), Some("12.00"));
        assert_eq!(response.corrections.len(), 1);
        assert_eq!(response.corrections[0].context[0], "semantic-correction");
        let trace = response.debug.unwrap();
        assert_eq!(trace.corrected_text, "prix unitaire: 12,00");
    }

    /// Undo logged rewrites, in ascending offset order, on the text they produced.
    fn undo(text: &str, entries: &[&CorrectionLogEntry]) -> String {
        let mut text = text.to_string();
        for entry in entries {
            let at = entry.offset;
            assert_eq!(&text[at..at + entry.corrected.len()], entry.corrected);
            text.replace_range(at..at + entry.corrected.len(), &entry.original);
        }
        text
    }

    #[test]
    fn test_correction_log_traces_both_stages() {
        let raw = "Prlx unitaire: 12,00\nréf: ABC123";
        let response = engine().extract_text(
            raw,
            100.0,
            &DocumentKind::Article.profile(),
            &ExtractOptions::debug(),
        );

        assert_eq!(response.value("reference"), Some("ABC123"));
        assert_eq!(response.value("price"), Some("12.00"));
        assert_eq!(response.corrections.len(), 2);

        let (direct, semantic): (Vec<&CorrectionLogEntry>, Vec<&CorrectionLogEntry>) = response
            .corrections
            .iter()
            .partition(|c| c.context[0] == "synonym");
        assert_eq!(direct.len(), 1);
        assert_eq!(semantic.len(), 1);

        let trace = response.debug.unwrap();
        assert_eq!(trace.labelled_text, "Prlx unitaire: 12,00\nreference: ABC123");
        assert_eq!(trace.corrected_text, "prix unitaire: 12,00\nreference: ABC123");
        assert_eq!(undo(&trace.labelled_text, &direct), raw);
        assert_eq!(undo(&trace.corrected_text, &semantic), trace.labelled_text);
    }

    #[test]
    fn test_invoice_table_excluded_from_fields() {
        let text = "FACTURE N° FA-2024-0042\n\
                    Date: 15/01/2024\n\
                    \n\
                    Désignation          Qté    Prix unitaire    Total\n\
                    Vis inox M4          100    0,15             15,00\n\
                    Perceuse             1      85,00            85,00\n\
                    \n\
                    Total HT: 100,00\n\
                    TVA 20%: 20,00\n\
                    Total TTC: 120,00 €";

        let response = engine().extract_text(
            text,
            100.0,
            &DocumentKind::Invoice.profile(),
            &ExtractOptions::debug(),
        );

        assert!(response.success);
        assert_eq!(response.line_items.len(), 2);
        assert_eq!(response.value("invoice_number"), Some("FA-2024-0042"));
        assert_eq!(response.value("invoice_date"), Some("2024-01-15"));
        assert_eq!(response.value("total_ht"), Some("100.00"));
        assert_eq!(response.value("total_tva"), Some("20.00"));
        assert_eq!(response.value("total_ttc"), Some("120.00"));
        assert_eq!(response.value("vat_rate"), Some("20"));

        let trace = response.debug.unwrap();
        assert!(!trace.corrected_text.contains("Perceuse"));
        assert_eq!(response.recognition_details.unwrap().len(), DocumentKind::Invoice.profile().fields.len());
    }

    #[test]
    fn test_invalid_profile_is_a_failure() {
        let profile = DocumentProfile::new("broken")
            .with_field(FieldConfig::new("a"))
            .with_field(FieldConfig::new("a"));
        let response = engine().extract_text("a", 100.0, &profile, &ExtractOptions::default());
        assert!(!response.success);
        assert_eq!(response.failed_stage, Some(ExtractionStage::NotStarted));
    }
}
