//! In-process recognizer using `pure-onnx-ocr` (pure Rust, no ONNX Runtime).

use std::path::Path;
use std::sync::Mutex;

use tracing::{debug, info};

use crate::error::RecognitionError;

use super::{ImageSource, Recognition, Recognizer, SourceFormat};

/// Detection plus recognition models loaded from a directory holding
/// `det.onnx`, `latin_rec.onnx` and `latin_dict.txt`.
pub struct OnnxRecognizer {
    engine: Mutex<pure_onnx_ocr::engine::OcrEngine>,
}

impl OnnxRecognizer {
    pub fn from_dir(model_dir: &Path) -> Result<Self, RecognitionError> {
        let det_path = model_dir.join("det.onnx");
        let rec_path = model_dir.join("latin_rec.onnx");
        let dict_path = model_dir.join("latin_dict.txt");

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| RecognitionError::Engine(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self {
            engine: Mutex::new(engine),
        })
    }
}

impl Recognizer for OnnxRecognizer {
    fn name(&self) -> &str {
        "onnx"
    }

    fn recognize(&self, source: &ImageSource) -> Result<Recognition, RecognitionError> {
        let data = source.read_bytes()?;
        let format = SourceFormat::sniff(&data);
        let SourceFormat::Image(image_format) = format else {
            return Err(RecognitionError::UnsupportedFormat(format!(
                "onnx backend reads images, got {}",
                format
            )));
        };

        let image = image::load_from_memory_with_format(&data, image_format)
            .map_err(|e| RecognitionError::Unreadable(format!("failed to decode image: {}", e)))?;

        let results = {
            let engine = self
                .engine
                .lock()
                .map_err(|_| RecognitionError::Engine("onnx engine lock poisoned".to_string()))?;
            engine
                .run_from_image(&image)
                .map_err(|e| RecognitionError::Engine(format!("pure-onnx-ocr: {}", e)))?
        };

        debug!("pure-onnx-ocr returned {} text regions", results.len());

        // Reading order: 20px rows, then left to right.
        let mut regions: Vec<(f64, f64, String, f32)> = results
            .iter()
            .map(|r| {
                let (x, y) = top_left(&r.bounding_box);
                (x, y, r.text.replace("[UNK]", " "), r.confidence)
            })
            .collect();
        regions.sort_by(|a, b| {
            let row_a = (a.1 / 20.0) as i64;
            let row_b = (b.1 / 20.0) as i64;
            row_a
                .cmp(&row_b)
                .then(a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        });

        let confidence = if regions.is_empty() {
            0.0
        } else {
            regions.iter().map(|r| r.3).sum::<f32>() / regions.len() as f32 * 100.0
        };
        let text = regions
            .iter()
            .map(|r| r.2.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Recognition::new(text, confidence))
    }
}

fn top_left(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f64, f64) {
    polygon
        .exterior()
        .coords()
        .take(4)
        .fold((f64::MAX, f64::MAX), |(x, y), c| (x.min(c.x), y.min(c.y)))
}
