//! Recognizer backed by the external `tesseract` command.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::error::RecognitionError;
use crate::models::config::RecognizerSettings;

use super::{ImageSource, Recognition, Recognizer, SourceFormat};

/// Check whether the tesseract binary can be run.
pub fn is_tesseract_available(tesseract_path: &str) -> bool {
    Command::new(tesseract_path)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Runs `tesseract <image> stdout ... tsv` and assembles the words it reports.
///
/// Languages, segmentation mode, engine mode and character whitelist are
/// fixed when the recognizer is constructed.
pub struct TesseractRecognizer {
    settings: RecognizerSettings,
    version: String,
}

impl TesseractRecognizer {
    /// Probe the binary and keep the settings.
    pub fn new(settings: RecognizerSettings) -> Result<Self, RecognitionError> {
        let output = Command::new(&settings.tesseract_path)
            .arg("--version")
            .output()
            .map_err(|e| {
                RecognitionError::Engine(format!(
                    "failed to run tesseract (is it installed? path='{}'): {}",
                    settings.tesseract_path, e
                ))
            })?;

        if !output.status.success() {
            return Err(RecognitionError::Engine(format!(
                "`{} --version` exited with code {}",
                settings.tesseract_path,
                output.status.code().unwrap_or(-1)
            )));
        }

        // Older releases print the banner on stderr.
        let banner = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).to_string()
        } else {
            String::from_utf8_lossy(&output.stdout).to_string()
        };
        let version = banner.lines().next().unwrap_or("tesseract").trim().to_string();

        info!("Using {} ({})", version, settings.language_arg());

        Ok(Self { settings, version })
    }

    /// Version banner reported by the binary.
    pub fn version(&self) -> &str {
        &self.version
    }

    fn command_args(&self, input: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            input.as_os_str().to_owned(),
            "stdout".into(),
            "-l".into(),
            self.settings.language_arg().into(),
            "--psm".into(),
            self.settings.segmentation_mode.as_psm().to_string().into(),
            "--oem".into(),
            self.settings.engine_mode.as_oem().to_string().into(),
        ];
        if let Some(whitelist) = &self.settings.char_whitelist {
            args.push("-c".into());
            args.push(format!("tessedit_char_whitelist={}", whitelist).into());
        }
        args.push("tsv".into());
        args
    }

    fn run(&self, input: &Path) -> Result<Recognition, RecognitionError> {
        debug!("Running tesseract on {}", input.display());

        let output = Command::new(&self.settings.tesseract_path)
            .args(self.command_args(input))
            .output()
            .map_err(|e| RecognitionError::Engine(format!("failed to run tesseract: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognitionError::Engine(format!(
                "tesseract failed (exit code {}): {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let recognition = parse_tsv(&String::from_utf8_lossy(&output.stdout));
        debug!(
            "tesseract read {} chars at {:.1}% confidence",
            recognition.text.len(),
            recognition.confidence
        );
        Ok(recognition)
    }
}

impl Recognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, source: &ImageSource) -> Result<Recognition, RecognitionError> {
        let data = source.read_bytes()?;
        let format = SourceFormat::sniff(&data);
        if !matches!(format, SourceFormat::Image(_)) {
            return Err(RecognitionError::UnsupportedFormat(format!(
                "tesseract reads images, got {}",
                format
            )));
        }

        match source {
            ImageSource::Path(path) => self.run(path),
            ImageSource::Buffer { .. } => {
                let temp_dir = tempfile::tempdir()?;
                let temp_path = temp_dir.path().join(format!("input.{}", format.extension()));
                std::fs::write(&temp_path, &data)?;
                self.run(&temp_path)
            }
        }
    }
}

/// Assemble tesseract's TSV output into text and a mean word confidence.
///
/// Words of one line are joined by spaces, lines by newlines, and blocks are
/// separated by an empty line. Words with a negative confidence are layout
/// placeholders and do not count.
pub fn parse_tsv(tsv: &str) -> Recognition {
    let mut text = String::new();
    let mut current_line: Option<(u32, u32, u32, u32)> = None;
    let mut current_block: Option<(u32, u32)> = None;
    let mut confidence_sum = 0.0f32;
    let mut word_count = 0usize;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let word = cols[11].trim();
        if word.is_empty() {
            continue;
        }
        let Ok(confidence) = cols[10].trim().parse::<f32>() else {
            continue;
        };
        if confidence < 0.0 {
            continue;
        }

        let num = |i: usize| cols[i].trim().parse::<u32>().unwrap_or(0);
        let line = (num(1), num(2), num(3), num(4));
        let block = (num(1), num(2));

        if current_line != Some(line) {
            if current_line.is_some() {
                text.push('\n');
                if current_block != Some(block) {
                    text.push('\n');
                }
            }
            current_line = Some(line);
            current_block = Some(block);
        } else {
            text.push(' ');
        }

        text.push_str(word);
        confidence_sum += confidence;
        word_count += 1;
    }

    let confidence = if word_count == 0 {
        0.0
    } else {
        confidence_sum / word_count as f32
    };
    Recognition::new(text, confidence)
}
