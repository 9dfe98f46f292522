//! Subcommands and the option handling they share.

pub mod batch;
pub mod config;
pub mod process;
pub mod profiles;

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use tracing::debug;

use docfield_core::models::config::RecognizerBackend;
use docfield_core::{DocfieldConfig, DocumentKind, DocumentProfile};

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docfield")
        .join("config.json")
}

/// Load the configuration from `path`, else from the default location if a
/// file exists there, else the built-in defaults.
pub fn load_config(path: Option<&str>) -> anyhow::Result<DocfieldConfig> {
    let config = match path {
        Some(path) => DocfieldConfig::from_file(Path::new(path))?,
        None => {
            let default_path = default_config_path();
            if default_path.exists() {
                debug!("Using config at {}", default_path.display());
                DocfieldConfig::from_file(&default_path)?
            } else {
                DocfieldConfig::default()
            }
        }
    };
    config.validate()?;
    Ok(config)
}

/// Recognizer backend selectable on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum BackendArg {
    /// Choose by file content
    Auto,
    /// External tesseract command
    Tesseract,
    /// Embedded PDF text
    PdfText,
    /// Plain UTF-8 text files
    Text,
    /// In-process ONNX models
    Onnx,
}

impl From<BackendArg> for RecognizerBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Auto => RecognizerBackend::Auto,
            BackendArg::Tesseract => RecognizerBackend::Tesseract,
            BackendArg::PdfText => RecognizerBackend::PdfText,
            BackendArg::Text => RecognizerBackend::Text,
            BackendArg::Onnx => RecognizerBackend::Onnx,
        }
    }
}

/// Options choosing the profile and recognizer, shared by `process` and
/// `batch`.
#[derive(Args, Debug, Clone)]
pub struct ExtractionArgs {
    /// Built-in profile (article, invoice, payment, quotation)
    #[arg(short, long, default_value = "article")]
    pub profile: String,

    /// Profile JSON file, overrides --profile
    #[arg(long)]
    pub profile_file: Option<PathBuf>,

    /// Recognizer backend, overrides the configuration
    #[arg(short, long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Recognition languages, e.g. "fra+eng"
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Maximum number of recognizer instances
    #[arg(long)]
    pub max_instances: Option<usize>,
}

impl ExtractionArgs {
    /// Apply the command-line overrides to `config`.
    pub fn apply(&self, config: &mut DocfieldConfig) {
        if let Some(backend) = self.backend {
            config.pool.backend = backend.into();
        }
        if let Some(lang) = &self.lang {
            config.pool.recognizer.languages = lang
                .split(['+', ','])
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(max) = self.max_instances {
            config.pool.max_instances = max;
        }
    }

    pub fn profile(&self) -> anyhow::Result<DocumentProfile> {
        match &self.profile_file {
            Some(path) => Ok(DocumentProfile::from_file(path)?),
            None => Ok(self.profile.parse::<DocumentKind>()?.profile()),
        }
    }
}
