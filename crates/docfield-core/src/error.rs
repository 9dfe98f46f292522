//! Error types for the docfield-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the docfield library.
#[derive(Error, Debug)]
pub enum DocfieldError {
    /// Text recognition error.
    #[error("recognition error: {0}")]
    Recognition(#[from] RecognitionError),

    /// Recognizer pool error.
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    /// Document profile error.
    #[error("profile error: {0}")]
    Profile(#[from] ProfileError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while turning a source into text.
#[derive(Error, Debug)]
pub enum RecognitionError {
    /// The source path does not exist.
    #[error("source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// The source is not in a format the recognizer handles.
    #[error("unsupported source format: {0}")]
    UnsupportedFormat(String),

    /// The source exists but no text could be read from it.
    #[error("unreadable source: {0}")]
    Unreadable(String),

    /// The underlying recognition engine failed.
    #[error("recognition engine failed: {0}")]
    Engine(String),

    /// I/O error while reading the source or talking to the engine.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecognitionError {
    /// Whether another attempt could succeed.
    ///
    /// A missing or unsupported source fails the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Engine(_) | Self::Io(_))
    }
}

/// Errors related to the recognizer pool.
#[derive(Error, Debug)]
pub enum PoolError {
    /// A recognizer instance could not be constructed.
    #[error("failed to construct recognizer: {0}")]
    Construction(#[source] RecognitionError),

    /// The pool has been shut down.
    #[error("recognizer pool is shut down")]
    ShutDown,

    /// The pool was configured with zero instances.
    #[error("pool size must be at least 1")]
    EmptyPool,
}

/// Errors related to document profiles.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// No built-in profile has this name.
    #[error("unknown document kind: {0}")]
    UnknownKind(String),

    /// Two fields share the same name.
    #[error("duplicate field: {0}")]
    DuplicateField(String),

    /// Two patterns of one field share a priority.
    #[error("duplicate priority {priority} for field {field}")]
    DuplicatePriority { field: String, priority: u32 },

    /// A pattern refers to a capture group it does not have.
    #[error("pattern `{pattern}` of {field} has no capture group {group}")]
    MissingCaptureGroup {
        field: String,
        pattern: String,
        group: usize,
    },

    /// A confidence weight names a field that is not in the profile.
    #[error("confidence weight for unknown field: {0}")]
    UnknownWeight(String),

    /// A confidence weight is negative or not finite.
    #[error("invalid confidence weight {weight} for {field}")]
    InvalidWeight { field: String, weight: f64 },

    /// A table spec is unusable.
    #[error("invalid table spec: {0}")]
    InvalidTable(String),

    /// JSON (de)serialization failed.
    #[error("invalid profile JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while reading or writing a profile.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the docfield library.
pub type Result<T> = std::result::Result<T, DocfieldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(RecognitionError::Engine("timeout".into()).is_retryable());
        assert!(!RecognitionError::SourceNotFound(PathBuf::from("/nope.png")).is_retryable());
        assert!(!RecognitionError::UnsupportedFormat("docx".into()).is_retryable());
        assert!(!RecognitionError::Unreadable("empty".into()).is_retryable());
    }

    #[test]
    fn test_pool_error_wraps_source() {
        let err: DocfieldError =
            PoolError::Construction(RecognitionError::Engine("missing binary".into())).into();
        assert_eq!(
            err.to_string(),
            "pool error: failed to construct recognizer: recognition engine failed: missing binary"
        );
    }
}
