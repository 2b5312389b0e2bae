//! Error types for the inventory harvester.
//!
//! Uses the dual-error pattern: `InventoryError` for document- and
//! process-level failures that abort a call, and `DatasetError` for
//! per-dataset problems that are collected while the batch continues.

use thiserror::Error;

/// Main error type for the inventory harvester library.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The bundled schema (or a supplied one) could not be loaded.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Bytes are not well-formed XML, or a mandatory document field is absent.
    #[error("Malformed inventory document: {0}")]
    MalformedDocument(String),

    /// Well-formed XML that does not conform to the inventory schema.
    #[error("Inventory document does not conform to schema: {}", .errors.join("; "))]
    SchemaViolation { errors: Vec<String> },

    /// Invalid date format.
    #[error("Invalid date format: '{0}'. Expected YYYY-MM-DD (e.g., 2013-12-01)")]
    InvalidDate(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body exceeded the configured limit.
    #[error("Response from {url} exceeds maximum size of {max_bytes} bytes")]
    ResponseTooLarge { url: String, max_bytes: u64 },

    /// All retry attempts failed.
    #[error("Download failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error.
    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl InventoryError {
    /// Whether this error means "this document produced nothing".
    ///
    /// Document errors are recoverable at the batch level: the caller
    /// records them and skips the document. Everything else is either a
    /// process-level failure or an I/O problem on the caller's side.
    #[must_use]
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedDocument(_) | Self::SchemaViolation { .. }
        )
    }
}

impl From<roxmltree::Error> for InventoryError {
    fn from(err: roxmltree::Error) -> Self {
        Self::MalformedDocument(err.to_string())
    }
}

/// A problem with a single dataset. The rest of the batch is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatasetError {
    /// A dataset maps to a key already seen earlier in the same document.
    #[error("Duplicate dataset key '{key}' at position {position}")]
    DuplicateKey { key: String, position: usize },

    /// A dataset fails a required-field check.
    #[error("Invalid dataset at position {position}: {reason}")]
    InvalidDataset { position: usize, reason: String },
}

impl DatasetError {
    /// Zero-based position of the dataset in document order.
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            Self::DuplicateKey { position, .. } | Self::InvalidDataset { position, .. } => {
                *position
            }
        }
    }
}

/// Result type alias for inventory operations.
pub type Result<T> = std::result::Result<T, InventoryError>;
