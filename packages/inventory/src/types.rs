//! Core data types for the inventory harvester.
//!
//! These are plain values, built fresh on every run from a parsed
//! Inventory document and a caller-supplied snapshot of previous records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Document-level metadata, one per ingested Inventory document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Stable external key for the whole document (e.g. an organisation URI).
    pub identifier: String,

    /// Document-level last-modified date.
    pub modified: Option<NaiveDate>,

    pub title: String,

    pub publisher: String,

    pub description: String,

    /// URL-like token describing the area covered. Not resolved here.
    pub spatial_coverage_reference: Option<String>,
}

/// Type of a resource, taken from the `Type` attribute of `<Resource>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Data,
    Documentation,
    Unknown,
}

impl ResourceType {
    /// Get the string value for output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Documentation => "documentation",
            Self::Unknown => "unknown",
        }
    }

    /// Parse from the `Type` attribute of a `<Resource>` node.
    #[must_use]
    pub fn from_type_attribute(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("Data") => Self::Data,
            Some("Document" | "Documentation") => Self::Documentation,
            _ => Self::Unknown,
        }
    }
}

/// One rendition of a `<Resource>`, flattened into its own record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Type inherited from the parent `<Resource>`.
    pub resource_type: ResourceType,

    /// The rendition's identifier, used as the resource address.
    pub url: String,

    pub active: bool,

    pub title: String,

    pub description: String,

    pub mimetype: String,
}

/// One `<Dataset>` from an Inventory document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// Unique within a document.
    pub identifier: String,

    pub title: String,

    /// Description with HTML entities decoded.
    pub description: String,

    pub modified: Option<NaiveDate>,

    pub active: bool,

    /// Rights URL, with known legacy licence aliases canonicalised.
    pub rights: String,

    /// Service category URIs, in document order.
    pub services: Vec<String>,

    /// Function category URIs, in document order.
    pub functions: Vec<String>,

    pub resources: Vec<ResourceRecord>,
}

impl DatasetRecord {
    /// The resources a downstream consumer should publish.
    pub fn active_resources(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.resources.iter().filter(|r| r.active)
    }
}

/// Lifecycle status assigned to a dataset by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    New,
    Changed,
    Unchanged,
    Duplicate,
}

impl DecisionStatus {
    /// Get the string value for output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
            Self::Duplicate => "duplicate",
        }
    }

    /// Whether the caller has to write anything for this dataset.
    #[must_use]
    pub fn requires_write(&self) -> bool {
        matches!(self, Self::New | Self::Changed)
    }
}

/// The reconciler's verdict on one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationDecision {
    /// `{document identifier}/{dataset identifier}`.
    pub key: String,

    pub status: DecisionStatus,

    /// External id of the matching previous record. `None` for new datasets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carried_reference: Option<String>,

    /// Later of the dataset's and the document's modified dates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_modified: Option<NaiveDate>,
}

impl ReconciliationDecision {
    /// Decision for a dataset whose key was already seen in this run.
    #[must_use]
    pub fn duplicate(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            status: DecisionStatus::Duplicate,
            carried_reference: None,
            effective_modified: None,
        }
    }
}

/// The current record for a key from earlier runs, as stored by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousRecord {
    pub key: String,

    #[serde(default)]
    pub modified_date: Option<NaiveDate>,

    #[serde(default)]
    pub external_reference: Option<String>,
}

impl PreviousRecord {
    /// Create a previous record.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        modified_date: Option<NaiveDate>,
        external_reference: Option<String>,
    ) -> Self {
        Self {
            key: key.into(),
            modified_date,
            external_reference,
        }
    }
}
