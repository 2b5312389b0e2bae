//! Harvest run orchestration that ties all components together.
//!
//! Validation, parsing and reconciliation run over one document, with
//! datasets reconciled as they are parsed.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::config::InventoryConfig;
use crate::document::InventoryDocument;
use crate::error::{DatasetError, Result};
use crate::parser::InventoryParser;
use crate::reconcile::{duplicate_error, PreviousRecords, ReconcileSummary, Reconciler};
use crate::types::{DatasetRecord, DocumentMetadata, ReconciliationDecision};

/// Whether a document changed since the last successful run.
///
/// A document dated on or before the last run is not modified. Without
/// either date the document always counts as modified.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use inventory_harvester::harvester::document_modified_since;
///
/// let dec1 = NaiveDate::from_ymd_opt(2013, 12, 1);
/// let dec2 = NaiveDate::from_ymd_opt(2013, 12, 2);
///
/// assert!(document_modified_since(dec2, dec1));
/// assert!(!document_modified_since(dec1, dec1));
/// assert!(document_modified_since(None, dec1));
/// assert!(document_modified_since(dec1, None));
/// ```
pub fn document_modified_since(doc_modified: Option<NaiveDate>, last_run: Option<NaiveDate>) -> bool {
    match (doc_modified, last_run) {
        (Some(modified), Some(last_run)) => modified > last_run,
        _ => true,
    }
}

/// One dataset's decision, with the record a caller needs to apply it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarvestEntry {
    pub decision: ReconciliationDecision,
    /// `None` for duplicates, which are dropped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<DatasetRecord>,
}

/// Result of processing a modified document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarvestRun {
    pub metadata: DocumentMetadata,
    pub entries: Vec<HarvestEntry>,
    pub errors: Vec<DatasetError>,
}

impl HarvestRun {
    pub fn summary(&self) -> ReconcileSummary {
        ReconcileSummary::tally(self.entries.iter().map(|e| &e.decision), &self.errors)
    }

    /// Entries the caller has to create or update.
    pub fn pending_writes(&self) -> impl Iterator<Item = &HarvestEntry> {
        self.entries
            .iter()
            .filter(|e| e.decision.status.requires_write())
    }
}

/// Outcome of a harvest call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HarvestOutcome {
    /// The document is not newer than the last run; nothing was reconciled.
    NotModified { metadata: DocumentMetadata },
    Processed(HarvestRun),
}

/// Validate, parse and reconcile one Inventory document.
///
/// # Arguments
/// * `raw` - The document bytes, as fetched by the caller
/// * `previous` - Current records from earlier runs, by key
/// * `last_run` - Date of the last successful run, if any
/// * `config` - Parser and reconciler options
///
/// # Errors
///
/// Document-level errors (malformed XML, schema violations, missing
/// identifier) abort the call. Per-dataset problems are collected in
/// [`HarvestRun::errors`].
pub fn harvest(
    raw: &[u8],
    previous: &PreviousRecords,
    last_run: Option<NaiveDate>,
    config: &InventoryConfig,
) -> Result<HarvestOutcome> {
    let doc = InventoryDocument::parse(raw)?;
    let (metadata, datasets) = InventoryParser::new(config.parser).parse(&doc)?;

    if !document_modified_since(metadata.modified, last_run) {
        info!(
            identifier = %metadata.identifier,
            modified = ?metadata.modified,
            last_run = ?last_run,
            "Inventory not modified since last run, skipping"
        );
        return Ok(HarvestOutcome::NotModified { metadata });
    }

    let mut reconciler = Reconciler::new(&metadata, previous, config.reconcile);
    let mut entries = Vec::new();
    let mut errors = Vec::new();

    for dataset in datasets {
        let position = reconciler.position();
        match reconciler.decide(&dataset) {
            Ok(decision) => match duplicate_error(&decision, position) {
                Some(error) => {
                    errors.push(error);
                    entries.push(HarvestEntry {
                        decision,
                        dataset: None,
                    });
                }
                None => entries.push(HarvestEntry {
                    decision,
                    dataset: Some(dataset),
                }),
            },
            Err(error) => errors.push(error),
        }
    }

    let run = HarvestRun {
        metadata,
        entries,
        errors,
    };
    info!(
        identifier = %run.metadata.identifier,
        summary = %run.summary(),
        "Harvest complete"
    );
    Ok(HarvestOutcome::Processed(run))
}
