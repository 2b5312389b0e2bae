//! Change detection against the records of earlier runs.
//!
//! Each dataset gets a lifecycle status:
//!
//! - `new`: no previous record has its key
//! - `changed`: the previous record has no date, or an outdated one
//! - `unchanged`: the previous record is up to date; the caller skips it
//! - `duplicate`: its key was already seen earlier in the same document
//!
//! Datasets that fail a required-field check are reported as
//! [`DatasetError`]s and the rest of the batch carries on.

use std::borrow::Borrow;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ReconcileOptions;
use crate::error::DatasetError;
use crate::key::build_key;
use crate::types::{
    DatasetRecord, DecisionStatus, DocumentMetadata, PreviousRecord, ReconciliationDecision,
};

/// The current record per key from all earlier runs.
pub type PreviousRecords = HashMap<String, PreviousRecord>;

/// Build the previous-records lookup from a flat snapshot.
///
/// The lookup holds at most one record per key. When the snapshot has
/// several for the same key, the one with the latest date wins (an
/// undated record loses to any dated one) and a warning is logged.
pub fn previous_from_records(records: impl IntoIterator<Item = PreviousRecord>) -> PreviousRecords {
    let mut previous = PreviousRecords::new();

    for record in records {
        match previous.entry(record.key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                warn!(key = %record.key, "Previous records contain the key more than once");
                if record.modified_date > slot.get().modified_date {
                    slot.insert(record);
                }
            }
        }
    }

    previous
}

/// The later of the dataset's and the document's modified dates.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use inventory_harvester::reconcile::effective_modified;
/// # use inventory_harvester::types::{DatasetRecord, DocumentMetadata};
/// # let mut dataset = DatasetRecord {
/// #     identifier: "payments".into(), title: String::new(), description: String::new(),
/// #     modified: None, active: true, rights: String::new(),
/// #     services: vec![], functions: vec![], resources: vec![],
/// # };
/// # let document = DocumentMetadata {
/// #     identifier: "http://example.gov/".into(),
/// #     modified: NaiveDate::from_ymd_opt(2013, 12, 1),
/// #     title: String::new(), publisher: String::new(), description: String::new(),
/// #     spatial_coverage_reference: None,
/// # };
///
/// // Falls back to the document date
/// assert_eq!(effective_modified(&dataset, &document), NaiveDate::from_ymd_opt(2013, 12, 1));
///
/// dataset.modified = NaiveDate::from_ymd_opt(2014, 1, 5);
/// assert_eq!(effective_modified(&dataset, &document), NaiveDate::from_ymd_opt(2014, 1, 5));
/// ```
pub fn effective_modified(dataset: &DatasetRecord, document: &DocumentMetadata) -> Option<NaiveDate> {
    // None orders before any date
    dataset.modified.max(document.modified)
}

/// Assigns statuses to datasets one at a time, in document order.
///
/// Keeps the keys seen so far, so one reconciler serves exactly one
/// document run.
#[derive(Debug)]
pub struct Reconciler<'a> {
    document: &'a DocumentMetadata,
    previous: &'a PreviousRecords,
    options: ReconcileOptions,
    seen: HashSet<String>,
    position: usize,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        document: &'a DocumentMetadata,
        previous: &'a PreviousRecords,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            document,
            previous,
            options,
            seen: HashSet::new(),
            position: 0,
        }
    }

    /// Zero-based position the next dataset will be given.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Decide the status of the next dataset.
    ///
    /// A duplicate key is not an error here: it yields a `duplicate`
    /// decision carrying only the key.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::InvalidDataset` if the dataset has no identifier.
    pub fn decide(&mut self, dataset: &DatasetRecord) -> Result<ReconciliationDecision, DatasetError> {
        let position = self.position;
        self.position += 1;

        if dataset.identifier.trim().is_empty() {
            warn!(position, "Skipping dataset without an Identifier");
            return Err(DatasetError::InvalidDataset {
                position,
                reason: "dataset has no Identifier".to_string(),
            });
        }

        let key = build_key(&self.document.identifier, &dataset.identifier);
        if !self.seen.insert(key.clone()) {
            warn!(%key, position, "Duplicate dataset key, skipping");
            return Ok(ReconciliationDecision::duplicate(key));
        }

        let effective = effective_modified(dataset, self.document);
        let (status, carried_reference) = match self.previous.get(&key) {
            None => (DecisionStatus::New, None),
            Some(previous) => {
                let outdated = match (previous.modified_date, effective) {
                    (None, _) => true,
                    (Some(stored), Some(current)) => {
                        self.options.change_policy.is_outdated(stored, current)
                    }
                    (Some(_), None) => false,
                };
                let status = if outdated {
                    DecisionStatus::Changed
                } else {
                    DecisionStatus::Unchanged
                };
                (status, previous.external_reference.clone())
            }
        };

        debug!(%key, status = status.as_str(), ?effective, "Reconciled dataset");
        Ok(ReconciliationDecision {
            key,
            status,
            carried_reference,
            effective_modified: effective,
        })
    }
}

/// Decisions for a whole document plus the datasets that were rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub decisions: Vec<ReconciliationDecision>,
    /// Rejected datasets, including duplicates.
    pub errors: Vec<DatasetError>,
}

/// Decision counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub new: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub duplicate: usize,
    pub invalid: usize,
}

impl std::fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} new, {} changed, {} unchanged, {} duplicate, {} invalid",
            self.new, self.changed, self.unchanged, self.duplicate, self.invalid
        )
    }
}

impl ReconcileSummary {
    pub(crate) fn tally<'a>(
        decisions: impl IntoIterator<Item = &'a ReconciliationDecision>,
        errors: &[DatasetError],
    ) -> Self {
        let mut summary = Self::default();
        for decision in decisions {
            match decision.status {
                DecisionStatus::New => summary.new += 1,
                DecisionStatus::Changed => summary.changed += 1,
                DecisionStatus::Unchanged => summary.unchanged += 1,
                DecisionStatus::Duplicate => summary.duplicate += 1,
            }
        }
        summary.invalid = errors
            .iter()
            .filter(|e| matches!(e, DatasetError::InvalidDataset { .. }))
            .count();
        summary
    }
}

/// The error reported alongside a `duplicate` decision, if it is one.
pub(crate) fn duplicate_error(
    decision: &ReconciliationDecision,
    position: usize,
) -> Option<DatasetError> {
    (decision.status == DecisionStatus::Duplicate).then(|| DatasetError::DuplicateKey {
        key: decision.key.clone(),
        position,
    })
}

impl ReconcileReport {
    /// Record the outcome for the dataset at `position`.
    pub fn push(&mut self, position: usize, outcome: Result<ReconciliationDecision, DatasetError>) {
        match outcome {
            Ok(decision) => {
                self.errors.extend(duplicate_error(&decision, position));
                self.decisions.push(decision);
            }
            Err(error) => self.errors.push(error),
        }
    }

    pub fn summary(&self) -> ReconcileSummary {
        ReconcileSummary::tally(&self.decisions, &self.errors)
    }
}

/// Reconcile every dataset of one document against the previous records.
///
/// Accepts owned records (such as the parser's lazy sequence) or borrowed
/// ones. Never fails as a whole: rejected datasets end up in
/// [`ReconcileReport::errors`].
pub fn reconcile<I>(
    metadata: &DocumentMetadata,
    datasets: I,
    previous: &PreviousRecords,
    options: ReconcileOptions,
) -> ReconcileReport
where
    I: IntoIterator,
    I::Item: Borrow<DatasetRecord>,
{
    let mut reconciler = Reconciler::new(metadata, previous, options);
    let mut report = ReconcileReport::default();

    for dataset in datasets {
        let position = reconciler.position();
        let outcome = reconciler.decide(dataset.borrow());
        report.push(position, outcome);
    }

    info!(identifier = %metadata.identifier, summary = %report.summary(), "Reconciliation complete");
    report
}
