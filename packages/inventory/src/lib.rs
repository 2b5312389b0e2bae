//! Inventory Harvester - Ingest local authority Inventory XML documents.
//!
//! This crate validates Inventory documents against the bundled schema,
//! extracts their metadata and dataset records, and reconciles those
//! records against earlier runs to decide what is new, changed or
//! unchanged.
//!
//! # Example
//!
//! ```
//! use inventory_harvester::{harvest, HarvestOutcome, InventoryConfig, PreviousRecords};
//! use inventory_harvester::types::DecisionStatus;
//!
//! let raw = br#"<Inventory xmlns="http://schemas.esd.org.uk/inventory" Modified="2013-12-01">
//!   <Identifier>http://example.gov/</Identifier>
//!   <Datasets>
//!     <Dataset Active="Yes"><Identifier>payments</Identifier><Title>Payments</Title></Dataset>
//!   </Datasets>
//! </Inventory>"#;
//!
//! let outcome = harvest(raw, &PreviousRecords::new(), None, &InventoryConfig::default()).unwrap();
//! let HarvestOutcome::Processed(run) = outcome else { panic!("document was not processed") };
//! assert_eq!(run.entries[0].decision.key, "http://example.gov//payments");
//! assert_eq!(run.entries[0].decision.status, DecisionStatus::New);
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Constants, policies and environment configuration
//! - [`types`]: Core data types (metadata, datasets, resources, decisions)
//! - [`error`]: Error types and Result alias
//! - [`schema`]: XSD compilation and validation
//! - [`document`]: Validated document wrapper
//! - [`xml`]: XML utilities
//! - [`text`]: HTML entity decoding
//! - [`parser`]: Metadata and lazy dataset extraction
//! - [`key`]: Stable dataset keys
//! - [`reconcile`]: Change detection against previous records
//! - [`harvester`]: Run orchestration
//! - [`http`]: HTTP client for fetching documents
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod harvester;
pub mod http;
pub mod key;
pub mod parser;
pub mod reconcile;
pub mod schema;
pub mod text;
pub mod types;
pub mod xml;

// Re-export main functions
pub use harvester::{harvest, HarvestOutcome, HarvestRun};

// Re-export commonly used items
pub use config::{validate_date, InventoryConfig};
pub use document::InventoryDocument;
pub use error::{DatasetError, InventoryError, Result};
pub use key::build_key;
pub use parser::{Datasets, InventoryParser};
pub use reconcile::{reconcile, PreviousRecords, ReconcileReport, Reconciler};
pub use types::{DatasetRecord, DocumentMetadata, PreviousRecord, ReconciliationDecision, ResourceRecord};
