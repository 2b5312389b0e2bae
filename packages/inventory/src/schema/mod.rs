//! XML Schema validation for Inventory documents.
//!
//! The Inventory schema is bundled with the crate and compiled once on
//! first use. Only the subset of XML Schema that the Inventory schema
//! needs is supported; anything else is rejected at compile time rather
//! than silently ignored.

mod builtins;
mod compile;
mod model;
mod validate;

use std::sync::LazyLock;

use roxmltree::Document;

use crate::error::{InventoryError, Result};
use model::{ComplexType, ElementDecl, SimpleType};

pub use builtins::parse_xs_date;
pub use compile::XSD_NAMESPACE;

/// The bundled Inventory schema source.
pub static INVENTORY_XSD: &str = include_str!("../../data/inventory.xsd");

static INVENTORY_SCHEMA: LazyLock<std::result::Result<Schema, String>> =
    LazyLock::new(|| Schema::from_xsd(INVENTORY_XSD).map_err(|e| e.to_string()));

/// A compiled schema, ready to validate documents.
#[derive(Debug)]
pub struct Schema {
    pub(crate) target_namespace: Option<String>,
    pub(crate) elements: Vec<ElementDecl>,
    pub(crate) complex_types: Vec<ComplexType>,
    pub(crate) simple_types: Vec<SimpleType>,
}

impl Schema {
    /// Compile a schema from XSD source text.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Configuration` if the source is not a
    /// schema document or uses constructs the validator does not support.
    pub fn from_xsd(xsd: &str) -> Result<Self> {
        compile::compile(xsd)
    }

    /// Namespace the schema's global elements belong to.
    pub fn target_namespace(&self) -> Option<&str> {
        self.target_namespace.as_deref()
    }

    /// Validate a parsed document.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::SchemaViolation` carrying every violation
    /// found (up to a cap), each prefixed with the path of the offending
    /// element.
    pub fn validate(&self, doc: &Document<'_>) -> Result<()> {
        let errors = validate::validate_document(self, doc);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(InventoryError::SchemaViolation { errors })
        }
    }
}

/// The bundled Inventory schema, compiled on first use.
///
/// # Errors
///
/// Returns `InventoryError::Configuration` if the bundled schema cannot be
/// compiled. This is a build defect, not a property of any document.
pub fn inventory_schema() -> Result<&'static Schema> {
    INVENTORY_SCHEMA
        .as_ref()
        .map_err(|e| InventoryError::Configuration(format!("bundled inventory schema: {e}")))
}
