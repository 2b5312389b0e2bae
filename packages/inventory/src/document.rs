//! Validated Inventory documents.
//!
//! An [`InventoryDocument`] can only be obtained through validation, so
//! the parser never sees a tree that failed the schema.

use roxmltree::{Document, Node};
use tracing::debug;

use crate::error::{InventoryError, Result};
use crate::schema::{inventory_schema, Schema};

/// A well-formed, schema-valid Inventory document.
///
/// Borrows the caller's bytes; the tree is released when this is dropped.
#[derive(Debug)]
pub struct InventoryDocument<'input> {
    tree: Document<'input>,
}

impl<'input> InventoryDocument<'input> {
    /// Parse and validate raw bytes against the bundled Inventory schema.
    ///
    /// # Errors
    ///
    /// - `MalformedDocument` if the bytes are not UTF-8 or not well-formed XML
    /// - `SchemaViolation` if the XML does not conform to the schema
    /// - `Configuration` if the bundled schema cannot be loaded
    ///
    /// # Examples
    /// ```
    /// use inventory_harvester::document::InventoryDocument;
    /// use inventory_harvester::error::InventoryError;
    ///
    /// let err = InventoryDocument::parse(b"<tag></wrongtag>").unwrap_err();
    /// assert!(matches!(err, InventoryError::MalformedDocument(_)));
    /// ```
    pub fn parse(raw: &'input [u8]) -> Result<Self> {
        let schema = inventory_schema()?;
        Self::parse_with_schema(raw, schema)
    }

    /// Parse and validate raw bytes against the given schema.
    ///
    /// # Errors
    ///
    /// Same as [`InventoryDocument::parse`], minus schema loading.
    pub fn parse_with_schema(raw: &'input [u8], schema: &Schema) -> Result<Self> {
        let text = std::str::from_utf8(raw).map_err(|e| {
            InventoryError::MalformedDocument(format!("document is not valid UTF-8: {e}"))
        })?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let tree = Document::parse(text)?;
        schema.validate(&tree)?;

        debug!(
            root = tree.root_element().tag_name().name(),
            bytes = raw.len(),
            "Inventory document validated"
        );
        Ok(Self { tree })
    }

    /// The `<Inventory>` root element.
    pub fn root(&self) -> Node<'_, 'input> {
        self.tree.root_element()
    }

    /// The underlying parsed tree.
    pub fn tree(&self) -> &Document<'input> {
        &self.tree
    }
}
