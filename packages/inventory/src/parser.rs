//! Extraction of metadata and dataset records from a validated document.
//!
//! Metadata is read eagerly. Datasets are produced lazily, one `<Dataset>`
//! node at a time, so a consumer that reconciles as it goes only ever
//! holds one dataset and its resources in memory.

use std::iter::FusedIterator;

use chrono::NaiveDate;
use roxmltree::Node;
use tracing::{debug, warn};

use crate::config::{normalize_rights, ParserOptions, SubjectCardinality, ACTIVE_LITERALS};
use crate::document::InventoryDocument;
use crate::error::{InventoryError, Result};
use crate::schema::parse_xs_date;
use crate::text::decode_html_entities;
use crate::types::{DatasetRecord, DocumentMetadata, ResourceRecord, ResourceType};
use crate::xml::{
    find_by_path, find_child, find_children, get_attribute, get_optional_text, has_tag, path_raw_text,
    path_text,
};

/// Parses validated Inventory documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryParser {
    options: ParserOptions,
}

impl InventoryParser {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    /// Extract the document metadata and a lazy sequence of datasets.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::MalformedDocument` if the top-level
    /// `Identifier` is absent or empty.
    ///
    /// # Examples
    /// ```
    /// use inventory_harvester::document::InventoryDocument;
    /// use inventory_harvester::parser::InventoryParser;
    ///
    /// let raw = br#"<Inventory xmlns="http://schemas.esd.org.uk/inventory" Modified="2013-12-01">
    ///   <Identifier>http://example.gov/</Identifier>
    ///   <Datasets>
    ///     <Dataset Active="Yes"><Identifier>payments</Identifier><Title>Payments</Title></Dataset>
    ///   </Datasets>
    /// </Inventory>"#;
    ///
    /// let doc = InventoryDocument::parse(raw).unwrap();
    /// let (metadata, datasets) = InventoryParser::default().parse(&doc).unwrap();
    /// assert_eq!(metadata.identifier, "http://example.gov/");
    ///
    /// let datasets = datasets.collect_all();
    /// assert_eq!(datasets.len(), 1);
    /// assert!(datasets[0].active);
    /// ```
    pub fn parse<'a, 'input>(
        &self,
        doc: &'a InventoryDocument<'input>,
    ) -> Result<(DocumentMetadata, Datasets<'a, 'input>)> {
        let root = doc.root();
        let metadata = extract_metadata(root)?;

        let first = find_child(root, "Datasets").and_then(|d| d.first_element_child());
        debug!(identifier = %metadata.identifier, "Extracted document metadata");

        Ok((
            metadata,
            Datasets {
                next: first,
                options: self.options,
            },
        ))
    }
}

/// Single-pass sequence of datasets, in document order.
///
/// Each record is built when the iterator advances. The sequence cannot
/// be restarted; use [`Datasets::collect_all`] when more than one pass is
/// needed.
#[derive(Debug)]
pub struct Datasets<'a, 'input> {
    next: Option<Node<'a, 'input>>,
    options: ParserOptions,
}

impl Datasets<'_, '_> {
    /// Materialize the remaining datasets.
    pub fn collect_all(self) -> Vec<DatasetRecord> {
        self.collect()
    }
}

impl Iterator for Datasets<'_, '_> {
    type Item = DatasetRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = self.next.take()?;
            self.next = node.next_sibling_element();
            if has_tag(node, "Dataset") {
                return Some(extract_dataset(node, &self.options));
            }
        }
    }
}

impl FusedIterator for Datasets<'_, '_> {}

fn extract_metadata(root: Node<'_, '_>) -> Result<DocumentMetadata> {
    let identifier = path_text(root, "Identifier");
    if identifier.is_empty() {
        return Err(InventoryError::MalformedDocument(
            "document has no Identifier".to_string(),
        ));
    }

    Ok(DocumentMetadata {
        modified: parse_modified(root, "document", &identifier),
        title: path_text(root, "Metadata/Title"),
        publisher: path_text(root, "Metadata/Publisher"),
        description: path_text(root, "Metadata/Description"),
        spatial_coverage_reference: find_by_path(root, "Metadata/Coverage/Spatial")
            .and_then(get_optional_text),
        identifier,
    })
}

/// Parse the `Modified` attribute of a node, if present and valid.
fn parse_modified(node: Node<'_, '_>, what: &str, identifier: &str) -> Option<NaiveDate> {
    let raw = get_attribute(node, "Modified")?;
    if raw.trim().is_empty() {
        return None;
    }
    let date = parse_xs_date(raw);
    if date.is_none() {
        warn!(%identifier, value = raw, kind = what, "Ignoring unparseable Modified date");
    }
    date
}

fn is_truthy(value: &str) -> bool {
    ACTIVE_LITERALS.contains(&value)
}

fn extract_dataset(node: Node<'_, '_>, options: &ParserOptions) -> DatasetRecord {
    // Keys are built from the identifier verbatim
    let identifier = path_raw_text(node, "Identifier");
    let description = path_text(node, "Description");

    let record = DatasetRecord {
        title: path_text(node, "Title"),
        description: decode_html_entities(&description).into_owned(),
        modified: parse_modified(node, "dataset", &identifier),
        active: get_attribute(node, "Active").is_some_and(is_truthy),
        rights: normalize_rights(&path_text(node, "Rights")),
        services: subjects(node, "Service", options.subjects),
        functions: subjects(node, "Function", options.subjects),
        resources: find_children(node, "Resources")
            .flat_map(|resources| find_children(resources, "Resource"))
            .flat_map(|resource| flatten_resource(resource, options))
            .collect(),
        identifier,
    };

    debug!(
        identifier = %record.identifier,
        resources = record.resources.len(),
        "Parsed dataset"
    );
    record
}

/// Non-empty `Subjects/Subject/{tag}` values in document order.
///
/// In `First` mode only the first node is read, so an empty first value
/// yields an empty list.
fn subjects(node: Node<'_, '_>, tag: &str, cardinality: SubjectCardinality) -> Vec<String> {
    let nodes = find_children(node, "Subjects")
        .flat_map(|subjects| find_children(subjects, "Subject"))
        .flat_map(|subject| subject.children().filter(|c| has_tag(*c, tag)));

    match cardinality {
        SubjectCardinality::First => nodes.take(1).filter_map(get_optional_text).collect(),
        SubjectCardinality::All => nodes.filter_map(get_optional_text).collect(),
    }
}

/// One record per `<Rendition>`, in document order.
fn flatten_resource(resource: Node<'_, '_>, options: &ParserOptions) -> Vec<ResourceRecord> {
    let resource_type = ResourceType::from_type_attribute(get_attribute(resource, "Type"));

    find_children(resource, "Renditions")
        .flat_map(|renditions| find_children(renditions, "Rendition"))
        .map(|rendition| ResourceRecord {
            resource_type,
            url: path_text(rendition, "Identifier"),
            active: match get_attribute(rendition, "Active") {
                None | Some("") => options.resource_active_default,
                Some(value) => is_truthy(value),
            },
            title: path_text(rendition, "Title"),
            description: path_text(rendition, "Description"),
            mimetype: path_text(rendition, "MimeType"),
        })
        .collect()
}
