//! XML utility functions for navigating and extracting data from DOM trees.
//!
//! Lookups match on local name and accept elements either in the
//! Inventory namespace or in no namespace at all. Elements from any other
//! namespace are never matched.

use roxmltree::Node;

use crate::config::INVENTORY_NAMESPACE;

/// Get the tag name without namespace prefix.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use inventory_harvester::xml::get_tag_name;
///
/// let xml = r#"<inv:Inventory xmlns:inv="http://schemas.esd.org.uk/inventory"/>"#;
/// let doc = Document::parse(xml).unwrap();
/// assert_eq!(get_tag_name(doc.root_element()), "Inventory");
/// ```
pub fn get_tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Check if a node is an Inventory element with the given local name.
pub fn has_tag(node: Node<'_, '_>, tag: &str) -> bool {
    node.is_element()
        && get_tag_name(node) == tag
        && matches!(node.tag_name().namespace(), None | Some(INVENTORY_NAMESPACE))
}

/// Find the first child element with the given tag name.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use inventory_harvester::xml::find_child;
///
/// let xml = r#"<Inventory xmlns="http://schemas.esd.org.uk/inventory"><Identifier/></Inventory>"#;
/// let doc = Document::parse(xml).unwrap();
/// let root = doc.root_element();
///
/// assert!(find_child(root, "Identifier").is_some());
/// assert!(find_child(root, "Metadata").is_none());
/// ```
pub fn find_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| has_tag(*child, tag))
}

/// Find all child elements with the given tag name, in document order.
pub fn find_children<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |child| has_tag(*child, tag))
}

/// Find a descendant element matching a path of tag names.
///
/// # Arguments
/// * `node` - Starting node
/// * `path` - Slash-separated path of tag names (e.g., "Metadata/Title")
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use inventory_harvester::xml::{find_by_path, get_text};
///
/// let xml = r#"<Inventory><Metadata><Title>Datasets</Title></Metadata></Inventory>"#;
/// let doc = Document::parse(xml).unwrap();
///
/// let title = find_by_path(doc.root_element(), "Metadata/Title").unwrap();
/// assert_eq!(get_text(title), "Datasets");
/// ```
pub fn find_by_path<'a, 'input>(node: Node<'a, 'input>, path: &str) -> Option<Node<'a, 'input>> {
    let mut current = node;

    for part in path.split('/') {
        current = find_child(current, part)?;
    }

    Some(current)
}

/// Get the text content of a node, trimmed.
///
/// Returns an empty string when the node has no text.
pub fn get_text(node: Node<'_, '_>) -> String {
    node.text()
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Get the trimmed text of a node, or `None` when it is empty.
pub fn get_optional_text(node: Node<'_, '_>) -> Option<String> {
    Some(get_text(node)).filter(|s| !s.is_empty())
}

/// Text of the element at `path`, or an empty string when absent.
pub fn path_text(node: Node<'_, '_>, path: &str) -> String {
    find_by_path(node, path).map(get_text).unwrap_or_default()
}

/// Text of the element at `path` exactly as written, whitespace included.
///
/// Returns an empty string when the element is absent or has no text.
pub fn path_raw_text(node: Node<'_, '_>, path: &str) -> String {
    find_by_path(node, path)
        .and_then(|n| n.text())
        .unwrap_or_default()
        .to_string()
}

/// Get an attribute value from a node.
pub fn get_attribute<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute(name)
}

/// Get all element children of a node.
///
/// Excludes text nodes, comments and processing instructions.
pub fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| child.is_element())
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    #[test]
    fn test_get_tag_name_with_namespace() {
        let xml = r#"<ns:root xmlns:ns="http://example.com"><ns:child/></ns:root>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(get_tag_name(doc.root_element()), "root");
    }

    #[test]
    fn test_has_tag_namespaces() {
        let xml = r#"<Inventory xmlns="http://schemas.esd.org.uk/inventory" xmlns:o="http://other.example">
            <Identifier/>
            <o:Identifier/>
        </Inventory>"#;
        let doc = Document::parse(xml).unwrap();
        let children: Vec<_> = element_children(doc.root_element()).collect();

        assert!(has_tag(children[0], "Identifier"));
        assert!(!has_tag(children[1], "Identifier"));
    }

    #[test]
    fn test_has_tag_without_namespace() {
        let xml = r#"<Inventory><Identifier/></Inventory>"#;
        let doc = Document::parse(xml).unwrap();
        assert!(has_tag(doc.root_element(), "Inventory"));
        assert!(!has_tag(doc.root_element(), "Dataset"));
    }

    #[test]
    fn test_find_children_preserves_order() {
        let xml = r#"<Renditions><Rendition>A</Rendition><Other/><Rendition>B</Rendition><Rendition>C</Rendition></Renditions>"#;
        let doc = Document::parse(xml).unwrap();

        let texts: Vec<String> = find_children(doc.root_element(), "Rendition")
            .map(get_text)
            .collect();
        assert_eq!(texts, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_find_by_path() {
        let xml = r#"<Inventory><Metadata><Coverage><Spatial>x</Spatial></Coverage></Metadata></Inventory>"#;
        let doc = Document::parse(xml).unwrap();
        let root = doc.root_element();

        let target = find_by_path(root, "Metadata/Coverage/Spatial");
        assert_eq!(get_text(target.unwrap()), "x");
        assert!(find_by_path(root, "Metadata/Missing").is_none());
    }

    #[test]
    fn test_get_text_and_optional_text() {
        let xml = r#"<root><a>  trimmed text  </a><b>   </b><c/></root>"#;
        let doc = Document::parse(xml).unwrap();
        let root = doc.root_element();

        assert_eq!(path_text(root, "a"), "trimmed text");
        assert_eq!(get_optional_text(find_child(root, "b").unwrap()), None);
        assert_eq!(get_optional_text(find_child(root, "c").unwrap()), None);
        assert_eq!(path_text(root, "missing"), "");
    }

    #[test]
    fn test_path_raw_text_keeps_whitespace() {
        let xml = r#"<root><a> padded </a><c/></root>"#;
        let doc = Document::parse(xml).unwrap();
        let root = doc.root_element();

        assert_eq!(path_raw_text(root, "a"), " padded ");
        assert_eq!(path_raw_text(root, "c"), "");
        assert_eq!(path_raw_text(root, "missing"), "");
    }

    #[test]
    fn test_get_attribute() {
        let xml = r#"<Dataset Active="Yes"/>"#;
        let doc = Document::parse(xml).unwrap();
        let root = doc.root_element();

        assert_eq!(get_attribute(root, "Active"), Some("Yes"));
        assert_eq!(get_attribute(root, "Modified"), None);
    }

    #[test]
    fn test_element_children() {
        let xml = r#"<root>text<child1/><!-- comment -->more<child2/></root>"#;
        let doc = Document::parse(xml).unwrap();

        let children: Vec<_> = element_children(doc.root_element()).collect();
        assert_eq!(children.len(), 2);
    }
}
