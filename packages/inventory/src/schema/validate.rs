//! Validation of parsed documents against a compiled [`Schema`].

use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};

use roxmltree::{Document, Node};

use super::builtins::check_simple_value;
use super::model::{AttributeDecl, Content, ElementDecl, GroupKind, Occurs, Particle, SimpleTypeId, TypeRef};
use super::Schema;
use crate::xml::element_children;

/// Namespace of `xsi:` attributes, which are always allowed.
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Namespace of `xml:` attributes (`xml:lang`, `xml:space`), which are always allowed.
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Stop collecting after this many violations.
const MAX_REPORTED_ERRORS: usize = 50;

/// Collect all schema violations in `doc`. An empty result means valid.
pub(super) fn validate_document(schema: &Schema, doc: &Document<'_>) -> Vec<String> {
    let mut validation = Validation {
        schema,
        errors: Vec::new(),
        suppressed: 0,
    };

    let root = doc.root_element();
    let tag = root.tag_name();
    let path = format!("/{}", tag.name());

    match schema
        .elements
        .iter()
        .find(|decl| decl.name.matches(tag.namespace(), tag.name()))
    {
        Some(decl) => validation.element(root, decl.type_ref, &path),
        None => validation.report(
            &path,
            format!(
                "root element <{}>{} is not declared by the schema",
                tag.name(),
                tag.namespace()
                    .map(|ns| format!(" in namespace '{ns}'"))
                    .unwrap_or_default()
            ),
        ),
    }

    if validation.suppressed > 0 {
        validation
            .errors
            .push(format!("... and {} more violations", validation.suppressed));
    }
    validation.errors
}

struct Validation<'s> {
    schema: &'s Schema,
    errors: Vec<String>,
    suppressed: usize,
}

impl Validation<'_> {
    fn report(&mut self, path: &str, message: String) {
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(format!("{path}: {message}"));
        } else {
            self.suppressed += 1;
        }
    }

    fn element(&mut self, node: Node<'_, '_>, type_ref: TypeRef, path: &str) {
        match type_ref {
            TypeRef::Simple(id) => {
                self.attributes(node, &[], path);
                self.simple_content(node, id, path);
            }
            TypeRef::Complex(id) => {
                let schema = self.schema;
                let complex = &schema.complex_types[id];
                self.attributes(node, &complex.attributes, path);
                match &complex.content {
                    Content::Empty => {
                        if let Some(child) = element_children(node).next() {
                            self.report(
                                path,
                                format!("element <{}> is not allowed here", child.tag_name().name()),
                            );
                        }
                        self.no_text(node, path);
                    }
                    Content::Simple(simple) => self.simple_content(node, *simple, path),
                    Content::Elements(particle) => {
                        self.no_text(node, path);
                        self.element_content(node, particle, path);
                    }
                }
            }
        }
    }

    fn attributes(
        &mut self,
        node: Node<'_, '_>,
        declared: &[AttributeDecl],
        path: &str,
    ) {
        let schema = self.schema;
        for decl in declared {
            let value = node
                .attributes()
                .find(|a| decl.name.matches(a.namespace(), a.name()))
                .map(|a| a.value());

            match value {
                Some(value) => {
                    let simple = &schema.simple_types[decl.type_id];
                    if let Err(message) = check_simple_value(simple, value) {
                        self.report(path, format!("attribute '{}': {message}", decl.name));
                    }
                }
                None if decl.required => {
                    self.report(path, format!("missing required attribute '{}'", decl.name));
                }
                None => {}
            }
        }

        for attr in node.attributes() {
            if matches!(attr.namespace(), Some(XSI_NAMESPACE | XML_NAMESPACE)) {
                continue;
            }
            if !declared
                .iter()
                .any(|d| d.name.matches(attr.namespace(), attr.name()))
            {
                self.report(path, format!("attribute '{}' is not allowed", attr.name()));
            }
        }
    }

    fn no_text(&mut self, node: Node<'_, '_>, path: &str) {
        let has_text = node
            .children()
            .filter(|c| c.is_text())
            .filter_map(|c| c.text())
            .any(|t| !t.trim().is_empty());
        if has_text {
            self.report(path, "text content is not allowed".to_string());
        }
    }

    fn simple_content(&mut self, node: Node<'_, '_>, id: SimpleTypeId, path: &str) {
        if let Some(child) = element_children(node).next() {
            self.report(
                path,
                format!(
                    "element <{}> is not allowed in text-only content",
                    child.tag_name().name()
                ),
            );
            return;
        }

        let text: String = node
            .children()
            .filter(|c| c.is_text())
            .filter_map(|c| c.text())
            .collect();
        let schema = self.schema;
        if let Err(message) = check_simple_value(&schema.simple_types[id], &text) {
            self.report(path, message);
        }
    }

    fn element_content(&mut self, node: Node<'_, '_>, particle: &Particle, path: &str) {
        let children: Vec<Node<'_, '_>> = element_children(node).collect();
        let matcher = Matcher {
            children: &children,
            furthest: Cell::new(0),
        };

        let ends = matcher.particle(particle, &BTreeSet::from([0]));
        if !ends.contains(&children.len()) {
            let furthest = matcher.furthest.get();
            let message = if let Some(unexpected) = children.get(furthest) {
                format!("unexpected element <{}>", unexpected.tag_name().name())
            } else {
                let missing: Vec<String> = particle
                    .required_names()
                    .into_iter()
                    .filter(|name| {
                        !children
                            .iter()
                            .any(|c| name.matches(c.tag_name().namespace(), c.tag_name().name()))
                    })
                    .map(|name| format!("<{name}>"))
                    .collect();
                if missing.is_empty() {
                    "content is incomplete".to_string()
                } else {
                    format!("missing required element {}", missing.join(", "))
                }
            };
            self.report(path, message);
        }

        let mut totals: HashMap<&str, usize> = HashMap::new();
        for child in &children {
            *totals.entry(child.tag_name().name()).or_default() += 1;
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        for child in &children {
            let tag = child.tag_name();
            let index = seen.entry(tag.name()).or_default();
            *index += 1;

            let child_path = if totals.get(tag.name()).copied().unwrap_or(0) > 1 {
                format!("{path}/{}[{index}]", tag.name())
            } else {
                format!("{path}/{}", tag.name())
            };

            if let Some(ElementDecl { type_ref, .. }) = particle.find_decl(tag.namespace(), tag.name())
            {
                self.element(*child, *type_ref, &child_path);
            }
        }
    }
}

/// Matches a sequence of sibling elements against a content model.
///
/// Works on sets of positions so that optional and repeated particles
/// need no backtracking.
struct Matcher<'c, 'a, 'input> {
    children: &'c [Node<'a, 'input>],
    furthest: Cell<usize>,
}

impl Matcher<'_, '_, '_> {
    fn particle(&self, particle: &Particle, starts: &BTreeSet<usize>) -> BTreeSet<usize> {
        self.repeat(particle.occurs(), starts, |current| match particle {
            Particle::Element { decl, .. } => self.element_once(decl, current),
            Particle::Group {
                kind, particles, ..
            } => self.group_once(*kind, particles, current),
        })
    }

    fn repeat(
        &self,
        occurs: Occurs,
        starts: &BTreeSet<usize>,
        once: impl Fn(&BTreeSet<usize>) -> BTreeSet<usize>,
    ) -> BTreeSet<usize> {
        let mut reached = BTreeSet::new();
        let mut current = starts.clone();
        let mut count = 0u32;

        loop {
            if count >= occurs.min {
                let before = reached.len();
                reached.extend(current.iter().copied());
                // Positions already reached at an earlier count lead nowhere new
                if count > occurs.min && reached.len() == before {
                    break;
                }
            }
            if current.is_empty() || !occurs.can_repeat(count) {
                break;
            }
            current = once(&current);
            count += 1;
        }

        reached
    }

    fn element_once(&self, decl: &ElementDecl, starts: &BTreeSet<usize>) -> BTreeSet<usize> {
        starts
            .iter()
            .filter(|&&pos| {
                self.children.get(pos).is_some_and(|child| {
                    decl.name
                        .matches(child.tag_name().namespace(), child.tag_name().name())
                })
            })
            .map(|&pos| {
                self.furthest.set(self.furthest.get().max(pos + 1));
                pos + 1
            })
            .collect()
    }

    fn group_once(
        &self,
        kind: GroupKind,
        particles: &[Particle],
        starts: &BTreeSet<usize>,
    ) -> BTreeSet<usize> {
        match kind {
            GroupKind::Sequence => particles
                .iter()
                .fold(starts.clone(), |current, p| self.particle(p, &current)),
            GroupKind::Choice => particles
                .iter()
                .flat_map(|p| self.particle(p, starts))
                .collect(),
            GroupKind::All => starts
                .iter()
                .filter_map(|&start| self.all_once(particles, start))
                .collect(),
        }
    }

    /// Members of an `all` group match in any order, each at most once.
    fn all_once(&self, particles: &[Particle], start: usize) -> Option<usize> {
        let mut used = vec![false; particles.len()];
        let mut pos = start;

        while let Some(child) = self.children.get(pos) {
            let tag = child.tag_name();
            let member = particles.iter().enumerate().position(|(i, p)| {
                !used[i]
                    && matches!(p, Particle::Element { decl, .. }
                        if decl.name.matches(tag.namespace(), tag.name()))
            });
            match member {
                Some(i) => {
                    used[i] = true;
                    pos += 1;
                    self.furthest.set(self.furthest.get().max(pos));
                }
                None => break,
            }
        }

        particles
            .iter()
            .zip(&used)
            .all(|(p, used)| *used || p.occurs().min == 0)
            .then_some(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(body: &str) -> Schema {
        Schema::from_xsd(&format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                xmlns:t="urn:test" targetNamespace="urn:test"
                elementFormDefault="qualified">{body}</xs:schema>"#
        ))
        .unwrap()
    }

    fn errors(schema: &Schema, xml: &str) -> Vec<String> {
        let doc = Document::parse(xml).unwrap();
        validate_document(schema, &doc)
    }

    fn sequence_schema() -> Schema {
        schema(
            r#"<xs:element name="Root">
                 <xs:complexType>
                   <xs:sequence>
                     <xs:element name="Id" type="xs:string"/>
                     <xs:element name="Item" type="xs:integer" minOccurs="0" maxOccurs="unbounded"/>
                     <xs:element name="Tail" type="xs:string" minOccurs="0"/>
                   </xs:sequence>
                   <xs:attribute name="Modified" type="xs:date"/>
                   <xs:attribute name="Kind" type="xs:string" use="required"/>
                 </xs:complexType>
               </xs:element>"#,
        )
    }

    #[test]
    fn test_valid_sequence() {
        let s = sequence_schema();
        let xml = r#"<Root xmlns="urn:test" Kind="k" Modified="2013-12-01">
            <Id>a</Id><Item>1</Item><Item>2</Item><Tail/>
        </Root>"#;
        assert!(errors(&s, xml).is_empty());
    }

    #[test]
    fn test_missing_required_element() {
        let s = sequence_schema();
        let errs = errors(&s, r#"<Root xmlns="urn:test" Kind="k"/>"#);
        assert_eq!(errs, vec!["/Root: missing required element <Id>"]);
    }

    #[test]
    fn test_unexpected_element() {
        let s = sequence_schema();
        let errs = errors(
            &s,
            r#"<Root xmlns="urn:test" Kind="k"><Id>a</Id><Bogus/><Item>1</Item></Root>"#,
        );
        assert_eq!(errs, vec!["/Root: unexpected element <Bogus>"]);
    }

    #[test]
    fn test_out_of_order_elements() {
        let s = sequence_schema();
        let errs = errors(
            &s,
            r#"<Root xmlns="urn:test" Kind="k"><Id>a</Id><Tail/><Item>1</Item></Root>"#,
        );
        assert_eq!(errs, vec!["/Root: unexpected element <Item>"]);
    }

    #[test]
    fn test_wrong_namespace_is_rejected() {
        let s = sequence_schema();
        let errs = errors(&s, r#"<Root Kind="k"><Id>a</Id></Root>"#);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].contains("is not declared by the schema"));
    }

    #[test]
    fn test_attribute_violations() {
        let s = sequence_schema();
        let errs = errors(
            &s,
            r#"<Root xmlns="urn:test" Modified="01/12/2013" Extra="x"><Id>a</Id></Root>"#,
        );
        assert_eq!(errs.len(), 3);
        assert!(errs.iter().any(|e| e.contains("attribute 'Modified'")));
        assert!(errs.iter().any(|e| e.contains("missing required attribute 'Kind'")));
        assert!(errs.iter().any(|e| e.contains("attribute 'Extra' is not allowed")));
    }

    #[test]
    fn test_xsi_attributes_are_allowed() {
        let s = sequence_schema();
        let xml = r#"<Root xmlns="urn:test" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
            xsi:schemaLocation="urn:test inventory.xsd" Kind="k"><Id>a</Id></Root>"#;
        assert!(errors(&s, xml).is_empty());
    }

    #[test]
    fn test_simple_value_paths_are_indexed() {
        let s = sequence_schema();
        let errs = errors(
            &s,
            r#"<Root xmlns="urn:test" Kind="k"><Id>a</Id><Item>1</Item><Item>x</Item></Root>"#,
        );
        assert_eq!(errs, vec!["/Root/Item[2]: 'x' is not a valid xs:integer"]);
    }

    #[test]
    fn test_text_in_element_only_content() {
        let s = sequence_schema();
        let errs = errors(&s, r#"<Root xmlns="urn:test" Kind="k">stray<Id>a</Id></Root>"#);
        assert_eq!(errs, vec!["/Root: text content is not allowed"]);
    }

    #[test]
    fn test_child_in_simple_content() {
        let s = sequence_schema();
        let errs = errors(&s, r#"<Root xmlns="urn:test" Kind="k"><Id><b>a</b></Id></Root>"#);
        assert_eq!(errs, vec!["/Root/Id: element <b> is not allowed in text-only content"]);
    }

    #[test]
    fn test_choice_repetition() {
        let s = schema(
            r#"<xs:element name="Subject">
                 <xs:complexType>
                   <xs:choice minOccurs="0" maxOccurs="unbounded">
                     <xs:element name="Service" type="xs:string"/>
                     <xs:element name="Function" type="xs:string"/>
                   </xs:choice>
                 </xs:complexType>
               </xs:element>"#,
        );
        assert!(errors(&s, r#"<Subject xmlns="urn:test"/>"#).is_empty());
        assert!(errors(
            &s,
            r#"<Subject xmlns="urn:test"><Function/><Service/><Service/></Subject>"#
        )
        .is_empty());
        assert_eq!(
            errors(&s, r#"<Subject xmlns="urn:test"><Service/><Keyword/></Subject>"#),
            vec!["/Subject: unexpected element <Keyword>"]
        );
    }

    #[test]
    fn test_all_group_any_order() {
        let s = schema(
            r#"<xs:element name="Metadata">
                 <xs:complexType>
                   <xs:all>
                     <xs:element name="Title" type="xs:string"/>
                     <xs:element name="Publisher" type="xs:string" minOccurs="0"/>
                   </xs:all>
                 </xs:complexType>
               </xs:element>"#,
        );
        assert!(errors(&s, r#"<Metadata xmlns="urn:test"><Publisher/><Title/></Metadata>"#).is_empty());
        assert!(errors(&s, r#"<Metadata xmlns="urn:test"><Title/></Metadata>"#).is_empty());
        assert_eq!(
            errors(&s, r#"<Metadata xmlns="urn:test"><Publisher/></Metadata>"#),
            vec!["/Metadata: missing required element <Title>"]
        );
        assert_eq!(
            errors(&s, r#"<Metadata xmlns="urn:test"><Title/><Title/></Metadata>"#),
            vec!["/Metadata: unexpected element <Title>"]
        );
    }

    #[test]
    fn test_bounded_repetition() {
        let s = schema(
            r#"<xs:element name="Pair">
                 <xs:complexType>
                   <xs:sequence>
                     <xs:element name="V" type="xs:string" minOccurs="2" maxOccurs="2"/>
                   </xs:sequence>
                 </xs:complexType>
               </xs:element>"#,
        );
        assert!(errors(&s, r#"<Pair xmlns="urn:test"><V/><V/></Pair>"#).is_empty());
        assert!(!errors(&s, r#"<Pair xmlns="urn:test"><V/></Pair>"#).is_empty());
        assert!(!errors(&s, r#"<Pair xmlns="urn:test"><V/><V/><V/></Pair>"#).is_empty());
    }

    #[test]
    fn test_error_count_is_capped() {
        let s = sequence_schema();
        let items: String = (0..(MAX_REPORTED_ERRORS + 10))
            .map(|_| "<Item>x</Item>")
            .collect();
        let xml = format!(r#"<Root xmlns="urn:test" Kind="k"><Id>a</Id>{items}</Root>"#);
        let errs = errors(&s, &xml);
        assert_eq!(errs.len(), MAX_REPORTED_ERRORS + 1);
        assert_eq!(errs.last().unwrap(), "... and 10 more violations");
    }
}
