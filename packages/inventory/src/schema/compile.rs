//! Compilation of XSD documents into [`Schema`] components.
//!
//! Supports the subset of XML Schema 1.0 used by Inventory schemas: global
//! and local element declarations, named and anonymous complex and simple
//! types, `sequence`/`choice`/`all` groups with occurrence bounds,
//! unqualified attributes, `simpleContent` extensions, and restriction
//! facets `enumeration`, `minLength` and `maxLength`. Anything else is
//! rejected rather than silently ignored.

use std::collections::HashMap;

use roxmltree::{Document, Node};

use super::model::{
    AttributeDecl, Builtin, ComplexType, ComplexTypeId, Content, ElementDecl, GroupKind, Occurs,
    Particle, QualifiedName, SimpleType, SimpleTypeId, TypeRef,
};
use super::Schema;
use crate::error::{InventoryError, Result};

/// Namespace of XML Schema definition documents.
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

fn config_error(message: impl Into<String>) -> InventoryError {
    InventoryError::Configuration(message.into())
}

fn is_xsd(node: Node<'_, '_>, local: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(XSD_NAMESPACE)
        && node.tag_name().name() == local
}

/// Element children of an XSD node, without annotations.
fn components<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(|c| c.is_element() && !is_xsd(*c, "annotation"))
}

fn required_attr<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str> {
    node.attribute(name).ok_or_else(|| {
        config_error(format!(
            "<xs:{}> is missing the '{name}' attribute",
            node.tag_name().name()
        ))
    })
}

fn parse_occurs(node: Node<'_, '_>) -> Result<Occurs> {
    let min = match node.attribute("minOccurs") {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| config_error(format!("invalid minOccurs '{v}'")))?,
        None => Occurs::ONCE.min,
    };
    let max = match node.attribute("maxOccurs").map(str::trim) {
        Some("unbounded") => None,
        Some(v) => Some(
            v.parse()
                .map_err(|_| config_error(format!("invalid maxOccurs '{v}'")))?,
        ),
        None => Occurs::ONCE.max,
    };

    let occurs = Occurs { min, max };
    if !occurs.allows(min) {
        return Err(config_error(format!(
            "maxOccurs is smaller than minOccurs ({min}) on <xs:{}>",
            node.tag_name().name()
        )));
    }

    Ok(occurs)
}

/// Compile an XSD document.
pub(super) fn compile(xsd: &str) -> Result<Schema> {
    let doc = Document::parse(xsd).map_err(|e| config_error(format!("schema is not XML: {e}")))?;
    let root = doc.root_element();
    if !is_xsd(root, "schema") {
        return Err(config_error("root element is not <xs:schema>"));
    }

    let mut compiler = Compiler::new(root)?;

    let mut elements = Vec::new();
    for (name, node) in compiler.global_elements.clone() {
        // Global elements are always in the target namespace
        elements.push(ElementDecl {
            name: QualifiedName::new(compiler.target_namespace, name),
            type_ref: compiler.element_type(node)?,
        });
    }
    if elements.is_empty() {
        return Err(config_error("schema declares no global elements"));
    }

    Ok(Schema {
        target_namespace: compiler.target_namespace.map(str::to_string),
        elements,
        complex_types: compiler.complex_types,
        simple_types: compiler.simple_types,
    })
}

struct Compiler<'a, 'input> {
    target_namespace: Option<&'a str>,
    qualified_elements: bool,
    global_elements: Vec<(&'a str, Node<'a, 'input>)>,
    named_complex: HashMap<&'a str, Node<'a, 'input>>,
    named_simple: HashMap<&'a str, Node<'a, 'input>>,
    complex_ids: HashMap<&'a str, ComplexTypeId>,
    simple_ids: HashMap<&'a str, SimpleTypeId>,
    builtin_ids: HashMap<Builtin, SimpleTypeId>,
    complex_types: Vec<ComplexType>,
    simple_types: Vec<SimpleType>,
}

impl<'a, 'input> Compiler<'a, 'input> {
    fn new(root: Node<'a, 'input>) -> Result<Self> {
        if root.attribute("attributeFormDefault") == Some("qualified") {
            return Err(config_error("qualified attributes are not supported"));
        }

        let mut compiler = Self {
            target_namespace: root.attribute("targetNamespace"),
            qualified_elements: root.attribute("elementFormDefault") == Some("qualified"),
            global_elements: Vec::new(),
            named_complex: HashMap::new(),
            named_simple: HashMap::new(),
            complex_ids: HashMap::new(),
            simple_ids: HashMap::new(),
            builtin_ids: HashMap::new(),
            complex_types: Vec::new(),
            simple_types: Vec::new(),
        };

        for child in components(root) {
            match child.tag_name().name() {
                "element" => compiler
                    .global_elements
                    .push((required_attr(child, "name")?, child)),
                "complexType" => {
                    compiler
                        .named_complex
                        .insert(required_attr(child, "name")?, child);
                }
                "simpleType" => {
                    compiler
                        .named_simple
                        .insert(required_attr(child, "name")?, child);
                }
                other => {
                    return Err(config_error(format!(
                        "unsupported top-level schema component <xs:{other}>"
                    )))
                }
            }
        }

        Ok(compiler)
    }

    /// Resolve a `prefix:local` reference to its namespace and local name.
    fn resolve_qname(node: Node<'a, 'input>, qname: &'a str) -> Result<(Option<&'a str>, &'a str)> {
        let (prefix, local) = match qname.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, qname),
        };
        let namespace = node.lookup_namespace_uri(prefix);
        if prefix.is_some() && namespace.is_none() {
            return Err(config_error(format!("undeclared namespace prefix in '{qname}'")));
        }
        Ok((namespace, local))
    }

    fn builtin_id(&mut self, builtin: Builtin) -> SimpleTypeId {
        if let Some(id) = self.builtin_ids.get(&builtin) {
            return *id;
        }
        let id = self.simple_types.len();
        self.simple_types.push(SimpleType::builtin(builtin));
        self.builtin_ids.insert(builtin, id);
        id
    }

    fn resolve_type(&mut self, node: Node<'a, 'input>, qname: &'a str) -> Result<TypeRef> {
        let (namespace, local) = Self::resolve_qname(node, qname)?;

        if namespace == Some(XSD_NAMESPACE) {
            let builtin = Builtin::from_local_name(local)
                .ok_or_else(|| config_error(format!("unsupported built-in type '{qname}'")))?;
            return Ok(TypeRef::Simple(self.builtin_id(builtin)));
        }

        if namespace != self.target_namespace {
            return Err(config_error(format!(
                "type '{qname}' is outside the target namespace"
            )));
        }

        if self.named_complex.contains_key(local) {
            Ok(TypeRef::Complex(self.named_complex_type(local)?))
        } else if self.named_simple.contains_key(local) {
            Ok(TypeRef::Simple(self.named_simple_type(local)?))
        } else {
            Err(config_error(format!("unknown type '{qname}'")))
        }
    }

    fn resolve_simple_type(&mut self, node: Node<'a, 'input>, qname: &'a str) -> Result<SimpleTypeId> {
        match self.resolve_type(node, qname)? {
            TypeRef::Simple(id) => Ok(id),
            TypeRef::Complex(_) => Err(config_error(format!(
                "'{qname}' is a complex type where a simple type is required"
            ))),
        }
    }

    fn named_complex_type(&mut self, name: &'a str) -> Result<ComplexTypeId> {
        if let Some(id) = self.complex_ids.get(name) {
            return Ok(*id);
        }
        let node = *self
            .named_complex
            .get(name)
            .ok_or_else(|| config_error(format!("unknown complex type '{name}'")))?;

        // Reserve the slot first so recursive references resolve
        let id = self.complex_types.len();
        self.complex_types.push(ComplexType::default());
        self.complex_ids.insert(name, id);

        let mut compiled = self.complex_type(node)?;
        compiled.name = Some(name.to_string());
        self.complex_types[id] = compiled;
        Ok(id)
    }

    fn named_simple_type(&mut self, name: &'a str) -> Result<SimpleTypeId> {
        if let Some(id) = self.simple_ids.get(name) {
            return Ok(*id);
        }
        let node = *self
            .named_simple
            .get(name)
            .ok_or_else(|| config_error(format!("unknown simple type '{name}'")))?;

        let mut compiled = self.simple_type(node)?;
        compiled.name = Some(name.to_string());
        let id = self.simple_types.len();
        self.simple_types.push(compiled);
        self.simple_ids.insert(name, id);
        Ok(id)
    }

    fn anonymous_complex_type(&mut self, node: Node<'a, 'input>) -> Result<ComplexTypeId> {
        let compiled = self.complex_type(node)?;
        let id = self.complex_types.len();
        self.complex_types.push(compiled);
        Ok(id)
    }

    fn anonymous_simple_type(&mut self, node: Node<'a, 'input>) -> Result<SimpleTypeId> {
        let compiled = self.simple_type(node)?;
        let id = self.simple_types.len();
        self.simple_types.push(compiled);
        Ok(id)
    }

    fn element_type(&mut self, node: Node<'a, 'input>) -> Result<TypeRef> {
        if let Some(type_name) = node.attribute("type") {
            return self.resolve_type(node, type_name);
        }

        match components(node).next() {
            Some(child) if is_xsd(child, "complexType") => {
                Ok(TypeRef::Complex(self.anonymous_complex_type(child)?))
            }
            Some(child) if is_xsd(child, "simpleType") => {
                Ok(TypeRef::Simple(self.anonymous_simple_type(child)?))
            }
            Some(child) => Err(config_error(format!(
                "unsupported element content <xs:{}>",
                child.tag_name().name()
            ))),
            None => Ok(TypeRef::Simple(self.builtin_id(Builtin::String))),
        }
    }

    fn local_element(&mut self, node: Node<'a, 'input>) -> Result<Particle> {
        if node.attribute("ref").is_some() || node.attribute("form").is_some() {
            return Err(config_error("element references and form overrides are not supported"));
        }
        let occurs = parse_occurs(node)?;

        let name = required_attr(node, "name")?;
        let namespace = if self.qualified_elements {
            self.target_namespace
        } else {
            None
        };
        let type_ref = self.element_type(node)?;

        Ok(Particle::Element {
            decl: ElementDecl {
                name: QualifiedName::new(namespace, name),
                type_ref,
            },
            occurs,
        })
    }

    fn group(&mut self, node: Node<'a, 'input>, kind: GroupKind) -> Result<Particle> {
        let occurs = parse_occurs(node)?;
        let mut particles = Vec::new();

        for child in components(node) {
            let particle = match child.tag_name().name() {
                "element" => self.local_element(child)?,
                "sequence" if kind != GroupKind::All => self.group(child, GroupKind::Sequence)?,
                "choice" if kind != GroupKind::All => self.group(child, GroupKind::Choice)?,
                other => {
                    return Err(config_error(format!(
                        "unsupported particle <xs:{other}> in model group"
                    )))
                }
            };

            if kind == GroupKind::All && particle.occurs().max != Some(1) {
                return Err(config_error(
                    "elements inside <xs:all> may occur at most once",
                ));
            }
            particles.push(particle);
        }

        Ok(Particle::Group {
            kind,
            particles,
            occurs,
        })
    }

    fn attribute(&mut self, node: Node<'a, 'input>) -> Result<Option<AttributeDecl>> {
        if node.attribute("ref").is_some() || node.attribute("form").is_some() {
            return Err(config_error("attribute references and form overrides are not supported"));
        }
        let name = required_attr(node, "name")?;

        let required = match node.attribute("use") {
            Some("prohibited") => return Ok(None),
            Some("required") => true,
            Some("optional") | None => false,
            Some(other) => {
                return Err(config_error(format!(
                    "invalid use '{other}' on attribute '{name}'"
                )))
            }
        };

        let type_id = if let Some(type_name) = node.attribute("type") {
            self.resolve_simple_type(node, type_name)?
        } else if let Some(simple) = components(node).find(|c| is_xsd(*c, "simpleType")) {
            self.anonymous_simple_type(simple)?
        } else {
            self.builtin_id(Builtin::String)
        };

        Ok(Some(AttributeDecl {
            name: QualifiedName::new(None, name),
            type_id,
            required,
        }))
    }

    fn complex_type(&mut self, node: Node<'a, 'input>) -> Result<ComplexType> {
        if node.attribute("mixed") == Some("true") {
            return Err(config_error("mixed content is not supported"));
        }

        let mut compiled = ComplexType::default();

        for child in components(node) {
            match child.tag_name().name() {
                "sequence" => {
                    compiled.content = Content::Elements(self.group(child, GroupKind::Sequence)?)
                }
                "choice" => {
                    compiled.content = Content::Elements(self.group(child, GroupKind::Choice)?)
                }
                "all" => compiled.content = Content::Elements(self.group(child, GroupKind::All)?),
                "attribute" => {
                    if let Some(attr) = self.attribute(child)? {
                        compiled.attributes.push(attr);
                    }
                }
                "simpleContent" => self.simple_content(child, &mut compiled)?,
                other => {
                    return Err(config_error(format!(
                        "unsupported complex type component <xs:{other}>"
                    )))
                }
            }
        }

        Ok(compiled)
    }

    fn simple_content(&mut self, node: Node<'a, 'input>, compiled: &mut ComplexType) -> Result<()> {
        let extension = components(node)
            .find(|c| is_xsd(*c, "extension"))
            .ok_or_else(|| config_error("<xs:simpleContent> requires an <xs:extension>"))?;

        let base = required_attr(extension, "base")?;
        compiled.content = Content::Simple(self.resolve_simple_type(extension, base)?);

        for child in components(extension) {
            if !is_xsd(child, "attribute") {
                return Err(config_error(format!(
                    "unsupported extension component <xs:{}>",
                    child.tag_name().name()
                )));
            }
            if let Some(attr) = self.attribute(child)? {
                compiled.attributes.push(attr);
            }
        }
        Ok(())
    }

    fn simple_type(&mut self, node: Node<'a, 'input>) -> Result<SimpleType> {
        let restriction = components(node)
            .find(|c| is_xsd(*c, "restriction"))
            .ok_or_else(|| config_error("only <xs:restriction> simple types are supported"))?;

        let base_name = required_attr(restriction, "base")?;
        let base_id = self.resolve_simple_type(restriction, base_name)?;
        let mut simple = self.simple_types[base_id].clone();
        simple.name = None;

        let mut enumeration = Vec::new();
        for facet in components(restriction) {
            let value = required_attr(facet, "value")?;
            match facet.tag_name().name() {
                "enumeration" => enumeration.push(value.to_string()),
                "minLength" => simple.min_length = Some(parse_length(value)?),
                "maxLength" => simple.max_length = Some(parse_length(value)?),
                other => {
                    return Err(config_error(format!("unsupported facet <xs:{other}>")));
                }
            }
        }

        // A restriction's enumeration replaces its base's
        if !enumeration.is_empty() {
            simple.enumeration = enumeration;
        }

        Ok(simple)
    }
}

fn parse_length(value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| config_error(format!("invalid length facet '{value}'")))
}
