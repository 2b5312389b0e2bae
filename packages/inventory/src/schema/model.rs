//! Compiled schema components.
//!
//! Types live in arenas on [`super::Schema`] and are referenced by index,
//! so recursive and shared named types need no reference counting.

/// Index into `Schema::complex_types`.
pub type ComplexTypeId = usize;

/// Index into `Schema::simple_types`.
pub type SimpleTypeId = usize;

/// Expanded element or attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub namespace: Option<String>,
    pub local: String,
}

impl QualifiedName {
    pub fn new(namespace: Option<&str>, local: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local: local.to_string(),
        }
    }

    pub fn matches(&self, namespace: Option<&str>, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == namespace
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.local)
    }
}

/// How many times a particle may occur. `max: None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    pub min: u32,
    pub max: Option<u32>,
}

impl Occurs {
    pub const ONCE: Self = Self {
        min: 1,
        max: Some(1),
    };

    pub fn allows(&self, count: u32) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }

    pub fn can_repeat(&self, count: u32) -> bool {
        self.max.map_or(true, |max| count < max)
    }
}

/// Built-in XML Schema datatypes understood by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    String,
    Token,
    AnyUri,
    Date,
    DateTime,
    Boolean,
    Integer,
}

impl Builtin {
    pub fn from_local_name(name: &str) -> Option<Self> {
        Some(match name {
            "string" => Self::String,
            "token" => Self::Token,
            "anyURI" => Self::AnyUri,
            "date" => Self::Date,
            "dateTime" => Self::DateTime,
            "boolean" => Self::Boolean,
            "integer" | "nonNegativeInteger" => Self::Integer,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "xs:string",
            Self::Token => "xs:token",
            Self::AnyUri => "xs:anyURI",
            Self::Date => "xs:date",
            Self::DateTime => "xs:dateTime",
            Self::Boolean => "xs:boolean",
            Self::Integer => "xs:integer",
        }
    }

    /// Whether whitespace is collapsed before checking the value.
    pub fn collapses_whitespace(&self) -> bool {
        *self != Self::String
    }
}

/// A simple type: a built-in base plus restricting facets.
#[derive(Debug, Clone)]
pub struct SimpleType {
    pub name: Option<String>,
    pub base: Builtin,
    pub enumeration: Vec<String>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl SimpleType {
    pub fn builtin(base: Builtin) -> Self {
        Self {
            name: Some(base.name().to_string()),
            base,
            enumeration: Vec::new(),
            min_length: None,
            max_length: None,
        }
    }
}

/// Reference to the type of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRef {
    Simple(SimpleTypeId),
    Complex(ComplexTypeId),
}

/// An element declaration as it appears in a content model.
#[derive(Debug, Clone)]
pub struct ElementDecl {
    pub name: QualifiedName,
    pub type_ref: TypeRef,
}

/// Kind of model group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Sequence,
    Choice,
    All,
}

/// A term in a content model, with its occurrence bounds.
#[derive(Debug, Clone)]
pub enum Particle {
    Element { decl: ElementDecl, occurs: Occurs },
    Group {
        kind: GroupKind,
        particles: Vec<Particle>,
        occurs: Occurs,
    },
}

impl Particle {
    pub fn occurs(&self) -> Occurs {
        match self {
            Self::Element { occurs, .. } | Self::Group { occurs, .. } => *occurs,
        }
    }

    /// Find the declaration for an element name anywhere in this model.
    pub fn find_decl(&self, namespace: Option<&str>, local: &str) -> Option<&ElementDecl> {
        match self {
            Self::Element { decl, .. } => decl.name.matches(namespace, local).then_some(decl),
            Self::Group { particles, .. } => particles
                .iter()
                .find_map(|p| p.find_decl(namespace, local)),
        }
    }

    /// Names of element declarations that must appear at least once.
    pub fn required_names(&self) -> Vec<&QualifiedName> {
        let mut names = Vec::new();
        self.collect_required(&mut names);
        names
    }

    fn collect_required<'a>(&'a self, names: &mut Vec<&'a QualifiedName>) {
        if self.occurs().min == 0 {
            return;
        }
        match self {
            Self::Element { decl, .. } => names.push(&decl.name),
            Self::Group {
                kind: GroupKind::Sequence | GroupKind::All,
                particles,
                ..
            } => {
                for p in particles {
                    p.collect_required(names);
                }
            }
            // Any single alternative satisfies a choice
            Self::Group {
                kind: GroupKind::Choice,
                ..
            } => {}
        }
    }
}

/// An attribute declaration.
#[derive(Debug, Clone)]
pub struct AttributeDecl {
    pub name: QualifiedName,
    pub type_id: SimpleTypeId,
    pub required: bool,
}

/// What a complex type allows between its tags.
#[derive(Debug, Clone, Default)]
pub enum Content {
    /// No child elements and no text.
    #[default]
    Empty,
    /// Child elements only, matching the particle.
    Elements(Particle),
    /// Text only, of the given simple type.
    Simple(SimpleTypeId),
}

/// A complex type: attributes plus a content model.
#[derive(Debug, Clone, Default)]
pub struct ComplexType {
    pub name: Option<String>,
    pub attributes: Vec<AttributeDecl>,
    pub content: Content,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(local: &str, min: u32) -> Particle {
        Particle::Element {
            decl: ElementDecl {
                name: QualifiedName::new(None, local),
                type_ref: TypeRef::Simple(0),
            },
            occurs: Occurs { min, max: Some(1) },
        }
    }

    #[test]
    fn test_occurs_bounds() {
        let unbounded = Occurs { min: 0, max: None };
        assert!(unbounded.allows(0));
        assert!(unbounded.allows(10_000));
        assert!(unbounded.can_repeat(10_000));

        assert!(!Occurs::ONCE.allows(0));
        assert!(Occurs::ONCE.allows(1));
        assert!(!Occurs::ONCE.allows(2));
        assert!(!Occurs::ONCE.can_repeat(1));
    }

    #[test]
    fn test_required_names_skips_optional_and_choices() {
        let model = Particle::Group {
            kind: GroupKind::Sequence,
            particles: vec![
                element("Identifier", 1),
                element("Metadata", 0),
                Particle::Group {
                    kind: GroupKind::Choice,
                    particles: vec![element("A", 1), element("B", 1)],
                    occurs: Occurs::ONCE,
                },
            ],
            occurs: Occurs::ONCE,
        };

        let names: Vec<String> = model
            .required_names()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, vec!["Identifier"]);
    }

    #[test]
    fn test_find_decl_nested() {
        let model = Particle::Group {
            kind: GroupKind::Sequence,
            particles: vec![
                element("Identifier", 1),
                Particle::Group {
                    kind: GroupKind::Choice,
                    particles: vec![element("Service", 1)],
                    occurs: Occurs::ONCE,
                },
            ],
            occurs: Occurs::ONCE,
        };

        assert!(model.find_decl(None, "Service").is_some());
        assert!(model.find_decl(Some("urn:x"), "Service").is_none());
        assert!(model.find_decl(None, "Function").is_none());
    }

    #[test]
    fn test_builtin_from_local_name() {
        assert_eq!(Builtin::from_local_name("date"), Some(Builtin::Date));
        assert_eq!(Builtin::from_local_name("anyURI"), Some(Builtin::AnyUri));
        assert_eq!(Builtin::from_local_name("nonNegativeInteger"), Some(Builtin::Integer));
        assert_eq!(Builtin::from_local_name("QName"), None);
    }
}
