//! Typed model of an entity-relationship diagram.
//!
//! The model mirrors the declarative notation one-to-one: entity blocks hold
//! typed attributes with optional key markers, and relationship statements
//! join two entity names with a cardinality on each end. Nothing here checks
//! that the diagram is consistent; see [`crate::lint`] for that.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A parsed entity-relationship diagram.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagram {
    /// Title taken from the diagram front matter, if present.
    pub title: Option<String>,
    /// Entity blocks in declaration order.
    pub entities: Vec<Entity>,
    /// Relationship statements in declaration order.
    pub relationships: Vec<Relationship>,
}

impl Diagram {
    /// Return the first entity declared with `name`.
    ///
    /// # Examples
    /// ```
    /// use nar_core::{Diagram, Entity};
    ///
    /// let diagram = Diagram {
    ///     title: None,
    ///     entities: vec![Entity::new("Province")],
    ///     relationships: Vec::new(),
    /// };
    /// assert!(diagram.entity("Province").is_some());
    /// assert!(diagram.entity("Address").is_none());
    /// ```
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.name == name)
    }

    /// Return whether an entity block named `name` exists.
    pub fn declares(&self, name: &str) -> bool {
        self.entity(name).is_some()
    }

    /// Relationships that touch the named entity on either side.
    pub fn relationships_of<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.relationships
            .iter()
            .filter(move |relationship| relationship.left == name || relationship.right == name)
    }

    /// Return the first relationship joining `a` and `b`, in either direction.
    pub fn relationship_between(&self, a: &str, b: &str) -> Option<&Relationship> {
        self.relationships
            .iter()
            .find(|relationship| relationship.connects(a, b))
    }
}

/// An entity block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Entity {
    /// Entity name as written in the diagram.
    pub name: String,
    /// Attributes in declaration order.
    pub attributes: Vec<Attribute>,
    /// 1-based line of the declaration, or `0` for entities built in code.
    pub line: usize,
}

impl Entity {
    /// Construct an entity without attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            line: 0,
        }
    }

    /// Append an attribute, returning the updated entity.
    #[must_use]
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Return the first attribute named `name`.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
    }

    /// Attributes marked `PK`.
    pub fn primary_keys(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.is_primary_key())
    }

    /// Attributes marked `FK`.
    pub fn foreign_keys(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.is_foreign_key())
    }

    /// The primary key when exactly one attribute carries `PK`.
    pub fn single_primary_key(&self) -> Option<&Attribute> {
        let mut keys = self.primary_keys();
        let first = keys.next()?;
        keys.next().is_none().then_some(first)
    }
}

/// A typed attribute inside an entity block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Attribute {
    /// Attribute (column) name.
    pub name: String,
    /// Declared type, kept verbatim (`string`, `int`, ...).
    pub data_type: String,
    /// Key markers in declaration order.
    pub keys: Vec<KeyKind>,
    /// Free-text comment from the trailing quoted string.
    pub comment: Option<String>,
    /// 1-based line of the declaration, or `0` for attributes built in code.
    pub line: usize,
}

impl Attribute {
    /// Construct an attribute without key markers.
    pub fn new(data_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            keys: Vec::new(),
            comment: None,
            line: 0,
        }
    }

    /// Add a key marker, returning the updated attribute.
    #[must_use]
    pub fn with_key(mut self, key: KeyKind) -> Self {
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
        self
    }

    /// Whether the attribute is marked `PK`.
    pub fn is_primary_key(&self) -> bool {
        self.keys.contains(&KeyKind::Primary)
    }

    /// Whether the attribute is marked `FK`.
    pub fn is_foreign_key(&self) -> bool {
        self.keys.contains(&KeyKind::Foreign)
    }

    /// Whether the attribute is marked `UK`.
    pub fn is_unique(&self) -> bool {
        self.keys.contains(&KeyKind::Unique)
    }

    /// Whether the comment reads `optional`, ignoring case and padding.
    ///
    /// A foreign key carrying this comment may be left empty even when the
    /// relationship to its parent is mandatory.
    ///
    /// # Examples
    /// ```
    /// use nar_core::{Attribute, KeyKind};
    ///
    /// let mut usage = Attribute::new("string", "BU_USE").with_key(KeyKind::Foreign);
    /// assert!(!usage.is_marked_optional());
    /// usage.comment = Some("Optional".into());
    /// assert!(usage.is_marked_optional());
    /// ```
    pub fn is_marked_optional(&self) -> bool {
        self.comment
            .as_deref()
            .is_some_and(|comment| comment.trim().eq_ignore_ascii_case(OPTIONAL_COMMENT))
    }
}

/// Attribute comment that relaxes a foreign key to nullable.
pub const OPTIONAL_COMMENT: &str = "optional";

/// Key marker attached to an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KeyKind {
    /// `PK`
    Primary,
    /// `FK`
    Foreign,
    /// `UK`
    Unique,
}

impl KeyKind {
    /// The marker as written in the diagram.
    ///
    /// # Examples
    /// ```
    /// use nar_core::KeyKind;
    ///
    /// assert_eq!(KeyKind::Foreign.as_str(), "FK");
    /// assert_eq!("pk".parse::<KeyKind>(), Ok(KeyKind::Primary));
    /// ```
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "PK",
            Self::Foreign => "FK",
            Self::Unique => "UK",
        }
    }
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for KeyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PK" => Ok(Self::Primary),
            "FK" => Ok(Self::Foreign),
            "UK" => Ok(Self::Unique),
            _ => Err(format!("unknown key marker '{s}'")),
        }
    }
}

/// How many rows on one end of a relationship take part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Cardinality {
    /// Zero or one (`|o` / `o|`).
    ZeroOrOne,
    /// Exactly one (`||`).
    ExactlyOne,
    /// Zero or more (`}o` / `o{`).
    ZeroOrMore,
    /// One or more (`}|` / `|{`).
    OneOrMore,
}

impl Cardinality {
    const ALL: [Self; 4] = [
        Self::ZeroOrOne,
        Self::ExactlyOne,
        Self::ZeroOrMore,
        Self::OneOrMore,
    ];

    /// Token used when the cardinality sits on the left of the line.
    pub const fn left_token(self) -> &'static str {
        match self {
            Self::ZeroOrOne => "|o",
            Self::ExactlyOne => "||",
            Self::ZeroOrMore => "}o",
            Self::OneOrMore => "}|",
        }
    }

    /// Token used when the cardinality sits on the right of the line.
    pub const fn right_token(self) -> &'static str {
        match self {
            Self::ZeroOrOne => "o|",
            Self::ExactlyOne => "||",
            Self::ZeroOrMore => "o{",
            Self::OneOrMore => "|{",
        }
    }

    /// Parse a left-hand token.
    pub fn from_left_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.left_token() == token)
    }

    /// Parse a right-hand token.
    pub fn from_right_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.right_token() == token)
    }

    /// Whether more than one row may take part.
    pub const fn is_many(self) -> bool {
        matches!(self, Self::ZeroOrMore | Self::OneOrMore)
    }

    /// Whether zero rows may take part.
    pub const fn is_optional(self) -> bool {
        matches!(self, Self::ZeroOrOne | Self::ZeroOrMore)
    }
}

/// A relationship statement joining two entities.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Relationship {
    /// Entity on the left of the statement.
    pub left: String,
    /// Cardinality at the left entity's end.
    pub left_cardinality: Cardinality,
    /// Entity on the right of the statement.
    pub right: String,
    /// Cardinality at the right entity's end.
    pub right_cardinality: Cardinality,
    /// `--` (identifying) rather than `..` (non-identifying).
    pub identifying: bool,
    /// Relationship label.
    pub label: String,
    /// 1-based line of the statement, or `0` for relationships built in code.
    pub line: usize,
}

impl Relationship {
    /// Construct an identifying relationship.
    pub fn new(
        left: impl Into<String>,
        left_cardinality: Cardinality,
        right: impl Into<String>,
        right_cardinality: Cardinality,
        label: impl Into<String>,
    ) -> Self {
        Self {
            left: left.into(),
            left_cardinality,
            right: right.into(),
            right_cardinality,
            identifying: true,
            label: label.into(),
            line: 0,
        }
    }

    /// Return `(parent, child)` for a one-to-many relationship.
    ///
    /// The parent is the end whose cardinality admits at most one row.
    /// One-to-one and many-to-many relationships have no parent.
    ///
    /// # Examples
    /// ```
    /// use nar_core::{Cardinality, Relationship};
    ///
    /// let has = Relationship::new(
    ///     "Location",
    ///     Cardinality::ExactlyOne,
    ///     "Address",
    ///     Cardinality::ZeroOrMore,
    ///     "has",
    /// );
    /// assert_eq!(has.parent_child(), Some(("Location", "Address")));
    /// ```
    pub fn parent_child(&self) -> Option<(&str, &str)> {
        match (
            self.left_cardinality.is_many(),
            self.right_cardinality.is_many(),
        ) {
            (false, true) => Some((self.left.as_str(), self.right.as_str())),
            (true, false) => Some((self.right.as_str(), self.left.as_str())),
            _ => None,
        }
    }

    /// Cardinality at the named entity's end, if it takes part.
    pub fn cardinality_of(&self, entity: &str) -> Option<Cardinality> {
        if self.left == entity {
            Some(self.left_cardinality)
        } else if self.right == entity {
            Some(self.right_cardinality)
        } else {
            None
        }
    }

    /// Whether the relationship joins `a` and `b`, in either direction.
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.left == a && self.right == b) || (self.left == b && self.right == a)
    }
}
