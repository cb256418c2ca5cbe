//! Line-oriented parser for the entity-relationship diagram notation.
//!
//! The accepted grammar covers what schema diagrams actually use: optional
//! `---` front matter carrying a title, a single `erDiagram` header, entity
//! blocks with typed attributes and key markers, bare entity declarations,
//! and relationship statements with crow's-foot cardinalities. Parsing is
//! purely syntactic. Whether relationships name declared entities or foreign
//! keys line up with primary keys is left to [`crate::lint`].

use log::debug;
use thiserror::Error;

use crate::diagram::{Attribute, Cardinality, Diagram, Entity, KeyKind, Relationship};

const HEADER: &str = "erDiagram";
const FRONT_MATTER_FENCE: &str = "---";
const COMMENT_PREFIX: &str = "%%";
const DIRECTIONS: [&str; 4] = ["TB", "BT", "LR", "RL"];

/// Errors returned by [`parse_diagram`].
///
/// Every variant carries the 1-based line on which parsing stopped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The text never declared an `erDiagram` header.
    #[error("diagram has no `erDiagram` header")]
    MissingHeader,
    /// Diagram content appeared before the header.
    #[error("line {line}: expected `erDiagram` header, found {found:?}")]
    ContentBeforeHeader {
        /// Offending line.
        line: usize,
        /// Trimmed line contents.
        found: String,
    },
    /// A second header was declared.
    #[error("line {line}: duplicate `erDiagram` header")]
    DuplicateHeader {
        /// Offending line.
        line: usize,
    },
    /// Front matter opened with `---` was never closed.
    #[error("line {line}: front matter is not terminated by `---`")]
    UnterminatedFrontMatter {
        /// Line of the opening fence.
        line: usize,
    },
    /// An entity block was still open at the end of the text.
    #[error("line {line}: entity block {entity:?} is not closed")]
    UnterminatedEntity {
        /// Entity whose block is open.
        entity: String,
        /// Line of the opening brace.
        line: usize,
    },
    /// A `}` appeared outside an entity block.
    #[error("line {line}: unexpected `}}` outside an entity block")]
    UnexpectedClosingBrace {
        /// Offending line.
        line: usize,
    },
    /// An attribute line did not match `type name [keys] ["comment"]`.
    #[error("line {line}: malformed attribute {found:?}")]
    MalformedAttribute {
        /// Offending line.
        line: usize,
        /// Trimmed line contents.
        found: String,
    },
    /// An attribute used a key marker other than `PK`, `FK` or `UK`.
    #[error("line {line}: unknown key marker {marker:?}")]
    UnknownKeyMarker {
        /// Offending line.
        line: usize,
        /// Marker as written.
        marker: String,
    },
    /// A relationship statement was malformed.
    #[error("line {line}: malformed relationship {found:?}")]
    MalformedRelationship {
        /// Offending line.
        line: usize,
        /// Trimmed line contents.
        found: String,
    },
    /// A relationship connector was not a recognised cardinality pair.
    #[error("line {line}: unrecognised relationship connector {connector:?}")]
    MalformedCardinality {
        /// Offending line.
        line: usize,
        /// Connector as written.
        connector: String,
    },
    /// A name did not satisfy the identifier rules.
    #[error("line {line}: {name:?} is not a valid identifier")]
    InvalidIdentifier {
        /// Offending line.
        line: usize,
        /// Name as written.
        name: String,
    },
    /// The line matched no statement form.
    #[error("line {line}: unexpected content {found:?}")]
    UnexpectedContent {
        /// Offending line.
        line: usize,
        /// Trimmed line contents.
        found: String,
    },
}

/// Parse diagram text into a [`Diagram`].
///
/// # Examples
/// ```
/// use nar_core::{Cardinality, parse_diagram};
///
/// # fn main() -> Result<(), nar_core::ParseError> {
/// let diagram = parse_diagram(
///     "erDiagram\n  Province {\n    string ProvinceCode PK\n  }\n  PostalCode {\n    string PostalCode PK\n    string ProvinceCode FK\n  }\n  Province ||--o{ PostalCode : \"has\"\n",
/// )?;
/// assert_eq!(diagram.entities.len(), 2);
/// let relationship = &diagram.relationships[0];
/// assert_eq!(relationship.right_cardinality, Cardinality::ZeroOrMore);
/// assert_eq!(relationship.label, "has");
/// # Ok(())
/// # }
/// ```
pub fn parse_diagram(source: &str) -> Result<Diagram, ParseError> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let lines: Vec<(usize, &str)> = source
        .lines()
        .enumerate()
        .map(|(index, text)| (index + 1, text))
        .collect();
    let (title, body) = split_front_matter(&lines)?;

    let mut parser = DiagramParser {
        diagram: Diagram {
            title,
            ..Diagram::default()
        },
        header_seen: false,
        open_entity: None,
    };
    for &(line, text) in body {
        parser.feed(line, text.trim())?;
    }
    let diagram = parser.finish()?;
    debug!(
        "parsed diagram with {} entities and {} relationships",
        diagram.entities.len(),
        diagram.relationships.len()
    );
    Ok(diagram)
}

type FrontMatter<'a> = (Option<String>, &'a [(usize, &'a str)]);

fn split_front_matter<'a>(lines: &'a [(usize, &'a str)]) -> Result<FrontMatter<'a>, ParseError> {
    let Some(start) = lines.iter().position(|(_, text)| !text.trim().is_empty()) else {
        return Ok((None, lines));
    };
    let rest = lines.get(start..).unwrap_or_default();
    let Some(((fence_line, fence), inner)) = rest.split_first() else {
        return Ok((None, lines));
    };
    if fence.trim() != FRONT_MATTER_FENCE {
        return Ok((None, lines));
    }
    let close = inner
        .iter()
        .position(|(_, text)| text.trim() == FRONT_MATTER_FENCE)
        .ok_or(ParseError::UnterminatedFrontMatter { line: *fence_line })?;
    let header = inner.get(..close).unwrap_or_default();
    let body = inner.get(close + 1..).unwrap_or_default();
    // Indented keys belong to nested maps such as `config:`.
    let title = header.iter().find_map(|(_, text)| {
        let (key, value) = text.split_once(':')?;
        (key.trim_end() == "title").then(|| unquote(value.trim()).to_owned())
    });
    Ok((title, body))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .or_else(|| {
            value
                .strip_prefix('\'')
                .and_then(|inner| inner.strip_suffix('\''))
        })
        .unwrap_or(value)
}

struct DiagramParser {
    diagram: Diagram,
    header_seen: bool,
    open_entity: Option<Entity>,
}

impl DiagramParser {
    fn feed(&mut self, line: usize, text: &str) -> Result<(), ParseError> {
        if text.is_empty() || text.starts_with(COMMENT_PREFIX) {
            return Ok(());
        }
        if let Some(entity) = self.open_entity.as_mut() {
            if text == "}" {
                if let Some(closed) = self.open_entity.take() {
                    self.diagram.entities.push(closed);
                }
            } else {
                entity.attributes.push(parse_attribute(line, text)?);
            }
            return Ok(());
        }
        if !self.header_seen {
            if text == HEADER {
                self.header_seen = true;
                return Ok(());
            }
            return Err(ParseError::ContentBeforeHeader {
                line,
                found: text.to_owned(),
            });
        }
        self.statement(line, text)
    }

    fn statement(&mut self, line: usize, text: &str) -> Result<(), ParseError> {
        if text == HEADER {
            return Err(ParseError::DuplicateHeader { line });
        }
        if text == "}" {
            return Err(ParseError::UnexpectedClosingBrace { line });
        }
        if text
            .strip_prefix("direction ")
            .is_some_and(|rest| DIRECTIONS.contains(&rest.trim()))
        {
            return Ok(());
        }
        if let Some(head) = text.strip_suffix("{}") {
            let entity = open_entity(line, head)?;
            self.diagram.entities.push(entity);
            return Ok(());
        }
        if let Some(head) = text.strip_suffix('{') {
            self.open_entity = Some(open_entity(line, head)?);
            return Ok(());
        }
        if text.contains(':') {
            let relationship = parse_relationship(line, text)?;
            self.diagram.relationships.push(relationship);
            return Ok(());
        }
        if is_identifier(text) {
            let mut entity = Entity::new(text);
            entity.line = line;
            self.diagram.entities.push(entity);
            return Ok(());
        }
        Err(ParseError::UnexpectedContent {
            line,
            found: text.to_owned(),
        })
    }

    fn finish(self) -> Result<Diagram, ParseError> {
        if let Some(entity) = self.open_entity {
            return Err(ParseError::UnterminatedEntity {
                entity: entity.name,
                line: entity.line,
            });
        }
        if !self.header_seen {
            return Err(ParseError::MissingHeader);
        }
        Ok(self.diagram)
    }
}

fn open_entity(line: usize, head: &str) -> Result<Entity, ParseError> {
    let name = head.trim();
    if !is_identifier(name) {
        return Err(ParseError::InvalidIdentifier {
            line,
            name: name.to_owned(),
        });
    }
    let mut entity = Entity::new(name);
    entity.line = line;
    Ok(entity)
}

fn parse_attribute(line: usize, text: &str) -> Result<Attribute, ParseError> {
    let malformed = || ParseError::MalformedAttribute {
        line,
        found: text.to_owned(),
    };
    let (declaration, comment) = match text.split_once('"') {
        Some((head, tail)) => {
            let comment = tail.strip_suffix('"').ok_or_else(malformed)?;
            if comment.contains('"') {
                return Err(malformed());
            }
            (head, Some(comment.to_owned()))
        }
        None => (text, None),
    };

    let mut tokens = declaration.split_whitespace();
    let data_type = tokens.next().ok_or_else(malformed)?;
    let name = tokens.next().ok_or_else(malformed)?;
    if !data_type.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(malformed());
    }
    if !is_identifier(name) {
        return Err(ParseError::InvalidIdentifier {
            line,
            name: name.to_owned(),
        });
    }

    let markers = tokens.collect::<Vec<_>>().join(" ");
    let mut attribute = Attribute::new(data_type, name);
    attribute.line = line;
    attribute.comment = comment;
    for marker in markers.split(',').map(str::trim).filter(|m| !m.is_empty()) {
        let key = marker
            .parse::<KeyKind>()
            .map_err(|_| ParseError::UnknownKeyMarker {
                line,
                marker: marker.to_owned(),
            })?;
        attribute = attribute.with_key(key);
    }
    Ok(attribute)
}

fn parse_relationship(line: usize, text: &str) -> Result<Relationship, ParseError> {
    let malformed = || ParseError::MalformedRelationship {
        line,
        found: text.to_owned(),
    };
    let (statement, label_text) = text.split_once(':').ok_or_else(malformed)?;
    let label = parse_label(label_text.trim()).ok_or_else(malformed)?;

    let tokens: Vec<&str> = statement.split_whitespace().collect();
    let [left, connector, right] = tokens.as_slice() else {
        return Err(malformed());
    };
    for name in [left, right] {
        if !is_identifier(name) {
            return Err(ParseError::InvalidIdentifier {
                line,
                name: (*name).to_owned(),
            });
        }
    }
    let (left_cardinality, identifying, right_cardinality) = parse_connector(connector)
        .ok_or_else(|| ParseError::MalformedCardinality {
            line,
            connector: (*connector).to_owned(),
        })?;

    Ok(Relationship {
        left: (*left).to_owned(),
        left_cardinality,
        right: (*right).to_owned(),
        right_cardinality,
        identifying,
        label,
        line,
    })
}

fn parse_label(text: &str) -> Option<String> {
    if let Some(inner) = text.strip_prefix('"') {
        let label = inner.strip_suffix('"')?;
        return (!label.contains('"')).then(|| label.to_owned());
    }
    let single_word = !text.is_empty() && !text.contains(char::is_whitespace);
    single_word.then(|| text.to_owned())
}

fn parse_connector(connector: &str) -> Option<(Cardinality, bool, Cardinality)> {
    if !connector.is_ascii() || connector.len() != 6 {
        return None;
    }
    let left = Cardinality::from_left_token(connector.get(0..2)?)?;
    let identifying = match connector.get(2..4)? {
        "--" => true,
        ".." => false,
        _ => return None,
    };
    let right = Cardinality::from_right_token(connector.get(4..6)?)?;
    Some((left, identifying, right))
}

/// Whether `name` is a valid entity or attribute identifier.
///
/// Identifiers start with an ASCII letter or `_` and continue with ASCII
/// letters, digits, `_` or `-`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const MINIMAL: &str = "erDiagram\n  Province {\n    string ProvinceCode PK\n  }\n";

    #[rstest]
    fn reads_title_from_front_matter() {
        let source = format!("---\ntitle: \"Sample\"\nconfig: ignored\n---\n{MINIMAL}");
        let diagram = parse_diagram(&source).expect("diagram parses");
        assert_eq!(diagram.title.as_deref(), Some("Sample"));
        assert_eq!(diagram.entities.len(), 1);
    }

    #[rstest]
    fn skips_leading_byte_order_mark() {
        let source = format!("\u{feff}{}", crate::NATIONAL_ADDRESS_REGISTER_SOURCE);
        let diagram = parse_diagram(&source).expect("diagram parses");
        assert_eq!(diagram.title.as_deref(), Some("National Address Register"));
        assert_eq!(diagram.entities.len(), 6);
    }

    #[rstest]
    fn nested_front_matter_title_is_not_the_diagram_title() {
        let source = "---\nconfig:\n  title: Theme\n---\nerDiagram\n  Province\n";
        let diagram = parse_diagram(source).expect("diagram parses");
        assert_eq!(diagram.title, None);

        let source = "---\nconfig:\n  title: Theme\ntitle: Register\n---\nerDiagram\n";
        let diagram = parse_diagram(source).expect("diagram parses");
        assert_eq!(diagram.title.as_deref(), Some("Register"));
    }

    #[rstest]
    fn diagram_without_front_matter_has_no_title() {
        let diagram = parse_diagram(MINIMAL).expect("diagram parses");
        assert_eq!(diagram.title, None);
    }

    #[rstest]
    fn records_entity_and_attribute_lines() {
        let diagram = parse_diagram(MINIMAL).expect("diagram parses");
        let entity = diagram.entity("Province").expect("entity declared");
        assert_eq!(entity.line, 2);
        let key = entity.attribute("ProvinceCode").expect("attribute declared");
        assert_eq!(key.line, 3);
        assert_eq!(key.data_type, "string");
        assert_eq!(key.keys, vec![KeyKind::Primary]);
    }

    #[rstest]
    #[case("string code PK, FK", vec![KeyKind::Primary, KeyKind::Foreign])]
    #[case("string code PK,UK", vec![KeyKind::Primary, KeyKind::Unique])]
    #[case("string code fk", vec![KeyKind::Foreign])]
    #[case("string code", vec![])]
    fn parses_key_marker_lists(#[case] text: &str, #[case] expected: Vec<KeyKind>) {
        let attribute = parse_attribute(1, text).expect("attribute parses");
        assert_eq!(attribute.keys, expected);
    }

    #[rstest]
    fn keeps_attribute_comments() {
        let attribute =
            parse_attribute(4, "string BG_X FK \"easting, metres\"").expect("attribute parses");
        assert_eq!(attribute.comment.as_deref(), Some("easting, metres"));
        assert_eq!(attribute.keys, vec![KeyKind::Foreign]);
    }

    #[rstest]
    #[case("string", ParseError::MalformedAttribute { line: 7, found: "string".into() })]
    #[case("string code \"open", ParseError::MalformedAttribute { line: 7, found: "string code \"open".into() })]
    #[case("string code XK", ParseError::UnknownKeyMarker { line: 7, marker: "XK".into() })]
    #[case("string 9code", ParseError::InvalidIdentifier { line: 7, name: "9code".into() })]
    fn rejects_malformed_attributes(#[case] text: &str, #[case] expected: ParseError) {
        assert_eq!(parse_attribute(7, text), Err(expected));
    }

    #[rstest]
    #[case("A ||--o{ B : has", Cardinality::ExactlyOne, true, Cardinality::ZeroOrMore)]
    #[case("A |o..|{ B : \"links to\"", Cardinality::ZeroOrOne, false, Cardinality::OneOrMore)]
    #[case("A }o--o| B : x", Cardinality::ZeroOrMore, true, Cardinality::ZeroOrOne)]
    fn parses_connectors(
        #[case] text: &str,
        #[case] left: Cardinality,
        #[case] identifying: bool,
        #[case] right: Cardinality,
    ) {
        let relationship = parse_relationship(1, text).expect("relationship parses");
        assert_eq!(relationship.left_cardinality, left);
        assert_eq!(relationship.identifying, identifying);
        assert_eq!(relationship.right_cardinality, right);
    }

    #[rstest]
    fn quoted_label_may_contain_spaces() {
        let relationship =
            parse_relationship(1, "PostalCode ||--o{ Address : \"used by\"").expect("parses");
        assert_eq!(relationship.label, "used by");
    }

    #[rstest]
    #[case("A ||--o{ B : used by")]
    #[case("A ||--o{ : has")]
    #[case("A ||--o{ B C : has")]
    #[case("A ||--o{ B :")]
    fn rejects_malformed_relationships(#[case] text: &str) {
        let err = parse_relationship(3, text).expect_err("relationship should fail");
        assert!(
            matches!(err, ParseError::MalformedRelationship { line: 3, .. }),
            "unexpected error {err:?}"
        );
    }

    #[rstest]
    #[case("A ||->o{ B : has")]
    #[case("A o{--|| B : has")]
    #[case("A ||--o B : has")]
    fn rejects_unknown_connectors(#[case] text: &str) {
        let err = parse_relationship(2, text).expect_err("relationship should fail");
        assert!(
            matches!(err, ParseError::MalformedCardinality { line: 2, .. }),
            "unexpected error {err:?}"
        );
    }

    #[rstest]
    fn accepts_bare_and_empty_entities_and_comments() {
        let source = "erDiagram\n  %% lookups\n  direction LR\n  Province\n  BuildingUsage {}\n";
        let diagram = parse_diagram(source).expect("diagram parses");
        let names: Vec<_> = diagram.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Province", "BuildingUsage"]);
        assert!(diagram.entities.iter().all(|e| e.attributes.is_empty()));
    }

    #[rstest]
    #[case("", ParseError::MissingHeader)]
    #[case("---\ntitle: x\n", ParseError::UnterminatedFrontMatter { line: 1 })]
    #[case("Province {\n}\n", ParseError::ContentBeforeHeader { line: 1, found: "Province {".into() })]
    #[case("erDiagram\nerDiagram\n", ParseError::DuplicateHeader { line: 2 })]
    #[case("erDiagram\n  }\n", ParseError::UnexpectedClosingBrace { line: 2 })]
    #[case("erDiagram\n  Province {\n    string ProvinceCode PK\n", ParseError::UnterminatedEntity { entity: "Province".into(), line: 2 })]
    #[case("erDiagram\n  Province code\n", ParseError::UnexpectedContent { line: 2, found: "Province code".into() })]
    #[case("erDiagram\n  9Province {\n  }\n", ParseError::InvalidIdentifier { line: 2, name: "9Province".into() })]
    fn reports_structural_errors_with_lines(#[case] source: &str, #[case] expected: ParseError) {
        assert_eq!(parse_diagram(source), Err(expected));
    }

    #[rstest]
    #[case("Province", true)]
    #[case("_private", true)]
    #[case("BG-DLS", true)]
    #[case("CSD_ID2", true)]
    #[case("-lead", false)]
    #[case("2nd", false)]
    #[case("", false)]
    #[case("Québec", false)]
    fn identifier_rules(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_identifier(name), expected);
    }
}
