//! Canonical text rendering of a [`Diagram`].

use std::fmt::{self, Write as _};

use crate::diagram::{Attribute, Diagram, Entity, Relationship};

/// Render a diagram in canonical notation.
///
/// Entity blocks are indented by two spaces and attributes by four, blocks
/// are separated by blank lines, and relationship labels are always quoted.
/// Rendering the parse of a rendering reproduces it exactly.
///
/// # Examples
/// ```
/// use nar_core::{Attribute, Diagram, Entity, KeyKind, render_diagram};
///
/// let diagram = Diagram {
///     title: Some("Lookups".into()),
///     entities: vec![Entity::new("Province")
///         .with_attribute(Attribute::new("string", "ProvinceCode").with_key(KeyKind::Primary))],
///     relationships: Vec::new(),
/// };
/// assert_eq!(
///     render_diagram(&diagram),
///     "---\ntitle: Lookups\n---\n\nerDiagram\n  Province {\n    string ProvinceCode PK\n  }\n",
/// );
/// ```
pub fn render_diagram(diagram: &Diagram) -> String {
    diagram.to_string()
}

impl fmt::Display for Diagram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(title) = &self.title {
            writeln!(f, "---\ntitle: {title}\n---\n")?;
        }
        f.write_str("erDiagram\n")?;
        for (index, entity) in self.entities.iter().enumerate() {
            if index > 0 {
                f.write_char('\n')?;
            }
            write_entity(f, entity)?;
        }
        if !self.relationships.is_empty() {
            if !self.entities.is_empty() {
                f.write_char('\n')?;
            }
            for relationship in &self.relationships {
                writeln!(f, "  {relationship}")?;
            }
        }
        Ok(())
    }
}

fn write_entity(f: &mut fmt::Formatter<'_>, entity: &Entity) -> fmt::Result {
    writeln!(f, "  {} {{", entity.name)?;
    for attribute in &entity.attributes {
        writeln!(f, "    {attribute}")?;
    }
    f.write_str("  }\n")
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.data_type, self.name)?;
        for (index, key) in self.keys.iter().enumerate() {
            let separator = if index == 0 { " " } else { ", " };
            write!(f, "{separator}{key}")?;
        }
        if let Some(comment) = &self.comment {
            write!(f, " \"{comment}\"")?;
        }
        Ok(())
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = if self.identifying { "--" } else { ".." };
        write!(
            f,
            "{} {}{line}{} {} : \"{}\"",
            self.left,
            self.left_cardinality.left_token(),
            self.right_cardinality.right_token(),
            self.right,
            self.label
        )
    }
}
