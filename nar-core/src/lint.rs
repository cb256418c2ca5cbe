//! Structural checks over a parsed [`Diagram`].
//!
//! The linter verifies what a diagram can promise on its own: entity and
//! attribute names are unique, every entity has a primary key, relationships
//! name declared entities, and every `FK` attribute lines up with the primary
//! key of exactly one other entity of the same type. Foreign keys are matched
//! by name: an attribute `ProvinceCode FK` refers to the entity whose single
//! primary key is called `ProvinceCode`.

use std::collections::HashSet;
use std::fmt;

use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::diagram::{Attribute, Diagram, Entity};

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Severity {
    /// The diagram is usable but probably not what was intended.
    Warning,
    /// The diagram is inconsistent and cannot be materialised.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// The check that produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum LintRule {
    /// An entity name is declared by more than one block.
    DuplicateEntity,
    /// An attribute name repeats within one entity.
    DuplicateAttribute,
    /// An entity declares no `PK` attribute.
    MissingPrimaryKey,
    /// An entity declares more than one `PK` attribute.
    CompositePrimaryKey,
    /// A relationship names an entity that has no block.
    UndeclaredEntity,
    /// An `FK` attribute matches no other entity's primary key.
    UnresolvedForeignKey,
    /// An `FK` attribute's type differs from the referenced key's type.
    ForeignKeyTypeMismatch,
    /// An `FK` attribute matches the primary key of several entities.
    AmbiguousForeignKey,
    /// An `FK` resolves to a parent that no relationship connects.
    ForeignKeyWithoutRelationship,
    /// A one-to-many relationship has no backing `FK` on the child.
    RelationshipWithoutForeignKey,
    /// An entity takes part in no relationship.
    OrphanEntity,
}

impl LintRule {
    /// Stable kebab-case identifier for the rule.
    pub const fn code(self) -> &'static str {
        match self {
            Self::DuplicateEntity => "duplicate-entity",
            Self::DuplicateAttribute => "duplicate-attribute",
            Self::MissingPrimaryKey => "missing-primary-key",
            Self::CompositePrimaryKey => "composite-primary-key",
            Self::UndeclaredEntity => "undeclared-entity",
            Self::UnresolvedForeignKey => "unresolved-foreign-key",
            Self::ForeignKeyTypeMismatch => "foreign-key-type-mismatch",
            Self::AmbiguousForeignKey => "ambiguous-foreign-key",
            Self::ForeignKeyWithoutRelationship => "foreign-key-without-relationship",
            Self::RelationshipWithoutForeignKey => "relationship-without-foreign-key",
            Self::OrphanEntity => "orphan-entity",
        }
    }

    /// Severity attached to every finding of this rule.
    pub const fn severity(self) -> Severity {
        match self {
            Self::CompositePrimaryKey
            | Self::ForeignKeyWithoutRelationship
            | Self::RelationshipWithoutForeignKey
            | Self::OrphanEntity => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for LintRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A single problem found in a diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LintFinding {
    /// Check that fired.
    pub rule: LintRule,
    /// Severity of the check.
    pub severity: Severity,
    /// Entity the finding is about, if any.
    pub entity: Option<String>,
    /// Attribute the finding is about, if any.
    pub attribute: Option<String>,
    /// 1-based source line, or `0` when the diagram was built in code.
    pub line: usize,
    /// Human-readable description.
    pub message: String,
}

impl LintFinding {
    fn new(rule: LintRule, line: usize, message: String) -> Self {
        Self {
            rule,
            severity: rule.severity(),
            entity: None,
            attribute: None,
            line,
            message,
        }
    }

    fn on_entity(mut self, entity: &str) -> Self {
        self.entity = Some(entity.to_owned());
        self
    }

    fn on_attribute(mut self, attribute: &str) -> Self {
        self.attribute = Some(attribute.to_owned());
        self
    }
}

impl fmt::Display for LintFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "line {}: ", self.line)?;
        }
        write!(f, "{} [{}] {}", self.severity, self.rule, self.message)
    }
}

/// Outcome of [`lint_diagram`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LintReport {
    /// Findings ordered by source line, then by check.
    pub findings: Vec<LintFinding>,
}

impl LintReport {
    /// Findings with [`Severity::Error`].
    pub fn errors(&self) -> impl Iterator<Item = &LintFinding> {
        self.findings
            .iter()
            .filter(|finding| finding.severity == Severity::Error)
    }

    /// Findings with [`Severity::Warning`].
    pub fn warnings(&self) -> impl Iterator<Item = &LintFinding> {
        self.findings
            .iter()
            .filter(|finding| finding.severity == Severity::Warning)
    }

    /// Whether any error was found.
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Whether the diagram produced no findings at all.
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    /// Findings produced by `rule`.
    pub fn by_rule(&self, rule: LintRule) -> impl Iterator<Item = &LintFinding> {
        self.findings
            .iter()
            .filter(move |finding| finding.rule == rule)
    }
}

/// Where an `FK` attribute points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForeignKeyTarget<'a> {
    /// Exactly one entity has a single primary key of the same name.
    Resolved {
        /// Referenced (parent) entity.
        entity: &'a Entity,
        /// Referenced primary-key attribute.
        key: &'a Attribute,
    },
    /// No other entity has a matching primary key.
    Unresolved,
    /// Several entities match and no relationship picks one out.
    Ambiguous(Vec<&'a str>),
}

/// Resolve the parent referenced by `attribute`, an `FK` on entity `owner`.
///
/// Candidates are the other entities whose single primary key shares the
/// attribute's name. When several match, the candidates connected to `owner`
/// by a relationship are preferred.
///
/// # Examples
/// ```
/// use nar_core::{ForeignKeyTarget, national_address_register, resolve_foreign_key};
///
/// # fn main() -> Result<(), nar_core::ParseError> {
/// let diagram = national_address_register()?;
/// let location = diagram.entity("Location").expect("Location is declared");
/// let csd = location.attribute("CSD_ID").expect("CSD_ID is declared");
/// match resolve_foreign_key(&diagram, &location.name, csd) {
///     ForeignKeyTarget::Resolved { entity, .. } => assert_eq!(entity.name, "CensusSubdivision"),
///     other => panic!("unexpected target {other:?}"),
/// }
/// # Ok(())
/// # }
/// ```
pub fn resolve_foreign_key<'a>(
    diagram: &'a Diagram,
    owner: &str,
    attribute: &Attribute,
) -> ForeignKeyTarget<'a> {
    let candidates: Vec<(&'a Entity, &'a Attribute)> = unique_entities(diagram)
        .filter(|entity| entity.name != owner)
        .filter_map(|entity| {
            entity
                .single_primary_key()
                .filter(|key| key.name == attribute.name)
                .map(|key| (entity, key))
        })
        .collect();

    match candidates.as_slice() {
        [] => ForeignKeyTarget::Unresolved,
        &[(entity, key)] => ForeignKeyTarget::Resolved { entity, key },
        _ => {
            let connected: Vec<(&'a Entity, &'a Attribute)> = candidates
                .iter()
                .copied()
                .filter(|(entity, _)| diagram.relationship_between(owner, &entity.name).is_some())
                .collect();
            match connected.as_slice() {
                &[(entity, key)] => ForeignKeyTarget::Resolved { entity, key },
                _ => ForeignKeyTarget::Ambiguous(
                    candidates
                        .iter()
                        .map(|&(entity, _)| entity.name.as_str())
                        .collect(),
                ),
            }
        }
    }
}

/// First declaration of every entity name, in declaration order.
fn unique_entities(diagram: &Diagram) -> impl Iterator<Item = &Entity> {
    let mut seen = HashSet::new();
    diagram
        .entities
        .iter()
        .filter(move |entity| seen.insert(entity.name.as_str()))
}

/// Run every structural check over `diagram`.
///
/// # Examples
/// ```
/// use nar_core::{LintRule, lint_diagram, parse_diagram};
///
/// # fn main() -> Result<(), nar_core::ParseError> {
/// let diagram = parse_diagram(
///     "erDiagram\n  Address {\n    string ADDR_GUID PK\n    string LOC_GUID FK\n  }\n",
/// )?;
/// let report = lint_diagram(&diagram);
/// assert!(report.has_errors());
/// assert_eq!(report.by_rule(LintRule::UnresolvedForeignKey).count(), 1);
/// # Ok(())
/// # }
/// ```
pub fn lint_diagram(diagram: &Diagram) -> LintReport {
    let mut findings = Vec::new();
    check_entities(diagram, &mut findings);
    check_relationship_endpoints(diagram, &mut findings);
    check_foreign_keys(diagram, &mut findings);
    check_relationship_backing(diagram, &mut findings);
    check_orphans(diagram, &mut findings);
    findings.sort_by_key(|finding| finding.line);

    let report = LintReport { findings };
    debug!(
        "linted diagram: {} errors, {} warnings",
        report.errors().count(),
        report.warnings().count()
    );
    report
}

fn check_entities(diagram: &Diagram, findings: &mut Vec<LintFinding>) {
    let mut names = HashSet::new();
    for entity in &diagram.entities {
        if !names.insert(entity.name.as_str()) {
            findings.push(
                LintFinding::new(
                    LintRule::DuplicateEntity,
                    entity.line,
                    format!("entity {} is declared more than once", entity.name),
                )
                .on_entity(&entity.name),
            );
        }

        let mut attributes = HashSet::new();
        for attribute in &entity.attributes {
            if !attributes.insert(attribute.name.as_str()) {
                findings.push(
                    LintFinding::new(
                        LintRule::DuplicateAttribute,
                        attribute.line,
                        format!(
                            "attribute {} is declared more than once in {}",
                            attribute.name, entity.name
                        ),
                    )
                    .on_entity(&entity.name)
                    .on_attribute(&attribute.name),
                );
            }
        }

        match entity.primary_keys().count() {
            0 => findings.push(
                LintFinding::new(
                    LintRule::MissingPrimaryKey,
                    entity.line,
                    format!("entity {} has no PK attribute", entity.name),
                )
                .on_entity(&entity.name),
            ),
            1 => {}
            count => findings.push(
                LintFinding::new(
                    LintRule::CompositePrimaryKey,
                    entity.line,
                    format!(
                        "entity {} has a {count}-column primary key that foreign keys cannot reference by name",
                        entity.name
                    ),
                )
                .on_entity(&entity.name),
            ),
        }
    }
}

fn check_relationship_endpoints(diagram: &Diagram, findings: &mut Vec<LintFinding>) {
    for relationship in &diagram.relationships {
        let mut endpoints = vec![relationship.left.as_str()];
        if relationship.right != relationship.left {
            endpoints.push(relationship.right.as_str());
        }
        for name in endpoints {
            if !diagram.declares(name) {
                findings.push(
                    LintFinding::new(
                        LintRule::UndeclaredEntity,
                        relationship.line,
                        format!(
                            "relationship {:?} references undeclared entity {name}",
                            relationship.label
                        ),
                    )
                    .on_entity(name),
                );
            }
        }
    }
}

fn check_foreign_keys(diagram: &Diagram, findings: &mut Vec<LintFinding>) {
    for entity in unique_entities(diagram) {
        for attribute in entity.foreign_keys() {
            if let Some(finding) = check_foreign_key(diagram, entity, attribute) {
                findings.push(
                    finding
                        .on_entity(&entity.name)
                        .on_attribute(&attribute.name),
                );
            }
        }
    }
}

fn check_foreign_key(
    diagram: &Diagram,
    entity: &Entity,
    attribute: &Attribute,
) -> Option<LintFinding> {
    match resolve_foreign_key(diagram, &entity.name, attribute) {
        ForeignKeyTarget::Unresolved => Some(LintFinding::new(
            LintRule::UnresolvedForeignKey,
            attribute.line,
            format!(
                "{}.{} is marked FK but no other entity has a primary key named {}",
                entity.name, attribute.name, attribute.name
            ),
        )),
        ForeignKeyTarget::Ambiguous(candidates) => Some(LintFinding::new(
            LintRule::AmbiguousForeignKey,
            attribute.line,
            format!(
                "{}.{} matches the primary key of {}",
                entity.name,
                attribute.name,
                candidates.join(", ")
            ),
        )),
        ForeignKeyTarget::Resolved { entity: parent, key } => {
            if !key.data_type.eq_ignore_ascii_case(&attribute.data_type) {
                Some(LintFinding::new(
                    LintRule::ForeignKeyTypeMismatch,
                    attribute.line,
                    format!(
                        "{}.{} is {} but {}.{} is {}",
                        entity.name,
                        attribute.name,
                        attribute.data_type,
                        parent.name,
                        key.name,
                        key.data_type
                    ),
                ))
            } else if diagram
                .relationship_between(&entity.name, &parent.name)
                .is_none()
            {
                Some(LintFinding::new(
                    LintRule::ForeignKeyWithoutRelationship,
                    attribute.line,
                    format!(
                        "{}.{} references {} but no relationship connects them",
                        entity.name, attribute.name, parent.name
                    ),
                ))
            } else {
                None
            }
        }
    }
}

fn check_relationship_backing(diagram: &Diagram, findings: &mut Vec<LintFinding>) {
    for relationship in &diagram.relationships {
        let Some((parent, child)) = relationship.parent_child() else {
            continue;
        };
        let Some(child_entity) = diagram.entity(child) else {
            continue;
        };
        if !diagram.declares(parent) {
            continue;
        }
        let backed = child_entity.foreign_keys().any(|attribute| {
            matches!(
                resolve_foreign_key(diagram, child, attribute),
                ForeignKeyTarget::Resolved { entity, .. } if entity.name == parent
            )
        });
        if !backed {
            findings.push(
                LintFinding::new(
                    LintRule::RelationshipWithoutForeignKey,
                    relationship.line,
                    format!(
                        "{child} has no FK referencing {parent} for relationship {:?}",
                        relationship.label
                    ),
                )
                .on_entity(child),
            );
        }
    }
}

fn check_orphans(diagram: &Diagram, findings: &mut Vec<LintFinding>) {
    if diagram.relationships.is_empty() {
        return;
    }
    for entity in unique_entities(diagram) {
        if diagram.relationships_of(&entity.name).next().is_none() {
            findings.push(
                LintFinding::new(
                    LintRule::OrphanEntity,
                    entity.line,
                    format!("entity {} takes part in no relationship", entity.name),
                )
                .on_entity(&entity.name),
            );
        }
    }
}
