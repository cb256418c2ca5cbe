//! Schema model and tooling for the National Address Register.
//!
//! The crate reads the declarative entity-relationship notation the register
//! schema is written in, checks it for structural consistency, and writes it
//! back in canonical form. It also carries the register's own diagram and the
//! fixed rows of its lookup tables.
//!
//! Responsibilities:
//! - Model diagrams as plain data ([`Diagram`], [`Entity`], [`Relationship`]).
//! - Parse and render the diagram notation.
//! - Lint diagrams: key uniqueness, declared endpoints, FK to PK resolution.
//!
//! Boundaries:
//! - No database access (lives in `nar-data`).
//! - No file system access; callers hand over text.

pub mod diagram;
pub mod lint;
pub mod parser;
pub mod reference;
pub mod register;
pub mod render;

pub use diagram::{
    Attribute, Cardinality, Diagram, Entity, KeyKind, OPTIONAL_COMMENT, Relationship,
};
pub use lint::{
    ForeignKeyTarget, LintFinding, LintReport, LintRule, Severity, lint_diagram,
    resolve_foreign_key,
};
pub use parser::{ParseError, is_identifier, parse_diagram};
pub use reference::{BUILDING_USAGES, BuildingUsage, PROVINCES, Province};
pub use register::{NATIONAL_ADDRESS_REGISTER_SOURCE, national_address_register};
pub use render::render_diagram;
