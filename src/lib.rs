//! Facade crate for the National Address Register schema tools.
//!
//! This crate re-exports the diagram model, parser, linter and reference data,
//! and exposes SQLite materialisation behind the `store-sqlite` feature.

#![forbid(unsafe_code)]

pub use nar_core::{
    Attribute, BUILDING_USAGES, BuildingUsage, Cardinality, Diagram, Entity, ForeignKeyTarget,
    KeyKind, LintFinding, LintReport, LintRule, NATIONAL_ADDRESS_REGISTER_SOURCE, PROVINCES,
    ParseError, Province, Relationship, Severity, lint_diagram, national_address_register,
    parse_diagram, reference, render_diagram, resolve_foreign_key,
};

#[cfg(feature = "store-sqlite")]
pub use nar_data::{
    DdlError, ForeignKeyViolation, IntegrityError, MaterialiseOptions, SchemaError, SeedError,
    SeedSummary, SqliteSchema, check_referential_integrity, materialise_schema,
    materialise_schema_to_path, seed_reference_data,
};
