//! SQLite storage for the National Address Register.
//!
//! Responsibilities:
//! - Turn a linted [`nar_core::Diagram`] into SQLite DDL.
//! - Create the register tables inside a database file.
//! - Load the fixed lookup rows and verify referential integrity.
//!
//! Boundaries:
//! - Do not parse or lint diagrams (lives in `nar-core`).
//! - Do not load address extracts; tables are created empty apart from the
//!   lookup rows.
//!
//! Invariants:
//! - Every write runs inside a single transaction.
//! - Foreign-key enforcement is enabled on every connection this crate opens.

pub mod store;

pub use store::{
    ColumnPlan, ColumnReference, DdlError, ForeignKeyViolation, IntegrityError,
    MaterialiseOptions, SchemaError, SeedError, SeedSummary, SqliteSchema, SqliteType, TablePlan,
    check_referential_integrity, materialise_schema, materialise_schema_to_path, schema_title,
    seed_reference_data,
};
