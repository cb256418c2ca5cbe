//! Materialisation of register diagrams into SQLite databases.
//!
//! The module is split into focused submodules:
//! - [`ddl`] plans tables and renders `CREATE TABLE` statements.
//! - [`schema`] applies a plan to a connection.
//! - [`seed`] inserts the province and building usage lookup rows.
//! - [`integrity`] reports rows whose foreign keys do not resolve.
#![forbid(unsafe_code)]

mod ddl;
mod integrity;
mod schema;
mod seed;

pub use ddl::{ColumnPlan, ColumnReference, DdlError, SqliteSchema, SqliteType, TablePlan};
pub use integrity::{ForeignKeyViolation, IntegrityError, check_referential_integrity};
pub use schema::{
    MaterialiseOptions, SchemaError, materialise_schema, materialise_schema_to_path,
    schema_title,
};
pub use seed::{SeedError, SeedSummary, seed_reference_data};

#[cfg(test)]
mod tests;
