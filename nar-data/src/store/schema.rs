#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use log::{debug, info};
use rusqlite::{Connection, Error as SqliteError, OptionalExtension, Transaction};
use thiserror::Error;

use super::ddl::SqliteSchema;

/// Table holding facts about the materialised diagram.
pub const METADATA_TABLE: &str = "nar_schema_metadata";

/// How [`materialise_schema`] treats tables that already exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterialiseOptions {
    /// Drop the planned tables, children first, before creating them.
    pub replace: bool,
}

/// Create the planned tables inside an existing SQLite database.
///
/// The function enables foreign keys and applies every statement inside one
/// transaction, so a failure leaves the database untouched. Tables that
/// already exist are kept unless [`MaterialiseOptions::replace`] is set. The
/// diagram title is recorded in the `nar_schema_metadata` table.
///
/// # Examples
/// ```
/// use nar_core::national_address_register;
/// use nar_data::{MaterialiseOptions, SqliteSchema, materialise_schema};
/// use rusqlite::Connection;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = SqliteSchema::from_diagram(&national_address_register()?)?;
/// let mut conn = Connection::open_in_memory()?;
/// materialise_schema(&mut conn, &schema, MaterialiseOptions::default())?;
///
/// let tables: i64 = conn.query_row(
///     "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name != 'nar_schema_metadata'",
///     [],
///     |row| row.get(0),
/// )?;
/// assert_eq!(tables, 6);
/// # Ok(())
/// # }
/// ```
pub fn materialise_schema(
    connection: &mut Connection,
    schema: &SqliteSchema,
    options: MaterialiseOptions,
) -> Result<(), SchemaError> {
    connection
        .pragma_update(None, "foreign_keys", true)
        .map_err(|source| SchemaError::ForeignKeys { source })?;

    let transaction = connection
        .transaction()
        .map_err(|source| SchemaError::Migration {
            step: "begin schema transaction".into(),
            source,
        })?;

    if options.replace {
        for (table, statement) in schema.tables().iter().rev().zip(schema.drop_statements()) {
            run_migration_step(&transaction, format!("drop {}", table.name), &statement)?;
        }
    }
    for (table, statement) in schema.tables().iter().zip(schema.create_statements()) {
        run_migration_step(&transaction, format!("create {}", table.name), &statement)?;
    }
    record_metadata(&transaction, schema)?;

    transaction
        .commit()
        .map_err(|source| SchemaError::Migration {
            step: "commit schema transaction".into(),
            source,
        })?;

    info!("materialised {} tables", schema.tables().len());
    Ok(())
}

/// Open the database at `path`, creating it if needed, and materialise `schema`.
pub fn materialise_schema_to_path<P: AsRef<Path>>(
    path: P,
    schema: &SqliteSchema,
    options: MaterialiseOptions,
) -> Result<(), SchemaError> {
    let mut connection = Connection::open(path.as_ref()).map_err(|source| SchemaError::Open {
        path: path.as_ref().to_path_buf(),
        source,
    })?;
    materialise_schema(&mut connection, schema, options)
}

/// Read the diagram title recorded by [`materialise_schema`].
///
/// Returns `None` when the database was not materialised by this crate or the
/// diagram had no title.
pub fn schema_title(connection: &Connection) -> Result<Option<String>, SchemaError> {
    let has_metadata: bool = connection
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [METADATA_TABLE],
            |row| row.get(0),
        )
        .map_err(|source| SchemaError::Migration {
            step: "look up metadata table".into(),
            source,
        })?;
    if !has_metadata {
        return Ok(None);
    }

    connection
        .query_row(
            "SELECT value FROM nar_schema_metadata WHERE key = 'title'",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| SchemaError::Migration {
            step: "read schema title".into(),
            source,
        })
}

fn record_metadata(transaction: &Transaction<'_>, schema: &SqliteSchema) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create metadata table".into(),
        "CREATE TABLE IF NOT EXISTS nar_schema_metadata (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            recorded_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let Some(title) = schema.title() else {
        return run_migration_step(
            transaction,
            "clear schema title".into(),
            "DELETE FROM nar_schema_metadata WHERE key = 'title'",
        );
    };
    transaction
        .execute(
            "INSERT OR REPLACE INTO nar_schema_metadata (key, value) VALUES ('title', ?1)",
            [title],
        )
        .map_err(|source| SchemaError::Migration {
            step: "record schema title".into(),
            source,
        })?;
    Ok(())
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: String,
    sql: &str,
) -> Result<(), SchemaError> {
    debug!("{step}");
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| SchemaError::Migration { step, source })
}

/// Errors raised when materialising a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to open SQLite database at {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: SqliteError,
    },
    #[error("failed to enable SQLite foreign keys")]
    ForeignKeys {
        #[source]
        source: SqliteError,
    },
    #[error("failed to execute migration step '{step}'")]
    Migration {
        step: String,
        #[source]
        source: SqliteError,
    },
}
