#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fmt;

use log::warn;
use rusqlite::{Connection, Error as SqliteError};
use thiserror::Error;

use super::ddl::quote_identifier;

/// A row whose foreign key has no matching parent row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyViolation {
    /// Child table holding the row.
    pub table: String,
    /// Row id of the offending row, absent for `WITHOUT ROWID` tables.
    pub rowid: Option<i64>,
    /// Parent table the key should resolve in.
    pub parent: String,
    /// Child column carrying the key, when SQLite reports it.
    pub column: Option<String>,
}

impl fmt::Display for ForeignKeyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table)?;
        if let Some(rowid) = self.rowid {
            write!(f, " row {rowid}")?;
        }
        if let Some(column) = &self.column {
            write!(f, " column {column}")?;
        }
        write!(f, " references a missing {} row", self.parent)
    }
}

/// Report every row whose foreign keys do not resolve.
///
/// The check uses `PRAGMA foreign_key_check`, so it also finds rows written
/// while enforcement was switched off. An empty result means the database is
/// consistent.
///
/// # Examples
/// ```
/// use nar_data::check_referential_integrity;
/// use rusqlite::Connection;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let conn = Connection::open_in_memory()?;
/// conn.execute_batch(
///     "PRAGMA foreign_keys = OFF;
///      CREATE TABLE Province (ProvinceCode TEXT PRIMARY KEY);
///      CREATE TABLE PostalCode (
///          PostalCode TEXT PRIMARY KEY,
///          ProvinceCode TEXT REFERENCES Province (ProvinceCode)
///      );
///      INSERT INTO PostalCode VALUES ('K1A0B1', '35');",
/// )?;
///
/// let violations = check_referential_integrity(&conn)?;
/// assert_eq!(violations.len(), 1);
/// assert_eq!(violations[0].parent, "Province");
/// assert_eq!(violations[0].column.as_deref(), Some("ProvinceCode"));
/// # Ok(())
/// # }
/// ```
pub fn check_referential_integrity(
    connection: &Connection,
) -> Result<Vec<ForeignKeyViolation>, IntegrityError> {
    let mut statement = connection
        .prepare("PRAGMA foreign_key_check")
        .map_err(|source| IntegrityError::Sqlite {
            operation: "prepare foreign key check",
            source,
        })?;
    let raw: Vec<(String, Option<i64>, String, i64)> = statement
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))
        .and_then(|rows| rows.collect())
        .map_err(|source| IntegrityError::Sqlite {
            operation: "run foreign key check",
            source,
        })?;

    let mut columns: HashMap<String, HashMap<i64, String>> = HashMap::new();
    let mut violations = Vec::with_capacity(raw.len());
    for (table, rowid, parent, constraint) in raw {
        if !columns.contains_key(&table) {
            let list = foreign_key_columns(connection, &table)?;
            columns.insert(table.clone(), list);
        }
        let column = columns
            .get(&table)
            .and_then(|list| list.get(&constraint))
            .cloned();
        let violation = ForeignKeyViolation {
            table,
            rowid,
            parent,
            column,
        };
        warn!("{violation}");
        violations.push(violation);
    }
    Ok(violations)
}

/// Map foreign-key constraint ids of `table` to their child column.
fn foreign_key_columns(
    connection: &Connection,
    table: &str,
) -> Result<HashMap<i64, String>, IntegrityError> {
    let sql = format!("PRAGMA foreign_key_list({})", quote_identifier(table));
    let mut statement = connection
        .prepare(&sql)
        .map_err(|source| IntegrityError::Sqlite {
            operation: "prepare foreign key list",
            source,
        })?;
    let rows: Vec<(i64, String)> = statement
        .query_map([], |row| Ok((row.get("id")?, row.get("from")?)))
        .and_then(|rows| rows.collect())
        .map_err(|source| IntegrityError::Sqlite {
            operation: "read foreign key list",
            source,
        })?;
    // Composite keys list one row per column; keep the first.
    let mut columns = HashMap::new();
    for (id, column) in rows {
        columns.entry(id).or_insert(column);
    }
    Ok(columns)
}

/// Errors raised when checking referential integrity.
#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("failed to {operation}")]
    Sqlite {
        operation: &'static str,
        #[source]
        source: SqliteError,
    },
}
