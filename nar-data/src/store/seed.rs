#![forbid(unsafe_code)]

use log::info;
use nar_core::{BUILDING_USAGES, PROVINCES};
use rusqlite::{Connection, Error as SqliteError, Transaction};
use thiserror::Error;

/// Rows inserted by [`seed_reference_data`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub provinces: usize,
    pub building_usages: usize,
}

impl SeedSummary {
    /// Total number of inserted rows.
    pub const fn total(&self) -> usize {
        self.provinces + self.building_usages
    }
}

/// Insert the fixed `Province` and `BuildingUsage` rows.
///
/// Rows whose key already exists are left untouched, so seeding twice is
/// harmless; the summary only counts rows that were actually inserted.
///
/// # Examples
/// ```
/// use nar_core::national_address_register;
/// use nar_data::{MaterialiseOptions, SqliteSchema, materialise_schema, seed_reference_data};
/// use rusqlite::Connection;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = SqliteSchema::from_diagram(&national_address_register()?)?;
/// let mut conn = Connection::open_in_memory()?;
/// materialise_schema(&mut conn, &schema, MaterialiseOptions::default())?;
///
/// let first = seed_reference_data(&mut conn)?;
/// assert_eq!((first.provinces, first.building_usages), (13, 4));
/// assert_eq!(seed_reference_data(&mut conn)?.total(), 0);
/// # Ok(())
/// # }
/// ```
pub fn seed_reference_data(connection: &mut Connection) -> Result<SeedSummary, SeedError> {
    for table in ["Province", "BuildingUsage"] {
        ensure_table(connection, table)?;
    }

    let transaction = connection
        .transaction()
        .map_err(|source| SeedError::Sqlite {
            operation: "begin seed transaction",
            source,
        })?;
    let summary = SeedSummary {
        provinces: insert_provinces(&transaction)?,
        building_usages: insert_building_usages(&transaction)?,
    };
    transaction.commit().map_err(|source| SeedError::Sqlite {
        operation: "commit seed transaction",
        source,
    })?;

    info!(
        "seeded {} provinces and {} building usages",
        summary.provinces, summary.building_usages
    );
    Ok(summary)
}

fn ensure_table(connection: &Connection, table: &'static str) -> Result<(), SeedError> {
    let exists: bool = connection
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [table],
            |row| row.get(0),
        )
        .map_err(|source| SeedError::Sqlite {
            operation: "look up seed tables",
            source,
        })?;
    if exists {
        Ok(())
    } else {
        Err(SeedError::MissingTable { table })
    }
}

fn insert_provinces(transaction: &Transaction<'_>) -> Result<usize, SeedError> {
    let mut insert = transaction
        .prepare_cached(
            "INSERT OR IGNORE INTO \"Province\"
                (\"ProvinceCode\", \"ProvinceAbbreviation\", \"Description_English\", \"Description_Francais\")
             VALUES (?1, ?2, ?3, ?4)",
        )
        .map_err(|source| SeedError::Sqlite {
            operation: "prepare insert province",
            source,
        })?;
    let mut inserted = 0;
    for province in &PROVINCES {
        inserted += insert
            .execute([
                province.code,
                province.abbreviation,
                province.name_en,
                province.name_fr,
            ])
            .map_err(|source| SeedError::Sqlite {
                operation: "insert province",
                source,
            })?;
    }
    Ok(inserted)
}

fn insert_building_usages(transaction: &Transaction<'_>) -> Result<usize, SeedError> {
    let mut insert = transaction
        .prepare_cached(
            "INSERT OR IGNORE INTO \"BuildingUsage\"
                (\"BU_USE\", \"Description_English\", \"Description_Francais\")
             VALUES (?1, ?2, ?3)",
        )
        .map_err(|source| SeedError::Sqlite {
            operation: "prepare insert building usage",
            source,
        })?;
    let mut inserted = 0;
    for usage in &BUILDING_USAGES {
        inserted += insert
            .execute([usage.code, usage.description_en, usage.description_fr])
            .map_err(|source| SeedError::Sqlite {
                operation: "insert building usage",
                source,
            })?;
    }
    Ok(inserted)
}

/// Errors raised when seeding lookup rows.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("table {table} is missing; materialise the schema before seeding")]
    MissingTable { table: &'static str },
    #[error("failed to seed {operation}")]
    Sqlite {
        operation: &'static str,
        #[source]
        source: SqliteError,
    },
}
