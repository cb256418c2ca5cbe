#![forbid(unsafe_code)]

use std::fmt;

use log::{debug, warn};
use nar_core::{
    Attribute, Diagram, Entity, ForeignKeyTarget, LintFinding, lint_diagram, resolve_foreign_key,
};
use thiserror::Error;

use super::schema::METADATA_TABLE;

/// SQLite column affinity chosen for a diagram type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqliteType {
    Integer,
    Real,
    Text,
    Blob,
}

impl SqliteType {
    /// Map a diagram type name onto a SQLite affinity.
    ///
    /// Matching ignores case and any parenthesised size, so `VARCHAR(36)`
    /// and `string` both become [`SqliteType::Text`].
    ///
    /// # Examples
    /// ```
    /// use nar_data::SqliteType;
    ///
    /// assert_eq!(SqliteType::from_data_type("int"), SqliteType::Integer);
    /// assert_eq!(SqliteType::from_data_type("Decimal(9,6)"), SqliteType::Real);
    /// assert_eq!(SqliteType::from_data_type("string"), SqliteType::Text);
    /// ```
    pub fn from_data_type(data_type: &str) -> Self {
        let base = data_type
            .split('(')
            .next()
            .unwrap_or(data_type)
            .trim()
            .to_ascii_lowercase();
        match base.as_str() {
            "int" | "integer" | "bigint" | "smallint" | "long" | "bool" | "boolean" => {
                Self::Integer
            }
            "float" | "double" | "decimal" | "real" | "number" => Self::Real,
            "blob" | "bytes" => Self::Blob,
            _ => Self::Text,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
        }
    }
}

impl fmt::Display for SqliteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parent column referenced by a foreign-key column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnReference {
    pub table: String,
    pub column: String,
}

/// A column of a planned table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    pub name: String,
    pub sqlite_type: SqliteType,
    /// Whether the column accepts `NULL`.
    pub nullable: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub references: Option<ColumnReference>,
}

/// A table derived from one diagram entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePlan {
    pub name: String,
    /// Columns in attribute declaration order.
    pub columns: Vec<ColumnPlan>,
}

impl TablePlan {
    /// Return the column named `name`.
    pub fn column(&self, name: &str) -> Option<&ColumnPlan> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Tables this table references, in column order.
    pub fn parents(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter_map(|column| column.references.as_ref())
            .map(|reference| reference.table.as_str())
    }

    fn primary_key_columns(&self) -> Vec<&ColumnPlan> {
        self.columns
            .iter()
            .filter(|column| column.primary_key)
            .collect()
    }

    /// Render the `CREATE TABLE` statement without a trailing semicolon.
    pub fn create_statement(&self) -> String {
        let primary_key = self.primary_key_columns();
        let inline_key = primary_key.len() == 1;
        let mut lines: Vec<String> = self
            .columns
            .iter()
            .map(|column| column_definition(column, inline_key))
            .collect();
        if primary_key.len() > 1 {
            let names: Vec<String> = primary_key
                .iter()
                .map(|column| quote_identifier(&column.name))
                .collect();
            lines.push(format!("PRIMARY KEY ({})", names.join(", ")));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            quote_identifier(&self.name),
            lines.join(",\n    ")
        )
    }

    /// Render the `DROP TABLE` statement without a trailing semicolon.
    pub fn drop_statement(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", quote_identifier(&self.name))
    }
}

fn column_definition(column: &ColumnPlan, inline_key: bool) -> String {
    let mut definition = format!("{} {}", quote_identifier(&column.name), column.sqlite_type);
    if column.primary_key && inline_key {
        definition.push_str(" PRIMARY KEY");
    }
    if !column.nullable {
        definition.push_str(" NOT NULL");
    }
    if column.unique && !(column.primary_key && inline_key) {
        definition.push_str(" UNIQUE");
    }
    if let Some(reference) = &column.references {
        definition.push_str(&format!(
            " REFERENCES {} ({})",
            quote_identifier(&reference.table),
            quote_identifier(&reference.column)
        ));
    }
    definition
}

/// Quote an SQL identifier, doubling embedded quotes.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQLite tables planned from a diagram, ordered parents first.
///
/// # Examples
/// ```
/// use nar_core::national_address_register;
/// use nar_data::SqliteSchema;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = SqliteSchema::from_diagram(&national_address_register()?)?;
/// let names: Vec<&str> = schema.tables().iter().map(|t| t.name.as_str()).collect();
/// assert_eq!(names.first(), Some(&"Province"));
/// assert_eq!(names.last(), Some(&"Address"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteSchema {
    title: Option<String>,
    tables: Vec<TablePlan>,
}

impl SqliteSchema {
    /// Plan the tables for `diagram`.
    ///
    /// The diagram is linted first and refused if any error is reported.
    /// Lint warnings are logged and otherwise ignored.
    pub fn from_diagram(diagram: &Diagram) -> Result<Self, DdlError> {
        let report = lint_diagram(diagram);
        if report.has_errors() {
            let findings: Vec<LintFinding> = report.errors().cloned().collect();
            return Err(DdlError::Lint {
                count: findings.len(),
                findings,
            });
        }
        for finding in report.warnings() {
            warn!("{finding}");
        }
        if let Some(entity) = diagram
            .entities
            .iter()
            .find(|entity| is_reserved_table_name(&entity.name))
        {
            return Err(DdlError::ReservedName {
                table: entity.name.clone(),
            });
        }

        let plans = diagram
            .entities
            .iter()
            .map(|entity| plan_table(diagram, entity))
            .collect();
        let tables = order_parents_first(plans)?;
        debug!("planned {} SQLite tables", tables.len());
        Ok(Self {
            title: diagram.title.clone(),
            tables,
        })
    }

    /// Diagram title, recorded alongside the materialised tables.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Planned tables, parents before children.
    pub fn tables(&self) -> &[TablePlan] {
        &self.tables
    }

    /// Return the planned table named `name`.
    pub fn table(&self, name: &str) -> Option<&TablePlan> {
        self.tables.iter().find(|table| table.name == name)
    }

    /// `CREATE TABLE` statements, parents first.
    pub fn create_statements(&self) -> Vec<String> {
        self.tables.iter().map(TablePlan::create_statement).collect()
    }

    /// `DROP TABLE` statements, children first.
    pub fn drop_statements(&self) -> Vec<String> {
        self.tables
            .iter()
            .rev()
            .map(TablePlan::drop_statement)
            .collect()
    }

    /// Render the whole schema as an SQL script.
    pub fn render_sql(&self) -> String {
        let mut sql = String::new();
        if let Some(title) = &self.title {
            sql.push_str(&format!("-- {title}\n\n"));
        }
        let statements: Vec<String> = self
            .create_statements()
            .into_iter()
            .map(|statement| format!("{statement};\n"))
            .collect();
        sql.push_str(&statements.join("\n"));
        sql
    }
}

fn plan_table(diagram: &Diagram, entity: &Entity) -> TablePlan {
    TablePlan {
        name: entity.name.clone(),
        columns: entity
            .attributes
            .iter()
            .map(|attribute| plan_column(diagram, entity, attribute))
            .collect(),
    }
}

fn plan_column(diagram: &Diagram, entity: &Entity, attribute: &Attribute) -> ColumnPlan {
    let references = if attribute.is_foreign_key() {
        match resolve_foreign_key(diagram, &entity.name, attribute) {
            ForeignKeyTarget::Resolved { entity: parent, key } => Some(ColumnReference {
                table: parent.name.clone(),
                column: key.name.clone(),
            }),
            ForeignKeyTarget::Unresolved | ForeignKeyTarget::Ambiguous(_) => None,
        }
    } else {
        None
    };
    let mandatory = match &references {
        Some(reference) if !attribute.is_marked_optional() => {
            parent_is_mandatory(diagram, &entity.name, &reference.table)
        }
        _ => false,
    };

    ColumnPlan {
        name: attribute.name.clone(),
        sqlite_type: SqliteType::from_data_type(&attribute.data_type),
        nullable: !(attribute.is_primary_key() || mandatory),
        primary_key: attribute.is_primary_key(),
        unique: attribute.is_unique(),
        references,
    }
}

/// A child row needs a parent when the parent end reads `||` or `}|`.
fn parent_is_mandatory(diagram: &Diagram, child: &str, parent: &str) -> bool {
    diagram
        .relationship_between(child, parent)
        .and_then(|relationship| relationship.cardinality_of(parent))
        .is_some_and(|cardinality| !cardinality.is_optional())
}

/// SQLite owns the `sqlite_` prefix; the metadata table is ours.
fn is_reserved_table_name(name: &str) -> bool {
    let lowered = name.to_ascii_lowercase();
    lowered.starts_with("sqlite_") || lowered == METADATA_TABLE
}

/// Kahn-style ordering that always takes the earliest declared ready table.
fn order_parents_first(mut pending: Vec<TablePlan>) -> Result<Vec<TablePlan>, DdlError> {
    let mut ordered: Vec<TablePlan> = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let ready = pending.iter().position(|table| {
            table
                .parents()
                .all(|parent| ordered.iter().any(|done| done.name == parent))
        });
        match ready {
            Some(index) => ordered.push(pending.remove(index)),
            None => {
                return Err(DdlError::ReferenceCycle {
                    entities: pending.into_iter().map(|table| table.name).collect(),
                });
            }
        }
    }
    Ok(ordered)
}

/// Errors raised when planning SQLite tables from a diagram.
#[derive(Debug, Error)]
pub enum DdlError {
    #[error("diagram has {count} lint error(s); run the linter for details")]
    Lint {
        count: usize,
        findings: Vec<LintFinding>,
    },
    #[error("foreign keys form a cycle between {}", .entities.join(", "))]
    ReferenceCycle { entities: Vec<String> },
    #[error("table name '{table}' is reserved by SQLite or the register metadata")]
    ReservedName { table: String },
}
