//! Error types emitted by the `nar` CLI.
//!
//! Keep this error type reasonably small, as every command helper returns
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use nar_core::ParseError;
use nar_data::{DdlError, IntegrityError, SchemaError, SeedError};
use thiserror::Error;

/// Errors emitted by the `nar` CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// The stderr logger could not be installed.
    #[error("failed to start logging: {0}")]
    Logging(#[from] flexi_logger::FlexiLoggerError),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist or is not a file")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Reading the diagram file failed.
    #[error("failed to read diagram at {path:?}: {source}")]
    ReadDiagram {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The diagram text is not valid notation.
    #[error("failed to parse {origin}: {source}")]
    ParseDiagram {
        origin: String,
        #[source]
        source: ParseError,
    },
    /// Linting reported errors.
    #[error("diagram has {errors} lint error(s)")]
    LintFailed { errors: usize },
    /// The diagram could not be turned into SQLite tables.
    #[error("cannot plan SQLite schema: {0}")]
    Ddl(#[from] DdlError),
    /// The target database already exists and `--replace` was not given.
    #[error("database {path:?} already exists (pass --replace to rebuild it)")]
    DatabaseExists { path: Utf8PathBuf },
    /// Creating the database's parent directory failed.
    #[error("failed to create directory for {path:?}: {source}")]
    CreateDatabaseDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Opening an existing database failed.
    #[error("failed to open SQLite database at {path:?}: {source}")]
    OpenDatabase {
        path: Utf8PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    /// Creating the tables failed.
    #[error("failed to materialise schema into {path:?}: {source}")]
    Materialise {
        path: Utf8PathBuf,
        #[source]
        source: SchemaError,
    },
    /// Inserting the lookup rows failed.
    #[error("failed to seed reference data into {path:?}: {source}")]
    Seed {
        path: Utf8PathBuf,
        #[source]
        source: SeedError,
    },
    /// Running the integrity check failed.
    #[error("failed to check {path:?}: {source}")]
    Integrity {
        path: Utf8PathBuf,
        #[source]
        source: IntegrityError,
    },
    /// The integrity check found dangling foreign keys.
    #[error("database has {count} foreign key violation(s)")]
    IntegrityViolations { count: usize },
    /// Serialising JSON output failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
