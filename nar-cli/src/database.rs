//! Database commands: `materialise` and `check`.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::{debug, info, warn};
use nar_data::{
    MaterialiseOptions, SqliteSchema, check_referential_integrity, materialise_schema,
    schema_title, seed_reference_data,
};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::diagram::load_diagram;
use crate::{
    ARG_DATABASE, ARG_DIAGRAM, CliError, ENV_CHECK_DATABASE, ENV_MATERIALISE_DATABASE,
    require_existing, write_text,
};

/// CLI arguments for the `materialise` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Create the tables described by a diagram inside a SQLite \
                 database file. Tables are ordered so parents exist before \
                 the tables that reference them. The bundled register \
                 diagram is used when no diagram is given.",
    about = "Create the diagram's tables in a SQLite database"
)]
#[ortho_config(prefix = "NAR")]
pub(crate) struct MaterialiseArgs {
    /// Path of the SQLite database to create.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Path to the diagram file.
    #[arg(long = ARG_DIAGRAM, value_name = "path")]
    #[serde(default)]
    pub(crate) diagram: Option<Utf8PathBuf>,
    /// Insert the province and building usage lookup rows.
    #[arg(long)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) seed_reference_data: bool,
    /// Drop and recreate tables in an existing database.
    #[arg(long)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) replace: bool,
}

impl MaterialiseArgs {
    fn into_config(self) -> Result<MaterialiseConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        MaterialiseConfig::try_from(merged)
    }
}

/// Resolved `materialise` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MaterialiseConfig {
    pub(crate) database: Utf8PathBuf,
    /// Diagram to materialise; `None` selects the bundled register.
    pub(crate) diagram: Option<Utf8PathBuf>,
    pub(crate) seed_reference_data: bool,
    pub(crate) replace: bool,
}

impl MaterialiseConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        if let Some(diagram) = &self.diagram {
            require_existing(diagram, ARG_DIAGRAM)?;
        }
        self.validate_target()
    }

    fn validate_target(&self) -> Result<(), CliError> {
        match nar_fs::file_is_file(&self.database) {
            Ok(true) if self.replace => Ok(()),
            Ok(true) => Err(CliError::DatabaseExists {
                path: self.database.clone(),
            }),
            Ok(false) => Err(CliError::SourcePathNotFile {
                field: ARG_DATABASE,
                path: self.database.clone(),
            }),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CliError::InspectSourcePath {
                field: ARG_DATABASE,
                path: self.database.clone(),
                source,
            }),
        }
    }
}

impl TryFrom<MaterialiseArgs> for MaterialiseConfig {
    type Error = CliError;

    fn try_from(args: MaterialiseArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_MATERIALISE_DATABASE,
        })?;
        Ok(Self {
            database,
            diagram: args.diagram,
            seed_reference_data: args.seed_reference_data,
            replace: args.replace,
        })
    }
}

pub(crate) fn resolve_materialise_config(
    args: MaterialiseArgs,
) -> Result<MaterialiseConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}

pub(crate) fn run_materialise(
    args: MaterialiseArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = resolve_materialise_config(args)?;
    materialise(&config, writer)
}

pub(crate) fn materialise(
    config: &MaterialiseConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let diagram = load_diagram(config.diagram.as_deref())?;
    let schema = SqliteSchema::from_diagram(&diagram)?;

    nar_fs::ensure_parent_dir(&config.database).map_err(|source| {
        CliError::CreateDatabaseDirectory {
            path: config.database.clone(),
            source,
        }
    })?;
    let newly_created = matches!(
        nar_fs::file_is_file(&config.database),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound
    );
    let mut connection =
        Connection::open(config.database.as_std_path()).map_err(|source| {
            CliError::OpenDatabase {
                path: config.database.clone(),
                source,
            }
        })?;
    let options = MaterialiseOptions {
        replace: config.replace,
    };
    if let Err(source) = materialise_schema(&mut connection, &schema, options) {
        drop(connection);
        if newly_created {
            discard_database(&config.database);
        }
        return Err(CliError::Materialise {
            path: config.database.clone(),
            source,
        });
    }
    write_text(
        writer,
        &format!(
            "created {} tables in {}\n",
            schema.tables().len(),
            config.database
        ),
    )?;

    if config.seed_reference_data {
        let summary = seed_reference_data(&mut connection).map_err(|source| CliError::Seed {
            path: config.database.clone(),
            source,
        })?;
        write_text(
            writer,
            &format!(
                "seeded {} provinces and {} building usages\n",
                summary.provinces, summary.building_usages
            ),
        )?;
    }
    Ok(())
}

/// Remove a database file this run created, so a retry is not refused.
fn discard_database(path: &Utf8Path) {
    match nar_fs::remove_file(path) {
        Ok(()) => debug!("removed partially created database {path}"),
        Err(err) => warn!("failed to remove partially created database {path}: {err}"),
    }
}

/// CLI arguments for the `check` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "Report rows whose foreign keys do not resolve")]
#[ortho_config(prefix = "NAR")]
pub(crate) struct CheckArgs {
    /// Path of the SQLite database to check.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

/// Resolved `check` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CheckConfig {
    pub(crate) database: Utf8PathBuf,
}

impl TryFrom<CheckArgs> for CheckConfig {
    type Error = CliError;

    fn try_from(args: CheckArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_CHECK_DATABASE,
        })?;
        Ok(Self { database })
    }
}

pub(crate) fn resolve_check_config(args: CheckArgs) -> Result<CheckConfig, CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = CheckConfig::try_from(merged)?;
    require_existing(&config.database, ARG_DATABASE)?;
    Ok(config)
}

pub(crate) fn run_check(args: CheckArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = resolve_check_config(args)?;
    check(&config.database, writer)
}

pub(crate) fn check(database: &Utf8Path, writer: &mut dyn Write) -> Result<(), CliError> {
    let connection = Connection::open_with_flags(
        database.as_std_path(),
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|source| CliError::OpenDatabase {
        path: database.to_path_buf(),
        source,
    })?;
    match schema_title(&connection) {
        Ok(Some(title)) => info!("checking {database} ({title})"),
        Ok(None) => info!("checking {database}"),
        Err(err) => debug!("failed to read schema title from {database}: {err}"),
    }

    let violations =
        check_referential_integrity(&connection).map_err(|source| CliError::Integrity {
            path: database.to_path_buf(),
            source,
        })?;
    if violations.is_empty() {
        return write_text(writer, "all foreign keys resolve\n");
    }
    for violation in &violations {
        write_text(writer, &format!("{violation}\n"))?;
    }
    Err(CliError::IntegrityViolations {
        count: violations.len(),
    })
}

#[cfg(test)]
pub(crate) fn materialise_config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<MaterialiseConfig, CliError> {
    let merged = MaterialiseArgs::merge_from_layers(layers).map_err(CliError::from)?;
    MaterialiseConfig::try_from(merged)
}
