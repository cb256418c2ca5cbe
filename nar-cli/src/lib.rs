//! Command-line interface for the National Address Register schema tools.
#![forbid(unsafe_code)]

use camino::Utf8Path;
use clap::{Parser, Subcommand};
use std::io::Write;

mod database;
mod diagram;
mod error;
mod logging;

pub use error::CliError;

use database::{CheckArgs, MaterialiseArgs};
use diagram::{DdlArgs, LintArgs, RenderArgs};

pub(crate) const ARG_DIAGRAM: &str = "diagram";
pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const ENV_MATERIALISE_DATABASE: &str = "NAR_CMDS_MATERIALISE_DATABASE";
pub(crate) const ENV_CHECK_DATABASE: &str = "NAR_CMDS_CHECK_DATABASE";

/// Run the `nar` CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let _logger = logging::init_logging(cli.verbose)?;
    let mut stdout = std::io::stdout().lock();
    dispatch(cli.command, &mut stdout)
}

fn dispatch(command: Command, writer: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Lint(args) => diagram::run_lint(args, writer),
        Command::Render(args) => diagram::run_render(args, writer),
        Command::Ddl(args) => diagram::run_ddl(args, writer),
        Command::Materialise(args) => database::run_materialise(args, writer),
        Command::Check(args) => database::run_check(args, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "nar",
    about = "Lint, render and materialise the National Address Register schema",
    version
)]
struct Cli {
    /// Log progress to stderr (overrides RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check a diagram for structural problems.
    Lint(LintArgs),
    /// Print a diagram in canonical form.
    Render(RenderArgs),
    /// Print the SQLite DDL for a diagram.
    Ddl(DdlArgs),
    /// Create the diagram's tables in a SQLite database.
    Materialise(MaterialiseArgs),
    /// Report rows whose foreign keys do not resolve.
    Check(CheckArgs),
}

/// Require `path` to name an existing regular file.
pub(crate) fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match nar_fs::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub(crate) fn write_text(writer: &mut dyn Write, text: &str) -> Result<(), CliError> {
    writer
        .write_all(text.as_bytes())
        .map_err(CliError::WriteOutput)
}

#[cfg(test)]
mod tests;
