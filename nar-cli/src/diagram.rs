//! Diagram commands: `lint`, `render` and `ddl`.

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, ValueEnum};
use log::info;
use nar_core::{Diagram, LintReport, lint_diagram, national_address_register, parse_diagram};
use nar_data::SqliteSchema;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::{ARG_DIAGRAM, CliError, require_existing, write_text};

const BUNDLED_ORIGIN: &str = "bundled National Address Register diagram";

/// How `lint` prints its findings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum OutputFormat {
    /// One finding per line followed by a summary.
    #[default]
    Text,
    /// The full report as pretty-printed JSON.
    Json,
}

/// CLI arguments for the `lint` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Check a diagram for duplicate names, missing primary keys, \
                 undeclared relationship endpoints and foreign keys that do \
                 not match a primary key. The bundled register diagram is \
                 used when no path is given.",
    about = "Check a diagram for structural problems"
)]
#[ortho_config(prefix = "NAR")]
pub(crate) struct LintArgs {
    /// Path to the diagram file.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) diagram: Option<Utf8PathBuf>,
    /// Output format.
    #[arg(long, value_enum, value_name = "format")]
    #[serde(default)]
    pub(crate) format: Option<OutputFormat>,
}

/// CLI arguments for the `render` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "Print a diagram in canonical form")]
#[ortho_config(prefix = "NAR")]
pub(crate) struct RenderArgs {
    /// Path to the diagram file.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) diagram: Option<Utf8PathBuf>,
}

/// CLI arguments for the `ddl` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "Print the SQLite DDL for a diagram")]
#[ortho_config(prefix = "NAR")]
pub(crate) struct DdlArgs {
    /// Path to the diagram file.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) diagram: Option<Utf8PathBuf>,
}

/// Resolved `lint` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LintConfig {
    /// Diagram to lint; `None` selects the bundled register.
    pub(crate) diagram: Option<Utf8PathBuf>,
    pub(crate) format: OutputFormat,
}

impl From<LintArgs> for LintConfig {
    fn from(args: LintArgs) -> Self {
        Self {
            diagram: args.diagram,
            format: args.format.unwrap_or_default(),
        }
    }
}

pub(crate) fn resolve_lint_config(args: LintArgs) -> Result<LintConfig, CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = LintConfig::from(merged);
    if let Some(path) = &config.diagram {
        require_existing(path, ARG_DIAGRAM)?;
    }
    Ok(config)
}

fn resolve_diagram_path(diagram: Option<Utf8PathBuf>) -> Result<Option<Utf8PathBuf>, CliError> {
    if let Some(path) = &diagram {
        require_existing(path, ARG_DIAGRAM)?;
    }
    Ok(diagram)
}

/// Read and parse the diagram at `path`, or the bundled register when `None`.
pub(crate) fn load_diagram(path: Option<&Utf8Path>) -> Result<Diagram, CliError> {
    let Some(path) = path else {
        return national_address_register().map_err(|source| CliError::ParseDiagram {
            origin: BUNDLED_ORIGIN.to_owned(),
            source,
        });
    };
    let text = nar_fs::read_utf8_to_string(path).map_err(|source| CliError::ReadDiagram {
        path: path.to_path_buf(),
        source,
    })?;
    let diagram = parse_diagram(&text).map_err(|source| CliError::ParseDiagram {
        origin: path.to_string(),
        source,
    })?;
    info!(
        "parsed {path}: {} entities, {} relationships",
        diagram.entities.len(),
        diagram.relationships.len()
    );
    Ok(diagram)
}

pub(crate) fn run_lint(args: LintArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = resolve_lint_config(args)?;
    let diagram = load_diagram(config.diagram.as_deref())?;
    let report = lint_diagram(&diagram);
    write_report(writer, &report, config.format)?;
    let errors = report.errors().count();
    if errors > 0 {
        return Err(CliError::LintFailed { errors });
    }
    Ok(())
}

fn write_report(
    writer: &mut dyn Write,
    report: &LintReport,
    format: OutputFormat,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload =
                serde_json::to_string_pretty(report).map_err(CliError::SerialiseOutput)?;
            write_text(writer, &payload)?;
            write_text(writer, "\n")
        }
        OutputFormat::Text => {
            if report.is_clean() {
                return write_text(writer, "no findings\n");
            }
            for finding in &report.findings {
                write_text(writer, &format!("{finding}\n"))?;
            }
            write_text(
                writer,
                &format!(
                    "{} error(s), {} warning(s)\n",
                    report.errors().count(),
                    report.warnings().count()
                ),
            )
        }
    }
}

pub(crate) fn run_render(args: RenderArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let path = resolve_diagram_path(merged.diagram)?;
    let diagram = load_diagram(path.as_deref())?;
    write_text(writer, &diagram.to_string())
}

pub(crate) fn run_ddl(args: DdlArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let path = resolve_diagram_path(merged.diagram)?;
    let diagram = load_diagram(path.as_deref())?;
    let schema = SqliteSchema::from_diagram(&diagram)?;
    write_text(writer, &schema.render_sql())
}
