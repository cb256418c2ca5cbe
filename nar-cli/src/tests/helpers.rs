//! Test helpers for temporary diagram files and CLI invocations.

use super::*;
use camino::Utf8PathBuf;
use std::fs;
use tempfile::TempDir;

/// A diagram whose `Address` references an undeclared `Location`.
pub(super) const DANGLING_DIAGRAM: &str = "erDiagram
  Address {
    string ADDR_GUID PK
    string LOC_GUID FK
  }
";

pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root =
            Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    pub(super) fn write(&self, name: &str, contents: &str) -> Utf8PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).expect("write workspace file");
        path
    }
}

/// Parse `args` as a `nar` invocation and run it, capturing stdout.
pub(super) fn run_cli(args: &[&str]) -> (Result<(), CliError>, String) {
    let mut invocation = vec!["nar"];
    invocation.extend_from_slice(args);
    let mut output = Vec::new();
    let result = Cli::try_parse_from(invocation)
        .map_err(CliError::ArgumentParsing)
        .and_then(|cli| dispatch(cli.command, &mut output));
    let text = String::from_utf8(output).expect("utf-8 output");
    (result, text)
}
