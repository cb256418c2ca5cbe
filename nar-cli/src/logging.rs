//! Stderr logging for the `nar` binary.

use flexi_logger::{Logger, LoggerHandle};

use crate::CliError;

/// Level used when `RUST_LOG` is unset.
const DEFAULT_LEVEL: &str = "warn";
/// Level forced by `--verbose`.
const VERBOSE_LEVEL: &str = "info";

/// Install the process logger.
///
/// `RUST_LOG` selects the level unless `verbose` is set. The returned handle
/// must be kept alive for as long as log records should be written.
pub(crate) fn init_logging(verbose: bool) -> Result<LoggerHandle, CliError> {
    let logger = if verbose {
        Logger::try_with_str(VERBOSE_LEVEL)?
    } else {
        Logger::try_with_env_or_str(DEFAULT_LEVEL)?
    };
    Ok(logger
        .log_to_stderr()
        .format(flexi_logger::default_format)
        .start()?)
}
