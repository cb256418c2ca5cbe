//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use nar_cli::CliError;

fn main() {
    match nar_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("nar: {err}");
            std::process::exit(1);
        }
    }
}
