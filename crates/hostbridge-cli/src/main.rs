//! Entrypoint for the `hostbridge` binary.
//!
//! Delegates to [`hostbridge_cli::run`], which loads configuration, starts
//! the upload worker and executes the requested subcommand.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = io::stdout().lock();
    // Left unlocked: background threads log to stderr.
    let mut stderr = io::stderr();
    hostbridge_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
