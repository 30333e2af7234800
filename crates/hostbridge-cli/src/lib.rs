//! Command-line runtime for the upload bridge.
//!
//! [`run`] splits the configuration flags from the subcommand, loads
//! [`Config`](hostbridge_config::Config), installs telemetry, starts the
//! upload worker and executes one of `verify`, `galleries` or `upload`.
//! Every record is written to stdout as one JSON line; errors are reported
//! once on stderr with a failure exit code.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use hostbridge_config::Config;
use hostbridge_dispatch::UploaderRegistry;
use hostbridge_sidecar::WorkerApi;

mod backend;
mod cli;
mod commands;
mod config;
mod errors;
mod output;
pub mod telemetry;

#[cfg(test)]
mod test_support;

use backend::{Backend, SupervisedBackend};
use cli::{Cli, CliCommand};
use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};
use errors::AppError;

/// Runs the CLI with the given arguments and output streams.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with(args, stdout, stderr, &OrthoConfigLoader, &SupervisedBackend)
}

fn run_with<I, W, E, C, B>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &C,
    backend: &B,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    C: ConfigLoader,
    B: Backend,
{
    let collected: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&collected);

    let result = Cli::try_parse_from(&split.command_arguments)
        .map_err(AppError::CliUsage)
        .and_then(|cli| {
            loader
                .load(&split.config_arguments)
                .map(|config| (cli, config))
        })
        .and_then(|(cli, config)| {
            telemetry::initialise(&config)?;
            execute(&cli.command, &config, backend, stdout)
        });

    match result {
        Ok(exit_code) => exit_code,
        Err(AppError::CliUsage(usage)) if !usage.use_stderr() => {
            write!(stdout, "{usage}").ok();
            ExitCode::SUCCESS
        }
        Err(error) => {
            writeln!(stderr, "{error}").ok();
            ExitCode::FAILURE
        }
    }
}

fn execute<B, W>(
    command: &CliCommand,
    config: &Config,
    backend: &B,
    stdout: &mut W,
) -> Result<ExitCode, AppError>
where
    B: Backend,
    W: Write,
{
    let registry = UploaderRegistry::with_builtins();
    if let CliCommand::Upload(args) = command {
        registry.require(&args.target.service)?;
    }

    let link = backend.connect(config)?;
    let outcome = match command {
        CliCommand::Verify(args) => {
            commands::verify(&WorkerApi::new(link.clone(), config), args, stdout)
        }
        CliCommand::Galleries(args) => {
            commands::galleries(&WorkerApi::new(link.clone(), config), args, stdout)
        }
        CliCommand::Upload(args) => commands::upload(&link, config, registry, args, stdout),
    };
    backend.release(&link);
    outcome
}
