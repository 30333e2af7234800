//! Spawning worker processes.
//!
//! [`WorkerLauncher`] is the seam between the supervisor and the operating
//! system so restart handling can be exercised without a real worker.

use std::ffi::OsString;
use std::io::{self, PipeReader};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;

use hostbridge_config::Config;
use tracing::debug;

use crate::error::SidecarError;
use crate::locate::WorkerLocator;

const LAUNCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::launch");

/// A freshly spawned worker and its pipes.
#[derive(Debug)]
pub struct WorkerProcess {
    /// Process handle.
    pub child: Child,
    /// Command input.
    pub input: ChildStdin,
    /// Merged stdout and stderr.
    pub output: PipeReader,
}

/// Starts worker processes on behalf of the supervisor.
pub trait WorkerLauncher: Send + Sync {
    /// Spawns one worker.
    ///
    /// # Errors
    ///
    /// Returns [`SidecarError`] when the binary cannot be resolved or started.
    fn launch(&self) -> Result<WorkerProcess, SidecarError>;
}

/// Where a [`CommandLauncher`] finds its program.
#[derive(Debug, Clone)]
enum Program {
    Fixed(PathBuf),
    Located(WorkerLocator),
}

/// Launches a program with piped stdin and a single merged output stream.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    program: Program,
    args: Vec<OsString>,
}

impl CommandLauncher {
    /// Launches `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Program::Fixed(program.into()),
            args: Vec::new(),
        }
    }

    /// Launches the worker binary resolved by `locator` with
    /// `--workers <count>`.
    ///
    /// Resolution happens on every launch so a binary replaced on disk is
    /// picked up by the next restart.
    #[must_use]
    pub fn for_worker(locator: WorkerLocator, worker_count: u32) -> Self {
        Self {
            program: Program::Located(locator),
            args: vec![
                OsString::from("--workers"),
                OsString::from(worker_count.to_string()),
            ],
        }
    }

    /// Builds the worker launcher described by `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::for_worker(WorkerLocator::from_config(config), config.worker_count())
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Returns the arguments passed on launch.
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    fn resolve(&self) -> Result<PathBuf, SidecarError> {
        match &self.program {
            Program::Fixed(path) => Ok(path.clone()),
            Program::Located(locator) => locator.locate(),
        }
    }
}

impl WorkerLauncher for CommandLauncher {
    fn launch(&self) -> Result<WorkerProcess, SidecarError> {
        let program = self.resolve()?;
        debug!(
            target: LAUNCH_TARGET,
            program = %program.display(),
            args = ?self.args,
            "spawning worker"
        );

        let (output, writer) = io::pipe().map_err(|err| spawn_error(&program, "pipe", err))?;
        let stderr_writer = writer
            .try_clone()
            .map_err(|err| spawn_error(&program, "pipe", err))?;

        let mut command = Command::new(&program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(writer)
            .stderr(stderr_writer);

        let mut child = command
            .spawn()
            .map_err(|err| spawn_error(&program, "spawn", err))?;
        // The command holds the parent's copies of the write ends; the reader
        // only sees end-of-file once they are closed.
        drop(command);

        let Some(input) = child.stdin.take() else {
            return Err(spawn_error(
                &program,
                "stdin",
                io::Error::other("stdin was not captured"),
            ));
        };

        debug!(target: LAUNCH_TARGET, pid = child.id(), "worker spawned");
        Ok(WorkerProcess {
            child,
            input,
            output,
        })
    }
}

impl<T: WorkerLauncher + ?Sized> WorkerLauncher for Arc<T> {
    fn launch(&self) -> Result<WorkerProcess, SidecarError> {
        self.as_ref().launch()
    }
}

fn spawn_error(program: &Path, stage: &str, source: io::Error) -> SidecarError {
    SidecarError::SpawnFailed {
        program: program.to_path_buf(),
        message: format!("{stage}: {source}"),
        source: Arc::new(source),
    }
}
