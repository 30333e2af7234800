//! Subcommand implementations.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use hostbridge_config::Config;
use hostbridge_dispatch::{
    BatchRequest, Progress, UploadManager, UploadResult, UploaderRegistry,
};
use hostbridge_protocol::event::STATUS_ERROR;
use hostbridge_sidecar::{GalleryService, WorkerApi, WorkerLink};
use tracing::{info, warn};

use crate::cli::{ServiceArgs, UploadArgs};
use crate::errors::AppError;
use crate::output::{FileLine, GalleryLine, VerificationLine, write_line};

const COMMAND_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::commands");

const STATUS_DONE: &str = "Done";

/// Statuses after which a file receives no further updates.
const TERMINAL_STATUSES: [&str; 4] = [STATUS_DONE, "Failed", "Timeout", STATUS_ERROR];

pub(crate) fn verify<L, W>(
    api: &WorkerApi<L>,
    args: &ServiceArgs,
    out: &mut W,
) -> Result<ExitCode, AppError>
where
    L: WorkerLink,
    W: Write,
{
    let verification = api.verify_login(&args.service, args.credentials().as_map());
    write_line(
        out,
        &VerificationLine {
            service: &args.service,
            accepted: verification.accepted(),
            message: verification.message(),
        },
    )?;
    Ok(if verification.accepted() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

pub(crate) fn galleries<L, W>(
    api: &WorkerApi<L>,
    args: &ServiceArgs,
    out: &mut W,
) -> Result<ExitCode, AppError>
where
    L: WorkerLink,
    W: Write,
{
    for gallery in api.list_galleries(&args.service, args.credentials().as_map()) {
        write_line(
            out,
            &GalleryLine {
                id: gallery.id(),
                name: gallery.name(),
            },
        )?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Uploads the group and waits until every file reached a terminal status.
///
/// Galleries created for the group are finalised once the batch is done.
pub(crate) fn upload<L, W>(
    link: &L,
    config: &Config,
    registry: UploaderRegistry,
    args: &UploadArgs,
    out: &mut W,
) -> Result<ExitCode, AppError>
where
    L: WorkerLink + Clone + 'static,
    W: Write,
{
    let api = Arc::new(WorkerApi::new(link.clone(), config));
    let galleries: Arc<dyn GalleryService> = api.clone();
    let manager = UploadManager::new(link.clone(), Arc::new(registry), galleries, config);
    let request = BatchRequest::new(
        args.target.service.as_str(),
        vec![args.group()],
        args.service_config(),
        args.target.credentials(),
    );

    let (progress_tx, progress_rx) = mpsc::channel();
    let (results_tx, results_rx) = mpsc::channel();
    let handle = manager.start_batch(request, progress_tx, results_tx)?;

    let mut tracker = UploadTracker::new(&args.files);
    let waited = tracker.wait(&progress_rx, &results_rx, config.event_poll_interval(), out);
    let summary = handle.finish();
    waited?;

    if let Some(context) = summary {
        let finalised = context.finalize_galleries(api.as_ref());
        info!(
            target: COMMAND_TARGET,
            jobs = context.jobs_sent(),
            galleries = context.galleries().len(),
            finalised,
            "batch finished"
        );
    }
    Ok(tracker.exit_code())
}

/// Follows the files of one batch until each has settled.
struct UploadTracker<'a> {
    pending: BTreeSet<&'a str>,
    results: BTreeMap<String, UploadResult>,
    failed: usize,
}

impl<'a> UploadTracker<'a> {
    fn new(files: &'a [String]) -> Self {
        Self {
            pending: files.iter().map(String::as_str).collect(),
            results: BTreeMap::new(),
            failed: 0,
        }
    }

    fn wait<W: Write>(
        &mut self,
        progress: &Receiver<Progress>,
        results: &Receiver<UploadResult>,
        poll: Duration,
        out: &mut W,
    ) -> Result<(), AppError> {
        while !self.pending.is_empty() {
            match progress.recv_timeout(poll) {
                Ok(Progress::Status { file, status }) => {
                    if TERMINAL_STATUSES.contains(&status.as_str())
                        && self.pending.remove(file.as_str())
                    {
                        self.collect(results);
                        self.settle(&file, &status, out)?;
                    }
                }
                Ok(Progress::BackendUnavailable { message }) => {
                    return Err(AppError::BackendUnavailable { message });
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    warn!(
                        target: COMMAND_TARGET,
                        pending = self.pending.len(),
                        "event processor stopped before every file settled"
                    );
                    self.failed += self.pending.len();
                    break;
                }
            }
        }
        Ok(())
    }

    fn collect(&mut self, results: &Receiver<UploadResult>) {
        for result in results.try_iter() {
            self.results.insert(result.file().to_owned(), result);
        }
    }

    fn settle<W: Write>(&mut self, file: &str, status: &str, out: &mut W) -> Result<(), AppError> {
        let result = self.results.remove(file);
        if status != STATUS_DONE {
            self.failed += 1;
        }
        write_line(
            out,
            &FileLine {
                file,
                status,
                url: result.as_ref().map(UploadResult::url),
                thumb: result
                    .as_ref()
                    .map(UploadResult::thumb)
                    .filter(|thumb| !thumb.is_empty()),
            },
        )
    }

    const fn exit_code(&self) -> ExitCode {
        if self.failed == 0 {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}
