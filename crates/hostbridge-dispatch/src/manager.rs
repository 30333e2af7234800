//! Batch coordination: one event processor and one dispatch thread per
//! batch, sharing a cancellation token.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hostbridge_config::Config;
use hostbridge_sidecar::{GalleryService, WorkerLink};
use tracing::{info, warn};

use crate::cancel::CancellationToken;
use crate::dispatcher::{BatchContext, JobDispatcher};
use crate::error::DispatchError;
use crate::group::GroupAssignment;
use crate::processor::{EventProcessor, ProgressSink, ResultSink};
use crate::settings::{Credentials, ServiceConfig};
use crate::uploader::UploaderRegistry;

const MANAGER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::manager");

/// Everything needed to upload one batch to one destination.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    service: String,
    groups: Vec<GroupAssignment>,
    config: ServiceConfig,
    creds: Credentials,
}

impl BatchRequest {
    /// Creates a request for `service`.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        groups: Vec<GroupAssignment>,
        config: ServiceConfig,
        creds: Credentials,
    ) -> Self {
        Self {
            service: service.into(),
            groups,
            config,
            creds,
        }
    }

    /// Destination identifier.
    #[must_use]
    pub const fn service(&self) -> &str {
        self.service.as_str()
    }

    /// Groups in dispatch order.
    #[must_use]
    pub fn groups(&self) -> &[GroupAssignment] {
        &self.groups
    }
}

/// Starts batches against a shared worker link.
pub struct UploadManager<L> {
    link: L,
    registry: Arc<UploaderRegistry>,
    galleries: Arc<dyn GalleryService>,
    listener_capacity: usize,
    poll: Duration,
}

impl<L> UploadManager<L>
where
    L: WorkerLink + Clone + 'static,
{
    /// Creates a manager using the mailbox size and poll interval from
    /// `config`.
    #[must_use]
    pub fn new(
        link: L,
        registry: Arc<UploaderRegistry>,
        galleries: Arc<dyn GalleryService>,
        config: &Config,
    ) -> Self {
        Self {
            link,
            registry,
            galleries,
            listener_capacity: config.listener_capacity(),
            poll: config.event_poll_interval(),
        }
    }

    /// Registers the batch's listener, starts its event processor and then
    /// dispatches its jobs on a separate thread, so the caller never waits
    /// for job construction.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Spawn`] when either thread cannot be
    /// started. No job has been sent in that case.
    pub fn start_batch<P, R>(
        &self,
        request: BatchRequest,
        progress: P,
        results: R,
    ) -> Result<BatchHandle, DispatchError>
    where
        P: ProgressSink + 'static,
        R: ResultSink + 'static,
    {
        let cancel = CancellationToken::new();
        let subscription = self.link.events().subscribe(self.listener_capacity);
        let processor = EventProcessor::new(
            subscription,
            progress,
            results,
            cancel.clone(),
            self.poll,
        )
        .spawn()
        .map_err(|err| DispatchError::Spawn {
            thread: "event processor",
            source: Arc::new(err),
        })?;

        let dispatcher = JobDispatcher::new(
            self.link.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.galleries),
        );
        let dispatch_cancel = cancel.clone();
        info!(
            target: MANAGER_TARGET,
            service = request.service(),
            groups = request.groups().len(),
            "starting batch"
        );
        let spawned = thread::Builder::new()
            .name(String::from("hostbridge-dispatch"))
            .spawn(move || {
                dispatcher.dispatch(
                    &request.service,
                    &request.groups,
                    &request.config,
                    &request.creds,
                    &dispatch_cancel,
                )
            });
        let dispatch = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                cancel.cancel();
                if processor.join().is_err() {
                    warn!(target: MANAGER_TARGET, "event processor panicked");
                }
                return Err(DispatchError::Spawn {
                    thread: "dispatch",
                    source: Arc::new(err),
                });
            }
        };

        Ok(BatchHandle {
            cancel,
            dispatch: Some(dispatch),
            processor: Some(processor),
        })
    }
}

/// Controls a running batch. Dropping the handle cancels the batch.
#[derive(Debug)]
pub struct BatchHandle {
    cancel: CancellationToken,
    dispatch: Option<JoinHandle<BatchContext>>,
    processor: Option<JoinHandle<()>>,
}

impl BatchHandle {
    /// Returns the batch's cancellation token.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Requests cancellation. Groups not yet dispatched are skipped and the
    /// event processor stops within one poll interval.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits until every job has been dispatched and returns the dispatch
    /// summary. Returns `None` when called twice or when the dispatch
    /// thread panicked.
    pub fn wait_dispatched(&mut self) -> Option<BatchContext> {
        let handle = self.dispatch.take()?;
        handle.join().ok()
    }

    /// Stops the event processor and waits for both threads.
    pub fn finish(mut self) -> Option<BatchContext> {
        let context = self.wait_dispatched();
        self.cancel.cancel();
        if let Some(processor) = self.processor.take()
            && processor.join().is_err()
        {
            warn!(target: MANAGER_TARGET, "event processor panicked");
        }
        context
    }
}

impl Drop for BatchHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
