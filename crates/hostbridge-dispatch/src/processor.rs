//! Routes a batch's worker events into progress and result sinks.

use std::borrow::Cow;
use std::io;
use std::sync::mpsc::{RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hostbridge_protocol::{Event, EventKind};
use hostbridge_sidecar::{Subscription, UNAVAILABLE_MESSAGE};
use tracing::{debug, error, info};

use crate::cancel::CancellationToken;

const PROCESSOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::processor");

/// Thumbnail host prefix imx.to returns for some uploads, and its working
/// replacement.
const BROKEN_IMX_THUMB: &str = "image.imx.to/u/t/";
const FIXED_IMX_THUMB: &str = "i.imx.to/t/";

/// A progress notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// A file changed status.
    Status {
        /// File path as sent in the job.
        file: String,
        /// Worker status text, for example `Uploading` or `Done`.
        status: String,
    },
    /// The worker can no longer be reached.
    BackendUnavailable {
        /// Human-readable description.
        message: String,
    },
}

/// A finished upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    file: String,
    url: String,
    thumb: String,
}

impl UploadResult {
    /// Creates a result record.
    #[must_use]
    pub fn new(file: impl Into<String>, url: impl Into<String>, thumb: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            url: url.into(),
            thumb: thumb.into(),
        }
    }

    /// Uploaded file path.
    #[must_use]
    pub const fn file(&self) -> &str {
        self.file.as_str()
    }

    /// Viewer URL; empty when the worker reported none.
    #[must_use]
    pub const fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Thumbnail URL; empty when the worker reported none.
    #[must_use]
    pub const fn thumb(&self) -> &str {
        self.thumb.as_str()
    }
}

/// Receives per-file status updates.
pub trait ProgressSink: Send {
    /// Records a status transition.
    fn file_status(&self, file: &str, status: &str);

    /// Records that the worker is permanently unavailable.
    fn backend_unavailable(&self, message: &str);
}

/// Receives finished uploads.
pub trait ResultSink: Send {
    /// Records one finished upload.
    fn file_result(&self, result: UploadResult);
}

impl ProgressSink for Sender<Progress> {
    fn file_status(&self, file: &str, status: &str) {
        let update = Progress::Status {
            file: file.to_owned(),
            status: status.to_owned(),
        };
        if self.send(update).is_err() {
            debug!(target: PROCESSOR_TARGET, "progress receiver dropped");
        }
    }

    fn backend_unavailable(&self, message: &str) {
        let update = Progress::BackendUnavailable {
            message: message.to_owned(),
        };
        if self.send(update).is_err() {
            debug!(target: PROCESSOR_TARGET, "progress receiver dropped");
        }
    }
}

impl ResultSink for Sender<UploadResult> {
    fn file_result(&self, result: UploadResult) {
        if self.send(result).is_err() {
            debug!(target: PROCESSOR_TARGET, "result receiver dropped");
        }
    }
}

/// Long-running consumer of one batch's event subscription.
///
/// The loop waits at most `poll` for each event, so cancellation is
/// observed within one poll interval even when the worker is silent.
pub struct EventProcessor<P, R> {
    subscription: Subscription,
    progress: P,
    results: R,
    cancel: CancellationToken,
    poll: Duration,
}

impl<P: ProgressSink, R: ResultSink> EventProcessor<P, R> {
    /// Creates a processor reading from `subscription`.
    #[must_use]
    pub const fn new(
        subscription: Subscription,
        progress: P,
        results: R,
        cancel: CancellationToken,
        poll: Duration,
    ) -> Self {
        Self {
            subscription,
            progress,
            results,
            cancel,
            poll,
        }
    }

    /// Processes events until cancelled. Dropping the processor afterwards
    /// deregisters its listener.
    pub fn run(self) {
        while !self.cancel.is_cancelled() {
            match self.subscription.recv_timeout(self.poll) {
                Ok(event) => self.handle(&event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    error!(target: PROCESSOR_TARGET, "event subscription closed");
                    break;
                }
            }
        }
        debug!(target: PROCESSOR_TARGET, "event processor stopped");
    }

    /// Routes a single event.
    pub fn handle(&self, event: &Event) {
        match event.kind() {
            EventKind::Status => {
                if let (Some(file), Some(status)) = (event.file(), event.status_text()) {
                    self.progress.file_status(file, status);
                }
            }
            EventKind::Result => {
                let Some(file) = event.file() else {
                    debug!(target: PROCESSOR_TARGET, "ignoring result without a file");
                    return;
                };
                let thumb = repair_thumb(event.thumb().unwrap_or_default());
                self.results.file_result(UploadResult::new(
                    file,
                    event.url().unwrap_or_default(),
                    thumb,
                ));
            }
            EventKind::Error if event.msg() == Some(UNAVAILABLE_MESSAGE) => {
                self.progress.backend_unavailable(UNAVAILABLE_MESSAGE);
            }
            EventKind::Log => {
                info!(
                    target: PROCESSOR_TARGET,
                    msg = event.msg().unwrap_or_default(),
                    "worker log"
                );
            }
            EventKind::BatchComplete => {
                debug!(target: PROCESSOR_TARGET, "worker reported batch complete");
            }
            EventKind::Error
            | EventKind::Success
            | EventKind::Data
            | EventKind::Other => {}
        }
    }
}

impl<P, R> EventProcessor<P, R>
where
    P: ProgressSink + 'static,
    R: ResultSink + 'static,
{
    /// Runs the processor on a dedicated thread.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised when the thread cannot be spawned.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(String::from("hostbridge-events"))
            .spawn(move || self.run())
    }
}

/// Rewrites the known-broken imx.to thumbnail host.
fn repair_thumb(thumb: &str) -> Cow<'_, str> {
    if thumb.contains(BROKEN_IMX_THUMB) {
        Cow::Owned(thumb.replace(BROKEN_IMX_THUMB, FIXED_IMX_THUMB))
    } else {
        Cow::Borrowed(thumb)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::time::Instant;

    use hostbridge_sidecar::EventBroadcaster;
    use mockall::mock;
    use rstest::rstest;

    use super::*;

    mock! {
        Progress {}
        impl ProgressSink for Progress {
            fn file_status(&self, file: &str, status: &str);
            fn backend_unavailable(&self, message: &str);
        }
    }

    mock! {
        Results {}
        impl ResultSink for Results {
            fn file_result(&self, result: UploadResult);
        }
    }

    fn processor<P: ProgressSink, R: ResultSink>(
        progress: P,
        results: R,
    ) -> (Arc<EventBroadcaster>, EventProcessor<P, R>) {
        let events = Arc::new(EventBroadcaster::new());
        let subscription = events.subscribe(16);
        let processor = EventProcessor::new(
            subscription,
            progress,
            results,
            CancellationToken::new(),
            Duration::from_millis(20),
        );
        (events, processor)
    }

    #[rstest]
    #[case(
        "https://image.imx.to/u/t/2024/abc.jpg",
        "https://i.imx.to/t/2024/abc.jpg"
    )]
    #[case("https://img.pixhost.to/t/abc.jpg", "https://img.pixhost.to/t/abc.jpg")]
    #[case("", "")]
    fn imx_thumbnails_are_repaired(#[case] thumb: &str, #[case] expected: &str) {
        assert_eq!(repair_thumb(thumb), expected);
    }

    #[test]
    fn status_events_reach_progress_sink() {
        let mut progress = MockProgress::new();
        progress
            .expect_file_status()
            .withf(|file: &str, status: &str| file == "/a.jpg" && status == "Uploading")
            .times(1)
            .return_const(());
        let (_events, processor) = processor(progress, MockResults::new());

        processor.handle(&Event::status("/a.jpg", "Uploading"));
        processor.handle(&Event::new(EventKind::Status).with_status("orphan"));
    }

    #[test]
    fn results_are_forwarded_with_repaired_thumb() {
        let mut results = MockResults::new();
        results
            .expect_file_result()
            .withf(|result: &UploadResult| {
                result.file() == "/a.jpg"
                    && result.url() == "https://imx.to/i/abc"
                    && result.thumb() == "https://i.imx.to/t/abc.jpg"
            })
            .times(1)
            .return_const(());
        let (_events, processor) = processor(MockProgress::new(), results);

        processor.handle(
            &Event::new(EventKind::Result)
                .with_file("/a.jpg")
                .with_url("https://imx.to/i/abc")
                .with_thumb("https://image.imx.to/u/t/abc.jpg"),
        );
        processor.handle(&Event::new(EventKind::Result).with_status("success"));
    }

    #[test]
    fn informational_events_touch_no_sink() {
        let (_events, processor) = processor(MockProgress::new(), MockResults::new());
        processor.handle(&Event::new(EventKind::Log).with_msg("starting"));
        processor.handle(&Event::new(EventKind::BatchComplete));
        processor.handle(&Event::error("Bad password"));
        processor.handle(&Event::new(EventKind::Data));
    }

    #[test]
    fn unavailable_notice_is_surfaced() {
        let mut progress = MockProgress::new();
        progress
            .expect_backend_unavailable()
            .withf(|message: &str| message == UNAVAILABLE_MESSAGE)
            .times(1)
            .return_const(());
        let (_events, processor) = processor(progress, MockResults::new());
        processor.handle(&Event::error(UNAVAILABLE_MESSAGE));
    }

    #[test]
    fn run_delivers_events_and_stops_on_cancel() {
        let (progress_tx, progress_rx) = mpsc::channel();
        let (results_tx, results_rx) = mpsc::channel();
        let events = Arc::new(EventBroadcaster::new());
        let cancel = CancellationToken::new();
        let processor = EventProcessor::new(
            events.subscribe(16),
            progress_tx,
            results_tx,
            cancel.clone(),
            Duration::from_millis(20),
        );
        let worker = processor.spawn().expect("spawn processor");

        events.dispatch(&Event::status("/a.jpg", "Done"));
        events.dispatch(
            &Event::new(EventKind::Result)
                .with_file("/a.jpg")
                .with_url("https://host/a"),
        );
        let update = progress_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("status update");
        assert_eq!(
            update,
            Progress::Status {
                file: String::from("/a.jpg"),
                status: String::from("Done"),
            }
        );
        let result = results_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("upload result");
        assert_eq!(result, UploadResult::new("/a.jpg", "https://host/a", ""));

        let cancelled_at = Instant::now();
        cancel.cancel();
        worker.join().expect("processor thread");
        assert!(cancelled_at.elapsed() < Duration::from_secs(2));
        assert_eq!(events.listener_count(), 0);
    }
}
