//! Job construction and event routing for upload batches.
//!
//! A batch names one destination, a list of [`GroupAssignment`]s, the
//! destination's [`ServiceConfig`] and the user's [`Credentials`]. The
//! [`JobDispatcher`] turns it into worker commands: each group is prepared
//! (for example a gallery is created for it), its files are split into
//! cover and standard sub-jobs, and each sub-job is sent either as an
//! `http_upload` command carrying a request chain built by the destination's
//! [`HttpSpecBuilder`] or as a legacy `upload` command.
//!
//! The [`EventProcessor`] consumes the worker's events for the batch and
//! forwards status changes and results to caller-provided sinks.
//! [`UploadManager`] wires both together on background threads.

mod cancel;
mod dispatcher;
mod error;
mod group;
mod legacy;
mod manager;
mod processor;
mod settings;
mod uploader;

#[cfg(test)]
mod test_support;

pub use cancel::CancellationToken;
pub use dispatcher::{BatchContext, GroupGallery, JobDispatcher};
pub use error::{DispatchError, UploaderError};
pub use group::{GroupAssignment, Split};
pub use legacy::{imagebam_size_id, imx_format_id, imx_size_id, legacy_job};
pub use manager::{BatchHandle, BatchRequest, UploadManager};
pub use processor::{EventProcessor, Progress, ProgressSink, ResultSink, UploadResult};
pub use settings::{Credentials, ServiceConfig};
pub use uploader::{
    GroupPreparer, HttpSpecBuilder, ImageBamUploader, ImxUploader, PixhostUploader,
    TurboUploader, Uploader, UploaderRegistry, ViprUploader,
};
