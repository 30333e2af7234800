//! Turns group assignments into worker jobs.
//!
//! Each group gets a private copy of the destination configuration, so a
//! gallery created for one group never leaks into another. Files are then
//! split into cover and standard sub-jobs; covers carry enlarged thumbnail
//! settings. A sub-job becomes an `http_upload` command when the destination
//! has a request builder and a legacy `upload` command otherwise.
//!
//! Failures while building or sending a sub-job are reported as one
//! `status` event with status `error` per affected file, broadcast on the
//! worker's event channel so progress consumers see them like any other
//! status update. The remaining sub-jobs and groups are still dispatched.

use std::sync::Arc;

use hostbridge_protocol::event::STATUS_ERROR;
use hostbridge_protocol::{Action, Command, Event};
use hostbridge_sidecar::{CreatedGallery, GalleryService, WorkerLink};
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::error::UploaderError;
use crate::group::GroupAssignment;
use crate::legacy::legacy_job;
use crate::settings::{Credentials, ServiceConfig};
use crate::uploader::{Uploader, UploaderRegistry};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatcher");

/// Legacy thumbnail keys raised to their maximum for cover sub-jobs.
const COVER_OVERRIDES: [(&str, &str); 5] = [
    ("imx_thumb", "600"),
    ("pix_thumb", "500"),
    ("turbo_thumb", "600"),
    ("vipr_thumb", "800x800"),
    ("imagebam_thumb", "300"),
];

/// A gallery created while preparing a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupGallery {
    group: String,
    service: String,
    gallery: CreatedGallery,
}

impl GroupGallery {
    /// Title of the group the gallery was created for.
    #[must_use]
    pub const fn group(&self) -> &str {
        self.group.as_str()
    }

    /// Destination identifier.
    #[must_use]
    pub const fn service(&self) -> &str {
        self.service.as_str()
    }

    /// Identifiers returned by the destination.
    #[must_use]
    pub const fn gallery(&self) -> &CreatedGallery {
        &self.gallery
    }
}

/// What a dispatch run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchContext {
    galleries: Vec<GroupGallery>,
    jobs_sent: usize,
    failed_files: Vec<String>,
}

impl BatchContext {
    /// Galleries created during group preparation.
    #[must_use]
    pub fn galleries(&self) -> &[GroupGallery] {
        &self.galleries
    }

    /// Number of jobs written to the worker.
    #[must_use]
    pub const fn jobs_sent(&self) -> usize {
        self.jobs_sent
    }

    /// Files reported as failed without reaching the worker.
    #[must_use]
    pub fn failed_files(&self) -> &[String] {
        &self.failed_files
    }

    /// Finalises every created gallery that carries an upload hash and
    /// returns how many the destination accepted.
    pub fn finalize_galleries(&self, service: &dyn GalleryService) -> usize {
        self.galleries
            .iter()
            .filter(|entry| match entry.gallery() {
                CreatedGallery::Hashes {
                    gallery_hash,
                    upload_hash,
                } => service.finalize_gallery(entry.service(), upload_hash, gallery_hash),
                CreatedGallery::Id(_) => false,
            })
            .count()
    }
}

/// Builds and sends the jobs for a batch.
pub struct JobDispatcher<L> {
    link: L,
    registry: Arc<UploaderRegistry>,
    galleries: Arc<dyn GalleryService>,
}

impl<L: WorkerLink> JobDispatcher<L> {
    /// Creates a dispatcher writing to `link`.
    #[must_use]
    pub fn new(
        link: L,
        registry: Arc<UploaderRegistry>,
        galleries: Arc<dyn GalleryService>,
    ) -> Self {
        Self {
            link,
            registry,
            galleries,
        }
    }

    /// Dispatches every group to `service`, stopping between groups once
    /// `cancel` fires.
    pub fn dispatch(
        &self,
        service: &str,
        groups: &[GroupAssignment],
        config: &ServiceConfig,
        creds: &Credentials,
        cancel: &CancellationToken,
    ) -> BatchContext {
        let uploader = self.registry.get(service);
        if uploader.is_none() {
            debug!(
                target: DISPATCH_TARGET,
                service, "no registered uploader; using legacy jobs"
            );
        }
        let mut context = BatchContext::default();
        for group in groups {
            if cancel.is_cancelled() {
                info!(target: DISPATCH_TARGET, service, "dispatch cancelled");
                break;
            }
            self.dispatch_group(service, uploader.as_deref(), group, config, creds, &mut context);
        }
        context
    }

    fn dispatch_group(
        &self,
        service: &str,
        uploader: Option<&dyn Uploader>,
        group: &GroupAssignment,
        config: &ServiceConfig,
        creds: &Credentials,
        context: &mut BatchContext,
    ) {
        let mut group_config = config.clone();
        if let Some(preparer) = uploader.and_then(|found| found.group_preparer()) {
            match preparer.prepare_group(group, &group_config, creds, self.galleries.as_ref()) {
                Ok(Some(gallery)) => {
                    group_config.set(preparer.gallery_key(), gallery.id());
                    context.galleries.push(GroupGallery {
                        group: group.title().to_owned(),
                        service: service.to_owned(),
                        gallery,
                    });
                }
                Ok(None) => {}
                Err(err) => warn!(
                    target: DISPATCH_TARGET,
                    service,
                    group = group.title(),
                    error = %err,
                    "group preparation failed; uploading without a gallery"
                ),
            }
        }

        let cover_count = group
            .cover_count()
            .unwrap_or_else(|| group_config.cover_count_for(service));
        let split = group.split(cover_count);

        if !split.covers().is_empty() {
            let enlarged = cover_config(&group_config, uploader);
            self.send_split(service, uploader, split.covers(), &enlarged, creds, context);
        }
        if !split.standards().is_empty() {
            self.send_split(service, uploader, split.standards(), &group_config, creds, context);
        }
    }

    fn send_split(
        &self,
        service: &str,
        uploader: Option<&dyn Uploader>,
        files: &[String],
        config: &ServiceConfig,
        creds: &Credentials,
        context: &mut BatchContext,
    ) {
        let job = match build_job(service, uploader, files, config, creds) {
            Ok(job) => job,
            Err(err) => {
                warn!(
                    target: DISPATCH_TARGET,
                    service,
                    files = files.len(),
                    error = %err,
                    "could not build upload job"
                );
                self.fail_files(files, &err.to_string(), context);
                return;
            }
        };

        match self.link.send(&job) {
            Ok(()) => {
                info!(
                    target: DISPATCH_TARGET,
                    service,
                    action = %job.action(),
                    files = files.len(),
                    "job sent"
                );
                context.jobs_sent += 1;
            }
            Err(err) => {
                warn!(
                    target: DISPATCH_TARGET,
                    service,
                    files = files.len(),
                    error = %err,
                    "could not send upload job"
                );
                self.fail_files(files, &err.to_string(), context);
            }
        }
    }

    fn fail_files(&self, files: &[String], reason: &str, context: &mut BatchContext) {
        for file in files {
            self.link
                .events()
                .dispatch(&Event::status(file.as_str(), STATUS_ERROR).with_msg(reason));
        }
        context.failed_files.extend(files.iter().cloned());
    }
}

/// Copies `config` with the cover thumbnail overrides applied.
fn cover_config(config: &ServiceConfig, uploader: Option<&dyn Uploader>) -> ServiceConfig {
    let mut covers = config.clone();
    for (key, value) in COVER_OVERRIDES {
        covers.set(key, value);
    }
    if let Some(size) = uploader.and_then(|found| found.cover_thumbnail_size()) {
        covers.set("thumbnail_size", size);
    }
    covers
}

fn build_job(
    service: &str,
    uploader: Option<&dyn Uploader>,
    files: &[String],
    config: &ServiceConfig,
    creds: &Credentials,
) -> Result<Command, UploaderError> {
    let Some(builder) = uploader.and_then(|found| found.spec_builder()) else {
        return Ok(legacy_job(service, files, config, creds));
    };
    let template = files.first().map_or("", String::as_str);
    let spec = builder.build_http_spec(template, config, creds)?;
    spec.validate()?;
    Ok(Command::new(Action::HttpUpload, service)
        .with_files(files.iter().cloned())
        .with_creds(creds.as_map().clone())
        .with_config_value("threads", config.threads_for(service))
        .with_http_spec(spec))
}
