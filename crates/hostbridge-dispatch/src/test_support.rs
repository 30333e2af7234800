//! In-memory worker link and gallery service for unit tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use hostbridge_protocol::{Command, Event};
use hostbridge_sidecar::{
    CreatedGallery, EventBroadcaster, GalleryService, SidecarError, WorkerLink,
};
use mockall::mock;

type Responder = dyn Fn(&Command) -> Vec<Event> + Send + Sync;

/// Link that records every command and broadcasts scripted replies.
#[derive(Clone)]
pub(crate) struct RecordingLink {
    events: Arc<EventBroadcaster>,
    sent: Arc<Mutex<Vec<Command>>>,
    responder: Arc<Responder>,
    fail: bool,
}

impl RecordingLink {
    pub(crate) fn replying<F>(responder: F) -> Self
    where
        F: Fn(&Command) -> Vec<Event> + Send + Sync + 'static,
    {
        Self {
            events: Arc::new(EventBroadcaster::new()),
            sent: Arc::new(Mutex::new(Vec::new())),
            responder: Arc::new(responder),
            fail: false,
        }
    }

    pub(crate) fn silent() -> Self {
        Self::replying(|_| Vec::new())
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::silent()
        }
    }

    pub(crate) fn sent(&self) -> Vec<Command> {
        self.sent.lock().expect("sent log").clone()
    }
}

impl WorkerLink for RecordingLink {
    fn send(&self, command: &Command) -> Result<(), SidecarError> {
        if self.fail {
            return Err(SidecarError::Unavailable);
        }
        self.sent.lock().expect("sent log").push(command.clone());
        for event in (self.responder)(command) {
            self.events.dispatch(&event);
        }
        Ok(())
    }

    fn events(&self) -> &Arc<EventBroadcaster> {
        &self.events
    }
}

/// Gallery service that never creates or finalises anything.
pub(crate) struct NoGalleries;

impl GalleryService for NoGalleries {
    fn create_gallery(
        &self,
        _service: &str,
        _name: &str,
        _creds: &BTreeMap<String, String>,
    ) -> Option<CreatedGallery> {
        None
    }

    fn finalize_gallery(&self, _service: &str, _upload_hash: &str, _gallery_hash: &str) -> bool {
        false
    }
}

mock! {
    pub Galleries {}
    impl GalleryService for Galleries {
        fn create_gallery(
            &self,
            service: &str,
            name: &str,
            creds: &BTreeMap<String, String>,
        ) -> Option<CreatedGallery>;
        fn finalize_gallery(&self, service: &str, upload_hash: &str, gallery_hash: &str) -> bool;
    }
}
