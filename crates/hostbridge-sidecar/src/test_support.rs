//! In-memory worker link for unit tests.

use std::sync::{Arc, Mutex};

use hostbridge_protocol::{Command, Event};

use crate::broadcast::EventBroadcaster;
use crate::error::SidecarError;
use crate::link::WorkerLink;

/// Link that answers every command by broadcasting a fixed list of events.
pub(crate) struct ScriptedLink {
    pub(crate) events: Arc<EventBroadcaster>,
    pub(crate) replies: Vec<Event>,
    pub(crate) fail: bool,
    pub(crate) sent: Mutex<Vec<Command>>,
}

impl ScriptedLink {
    pub(crate) fn replying(replies: Vec<Event>) -> Self {
        Self {
            events: Arc::new(EventBroadcaster::new()),
            replies,
            fail: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::replying(Vec::new())
        }
    }

    pub(crate) fn sent(&self) -> Vec<Command> {
        self.sent.lock().expect("sent log").clone()
    }
}

impl WorkerLink for ScriptedLink {
    fn send(&self, command: &Command) -> Result<(), SidecarError> {
        if self.fail {
            return Err(SidecarError::Unavailable);
        }
        self.sent.lock().expect("sent log").push(command.clone());
        for reply in &self.replies {
            self.events.dispatch(reply);
        }
        Ok(())
    }

    fn events(&self) -> &Arc<EventBroadcaster> {
        &self.events
    }
}
