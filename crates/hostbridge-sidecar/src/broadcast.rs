//! Fan-out of worker events to registered listeners.
//!
//! Every listener owns a bounded mailbox. Delivery never blocks: when a
//! mailbox is full the event is dropped for that listener only, and
//! mailboxes whose receiver has gone away are pruned. Registration, removal
//! and delivery share one lock, so a removed listener receives nothing
//! further and each listener observes events in dispatch order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use hostbridge_protocol::Event;
use tracing::debug;

const BROADCAST_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::broadcast");

/// Identity of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Distributes every event to every registered mailbox.
#[derive(Debug, Default)]
pub struct EventBroadcaster {
    listeners: Mutex<HashMap<ListenerId, SyncSender<Event>>>,
    next_id: AtomicU64,
}

impl EventBroadcaster {
    /// Creates a broadcaster with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mailbox and returns its identity.
    pub fn add_listener(&self, mailbox: SyncSender<Event>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(id, mailbox);
        id
    }

    /// Deregisters a mailbox. Returns `false` when it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    /// Delivers `event` to every listener and returns how many accepted it.
    pub fn dispatch(&self, event: &Event) -> usize {
        let mut listeners = self.lock();
        let mut delivered = 0_usize;
        listeners.retain(|id, mailbox| match mailbox.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!(
                    target: BROADCAST_TARGET,
                    listener = id.0,
                    kind = ?event.kind(),
                    "listener mailbox full; dropping event"
                );
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
        delivered
    }

    /// Registers a bounded mailbox and returns a subscription that
    /// deregisters it when dropped.
    #[must_use]
    pub fn subscribe(self: &Arc<Self>, capacity: usize) -> Subscription {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        let id = self.add_listener(sender);
        Subscription {
            id,
            receiver,
            broadcaster: Arc::clone(self),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ListenerId, SyncSender<Event>>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

/// A registered mailbox, removed from its broadcaster on drop.
#[derive(Debug)]
pub struct Subscription {
    id: ListenerId,
    receiver: Receiver<Event>,
    broadcaster: Arc<EventBroadcaster>,
}

impl Subscription {
    /// Returns the listener identity.
    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.id
    }

    /// Waits up to `timeout` for the next event.
    ///
    /// # Errors
    ///
    /// Returns [`RecvTimeoutError::Timeout`] when nothing arrives in time.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Event, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Returns the next queued event without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`TryRecvError::Empty`] when the mailbox is empty.
    pub fn try_recv(&self) -> Result<Event, TryRecvError> {
        self.receiver.try_recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.broadcaster.remove_listener(self.id);
    }
}
