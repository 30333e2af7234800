//! Supervision of the external upload worker and request plumbing on top of
//! its event stream.
//!
//! The worker is a separate process speaking newline-delimited JSON. This
//! crate locates and launches it ([`WorkerLocator`], [`CommandLauncher`]),
//! keeps it alive with a bounded exponential restart budget
//! ([`ProcessSupervisor`]), fans every decoded event out to registered
//! listeners ([`EventBroadcaster`]) and layers blocking request/response
//! calls over the fan-out ([`RequestCorrelator`], [`WorkerApi`]).
//!
//! Consumers that only need to send commands and observe events depend on
//! the [`WorkerLink`] trait so they can be exercised without a process.

mod api;
mod broadcast;
mod correlator;
mod error;
mod launch;
mod link;
mod locate;
mod restart;
mod supervisor;

#[cfg(test)]
mod test_support;

pub use api::{CreatedGallery, Gallery, GalleryService, Verification, WorkerApi};
pub use broadcast::{EventBroadcaster, ListenerId, Subscription};
pub use correlator::RequestCorrelator;
pub use error::SidecarError;
pub use launch::{CommandLauncher, WorkerLauncher, WorkerProcess};
pub use link::WorkerLink;
pub use locate::{WORKER_BINARY, WorkerLocator};
pub use restart::{RestartPolicy, RestartState};
pub use supervisor::{ProcessSupervisor, SupervisorState, UNAVAILABLE_MESSAGE};
