//! Wire protocol spoken between the bridge and the upload worker.
//!
//! Every message, in either direction, is one JSON object terminated by a
//! newline. The bridge writes [`Command`] lines to the worker's stdin and
//! reads [`Event`] lines from its merged stdout/stderr stream. Commands that
//! use the generic HTTP runner carry an [`HttpRequestSpec`] describing the
//! request chain the worker replays for each file.
//!
//! # Example
//!
//! ```
//! use hostbridge_protocol::{Action, Command, EventKind, codec};
//!
//! let command = Command::new(Action::Verify, "imx.to");
//! let line = codec::encode(&command).expect("command encodes");
//! assert_eq!(line.last(), Some(&b'\n'));
//!
//! let event = codec::decode_event(br#"{"type":"result","status":"success"}"#)
//!     .expect("event decodes");
//! assert_eq!(event.kind(), EventKind::Result);
//! ```

pub mod codec;
pub mod command;
pub mod error;
pub mod event;
pub mod http_spec;

pub use self::codec::{EventStream, FrameWriter};
pub use self::command::{Action, Command};
pub use self::error::{CodecError, SpecError};
pub use self::event::{Event, EventKind};
pub use self::http_spec::{
    HttpMethod, HttpRequestSpec, MultipartField, PreRequestStep, ResponseParser, ResponseType,
};
