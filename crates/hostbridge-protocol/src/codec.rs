//! Newline-delimited JSON framing.
//!
//! [`encode`] turns a message into a single line; [`EventStream`] reads lines
//! from the worker and yields only those that decode into an [`Event`].
//! Malformed lines are logged at debug level and skipped so a garbled write
//! from the worker never reaches listeners.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::CodecError;
use crate::event::Event;

const CODEC_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::codec");

/// Serialises `message` as one JSON object followed by `\n`.
///
/// # Errors
///
/// Returns [`CodecError::Serialize`] when `message` cannot be represented as
/// JSON.
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, CodecError> {
    let mut line = serde_json::to_vec(message).map_err(|source| CodecError::Serialize {
        source: Arc::new(source),
    })?;
    line.push(b'\n');
    Ok(line)
}

/// Decodes a single line, ignoring surrounding whitespace.
///
/// # Errors
///
/// Returns [`CodecError::EmptyLine`] for blank input and
/// [`CodecError::Malformed`] when the line is not valid JSON of type `T`.
pub fn decode<T: DeserializeOwned>(line: &[u8]) -> Result<T, CodecError> {
    let trimmed = line.trim_ascii();
    if trimmed.is_empty() {
        return Err(CodecError::EmptyLine);
    }
    serde_json::from_slice(trimmed).map_err(|source| CodecError::Malformed {
        source: Arc::new(source),
    })
}

/// Decodes a single worker event.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_event(line: &[u8]) -> Result<Event, CodecError> {
    decode(line)
}

/// Reads worker events line by line, skipping anything that fails to decode.
#[derive(Debug)]
pub struct EventStream<R> {
    reader: BufReader<R>,
    buffer: Vec<u8>,
}

impl<R: Read> EventStream<R> {
    /// Wraps a raw reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buffer: Vec::new(),
        }
    }

    /// Returns the next decodable event, or `None` once the stream ends.
    ///
    /// # Errors
    ///
    /// Propagates read failures from the underlying stream. Malformed or
    /// blank lines are not errors.
    pub fn next_event(&mut self) -> io::Result<Option<Event>> {
        loop {
            self.buffer.clear();
            let read = self.reader.read_until(b'\n', &mut self.buffer)?;
            if read == 0 {
                return Ok(None);
            }
            match decode_event(&self.buffer) {
                Ok(event) => return Ok(Some(event)),
                Err(CodecError::EmptyLine) => {}
                Err(error) => {
                    debug!(
                        target: CODEC_TARGET,
                        %error,
                        line = %String::from_utf8_lossy(&self.buffer).trim_end(),
                        "discarding malformed worker line"
                    );
                }
            }
        }
    }
}

impl<R: Read> Iterator for EventStream<R> {
    type Item = Event;

    /// Yields events until end of stream; a read error also ends iteration.
    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().ok().flatten()
    }
}

/// Writes whole protocol lines to a sink.
///
/// Each [`send`](Self::send) encodes, writes and flushes in one call. Callers
/// sharing a writer between threads must hold a lock across the call so
/// lines are never interleaved.
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: Write> FrameWriter<W> {
    /// Wraps a raw writer.
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Encodes `message`, writes the line and flushes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Serialize`] when encoding fails and
    /// [`CodecError::Io`] when the write or flush fails.
    pub fn send<T: Serialize>(&mut self, message: &T) -> Result<(), CodecError> {
        let line = encode(message)?;
        self.inner
            .write_all(&line)
            .and_then(|()| self.inner.flush())
            .map_err(|source| CodecError::Io {
                source: Arc::new(source),
            })
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use super::*;
    use crate::{Action, Command, EventKind};

    #[test]
    fn encode_appends_single_newline() {
        let line = encode(&Command::new(Action::Verify, "imx.to")).expect("encodes");
        assert_eq!(line.iter().filter(|byte| **byte == b'\n').count(), 1);
        assert_eq!(line.last(), Some(&b'\n'));
    }

    #[rstest]
    #[case(b"")]
    #[case(b"   \n")]
    fn blank_lines_are_reported_as_empty(#[case] line: &[u8]) {
        assert!(matches!(decode_event(line), Err(CodecError::EmptyLine)));
    }

    #[rstest]
    #[case(b"not json\n")]
    #[case(b"{\"type\":\"status\"")]
    #[case(b"{\"file\":\"/a.jpg\"}")]
    fn malformed_lines_fail_to_decode(#[case] line: &[u8]) {
        assert!(matches!(
            decode_event(line),
            Err(CodecError::Malformed { .. })
        ));
    }

    #[test]
    fn malformed_line_does_not_interrupt_stream() {
        let input = concat!(
            "{\"type\":\"status\",\"file\":\"/a.jpg\",\"status\":\"Uploading\"}\n",
            "not json\n",
            "\n",
            "{\"type\":\"result\",\"file\":\"/a.jpg\",\"url\":\"https://x/a\"}\n",
        );
        let events: Vec<Event> = EventStream::new(Cursor::new(input)).collect();

        assert_eq!(events.len(), 2);
        assert_eq!(
            events.iter().map(Event::kind).collect::<Vec<_>>(),
            vec![EventKind::Status, EventKind::Result]
        );
    }

    #[test]
    fn final_line_without_newline_is_delivered() {
        let mut stream = EventStream::new(Cursor::new("{\"type\":\"log\",\"msg\":\"bye\"}"));
        let event = stream.next_event().expect("reads").expect("event present");
        assert_eq!(event.msg(), Some("bye"));
        assert!(stream.next_event().expect("reads").is_none());
    }

    #[test]
    fn frame_writer_emits_whole_lines() {
        let mut writer = FrameWriter::new(Vec::new());
        writer
            .send(&Command::new(Action::ListGalleries, "pixhost.to"))
            .expect("first write");
        writer
            .send(&Command::new(Action::Verify, "imx.to"))
            .expect("second write");

        let written = String::from_utf8(writer.into_inner()).expect("utf8");
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let command: Command = decode(line.as_bytes()).expect("round trip");
            assert!(!command.service().is_empty());
        }
    }
}
