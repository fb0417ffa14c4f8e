//! Async adapter from an HTTP body to decoded events.
//!
//! Each call to [`decode_response`] owns one decoding session: the cumulative
//! body text, the decoder cursor and any half-received UTF-8 sequence.
//! Dropping the returned stream cancels the session.

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::stream::{self, BoxStream, Stream};
use futures_util::StreamExt;
use tracing::debug;

use super::decoder::{DecoderConfig, JsonLinesDecoder};
use super::events::StreamedEvent;
use crate::error::StreamError;

/// Stream of decoded events; ends after the body ends or after one error.
pub type EventStream = BoxStream<'static, Result<StreamedEvent, StreamError>>;

struct DecodeSession<E> {
    body: Pin<Box<dyn Stream<Item = Result<Bytes, E>> + Send>>,
    decoder: JsonLinesDecoder,
    /// Everything received so far, as text
    buffer: String,
    /// Trailing bytes of a UTF-8 sequence split across chunks
    pending: Vec<u8>,
    queue: VecDeque<StreamedEvent>,
    emitted: usize,
    finished: bool,
}

impl<E> DecodeSession<E> {
    fn push_chunk(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&self.pending[start..valid_end]) {
                        self.buffer.push_str(text);
                    }
                    match e.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        None => {
                            // Incomplete sequence at the end; wait for the next chunk.
                            self.pending.drain(..valid_end);
                            return;
                        }
                    }
                }
            }
        }
    }

    fn flush_pending(&mut self) {
        if !self.pending.is_empty() {
            self.buffer.push_str(&String::from_utf8_lossy(&self.pending));
            self.pending.clear();
        }
    }
}

/// Decode a streamed chat answer from its raw body.
///
/// Events are yielded as soon as their line is complete. A transport error
/// yields a single `Err` after every event decoded before it, then ends the
/// stream.
pub fn decode_response<S, E>(body: S, config: DecoderConfig) -> EventStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<StreamError> + Send + 'static,
{
    let session = DecodeSession {
        body: Box::pin(body),
        decoder: JsonLinesDecoder::with_config(config),
        buffer: String::new(),
        pending: Vec::new(),
        queue: VecDeque::new(),
        emitted: 0,
        finished: false,
    };

    stream::unfold(session, |mut session| async move {
        loop {
            if let Some(event) = session.queue.pop_front() {
                session.emitted += 1;
                return Some((Ok(event), session));
            }
            if session.finished {
                return None;
            }

            match session.body.next().await {
                Some(Ok(chunk)) => {
                    session.push_chunk(&chunk);
                    let events = session.decoder.feed(&session.buffer);
                    session.queue.extend(events);
                }
                Some(Err(e)) => {
                    let err: StreamError = e.into();
                    debug!(
                        error = %err,
                        emitted = session.emitted,
                        received = session.buffer.len(),
                        "Message stream failed"
                    );
                    session.decoder.fail();
                    session.queue.clear();
                    session.finished = true;
                    return Some((Err(err), session));
                }
                None => {
                    session.flush_pending();
                    let events = session.decoder.feed(&session.buffer);
                    session.queue.extend(events);
                    if let Some(event) = session.decoder.finish(&session.buffer) {
                        session.queue.push_back(event);
                    }
                    session.finished = true;
                    debug!(
                        emitted = session.emitted + session.queue.len(),
                        received = session.buffer.len(),
                        "Message stream completed"
                    );
                }
            }
        }
    })
    .boxed()
}
