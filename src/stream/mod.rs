//! Streamed chat answers.
//!
//! The backend answers a chat message with a JSON array streamed without its
//! brackets, one object per line:
//!
//! ```text
//! {"type":"text","value":"Hel"}
//! ,{"type":"text","value":"lo"}
//! ,{"type":"error:ValueError","value":"..."}
//! ```
//!
//! # Module structure
//! - `events` - [`StreamedEvent`] and its [`EventKind`] classification
//! - `decoder` - [`JsonLinesDecoder`], the transport-agnostic state machine
//! - `response` - [`decode_response`], the async adapter over an HTTP body

mod decoder;
mod events;
mod response;

pub use decoder::{DecoderConfig, JsonLinesDecoder, SessionState};
pub use events::{EventKind, StreamedEvent, ERROR_EVENT_PREFIX, TEXT_EVENT};
pub use response::{decode_response, EventStream};
