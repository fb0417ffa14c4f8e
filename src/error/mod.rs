//! Error taxonomy shared by the client and the stream decoder.
//!
//! | Category | Description | Retryable |
//! |----------|-------------|-----------|
//! | Network | Connection dropped, timeout | Yes |
//! | Auth | HTTP 401/403 | No |
//! | Server | HTTP 5xx | Yes |
//! | Client | HTTP 4xx, undecodable reply | No |
//! | Configuration | Bad URL or settings | No |
//!
//! Request-level errors live in [`crate::client::ClientError`] and map
//! onto these categories.

mod category;
mod stream;

pub use category::ErrorCategory;
pub use stream::StreamError;
