//! Errors that end a streamed answer.
//!
//! Malformed lines inside the stream are not errors; the decoder drops them.
//! Only transport failures terminate a decoding session.

use std::fmt;

use super::ErrorCategory;

/// Terminal failure of a message stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The connection dropped or the body could not be read.
    ConnectionLost {
        message: String,
    },

    /// No data arrived within the client timeout.
    Timeout {
        message: String,
    },
}

impl StreamError {
    /// Check if re-issuing the request might succeed.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Stream failures are always network failures.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Network
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            StreamError::ConnectionLost { .. } => {
                "Connection to the server was lost before the answer finished.".to_string()
            }
            StreamError::Timeout { .. } => {
                "The server stopped responding before the answer finished.".to_string()
            }
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            StreamError::ConnectionLost { .. } => "E_STREAM_CONN",
            StreamError::Timeout { .. } => "E_STREAM_TIMEOUT",
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::ConnectionLost { message } => {
                write!(f, "Stream connection lost: {}", message)
            }
            StreamError::Timeout { message } => write!(f, "Stream timed out: {}", message),
        }
    }
}

impl std::error::Error for StreamError {}

impl From<reqwest::Error> for StreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StreamError::Timeout {
                message: e.to_string(),
            }
        } else {
            StreamError::ConnectionLost {
                message: e.to_string(),
            }
        }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut => StreamError::Timeout {
                message: e.to_string(),
            },
            _ => StreamError::ConnectionLost {
                message: e.to_string(),
            },
        }
    }
}
