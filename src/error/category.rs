//! Error category classification.
//!
//! Categories drive retry decisions and the hint shown next to a failure.

use std::fmt;

/// High-level categorization of errors for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection refused, dropped or timed out.
    /// Generally transient and retryable.
    Network,

    /// The backend rejected our credentials (HTTP 401/403).
    Auth,

    /// Backend-side failure (HTTP 5xx).
    /// Generally transient and retryable after delay.
    Server,

    /// We sent something the backend did not accept, or could not read its reply.
    Client,

    /// Missing or invalid settings (bad URL, missing token).
    Configuration,
}

impl ErrorCategory {
    /// Returns true if errors in this category are generally transient
    /// and the request can be re-issued.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Network | ErrorCategory::Server)
    }

    /// Returns a short label for the category suitable for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Server => "server",
            ErrorCategory::Client => "client",
            ErrorCategory::Configuration => "configuration",
        }
    }

    /// Returns suggested recovery actions for this category.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "Check that the server is reachable and try again",
            ErrorCategory::Auth => "Log in again and export a fresh KBCHAT_TOKEN",
            ErrorCategory::Server => {
                "The server may be experiencing issues. Please try again later"
            }
            ErrorCategory::Client => "This may be a bug. Please report this issue if it persists",
            ErrorCategory::Configuration => "Check KBCHAT_URL and the other KBCHAT_* settings",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
