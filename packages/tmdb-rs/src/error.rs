//! Error types for the TMDB client.

use thiserror::Error;

use crate::models::StatusResponse;

/// Result type for TMDB client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// TMDB client errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure (connection refused, DNS, TLS, timeout)
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response. `message` is the provider's `status_message` when
    /// the body carried one.
    #[error("{message}")]
    Api {
        status: u16,
        status_code: Option<i32>,
        message: String,
    },

    /// 2xx response whose body did not match the expected shape
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// An account endpoint was called without a session
    #[error("no session: log in first")]
    MissingSession,
}

impl Error {
    /// Build an `Api` error from a failed response body.
    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<StatusResponse>(body) {
            Ok(parsed) if !parsed.status_message.is_empty() => Error::Api {
                status,
                status_code: Some(parsed.status_code),
                message: parsed.status_message,
            },
            _ => Error::Api {
                status,
                status_code: None,
                message: if body.trim().is_empty() {
                    format!("TMDB returned HTTP {}", status)
                } else {
                    body.trim().to_string()
                },
            },
        }
    }

    /// HTTP status of an `Api` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
