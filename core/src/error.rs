//! Error types for the request helper.
//!
//! # Design
//! The callback path of `RequestClient::send` never surfaces these directly;
//! it folds them into `Outcome` variants. `RequestClient::fetch` returns
//! `RequestError` so callers can use `?`.

use thiserror::Error;

/// The transport failed before any HTTP status was available.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport failed: {message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Keeps the whole source chain; reqwest's top-level message alone hides the
/// connect failure.
impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        TransportError::new(message)
    }
}

/// Why a request did not produce a decoded 200 response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a status other than 200.
    #[error("server responded with HTTP {status}")]
    Server { status: u16 },

    #[error("request timed out")]
    Timeout,

    /// A 200 response body was not valid JSON.
    #[error("response body is not valid JSON: {0}")]
    Decode(String),

    /// The caller aborted the request through its handle.
    #[error("request was aborted")]
    Aborted,
}

/// A `ByteView` range that does not fit its backing buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("view of {len} bytes at offset {offset} exceeds backing buffer of {available} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        available: usize,
    },
}
