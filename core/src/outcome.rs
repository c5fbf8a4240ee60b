//! Results delivered to a request's completion callback.
//!
//! A request delivers any number of `UploadProgress` notifications followed
//! by exactly one terminal outcome. Nothing is delivered after the terminal
//! outcome.

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::error::{RequestError, TransportError};
use crate::http::ResponseBody;
use crate::options::ResponseKind;

/// Snapshot of upload progress at one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UploadProgress {
    /// Bytes handed to the connection so far.
    pub loaded: u64,
    /// Total body length, when known.
    pub total: Option<u64>,
}

/// Decoded body of a 200 response.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Raw(Bytes),
}

impl Payload {
    /// Decode a response body according to `kind`.
    ///
    /// A body the transport already decoded to JSON passes through unchanged
    /// for either kind. An empty body decodes to `null` under `Json`.
    pub fn decode(body: ResponseBody, kind: ResponseKind) -> Result<Self, serde_json::Error> {
        match (body, kind) {
            (ResponseBody::Json(value), _) => Ok(Payload::Json(value)),
            (ResponseBody::Bytes(bytes), ResponseKind::Json) if bytes.is_empty() => {
                Ok(Payload::Json(Value::Null))
            }
            (ResponseBody::Bytes(bytes), ResponseKind::Json) => {
                serde_json::from_slice(&bytes).map(Payload::Json)
            }
            (ResponseBody::Bytes(bytes), ResponseKind::Raw) => Ok(Payload::Raw(bytes)),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&Bytes> {
        match self {
            Payload::Raw(bytes) => Some(bytes),
            Payload::Json(_) => None,
        }
    }
}

/// A decoded 200 response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub payload: Payload,
    /// Milliseconds from the start of the transport operation to completion.
    pub elapsed_ms: u64,
    pub headers: Vec<(String, String)>,
}

impl Response {
    /// Look up a response header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// One notification delivered to a completion callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ok {
        payload: Payload,
        elapsed_ms: u64,
        headers: Vec<(String, String)>,
    },

    /// `status` is `Some` when the server answered with a non-200 status and
    /// `None` when the transport failed before any status was available.
    Error { status: Option<u16> },

    Timeout,

    /// A 200 response could not be decoded as JSON.
    DecodeFailure { message: String },

    /// Non-terminal; may repeat before the terminal outcome.
    UploadProgress(UploadProgress),
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::UploadProgress(_))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok { .. })
    }

    /// Elapsed time, reported for `Ok` only.
    pub fn elapsed_ms(&self) -> Option<u64> {
        match self {
            Outcome::Ok { elapsed_ms, .. } => Some(*elapsed_ms),
            _ => None,
        }
    }

    /// Response header by case-insensitive name, reported for `Ok` only.
    pub fn header(&self, name: &str) -> Option<&str> {
        match self {
            Outcome::Ok { headers, .. } => header_value(headers, name),
            _ => None,
        }
    }

    /// Server status, reported for `Error` only.
    pub fn status(&self) -> Option<u16> {
        match self {
            Outcome::Error { status } => *status,
            _ => None,
        }
    }

    /// Fold a request result into the outcome delivered to callbacks.
    ///
    /// Returns `None` for `Aborted`: an aborted request delivers nothing.
    pub fn from_result(result: Result<Response, RequestError>) -> Option<Self> {
        let outcome = match result {
            Ok(Response {
                payload,
                elapsed_ms,
                headers,
            }) => Outcome::Ok {
                payload,
                elapsed_ms,
                headers,
            },
            Err(RequestError::Transport(_)) => Outcome::Error { status: None },
            Err(RequestError::Server { status }) => Outcome::Error {
                status: Some(status),
            },
            Err(RequestError::Timeout) => Outcome::Timeout,
            Err(RequestError::Decode(message)) => Outcome::DecodeFailure { message },
            Err(RequestError::Aborted) => return None,
        };
        Some(outcome)
    }

    /// Convert a terminal outcome into a `Result`. Returns `None` for
    /// progress notifications.
    pub fn into_result(self) -> Option<Result<Response, RequestError>> {
        let result = match self {
            Outcome::Ok {
                payload,
                elapsed_ms,
                headers,
            } => Ok(Response {
                payload,
                elapsed_ms,
                headers,
            }),
            Outcome::Error {
                status: Some(status),
            } => Err(RequestError::Server { status }),
            Outcome::Error { status: None } => Err(RequestError::Transport(TransportError::new(
                "no status available",
            ))),
            Outcome::Timeout => Err(RequestError::Timeout),
            Outcome::DecodeFailure { message } => Err(RequestError::Decode(message)),
            Outcome::UploadProgress(_) => return None,
        };
        Some(result)
    }
}
