//! Asynchronous HTTP request helper.
//!
//! # Overview
//! `RequestClient::send` issues one request, returns a `RequestHandle`
//! immediately, and reports back through a callback: zero or more upload
//! progress notifications, then exactly one terminal `Outcome` (`Ok`,
//! `Error`, `Timeout` or `DecodeFailure`). `RequestClient::fetch` is the
//! awaitable equivalent.
//!
//! # Design
//! - I/O sits behind the `HttpTransport` trait. `ReqwestTransport` is the
//!   default; tests script their own.
//! - Request and response types are plain data (`http` module), so the
//!   client's timing and decoding logic is testable without a network.
//! - Failures never escape `send`: each one becomes an `Outcome` variant.

pub mod body;
pub mod client;
pub mod error;
pub mod http;
pub mod options;
pub mod outcome;
pub mod transport;

pub use body::{ByteView, RequestBody};
pub use client::{RequestClient, RequestHandle, RequestId};
pub use error::{RequestError, TransportError, ViewError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, ResponseBody};
pub use options::{ResponseKind, SendOptions};
pub use outcome::{Outcome, Payload, Response, UploadProgress};
pub use transport::{HttpTransport, ProgressSink, ReqwestTransport};
