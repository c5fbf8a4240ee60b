//! The I/O seam between `RequestClient` and the network.
//!
//! # Design
//! `RequestClient` owns timing, decoding and callback delivery. A transport
//! only moves bytes: it executes one `HttpRequest`, optionally reports upload
//! progress through a `ProgressSink`, and returns the raw `HttpResponse`.
//! Tests substitute a scripted transport; production code uses
//! `ReqwestTransport`.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse, ResponseBody};
use crate::outcome::UploadProgress;

/// Default size of each upload chunk when progress is reported (16 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Receives upload progress ticks from a transport.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<UploadProgress>,
}

impl ProgressSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UploadProgress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Report one tick. Ticks sent after the request finished are dropped.
    pub fn report(&self, progress: UploadProgress) {
        if self.tx.send(progress).is_err() {
            tracing::trace!(target: "xhr_core::transport", loaded = progress.loaded, "progress tick discarded");
        }
    }
}

/// Executes HTTP requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Execute `request` and return the completed response.
    ///
    /// Any HTTP status, including 4xx and 5xx, is a successful execution.
    /// `Err` means no status was obtained. When `progress` is set the
    /// transport reports upload ticks through it.
    async fn execute(
        &self,
        request: HttpRequest,
        progress: Option<ProgressSink>,
    ) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn execute(
        &self,
        request: HttpRequest,
        progress: Option<ProgressSink>,
    ) -> Result<HttpResponse, TransportError> {
        (**self).execute(request, progress).await
    }
}

/// `HttpTransport` backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    chunk_size: usize,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Upload chunk size used when progress is reported. Clamped to at least
    /// one byte.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(
        &self,
        request: HttpRequest,
        progress: Option<ProgressSink>,
    ) -> Result<HttpResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::new(format!("invalid method: {e}")))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let body = match progress {
            Some(sink) => progress_body(request.body, self.chunk_size, sink),
            None => reqwest::Body::from(request.body),
        };

        let response = builder.body(body).send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status,
            headers,
            body: ResponseBody::Bytes(body),
        })
    }
}

/// Split `body` into chunks and report a tick as each one is pulled by the
/// connection.
fn progress_body(body: Bytes, chunk_size: usize, sink: ProgressSink) -> reqwest::Body {
    let total = body.len() as u64;
    let mut loaded = 0u64;
    let stream = stream::iter(chunks(&body, chunk_size)).map(move |chunk| {
        loaded += chunk.len() as u64;
        sink.report(UploadProgress {
            loaded,
            total: Some(total),
        });
        Ok::<Bytes, std::io::Error>(chunk)
    });
    reqwest::Body::wrap_stream(stream)
}

fn chunks(body: &Bytes, chunk_size: usize) -> Vec<Bytes> {
    (0..body.len())
        .step_by(chunk_size)
        .map(|start| body.slice(start..(start + chunk_size).min(body.len())))
        .collect()
}
