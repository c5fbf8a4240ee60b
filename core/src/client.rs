//! Asynchronous request helper with callback-based completion.
//!
//! # Design
//! `RequestClient::send` returns a `RequestHandle` immediately and drives the
//! request on a spawned Tokio task. That task owns the transport future, the
//! progress receiver and the callback, so no state is shared between
//! concurrent requests. It races four events in a fixed order: caller abort,
//! upload progress, transport completion, timeout. The first terminal event
//! wins and the others are dropped, which cancels the transport.
//!
//! `RequestClient::fetch` is the same exchange as a plain future, for callers
//! that want `?` instead of a callback.

use std::fmt;
use std::future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::body::RequestBody;
use crate::error::{RequestError, TransportError};
use crate::http::{HttpMethod, HttpRequest, CONTENT_TYPE, JSON_CONTENT_TYPE};
use crate::options::{ResponseKind, SendOptions};
use crate::outcome::{Outcome, Payload, Response, UploadProgress};
use crate::transport::{HttpTransport, ProgressSink, ReqwestTransport};

/// Process-unique identifier of a request, increasing in `send` order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type CancelSlot = Arc<Mutex<Option<oneshot::Sender<()>>>>;

/// Handle to a request started by `RequestClient::send`.
///
/// Dropping the handle does not cancel the request.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    id: RequestId,
    cancel_tx: CancelSlot,
}

impl RequestHandle {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Abort the request. No outcome is delivered after a successful abort.
    ///
    /// Returns `false` if the request already finished or was already
    /// aborted.
    pub fn abort(&self) -> bool {
        match self.cancel_tx.lock().take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// `true` until a terminal outcome is delivered or the request is aborted.
    pub fn is_pending(&self) -> bool {
        self.cancel_tx.lock().is_some()
    }
}

/// Issues HTTP requests through an `HttpTransport`.
#[derive(Clone)]
pub struct RequestClient {
    transport: Arc<dyn HttpTransport>,
}

impl Default for RequestClient {
    fn default() -> Self {
        Self::new(ReqwestTransport::new())
    }
}

impl fmt::Debug for RequestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestClient").finish_non_exhaustive()
    }
}

impl RequestClient {
    pub fn new(transport: impl HttpTransport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// Start one request and return without waiting for it.
    ///
    /// `on_result` receives zero or more `Outcome::UploadProgress` values
    /// (only with `options.report_upload_progress`) followed by exactly one
    /// terminal outcome. Pass `None::<fn(Outcome)>` to fire and forget.
    ///
    /// A `timeout_ms` of zero applies no timeout of our own; the request then
    /// runs until the transport gives up, which for the default
    /// `ReqwestTransport` means no limit.
    ///
    /// Every request carries `Content-type: application/json`, whatever the
    /// body.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn send<F>(
        &self,
        destination: &str,
        body: impl Into<RequestBody>,
        on_result: Option<F>,
        timeout_ms: u64,
        options: &SendOptions,
    ) -> RequestHandle
    where
        F: FnMut(Outcome) + Send + 'static,
    {
        let id = RequestId::next();
        let request = build_request(destination, body.into(), &options.method);
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let handle = RequestHandle {
            id,
            cancel_tx: Arc::new(Mutex::new(Some(cancel_tx))),
        };

        tracing::debug!(
            target: "xhr_core::client",
            %id,
            method = %request.method,
            url = %request.url,
            body_len = request.body.len(),
            "sending request"
        );

        let exchange = Exchange {
            id,
            transport: Arc::clone(&self.transport),
            request,
            kind: options.response_kind,
            report_progress: options.report_upload_progress,
            timeout: timeout_from_ms(timeout_ms),
        };
        tokio::spawn(exchange.drive(Arc::clone(&handle.cancel_tx), cancel_rx, on_result));

        handle
    }

    /// Perform one request and await its terminal result.
    ///
    /// Same semantics as `send` without progress reporting.
    pub async fn fetch(
        &self,
        destination: &str,
        body: impl Into<RequestBody>,
        timeout_ms: u64,
        options: &SendOptions,
    ) -> Result<Response, RequestError> {
        let request = build_request(destination, body.into(), &options.method);
        let exchange = perform(self.transport.as_ref(), request, options.response_kind, None);
        match timeout_from_ms(timeout_ms) {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| RequestError::Timeout)?,
            None => exchange.await,
        }
    }
}

struct Exchange {
    id: RequestId,
    transport: Arc<dyn HttpTransport>,
    request: HttpRequest,
    kind: ResponseKind,
    report_progress: bool,
    timeout: Option<Duration>,
}

impl Exchange {
    async fn drive<F>(
        self,
        cancel_slot: CancelSlot,
        mut cancel_rx: oneshot::Receiver<()>,
        mut on_result: Option<F>,
    ) where
        F: FnMut(Outcome) + Send + 'static,
    {
        let Exchange {
            id,
            transport,
            request,
            kind,
            report_progress,
            timeout,
        } = self;
        let mut deliver = |outcome: Outcome| {
            if let Some(callback) = on_result.as_mut() {
                callback(outcome);
            }
        };

        let (sink, mut ticks) = if report_progress {
            let (sink, ticks) = ProgressSink::channel();
            (Some(sink), Some(ticks))
        } else {
            (None, None)
        };

        let mut exchange = Box::pin(perform(transport.as_ref(), request, kind, sink));
        let expiry = expire_after(timeout);
        tokio::pin!(expiry);

        let result = loop {
            tokio::select! {
                biased;
                _ = &mut cancel_rx => {
                    tracing::debug!(target: "xhr_core::client", %id, "request aborted");
                    return;
                }
                Some(tick) = next_tick(&mut ticks) => {
                    tracing::trace!(target: "xhr_core::client", %id, loaded = tick.loaded, "upload progress");
                    deliver(Outcome::UploadProgress(tick));
                }
                result = &mut exchange => break result,
                () = &mut expiry => break Err(RequestError::Timeout),
            }
        };
        drop(exchange);

        // An abort that raced completion already emptied the slot. Claim it
        // before delivering anything else.
        if cancel_slot.lock().take().is_none() {
            tracing::debug!(target: "xhr_core::client", %id, "request aborted");
            return;
        }

        if let Some(ticks) = ticks.as_mut() {
            while let Ok(tick) = ticks.try_recv() {
                deliver(Outcome::UploadProgress(tick));
            }
        }

        match &result {
            Ok(response) => tracing::debug!(
                target: "xhr_core::client",
                %id,
                elapsed_ms = response.elapsed_ms,
                "request completed"
            ),
            Err(RequestError::Server { status }) => {
                tracing::debug!(target: "xhr_core::client", %id, status, "server returned error status")
            }
            Err(err) => tracing::warn!(target: "xhr_core::client", %id, error = %err, "request failed"),
        }

        if let Some(outcome) = Outcome::from_result(result) {
            deliver(outcome);
        }
    }
}

/// One transport round trip plus decoding. Elapsed time is measured from the
/// moment the transport operation begins.
async fn perform(
    transport: &dyn HttpTransport,
    request: HttpRequest,
    kind: ResponseKind,
    progress: Option<ProgressSink>,
) -> Result<Response, RequestError> {
    if request.url.is_empty() {
        return Err(TransportError::new("destination is empty").into());
    }

    let started = Instant::now();
    let response = transport.execute(request, progress).await?;
    if response.status != 200 {
        return Err(RequestError::Server {
            status: response.status,
        });
    }
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let payload = Payload::decode(response.body, kind).map_err(|e| RequestError::Decode(e.to_string()))?;

    Ok(Response {
        payload,
        elapsed_ms,
        headers: response.headers,
    })
}

fn build_request(destination: &str, body: RequestBody, method: &HttpMethod) -> HttpRequest {
    HttpRequest {
        method: method.clone(),
        url: destination.to_string(),
        headers: vec![(CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string())],
        body: body.into_bytes(),
    }
}

fn timeout_from_ms(timeout_ms: u64) -> Option<Duration> {
    (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms))
}

async fn expire_after(timeout: Option<Duration>) {
    match timeout {
        Some(limit) => tokio::time::sleep(limit).await,
        None => future::pending().await,
    }
}

async fn next_tick(ticks: &mut Option<mpsc::UnboundedReceiver<UploadProgress>>) -> Option<UploadProgress> {
    match ticks {
        Some(ticks) => ticks.recv().await,
        None => future::pending().await,
    }
}
