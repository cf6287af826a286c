//! narrow abstraction over synchronous request execution and fire-and-forget
//! asynchronous request execution with a timeout. this is the only boundary
//! a host application needs to implement to drive [StatementClient] without
//! pulling in the default transport.
//!
//! [StatementClient]: crate::statement_client::StatementClient

use std::{future::Future, time::Duration};

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Uri};
use tokio::sync::oneshot;

use crate::error::TransportError;

/// a request ready to dispatch: method, absolute URI, headers, and body.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: http::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }
}

/// raw response as returned by the transport, before JSON decoding.
#[derive(Debug, Clone)]
pub struct RawHttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// narrow transport boundary: one synchronous call, one fire-and-forget call.
///
/// implementations are shared across the statement client's lifetime and must
/// be safe to call concurrently (one `execute` in flight for paging, any
/// number of `execute_async` calls for cancellation and cleanup).
pub trait HttpPort: Send + Sync + 'static {
    /// execute `req` and wait for the full response. fails with
    /// [TransportError] on any I/O or protocol level problem; HTTP-level error
    /// statuses are still `Ok` and left to the caller to classify.
    fn execute(&self, req: HttpRequest) -> impl Future<Output = Result<RawHttpResponse, TransportError>> + Send;

    /// dispatch `req` without waiting for it here; the returned handle can be
    /// awaited (with a timeout) or dropped to abandon the request.
    fn execute_async(&self, req: HttpRequest) -> AsyncHandle;
}

/// handle to an in-flight fire-and-forget request started by
/// [HttpPort::execute_async].
pub struct AsyncHandle {
    rx: oneshot::Receiver<Result<RawHttpResponse, TransportError>>,
    abort: Option<tokio::task::AbortHandle>,
}

impl AsyncHandle {
    /// spawn `fut` on the current tokio runtime and return a handle to its
    /// eventual result. the pack's own async transport callers (timeouts,
    /// cancellation) follow this same spawn-then-race shape.
    pub fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = Result<RawHttpResponse, TransportError>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let join = tokio::spawn(async move {
            let res = fut.await;
            let _ = tx.send(res);
        });
        Self {
            rx,
            abort: Some(join.abort_handle()),
        }
    }

    /// wait up to `timeout` for the request to complete. returns `None` on
    /// timeout elapsing or the task being aborted/panicking; never set as a
    /// lifecycle-mutating condition by callers (see `cancel_leaf_stage`).
    pub async fn wait(self, timeout: Duration) -> Option<Result<RawHttpResponse, TransportError>> {
        tokio::time::timeout(timeout, self.rx).await.ok().and_then(Result::ok)
    }

    /// abandon the request without waiting for its outcome. used by `close`'s
    /// best-effort cleanup DELETE.
    pub fn detach(self) {
        drop(self);
    }

    /// cooperative cancellation of the in-flight task, if still running.
    pub fn cancel(&self) {
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }
}
