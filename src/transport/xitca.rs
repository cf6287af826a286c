//! default [HttpPort] backed by [xitca_client], the pack's own HTTP client.
//! enabled by the `xitca-transport` feature (on by default).

use std::time::Duration;

use http::Method;
use xitca_client::{error::Error as XitcaError, Client};

use crate::{
    error::TransportError,
    http_port::{AsyncHandle, HttpPort, HttpRequest, RawHttpResponse},
};

/// [HttpPort] adapter over a pooled [xitca_client::Client].
///
/// cheap to clone; the underlying client holds its own connection pool
/// behind an `Arc`.
pub struct XitcaTransport {
    client: Client,
}

impl XitcaTransport {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for XitcaTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpPort for XitcaTransport {
    async fn execute(&self, req: HttpRequest) -> Result<RawHttpResponse, TransportError> {
        send(&self.client, req).await
    }

    fn execute_async(&self, req: HttpRequest) -> AsyncHandle {
        // xitca_client::Client is cheaply cloneable (pool held behind Arc).
        let client = self.client.clone();
        AsyncHandle::spawn(async move { send(&client, req).await })
    }
}

async fn send(client: &Client, req: HttpRequest) -> Result<RawHttpResponse, TransportError> {
    let builder = match req.method {
        Method::GET => client.get(req.uri),
        Method::POST => client.post(req.uri),
        Method::DELETE => client.delete(req.uri),
        ref other => return Err(TransportError::new(format!("unsupported method: {other}"))),
    };

    let mut builder = builder.timeout(Duration::from_secs(30));
    for (name, value) in req.headers.iter() {
        builder.headers_mut().insert(name.clone(), value.clone());
    }

    let mut response = builder
        .body(req.body)
        .send()
        .await
        .map_err(|e: XitcaError| TransportError::with_cause("xitca transport", e))?;

    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .body()
        .await
        .map_err(|e| TransportError::with_cause("reading response body", e))?;

    Ok(RawHttpResponse {
        status,
        headers,
        body: body.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_constructs() {
        let _transport = XitcaTransport::default();
    }
}
