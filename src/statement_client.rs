//! the statement client state machine: submits a query, advances through
//! `nextUri` pages with retry/backoff, harvests session mutations from
//! response headers, and supports partial and full cancellation.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use arc_swap::ArcSwapOption;
use dashmap::{DashMap, DashSet};
use http::{HeaderValue, Method};
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    error::{Error, ProtocolError, TransportError},
    headers,
    http_port::{HttpPort, HttpRequest},
    query_results::QueryResults,
    response::ResponseEnvelope,
    session::ClientSession,
};

/// the statement client: holds mutable progress state across many HTTP
/// round trips. thread-safe: one caller typically drives `advance` while
/// others observe `current`, `is_valid`, `get_set_session_properties`, etc.
pub struct StatementClient<P> {
    session: ClientSession,
    http_port: Arc<P>,

    current_results: ArcSwapOption<QueryResults>,

    set_session_properties: DashMap<String, String>,
    reset_session_properties: DashSet<String>,
    added_prepared_statements: DashMap<String, String>,
    deallocated_prepared_statements: DashSet<String>,
    started_transaction_id: ArcSwapOption<String>,
    clear_transaction_id: AtomicBool,

    valid: AtomicBool,
    closed: AtomicBool,
    gone: AtomicBool,

    /// cooperative cancellation of an in-flight `advance` backoff sleep;
    /// distinct from `closed`, which also ends the loop but isn't an error.
    interrupt: CancellationToken,
}

impl<P: HttpPort> StatementClient<P> {
    /// `POST {server}/v1/statement` with `query` as the UTF-8 body, then
    /// process the first page. leaves the client usable on success.
    pub async fn submit(session: ClientSession, http_port: Arc<P>, query: &str) -> Result<Self, Error> {
        let uri = format!("{}/v1/statement", session.server.trim_end_matches('/'))
            .parse()
            .expect("session.server + /v1/statement must be a valid URI");

        let mut req = HttpRequest::new(Method::POST, uri).with_body(query.to_string());
        req.headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
        apply_full_headers(&mut req, &session);

        debug!(server = %session.server, "starting query");

        let raw = http_port
            .execute(req)
            .await
            .map_err(|e| TransportError::with_cause("starting query", e))?;

        let env = ResponseEnvelope::<QueryResults>::from_parts(raw.status, raw.headers, raw.body.to_vec());

        if env.status != http::StatusCode::OK || !env.has_value() {
            return Err(ProtocolError {
                task: "starting query",
                status: env.status.as_u16(),
                reason: env.reason.clone(),
                body: env.raw_body().to_vec(),
            }
            .into());
        }

        let client = Self {
            session,
            http_port,
            current_results: ArcSwapOption::empty(),
            set_session_properties: DashMap::new(),
            reset_session_properties: DashSet::new(),
            added_prepared_statements: DashMap::new(),
            deallocated_prepared_statements: DashSet::new(),
            started_transaction_id: ArcSwapOption::empty(),
            clear_transaction_id: AtomicBool::new(false),
            valid: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            gone: AtomicBool::new(false),
            interrupt: CancellationToken::new(),
        };

        client.process_response(&env);

        Ok(client)
    }

    /// pull the next page, following `nextUri`. returns `false` exactly when
    /// the prior page's `nextUri` is null or the client has been closed; in
    /// both cases `is_valid()` becomes false.
    pub async fn advance(&self) -> Result<bool, Error> {
        let current = self.current_results.load_full().expect("advance called before submit");

        let Some(next_uri) = current.next_uri.clone() else {
            self.valid.store(false, Ordering::Release);
            return Ok(false);
        };

        if self.closed.load(Ordering::Acquire) {
            self.valid.store(false, Ordering::Release);
            return Ok(false);
        }

        let uri = next_uri.parse().map_err(|_| {
            self.gone.store(true, Ordering::Release);
            TransportError::new(format!("invalid nextUri: {next_uri}"))
        })?;

        let deadline = Instant::now() + self.session.client_request_timeout;
        let mut attempt: u32 = 0;
        let mut last_cause: Option<TransportError> = None;

        loop {
            if attempt > 0 && self.closed.load(Ordering::Acquire) {
                self.gone.store(true, Ordering::Release);
                return Err(last_cause.unwrap_or_else(|| TransportError::new("closed during retry")).into());
            }

            attempt += 1;
            if attempt > 1 {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    self.gone.store(true, Ordering::Release);
                    return Err(last_cause.unwrap_or_else(|| TransportError::new("retry deadline elapsed")).into());
                }
                let backoff = Duration::from_millis(100 * u64::from(attempt - 1)).min(remaining);

                tokio::select! {
                    _ = tokio::time::sleep(backoff) => {}
                    _ = self.interrupt.cancelled() => {
                        self.close();
                        return Err(Error::Interrupted);
                    }
                }
            }

            let mut req = HttpRequest::new(Method::GET, uri.clone());
            apply_identity_headers(&mut req, &self.session);

            match self.http_port.execute(req).await {
                Ok(raw) if raw.status == http::StatusCode::OK => {
                    let env = ResponseEnvelope::<QueryResults>::from_parts(raw.status, raw.headers, raw.body.to_vec());
                    if !env.has_value() {
                        self.gone.store(true, Ordering::Release);
                        return Err(ProtocolError {
                            task: "fetching next",
                            status: env.status.as_u16(),
                            reason: env.reason.clone(),
                            body: env.raw_body().to_vec(),
                        }
                        .into());
                    }
                    self.process_response(&env);
                    return Ok(true);
                }
                Ok(raw) if raw.status == http::StatusCode::SERVICE_UNAVAILABLE => {
                    warn!(attempt, "received 503, retrying");
                    last_cause = Some(TransportError::new("503 Service Unavailable"));
                }
                Ok(raw) => {
                    self.gone.store(true, Ordering::Release);
                    return Err(ProtocolError {
                        task: "fetching next",
                        status: raw.status.as_u16(),
                        reason: raw.status.canonical_reason().unwrap_or("").to_string(),
                        body: raw.body.to_vec(),
                    }
                    .into());
                }
                Err(e) => {
                    warn!(attempt, error = %e, "transport error, retrying");
                    last_cause = Some(e);
                }
            }

            if Instant::now() >= deadline {
                self.gone.store(true, Ordering::Release);
                return Err(last_cause.unwrap_or_else(|| TransportError::new("retry deadline elapsed")).into());
            }
        }
    }

    /// apply session mutation headers, then atomically publish the new page.
    /// headers are applied first so that any reader observing the new page
    /// also observes at least the mutations that arrived with it.
    fn process_response(&self, env: &ResponseEnvelope<QueryResults>) {
        for raw in env.header_all(&headers::PRESTO_SET_SESSION) {
            if let Some((k, v)) = raw.split_once('=') {
                self.set_session_properties.insert(k.trim().to_string(), v.trim().to_string());
            }
        }
        for raw in env.header_all(&headers::PRESTO_CLEAR_SESSION) {
            self.reset_session_properties.insert(raw.trim().to_string());
        }
        for raw in env.header_all(&headers::PRESTO_ADDED_PREPARE) {
            if let Some((k, v)) = raw.split_once('=') {
                if let (Ok(k), Ok(v)) = (decode_component(k), decode_component(v)) {
                    self.added_prepared_statements.insert(k, v);
                }
            }
        }
        for raw in env.header_all(&headers::PRESTO_DEALLOCATED_PREPARE) {
            if let Ok(name) = decode_component(raw) {
                self.deallocated_prepared_statements.insert(name);
            }
        }
        if let Some(id) = env.header(&headers::PRESTO_STARTED_TRANSACTION_ID) {
            self.started_transaction_id.store(Some(Arc::new(id.to_string())));
        }
        if env.header(&headers::PRESTO_CLEAR_TRANSACTION_ID).is_some() {
            self.clear_transaction_id.store(true, Ordering::Release);
        }

        let page = env.value().expect("caller verified has_value()").clone();
        self.current_results.store(Some(Arc::new(page)));
    }

    /// request cancellation of the current leaf stage. never mutates
    /// lifecycle flags. returns `false` if there's nothing to cancel, the
    /// wait times out, or the server didn't answer with a `2xx`.
    pub async fn cancel_leaf_stage(&self, timeout: Duration) -> Result<bool, Error> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::IllegalState("cancel_leaf_stage called after close"));
        }

        let current = self.current_results.load_full().expect("cancel_leaf_stage called before submit");
        let Some(uri) = current.partial_cancel_uri.clone() else {
            return Ok(false);
        };
        let uri = uri.parse().map_err(|_| TransportError::new(format!("invalid partialCancelUri: {uri}")))?;

        let mut req = HttpRequest::new(Method::DELETE, uri);
        apply_identity_headers(&mut req, &self.session);

        let handle = self.http_port.execute_async(req);
        match handle.wait(timeout).await {
            Some(Ok(raw)) => Ok(raw.status.is_success()),
            Some(Err(e)) => Err(TransportError::with_cause("cancelling leaf stage", e).into()),
            None => Ok(false),
        }
    }

    /// idempotent. releases server resources for the current `nextUri` with a
    /// best-effort, unawaited `DELETE`.
    pub fn close(&self) {
        if self.closed.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok() {
            if let Some(current) = self.current_results.load_full() {
                if let Some(next_uri) = current.next_uri.clone() {
                    if let Ok(uri) = next_uri.parse() {
                        let mut req = HttpRequest::new(Method::DELETE, uri);
                        apply_identity_headers(&mut req, &self.session);
                        self.http_port.execute_async(req).detach();
                    }
                }
            }
        }
    }

    /// cooperative cancellation of an in-flight `advance`'s backoff sleep,
    /// analogous to interrupting the paging thread in the source design.
    pub fn interrupt(&self) {
        self.interrupt.cancel();
    }

    /// `valid AND NOT gone AND NOT closed`.
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire) && !self.gone.load(Ordering::Acquire) && !self.closed.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn is_gone(&self) -> bool {
        self.gone.load(Ordering::Acquire)
    }

    /// `true` iff the most recently observed page carries a server error.
    /// unlike `current()`, this does not require `is_valid()`.
    pub fn is_failed(&self) -> bool {
        self.current_results
            .load_full()
            .map(|p| p.error.is_some())
            .unwrap_or(false)
    }

    /// the current page. requires `is_valid()`.
    pub fn current(&self) -> Result<Arc<QueryResults>, Error> {
        if !self.is_valid() {
            return Err(Error::IllegalState("current() called while not valid"));
        }
        Ok(self.current_results.load_full().expect("valid implies a page was published"))
    }

    /// the final page. requires NOT `is_valid()` OR `is_failed()`.
    pub fn final_results(&self) -> Result<Arc<QueryResults>, Error> {
        if self.is_valid() && !self.is_failed() {
            return Err(Error::IllegalState("final_results() called while still valid and not failed"));
        }
        Ok(self.current_results.load_full().expect("submit() always publishes a page"))
    }

    pub fn get_set_session_properties(&self) -> HashMap<String, String> {
        self.set_session_properties.iter().map(|e| (e.key().clone(), e.value().clone())).collect()
    }

    pub fn get_reset_session_properties(&self) -> HashSet<String> {
        self.reset_session_properties.iter().map(|e| e.key().clone()).collect()
    }

    pub fn get_added_prepared_statements(&self) -> HashMap<String, String> {
        self.added_prepared_statements.iter().map(|e| (e.key().clone(), e.value().clone())).collect()
    }

    pub fn get_deallocated_prepared_statements(&self) -> HashSet<String> {
        self.deallocated_prepared_statements.iter().map(|e| e.key().clone()).collect()
    }

    pub fn started_transaction_id(&self) -> Option<String> {
        self.started_transaction_id.load_full().map(|s| (*s).clone())
    }

    pub fn is_clear_transaction_id(&self) -> bool {
        self.clear_transaction_id.load(Ordering::Acquire)
    }

    pub fn session(&self) -> &ClientSession {
        &self.session
    }
}

fn decode_component(s: &str) -> Result<String, std::str::Utf8Error> {
    percent_decode_str(s.trim()).decode_utf8().map(|c| c.into_owned())
}

/// `X-Presto-User` and `User-Agent` only, used for `nextUri`/cancel/close
/// requests, which carry no session context.
fn apply_identity_headers(req: &mut HttpRequest, session: &ClientSession) {
    req.headers.insert(
        headers::PRESTO_USER.clone(),
        HeaderValue::from_str(&session.user).expect("session.user must be a valid header value"),
    );
    req.headers.insert(
        http::header::USER_AGENT,
        HeaderValue::from_str(&headers::user_agent()).unwrap(),
    );
}

/// the full set of outbound headers for the initial statement submission.
fn apply_full_headers(req: &mut HttpRequest, session: &ClientSession) {
    apply_identity_headers(req, session);

    if let Some(source) = &session.source {
        req.headers.insert(headers::PRESTO_SOURCE.clone(), HeaderValue::from_str(source).unwrap());
    }
    if let Some(catalog) = &session.catalog {
        req.headers.insert(headers::PRESTO_CATALOG.clone(), HeaderValue::from_str(catalog).unwrap());
    }
    if let Some(schema) = &session.schema {
        req.headers.insert(headers::PRESTO_SCHEMA.clone(), HeaderValue::from_str(schema).unwrap());
    }
    req.headers.insert(
        headers::PRESTO_TIME_ZONE.clone(),
        HeaderValue::from_str(&session.time_zone_id).unwrap(),
    );
    req.headers.insert(headers::PRESTO_LANGUAGE.clone(), HeaderValue::from_str(&session.language).unwrap());

    for (k, v) in &session.properties {
        let value = format!("{k}={v}");
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            req.headers.append(headers::PRESTO_SESSION.clone(), header_value);
        }
    }

    for (k, v) in &session.prepared_statements {
        let encoded = format!(
            "{}={}",
            utf8_percent_encode(k, NON_ALPHANUMERIC),
            utf8_percent_encode(v, NON_ALPHANUMERIC)
        );
        if let Ok(header_value) = HeaderValue::from_str(&encoded) {
            req.headers.append(headers::PRESTO_PREPARED_STATEMENT.clone(), header_value);
        }
    }

    let transaction_id = session.transaction_id.as_deref().unwrap_or(headers::NO_TRANSACTION);
    req.headers.insert(
        headers::PRESTO_TRANSACTION_ID.clone(),
        HeaderValue::from_str(transaction_id).unwrap(),
    );
}
