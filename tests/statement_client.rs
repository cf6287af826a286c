//! end-to-end exercise of the public API: submit a query, page through
//! results against a scripted transport, and materialize typed rows.

use std::sync::{Arc, Mutex};

use presto_client::{
    http_port::{AsyncHandle, HttpPort, HttpRequest, RawHttpResponse},
    ClientSession, Error, StatementClient, Value,
};

struct ScriptedTransport {
    posts: Mutex<Vec<Result<RawHttpResponse, presto_client::error::TransportError>>>,
    gets: Mutex<Vec<Result<RawHttpResponse, presto_client::error::TransportError>>>,
}

impl ScriptedTransport {
    fn new() -> Self {
        Self {
            posts: Mutex::new(Vec::new()),
            gets: Mutex::new(Vec::new()),
        }
    }
}

impl HttpPort for ScriptedTransport {
    async fn execute(&self, req: HttpRequest) -> Result<RawHttpResponse, presto_client::error::TransportError> {
        let queue = match req.method {
            http::Method::POST => &self.posts,
            http::Method::GET => &self.gets,
            other => panic!("unexpected method in test: {other}"),
        };
        queue.lock().unwrap().remove(0)
    }

    fn execute_async(&self, _req: HttpRequest) -> AsyncHandle {
        unimplemented!("not exercised in this test")
    }
}

fn ok_page(body: serde_json::Value) -> RawHttpResponse {
    RawHttpResponse {
        status: http::StatusCode::OK,
        headers: http::HeaderMap::new(),
        body: bytes::Bytes::from(body.to_string()),
    }
}

#[tokio::test]
async fn typed_row_materializes_through_the_full_pipeline() {
    let transport = ScriptedTransport::new();
    transport.posts.lock().unwrap().push(Ok(ok_page(serde_json::json!({
        "id": "q1",
        "infoUri": "http://coordinator/ui/q1",
        "columns": [{"name": "who", "type": "row(\"name\" varchar,\"age\" bigint)"}],
        "data": [[["ada", 36]]],
        "stats": {"state": "FINISHED"},
    }))));

    let session = ClientSession::builder("http://coordinator:8080", "alice").finish();
    let client = StatementClient::submit(session, Arc::new(transport), "SELECT who FROM people")
        .await
        .unwrap();

    assert!(!client.advance().await.unwrap());
    assert!(!client.is_valid());
    assert!(!client.is_failed());

    let page = client.final_results().unwrap();
    assert!(page.rows_match_columns());

    let column = &page.columns.as_ref().unwrap()[0];
    let sig = column.parsed_type().unwrap();
    let raw_row = &page.data.as_ref().unwrap()[0][0];
    let fixed = presto_client::fix(sig, raw_row).unwrap();

    match fixed {
        Value::Row(fields) => {
            assert_eq!(fields["name"], Value::Str("ada".into()));
            assert_eq!(fields["age"], Value::I64(36));
        }
        other => panic!("expected row, got {other:?}"),
    }
}

#[tokio::test]
async fn current_requires_validity_and_final_results_requires_the_opposite() {
    let transport = ScriptedTransport::new();
    transport.posts.lock().unwrap().push(Ok(ok_page(serde_json::json!({
        "id": "q1",
        "infoUri": "http://coordinator/ui/q1",
        "nextUri": "http://coordinator/v1/statement/q1/1",
        "stats": {"state": "RUNNING"},
    }))));

    let session = ClientSession::builder("http://coordinator:8080", "alice").finish();
    let client = StatementClient::submit(session, Arc::new(transport), "SELECT 1").await.unwrap();

    assert!(client.current().is_ok());
    assert!(matches!(client.final_results(), Err(Error::IllegalState(_))));
}

#[tokio::test]
async fn query_failure_is_reported_through_is_failed_not_as_an_err() {
    let transport = ScriptedTransport::new();
    transport.posts.lock().unwrap().push(Ok(ok_page(serde_json::json!({
        "id": "q1",
        "infoUri": "http://coordinator/ui/q1",
        "stats": {"state": "FAILED"},
        "error": {
            "message": "Table does not exist",
            "errorCode": 1234,
            "errorName": "TABLE_NOT_FOUND",
            "errorType": "USER_ERROR",
        },
    }))));

    let session = ClientSession::builder("http://coordinator:8080", "alice").finish();
    let client = StatementClient::submit(session, Arc::new(transport), "SELECT * FROM nope")
        .await
        .unwrap();

    assert!(!client.advance().await.unwrap());
    assert!(!client.is_valid());
    assert!(client.is_failed());
    let page = client.final_results().unwrap();
    assert_eq!(page.error.as_ref().unwrap().error_name.as_deref(), Some("TABLE_NOT_FOUND"));
}

#[tokio::test]
async fn non_200_on_submit_is_a_protocol_error() {
    let transport = ScriptedTransport::new();
    transport.posts.lock().unwrap().push(Ok(RawHttpResponse {
        status: http::StatusCode::BAD_REQUEST,
        headers: http::HeaderMap::new(),
        body: bytes::Bytes::from_static(b"bad request"),
    }));

    let session = ClientSession::builder("http://coordinator:8080", "alice").finish();
    let err = StatementClient::submit(session, Arc::new(transport), "not sql")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Protocol(_)));
}
