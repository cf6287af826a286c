//! typed view over a raw HTTP response: status, headers (case-insensitive by
//! construction, via [http::HeaderMap]), and a decoded body of the expected
//! type, or the decoding failure alongside the raw bytes for error reporting.

use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

/// a decoded or failed-to-decode HTTP response body.
#[derive(Debug)]
pub struct ResponseEnvelope<T> {
    pub status: StatusCode,
    pub reason: String,
    pub headers: HeaderMap,
    body: Result<T, serde_json::Error>,
    raw_body: Vec<u8>,
}

impl<T: DeserializeOwned> ResponseEnvelope<T> {
    /// decode `raw_body` as JSON into `T`, retaining the raw bytes regardless
    /// of outcome so a failure can still be reported with the body attached.
    pub fn from_parts(status: StatusCode, headers: HeaderMap, raw_body: Vec<u8>) -> Self {
        let body = serde_json::from_slice(&raw_body);
        Self {
            status,
            reason: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body,
            raw_body,
        }
    }

    /// `true` iff the body decoded successfully.
    pub fn has_value(&self) -> bool {
        self.body.is_ok()
    }

    pub fn value(&self) -> Option<&T> {
        self.body.as_ref().ok()
    }

    pub fn into_value(self) -> Option<T> {
        self.body.ok()
    }

    pub fn decode_error(&self) -> Option<&serde_json::Error> {
        self.body.as_ref().err()
    }

    pub fn raw_body(&self) -> &[u8] {
        &self.raw_body
    }

    /// first header value for `name`, case-insensitive (by construction of
    /// [HeaderMap]).
    pub fn header(&self, name: &http::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// all header values for `name`, in wire order.
    pub fn header_all<'a>(&'a self, name: &'a http::HeaderName) -> impl Iterator<Item = &'a str> {
        self.headers.get_all(name).iter().filter_map(|v| v.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct Body {
        id: String,
    }

    #[test]
    fn decodes_valid_json_body() {
        let env = ResponseEnvelope::<Body>::from_parts(
            StatusCode::OK,
            HeaderMap::new(),
            br#"{"id":"q1"}"#.to_vec(),
        );
        assert!(env.has_value());
        assert_eq!(env.value(), Some(&Body { id: "q1".into() }));
    }

    #[test]
    fn retains_raw_body_on_decode_failure() {
        let env = ResponseEnvelope::<Body>::from_parts(StatusCode::OK, HeaderMap::new(), b"not json".to_vec());
        assert!(!env.has_value());
        assert!(env.decode_error().is_some());
        assert_eq!(env.raw_body(), b"not json");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Presto-Set-Session", "a=1".parse().unwrap());
        let env = ResponseEnvelope::<Body>::from_parts(StatusCode::OK, headers, b"not json".to_vec());
        assert_eq!(env.header(&crate::headers::PRESTO_SET_SESSION), Some("a=1"));
    }
}
