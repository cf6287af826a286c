//! strongly typed library error.

use std::{error, fmt};

use crate::type_signature::TypeSignature;

/// top level error type returned by [StatementClient] operations.
///
/// [StatementClient]: crate::statement_client::StatementClient
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// the HTTP exchange returned a status the state machine refuses, or a 200
    /// response whose body failed to decode.
    Protocol(ProtocolError),
    /// transport level failure that persisted beyond the retry deadline, or the
    /// client was closed while a retry was in flight.
    Transport(TransportError),
    /// a type signature string failed to parse.
    InvalidTypeSignature(TypeSignatureError),
    /// a JSON value did not match its declared type signature.
    ValueCoercion(ValueCoercionError),
    /// the paging future was canceled while waiting out its backoff sleep.
    Interrupted,
    /// API misuse: `current()` while not valid, `final_results()` while still
    /// valid, or `cancel_leaf_stage()` after `close()`.
    IllegalState(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl error::Error for Error {}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<TypeSignatureError> for Error {
    fn from(e: TypeSignatureError) -> Self {
        Self::InvalidTypeSignature(e)
    }
}

impl From<ValueCoercionError> for Error {
    fn from(e: ValueCoercionError) -> Self {
        Self::ValueCoercion(e)
    }
}

/// the HTTP exchange returned a status the client refuses, or the body of an
/// otherwise-ok response failed to decode.
#[derive(Debug)]
pub struct ProtocolError {
    /// human readable description of what was being attempted, e.g. "starting query".
    pub task: &'static str,
    pub status: u16,
    pub reason: String,
    /// raw response body, retained for error reporting.
    pub body: Vec<u8>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error {}: expected 200 OK but got {} {}",
            self.task, self.status, self.reason
        )
    }
}

impl error::Error for ProtocolError {}

/// transport level I/O or protocol failure that outlasted the retry deadline.
#[derive(Debug)]
pub struct TransportError {
    pub message: String,
    pub cause: Option<Box<dyn error::Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(message: impl Into<String>, cause: impl error::Error + Send + Sync + 'static) -> Self {
        Self {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl error::Error for TransportError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.cause.as_ref().map(|c| c.as_ref() as &(dyn error::Error + 'static))
    }
}

/// parse failure for a type signature string, e.g. `array(map(varchar,bigint))`.
#[derive(Debug, thiserror::Error)]
#[error("invalid type signature `{signature}`: {reason}")]
pub struct TypeSignatureError {
    pub signature: String,
    pub reason: String,
}

impl TypeSignatureError {
    pub(crate) fn new(signature: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            reason: reason.into(),
        }
    }
}

/// a JSON-decoded value was incompatible with its declared type signature.
#[derive(Debug, thiserror::Error)]
#[error("value `{value}` does not match type signature `{signature}`")]
pub struct ValueCoercionError {
    pub signature: TypeSignature,
    pub value: String,
}

impl ValueCoercionError {
    pub(crate) fn new(signature: TypeSignature, value: &serde_json::Value) -> Self {
        Self {
            signature,
            value: value.to_string(),
        }
    }
}
