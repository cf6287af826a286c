//! client library for submitting SQL statements to a Presto/Trino coordinator
//! over its HTTP statement-submission protocol and paging through results.
//!
//! the entry point is [StatementClient]: build a [ClientSession], submit a
//! query, then repeatedly [StatementClient::advance] until it returns
//! `false`, reading [StatementClient::current] after each successful call
//! and [StatementClient::final_results] once the stream ends.

pub mod error;
pub mod headers;
pub mod http_port;
pub mod query_results;
pub mod response;
pub mod session;
pub mod statement_client;
pub mod transport;
pub mod type_signature;
pub mod value;

pub use error::Error;
pub use http_port::{AsyncHandle, HttpPort, HttpRequest, RawHttpResponse};
pub use query_results::{Column, QueryError, QueryResults, StatementStats};
pub use session::{ClientSession, ClientSessionBuilder};
pub use statement_client::StatementClient;
pub use type_signature::{TypeSignature, TypeSignatureParameter};
pub use value::{fix, Value};

#[cfg(feature = "xitca-transport")]
pub use transport::XitcaTransport;
