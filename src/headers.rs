//! symbolic names of the request/response headers used to carry session
//! mutations and identity between client and coordinator.

use http::HeaderName;

macro_rules! header_name {
    ($const_name:ident, $value:expr) => {
        pub static $const_name: HeaderName = HeaderName::from_static($value);
    };
}

// outbound, identity and context.
header_name!(PRESTO_USER, "x-presto-user");
header_name!(PRESTO_SOURCE, "x-presto-source");
header_name!(PRESTO_CATALOG, "x-presto-catalog");
header_name!(PRESTO_SCHEMA, "x-presto-schema");
header_name!(PRESTO_TIME_ZONE, "x-presto-time-zone");
header_name!(PRESTO_LANGUAGE, "x-presto-language");
header_name!(PRESTO_SESSION, "x-presto-session");
header_name!(PRESTO_PREPARED_STATEMENT, "x-presto-prepared-statement");
header_name!(PRESTO_TRANSACTION_ID, "x-presto-transaction-id");

// inbound, session mutation.
header_name!(PRESTO_SET_SESSION, "x-presto-set-session");
header_name!(PRESTO_CLEAR_SESSION, "x-presto-clear-session");
header_name!(PRESTO_ADDED_PREPARE, "x-presto-added-prepare");
header_name!(PRESTO_DEALLOCATED_PREPARE, "x-presto-deallocated-prepare");
header_name!(PRESTO_STARTED_TRANSACTION_ID, "x-presto-started-transaction-id");
header_name!(PRESTO_CLEAR_TRANSACTION_ID, "x-presto-clear-transaction-id");

/// value used for [PRESTO_TRANSACTION_ID] when the session carries no
/// transaction id.
pub const NO_TRANSACTION: &str = "NONE";

/// `User-Agent` value, `StatementClient/<version>`.
pub fn user_agent() -> String {
    format!("StatementClient/{}", env!("CARGO_PKG_VERSION"))
}
