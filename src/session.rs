//! immutable session input bundle, built once and shared read-only with a
//! [StatementClient][crate::statement_client::StatementClient].

use std::{collections::HashMap, time::Duration};

/// server connection details, identity, and session context for a query.
///
/// constructed through [ClientSessionBuilder], mirroring the pack's own
/// HTTP client builder.
#[derive(Debug, Clone)]
pub struct ClientSession {
    pub server: String,
    pub user: String,
    pub source: Option<String>,
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub time_zone_id: String,
    pub language: String,
    pub properties: HashMap<String, String>,
    pub prepared_statements: HashMap<String, String>,
    pub transaction_id: Option<String>,
    pub client_request_timeout: Duration,
    pub debug: bool,
}

impl ClientSession {
    pub fn builder(server: impl Into<String>, user: impl Into<String>) -> ClientSessionBuilder {
        ClientSessionBuilder::new(server, user)
    }
}

/// consuming builder for [ClientSession].
pub struct ClientSessionBuilder {
    server: String,
    user: String,
    source: Option<String>,
    catalog: Option<String>,
    schema: Option<String>,
    time_zone_id: String,
    language: String,
    properties: HashMap<String, String>,
    prepared_statements: HashMap<String, String>,
    transaction_id: Option<String>,
    client_request_timeout: Duration,
    debug: bool,
}

impl ClientSessionBuilder {
    pub fn new(server: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            user: user.into(),
            source: None,
            catalog: None,
            schema: None,
            time_zone_id: "UTC".to_string(),
            language: "en".to_string(),
            properties: HashMap::new(),
            prepared_statements: HashMap::new(),
            transaction_id: None,
            client_request_timeout: Duration::from_secs(2 * 60),
            debug: false,
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn time_zone_id(mut self, time_zone_id: impl Into<String>) -> Self {
        self.time_zone_id = time_zone_id.into();
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn prepared_statement(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.prepared_statements.insert(key.into(), value.into());
        self
    }

    pub fn transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn client_request_timeout(mut self, timeout: Duration) -> Self {
        self.client_request_timeout = timeout;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn finish(self) -> ClientSession {
        ClientSession {
            server: self.server,
            user: self.user,
            source: self.source,
            catalog: self.catalog,
            schema: self.schema,
            time_zone_id: self.time_zone_id,
            language: self.language,
            properties: self.properties,
            prepared_statements: self.prepared_statements,
            transaction_id: self.transaction_id,
            client_request_timeout: self.client_request_timeout,
            debug: self.debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let session = ClientSession::builder("http://localhost:8080", "alice").finish();
        assert_eq!(session.user, "alice");
        assert_eq!(session.time_zone_id, "UTC");
        assert!(session.transaction_id.is_none());
    }
}
