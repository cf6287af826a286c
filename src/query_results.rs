//! the server's page object, decoded from the JSON body of a statement
//! submission or a `nextUri` fetch.

use std::sync::OnceLock;

use serde::Deserialize;

use crate::{error::TypeSignatureError, type_signature::TypeSignature};

/// a single output column: its name, raw signature text, and the parsed
/// signature tree (parsed lazily, cached on first use).
#[derive(Debug, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub type_signature: String,
    #[serde(skip)]
    parsed_type_cache: OnceLock<TypeSignature>,
}

impl Clone for Column {
    fn clone(&self) -> Self {
        let cache = OnceLock::new();
        if let Some(sig) = self.parsed_type_cache.get() {
            let _ = cache.set(sig.clone());
        }
        Self {
            name: self.name.clone(),
            type_signature: self.type_signature.clone(),
            parsed_type_cache: cache,
        }
    }
}

impl Column {
    /// this column's parsed signature tree, parsing `type_signature` on first
    /// use and returning the cached tree on every subsequent call.
    pub fn parsed_type(&self) -> Result<&TypeSignature, TypeSignatureError> {
        if let Some(sig) = self.parsed_type_cache.get() {
            return Ok(sig);
        }
        let sig = TypeSignature::parse(&self.type_signature)?;
        Ok(self.parsed_type_cache.get_or_init(|| sig))
    }
}

/// one page of results. immutable once constructed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResults {
    pub id: String,
    pub info_uri: String,
    pub partial_cancel_uri: Option<String>,
    pub next_uri: Option<String>,
    pub columns: Option<Vec<Column>>,
    /// rows, each an ordered list of still-raw JSON values. present iff
    /// `columns` is present; every row has `len(row) == len(columns)`.
    pub data: Option<Vec<Vec<serde_json::Value>>>,
    pub stats: StatementStats,
    pub error: Option<QueryError>,
    pub update_type: Option<String>,
    pub update_count: Option<i64>,
}

impl QueryResults {
    /// `true` iff `data` is present and every row's length matches `columns`'s.
    pub fn rows_match_columns(&self) -> bool {
        match (&self.columns, &self.data) {
            (Some(cols), Some(rows)) => rows.iter().all(|row| row.len() == cols.len()),
            (None, Some(_)) => false,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementStats {
    pub state: String,
    #[serde(default)]
    pub queued: bool,
    #[serde(default)]
    pub scheduled: bool,
    #[serde(default)]
    pub nodes: i64,
    #[serde(default)]
    pub total_splits: i64,
    #[serde(default)]
    pub queued_splits: i64,
    #[serde(default)]
    pub running_splits: i64,
    #[serde(default)]
    pub completed_splits: i64,
    #[serde(default)]
    pub cpu_time_millis: i64,
    #[serde(default)]
    pub wall_time_millis: i64,
    #[serde(default)]
    pub processed_rows: i64,
    #[serde(default)]
    pub processed_bytes: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryError {
    pub message: String,
    pub error_code: Option<i32>,
    pub error_name: Option<String>,
    pub error_type: Option<String>,
    pub failure_info: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_page() {
        let json = serde_json::json!({
            "id": "q1",
            "infoUri": "http://coordinator/ui/q1",
            "nextUri": "http://coordinator/v1/statement/q1/1",
            "columns": [{"name": "_col0", "type": "bigint"}],
            "data": [[1]],
            "stats": {"state": "RUNNING"},
        });
        let page: QueryResults = serde_json::from_value(json).unwrap();
        assert_eq!(page.id, "q1");
        assert!(page.rows_match_columns());
    }

    #[test]
    fn parsed_type_is_cached_after_first_call() {
        let column = Column {
            name: "_col0".to_string(),
            type_signature: "bigint".to_string(),
            parsed_type_cache: OnceLock::new(),
        };
        let first = column.parsed_type().unwrap() as *const TypeSignature;
        let second = column.parsed_type().unwrap() as *const TypeSignature;
        assert_eq!(first, second);
    }

    #[test]
    fn detects_row_column_length_mismatch() {
        let json = serde_json::json!({
            "id": "q1",
            "infoUri": "http://coordinator/ui/q1",
            "columns": [{"name": "_col0", "type": "bigint"}],
            "data": [[1, 2]],
            "stats": {"state": "RUNNING"},
        });
        let page: QueryResults = serde_json::from_value(json).unwrap();
        assert!(!page.rows_match_columns());
    }
}
