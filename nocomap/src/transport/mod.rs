pub mod http;
pub mod uris;

pub use http::HttpTransport;
pub use uris::ApiUris;

use crate::error::Result;
use serde_json::{Map, Value};

/// Addressing for a table's row endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAddr {
    pub org_name: String,
    pub project_name: String,
    pub project_id: String,
    pub table_id: String,
    pub table_title: String,
}

/// Query parameters for a row list. `where_clause` and `sort` are passed
/// through verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub where_clause: Option<String>,
    pub sort: Option<String>,
}

impl RowQuery {
    pub fn limit(limit: usize) -> Self {
        RowQuery {
            limit: Some(limit),
            ..RowQuery::default()
        }
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset", offset.to_string()));
        }
        if let Some(w) = &self.where_clause {
            params.push(("where", w.clone()));
        }
        if let Some(sort) = &self.sort {
            params.push(("sort", sort.clone()));
        }
        params
    }
}

/// CRUD calls against the remote service. Every call blocks until the
/// response arrives; a non-success status is an error.
pub trait Transport {
    fn project_list(&self) -> Result<Value>;

    fn project_create(&self, body: &Value) -> Result<Value>;

    fn project_table_list(&self, project_id: &str) -> Result<Value>;

    /// Table metadata including its `columns`.
    fn table_column_list(&self, table_id: &str) -> Result<Value>;

    fn table_row_list(&self, table: &TableAddr, query: &RowQuery) -> Result<Value>;

    fn table_row_detail(&self, table: &TableAddr, row_id: i64) -> Result<Value>;

    fn table_row_create(&self, table: &TableAddr, body: &Map<String, Value>) -> Result<Value>;

    fn table_row_update(
        &self,
        table: &TableAddr,
        row_id: i64,
        body: &Map<String, Value>,
    ) -> Result<Value>;

    fn table_row_delete(&self, table: &TableAddr, row_id: i64) -> Result<Value>;

    fn table_row_nested_relations_list(
        &self,
        table: &TableAddr,
        relation_type: &str,
        row_id: i64,
        column_name: &str,
    ) -> Result<Value>;

    /// Replace a column's metadata with `body`.
    fn column_update(&self, column_id: &str, body: &Value) -> Result<Value>;
}
