use super::{ApiUris, RowQuery, TableAddr, Transport};
use crate::config::ClientConfig;
use crate::error::{NocoError, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde_json::{Map, Value};
use std::time::Duration;

/// Blocking HTTP transport. Auth and content-type headers are set once on
/// the underlying client.
pub struct HttpTransport {
    client: Client,
    uris: ApiUris,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(config.auth.secret())
            .map_err(|e| NocoError::Config(format!("Invalid auth token: {e}")))?;
        token.set_sensitive(true);
        headers.insert(HeaderName::from_static(config.auth.header_name()), token);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder().default_headers(headers);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(HttpTransport {
            client: builder.build()?,
            uris: ApiUris::new(&config.base_uri),
        })
    }

    pub fn uris(&self) -> &ApiUris {
        &self.uris
    }

    fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send()?;
        decode(response)
    }
}

fn decode(response: Response) -> Result<Value> {
    let status = response.status();
    let url = response.url().to_string();
    let body = response.text()?;

    if !status.is_success() {
        log::debug!("{url} answered {status}: {body}");
        return Err(NocoError::Transport {
            status: status.as_u16(),
            url,
            body,
        });
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&body)?)
}

impl Transport for HttpTransport {
    fn project_list(&self) -> Result<Value> {
        self.send(self.client.get(self.uris.project(None)))
    }

    fn project_create(&self, body: &Value) -> Result<Value> {
        self.send(self.client.post(self.uris.project(None)).json(body))
    }

    fn project_table_list(&self, project_id: &str) -> Result<Value> {
        self.send(self.client.get(self.uris.project_tables(project_id)))
    }

    fn table_column_list(&self, table_id: &str) -> Result<Value> {
        let uri = self.uris.table_meta(Some(table_id));
        log::debug!("Getting {uri}");
        self.send(self.client.get(uri))
    }

    fn table_row_list(&self, table: &TableAddr, query: &RowQuery) -> Result<Value> {
        self.send(
            self.client
                .get(self.uris.table(table))
                .query(&query.to_params()),
        )
    }

    fn table_row_detail(&self, table: &TableAddr, row_id: i64) -> Result<Value> {
        self.send(self.client.get(self.uris.row_detail(table, row_id)))
    }

    fn table_row_create(&self, table: &TableAddr, body: &Map<String, Value>) -> Result<Value> {
        self.send(self.client.post(self.uris.table(table)).json(body))
    }

    fn table_row_update(
        &self,
        table: &TableAddr,
        row_id: i64,
        body: &Map<String, Value>,
    ) -> Result<Value> {
        let uri = self.uris.row_detail(table, row_id);
        log::debug!("Updating {uri}");
        self.send(self.client.patch(uri).json(body))
    }

    fn table_row_delete(&self, table: &TableAddr, row_id: i64) -> Result<Value> {
        self.send(self.client.delete(self.uris.row_detail(table, row_id)))
    }

    fn table_row_nested_relations_list(
        &self,
        table: &TableAddr,
        relation_type: &str,
        row_id: i64,
        column_name: &str,
    ) -> Result<Value> {
        self.send(self.client.get(self.uris.nested_relations(
            table,
            relation_type,
            row_id,
            column_name,
        )))
    }

    fn column_update(&self, column_id: &str, body: &Value) -> Result<Value> {
        let uri = self.uris.column_meta(column_id);
        log::debug!("Updating {uri}");
        self.send(self.client.patch(uri).json(body))
    }
}
