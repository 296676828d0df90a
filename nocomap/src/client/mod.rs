use crate::config::ClientConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, LogSink};
use crate::diff::{self, Diff};
use crate::error::{NocoError, Result};
use crate::mapper;
use crate::row::{self, Row, RowView};
use crate::schema::registry::list_field;
use crate::schema::{self, Project, ProjectMeta, Table};
use crate::transport::{HttpTransport, RowQuery, TableAddr, Transport};
use serde_json::{json, Value};

/// Result of an update request.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// No cached row has that id.
    NotFound,
    /// The assignments match the row; nothing was sent.
    Unchanged,
    /// The row was written. Carries the changed fields and the server's answer.
    Updated { diff: Diff, response: Value },
}

/// The main entry point: a session over one transport with the schema and
/// rows loaded so far.
pub struct Client<T: Transport> {
    transport: T,
    sink: Box<dyn DiagnosticSink>,
    org_name: String,
    row_limit: usize,
    projects: Vec<Project>,
}

impl Client<HttpTransport> {
    /// Connect over HTTP using a validated config.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Client::new(transport, config))
    }
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T, config: &ClientConfig) -> Self {
        Client {
            transport,
            sink: Box::new(LogSink),
            org_name: config.org_name.clone(),
            row_limit: config.row_limit,
            projects: Vec::new(),
        }
    }

    /// Route diagnostics somewhere other than the log.
    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn row_limit(&self) -> usize {
        self.row_limit
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.name == name)
    }

    fn project_index(&self, name: &str) -> Option<usize> {
        self.projects.iter().position(|p| p.name == name)
    }

    fn require_project(&self, name: &str) -> Result<usize> {
        self.project_index(name).ok_or_else(|| {
            NocoError::Config(format!("Project '{name}' has not been opened"))
        })
    }

    /// Cache a project, replacing one of the same name.
    pub fn add_project(&mut self, project: Project) -> &Project {
        let idx = match self.project_index(&project.name) {
            Some(idx) => {
                self.projects[idx] = project;
                idx
            }
            None => {
                self.projects.push(project);
                self.projects.len() - 1
            }
        };
        &self.projects[idx]
    }

    // ── Projects ────────────────────────────────────────────────────

    pub fn list_projects(&self) -> Result<Vec<ProjectMeta>> {
        let response = self.transport.project_list()?;
        list_field(&response, "list")?
            .into_iter()
            .map(|raw| {
                serde_json::from_value(raw)
                    .map_err(|e| NocoError::Schema(format!("Invalid project: {e}")))
            })
            .collect()
    }

    pub fn create_project(&self, title: &str) -> Result<ProjectMeta> {
        let response = self.transport.project_create(&json!({ "title": title }))?;
        log::info!("Created project '{title}'");
        serde_json::from_value(response)
            .map_err(|e| NocoError::Schema(format!("Invalid project: {e}")))
    }

    /// Look a project up by name on the server and cache it. Returns `None`
    /// when the server has no such project.
    pub fn open_project(&mut self, name: &str) -> Result<Option<&Project>> {
        let meta = match self.list_projects()?.into_iter().find(|p| p.title == name) {
            Some(meta) => meta,
            None => return Ok(None),
        };
        let project = Project::with_meta(self.org_name.clone(), meta);
        Ok(Some(self.add_project(project)))
    }

    // ── Schema ──────────────────────────────────────────────────────

    pub fn load_tables(&mut self, project: &str) -> Result<usize> {
        let idx = self.require_project(project)?;
        schema::load_tables(&self.transport, &mut self.projects[idx])
    }

    /// Load the table list and every table's columns.
    pub fn load_schema(&mut self, project: &str) -> Result<usize> {
        let idx = self.require_project(project)?;
        let count = schema::load_tables(&self.transport, &mut self.projects[idx])?;
        for table in &mut self.projects[idx].tables {
            schema::load_columns(&self.transport, table)?;
        }
        Ok(count)
    }

    /// A handle on one table. `None` when the project or table is not loaded.
    pub fn table(&mut self, project: &str, title: &str) -> Option<TableHandle<'_, T>> {
        let project_idx = self.project_index(project)?;
        let table_idx = self.projects[project_idx].table_index(title)?;
        Some(TableHandle {
            client: self,
            project_idx,
            table_idx,
        })
    }
}

/// A table within a client session. Provides row fetch and write operations.
pub struct TableHandle<'a, T: Transport> {
    client: &'a mut Client<T>,
    project_idx: usize,
    table_idx: usize,
}

impl<'a, T: Transport> TableHandle<'a, T> {
    pub fn project(&self) -> &Project {
        &self.client.projects[self.project_idx]
    }

    pub fn table(&self) -> &Table {
        &self.project().tables[self.table_idx]
    }

    fn table_mut(&mut self) -> &mut Table {
        &mut self.client.projects[self.project_idx].tables[self.table_idx]
    }

    fn addr(&self) -> TableAddr {
        self.project().addr(self.table())
    }

    pub fn load_columns(&mut self) -> Result<usize> {
        let client = &mut *self.client;
        let table = &mut client.projects[self.project_idx].tables[self.table_idx];
        schema::load_columns(&client.transport, table)
    }

    /// Fetch up to `row_limit` rows and replace the cached rows with them.
    pub fn load_rows(&mut self) -> Result<usize> {
        self.load_rows_matching(RowQuery::limit(self.client.row_limit))
    }

    /// Fetch rows with explicit query parameters, replacing the cached rows.
    pub fn load_rows_matching(&mut self, query: RowQuery) -> Result<usize> {
        let response = self.client.transport.table_row_list(&self.addr(), &query)?;
        let items = list_field(&response, "list")?;
        let rows = mapper::rows_from_list(self.table(), &items, self.client.sink.as_ref())?;
        log::debug!("Fetched {} rows from '{}'", rows.len(), self.table().title);
        self.table_mut().rows = rows;
        Ok(self.table().rows.len())
    }

    /// Fetch rows of every table this table links to, so relation
    /// assignments can find their targets. Unloaded related tables are
    /// skipped.
    pub fn load_related_rows(&mut self) -> Result<usize> {
        let related: Vec<String> = self
            .table()
            .links()
            .map(|(_, link)| link.fk_related_model_id.clone())
            .collect();

        let mut total = 0;
        for table_id in related {
            let project = &self.client.projects[self.project_idx];
            let idx = match project.table_index_by_id(&table_id) {
                Some(idx) if idx != self.table_idx => idx,
                _ => continue,
            };
            let query = RowQuery::limit(self.client.row_limit);
            let addr = project.addr(&project.tables[idx]);
            let response = self.client.transport.table_row_list(&addr, &query)?;
            let items = list_field(&response, "list")?;
            let table = &self.client.projects[self.project_idx].tables[idx];
            let rows = mapper::rows_from_list(table, &items, self.client.sink.as_ref())?;
            total += rows.len();
            self.client.projects[self.project_idx].tables[idx].rows = rows;
        }
        Ok(total)
    }

    pub fn rows(&self) -> &[Row] {
        &self.table().rows
    }

    pub fn row(&self, id: i64) -> Option<&Row> {
        self.table().row(id)
    }

    pub fn row_by_pv(&self, value: &Value) -> Option<&Row> {
        row::row_by_pv(self.project(), self.table(), value)
    }

    pub fn row_by_key(&self, title: &str, value: &Value) -> Option<&Row> {
        row::row_by_key(self.project(), self.table(), title, value)
    }

    pub fn view<'r>(&'r self, row: &'r Row) -> RowView<'r> {
        RowView::new(self.project(), self.table(), row)
    }

    /// Fetch one row by id without caching it.
    pub fn fetch_row(&self, id: i64) -> Result<Row> {
        let response = self.client.transport.table_row_detail(&self.addr(), id)?;
        match response {
            Value::Object(map) => Ok(mapper::row_from_server(
                self.table(),
                &map,
                self.client.sink.as_ref(),
            )),
            other => Err(NocoError::Schema(format!("Expected a row object, got {other}"))),
        }
    }

    /// Build a candidate row from assignments without sending anything.
    /// Select options are still registered.
    pub fn map_assignments(&mut self, assignments: &[(String, Value)]) -> Result<Row> {
        let client = &mut *self.client;
        mapper::row_from_assignments(
            &client.transport,
            client.sink.as_ref(),
            &mut client.projects[self.project_idx],
            self.table_idx,
            assignments,
        )
    }

    /// Apply assignments to `row` in place. `None` when nothing changed.
    pub fn diff(&mut self, row: &mut Row, assignments: &[(String, Value)]) -> Result<Option<Diff>> {
        let client = &mut *self.client;
        diff::diff(
            &client.transport,
            client.sink.as_ref(),
            &mut client.projects[self.project_idx],
            self.table_idx,
            row,
            assignments,
        )
    }

    /// Update the cached row `id`. Only sends a request when a field changed.
    /// The cached row changes only once the server accepts the update.
    pub fn update_row(&mut self, id: i64, assignments: &[(String, Value)]) -> Result<UpdateOutcome> {
        let position = match self.table().rows.iter().position(|r| r.id() == Some(id)) {
            Some(p) => p,
            None => return Ok(UpdateOutcome::NotFound),
        };

        // The cached row stays in place so self-referencing links can see it.
        let mut row = self.table().rows[position].clone();
        let outcome = self.update_row_with(&mut row, assignments)?;
        if let UpdateOutcome::Updated { .. } = outcome {
            if let Some(cached) = self.table_mut().rows.iter_mut().find(|r| r.id() == Some(id)) {
                *cached = row;
            }
        }
        Ok(outcome)
    }

    /// Update a row the caller holds. The row takes the new values only
    /// when the write succeeds.
    pub fn update_row_with(
        &mut self,
        row: &mut Row,
        assignments: &[(String, Value)],
    ) -> Result<UpdateOutcome> {
        let id = row.id().ok_or_else(|| {
            NocoError::Schema(format!("Row of '{}' has no Id", self.table().title))
        })?;

        let mut working = row.clone();
        let diff = match self.diff(&mut working, assignments)? {
            Some(diff) => diff,
            None => {
                self.client.sink.emit(Diagnostic::new(
                    DiagnosticKind::NoChanges,
                    &self.table().title,
                    format!("row {id}"),
                ));
                return Ok(UpdateOutcome::Unchanged);
            }
        };

        let body = self.view(&working).payload()?;
        log::info!("Updating row {id} of '{}': {:?}", self.table().title, diff.changed);
        let response = self.client.transport.table_row_update(&self.addr(), id, &body)?;
        *row = working;
        Ok(UpdateOutcome::Updated { diff, response })
    }

    /// Map assignments and create a row from them. No diffing.
    pub fn create_row(&mut self, assignments: &[(String, Value)]) -> Result<Value> {
        let row = self.map_assignments(assignments)?;
        let body = self.view(&row).payload()?;
        log::info!("Creating row in '{}'", self.table().title);
        self.client.transport.table_row_create(&self.addr(), &body)
    }

    /// Delete rows by id, or every cached row when `ids` is `None`. Deleted
    /// rows leave the cache. Returns how many were deleted.
    pub fn delete_rows(&mut self, ids: Option<&[i64]>) -> Result<usize> {
        let ids: Vec<i64> = match ids {
            Some(ids) => ids.to_vec(),
            None => self.table().rows.iter().filter_map(Row::id).collect(),
        };

        let addr = self.addr();
        for id in &ids {
            self.client.transport.table_row_delete(&addr, *id)?;
            self.table_mut().rows.retain(|r| r.id() != Some(*id));
        }
        Ok(ids.len())
    }

    /// Rows linked to `row_id` through a relation column, as the server
    /// returns them.
    pub fn nested_rows(&self, row_id: i64, relation_type: &str, column: &str) -> Result<Vec<Value>> {
        let response = self.client.transport.table_row_nested_relations_list(
            &self.addr(),
            relation_type,
            row_id,
            column,
        )?;
        list_field(&response, "list")
    }
}
