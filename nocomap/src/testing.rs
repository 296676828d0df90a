// Test fixtures and a recording transport

use crate::error::{NocoError, Result};
use crate::row::{Data, Row};
use crate::schema::{Column, Project, Table};
use crate::transport::{RowQuery, TableAddr, Transport};
use serde_json::{json, Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ProjectList,
    ProjectCreate { body: Value },
    TableList { project_id: String },
    ColumnList { table_id: String },
    RowList { table: String, query: RowQuery },
    RowDetail { table: String, row_id: i64 },
    RowCreate { table: String, body: Map<String, Value> },
    RowUpdate { table: String, row_id: i64, body: Map<String, Value> },
    RowDelete { table: String, row_id: i64 },
    Nested { table: String, relation_type: String, row_id: i64, column: String },
    ColumnUpdate { column_id: String, body: Value },
}

/// Records every call and answers from canned responses. Anything without a
/// canned response echoes the request body or returns an empty object.
#[derive(Default)]
pub struct MockTransport {
    calls: RefCell<Vec<Call>>,
    projects: RefCell<Value>,
    tables: RefCell<Value>,
    columns: RefCell<HashMap<String, Value>>,
    rows: RefCell<HashMap<String, Value>>,
    column_update_status: Cell<Option<u16>>,
    row_update_status: Cell<Option<u16>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::RowCreate { .. } | Call::RowUpdate { .. } | Call::RowDelete { .. }
                )
            })
            .collect()
    }

    pub fn respond_projects(&self, value: Value) {
        *self.projects.borrow_mut() = value;
    }

    pub fn respond_tables(&self, value: Value) {
        *self.tables.borrow_mut() = value;
    }

    pub fn respond_columns(&self, table_id: &str, value: Value) {
        self.columns.borrow_mut().insert(table_id.to_string(), value);
    }

    pub fn respond_rows(&self, table_title: &str, value: Value) {
        self.rows.borrow_mut().insert(table_title.to_string(), value);
    }

    pub fn fail_column_updates(&self, status: u16) {
        self.column_update_status.set(Some(status));
    }

    pub fn fail_row_updates(&self, status: Option<u16>) {
        self.row_update_status.set(status);
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl Transport for MockTransport {
    fn project_list(&self) -> Result<Value> {
        self.record(Call::ProjectList);
        Ok(self.projects.borrow().clone())
    }

    fn project_create(&self, body: &Value) -> Result<Value> {
        self.record(Call::ProjectCreate { body: body.clone() });
        let mut created = body.clone();
        created["id"] = json!("p_new");
        Ok(created)
    }

    fn project_table_list(&self, project_id: &str) -> Result<Value> {
        self.record(Call::TableList {
            project_id: project_id.to_string(),
        });
        Ok(self.tables.borrow().clone())
    }

    fn table_column_list(&self, table_id: &str) -> Result<Value> {
        self.record(Call::ColumnList {
            table_id: table_id.to_string(),
        });
        Ok(self
            .columns
            .borrow()
            .get(table_id)
            .cloned()
            .unwrap_or_else(|| json!({ "columns": [] })))
    }

    fn table_row_list(&self, table: &TableAddr, query: &RowQuery) -> Result<Value> {
        self.record(Call::RowList {
            table: table.table_title.clone(),
            query: query.clone(),
        });
        Ok(self
            .rows
            .borrow()
            .get(&table.table_title)
            .cloned()
            .unwrap_or_else(|| json!({ "list": [] })))
    }

    fn table_row_detail(&self, table: &TableAddr, row_id: i64) -> Result<Value> {
        self.record(Call::RowDetail {
            table: table.table_title.clone(),
            row_id,
        });
        let rows = self.rows.borrow();
        let found = rows
            .get(&table.table_title)
            .and_then(|v| v["list"].as_array().cloned())
            .and_then(|list| list.into_iter().find(|r| r["Id"] == json!(row_id)));
        match found {
            Some(row) => Ok(row),
            None => Err(NocoError::Transport {
                status: 404,
                url: format!("mock://{}/{row_id}", table.table_title),
                body: "Record not found".into(),
            }),
        }
    }

    fn table_row_create(&self, table: &TableAddr, body: &Map<String, Value>) -> Result<Value> {
        self.record(Call::RowCreate {
            table: table.table_title.clone(),
            body: body.clone(),
        });
        Ok(Value::Object(body.clone()))
    }

    fn table_row_update(
        &self,
        table: &TableAddr,
        row_id: i64,
        body: &Map<String, Value>,
    ) -> Result<Value> {
        self.record(Call::RowUpdate {
            table: table.table_title.clone(),
            row_id,
            body: body.clone(),
        });
        match self.row_update_status.get() {
            Some(status) => Err(NocoError::Transport {
                status,
                url: format!("mock://{}/{row_id}", table.table_title),
                body: "update failed".into(),
            }),
            None => Ok(Value::Object(body.clone())),
        }
    }

    fn table_row_delete(&self, table: &TableAddr, row_id: i64) -> Result<Value> {
        self.record(Call::RowDelete {
            table: table.table_title.clone(),
            row_id,
        });
        Ok(json!(1))
    }

    fn table_row_nested_relations_list(
        &self,
        table: &TableAddr,
        relation_type: &str,
        row_id: i64,
        column_name: &str,
    ) -> Result<Value> {
        self.record(Call::Nested {
            table: table.table_title.clone(),
            relation_type: relation_type.to_string(),
            row_id,
            column: column_name.to_string(),
        });
        Ok(json!({ "list": [{ "Id": 2, "Name": "Bob" }] }))
    }

    fn column_update(&self, column_id: &str, body: &Value) -> Result<Value> {
        self.record(Call::ColumnUpdate {
            column_id: column_id.to_string(),
            body: body.clone(),
        });
        match self.column_update_status.get() {
            Some(status) => Err(NocoError::Transport {
                status,
                url: format!("mock://columns/{column_id}"),
                body: "rejected".into(),
            }),
            None => Ok(body.clone()),
        }
    }
}

pub fn tasks_columns() -> Value {
    json!({ "id": "tasks", "columns": [
        { "id": "tasks_id", "column_name": "id", "title": "Id", "uidt": "ID", "dt": "integer" },
        { "id": "tasks_title", "column_name": "title", "title": "Title", "uidt": "SingleLineText", "dt": "varchar", "pv": true },
        { "id": "tasks_status", "column_name": "status", "title": "Status", "uidt": "SingleSelect", "dt": "text",
          "dtxp": "'Open'",
          "colOptions": { "options": [{ "id": "opt_open", "title": "Open", "fk_column_id": "tasks_status" }] } },
        { "id": "tasks_tags", "column_name": "tags", "title": "Tags", "uidt": "MultiSelect", "dt": "text",
          "dtxp": "'work'",
          "colOptions": { "options": [{ "id": "opt_work", "title": "work" }] } },
        { "id": "tasks_owner", "column_name": "owner", "title": "Owner", "uidt": "LinkToAnotherRecord",
          "colOptions": { "type": "bt", "fk_related_model_id": "users",
                          "fk_child_column_id": "tasks_owner_id", "fk_parent_column_id": "users_id" } },
        { "id": "tasks_owner_id", "column_name": "owner_id", "title": "OwnerId", "uidt": "ForeignKey", "dt": "integer" },
        { "id": "tasks_estimate", "column_name": "estimate", "title": "Estimate", "uidt": "Number", "dt": "integer" },
        { "id": "tasks_notes", "column_name": "notes", "title": "Notes", "uidt": "LongText", "dt": "text" },
        { "id": "tasks_shape", "column_name": "shape", "title": "Shape", "uidt": "GeoData", "dt": "geometry" },
        { "id": "tasks_created", "column_name": "created_at", "title": "CreatedAt", "uidt": "DateTime", "dt": "datetime" },
        { "id": "tasks_updated", "column_name": "updated_at", "title": "UpdatedAt", "uidt": "DateTime", "dt": "datetime" }
    ]})
}

pub fn users_columns() -> Value {
    json!({ "id": "users", "columns": [
        { "id": "users_id", "column_name": "id", "title": "Id", "uidt": "ID", "dt": "integer" },
        { "id": "users_name", "column_name": "name", "title": "Name", "uidt": "SingleLineText", "dt": "varchar", "pv": true }
    ]})
}

pub fn tables_list() -> Value {
    json!({ "list": [
        { "id": "tasks", "table_name": "tasks", "title": "Tasks", "project_id": "p1" },
        { "id": "users", "table_name": "users", "title": "Users", "project_id": "p1" }
    ]})
}

pub fn users_rows() -> Value {
    json!({ "list": [
        { "Id": 2, "Name": "Bob" },
        { "Id": 9, "Name": "Carol" }
    ]})
}

pub fn tasks_rows() -> Value {
    json!({ "list": [
        { "Id": 5, "Title": "A", "Status": "Open", "Tags": "work", "Owner": { "Id": 2, "Name": "Bob" },
          "OwnerId": 2, "Estimate": 3, "Notes": null,
          "CreatedAt": "2023-01-05T10:00:00+00:00", "UpdatedAt": "2023-01-06T08:30:00+00:00" }
    ]})
}

fn table(descriptor: Value, columns: Value, rows: Value) -> Table {
    let mut table = Table::from_value(descriptor).unwrap();
    table.columns = columns["columns"]
        .as_array()
        .unwrap()
        .iter()
        .cloned()
        .map(|c| Column::from_value(c).unwrap())
        .collect();
    table.rows = rows["list"]
        .as_array()
        .unwrap()
        .iter()
        .map(|raw| {
            let data = raw
                .as_object()
                .unwrap()
                .iter()
                .map(|(k, v)| {
                    let column = table.column_by_name(k).unwrap();
                    Data::new(k.clone(), column.id.clone(), v.clone())
                })
                .collect();
            Row::new(table.id.clone(), data)
        })
        .collect();
    table
}

/// Project `demo` (id `p1`) with Tasks and Users, columns and rows loaded.
pub fn tasks_project() -> Project {
    let mut project = Project::new("noco", "demo");
    project.meta.id = "p1".into();
    let list = tables_list();
    project.tables = vec![
        table(list["list"][0].clone(), tasks_columns(), tasks_rows()),
        table(list["list"][1].clone(), users_columns(), users_rows()),
    ];
    project
}

/// A transport primed with the same schema and rows as `tasks_project`.
pub fn primed_transport() -> MockTransport {
    let transport = MockTransport::new();
    transport.respond_projects(json!({ "list": [
        { "id": "p1", "title": "demo", "status": "active" },
        { "id": "p2", "title": "other" }
    ]}));
    transport.respond_tables(tables_list());
    transport.respond_columns("tasks", tasks_columns());
    transport.respond_columns("users", users_columns());
    transport.respond_rows("Tasks", tasks_rows());
    transport.respond_rows("Users", users_rows());
    transport
}
