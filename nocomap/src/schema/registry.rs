use super::types::{
    ColumnDescriptor, ColumnKind, DataType, LinkDescriptor, ProjectMeta, SelectOption,
    TableDescriptor, LINK_UIDT, MULTI_SELECT_UIDT, SINGLE_SELECT_UIDT,
};
use crate::error::{NocoError, Result};
use crate::row::Row;
use crate::transport::{TableAddr, Transport};
use serde_json::Value;

/// A workspace on the server and the tables loaded for it.
#[derive(Debug, Clone)]
pub struct Project {
    pub org_name: String,
    pub name: String,
    pub meta: ProjectMeta,
    pub tables: Vec<Table>,
}

impl Project {
    pub fn new(org_name: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Project {
            org_name: org_name.into(),
            meta: ProjectMeta {
                title: name.clone(),
                ..ProjectMeta::default()
            },
            name,
            tables: Vec::new(),
        }
    }

    pub fn with_meta(org_name: impl Into<String>, meta: ProjectMeta) -> Self {
        Project {
            org_name: org_name.into(),
            name: meta.title.clone(),
            meta,
            tables: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.meta.id
    }

    pub fn table_by_name(&self, title: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.title == title)
    }

    pub fn table_by_id(&self, id: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == id)
    }

    pub fn table_index(&self, title: &str) -> Option<usize> {
        self.tables.iter().position(|t| t.title == title)
    }

    pub(crate) fn table_index_by_id(&self, id: &str) -> Option<usize> {
        self.tables.iter().position(|t| t.id == id)
    }

    /// Table at a position from `table_index`.
    pub fn table_at(&self, idx: usize) -> Result<&Table> {
        self.tables.get(idx).ok_or_else(|| {
            NocoError::Schema(format!("No table at index {idx} in '{}'", self.name))
        })
    }

    /// Addressing for row endpoints of one of this project's tables.
    pub fn addr(&self, table: &Table) -> TableAddr {
        TableAddr {
            org_name: self.org_name.clone(),
            project_name: self.name.clone(),
            project_id: self.meta.id.clone(),
            table_id: table.id.clone(),
            table_title: table.title.clone(),
        }
    }

    /// Key under which a column's related objects carry their display value.
    ///
    /// For a link column that is the related table's primary value title.
    /// Otherwise, and when the related table is not loaded, the owning
    /// table's primary value title.
    pub fn display_key<'a>(&'a self, table: &'a Table, column: &Column) -> Option<&'a str> {
        if let ColumnKind::Link(link) = &column.kind {
            if let Some(pv) = self
                .table_by_id(&link.fk_related_model_id)
                .and_then(Table::primary_column)
            {
                return Some(pv.title.as_str());
            }
        }
        table.primary_column().map(|c| c.title.as_str())
    }
}

/// A table with its columns and the rows most recently fetched for it.
#[derive(Debug, Clone)]
pub struct Table {
    pub id: String,
    pub name: String,
    pub title: String,
    pub descriptor: TableDescriptor,
    pub columns: Vec<Column>,
    /// Local working set, replaced on every fetch.
    pub rows: Vec<Row>,
}

impl Table {
    pub fn from_descriptor(descriptor: TableDescriptor) -> Self {
        Table {
            id: descriptor.id.clone(),
            name: descriptor.table_name.clone(),
            title: descriptor.title.clone(),
            descriptor,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn from_value(raw: Value) -> Result<Self> {
        let descriptor: TableDescriptor = serde_json::from_value(raw)
            .map_err(|e| NocoError::Schema(format!("Invalid table descriptor: {e}")))?;
        Ok(Self::from_descriptor(descriptor))
    }

    pub fn column_by_name(&self, title: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.title == title)
    }

    pub fn column_by_id(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub(crate) fn column_index(&self, title: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.title == title)
    }

    /// The column flagged `pv`. The first one wins if the server sends several.
    pub fn primary_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.pv)
    }

    pub fn row(&self, id: i64) -> Option<&Row> {
        self.rows.iter().find(|r| r.id() == Some(id))
    }

    /// Link columns of this table.
    pub fn links(&self) -> impl Iterator<Item = (&Column, &LinkDescriptor)> {
        self.columns.iter().filter_map(|c| match &c.kind {
            ColumnKind::Link(link) => Some((c, link)),
            _ => None,
        })
    }
}

/// A column resolved to the columns on both sides of its relation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLink {
    pub table_id: String,
    /// Holds the foreign key.
    pub child: ColumnRef,
    /// The referenced column on the related table.
    pub parent: ColumnRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub table_id: String,
    pub column_id: String,
    pub title: String,
}

impl ColumnRef {
    fn of(table: &Table, column: &Column) -> Self {
        ColumnRef {
            table_id: table.id.clone(),
            column_id: column.id.clone(),
            title: column.title.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub id: String,
    pub name: String,
    pub title: String,
    pub uidt: String,
    pub kind: ColumnKind,
    pub data_type: DataType,
    pub pv: bool,
    pub options: Vec<SelectOption>,
    pub descriptor: ColumnDescriptor,
    /// The descriptor exactly as the server sent it. Sent back on option
    /// registration.
    pub(crate) meta: Value,
    pub(crate) resolved_link: Option<ResolvedLink>,
}

impl Column {
    pub fn from_value(raw: Value) -> Result<Self> {
        let descriptor: ColumnDescriptor = serde_json::from_value(raw.clone())
            .map_err(|e| NocoError::Schema(format!("Invalid column descriptor: {e}")))?;

        let kind = match descriptor.uidt.as_str() {
            LINK_UIDT => {
                let col_options = descriptor.col_options.clone().ok_or_else(|| {
                    NocoError::Schema(format!(
                        "Link column '{}' has no colOptions",
                        descriptor.title
                    ))
                })?;
                let link: LinkDescriptor = serde_json::from_value(col_options).map_err(|e| {
                    NocoError::Schema(format!(
                        "Link column '{}' has an invalid relation descriptor: {e}",
                        descriptor.title
                    ))
                })?;
                ColumnKind::Link(link)
            }
            SINGLE_SELECT_UIDT => ColumnKind::SingleSelect,
            MULTI_SELECT_UIDT => ColumnKind::MultiSelect,
            _ => ColumnKind::Plain,
        };

        let data_type = DataType::parse(descriptor.dt.as_deref());
        if let DataType::Unrecognized(tag) = &data_type {
            log::debug!("Column '{}' has unrecognized dt '{tag}'", descriptor.title);
        }

        let options = parse_options(&raw)?;

        Ok(Column {
            id: descriptor.id.clone(),
            name: descriptor.column_name.clone(),
            title: descriptor.title.clone(),
            uidt: descriptor.uidt.clone(),
            pv: descriptor.pv,
            kind,
            data_type,
            options,
            descriptor,
            meta: raw,
            resolved_link: None,
        })
    }

    pub fn is_relation(&self) -> bool {
        matches!(self.kind, ColumnKind::Link(_))
    }

    pub fn option_by_name(&self, title: &str) -> Option<&SelectOption> {
        self.options.iter().find(|o| o.title == title)
    }

    pub fn meta(&self) -> &Value {
        &self.meta
    }

    pub fn resolved_link(&self) -> Option<&ResolvedLink> {
        self.resolved_link.as_ref()
    }

    /// Replace the metadata object and re-read the option set from it.
    pub(crate) fn refresh_from_meta(&mut self, meta: Value) -> Result<()> {
        self.options = parse_options(&meta)?;
        self.meta = meta;
        Ok(())
    }
}

fn parse_options(meta: &Value) -> Result<Vec<SelectOption>> {
    match meta.get("colOptions").and_then(|o| o.get("options")) {
        Some(Value::Array(_)) => {
            let options = meta["colOptions"]["options"].clone();
            serde_json::from_value(options)
                .map_err(|e| NocoError::Schema(format!("Invalid select options: {e}")))
        }
        _ => Ok(Vec::new()),
    }
}

/// Read a list out of a response object. A missing key is an empty list.
pub(crate) fn list_field(response: &Value, key: &str) -> Result<Vec<Value>> {
    match response {
        Value::Array(items) => Ok(items.clone()),
        Value::Object(map) => match map.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items.clone()),
            Some(other) => Err(NocoError::Schema(format!(
                "Expected '{key}' to be a list, got {other}"
            ))),
        },
        Value::Null => Ok(Vec::new()),
        other => Err(NocoError::Schema(format!(
            "Expected an object with '{key}', got {other}"
        ))),
    }
}

/// Fetch the project's table list and replace the cached tables with it.
/// Tables that were already loaded keep their columns and rows.
pub fn load_tables(transport: &dyn Transport, project: &mut Project) -> Result<usize> {
    let response = transport.project_table_list(project.id())?;
    let mut tables = Vec::new();

    for raw in list_field(&response, "list")? {
        let mut table = Table::from_value(raw)?;
        if let Some(previous) = project.tables.iter_mut().find(|t| t.id == table.id) {
            table.columns = std::mem::take(&mut previous.columns);
            table.rows = std::mem::take(&mut previous.rows);
        }
        tables.push(table);
    }

    log::debug!("Loaded {} tables for project '{}'", tables.len(), project.name);
    project.tables = tables;
    Ok(project.tables.len())
}

/// Fetch a table's column list and replace the cached columns with it.
pub fn load_columns(transport: &dyn Transport, table: &mut Table) -> Result<usize> {
    let response = transport.table_column_list(&table.id)?;
    let columns = list_field(&response, "columns")?
        .into_iter()
        .map(Column::from_value)
        .collect::<Result<Vec<_>>>()?;

    log::debug!("Loaded {} columns for table '{}'", columns.len(), table.title);
    table.columns = columns;
    Ok(table.columns.len())
}

/// Resolve a link column to its related table and child/parent columns.
///
/// The result is cached on the column. Returns `None` when the related
/// table or the child column is not loaded; nothing is cached then, so a
/// later call can succeed once the schema is complete.
pub fn resolve_link(
    project: &mut Project,
    table_idx: usize,
    column_idx: usize,
) -> Option<ResolvedLink> {
    let table = project.tables.get(table_idx)?;
    let column = table.columns.get(column_idx)?;
    if let Some(resolved) = &column.resolved_link {
        return Some(resolved.clone());
    }
    let link = match &column.kind {
        ColumnKind::Link(link) => link,
        _ => return None,
    };

    let related = project.table_by_id(&link.fk_related_model_id)?;

    // The foreign key sits on whichever side of the relation holds it.
    let child = table
        .column_by_id(&link.fk_child_column_id)
        .map(|c| ColumnRef::of(table, c))
        .or_else(|| {
            related
                .column_by_id(&link.fk_child_column_id)
                .map(|c| ColumnRef::of(related, c))
        })?;
    let parent = related
        .column_by_id(&link.fk_parent_column_id)
        .or_else(|| related.primary_column())
        .map(|c| ColumnRef::of(related, c))?;

    let resolved = ResolvedLink {
        table_id: related.id.clone(),
        child,
        parent,
    };
    project.tables[table_idx].columns[column_idx].resolved_link = Some(resolved.clone());
    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, MockTransport};
    use serde_json::json;

    #[test]
    fn test_lookups_return_none_when_missing() {
        let project = testing::tasks_project();
        assert!(project.table_by_name("Nope").is_none());
        assert!(project.table_by_id("nope").is_none());

        let tasks = project.table_by_name("Tasks").unwrap();
        assert_eq!(project.table_by_id(&tasks.id).unwrap().title, "Tasks");
        assert!(tasks.column_by_name("Missing").is_none());
        assert!(tasks.column_by_id("missing").is_none());
        assert_eq!(tasks.column_by_name("Title").unwrap().id, "tasks_title");
        assert_eq!(tasks.column_by_id("tasks_status").unwrap().title, "Status");
    }

    #[test]
    fn test_link_column_classified() {
        let project = testing::tasks_project();
        let tasks = project.table_by_name("Tasks").unwrap();
        let owner = tasks.column_by_name("Owner").unwrap();
        assert!(owner.is_relation());
        match &owner.kind {
            ColumnKind::Link(link) => {
                assert_eq!(link.fk_related_model_id, "users");
                assert_eq!(link.fk_child_column_id, "tasks_owner_id");
            }
            other => panic!("expected link, got {other:?}"),
        }
        assert_eq!(tasks.column_by_name("Status").unwrap().kind, ColumnKind::SingleSelect);
        assert_eq!(tasks.links().count(), 1);
    }

    #[test]
    fn test_select_options_parsed() {
        let project = testing::tasks_project();
        let status = project
            .table_by_name("Tasks")
            .unwrap()
            .column_by_name("Status")
            .unwrap();
        assert!(status.option_by_name("Open").is_some());
        assert!(status.option_by_name("Done").is_none());
    }

    #[test]
    fn test_link_without_col_options_is_schema_error() {
        let err = Column::from_value(json!({
            "id": "c", "column_name": "c", "title": "C", "uidt": "LinkToAnotherRecord"
        }))
        .unwrap_err();
        assert!(matches!(err, NocoError::Schema(_)));
    }

    #[test]
    fn test_load_tables_replaces_instead_of_appending() {
        let transport = MockTransport::new();
        transport.respond_tables(json!({ "list": [
            { "id": "t1", "table_name": "tasks", "title": "Tasks" },
            { "id": "t2", "table_name": "users", "title": "Users" }
        ]}));

        let mut project = Project::new("noco", "demo");
        project.meta.id = "p1".into();

        assert_eq!(load_tables(&transport, &mut project).unwrap(), 2);
        assert_eq!(load_tables(&transport, &mut project).unwrap(), 2);
        assert_eq!(project.tables.len(), 2);
    }

    #[test]
    fn test_load_tables_keeps_loaded_columns() {
        let transport = MockTransport::new();
        let mut project = testing::tasks_project();
        transport.respond_tables(json!({ "list": [
            { "id": "tasks", "table_name": "tasks", "title": "Tasks" }
        ]}));

        load_tables(&transport, &mut project).unwrap();
        assert_eq!(project.tables.len(), 1);
        assert!(!project.tables[0].columns.is_empty());
    }

    #[test]
    fn test_load_columns_replaces() {
        let transport = MockTransport::new();
        transport.respond_columns(
            "t1",
            json!({ "id": "t1", "columns": [
                { "id": "c1", "column_name": "title", "title": "Title", "uidt": "SingleLineText", "dt": "varchar", "pv": true }
            ]}),
        );
        let mut table = Table::from_value(json!({ "id": "t1", "table_name": "t", "title": "T" })).unwrap();

        load_columns(&transport, &mut table).unwrap();
        load_columns(&transport, &mut table).unwrap();
        assert_eq!(table.columns.len(), 1);
        assert_eq!(table.primary_column().unwrap().title, "Title");
    }

    #[test]
    fn test_resolve_link_is_cached() {
        let mut project = testing::tasks_project();
        let t = project.table_index("Tasks").unwrap();
        let c = project.tables[t].column_index("Owner").unwrap();

        let resolved = resolve_link(&mut project, t, c).unwrap();
        assert_eq!(resolved.table_id, "users");
        assert_eq!(resolved.child.title, "OwnerId");
        assert_eq!(resolved.parent.title, "Id");
        assert_eq!(project.tables[t].columns[c].resolved_link(), Some(&resolved));
    }

    #[test]
    fn test_resolve_link_missing_table_not_cached() {
        let mut project = testing::tasks_project();
        project.tables.retain(|t| t.title != "Users");
        let t = project.table_index("Tasks").unwrap();
        let c = project.tables[t].column_index("Owner").unwrap();

        assert!(resolve_link(&mut project, t, c).is_none());
        assert!(project.tables[t].columns[c].resolved_link().is_none());
    }

    #[test]
    fn test_out_of_range_indices() {
        let mut project = testing::tasks_project();
        let t = project.table_index("Tasks").unwrap();
        assert!(resolve_link(&mut project, 99, 0).is_none());
        assert!(resolve_link(&mut project, t, 99).is_none());
        assert!(project.table_at(t).is_ok());
        assert!(matches!(project.table_at(99), Err(NocoError::Schema(_))));
    }

    #[test]
    fn test_display_key_uses_related_primary_value() {
        let project = testing::tasks_project();
        let tasks = project.table_by_name("Tasks").unwrap();
        let owner = tasks.column_by_name("Owner").unwrap();
        let title = tasks.column_by_name("Title").unwrap();
        assert_eq!(project.display_key(tasks, owner), Some("Name"));
        assert_eq!(project.display_key(tasks, title), Some("Title"));
    }
}
