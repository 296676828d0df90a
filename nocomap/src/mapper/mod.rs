// Row mapping - server payloads and field assignments to rows

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::{NocoError, Result};
use crate::options;
use crate::row::{self, Data, Row};
use crate::schema::{resolve_link, Project, Table};
use crate::transport::Transport;
use serde_json::{json, Map, Value};

/// Ordered field assignments, title → value.
pub type Assignments = Vec<(String, Value)>;

/// Build assignments from anything yielding (title, value) pairs.
pub fn assignments<K, V, I>(pairs: I) -> Assignments
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Build a row from a raw server object. Keys with no matching column are
/// reported and dropped.
pub fn row_from_server(table: &Table, raw: &Map<String, Value>, sink: &dyn DiagnosticSink) -> Row {
    let mut data = Vec::with_capacity(raw.len());
    for (key, value) in raw {
        match table.column_by_name(key) {
            Some(column) => data.push(Data::new(key.clone(), column.id.clone(), value.clone())),
            None => sink.emit(Diagnostic::new(
                DiagnosticKind::UnmappedField,
                &table.title,
                format!("Mismatched column {key}: {value}"),
            )),
        }
    }
    Row::new(table.id.clone(), data)
}

/// Map every object of a row list response.
pub fn rows_from_list(table: &Table, items: &[Value], sink: &dyn DiagnosticSink) -> Result<Vec<Row>> {
    items
        .iter()
        .map(|item| match item {
            Value::Object(map) => Ok(row_from_server(table, map, sink)),
            other => Err(NocoError::Schema(format!(
                "Expected a row object in '{}', got {other}",
                table.title
            ))),
        })
        .collect()
}

/// Build a candidate row from caller assignments.
///
/// Relation assignments name the related row by its primary value and
/// expand into the link object plus the foreign key field. Select values
/// are registered as options first. The row is not added to the table's
/// cache.
pub fn row_from_assignments(
    transport: &dyn Transport,
    sink: &dyn DiagnosticSink,
    project: &mut Project,
    table_idx: usize,
    assignments: &[(String, Value)],
) -> Result<Row> {
    let table_id = project.table_at(table_idx)?.id.clone();
    let mut data = Vec::new();

    for (key, value) in assignments {
        let table = &project.tables[table_idx];
        let column_idx = match table.column_index(key) {
            Some(idx) => idx,
            None => {
                sink.emit(Diagnostic::new(
                    DiagnosticKind::UnmappedAssignment,
                    &table.title,
                    format!("No mapped column for {key}"),
                ));
                continue;
            }
        };
        let column = &table.columns[column_idx];
        let column_id = column.id.clone();

        if !column.is_relation() {
            let column = &mut project.tables[table_idx].columns[column_idx];
            options::register_missing(transport, sink, column, value)?;
            data.push(Data::new(key.clone(), column_id, value.clone()));
            continue;
        }

        let resolved = match resolve_link(project, table_idx, column_idx) {
            Some(r) => r,
            None => {
                sink.emit(Diagnostic::new(
                    DiagnosticKind::UnresolvedRelation,
                    &project.tables[table_idx].title,
                    format!("Related table of {key} is not loaded"),
                ));
                data.push(Data::new(key.clone(), column_id, json!({})));
                continue;
            }
        };

        let related = project
            .table_by_id(&resolved.table_id)
            .ok_or_else(|| NocoError::Schema(format!("Related table '{}' vanished", resolved.table_id)))?;
        let target = row::row_by_pv(project, related, value);

        match target.and_then(|r| r.id_value().cloned()) {
            Some(id) => {
                let mut link = Map::new();
                link.insert("Id".into(), id.clone());
                if let Some(pv) = related.primary_column() {
                    link.insert(pv.title.clone(), value.clone());
                }
                data.push(Data::new(key.clone(), column_id, Value::Object(link)));
                data.push(Data::new(
                    resolved.child.title.clone(),
                    resolved.child.column_id.clone(),
                    id,
                ));
            }
            None => {
                sink.emit(Diagnostic::new(
                    DiagnosticKind::UnresolvedRelation,
                    &related.title,
                    format!("No row with primary value {value} for {key}"),
                ));
                data.push(Data::new(key.clone(), column_id, json!({})));
                data.push(Data::new(
                    resolved.child.title.clone(),
                    resolved.child.column_id.clone(),
                    Value::Null,
                ));
            }
        }
    }

    Ok(Row::new(table_id, data))
}
