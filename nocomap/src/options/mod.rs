// Option registration for select columns

use crate::coercion::is_empty;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::{NocoError, Result};
use crate::schema::{Column, ColumnKind};
use crate::transport::Transport;
use serde_json::{json, Value};

/// Option titles a value would need on a select column.
pub fn option_titles(kind: &ColumnKind, value: &Value) -> Vec<String> {
    let mut titles: Vec<String> = Vec::new();
    let mut push = |s: String| {
        let s = s.trim().to_string();
        if !s.is_empty() && !titles.contains(&s) {
            titles.push(s);
        }
    };

    match value {
        Value::Array(items) => {
            for item in items.iter().filter(|v| !is_empty(v)) {
                match item {
                    Value::String(s) => push(s.clone()),
                    other => push(other.to_string()),
                }
            }
        }
        Value::String(s) if *kind == ColumnKind::MultiSelect => {
            for part in s.split(',') {
                push(part.to_string());
            }
        }
        Value::String(s) => push(s.clone()),
        v if is_empty(v) => {}
        other => push(other.to_string()),
    }
    titles
}

/// Register every option `value` needs that `column` does not have yet.
///
/// Each missing option costs one blocking metadata update. The in-memory
/// option set is refreshed from the same object once the server accepts it.
/// Non-select columns and empty values are ignored. Returns the number of
/// options registered.
pub fn register_missing(
    transport: &dyn Transport,
    sink: &dyn DiagnosticSink,
    column: &mut Column,
    value: &Value,
) -> Result<usize> {
    if !column.kind.is_select() {
        return Ok(0);
    }

    let mut added = 0;
    for title in option_titles(&column.kind, value) {
        if column.option_by_name(&title).is_some() {
            continue;
        }
        add_option(transport, column, &title)?;
        sink.emit(Diagnostic::new(
            DiagnosticKind::OptionRegistered,
            &column.title,
            &title,
        ));
        added += 1;
    }
    Ok(added)
}

/// Append one option to the column's metadata and persist it.
pub fn add_option(transport: &dyn Transport, column: &mut Column, title: &str) -> Result<Value> {
    let mut meta = column.meta().clone();
    let obj = meta.as_object_mut().ok_or_else(|| {
        NocoError::Schema(format!("Column '{}' metadata is not an object", column.title))
    })?;

    let quoted = format!("'{}'", title.replace('\'', "\\'"));
    let dtxp = match obj.get("dtxp") {
        Some(Value::String(s)) if !s.trim().is_empty() => format!("{s}, {quoted}"),
        _ => quoted,
    };
    obj.insert("dtxp".into(), Value::String(dtxp));

    let col_options = obj
        .entry("colOptions")
        .or_insert_with(|| json!({}));
    if !col_options.is_object() {
        *col_options = json!({});
    }
    let options = col_options
        .as_object_mut()
        .map(|o| o.entry("options").or_insert_with(|| json!([])))
        .ok_or_else(|| NocoError::Schema(format!("Column '{}' has invalid colOptions", column.title)))?;
    if !options.is_array() {
        *options = json!([]);
    }
    if let Some(list) = options.as_array_mut() {
        list.push(json!({ "title": title, "fk_column_id": column.id }));
    }

    let response = transport.column_update(&column.id, &meta)?;
    column.refresh_from_meta(meta)?;
    log::info!("Registered option '{title}' on column '{}'", column.title);
    Ok(response)
}
