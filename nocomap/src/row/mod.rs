// Rows and their field values

use crate::coercion::{self, FieldValue};
use crate::error::Result;
use crate::schema::{ColumnKind, DataType, Project, Table};
use serde_json::{Map, Value};

/// Fields the server owns. Assignments never overwrite them.
pub const SYSTEM_FIELDS: &[&str] = &["Id", "CreatedAt", "UpdatedAt"];

pub fn is_system_field(title: &str) -> bool {
    SYSTEM_FIELDS.contains(&title)
}

/// One field of a row: the column it belongs to and its raw stored value.
#[derive(Debug, Clone, PartialEq)]
pub struct Data {
    pub title: String,
    pub column_id: String,
    raw: Value,
}

impl Data {
    pub fn new(title: impl Into<String>, column_id: impl Into<String>, raw: Value) -> Self {
        Data {
            title: title.into(),
            column_id: column_id.into(),
            raw,
        }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub(crate) fn set_raw(&mut self, raw: Value) {
        self.raw = raw;
    }
}

/// A row of a table. Field order follows the payload it was built from.
#[derive(Debug, Clone, Default)]
pub struct Row {
    pub table_id: String,
    pub data: Vec<Data>,
}

impl Row {
    pub fn new(table_id: impl Into<String>, data: Vec<Data>) -> Self {
        Row {
            table_id: table_id.into(),
            data,
        }
    }

    pub fn get(&self, title: &str) -> Option<&Data> {
        self.data.iter().find(|d| d.title == title)
    }

    pub(crate) fn get_mut(&mut self, title: &str) -> Option<&mut Data> {
        self.data.iter_mut().find(|d| d.title == title)
    }

    pub fn raw(&self, title: &str) -> Option<&Value> {
        self.get(title).map(Data::raw)
    }

    /// The raw `Id` field.
    pub fn id_value(&self) -> Option<&Value> {
        self.raw("Id").filter(|v| !v.is_null())
    }

    pub fn id(&self) -> Option<i64> {
        match self.id_value()? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.data.iter().map(|d| d.title.as_str())
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.table_id == other.table_id && self.id() == other.id()
    }
}

/// A row read through its table's schema.
#[derive(Clone, Copy)]
pub struct RowView<'a> {
    pub project: &'a Project,
    pub table: &'a Table,
    pub row: &'a Row,
}

impl<'a> RowView<'a> {
    pub fn new(project: &'a Project, table: &'a Table, row: &'a Row) -> Self {
        RowView {
            project,
            table,
            row,
        }
    }

    /// Coerced value of a field. `None` when the row has no such field or
    /// the field has no known column.
    pub fn value(&self, title: &str) -> Result<Option<FieldValue>> {
        let data = match self.row.get(title) {
            Some(d) => d,
            None => return Ok(None),
        };
        let column = match self.table.column_by_id(&data.column_id) {
            Some(c) => c,
            None => return Ok(None),
        };
        let key = self.project.display_key(self.table, column);
        Ok(Some(coercion::coerce(data.raw(), column, key)?))
    }

    /// The field held in the table's primary value column.
    pub fn primary_value(&self) -> Option<&'a Data> {
        let pv = self.table.primary_column()?;
        self.row.data.iter().find(|d| d.column_id == pv.id)
    }

    /// Coerced primary value, the row's human-readable title.
    pub fn title(&self) -> Result<Option<FieldValue>> {
        match self.primary_value() {
            Some(data) => self.value(&data.title),
            None => Ok(None),
        }
    }

    /// Title → value body for a create or update request.
    ///
    /// Relation fields carry their link object, everything else its coerced
    /// value as a string. Empty values are `null`. Columns of an unknown
    /// storage type pass their raw value through.
    pub fn payload(&self) -> Result<Map<String, Value>> {
        let mut body = Map::new();
        for data in &self.row.data {
            let column = match self.table.column_by_id(&data.column_id) {
                Some(c) => c,
                None => continue,
            };
            let value = if coercion::is_empty(data.raw()) {
                Value::Null
            } else if let ColumnKind::Link(_) = column.kind {
                data.raw().clone()
            } else if let DataType::Unrecognized(_) = column.data_type {
                data.raw().clone()
            } else {
                match coercion::coerce(data.raw(), column, None)? {
                    FieldValue::Absent => Value::Null,
                    v => Value::String(v.to_wire_string()),
                }
            };
            body.insert(data.title.clone(), value);
        }
        Ok(body)
    }

    /// Every field as typed JSON, for display.
    pub fn to_json(&self) -> Result<Value> {
        let mut out = Map::new();
        for data in &self.row.data {
            let value = self.value(&data.title)?.unwrap_or(FieldValue::Absent);
            out.insert(data.title.clone(), value.to_json());
        }
        Ok(Value::Object(out))
    }
}

/// First cached row whose field `title` matches `value`.
pub fn row_by_key<'a>(
    project: &'a Project,
    table: &'a Table,
    title: &str,
    value: &Value,
) -> Option<&'a Row> {
    table.rows.iter().find(|row| {
        matches!(
            RowView::new(project, table, row).value(title),
            Ok(Some(v)) if v.matches(value)
        )
    })
}

/// First cached row whose primary value matches `value`.
pub fn row_by_pv<'a>(project: &'a Project, table: &'a Table, value: &Value) -> Option<&'a Row> {
    let pv = table.primary_column()?;
    row_by_key(project, table, &pv.title, value)
}
