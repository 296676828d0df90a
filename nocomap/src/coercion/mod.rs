// Value coercion - raw stored values to typed field values

use crate::error::CoercionError;
use crate::schema::{Column, ColumnKind, DataType};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::fmt;

/// A field value after coercion by column type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Absent,
    Integer(i64),
    Timestamp(DateTime<FixedOffset>),
    /// A list-valued field joined with commas.
    Text(String),
    /// Display values of a multi-row relation.
    Links(Vec<Value>),
    /// Anything else, unchanged.
    Scalar(Value),
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            FieldValue::Scalar(v) => v.as_i64(),
            _ => None,
        }
    }

    /// The value as it is written into a request body.
    pub fn to_wire_string(&self) -> String {
        match self {
            FieldValue::Absent => String::new(),
            FieldValue::Integer(n) => n.to_string(),
            FieldValue::Timestamp(ts) => ts.to_rfc3339(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Links(items) => items.iter().map(scalar_string).collect::<Vec<_>>().join(","),
            FieldValue::Scalar(v) => scalar_string(v),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Absent => Value::Null,
            FieldValue::Integer(n) => Value::from(*n),
            FieldValue::Timestamp(ts) => Value::String(ts.to_rfc3339()),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Links(items) => Value::Array(items.clone()),
            FieldValue::Scalar(v) => v.clone(),
        }
    }

    /// Compare against a caller-supplied value by their written form, so
    /// `9` matches `"9"` and a display name matches its string.
    pub fn matches(&self, value: &Value) -> bool {
        if self.is_absent() {
            return is_empty(value);
        }
        self.to_wire_string() == scalar_string(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire_string())
    }
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Null, empty string, empty list and empty object all count as "no value".
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Coerce a raw value according to its column.
///
/// `display_key` names the field of a related object that holds its
/// display value; it is only consulted for relation columns.
pub fn coerce(
    raw: &Value,
    column: &Column,
    display_key: Option<&str>,
) -> Result<FieldValue, CoercionError> {
    match (&column.kind, &column.data_type) {
        (_, DataType::Datetime) => coerce_datetime(raw, column),
        (_, DataType::Integer) => coerce_integer(raw, column),
        (ColumnKind::Link(_), _) => coerce_relation(raw, column, display_key),
        (_, DataType::Unrecognized(tag)) => Err(CoercionError::UnrecognizedType {
            column: column.title.clone(),
            tag: tag.clone(),
        }),
        (_, DataType::Scalar(_)) | (_, DataType::Unspecified) => Ok(coerce_plain(raw, column)),
    }
}

fn coerce_integer(raw: &Value, column: &Column) -> Result<FieldValue, CoercionError> {
    let invalid = || CoercionError::InvalidInteger {
        column: column.title.clone(),
        raw: scalar_string(raw),
    };
    let n = match raw {
        Value::Null => 0,
        Value::Bool(b) => *b as i64,
        Value::Number(n) => match n.as_i64() {
            Some(n) => n,
            None => n.as_f64().map(|f| f.trunc() as i64).ok_or_else(invalid)?,
        },
        Value::String(s) if s.trim().is_empty() => 0,
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };
    Ok(FieldValue::Integer(n))
}

fn coerce_datetime(raw: &Value, column: &Column) -> Result<FieldValue, CoercionError> {
    let s = match raw {
        Value::Null => return Ok(FieldValue::Absent),
        Value::String(s) if s.trim().is_empty() => return Ok(FieldValue::Absent),
        Value::String(s) => s.trim(),
        _ => {
            return Err(CoercionError::InvalidDatetime {
                column: column.title.clone(),
                raw: scalar_string(raw),
            })
        }
    };
    parse_datetime(s)
        .map(FieldValue::Timestamp)
        .ok_or_else(|| CoercionError::InvalidDatetime {
            column: column.title.clone(),
            raw: s.to_string(),
        })
}

/// Parse the ISO-8601 shapes the server emits. Values without an offset are UTC.
pub fn parse_datetime(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts);
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(ts) = DateTime::parse_from_str(s, format) {
            return Some(ts);
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

fn coerce_relation(
    raw: &Value,
    column: &Column,
    display_key: Option<&str>,
) -> Result<FieldValue, CoercionError> {
    if is_empty(raw) {
        return Ok(FieldValue::Absent);
    }
    let key = display_key.ok_or_else(|| CoercionError::MissingDisplayKey {
        column: column.title.clone(),
    })?;
    let display = |item: &Value| item.get(key).cloned().unwrap_or(Value::Null);

    Ok(match raw {
        Value::Array(items) => FieldValue::Links(items.iter().map(display).collect()),
        Value::Object(_) => match display(raw) {
            Value::Null => FieldValue::Absent,
            v => FieldValue::Scalar(v),
        },
        // A bare id or title rather than an object.
        other => FieldValue::Scalar(other.clone()),
    })
}

fn coerce_plain(raw: &Value, column: &Column) -> FieldValue {
    match raw {
        Value::Null => FieldValue::Absent,
        Value::Array(items) => FieldValue::Text(
            items.iter().map(scalar_string).collect::<Vec<_>>().join(","),
        ),
        // Select values arrive either as a list or already joined.
        Value::String(s) if column.kind.is_select() => FieldValue::Text(s.clone()),
        other => FieldValue::Scalar(other.clone()),
    }
}
