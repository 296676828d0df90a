use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// UI type tag marking a link column.
pub const LINK_UIDT: &str = "LinkToAnotherRecord";
pub const SINGLE_SELECT_UIDT: &str = "SingleSelect";
pub const MULTI_SELECT_UIDT: &str = "MultiSelect";

/// Project metadata as returned by the project list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMeta {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub roles: Option<Value>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub deleted: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// One entry of a project's table list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub id: String,
    pub table_name: String,
    pub title: String,
    #[serde(default)]
    pub base_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub enabled: bool,
    #[serde(default)]
    pub tags: Option<Value>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub deleted: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// One entry of a table's column list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub id: String,
    pub column_name: String,
    pub title: String,
    pub uidt: String,
    #[serde(default)]
    pub dt: Option<String>,
    #[serde(default)]
    pub dtx: Option<String>,
    #[serde(default)]
    pub dtxp: Option<Value>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub pv: bool,
    #[serde(rename = "colOptions", default)]
    pub col_options: Option<Value>,
    #[serde(default)]
    pub base_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub fk_model_id: Option<String>,
    #[serde(default)]
    pub db_type: Option<String>,
    #[serde(default)]
    pub ref_db_alias: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub deleted: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Relation fields carried in a link column's `colOptions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDescriptor {
    /// `hm`, `bt` or `mm`.
    #[serde(rename = "type", default)]
    pub relation_type: Option<String>,
    pub fk_related_model_id: String,
    #[serde(default)]
    pub fk_column_id: Option<String>,
    pub fk_child_column_id: String,
    pub fk_parent_column_id: String,
    #[serde(default)]
    pub fk_mm_model_id: Option<String>,
    #[serde(default)]
    pub fk_mm_child_column_id: Option<String>,
    #[serde(default)]
    pub fk_mm_parent_column_id: Option<String>,
}

/// A registered value of a select column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// What a column is, as far as mapping is concerned.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    Link(LinkDescriptor),
    SingleSelect,
    MultiSelect,
    Plain,
}

impl ColumnKind {
    pub fn is_select(&self) -> bool {
        matches!(self, ColumnKind::SingleSelect | ColumnKind::MultiSelect)
    }
}

/// Declared storage type (`dt`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Datetime,
    /// A known type whose values pass through coercion unchanged.
    Scalar(String),
    /// No `dt` on the descriptor (virtual columns such as links and lookups).
    Unspecified,
    /// A tag this crate does not know. Coercing a value of this type fails.
    Unrecognized(String),
}

const SCALAR_TYPES: &[&str] = &[
    "varchar",
    "char",
    "character varying",
    "text",
    "tinytext",
    "mediumtext",
    "longtext",
    "boolean",
    "bool",
    "bit",
    "tinyint",
    "smallint",
    "mediumint",
    "int",
    "int2",
    "int4",
    "int8",
    "bigint",
    "serial",
    "bigserial",
    "float",
    "double",
    "double precision",
    "float4",
    "float8",
    "real",
    "decimal",
    "numeric",
    "date",
    "time",
    "year",
    "timestamp",
    "timestamptz",
    "timestamp with time zone",
    "timestamp without time zone",
    "citext",
    "json",
    "jsonb",
    "uuid",
    "enum",
    "set",
    "specifictype",
];

impl DataType {
    pub fn parse(tag: Option<&str>) -> Self {
        let tag = match tag.map(str::trim) {
            None | Some("") => return DataType::Unspecified,
            Some(t) => t,
        };
        let lower = tag.to_ascii_lowercase();
        match lower.as_str() {
            "integer" => DataType::Integer,
            "datetime" => DataType::Datetime,
            s if SCALAR_TYPES.contains(&s) => DataType::Scalar(lower),
            _ => DataType::Unrecognized(tag.to_string()),
        }
    }
}

/// Accepts `true`/`false`, `0`/`1` and `null` for flag fields.
fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_i64().map(|n| n != 0).unwrap_or(false),
        Some(Value::String(s)) => matches!(s.as_str(), "true" | "1"),
        _ => false,
    })
}
