pub mod registry;
pub mod types;

pub use registry::{
    load_columns, load_tables, resolve_link, Column, ColumnRef, Project, ResolvedLink, Table,
};
pub use types::{
    ColumnDescriptor, ColumnKind, DataType, LinkDescriptor, ProjectMeta, SelectOption,
    TableDescriptor,
};
