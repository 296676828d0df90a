pub mod client;
pub mod coercion;
pub mod config;
pub mod diagnostics;
pub mod diff;
pub mod error;
pub mod mapper;
pub mod options;
pub mod row;
pub mod schema;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{Client, TableHandle, UpdateOutcome};
pub use coercion::FieldValue;
pub use config::{AuthToken, ClientConfig};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, LogSink, MemorySink};
pub use diff::Diff;
pub use error::{CoercionError, NocoError, Result};
pub use mapper::{assignments, Assignments};
pub use row::{Data, Row, RowView};
pub use schema::{Column, ColumnKind, DataType, Project, Table};
pub use transport::{HttpTransport, RowQuery, TableAddr, Transport};
