// Diff engine - decide whether and what to write back

use crate::coercion::{self, is_empty};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::{NocoError, Result};
use crate::mapper;
use crate::row::{is_system_field, Row};
use crate::schema::Project;
use crate::transport::Transport;
use serde_json::Value;

/// Fields changed by applying assignments to a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    pub changed: Vec<String>,
}

impl Diff {
    pub fn contains(&self, title: &str) -> bool {
        self.changed.iter().any(|t| t == title)
    }

    pub fn len(&self) -> usize {
        self.changed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }
}

/// Apply `assignments` to `existing` in place and report what changed.
///
/// Update policy:
/// - assignments to `Id`, `CreatedAt` and `UpdatedAt` are ignored;
/// - assignments with no matching column are dropped by the mapper;
/// - existing fields without an assignment are left alone;
/// - a field whose coerced value differs takes the candidate's raw value;
/// - a non-empty candidate field the row lacks is appended (the foreign key
///   behind a relation, for one).
///
/// Returns `None` when nothing changed, meaning no write is needed.
pub fn diff(
    transport: &dyn Transport,
    sink: &dyn DiagnosticSink,
    project: &mut Project,
    table_idx: usize,
    existing: &mut Row,
    assignments: &[(String, Value)],
) -> Result<Option<Diff>> {
    let table_title = project.table_at(table_idx)?.title.clone();
    let eligible: Vec<(String, Value)> = assignments
        .iter()
        .filter(|(title, _)| {
            if is_system_field(title) {
                sink.emit(Diagnostic::new(
                    DiagnosticKind::ImmutableField,
                    &table_title,
                    format!("{title} cannot be assigned"),
                ));
                return false;
            }
            true
        })
        .cloned()
        .collect();

    let candidate = mapper::row_from_assignments(transport, sink, project, table_idx, &eligible)?;

    let table = &project.tables[table_idx];
    let mut changed = Vec::new();

    for proposed in candidate.data {
        let column = table.column_by_id(&proposed.column_id).ok_or_else(|| {
            NocoError::Schema(format!(
                "Column '{}' is not part of '{}'",
                proposed.title, table.title
            ))
        })?;
        let key = project.display_key(table, column);

        match existing.get_mut(&proposed.title) {
            Some(current) => {
                let before = coercion::coerce(current.raw(), column, key)?;
                let after = coercion::coerce(proposed.raw(), column, key)?;
                if before != after {
                    log::debug!(
                        "Mismatched property {}: {before:?} != {after:?}",
                        proposed.title
                    );
                    current.set_raw(proposed.raw().clone());
                    changed.push(proposed.title);
                }
            }
            None if !is_empty(proposed.raw()) => {
                changed.push(proposed.title.clone());
                existing.data.push(proposed);
            }
            None => {}
        }
    }

    if changed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Diff { changed }))
    }
}
