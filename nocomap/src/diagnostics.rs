// Diagnostics for non-fatal mapping conditions

use std::cell::RefCell;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A server field with no matching column.
    UnmappedField,
    /// An assignment key with no matching column.
    UnmappedAssignment,
    /// A relation assignment whose target row or table could not be found.
    UnresolvedRelation,
    /// An assignment to `Id`, `CreatedAt` or `UpdatedAt`.
    ImmutableField,
    /// A new select option was registered with the server.
    OptionRegistered,
    /// An update produced no changes and was not sent.
    NoChanges,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticKind::UnmappedField => "unmapped_field",
            DiagnosticKind::UnmappedAssignment => "unmapped_assignment",
            DiagnosticKind::UnresolvedRelation => "unresolved_relation",
            DiagnosticKind::ImmutableField => "immutable_field",
            DiagnosticKind::OptionRegistered => "option_registered",
            DiagnosticKind::NoChanges => "no_changes",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Table or column the event concerns.
    pub entity: String,
    pub detail: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, entity: impl Into<String>, detail: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            entity: entity.into(),
            detail: detail.into(),
        }
    }
}

/// Receiver for structured diagnostics. The host decides where they go.
pub trait DiagnosticSink {
    fn emit(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&self, d: Diagnostic) {
        match d.kind {
            DiagnosticKind::OptionRegistered => {
                log::info!("[{}] {}: {}", d.kind, d.entity, d.detail)
            }
            DiagnosticKind::NoChanges => log::debug!("[{}] {}: {}", d.kind, d.entity, d.detail),
            _ => log::warn!("[{}] {}: {}", d.kind, d.entity, d.detail),
        }
    }
}

/// Collects diagnostics in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: RefCell<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Diagnostic> {
        self.events.borrow().clone()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.events.borrow().iter().filter(|d| d.kind == kind).count()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, diagnostic: Diagnostic) {
        self.events.borrow_mut().push(diagnostic);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for std::rc::Rc<S> {
    fn emit(&self, diagnostic: Diagnostic) {
        (**self).emit(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_counts_by_kind() {
        let sink = MemorySink::new();
        sink.emit(Diagnostic::new(DiagnosticKind::UnmappedField, "Tasks", "Foo"));
        sink.emit(Diagnostic::new(DiagnosticKind::UnmappedField, "Tasks", "Bar"));
        sink.emit(Diagnostic::new(DiagnosticKind::NoChanges, "Tasks", "row 1"));

        assert_eq!(sink.count(DiagnosticKind::UnmappedField), 2);
        assert_eq!(sink.count(DiagnosticKind::NoChanges), 1);
        assert_eq!(sink.events()[1].detail, "Bar");

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(DiagnosticKind::UnresolvedRelation.to_string(), "unresolved_relation");
    }
}
