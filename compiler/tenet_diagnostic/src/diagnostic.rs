//! A single reported diagnostic: a primary message at a location, plus an
//! ordered list of secondary notes at other locations.

use crate::error_kind::ErrorKind;
use crate::severity::Severity;
use tenet_ir::Located;

/// A secondary note attached to a [`Diagnostic`], e.g. "previous definition
/// here" pointing at an earlier declaration.
#[derive(Debug, Clone)]
pub struct Note {
    pub message: String,
    pub at: Located,
}

/// One user-facing diagnostic: a primary message with an optional chain of
/// related locations, matching spec.md §7's reporting policy.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: ErrorKind,
    pub at: Located,
    pub notes: Vec<Note>,
}

impl Diagnostic {
    #[must_use]
    pub fn error(kind: impl Into<ErrorKind>, at: Located) -> Self {
        Diagnostic {
            severity: Severity::Error,
            kind: kind.into(),
            at,
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn warning(kind: impl Into<ErrorKind>, at: Located) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            kind: kind.into(),
            at,
            notes: Vec::new(),
        }
    }

    /// Attaches a follow-up note, e.g. "while checking X" or a pointer at a
    /// competing overload.
    #[must_use]
    pub fn with_note(mut self, message: impl Into<String>, at: Located) -> Self {
        self.notes.push(Note {
            message: message.into(),
            at,
        });
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}: {} ({})", self.severity, self.kind, self.at)?;
        for note in &self.notes {
            writeln!(f, "  note: {} ({})", note.message, note.at)?;
        }
        Ok(())
    }
}
