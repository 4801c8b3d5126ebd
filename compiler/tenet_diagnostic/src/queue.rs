//! An accumulating diagnostic sink shared across one compilation.

use crate::diagnostic::Diagnostic;

/// Collects diagnostics across a compilation. A component that hits an error
/// pushes a [`Diagnostic`] here and returns a null/placeholder value to its
/// caller rather than aborting (spec.md §4.10); the driver decides whether to
/// stop after inspecting [`DiagnosticQueue::has_errors`].
#[derive(Debug, Default)]
pub struct DiagnosticQueue {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticQueue {
    #[must_use]
    pub fn new() -> Self {
        DiagnosticQueue::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity.is_error() {
            tracing::debug!(at = %diagnostic.at, "recording error diagnostic");
        }
        self.diagnostics.push(diagnostic);
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity.is_error())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_kind::ScopeErrorKind;
    use tenet_ir::{Located, SourceFile, Span};

    fn loc() -> Located {
        Located::new(SourceFile::new("test.tn"), Span::new(1, 1))
    }

    #[test]
    fn empty_queue_has_no_errors() {
        let q = DiagnosticQueue::new();
        assert!(!q.has_errors());
        assert!(q.is_empty());
    }

    #[test]
    fn pushing_an_error_is_observed() {
        let mut q = DiagnosticQueue::new();
        q.push(Diagnostic::error(
            ScopeErrorKind::MissingSymbol {
                name: "foo".into(),
            },
            loc(),
        ));
        assert!(q.has_errors());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn warnings_do_not_count_as_errors() {
        let mut q = DiagnosticQueue::new();
        q.push(Diagnostic::warning(
            ScopeErrorKind::MissingSymbol {
                name: "foo".into(),
            },
            loc(),
        ));
        assert!(!q.has_errors());
    }
}
