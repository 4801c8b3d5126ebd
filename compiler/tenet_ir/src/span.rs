//! Source locations attached to every AST node and type term.

use std::fmt;
use std::rc::Rc;

/// A source file identity shared by every span pointing into it.
///
/// Cheaply cloned (`Rc`-backed) so that every AST node can carry its own
/// [`Span`] without threading a file table through every API.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SourceFile {
    inner: Rc<str>,
}

impl SourceFile {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        SourceFile {
            inner: Rc::from(name.into()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

/// A 1-indexed line/column source location, used for diagnostics.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Span { line, column }
    }

    /// A placeholder span for synthesized AST nodes (desugaring, builtins)
    /// that have no corresponding source text.
    #[must_use]
    pub const fn synthetic() -> Self {
        Span { line: 0, column: 0 }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A span paired with the file it points into.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Located {
    pub file: SourceFile,
    pub span: Span,
}

impl Located {
    #[must_use]
    pub fn new(file: SourceFile, span: Span) -> Self {
        Located { file, span }
    }
}

impl fmt::Display for Located {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.span)
    }
}
