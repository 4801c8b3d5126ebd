//! Process-wide interning of identifier strings to small integer handles.
//!
//! Handle `0` is reserved for the empty string so that a default-constructed
//! `Atom` never aliases a real identifier.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::OnceLock;

/// A dense, stable handle for an interned identifier string.
///
/// Two atoms compare equal iff the strings that produced them compare equal;
/// the handle is cheap to copy, hash, and order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Atom(u32);

impl Atom {
    /// The handle reserved for the empty string.
    pub const EMPTY: Atom = Atom(0);

    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn text(self) -> &'static str {
        AtomTable::global().text(self)
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Atom({:?})", self.text())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

struct AtomTableInner {
    strings: Vec<&'static str>,
    lookup: FxHashMap<&'static str, u32>,
}

/// The process-wide atom table.
///
/// A single [`AtomTable`] is shared for the lifetime of the process via
/// [`AtomTable::global`]; strings are leaked once on first intern, which is
/// sound because a compilation never interns an unbounded, unrelated set of
/// identifiers and handles must stay valid for the whole run.
pub struct AtomTable {
    inner: RwLock<AtomTableInner>,
}

static GLOBAL: OnceLock<AtomTable> = OnceLock::new();

impl AtomTable {
    fn new() -> Self {
        let table = AtomTableInner {
            strings: vec![""],
            lookup: FxHashMap::default(),
        };
        let table = AtomTable {
            inner: RwLock::new(table),
        };
        table.inner.write().lookup.insert("", 0);
        table
    }

    /// The global, process-wide atom table.
    pub fn global() -> &'static AtomTable {
        GLOBAL.get_or_init(AtomTable::new)
    }

    /// Interns `s`, returning its handle. Idempotent: interning the same
    /// string twice returns the same handle.
    pub fn intern(&self, s: &str) -> Atom {
        if s.is_empty() {
            return Atom::EMPTY;
        }
        if let Some(&id) = self.inner.read().lookup.get(s) {
            return Atom(id);
        }
        let mut inner = self.inner.write();
        if let Some(&id) = inner.lookup.get(s) {
            return Atom(id);
        }
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let id = u32::try_from(inner.strings.len()).expect("tenet internal error: atom table exceeded u32 capacity");
        inner.strings.push(leaked);
        inner.lookup.insert(leaked, id);
        Atom(id)
    }

    /// Looks up the text behind a handle. Panics if the handle was not
    /// produced by this table (an internal-invariant bug, not a user error).
    #[must_use]
    pub fn text(&self, atom: Atom) -> &'static str {
        let inner = self.inner.read();
        inner
            .strings
            .get(atom.0 as usize)
            .copied()
            .unwrap_or_else(|| panic!("tenet internal error: atom {:?} not present in this table", atom))
    }

    /// Number of distinct strings interned so far (including the empty string).
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.read().strings.len()
    }
}

/// Interns `s` in the global atom table.
pub fn intern(s: &str) -> Atom {
    AtomTable::global().intern(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let a = intern("foo");
        let b = intern("foo");
        assert_eq!(a, b);
        assert_eq!(a.as_u32(), b.as_u32());
    }

    #[test]
    fn distinct_strings_get_distinct_atoms() {
        let a = intern("alpha_distinct");
        let b = intern("beta_distinct");
        assert_ne!(a, b);
    }

    #[test]
    fn empty_string_is_reserved_handle_zero() {
        assert_eq!(intern("").as_u32(), 0);
        assert_eq!(Atom::EMPTY.as_u32(), 0);
    }

    #[test]
    fn text_roundtrips() {
        let a = intern("roundtrip_case");
        assert_eq!(a.text(), "roundtrip_case");
    }
}
