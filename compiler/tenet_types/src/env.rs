//! The typename environment: `name → (is_structural, expansion type)`
//! (spec.md §3.5's `env_map`), used by [`crate::term::eval`] to expand
//! aliases.
//!
//! Rc-linked parent pointers give O(1) child-scope creation, matching the
//! teacher's `TypeEnv` design: pushing a nested scope never copies the
//! parent's bindings.

use rustc_hash::FxHashMap;
use std::rc::Rc;
use tenet_ir::Atom;

use crate::pool::Idx;

#[derive(Debug, Clone)]
struct TypeNameEnvInner {
    bindings: FxHashMap<Atom, (bool, Idx)>,
    parent: Option<TypeNameEnv>,
}

/// A nested typename environment. Clone is O(1) (bumps the `Rc`), so pushing
/// a child scope is cheap.
#[derive(Clone, Debug)]
pub struct TypeNameEnv(Rc<TypeNameEnvInner>);

impl TypeNameEnv {
    #[must_use]
    pub fn root() -> Self {
        TypeNameEnv(Rc::new(TypeNameEnvInner {
            bindings: FxHashMap::default(),
            parent: None,
        }))
    }

    #[must_use]
    pub fn child(&self) -> Self {
        TypeNameEnv(Rc::new(TypeNameEnvInner {
            bindings: FxHashMap::default(),
            parent: Some(self.clone()),
        }))
    }

    /// Registers a structural alias (expands on every use, no nominal
    /// identity of its own). Returns `Err` on redefinition in this exact
    /// scope, matching spec.md §4.4's `put_structural_typename`.
    pub fn put_structural(&mut self, name: Atom, expansion: Idx) -> Result<(), ()> {
        self.put(name, true, expansion)
    }

    /// Registers a nominal typename (has its own identity; `get_type` only
    /// expands it when `allow_structural` asks for the expansion).
    pub fn put_nominal(&mut self, name: Atom, expansion: Idx) -> Result<(), ()> {
        self.put(name, false, expansion)
    }

    fn put(&mut self, name: Atom, is_structural: bool, expansion: Idx) -> Result<(), ()> {
        let inner = Rc::make_mut(&mut self.0);
        if inner.bindings.contains_key(&name) {
            return Err(());
        }
        inner.bindings.insert(name, (is_structural, expansion));
        Ok(())
    }

    /// Looks up `name`, honoring `allow_structural`: a structural alias is
    /// only returned when the caller opted in, matching spec.md §4.4's
    /// `get_type(name, allow_structural)`.
    #[must_use]
    pub fn get_type(&self, name: Atom, allow_structural: bool) -> Option<Idx> {
        let mut current = self;
        loop {
            if let Some(&(is_structural, expansion)) = current.0.bindings.get(&name) {
                if is_structural && !allow_structural {
                    return None;
                }
                return Some(expansion);
            }
            match &current.0.parent {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// Flattens every visible binding into a lookup map suitable for
    /// [`crate::term::eval`] and [`crate::unify::unify`].
    #[must_use]
    pub fn flatten(&self) -> FxHashMap<Atom, Idx> {
        let mut out = FxHashMap::default();
        let mut chain = Vec::new();
        let mut current = Some(self);
        while let Some(env) = current {
            chain.push(env);
            current = env.0.parent.as_ref();
        }
        for env in chain.into_iter().rev() {
            for (&name, &(_, expansion)) in &env.0.bindings {
                out.insert(name, expansion);
            }
        }
        out
    }
}

impl Default for TypeNameEnv {
    fn default() -> Self {
        TypeNameEnv::root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Pool;
    use tenet_ir::{Located, SourceFile, Span};

    fn loc() -> Located {
        Located::new(SourceFile::new("test.tn"), Span::new(1, 1))
    }

    #[test]
    fn child_sees_parent_bindings() {
        let mut pool = Pool::new();
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let mut root = TypeNameEnv::root();
        root.put_nominal(tenet_ir::intern("MyInt"), int_ty).unwrap();
        let child = root.child();
        assert_eq!(child.get_type(tenet_ir::intern("MyInt"), false), Some(int_ty));
    }

    #[test]
    fn structural_alias_hidden_unless_allowed() {
        let mut pool = Pool::new();
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let mut root = TypeNameEnv::root();
        root.put_structural(tenet_ir::intern("MyAlias"), int_ty)
            .unwrap();
        assert_eq!(root.get_type(tenet_ir::intern("MyAlias"), false), None);
        assert_eq!(
            root.get_type(tenet_ir::intern("MyAlias"), true),
            Some(int_ty)
        );
    }

    #[test]
    fn redefinition_in_same_scope_fails() {
        let mut pool = Pool::new();
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let mut root = TypeNameEnv::root();
        root.put_nominal(tenet_ir::intern("X"), int_ty).unwrap();
        assert!(root.put_nominal(tenet_ir::intern("X"), int_ty).is_err());
    }
}
