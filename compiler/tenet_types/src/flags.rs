//! Cached classification bits for a type term, computed once and consulted
//! by the checker/lowerer instead of re-walking the term for common
//! questions ("is this ground", "is this managed").

use crate::pool::{Idx, Pool};
use crate::term;
use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct TypeFlags: u16 {
        /// `ftv_count(t) == 0`.
        const GROUND       = 1 << 0;
        /// Reaches the heap through a `Managed` header somewhere in its spine.
        const MANAGED       = 1 << 1;
        const MAYBE         = 1 << 2;
        const SUM           = 1 << 3;
        const FUNCTION      = 1 << 4;
        const PRIMITIVE_INT = 1 << 5;
        const REF           = 1 << 6;
        const PTR           = 1 << 7;
    }
}

#[must_use]
pub fn compute_flags(pool: &Pool, idx: Idx) -> TypeFlags {
    let mut flags = TypeFlags::empty();
    flags.set(TypeFlags::GROUND, term::is_ground(pool, idx));
    flags.set(TypeFlags::MANAGED, term::is_managed_ptr(pool, idx));
    flags.set(TypeFlags::MAYBE, term::is_maybe(pool, idx));
    flags.set(TypeFlags::FUNCTION, term::is_function(pool, idx));
    flags.set(TypeFlags::PRIMITIVE_INT, term::is_integer(pool, idx));
    flags.set(TypeFlags::REF, term::is_ref(pool, idx));
    flags.set(TypeFlags::PTR, term::is_ptr(pool, idx));
    flags.set(
        TypeFlags::SUM,
        matches!(pool.data(idx), crate::term::TypeData::Sum(_)),
    );
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenet_ir::{Located, SourceFile, Span};

    fn loc() -> Located {
        Located::new(SourceFile::new("test.tn"), Span::new(1, 1))
    }

    #[test]
    fn ground_primitive_has_ground_flag_only() {
        let mut pool = Pool::new();
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let flags = compute_flags(&pool, int_ty);
        assert!(flags.contains(TypeFlags::GROUND));
        assert!(flags.contains(TypeFlags::PRIMITIVE_INT));
        assert!(!flags.contains(TypeFlags::MAYBE));
    }
}
