//! Unchecked entities: declarations whose bound form has not yet been
//! materialized (spec.md §3.4).

use crate::scope::ScopeRef;
use tenet_ir::ast;
use tenet_ir::Atom;
use tenet_types::bound::IrValueHandle;
use tenet_types::Idx;

/// A type declaration whose bound form has not yet been materialized.
#[derive(Clone)]
pub struct UncheckedType {
    pub fqn: Atom,
    pub node: ast::TypeDecl,
    pub owning_module: ScopeRef,
}

/// The declaration shapes that produce an [`UncheckedVar`]: a user function,
/// a linked extern function, or a data constructor synthesized for one
/// variant of a `polymorph` type.
#[derive(Clone)]
pub enum UncheckedVarNode {
    Function(ast::FunctionDecl),
    Link(ast::LinkDecl),
    Ctor {
        variant: ast::PolymorphVariant,
        owner_type: Atom,
    },
}

/// A function or data constructor whose monomorphized bound form has not yet
/// been materialized.
#[derive(Clone)]
pub struct UncheckedVar {
    pub fqn: Atom,
    pub node: UncheckedVarNode,
    pub owning_module: ScopeRef,
    /// The constructor's declared `Function` signature term, set for data
    /// constructors (spec.md §3.4).
    pub ctor_signature: Option<Idx>,
    /// True for `link`-declared externs, matching
    /// `original_source/src/unchecked_var.h`'s `native` flag.
    pub native: bool,
    /// The published `type_info_t` record for a data constructor's owning
    /// struct, filled in once its owner type is materialized (spec.md §4.9).
    /// `None` for plain functions and links, and for a `Ctor` until
    /// `ScopeRef::finalize_ctor` runs.
    pub type_info: Option<IrValueHandle>,
}

impl UncheckedVar {
    #[must_use]
    pub fn is_generic(&self, pool: &tenet_types::Pool) -> bool {
        self.ctor_signature
            .is_some_and(|sig| !tenet_types::is_ground(pool, sig))
    }
}
