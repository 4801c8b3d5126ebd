//! Resolving a parsed [`tenet_ir::ast::TypeExpr`] to a type-pool [`Idx`]
//! (spec.md §4.2's `eval`, applied to surface syntax rather than an already
//! interned term).
//!
//! Lowercase bare names are type variables by source convention (see
//! `TypeExpr::Id`'s doc comment); anything the enclosing scope's typename
//! environment already knows (a struct, polymorph, or alias) resolves
//! through it; anything else is a primitive `Id` (`int32`, `void`, `null`,
//! user `link`-declared opaque types, …).

use tenet_ir::ast::TypeExpr;
use tenet_ir::Atom;
use tenet_types::term::Field;
use tenet_types::TypeData;

use crate::lower::Lowerer;
use crate::scope::ScopeRef;

use super::Checker;

impl<'a, L: Lowerer> Checker<'a, L> {
    pub fn resolve_type_expr(&mut self, scope: &ScopeRef, texpr: &TypeExpr) -> tenet_types::Idx {
        match texpr {
            TypeExpr::Id(name, loc) => {
                if let Some(existing) = scope.get_type(*name, true) {
                    return existing;
                }
                if is_type_variable_name(*name) {
                    return self.pool.insert(TypeData::Variable(*name), loc.clone());
                }
                self.pool.intern_id(*name, loc.clone())
            }
            TypeExpr::Applied(base, args, loc) => {
                let mut current = self.resolve_type_expr(scope, base);
                let flattened = scope.flattened_type_env();
                for arg in args {
                    let arg_ty = self.resolve_type_expr(scope, arg);
                    current = self.pool.insert(TypeData::Operator(current, arg_ty), loc.clone());
                    if let Some(reduced) = tenet_types::term::eval(self.pool, current, &flattened) {
                        current = reduced;
                    }
                }
                current
            }
            TypeExpr::Maybe(inner, loc) => {
                let inner_ty = self.resolve_type_expr(scope, inner);
                tenet_types::term::mk_maybe(self.pool, inner_ty, loc.clone())
            }
            TypeExpr::Ptr(inner, loc) => {
                let inner_ty = self.resolve_type_expr(scope, inner);
                self.pool.insert(TypeData::Ptr(inner_ty), loc.clone())
            }
            TypeExpr::Ref(inner, loc) => {
                let inner_ty = self.resolve_type_expr(scope, inner);
                self.pool.insert(TypeData::Ref(inner_ty), loc.clone())
            }
            TypeExpr::Tuple(elems, loc) => {
                let fields = elems
                    .iter()
                    .enumerate()
                    .map(|(i, e)| Field {
                        name: tenet_ir::intern(&format!("_{i}")),
                        ty: self.resolve_type_expr(scope, e),
                    })
                    .collect();
                self.pool.insert(
                    TypeData::Struct {
                        fields,
                        managed: false,
                    },
                    loc.clone(),
                )
            }
            TypeExpr::Function(params, ret, loc) => {
                let fields = params
                    .iter()
                    .enumerate()
                    .map(|(i, p)| Field {
                        name: tenet_ir::intern(&format!("_{i}")),
                        ty: self.resolve_type_expr(scope, p),
                    })
                    .collect();
                let args = self.pool.insert(TypeData::Args { fields }, loc.clone());
                let ret_ty = self.resolve_type_expr(scope, ret);
                let ctx = self.pool.intern_id(tenet_ir::intern("void"), loc.clone());
                self.pool.insert(TypeData::Function { ctx, args, ret: ret_ty }, loc.clone())
            }
        }
    }
}

fn is_type_variable_name(name: Atom) -> bool {
    name.text().chars().next().is_some_and(|c| c.is_lowercase())
}
