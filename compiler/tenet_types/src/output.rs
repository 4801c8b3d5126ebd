//! Canonical printing of type terms: the signature string used as the
//! identity key for every bound-type/bound-var cache.
//!
//! The grammar below is a Rust-native equivalent of the one
//! `original_source/src/types.cpp` uses (`"struct {...}"`, `"fn (...) ..."`,
//! a `?` suffix for `Maybe`, a `*` prefix for `Ptr`, `&` for `Ref`): stable
//! and deterministic, since `tenet_typeck::scope::ProgramScope::bound_types`
//! keys off it directly.

use crate::pool::{Idx, Pool};
use crate::term::TypeData;
use std::fmt::Write as _;

/// Canonical, deterministic printing of `idx`. Two terms with equal
/// signatures are considered the same type for caching purposes.
#[must_use]
pub fn signature(pool: &Pool, idx: Idx) -> String {
    let mut out = String::new();
    write_signature(pool, idx, &mut out);
    out
}

fn write_fields(pool: &Pool, fields: &[crate::term::Field], out: &mut String) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        if field.name != tenet_ir::Atom::EMPTY {
            let _ = write!(out, "{}: ", field.name.text());
        }
        write_signature(pool, field.ty, out);
    }
}

fn write_signature(pool: &Pool, idx: Idx, out: &mut String) {
    match pool.data(idx) {
        TypeData::Id(name) => out.push_str(name.text()),
        TypeData::Variable(name) => {
            out.push('\'');
            out.push_str(name.text());
        }
        TypeData::Operator(f, x) => {
            write_signature(pool, *f, out);
            out.push(' ');
            write_signature(pool, *x, out);
        }
        TypeData::Lambda(param, body) => {
            let _ = write!(out, "\\{}. ", param.text());
            write_signature(pool, *body, out);
        }
        TypeData::Struct { fields, managed } => {
            if *managed {
                out.push_str("managed ");
            }
            out.push_str("struct {");
            write_fields(pool, fields, out);
            out.push('}');
        }
        TypeData::Args { fields } => {
            out.push('(');
            write_fields(pool, fields, out);
            out.push(')');
        }
        TypeData::Ref(inner) => {
            out.push('&');
            write_signature(pool, *inner, out);
        }
        TypeData::Ptr(inner) => {
            out.push('*');
            write_signature(pool, *inner, out);
        }
        TypeData::Managed(inner) => {
            out.push_str("managed ");
            write_signature(pool, *inner, out);
        }
        TypeData::Maybe(inner) => {
            write_signature(pool, *inner, out);
            out.push('?');
        }
        TypeData::Sum(opts) => {
            for (i, opt) in opts.iter().enumerate() {
                if i > 0 {
                    out.push('|');
                }
                write_signature(pool, *opt, out);
            }
        }
        TypeData::Function { ctx, args, ret } => {
            out.push_str("fn ");
            write_signature(pool, *ctx, out);
            out.push(' ');
            write_signature(pool, *args, out);
            out.push_str(" -> ");
            write_signature(pool, *ret, out);
        }
        TypeData::Module(inner) => {
            out.push_str("module ");
            write_signature(pool, *inner, out);
        }
        TypeData::TypeInfo => out.push_str("typeinfo"),
        TypeData::Extern {
            inner, underlying, ..
        } => {
            out.push_str("extern ");
            write_signature(pool, *inner, out);
            out.push_str(" as ");
            write_signature(pool, *underlying, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{mk_maybe, Field};
    use tenet_ir::{Located, SourceFile, Span};

    fn loc() -> Located {
        Located::new(SourceFile::new("test.tn"), Span::new(1, 1))
    }

    #[test]
    fn primitives_print_as_their_name() {
        let mut pool = Pool::new();
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        assert_eq!(signature(&pool, int_ty), "int32");
    }

    #[test]
    fn maybe_appends_question_mark() {
        let mut pool = Pool::new();
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let m = mk_maybe(&mut pool, int_ty, loc());
        assert_eq!(signature(&pool, m), "int32?");
    }

    #[test]
    fn ptr_and_ref_print_with_sigil_prefixes() {
        let mut pool = Pool::new();
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let ptr = pool.insert(TypeData::Ptr(int_ty), loc());
        let reff = pool.insert(TypeData::Ref(int_ty), loc());
        assert_eq!(signature(&pool, ptr), "*int32");
        assert_eq!(signature(&pool, reff), "&int32");
    }

    #[test]
    fn struct_prints_named_fields_in_order() {
        let mut pool = Pool::new();
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let bool_ty = pool.intern_id(tenet_ir::intern("bool"), loc());
        let fields = vec![
            Field {
                name: tenet_ir::intern("x"),
                ty: int_ty,
            },
            Field {
                name: tenet_ir::intern("y"),
                ty: bool_ty,
            },
        ];
        let s = pool.insert(
            TypeData::Struct {
                fields,
                managed: false,
            },
            loc(),
        );
        assert_eq!(signature(&pool, s), "struct {x: int32, y: bool}");
    }

    #[test]
    fn function_signature_has_stable_shape() {
        let mut pool = Pool::new();
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let void_ty = pool.intern_id(tenet_ir::intern("void"), loc());
        let args = pool.insert(
            TypeData::Args {
                fields: vec![Field {
                    name: tenet_ir::Atom::EMPTY,
                    ty: int_ty,
                }],
            },
            loc(),
        );
        let f = pool.insert(
            TypeData::Function {
                ctx: void_ty,
                args,
                ret: int_ty,
            },
            loc(),
        );
        assert_eq!(signature(&pool, f), "fn void (int32) -> int32");
    }
}
