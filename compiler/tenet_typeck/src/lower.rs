//! The seam between the checker and a concrete lowering backend.
//!
//! Checking and lowering are interleaved (spec.md §2): the checker calls
//! straight into a [`Lowerer`] as it resolves each AST node rather than
//! building an intermediate tree for a second pass to consume. `tenet_typeck`
//! never depends on `inkwell`/LLVM directly — `tenet_llvm` implements this
//! trait, and anything that needs a backend (the checker, the instantiator,
//! tests) is generic over `L: Lowerer` or holds a `&mut dyn Lowerer`.

use tenet_arc::ReleaseEmitter;
use tenet_ir::ast::BinOp;
use tenet_types::bound::{IrBlockHandle, IrFunctionHandle, IrLayoutHandle, IrModuleHandle, IrTypeHandle, IrValueHandle};
use tenet_types::{Idx, Pool, TypeData};

/// One field's materialized IR type/layout, used when building a struct IR
/// type (spec.md §4.5).
pub struct MaterializedField {
    pub ir_type: IrTypeHandle,
}

/// What `upsert_bound_type` produces for one ground type term: its IR type
/// handle and its layout handle (spec.md §3.3/§4.5).
#[derive(Clone, Copy, Debug)]
pub struct MaterializedType {
    pub ir_type: IrTypeHandle,
    pub ir_layout: IrLayoutHandle,
}

/// Implemented by a lowering backend. Every method operates on opaque
/// handles so this trait stays free of any particular IR library's types.
pub trait Lowerer: ReleaseEmitter {
    // -- Module / function structure --------------------------------------
    fn declare_module(&mut self, name: &str) -> IrModuleHandle;
    fn begin_function(&mut self, module: IrModuleHandle, name: &str, sig: IrTypeHandle, gc_strategy: &str) -> IrFunctionHandle;
    /// Declares a function with no body — a `link` declaration's extern
    /// target (spec.md §4.6). Distinct from `begin_function`: no GC strategy
    /// is stamped and no entry block is expected.
    fn declare_extern_function(&mut self, module: IrModuleHandle, extern_name: &str, sig: IrTypeHandle) -> IrFunctionHandle;
    /// The raw IR value of a function's `index`-th parameter, for binding
    /// into the callee's local stack slot at entry (spec.md §4.7's "every
    /// parameter gets an alloca'd slot, store, bind under its name").
    fn function_param(&mut self, function: IrFunctionHandle, index: u32) -> IrValueHandle;
    fn new_block(&mut self, function: IrFunctionHandle, label: &str) -> IrBlockHandle;
    fn set_insert_block(&mut self, block: IrBlockHandle);
    /// The block the next `emit_*`/`new_block` call would target. Used to
    /// save/restore the insertion point around checking a function body that
    /// was only discovered lazily (spec.md §4.8) mid-way through lowering a
    /// different function's — the backend keeps one ambient insertion point
    /// rather than one per function, so without this a nested
    /// `check_function_body` would strand the outer call site in the wrong
    /// block once it returns.
    fn current_block(&self) -> IrBlockHandle;
    /// Declares a module-level storage slot (spec.md §4.7's module variables):
    /// a permanent root, never freed by the statement/block/loop/function life
    /// machinery — released values move on; this one is visited by the GC
    /// instead (`__visit_module_vars`).
    fn declare_global(&mut self, module: IrModuleHandle, name: &str, ty: IrTypeHandle) -> IrValueHandle;

    // -- Type materialization (spec.md §4.5) -------------------------------
    /// Materializes the IR layout for one variant of `TypeData`, given its
    /// already-materialized children (the caller — `upsert_bound_type` —
    /// walks children first). `name` is the type's signature string, used
    /// for naming generated struct/global types.
    fn materialize_struct(&mut self, name: &str, fields: &[MaterializedField], managed: bool) -> MaterializedType;
    fn materialize_function_type(&mut self, ctx: IrTypeHandle, args: &[IrTypeHandle], ret: IrTypeHandle) -> MaterializedType;
    fn materialize_ptr(&mut self, inner: IrTypeHandle) -> MaterializedType;
    fn materialize_sum(&mut self) -> MaterializedType;
    fn materialize_primitive(&mut self, name: &str) -> MaterializedType;
    /// Publishes a `type_info_t` record and (for nullary constructors) a tag
    /// singleton pointing at it (spec.md §4.9, SPEC_FULL §4 supplement).
    fn materialize_type_info(&mut self, signature: &str, size_bytes: u32, mark_fn: Option<&str>, finalize_fn: Option<&str>) -> IrValueHandle;
    fn materialize_tag_singleton(&mut self, name: &str, type_info: IrValueHandle) -> IrValueHandle;
    /// Allocates a new managed object of `ty`'s layout on the runtime's
    /// managed heap, tagged with `type_info` (spec.md §4.9). Distinct from
    /// `emit_alloca`, which allocates an ordinary local stack slot.
    fn emit_managed_alloc(&mut self, ty: IrTypeHandle, type_info: IrValueHandle) -> IrValueHandle;

    // -- Constants ----------------------------------------------------------
    fn emit_int_const(&mut self, value: i128, width: u32, signed: bool) -> IrValueHandle;
    fn emit_float_const(&mut self, value: f64) -> IrValueHandle;
    fn emit_str_const(&mut self, text: &str) -> IrValueHandle;
    fn emit_null(&mut self, ty: IrTypeHandle) -> IrValueHandle;
    fn emit_bool_const(&mut self, value: bool) -> IrValueHandle;

    // -- Operations -----------------------------------------------------------
    fn emit_call(&mut self, callee: IrValueHandle, args: &[IrValueHandle]) -> IrValueHandle;
    fn emit_int_binop(&mut self, op: BinOp, lhs: IrValueHandle, rhs: IrValueHandle, width: u32, signed: bool) -> IrValueHandle;
    fn emit_int_cast(&mut self, value: IrValueHandle, from_width: u32, to_width: u32, signed: bool) -> IrValueHandle;
    fn emit_ptr_cast(&mut self, value: IrValueHandle, to: IrTypeHandle) -> IrValueHandle;
    fn emit_alloca(&mut self, ty: IrTypeHandle) -> IrValueHandle;
    fn emit_load(&mut self, ptr: IrValueHandle) -> IrValueHandle;
    fn emit_store(&mut self, ptr: IrValueHandle, value: IrValueHandle);
    fn emit_gep(&mut self, base: IrValueHandle, field_index: u32, managed: bool) -> IrValueHandle;
    /// Addresses one element of a native (`Ptr`) pointer by value-indexed
    /// offset, as opposed to [`Lowerer::emit_gep`]'s constant field index.
    fn emit_index_gep(&mut self, base: IrValueHandle, index: IrValueHandle) -> IrValueHandle;
    fn emit_is_null(&mut self, value: IrValueHandle) -> IrValueHandle;
    fn emit_typeid_call(&mut self, managed_ptr: IrValueHandle) -> IrValueHandle;
    fn emit_assert_failure_call(&mut self, message: &str) -> IrValueHandle;
    fn emit_ptr_binop(&mut self, op: BinOp, lhs: IrValueHandle, rhs: IrValueHandle) -> IrValueHandle;
    fn emit_sizeof_const(&mut self, ty: IrTypeHandle) -> IrValueHandle;

    // -- Control flow ---------------------------------------------------------
    fn emit_branch(&mut self, cond: IrValueHandle, then_block: IrBlockHandle, else_block: IrBlockHandle);
    fn emit_jump(&mut self, target: IrBlockHandle);
    fn emit_phi(&mut self, ty: IrTypeHandle, incoming: &[(IrValueHandle, IrBlockHandle)]) -> IrValueHandle;
    fn emit_return(&mut self, value: Option<IrValueHandle>);
}

/// Drives `upsert_bound_type` (spec.md §4.5): materializes the IR layout for
/// a ground type term, bottom-up, caching the result in the program scope by
/// signature so repeated uses share one `BoundType`.
///
/// # Panics
/// Panics if `ty` is not ground — spec.md §4.5's invariant that the caller
/// must apply a grounding substitution first.
pub fn upsert_bound_type(
    program: &crate::scope::ScopeRef,
    pool: &mut Pool,
    lowerer: &mut impl Lowerer,
    ty: Idx,
) -> tenet_types::BoundType {
    assert!(
        tenet_types::is_ground(pool, ty),
        "tenet internal error: attempted to upsert a non-ground type '{}'",
        tenet_types::signature(pool, ty)
    );
    let signature = tenet_types::signature(pool, ty);
    if let Some(existing) = program.get_bound_type(&signature, true) {
        return existing;
    }

    let loc = pool.loc(ty).clone();
    let materialized = materialize(program, pool, lowerer, ty);
    let bound_type = tenet_types::BoundType {
        term: ty,
        ir_type: materialized.ir_type,
        ir_layout: materialized.ir_layout,
        loc,
    };
    program.put_bound_type(signature, bound_type.clone(), pool);
    bound_type
}

fn materialize(
    program: &crate::scope::ScopeRef,
    pool: &mut Pool,
    lowerer: &mut impl Lowerer,
    ty: Idx,
) -> MaterializedType {
    match pool.data(ty).clone() {
        TypeData::Id(name) => lowerer.materialize_primitive(name.text()),
        TypeData::Struct { fields, managed } => {
            let mut materialized_fields = Vec::with_capacity(fields.len());
            for field in &fields {
                let child_bound = upsert_bound_type(program, pool, lowerer, field.ty);
                materialized_fields.push(MaterializedField {
                    ir_type: child_bound.ir_type,
                });
            }
            let signature = tenet_types::signature(pool, ty);
            lowerer.materialize_struct(&signature, &materialized_fields, managed)
        }
        TypeData::Ptr(inner) | TypeData::Managed(inner) | TypeData::Ref(inner) => {
            let inner_bound = upsert_bound_type(program, pool, lowerer, inner);
            lowerer.materialize_ptr(inner_bound.ir_type)
        }
        TypeData::Function { ctx, args, ret } => {
            let ctx_bound = upsert_bound_type(program, pool, lowerer, ctx);
            let ret_bound = upsert_bound_type(program, pool, lowerer, ret);
            let arg_tys: Vec<IrTypeHandle> = match pool.data(args).clone() {
                TypeData::Args { fields } => fields
                    .iter()
                    .map(|f| upsert_bound_type(program, pool, lowerer, f.ty).ir_type)
                    .collect(),
                _ => Vec::new(),
            };
            lowerer.materialize_function_type(ctx_bound.ir_type, &arg_tys, ret_bound.ir_type)
        }
        TypeData::Sum(_) => lowerer.materialize_sum(),
        TypeData::Maybe(inner) => upsert_bound_type_as_materialized(program, pool, lowerer, inner),
        _ => lowerer.materialize_primitive(&tenet_types::signature(pool, ty)),
    }
}

fn upsert_bound_type_as_materialized(
    program: &crate::scope::ScopeRef,
    pool: &mut Pool,
    lowerer: &mut impl Lowerer,
    ty: Idx,
) -> MaterializedType {
    let bound = upsert_bound_type(program, pool, lowerer, ty);
    MaterializedType {
        ir_type: bound.ir_type,
        ir_layout: bound.ir_layout,
    }
}
