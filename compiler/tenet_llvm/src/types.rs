//! Type materialization (spec.md §4.5): turns a ground `tenet_types::Idx`,
//! walked bottom-up by `tenet_typeck::lower::upsert_bound_type`, into a real
//! `inkwell` type plus a [`crate::context::Layout`] recording whether it
//! carries a `var_t` header.

use inkwell::types::BasicMetadataTypeEnum;
use inkwell::AddressSpace;

use tenet_typeck::lower::{Lowerer, MaterializedField, MaterializedType};
use tenet_types::bound::{IrTypeHandle, IrValueHandle};

use crate::context::{Layout, LlvmLowerer};

impl<'ctx> Lowerer for LlvmLowerer<'ctx> {
    fn materialize_struct(&mut self, name: &str, fields: &[MaterializedField], managed: bool) -> MaterializedType {
        // The header field has no `MaterializedField` of its own (it isn't a
        // source-level field), so its slot in `field_types` stays absent;
        // `object_model::emit_gep` never loads through it directly.
        let mut field_handles = Vec::with_capacity(fields.len());
        let mut field_basic_tys = Vec::with_capacity(fields.len() + usize::from(managed));
        if managed {
            field_basic_tys.push(self.context.ptr_type(AddressSpace::default()).into());
        }
        for field in fields {
            field_basic_tys.push(self.ty(field.ir_type));
            field_handles.push(field.ir_type);
        }
        let struct_ty = self.context.opaque_struct_type(name);
        struct_ty.set_body(&field_basic_tys, false);
        let layout = Layout {
            struct_ty: Some(struct_ty),
            managed,
            field_types: field_handles,
        };
        // User-defined aggregates are always addressed through a pointer,
        // never passed by value (spec.md §3.3's managed-object model).
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let (ir_type, ir_layout) = self.push_type(ptr_ty.into(), layout);
        MaterializedType { ir_type, ir_layout }
    }

    fn materialize_function_type(&mut self, ctx: IrTypeHandle, args: &[IrTypeHandle], ret: IrTypeHandle) -> MaterializedType {
        // Every function implicitly takes its closure-capture context
        // pointer as its first LLVM parameter (`ctx` in `TypeData::Function`).
        let mut param_tys: Vec<BasicMetadataTypeEnum> = Vec::with_capacity(args.len() + 1);
        param_tys.push(self.ty(ctx).into());
        param_tys.extend(args.iter().map(|&a| self.ty(a).into()));

        let ret_ty = self.ty(ret);
        let fn_ty = ret_ty.fn_type(&param_tys, false);

        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let (ir_type, ir_layout) = self.push_type(ptr_ty.into(), Layout::scalar());
        self.fn_types.insert(ir_type.0, fn_ty);
        MaterializedType { ir_type, ir_layout }
    }

    fn materialize_ptr(&mut self, inner: IrTypeHandle) -> MaterializedType {
        let _ = inner;
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let (ir_type, ir_layout) = self.push_type(ptr_ty.into(), Layout::scalar());
        MaterializedType { ir_type, ir_layout }
    }

    fn materialize_sum(&mut self) -> MaterializedType {
        // A `Sum`'s representation is identical to a managed polymorph's: a
        // tagged pointer whose `type_info_t` header identifies which option
        // is live (spec.md §4.5's "kind" discriminant doubles as the sum
        // discriminant, so there's no separate boxed-union layout).
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let (ir_type, ir_layout) = self.push_type(ptr_ty.into(), Layout::scalar());
        MaterializedType { ir_type, ir_layout }
    }

    fn materialize_primitive(&mut self, name: &str) -> MaterializedType {
        let basic_ty = match name {
            "int" | "int64" => self.context.i64_type().into(),
            "int32" => self.context.i32_type().into(),
            "int16" => self.context.i16_type().into(),
            "int8" | "byte" => self.context.i8_type().into(),
            "bool" => self.context.bool_type().into(),
            "float" | "float64" => self.context.f64_type().into(),
            "float32" => self.context.f32_type().into(),
            "str" => self.context.ptr_type(AddressSpace::default()).into(),
            // Unrecognized primitive names (`unit`, `never`, an opaque
            // `link`ed type) are modeled as an opaque pointer; they're never
            // loaded/stored through by value, only passed around.
            _ => self.context.ptr_type(AddressSpace::default()).into(),
        };
        let (ir_type, ir_layout) = self.push_type(basic_ty, Layout::scalar());
        MaterializedType { ir_type, ir_layout }
    }

    // -- The rest of `Lowerer` is implemented across the other modules ----
    // (`module.rs`, `functions.rs`, `control_flow.rs`, `object_model.rs`,
    // `matching.rs`); Rust requires one coherent `impl Lowerer` block per
    // type, so each of those files defines inherent `*_impl` methods that
    // this block's remaining trait methods (declared at the bottom of
    // `lowerer.rs`) delegate to.
    fn declare_module(&mut self, name: &str) -> tenet_types::bound::IrModuleHandle {
        self.declare_module_impl(name)
    }

    fn declare_global(&mut self, module: tenet_types::bound::IrModuleHandle, name: &str, ty: IrTypeHandle) -> IrValueHandle {
        self.declare_global_impl(module, name, ty)
    }

    fn begin_function(&mut self, module: tenet_types::bound::IrModuleHandle, name: &str, sig: IrTypeHandle, gc_strategy: &str) -> tenet_types::bound::IrFunctionHandle {
        self.begin_function_impl(module, name, sig, gc_strategy)
    }

    fn declare_extern_function(&mut self, module: tenet_types::bound::IrModuleHandle, extern_name: &str, sig: IrTypeHandle) -> tenet_types::bound::IrFunctionHandle {
        self.declare_extern_function_impl(module, extern_name, sig)
    }

    fn function_param(&mut self, function: tenet_types::bound::IrFunctionHandle, index: u32) -> IrValueHandle {
        self.function_param_impl(function, index)
    }

    fn new_block(&mut self, function: tenet_types::bound::IrFunctionHandle, label: &str) -> tenet_types::bound::IrBlockHandle {
        self.new_block_impl(function, label)
    }

    fn set_insert_block(&mut self, block: tenet_types::bound::IrBlockHandle) {
        self.set_insert_block_impl(block);
    }

    fn current_block(&self) -> tenet_types::bound::IrBlockHandle {
        self.current_block_impl()
    }

    fn materialize_type_info(&mut self, signature: &str, size_bytes: u32, mark_fn: Option<&str>, finalize_fn: Option<&str>) -> IrValueHandle {
        self.materialize_type_info_impl(signature, size_bytes, mark_fn, finalize_fn)
    }

    fn materialize_tag_singleton(&mut self, name: &str, type_info: IrValueHandle) -> IrValueHandle {
        self.materialize_tag_singleton_impl(name, type_info)
    }

    fn emit_managed_alloc(&mut self, ty: IrTypeHandle, type_info: IrValueHandle) -> IrValueHandle {
        self.emit_managed_alloc_impl(ty, type_info)
    }

    fn emit_int_const(&mut self, value: i128, width: u32, signed: bool) -> IrValueHandle {
        self.emit_int_const_impl(value, width, signed)
    }

    fn emit_float_const(&mut self, value: f64) -> IrValueHandle {
        self.emit_float_const_impl(value)
    }

    fn emit_str_const(&mut self, text: &str) -> IrValueHandle {
        self.emit_str_const_impl(text)
    }

    fn emit_null(&mut self, ty: IrTypeHandle) -> IrValueHandle {
        self.emit_null_impl(ty)
    }

    fn emit_bool_const(&mut self, value: bool) -> IrValueHandle {
        self.emit_bool_const_impl(value)
    }

    fn emit_call(&mut self, callee: IrValueHandle, args: &[IrValueHandle]) -> IrValueHandle {
        self.emit_call_impl(callee, args)
    }

    fn emit_int_binop(&mut self, op: tenet_ir::ast::BinOp, lhs: IrValueHandle, rhs: IrValueHandle, width: u32, signed: bool) -> IrValueHandle {
        self.emit_int_binop_impl(op, lhs, rhs, width, signed)
    }

    fn emit_int_cast(&mut self, value: IrValueHandle, from_width: u32, to_width: u32, signed: bool) -> IrValueHandle {
        self.emit_int_cast_impl(value, from_width, to_width, signed)
    }

    fn emit_ptr_cast(&mut self, value: IrValueHandle, to: IrTypeHandle) -> IrValueHandle {
        self.emit_ptr_cast_impl(value, to)
    }

    fn emit_alloca(&mut self, ty: IrTypeHandle) -> IrValueHandle {
        self.emit_alloca_impl(ty)
    }

    fn emit_load(&mut self, ptr: IrValueHandle) -> IrValueHandle {
        self.emit_load_impl(ptr)
    }

    fn emit_store(&mut self, ptr: IrValueHandle, value: IrValueHandle) {
        self.emit_store_impl(ptr, value);
    }

    fn emit_gep(&mut self, base: IrValueHandle, field_index: u32, managed: bool) -> IrValueHandle {
        self.emit_gep_impl(base, field_index, managed)
    }

    fn emit_index_gep(&mut self, base: IrValueHandle, index: IrValueHandle) -> IrValueHandle {
        self.emit_index_gep_impl(base, index)
    }

    fn emit_is_null(&mut self, value: IrValueHandle) -> IrValueHandle {
        self.emit_is_null_impl(value)
    }

    fn emit_typeid_call(&mut self, managed_ptr: IrValueHandle) -> IrValueHandle {
        self.emit_typeid_call_impl(managed_ptr)
    }

    fn emit_assert_failure_call(&mut self, message: &str) -> IrValueHandle {
        self.emit_assert_failure_call_impl(message)
    }

    fn emit_ptr_binop(&mut self, op: tenet_ir::ast::BinOp, lhs: IrValueHandle, rhs: IrValueHandle) -> IrValueHandle {
        self.emit_ptr_binop_impl(op, lhs, rhs)
    }

    fn emit_sizeof_const(&mut self, ty: IrTypeHandle) -> IrValueHandle {
        self.emit_sizeof_const_impl(ty)
    }

    fn emit_branch(&mut self, cond: IrValueHandle, then_block: tenet_types::bound::IrBlockHandle, else_block: tenet_types::bound::IrBlockHandle) {
        self.emit_branch_impl(cond, then_block, else_block);
    }

    fn emit_jump(&mut self, target: tenet_types::bound::IrBlockHandle) {
        self.emit_jump_impl(target);
    }

    fn emit_phi(&mut self, ty: IrTypeHandle, incoming: &[(IrValueHandle, tenet_types::bound::IrBlockHandle)]) -> IrValueHandle {
        self.emit_phi_impl(ty, incoming)
    }

    fn emit_return(&mut self, value: Option<IrValueHandle>) {
        self.emit_return_impl(value);
    }
}
