//! The managed-object runtime contract (spec.md §4.9/§6.1): `type_info_t`
//! records, managed allocation, constants, and the scalar/pointer operations
//! every expression eventually lowers to. Also where the extern runtime
//! declarations (`runtime.get_var_type_id`, `runtime.on_assert_failure`,
//! `runtime.gc_alloc`, `runtime.release`) are declared lazily on first use.

use inkwell::module::Linkage;
use inkwell::types::{BasicMetadataTypeEnum, BasicType};
use inkwell::values::BasicValue;
use inkwell::{AddressSpace, IntPredicate};

use tenet_arc::ReleaseEmitter;
use tenet_ir::ast::BinOp;
use tenet_types::bound::{IrTypeHandle, IrValueHandle};
use tenet_types::BoundVar;

use crate::context::{zero_value, LlvmLowerer};

impl<'ctx> LlvmLowerer<'ctx> {
    /// The `{ type_id: i32, kind: i16, size_bytes: i32, mark_fn: ptr,
    /// finalize_fn: ptr, name: ptr, indexed_free_vars: i16 }` layout
    /// (SPEC_FULL §4 supplement, grounded on `original_source/llvm_utils.cpp`'s
    /// `type_info_t`, extended with a finalize slot alongside the mark slot).
    fn type_info_struct_ty(&mut self) -> inkwell::types::StructType<'ctx> {
        if let Some(ty) = self.type_info_ty {
            return ty;
        }
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let ty = self.context.opaque_struct_type("type_info_t");
        ty.set_body(
            &[
                self.context.i32_type().into(),
                self.context.i16_type().into(),
                self.context.i32_type().into(),
                ptr_ty.into(),
                ptr_ty.into(),
                ptr_ty.into(),
                self.context.i16_type().into(),
            ],
            false,
        );
        self.type_info_ty = Some(ty);
        ty
    }

    pub(crate) fn materialize_type_info_impl(&mut self, signature: &str, size_bytes: u32, mark_fn: Option<&str>, finalize_fn: Option<&str>) -> IrValueHandle {
        let struct_ty = self.type_info_struct_ty();
        let ptr_ty = self.context.ptr_type(AddressSpace::default());

        let type_id = self.type_id_counter;
        self.type_id_counter += 1;

        let name_global = self.intern_string(signature);
        let name_value = self.value(name_global).as_basic_value_enum();

        let resolve_fn_ptr = |lowerer: &mut Self, extern_name: Option<&str>| -> inkwell::values::PointerValue<'ctx> {
            match extern_name {
                Some(n) => {
                    let module_handle = lowerer.current_module.expect("tenet internal error: no module open");
                    let module = lowerer.module(module_handle);
                    let existing = module.get_function(n);
                    let function = existing.unwrap_or_else(|| {
                        let fn_ty = lowerer.context.void_type().fn_type(&[ptr_ty.into()], false);
                        module.add_function(n, fn_ty, Some(Linkage::External))
                    });
                    function.as_global_value().as_pointer_value()
                }
                None => ptr_ty.const_null(),
            }
        };
        let mark_ptr = resolve_fn_ptr(self, mark_fn);
        let finalize_ptr = resolve_fn_ptr(self, finalize_fn);

        let current = self.current_module.expect("tenet internal error: no module open");
        let global = self.module(current).add_global(struct_ty, None, &format!("__tag_type_info_{signature}"));
        let initializer = struct_ty.const_named_struct(&[
            self.context.i32_type().const_int(type_id as u64, true).into(),
            self.context.i16_type().const_int(0, false).into(),
            self.context.i32_type().const_int(u64::from(size_bytes), false).into(),
            mark_ptr.into(),
            finalize_ptr.into(),
            name_value,
            self.context.i16_type().const_int(0, false).into(),
        ]);
        global.set_initializer(&initializer);
        global.set_constant(true);
        self.push_value(global.as_pointer_value().into())
    }

    pub(crate) fn emit_managed_alloc_impl(&mut self, ty: IrTypeHandle, type_info: IrValueHandle) -> IrValueHandle {
        let function = self.get_gc_alloc_fn();
        // `push_type` always advances the type and layout tables together
        // (see `context::LlvmLowerer::push_type`), so a type handle and its
        // layout handle share the same index.
        let layout = self.layout(tenet_types::bound::IrLayoutHandle(ty.0));
        let size = layout
            .struct_ty
            .map_or_else(|| self.context.ptr_type(AddressSpace::default()).size_of(), |s| s.size_of().expect("tenet internal error: sized struct required for managed alloc"));
        let type_info_value = self.value(type_info);
        let call = self
            .builder
            .build_call(function, &[size.into(), type_info_value.into()], "managed_alloc")
            .expect("tenet internal error: failed to build gc_alloc call");
        let raw = call
            .try_as_basic_value()
            .left()
            .expect("tenet internal error: gc_alloc call produced no value");
        let handle = self.push_value(raw);
        self.track_pointee(handle, ty);
        handle
    }

    pub(crate) fn emit_int_const_impl(&mut self, value: i128, width: u32, signed: bool) -> IrValueHandle {
        let int_ty = self.context.custom_width_int_type(width);
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let bits = value as u64;
        let constant = int_ty.const_int(bits, signed);
        self.push_value(constant.into())
    }

    pub(crate) fn emit_float_const_impl(&mut self, value: f64) -> IrValueHandle {
        let constant = self.context.f64_type().const_float(value);
        self.push_value(constant.into())
    }

    pub(crate) fn emit_str_const_impl(&mut self, text: &str) -> IrValueHandle {
        self.intern_string(text)
    }

    pub(crate) fn emit_null_impl(&mut self, ty: IrTypeHandle) -> IrValueHandle {
        let basic_ty = self.ty(ty);
        self.push_value(zero_value(basic_ty))
    }

    pub(crate) fn emit_bool_const_impl(&mut self, value: bool) -> IrValueHandle {
        let constant = self.context.bool_type().const_int(u64::from(value), false);
        self.push_value(constant.into())
    }

    pub(crate) fn emit_call_impl(&mut self, callee: IrValueHandle, args: &[IrValueHandle]) -> IrValueHandle {
        let arg_values: Vec<_> = args.iter().map(|&a| self.value(a).into()).collect();

        if let Some(&function) = self.functions.get(&callee.0) {
            let call = self
                .builder
                .build_call(function, &arg_values, "call")
                .expect("tenet internal error: failed to build direct call");
            return self.push_call_result(call);
        }

        let fn_ty = *self
            .pointee_fn_types
            .get(&callee.0)
            .expect("tenet internal error: callee is neither a known function nor a cast function pointer");
        let ptr = self.value(callee).into_pointer_value();
        let call = self
            .builder
            .build_indirect_call(fn_ty, ptr, &arg_values, "call")
            .expect("tenet internal error: failed to build indirect call");
        self.push_call_result(call)
    }

    fn push_call_result(&mut self, call: inkwell::values::CallSiteValue<'ctx>) -> IrValueHandle {
        match call.try_as_basic_value().left() {
            Some(value) => self.push_value(value),
            // A void-returning call (e.g. `runtime.on_assert_failure`) still
            // needs a handle so callers can thread it uniformly; never read.
            None => self.push_value(self.context.bool_type().const_int(0, false).into()),
        }
    }

    pub(crate) fn emit_int_binop_impl(&mut self, op: BinOp, lhs: IrValueHandle, rhs: IrValueHandle, width: u32, signed: bool) -> IrValueHandle {
        let l = self.value(lhs).into_int_value();
        let r = self.value(rhs).into_int_value();
        let _ = width;
        let result: inkwell::values::BasicValueEnum<'ctx> = match op {
            BinOp::Add => self.builder.build_int_add(l, r, "add").expect("tenet internal error: failed to build add").into(),
            BinOp::Sub => self.builder.build_int_sub(l, r, "sub").expect("tenet internal error: failed to build sub").into(),
            BinOp::Mul => self.builder.build_int_mul(l, r, "mul").expect("tenet internal error: failed to build mul").into(),
            BinOp::Div if signed => self.builder.build_int_signed_div(l, r, "sdiv").expect("tenet internal error: failed to build sdiv").into(),
            BinOp::Div => self.builder.build_int_unsigned_div(l, r, "udiv").expect("tenet internal error: failed to build udiv").into(),
            BinOp::Mod if signed => self.builder.build_int_signed_rem(l, r, "srem").expect("tenet internal error: failed to build srem").into(),
            BinOp::Mod => self.builder.build_int_unsigned_rem(l, r, "urem").expect("tenet internal error: failed to build urem").into(),
            BinOp::Shl => self.builder.build_left_shift(l, r, "shl").expect("tenet internal error: failed to build shl").into(),
            BinOp::Shr => self.builder.build_right_shift(l, r, signed, "shr").expect("tenet internal error: failed to build shr").into(),
            BinOp::BitAnd => self.builder.build_and(l, r, "and").expect("tenet internal error: failed to build and").into(),
            BinOp::BitOr => self.builder.build_or(l, r, "or").expect("tenet internal error: failed to build or").into(),
            BinOp::Xor => self.builder.build_xor(l, r, "xor").expect("tenet internal error: failed to build xor").into(),
            BinOp::Lt => self.int_compare(l, r, signed, IntPredicate::SLT, IntPredicate::ULT),
            BinOp::Lte => self.int_compare(l, r, signed, IntPredicate::SLE, IntPredicate::ULE),
            BinOp::Gt => self.int_compare(l, r, signed, IntPredicate::SGT, IntPredicate::UGT),
            BinOp::Gte => self.int_compare(l, r, signed, IntPredicate::SGE, IntPredicate::UGE),
            BinOp::Eq => self.int_compare(l, r, signed, IntPredicate::EQ, IntPredicate::EQ),
            BinOp::Ineq => self.int_compare(l, r, signed, IntPredicate::NE, IntPredicate::NE),
        };
        self.push_value(result)
    }

    fn int_compare(
        &mut self,
        l: inkwell::values::IntValue<'ctx>,
        r: inkwell::values::IntValue<'ctx>,
        signed: bool,
        signed_pred: IntPredicate,
        unsigned_pred: IntPredicate,
    ) -> inkwell::values::BasicValueEnum<'ctx> {
        let pred = if signed { signed_pred } else { unsigned_pred };
        self.builder
            .build_int_compare(pred, l, r, "cmp")
            .expect("tenet internal error: failed to build int compare")
            .into()
    }

    pub(crate) fn emit_int_cast_impl(&mut self, value: IrValueHandle, from_width: u32, to_width: u32, signed: bool) -> IrValueHandle {
        let v = self.value(value).into_int_value();
        let _ = from_width;
        let target_ty = self.context.custom_width_int_type(to_width);
        let result = if signed {
            self.builder.build_int_s_extend_or_bit_cast(v, target_ty, "sext")
        } else {
            self.builder.build_int_z_extend_or_bit_cast(v, target_ty, "zext")
        }
        .expect("tenet internal error: failed to build int cast");
        self.push_value(result.into())
    }

    pub(crate) fn emit_ptr_cast_impl(&mut self, value: IrValueHandle, to: IrTypeHandle) -> IrValueHandle {
        let target_ty = self.ty(to);
        let v = self.value(value);
        let result = match v {
            inkwell::values::BasicValueEnum::PointerValue(p) => self
                .builder
                .build_pointer_cast(p, target_ty.into_pointer_type(), "ptrcast")
                .expect("tenet internal error: failed to build pointer cast")
                .into(),
            other => other,
        };
        let handle = self.push_value(result);
        if let Some(&fn_ty) = self.fn_types.get(&to.0) {
            self.pointee_fn_types.insert(handle.0, fn_ty);
        }
        self.track_pointee(handle, to);
        handle
    }

    pub(crate) fn emit_alloca_impl(&mut self, ty: IrTypeHandle) -> IrValueHandle {
        let basic_ty = self.ty(ty);
        let alloca = self
            .builder
            .build_alloca(basic_ty, "slot")
            .expect("tenet internal error: failed to build alloca");
        let handle = self.push_value(alloca.into());
        self.track_pointee(handle, ty);
        handle
    }

    pub(crate) fn emit_load_impl(&mut self, ptr: IrValueHandle) -> IrValueHandle {
        let p = self.value(ptr).into_pointer_value();
        let loaded_ty = self
            .pointee_type(ptr)
            .map_or_else(|| self.context.ptr_type(AddressSpace::default()).as_basic_type_enum(), |t| self.ty(t));
        let value = self
            .builder
            .build_load(loaded_ty, p, "load")
            .expect("tenet internal error: failed to build load");
        self.push_value(value)
    }

    pub(crate) fn emit_store_impl(&mut self, ptr: IrValueHandle, value: IrValueHandle) {
        let p = self.value(ptr).into_pointer_value();
        let v = self.value(value);
        self.builder.build_store(p, v).expect("tenet internal error: failed to build store");
    }

    pub(crate) fn emit_gep_impl(&mut self, base: IrValueHandle, field_index: u32, managed: bool) -> IrValueHandle {
        let base_ty = self
            .pointee_type(base)
            .expect("tenet internal error: emit_gep on a value with no known pointee type");
        let layout = self.layout(tenet_types::bound::IrLayoutHandle(base_ty.0));
        let struct_ty = layout.struct_ty.expect("tenet internal error: emit_gep on a value with no known struct layout");
        let offset = field_index + u32::from(managed);
        let field_ty = layout.field_types[offset as usize];
        let p = self.value(base).into_pointer_value();
        let gep = unsafe {
            self.builder
                .build_struct_gep(struct_ty, p, offset, "field")
                .expect("tenet internal error: failed to build struct gep")
        };
        let handle = self.push_value(gep.into());
        self.track_pointee(handle, field_ty);
        handle
    }

    pub(crate) fn emit_index_gep_impl(&mut self, base: IrValueHandle, index: IrValueHandle) -> IrValueHandle {
        let p = self.value(base).into_pointer_value();
        let idx = self.value(index).into_int_value();
        // A native `Ptr`'s elements are always `var_t*` slots, matching the
        // runtime's vector contract (`__vector_unsafe_append__(vector, var_t*)`).
        let elem_ty = self.var_t;
        let gep = unsafe {
            self.builder
                .build_gep(elem_ty, p, &[idx], "index")
                .expect("tenet internal error: failed to build indexed gep")
        };
        self.push_value(gep.into())
    }

    pub(crate) fn emit_assert_failure_call_impl(&mut self, message: &str) -> IrValueHandle {
        let function = self.get_on_assert_failure_fn();
        let msg = self.intern_string(message);
        let msg_value = self.value(msg);
        let call = self
            .builder
            .build_call(function, &[msg_value.into()], "assert_failure")
            .expect("tenet internal error: failed to build on_assert_failure call");
        self.push_call_result(call)
    }

    pub(crate) fn emit_ptr_binop_impl(&mut self, op: BinOp, lhs: IrValueHandle, rhs: IrValueHandle) -> IrValueHandle {
        let l = self.value(lhs).into_pointer_value();
        let r = self.value(rhs).into_pointer_value();
        let pred = match op {
            BinOp::Eq => IntPredicate::EQ,
            BinOp::Ineq => IntPredicate::NE,
            _ => panic!("tenet internal error: unsupported pointer binary operator {}", op.symbol()),
        };
        let cmp = self
            .builder
            .build_int_compare(pred, l, r, "ptrcmp")
            .expect("tenet internal error: failed to build pointer compare");
        self.push_value(cmp.into())
    }

    pub(crate) fn emit_sizeof_const_impl(&mut self, ty: IrTypeHandle) -> IrValueHandle {
        let basic_ty = self.ty(ty);
        let size = basic_ty.size_of().expect("tenet internal error: sizeof requested for an unsized type");
        self.push_value(size.into())
    }

    fn intern_string(&mut self, text: &str) -> IrValueHandle {
        let name = format!("__str_{}", self.string_counter);
        self.string_counter += 1;
        let current = self.current_module.expect("tenet internal error: no module open");
        let const_str = self.context.const_string(text.as_bytes(), true);
        let storage = self.module(current).add_global(const_str.get_type(), None, &name);
        storage.set_initializer(&const_str);
        storage.set_constant(true);
        storage.set_linkage(Linkage::Private);
        self.push_value(storage.as_pointer_value().into())
    }

    pub(crate) fn get_var_type_id_fn(&mut self) -> inkwell::values::FunctionValue<'ctx> {
        if let Some(f) = self.runtime.get_var_type_id {
            return f;
        }
        let current = self.current_module.expect("tenet internal error: no module open");
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let fn_ty = self.context.i32_type().fn_type(&[ptr_ty.into()], false);
        let function = self.module(current).add_function("runtime.get_var_type_id", fn_ty, Some(Linkage::External));
        self.runtime.get_var_type_id = Some(function);
        function
    }

    fn get_on_assert_failure_fn(&mut self) -> inkwell::values::FunctionValue<'ctx> {
        if let Some(f) = self.runtime.on_assert_failure {
            return f;
        }
        let current = self.current_module.expect("tenet internal error: no module open");
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let fn_ty = self.context.void_type().fn_type(&[ptr_ty.into()], false);
        let function = self.module(current).add_function("runtime.on_assert_failure", fn_ty, Some(Linkage::External));
        self.runtime.on_assert_failure = Some(function);
        function
    }

    fn get_gc_alloc_fn(&mut self) -> inkwell::values::FunctionValue<'ctx> {
        if let Some(f) = self.runtime.gc_alloc {
            return f;
        }
        let current = self.current_module.expect("tenet internal error: no module open");
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let param_tys: Vec<BasicMetadataTypeEnum> = vec![self.context.i64_type().into(), ptr_ty.into()];
        let fn_ty = ptr_ty.fn_type(&param_tys, false);
        let function = self.module(current).add_function("runtime.gc_alloc", fn_ty, Some(Linkage::External));
        self.runtime.gc_alloc = Some(function);
        function
    }

    fn get_release_fn(&mut self) -> inkwell::values::FunctionValue<'ctx> {
        if let Some(f) = self.runtime.release {
            return f;
        }
        let current = self.current_module.expect("tenet internal error: no module open");
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let fn_ty = self.context.void_type().fn_type(&[ptr_ty.into()], false);
        let function = self.module(current).add_function("runtime.release", fn_ty, Some(Linkage::External));
        self.runtime.release = Some(function);
        function
    }
}

impl<'ctx> ReleaseEmitter for LlvmLowerer<'ctx> {
    fn emit_release(&mut self, var: &BoundVar) {
        let function = self.get_release_fn();
        let value = self.value(var.ir_value);
        self.builder
            .build_call(function, &[value.into()], "release")
            .expect("tenet internal error: failed to build release call");
    }
}
