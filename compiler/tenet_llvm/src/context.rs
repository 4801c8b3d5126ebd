//! The backend's handle tables: every `Ir*Handle` the checker holds is an
//! opaque index into one of these arenas, populated as `module.rs`/
//! `types.rs`/`functions.rs`/`object_model.rs`/`control_flow.rs`/
//! `matching.rs` lower each construct into real `inkwell` IR.

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::types::{BasicTypeEnum, FunctionType, StructType};
use inkwell::values::{BasicValueEnum, FunctionValue};
use rustc_hash::FxHashMap;

use tenet_types::bound::{IrBlockHandle, IrLayoutHandle, IrModuleHandle, IrTypeHandle, IrValueHandle};

/// One materialized type's layout: whether it carries a `var_t` header, and
/// (for aggregates) the concrete `inkwell` struct type GEP indexes into.
///
/// A managed struct's field `0` is the header, so `object_model::emit_gep`
/// offsets a source-level field index by `managed` (`1` or `0`) to land on
/// the right slot.
#[derive(Clone)]
pub struct Layout<'ctx> {
    pub struct_ty: Option<StructType<'ctx>>,
    pub managed: bool,
    /// Each field's materialized IR type handle in declaration order,
    /// including the synthetic header field at index `0` when `managed` —
    /// `emit_gep` uses this to resolve a field index back to the handle
    /// whose type/layout a pointer to that field should be tracked under.
    pub field_types: Vec<IrTypeHandle>,
}

impl<'ctx> Layout<'ctx> {
    pub(crate) fn scalar() -> Self {
        Layout {
            struct_ty: None,
            managed: false,
            field_types: Vec::new(),
        }
    }
}

/// The extern runtime functions declared lazily as the lowerer first needs
/// them (spec.md §6.1's runtime contract), cached so a second use doesn't
/// redeclare.
#[derive(Default)]
pub struct RuntimeDecls<'ctx> {
    pub on_assert_failure: Option<FunctionValue<'ctx>>,
    pub get_var_type_id: Option<FunctionValue<'ctx>>,
    pub gc_alloc: Option<FunctionValue<'ctx>>,
    pub release: Option<FunctionValue<'ctx>>,
}

/// The concrete [`crate::Lowerer`] implementor: one `inkwell::Context`-scoped
/// set of modules plus the handle arenas every trait method indexes into.
pub struct LlvmLowerer<'ctx> {
    pub(crate) context: &'ctx Context,
    pub(crate) builder: Builder<'ctx>,
    pub(crate) modules: Vec<Module<'ctx>>,

    /// Shared numbering with `functions`: declaring a function pushes its
    /// pointer value here too, so `IrFunctionHandle::as_value` (same `u32`)
    /// always resolves to a callable value.
    pub(crate) values: Vec<BasicValueEnum<'ctx>>,
    pub(crate) functions: FxHashMap<u32, FunctionValue<'ctx>>,
    pub(crate) blocks: Vec<BasicBlock<'ctx>>,
    pub(crate) current_block: Option<IrBlockHandle>,
    pub(crate) current_module: Option<IrModuleHandle>,

    pub(crate) types: Vec<BasicTypeEnum<'ctx>>,
    pub(crate) layouts: Vec<Layout<'ctx>>,
    /// The concrete `fn(...) -> ret` type behind a `materialize_function_type`
    /// handle, keyed by that handle's `u32` — `functions.rs` looks this up to
    /// build the real `FunctionValue` from a signature handle.
    pub(crate) fn_types: FxHashMap<u32, FunctionType<'ctx>>,
    /// The struct type a pointer *value* (as opposed to its static IR type)
    /// was allocated/cast as, so `emit_gep` can resolve a field index back
    /// to an `inkwell` struct GEP without threading a type argument through
    /// the trait method itself.
    pub(crate) pointee_layouts: FxHashMap<u32, IrLayoutHandle>,
    /// The function type behind a value that was `emit_ptr_cast` to a
    /// function-signature type — lets `emit_call` build an indirect call
    /// for a closure/function-typed value that isn't a plain `declare_*`d
    /// `FunctionValue`.
    pub(crate) pointee_fn_types: FxHashMap<u32, FunctionType<'ctx>>,

    pub(crate) var_t: StructType<'ctx>,
    pub(crate) type_info_ty: Option<StructType<'ctx>>,
    pub(crate) type_id_counter: i32,
    pub(crate) runtime: RuntimeDecls<'ctx>,
    pub(crate) string_counter: u32,
}

impl<'ctx> LlvmLowerer<'ctx> {
    /// Creates a lowerer with no modules yet — `declare_module` opens the
    /// first one. The GC strategy stamped on each emitted function
    /// (spec.md §4.9 / SPEC_FULL §4.7 supplement) is supplied per-function
    /// to `begin_function`, not fixed for the whole lowerer, since a future
    /// link-time mix of strategies per module is conceivable.
    #[must_use]
    pub fn new(context: &'ctx Context) -> Self {
        let var_t = context.opaque_struct_type("var_t");
        LlvmLowerer {
            context,
            builder: context.create_builder(),
            modules: Vec::new(),
            values: Vec::new(),
            functions: FxHashMap::default(),
            blocks: Vec::new(),
            current_block: None,
            current_module: None,
            types: Vec::new(),
            layouts: Vec::new(),
            fn_types: FxHashMap::default(),
            pointee_layouts: FxHashMap::default(),
            pointee_fn_types: FxHashMap::default(),
            var_t,
            type_info_ty: None,
            type_id_counter: 0,
            runtime: RuntimeDecls::default(),
            string_counter: 0,
        }
    }

    /// The modules built so far, in declaration order — used by `tenetc` to
    /// emit one object file per module and by integration tests to assert on
    /// `Module::print_to_string`.
    #[must_use]
    pub fn modules(&self) -> &[Module<'ctx>] {
        &self.modules
    }

    pub(crate) fn module(&self, handle: IrModuleHandle) -> &Module<'ctx> {
        &self.modules[handle.0 as usize]
    }

    pub(crate) fn push_value(&mut self, value: BasicValueEnum<'ctx>) -> IrValueHandle {
        let handle = IrValueHandle(u32::try_from(self.values.len()).expect("tenet internal error: value table exceeded u32 capacity"));
        self.values.push(value);
        handle
    }

    pub(crate) fn value(&self, handle: IrValueHandle) -> BasicValueEnum<'ctx> {
        self.values[handle.0 as usize]
    }

    pub(crate) fn push_type(&mut self, ty: BasicTypeEnum<'ctx>, layout: Layout<'ctx>) -> (IrTypeHandle, IrLayoutHandle) {
        let ty_handle = IrTypeHandle(u32::try_from(self.types.len()).expect("tenet internal error: type table exceeded u32 capacity"));
        self.types.push(ty);
        let layout_handle = IrLayoutHandle(u32::try_from(self.layouts.len()).expect("tenet internal error: layout table exceeded u32 capacity"));
        self.layouts.push(layout);
        (ty_handle, layout_handle)
    }

    pub(crate) fn ty(&self, handle: IrTypeHandle) -> BasicTypeEnum<'ctx> {
        self.types[handle.0 as usize]
    }

    pub(crate) fn layout(&self, handle: IrLayoutHandle) -> Layout<'ctx> {
        self.layouts[handle.0 as usize].clone()
    }

    /// Records that `value` is a pointer to a `ty`-typed slot — `push_type`
    /// advances the type and layout tables in lockstep, so `ty`'s own layout
    /// handle shares its `u32` index.
    pub(crate) fn track_pointee(&mut self, value: IrValueHandle, ty: IrTypeHandle) {
        self.pointee_layouts.insert(value.0, IrLayoutHandle(ty.0));
    }

    /// The type a pointer value was tracked as pointing to via
    /// [`Self::track_pointee`], if any.
    pub(crate) fn pointee_type(&self, value: IrValueHandle) -> Option<IrTypeHandle> {
        self.pointee_layouts.get(&value.0).map(|l| IrTypeHandle(l.0))
    }

    pub(crate) fn push_block(&mut self, block: BasicBlock<'ctx>) -> IrBlockHandle {
        let handle = IrBlockHandle(u32::try_from(self.blocks.len()).expect("tenet internal error: block table exceeded u32 capacity"));
        self.blocks.push(block);
        handle
    }

    pub(crate) fn block(&self, handle: IrBlockHandle) -> BasicBlock<'ctx> {
        self.blocks[handle.0 as usize]
    }
}

/// The all-zero-bits constant for a basic type, used for a freshly declared
/// global's initializer and for `emit_null`'s `Maybe`/`Ptr` zero pointer.
pub(crate) fn zero_value(ty: BasicTypeEnum<'_>) -> BasicValueEnum<'_> {
    match ty {
        BasicTypeEnum::ArrayType(t) => t.const_zero().into(),
        BasicTypeEnum::FloatType(t) => t.const_zero().into(),
        BasicTypeEnum::IntType(t) => t.const_zero().into(),
        BasicTypeEnum::PointerType(t) => t.const_null().into(),
        BasicTypeEnum::StructType(t) => t.const_zero().into(),
        BasicTypeEnum::VectorType(t) => t.const_zero().into(),
        BasicTypeEnum::ScalableVectorType(t) => t.const_zero().into(),
    }
}
