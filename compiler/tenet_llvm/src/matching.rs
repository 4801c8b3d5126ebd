//! The primitives a pattern-match arm dispatch compiles down to (spec.md
//! §3.5/§8 scenario 4): tag-singleton materialization, null checks for
//! `Maybe` unboxing, and the runtime type-id query. The match desugaring
//! itself — walking arms in source order, building the tag-id compare chain,
//! wiring the fall-through error path — stays interleaved in the checker
//! (`tenet_typeck::checker::stmt`) rather than living as a separate codegen
//! pass here.

use inkwell::IntPredicate;

use tenet_types::bound::IrValueHandle;

use crate::context::LlvmLowerer;

impl<'ctx> LlvmLowerer<'ctx> {
    pub(crate) fn materialize_tag_singleton_impl(&mut self, name: &str, type_info: IrValueHandle) -> IrValueHandle {
        // A nullary polymorph option (`A`/`B`/`C` in `type T polymorph { A B C }`)
        // has no payload: its one instance is a process-wide constant whose
        // only field is the pointer to its own `type_info_t` (SPEC_FULL §4's
        // `@__tag_<Name>` / `@__tag_type_info_<Name>` pairing). `name` already
        // carries the `__tag_` prefix — `checker::types::materialize_tag`
        // builds it from the variant's fully-qualified name.
        let ptr_ty = self.context.ptr_type(inkwell::AddressSpace::default());
        let current = self.current_module.expect("tenet internal error: no module open");
        let type_info_value = self.value(type_info);
        let global = self.module(current).add_global(ptr_ty, None, name);
        global.set_initializer(&type_info_value);
        global.set_constant(true);
        self.push_value(global.as_pointer_value().into())
    }

    pub(crate) fn emit_is_null_impl(&mut self, value: IrValueHandle) -> IrValueHandle {
        let ptr = self.value(value).into_pointer_value();
        let null = ptr.get_type().const_null();
        let cmp = self
            .builder
            .build_int_compare(IntPredicate::EQ, ptr, null, "is_null")
            .expect("tenet internal error: failed to build null compare");
        self.push_value(cmp.into())
    }

    pub(crate) fn emit_typeid_call_impl(&mut self, managed_ptr: IrValueHandle) -> IrValueHandle {
        let function = self.get_var_type_id_fn();
        let arg = self.value(managed_ptr);
        let call = self
            .builder
            .build_call(function, &[arg.into()], "typeid")
            .expect("tenet internal error: failed to build get_var_type_id call");
        let result = call
            .try_as_basic_value()
            .left()
            .expect("tenet internal error: get_var_type_id call produced no value");
        self.push_value(result)
    }
}
