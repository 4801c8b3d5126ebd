//! Function declaration and entry/block bookkeeping (spec.md §4.7): turns a
//! `materialize_function_type` signature handle into a real `inkwell`
//! `FunctionValue`, and tracks the ambient insertion point the checker
//! expects to survive a nested `check_function_body` call.

use inkwell::module::Linkage;

use tenet_types::bound::{IrBlockHandle, IrFunctionHandle, IrModuleHandle, IrTypeHandle, IrValueHandle};

use crate::context::LlvmLowerer;

impl<'ctx> LlvmLowerer<'ctx> {
    pub(crate) fn begin_function_impl(&mut self, module: IrModuleHandle, name: &str, sig: IrTypeHandle, gc_strategy: &str) -> IrFunctionHandle {
        let fn_ty = self.fn_types[&sig.0];
        let function = self.module(module).add_function(name, fn_ty, Some(Linkage::Internal));
        function.set_gc(gc_strategy);

        let handle = self.push_function(function);
        let entry = function.append_basic_block("entry");
        let block_handle = self.push_block(entry);
        self.current_block = Some(block_handle);
        self.builder.position_at_end(entry);
        handle
    }

    pub(crate) fn declare_extern_function_impl(&mut self, module: IrModuleHandle, extern_name: &str, sig: IrTypeHandle) -> IrFunctionHandle {
        let fn_ty = self.fn_types[&sig.0];
        let function = self.module(module).add_function(extern_name, fn_ty, Some(Linkage::External));
        self.push_function(function)
    }

    pub(crate) fn function_param_impl(&mut self, function: IrFunctionHandle, index: u32) -> IrValueHandle {
        let value = self.functions[&function.as_value().0]
            .get_nth_param(index)
            .expect("tenet internal error: function param index out of range");
        self.push_value(value)
    }

    pub(crate) fn new_block_impl(&mut self, function: IrFunctionHandle, label: &str) -> IrBlockHandle {
        let fn_value = self.functions[&function.as_value().0];
        let block = fn_value.append_basic_block(label);
        self.push_block(block)
    }

    pub(crate) fn set_insert_block_impl(&mut self, block: IrBlockHandle) {
        self.current_block = Some(block);
        self.builder.position_at_end(self.block(block));
    }

    pub(crate) fn current_block_impl(&self) -> IrBlockHandle {
        self.current_block.expect("tenet internal error: no block positioned yet")
    }

    fn push_function(&mut self, function: inkwell::values::FunctionValue<'ctx>) -> IrFunctionHandle {
        let handle = self.push_value(function.as_global_value().as_pointer_value().into());
        self.functions.insert(handle.0, function);
        IrFunctionHandle(handle.0)
    }
}
