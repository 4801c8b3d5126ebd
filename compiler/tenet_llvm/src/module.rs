//! Module-level structure: one `inkwell::Module` per source module, and the
//! permanent global slots module-level `var`s lower to (spec.md §4.7).

use inkwell::module::Linkage;

use tenet_types::bound::{IrModuleHandle, IrTypeHandle, IrValueHandle};

use crate::context::{zero_value, LlvmLowerer};

impl<'ctx> LlvmLowerer<'ctx> {
    pub(crate) fn declare_module_impl(&mut self, name: &str) -> IrModuleHandle {
        let module = self.context.create_module(name);
        let handle = IrModuleHandle(u32::try_from(self.modules.len()).expect("tenet internal error: module table exceeded u32 capacity"));
        self.modules.push(module);
        self.current_module = Some(handle);
        handle
    }

    pub(crate) fn declare_global_impl(&mut self, module: IrModuleHandle, name: &str, ty: IrTypeHandle) -> IrValueHandle {
        let basic_ty = self.ty(ty);
        let global = self.module(module).add_global(basic_ty, None, name);
        global.set_linkage(Linkage::Internal);
        global.set_initializer(&zero_value(basic_ty));
        let handle = self.push_value(global.as_pointer_value().into());
        self.track_pointee(handle, ty);
        handle
    }
}
