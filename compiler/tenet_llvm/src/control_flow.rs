//! Branching, jumps, phi nodes, and returns — the checker's block/loop/`if`
//! desugaring (spec.md §3.6) bottoms out here.

use inkwell::values::BasicValue;

use tenet_types::bound::{IrBlockHandle, IrTypeHandle, IrValueHandle};

use crate::context::LlvmLowerer;

impl<'ctx> LlvmLowerer<'ctx> {
    pub(crate) fn emit_branch_impl(&mut self, cond: IrValueHandle, then_block: IrBlockHandle, else_block: IrBlockHandle) {
        let cond_value = self.value(cond).into_int_value();
        self.builder
            .build_conditional_branch(cond_value, self.block(then_block), self.block(else_block))
            .expect("tenet internal error: failed to build conditional branch");
    }

    pub(crate) fn emit_jump_impl(&mut self, target: IrBlockHandle) {
        self.builder
            .build_unconditional_branch(self.block(target))
            .expect("tenet internal error: failed to build unconditional branch");
    }

    pub(crate) fn emit_phi_impl(&mut self, ty: IrTypeHandle, incoming: &[(IrValueHandle, IrBlockHandle)]) -> IrValueHandle {
        let basic_ty = self.ty(ty);
        let phi = self
            .builder
            .build_phi(basic_ty, "phi")
            .expect("tenet internal error: failed to build phi node");
        // `add_incoming` only borrows; the resolved values need an owned home
        // to borrow from for the duration of the call.
        let owned: Vec<_> = incoming.iter().map(|(value, block)| (self.value(*value), self.block(*block))).collect();
        let refs: Vec<(&dyn BasicValue<'ctx>, inkwell::basic_block::BasicBlock<'ctx>)> =
            owned.iter().map(|(v, b)| (v as &dyn BasicValue<'ctx>, *b)).collect();
        phi.add_incoming(&refs);
        self.push_value(phi.as_basic_value())
    }

    pub(crate) fn emit_return_impl(&mut self, value: Option<IrValueHandle>) {
        match value {
            Some(handle) => {
                let basic_value = self.value(handle);
                self.builder
                    .build_return(Some(&basic_value))
                    .expect("tenet internal error: failed to build return");
            }
            None => {
                self.builder.build_return(None).expect("tenet internal error: failed to build return");
            }
        }
    }
}
