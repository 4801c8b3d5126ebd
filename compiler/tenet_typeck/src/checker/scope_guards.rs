//! Scope-paired life-frame guards for the checker.
//!
//! `ScopeRef`s are immutable and `Rc`-linked, so a child scope simply drops
//! when a guard's closure returns — there's no state to restore. What these
//! guards actually protect is the life-frame/release-call pairing (spec.md
//! §4.9): every `push` here is matched by a `release_vars` + `pop` before
//! the guard returns.
//!
//! The closure reports whether control already left through an early
//! `return`/`break`/`continue` (`Ok(true)`). That path already released
//! every frame from its own statement frame down to its target (spec.md
//! §4.9's "up to and including") in one pass, before emitting the
//! terminator — by the time control unwinds back out through nested guards,
//! re-releasing here would double-free. So a guard only emits its own
//! `release_vars` when the closure reports `Ok(false)` (ordinary
//! fall-through); `pop` always happens regardless, since it's just stack
//! bookkeeping, not an emission.

use tenet_arc::life::FrameKind;
use tenet_diagnostic::Diagnostic;
use tenet_types::bound::IrBlockHandle;
use tenet_types::Idx;

use crate::lower::Lowerer;
use crate::scope::ScopeRef;

use super::Checker;

impl<'a, L: Lowerer> Checker<'a, L> {
    /// Runs `f` inside a fresh `Statement` life frame, releasing everything
    /// it tracked on the way out (unless `f` already released down past this
    /// frame via an early return/break/continue).
    pub fn with_statement_life(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<bool, Diagnostic>,
    ) -> Result<bool, Diagnostic> {
        let frame = self.life.push(FrameKind::Statement);
        let result = f(self);
        if !matches!(result, Ok(true)) {
            tenet_arc::release::release_vars(self.life, frame, self.lowerer);
        }
        self.life.pop();
        result
    }

    /// Runs `f` with a fresh child `Block` scope and life frame.
    pub fn with_block_scope(
        &mut self,
        parent: &ScopeRef,
        f: impl FnOnce(&mut Self, &ScopeRef) -> Result<bool, Diagnostic>,
    ) -> Result<bool, Diagnostic> {
        let scope = ScopeRef::new_block(parent);
        let frame = self.life.push(FrameKind::Block);
        let result = f(self, &scope);
        if !matches!(result, Ok(true)) {
            tenet_arc::release::release_vars(self.life, frame, self.lowerer);
        }
        self.life.pop();
        result
    }

    /// Runs `f` with a fresh child `Function` scope and life frame.
    pub fn with_function_scope(
        &mut self,
        parent: &ScopeRef,
        return_type: Option<Idx>,
        f: impl FnOnce(&mut Self, &ScopeRef) -> Result<bool, Diagnostic>,
    ) -> Result<bool, Diagnostic> {
        let scope = ScopeRef::new_function(parent, return_type);
        let frame = self.life.push(FrameKind::Function);
        let result = f(self, &scope);
        if !matches!(result, Ok(true)) {
            tenet_arc::release::release_vars(self.life, frame, self.lowerer);
        }
        self.life.pop();
        result
    }

    /// Runs `f` with a fresh child `Loop` scope and life frame, installing
    /// `continue`/`break` targets for the duration.
    pub fn with_loop_scope(
        &mut self,
        parent: &ScopeRef,
        continue_target: IrBlockHandle,
        break_target: IrBlockHandle,
        f: impl FnOnce(&mut Self, &ScopeRef) -> Result<bool, Diagnostic>,
    ) -> Result<bool, Diagnostic> {
        let scope = ScopeRef::new_loop(parent, continue_target, break_target);
        let frame = self.life.push(FrameKind::Loop);
        let result = f(self, &scope);
        if !matches!(result, Ok(true)) {
            tenet_arc::release::release_vars(self.life, frame, self.lowerer);
        }
        self.life.pop();
        result
    }

    /// Releases everything tracked in `frame` except the value `keep_id`
    /// identifies — used where a frame's final result is adopted by a
    /// longer-lived owner (a `var` slot, a module-level global) rather than
    /// released with the frame itself.
    pub fn release_frame_except(&mut self, frame: tenet_arc::FrameId, keep_id: u32) {
        for var in self.life.release_vars(frame) {
            if var.id != keep_id {
                self.lowerer.emit_release(&var);
            }
        }
    }
}
