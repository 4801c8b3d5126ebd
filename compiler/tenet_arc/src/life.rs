//! Life frames: the scope-level tracking structure recording which managed
//! values must be released on exit (spec.md §3.6).
//!
//! Only managed values are ever tracked here — the checker/lowerer decides
//! at creation time whether a resolved value is managed and only then calls
//! [`Life::track`], so this module never needs to consult the type pool.

use tenet_types::BoundVar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Statement,
    Block,
    Loop,
    Function,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    tracked: Vec<BoundVar>,
}

/// An index identifying a still-open frame. Only valid against the [`Life`]
/// that produced it via [`Life::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameId(usize);

/// A stack of nested life frames for one function body currently being
/// lowered.
#[derive(Debug, Default)]
pub struct Life {
    frames: Vec<Frame>,
}

impl Life {
    #[must_use]
    pub fn new() -> Self {
        Life { frames: Vec::new() }
    }

    /// Opens a new frame, returning its id for later [`Life::release_vars`]
    /// / [`Life::pop`] calls.
    pub fn push(&mut self, kind: FrameKind) -> FrameId {
        self.frames.push(Frame {
            kind,
            tracked: Vec::new(),
        });
        FrameId(self.frames.len() - 1)
    }

    /// Closes the innermost frame, returning its kind. Callers must have
    /// already emitted releases for it via [`Life::release_vars`].
    ///
    /// # Panics
    /// Panics if no frame is open (tenet internal error: unbalanced push/pop).
    pub fn pop(&mut self) -> FrameKind {
        self.frames
            .pop()
            .unwrap_or_else(|| panic!("tenet internal error: life frame stack underflow"))
            .kind
    }

    /// Tracks a managed value in the innermost currently-open frame.
    ///
    /// # Panics
    /// Panics if no frame is open.
    pub fn track(&mut self, var: BoundVar) {
        self.frames
            .last_mut()
            .unwrap_or_else(|| panic!("tenet internal error: tracked a value with no life frame open"))
            .tracked
            .push(var);
    }

    #[must_use]
    pub fn current_kind(&self) -> Option<FrameKind> {
        self.frames.last().map(|f| f.kind)
    }

    /// The id of the innermost open `Loop` frame, for `break`/`continue`
    /// release targets.
    #[must_use]
    pub fn innermost_loop(&self) -> Option<FrameId> {
        self.frames
            .iter()
            .enumerate()
            .rev()
            .find(|(_, f)| f.kind == FrameKind::Loop)
            .map(|(i, _)| FrameId(i))
    }

    /// The id of the enclosing `Function` frame, for `return` release
    /// targets.
    #[must_use]
    pub fn enclosing_function(&self) -> Option<FrameId> {
        self.frames
            .iter()
            .enumerate()
            .rev()
            .find(|(_, f)| f.kind == FrameKind::Function)
            .map(|(i, _)| FrameId(i))
    }

    /// Every managed value tracked in frames from the innermost open frame
    /// down to (and including) `up_to`, ordered so the most recently created
    /// value is released first (spec.md §4.9's "in reverse order"): innermost
    /// frame first, each frame's own tracked list reversed.
    #[must_use]
    pub fn release_vars(&self, up_to: FrameId) -> Vec<BoundVar> {
        let mut out = Vec::new();
        for frame in self.frames[up_to.0..].iter().rev() {
            out.extend(frame.tracked.iter().rev().cloned());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenet_types::bound::{IrLayoutHandle, IrTypeHandle, IrValueHandle};
    use tenet_types::{BoundType, Pool};

    fn dummy_var(pool: &mut Pool, id: u32) -> BoundVar {
        let loc = tenet_ir::Located::new(
            tenet_ir::SourceFile::new("t.tn"),
            tenet_ir::Span::new(1, 1),
        );
        let term = pool.intern_id(tenet_ir::intern("SomeManaged"), loc.clone());
        BoundVar {
            name: tenet_ir::intern("v"),
            bound_type: BoundType {
                term,
                ir_type: IrTypeHandle(id),
                ir_layout: IrLayoutHandle(id),
                loc,
            },
            ir_value: IrValueHandle(id),
            id,
            is_global: false,
        }
    }

    #[test]
    fn release_coverage_emits_one_release_per_tracked_value() {
        let mut pool = Pool::new();
        let mut life = Life::new();
        let block = life.push(FrameKind::Block);
        life.track(dummy_var(&mut pool, 1));
        life.track(dummy_var(&mut pool, 2));
        let released = life.release_vars(block);
        assert_eq!(released.len(), 2);
        // Reverse-of-creation order.
        assert_eq!(released[0].id, 2);
        assert_eq!(released[1].id, 1);
    }

    #[test]
    fn release_vars_spans_nested_frames_down_to_target() {
        let mut pool = Pool::new();
        let mut life = Life::new();
        let function = life.push(FrameKind::Function);
        life.track(dummy_var(&mut pool, 1));
        let _block = life.push(FrameKind::Block);
        life.track(dummy_var(&mut pool, 2));

        let released = life.release_vars(function);
        assert_eq!(released.len(), 2);
        assert_eq!(released[0].id, 2);
        assert_eq!(released[1].id, 1);
    }

    #[test]
    fn innermost_loop_is_found_through_nested_blocks() {
        let mut life = Life::new();
        life.push(FrameKind::Function);
        let loop_id = life.push(FrameKind::Loop);
        life.push(FrameKind::Block);
        assert_eq!(life.innermost_loop(), Some(loop_id));
    }

    #[test]
    fn no_loop_means_break_target_is_absent() {
        let mut life = Life::new();
        life.push(FrameKind::Function);
        life.push(FrameKind::Block);
        assert_eq!(life.innermost_loop(), None);
    }
}
