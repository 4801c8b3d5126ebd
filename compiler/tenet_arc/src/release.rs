//! Emitting the actual release calls a [`crate::life::Life`] says are owed.
//!
//! The lowering backend (`tenet_llvm`) is the only thing that knows how to
//! build an IR call instruction, so this module only defines the seam:
//! [`ReleaseEmitter`] is implemented by the backend, and [`release_vars`]
//! drives it from a [`crate::life::Life`] query.

use crate::life::{FrameId, Life};
use tenet_types::BoundVar;

/// Implemented by the lowering backend to emit one runtime release call for
/// a managed value going out of scope.
pub trait ReleaseEmitter {
    fn emit_release(&mut self, var: &BoundVar);
}

/// Releases every managed value tracked from the innermost open frame down
/// to (and including) `up_to`, in the order [`Life::release_vars`] returns
/// (spec.md §3.6/§4.9). Does not pop any frame — callers pop separately once
/// they've decided the frame is actually exiting (vs. e.g. querying the
/// release list for an early `return` while the block frame stays open for
/// diagnostics purposes).
pub fn release_vars(life: &Life, up_to: FrameId, emitter: &mut impl ReleaseEmitter) {
    for var in life.release_vars(up_to) {
        emitter.emit_release(&var);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::life::FrameKind;
    use tenet_types::bound::{IrLayoutHandle, IrTypeHandle, IrValueHandle};
    use tenet_types::{BoundType, Pool};

    struct RecordingEmitter {
        released_ids: Vec<u32>,
    }

    impl ReleaseEmitter for RecordingEmitter {
        fn emit_release(&mut self, var: &BoundVar) {
            self.released_ids.push(var.id);
        }
    }

    fn dummy_var(pool: &mut Pool, id: u32) -> BoundVar {
        let loc = tenet_ir::Located::new(tenet_ir::SourceFile::new("t.tn"), tenet_ir::Span::new(1, 1));
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
    fn release_vars_emits_exactly_one_call_per_tracked_value() {
        let mut pool = Pool::new();
        let mut life = Life::new();
        let block = life.push(FrameKind::Block);
        life.track(dummy_var(&mut pool, 1));
        life.track(dummy_var(&mut pool, 2));

        let mut emitter = RecordingEmitter {
            released_ids: Vec::new(),
        };
        release_vars(&life, block, &mut emitter);
        assert_eq!(emitter.released_ids, vec![2, 1]);
    }
}
