//! Lifetime tracking for managed values: life frames and release-call
//! insertion (spec.md §3.6, §4.9).

pub mod life;
pub mod release;

pub use life::{FrameId, FrameKind, Life};
pub use release::{release_vars, ReleaseEmitter};
