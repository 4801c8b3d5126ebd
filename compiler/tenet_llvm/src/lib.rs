//! LLVM backend for Tenet.
//!
//! Implements [`tenet_typeck::lower::Lowerer`] and [`tenet_arc::ReleaseEmitter`]
//! on top of `inkwell`, turning the checker's opaque `Ir*Handle`s into real
//! LLVM IR (spec.md §4.5/§4.7/§4.9).
//!
//! # Clippy configuration
//!
//! `inkwell`'s builder API returns `Result`/`Option` for every instruction —
//! these only fail on internal LLVM state corruption, not user input, so
//! `expect`/`unwrap` are allowed crate-wide rather than threaded through
//! `Result` at every call site. See `Cargo.toml`'s `[lints.clippy]` table.
//!
//! # Architecture
//!
//! - [`context`]: the handle arenas ([`LlvmLowerer`]) every other module
//!   indexes into.
//! - [`module`]: one `inkwell::Module` per source module, and the global
//!   slots module-level `var`s lower to.
//! - [`types`]: type materialization — also where `impl Lowerer` lives,
//!   since Rust requires the whole trait implemented in one block.
//! - [`functions`]: function declaration, entry blocks, the ambient
//!   insertion point.
//! - [`control_flow`]: branches, jumps, phi nodes, returns.
//! - [`matching`]: tag singletons, null checks, the runtime type-id query.
//! - [`object_model`]: `type_info_t` records, managed allocation, constants,
//!   and the scalar/pointer operations everything else bottoms out on.
//!
//! # Debugging
//!
//! `RUST_LOG=tenet_llvm=debug` enables tracing output via [`init_tracing`].

mod context;
mod control_flow;
mod functions;
mod matching;
mod module;
mod object_model;
mod types;

#[cfg(test)]
mod tests;

pub use context::LlvmLowerer;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initializes tracing for debug output. Safe to call more than once; only
/// the first call takes effect.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry().with(fmt::layer().with_target(true).with_level(true)).with(filter).init();
        }
    });
}
