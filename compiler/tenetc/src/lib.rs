//! Driver crate wiring `tenet_typeck`'s checker to a concrete [`Lowerer`]:
//! parse → scope setup → type check → emit.
//!
//! Lexing and parsing a source file into an AST are handled upstream of this
//! crate: [`pipeline::compile_program`] takes an already-parsed
//! `&[tenet_ir::ast::Module]` rather than source text, the same shape the
//! end-to-end checker tests in `tenet_typeck`/`tenet_llvm` drive by hand.
//!
//! [`Lowerer`]: tenet_typeck::Lowerer

pub mod config;
pub mod pipeline;
pub mod tracing_setup;

pub use config::CompileOptions;
pub use pipeline::compile_program;
