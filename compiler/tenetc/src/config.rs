//! Compilation options threaded through [`crate::pipeline::compile_program`]:
//! plain data gathered up front rather than read ad hoc mid-pipeline.

/// Options for one compilation run. `gc_strategy` is the only setting the
/// checker itself reads (stamped as the GC strategy on every emitted
/// function); `target_triple`/`emit_debug_info` are passthrough, read by the
/// LLVM backend once a module is ready to finalize.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// LLVM GC strategy name stamped on every emitted function.
    pub gc_strategy: String,
    /// Target triple passed straight through to the backend, e.g.
    /// `"x86_64-unknown-linux-gnu"`. `None` means "host target".
    pub target_triple: Option<String>,
    /// Whether the backend should emit DWARF/CodeView debug info.
    pub emit_debug_info: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            gc_strategy: "tenet-gc".to_owned(),
            target_triple: None,
            emit_debug_info: false,
        }
    }
}
