//! Drives one compilation end to end: `scope_setup` → register types →
//! check functions/module vars → emit. This is the single entry point every
//! front-end (a parser, a test harness) calls once it has an `ast::Module`
//! tree in hand.

use tenet_arc::life::Life;
use tenet_diagnostic::{Diagnostic, DiagnosticQueue};
use tenet_ir::ast;
use tenet_types::Pool;

use tenet_typeck::checker::Checker;
use tenet_typeck::scope::ScopeRef;
use tenet_typeck::scope_setup::setup_program;
use tenet_typeck::Lowerer;

use crate::config::CompileOptions;

/// Checks and lowers `modules` through `lowerer`, in
/// `scope_setup(program) → type_check_module_types → ... → emit` order.
///
/// Every module must already be declared on `lowerer` (`Lowerer::declare_module`,
/// one call per module, in `modules`' order) before this is called —
/// `setup_program` assigns `IrModuleHandle`s purely by each module's position
/// in `modules`, so the lowerer's own module table has to line up with it.
#[tracing::instrument(level = "debug", skip_all, fields(modules = modules.len()))]
pub fn compile_program<L: Lowerer>(modules: &[ast::Module], lowerer: &mut L, options: &CompileOptions) -> Result<DiagnosticQueue, Diagnostic> {
    let mut pool = Pool::new();
    let program = ScopeRef::new_program();
    let mut diagnostics = setup_program(&program, modules, &mut pool);

    let mut life = Life::new();
    let mut checker = Checker::new(&mut pool, lowerer, &mut diagnostics, &mut life, options.gc_strategy.clone());

    let type_errors = checker.register_all_types(&program);
    if type_errors.has_errors() {
        let count = type_errors.len();
        for diagnostic in type_errors.iter() {
            diagnostics.push(diagnostic.clone());
        }
        tracing::warn!(count, "type registration reported errors");
        return Ok(diagnostics);
    }

    checker.check_program(&program, modules)?;
    tracing::debug!(count = diagnostics.len(), "compilation finished");
    Ok(diagnostics)
}
