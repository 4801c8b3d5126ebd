//! First pass over a parsed program: creates one `ModuleScope` per module and
//! registers every type declaration, function, and link statement as an
//! unchecked entry (spec.md §4.6).

use rustc_hash::FxHashMap;
use tenet_diagnostic::DiagnosticQueue;
use tenet_ir::ast;
use tenet_ir::Atom;
use tenet_types::bound::IrModuleHandle;
use tenet_types::Pool;

use crate::scope::ScopeRef;
use crate::unchecked::{UncheckedType, UncheckedVar, UncheckedVarNode};

/// Walks every module in `program` once, registering scopes and unchecked
/// entries. Never reports errors itself (redefinition is caught later, when
/// the unchecked entry is actually resolved) — it mirrors
/// `original_source`'s scope-setup pass, which is a pure bookkeeping walk.
pub fn setup_program(program_scope: &ScopeRef, modules: &[ast::Module], pool: &mut Pool) -> DiagnosticQueue {
    let diagnostics = DiagnosticQueue::new();
    let mut module_scopes = FxHashMap::default();

    for (i, module) in modules.iter().enumerate() {
        let ir_module = IrModuleHandle(u32::try_from(i).expect("tenet internal error: too many modules"));
        let module_scope = ScopeRef::new_module(program_scope, module.name, ir_module);
        module_scopes.insert(module.name, module_scope);
    }

    for module in modules {
        let module_scope = module_scopes
            .get(&module.name)
            .expect("tenet internal error: module scope not created during its own setup pass")
            .clone();
        setup_module(&module_scope, module, pool);
    }

    diagnostics
}

fn fqn(module_name: Atom, name: Atom) -> Atom {
    tenet_ir::intern(&format!("{}.{}", module_name.text(), name.text()))
}

fn setup_module(module_scope: &ScopeRef, module: &ast::Module, pool: &mut Pool) {
    for type_decl in &module.types {
        let unchecked = UncheckedType {
            fqn: fqn(module.name, type_decl.name()),
            node: type_decl.clone(),
            owning_module: module_scope.clone(),
        };
        module_scope.put_unchecked_type(unchecked);

        // A `polymorph` variant with fields is itself a data constructor;
        // register it as an unchecked var up front so call sites can find it
        // before the owning type has been checked (spec.md §4.8).
        if let ast::TypeDecl::Polymorph { name, variants, .. } = type_decl {
            for variant in variants {
                if variant.fields.is_empty() {
                    continue;
                }
                let ctor_name = variant.name;
                module_scope.put_unchecked_variable(UncheckedVar {
                    fqn: fqn(module.name, ctor_name),
                    node: UncheckedVarNode::Ctor {
                        variant: variant.clone(),
                        owner_type: *name,
                    },
                    owning_module: module_scope.clone(),
                    ctor_signature: None,
                    native: false,
                    type_info: None,
                });
            }
        }
    }

    for function in &module.functions {
        module_scope.put_unchecked_variable(UncheckedVar {
            fqn: fqn(module.name, function.name),
            node: UncheckedVarNode::Function(function.clone()),
            owning_module: module_scope.clone(),
            ctor_signature: None,
            native: false,
            type_info: None,
        });
    }

    for link in &module.links {
        module_scope.put_unchecked_variable(UncheckedVar {
            fqn: fqn(module.name, link.name),
            node: UncheckedVarNode::Link(link.clone()),
            owning_module: module_scope.clone(),
            ctor_signature: None,
            native: true,
            type_info: None,
        });
    }

    let _ = pool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenet_ir::{Located, SourceFile, Span};

    fn loc() -> Located {
        Located::new(SourceFile::new("t.tn"), Span::new(1, 1))
    }

    fn empty_module(name: &str) -> ast::Module {
        ast::Module {
            name: tenet_ir::intern(name),
            types: Vec::new(),
            functions: Vec::new(),
            vars: Vec::new(),
            links: Vec::new(),
            span: loc(),
        }
    }

    #[test]
    fn each_module_gets_its_own_scope() {
        let mut pool = Pool::new();
        let program = ScopeRef::new_program();
        let modules = vec![empty_module("runtime"), empty_module("app")];
        let diagnostics = setup_program(&program, &modules, &mut pool);
        assert!(!diagnostics.has_errors());
        assert!(program.lookup_module(tenet_ir::intern("runtime")).is_some());
        assert!(program.lookup_module(tenet_ir::intern("app")).is_some());
    }

    #[test]
    fn function_declarations_become_unchecked_vars() {
        let mut pool = Pool::new();
        let program = ScopeRef::new_program();
        let mut module = empty_module("app");
        module.functions.push(ast::FunctionDecl {
            name: tenet_ir::intern("main"),
            generics: Vec::new(),
            decl: ast::FunctionSig {
                params: Vec::new(),
                return_type: None,
                span: loc(),
            },
            block: ast::Block {
                statements: Vec::new(),
                span: loc(),
            },
            span: loc(),
        });
        setup_program(&program, std::slice::from_ref(&module), &mut pool);
        let found = program.lookup_unchecked_vars(tenet_ir::intern("app.main"));
        assert_eq!(found.len(), 1);
    }
}
