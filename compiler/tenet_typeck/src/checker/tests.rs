//! End-to-end checker tests: a small hand-built `ast::Module` tree driven
//! through `Checker::check_program`/`check_all_functions`/
//! `check_all_module_vars` against a no-op mock [`Lowerer`].

use tenet_arc::life::Life;
use tenet_arc::ReleaseEmitter;
use tenet_diagnostic::{ControlFlowErrorKind, DiagnosticQueue, ErrorKind, TypeErrorKind};
use tenet_ir::ast::{self, BinOp};
use tenet_ir::{Located, SourceFile, Span};
use tenet_types::bound::{IrBlockHandle, IrFunctionHandle, IrLayoutHandle, IrModuleHandle, IrTypeHandle, IrValueHandle};
use tenet_types::{BoundVar, Pool};

use crate::lower::{Lowerer, MaterializedField, MaterializedType};
use crate::scope::ScopeRef;
use crate::scope_setup::setup_program;

use super::Checker;

fn loc() -> Located {
    Located::new(SourceFile::new("t.tn"), Span::new(1, 1))
}

/// A bookkeeping-only `Lowerer`: every handle is a fresh counter value and
/// every `emit_*` is a no-op. Good enough to drive the checker through a
/// whole program without a real backend.
struct MockLowerer {
    next: u32,
    current: IrBlockHandle,
    released: Vec<tenet_ir::Atom>,
}

impl MockLowerer {
    fn new() -> Self {
        MockLowerer {
            next: 0,
            current: IrBlockHandle(0),
            released: Vec::new(),
        }
    }

    fn next_u32(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    fn mat(&mut self) -> MaterializedType {
        let n = self.next_u32();
        MaterializedType {
            ir_type: IrTypeHandle(n),
            ir_layout: IrLayoutHandle(n),
        }
    }
}

impl ReleaseEmitter for MockLowerer {
    fn emit_release(&mut self, var: &BoundVar) {
        self.released.push(var.name);
    }
}

impl Lowerer for MockLowerer {
    fn declare_module(&mut self, _name: &str) -> IrModuleHandle {
        IrModuleHandle(self.next_u32())
    }

    fn begin_function(&mut self, _module: IrModuleHandle, _name: &str, _sig: IrTypeHandle, _gc_strategy: &str) -> IrFunctionHandle {
        IrFunctionHandle(self.next_u32())
    }

    fn declare_extern_function(&mut self, _module: IrModuleHandle, _extern_name: &str, _sig: IrTypeHandle) -> IrFunctionHandle {
        IrFunctionHandle(self.next_u32())
    }

    fn function_param(&mut self, _function: IrFunctionHandle, index: u32) -> IrValueHandle {
        IrValueHandle(10_000 + index)
    }

    fn new_block(&mut self, _function: IrFunctionHandle, _label: &str) -> IrBlockHandle {
        IrBlockHandle(self.next_u32())
    }

    fn set_insert_block(&mut self, block: IrBlockHandle) {
        self.current = block;
    }

    fn current_block(&self) -> IrBlockHandle {
        self.current
    }

    fn declare_global(&mut self, _module: IrModuleHandle, _name: &str, _ty: IrTypeHandle) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn materialize_struct(&mut self, _name: &str, _fields: &[MaterializedField], _managed: bool) -> MaterializedType {
        self.mat()
    }

    fn materialize_function_type(&mut self, _ctx: IrTypeHandle, _args: &[IrTypeHandle], _ret: IrTypeHandle) -> MaterializedType {
        self.mat()
    }

    fn materialize_ptr(&mut self, _inner: IrTypeHandle) -> MaterializedType {
        self.mat()
    }

    fn materialize_sum(&mut self) -> MaterializedType {
        self.mat()
    }

    fn materialize_primitive(&mut self, _name: &str) -> MaterializedType {
        self.mat()
    }

    fn materialize_type_info(&mut self, _signature: &str, _size_bytes: u32, _mark_fn: Option<&str>, _finalize_fn: Option<&str>) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn materialize_tag_singleton(&mut self, _name: &str, _type_info: IrValueHandle) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_managed_alloc(&mut self, _ty: IrTypeHandle, _type_info: IrValueHandle) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_int_const(&mut self, _value: i128, _width: u32, _signed: bool) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_float_const(&mut self, _value: f64) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_str_const(&mut self, _text: &str) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_null(&mut self, _ty: IrTypeHandle) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_bool_const(&mut self, _value: bool) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_call(&mut self, _callee: IrValueHandle, _args: &[IrValueHandle]) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_int_binop(&mut self, _op: BinOp, _lhs: IrValueHandle, _rhs: IrValueHandle, _width: u32, _signed: bool) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_int_cast(&mut self, _value: IrValueHandle, _from_width: u32, _to_width: u32, _signed: bool) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_ptr_cast(&mut self, _value: IrValueHandle, _to: IrTypeHandle) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_alloca(&mut self, _ty: IrTypeHandle) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_load(&mut self, _ptr: IrValueHandle) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_store(&mut self, _ptr: IrValueHandle, _value: IrValueHandle) {}

    fn emit_gep(&mut self, _base: IrValueHandle, _field_index: u32, _managed: bool) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_index_gep(&mut self, _base: IrValueHandle, _index: IrValueHandle) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_is_null(&mut self, _value: IrValueHandle) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_typeid_call(&mut self, _managed_ptr: IrValueHandle) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_assert_failure_call(&mut self, _message: &str) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_ptr_binop(&mut self, _op: BinOp, _lhs: IrValueHandle, _rhs: IrValueHandle) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_sizeof_const(&mut self, _ty: IrTypeHandle) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_branch(&mut self, _cond: IrValueHandle, _then_block: IrBlockHandle, _else_block: IrBlockHandle) {}

    fn emit_jump(&mut self, _target: IrBlockHandle) {}

    fn emit_phi(&mut self, _ty: IrTypeHandle, _incoming: &[(IrValueHandle, IrBlockHandle)]) -> IrValueHandle {
        IrValueHandle(self.next_u32())
    }

    fn emit_return(&mut self, _value: Option<IrValueHandle>) {}
}

fn int32_texpr() -> ast::TypeExpr {
    ast::TypeExpr::Id(tenet_ir::intern("int32"), loc())
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

fn int_literal(value: i128) -> ast::Expr {
    ast::Expr::Literal(ast::Literal::Int { value, radix: 10, boxed: false }, loc())
}

/// Wires up a fresh `Checker` plus the program/module scopes `setup_program`
/// builds for `modules`, ready to drive `check_program` or its pieces.
fn harness(modules: &[ast::Module]) -> (Pool, ScopeRef, MockLowerer, DiagnosticQueue, Life) {
    let mut pool = Pool::new();
    let program = ScopeRef::new_program();
    setup_program(&program, modules, &mut pool);
    (pool, program, MockLowerer::new(), DiagnosticQueue::new(), Life::new())
}

#[test]
fn checks_a_simple_function_that_returns_on_every_path() {
    let mut module = empty_module("app");
    module.functions.push(ast::FunctionDecl {
        name: tenet_ir::intern("main"),
        generics: Vec::new(),
        decl: ast::FunctionSig {
            params: Vec::new(),
            return_type: Some(int32_texpr()),
            span: loc(),
        },
        block: ast::Block {
            statements: vec![ast::Stmt::Return(Some(int_literal(0)), loc())],
            span: loc(),
        },
        span: loc(),
    });

    let (mut pool, program, mut lowerer, mut diagnostics, mut life) = harness(std::slice::from_ref(&module));
    let mut checker = Checker::new(&mut pool, &mut lowerer, &mut diagnostics, &mut life, "tenet-gc");

    checker.check_all_functions(&program).expect("a function that returns on every path should check cleanly");

    let bound = program.lookup_global_callables(tenet_ir::intern("main"));
    assert_eq!(bound.len(), 1);
    assert!(bound[0].is_global);
}

#[test]
fn a_non_void_function_that_falls_off_the_end_is_rejected() {
    let mut module = empty_module("app");
    module.functions.push(ast::FunctionDecl {
        name: tenet_ir::intern("broken"),
        generics: Vec::new(),
        decl: ast::FunctionSig {
            params: Vec::new(),
            return_type: Some(int32_texpr()),
            span: loc(),
        },
        block: ast::Block { statements: Vec::new(), span: loc() },
        span: loc(),
    });

    let (mut pool, program, mut lowerer, mut diagnostics, mut life) = harness(std::slice::from_ref(&module));
    let mut checker = Checker::new(&mut pool, &mut lowerer, &mut diagnostics, &mut life, "tenet-gc");

    let err = checker.check_all_functions(&program).expect_err("a non-void function with no return should be rejected");
    assert!(matches!(err.kind, ErrorKind::ControlFlow(ControlFlowErrorKind::NotAllPathsReturn { .. })));
}

#[test]
fn break_outside_a_loop_is_rejected() {
    let mut module = empty_module("app");
    module.functions.push(ast::FunctionDecl {
        name: tenet_ir::intern("wild_break"),
        generics: Vec::new(),
        decl: ast::FunctionSig {
            params: Vec::new(),
            return_type: None,
            span: loc(),
        },
        block: ast::Block {
            statements: vec![ast::Stmt::Break(loc())],
            span: loc(),
        },
        span: loc(),
    });

    let (mut pool, program, mut lowerer, mut diagnostics, mut life) = harness(std::slice::from_ref(&module));
    let mut checker = Checker::new(&mut pool, &mut lowerer, &mut diagnostics, &mut life, "tenet-gc");

    let err = checker.check_all_functions(&program).expect_err("'break' outside a loop should be rejected");
    assert!(matches!(err.kind, ErrorKind::ControlFlow(ControlFlowErrorKind::BreakOutsideLoop)));
}

#[test]
fn a_link_declaration_is_bound_without_a_body() {
    let mut module = empty_module("app");
    module.links.push(ast::LinkDecl {
        name: tenet_ir::intern("native_add"),
        extern_name: tenet_ir::intern("tenet_native_add"),
        decl: ast::FunctionSig {
            params: vec![
                ast::Param { name: tenet_ir::intern("a"), ty: int32_texpr(), span: loc() },
                ast::Param { name: tenet_ir::intern("b"), ty: int32_texpr(), span: loc() },
            ],
            return_type: Some(int32_texpr()),
            span: loc(),
        },
        span: loc(),
    });

    let (mut pool, program, mut lowerer, mut diagnostics, mut life) = harness(std::slice::from_ref(&module));
    let mut checker = Checker::new(&mut pool, &mut lowerer, &mut diagnostics, &mut life, "tenet-gc");

    checker.check_all_functions(&program).expect("a link declaration needs no body to check");

    let bound = program.lookup_global_callables(tenet_ir::intern("native_add"));
    assert_eq!(bound.len(), 1);
}

#[test]
fn a_module_var_with_a_literal_initializer_becomes_a_global() {
    let mut module = empty_module("app");
    module.vars.push(ast::VarDecl {
        name: tenet_ir::intern("counter"),
        ty: None,
        initializer: Some(int_literal(0)),
        mutable: true,
        span: loc(),
    });

    let (mut pool, program, mut lowerer, mut diagnostics, mut life) = harness(std::slice::from_ref(&module));
    let mut checker = Checker::new(&mut pool, &mut lowerer, &mut diagnostics, &mut life, "tenet-gc");

    checker
        .check_all_module_vars(&program, std::slice::from_ref(&module))
        .expect("a module var with a literal initializer should check cleanly");

    let module_scope = program.lookup_module(tenet_ir::intern("app")).expect("module scope registered by setup_program");
    let vars: Vec<_> = module_scope.all_bound_vars();
    let counter = vars.iter().find(|v| v.name.text() == "counter").expect("counter registered as a module-level global");
    assert!(counter.is_global);
}

#[test]
fn a_module_var_with_no_initializer_and_no_declared_type_is_rejected() {
    let mut module = empty_module("app");
    module.vars.push(ast::VarDecl {
        name: tenet_ir::intern("mystery"),
        ty: None,
        initializer: None,
        mutable: true,
        span: loc(),
    });

    let (mut pool, program, mut lowerer, mut diagnostics, mut life) = harness(std::slice::from_ref(&module));
    let mut checker = Checker::new(&mut pool, &mut lowerer, &mut diagnostics, &mut life, "tenet-gc");

    let err = checker
        .check_all_module_vars(&program, std::slice::from_ref(&module))
        .expect_err("a var with neither a declared type nor an initializer should be rejected");
    assert!(matches!(err.kind, ErrorKind::Type(TypeErrorKind::MissingInitializer { .. })));
}

#[test]
fn check_program_drives_functions_and_module_vars_together() {
    let mut module = empty_module("app");
    module.vars.push(ast::VarDecl {
        name: tenet_ir::intern("zero"),
        ty: None,
        initializer: Some(int_literal(0)),
        mutable: false,
        span: loc(),
    });
    module.functions.push(ast::FunctionDecl {
        name: tenet_ir::intern("main"),
        generics: Vec::new(),
        decl: ast::FunctionSig { params: Vec::new(), return_type: None, span: loc() },
        block: ast::Block { statements: Vec::new(), span: loc() },
        span: loc(),
    });

    let (mut pool, program, mut lowerer, mut diagnostics, mut life) = harness(std::slice::from_ref(&module));
    let mut checker = Checker::new(&mut pool, &mut lowerer, &mut diagnostics, &mut life, "tenet-gc");

    checker.check_program(&program, std::slice::from_ref(&module)).expect("a trivial program should check end to end");

    assert!(program.init_module_vars_fn().is_some());
    assert!(program.visit_module_vars_fn().is_some());
    assert_eq!(program.lookup_global_callables(tenet_ir::intern("main")).len(), 1);
}
