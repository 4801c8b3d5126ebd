//! End-to-end lowering tests: a hand-built `ast::Module` tree driven through
//! `Checker::check_program`/`register_all_types` against a real
//! [`LlvmLowerer`], asserting on the printed IR text. Each test demonstrates
//! one of the checker's cross-cutting behaviors that only shows up once a
//! real backend (as opposed to `tenet_typeck`'s no-op mock) is lowering
//! through it: generic monomorphization, `Maybe` unboxing, integer
//! promotion, nullary-tag dispatch, module initializer ordering, and
//! assertion expansion.

use inkwell::context::Context;

use tenet_arc::life::Life;
use tenet_diagnostic::DiagnosticQueue;
use tenet_ir::ast::{self, BinOp};
use tenet_ir::{Located, SourceFile, Span};
use tenet_types::Pool;

use tenet_typeck::checker::Checker;
use tenet_typeck::lower::Lowerer;
use tenet_typeck::scope::ScopeRef;
use tenet_typeck::scope_setup::setup_program;

use crate::context::LlvmLowerer;

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

fn id_texpr(name: &str) -> ast::TypeExpr {
    ast::TypeExpr::Id(tenet_ir::intern(name), loc())
}

fn int_literal(value: i128) -> ast::Expr {
    ast::Expr::Literal(ast::Literal::Int { value, radix: 10, boxed: false }, loc())
}

fn param(name: &str, ty: ast::TypeExpr) -> ast::Param {
    ast::Param { name: tenet_ir::intern(name), ty, span: loc() }
}

fn sig(params: Vec<ast::Param>, return_type: Option<ast::TypeExpr>) -> ast::FunctionSig {
    ast::FunctionSig { params, return_type, span: loc() }
}

fn func(name: &str, generics: Vec<&str>, decl: ast::FunctionSig, statements: Vec<ast::Stmt>) -> ast::FunctionDecl {
    ast::FunctionDecl {
        name: tenet_ir::intern(name),
        generics: generics.into_iter().map(tenet_ir::intern).collect(),
        decl,
        block: ast::Block { statements, span: loc() },
        span: loc(),
    }
}

/// Wires up a fresh `Checker` over a real `LlvmLowerer` for `modules`.
/// `setup_program` assigns `IrModuleHandle`s purely by each module's
/// position in `modules` — it never calls `declare_module` itself — so the
/// lowerer's own modules must be declared first, in the same order, or the
/// handles `setup_program` hands out won't resolve to anything.
fn harness<'ctx>(context: &'ctx Context, modules: &[ast::Module]) -> (Pool, ScopeRef, LlvmLowerer<'ctx>, DiagnosticQueue, Life) {
    let mut lowerer = LlvmLowerer::new(context);
    for module in modules {
        lowerer.declare_module(module.name.text());
    }
    let mut pool = Pool::new();
    let program = ScopeRef::new_program();
    setup_program(&program, modules, &mut pool);
    (pool, program, lowerer, DiagnosticQueue::new(), Life::new())
}

/// Scenario: a generic identity function called with a native `int32`
/// argument monomorphizes to a dedicated `app.id$int32` function rather than
/// being emitted once and dispatched dynamically.
#[test]
fn identity_generic_monomorphizes_per_call_site_type() {
    let mut module = empty_module("app");
    module.functions.push(func(
        "id",
        vec!["a"],
        sig(vec![param("x", id_texpr("a"))], Some(id_texpr("a"))),
        vec![ast::Stmt::Return(Some(ast::Expr::Reference(tenet_ir::intern("x"), loc())), loc())],
    ));
    module.functions.push(func(
        "main",
        vec![],
        sig(Vec::new(), Some(id_texpr("int32"))),
        vec![ast::Stmt::Return(
            Some(ast::Expr::Call(
                Box::new(ast::Expr::Reference(tenet_ir::intern("id"), loc())),
                vec![int_literal(0)],
                loc(),
            )),
            loc(),
        )],
    ));

    let context = Context::create();
    let (mut pool, program, mut lowerer, mut diagnostics, mut life) = harness(&context, std::slice::from_ref(&module));
    let mut checker = Checker::new(&mut pool, &mut lowerer, &mut diagnostics, &mut life, "tenet-gc");
    checker.register_all_types(&program);
    checker.check_all_functions(&program).expect("identity generic instantiated at an int32 call site should check cleanly");

    let ir = lowerer.modules()[0].print_to_string().to_string();
    assert!(ir.contains("app.id$int32"), "expected a monomorphized id$int32 function, got:\n{ir}");
    assert!(ir.contains("app.main"), "expected the caller to be emitted too, got:\n{ir}");
}

/// Scenario: branching on a bare `Maybe(T)`-typed reference compiles to a
/// null compare, and the truthy arm rebinds the same name to its unboxed
/// `T` — no separate unbox/load instruction, since `Maybe(T)` and `T` share
/// one materialized representation.
#[test]
fn bare_maybe_reference_condition_unboxes_in_the_truthy_arm() {
    let mut module = empty_module("app");
    module.functions.push(func(
        "pick",
        vec![],
        sig(vec![param("m", ast::TypeExpr::Maybe(Box::new(id_texpr("int32")), loc()))], Some(id_texpr("int32"))),
        vec![ast::Stmt::If {
            cond: ast::Expr::Reference(tenet_ir::intern("m"), loc()),
            then_block: ast::Block {
                statements: vec![ast::Stmt::Return(Some(ast::Expr::Reference(tenet_ir::intern("m"), loc())), loc())],
                span: loc(),
            },
            elif_arms: Vec::new(),
            else_block: Some(ast::Block {
                statements: vec![ast::Stmt::Return(Some(int_literal(0)), loc())],
                span: loc(),
            }),
            span: loc(),
        }],
    ));

    let context = Context::create();
    let (mut pool, program, mut lowerer, mut diagnostics, mut life) = harness(&context, std::slice::from_ref(&module));
    let mut checker = Checker::new(&mut pool, &mut lowerer, &mut diagnostics, &mut life, "tenet-gc");
    checker.check_all_functions(&program).expect("a bare Maybe reference condition should check cleanly");

    let ir = lowerer.modules()[0].print_to_string().to_string();
    assert!(ir.contains("is_null"), "expected a null compare for the Maybe condition, got:\n{ir}");
    assert!(ir.contains("xor"), "expected the is-null result inverted into a truthy flag, got:\n{ir}");
}

/// Scenario: adding an `int32` value to one explicitly cast to `int64`
/// widens the narrower operand (a sign-extend, since both sides are
/// signed) and types the result `int64`.
#[test]
fn mixed_width_integer_addition_widens_to_the_wider_signed_type() {
    let mut module = empty_module("app");
    module.functions.push(func(
        "widen",
        vec![],
        sig(Vec::new(), Some(id_texpr("int64"))),
        vec![ast::Stmt::Return(
            Some(ast::Expr::Binary(
                BinOp::Add,
                Box::new(ast::Expr::Cast(Box::new(int_literal(1)), id_texpr("int64"), loc())),
                Box::new(int_literal(2)),
                loc(),
            )),
            loc(),
        )],
    ));

    let context = Context::create();
    let (mut pool, program, mut lowerer, mut diagnostics, mut life) = harness(&context, std::slice::from_ref(&module));
    let mut checker = Checker::new(&mut pool, &mut lowerer, &mut diagnostics, &mut life, "tenet-gc");
    checker.check_all_functions(&program).expect("mixed-width integer addition should check cleanly");

    let ir = lowerer.modules()[0].print_to_string().to_string();
    assert!(ir.contains("sext"), "expected the int32 operand sign-extended to int64, got:\n{ir}");
    assert!(ir.contains("add"), "expected an add over the widened operands, got:\n{ir}");
}

/// Scenario: matching a nullary `polymorph` tag compares the scrutinee
/// against the tag's process-wide singleton pointer directly, rather than
/// querying a runtime type id the way a data-carrying variant would.
#[test]
fn nullary_tag_pattern_dispatches_by_singleton_pointer_equality() {
    let mut module = empty_module("app");
    module.types.push(ast::TypeDecl::Polymorph {
        name: tenet_ir::intern("Color"),
        generics: Vec::new(),
        variants: vec![
            ast::PolymorphVariant { name: tenet_ir::intern("Red"), fields: Vec::new(), span: loc() },
            ast::PolymorphVariant { name: tenet_ir::intern("Blue"), fields: Vec::new(), span: loc() },
        ],
        span: loc(),
    });
    module.functions.push(func(
        "classify",
        vec![],
        sig(vec![param("c", id_texpr("Color"))], Some(id_texpr("int32"))),
        vec![ast::Stmt::Match {
            scrutinee: ast::Expr::Reference(tenet_ir::intern("c"), loc()),
            arms: vec![ast::MatchArm {
                pattern: ast::Pattern::Ctor(tenet_ir::intern("Red"), Vec::new(), loc()),
                body: ast::Block {
                    statements: vec![ast::Stmt::Return(Some(int_literal(1)), loc())],
                    span: loc(),
                },
                span: loc(),
            }],
            else_block: Some(ast::Block {
                statements: vec![ast::Stmt::Return(Some(int_literal(0)), loc())],
                span: loc(),
            }),
            span: loc(),
        }],
    ));

    let context = Context::create();
    let (mut pool, program, mut lowerer, mut diagnostics, mut life) = harness(&context, std::slice::from_ref(&module));
    let mut checker = Checker::new(&mut pool, &mut lowerer, &mut diagnostics, &mut life, "tenet-gc");
    checker.register_all_types(&program);
    checker.check_all_functions(&program).expect("a nullary-tag match arm should check cleanly");

    let ir = lowerer.modules()[0].print_to_string().to_string();
    assert!(ir.contains("__tag_app.Red"), "expected a materialized Red tag singleton, got:\n{ir}");
    assert!(!ir.contains("call"), "a nullary-tag match should never need the runtime type-id call, got:\n{ir}");
}

/// Scenario: module-level `var`s across every module are folded into one
/// shared `__init_module_vars` function, with `runtime`'s initializers
/// emitted first regardless of where `runtime` sits in the module list.
#[test]
fn module_initializers_run_runtime_first_regardless_of_declaration_order() {
    let mut app = empty_module("app");
    app.vars.push(ast::VarDecl {
        name: tenet_ir::intern("counter"),
        ty: Some(id_texpr("int32")),
        initializer: Some(int_literal(0)),
        mutable: true,
        span: loc(),
    });
    let mut runtime = empty_module("runtime");
    runtime.vars.push(ast::VarDecl {
        name: tenet_ir::intern("ready"),
        ty: Some(id_texpr("bool")),
        initializer: Some(ast::Expr::Literal(ast::Literal::Bool(true), loc())),
        mutable: false,
        span: loc(),
    });
    let modules = vec![app, runtime];

    let context = Context::create();
    let (mut pool, program, mut lowerer, mut diagnostics, mut life) = harness(&context, &modules);
    let mut checker = Checker::new(&mut pool, &mut lowerer, &mut diagnostics, &mut life, "tenet-gc");
    checker.check_all_module_vars(&program, &modules).expect("module vars across modules should check cleanly");

    let ir = lowerer.modules()[0].print_to_string().to_string();
    assert!(ir.contains("__init_module_vars"), "expected a shared module-initializer function, got:\n{ir}");
    let runtime_pos = ir.find("runtime.ready").expect("runtime.ready should be initialized");
    let app_pos = ir.find("app.counter").expect("app.counter should be initialized");
    assert!(runtime_pos < app_pos, "runtime's initializer should be emitted before app's, got:\n{ir}");
}

/// Scenario: a failing `assert` expands to a conditional branch whose
/// failure arm calls into the runtime's assert-failure hook with a message
/// naming the asserted expression, then falls through to the success path.
#[test]
fn a_failing_assert_expands_to_a_guarded_runtime_call() {
    let mut module = empty_module("app");
    module.functions.push(func(
        "check",
        vec![],
        sig(vec![param("ok", id_texpr("bool"))], None),
        vec![
            ast::Stmt::Assert(ast::Expr::Reference(tenet_ir::intern("ok"), loc()), loc()),
            ast::Stmt::Return(None, loc()),
        ],
    ));

    let context = Context::create();
    let (mut pool, program, mut lowerer, mut diagnostics, mut life) = harness(&context, std::slice::from_ref(&module));
    let mut checker = Checker::new(&mut pool, &mut lowerer, &mut diagnostics, &mut life, "tenet-gc");
    checker.check_all_functions(&program).expect("an assert over a bool parameter should check cleanly");

    let ir = lowerer.modules()[0].print_to_string().to_string();
    assert!(ir.contains("assert.fail"), "expected a dedicated failure block, got:\n{ir}");
    assert!(ir.contains("assert.ok"), "expected a dedicated success block, got:\n{ir}");
    assert!(ir.contains("assertion ok failed"), "expected the message to name the asserted expression, got:\n{ir}");
}
