//! The nested-scope hierarchy (spec.md §3.5): program, module, function,
//! runnable (block/loop), closure, and generic-substitution scopes, all
//! sharing one parent-linked implementation.

pub mod bound_cache;

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tenet_diagnostic::{Diagnostic, ScopeErrorKind};
use tenet_ir::{Atom, Located};
use tenet_types::bound::{IrBlockHandle, IrFunctionHandle, IrModuleHandle, IrValueHandle};
use tenet_types::{BoundVar, Idx, Pool, Subst, TypeNameEnv};

use crate::unchecked::{UncheckedType, UncheckedVar};
use bound_cache::BoundTypeCache;

/// Per-function/block flow-control state: the enclosing function's
/// return-type constraint and the innermost loop's continue/break targets.
/// `FunctionScope` always sets `return_type`; plain block `RunnableScope`s
/// leave it `None` and inherit by walking to the parent function scope.
#[derive(Debug, Default, Clone)]
pub struct FlowData {
    pub return_type: Option<Idx>,
    pub continue_target: Option<IrBlockHandle>,
    pub break_target: Option<IrBlockHandle>,
}

#[derive(Debug, Default)]
pub struct ProgramData {
    pub modules: FxHashMap<Atom, ScopeRef>,
    pub bound_types: BoundTypeCache,
    pub unchecked_types: Vec<UncheckedType>,
    unchecked_types_by_fqn: FxHashMap<Atom, usize>,
    pub unchecked_vars: Vec<UncheckedVar>,
    unchecked_vars_by_fqn: FxHashMap<Atom, Vec<usize>>,
    checked_nodes: std::collections::HashSet<Atom>,
    pub init_module_vars_fn: Option<IrFunctionHandle>,
    pub visit_module_vars_fn: Option<IrFunctionHandle>,
}

#[derive(Debug)]
pub struct ModuleData {
    pub name: Atom,
    pub ir_module: IrModuleHandle,
    pub unchecked_types: Vec<UncheckedType>,
    unchecked_types_by_name: FxHashMap<Atom, usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ClosureData {
    pub captured: Vec<(Atom, BoundVar)>,
}

#[derive(Debug, Clone)]
pub struct GenericSubstitutionData {
    pub callee_signature: String,
    pub substitution: Subst,
}

pub enum ScopeData {
    Program(ProgramData),
    Module(ModuleData),
    Function(FlowData),
    Runnable(FlowData),
    Closure(ClosureData),
    GenericSubstitution(GenericSubstitutionData),
}

struct ScopeInner {
    parent: Option<ScopeRef>,
    bound_vars: FxHashMap<Atom, FxHashMap<String, BoundVar>>,
    type_env: TypeNameEnv,
    type_variable_bindings: Subst,
    data: ScopeData,
}

/// A cheaply-cloned (`Rc`) handle to one scope in the hierarchy.
#[derive(Clone)]
pub struct ScopeRef(Rc<RefCell<ScopeInner>>);

impl ScopeRef {
    fn new(parent: Option<ScopeRef>, data: ScopeData) -> Self {
        let type_env = parent
            .as_ref()
            .map_or_else(TypeNameEnv::root, |p| p.0.borrow().type_env.child());
        ScopeRef(Rc::new(RefCell::new(ScopeInner {
            parent,
            bound_vars: FxHashMap::default(),
            type_env,
            type_variable_bindings: Subst::default(),
            data,
        })))
    }

    #[must_use]
    pub fn new_program() -> Self {
        ScopeRef::new(None, ScopeData::Program(ProgramData::default()))
    }

    #[must_use]
    pub fn new_module(program: &ScopeRef, name: Atom, ir_module: IrModuleHandle) -> Self {
        let module = ScopeRef::new(
            Some(program.clone()),
            ScopeData::Module(ModuleData {
                name,
                ir_module,
                unchecked_types: Vec::new(),
                unchecked_types_by_name: FxHashMap::default(),
            }),
        );
        program.with_program_data_mut(|p| {
            p.modules.insert(name, module.clone());
        });
        module
    }

    #[must_use]
    pub fn new_function(parent: &ScopeRef, return_type: Option<Idx>) -> Self {
        ScopeRef::new(
            Some(parent.clone()),
            ScopeData::Function(FlowData {
                return_type,
                continue_target: None,
                break_target: None,
            }),
        )
    }

    #[must_use]
    pub fn new_block(parent: &ScopeRef) -> Self {
        ScopeRef::new(Some(parent.clone()), ScopeData::Runnable(FlowData::default()))
    }

    #[must_use]
    pub fn new_loop(parent: &ScopeRef, continue_target: IrBlockHandle, break_target: IrBlockHandle) -> Self {
        ScopeRef::new(
            Some(parent.clone()),
            ScopeData::Runnable(FlowData {
                return_type: None,
                continue_target: Some(continue_target),
                break_target: Some(break_target),
            }),
        )
    }

    #[must_use]
    pub fn new_closure(parent: &ScopeRef, captured: Vec<(Atom, BoundVar)>) -> Self {
        ScopeRef::new(Some(parent.clone()), ScopeData::Closure(ClosureData { captured }))
    }

    #[must_use]
    pub fn new_generic_substitution(
        module_scope: &ScopeRef,
        callee_signature: String,
        substitution: Subst,
    ) -> Self {
        ScopeRef::new(
            Some(module_scope.clone()),
            ScopeData::GenericSubstitution(GenericSubstitutionData {
                callee_signature,
                substitution,
            }),
        )
    }

    /// Walks to the root `ProgramScope`.
    #[must_use]
    pub fn program_root(&self) -> ScopeRef {
        let mut current = self.clone();
        loop {
            let parent = current.0.borrow().parent.clone();
            match parent {
                Some(p) => current = p,
                None => return current,
            }
        }
    }

    /// Walks to the innermost enclosing `ModuleScope`.
    #[must_use]
    pub fn module_scope(&self) -> Option<ScopeRef> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            if matches!(scope.0.borrow().data, ScopeData::Module(_)) {
                return Some(scope);
            }
            current = scope.0.borrow().parent.clone();
        }
        None
    }

    fn with_program_data_mut<R>(&self, f: impl FnOnce(&mut ProgramData) -> R) -> R {
        let program = self.program_root();
        let mut inner = program.0.borrow_mut();
        let ScopeData::Program(ref mut p) = inner.data else {
            unreachable!("tenet internal error: program_root did not return a ProgramScope")
        };
        f(p)
    }

    pub fn with_program_data<R>(&self, f: impl FnOnce(&ProgramData) -> R) -> R {
        let program = self.program_root();
        let inner = program.0.borrow();
        let ScopeData::Program(ref p) = inner.data else {
            unreachable!("tenet internal error: program_root did not return a ProgramScope")
        };
        f(p)
    }

    /// Inserts a bound variable into this scope under `(name, signature)`.
    /// Module-scope insertions are also mirrored into the program scope
    /// under the FQN `module.name` (spec.md §4.4).
    pub fn put_bound_variable(&self, name: Atom, var: BoundVar, pool: &Pool, loc: &Located) -> Result<(), Diagnostic> {
        let signature = var.signature(pool);
        {
            let mut inner = self.0.borrow_mut();
            let by_sig = inner.bound_vars.entry(name).or_default();
            if by_sig.contains_key(&signature) {
                return Err(Diagnostic::error(
                    ScopeErrorKind::Redefinition {
                        name: name.text().to_owned(),
                    },
                    loc.clone(),
                ));
            }
            by_sig.insert(signature, var.clone());
        }
        let is_module = matches!(self.0.borrow().data, ScopeData::Module(_));
        if is_module {
            let fqn = self.fqn_name(name);
            let program = self.program_root();
            let mut inner = program.0.borrow_mut();
            let by_sig = inner.bound_vars.entry(fqn).or_default();
            by_sig.entry(var.signature(pool)).or_insert(var);
        }
        Ok(())
    }

    fn fqn_name(&self, name: Atom) -> Atom {
        let module_name = match &self.0.borrow().data {
            ScopeData::Module(m) => m.name,
            _ => return name,
        };
        tenet_ir::intern(&format!("{}.{}", module_name.text(), name.text()))
    }

    /// Looks up the one bound variable matching `name` in this scope,
    /// optionally searching parents. Fails if more than one signature
    /// matches at the same level (spec.md §4.4's ambiguity rule).
    pub fn get_bound_variable(
        &self,
        loc: &Located,
        name: Atom,
        search_parents: bool,
    ) -> Result<Option<BoundVar>, Diagnostic> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            let found = {
                let inner = scope.0.borrow();
                inner.bound_vars.get(&name).cloned()
            };
            if let Some(by_sig) = found {
                if by_sig.len() > 1 {
                    return Err(Diagnostic::error(
                        ScopeErrorKind::AmbiguousReference {
                            name: name.text().to_owned(),
                            count: by_sig.len(),
                        },
                        loc.clone(),
                    ));
                }
                if let Some((_, var)) = by_sig.into_iter().next() {
                    return Ok(Some(var));
                }
            }
            if !search_parents {
                return Ok(None);
            }
            current = scope.0.borrow().parent.clone();
        }
        Ok(None)
    }

    /// Collects every bound or unchecked function/ctor visible under `name`
    /// across this scope and its parents (spec.md §4.4's `get_callables`).
    pub fn get_callables(&self, name: Atom, out: &mut Vec<BoundVar>, include_unchecked: bool) {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            if let Some(by_sig) = scope.0.borrow().bound_vars.get(&name) {
                out.extend(by_sig.values().cloned());
            }
            current = scope.0.borrow().parent.clone();
        }
        if include_unchecked {
            // Unchecked candidates are resolved by the instantiator, which
            // consults `ProgramData::unchecked_vars` directly; this method
            // only returns already-bound candidates.
        }
    }

    pub fn put_structural_typename(&self, name: Atom, expansion: Idx) -> Result<(), ()> {
        self.0.borrow_mut().type_env.put_structural(name, expansion)
    }

    pub fn put_nominal_typename(&self, name: Atom, expansion: Idx) -> Result<(), ()> {
        self.0.borrow_mut().type_env.put_nominal(name, expansion)
    }

    #[must_use]
    pub fn get_type(&self, name: Atom, allow_structural: bool) -> Option<Idx> {
        self.0.borrow().type_env.get_type(name, allow_structural)
    }

    #[must_use]
    pub fn flattened_type_env(&self) -> FxHashMap<Atom, Idx> {
        self.0.borrow().type_env.flatten()
    }

    /// Idempotent when the stored value prints identically (spec.md §4.4).
    pub fn put_type_variable_binding(&self, name: Atom, t: Idx, pool: &Pool) -> Result<(), ()> {
        let mut inner = self.0.borrow_mut();
        if let Some(&existing) = inner.type_variable_bindings.get(&name) {
            if tenet_types::signature(pool, existing) != tenet_types::signature(pool, t) {
                return Err(());
            }
            return Ok(());
        }
        inner.type_variable_bindings.insert(name, t);
        Ok(())
    }

    #[must_use]
    pub fn get_type_variable_binding(&self, name: Atom) -> Option<Idx> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            if let Some(&t) = scope.0.borrow().type_variable_bindings.get(&name) {
                return Some(t);
            }
            current = scope.0.borrow().parent.clone();
        }
        None
    }

    /// Registers an unchecked type under the module's FQN (spec.md §4.6),
    /// storing it both in the owning module's local table and the program
    /// scope's global table.
    pub fn put_unchecked_type(&self, unchecked: UncheckedType) {
        let fqn = unchecked.fqn;
        self.with_program_data_mut(|p| {
            if let std::collections::hash_map::Entry::Vacant(e) = p.unchecked_types_by_fqn.entry(fqn) {
                e.insert(p.unchecked_types.len());
                p.unchecked_types.push(unchecked.clone());
            }
        });
        let mut inner = self.0.borrow_mut();
        if let ScopeData::Module(ref mut m) = inner.data {
            let local_name = unchecked.node.name();
            if let std::collections::hash_map::Entry::Vacant(e) = m.unchecked_types_by_name.entry(local_name) {
                e.insert(m.unchecked_types.len());
                m.unchecked_types.push(unchecked);
            }
        }
    }

    pub fn put_unchecked_variable(&self, unchecked: UncheckedVar) {
        self.with_program_data_mut(|p| {
            let idx = p.unchecked_vars.len();
            p.unchecked_vars_by_fqn.entry(unchecked.fqn).or_default().push(idx);
            p.unchecked_vars.push(unchecked);
        });
    }

    /// Backfills a data constructor's `ctor_signature`/`type_info` once its
    /// owner `polymorph` type has been materialized (spec.md §4.9). Called
    /// from the type-registration pass, after the `UncheckedVar` for the
    /// constructor has already been registered by `scope_setup`.
    pub fn finalize_ctor(&self, fqn: Atom, signature: Idx, type_info: IrValueHandle) {
        self.with_program_data_mut(|p| {
            if let Some(idxs) = p.unchecked_vars_by_fqn.get(&fqn) {
                for &i in idxs {
                    p.unchecked_vars[i].ctor_signature = Some(signature);
                    p.unchecked_vars[i].type_info = Some(type_info);
                }
            }
        });
    }

    #[must_use]
    pub fn lookup_unchecked_vars(&self, fqn: Atom) -> Vec<UncheckedVar> {
        self.with_program_data(|p| {
            p.unchecked_vars_by_fqn
                .get(&fqn)
                .map(|idxs| idxs.iter().map(|&i| p.unchecked_vars[i].clone()).collect())
                .unwrap_or_default()
        })
    }

    /// Every already-bound callable across all modules whose unqualified name
    /// matches `name`. Protocol hooks (operator overloads, `__getitem__`/
    /// `__setitem__`, boxing constructors) dispatch on argument types rather
    /// than lexical visibility, so they're looked up program-wide instead of
    /// through the lexical scope chain `get_callables` walks.
    #[must_use]
    pub fn lookup_global_callables(&self, name: Atom) -> Vec<BoundVar> {
        let mut out = Vec::new();
        self.with_program_data(|p| {
            for module in p.modules.values() {
                module.get_callables(name, &mut out, false);
            }
        });
        out
    }

    /// The unchecked-var counterpart of [`ScopeRef::lookup_global_callables`].
    #[must_use]
    pub fn lookup_global_unchecked_vars(&self, name: Atom) -> Vec<UncheckedVar> {
        self.with_program_data(|p| {
            p.unchecked_vars
                .iter()
                .filter(|v| short_name(v.fqn) == name)
                .cloned()
                .collect()
        })
    }

    #[must_use]
    pub fn has_checked(&self, fqn: Atom) -> bool {
        self.with_program_data(|p| p.checked_nodes.contains(&fqn))
    }

    pub fn mark_checked(&self, fqn: Atom) {
        self.with_program_data_mut(|p| {
            p.checked_nodes.insert(fqn);
        });
    }

    #[must_use]
    pub fn lookup_module(&self, name: Atom) -> Option<ScopeRef> {
        self.with_program_data(|p| p.modules.get(&name).cloned())
    }

    pub fn put_bound_type(&self, signature: String, bound_type: tenet_types::BoundType, pool: &Pool) {
        self.with_program_data_mut(|p| p.bound_types.put(signature, bound_type, pool));
    }

    #[must_use]
    pub fn get_bound_type(&self, signature: &str, use_mappings: bool) -> Option<tenet_types::BoundType> {
        self.with_program_data(|p| p.bound_types.get(signature, use_mappings).cloned())
    }

    pub fn put_bound_type_mapping(&self, src: String, dst: String) {
        self.with_program_data_mut(|p| p.bound_types.put_mapping(src, dst));
    }

    /// The innermost enclosing function's return-type constraint, inherited
    /// through any nested `Runnable` block/loop scopes.
    #[must_use]
    pub fn return_type_constraint(&self) -> Option<Idx> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            let rt = match &scope.0.borrow().data {
                ScopeData::Function(f) | ScopeData::Runnable(f) => f.return_type,
                _ => None,
            };
            if rt.is_some() {
                return rt;
            }
            current = scope.0.borrow().parent.clone();
        }
        None
    }

    pub fn set_return_type_constraint(&self, t: Idx) {
        let mut inner = self.0.borrow_mut();
        if let ScopeData::Function(ref mut f) = inner.data {
            f.return_type = Some(t);
        }
    }

    /// The innermost loop's continue/break targets, or `None` outside a loop.
    #[must_use]
    pub fn loop_targets(&self) -> Option<(IrBlockHandle, IrBlockHandle)> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            if let ScopeData::Runnable(f) = &scope.0.borrow().data {
                if let (Some(c), Some(b)) = (f.continue_target, f.break_target) {
                    return Some((c, b));
                }
            }
            current = scope.0.borrow().parent.clone();
        }
        None
    }

    #[must_use]
    pub fn module_name(&self) -> Option<Atom> {
        match &self.0.borrow().data {
            ScopeData::Module(m) => Some(m.name),
            _ => None,
        }
    }

    #[must_use]
    pub fn ir_module(&self) -> Option<IrModuleHandle> {
        match &self.0.borrow().data {
            ScopeData::Module(m) => Some(m.ir_module),
            _ => None,
        }
    }

    /// Every bound variable registered directly in this scope (no parent
    /// walk), across all overload signatures. Used by orchestration to
    /// enumerate a module's globals (spec.md §4.7's `__visit_module_vars`).
    #[must_use]
    pub fn all_bound_vars(&self) -> Vec<BoundVar> {
        self.0
            .borrow()
            .bound_vars
            .values()
            .flat_map(|by_sig| by_sig.values().cloned())
            .collect()
    }

    #[must_use]
    pub fn all_module_scopes(&self) -> Vec<ScopeRef> {
        self.with_program_data(|p| p.modules.values().cloned().collect())
    }

    #[must_use]
    pub fn init_module_vars_fn(&self) -> Option<IrFunctionHandle> {
        self.with_program_data(|p| p.init_module_vars_fn)
    }

    pub fn set_init_module_vars_fn(&self, f: IrFunctionHandle) {
        self.with_program_data_mut(|p| p.init_module_vars_fn = Some(f));
    }

    #[must_use]
    pub fn visit_module_vars_fn(&self) -> Option<IrFunctionHandle> {
        self.with_program_data(|p| p.visit_module_vars_fn)
    }

    pub fn set_visit_module_vars_fn(&self, f: IrFunctionHandle) {
        self.with_program_data_mut(|p| p.visit_module_vars_fn = Some(f));
    }
}

/// The part of an FQN after the last `.`, or the whole atom if unqualified.
fn short_name(fqn: Atom) -> Atom {
    match fqn.text().rsplit_once('.') {
        Some((_, tail)) => tenet_ir::intern(tail),
        None => fqn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenet_ir::{SourceFile, Span};
    use tenet_types::bound::{IrLayoutHandle, IrTypeHandle, IrValueHandle};
    use tenet_types::BoundType;

    fn loc() -> Located {
        Located::new(SourceFile::new("t.tn"), Span::new(1, 1))
    }

    fn dummy_var(pool: &mut Pool, name: Atom, id: u32) -> BoundVar {
        let term = pool.intern_id(tenet_ir::intern("int32"), loc());
        BoundVar {
            name,
            bound_type: BoundType {
                term,
                ir_type: IrTypeHandle(id),
                ir_layout: IrLayoutHandle(id),
                loc: loc(),
            },
            ir_value: IrValueHandle(id),
            id,
            is_global: false,
        }
    }

    #[test]
    fn no_shadowing_in_the_same_scope() {
        let mut pool = Pool::new();
        let program = ScopeRef::new_program();
        let name = tenet_ir::intern("x");
        let v1 = dummy_var(&mut pool, name, 1);
        let v2 = dummy_var(&mut pool, name, 2);
        assert!(program.put_bound_variable(name, v1, &pool, &loc()).is_ok());
        assert!(program.put_bound_variable(name, v2, &pool, &loc()).is_err());
    }

    #[test]
    fn module_insertion_mirrors_into_program_scope_under_fqn() {
        let mut pool = Pool::new();
        let program = ScopeRef::new_program();
        let module = ScopeRef::new_module(&program, tenet_ir::intern("app"), IrModuleHandle(0));
        let name = tenet_ir::intern("main");
        let v = dummy_var(&mut pool, name, 1);
        module.put_bound_variable(name, v, &pool, &loc()).unwrap();

        let fqn = tenet_ir::intern("app.main");
        let found = program.get_bound_variable(&loc(), fqn, false).unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn child_scope_sees_parent_bound_variables() {
        let mut pool = Pool::new();
        let program = ScopeRef::new_program();
        let name = tenet_ir::intern("g");
        let v = dummy_var(&mut pool, name, 1);
        program.put_bound_variable(name, v, &pool, &loc()).unwrap();

        let function = ScopeRef::new_function(&program, None);
        let block = ScopeRef::new_block(&function);
        let found = block.get_bound_variable(&loc(), name, true).unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn return_type_constraint_is_inherited_through_blocks() {
        let mut pool = Pool::new();
        let program = ScopeRef::new_program();
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let function = ScopeRef::new_function(&program, Some(int_ty));
        let block = ScopeRef::new_block(&function);
        assert_eq!(block.return_type_constraint(), Some(int_ty));
    }

    #[test]
    fn loop_targets_are_found_through_nested_blocks() {
        let program = ScopeRef::new_program();
        let function = ScopeRef::new_function(&program, None);
        let loop_scope = ScopeRef::new_loop(&function, IrBlockHandle(1), IrBlockHandle(2));
        let inner_block = ScopeRef::new_block(&loop_scope);
        assert_eq!(inner_block.loop_targets(), Some((IrBlockHandle(1), IrBlockHandle(2))));
    }

    #[test]
    fn no_loop_means_no_loop_targets() {
        let program = ScopeRef::new_program();
        let function = ScopeRef::new_function(&program, None);
        assert_eq!(function.loop_targets(), None);
    }
}
