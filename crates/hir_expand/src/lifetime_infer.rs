//! Pass I — lifetime inference (spec §4.6). Runs last in the pipeline: by
//! the time this walks a body, UFCS rewriting (pass G) has already
//! collapsed every `CallMethod`/`CallValue` into `CallPath`, so the
//! call-signature equating below only ever needs to handle one call shape.
//!
//! Phases 2-4 (solve/validate/commit) are `hir_ty::lifetime::LifetimeState`'s
//! job, shared with whatever future caller needs the same fixpoint outside
//! a full-body walk. This module owns phase 1 (enumerate) and the
//! per-body driver that runs all four in sequence.
//!
//! Scope note: only the body tree itself is walked (every `ExprNode::ty`,
//! plus `Cast`/`Unsize`/`Let`'s explicit type annotations and `CallPath`'s
//! own turbofish params). A function's declared `Param`/`ret_ty` outside of
//! any body are left alone; this repo has no separate pass that would ever
//! leave an unresolved lifetime there once the body referencing them commits.
//! Call-signature equating clones and freshens the callee's declared
//! signature per call site rather than running a full substitution engine
//! against the call's actual generic arguments — the callee's own named
//! generic lifetimes pass through unmodified, which is conservative rather
//! than wrong.

use hir_def::{
    diagnostics::{Diagnostic, Span},
    expr::{ExprKind, ExprNode},
    expr_visitor::{walk_expr, ExprVisitor},
    item::{Crate, Function, Module},
    name::Name,
    path::{Path, PathParams},
    pattern::{BindingMode, Pattern, PatternKind},
    ty::{LifetimeRef, TypeRef},
};
use hir_ty::{
    bounds::BoundCache,
    lifetime::{LifetimeState, LocalLifetime},
};

use crate::body_walk;

pub fn infer_lifetimes(krate: &mut Crate) {
    let _s = profile::span("hir_expand::infer_lifetimes");
    let mut diagnostics = Vec::new();
    body_walk::for_each_body(krate, |krate, target, body| {
        let bounds = BoundCache::build(&target.generics.own, target.generics.owner.as_ref());
        let mut state = LifetimeState::new(&bounds);
        Enumerate { krate, state: &mut state }.visit_node(body);
        match state.solve() {
            Ok(()) => {
                for fail in state.validate() {
                    diagnostics.push(Diagnostic::new(Span::DUMMY, fail));
                }
                Commit { state: &state }.visit_node(body);
            }
            Err(e) => diagnostics.push(Diagnostic::new(Span::DUMMY, e.to_string())),
        }
    });
    krate.diagnostics.extend(diagnostics);
}

// ---------------------------------------------------------------------
// Phase 1: enumerate
// ---------------------------------------------------------------------

struct Enumerate<'c, 's, 'a> {
    krate: &'c Crate,
    state: &'s mut LifetimeState<'a>,
}

impl<'c, 's, 'a> ExprVisitor for Enumerate<'c, 's, 'a> {
    fn visit_node(&mut self, node: &mut ExprNode) {
        match &mut node.kind {
            ExprKind::Let { ty, value, .. } => {
                self.visit_node(value);
                if let Some(t) = ty {
                    enumerate_ty(t, self.state);
                    equate_types(t, &value.ty, self.state);
                }
            }
            ExprKind::Assign { lhs, rhs, .. } => {
                self.visit_node(lhs);
                self.visit_node(rhs);
            }
            ExprKind::If { cond, then_, else_ } => {
                self.visit_node(cond);
                self.visit_node(then_);
                if let Some(e) = else_ {
                    self.visit_node(e);
                }
            }
            ExprKind::Match { value, arms } => {
                self.visit_node(value);
                for arm in arms.iter_mut() {
                    if let Some(g) = &mut arm.guard {
                        self.visit_node(g);
                    }
                    self.visit_node(&mut arm.body);
                }
            }
            ExprKind::Cast { value, ty } | ExprKind::Unsize { value, ty } => {
                self.visit_node(value);
                enumerate_ty(ty, self.state);
            }
            ExprKind::CallPath { path, args } => {
                for a in args.iter_mut() {
                    self.visit_node(a);
                }
                enumerate_path(path, self.state);
            }
            _ => walk_expr(self, node),
        }

        enumerate_ty(&mut node.ty, self.state);

        match &node.kind {
            ExprKind::Borrow { value, .. } => {
                let place = place_value_lifetime(value, self.state);
                let local = self.state.new_local(LocalLifetime::Node { borrow_point: Span::DUMMY, value: place });
                if let TypeRef::Borrow { lifetime, .. } = &node.ty {
                    self.state.equate_lifetimes(lifetime, &local);
                }
            }
            ExprKind::Assign { lhs, rhs, .. } => equate_types(&lhs.ty, &rhs.ty, self.state),
            ExprKind::If { then_, else_: Some(e), .. } => equate_types(&then_.ty, &e.ty, self.state),
            ExprKind::Match { value, arms } => {
                for arm in arms {
                    equate_types(&node.ty, &arm.body.ty, self.state);
                    bind_pattern_lifetimes(&arm.pattern, value, self.state);
                }
            }
            ExprKind::Let { pattern, value, .. } => bind_pattern_lifetimes(pattern, value, self.state),
            ExprKind::CallPath { path, args } => {
                if let Some(callee) = find_called_function(self.krate, path) {
                    for (arg, param) in args.iter().zip(callee.args.iter()) {
                        let mut param_ty = param.ty.clone();
                        enumerate_ty(&mut param_ty, self.state);
                        equate_types(&arg.ty, &param_ty, self.state);
                    }
                    let mut ret_ty = callee.ret_ty.clone();
                    enumerate_ty(&mut ret_ty, self.state);
                    equate_types(&node.ty, &ret_ty, self.state);
                }
            }
            _ => {}
        }
    }
}

/// Replaces every `Infer`/`Unknown`/`HigherRanked` lifetime reachable inside
/// `ty` with a fresh ivar (spec §4.6.2). Named/`Static`/`Local` lifetimes are
/// left untouched. Also records `ty`'s two non-lifetime-level outlives bound
/// sources (spec §4.6.1): for every `&'a T` reached, every lifetime inside
/// `T` is pushed as outliving `'a`; for every type an explicit `where T: 'a`
/// bound was recorded against, the same push happens against `'a` from that
/// bound.
fn enumerate_ty(ty: &mut TypeRef, state: &mut LifetimeState) {
    match ty {
        TypeRef::Borrow { lifetime, inner, .. } => {
            fresh_lifetime(lifetime, state);
            enumerate_ty(inner, state);
            for l in lifetimes_in(inner) {
                state.ensure_outlives(l, lifetime.clone());
            }
        }
        TypeRef::Pointer { inner, .. } => enumerate_ty(inner, state),
        TypeRef::Array { inner, .. } | TypeRef::Slice { inner } => enumerate_ty(inner, state),
        TypeRef::Tuple(tys) => {
            for t in tys.iter_mut() {
                enumerate_ty(t, state);
            }
        }
        TypeRef::Function { args, ret, .. } => {
            for a in args.iter_mut() {
                enumerate_ty(a, state);
            }
            enumerate_ty(ret, state);
        }
        TypeRef::Path(p) => enumerate_path(p, state),
        TypeRef::TraitObject { principal, markers, lifetime } => {
            fresh_lifetime(lifetime, state);
            if let Some(p) = principal {
                enumerate_path_params(&mut p.path.params, state);
                for (_, t) in p.assoc_bindings.iter_mut() {
                    enumerate_ty(t, state);
                }
            }
            for m in markers.iter_mut() {
                enumerate_path_params(&mut m.params, state);
            }
        }
        TypeRef::ErasedType { traits, .. } => {
            for t in traits.iter_mut() {
                enumerate_path_params(&mut t.path.params, state);
                for (_, ty) in t.assoc_bindings.iter_mut() {
                    enumerate_ty(ty, state);
                }
            }
        }
        TypeRef::Infer { .. } | TypeRef::Diverge | TypeRef::Primitive(_) | TypeRef::Generic(_) | TypeRef::Closure { .. } | TypeRef::Generator { .. } => {}
    }

    for target in state.type_outlives_on(ty).to_vec() {
        for l in lifetimes_in(ty) {
            state.ensure_outlives(l, target.clone());
        }
    }
}

/// Every lifetime structurally reachable inside `ty`, used to push the
/// outlives edges `enumerate_ty` records for `&'a T` and explicit `T: 'a`
/// bounds.
fn lifetimes_in(ty: &TypeRef) -> Vec<LifetimeRef> {
    let mut out = Vec::new();
    collect_lifetimes(ty, &mut out);
    out
}

fn collect_lifetimes(ty: &TypeRef, out: &mut Vec<LifetimeRef>) {
    match ty {
        TypeRef::Borrow { lifetime, inner, .. } => {
            out.push(lifetime.clone());
            collect_lifetimes(inner, out);
        }
        TypeRef::Pointer { inner, .. } => collect_lifetimes(inner, out),
        TypeRef::Array { inner, .. } | TypeRef::Slice { inner } => collect_lifetimes(inner, out),
        TypeRef::Tuple(tys) => {
            for t in tys {
                collect_lifetimes(t, out);
            }
        }
        TypeRef::Function { args, ret, .. } => {
            for a in args {
                collect_lifetimes(a, out);
            }
            collect_lifetimes(ret, out);
        }
        TypeRef::Path(p) => collect_path_lifetimes(p, out),
        TypeRef::TraitObject { principal, markers, lifetime } => {
            out.push(lifetime.clone());
            if let Some(p) = principal {
                collect_path_params_lifetimes(&p.path.params, out);
            }
            for m in markers {
                collect_path_params_lifetimes(m, out);
            }
        }
        TypeRef::ErasedType { traits, .. } => {
            for t in traits {
                collect_path_params_lifetimes(&t.path.params, out);
            }
        }
        _ => {}
    }
}

fn collect_path_lifetimes(path: &Path, out: &mut Vec<LifetimeRef>) {
    match path {
        Path::Generic(gp) => collect_path_params_lifetimes(&gp.params, out),
        Path::UfcsInherent { ty, impl_params, params, .. } => {
            collect_lifetimes(ty, out);
            collect_path_params_lifetimes(impl_params, out);
            collect_path_params_lifetimes(params, out);
        }
        Path::UfcsKnown { ty, trait_, params, .. } => {
            collect_lifetimes(ty, out);
            collect_path_params_lifetimes(&trait_.params, out);
            collect_path_params_lifetimes(params, out);
        }
        Path::UfcsUnknown { ty, params, .. } => {
            collect_lifetimes(ty, out);
            collect_path_params_lifetimes(params, out);
        }
    }
}

fn collect_path_params_lifetimes(params: &PathParams, out: &mut Vec<LifetimeRef>) {
    for t in &params.types {
        collect_lifetimes(t, out);
    }
    out.extend(params.lifetimes.iter().cloned());
}

fn enumerate_path(path: &mut Path, state: &mut LifetimeState) {
    match path {
        Path::Generic(gp) => enumerate_path_params(&mut gp.params, state),
        Path::UfcsInherent { ty, impl_params, params, .. } => {
            enumerate_ty(ty, state);
            enumerate_path_params(impl_params, state);
            enumerate_path_params(params, state);
        }
        Path::UfcsKnown { ty, trait_, params, .. } => {
            enumerate_ty(ty, state);
            enumerate_path_params(&mut trait_.params, state);
            enumerate_path_params(params, state);
        }
        Path::UfcsUnknown { ty, params, .. } => {
            enumerate_ty(ty, state);
            enumerate_path_params(params, state);
        }
    }
}

fn enumerate_path_params(params: &mut PathParams, state: &mut LifetimeState) {
    for l in params.lifetimes.iter_mut() {
        fresh_lifetime(l, state);
    }
    for t in params.types.iter_mut() {
        enumerate_ty(t, state);
    }
}

fn fresh_lifetime(lft: &mut LifetimeRef, state: &mut LifetimeState) {
    if !lft.is_concrete() {
        *lft = state.new_ivar(Span::DUMMY);
    }
}

/// `get_borrow_lifetime` (spec §4.6.2): the lifetime of the place being
/// borrowed, descending through `Field`/`Index`/`Deref`. A `Deref` of a
/// borrow propagates that borrow's own lifetime; a `Deref` of a raw pointer
/// always yields `'static`; any other root (a bare local) has no separate
/// innate lifetime modeled here (this repo has no stack-frame/region
/// analysis), so it falls back to the conservative `'static` default.
fn place_value_lifetime(node: &ExprNode, state: &LifetimeState) -> LifetimeRef {
    match &node.kind {
        ExprKind::Field { value, .. } | ExprKind::Index { value, .. } => place_value_lifetime(value, state),
        ExprKind::Deref { value } => match &value.ty {
            TypeRef::Borrow { lifetime, .. } => state.deref_place_lifetime(lifetime, false),
            TypeRef::Pointer { .. } => state.deref_place_lifetime(&LifetimeRef::Static, true),
            _ => place_value_lifetime(value, state),
        },
        _ => LifetimeRef::Static,
    }
}

/// Mints a `PatternBinding` local for every `ref`/`ref mut` binding reachable
/// inside `pattern` (spec §4.6.2), anchored to the lifetime of the value
/// being matched. Nested bindings all share that same anchor rather than
/// drilling into the exact sub-field each one binds — an approximation this
/// repo accepts since it has no place-projection tracking finer than
/// `place_value_lifetime`'s own `Field`/`Index`/`Deref` descent.
fn bind_pattern_lifetimes(pattern: &Pattern, anchor: &ExprNode, state: &mut LifetimeState) {
    if let Some(b) = &pattern.binding {
        if matches!(b.mode, BindingMode::Ref | BindingMode::MutRef) {
            let value = place_value_lifetime(anchor, state);
            state.new_local(LocalLifetime::PatternBinding { borrow_point: Span::DUMMY, value, pat: b.slot });
        }
    }
    match &pattern.kind {
        PatternKind::Box(p) | PatternKind::Ref { inner: p, .. } => bind_pattern_lifetimes(p, anchor, state),
        PatternKind::Tuple(ps) | PatternKind::Slice(ps) | PatternKind::Or(ps) => {
            for p in ps {
                bind_pattern_lifetimes(p, anchor, state);
            }
        }
        PatternKind::SplitTuple { before, after } => {
            for p in before.iter().chain(after) {
                bind_pattern_lifetimes(p, anchor, state);
            }
        }
        PatternKind::StructTuple { args, .. } | PatternKind::EnumTuple { args, .. } => {
            for p in args {
                bind_pattern_lifetimes(p, anchor, state);
            }
        }
        PatternKind::Struct { fields, .. } | PatternKind::EnumStruct { fields, .. } => {
            for (_, p) in fields {
                bind_pattern_lifetimes(p, anchor, state);
            }
        }
        PatternKind::SplitSlice { before, mid, after } => {
            for p in before.iter().chain(after) {
                bind_pattern_lifetimes(p, anchor, state);
            }
            if let Some(m) = mid {
                bind_pattern_lifetimes(m, anchor, state);
            }
        }
        _ => {}
    }
}

/// `equate_types` (spec §4.6.2): structurally walks two types in lockstep,
/// calling `equate_lifetimes` at every matching lifetime slot. Shape
/// mismatches (which shouldn't occur on a body that already typechecked)
/// are silently skipped rather than treated as a bug — this pass only cares
/// about the lifetime component of an already-agreed-upon type.
fn equate_types(a: &TypeRef, b: &TypeRef, state: &mut LifetimeState) {
    match (a, b) {
        (TypeRef::Borrow { lifetime: la, inner: ia, .. }, TypeRef::Borrow { lifetime: lb, inner: ib, .. }) => {
            state.equate_lifetimes(la, lb);
            equate_types(ia, ib, state);
        }
        (TypeRef::Pointer { inner: ia, .. }, TypeRef::Pointer { inner: ib, .. }) => equate_types(ia, ib, state),
        (TypeRef::Array { inner: ia, .. }, TypeRef::Array { inner: ib, .. }) | (TypeRef::Slice { inner: ia }, TypeRef::Slice { inner: ib }) => {
            equate_types(ia, ib, state)
        }
        (TypeRef::Tuple(ta), TypeRef::Tuple(tb)) => {
            for (x, y) in ta.iter().zip(tb.iter()) {
                equate_types(x, y, state);
            }
        }
        (TypeRef::Function { args: aa, ret: ra, .. }, TypeRef::Function { args: ab, ret: rb, .. }) => {
            for (x, y) in aa.iter().zip(ab.iter()) {
                equate_types(x, y, state);
            }
            equate_types(ra, rb, state);
        }
        (TypeRef::Path(pa), TypeRef::Path(pb)) => equate_paths(pa, pb, state),
        (TypeRef::TraitObject { lifetime: la, .. }, TypeRef::TraitObject { lifetime: lb, .. }) => state.equate_lifetimes(la, lb),
        _ => {}
    }
}

fn equate_paths(a: &Path, b: &Path, state: &mut LifetimeState) {
    match (a, b) {
        (Path::Generic(ga), Path::Generic(gb)) => equate_path_params(&ga.params, &gb.params, state),
        (Path::UfcsInherent { ty: ta, params: pa, .. }, Path::UfcsInherent { ty: tb, params: pb, .. })
        | (Path::UfcsKnown { ty: ta, params: pa, .. }, Path::UfcsKnown { ty: tb, params: pb, .. })
        | (Path::UfcsUnknown { ty: ta, params: pa, .. }, Path::UfcsUnknown { ty: tb, params: pb, .. }) => {
            equate_types(ta, tb, state);
            equate_path_params(pa, pb, state);
        }
        _ => {}
    }
}

fn equate_path_params(a: &PathParams, b: &PathParams, state: &mut LifetimeState) {
    for (x, y) in a.lifetimes.iter().zip(b.lifetimes.iter()) {
        state.equate_lifetimes(x, y);
    }
    for (x, y) in a.types.iter().zip(b.types.iter()) {
        equate_types(x, y, state);
    }
}

fn find_called_function<'c>(krate: &'c Crate, path: &Path) -> Option<&'c Function> {
    match path {
        Path::Generic(gp) => find_function_by_name(&krate.root, gp.path.components.last()?),
        Path::UfcsInherent { ty, item, .. } => {
            krate.type_impls.iter().find(|(_, imp)| &imp.ty == ty.as_ref()).and_then(|(_, imp)| imp.methods.get(item))
        }
        Path::UfcsKnown { ty, item, .. } => {
            krate.trait_impls.iter().find(|(_, imp)| &imp.ty == ty.as_ref()).and_then(|(_, imp)| imp.methods.get(item))
        }
        Path::UfcsUnknown { .. } => None,
    }
}

fn find_function_by_name<'c>(module: &'c Module, name: &Name) -> Option<&'c Function> {
    if let Some(f) = module.functions.get(name) {
        return Some(f);
    }
    for sub in module.submodules.values() {
        if let Some(f) = find_function_by_name(sub, name) {
            return Some(f);
        }
    }
    None
}

// ---------------------------------------------------------------------
// Phase 4: commit
// ---------------------------------------------------------------------

struct Commit<'s, 'a> {
    state: &'s LifetimeState<'a>,
}

impl<'s, 'a> ExprVisitor for Commit<'s, 'a> {
    fn visit_node(&mut self, node: &mut ExprNode) {
        walk_expr(self, node);
        commit_ty(&mut node.ty, self.state);
        match &mut node.kind {
            ExprKind::Cast { ty, .. } | ExprKind::Unsize { ty, .. } => commit_ty(ty, self.state),
            ExprKind::Let { ty: Some(t), .. } => commit_ty(t, self.state),
            ExprKind::CallPath { path, .. } => commit_path(path, self.state),
            _ => {}
        }
    }
}

fn commit_ty(ty: &mut TypeRef, state: &LifetimeState) {
    match ty {
        TypeRef::Borrow { lifetime, inner, .. } => {
            *lifetime = state.commit_value(lifetime);
            commit_ty(inner, state);
        }
        TypeRef::Pointer { inner, .. } => commit_ty(inner, state),
        TypeRef::Array { inner, .. } | TypeRef::Slice { inner } => commit_ty(inner, state),
        TypeRef::Tuple(tys) => {
            for t in tys.iter_mut() {
                commit_ty(t, state);
            }
        }
        TypeRef::Function { args, ret, .. } => {
            for a in args.iter_mut() {
                commit_ty(a, state);
            }
            commit_ty(ret, state);
        }
        TypeRef::Path(p) => commit_path(p, state),
        TypeRef::TraitObject { principal, markers, lifetime } => {
            *lifetime = state.commit_value(lifetime);
            if let Some(p) = principal {
                commit_path_params(&mut p.path.params, state);
                for (_, t) in p.assoc_bindings.iter_mut() {
                    commit_ty(t, state);
                }
            }
            for m in markers.iter_mut() {
                commit_path_params(&mut m.params, state);
            }
        }
        TypeRef::ErasedType { traits, .. } => {
            for t in traits.iter_mut() {
                commit_path_params(&mut t.path.params, state);
                for (_, ty) in t.assoc_bindings.iter_mut() {
                    commit_ty(ty, state);
                }
            }
        }
        _ => {}
    }
}

fn commit_path(path: &mut Path, state: &LifetimeState) {
    match path {
        Path::Generic(gp) => commit_path_params(&mut gp.params, state),
        Path::UfcsInherent { ty, impl_params, params, .. } => {
            commit_ty(ty, state);
            commit_path_params(impl_params, state);
            commit_path_params(params, state);
        }
        Path::UfcsKnown { ty, trait_, params, .. } => {
            commit_ty(ty, state);
            commit_path_params(&mut trait_.params, state);
            commit_path_params(params, state);
        }
        Path::UfcsUnknown { ty, params, .. } => {
            commit_ty(ty, state);
            commit_path_params(params, state);
        }
    }
}

fn commit_path_params(params: &mut PathParams, state: &LifetimeState) {
    for l in params.lifetimes.iter_mut() {
        *l = state.commit_value(l);
    }
    for t in params.types.iter_mut() {
        commit_ty(t, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hir_def::{
        expr::{BorrowType, Literal},
        item::Param,
        ty::Mutability,
    };
    use test_utils::empty_crate;

    fn borrow_ref_ty() -> TypeRef {
        TypeRef::Borrow { mutability: Mutability::Shared, lifetime: LifetimeRef::Infer, inner: Box::new(TypeRef::Primitive(hir_def::ty::Primitive::I32)) }
    }

    #[test]
    fn borrow_of_a_local_resolves_to_a_concrete_lifetime() {
        let mut krate = empty_crate();
        let local = ExprNode::new(TypeRef::Primitive(hir_def::ty::Primitive::I32), ExprKind::Variable { slot: 0, name: Name::new("x") });
        let body = ExprNode::new(borrow_ref_ty(), ExprKind::Borrow { ty: BorrowType::Shared, value: Box::new(local) });
        krate.root.functions.insert(
            Name::new("f"),
            Function {
                generics: Default::default(),
                receiver: None,
                args: vec![Param { pattern: Pattern::any(), ty: TypeRef::Primitive(hir_def::ty::Primitive::I32) }],
                ret_ty: borrow_ref_ty(),
                body: Some(Box::new(body)),
                is_const: false,
                is_unsafe: false,
                erased_types: Vec::new(),
            },
        );
        infer_lifetimes(&mut krate);
        let committed = krate.root.functions[&Name::new("f")].body.as_ref().unwrap();
        match &committed.ty {
            TypeRef::Borrow { lifetime, .. } => assert!(lifetime.is_concrete()),
            other => panic!("expected Borrow, got {:?}", other),
        }
    }

    #[test]
    fn two_branch_if_equates_both_arms_lifetimes() {
        let mut krate = empty_crate();
        let then_local = ExprNode::new(TypeRef::Primitive(hir_def::ty::Primitive::I32), ExprKind::Variable { slot: 0, name: Name::new("x") });
        let else_local = ExprNode::new(TypeRef::Primitive(hir_def::ty::Primitive::I32), ExprKind::Variable { slot: 1, name: Name::new("y") });
        let then_ = ExprNode::new(borrow_ref_ty(), ExprKind::Borrow { ty: BorrowType::Shared, value: Box::new(then_local) });
        let else_ = ExprNode::new(borrow_ref_ty(), ExprKind::Borrow { ty: BorrowType::Shared, value: Box::new(else_local) });
        let cond = ExprNode::new(TypeRef::Primitive(hir_def::ty::Primitive::Bool), ExprKind::Literal(Literal::Bool(true)));
        let body = ExprNode::new(
            borrow_ref_ty(),
            ExprKind::If { cond: Box::new(cond), then_: Box::new(then_), else_: Some(Box::new(else_)) },
        );
        krate.root.functions.insert(
            Name::new("g"),
            Function { generics: Default::default(), receiver: None, args: Vec::new(), ret_ty: borrow_ref_ty(), body: Some(Box::new(body)), is_const: false, is_unsafe: false, erased_types: Vec::new() },
        );
        infer_lifetimes(&mut krate);
        let committed = krate.root.functions[&Name::new("g")].body.as_ref().unwrap();
        if let ExprKind::If { then_, else_: Some(e), .. } = &committed.kind {
            assert_eq!(then_.ty, e.ty);
        } else {
            panic!("expected If");
        }
    }
}
