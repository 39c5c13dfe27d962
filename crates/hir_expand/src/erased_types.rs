//! Pass D — erased-type (`impl Trait`) substitution (spec §4.11). Every
//! `TypeRef::ErasedType { origin, index, .. }` reachable anywhere in the
//! crate — a function's own declared return position, a call site's result
//! type, a static/const type, an enum variant field — is replaced with the
//! concrete type stored at `origin`'s function's `erased_types[index]`.
//!
//! A function's own declaration is just another occurrence: the front end
//! writes a self-referencing `origin` (a path back to the very function
//! being declared) with identity-mapped generic arguments, so resolving it
//! the same way as any call-site occurrence substitutes its own generics
//! back onto themselves and is a no-op past the initial table lookup.
//!
//! Name resolution reuses the flat last-path-component convention already
//! established in `resolver.rs`/`ufcs.rs`/`const_eval.rs`/`lifetime_infer.rs`:
//! a snapshot of every function's `erased_types` table is collected up front
//! (keyed by that flat name), so the rewrite itself never needs a live
//! `&Crate` borrow held alongside the `&mut Crate` walk — the same borrow
//! conflict `body_walk.rs` solves for bodies specifically doesn't arise here
//! at all, since the lookup table is read-only and fully built before any
//! mutation starts.

use std::collections::HashMap;

use hir_def::{
    expr::{ExprKind, ExprNode},
    expr_visitor::{walk_expr, ExprVisitor},
    item::{Crate, Module},
    name::Name,
    path::{Path, PathParams},
    ty::{GenericRef, TypeRef},
    visitor::Visitor,
};

use crate::body_walk;

pub fn substitute_erased_types(krate: &mut Crate) {
    let _s = profile::span("hir_expand::substitute_erased_types");
    let tables = collect_erased_tables(krate);

    let mut rw = SignatureRewriter { tables: &tables };
    rw.visit_crate(krate);

    body_walk::for_each_body(krate, |_krate, _target, body| {
        BodyRewriter { tables: &tables }.visit_node(body);
    });
}

/// Flat name → that function's own `erased_types` table, gathered once
/// before any rewriting starts. Method names collide across distinct impls
/// the same way every other flat-name lookup in this repo already accepts
/// (no cross-crate or cross-impl disambiguation).
fn collect_erased_tables(krate: &Crate) -> HashMap<Name, Vec<TypeRef>> {
    let mut out = HashMap::new();
    collect_module(&krate.root, &mut out);
    for (_, imp) in krate.type_impls.iter() {
        for (name, f) in &imp.methods {
            out.insert(name.clone(), f.erased_types.clone());
        }
    }
    for (_, imp) in krate.trait_impls.iter() {
        for (name, f) in &imp.methods {
            out.insert(name.clone(), f.erased_types.clone());
        }
    }
    out
}

fn collect_module(module: &Module, out: &mut HashMap<Name, Vec<TypeRef>>) {
    for (name, f) in &module.functions {
        out.insert(name.clone(), f.erased_types.clone());
    }
    for (_, t) in &module.traits {
        for (name, f) in &t.methods {
            out.insert(name.clone(), f.erased_types.clone());
        }
    }
    for sub in module.submodules.values() {
        collect_module(sub, out);
    }
}

fn origin_name(origin: &Path) -> Option<&Name> {
    match origin {
        Path::Generic(gp) => gp.path.components.last(),
        Path::UfcsInherent { item, .. } | Path::UfcsKnown { item, .. } | Path::UfcsUnknown { item, .. } => Some(item),
    }
}

/// The generic argument list a substitution should read `GenericRef::Param`
/// indices against: a bare free-function call's own turbofish params, or
/// (for a UFCS origin) the impl's resolved params followed by the method's
/// own, matching the `GenericParams::append` numbering convention
/// `closures.rs` already establishes for impl-then-own generic ordering.
fn origin_params(origin: &Path) -> Vec<TypeRef> {
    match origin {
        Path::Generic(gp) => gp.params.types.clone(),
        Path::UfcsInherent { impl_params, params, .. } => {
            let mut v = impl_params.types.clone();
            v.extend(params.types.clone());
            v
        }
        Path::UfcsKnown { params, .. } | Path::UfcsUnknown { params, .. } => params.types.clone(),
    }
}

/// Resolves `ty` to a fully erased-type-free result, recursively re-running
/// on the substituted value to unwrap chained `impl Trait` returns (spec
/// §4.11's "recursively re-runs on the substituted result").
fn substitute_ty(ty: &TypeRef, tables: &HashMap<Name, Vec<TypeRef>>) -> TypeRef {
    match ty {
        TypeRef::ErasedType { origin, index, .. } => resolve_erased(origin, *index, tables).unwrap_or_else(|| ty.clone()),
        TypeRef::Array { inner, size } => TypeRef::Array { inner: Box::new(substitute_ty(inner, tables)), size: size.clone() },
        TypeRef::Slice { inner } => TypeRef::Slice { inner: Box::new(substitute_ty(inner, tables)) },
        TypeRef::Tuple(tys) => TypeRef::Tuple(tys.iter().map(|t| substitute_ty(t, tables)).collect()),
        TypeRef::Borrow { mutability, lifetime, inner } => {
            TypeRef::Borrow { mutability: *mutability, lifetime: lifetime.clone(), inner: Box::new(substitute_ty(inner, tables)) }
        }
        TypeRef::Pointer { mutability, inner } => TypeRef::Pointer { mutability: *mutability, inner: Box::new(substitute_ty(inner, tables)) },
        TypeRef::Function { is_unsafe, abi, args, ret } => TypeRef::Function {
            is_unsafe: *is_unsafe,
            abi: abi.clone(),
            args: args.iter().map(|t| substitute_ty(t, tables)).collect(),
            ret: Box::new(substitute_ty(ret, tables)),
        },
        TypeRef::Path(p) => TypeRef::Path(Box::new(substitute_path(p, tables))),
        TypeRef::TraitObject { principal, markers, lifetime } => TypeRef::TraitObject {
            principal: principal.as_ref().map(|p| {
                let mut p = (**p).clone();
                p.path.params = substitute_path_params(&p.path.params, tables);
                for (_, t) in p.assoc_bindings.iter_mut() {
                    *t = substitute_ty(t, tables);
                }
                Box::new(p)
            }),
            markers: markers
                .iter()
                .map(|m| {
                    let mut m = m.clone();
                    m.params = substitute_path_params(&m.params, tables);
                    m
                })
                .collect(),
            lifetime: lifetime.clone(),
        },
        other => other.clone(),
    }
}

fn substitute_path(path: &Path, tables: &HashMap<Name, Vec<TypeRef>>) -> Path {
    match path {
        Path::Generic(gp) => {
            let mut gp = gp.clone();
            gp.params = substitute_path_params(&gp.params, tables);
            Path::Generic(gp)
        }
        Path::UfcsInherent { ty, impl_params, params, item } => Path::UfcsInherent {
            ty: Box::new(substitute_ty(ty, tables)),
            impl_params: substitute_path_params(impl_params, tables),
            params: substitute_path_params(params, tables),
            item: item.clone(),
        },
        Path::UfcsKnown { ty, trait_, params, item } => {
            let mut trait_ = trait_.clone();
            trait_.params = substitute_path_params(&trait_.params, tables);
            Path::UfcsKnown { ty: Box::new(substitute_ty(ty, tables)), trait_, params: substitute_path_params(params, tables), item: item.clone() }
        }
        Path::UfcsUnknown { ty, params, item } => {
            Path::UfcsUnknown { ty: Box::new(substitute_ty(ty, tables)), params: substitute_path_params(params, tables), item: item.clone() }
        }
    }
}

fn substitute_path_params(params: &PathParams, tables: &HashMap<Name, Vec<TypeRef>>) -> PathParams {
    PathParams {
        lifetimes: params.lifetimes.clone(),
        types: params.types.iter().map(|t| substitute_ty(t, tables)).collect(),
        consts: params.consts.clone(),
    }
}

fn resolve_erased(origin: &Path, index: usize, tables: &HashMap<Name, Vec<TypeRef>>) -> Option<TypeRef> {
    let name = origin_name(origin)?;
    let raw = tables.get(name)?.get(index)?;
    let params = origin_params(origin);
    let substituted = substitute_generics(raw, &params);
    Some(substitute_ty(&substituted, tables))
}

/// Replaces `GenericRef::Param(i)` with `params[i]` wherever `i` is in
/// bounds; out-of-range indices (a malformed or not-yet-monomorphised
/// origin) are left as-is, the same best-effort fallback `ufcs.rs` takes
/// when a concrete impl can't be found.
fn substitute_generics(ty: &TypeRef, params: &[TypeRef]) -> TypeRef {
    match ty {
        TypeRef::Generic(GenericRef::Param(i)) => params.get(*i as usize).cloned().unwrap_or_else(|| ty.clone()),
        TypeRef::Array { inner, size } => TypeRef::Array { inner: Box::new(substitute_generics(inner, params)), size: size.clone() },
        TypeRef::Slice { inner } => TypeRef::Slice { inner: Box::new(substitute_generics(inner, params)) },
        TypeRef::Tuple(tys) => TypeRef::Tuple(tys.iter().map(|t| substitute_generics(t, params)).collect()),
        TypeRef::Borrow { mutability, lifetime, inner } => {
            TypeRef::Borrow { mutability: *mutability, lifetime: lifetime.clone(), inner: Box::new(substitute_generics(inner, params)) }
        }
        TypeRef::Pointer { mutability, inner } => TypeRef::Pointer { mutability: *mutability, inner: Box::new(substitute_generics(inner, params)) },
        TypeRef::Function { is_unsafe, abi, args, ret } => TypeRef::Function {
            is_unsafe: *is_unsafe,
            abi: abi.clone(),
            args: args.iter().map(|t| substitute_generics(t, params)).collect(),
            ret: Box::new(substitute_generics(ret, params)),
        },
        TypeRef::Path(p) => match &**p {
            Path::Generic(gp) => {
                let mut gp = gp.clone();
                gp.params.types = gp.params.types.iter().map(|t| substitute_generics(t, params)).collect();
                TypeRef::Path(Box::new(Path::Generic(gp)))
            }
            _ => ty.clone(),
        },
        other => other.clone(),
    }
}

struct SignatureRewriter<'t> {
    tables: &'t HashMap<Name, Vec<TypeRef>>,
}

impl<'t> Visitor for SignatureRewriter<'t> {
    /// Overridden instead of left to its `walk_type` default: `substitute_ty`
    /// already recurses through every nested type on its own, so there is no
    /// separate child-first walk to do here.
    fn visit_type(&mut self, ty: &mut TypeRef) {
        *ty = substitute_ty(ty, self.tables);
    }
}

struct BodyRewriter<'t> {
    tables: &'t HashMap<Name, Vec<TypeRef>>,
}

impl<'t> ExprVisitor for BodyRewriter<'t> {
    fn visit_node(&mut self, node: &mut ExprNode) {
        walk_expr(self, node);
        node.ty = substitute_ty(&node.ty, self.tables);
        match &mut node.kind {
            ExprKind::Cast { ty, .. } | ExprKind::Unsize { ty, .. } => *ty = substitute_ty(ty, self.tables),
            ExprKind::Let { ty: Some(t), .. } => *t = substitute_ty(t, self.tables),
            ExprKind::CallPath { path, .. } => *path = substitute_path(path, self.tables),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hir_def::{
        item::Function,
        name::Name,
        path::{GenericPath, SimplePath},
        ty::Primitive,
    };
    use test_utils::empty_crate;

    fn self_origin(crate_name: &Name, fn_name: &str) -> Path {
        Path::Generic(GenericPath::new(SimplePath { crate_name: crate_name.clone(), components: vec![Name::new(fn_name)] }))
    }

    #[test]
    fn own_return_position_resolves_from_own_table() {
        let mut krate = empty_crate();
        let crate_name = krate.name.clone();
        let erased = TypeRef::ErasedType { origin: Box::new(self_origin(&crate_name, "f")), index: 0, traits: Vec::new() };
        krate.root.functions.insert(
            Name::new("f"),
            Function {
                generics: Default::default(),
                receiver: None,
                args: Vec::new(),
                ret_ty: erased,
                body: None,
                is_const: false,
                is_unsafe: false,
                erased_types: vec![TypeRef::Primitive(Primitive::I32)],
            },
        );
        substitute_erased_types(&mut krate);
        assert_eq!(krate.root.functions[&Name::new("f")].ret_ty, TypeRef::Primitive(Primitive::I32));
    }

    #[test]
    fn call_site_return_type_is_substituted() {
        let mut krate = empty_crate();
        let crate_name = krate.name.clone();
        krate.root.functions.insert(
            Name::new("f"),
            Function {
                generics: Default::default(),
                receiver: None,
                args: Vec::new(),
                ret_ty: TypeRef::ErasedType { origin: Box::new(self_origin(&crate_name, "f")), index: 0, traits: Vec::new() },
                body: None,
                is_const: false,
                is_unsafe: false,
                erased_types: vec![TypeRef::Primitive(Primitive::Bool)],
            },
        );
        let call = ExprNode::new(
            TypeRef::ErasedType { origin: Box::new(self_origin(&crate_name, "f")), index: 0, traits: Vec::new() },
            ExprKind::CallPath { path: self_origin(&crate_name, "f"), args: Vec::new() },
        );
        krate.root.functions.insert(
            Name::new("g"),
            Function {
                generics: Default::default(),
                receiver: None,
                args: Vec::new(),
                ret_ty: TypeRef::Primitive(Primitive::Bool),
                body: Some(Box::new(call)),
                is_const: false,
                is_unsafe: false,
                erased_types: Vec::new(),
            },
        );
        substitute_erased_types(&mut krate);
        let committed = krate.root.functions[&Name::new("g")].body.as_ref().unwrap();
        assert_eq!(committed.ty, TypeRef::Primitive(Primitive::Bool));
    }
}
