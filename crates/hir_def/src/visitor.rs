//! Generic recursive traversal over the crate (spec §4.1), grounded directly
//! on `visit_module`/`visit_type`/`visit_pattern`/`visit_path`'s dispatch
//! structure. `Visitor` does not itself rewrite anything — every hook
//! defaults to "recurse into children" via the paired `walk_*` free
//! function, and passes override only the hooks they care about.
//!
//! Expression trees are deliberately opaque here (`visit_expr` defaults to
//! doing nothing): a pass that needs to mutate expressions implements
//! [`ExprVisitor`] instead, which gets a `&mut ExprNode` handle to the
//! owning slot so it can replace a child wholesale.

use crate::{
    generics::{GenericBound, GenericParams},
    item::{Crate, Enum, MarkerImpl, Module, Struct, Trait, TraitAlias, TraitImpl, TypeImpl, Union},
    name::Name,
    path::{GenericPath, Path, PathContext, PathParams, TraitPath},
    pattern::{Pattern, PatternKind, PatternValue},
    ty::{LifetimeRef, TypeRef},
};

/// Trait/impl item-kinds, covered by dedicated `visit_*` hooks as the
/// original visitor does.
pub trait Visitor {
    fn visit_crate(&mut self, krate: &mut Crate) {
        walk_crate(self, krate);
    }

    fn visit_module(&mut self, path: &[Name], module: &mut Module) {
        walk_module(self, path, module);
    }

    fn visit_function(&mut self, _path: &[Name], _name: &Name, func: &mut crate::item::Function) {
        walk_function(self, func);
    }
    fn visit_static(&mut self, _path: &[Name], _name: &Name, s: &mut crate::item::Static) {
        walk_static(self, s);
    }
    fn visit_constant(&mut self, _path: &[Name], _name: &Name, c: &mut crate::item::Const) {
        walk_const(self, c);
    }
    fn visit_struct(&mut self, _path: &[Name], _name: &Name, s: &mut Struct) {
        walk_struct(self, s);
    }
    fn visit_enum(&mut self, _path: &[Name], _name: &Name, e: &mut Enum) {
        walk_enum(self, e);
    }
    fn visit_union(&mut self, _path: &[Name], _name: &Name, u: &mut Union) {
        walk_union(self, u);
    }
    fn visit_trait(&mut self, _path: &[Name], _name: &Name, t: &mut Trait) {
        walk_trait(self, t);
    }
    fn visit_trait_alias(&mut self, _path: &[Name], _name: &Name, t: &mut TraitAlias) {
        walk_params(self, &mut t.generics);
        for b in &mut t.bounds {
            self.visit_trait_path(b);
        }
    }
    fn visit_associatedtype(&mut self, _name: &Name, at: &mut crate::item::AssociatedType) {
        for b in &mut at.bounds {
            self.visit_trait_path(b);
        }
        if let Some(ty) = &mut at.default {
            self.visit_type(ty);
        }
    }

    fn visit_type_impl(&mut self, imp: &mut TypeImpl) {
        walk_type_impl(self, imp);
    }
    fn visit_trait_impl(&mut self, imp: &mut TraitImpl) {
        walk_trait_impl(self, imp);
    }
    fn visit_marker_impl(&mut self, imp: &mut MarkerImpl) {
        walk_params(self, &mut imp.generics);
        self.visit_generic_path(&mut imp.trait_);
        self.visit_type(&mut imp.ty);
    }

    fn visit_params(&mut self, params: &mut GenericParams) {
        walk_params(self, params);
    }
    fn visit_generic_bound(&mut self, bound: &mut GenericBound) {
        walk_generic_bound(self, bound);
    }
    fn visit_type(&mut self, ty: &mut TypeRef) {
        walk_type(self, ty);
    }
    fn visit_pattern(&mut self, pat: &mut Pattern) {
        walk_pattern(self, pat);
    }
    fn visit_pattern_val(&mut self, val: &mut PatternValue) {
        let _ = val;
    }
    fn visit_trait_path(&mut self, tp: &mut TraitPath) {
        walk_trait_path(self, tp);
    }
    fn visit_path(&mut self, ctx: PathContext, path: &mut Path) {
        walk_path(self, ctx, path);
    }
    fn visit_generic_path(&mut self, path: &mut GenericPath) {
        walk_generic_path(self, path);
    }
    fn visit_path_params(&mut self, params: &mut PathParams) {
        walk_path_params(self, params);
    }
    fn visit_lifetime(&mut self, _lft: &mut LifetimeRef) {}

    /// Expression trees are opaque to the outer visitor by default; a pass
    /// that mutates expressions should implement [`ExprVisitor`] and invoke
    /// it itself at the item-visitor level it cares about.
    fn visit_expr(&mut self, _body: &mut crate::expr::ExprNode) {}
}

pub fn walk_crate<V: Visitor + ?Sized>(v: &mut V, krate: &mut Crate) {
    let name = krate.root.name.clone();
    v.visit_module(&[name], &mut krate.root);
    for imp in krate.type_impls.values_mut() {
        v.visit_type_impl(imp);
    }
    for imp in krate.trait_impls.values_mut() {
        v.visit_trait_impl(imp);
    }
    for imp in krate.marker_impls.values_mut() {
        v.visit_marker_impl(imp);
    }
}

pub fn walk_module<V: Visitor + ?Sized>(v: &mut V, path: &[Name], module: &mut Module) {
    for (name, sub) in &mut module.submodules {
        let mut child_path = path.to_vec();
        child_path.push(name.clone());
        v.visit_module(&child_path, sub);
    }
    for (name, f) in &mut module.functions {
        v.visit_function(path, name, f);
    }
    for (name, s) in &mut module.statics {
        v.visit_static(path, name, s);
    }
    for (name, c) in &mut module.consts {
        v.visit_constant(path, name, c);
    }
    for (name, s) in &mut module.structs {
        v.visit_struct(path, name, s);
    }
    for (name, e) in &mut module.enums {
        v.visit_enum(path, name, e);
    }
    for (name, u) in &mut module.unions {
        v.visit_union(path, name, u);
    }
    for (name, t) in &mut module.traits {
        v.visit_trait(path, name, t);
    }
    for (name, t) in &mut module.trait_aliases {
        v.visit_trait_alias(path, name, t);
    }
    for ty in module.type_aliases.values_mut() {
        v.visit_type(ty);
    }
}

pub fn walk_function<V: Visitor + ?Sized>(v: &mut V, func: &mut crate::item::Function) {
    walk_params(v, &mut func.generics);
    for arg in &mut func.args {
        v.visit_pattern(&mut arg.pattern);
        v.visit_type(&mut arg.ty);
    }
    v.visit_type(&mut func.ret_ty);
    for ety in &mut func.erased_types {
        v.visit_type(ety);
    }
    if let Some(body) = &mut func.body {
        v.visit_expr(body);
    }
}

pub fn walk_static<V: Visitor + ?Sized>(v: &mut V, s: &mut crate::item::Static) {
    v.visit_type(&mut s.ty);
    if let Some(init) = &mut s.init {
        v.visit_expr(init);
    }
}

pub fn walk_const<V: Visitor + ?Sized>(v: &mut V, c: &mut crate::item::Const) {
    walk_params(v, &mut c.generics);
    v.visit_type(&mut c.ty);
    if let Some(init) = &mut c.init {
        v.visit_expr(init);
    }
}

fn walk_fields<V: Visitor + ?Sized>(v: &mut V, fields: &mut crate::item::StructFields) {
    match fields {
        crate::item::StructFields::Unit => {}
        crate::item::StructFields::Tuple(tys) => {
            for ty in tys {
                v.visit_type(ty);
            }
        }
        crate::item::StructFields::Named(map) => {
            for ty in map.values_mut() {
                v.visit_type(ty);
            }
        }
    }
}

pub fn walk_struct<V: Visitor + ?Sized>(v: &mut V, s: &mut Struct) {
    walk_params(v, &mut s.generics);
    walk_fields(v, &mut s.fields);
}

pub fn walk_enum<V: Visitor + ?Sized>(v: &mut V, e: &mut Enum) {
    walk_params(v, &mut e.generics);
    for variant in &mut e.variants {
        walk_fields(v, &mut variant.fields);
    }
}

pub fn walk_union<V: Visitor + ?Sized>(v: &mut V, u: &mut Union) {
    walk_params(v, &mut u.generics);
    for ty in u.fields.values_mut() {
        v.visit_type(ty);
    }
}

pub fn walk_trait<V: Visitor + ?Sized>(v: &mut V, t: &mut Trait) {
    walk_params(v, &mut t.generics);
    for parent in &mut t.parent_traits {
        v.visit_trait_path(parent);
    }
    let name_key: Vec<Name> = Vec::new();
    for (name, f) in &mut t.methods {
        v.visit_function(&name_key, name, f);
    }
    for (name, at) in &mut t.assoc_types {
        v.visit_associatedtype(name, at);
    }
    for (name, c) in &mut t.consts {
        v.visit_constant(&name_key, name, c);
    }
}

pub fn walk_type_impl<V: Visitor + ?Sized>(v: &mut V, imp: &mut TypeImpl) {
    walk_params(v, &mut imp.generics);
    v.visit_type(&mut imp.ty);
    let name_key: Vec<Name> = Vec::new();
    for (name, f) in &mut imp.methods {
        v.visit_function(&name_key, name, f);
    }
    for (name, c) in &mut imp.consts {
        v.visit_constant(&name_key, name, c);
    }
}

pub fn walk_trait_impl<V: Visitor + ?Sized>(v: &mut V, imp: &mut TraitImpl) {
    walk_params(v, &mut imp.generics);
    v.visit_generic_path(&mut imp.trait_.path);
    v.visit_type(&mut imp.ty);
    let name_key: Vec<Name> = Vec::new();
    for (name, f) in &mut imp.methods {
        v.visit_function(&name_key, name, f);
    }
    for (name, c) in &mut imp.consts {
        v.visit_constant(&name_key, name, c);
    }
    for ty in imp.assoc_types.values_mut() {
        v.visit_type(ty);
    }
}

pub fn walk_params<V: Visitor + ?Sized>(v: &mut V, params: &mut GenericParams) {
    for ty_param in &mut params.types {
        if let Some(d) = &mut ty_param.default {
            v.visit_type(d);
        }
    }
    for val_param in &mut params.values {
        v.visit_type(&mut val_param.ty);
    }
    for bound in &mut params.bounds {
        v.visit_generic_bound(bound);
    }
}

pub fn walk_generic_bound<V: Visitor + ?Sized>(v: &mut V, bound: &mut GenericBound) {
    match bound {
        GenericBound::Lifetime { lhs, outlives } => {
            v.visit_lifetime(lhs);
            v.visit_lifetime(outlives);
        }
        GenericBound::TypeOutlives { ty, outlives } => {
            v.visit_type(ty);
            v.visit_lifetime(outlives);
        }
        GenericBound::Trait { ty, trait_ } => {
            v.visit_type(ty);
            v.visit_trait_path(trait_);
        }
        GenericBound::TypeEquality { ty, other } => {
            v.visit_type(ty);
            v.visit_type(other);
        }
    }
}

pub fn walk_type<V: Visitor + ?Sized>(v: &mut V, ty: &mut TypeRef) {
    match ty {
        TypeRef::Infer { .. } | TypeRef::Diverge | TypeRef::Primitive(_) | TypeRef::Generic(_) => {}
        TypeRef::Path(p) => v.visit_path(PathContext::Type, p),
        TypeRef::TraitObject { principal, markers, lifetime } => {
            if let Some(p) = principal {
                v.visit_trait_path(p);
            }
            for m in markers {
                v.visit_generic_path(m);
            }
            v.visit_lifetime(lifetime);
        }
        TypeRef::ErasedType { origin, traits, .. } => {
            v.visit_path(PathContext::Type, origin);
            for t in traits {
                v.visit_trait_path(t);
            }
        }
        TypeRef::Array { inner, .. } | TypeRef::Slice { inner } => v.visit_type(inner),
        TypeRef::Tuple(tys) => {
            for t in tys {
                v.visit_type(t);
            }
        }
        TypeRef::Borrow { lifetime, inner, .. } => {
            v.visit_lifetime(lifetime);
            v.visit_type(inner);
        }
        TypeRef::Pointer { inner, .. } => v.visit_type(inner),
        TypeRef::Function { args, ret, .. } => {
            for a in args {
                v.visit_type(a);
            }
            v.visit_type(ret);
        }
        TypeRef::Closure { .. } | TypeRef::Generator { .. } => {}
    }
}

pub fn walk_pattern<V: Visitor + ?Sized>(v: &mut V, pat: &mut Pattern) {
    match &mut pat.kind {
        PatternKind::Any => {}
        PatternKind::Box(inner) | PatternKind::Ref { inner, .. } => v.visit_pattern(inner),
        PatternKind::Tuple(ps) | PatternKind::Slice(ps) | PatternKind::Or(ps) => {
            for p in ps {
                v.visit_pattern(p);
            }
        }
        PatternKind::SplitTuple { before, after } => {
            for p in before.iter_mut().chain(after.iter_mut()) {
                v.visit_pattern(p);
            }
        }
        PatternKind::StructValue { path } | PatternKind::EnumValue { path } => {
            v.visit_path(PathContext::Value, path)
        }
        PatternKind::StructTuple { path, args } | PatternKind::EnumTuple { path, args } => {
            v.visit_path(PathContext::Value, path);
            for a in args {
                v.visit_pattern(a);
            }
        }
        PatternKind::Struct { path, fields } | PatternKind::EnumStruct { path, fields } => {
            v.visit_path(PathContext::Value, path);
            for (_, p) in fields {
                v.visit_pattern(p);
            }
        }
        PatternKind::Value(val) => v.visit_pattern_val(val),
        PatternKind::Range { start, end } => {
            if let Some(s) = start {
                v.visit_pattern_val(s);
            }
            if let Some(e) = end {
                v.visit_pattern_val(e);
            }
        }
        PatternKind::SplitSlice { before, mid, after } => {
            for p in before.iter_mut().chain(after.iter_mut()) {
                v.visit_pattern(p);
            }
            if let Some(m) = mid {
                v.visit_pattern(m);
            }
        }
    }
}

pub fn walk_trait_path<V: Visitor + ?Sized>(v: &mut V, tp: &mut TraitPath) {
    v.visit_generic_path(&mut tp.path);
    for (_, ty) in &mut tp.assoc_bindings {
        v.visit_type(ty);
    }
}

pub fn walk_path<V: Visitor + ?Sized>(v: &mut V, ctx: PathContext, path: &mut Path) {
    match path {
        Path::Generic(gp) => v.visit_generic_path(gp),
        Path::UfcsInherent { ty, impl_params, params, .. } => {
            v.visit_type(ty);
            v.visit_path_params(impl_params);
            v.visit_path_params(params);
        }
        Path::UfcsKnown { ty, trait_, params, .. } => {
            v.visit_type(ty);
            v.visit_generic_path(trait_);
            v.visit_path_params(params);
        }
        Path::UfcsUnknown { ty, params, .. } => {
            debug_assert!(ctx != PathContext::Trait, "UfcsUnknown must not reach a trait position");
            v.visit_type(ty);
            v.visit_path_params(params);
        }
    }
}

pub fn walk_generic_path<V: Visitor + ?Sized>(v: &mut V, path: &mut GenericPath) {
    v.visit_path_params(&mut path.params);
}

pub fn walk_path_params<V: Visitor + ?Sized>(v: &mut V, params: &mut PathParams) {
    for ty in &mut params.types {
        v.visit_type(ty);
    }
}
