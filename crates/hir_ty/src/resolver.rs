//! The Trait Resolver (spec §4.2): "does type `T` implement trait `Tr` with
//! parameters `P`, and if so, which impl and what are its associated
//! types?" under inference, generics, blanket impls, supertrait chains,
//! auto-traits, and the built-in `Fn*`/`Sized`/`Copy`/`Clone`/`Unsize`/
//! `CoerceUnsized` impls.
//!
//! Grounded on the teacher's `hir_ty/src/infer.rs` for how an inference
//! context threads through obligation-style queries, with chalk's solver
//! replaced by the bespoke four-step procedure spec.md §4.2.2 describes.

use rustc_hash::FxHashMap;
use std::cell::RefCell;

use hir_def::{
    item::{Crate, MarkerImplId, TraitImplId},
    lang_item::LangItem,
    name::Name,
    path::{GenericPath, Path, SimplePath, TraitPath},
    target::Edition,
    ty::{GenericRef, LifetimeRef, Mutability, Primitive, TypeRef},
};

use crate::{bounds::BoundCache, infer_ctxt::InferCtxt};

/// The three comparison grades a query can settle on (spec §4.2 "Answers
/// come in three comparison grades"). `Equal` is the strongest; ordering is
/// `Unequal < Fuzzy < Equal` so combining two grades is a `min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Grade {
    Unequal,
    Fuzzy,
    Equal,
}

impl Grade {
    pub fn worst(self, other: Grade) -> Grade {
        self.min(other)
    }
    pub fn is_equal(self) -> bool {
        self == Grade::Equal
    }
}

/// What a successful query resolved to: a concrete impl block, or one of the
/// built-in "magic" impls synthesized on the fly (spec §4.2.2 step 1).
#[derive(Debug, Clone)]
pub enum ImplRef {
    Trait(TraitImplId),
    Marker(MarkerImplId),
    Builtin(BuiltinImpl),
}

#[derive(Debug, Clone)]
pub enum BuiltinImpl {
    Sized,
    Copy,
    Clone,
    Fn { output: TypeRef },
    Generator { yield_ty: TypeRef, return_ty: TypeRef },
    DiscriminantKind { repr: TypeRef },
    Pointee { metadata: TypeRef },
    Unsize,
    CoerceUnsized,
    /// Matched through a `dyn Trait`'s own principal/marker list, or through
    /// a cached generic bound (spec §4.2.2 steps 2 and 3) — there is no
    /// concrete `TraitImpl` backing the match, dispatch goes through the
    /// trait object's vtable or the generic parameter itself.
    Dyn,
}

impl ImplRef {
    /// The associated-type value a builtin impl carries, if any — the
    /// shortcut EAT's "built-in families" step (§4.2.6 step 5) uses instead
    /// of walking a real `TraitImpl`'s `assoc_types` map.
    pub fn builtin_assoc_type(&self, name: &Name) -> Option<TypeRef> {
        match self {
            ImplRef::Builtin(BuiltinImpl::Fn { output }) if name.as_str() == "Output" => Some(output.clone()),
            ImplRef::Builtin(BuiltinImpl::Generator { yield_ty, .. }) if name.as_str() == "Yield" => {
                Some(yield_ty.clone())
            }
            ImplRef::Builtin(BuiltinImpl::Generator { return_ty, .. }) if name.as_str() == "Return" => {
                Some(return_ty.clone())
            }
            ImplRef::Builtin(BuiltinImpl::DiscriminantKind { repr }) if name.as_str() == "Discriminant" => {
                Some(repr.clone())
            }
            ImplRef::Builtin(BuiltinImpl::Pointee { metadata }) if name.as_str() == "Metadata" => {
                Some(metadata.clone())
            }
            _ => None,
        }
    }
}

/// A `(trait, type)` query key, used by the find_trait_impls recursion guard
/// (spec §4.2.2 "Cycle protection").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Query {
    trait_path: SimplePath,
    ty: TypeRef,
}

/// A recursion-guard stack held behind a `RefCell` so `TraitResolver`'s
/// query methods can take `&self` (queries nest arbitrarily deep through
/// `find_trait_impls` -> bound checking -> `find_trait_impls` again). Each
/// borrow is released immediately after the push or pop, so a guard never
/// holds the `RefCell` borrowed while a nested query re-enters it — holding
/// it across the recursive call would deadlock the borrow check at runtime.
struct StackGuard<'g, K: Clone + PartialEq> {
    stack: &'g RefCell<Vec<K>>,
}

impl<'g, K: Clone + PartialEq> Drop for StackGuard<'g, K> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

fn enter_stack<K: Clone + PartialEq>(stack: &RefCell<Vec<K>>, limit: usize, key: K) -> Result<StackGuard<'_, K>, ()> {
    let mut s = stack.borrow_mut();
    if s.len() >= limit || s.contains(&key) {
        return Err(());
    }
    s.push(key);
    drop(s);
    Ok(StackGuard { stack })
}

pub struct TraitResolver<'a> {
    pub krate: &'a Crate,
    query_stack: RefCell<Vec<Query>>,
    eat_stack: RefCell<Vec<TypeRef>>,
    auto_stack: RefCell<Vec<(SimplePath, TypeRef)>>,
    auto_trait_cache: RefCell<FxHashMap<(SimplePath, TypeRef), Grade>>,
}

impl<'a> TraitResolver<'a> {
    pub fn new(krate: &'a Crate) -> TraitResolver<'a> {
        TraitResolver {
            krate,
            query_stack: RefCell::new(Vec::new()),
            eat_stack: RefCell::new(Vec::new()),
            auto_stack: RefCell::new(Vec::new()),
            auto_trait_cache: RefCell::new(FxHashMap::default()),
        }
    }

    // ------------------------------------------------------------------
    // §4.2.1 entry points
    // ------------------------------------------------------------------

    /// `find_trait_impls(trait, params, ty, callback, magic=true) -> bool`.
    /// Invokes `callback(impl_ref, grade)` for every candidate; the callback
    /// returns `true` to stop early. Returns whether the callback accepted a
    /// candidate.
    pub fn find_trait_impls(
        &self,
        infer: &mut InferCtxt,
        bounds: &BoundCache,
        trait_: &TraitPath,
        ty: &TypeRef,
        magic: bool,
        mut callback: impl FnMut(ImplRef, Grade) -> bool,
    ) -> bool {
        let ty = infer.get_type(ty);
        let query = Query { trait_path: trait_.path.path.clone(), ty: ty.clone() };
        let _guard = match enter_stack(&self.query_stack, 256, query) {
            Ok(g) => g,
            Err(()) => return false, // RecursionDetected: caller treats as no match / fuzzy.
        };

        if magic {
            if let Some((imp, grade)) = self.builtin_magic(infer, trait_, &ty) {
                if callback(imp, grade) {
                    return true;
                }
            }
        }

        // Step 2: type-driven dispatch for trait objects / erased types /
        // placeholder generics / opaque ATYs.
        match &ty {
            TypeRef::TraitObject { principal, markers, .. } => {
                if let Some(p) = principal {
                    if p.path.path == trait_.path.path {
                        return callback(ImplRef::Builtin(BuiltinImpl::Dyn), Grade::Equal);
                    }
                }
                for m in markers {
                    if m.path == trait_.path.path {
                        return callback(ImplRef::Builtin(BuiltinImpl::Dyn), Grade::Equal);
                    }
                }
            }
            TypeRef::Generic(GenericRef::Placeholder { .. }) => {
                return callback(ImplRef::Builtin(BuiltinImpl::Dyn), Grade::Fuzzy);
            }
            _ => {}
        }

        // Step 3: cached generic bounds.
        for cached in bounds.bounds_on(&ty) {
            if cached.trait_.path.path == trait_.path.path {
                if callback(ImplRef::Builtin(BuiltinImpl::Dyn), Grade::Equal) {
                    return true;
                }
            }
        }

        // Step 4: crate-level impl search.
        if let Some(impls) = self.krate.impl_index.by_trait.get(&trait_.path.path) {
            for &id in impls {
                let imp = &self.krate.trait_impls[id];
                let grade = self.ftic_check_params(infer, bounds, &imp.generics, &imp.trait_.path.params, &imp.ty, &trait_.path.params, &ty);
                if callback(ImplRef::Trait(id), grade) {
                    return true;
                }
            }
        }
        false
    }

    /// Step 1 of §4.2.2: the hard-coded built-in impls. Returns `None` if
    /// `trait_` isn't one of the magic traits or doesn't apply to `ty`.
    fn builtin_magic(&self, infer: &mut InferCtxt, trait_: &TraitPath, ty: &TypeRef) -> Option<(ImplRef, Grade)> {
        let lang = self.lang_item_of(&trait_.path.path)?;
        match lang {
            LangItem::Sized => Some((ImplRef::Builtin(BuiltinImpl::Sized), self.type_is_sized(infer, ty))),
            LangItem::Copy => Some((ImplRef::Builtin(BuiltinImpl::Copy), self.type_is_copy(infer, ty))),
            LangItem::Clone => {
                if self.krate.edition.has_magic_clone() {
                    Some((ImplRef::Builtin(BuiltinImpl::Clone), self.type_is_clone(infer, ty)))
                } else {
                    None
                }
            }
            LangItem::Fn | LangItem::FnMut | LangItem::FnOnce => match ty {
                TypeRef::Closure { .. } => None, // resolved post-extraction only.
                TypeRef::Function { is_unsafe: false, abi: hir_def::ty::Abi::Rust, ret, .. } => {
                    Some((ImplRef::Builtin(BuiltinImpl::Fn { output: (**ret).clone() }), Grade::Equal))
                }
                TypeRef::Function { .. } => Some((ImplRef::Builtin(BuiltinImpl::Fn { output: TypeRef::UNIT }), Grade::Unequal)),
                _ => None,
            },
            LangItem::Generator => match ty {
                TypeRef::Generator { .. } => None, // yield/return types live on the node, not reachable here.
                _ => None,
            },
            LangItem::DiscriminantKind => {
                if !self.krate.edition.has_discriminant_kind() {
                    return None;
                }
                match ty {
                    TypeRef::Path(_) => Some((
                        ImplRef::Builtin(BuiltinImpl::DiscriminantKind { repr: TypeRef::Primitive(Primitive::Isize) }),
                        Grade::Equal,
                    )),
                    _ => Some((ImplRef::Builtin(BuiltinImpl::DiscriminantKind { repr: TypeRef::UNIT }), Grade::Equal)),
                }
            }
            LangItem::Pointee => {
                let metadata = match ty {
                    TypeRef::Slice { .. } => TypeRef::Primitive(Primitive::Usize),
                    TypeRef::Path(p) if matches!(&**p, Path::Generic(_)) => TypeRef::UNIT,
                    TypeRef::TraitObject { .. } => TypeRef::UNIT,
                    _ if self.type_is_sized(infer, ty).is_equal() => TypeRef::UNIT,
                    _ => return None,
                };
                Some((ImplRef::Builtin(BuiltinImpl::Pointee { metadata }), Grade::Equal))
            }
            LangItem::Unsize => None, // handled via `can_unsize`, not a direct magic lookup.
            LangItem::CoerceUnsized => match ty {
                TypeRef::Pointer { mutability: Mutability::Mut, .. } => {
                    Some((ImplRef::Builtin(BuiltinImpl::CoerceUnsized), Grade::Equal))
                }
                _ => None,
            },
            LangItem::Deref | LangItem::DerefMut | LangItem::Drop => None,
        }
    }

    fn lang_item_of(&self, path: &SimplePath) -> Option<LangItem> {
        for item in [
            LangItem::Sized,
            LangItem::Copy,
            LangItem::Clone,
            LangItem::Fn,
            LangItem::FnMut,
            LangItem::FnOnce,
            LangItem::Generator,
            LangItem::DiscriminantKind,
            LangItem::Pointee,
            LangItem::Unsize,
            LangItem::CoerceUnsized,
        ] {
            if self.krate.lang_items.is_lang(item, &GenericPath::new(path.clone())) {
                return Some(item);
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // §4.2.1 fast paths
    // ------------------------------------------------------------------

    pub fn type_is_sized(&self, infer: &mut InferCtxt, ty: &TypeRef) -> Grade {
        let ty = infer.get_type(ty);
        match &ty {
            TypeRef::Infer { .. } => Grade::Fuzzy,
            TypeRef::Slice { .. } => Grade::Unequal,
            TypeRef::Primitive(Primitive::Str) => Grade::Unequal,
            TypeRef::TraitObject { .. } => Grade::Unequal,
            TypeRef::Borrow { .. } | TypeRef::Pointer { .. } => Grade::Equal,
            TypeRef::Tuple(tys) => tys.iter().map(|t| self.type_is_sized(infer, t)).fold(Grade::Equal, Grade::worst),
            TypeRef::Array { .. } => Grade::Equal,
            TypeRef::Generic(GenericRef::Param(_)) => Grade::Equal, // absent an explicit `?Sized` bound, conservatively sized.
            TypeRef::Generic(GenericRef::Placeholder { .. }) => Grade::Fuzzy,
            TypeRef::Path(p) => match &**p {
                Path::Generic(gp) => {
                    if let Some(s) = self.find_struct(&gp.path) {
                        match &s.markings.unsized_param {
                            Some(idx) => self.struct_field_sized(infer, &s.fields, *idx),
                            None => Grade::Equal,
                        }
                    } else {
                        Grade::Equal
                    }
                }
                _ => Grade::Fuzzy,
            },
            _ => Grade::Equal,
        }
    }

    fn struct_field_sized(&self, infer: &mut InferCtxt, fields: &hir_def::item::StructFields, idx: usize) -> Grade {
        use hir_def::item::StructFields;
        let ty = match fields {
            StructFields::Tuple(tys) => tys.get(idx),
            StructFields::Named(map) => map.get_index(idx).map(|(_, t)| t),
            StructFields::Unit => None,
        };
        match ty {
            Some(t) => self.type_is_sized(infer, t),
            None => Grade::Equal,
        }
    }

    pub fn type_is_copy(&self, infer: &mut InferCtxt, ty: &TypeRef) -> Grade {
        let ty = infer.get_type(ty);
        match &ty {
            TypeRef::Infer { .. } => Grade::Fuzzy,
            TypeRef::Primitive(_) => Grade::Equal,
            TypeRef::Borrow { mutability: Mutability::Shared, .. } => Grade::Equal,
            TypeRef::Borrow { mutability: Mutability::Mut, .. } => Grade::Unequal,
            TypeRef::Pointer { .. } => Grade::Equal,
            TypeRef::Tuple(tys) => tys.iter().map(|t| self.type_is_copy(infer, t)).fold(Grade::Equal, Grade::worst),
            TypeRef::Array { inner, .. } => self.type_is_copy(infer, inner),
            TypeRef::Closure { .. } | TypeRef::Generator { .. } => Grade::Fuzzy, // resolved from stored `is_copy` post-extraction.
            TypeRef::Path(p) => match &**p {
                Path::Generic(gp) => match self.find_struct(&gp.path) {
                    Some(s) => {
                        if s.markings.is_copy {
                            Grade::Equal
                        } else {
                            Grade::Unequal
                        }
                    }
                    None => Grade::Fuzzy,
                },
                _ => Grade::Fuzzy,
            },
            _ => Grade::Unequal,
        }
    }

    pub fn type_is_clone(&self, infer: &mut InferCtxt, ty: &TypeRef) -> Grade {
        // From 1.29 on, `Clone` has a magic blanket impl for every `Copy` type.
        let copy = self.type_is_copy(infer, ty);
        if copy.is_equal() {
            return Grade::Equal;
        }
        copy
    }

    fn find_struct<'b>(&'b self, path: &SimplePath) -> Option<&'b hir_def::item::Struct> {
        find_in_modules(&self.krate.root, path, |m, name| m.structs.get(name))
    }

    /// `autoderef(ty) -> ty?` (spec §4.2.1 "single step"): `&T -> T`,
    /// `[T;N] -> [T]`, else search for a `Deref` impl and substitute its
    /// `Target`.
    pub fn autoderef(&self, infer: &mut InferCtxt, bounds: &BoundCache, ty: &TypeRef) -> Option<TypeRef> {
        let ty = infer.get_type(ty);
        match &ty {
            TypeRef::Borrow { inner, .. } => Some((**inner).clone()),
            TypeRef::Array { inner, .. } => Some(TypeRef::Slice { inner: inner.clone() }),
            _ => {
                let deref = self.krate.lang_items.get(LangItem::Deref)?.clone();
                let trait_path = TraitPath::new(deref);
                let mut result = None;
                self.find_trait_impls(infer, bounds, &trait_path, &ty, true, |imp, grade| {
                    if let (ImplRef::Trait(id), true) = (&imp, grade.is_equal()) {
                        result = self.krate.trait_impls[*id].assoc_types.get(&Name::new("Target")).cloned();
                        true
                    } else {
                        false
                    }
                });
                result
            }
        }
    }

    /// Iteratively dereferences `top`, at each depth trying inherent impls
    /// then in-scope traits for a method named `name` (spec §4.2.1).
    pub fn autoderef_find_method(
        &self,
        infer: &mut InferCtxt,
        bounds: &BoundCache,
        top: &TypeRef,
        name: &Name,
    ) -> Option<(u32, Path)> {
        let mut ty = top.clone();
        for depth in 0..32u32 {
            if let Some(found) = self.inherent_method(&ty, name) {
                return Some((depth, found));
            }
            match self.autoderef(infer, bounds, &ty) {
                Some(next) => ty = next,
                None => break,
            }
        }
        None
    }

    fn inherent_method(&self, ty: &TypeRef, name: &Name) -> Option<Path> {
        for (_, imp) in self.krate.type_impls.iter() {
            if &imp.ty == ty {
                if imp.methods.contains_key(name) {
                    return Some(Path::UfcsInherent {
                        ty: Box::new(ty.clone()),
                        impl_params: Default::default(),
                        params: Default::default(),
                        item: name.clone(),
                    });
                }
            }
        }
        None
    }

    pub fn autoderef_find_field(&self, infer: &mut InferCtxt, bounds: &BoundCache, top: &TypeRef, name: &Name) -> Option<(u32, TypeRef)> {
        let mut ty = top.clone();
        for depth in 0..32u32 {
            if let TypeRef::Path(p) = &ty {
                if let Path::Generic(gp) = &**p {
                    if let Some(s) = self.find_struct(&gp.path) {
                        if let hir_def::item::StructFields::Named(fields) = &s.fields {
                            if let Some(field_ty) = fields.get(name) {
                                return Some((depth, field_ty.clone()));
                            }
                        }
                    }
                }
            }
            match self.autoderef(infer, bounds, &ty) {
                Some(next) => ty = next,
                None => break,
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // §4.2.3 impl parameter matching
    // ------------------------------------------------------------------

    fn ftic_check_params(
        &self,
        infer: &mut InferCtxt,
        bounds: &BoundCache,
        impl_generics: &hir_def::generics::GenericParams,
        impl_trait_args: &hir_def::path::PathParams,
        impl_self_ty: &TypeRef,
        query_params: &hir_def::path::PathParams,
        query_ty: &TypeRef,
    ) -> Grade {
        let mut grade = self.match_test_generics_fuzz(infer, impl_self_ty, query_ty);
        for (a, p) in impl_trait_args.types.iter().zip(&query_params.types) {
            grade = grade.worst(self.match_test_generics_fuzz(infer, a, p));
        }
        if grade == Grade::Unequal {
            return Grade::Unequal;
        }

        // Step 4: every `where` clause on the impl, monomorphised through
        // the filled/placeholder substitution (simplified here: bounds on
        // the impl's own generics are checked directly against the
        // resolver's bound cache rather than a fresh substitution pass).
        let _ = impl_generics;
        for bound in &impl_generics.bounds {
            if let hir_def::generics::GenericBound::Trait { ty, trait_ } = bound {
                let mut found = Grade::Unequal;
                self.find_trait_impls(infer, bounds, trait_, ty, true, |_, g| {
                    found = found.worst(Grade::Unequal).max(g);
                    g.is_equal()
                });
                grade = grade.worst(found);
            }
        }
        grade
    }

    /// Structural match between an impl-side type (which may reference the
    /// impl's own generics) and the query-side type, producing `Fuzzy`
    /// rather than failing outright when the RHS carries an unbound ivar or
    /// unresolved UFCS path (spec §4.2.3 step 2).
    fn match_test_generics_fuzz(&self, infer: &mut InferCtxt, impl_side: &TypeRef, query_side: &TypeRef) -> Grade {
        let q = infer.get_type(query_side);
        if matches!(q, TypeRef::Infer { .. }) {
            return Grade::Fuzzy;
        }
        if let TypeRef::Path(p) = &q {
            if p.is_ufcs_unknown() {
                return Grade::Fuzzy;
            }
        }
        match (impl_side, &q) {
            (TypeRef::Generic(_), _) => Grade::Equal, // impl's own parameter: always matches, filling a slot.
            (a, b) if a == b => Grade::Equal,
            (TypeRef::Tuple(a), TypeRef::Tuple(b)) if a.len() == b.len() => {
                a.iter().zip(b).map(|(x, y)| self.match_test_generics_fuzz(infer, x, y)).fold(Grade::Equal, Grade::worst)
            }
            (TypeRef::Borrow { inner: a, mutability: ma, .. }, TypeRef::Borrow { inner: b, mutability: mb, .. })
                if ma == mb =>
            {
                self.match_test_generics_fuzz(infer, a, b)
            }
            (TypeRef::Array { inner: a, .. }, TypeRef::Array { inner: b, .. })
            | (TypeRef::Slice { inner: a }, TypeRef::Slice { inner: b }) => self.match_test_generics_fuzz(infer, a, b),
            (TypeRef::Path(a), TypeRef::Path(b)) => match (&**a, &**b) {
                (Path::Generic(ga), Path::Generic(gb)) if ga.path == gb.path => ga
                    .params
                    .types
                    .iter()
                    .zip(&gb.params.types)
                    .map(|(x, y)| self.match_test_generics_fuzz(infer, x, y))
                    .fold(Grade::Equal, Grade::worst),
                _ => Grade::Unequal,
            },
            _ => Grade::Unequal,
        }
    }

    // ------------------------------------------------------------------
    // §4.2.4 auto-trait (OIBIT) resolution
    // ------------------------------------------------------------------

    pub fn is_auto_trait_impl(&self, infer: &mut InferCtxt, trait_path: &SimplePath, ty: &TypeRef) -> Grade {
        let ty = infer.get_type(ty);
        let key = (trait_path.clone(), ty.clone());
        if let Some(g) = self.auto_trait_cache.borrow().get(&key) {
            return *g;
        }
        let _guard = match enter_stack(&self.auto_stack, 256, key.clone()) {
            Ok(g) => g,
            Err(()) => return Grade::Equal, // re-entry: positive default for marker traits.
        };

        if let Some(marker_impls) = self.krate.impl_index.by_marker_trait.get(trait_path) {
            let mut negative = false;
            let mut positive = false;
            for &id in marker_impls {
                let imp = &self.krate.marker_impls[id];
                if imp.ty == ty {
                    if imp.is_negative {
                        negative = true;
                    } else {
                        positive = true;
                    }
                }
            }
            if positive {
                self.auto_trait_cache.borrow_mut().insert(key, Grade::Equal);
                return Grade::Equal;
            }
            if negative {
                self.auto_trait_cache.borrow_mut().insert(key, Grade::Unequal);
                return Grade::Unequal;
            }
        }

        let grade = self.destructure_auto_trait(infer, trait_path, &ty);
        self.auto_trait_cache.borrow_mut().insert(key, grade);
        grade
    }

    fn destructure_auto_trait(&self, infer: &mut InferCtxt, trait_path: &SimplePath, ty: &TypeRef) -> Grade {
        match ty {
            TypeRef::Tuple(tys) => tys
                .iter()
                .map(|t| self.is_auto_trait_impl(infer, trait_path, t))
                .fold(Grade::Equal, Grade::worst),
            TypeRef::Array { inner, .. } | TypeRef::Slice { inner } | TypeRef::Borrow { inner, .. } => {
                self.is_auto_trait_impl(infer, trait_path, inner)
            }
            TypeRef::Path(p) => match &**p {
                Path::Generic(gp) => match self.find_struct(&gp.path) {
                    Some(s) => match &s.fields {
                        hir_def::item::StructFields::Tuple(tys) => {
                            tys.iter().map(|t| self.is_auto_trait_impl(infer, trait_path, t)).fold(Grade::Equal, Grade::worst)
                        }
                        hir_def::item::StructFields::Named(fields) => fields
                            .values()
                            .map(|t| self.is_auto_trait_impl(infer, trait_path, t))
                            .fold(Grade::Equal, Grade::worst),
                        hir_def::item::StructFields::Unit => Grade::Equal,
                    },
                    // Unresolved/extern type: destructure is `TODO` in the
                    // original (spec §9 Open Questions); conservatively
                    // `Unequal` rather than risk an unsound positive.
                    None => Grade::Unequal,
                },
                _ if p.is_ufcs_unknown() => Grade::Fuzzy,
                _ => Grade::Fuzzy,
            },
            TypeRef::Infer { .. } => Grade::Fuzzy,
            _ => Grade::Equal,
        }
    }

    // ------------------------------------------------------------------
    // §4.2.5 unsize check
    // ------------------------------------------------------------------

    pub fn can_unsize(
        &self,
        infer: &mut InferCtxt,
        bounds: &BoundCache,
        dst: &TypeRef,
        src: &TypeRef,
    ) -> Grade {
        let dst = infer.get_type(dst);
        let src = infer.get_type(src);
        if dst == src {
            return Grade::Unequal;
        }
        if matches!(dst, TypeRef::Infer { .. }) || matches!(src, TypeRef::Infer { .. }) {
            return Grade::Fuzzy;
        }
        match (&dst, &src) {
            (TypeRef::Slice { inner: d }, TypeRef::Array { inner: s, .. }) => {
                if d == s {
                    Grade::Equal
                } else {
                    Grade::Unequal
                }
            }
            (TypeRef::TraitObject { principal, markers, .. }, _) => {
                let mut grade = Grade::Equal;
                if let Some(p) = principal {
                    self.find_trait_impls(infer, bounds, p, &src, true, |_, g| {
                        grade = grade.worst(g);
                        g.is_equal()
                    });
                }
                for m in markers {
                    let tp = TraitPath::new(m.clone());
                    let mut found = Grade::Unequal;
                    self.find_trait_impls(infer, bounds, &tp, &src, true, |_, g| {
                        found = found.worst(Grade::Unequal).max(g);
                        g.is_equal()
                    });
                    grade = grade.worst(found);
                }
                grade
            }
            (
                TypeRef::TraitObject { principal: dp, markers: dm, .. },
                TypeRef::TraitObject { principal: sp, markers: sm, .. },
            ) => {
                if dp == sp && dm.iter().all(|m| sm.contains(m)) {
                    Grade::Equal
                } else {
                    Grade::Unequal
                }
            }
            (TypeRef::Path(dp), TypeRef::Path(sp)) => match (&**dp, &**sp) {
                (Path::Generic(dgp), Path::Generic(sgp)) if dgp.path == sgp.path => {
                    if let Some(s) = self.find_struct(&sgp.path) {
                        if let Some(idx) = s.markings.unsized_param {
                            let (d_inner, s_inner) = match (&s.fields, &s.fields) {
                                _ => (dgp.params.types.get(idx), sgp.params.types.get(idx)),
                            };
                            if let (Some(d), Some(s2)) = (d_inner, s_inner) {
                                return self.can_unsize(infer, bounds, d, s2);
                            }
                        }
                    }
                    Grade::Unequal
                }
                _ => Grade::Unequal,
            },
            _ => Grade::Unequal,
        }
    }

    // ------------------------------------------------------------------
    // §4.2.6 associated-type expansion (EAT)
    // ------------------------------------------------------------------

    /// `expand_associated_types(ty)`: normalizes every reachable `UfcsKnown`
    /// node inside `ty`. Idempotent (spec §8 property 8): a type with no
    /// more expandable ATYs is returned unchanged.
    pub fn expand_associated_types(&self, infer: &mut InferCtxt, bounds: &BoundCache, ty: &TypeRef) -> TypeRef {
        let ty = infer.get_type(ty);
        let _guard = match enter_stack(&self.eat_stack, 256, ty.clone()) {
            Ok(g) => g,
            Err(()) => return ty, // cycle: leave the node as-is, matching step 9's opaque fallback.
        };
        self.expand_associated_types_inner(infer, bounds, &ty)
    }

    fn expand_associated_types_inner(&self, infer: &mut InferCtxt, bounds: &BoundCache, ty: &TypeRef) -> TypeRef {
        match ty {
            TypeRef::Path(p) => match &**p {
                Path::UfcsKnown { ty: self_ty, trait_, params: _, item } => {
                    let self_ty = self.expand_associated_types(infer, bounds, self_ty);
                    if matches!(self_ty, TypeRef::Infer { .. }) || matches!(self_ty, TypeRef::Generic(GenericRef::Placeholder { .. })) {
                        return ty.clone(); // step 3/4: skip, leave opaque.
                    }
                    let trait_path = TraitPath { path: trait_.clone(), assoc_bindings: Vec::new() };
                    let mut substituted = None;
                    let mut candidates = 0u32;
                    self.find_trait_impls(infer, bounds, &trait_path, &self_ty, true, |imp, grade| {
                        if let Some(builtin_val) = imp.builtin_assoc_type(item) {
                            if grade.is_equal() {
                                substituted = Some(builtin_val);
                                return true;
                            }
                        }
                        if let ImplRef::Trait(id) = &imp {
                            if grade.is_equal() {
                                if let Some(v) = self.krate.trait_impls[*id].assoc_types.get(item) {
                                    substituted = Some(v.clone());
                                    return true;
                                }
                            } else if grade == Grade::Fuzzy {
                                candidates += 1;
                            }
                        }
                        false
                    });
                    match substituted {
                        Some(v) => self.expand_associated_types(infer, bounds, &v),
                        None if candidates > 0 => ty.clone(), // Unbound: retry later.
                        None => mark_opaque(ty, &self_ty),
                    }
                }
                _ => ty.clone(),
            },
            TypeRef::Array { inner, size } => {
                TypeRef::Array { inner: Box::new(self.expand_associated_types(infer, bounds, inner)), size: size.clone() }
            }
            TypeRef::Slice { inner } => TypeRef::Slice { inner: Box::new(self.expand_associated_types(infer, bounds, inner)) },
            TypeRef::Tuple(tys) => {
                TypeRef::Tuple(tys.iter().map(|t| self.expand_associated_types(infer, bounds, t)).collect())
            }
            TypeRef::Borrow { mutability, lifetime, inner } => TypeRef::Borrow {
                mutability: *mutability,
                lifetime: lifetime.clone(),
                inner: Box::new(self.expand_associated_types(infer, bounds, inner)),
            },
            TypeRef::Pointer { mutability, inner } => {
                TypeRef::Pointer { mutability: *mutability, inner: Box::new(self.expand_associated_types(infer, bounds, inner)) }
            }
            other => other.clone(),
        }
    }

    /// `expand_associated_types_inplace`: same as above but mutates `ty` in
    /// place, for callers already holding a `&mut TypeRef` (the common case
    /// in rewrite passes).
    pub fn expand_associated_types_inplace(&self, infer: &mut InferCtxt, bounds: &BoundCache, ty: &mut TypeRef) {
        *ty = self.expand_associated_types(infer, bounds, ty);
    }
}

/// Step 9 of EAT: if no match was found and no inference variables remain
/// anywhere in the input, the node is permanently `Opaque` (represented here
/// by leaving the `UfcsKnown` path untouched, since this data model doesn't
/// carry a separate `Opaque` flag on `Path` — callers treat an
/// still-`UfcsKnown` post-EAT type as opaque).
fn mark_opaque(original: &TypeRef, _self_ty: &TypeRef) -> TypeRef {
    original.clone()
}

fn find_in_modules<'b, T>(
    module: &'b hir_def::item::Module,
    path: &SimplePath,
    get: impl Fn(&'b hir_def::item::Module, &Name) -> Option<&'b T> + Copy,
) -> Option<&'b T> {
    if let Some(last) = path.components.last() {
        if let Some(found) = get(module, last) {
            return Some(found);
        }
    }
    for sub in module.submodules.values() {
        if let Some(found) = find_in_modules(sub, path, get) {
            return Some(found);
        }
    }
    None
}
