//! Type/value inference context (spec §4.3.1, §4.3.2, §4.3.4): two
//! independent union-finds over `ena::unify::InPlaceUnificationTable`, one
//! for type ivars (with integer/float-default classes) and one for
//! const-generic value ivars, plus the structural equality-propagation
//! algorithm that walks two `TypeRef`s and unifies them.
//!
//! One `InferCtxt` lives per function body, matching the teacher's
//! `InferenceContext` lifetime (built fresh at the start of each function,
//! discarded once that body's passes finish with it).

use ena::unify::{EqUnifyValue, InPlaceUnificationTable, NoError, UnifyKey, UnifyValue};
use hir_def::{
    diagnostics::{LowerError, Span},
    ty::{ConstGeneric, InferClass, Mutability, Primitive, TypeRef},
};

/// A type inference variable. Indices are dense and match the ena key's
/// internal `u32`, so `new_ivar` and `InPlaceUnificationTable::new_key`
/// always agree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TyVid(u32);

impl UnifyKey for TyVid {
    type Value = TyVarValue;
    fn index(&self) -> u32 {
        self.0
    }
    fn from_index(u: u32) -> TyVid {
        TyVid(u)
    }
    fn tag() -> &'static str {
        "TyVid"
    }
}

/// The payload of a type ivar slot (spec §4.3.1: "`Alias(idx)` or
/// `Value(owned-TypeRef)`" plus a class). `ena` folds the alias case into its
/// own union-find bookkeeping, so the value we store is only ever "still
/// unbound, with this class" or "resolved to this type".
#[derive(Clone, Debug, PartialEq)]
pub enum TyVarValue {
    Unbound(InferClass),
    Known(TypeRef),
}

impl UnifyValue for TyVarValue {
    type Error = NoError;

    fn unify_values(a: &Self, b: &Self) -> Result<Self, NoError> {
        use TyVarValue::*;
        Ok(match (a, b) {
            (Unbound(c1), Unbound(c2)) => Unbound(widen_class(*c1, *c2)),
            (Known(t), Unbound(_)) | (Unbound(_), Known(t)) => Known(t.clone()),
            // Both known: keep the left value. Actual structural agreement
            // is the caller's job (`equate_types`); a bare merge can't fail
            // here since `ena` has no way to report it.
            (Known(t), Known(_)) => Known(t.clone()),
        })
    }
}

fn widen_class(a: InferClass, b: InferClass) -> InferClass {
    match (a, b) {
        (InferClass::None, x) | (x, InferClass::None) => x,
        (x, y) if x == y => x,
        _ => InferClass::None,
    }
}

/// Const-generic (array length) inference variable; same shape as `TyVid`
/// but over `u64` values instead of types (spec §4.3.2).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ValVid(u32);

impl UnifyKey for ValVid {
    type Value = Option<u64>;
    fn index(&self) -> u32 {
        self.0
    }
    fn from_index(u: u32) -> ValVid {
        ValVid(u)
    }
    fn tag() -> &'static str {
        "ValVid"
    }
}

impl EqUnifyValue for u64 {}

#[derive(Default)]
pub struct InferCtxt {
    ty_table: InPlaceUnificationTable<TyVid>,
    val_table: InPlaceUnificationTable<ValVid>,
}

impl InferCtxt {
    pub fn new() -> InferCtxt {
        InferCtxt::default()
    }

    // ---- type ivars (§4.3.1) ----

    pub fn new_ivar(&mut self, class: InferClass) -> TypeRef {
        let vid = self.ty_table.new_key(TyVarValue::Unbound(class));
        TypeRef::Infer { ivar: Some(vid.0), class }
    }

    /// Follows the alias chain to the representative type, resolving it to
    /// a concrete `TypeRef` if known, or `Infer` (with the merged class)
    /// otherwise.
    pub fn get_type(&mut self, ty: &TypeRef) -> TypeRef {
        match ty {
            TypeRef::Infer { ivar: Some(v), class } => {
                let vid = TyVid(*v);
                match self.ty_table.probe_value(vid) {
                    TyVarValue::Known(t) => self.get_type(&t),
                    TyVarValue::Unbound(c) => {
                        TypeRef::Infer { ivar: Some(self.ty_table.find(vid).0), class: widen_class(*class, c) }
                    }
                }
            }
            other => other.clone(),
        }
    }

    pub fn set_ivar_to(&mut self, ivar: u32, ty: TypeRef) {
        let vid = TyVid(ivar);
        if let TypeRef::Infer { ivar: Some(other), .. } = ty {
            self.ty_table.unify_var_var(vid, TyVid(other)).ok();
        } else {
            self.ty_table.unify_var_value(vid, TyVarValue::Known(ty)).ok();
        }
    }

    pub fn ivar_unify(&mut self, a: u32, b: u32) {
        self.ty_table.unify_var_var(TyVid(a), TyVid(b)).ok();
    }

    /// `apply_defaults` (spec §4.3.1): every remaining class-constrained
    /// unresolved ivar falls back to `i32`/`f64`.
    pub fn apply_defaults(&mut self) {
        let n = self.ty_table.len();
        for i in 0..n {
            let vid = TyVid(i as u32);
            if let TyVarValue::Unbound(class) = self.ty_table.probe_value(vid) {
                let default = match class {
                    InferClass::Integer => Some(TypeRef::Primitive(Primitive::I32)),
                    InferClass::Float => Some(TypeRef::Primitive(Primitive::F64)),
                    InferClass::None => None,
                };
                if let Some(ty) = default {
                    let _ = self.ty_table.unify_var_value(vid, TyVarValue::Known(ty));
                }
            }
        }
    }

    /// `compact_ivars` (spec §4.3.1): expand every alias to its fully
    /// resolved root, for callers (EAT, commit passes) that want a snapshot
    /// free of further indirection.
    pub fn compact_ivars(&mut self) {
        let n = self.ty_table.len();
        for i in 0..n {
            let vid = TyVid(i as u32);
            let resolved = self.get_type(&TypeRef::Infer { ivar: Some(i as u32), class: InferClass::None });
            if !matches!(resolved, TypeRef::Infer { .. }) {
                let _ = self.ty_table.unify_var_value(vid, TyVarValue::Known(resolved));
            }
        }
    }

    pub fn type_contains_ivars(&mut self, ty: &TypeRef) -> bool {
        let ty = self.get_type(ty);
        match &ty {
            TypeRef::Infer { .. } => true,
            TypeRef::Array { inner, .. } | TypeRef::Slice { inner } | TypeRef::Pointer { inner, .. } => {
                self.type_contains_ivars(inner)
            }
            TypeRef::Borrow { inner, .. } => self.type_contains_ivars(inner),
            TypeRef::Tuple(tys) => tys.iter().any(|t| self.type_contains_ivars(t)),
            TypeRef::Function { args, ret, .. } => {
                args.iter().any(|t| self.type_contains_ivars(t)) || self.type_contains_ivars(ret)
            }
            TypeRef::Path(p) => path_params_of(p).map_or(false, |pp| pp.types.iter().any(|t| self.type_contains_ivars(t))),
            _ => false,
        }
    }

    pub fn types_equal(&mut self, a: &TypeRef, b: &TypeRef) -> bool {
        let a = self.get_type(a);
        let b = self.get_type(b);
        structurally_equal(&a, &b)
    }

    // ---- value ivars (§4.3.2) ----

    pub fn new_value_ivar(&mut self) -> ConstGeneric {
        let vid = self.val_table.new_key(None);
        ConstGeneric::Infer(vid.0)
    }

    pub fn get_value(&mut self, cg: &ConstGeneric) -> ConstGeneric {
        match cg {
            ConstGeneric::Infer(v) => match self.val_table.probe_value(ValVid(*v)) {
                Some(known) => ConstGeneric::Known(known),
                None => ConstGeneric::Infer(self.val_table.find(ValVid(*v)).0),
            },
            other => other.clone(),
        }
    }

    pub fn set_ivar_val_to(&mut self, ivar: u32, value: u64) {
        let _ = self.val_table.unify_var_value(ValVid(ivar), Some(value));
    }

    pub fn ivar_val_unify(&mut self, a: u32, b: u32) {
        let _ = self.val_table.unify_var_var(ValVid(a), ValVid(b));
    }

    // ---- equality propagation (§4.3.4) ----

    /// Unifies `lhs` and `rhs`, applying the coercions listed in spec
    /// §4.3.4 step 3 when a tag mismatch is otherwise fatal. Returns `Ok`
    /// once the two sides are known to denote the same type (possibly via a
    /// still-unresolved ivar alias), `Err` on a hard mismatch.
    pub fn equate_types(&mut self, lhs: &TypeRef, rhs: &TypeRef) -> Result<(), LowerError> {
        let l = self.get_type(lhs);
        let r = self.get_type(rhs);
        match (&l, &r) {
            (TypeRef::Infer { ivar: Some(a), .. }, TypeRef::Infer { ivar: Some(b), .. }) => {
                self.ivar_unify(*a, *b);
                Ok(())
            }
            (TypeRef::Infer { ivar: Some(v), .. }, other) | (other, TypeRef::Infer { ivar: Some(v), .. }) => {
                self.set_ivar_to(*v, other.clone());
                Ok(())
            }
            (TypeRef::Primitive(a), TypeRef::Primitive(b)) if a == b => Ok(()),
            (TypeRef::Diverge, _) | (_, TypeRef::Diverge) => Ok(()),
            (TypeRef::Tuple(a), TypeRef::Tuple(b)) if a.len() == b.len() => {
                for (x, y) in a.iter().zip(b) {
                    self.equate_types(x, y)?;
                }
                Ok(())
            }
            (
                TypeRef::Array { inner: ai, size: asz },
                TypeRef::Array { inner: bi, size: bsz },
            ) => {
                self.equate_types(ai, bi)?;
                self.equate_const_generics(asz, bsz)
            }
            (TypeRef::Slice { inner: a }, TypeRef::Slice { inner: b }) => self.equate_types(a, b),
            (
                TypeRef::Borrow { mutability: ma, inner: a, .. },
                TypeRef::Borrow { mutability: mb, inner: b, .. },
            ) if ma == mb => self.equate_types(a, b),
            // `&mut T` coerces to `&T` in a context expecting the latter.
            (
                TypeRef::Borrow { mutability: Mutability::Mut, inner: a, .. },
                TypeRef::Borrow { mutability: Mutability::Shared, inner: b, .. },
            ) => self.equate_types(a, b),
            (
                TypeRef::Pointer { inner: a, .. },
                TypeRef::Pointer { inner: b, .. },
            ) => self.equate_types(a, b),
            (
                TypeRef::Function { args: aa, ret: ar, .. },
                TypeRef::Function { args: ba, ret: br, .. },
            ) if aa.len() == ba.len() => {
                for (x, y) in aa.iter().zip(ba) {
                    self.equate_types(x, y)?;
                }
                self.equate_types(ar, br)
            }
            (TypeRef::Path(a), TypeRef::Path(b)) => self.equate_paths(a, b),
            (a, b) if structurally_equal(a, b) => Ok(()),
            _ => Err(LowerError::bug(Span::DUMMY, format!("cannot equate {} with {}", l, r))),
        }
    }

    fn equate_paths(&mut self, a: &hir_def::path::Path, b: &hir_def::path::Path) -> Result<(), LowerError> {
        use hir_def::path::Path;
        match (a, b) {
            (Path::Generic(ga), Path::Generic(gb)) if ga.path == gb.path => {
                for (x, y) in ga.params.types.iter().zip(&gb.params.types) {
                    self.equate_types(x, y)?;
                }
                Ok(())
            }
            _ if a == b => Ok(()),
            _ => Err(LowerError::bug(Span::DUMMY, "path mismatch during equality propagation")),
        }
    }

    fn equate_const_generics(&mut self, a: &ConstGeneric, b: &ConstGeneric) -> Result<(), LowerError> {
        let a = self.get_value(a);
        let b = self.get_value(b);
        match (&a, &b) {
            (ConstGeneric::Infer(x), ConstGeneric::Infer(y)) => {
                self.ivar_val_unify(*x, *y);
                Ok(())
            }
            (ConstGeneric::Infer(x), ConstGeneric::Known(v)) | (ConstGeneric::Known(v), ConstGeneric::Infer(x)) => {
                self.set_ivar_val_to(*x, *v);
                Ok(())
            }
            (ConstGeneric::Known(x), ConstGeneric::Known(y)) if x == y => Ok(()),
            (ConstGeneric::Param(x), ConstGeneric::Param(y)) if x == y => Ok(()),
            _ => Err(LowerError::bug(Span::DUMMY, "array-length mismatch during equality propagation")),
        }
    }
}

fn path_params_of(p: &hir_def::path::Path) -> Option<&hir_def::path::PathParams> {
    use hir_def::path::Path;
    match p {
        Path::Generic(g) => Some(&g.params),
        Path::UfcsInherent { params, .. } | Path::UfcsKnown { params, .. } | Path::UfcsUnknown { params, .. } => {
            Some(params)
        }
    }
}

/// Plain structural equality, ignoring ivar resolution (callers that already
/// called `get_type` on both sides use this as the final fallback).
pub fn structurally_equal(a: &TypeRef, b: &TypeRef) -> bool {
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ivar_unify_then_get_type_agrees() {
        let mut ctx = InferCtxt::new();
        let a = match ctx.new_ivar(InferClass::None) {
            TypeRef::Infer { ivar: Some(v), .. } => v,
            _ => unreachable!(),
        };
        let b = match ctx.new_ivar(InferClass::None) {
            TypeRef::Infer { ivar: Some(v), .. } => v,
            _ => unreachable!(),
        };
        ctx.ivar_unify(a, b);
        ctx.set_ivar_to(a, TypeRef::Primitive(Primitive::U8));
        assert_eq!(
            ctx.get_type(&TypeRef::Infer { ivar: Some(a), class: InferClass::None }),
            ctx.get_type(&TypeRef::Infer { ivar: Some(b), class: InferClass::None })
        );
    }

    #[test]
    fn apply_defaults_resolves_integer_class() {
        let mut ctx = InferCtxt::new();
        let v = ctx.new_ivar(InferClass::Integer);
        ctx.apply_defaults();
        assert_eq!(ctx.get_type(&v), TypeRef::Primitive(Primitive::I32));
    }

    #[test]
    fn equate_concrete_mismatch_errors() {
        let mut ctx = InferCtxt::new();
        let err = ctx.equate_types(&TypeRef::Primitive(Primitive::I32), &TypeRef::Primitive(Primitive::U8));
        assert!(err.is_err());
    }
}
