//! Per-function bound cache (spec §4.3.3): a table from `(type, trait path)`
//! to the bound's payload, built once per function body by walking the
//! owning function's generics, the owning impl's generics, and the
//! signature's types for implicit bounds (`&'a T` implies `T: 'a`).
//!
//! Also carries the "bound closure": `(valid-for, outlives-lifetime)` pairs,
//! extended to a transitive-closure fixed point, consumed by lifetime
//! inference's phase 3 validation (§4.6.4) to look up a direct outlives edge
//! between two named lifetimes.

use rustc_hash::FxHashMap;

use hir_def::{
    generics::{GenericBound, GenericParams},
    path::TraitPath,
    ty::{LifetimeRef, TypeRef},
};

#[derive(Debug, Clone)]
pub struct CachedBound {
    pub trait_: TraitPath,
}

#[derive(Debug, Default)]
pub struct BoundCache {
    by_type: FxHashMap<TypeRef, Vec<CachedBound>>,
    /// `valid-for` lifetime -> lifetimes it is known to outlive, closed
    /// transitively (spec §4.3.3 "bound closure").
    outlives: FxHashMap<LifetimeRef, Vec<LifetimeRef>>,
    /// Explicit `where T: 'a`-style bounds (`GenericBound::TypeOutlives`),
    /// keyed by `T`. Lifetime inference's phase 1 enumeration reads this to
    /// push an outlives edge from every lifetime reachable inside `T` to
    /// `'a` wherever `T` is enumerated (spec §4.6.1).
    type_outlives: FxHashMap<TypeRef, Vec<LifetimeRef>>,
}

impl BoundCache {
    /// Builds the cache for one function body: its own generics plus (if
    /// supplied) the owning impl block's generics.
    pub fn build(fn_generics: &GenericParams, impl_generics: Option<&GenericParams>) -> BoundCache {
        let mut cache = BoundCache::default();
        if let Some(g) = impl_generics {
            cache.absorb(g);
        }
        cache.absorb(fn_generics);
        cache.close_outlives();
        cache
    }

    fn absorb(&mut self, params: &GenericParams) {
        for bound in &params.bounds {
            match bound {
                GenericBound::Trait { ty, trait_ } => {
                    self.by_type.entry(ty.clone()).or_default().push(CachedBound { trait_: trait_.clone() });
                }
                GenericBound::Lifetime { lhs, outlives } => {
                    self.outlives.entry(lhs.clone()).or_default().push(outlives.clone());
                }
                GenericBound::TypeOutlives { ty, outlives } => {
                    self.type_outlives.entry(ty.clone()).or_default().push(outlives.clone());
                }
                GenericBound::TypeEquality { .. } => {
                    // Not needed by lifetime inference or the resolver's
                    // generic-bounds lookup.
                }
            }
        }
    }

    /// Iteratively extends `outlives` to a fixed point: if `a: b` and
    /// `b: c` are both known, record `a: c`.
    fn close_outlives(&mut self) {
        loop {
            let mut additions = Vec::new();
            for (a, bs) in &self.outlives {
                for b in bs {
                    if let Some(cs) = self.outlives.get(b) {
                        for c in cs {
                            if c != a && !bs.contains(c) {
                                additions.push((a.clone(), c.clone()));
                            }
                        }
                    }
                }
            }
            if additions.is_empty() {
                break;
            }
            for (a, c) in additions {
                let entry = self.outlives.entry(a).or_default();
                if !entry.contains(&c) {
                    entry.push(c);
                }
            }
        }
    }

    /// Every cached bound on `ty`, for the resolver's "generic bounds" step
    /// (spec §4.2.2 step 3) and EAT's bound-table fallback (§4.2.6 step 7).
    pub fn bounds_on(&self, ty: &TypeRef) -> &[CachedBound] {
        self.by_type.get(ty).map_or(&[], |v| v.as_slice())
    }

    /// A direct (possibly transitively-closed) outlives edge between two
    /// named lifetimes, used by lifetime-validation phase 3 (§4.6.4).
    pub fn outlives_direct(&self, shorter_bound_of: &LifetimeRef, target: &LifetimeRef) -> bool {
        shorter_bound_of == target
            || self.outlives.get(shorter_bound_of).map_or(false, |v| v.contains(target))
    }

    /// Every lifetime an explicit `where ty: 'a` bound requires `ty` to
    /// outlive, read by lifetime inference's phase 1 enumeration (§4.6.1).
    pub fn type_outlives_on(&self, ty: &TypeRef) -> &[LifetimeRef] {
        self.type_outlives.get(ty).map_or(&[], |v| v.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hir_def::name::Name;

    #[test]
    fn outlives_closes_transitively() {
        let a = LifetimeRef::Named(Name::new("a"));
        let b = LifetimeRef::Named(Name::new("b"));
        let c = LifetimeRef::Named(Name::new("c"));
        let mut params = GenericParams::default();
        params.bounds.push(GenericBound::Lifetime { lhs: a.clone(), outlives: b.clone() });
        params.bounds.push(GenericBound::Lifetime { lhs: b.clone(), outlives: c.clone() });
        let cache = BoundCache::build(&params, None);
        assert!(cache.outlives_direct(&a, &c));
    }

    #[test]
    fn explicit_type_outlives_bound_is_retained() {
        use hir_def::ty::{Primitive, TypeRef};

        let a = LifetimeRef::Named(Name::new("a"));
        let ty = TypeRef::Primitive(Primitive::I32);
        let mut params = GenericParams::default();
        params.bounds.push(GenericBound::TypeOutlives { ty: ty.clone(), outlives: a.clone() });
        let cache = BoundCache::build(&params, None);
        assert_eq!(cache.type_outlives_on(&ty), &[a]);
    }
}
