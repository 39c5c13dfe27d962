//! Lifetime inference state and phases 2-4 (spec §4.6.1, §4.6.3-§4.6.5).
//! Phase 1 (enumerate) walks the HIR body and lives in `hir_expand`'s
//! lifetime pass, which constructs local lifetimes and ivars through this
//! module's `new_local`/`new_ivar`/`equate_lifetimes` and then calls
//! `solve`, `validate`, and `commit` in sequence once the walk is done.
//!
//! Grounded on the same directional-graph shape mrustc's
//! `hir_typeck/expr_cs.cpp` lifetime pass builds, generalized here into an
//! explicit state object rather than fields scattered across a visitor.

use rustc_hash::FxHashMap;

use hir_def::{
    diagnostics::{LowerError, Span},
    ty::{LifetimeRef, TypeRef},
};

use crate::bounds::BoundCache;

/// First id available to local lifetimes (spec §4.6.1).
pub const LOCAL_BASE: u32 = 0x1_0000;
/// First id available to lifetime ivars; everything below this (and at or
/// above `LOCAL_BASE`) is a local lifetime.
pub const MAX_LOCAL: u32 = 0x1000_0000;

#[derive(Debug, Clone)]
pub enum LocalLifetime {
    Composite { members: Vec<LifetimeRef> },
    PatternBinding { borrow_point: Span, value: LifetimeRef, pat: u32 },
    Node { borrow_point: Span, value: LifetimeRef },
}

#[derive(Debug, Clone)]
struct IvarState {
    span: Span,
    resolved: Option<LifetimeRef>,
    sources: Vec<LifetimeRef>,
    destinations: Vec<LifetimeRef>,
    equal_to: Vec<LifetimeRef>,
}

pub struct LifetimeState<'a> {
    bounds: &'a BoundCache,
    locals: Vec<LocalLifetime>,
    ivars: Vec<IvarState>,
    /// Outlives edges discovered structurally during phase 1 (from `&'a T`
    /// substitutions, path params, etc.) in addition to `bounds`'s
    /// generics-derived table. Closed transitively before validate runs.
    local_outlives: FxHashMap<LifetimeRef, Vec<LifetimeRef>>,
}

impl<'a> LifetimeState<'a> {
    pub fn new(bounds: &'a BoundCache) -> LifetimeState<'a> {
        LifetimeState { bounds, locals: Vec::new(), ivars: Vec::new(), local_outlives: FxHashMap::default() }
    }

    // ------------------------------------------------------------------
    // §4.6.1 construction
    // ------------------------------------------------------------------

    pub fn new_local(&mut self, local: LocalLifetime) -> LifetimeRef {
        let id = LOCAL_BASE + self.locals.len() as u32;
        self.locals.push(local);
        LifetimeRef::Local(id)
    }

    pub fn new_ivar(&mut self, span: Span) -> LifetimeRef {
        let id = MAX_LOCAL + self.ivars.len() as u32;
        self.ivars.push(IvarState { span, resolved: None, sources: Vec::new(), destinations: Vec::new(), equal_to: Vec::new() });
        LifetimeRef::Local(id)
    }

    fn ivar_index(&self, lft: &LifetimeRef) -> Option<usize> {
        match lft {
            LifetimeRef::Local(id) if *id >= MAX_LOCAL => Some((*id - MAX_LOCAL) as usize),
            _ => None,
        }
    }

    /// Direct `lhs : 'outlives` assertion between two concrete (non-ivar)
    /// lifetimes, recorded for phase 3 validation.
    pub fn ensure_outlives(&mut self, lhs: LifetimeRef, rhs: LifetimeRef) {
        self.local_outlives.entry(lhs).or_default().push(rhs);
    }

    /// `equate_lifetimes` (spec §4.6.2): if either side is an ivar, record
    /// the source/destination relationship; if both are concrete, assert a
    /// direct (mutual, since equality implies outlives both ways) edge.
    pub fn equate_lifetimes(&mut self, lhs: &LifetimeRef, rhs: &LifetimeRef) {
        match (self.ivar_index(lhs), self.ivar_index(rhs)) {
            (Some(li), _) => {
                self.ivars[li].sources.push(rhs.clone());
            }
            (None, Some(ri)) => {
                self.ivars[ri].destinations.push(lhs.clone());
            }
            (None, None) => {
                self.ensure_outlives(lhs.clone(), rhs.clone());
                self.ensure_outlives(rhs.clone(), lhs.clone());
            }
        }
        if let Some(li) = self.ivar_index(lhs) {
            self.ivars[li].destinations.push(rhs.clone());
        }
        if let Some(ri) = self.ivar_index(rhs) {
            self.ivars[ri].sources.push(lhs.clone());
        }
    }

    /// `get_borrow_lifetime` helper used by phase 1 when descending through
    /// `Field`/`Index`/`Deref` into a place: derefing a borrow propagates
    /// its lifetime, derefing a raw pointer always yields `'static`.
    pub fn deref_place_lifetime(&self, inner: &LifetimeRef, through_raw_pointer: bool) -> LifetimeRef {
        if through_raw_pointer {
            LifetimeRef::Static
        } else {
            inner.clone()
        }
    }

    /// Every lifetime an explicit `where ty: 'a` bound requires `ty` to
    /// outlive (spec §4.6.1), read by phase 1 enumeration.
    pub fn type_outlives_on(&self, ty: &TypeRef) -> &[LifetimeRef] {
        self.bounds.type_outlives_on(ty)
    }

    // ------------------------------------------------------------------
    // §4.6.3 phase 2: solve
    // ------------------------------------------------------------------

    pub fn solve(&mut self) -> Result<(), LowerError> {
        let limit = limit::Limit::new(1000);
        let mut iteration = 0usize;
        loop {
            limit
                .check(iteration)
                .map_err(|_| LowerError::bug(Span::DUMMY, "lifetime solver exceeded 1000 iterations"))?;
            iteration += 1;

            let mut changed = false;
            for idx in 0..self.ivars.len() {
                if self.ivars[idx].resolved.is_some() {
                    continue;
                }
                if let Some(resolved) = self.try_resolve(idx) {
                    self.ivars[idx].resolved = Some(resolved);
                    changed = true;
                }
            }
            if iteration % 64 == 0 {
                self.compact();
            }
            if !changed {
                break;
            }
        }

        if self.ivars.iter().any(|iv| iv.resolved.is_none()) {
            return Err(LowerError::bug(Span::DUMMY, "unresolved lifetime ivar after fixpoint"));
        }
        Ok(())
    }

    /// Applies the four rules of spec §4.6.3 in priority order. Takes
    /// `&mut self` (rather than `&self`) because the last rule may need to
    /// mint a new `Composite` local.
    fn try_resolve(&mut self, idx: usize) -> Option<LifetimeRef> {
        let sources = self.ivars[idx].sources.clone();
        let destinations = self.ivars[idx].destinations.clone();

        if sources.is_empty() {
            return Some(LifetimeRef::Static);
        }
        if sources.len() == 1 && self.ivar_index(&sources[0]).is_none() {
            return Some(sources[0].clone());
        }
        if destinations.len() == 1 && self.ivar_index(&destinations[0]).is_none() {
            return Some(destinations[0].clone());
        }
        if sources.iter().all(|s| self.is_resolved_or_concrete(s)) {
            let mut resolved: Vec<LifetimeRef> = sources.iter().map(|s| self.get_final(s)).collect();
            resolved.sort_by_key(lifetime_sort_key);
            resolved.dedup();
            return Some(match resolved.len() {
                1 => resolved.into_iter().next().unwrap(),
                _ => self.new_local(LocalLifetime::Composite { members: resolved }),
            });
        }
        None
    }

    fn is_resolved_or_concrete(&self, lft: &LifetimeRef) -> bool {
        match self.ivar_index(lft) {
            Some(idx) => self.ivars[idx].resolved.is_some(),
            None => true,
        }
    }

    fn get_final(&self, lft: &LifetimeRef) -> LifetimeRef {
        match self.ivar_index(lft) {
            Some(idx) => self.ivars[idx].resolved.clone().unwrap_or_else(|| lft.clone()),
            None => lft.clone(),
        }
    }

    /// Canonicalizes every source/destination entry through `get_final`, so
    /// later iterations compare already-resolved values instead of chasing
    /// an ivar-to-ivar chain each time (spec §4.6.3 "periodically compact").
    fn compact(&mut self) {
        for idx in 0..self.ivars.len() {
            let sources: Vec<LifetimeRef> = self.ivars[idx].sources.iter().map(|s| self.get_final(s)).collect();
            let destinations: Vec<LifetimeRef> = self.ivars[idx].destinations.iter().map(|d| self.get_final(d)).collect();
            self.ivars[idx].sources = sources;
            self.ivars[idx].destinations = destinations;
        }
    }

    // ------------------------------------------------------------------
    // §4.6.4 phase 3: validate
    // ------------------------------------------------------------------

    /// Checks every ivar's resolved value against its recorded
    /// destinations, accumulating human-readable failures rather than
    /// aborting on the first one.
    pub fn validate(&mut self) -> Vec<String> {
        self.close_local_outlives();
        let mut fails = Vec::new();
        for iv in &self.ivars {
            let resolved = match &iv.resolved {
                Some(r) => r,
                None => continue, // already reported as a Bug by `solve`.
            };
            for dest in &iv.destinations {
                let dest = self.get_final(dest);
                if !self.check_lifetimes(resolved, &dest) {
                    fails.push(format!("{}: '{:?} does not outlive '{:?}", iv.span, resolved, dest));
                }
            }
        }
        fails
    }

    /// `check_lifetimes(lhs, rhs)`: does `lhs` outlive `rhs`?
    fn check_lifetimes(&self, lhs: &LifetimeRef, rhs: &LifetimeRef) -> bool {
        if lhs == rhs || matches!(rhs, LifetimeRef::Static) {
            return true;
        }
        match (self.local_composite_of(lhs), self.local_composite_of(rhs)) {
            (Some(members), _) => members.iter().all(|m| self.check_lifetimes(m, rhs)),
            (None, Some(members)) => members.iter().any(|m| self.check_lifetimes(lhs, m)),
            (None, None) => match (lhs, rhs) {
                (LifetimeRef::Named(_), LifetimeRef::Named(_)) | (LifetimeRef::Static, LifetimeRef::Named(_)) => {
                    self.bounds.outlives_direct(lhs, rhs) || self.local_outlives_direct(lhs, rhs)
                }
                (LifetimeRef::Named(_), LifetimeRef::Local(_)) => false, // param outlived by a local: invalid.
                (LifetimeRef::Local(_), LifetimeRef::Local(_)) => false, // conservative: only identical locals pass.
                _ => false,
            },
        }
    }

    /// Closes `local_outlives` (the structural edges phase 1 records via
    /// `ensure_outlives`, as opposed to `bounds`'s generics-derived table)
    /// to a transitive fixed point. Called once before `validate` runs.
    pub fn close_local_outlives(&mut self) {
        loop {
            let mut additions = Vec::new();
            for (a, bs) in &self.local_outlives {
                for b in bs {
                    if let Some(cs) = self.local_outlives.get(b) {
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
                let entry = self.local_outlives.entry(a).or_default();
                if !entry.contains(&c) {
                    entry.push(c);
                }
            }
        }
    }

    fn local_outlives_direct(&self, a: &LifetimeRef, b: &LifetimeRef) -> bool {
        a == b || self.local_outlives.get(a).map_or(false, |v| v.contains(b))
    }

    fn local_composite_of<'b>(&'b self, lft: &'b LifetimeRef) -> Option<&'b [LifetimeRef]> {
        match lft {
            LifetimeRef::Local(id) if (*id as usize) >= LOCAL_BASE as usize && (*id as usize) < MAX_LOCAL as usize => {
                match self.locals.get((*id - LOCAL_BASE) as usize) {
                    Some(LocalLifetime::Composite { members }) => Some(members.as_slice()),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // §4.6.5 phase 4: commit
    // ------------------------------------------------------------------

    /// Final value for `lft` once solving is done: resolves an ivar to its
    /// value, minimizing a composite to a single member when one strictly
    /// outlives all the others.
    pub fn commit_value(&self, lft: &LifetimeRef) -> LifetimeRef {
        let resolved = self.get_final(lft);
        match self.local_composite_of(&resolved) {
            Some(members) => self.minimize_composite(members),
            None => resolved,
        }
    }

    fn minimize_composite(&self, members: &[LifetimeRef]) -> LifetimeRef {
        for (i, candidate) in members.iter().enumerate() {
            if members.iter().enumerate().all(|(j, other)| i == j || self.check_lifetimes(candidate, other)) {
                return candidate.clone();
            }
        }
        // No unique minimum: keep the composite handle, registering it as a
        // local lifetime if it wasn't already one.
        members.first().cloned().unwrap_or(LifetimeRef::Static)
    }
}

fn lifetime_sort_key(lft: &LifetimeRef) -> u32 {
    match lft {
        LifetimeRef::Static => 0,
        LifetimeRef::Named(n) => 1 + n.as_str().len() as u32,
        LifetimeRef::Local(id) => *id,
        _ => u32::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hir_def::{generics::GenericParams, name::Name};

    #[test]
    fn zero_sources_resolves_to_static() {
        let params = GenericParams::default();
        let bounds = BoundCache::build(&params, None);
        let mut state = LifetimeState::new(&bounds);
        let ivar = state.new_ivar(Span::DUMMY);
        state.solve().unwrap();
        assert_eq!(state.commit_value(&ivar), LifetimeRef::Static);
    }

    #[test]
    fn single_concrete_source_propagates() {
        let params = GenericParams::default();
        let bounds = BoundCache::build(&params, None);
        let mut state = LifetimeState::new(&bounds);
        let ivar = state.new_ivar(Span::DUMMY);
        let named = LifetimeRef::Named(Name::new("a"));
        state.equate_lifetimes(&ivar, &named);
        state.solve().unwrap();
        assert_eq!(state.commit_value(&ivar), named);
    }

    #[test]
    fn named_outlives_named_via_bound_cache() {
        use hir_def::generics::GenericBound;
        let a = LifetimeRef::Named(Name::new("a"));
        let b = LifetimeRef::Named(Name::new("b"));
        let mut params = GenericParams::default();
        params.bounds.push(GenericBound::Lifetime { lhs: a.clone(), outlives: b.clone() });
        let bounds = BoundCache::build(&params, None);
        let state = LifetimeState::new(&bounds);
        assert!(state.check_lifetimes(&a, &b));
        assert!(!state.check_lifetimes(&b, &a));
    }
}
