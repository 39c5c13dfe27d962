//! HIR-to-HIR middle-end expansion (spec §4): the nine ordered passes that
//! take a parsed-and-resolved `Crate` and lower it to the shape the backend
//! expects — constants folded, closures extracted, erased types resolved,
//! borrows explicit, method calls collapsed to paths, vtables synthesized,
//! lifetimes resolved.
//!
//! This crate only exposes the driver-facing entry points (spec §6); each
//! pass's own module documents its grounding and any accepted
//! simplifications. `hir` re-exports these for the rest of the workspace.

pub mod body_walk;
pub mod closures;
pub mod const_eval;
pub mod erased_types;
pub mod lifetime_infer;
pub mod reborrow;
pub mod ufcs;
pub mod value_usage;
pub mod vtable;

use hir_def::item::Crate;

/// Pass B (§4.4): tag every expression with how its parent consumes it.
pub fn hir_expand_annotate_usage(krate: &mut Crate) {
    value_usage::annotate_usage(krate);
}

/// Pass C (§4.5): extract closures and generators into standalone structs.
pub fn hir_expand_closures(krate: &mut Crate) {
    closures::extract_closures(krate);
}

/// Pass D (§4.11): replace every `impl Trait` occurrence with its concrete
/// substitution.
pub fn hir_expand_erased_type(krate: &mut Crate) {
    erased_types::substitute_erased_types(krate);
}

/// Pass E (§4.8, second half): promote borrows of constant values to
/// lifted `static`s.
pub fn hir_expand_static_borrow_constants(krate: &mut Crate) {
    const_eval::promote_static_borrows(krate);
}

/// Pass F (§4.9): insert explicit reborrows where an l-value of `&mut T`
/// would otherwise be moved out from under its owner.
pub fn hir_expand_reborrows(krate: &mut Crate) {
    reborrow::insert_reborrows(krate);
}

/// Pass G (§4.10): collapse every method/value call into a direct path
/// call.
pub fn hir_expand_ufcs_everything(krate: &mut Crate) {
    ufcs::rewrite_ufcs(krate);
}

/// Pass H (§4.7): synthesize a vtable struct for every object-safe trait.
pub fn hir_expand_vtables(krate: &mut Crate) {
    vtable::synthesize_vtables(krate);
}

/// Pass I (§4.6): infer and validate every lifetime left unresolved by the
/// front end.
pub fn hir_expand_lifetime_infer(krate: &mut Crate) {
    lifetime_infer::infer_lifetimes(krate);
}

/// Pass A (§4.8, first half): fully evaluate every `const`/`static`
/// initializer and enum discriminant.
pub fn convert_hir_constant_evaluate_full(krate: &mut Crate) {
    const_eval::evaluate_constants_full(krate);
}

/// Runs every pass in pipeline order (§4's A→B→C→D→E→F→G→H→I, the order
/// `main_bindings.cpp` drives the original's individual passes in). The
/// driver is free to call the individual `hir_expand_*`/
/// `convert_hir_*` entry points itself instead; this is the common case
/// wired up once for convenience.
///
/// Spec §6 also mentions per-expression re-entry points (e.g.
/// `HIR_Expand_Closures_Expr`) for later passes that synthesize brand-new
/// expressions needing renormalization. No pass downstream of C ever
/// constructs a new `Closure`/`Generator` node from scratch in this port,
/// so none of those re-entry points have a caller here; add one next to
/// the pass it re-enters if that ever changes.
pub fn run_full_pipeline(krate: &mut Crate) {
    convert_hir_constant_evaluate_full(krate);
    hir_expand_annotate_usage(krate);
    hir_expand_closures(krate);
    hir_expand_erased_type(krate);
    hir_expand_static_borrow_constants(krate);
    hir_expand_reborrows(krate);
    hir_expand_ufcs_everything(krate);
    hir_expand_vtables(krate);
    hir_expand_lifetime_infer(krate);
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::empty_crate;

    #[test]
    fn full_pipeline_runs_over_an_empty_crate() {
        let mut krate = empty_crate();
        run_full_pipeline(&mut krate);
        assert!(krate.diagnostics.is_empty());
    }
}
