//! `hir` is the crate an external driver depends on. It is a thin facade:
//! every real pass lives in `hir_expand` (or, for the shared type-system
//! plumbing those passes call into, `hir_ty`); this crate just re-exports
//! the driver-facing entry points (spec §6) and the data types a driver
//! needs to hand in a built `Crate` and read diagnostics back out.
//!
//! `hir_*` crates below this one are written "ECS style" — explicit
//! indexes, arenas, and sum types rather than self-contained objects — the
//! same split the teacher draws between its own `hir_*` implementation
//! crates and this outward-facing one.

pub use hir_def::{
    diagnostics::Diagnostic,
    item::{
        Const, ConstValue, Crate, Enum, EnumVariant, Function, MarkerImpl, Module, Param, Static,
        Struct, StructFields, StructMarkings, Trait, TraitAlias, TraitImpl, TypeImpl, Union,
        VTableInfo,
    },
    lang_item::{LangItem, LangItems},
    name::Name,
    path::{GenericPath, Path, PathParams, SimplePath, TraitPath},
    target::{Edition, TargetSpec},
    ty::{LifetimeRef, TypeRef},
};

pub use hir_expand::{
    convert_hir_constant_evaluate_full, hir_expand_annotate_usage, hir_expand_closures,
    hir_expand_erased_type, hir_expand_lifetime_infer, hir_expand_reborrows,
    hir_expand_static_borrow_constants, hir_expand_ufcs_everything, hir_expand_vtables,
    run_full_pipeline,
};

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::empty_crate;

    #[test]
    fn facade_reexports_are_enough_to_drive_the_full_pipeline() {
        let mut krate: Crate = empty_crate();
        run_full_pipeline(&mut krate);
        assert!(krate.diagnostics.is_empty());
    }
}
