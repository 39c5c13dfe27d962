//! Pass H — vtable synthesis (spec §4.7). For every object-safe trait,
//! synthesizes a `<TraitName>#vtable` struct (drop glue, erased size/align,
//! one fn-pointer field per dispatchable method in declaration order of the
//! trait and its supertraits, one pointer field per supertrait) and records
//! its shape on `Trait::vtable`.
//!
//! A trait's own method signatures reference its own `Self` type; this repo
//! models that the same way closure extraction's `SELF_SLOT` models "the
//! current `self` variable" — a sentinel index (`SELF_TYPE_PARAM`) distinct
//! from every real, densely-numbered generic parameter, rather than adding a
//! sixteenth `TypeRef` variant just for this one pass.
//!
//! Supertrait vtables are built before their children's (`build_trait`
//! recurses into `parent_traits` first), so by the time a trait's own fields
//! are assembled every parent's `VTableInfo` already has its own, fully
//! resolved `type_indexes`/`value_indexes` available to read from. That
//! replaces the original's two-stage "placeholder then `FixupVisitor`"
//! design: nothing here is ever left as a placeholder needing a second pass.

use rustc_hash::FxHashMap;

use hir_def::{
    diagnostics::RecursionStack,
    expr::ReceiverKind,
    generics::{GenericBound, GenericParams, TypeParamData},
    item::{Crate, Function, Module, Struct, StructFields, StructMarkings, Trait, VTableInfo},
    lang_item::LangItem,
    name::Name,
    path::{GenericPath, Path, PathParams, SimplePath, TraitPath},
    target::Edition,
    ty::{Abi, GenericRef, LifetimeRef, Mutability, Primitive, TypeRef},
};

/// Stands in for "this trait's own `Self` type" inside a method signature.
/// `u32::MAX` is never produced by real generic-parameter numbering (which
/// is always dense, starting at 0), the same reasoning `closures.rs`'s
/// `SELF_SLOT` sentinel relies on for variable slots.
const SELF_TYPE_PARAM: u32 = u32::MAX;

pub fn synthesize_vtables(krate: &mut Crate) {
    let _s = profile::span("hir_expand::synthesize_vtables");
    let edition = krate.edition;
    let crate_name = krate.name.clone();
    let trait_paths = collect_traits(&krate.root, &[]);
    let mut memo: FxHashMap<Name, Option<(Struct, VTableInfo)>> = FxHashMap::default();
    let mut stack = RecursionStack::new(64);
    for (module_path, name) in &trait_paths {
        build_trait(krate, edition, &crate_name, module_path, name, &mut memo, &mut stack);
    }
    for (module_path, name) in &trait_paths {
        if let Some(Some((vtable_struct, info))) = memo.get(name) {
            let module = module_at_mut(&mut krate.root, module_path);
            module.structs.insert(vtable_struct_name(name), vtable_struct.clone());
            module.traits.get_mut(name).expect("vtable synthesis: stale trait name").vtable = Some(info.clone());
        }
    }
}

fn vtable_struct_name(trait_name: &Name) -> Name {
    Name::new(format!("{}#vtable", trait_name.as_str()))
}

fn collect_traits(module: &Module, prefix: &[Name]) -> Vec<(Vec<Name>, Name)> {
    let mut out: Vec<(Vec<Name>, Name)> = module.traits.keys().map(|n| (prefix.to_vec(), n.clone())).collect();
    for (name, sub) in &module.submodules {
        let mut next = prefix.to_vec();
        next.push(name.clone());
        out.extend(collect_traits(sub, &next));
    }
    out
}

fn module_at_mut<'m>(root: &'m mut Module, path: &[Name]) -> &'m mut Module {
    let mut m = root;
    for seg in path {
        m = m.submodules.get_mut(seg).expect("vtable synthesis: stale module path");
    }
    m
}

fn find_trait_by_name<'c>(module: &'c Module, name: &Name) -> Option<(Vec<Name>, &'c Trait)> {
    if let Some(t) = module.traits.get(name) {
        return Some((Vec::new(), t));
    }
    for (seg, sub) in &module.submodules {
        if let Some((mut path, t)) = find_trait_by_name(sub, name) {
            path.insert(0, seg.clone());
            return Some((path, t));
        }
    }
    None
}

/// Builds (and memoizes) the vtable of `name`, recursing into its
/// supertraits first. `None` means "not object-safe": either a genuine ATY
/// or method-name collision between two parents (spec §4.7 step 5's
/// closing rule), or a cycle in `parent_traits` (malformed input this repo
/// has no front end to have rejected earlier).
fn build_trait(
    krate: &Crate,
    edition: Edition,
    crate_name: &Name,
    module_path: &[Name],
    name: &Name,
    memo: &mut FxHashMap<Name, Option<(Struct, VTableInfo)>>,
    stack: &mut RecursionStack<Name>,
) -> Option<(Struct, VTableInfo)> {
    if let Some(cached) = memo.get(name) {
        return cached.clone();
    }
    let guard = match stack.enter(name.clone()) {
        Ok(g) => g,
        Err(()) => {
            memo.insert(name.clone(), None);
            return None;
        }
    };
    let trait_ = match find_trait_by_name(&krate.root, name) {
        Some((_, t)) => t,
        None => {
            drop(guard);
            memo.insert(name.clone(), None);
            return None;
        }
    };

    let mut parents = Vec::with_capacity(trait_.parent_traits.len());
    for parent in &trait_.parent_traits {
        let parent_name = parent.path.path.components.last().cloned();
        let built = parent_name.and_then(|n| build_trait(krate, edition, crate_name, module_path, &n, memo, stack));
        parents.push((parent.clone(), built));
    }
    drop(guard);

    let own_path = GenericPath::new(SimplePath { crate_name: crate_name.clone(), components: concat_path(module_path, name) });

    let mut type_indexes: indexmap::IndexMap<Name, usize> = indexmap::IndexMap::new();
    let mut type_provenance: FxHashMap<Name, GenericPath> = FxHashMap::default();
    let mut conflict = false;
    for aty_name in trait_.assoc_types.keys() {
        type_indexes.insert(aty_name.clone(), type_indexes.len());
        type_provenance.insert(aty_name.clone(), own_path.clone());
    }
    for (parent_path, built) in &parents {
        let Some((_, parent_info)) = built else { continue };
        for (aty_name, _) in parent_info.type_indexes.iter() {
            match type_provenance.get(aty_name) {
                Some(existing) if existing != &parent_path.path => conflict = true,
                Some(_) => {}
                None => {
                    type_indexes.insert(aty_name.clone(), type_indexes.len());
                    type_provenance.insert(aty_name.clone(), parent_path.path.clone());
                }
            }
        }
    }

    let mut fields: indexmap::IndexMap<Name, TypeRef> = indexmap::IndexMap::new();
    fields.insert(Name::new("drop"), drop_glue_ty());
    fields.insert(Name::new("size"), TypeRef::Primitive(Primitive::Usize));
    fields.insert(Name::new("align"), TypeRef::Primitive(Primitive::Usize));

    let mut value_indexes: indexmap::IndexMap<Name, (usize, GenericPath)> = indexmap::IndexMap::new();
    for (method_name, method) in trait_.methods.iter() {
        if !is_object_safe_method(method, edition, krate) {
            continue;
        }
        let slot = fields.len();
        fields.insert(method_name.clone(), method_vtable_ty(method, &type_indexes));
        value_indexes.insert(method_name.clone(), (slot, own_path.clone()));
    }
    for (_parent_path, built) in &parents {
        let Some((parent_struct, parent_info)) = built else { continue };
        for (method_name, (_, source)) in parent_info.value_indexes.iter() {
            match value_indexes.get(method_name) {
                Some((_, existing)) if existing != source => conflict = true,
                Some(_) => {}
                None => {
                    // Re-derive this inherited method's vtable entry type
                    // from the parent's own struct field rather than
                    // recomputing it from the (possibly deeply nested)
                    // original trait's method, since the parent's struct
                    // already expresses it in terms of the parent's own
                    // (already-merged-into-ours) type-index numbering.
                    let slot = fields.len();
                    if let Some(ty) = parent_info_field_ty(parent_struct, method_name) {
                        fields.insert(method_name.clone(), ty);
                    }
                    value_indexes.insert(method_name.clone(), (slot, source.clone()));
                }
            }
        }
    }

    if conflict {
        memo.insert(name.clone(), None);
        return None;
    }

    let parent_vtables_start = fields.len();
    for (parent_path, built) in &parents {
        let field_name = Name::new(format!("parent#{}", parent_path.path.path.components.last().map(|n| n.as_str()).unwrap_or("?")));
        let ty = match built {
            Some((_, parent_info)) => parent_vtable_ptr_ty(parent_info, &type_indexes),
            None => TypeRef::UNIT,
        };
        fields.insert(field_name, ty);
    }

    let generics = GenericParams {
        lifetimes: Vec::new(),
        types: type_indexes.keys().map(|aty| TypeParamData { name: Name::new(format!("a#{}", aty.as_str())), default: None, is_sized: true }).collect(),
        values: Vec::new(),
        bounds: Vec::new(),
    };
    let struct_ = Struct { generics, fields: StructFields::Named(fields), markings: StructMarkings::default() };
    let struct_path = Path::Generic(GenericPath::new(SimplePath { crate_name: crate_name.clone(), components: concat_path(module_path, &vtable_struct_name(name)) }));
    let info = VTableInfo { struct_path: Some(struct_path), value_indexes, type_indexes, parent_vtables_start };
    let result = Some((struct_, info));
    memo.insert(name.clone(), result.clone());
    result
}

fn concat_path(prefix: &[Name], last: &Name) -> Vec<Name> {
    let mut v = prefix.to_vec();
    v.push(last.clone());
    v
}

/// Re-reads an already-built parent struct's own field type for `method_name`
/// so an inherited method's vtable entry matches the parent's encoding
/// exactly (its ATY generics are already expressed in the parent's own
/// `a#Name` type-parameter slots, which `parent_vtable_ptr_ty` below maps
/// onto the child's numbering at the pointer-field boundary instead of
/// needing every inherited method's type re-derived here too).
fn parent_info_field_ty(parent_struct: &Struct, method_name: &Name) -> Option<TypeRef> {
    match &parent_struct.fields {
        StructFields::Named(map) => map.get(method_name).cloned(),
        _ => None,
    }
}

fn drop_glue_ty() -> TypeRef {
    TypeRef::Function {
        is_unsafe: true,
        abi: Abi::Rust,
        args: vec![TypeRef::Pointer { mutability: Mutability::Mut, inner: Box::new(TypeRef::UNIT) }],
        ret: Box::new(TypeRef::UNIT),
    }
}

fn method_vtable_ty(method: &Function, type_indexes: &indexmap::IndexMap<Name, usize>) -> TypeRef {
    let mut args = Vec::with_capacity(method.args.len() + 1);
    args.push(TypeRef::UNIT); // the `Self` argument, erased (spec §4.7 step 2.4).
    args.extend(method.args.iter().map(|p| substitute_aty(&p.ty, type_indexes)));
    TypeRef::Function { is_unsafe: method.is_unsafe, abi: Abi::Rust, args, ret: Box::new(substitute_aty(&method.ret_ty, type_indexes)) }
}

/// Builds the `&ParentVtable<…>` pointer field type for an object-safe
/// parent, binding the parent struct's own `a#Name` type parameters (in its
/// own declaration order) to this trait's type-index numbering for the same
/// associated-type name — the one-pass substitute for the original's
/// separate `FixupVisitor` post-pass.
fn parent_vtable_ptr_ty(parent_info: &VTableInfo, child_type_indexes: &indexmap::IndexMap<Name, usize>) -> TypeRef {
    let params = parent_info
        .type_indexes
        .keys()
        .map(|aty_name| {
            let idx = child_type_indexes.get(aty_name).copied().unwrap_or(0);
            TypeRef::Generic(GenericRef::Param(idx as u32))
        })
        .collect();
    let path = match &parent_info.struct_path {
        Some(Path::Generic(gp)) => {
            GenericPath { path: gp.path.clone(), params: PathParams { lifetimes: Vec::new(), types: params, consts: Vec::new() } }
        }
        _ => GenericPath::new(SimplePath { crate_name: Name::new("self"), components: Vec::new() }),
    };
    TypeRef::Borrow {
        mutability: Mutability::Shared,
        lifetime: LifetimeRef::Static,
        inner: Box::new(TypeRef::Path(Box::new(Path::Generic(path)))),
    }
}

/// Replaces every `<Self as Tr>::Name` projection reachable inside `ty` with
/// the densely-numbered generic parameter this vtable struct reserves for
/// that associated type. Every other node is left alone; eligible methods
/// never reference bare `Self` outside the (implicit, already-erased)
/// receiver, by construction of `is_object_safe_method` below.
fn substitute_aty(ty: &TypeRef, type_indexes: &indexmap::IndexMap<Name, usize>) -> TypeRef {
    match ty {
        TypeRef::Path(p) => match &**p {
            Path::UfcsKnown { ty: self_ty, item, .. } if is_self_type(self_ty) => {
                match type_indexes.get(item) {
                    Some(idx) => TypeRef::Generic(GenericRef::Param(*idx as u32)),
                    None => ty.clone(),
                }
            }
            _ => ty.clone(),
        },
        TypeRef::Array { inner, size } => TypeRef::Array { inner: Box::new(substitute_aty(inner, type_indexes)), size: size.clone() },
        TypeRef::Slice { inner } => TypeRef::Slice { inner: Box::new(substitute_aty(inner, type_indexes)) },
        TypeRef::Tuple(tys) => TypeRef::Tuple(tys.iter().map(|t| substitute_aty(t, type_indexes)).collect()),
        TypeRef::Borrow { mutability, lifetime, inner } => {
            TypeRef::Borrow { mutability: *mutability, lifetime: lifetime.clone(), inner: Box::new(substitute_aty(inner, type_indexes)) }
        }
        TypeRef::Pointer { mutability, inner } => TypeRef::Pointer { mutability: *mutability, inner: Box::new(substitute_aty(inner, type_indexes)) },
        other => other.clone(),
    }
}

fn is_self_type(ty: &TypeRef) -> bool {
    matches!(ty, TypeRef::Generic(GenericRef::Param(p)) if *p == SELF_TYPE_PARAM)
}

fn references_self(ty: &TypeRef) -> bool {
    match ty {
        TypeRef::Generic(GenericRef::Param(p)) => *p == SELF_TYPE_PARAM,
        TypeRef::Array { inner, .. } | TypeRef::Slice { inner } | TypeRef::Borrow { inner, .. } | TypeRef::Pointer { inner, .. } => references_self(inner),
        TypeRef::Tuple(tys) => tys.iter().any(references_self),
        TypeRef::Function { args, ret, .. } => args.iter().any(references_self) || references_self(ret),
        TypeRef::Path(p) => match &**p {
            Path::UfcsKnown { ty, .. } | Path::UfcsInherent { ty, .. } | Path::UfcsUnknown { ty, .. } => references_self(ty),
            Path::Generic(gp) => gp.params.types.iter().any(references_self),
        },
        _ => false,
    }
}

fn has_self_sized_bound(method: &Function, krate: &Crate) -> bool {
    let Some(sized_path) = krate.lang_items.get(LangItem::Sized) else { return false };
    method.generics.bounds.iter().any(|b| match b {
        GenericBound::Trait { ty, trait_ } => is_self_type(ty) && trait_.path.path == sized_path.path,
        _ => false,
    })
}

fn is_object_safe_method(method: &Function, edition: Edition, krate: &Crate) -> bool {
    let Some(receiver) = method.receiver else { return false }; // free (associated) function
    if !method.generics.types.is_empty() || !method.generics.values.is_empty() {
        return false; // generic method
    }
    if receiver == ReceiverKind::Value && !edition.allows_value_receiver_object_safety() {
        return false;
    }
    if has_self_sized_bound(method, krate) {
        return false;
    }
    if method.args.iter().any(|p| references_self(&p.ty)) || references_self(&method.ret_ty) {
        return false; // signature references Self outside the receiver
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use hir_def::{name::Name, path::SimplePath};
    use indexmap::IndexMap;
    use test_utils::empty_crate;

    fn self_ty() -> TypeRef {
        TypeRef::Generic(GenericRef::Param(SELF_TYPE_PARAM))
    }

    #[test]
    fn object_safe_trait_gets_a_vtable_struct() {
        let mut krate = empty_crate();
        let mut methods = IndexMap::new();
        methods.insert(
            Name::new("area"),
            Function {
                generics: Default::default(),
                receiver: Some(ReceiverKind::BorrowShared),
                args: Vec::new(),
                ret_ty: TypeRef::Primitive(Primitive::U32),
                body: None,
                is_const: false,
                is_unsafe: false,
                erased_types: Vec::new(),
            },
        );
        krate.root.traits.insert(
            Name::new("Shape"),
            Trait { generics: Default::default(), parent_traits: Vec::new(), methods, assoc_types: IndexMap::new(), consts: IndexMap::new(), is_marker: false, vtable: None },
        );
        synthesize_vtables(&mut krate);
        let t = &krate.root.traits[&Name::new("Shape")];
        let info = t.vtable.as_ref().expect("Shape should be object-safe");
        assert!(info.value_indexes.contains_key(&Name::new("area")));
        assert!(krate.root.structs.contains_key(&Name::new("Shape#vtable")));
    }

    #[test]
    fn generic_method_is_excluded_from_the_vtable() {
        let mut krate = empty_crate();
        let mut generics = GenericParams::default();
        generics.types.push(hir_def::generics::TypeParamData { name: Name::new("U"), default: None, is_sized: true });
        let mut methods = IndexMap::new();
        methods.insert(
            Name::new("convert"),
            Function { generics, receiver: Some(ReceiverKind::BorrowShared), args: Vec::new(), ret_ty: TypeRef::UNIT, body: None, is_const: false, is_unsafe: false, erased_types: Vec::new() },
        );
        krate.root.traits.insert(
            Name::new("Conv"),
            Trait { generics: Default::default(), parent_traits: Vec::new(), methods, assoc_types: IndexMap::new(), consts: IndexMap::new(), is_marker: false, vtable: None },
        );
        synthesize_vtables(&mut krate);
        let info = krate.root.traits[&Name::new("Conv")].vtable.as_ref().unwrap();
        assert!(!info.value_indexes.contains_key(&Name::new("convert")));
    }

    #[test]
    fn method_returning_bare_self_is_excluded() {
        let mut krate = empty_crate();
        let mut methods = IndexMap::new();
        methods.insert(
            Name::new("clone_self"),
            Function { generics: Default::default(), receiver: Some(ReceiverKind::BorrowShared), args: Vec::new(), ret_ty: self_ty(), body: None, is_const: false, is_unsafe: false, erased_types: Vec::new() },
        );
        krate.root.traits.insert(
            Name::new("Dup"),
            Trait { generics: Default::default(), parent_traits: Vec::new(), methods, assoc_types: IndexMap::new(), consts: IndexMap::new(), is_marker: false, vtable: None },
        );
        synthesize_vtables(&mut krate);
        let info = krate.root.traits[&Name::new("Dup")].vtable.as_ref().unwrap();
        assert!(!info.value_indexes.contains_key(&Name::new("clone_self")));
    }

    #[test]
    fn supertrait_method_is_inherited_into_the_child_vtable() {
        let mut krate = empty_crate();
        let mut parent_methods = IndexMap::new();
        parent_methods.insert(
            Name::new("base"),
            Function { generics: Default::default(), receiver: Some(ReceiverKind::BorrowShared), args: Vec::new(), ret_ty: TypeRef::UNIT, body: None, is_const: false, is_unsafe: false, erased_types: Vec::new() },
        );
        krate.root.traits.insert(
            Name::new("Base"),
            Trait { generics: Default::default(), parent_traits: Vec::new(), methods: parent_methods, assoc_types: IndexMap::new(), consts: IndexMap::new(), is_marker: false, vtable: None },
        );
        let base_path = TraitPath::new(GenericPath::new(SimplePath { crate_name: krate.name.clone(), components: vec![Name::new("Base")] }));
        krate.root.traits.insert(
            Name::new("Child"),
            Trait { generics: Default::default(), parent_traits: vec![base_path], methods: IndexMap::new(), assoc_types: IndexMap::new(), consts: IndexMap::new(), is_marker: false, vtable: None },
        );
        synthesize_vtables(&mut krate);
        let info = krate.root.traits[&Name::new("Child")].vtable.as_ref().unwrap();
        assert!(info.value_indexes.contains_key(&Name::new("base")));
    }
}
