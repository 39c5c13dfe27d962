//! Shared machinery for passes that need to query the trait resolver (which
//! borrows the crate immutably) while rewriting an expression body (which
//! needs a mutable handle into the very same crate). `TraitResolver<'a>`
//! holds `&'a Crate`, so a pass can't hold a live resolver and a `&mut Crate`
//! walk open at the same time.
//!
//! The fix used throughout `hir_expand`: collect every body's location first
//! (a read-only scan), then for each one, `take()` the body out into an owned
//! value with a short mutable borrow, drop that borrow, build the resolver
//! against `&Crate` and rewrite the now-ownerless body, and finally reinsert
//! it with another short mutable borrow. At no point is `&Crate` and
//! `&mut Crate` alive simultaneously.

use hir_def::{
    expr::ExprNode,
    generics::GenericParams,
    item::{Crate, TraitImplId, TypeImplId},
    name::Name,
};

/// Where a body-bearing item lives, recorded during the read-only scan so it
/// can be revisited twice (once to take, once to put back) without holding
/// any borrow across the gap.
#[derive(Debug, Clone)]
pub enum BodyOwner {
    ModuleFn { path: Vec<Name>, name: Name },
    ModuleStatic { path: Vec<Name>, name: Name },
    ModuleConst { path: Vec<Name>, name: Name },
    TypeImplFn { id: TypeImplId, name: Name },
    TypeImplConst { id: TypeImplId, name: Name },
    TraitImplFn { id: TraitImplId, name: Name },
    TraitImplConst { id: TraitImplId, name: Name },
    TraitMethod { path: Vec<Name>, trait_name: Name, method: Name },
    TraitConst { path: Vec<Name>, trait_name: Name, const_name: Name },
}

/// The generics a body's bound cache should be built from: its own, plus (if
/// it belongs to an impl or trait) the owner's.
pub struct BodyGenerics {
    pub own: GenericParams,
    pub owner: Option<GenericParams>,
}

/// One unit of work: where the body lives, and what generics apply to it.
pub struct BodyTarget {
    pub owner: BodyOwner,
    pub generics: BodyGenerics,
}

fn module_at<'m>(root: &'m hir_def::item::Module, path: &[Name]) -> &'m hir_def::item::Module {
    let mut m = root;
    for seg in path {
        m = &m.submodules[seg];
    }
    m
}

fn module_at_mut<'m>(root: &'m mut hir_def::item::Module, path: &[Name]) -> &'m mut hir_def::item::Module {
    let mut m = root;
    for seg in path {
        m = m.submodules.get_mut(seg).expect("body_walk: stale module path");
    }
    m
}

fn scan_module(path: &[Name], module: &hir_def::item::Module, out: &mut Vec<BodyTarget>) {
    for (name, f) in &module.functions {
        if f.body.is_some() {
            out.push(BodyTarget {
                owner: BodyOwner::ModuleFn { path: path.to_vec(), name: name.clone() },
                generics: BodyGenerics { own: f.generics.clone(), owner: None },
            });
        }
    }
    for (name, s) in &module.statics {
        if s.init.is_some() {
            out.push(BodyTarget {
                owner: BodyOwner::ModuleStatic { path: path.to_vec(), name: name.clone() },
                generics: BodyGenerics { own: GenericParams::default(), owner: None },
            });
        }
    }
    for (name, c) in &module.consts {
        if c.init.is_some() {
            out.push(BodyTarget {
                owner: BodyOwner::ModuleConst { path: path.to_vec(), name: name.clone() },
                generics: BodyGenerics { own: c.generics.clone(), owner: None },
            });
        }
    }
    for (name, t) in &module.traits {
        for (mname, f) in &t.methods {
            if f.body.is_some() {
                out.push(BodyTarget {
                    owner: BodyOwner::TraitMethod {
                        path: path.to_vec(),
                        trait_name: name.clone(),
                        method: mname.clone(),
                    },
                    generics: BodyGenerics { own: f.generics.clone(), owner: Some(t.generics.clone()) },
                });
            }
        }
        for (cname, c) in &t.consts {
            if c.init.is_some() {
                out.push(BodyTarget {
                    owner: BodyOwner::TraitConst {
                        path: path.to_vec(),
                        trait_name: name.clone(),
                        const_name: cname.clone(),
                    },
                    generics: BodyGenerics { own: c.generics.clone(), owner: Some(t.generics.clone()) },
                });
            }
        }
    }
    for (name, sub) in &module.submodules {
        let mut child = path.to_vec();
        child.push(name.clone());
        scan_module(&child, sub, out);
    }
}

/// Collects every body-bearing item in the crate. Read-only; safe to call
/// while nothing else borrows `krate`.
pub fn collect_targets(krate: &Crate) -> Vec<BodyTarget> {
    let mut out = Vec::new();
    scan_module(&[], &krate.root, &mut out);
    for (id, imp) in krate.type_impls.iter() {
        for (name, f) in &imp.methods {
            if f.body.is_some() {
                out.push(BodyTarget {
                    owner: BodyOwner::TypeImplFn { id, name: name.clone() },
                    generics: BodyGenerics { own: f.generics.clone(), owner: Some(imp.generics.clone()) },
                });
            }
        }
        for (name, c) in &imp.consts {
            if c.init.is_some() {
                out.push(BodyTarget {
                    owner: BodyOwner::TypeImplConst { id, name: name.clone() },
                    generics: BodyGenerics { own: c.generics.clone(), owner: Some(imp.generics.clone()) },
                });
            }
        }
    }
    for (id, imp) in krate.trait_impls.iter() {
        for (name, f) in &imp.methods {
            if f.body.is_some() {
                out.push(BodyTarget {
                    owner: BodyOwner::TraitImplFn { id, name: name.clone() },
                    generics: BodyGenerics { own: f.generics.clone(), owner: Some(imp.generics.clone()) },
                });
            }
        }
        for (name, c) in &imp.consts {
            if c.init.is_some() {
                out.push(BodyTarget {
                    owner: BodyOwner::TraitImplConst { id, name: name.clone() },
                    generics: BodyGenerics { own: c.generics.clone(), owner: Some(imp.generics.clone()) },
                });
            }
        }
    }
    out
}

/// Takes the body out, leaving a tombstone-empty `None` in its place. The
/// mutable borrow this needs ends as soon as the function returns.
pub fn take_body(krate: &mut Crate, owner: &BodyOwner) -> Option<Box<ExprNode>> {
    match owner {
        BodyOwner::ModuleFn { path, name } => {
            module_at_mut(&mut krate.root, path).functions.get_mut(name)?.body.take()
        }
        BodyOwner::ModuleStatic { path, name } => {
            module_at_mut(&mut krate.root, path).statics.get_mut(name)?.init.take()
        }
        BodyOwner::ModuleConst { path, name } => {
            module_at_mut(&mut krate.root, path).consts.get_mut(name)?.init.take()
        }
        BodyOwner::TypeImplFn { id, name } => krate.type_impls[*id].methods.get_mut(name)?.body.take(),
        BodyOwner::TypeImplConst { id, name } => krate.type_impls[*id].consts.get_mut(name)?.init.take(),
        BodyOwner::TraitImplFn { id, name } => krate.trait_impls[*id].methods.get_mut(name)?.body.take(),
        BodyOwner::TraitImplConst { id, name } => krate.trait_impls[*id].consts.get_mut(name)?.init.take(),
        BodyOwner::TraitMethod { path, trait_name, method } => module_at_mut(&mut krate.root, path)
            .traits
            .get_mut(trait_name)?
            .methods
            .get_mut(method)?
            .body
            .take(),
        BodyOwner::TraitConst { path, trait_name, const_name } => module_at_mut(&mut krate.root, path)
            .traits
            .get_mut(trait_name)?
            .consts
            .get_mut(const_name)?
            .init
            .take(),
    }
}

/// Reinserts a processed body into the slot it was taken from.
pub fn put_body(krate: &mut Crate, owner: &BodyOwner, body: Box<ExprNode>) {
    let slot: &mut Option<Box<ExprNode>> = match owner {
        BodyOwner::ModuleFn { path, name } => &mut module_at_mut(&mut krate.root, path).functions[name].body,
        BodyOwner::ModuleStatic { path, name } => &mut module_at_mut(&mut krate.root, path).statics[name].init,
        BodyOwner::ModuleConst { path, name } => &mut module_at_mut(&mut krate.root, path).consts[name].init,
        BodyOwner::TypeImplFn { id, name } => &mut krate.type_impls[*id].methods[name].body,
        BodyOwner::TypeImplConst { id, name } => &mut krate.type_impls[*id].consts[name].init,
        BodyOwner::TraitImplFn { id, name } => &mut krate.trait_impls[*id].methods[name].body,
        BodyOwner::TraitImplConst { id, name } => &mut krate.trait_impls[*id].consts[name].init,
        BodyOwner::TraitMethod { path, trait_name, method } => {
            &mut module_at_mut(&mut krate.root, path).traits[trait_name].methods[method].body
        }
        BodyOwner::TraitConst { path, trait_name, const_name } => {
            &mut module_at_mut(&mut krate.root, path).traits[trait_name].consts[const_name].init
        }
    };
    *slot = Some(body);
}

/// Runs `f` over every body-bearing item in the crate: collect targets, then
/// for each one take/process/put-back so `f` can hold a live `&Crate`
/// resolver alongside the owned body it mutates.
pub fn for_each_body(krate: &mut Crate, mut f: impl FnMut(&Crate, &BodyTarget, &mut ExprNode)) {
    let targets = collect_targets(krate);
    for target in targets {
        let mut body = match take_body(krate, &target.owner) {
            Some(b) => b,
            None => continue,
        };
        f(krate, &target, &mut body);
        put_body(krate, &target.owner, body);
    }
}

/// Read-only access to the module a target's function/static/const lives
/// directly in, for passes that need to inspect (not mutate) siblings (e.g.
/// to check a name isn't already taken before minting a fresh one).
pub fn owning_module<'m>(krate: &'m Crate, path: &[Name]) -> &'m hir_def::item::Module {
    module_at(&krate.root, path)
}
