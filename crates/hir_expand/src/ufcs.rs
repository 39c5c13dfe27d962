//! Pass G — UFCS rewriting (spec §4.10). `x.foo(a)` and `f(a)` (where `f` is
//! not a bare function pointer) both collapse to the same shape the rest of
//! the pipeline and the C backend want to see: a direct path call with the
//! receiver folded into the argument list.
//!
//! Method resolution here is grounded on
//! `hir_ty::resolver::TraitResolver::autoderef_find_method` /
//! `inherent_method`, which only searches `krate.type_impls`. Trait-provided
//! methods get the same treatment inline below (`trait_method`), scanning
//! `krate.trait_impls` for a type match at each autoderef depth — the same
//! plain type-equality check `inherent_method` itself uses, not a full
//! resolver query. A generic receiver whose method comes through a bound
//! rather than a concrete impl is out of scope; `autoderef_find_method`
//! already carries that same limitation.

use hir_def::{
    expr::{ExprKind, ExprNode, TraitUsed},
    expr_visitor::{walk_expr, ExprVisitor},
    item::Crate,
    lang_item::LangItem,
    name::Name,
    path::Path,
    ty::TypeRef,
};
use hir_ty::{bounds::BoundCache, InferCtxt, TraitResolver};

use crate::body_walk;

pub fn rewrite_ufcs(krate: &mut Crate) {
    let _s = profile::span("hir_expand::rewrite_ufcs");
    body_walk::for_each_body(krate, |krate, target, body| {
        let resolver = TraitResolver::new(krate);
        let bounds = BoundCache::build(&target.generics.own, target.generics.owner.as_ref());
        let mut infer = InferCtxt::new();
        let mut rw = UfcsRewriter { resolver, bounds, infer: &mut infer };
        rw.visit_node(body);
    });
}

struct UfcsRewriter<'a> {
    resolver: TraitResolver<'a>,
    bounds: BoundCache,
    infer: &'a mut InferCtxt,
}

impl<'a> ExprVisitor for UfcsRewriter<'a> {
    fn visit_node(&mut self, node: &mut ExprNode) {
        walk_expr(self, node);
        match &mut node.kind {
            ExprKind::CallMethod { .. } => self.rewrite_call_method(node),
            ExprKind::CallValue { .. } => self.rewrite_call_value(node),
            _ => {}
        }
    }
}

impl<'a> UfcsRewriter<'a> {
    fn rewrite_call_method(&mut self, node: &mut ExprNode) {
        let ExprKind::CallMethod { value, method, args, .. } = std::mem::take(&mut node.kind) else { unreachable!() };
        let path = self
            .resolver
            .autoderef_find_method(self.infer, &self.bounds, &value.ty, &method)
            .map(|(_, p)| p)
            .or_else(|| self.trait_method(&value.ty, &method))
            .unwrap_or_else(|| {
                // No concrete impl found (generic receiver dispatched through a
                // bound): keep a best-effort inherent-style path so the rest of
                // the pipeline still has something to print/monomorphise later.
                Path::UfcsInherent {
                    ty: Box::new(value.ty.clone()),
                    impl_params: Default::default(),
                    params: Default::default(),
                    item: method.clone(),
                }
            });
        let mut call_args = Vec::with_capacity(args.len() + 1);
        call_args.push(*value);
        call_args.extend(args);
        node.kind = ExprKind::CallPath { path, args: call_args };
    }

    /// Scans `krate.trait_impls` at each autoderef depth for a trait impl
    /// whose `ty` matches exactly and whose trait declares `name`, mirroring
    /// `TraitResolver::inherent_method`'s own type-equality shortcut.
    fn trait_method(&mut self, top: &TypeRef, name: &Name) -> Option<Path> {
        let mut ty = self.infer.get_type(top);
        for _ in 0..32u32 {
            for (_, imp) in self.resolver.krate.trait_impls.iter() {
                if imp.ty == ty && imp.methods.contains_key(name) {
                    return Some(Path::UfcsKnown {
                        ty: Box::new(ty.clone()),
                        trait_: imp.trait_.path.clone(),
                        params: Default::default(),
                        item: name.clone(),
                    });
                }
            }
            match self.resolver.autoderef(self.infer, &self.bounds, &ty) {
                Some(next) => ty = next,
                None => break,
            }
        }
        None
    }

    fn rewrite_call_value(&mut self, node: &mut ExprNode) {
        let ExprKind::CallValue { value, args, trait_used } = std::mem::take(&mut node.kind) else { unreachable!() };
        if matches!(value.ty, TypeRef::Function { .. }) {
            // Direct function-pointer call: nothing to collapse, put it back.
            node.kind = ExprKind::CallValue { value, args, trait_used };
            return;
        }
        let (lang, method) = match trait_used {
            TraitUsed::Fn => (LangItem::Fn, "call"),
            TraitUsed::FnMut => (LangItem::FnMut, "call_mut"),
            TraitUsed::FnOnce => (LangItem::FnOnce, "call_once"),
            TraitUsed::Unknown => self.infer_closure_class(&value.ty),
        };
        let trait_path = match self.resolver.krate.lang_items.get(lang) {
            Some(p) => p.clone(),
            None => {
                // Lang item never registered (e.g. a hand-rolled test crate):
                // leave the call untouched rather than emit an unresolvable path.
                node.kind = ExprKind::CallValue { value, args, trait_used };
                return;
            }
        };
        let mut call_args = Vec::with_capacity(args.len() + 1);
        call_args.push(*value.clone());
        call_args.extend(args);
        node.kind = ExprKind::CallPath {
            path: Path::UfcsKnown {
                ty: Box::new(value.ty.clone()),
                trait_: trait_path,
                params: Default::default(),
                item: Name::new(method),
            },
            args: call_args,
        };
    }

    /// `trait_used` wasn't resolved by the front end: fall back to whichever
    /// of `Fn`/`FnMut`/`FnOnce` the synthesized closure struct actually
    /// implements, preferring the least-restrictive trait first.
    fn infer_closure_class(&self, ty: &TypeRef) -> (LangItem, &'static str) {
        for (lang, method) in [(LangItem::Fn, "call"), (LangItem::FnMut, "call_mut"), (LangItem::FnOnce, "call_once")] {
            if let Some(trait_path) = self.resolver.krate.lang_items.get(lang) {
                let implements = self
                    .resolver
                    .krate
                    .trait_impls
                    .iter()
                    .any(|(_, imp)| &imp.ty == ty && imp.trait_.path.path == trait_path.path);
                if implements {
                    return (lang, method);
                }
            }
        }
        (LangItem::FnOnce, "call_once")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hir_def::{
        expr::Literal,
        item::{Function, Param, Struct, StructFields, StructMarkings, TraitImpl},
        name::Name,
        path::{GenericPath, SimplePath, TraitPath},
        pattern::Pattern,
    };
    use test_utils::empty_crate;

    #[test]
    fn call_method_resolves_to_inherent_ufcs_path() {
        let mut krate = empty_crate();
        let struct_name = Name::new("S");
        krate.root.structs.insert(struct_name.clone(), Struct { generics: Default::default(), fields: StructFields::Unit, markings: StructMarkings::default() });
        let self_ty = TypeRef::Path(Box::new(Path::Generic(GenericPath::new(SimplePath { crate_name: krate.name.clone(), components: vec![struct_name.clone()] }))));
        let mut imp = hir_def::item::TypeImpl { generics: Default::default(), ty: self_ty.clone(), methods: Default::default(), consts: Default::default() };
        imp.methods.insert(Name::new("foo"), Function::declaration(Default::default(), vec![Param { pattern: Pattern::any(), ty: self_ty.clone() }], TypeRef::UNIT));
        krate.add_type_impl(imp);

        let value = ExprNode::new(self_ty.clone(), ExprKind::Literal(Literal::Bool(true)));
        let mut node = ExprNode::new(
            TypeRef::UNIT,
            ExprKind::CallMethod { value: Box::new(value), method: Name::new("foo"), params: Vec::new(), args: Vec::new(), receiver: hir_def::expr::ReceiverKind::Value },
        );
        let resolver = TraitResolver::new(&krate);
        let mut infer = InferCtxt::new();
        let mut rw = UfcsRewriter { resolver, bounds: BoundCache::default(), infer: &mut infer };
        rw.visit_node(&mut node);
        match &node.kind {
            ExprKind::CallPath { path: Path::UfcsInherent { item, .. }, args } => {
                assert_eq!(item.as_str(), "foo");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected CallPath(UfcsInherent), got {:?}", other),
        }
    }

    #[test]
    fn call_value_with_known_fn_trait_rewrites_to_call_path() {
        let mut krate = empty_crate();
        let struct_name = Name::new("Closure0");
        krate.root.structs.insert(struct_name.clone(), Struct { generics: Default::default(), fields: StructFields::Unit, markings: StructMarkings::default() });
        let self_ty = TypeRef::Path(Box::new(Path::Generic(GenericPath::new(SimplePath { crate_name: krate.name.clone(), components: vec![struct_name.clone()] }))));
        let fn_trait_path = GenericPath::new(SimplePath { crate_name: Name::new("core"), components: vec![Name::new("ops"), Name::new("Fn")] });
        krate.lang_items.insert(LangItem::Fn, fn_trait_path.clone());
        let imp = TraitImpl {
            generics: Default::default(),
            trait_: TraitPath::new(fn_trait_path),
            ty: self_ty.clone(),
            methods: Default::default(),
            consts: Default::default(),
            assoc_types: Default::default(),
            is_specialisable: false,
        };
        krate.add_trait_impl(imp);

        let value = ExprNode::new(self_ty.clone(), ExprKind::Literal(Literal::Bool(true)));
        let mut node = ExprNode::new(TypeRef::UNIT, ExprKind::CallValue { value: Box::new(value), args: Vec::new(), trait_used: TraitUsed::Unknown });
        let resolver = TraitResolver::new(&krate);
        let mut infer = InferCtxt::new();
        let mut rw = UfcsRewriter { resolver, bounds: BoundCache::default(), infer: &mut infer };
        rw.visit_node(&mut node);
        match &node.kind {
            ExprKind::CallPath { path: Path::UfcsKnown { item, .. }, args } => {
                assert_eq!(item.as_str(), "call");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected CallPath(UfcsKnown), got {:?}", other),
        }
    }
}
