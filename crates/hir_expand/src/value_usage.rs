//! Pass B — value usage annotation (spec §4.4). Walks every body tagging
//! each `ExprNode.usage` with how its *parent* consumes its result
//! (`Borrow`/`Mutate`/`Move`), so closure/generator extraction (pass C) can
//! decide capture mode without re-deriving it. Runs before extraction, so
//! closure and generator bodies are still attached and get annotated too.

use hir_def::{
    expr::{BorrowType, ExprKind, ExprNode, ReceiverKind, TraitUsed, ValueUsage},
    item::{Crate, Module, Struct},
    path::{Path, SimplePath},
    pattern::{BindingMode, Pattern, PatternKind},
    ty::TypeRef,
};
use hir_ty::{InferCtxt, TraitResolver};

use crate::body_walk;

/// Runs pass B over every body in the crate.
pub fn annotate_usage(krate: &mut Crate) {
    let _s = profile::span("hir_expand::annotate_usage");
    body_walk::for_each_body(krate, |krate, _target, body| {
        let resolver = TraitResolver::new(krate);
        let mut infer = InferCtxt::new();
        let mut ann = Annotator { resolver, infer: &mut infer };
        ann.visit(body, ValueUsage::Move);
    });
}

fn find_struct<'a>(module: &'a Module, path: &SimplePath) -> Option<&'a Struct> {
    if let Some(last) = path.components.last() {
        if let Some(s) = module.structs.get(last) {
            return Some(s);
        }
    }
    module.submodules.values().find_map(|m| find_struct(m, path))
}

struct Annotator<'a> {
    resolver: TraitResolver<'a>,
    infer: &'a mut InferCtxt,
}

impl<'a> Annotator<'a> {
    fn is_copy(&mut self, ty: &TypeRef) -> bool {
        self.resolver.type_is_copy(self.infer, ty).is_equal()
    }

    /// Usage a `Field`/`Index`/non-pointer `Deref` pushes onto its inner
    /// `value`: unchanged, except a `Move` context on a `Copy` result only
    /// needs a read.
    fn narrow_for_projection(&mut self, ctx: ValueUsage, result_ty: &TypeRef) -> ValueUsage {
        if ctx == ValueUsage::Move && self.is_copy(result_ty) {
            ValueUsage::Borrow
        } else {
            ctx
        }
    }

    /// §4.4's pattern-derived usage: what a `let`/match arm pattern demands
    /// of the value it binds against. A bare `Move`-mode binding is kept as
    /// `Move`: without per-subpattern type information we can't tell a
    /// `Copy` binding from a non-`Copy` one here, and `Move` is the safe
    /// upper bound (closure extraction over-capturing by value is sound,
    /// just occasionally more than strictly necessary).
    fn pattern_usage(&mut self, pattern: &Pattern) -> ValueUsage {
        let binding_usage = match &pattern.binding {
            Some(b) => match b.mode {
                BindingMode::Move => ValueUsage::Move,
                BindingMode::MutRef => ValueUsage::Mutate,
                BindingMode::Ref => ValueUsage::Borrow,
            },
            None => ValueUsage::Borrow,
        };
        let structural_usage = match &pattern.kind {
            PatternKind::Any
            | PatternKind::Value(_)
            | PatternKind::Range { .. }
            | PatternKind::StructValue { .. }
            | PatternKind::EnumValue { .. } => ValueUsage::Borrow,
            PatternKind::Box(inner) => self.pattern_usage(inner),
            PatternKind::Ref { inner, .. } => self.pattern_usage(inner),
            PatternKind::Tuple(pats) | PatternKind::Slice(pats) | PatternKind::Or(pats) => {
                pats.iter().fold(ValueUsage::Borrow, |acc, p| acc.combine(self.pattern_usage(p)))
            }
            PatternKind::StructTuple { args, .. } | PatternKind::EnumTuple { args, .. } => {
                args.iter().fold(ValueUsage::Borrow, |acc, p| acc.combine(self.pattern_usage(p)))
            }
            PatternKind::Struct { fields, .. } | PatternKind::EnumStruct { fields, .. } => {
                fields.iter().fold(ValueUsage::Borrow, |acc, (_, p)| acc.combine(self.pattern_usage(p)))
            }
            PatternKind::SplitTuple { before, after } => {
                before.iter().chain(after.iter()).fold(ValueUsage::Borrow, |acc, p| acc.combine(self.pattern_usage(p)))
            }
            PatternKind::SplitSlice { before, mid, after } => {
                let mut acc = before
                    .iter()
                    .chain(after.iter())
                    .fold(ValueUsage::Borrow, |acc, p| acc.combine(self.pattern_usage(p)));
                if let Some(mid) = mid {
                    acc = acc.combine(self.pattern_usage(mid));
                }
                acc
            }
        };
        binding_usage.combine(structural_usage)
    }

    /// Visits `node` under usage context `ctx` (how `node`'s parent consumes
    /// it), tags `node.usage`, and recurses with the per-edge contexts §4.4
    /// assigns each child.
    fn visit(&mut self, node: &mut ExprNode, ctx: ValueUsage) {
        node.usage = ctx;
        let result_ty = node.ty.clone();
        match &mut node.kind {
            ExprKind::Tombstone
            | ExprKind::Literal(_)
            | ExprKind::UnitVariant { .. }
            | ExprKind::PathValue { .. }
            | ExprKind::Variable { .. }
            | ExprKind::ConstParam { .. } => {}

            ExprKind::Block { stmts, result } => {
                for s in stmts.iter_mut() {
                    self.visit(s, ValueUsage::Move);
                }
                if let Some(r) = result {
                    self.visit(r, ctx);
                }
            }
            ExprKind::Asm { inputs, outputs, .. } => {
                for (_, v) in inputs {
                    self.visit(v, ValueUsage::Move);
                }
                for (_, v) in outputs {
                    self.visit(v, ValueUsage::Mutate);
                }
            }
            ExprKind::Return(v) => {
                if let Some(v) = v {
                    self.visit(v, ValueUsage::Move);
                }
            }
            ExprKind::Let { pattern, value, .. } => {
                let usage = self.pattern_usage(pattern);
                self.visit(value, usage);
            }
            ExprKind::Loop { body, .. } => self.visit(body, ValueUsage::Move),
            ExprKind::LoopControl { value, .. } => {
                if let Some(v) = value {
                    self.visit(v, ValueUsage::Move);
                }
            }
            ExprKind::Match { value, arms } => {
                let scrutinee_usage =
                    arms.iter().fold(ValueUsage::Unknown, |acc, arm| acc.combine(self.pattern_usage(&arm.pattern)));
                self.visit(value, scrutinee_usage);
                for arm in arms {
                    if let Some(guard) = &mut arm.guard {
                        self.visit(guard, ValueUsage::Move);
                    }
                    self.visit(&mut arm.body, ctx);
                }
            }
            ExprKind::If { cond, then_, else_ } => {
                self.visit(cond, ValueUsage::Move);
                self.visit(then_, ctx);
                if let Some(e) = else_ {
                    self.visit(e, ctx);
                }
            }
            ExprKind::Assign { lhs, rhs, .. } => {
                self.visit(lhs, ValueUsage::Mutate);
                self.visit(rhs, ValueUsage::Move);
            }
            ExprKind::UniOp { value, .. } => self.visit(value, ValueUsage::Move),
            ExprKind::Borrow { ty, value } => {
                let usage = match ty {
                    BorrowType::Shared => ValueUsage::Borrow,
                    BorrowType::Unique => ValueUsage::Mutate,
                    BorrowType::Owned => ValueUsage::Move,
                };
                self.visit(value, usage);
            }
            ExprKind::BinOp { op, lhs, rhs } => {
                let usage = if op.is_comparison() { ValueUsage::Borrow } else { ValueUsage::Move };
                self.visit(lhs, usage);
                self.visit(rhs, usage);
            }
            ExprKind::Cast { value, .. } => self.visit(value, ValueUsage::Move),
            ExprKind::Unsize { value, .. } => self.visit(value, ValueUsage::Move),
            ExprKind::Index { value, index } => {
                let inner_usage = self.narrow_for_projection(ctx, &result_ty);
                self.visit(index, ValueUsage::Move);
                self.visit(value, inner_usage);
            }
            ExprKind::Deref { value } => {
                let inner_usage = if matches!(value.ty, TypeRef::Pointer { .. }) {
                    ValueUsage::Borrow
                } else {
                    self.narrow_for_projection(ctx, &result_ty)
                };
                self.visit(value, inner_usage);
            }
            ExprKind::Emplace { value } => self.visit(value, ValueUsage::Move),
            ExprKind::Field { value, .. } => {
                let inner_usage = self.narrow_for_projection(ctx, &result_ty);
                self.visit(value, inner_usage);
            }
            ExprKind::TupleVariant { args, .. } => {
                for a in args {
                    self.visit(a, ValueUsage::Move);
                }
            }
            ExprKind::CallPath { args, .. } => {
                for a in args {
                    self.visit(a, ValueUsage::Move);
                }
            }
            ExprKind::CallValue { value, args, trait_used } => {
                let recv_usage = match trait_used {
                    TraitUsed::Fn => ValueUsage::Borrow,
                    TraitUsed::FnMut => ValueUsage::Mutate,
                    TraitUsed::FnOnce | TraitUsed::Unknown => ValueUsage::Move,
                };
                self.visit(value, recv_usage);
                for a in args {
                    self.visit(a, ValueUsage::Move);
                }
            }
            ExprKind::CallMethod { value, args, receiver, .. } => {
                let recv_usage = match receiver {
                    ReceiverKind::Value | ReceiverKind::Box => ValueUsage::Move,
                    ReceiverKind::BorrowUnique => ValueUsage::Mutate,
                    ReceiverKind::BorrowShared => ValueUsage::Borrow,
                };
                self.visit(value, recv_usage);
                for a in args {
                    self.visit(a, ValueUsage::Move);
                }
            }
            ExprKind::StructLiteral { path, fields, base } => {
                for (_, v) in fields.iter_mut() {
                    self.visit(v, ValueUsage::Move);
                }
                if let Some(b) = base {
                    let usage = self.base_usage(path, fields);
                    self.visit(b, usage);
                }
            }
            ExprKind::UnionLiteral { value, .. } => self.visit(value, ValueUsage::Move),
            ExprKind::Tuple { vals } | ExprKind::ArrayList { vals } => {
                for v in vals {
                    self.visit(v, ValueUsage::Move);
                }
            }
            ExprKind::ArraySized { value, .. } => self.visit(value, ValueUsage::Move),
            ExprKind::Closure(c) => {
                if let Some(body) = &mut c.body {
                    self.visit(body, ValueUsage::Move);
                }
            }
            ExprKind::Generator(g) => {
                if let Some(body) = &mut g.body {
                    self.visit(body, ValueUsage::Move);
                }
            }
        }
    }

    /// §4.4: a struct literal's `..base` only needs `Move` if some field the
    /// literal omits is non-`Copy` (its value has to be moved out of `base`
    /// to fill the gap); otherwise a `Borrow` read of the remaining fields
    /// suffices.
    fn base_usage(&mut self, path: &Path, fields: &[(hir_def::name::Name, ExprNode)]) -> ValueUsage {
        let gp = match path {
            Path::Generic(gp) => gp,
            _ => return ValueUsage::Move,
        };
        let def = find_struct(&self.resolver.krate.root, &gp.path);
        let all_fields = match def.map(|s| &s.fields) {
            Some(hir_def::item::StructFields::Named(named)) => named,
            _ => return ValueUsage::Move,
        };
        let named: std::collections::HashSet<_> = fields.iter().map(|(n, _)| n.clone()).collect();
        for (name, ty) in all_fields {
            if named.contains(name) {
                continue;
            }
            if !self.is_copy(ty) {
                return ValueUsage::Move;
            }
        }
        ValueUsage::Borrow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hir_def::{
        expr::{BinOp as HirBinOp, ExprKind as EK, ExprNode},
        ty::{Primitive, TypeRef as Ty},
    };
    use hir_ty::{InferCtxt, TraitResolver};

    fn resolver_for<'a>(krate: &'a Crate) -> (TraitResolver<'a>, InferCtxt) {
        (TraitResolver::new(krate), InferCtxt::new())
    }

    #[test]
    fn comparison_borrows_both_operands() {
        let krate = test_utils::empty_crate();
        let (resolver, mut infer) = resolver_for(&krate);
        let mut ann = Annotator { resolver, infer: &mut infer };
        let mut node = ExprNode::new(
            Ty::Primitive(Primitive::Bool),
            EK::BinOp {
                op: HirBinOp::Lt,
                lhs: Box::new(ExprNode::new(Ty::Primitive(Primitive::I32), EK::Literal(hir_def::expr::Literal::Integer(1)))),
                rhs: Box::new(ExprNode::new(Ty::Primitive(Primitive::I32), EK::Literal(hir_def::expr::Literal::Integer(2)))),
            },
        );
        ann.visit(&mut node, ValueUsage::Move);
        if let EK::BinOp { lhs, rhs, .. } = &node.kind {
            assert_eq!(lhs.usage, ValueUsage::Borrow);
            assert_eq!(rhs.usage, ValueUsage::Borrow);
        } else {
            unreachable!()
        }
    }

    #[test]
    fn arithmetic_moves_both_operands() {
        let krate = test_utils::empty_crate();
        let (resolver, mut infer) = resolver_for(&krate);
        let mut ann = Annotator { resolver, infer: &mut infer };
        let mut node = ExprNode::new(
            Ty::Primitive(Primitive::I32),
            EK::BinOp {
                op: HirBinOp::Add,
                lhs: Box::new(ExprNode::new(Ty::Primitive(Primitive::I32), EK::Literal(hir_def::expr::Literal::Integer(1)))),
                rhs: Box::new(ExprNode::new(Ty::Primitive(Primitive::I32), EK::Literal(hir_def::expr::Literal::Integer(2)))),
            },
        );
        ann.visit(&mut node, ValueUsage::Move);
        if let EK::BinOp { lhs, rhs, .. } = &node.kind {
            assert_eq!(lhs.usage, ValueUsage::Move);
            assert_eq!(rhs.usage, ValueUsage::Move);
        } else {
            unreachable!()
        }
    }

    #[test]
    fn assign_lhs_is_mutate_rhs_is_move() {
        let krate = test_utils::empty_crate();
        let (resolver, mut infer) = resolver_for(&krate);
        let mut ann = Annotator { resolver, infer: &mut infer };
        let mut node = ExprNode::new(
            Ty::UNIT,
            EK::Assign {
                op: None,
                lhs: Box::new(ExprNode::new(Ty::Primitive(Primitive::I32), EK::Variable { slot: 0, name: hir_def::name::Name::new("x") })),
                rhs: Box::new(ExprNode::new(Ty::Primitive(Primitive::I32), EK::Literal(hir_def::expr::Literal::Integer(3)))),
            },
        );
        ann.visit(&mut node, ValueUsage::Move);
        if let EK::Assign { lhs, rhs, .. } = &node.kind {
            assert_eq!(lhs.usage, ValueUsage::Mutate);
            assert_eq!(rhs.usage, ValueUsage::Move);
        } else {
            unreachable!()
        }
    }
}
