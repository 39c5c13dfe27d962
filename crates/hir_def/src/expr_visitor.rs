//! The expression visitor (spec §4.1 "a separate expression visitor with one
//! hook per node kind and a single 'visit node pointer' entry that the
//! default bodies use to recurse"). Every `hir_expand` pass implements
//! `ExprVisitor`, overriding only the node kinds it cares about and calling
//! [`walk_expr`] to recurse into the rest — the same shape as mrustc's
//! `ExprVisitor_Mark`/`ExprVisitor_Mutate`/`ExprVisitor_Extract` hierarchy,
//! collapsed into one trait since Rust has no virtual dispatch tax for it.

use crate::expr::{ClosureNode, ExprKind, ExprNode, GeneratorNode, MatchArm};

pub trait ExprVisitor {
    /// The single entry point every default body recurses through; node
    /// kinds are matched here, and overriding this instead of the specific
    /// hooks below gives full control (used by rewrite passes that replace
    /// nodes by kind, e.g. reborrow insertion, UFCS rewriting).
    fn visit_node(&mut self, node: &mut ExprNode) {
        walk_expr(self, node);
    }

    fn visit_block(&mut self, stmts: &mut [ExprNode], result: &mut Option<Box<ExprNode>>) {
        for s in stmts.iter_mut() {
            self.visit_node(s);
        }
        if let Some(r) = result {
            self.visit_node(r);
        }
    }

    fn visit_closure(&mut self, closure: &mut ClosureNode) {
        if let Some(body) = &mut closure.body {
            self.visit_node(body);
        }
    }

    fn visit_generator(&mut self, generator: &mut GeneratorNode) {
        if let Some(body) = &mut generator.body {
            self.visit_node(body);
        }
    }

    fn visit_match_arm(&mut self, arm: &mut MatchArm) {
        if let Some(guard) = &mut arm.guard {
            self.visit_node(guard);
        }
        self.visit_node(&mut arm.body);
    }
}

/// Default recursive walk, shared by every `ExprVisitor` impl that hasn't
/// overridden `visit_node` for a particular node kind.
pub fn walk_expr<EV: ExprVisitor + ?Sized>(ev: &mut EV, node: &mut ExprNode) {
    match &mut node.kind {
        ExprKind::Tombstone => {}
        ExprKind::Block { stmts, result } => {
            ev.visit_block(stmts, result);
        }
        ExprKind::Asm { inputs, outputs, .. } => {
            for (_, v) in inputs.iter_mut().chain(outputs.iter_mut()) {
                ev.visit_node(v);
            }
        }
        ExprKind::Return(v) => {
            if let Some(v) = v {
                ev.visit_node(v);
            }
        }
        ExprKind::Let { value, .. } => ev.visit_node(value),
        ExprKind::Loop { body, .. } => ev.visit_node(body),
        ExprKind::LoopControl { value, .. } => {
            if let Some(v) = value {
                ev.visit_node(v);
            }
        }
        ExprKind::Match { value, arms } => {
            ev.visit_node(value);
            for arm in arms {
                ev.visit_match_arm(arm);
            }
        }
        ExprKind::If { cond, then_, else_ } => {
            ev.visit_node(cond);
            ev.visit_node(then_);
            if let Some(e) = else_ {
                ev.visit_node(e);
            }
        }
        ExprKind::Assign { lhs, rhs, .. } => {
            ev.visit_node(lhs);
            ev.visit_node(rhs);
        }
        ExprKind::UniOp { value, .. } => ev.visit_node(value),
        ExprKind::Borrow { value, .. } => ev.visit_node(value),
        ExprKind::BinOp { lhs, rhs, .. } => {
            ev.visit_node(lhs);
            ev.visit_node(rhs);
        }
        ExprKind::Cast { value, .. } => ev.visit_node(value),
        ExprKind::Unsize { value, .. } => ev.visit_node(value),
        ExprKind::Index { value, index } => {
            ev.visit_node(value);
            ev.visit_node(index);
        }
        ExprKind::Deref { value } => ev.visit_node(value),
        ExprKind::Emplace { value } => ev.visit_node(value),
        ExprKind::Field { value, .. } => ev.visit_node(value),
        ExprKind::TupleVariant { args, .. } => {
            for a in args {
                ev.visit_node(a);
            }
        }
        ExprKind::CallPath { args, .. } => {
            for a in args {
                ev.visit_node(a);
            }
        }
        ExprKind::CallValue { value, args, .. } => {
            ev.visit_node(value);
            for a in args {
                ev.visit_node(a);
            }
        }
        ExprKind::CallMethod { value, args, .. } => {
            ev.visit_node(value);
            for a in args {
                ev.visit_node(a);
            }
        }
        ExprKind::Literal(_) => {}
        ExprKind::UnitVariant { .. } => {}
        ExprKind::PathValue { .. } => {}
        ExprKind::Variable { .. } => {}
        ExprKind::ConstParam { .. } => {}
        ExprKind::StructLiteral { fields, base, .. } => {
            for (_, v) in fields {
                ev.visit_node(v);
            }
            if let Some(b) = base {
                ev.visit_node(b);
            }
        }
        ExprKind::UnionLiteral { value, .. } => ev.visit_node(value),
        ExprKind::Tuple { vals } | ExprKind::ArrayList { vals } => {
            for v in vals {
                ev.visit_node(v);
            }
        }
        ExprKind::ArraySized { value, .. } => ev.visit_node(value),
        ExprKind::Closure(c) => ev.visit_closure(c),
        ExprKind::Generator(g) => ev.visit_generator(g),
    }
}
