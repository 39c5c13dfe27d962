//! Pass F — reborrow insertion (spec §4.9). Runs after closure extraction
//! and static borrow promotion, so every node it walks is already in its
//! final shape for this purpose: an l-value expression of type `&mut T`
//! handed to a context that would otherwise move it gets wrapped as
//! `&mut *x` instead.

use hir_def::{
    expr::{BorrowType, ExprKind, ExprNode},
    expr_visitor::{walk_expr, ExprVisitor},
    item::Crate,
    ty::{Mutability, TypeRef},
};

use crate::body_walk;

pub fn insert_reborrows(krate: &mut Crate) {
    let _s = profile::span("hir_expand::insert_reborrows");
    body_walk::for_each_body(krate, |_krate, _target, body| {
        let mut rw = Reborrower;
        rw.visit_node(body);
    });
}

/// An l-value shape whose result type is `&mut T`: the only kind of node a
/// move-context would otherwise consume by value instead of reborrowing.
fn is_reborrow_candidate(node: &ExprNode) -> bool {
    let is_lvalue = matches!(
        node.kind,
        ExprKind::Variable { .. } | ExprKind::Field { .. } | ExprKind::Index { .. } | ExprKind::Deref { .. }
    );
    is_lvalue && matches!(&node.ty, TypeRef::Borrow { mutability: Mutability::Mut, .. })
}

/// Rewrites `node` in place from `x` (of type `&mut T`) to `&mut *x`, if it
/// is a reborrow candidate. Leaves every other node untouched.
fn wrap_if_candidate(node: &mut ExprNode) {
    if !is_reborrow_candidate(node) {
        return;
    }
    let ty = node.ty.clone();
    let inner_ty = match &ty {
        TypeRef::Borrow { inner, .. } => (**inner).clone(),
        other => other.clone(),
    };
    let original = node.take();
    let deref = ExprNode::new(inner_ty, ExprKind::Deref { value: Box::new(original) });
    node.ty = ty;
    node.kind = ExprKind::Borrow { ty: BorrowType::Unique, value: Box::new(deref) };
}

/// `Block`'s tail expression is a reborrow site only through the value it
/// produces; `Block`'s own statements are never rewritten directly, so this
/// pass recurses into the tail like any other context instead of wrapping
/// the whole block.
struct Reborrower;

impl ExprVisitor for Reborrower {
    fn visit_node(&mut self, node: &mut ExprNode) {
        match &mut node.kind {
            ExprKind::Cast { value, .. } | ExprKind::Emplace { value } | ExprKind::Unsize { value, .. } => {
                self.visit_node(value);
                wrap_if_candidate(value);
            }
            ExprKind::Assign { rhs, lhs, .. } => {
                self.visit_node(lhs);
                self.visit_node(rhs);
                wrap_if_candidate(rhs);
            }
            ExprKind::CallPath { args, .. } | ExprKind::TupleVariant { args, .. } => {
                for a in args.iter_mut() {
                    self.visit_node(a);
                    wrap_if_candidate(a);
                }
            }
            ExprKind::CallValue { value, args, .. } => {
                self.visit_node(value);
                for a in args.iter_mut() {
                    self.visit_node(a);
                    wrap_if_candidate(a);
                }
            }
            ExprKind::CallMethod { value, args, .. } => {
                self.visit_node(value);
                for a in args.iter_mut() {
                    self.visit_node(a);
                    wrap_if_candidate(a);
                }
            }
            ExprKind::StructLiteral { fields, base, .. } => {
                for (_, v) in fields.iter_mut() {
                    self.visit_node(v);
                    wrap_if_candidate(v);
                }
                if let Some(b) = base {
                    self.visit_node(b);
                }
            }
            ExprKind::Tuple { vals } | ExprKind::ArrayList { vals } => {
                for v in vals.iter_mut() {
                    self.visit_node(v);
                    wrap_if_candidate(v);
                }
            }
            _ => walk_expr(self, node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hir_def::{
        expr::Literal,
        name::Name,
        ty::LifetimeRef,
    };

    fn mut_ref_ty() -> TypeRef {
        TypeRef::Borrow { mutability: Mutability::Mut, lifetime: LifetimeRef::Infer, inner: Box::new(TypeRef::Primitive(hir_def::ty::Primitive::I32)) }
    }

    #[test]
    fn mut_ref_arg_gets_reborrowed() {
        let var = ExprNode::new(mut_ref_ty(), ExprKind::Variable { slot: 0, name: Name::new("x") });
        let mut call = ExprNode::new(
            TypeRef::UNIT,
            ExprKind::CallPath { path: hir_def::path::Path::Generic(hir_def::path::GenericPath::new(hir_def::path::SimplePath { crate_name: Name::new("test"), components: vec![Name::new("f")] })), args: vec![var] },
        );
        let mut rw = Reborrower;
        rw.visit_node(&mut call);
        if let ExprKind::CallPath { args, .. } = &call.kind {
            assert!(matches!(args[0].kind, ExprKind::Borrow { ty: BorrowType::Unique, .. }));
        } else {
            panic!("expected CallPath");
        }
    }

    #[test]
    fn non_mut_ref_literal_untouched() {
        let mut lit = ExprNode::new(TypeRef::Primitive(hir_def::ty::Primitive::I32), ExprKind::Literal(Literal::Integer(1)));
        wrap_if_candidate(&mut lit);
        assert!(matches!(lit.kind, ExprKind::Literal(_)));
    }
}
