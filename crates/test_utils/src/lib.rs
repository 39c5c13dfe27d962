//! Shared fixture-building helpers for the test suites of `hir_def`,
//! `hir_ty`, and `hir_expand`.
//!
//! Unlike the teacher, whose fixtures are source-text snippets parsed by
//! `syntax`/`parser` and addressed by `text-size` offsets, this crate graph's
//! front end is out of scope (spec.md §1): tests build HIR trees directly
//! with small builder functions instead of parsing anything. `expect-test`
//! remains the snapshot mechanism for resolver/EAT/vtable output, matching
//! the teacher's `hir_ty`/`hir_def` test style.

use hir_def::{
    expr::{ExprKind, ExprNode, Literal, ValueUsage},
    generics::GenericParams,
    item::{Crate, Function, Module, Param},
    name::Name,
    pattern::Pattern,
    target::{Edition, TargetSpec},
    ty::{Primitive, TypeRef},
};

/// An empty crate named `test`, host target, newest edition — the starting
/// point most resolver/pass tests build on top of.
pub fn empty_crate() -> Crate {
    Crate::new(Name::new("test"), TargetSpec::host(), Edition::E1_54)
}

pub fn unit_body() -> ExprNode {
    ExprNode::new(TypeRef::UNIT, ExprKind::Tuple { vals: Vec::new() })
}

pub fn int_literal(value: u64) -> ExprNode {
    ExprNode::new(TypeRef::Primitive(Primitive::I32), ExprKind::Literal(Literal::Integer(value)))
}

/// A no-arg function named `name` returning `()` with the given body,
/// registered directly into `module`.
pub fn declare_fn(module: &mut Module, name: &str, args: Vec<Param>, ret_ty: TypeRef, body: ExprNode) {
    let func = Function {
        generics: GenericParams::default(),
        receiver: None,
        args,
        ret_ty,
        body: Some(Box::new(body)),
        is_const: false,
        is_unsafe: false,
        erased_types: Vec::new(),
    };
    module.functions.insert(Name::new(name), func);
}

pub fn param(name: &str, ty: TypeRef) -> Param {
    Param { pattern: bind(name), ty }
}

/// A bare `Move`-mode binding pattern, the common case in builder code.
pub fn bind(name: &str) -> Pattern {
    Pattern {
        binding: Some(hir_def::pattern::PatternBinding {
            name: Name::new(name),
            slot: 0,
            mode: hir_def::pattern::BindingMode::Move,
        }),
        kind: hir_def::pattern::PatternKind::Any,
    }
}

/// Asserts every reachable `ExprNode` under `root` (via the given walk
/// closure, since expression trees are opaque to the generic `Visitor`)
/// carries a usage other than `Unknown`. Used by pass-B property tests
/// (spec §8 property 2).
pub fn assert_no_unknown_usage(nodes: impl Iterator<Item = ValueUsage>) {
    for usage in nodes {
        assert_ne!(usage, ValueUsage::Unknown, "pass B must annotate every eligible node");
    }
}
