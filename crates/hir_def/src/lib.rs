//! The HIR data model: the crate-wide graph that every expansion pass in
//! `hir_expand` walks and rewrites in place, plus the generic visitor that
//! walks it (§3, §4.1).
//!
//! Nothing in this crate resolves names or type-checks; it is the shape that
//! a parser + resolver + typecheck front end (out of scope here) is assumed
//! to have already produced. `hir_ty` and `hir_expand` build on top of it.

pub mod diagnostics;
pub mod expr;
pub mod expr_visitor;
pub mod generics;
pub mod item;
pub mod lang_item;
pub mod name;
pub mod pattern;
pub mod path;
pub mod target;
pub mod ty;
pub mod visitor;

#[cfg(test)]
mod tests;

pub use crate::{
    diagnostics::{Diagnostic, LowerError, RecursionGuard, RecursionStack},
    expr::{ExprKind, ExprNode, ValueUsage},
    expr_visitor::ExprVisitor,
    generics::GenericParams,
    item::{
        Crate, Enum, Function, MarkerImpl, Module, ModuleItem, Static, Struct, Trait, TraitImpl,
        TypeImpl, Union,
    },
    name::Name,
    path::{GenericPath, Path, PathParams},
    target::{Edition, TargetSpec},
    ty::{Mutability, TypeRef},
};
