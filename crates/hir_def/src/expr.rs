//! Expression nodes (spec §3, §9): a single sum type with one variant per
//! node kind (`ExprKind`), wrapped in `ExprNode` which carries the per-node
//! payload every pass threads through — result type and usage tag. Rewrite
//! passes (reborrow insertion, UFCS rewriting, erased-type substitution,
//! closure/generator extraction) take `&mut ExprNode` and replace `node.kind`
//! wholesale via `std::mem::replace`/`std::mem::take`, mirroring the
//! "mutable pointer to owning slot" pattern from the Design Notes.

use crate::{
    generics::GenericParams,
    name::Name,
    pattern::Pattern,
    path::{Path, PathParams},
    ty::{ConstGeneric, TypeRef},
};

/// Usage tag assigned by value-usage annotation (§4.4), consumed by closure
/// extraction (§4.5) to decide capture-by-value/ref/mut-ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueUsage {
    Borrow,
    Mutate,
    Move,
    Unknown,
}

impl ValueUsage {
    /// `max` under the ordering `Borrow < Mutate < Move` used to combine
    /// usages of an aggregate pattern's sub-patterns (§4.4).
    pub fn combine(self, other: ValueUsage) -> ValueUsage {
        use ValueUsage::*;
        match (self, other) {
            (Unknown, o) | (o, Unknown) => o,
            _ => self.max(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowType {
    Shared,
    Unique,
    Owned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniOp {
    Invert,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    BoolAnd,
    BoolOr,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        use BinOp::*;
        matches!(self, Eq | Ne | Lt | Le | Gt | Ge)
    }
}

/// How a `CallMethod`'s receiver is taken, used both by UFCS rewriting
/// (§4.10) and value-usage annotation (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverKind {
    Value,
    Box,
    BorrowUnique,
    BorrowShared,
}

/// Which `Fn*` trait a `CallValue` dispatches through, set by earlier
/// typeck and consumed by UFCS rewriting (§4.10) and value-usage
/// annotation (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraitUsed {
    Fn,
    FnMut,
    FnOnce,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathValueKind {
    Function,
    Static,
    Const,
    UnitStruct,
    UnitEnumVariant,
}

#[derive(Debug, Clone)]
pub enum Literal {
    Bool(bool),
    Integer(u64),
    Float(f64),
    Char(char),
    String(String),
    ByteString(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub guard: Option<Box<ExprNode>>,
    pub body: Box<ExprNode>,
}

/// A captured variable, filled in by closure/generator extraction (§4.5).
#[derive(Debug, Clone)]
pub struct CaptureInfo {
    pub name: Name,
    pub ty: TypeRef,
    pub usage: ValueUsage,
}

#[derive(Debug, Clone)]
pub struct ClosureNode {
    pub is_move: bool,
    pub args: Vec<(Pattern, TypeRef)>,
    pub ret_ty: TypeRef,
    /// `None` once pass C (§4.5) has extracted the body into a synthesized
    /// struct's trait impl (invariant: "no Closure expression node retains
    /// its body").
    pub body: Option<Box<ExprNode>>,
    pub captures: Vec<CaptureInfo>,
    pub obj_path: Option<Path>,
}

#[derive(Debug, Clone)]
pub struct GeneratorNode {
    pub args: Vec<(Pattern, TypeRef)>,
    pub yield_ty: TypeRef,
    pub return_ty: TypeRef,
    pub body: Option<Box<ExprNode>>,
    pub captures: Vec<CaptureInfo>,
    pub saved_locals: Vec<(u32, TypeRef)>,
    pub obj_path: Option<Path>,
}

/// The "tombstone" variant exists purely so `ExprKind` can implement
/// `Default`, which lets rewrite passes `std::mem::take` a child node out of
/// its parent, build a new wrapping node from it, and write the wrapper back
/// — without ever observing a half-built tree from the outside.
#[derive(Debug, Clone)]
pub enum ExprKind {
    Tombstone,
    Block { stmts: Vec<ExprNode>, result: Option<Box<ExprNode>> },
    Asm { template: String, inputs: Vec<(String, Box<ExprNode>)>, outputs: Vec<(String, Box<ExprNode>)> },
    Return(Option<Box<ExprNode>>),
    Let { pattern: Pattern, ty: Option<TypeRef>, value: Box<ExprNode> },
    Loop { label: Option<Name>, body: Box<ExprNode> },
    LoopControl { is_continue: bool, label: Option<Name>, value: Option<Box<ExprNode>> },
    Match { value: Box<ExprNode>, arms: Vec<MatchArm> },
    If { cond: Box<ExprNode>, then_: Box<ExprNode>, else_: Option<Box<ExprNode>> },
    Assign { op: Option<BinOp>, lhs: Box<ExprNode>, rhs: Box<ExprNode> },
    UniOp { op: UniOp, value: Box<ExprNode> },
    Borrow { ty: BorrowType, value: Box<ExprNode> },
    BinOp { op: BinOp, lhs: Box<ExprNode>, rhs: Box<ExprNode> },
    Cast { value: Box<ExprNode>, ty: TypeRef },
    Unsize { value: Box<ExprNode>, ty: TypeRef },
    Index { value: Box<ExprNode>, index: Box<ExprNode> },
    Deref { value: Box<ExprNode> },
    Emplace { value: Box<ExprNode> },
    Field { value: Box<ExprNode>, name: Name },
    TupleVariant { path: Path, args: Vec<ExprNode> },
    CallPath { path: Path, args: Vec<ExprNode> },
    CallValue { value: Box<ExprNode>, args: Vec<ExprNode>, trait_used: TraitUsed },
    CallMethod {
        value: Box<ExprNode>,
        method: Name,
        params: PathParams,
        args: Vec<ExprNode>,
        receiver: ReceiverKind,
    },
    Literal(Literal),
    UnitVariant { path: Path },
    PathValue { path: Path, kind: PathValueKind },
    Variable { slot: u32, name: Name },
    ConstParam { name: Name, idx: u32 },
    StructLiteral { path: Path, fields: Vec<(Name, ExprNode)>, base: Option<Box<ExprNode>> },
    UnionLiteral { path: Path, field: Name, value: Box<ExprNode> },
    Tuple { vals: Vec<ExprNode> },
    ArrayList { vals: Vec<ExprNode> },
    ArraySized { value: Box<ExprNode>, count: ConstGeneric },
    Closure(ClosureNode),
    Generator(GeneratorNode),
}

impl Default for ExprKind {
    fn default() -> Self {
        ExprKind::Tombstone
    }
}

#[derive(Debug, Clone)]
pub struct ExprNode {
    pub ty: TypeRef,
    pub usage: ValueUsage,
    pub kind: ExprKind,
}

impl ExprNode {
    pub fn new(ty: TypeRef, kind: ExprKind) -> ExprNode {
        ExprNode { ty, usage: ValueUsage::Unknown, kind }
    }

    pub fn tombstone() -> ExprNode {
        ExprNode { ty: TypeRef::UNIT, usage: ValueUsage::Unknown, kind: ExprKind::Tombstone }
    }

    /// Swaps in a new kind, returning the old one. Used by rewrite passes to
    /// replace a node's kind wholesale while keeping the same owning slot.
    pub fn replace_kind(&mut self, kind: ExprKind) -> ExprKind {
        std::mem::replace(&mut self.kind, kind)
    }

    pub fn take(&mut self) -> ExprNode {
        ExprNode {
            ty: std::mem::replace(&mut self.ty, TypeRef::UNIT),
            usage: self.usage,
            kind: std::mem::take(&mut self.kind),
        }
    }
}

/// The generic parameters belonging to a function body, used when
/// closure/generator extraction needs to remap captured generics (§4.5
/// step 1).
#[derive(Debug, Clone, Default)]
pub struct BodyGenerics {
    pub params: GenericParams,
}
