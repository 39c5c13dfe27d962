//! `TypeRef`: the algebraic type expression sum type (spec §3, §9). Modeled
//! as a single enum with one variant per tag rather than a class hierarchy,
//! per the Design Notes — structural equality is the primary operation, so
//! no interning is done here; callers that walk large crates repeatedly may
//! choose to hash-cons at a higher layer.

use std::fmt;

use crate::{expr::ExprNode, name::Name, path::Path};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Mutability {
    Shared,
    Mut,
}

impl Mutability {
    pub fn from_bool(is_mut: bool) -> Mutability {
        if is_mut { Mutability::Mut } else { Mutability::Shared }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Primitive {
    Bool,
    Char,
    Str,
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    F32,
    F64,
}

impl Primitive {
    pub fn is_integer(self) -> bool {
        use Primitive::*;
        matches!(self, I8 | I16 | I32 | I64 | I128 | Isize | U8 | U16 | U32 | U64 | U128 | Usize)
    }

    pub fn is_float(self) -> bool {
        matches!(self, Primitive::F32 | Primitive::F64)
    }

    pub fn is_signed(self) -> bool {
        use Primitive::*;
        matches!(self, I8 | I16 | I32 | I64 | I128 | Isize)
    }

    /// Bit width, where known at this layer (pointer-sized ints resolve via
    /// `TargetSpec`).
    pub fn fixed_bits(self) -> Option<u32> {
        use Primitive::*;
        Some(match self {
            I8 | U8 => 8,
            I16 | U16 => 16,
            I32 | U32 => 32,
            I64 | U64 => 64,
            I128 | U128 => 128,
            F32 => 32,
            F64 => 64,
            Bool => 8,
            Char => 32,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Abi {
    Rust,
    C,
    Other,
}

/// Lifetime reference. Before pass I (§4.6) runs, `Infer`/`Unknown`/
/// `HigherRanked` are legal; after it, only `Named`/`Static`/`Local` survive
/// (spec invariant: "every lifetime reference is a concrete name").
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum LifetimeRef {
    Named(Name),
    Static,
    /// A local lifetime minted during pass I, identified by the id assigned
    /// in the lifetime inference state (composite, pattern-binding, or node
    /// lifetimes all resolve to this once committed).
    Local(u32),
    Infer,
    Unknown,
    HigherRanked(Name),
}

impl LifetimeRef {
    pub fn is_concrete(&self) -> bool {
        matches!(self, LifetimeRef::Named(_) | LifetimeRef::Static | LifetimeRef::Local(_))
    }
}

/// An array length / const-generic value. `Unevaluated` survives until pass
/// A (full constant evaluation, §4.8) replaces it with `Known`.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum ConstGeneric {
    Unevaluated(Box<ExprNode>),
    Known(u64),
    /// A const-generic parameter reference (`[T; N]` inside a generic fn).
    Param(u32),
    /// A const inference variable, used only inside `hir_ty`'s value
    /// union-find (spec §4.3.2) before being written back as `Known`.
    Infer(u32),
}

impl ConstGeneric {
    pub fn is_known(&self) -> bool {
        matches!(self, ConstGeneric::Known(_))
    }
}

/// The generic-encoding "group" a `Generic` type tag belongs to (spec
/// §4.2.2.2, §4.2.3 step 3): group 0 is a real, user-written generic
/// parameter; group 2 is a placeholder minted during impl matching to stand
/// in for an impl's own unfilled parameter.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum GenericRef {
    /// A real generic parameter at the given dense index.
    Param(u32),
    /// A placeholder minted while matching impl `impl_id`'s parameter `idx`
    /// (spec §4.2.3 step 3, §9 Glossary "Placeholder generic").
    Placeholder { impl_id: u32, idx: u32 },
}

/// The 15-variant algebraic type sum (spec §3, §9).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum TypeRef {
    Infer { ivar: Option<u32>, class: InferClass },
    Diverge,
    Primitive(Primitive),
    Path(Box<Path>),
    Generic(GenericRef),
    TraitObject {
        principal: Option<Box<crate::path::TraitPath>>,
        markers: Vec<crate::path::GenericPath>,
        lifetime: LifetimeRef,
    },
    /// `impl Trait` in function-return position; resolved by pass D (§4.11)
    /// against `origin.erased_types[index]`.
    ErasedType { origin: Box<Path>, index: usize, traits: Vec<crate::path::TraitPath> },
    Array { inner: Box<TypeRef>, size: ConstGeneric },
    Slice { inner: Box<TypeRef> },
    Tuple(Vec<TypeRef>),
    Borrow { mutability: Mutability, lifetime: LifetimeRef, inner: Box<TypeRef> },
    Pointer { mutability: Mutability, inner: Box<TypeRef> },
    Function { is_unsafe: bool, abi: Abi, args: Vec<TypeRef>, ret: Box<TypeRef> },
    /// Still points at the closure's defining expression node until pass C
    /// (§4.5) replaces every occurrence with `Path` to the synthesized
    /// struct.
    Closure { node: u32 },
    Generator { node: u32 },
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum InferClass {
    None,
    Integer,
    Float,
}

impl TypeRef {
    pub const UNIT: TypeRef = TypeRef::Tuple(Vec::new());

    pub fn infer() -> TypeRef {
        TypeRef::Infer { ivar: None, class: InferClass::None }
    }

    pub fn is_infer(&self) -> bool {
        matches!(self, TypeRef::Infer { .. })
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, TypeRef::Tuple(v) if v.is_empty())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Infer { .. } => write!(f, "_"),
            TypeRef::Diverge => write!(f, "!"),
            TypeRef::Primitive(p) => write!(f, "{:?}", p),
            TypeRef::Path(p) => write!(f, "{:?}", p),
            TypeRef::Generic(g) => write!(f, "{:?}", g),
            TypeRef::TraitObject { .. } => write!(f, "dyn _"),
            TypeRef::ErasedType { .. } => write!(f, "impl _"),
            TypeRef::Array { inner, .. } => write!(f, "[{}; _]", inner),
            TypeRef::Slice { inner } => write!(f, "[{}]", inner),
            TypeRef::Tuple(v) if v.is_empty() => write!(f, "()"),
            TypeRef::Tuple(v) => {
                write!(f, "(")?;
                for t in v {
                    write!(f, "{}, ", t)?;
                }
                write!(f, ")")
            }
            TypeRef::Borrow { mutability, inner, .. } => {
                write!(f, "&{}{}", if *mutability == Mutability::Mut { "mut " } else { "" }, inner)
            }
            TypeRef::Pointer { mutability, inner } => {
                write!(f, "*{} {}", if *mutability == Mutability::Mut { "mut" } else { "const" }, inner)
            }
            TypeRef::Function { args, ret, .. } => {
                write!(f, "fn(")?;
                for a in args {
                    write!(f, "{}, ", a)?;
                }
                write!(f, ") -> {}", ret)
            }
            TypeRef::Closure { node } => write!(f, "closure#{}", node),
            TypeRef::Generator { node } => write!(f, "generator#{}", node),
        }
    }
}
