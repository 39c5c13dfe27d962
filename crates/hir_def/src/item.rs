//! Crate-level items (spec §3): modules, the callable/const/ADT/trait item
//! kinds, and the three impl-block kinds. Per the Design Notes' "arena and
//! index" guidance, impls are owned by the crate in `la_arena::Arena`s and
//! referenced by `Idx`, since trait ↔ impl references would otherwise be
//! cyclic; everything else (module contents, item bodies) is owned via
//! plain `Box`/`Vec` tree structure.

use indexmap::IndexMap;
use la_arena::{Arena, Idx};

use crate::{
    diagnostics::Diagnostic,
    expr::ExprNode,
    generics::GenericParams,
    lang_item::LangItems,
    name::Name,
    path::{GenericPath, Path, TraitPath},
    pattern::Pattern,
    target::{Edition, TargetSpec},
    ty::TypeRef,
};

/// The fully-evaluated value of a `const`/`static` initializer or an enum
/// discriminant (spec §4.8's "Literal" tagged value, renamed here to avoid
/// colliding with `expr::Literal`, the unevaluated expression-level
/// literal).
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Invalid,
    Integer(u64),
    Float(f64),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<ConstValue>),
    Variant { idx: u32, fields: Vec<ConstValue> },
    BorrowOf(Path),
    ItemAddr(Path),
}

impl ConstValue {
    pub fn is_valid(&self) -> bool {
        !matches!(self, ConstValue::Invalid)
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ConstValue::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub pattern: Pattern,
    pub ty: TypeRef,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub generics: GenericParams,
    pub receiver: Option<crate::expr::ReceiverKind>,
    pub args: Vec<Param>,
    pub ret_ty: TypeRef,
    /// `None` for a trait method with no default body, or an `extern`
    /// declaration; every other function is rewritten in place by passes.
    pub body: Option<Box<ExprNode>>,
    pub is_const: bool,
    pub is_unsafe: bool,
    /// Filled in by erased-type substitution's source pass (pass D consumes
    /// this, §4.11): one entry per `impl Trait` return position.
    pub erased_types: Vec<TypeRef>,
}

impl Function {
    pub fn declaration(generics: GenericParams, args: Vec<Param>, ret_ty: TypeRef) -> Function {
        Function {
            generics,
            receiver: None,
            args,
            ret_ty,
            body: None,
            is_const: false,
            is_unsafe: false,
            erased_types: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Static {
    pub ty: TypeRef,
    pub init: Option<Box<ExprNode>>,
    pub evaluated: ConstValue,
    pub is_mut: bool,
}

#[derive(Debug, Clone)]
pub struct Const {
    pub generics: GenericParams,
    pub ty: TypeRef,
    pub init: Option<Box<ExprNode>>,
    pub evaluated: ConstValue,
}

#[derive(Debug, Clone, Default)]
pub struct StructMarkings {
    pub is_copy: bool,
    /// Index of the field allowed to be unsized (the struct's DST tail
    /// field), used by the unsize-coercion struct-to-struct case (§4.2.5).
    pub unsized_param: Option<usize>,
}

#[derive(Debug, Clone)]
pub enum StructFields {
    Unit,
    Tuple(Vec<TypeRef>),
    Named(IndexMap<Name, TypeRef>),
}

#[derive(Debug, Clone)]
pub struct Struct {
    pub generics: GenericParams,
    pub fields: StructFields,
    pub markings: StructMarkings,
}

#[derive(Debug, Clone)]
pub struct EnumVariant {
    pub name: Name,
    pub fields: StructFields,
    pub discriminant: Option<ConstValue>,
}

#[derive(Debug, Clone)]
pub struct Enum {
    pub generics: GenericParams,
    pub variants: Vec<EnumVariant>,
    pub markings: StructMarkings,
    pub repr: Option<TypeRef>,
}

#[derive(Debug, Clone)]
pub struct Union {
    pub generics: GenericParams,
    pub fields: IndexMap<Name, TypeRef>,
}

#[derive(Debug, Clone)]
pub struct AssociatedType {
    pub bounds: Vec<TraitPath>,
    pub default: Option<TypeRef>,
}

/// Filled in by vtable synthesis (pass H, §4.7). Absent (`None` on `Trait`)
/// until that pass runs, and left absent forever if a supertrait-ATY name
/// collision was detected (§4.7 step 5: "clear ... leaving it non-object-safe").
#[derive(Debug, Clone, Default)]
pub struct VTableInfo {
    pub struct_path: Option<Path>,
    pub value_indexes: IndexMap<Name, (usize, GenericPath)>,
    pub type_indexes: IndexMap<Name, usize>,
    pub parent_vtables_start: usize,
}

#[derive(Debug, Clone)]
pub struct Trait {
    pub generics: GenericParams,
    pub parent_traits: Vec<TraitPath>,
    pub methods: IndexMap<Name, Function>,
    pub assoc_types: IndexMap<Name, AssociatedType>,
    pub consts: IndexMap<Name, Const>,
    pub is_marker: bool,
    pub vtable: Option<VTableInfo>,
}

#[derive(Debug, Clone)]
pub struct TraitAlias {
    pub generics: GenericParams,
    pub bounds: Vec<TraitPath>,
}

#[derive(Debug, Clone)]
pub struct TypeImpl {
    pub generics: GenericParams,
    pub ty: TypeRef,
    pub methods: IndexMap<Name, Function>,
    pub consts: IndexMap<Name, Const>,
}

#[derive(Debug, Clone)]
pub struct TraitImpl {
    pub generics: GenericParams,
    pub trait_: TraitPath,
    pub ty: TypeRef,
    pub methods: IndexMap<Name, Function>,
    pub consts: IndexMap<Name, Const>,
    pub assoc_types: IndexMap<Name, TypeRef>,
    /// `impl.type_is_specialisable` (spec §9 Open Questions): tie-break
    /// between overlapping specializing impls is intentionally partial.
    pub is_specialisable: bool,
}

#[derive(Debug, Clone)]
pub struct MarkerImpl {
    pub generics: GenericParams,
    pub trait_: GenericPath,
    pub ty: TypeRef,
    pub is_negative: bool,
}

pub type TypeImplId = Idx<TypeImpl>;
pub type TraitImplId = Idx<TraitImpl>;
pub type MarkerImplId = Idx<MarkerImpl>;

#[derive(Debug, Clone, Default)]
pub struct Module {
    pub name: Name,
    pub submodules: IndexMap<Name, Module>,
    pub functions: IndexMap<Name, Function>,
    pub statics: IndexMap<Name, Static>,
    pub consts: IndexMap<Name, Const>,
    pub structs: IndexMap<Name, Struct>,
    pub enums: IndexMap<Name, Enum>,
    pub unions: IndexMap<Name, Union>,
    pub traits: IndexMap<Name, Trait>,
    pub trait_aliases: IndexMap<Name, TraitAlias>,
    pub type_aliases: IndexMap<Name, TypeRef>,
}

impl Module {
    pub fn new(name: Name) -> Module {
        Module { name, ..Module::default() }
    }
}

/// A reference to a module-owned item kind, used by the visitor when it
/// needs to hand back "the thing found" without committing to a specific
/// owning map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleItem {
    Function,
    Static,
    Const,
    Struct,
    Enum,
    Union,
    Trait,
    TraitAlias,
    TypeAlias,
}

/// The per-trait index of impls, keyed by the trait's `SimplePath` so
/// `find_trait_impls`'s crate-level search (§4.2.2 step 4) doesn't need to
/// scan every impl in the crate.
#[derive(Debug, Default)]
pub struct ImplIndex {
    pub by_trait: IndexMap<crate::path::SimplePath, Vec<TraitImplId>>,
    pub by_marker_trait: IndexMap<crate::path::SimplePath, Vec<MarkerImplId>>,
}

#[derive(Debug)]
pub struct Crate {
    pub name: Name,
    pub root: Module,
    pub target: TargetSpec,
    pub edition: Edition,
    pub lang_items: LangItems,
    pub type_impls: Arena<TypeImpl>,
    pub trait_impls: Arena<TraitImpl>,
    pub marker_impls: Arena<MarkerImpl>,
    pub impl_index: ImplIndex,
    pub diagnostics: Vec<Diagnostic>,
}

impl Crate {
    pub fn new(name: Name, target: TargetSpec, edition: Edition) -> Crate {
        Crate {
            name: name.clone(),
            root: Module::new(name),
            target,
            edition,
            lang_items: LangItems::default(),
            type_impls: Arena::new(),
            trait_impls: Arena::new(),
            marker_impls: Arena::new(),
            impl_index: ImplIndex::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Registers a new trait impl (created either from source or by a
    /// synthesis pass) and indexes it by trait path for fast crate-level
    /// lookup.
    pub fn add_trait_impl(&mut self, imp: TraitImpl) -> TraitImplId {
        let trait_path = imp.trait_.path.path.clone();
        let id = self.trait_impls.alloc(imp);
        self.impl_index.by_trait.entry(trait_path).or_default().push(id);
        id
    }

    pub fn add_marker_impl(&mut self, imp: MarkerImpl) -> MarkerImplId {
        let trait_path = imp.trait_.path.clone();
        let id = self.marker_impls.alloc(imp);
        self.impl_index.by_marker_trait.entry(trait_path).or_default().push(id);
        id
    }

    pub fn add_type_impl(&mut self, imp: TypeImpl) -> TypeImplId {
        self.type_impls.alloc(imp)
    }
}
