//! Patterns, grounded on the pattern-kind enumeration in `visit_pattern`/
//! `visit_pattern_val` and on `get_usage_for_pattern`'s recursive walk (spec
//! §4.4). Every pattern carries a `binding: Option<PatternBinding>` (`x @
//! <subpattern>` or a bare binding) the way the source's pattern node does.

use crate::{name::Name, path::Path, ty::ConstGeneric};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingMode {
    Move,
    Ref,
    MutRef,
}

#[derive(Debug, Clone)]
pub struct PatternBinding {
    pub name: Name,
    pub slot: u32,
    pub mode: BindingMode,
}

#[derive(Debug, Clone)]
pub struct Pattern {
    pub binding: Option<PatternBinding>,
    pub kind: PatternKind,
}

#[derive(Debug, Clone)]
pub enum PatternKind {
    Any,
    Box(Box<Pattern>),
    Ref { is_mut: bool, inner: Box<Pattern> },
    Tuple(Vec<Pattern>),
    /// `(a, b, .., z)`.
    SplitTuple { before: Vec<Pattern>, after: Vec<Pattern> },
    StructValue { path: Path },
    StructTuple { path: Path, args: Vec<Pattern> },
    Struct { path: Path, fields: Vec<(Name, Pattern)> },
    Value(PatternValue),
    Range { start: Option<PatternValue>, end: Option<PatternValue> },
    EnumValue { path: Path },
    EnumTuple { path: Path, args: Vec<Pattern> },
    EnumStruct { path: Path, fields: Vec<(Name, Pattern)> },
    Slice(Vec<Pattern>),
    SplitSlice { before: Vec<Pattern>, mid: Option<Box<Pattern>>, after: Vec<Pattern> },
    Or(Vec<Pattern>),
}

#[derive(Debug, Clone)]
pub enum PatternValue {
    Integer(i128),
    Float(f64),
    CString(String),
    Const(ConstGeneric),
}

impl Pattern {
    pub fn any() -> Pattern {
        Pattern { binding: None, kind: PatternKind::Any }
    }

    pub fn is_irrefutable(&self) -> bool {
        match &self.kind {
            PatternKind::Any => true,
            PatternKind::Box(p) | PatternKind::Ref { inner: p, .. } => p.is_irrefutable(),
            PatternKind::Tuple(ps) => ps.iter().all(Pattern::is_irrefutable),
            PatternKind::StructValue { .. } => true,
            PatternKind::StructTuple { args, .. } => args.iter().all(Pattern::is_irrefutable),
            PatternKind::Struct { fields, .. } => {
                fields.iter().all(|(_, p)| p.is_irrefutable())
            }
            _ => false,
        }
    }
}
