//! Type and trait machinery for the middle-end: the trait resolver, the
//! per-function inference contexts (type/value ivars and the lifetime
//! solver), and the bound cache they share. `hir_expand`'s passes are the
//! callers; this crate owns no HIR walking of its own beyond what the
//! resolver needs internally.

pub mod bounds;
pub mod infer_ctxt;
pub mod lifetime;
pub mod resolver;

pub use bounds::BoundCache;
pub use infer_ctxt::InferCtxt;
pub use lifetime::{LifetimeState, LocalLifetime};
pub use resolver::{BuiltinImpl, Grade, ImplRef, TraitResolver};
