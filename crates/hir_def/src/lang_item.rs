//! Lang-item path registry, grounded in the original's `m_lang_items` map:
//! a small table from a well-known language feature to the `Path` of the
//! trait/struct/fn that implements it in the current crate graph. The
//! resolver, closure extraction, and vtable synthesis all look traits up by
//! `LangItem` rather than by hard-coded path text.

use rustc_hash::FxHashMap;

use crate::path::GenericPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LangItem {
    Sized,
    Copy,
    Clone,
    Fn,
    FnMut,
    FnOnce,
    Generator,
    Drop,
    Deref,
    DerefMut,
    Unsize,
    CoerceUnsized,
    DiscriminantKind,
    Pointee,
}

#[derive(Debug, Default)]
pub struct LangItems {
    map: FxHashMap<LangItem, GenericPath>,
}

impl LangItems {
    pub fn insert(&mut self, item: LangItem, path: GenericPath) {
        self.map.insert(item, path);
    }

    pub fn get(&self, item: LangItem) -> Option<&GenericPath> {
        self.map.get(&item)
    }

    pub fn is_lang(&self, item: LangItem, path: &GenericPath) -> bool {
        self.map.get(&item).map_or(false, |p| p.path == path.path)
    }
}
