//! Interned-free identifier type. The front end that produces the HIR this
//! crate models has already resolved every name to its target; `Name` only
//! needs to carry enough to print diagnostics and synthesize fresh names
//! (`closure#0`, `STATIC_lifted_0`, `<Trait>#vtable`, ...).

use std::fmt;

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(Box<str>);

impl Name {
    pub fn new(s: impl Into<Box<str>>) -> Name {
        Name(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Name {
        Name(s.into())
    }
}

impl From<String> for Name {
    fn from(s: String) -> Name {
        Name(s.into_boxed_str())
    }
}

/// A small counter used by synthesis passes (closure/generator extraction,
/// static-borrow promotion, vtable synthesis) to mint fresh names that don't
/// collide with source-level items in the owning module.
#[derive(Default)]
pub struct NameSupply {
    next: u32,
}

impl NameSupply {
    pub fn fresh(&mut self, prefix: &str) -> Name {
        let n = self.next;
        self.next += 1;
        Name::new(format!("{}#{}", prefix, n))
    }
}
