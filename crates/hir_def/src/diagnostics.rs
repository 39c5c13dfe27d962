//! Error taxonomy (spec §7): `Bug` for invariant violations, `RecursionDetected`
//! for cycle protection, and a collected `Diagnostic` list for user-facing
//! (`E0000`-class) errors that don't need to abort the pass.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Span {
    pub file: u32,
    pub line: u32,
    pub col: u32,
}

impl Span {
    pub const DUMMY: Span = Span { file: 0, line: 0, col: 0 };
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

/// A user-facing (`E0000`-class) diagnostic. Passes collect these into a
/// `Vec<Diagnostic>` rather than aborting, so more than one can be reported
/// per crate before the driver stops (spec §7).
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn new(span: Span, message: impl Into<String>) -> Diagnostic {
        Diagnostic { span, message: message.into() }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.span, self.message)
    }
}

/// Fatal-within-a-pass error taxonomy. `Bug` aborts the current pass with a
/// span-annotated message; `RecursionDetected` is thrown by the trait
/// resolver and EAT when a query re-enters itself and is either converted to
/// a fuzzy answer or propagated.
#[derive(Debug, Clone)]
pub enum LowerError {
    Bug { span: Span, message: String },
    RecursionDetected { span: Span, description: String },
}

impl LowerError {
    pub fn bug(span: Span, message: impl Into<String>) -> LowerError {
        LowerError::Bug { span, message: message.into() }
    }

    pub fn recursion(span: Span, description: impl Into<String>) -> LowerError {
        LowerError::RecursionDetected { span, description: description.into() }
    }
}

impl fmt::Display for LowerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LowerError::Bug { span, message } => write!(f, "BUG at {}: {}", span, message),
            LowerError::RecursionDetected { span, description } => {
                write!(f, "recursion detected at {}: {}", span, description)
            }
        }
    }
}

impl std::error::Error for LowerError {}

pub type LowerResult<T> = Result<T, LowerError>;

/// Explicit replacement for the original's thread-local recursion stacks
/// (spec §9 Design Notes, §5): a plain stack of query keys threaded through
/// calls via `&mut RecursionStack`, with a `RecursionGuard` that pushes on
/// construction and pops on `Drop` so every exit path (including `?`) is
/// covered.
#[derive(Debug, Default)]
pub struct RecursionStack<K> {
    stack: Vec<K>,
    limit: usize,
}

impl<K: PartialEq> RecursionStack<K> {
    pub fn new(limit: usize) -> RecursionStack<K> {
        RecursionStack { stack: Vec::new(), limit }
    }

    /// Pushes `key`. Returns `Err` if `key` is already on the stack (direct
    /// cycle) or the stack has grown past `limit` (runaway/indirect cycle).
    pub fn enter(&mut self, key: K) -> Result<RecursionGuard<'_, K>, ()> {
        if self.stack.len() >= self.limit || self.stack.contains(&key) {
            return Err(());
        }
        self.stack.push(key);
        Ok(RecursionGuard { stack: &mut self.stack })
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

pub struct RecursionGuard<'a, K> {
    stack: &'a mut Vec<K>,
}

impl<'a, K> Drop for RecursionGuard<'a, K> {
    fn drop(&mut self) {
        stdx::never!(self.stack.pop().is_none(), "recursion guard dropped an empty stack");
    }
}
