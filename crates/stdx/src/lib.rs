//! Missing batteries: a handful of macros with no good home elsewhere in the
//! crate graph. Think twice before adding anything here.

pub use always_assert::{always, never};

/// Implements `From<T>` for an enum by delegating to the listed variants.
///
/// ```ignore
/// impl_from!(Struct, Enum for Wrapper);
/// ```
#[macro_export]
macro_rules! impl_from {
    ($($variant:ident $(($($sub_variant:ident),*))?),* for $enum:ident) => {
        $(
            impl From<$variant> for $enum {
                fn from(it: $variant) -> $enum {
                    $enum::$variant(it)
                }
            }
            $($(
                impl From<$sub_variant> for $enum {
                    fn from(it: $sub_variant) -> $enum {
                        $enum::$variant($variant::$sub_variant(it))
                    }
                }
            )*)?
        )*
    }
}

/// `write!`-like macro which appends to a `String` instead of returning a
/// `Result`, since appending to a `String` is infallible.
#[macro_export]
macro_rules! format_to {
    ($buf:expr) => ();
    ($buf:expr, $lit:literal $($arg:tt)*) => {
        { use ::std::fmt::Write as _; let _ = write!($buf, $lit $($arg)*); }
    };
}

/// Appends a formatted line (with trailing `\n`) to a `String`.
#[macro_export]
macro_rules! format_to_acc {
    ($buf:expr, $lit:literal $($arg:tt)*) => {
        { use ::std::fmt::Write as _; let _ = writeln!($buf, $lit $($arg)*); }
    };
}

/// Returns `true` once every `n` calls (including the first), useful for
/// throttling a `trace!` inside a hot loop. Not currently load-bearing
/// anywhere in this crate graph but kept for parity with the teacher's
/// `stdx`, which several resolver-adjacent crates reach for.
pub fn to_lower_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.char_indices() {
        if c.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
