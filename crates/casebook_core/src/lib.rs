//! Provide the shared, pure building blocks of casebook: the dynamic argument [`Value`], naming conventions, and the
//! canonical annotation vocabulary.
//!
//! ## Notes
//!
//! - This is a “semantic core” crate: **no IO**, no global state, and no async runtime types.
//! - The `casebook` crate builds the registry, cursor engine, resolver and runners on top of these types; tooling
//!   (docs, log fields, diagnostics) uses the vocabulary tables here so spellings never drift.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]

pub mod conventions;
pub mod lang;
pub mod value;

pub use value::{Opaque, Value};

/// Build a `Vec<Value>` from heterogeneous literals.
///
/// ## Examples
/// ```rust
/// use casebook_core::{values, Value};
///
/// let set = values![1, "two", 3.5, true];
/// assert_eq!(set[1], Value::from("two"));
/// assert_eq!(set.len(), 4);
/// ```
#[macro_export]
macro_rules! values {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::Value::from($value)),*]
    };
}
