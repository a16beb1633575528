//! Shared naming conventions (well-known prefixes and runnable labels).

use crate::value::Value;

/// Methods whose names start with this prefix are helpers, never runnables.
pub const PRIVATE_PREFIX: &str = "_";

/// Separator between a method name and its rendered example-set.
pub const EXAMPLE_LABEL_SEPARATOR: &str = " with example ";

/// Check whether `name` is private under `prefix`.
///
/// An empty prefix makes every method public.
pub fn is_private(name: &str, prefix: &str) -> bool {
    !prefix.is_empty() && name.starts_with(prefix)
}

/// Render an example-set's values in declaration order, e.g. `[1, NYC]`.
pub fn render_values(values: &[Value]) -> String {
    let parts: Vec<String> = values.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}

/// Name of the runnable derived from one example-set of `method`.
///
/// ## Examples
/// ```rust
/// use casebook_core::conventions::example_label;
/// use casebook_core::Value;
///
/// assert_eq!(example_label("greet", &[Value::from("NYC")]), "greet with example [NYC]");
/// ```
pub fn example_label(method: &str, values: &[Value]) -> String {
    format!("{method}{EXAMPLE_LABEL_SEPARATOR}{}", render_values(values))
}
