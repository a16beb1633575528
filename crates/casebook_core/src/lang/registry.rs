//! Shareable metadata for `casebook_core::lang` registries.
//!
//! These types are `Copy`-friendly so registries can live in `const` tables. Behavior lives in the `casebook` crate;
//! the tables only supply stable identity and spelling for logs and introspection.

/// Shared metadata shape for registry-first vocabulary items: a stable `id` and its `canonical` spelling.
#[derive(Debug, Clone, Copy)]
pub struct LangItemInfo<Id> {
    pub id: Id,
    pub canonical: &'static str,
}
