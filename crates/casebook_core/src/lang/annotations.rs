//! Annotation vocabulary registry.
//!
//! Centralizes the canonical (snake_case) spelling of every annotation the class builder records.

use crate::lang::registry::LangItemInfo;

/// Stable identifier for supported annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationId {
    Provide,
    Inject,
    Example,
    Examples,
    BeforeEach,
    AfterEach,
    Ignore,
}

/// Metadata entry for an annotation.
pub type AnnotationInfo = LangItemInfo<AnnotationId>;

/// Registry of supported annotations.
pub const ANNOTATIONS: &[AnnotationInfo] = &[
    info(AnnotationId::Provide, "provide"),
    info(AnnotationId::Inject, "inject"),
    info(AnnotationId::Example, "example"),
    info(AnnotationId::Examples, "examples"),
    info(AnnotationId::BeforeEach, "before_each"),
    info(AnnotationId::AfterEach, "after_each"),
    info(AnnotationId::Ignore, "ignore"),
];

/// Return the canonical spelling for an annotation.
pub fn as_str(id: AnnotationId) -> &'static str {
    info_for(id).canonical
}

/// Return the metadata entry for an annotation.
pub fn info_for(id: AnnotationId) -> &'static AnnotationInfo {
    // Every variant has a row; the guardrail test enforces it.
    match ANNOTATIONS.iter().find(|a| a.id == id) {
        Some(info) => info,
        None => &ANNOTATIONS[0],
    }
}

const fn info(id: AnnotationId, canonical: &'static str) -> AnnotationInfo {
    LangItemInfo { id, canonical }
}
