//! Casebook annotation vocabulary.
//!
//! Callers work with **stable IDs** (e.g. [`annotations::AnnotationId`]) and look up spellings via registry tables
//! instead of comparing strings ad hoc.
//!
//! ## Examples
//! ```rust
//! use casebook_core::lang::annotations::{self, AnnotationId};
//!
//! assert_eq!(annotations::as_str(AnnotationId::BeforeEach), "before_each");
//! assert_eq!(annotations::info_for(AnnotationId::Ignore).canonical, "ignore");
//! ```

pub mod annotations;
pub mod registry;
