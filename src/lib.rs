#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
//! Casebook: class-style parameterized tests.
//!
//! A test class is an ordinary struct plus a [`ClassBuilder`] describing its test methods, the providers that
//! supply their parameters, example tables and lifecycle hooks. Building the class and instantiating it yields a flat
//! list of [`Runnable`] units (one per example-set, or one per plain method) that any host can execute.
//!
//! ```rust
//! use casebook::prelude::*;
//!
//! struct Greeter;
//!
//! let class = ClassBuilder::<Greeter>::new("Greeter")
//!     .provide("greeting", |_| "hi")
//!     .method("greet", [Param::named("greeting"), Param::example()], |_this, args| async move {
//!         Ok::<_, Failure>(format!("{}, {}", args.str(0)?, args.str(1)?))
//!     })
//!     .inject("greet", 0, "greeting")
//!     .example("greet", ["NYC"])
//!     .example("greet", ["LA"])
//!     .build();
//!
//! let names: Vec<String> = build_runners(&class, Greeter).into_iter().map(|r| r.name).collect();
//! assert_eq!(names, ["greet with example [NYC]", "greet with example [LA]"]);
//! ```
//!
//! ## Panic Policy
//!
//! - **Library code**: `Result` or `Option` with `?` / `ok_or` / `map_err`; the crate enforces
//!   `#![deny(clippy::unwrap_used)]`. A poisoned cursor lock is recovered, not propagated.
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//! - **User code**: a panicking test method fails its unit under [`PlainHost`]; other hosts decide for themselves.

pub mod config;
pub mod errors;
pub mod examples;
pub mod host;
pub mod registry;
pub mod resolve;
pub mod runner;

#[cfg(feature = "json")]
pub mod json;

pub use casebook_core::{Opaque, Value, values};

pub use config::{AfterEachPolicy, CursorMode, MissingProviderPolicy, RunConfig, SuiteConfig};
pub use errors::{ArgError, Failure, HostError, ResolveError, RunError};
pub use examples::{ExampleCursor, ExampleSet};
pub use host::{Host, PlainHost, register, run_plain};
pub use registry::{ClassBuilder, ClassDef, HookPhase, Param, ProviderKey, Reflect};
pub use resolve::{Args, ResolveContext};
pub use runner::{HookContext, Instance, Runnable, UnitBody, build_runners};

/// Everything a test class definition usually needs.
pub mod prelude {
    pub use crate::config::{AfterEachPolicy, CursorMode, MissingProviderPolicy, SuiteConfig};
    pub use crate::errors::Failure;
    pub use crate::registry::{ClassBuilder, Param, ProviderKey};
    pub use crate::resolve::Args;
    pub use crate::runner::{HookContext, build_runners};
    pub use casebook_core::{Value, values};
}
