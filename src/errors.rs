//! Error types for resolution, execution and hosting.
//!
//! User code (test methods, hooks, fallible providers) fails with a boxed [`Failure`]. Casebook never translates those
//! errors: they travel as the `source` of the variant that says *where* the failure happened.

use std::error::Error as StdError;
use std::fmt::Write as _;

use miette::Diagnostic;
use thiserror::Error;

use crate::registry::{HookPhase, ProviderKey};

/// Any error raised by user code.
pub type Failure = Box<dyn StdError + Send + Sync + 'static>;

/// Errors that occur while mapping declared parameters to values.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    #[error("no provider registered for {key} (parameter {index} of `{method}`)")]
    #[diagnostic(
        code(casebook::missing_provider),
        help("register one with `provide`, or bind the parameter to a registered key")
    )]
    MissingProvider {
        method: String,
        index: usize,
        key: ProviderKey,
    },

    #[error(
        "`{method}` has no example value at set {set_index}, position {value_index} ({available} example-set(s) registered)"
    )]
    #[diagnostic(
        code(casebook::example_set_exhausted),
        help("add another example-set, or check that example parameters are resolved in ascending order")
    )]
    ExampleSetExhausted {
        method: String,
        set_index: usize,
        value_index: usize,
        available: usize,
    },

    #[error("`{method}` read an example value outside of an invocation")]
    #[diagnostic(
        code(casebook::no_active_invocation),
        help("begin an invocation on the example cursor before resolving example parameters")
    )]
    NoActiveInvocation { method: String },

    #[error("provider {key} failed for parameter {index} of `{method}`")]
    #[diagnostic(code(casebook::provider_failed))]
    Provider {
        method: String,
        index: usize,
        key: ProviderKey,
        #[source]
        source: Failure,
    },
}

/// Errors that fail one runnable.
#[derive(Debug, Error, Diagnostic)]
pub enum RunError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolve(#[from] ResolveError),

    #[error("{phase} hook `{hook}` failed")]
    #[diagnostic(code(casebook::hook_failed))]
    Hook {
        phase: HookPhase,
        hook: String,
        #[source]
        source: Failure,
    },

    #[error("`{method}` failed")]
    #[diagnostic(code(casebook::method_failed))]
    Method {
        method: String,
        #[source]
        source: Failure,
    },

    #[error("`{method}` is not declared on class `{class}`")]
    #[diagnostic(code(casebook::unknown_method))]
    UnknownMethod { class: String, method: String },
}

impl RunError {
    /// The error raised by user code, untouched, when this failure came from a hook or the target method.
    pub fn user_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            RunError::Hook { source, .. } | RunError::Method { source, .. } => Some(source.as_ref()),
            RunError::Resolve(_) | RunError::UnknownMethod { .. } => None,
        }
    }
}

/// A typed argument accessor found a different kind of value.
#[derive(Debug, Error, Diagnostic)]
#[error("argument {index} is {found}, expected {expected}")]
#[diagnostic(code(casebook::argument_type))]
pub struct ArgError {
    pub index: usize,
    pub expected: &'static str,
    pub found: String,
}

/// Errors raised by the bundled plain host.
#[derive(Debug, Error, Diagnostic)]
pub enum HostError {
    #[error("failed to start the async runtime")]
    #[diagnostic(code(casebook::runtime))]
    Runtime(#[from] std::io::Error),
}

/// Render an error and its `source()` chain, one cause per line.
///
/// ## Examples
/// ```rust
/// use casebook::errors::{render_chain, RunError};
///
/// let err = RunError::Method { method: "greet".into(), source: "boom".into() };
/// assert_eq!(render_chain(&err), "`greet` failed\n  caused by: boom");
/// ```
pub fn render_chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut cause = err.source();
    while let Some(c) = cause {
        let _ = write!(out, "\n  caused by: {c}");
        cause = c.source();
    }
    out
}
