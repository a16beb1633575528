//! Configuration for test classes and the plain host.

use casebook_core::conventions::PRIVATE_PREFIX;

/// How a method's example cursor finds invocation boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorMode {
    /// Every invocation begins explicitly and pins its example-set; values are addressed by slot.
    #[default]
    Explicit,
    /// A non-increasing parameter index starts the next example-set.
    ///
    /// Requires strictly ascending resolution within an invocation and sequential, emission-order execution of the
    /// runnables derived from one method.
    Inferred,
}

/// Whether after-each hooks run when the target method fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AfterEachPolicy {
    #[default]
    SkipOnFailure,
    Always,
}

/// What a parameter receives when its provider key has no registered provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingProviderPolicy {
    /// Pass `Value::Undefined` and log a warning.
    #[default]
    Undefined,
    /// Fail the runnable with `ResolveError::MissingProvider`.
    Fail,
}

/// Per-class configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteConfig {
    /// Methods starting with this prefix are never emitted as runnables
    pub private_prefix: String,
    pub cursor_mode: CursorMode,
    pub after_each: AfterEachPolicy,
    pub missing_provider: MissingProviderPolicy,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            private_prefix: PRIVATE_PREFIX.to_string(),
            cursor_mode: CursorMode::default(),
            after_each: AfterEachPolicy::default(),
            missing_provider: MissingProviderPolicy::default(),
        }
    }
}

impl SuiteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_private_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.private_prefix = prefix.into();
        self
    }

    pub fn with_cursor_mode(mut self, mode: CursorMode) -> Self {
        self.cursor_mode = mode;
        self
    }

    pub fn with_after_each(mut self, policy: AfterEachPolicy) -> Self {
        self.after_each = policy;
        self
    }

    pub fn with_missing_provider(mut self, policy: MissingProviderPolicy) -> Self {
        self.missing_provider = policy;
        self
    }
}

/// Configuration for [`crate::host::PlainHost`] runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    pub verbose: bool,
    /// Stop at the first failing unit; the rest are reported as skipped
    pub stop_on_fail: bool,
    /// Only run units whose name contains this keyword
    pub filter: Option<String>,
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_stop_on_fail(mut self, stop: bool) -> Self {
        self.stop_on_fail = stop;
        self
    }

    pub fn with_filter(mut self, keyword: impl Into<String>) -> Self {
        self.filter = Some(keyword.into());
        self
    }

    /// Check whether a unit name passes the keyword filter.
    pub fn selects(&self, name: &str) -> bool {
        self.filter.as_deref().is_none_or(|keyword| name.contains(keyword))
    }
}
