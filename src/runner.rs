//! Runner builder.
//!
//! An [`Instance`] pairs a built class with one target object and that object's own example cursors. Its
//! [`runnables`](Instance::runnables) are the flat list of independently runnable units a host registers: one per
//! example-set of each eligible method, or a single unit for a method without examples.
//!
//! One run of a unit is strictly sequential: resolve arguments, before-each hooks in registration order, the target
//! method, after-each hooks in registration order. Any failure fails the unit.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use casebook_core::Value;
use casebook_core::conventions;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::config::{AfterEachPolicy, CursorMode};
use crate::errors::{ResolveError, RunError};
use crate::examples::{ExampleCursor, ExampleSet};
use crate::registry::{ClassDef, HookPhase};
use crate::resolve::{Args, resolve_arguments};

/// The async body a host receives for one unit.
pub type UnitBody = Arc<dyn Fn() -> BoxFuture<'static, Result<(), RunError>> + Send + Sync>;

/// What a hook learns about the invocation it wraps.
#[derive(Debug, Clone, PartialEq)]
pub struct HookContext {
    pub method: String,
    /// Example-set feeding this invocation, if the method has examples
    pub example: Option<ExampleSet>,
    /// Return value of the target method; only set for after-each hooks
    pub outcome: Option<Value>,
}

/// A class bound to one target object.
pub struct Instance<T> {
    class: Arc<ClassDef<T>>,
    target: Arc<T>,
    cursors: Arc<HashMap<String, Mutex<ExampleCursor>>>,
}

impl<T> Clone for Instance<T> {
    fn clone(&self) -> Self {
        Self {
            class: Arc::clone(&self.class),
            target: Arc::clone(&self.target),
            cursors: Arc::clone(&self.cursors),
        }
    }
}

impl<T: Send + Sync + 'static> Instance<T> {
    pub fn new(class: Arc<ClassDef<T>>, target: T) -> Self {
        let mode = class.config().cursor_mode;
        let cursors: HashMap<String, Mutex<ExampleCursor>> = class
            .examples_by_method()
            .map(|(method, sets)| {
                let cursor = ExampleCursor::new(method.clone(), sets.clone(), mode);
                (method.clone(), Mutex::new(cursor))
            })
            .collect();
        Self {
            class,
            target: Arc::new(target),
            cursors: Arc::new(cursors),
        }
    }

    pub fn class(&self) -> &Arc<ClassDef<T>> {
        &self.class
    }

    pub fn target(&self) -> &Arc<T> {
        &self.target
    }

    /// Resolve the arguments of the next invocation of `method`.
    ///
    /// Successive calls walk the method's example-sets in registration order.
    pub fn next_arguments(&self, method: &str) -> Result<Args, ResolveError> {
        self.resolve(method, None).map(|(args, _)| args)
    }

    /// Rewind the example cursor of `method`.
    pub fn reset_cursor(&self, method: &str) {
        if let Some(cursor) = self.cursors.get(method) {
            cursor.lock().unwrap_or_else(PoisonError::into_inner).reset();
        }
    }

    fn resolve(&self, method: &str, example: Option<usize>) -> Result<(Args, Option<ExampleSet>), ResolveError> {
        let Some(cursor) = self.cursors.get(method) else {
            let args = resolve_arguments(&self.class, &self.target, method, None)?;
            return Ok((args, None));
        };

        // Held for the whole argument list so one invocation's reads are never interleaved with another's.
        let mut cursor = cursor.lock().unwrap_or_else(PoisonError::into_inner);
        if cursor.mode() == CursorMode::Explicit {
            let set = match example {
                Some(set) => cursor.begin_invocation_at(set)?,
                None => cursor.begin_invocation()?,
            };
            tracing::trace!(method, set, "invocation begins");
        }
        let resolved = resolve_arguments(&self.class, &self.target, method, Some(&mut *cursor));
        cursor.end_invocation();
        let set = cursor.current_set().cloned();
        Ok((resolved?, set))
    }

    /// Run one invocation of `method`: arguments, before-each hooks, the method, after-each hooks.
    ///
    /// `example` pins the example-set in the explicit cursor mode; the inferred mode ignores it.
    #[tracing::instrument(skip_all, fields(class = self.class.name(), method = method, example = ?example))]
    pub async fn invoke(&self, method: &str, example: Option<usize>) -> Result<Value, RunError> {
        let Some(def) = self.class.methods().get(method) else {
            return Err(RunError::UnknownMethod {
                class: self.class.name().to_string(),
                method: method.to_string(),
            });
        };
        let (args, set) = self.resolve(method, example)?;

        let context = HookContext {
            method: method.to_string(),
            example: set,
            outcome: None,
        };
        self.run_hooks(HookPhase::BeforeEach, &context).await?;

        let outcome = (def.body)(Arc::clone(&self.target), args)
            .await
            .map_err(|source| RunError::Method {
                method: method.to_string(),
                source,
            });

        match outcome {
            Ok(value) => {
                let context = HookContext {
                    outcome: Some(value.clone()),
                    ..context
                };
                self.run_hooks(HookPhase::AfterEach, &context).await?;
                Ok(value)
            }
            Err(err) => {
                if self.class.config().after_each == AfterEachPolicy::Always {
                    if let Err(hook_err) = self.run_hooks(HookPhase::AfterEach, &context).await {
                        tracing::warn!(error = %hook_err, "after_each hook failed after a failing method");
                    }
                }
                Err(err)
            }
        }
    }

    async fn run_hooks(&self, phase: HookPhase, context: &HookContext) -> Result<(), RunError> {
        for hook in self.class.hooks(phase) {
            tracing::trace!(hook = %hook.name, %phase, "running hook");
            (hook.body)(Arc::clone(&self.target), context.clone())
                .await
                .map_err(|source| RunError::Hook {
                    phase,
                    hook: hook.name.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Expand the class into runnable units, in method declaration order.
    ///
    /// Private-prefixed and ignored methods are skipped. In the inferred cursor mode the units of one method must be
    /// run sequentially, in the order returned.
    pub fn runnables(&self) -> Vec<Runnable> {
        let class = &self.class;
        let prefix = &class.config().private_prefix;
        let mut units = Vec::new();
        for def in class.methods().iter() {
            if conventions::is_private(&def.name, prefix) {
                continue;
            }
            if class.is_ignored(&def.name) {
                tracing::debug!(class = class.name(), method = %def.name, "ignored");
                continue;
            }
            let sets = class.example_sets(&def.name);
            if sets.is_empty() {
                units.push(self.unit(def.name.clone(), &def.name, None));
            } else {
                for (index, set) in sets.iter().enumerate() {
                    units.push(self.unit(set.label(&def.name), &def.name, Some(index)));
                }
            }
        }
        units
    }

    fn unit(&self, name: String, method: &str, example_index: Option<usize>) -> Runnable {
        tracing::debug!(class = self.class.name(), unit = %name, "runnable emitted");
        let instance = self.clone();
        let target_method = method.to_string();
        let body: UnitBody = Arc::new(move || {
            let instance = instance.clone();
            let method = target_method.clone();
            async move { instance.invoke(&method, example_index).await.map(|_| ()) }.boxed()
        });
        Runnable {
            name,
            method: method.to_string(),
            example_index,
            body,
        }
    }
}

/// Build the runnable units of a fresh instance of `class`.
pub fn build_runners<T: Send + Sync + 'static>(class: &Arc<ClassDef<T>>, target: T) -> Vec<Runnable> {
    class.instantiate(target).runnables()
}

/// One independently runnable unit.
pub struct Runnable {
    pub name: String,
    pub method: String,
    /// Example-set this unit runs, if its method has examples
    pub example_index: Option<usize>,
    body: UnitBody,
}

impl Runnable {
    pub fn body(&self) -> &UnitBody {
        &self.body
    }

    pub fn run(&self) -> BoxFuture<'static, Result<(), RunError>> {
        (self.body)()
    }

    pub fn into_parts(self) -> (String, UnitBody) {
        (self.name, self.body)
    }
}

impl fmt::Debug for Runnable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runnable")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("example_index", &self.example_index)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SuiteConfig;
    use crate::errors::Failure;
    use crate::registry::{ClassBuilder, Param};

    #[derive(Default)]
    struct Journal {
        entries: Mutex<Vec<String>>,
    }

    impl Journal {
        fn push(&self, entry: impl Into<String>) {
            self.entries.lock().unwrap().push(entry.into());
        }

        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.entries.lock().unwrap())
        }
    }

    fn names(units: &[Runnable]) -> Vec<&str> {
        units.iter().map(|u| u.name.as_str()).collect()
    }

    #[test]
    fn test_units_follow_declaration_order() {
        let class = ClassBuilder::<Journal>::new("J")
            .method("zeta", [], |_, _| async { Ok(()) })
            .method("_helper", [], |_, _| async { Ok(()) })
            .method("alpha", [Param::untyped()], |_, _| async { Ok(()) })
            .examples("alpha", [[1], [2]])
            .build();
        let units = build_runners(&class, Journal::default());
        assert_eq!(names(&units), vec!["zeta", "alpha with example [1]", "alpha with example [2]"]);
        assert_eq!(units[2].example_index, Some(1));
    }

    #[test]
    fn test_custom_private_prefix() {
        let class = ClassBuilder::<Journal>::new("J")
            .config(SuiteConfig::new().with_private_prefix("helper_"))
            .method("helper_setup", [], |_, _| async { Ok(()) })
            .method("_visible", [], |_, _| async { Ok(()) })
            .build();
        assert_eq!(names(&build_runners(&class, Journal::default())), vec!["_visible"]);
    }

    #[tokio::test]
    async fn test_hook_context_carries_example_and_outcome() {
        let class = ClassBuilder::<Journal>::new("J")
            .method("double", [Param::example()], |_, args| async move { Ok::<_, Failure>(args.int(0)? * 2) })
            .example("double", [21])
            .after_each("_check", |this, ctx| async move {
                this.push(format!(
                    "{} {:?} {:?}",
                    ctx.method,
                    ctx.example.map(|s| s.values().to_vec()),
                    ctx.outcome
                ));
                Ok(())
            })
            .build();
        let instance = class.instantiate(Journal::default());
        let value = instance.invoke("double", Some(0)).await.unwrap();
        assert_eq!(value, Value::Int(42));
        assert_eq!(instance.target().take(), vec!["double Some([Int(21)]) Some(Int(42))"]);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let class = ClassBuilder::<Journal>::new("J").build();
        let err = class.instantiate(Journal::default()).invoke("nope", None).await.unwrap_err();
        assert!(matches!(err, RunError::UnknownMethod { .. }));
    }

    #[tokio::test]
    async fn test_before_each_failure_short_circuits() {
        let class = ClassBuilder::<Journal>::new("J")
            .before_each("_fail", |_, _| async { Err("not ready".into()) })
            .method("m", [], |this: Arc<Journal>, _| async move {
                this.push("m");
                Ok(())
            })
            .build();
        let instance = class.instantiate(Journal::default());
        let err = instance.invoke("m", None).await.unwrap_err();
        assert!(matches!(err, RunError::Hook { phase: HookPhase::BeforeEach, .. }));
        assert!(instance.target().take().is_empty());
    }

    #[tokio::test]
    async fn test_pinned_units_run_in_any_order() {
        let class = ClassBuilder::<Journal>::new("J")
            .method("echo", [Param::example()], |this: Arc<Journal>, args| async move {
                this.push(args.value(0).to_string());
                Ok(())
            })
            .examples("echo", [["a"], ["b"], ["c"]])
            .build();
        let instance = class.instantiate(Journal::default());
        let units = instance.runnables();
        for unit in units.iter().rev() {
            unit.run().await.unwrap();
        }
        assert_eq!(instance.target().take(), vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_instances_do_not_share_cursors() {
        let class = ClassBuilder::<Journal>::new("J")
            .method("m", [Param::example()], |_, _| async { Ok(()) })
            .examples("m", [[1], [2]])
            .build();
        let first = class.instantiate(Journal::default());
        let second = class.instantiate(Journal::default());
        assert_eq!(first.next_arguments("m").unwrap().into_vec(), vec![Value::Int(1)]);
        assert_eq!(second.next_arguments("m").unwrap().into_vec(), vec![Value::Int(1)]);
        assert_eq!(first.next_arguments("m").unwrap().into_vec(), vec![Value::Int(2)]);
        first.reset_cursor("m");
        assert_eq!(first.next_arguments("m").unwrap().into_vec(), vec![Value::Int(1)]);
    }

    #[test]
    fn test_runnable_debug_omits_body() {
        let class = ClassBuilder::<Journal>::new("J").method("m", [], |_, _| async { Ok(()) }).build();
        let units = build_runners(&class, Journal::default());
        assert_eq!(
            format!("{:?}", units[0]),
            "Runnable { name: \"m\", method: \"m\", example_index: None, .. }"
        );
    }
}
