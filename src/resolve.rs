//! Parameter resolution.
//!
//! For one invocation, every declared position of a method is mapped to a [`Value`]: a bound provider key is looked up
//! in the class's providers and called, an unbound position receives `Value::Undefined`. Positions are always walked in
//! strictly ascending order, which the inferred cursor mode depends on.

use std::sync::Arc;

use casebook_core::Value;

use crate::config::MissingProviderPolicy;
use crate::errors::{ArgError, ResolveError};
use crate::examples::{ExampleCursor, ValueRequest};
use crate::registry::{ClassDef, MethodDef, Provider, ProviderKey};

/// What a provider sees while resolving one parameter.
pub struct ResolveContext<'a, T> {
    /// Method whose parameter is being resolved
    pub method: &'a str,
    /// Declared position of the parameter
    pub index: usize,
    pub instance: &'a T,
    cursor: Option<&'a mut ExampleCursor>,
    slot: usize,
}

impl<'a, T> ResolveContext<'a, T> {
    /// A context with no example data attached.
    pub fn new(method: &'a str, index: usize, instance: &'a T) -> Self {
        Self {
            method,
            index,
            instance,
            cursor: None,
            slot: 0,
        }
    }

    /// Read this parameter's value from the method's example-sets.
    ///
    /// The value is addressed by the parameter's rank among the method's example-bound positions. A provider under
    /// another key that reads examples shares the slot of the next example-bound position.
    pub fn next_example(&mut self) -> Result<Value, ResolveError> {
        let request = ValueRequest {
            param_index: self.index,
            slot: self.slot,
        };
        match self.cursor.as_deref_mut() {
            Some(cursor) => cursor.next_value(request),
            None => Err(ResolveError::ExampleSetExhausted {
                method: self.method.to_string(),
                set_index: 0,
                value_index: self.slot,
                available: 0,
            }),
        }
    }
}

/// Produce the argument list for one invocation of `method`.
///
/// `cursor` must already be positioned for this invocation when the class uses the explicit cursor mode.
#[tracing::instrument(level = "debug", skip_all, fields(class = class.name(), method = method))]
pub fn resolve_arguments<T>(
    class: &ClassDef<T>,
    instance: &T,
    method: &str,
    mut cursor: Option<&mut ExampleCursor>,
) -> Result<Args, ResolveError> {
    let arity = class.methods().get(method).map_or(0, MethodDef::arity);
    let bindings = class.arguments(method);
    let count = arity.max(bindings.len());

    let mut values = Vec::with_capacity(count);
    let mut example_slot = 0;
    for index in 0..count {
        let Some(key) = bindings.get(index).and_then(Option::as_ref) else {
            values.push(Value::Undefined);
            continue;
        };
        let slot = example_slot;
        if *key == ProviderKey::Example {
            example_slot += 1;
        }

        let Some(provider) = class.provider(key) else {
            match class.config().missing_provider {
                MissingProviderPolicy::Fail => {
                    return Err(ResolveError::MissingProvider {
                        method: method.to_string(),
                        index,
                        key: key.clone(),
                    });
                }
                MissingProviderPolicy::Undefined => {
                    tracing::warn!(method, index, %key, "no provider registered, passing undefined");
                    values.push(Value::Undefined);
                    continue;
                }
            }
        };

        let mut ctx = ResolveContext {
            method,
            index,
            instance,
            cursor: cursor.as_deref_mut(),
            slot,
        };
        let value = match provider {
            Provider::Examples => ctx.next_example()?,
            Provider::Resolver(resolve) => resolve(&mut ctx).map_err(|source| ResolveError::Provider {
                method: method.to_string(),
                index,
                key: key.clone(),
                source,
            })?,
        };
        values.push(value);
    }

    tracing::trace!(count = values.len(), "arguments resolved");
    Ok(Args::new(values))
}

static UNDEFINED: Value = Value::Undefined;

/// Resolved positional arguments of one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<Value>,
}

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// The value at `index`; positions past the end read as `Value::Undefined`.
    pub fn value(&self, index: usize) -> &Value {
        self.values.get(index).unwrap_or(&UNDEFINED)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.values
    }

    pub fn str(&self, index: usize) -> Result<&str, ArgError> {
        let value = self.value(index);
        value.as_str().ok_or_else(|| mismatch(index, "str", value))
    }

    pub fn int(&self, index: usize) -> Result<i64, ArgError> {
        let value = self.value(index);
        value.as_i64().ok_or_else(|| mismatch(index, "int", value))
    }

    pub fn float(&self, index: usize) -> Result<f64, ArgError> {
        let value = self.value(index);
        value.as_f64().ok_or_else(|| mismatch(index, "float", value))
    }

    pub fn bool(&self, index: usize) -> Result<bool, ArgError> {
        let value = self.value(index);
        value.as_bool().ok_or_else(|| mismatch(index, "bool", value))
    }

    /// Clone out a typed handle to an opaque argument.
    pub fn opaque<U: std::any::Any + Send + Sync>(&self, index: usize) -> Result<Arc<U>, ArgError> {
        let value = self.value(index);
        let handle = match value {
            Value::Opaque(o) => o.downcast_arc::<U>(),
            _ => None,
        };
        handle.ok_or_else(|| mismatch(index, std::any::type_name::<U>(), value))
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

fn mismatch(index: usize, expected: &'static str, found: &Value) -> ArgError {
    ArgError {
        index,
        expected,
        found: found.kind().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CursorMode, SuiteConfig};
    use crate::errors::Failure;
    use crate::examples::ExampleSet;
    use crate::registry::{ClassBuilder, Param};
    use casebook_core::values;

    struct Suite {
        base: i64,
    }

    async fn noop(_: Arc<Suite>, _: Args) -> Result<(), Failure> {
        Ok(())
    }

    fn cursor_for(class: &ClassDef<Suite>, method: &str, mode: CursorMode) -> ExampleCursor {
        ExampleCursor::new(method, class.example_sets(method).to_vec(), mode)
    }

    // ========================================
    // Resolution
    // ========================================

    #[test]
    fn test_unbound_positions_are_undefined() {
        let class = ClassBuilder::<Suite>::new("S")
            .method("m", [Param::untyped(), Param::untyped()], noop)
            .provide("k", |_| 1)
            .inject("m", 1, "k")
            .build();
        let args = resolve_arguments(&class, &Suite { base: 0 }, "m", None).unwrap();
        assert_eq!(args.into_vec(), vec![Value::Undefined, Value::Int(1)]);
    }

    #[test]
    fn test_provider_sees_instance_and_position() {
        let class = ClassBuilder::<Suite>::new("S")
            .method("m", [Param::untyped(), Param::named("k")], noop)
            .provide("k", |ctx| ctx.instance.base + ctx.index as i64)
            .inject_declared("m", 1)
            .build();
        let args = resolve_arguments(&class, &Suite { base: 40 }, "m", None).unwrap();
        assert_eq!(args.int(1).unwrap(), 41);
    }

    #[test]
    fn test_injection_before_provider_registration() {
        let class = ClassBuilder::<Suite>::new("S")
            .inject("m", 0, "late")
            .method("m", [Param::untyped()], noop)
            .provide("late", |_| "resolved")
            .build();
        let args = resolve_arguments(&class, &Suite { base: 0 }, "m", None).unwrap();
        assert_eq!(args.str(0).unwrap(), "resolved");
    }

    #[test]
    fn test_missing_provider_is_undefined_by_default() {
        let class = ClassBuilder::<Suite>::new("S").inject("m", 0, "nobody").build();
        let args = resolve_arguments(&class, &Suite { base: 0 }, "m", None).unwrap();
        assert!(args.value(0).is_undefined());
    }

    #[test]
    fn test_missing_provider_can_fail() {
        let class = ClassBuilder::<Suite>::new("S")
            .config(SuiteConfig::new().with_missing_provider(MissingProviderPolicy::Fail))
            .inject("m", 0, "nobody")
            .build();
        let err = resolve_arguments(&class, &Suite { base: 0 }, "m", None).unwrap_err();
        assert!(matches!(err, ResolveError::MissingProvider { index: 0, .. }));
    }

    #[test]
    fn test_provider_error_is_wrapped() {
        let class = ClassBuilder::<Suite>::new("S")
            .provide_with("db", |_| Err("connection refused".into()))
            .inject("m", 0, "db")
            .build();
        let err = resolve_arguments(&class, &Suite { base: 0 }, "m", None).unwrap_err();
        let ResolveError::Provider { source, .. } = err else {
            panic!("expected a provider error, got {err:?}");
        };
        assert_eq!(source.to_string(), "connection refused");
    }

    #[test]
    fn test_example_without_cursor_is_exhausted() {
        let class = ClassBuilder::<Suite>::new("S").inject("m", 0, ProviderKey::Example).example("x", [1]).build();
        let err = resolve_arguments(&class, &Suite { base: 0 }, "m", None).unwrap_err();
        assert!(matches!(err, ResolveError::ExampleSetExhausted { available: 0, .. }));
    }

    #[test]
    fn test_explicit_slots_skip_provider_positions() {
        let class = ClassBuilder::<Suite>::new("S")
            .method("m", [Param::example(), Param::named("k"), Param::example()], noop)
            .provide("k", |_| "mid")
            .inject_declared("m", 1)
            .example("m", ["a", "b"])
            .build();
        let mut cursor = cursor_for(&class, "m", CursorMode::Explicit);
        cursor.begin_invocation().unwrap();
        let args = resolve_arguments(&class, &Suite { base: 0 }, "m", Some(&mut cursor)).unwrap();
        assert_eq!(args.into_vec(), values!["a", "mid", "b"]);
    }

    #[test]
    fn test_custom_provider_can_read_examples() {
        let class = ClassBuilder::<Suite>::new("S")
            .example("m", [2])
            .provide_with(ProviderKey::Example, |ctx| Ok(Value::Int(ctx.next_example()?.as_i64().unwrap_or(0) * 10)))
            .build();
        let mut cursor = cursor_for(&class, "m", CursorMode::Explicit);
        cursor.begin_invocation().unwrap();
        let args = resolve_arguments(&class, &Suite { base: 0 }, "m", Some(&mut cursor)).unwrap();
        assert_eq!(args.int(0).unwrap(), 20);
    }

    #[test]
    fn test_inferred_sequential_invocations() {
        let class = ClassBuilder::<Suite>::new("S")
            .method("add", [Param::untyped(), Param::untyped()], noop)
            .examples("add", [[1, 2], [3, 4]])
            .build();
        let mut cursor = cursor_for(&class, "add", CursorMode::Inferred);
        let instance = Suite { base: 0 };
        let first = resolve_arguments(&class, &instance, "add", Some(&mut cursor)).unwrap();
        let second = resolve_arguments(&class, &instance, "add", Some(&mut cursor)).unwrap();
        assert_eq!(first.into_vec(), values![1, 2]);
        assert_eq!(second.into_vec(), values![3, 4]);
        assert!(resolve_arguments(&class, &instance, "add", Some(&mut cursor)).is_err());
        assert_eq!(cursor.sets(), &[ExampleSet::new(values![1, 2]), ExampleSet::new(values![3, 4])]);
    }

    // ========================================
    // Args
    // ========================================

    #[test]
    fn test_typed_accessors() {
        let args = Args::from(values!["NYC", 3, 2.5, true]);
        assert_eq!(args.str(0).unwrap(), "NYC");
        assert_eq!(args.int(1).unwrap(), 3);
        assert_eq!(args.float(2).unwrap(), 2.5);
        assert!(args.bool(3).unwrap());
    }

    #[test]
    fn test_accessor_mismatch() {
        let args = Args::from(values!["NYC"]);
        let err = args.int(0).unwrap_err();
        assert_eq!(err.to_string(), "argument 0 is str, expected int");
        assert_eq!(args.str(5).unwrap_err().found, "undefined");
    }

    #[test]
    fn test_opaque_accessor() {
        let args = Args::from(vec![Value::opaque(vec![1u8, 2])]);
        assert_eq!(*args.opaque::<Vec<u8>>(0).unwrap(), vec![1, 2]);
        assert!(args.opaque::<String>(0).is_err());
    }
}
