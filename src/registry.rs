//! Annotation registry.
//!
//! A [`ClassBuilder`] collects everything a test class declares: its methods (with their declared parameter
//! markers), providers, per-parameter injections, example-sets, lifecycle hooks and ignored methods. `build()`
//! freezes it into one shared [`ClassDef`] which every instance of the class is constructed against.
//!
//! ## Registry invariants
//!
//! - Container creation is implicit and idempotent; content is cumulative (append or overwrite one entry).
//! - Providers: last registration for a key wins.
//! - Injections bind a position to a provider *key*, looked up at call time, so a provider registered after the
//!   injection still resolves.
//! - Nothing is validated at definition time: metadata for an undeclared method is kept and simply never used.
//!
//! ## Examples
//! ```rust
//! use casebook::registry::{ClassBuilder, Param};
//!
//! struct Greeter;
//!
//! let class = ClassBuilder::<Greeter>::new("Greeter")
//!     .provide("greeting", |_| "hi")
//!     .method("greet", [Param::named("greeting"), Param::example()], |_this, args| async move {
//!         Ok(format!("{}, {}", args.value(0), args.value(1)))
//!     })
//!     .inject("greet", 0, "greeting")
//!     .example("greet", ["NYC"])
//!     .example("greet", ["LA"])
//!     .build();
//!
//! assert_eq!(class.example_sets("greet").len(), 2);
//! ```

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use casebook_core::Value;
use casebook_core::lang::annotations::{self, AnnotationId};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::config::SuiteConfig;
use crate::errors::Failure;
use crate::examples::ExampleSet;
use crate::resolve::{Args, ResolveContext};
use crate::runner::{HookContext, Instance};

// ============================================================================
// Keys and declared parameters
// ============================================================================

/// Key under which a provider is registered and by which a parameter is injected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderKey {
    /// A string literal key
    Name(String),
    /// A type marker key
    Type { id: TypeId, name: &'static str },
    /// "Read from the method's example-sets"
    Example,
    /// Inference found no declared type at the injected position
    Undeclared,
}

impl ProviderKey {
    pub fn named(name: impl Into<String>) -> Self {
        ProviderKey::Name(name.into())
    }

    pub fn of<U: 'static>() -> Self {
        ProviderKey::Type {
            id: TypeId::of::<U>(),
            name: std::any::type_name::<U>(),
        }
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKey::Name(name) => write!(f, "\"{name}\""),
            ProviderKey::Type { name, .. } => write!(f, "type `{name}`"),
            ProviderKey::Example => f.write_str("<example>"),
            ProviderKey::Undeclared => f.write_str("<undeclared>"),
        }
    }
}

impl From<&str> for ProviderKey {
    fn from(name: &str) -> Self {
        ProviderKey::Name(name.to_string())
    }
}

impl From<String> for ProviderKey {
    fn from(name: String) -> Self {
        ProviderKey::Name(name)
    }
}

/// Declared marker of one method parameter (what reflection would report as its type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    marker: Option<ProviderKey>,
}

impl Param {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            marker: Some(ProviderKey::named(name)),
        }
    }

    pub fn of<U: 'static>() -> Self {
        Self {
            marker: Some(ProviderKey::of::<U>()),
        }
    }

    /// A parameter fed from the method's example-sets.
    pub fn example() -> Self {
        Self {
            marker: Some(ProviderKey::Example),
        }
    }

    /// A parameter with no usable type marker.
    pub fn untyped() -> Self {
        Self { marker: None }
    }

    pub fn marker(&self) -> Option<&ProviderKey> {
        self.marker.as_ref()
    }
}

/// Parameter-type reflection.
///
/// Given a method name, report its declared parameter markers in positional order. Consulted only when an injection
/// does not name its provider key.
pub trait Reflect {
    fn param_types(&self, method: &str) -> Option<&[Param]>;
}

// ============================================================================
// Methods, providers, hooks
// ============================================================================

pub type MethodFuture = BoxFuture<'static, Result<Value, Failure>>;
pub type MethodFn<T> = Arc<dyn Fn(Arc<T>, Args) -> MethodFuture + Send + Sync>;
pub type HookFuture = BoxFuture<'static, Result<(), Failure>>;
pub type HookFn<T> = Arc<dyn Fn(Arc<T>, HookContext) -> HookFuture + Send + Sync>;
pub type ResolverFn<T> = Arc<dyn Fn(&mut ResolveContext<'_, T>) -> Result<Value, Failure> + Send + Sync>;

/// A declared test method.
pub struct MethodDef<T> {
    pub name: String,
    pub params: Vec<Param>,
    pub body: MethodFn<T>,
}

impl<T> MethodDef<T> {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Declared methods in declaration order.
pub struct MethodTable<T> {
    methods: Vec<MethodDef<T>>,
}

impl<T> MethodTable<T> {
    fn new() -> Self {
        Self { methods: Vec::new() }
    }

    /// Declare or redeclare a method; a redeclaration keeps the original position.
    fn insert(&mut self, def: MethodDef<T>) {
        match self.methods.iter_mut().find(|m| m.name == def.name) {
            Some(existing) => *existing = def,
            None => self.methods.push(def),
        }
    }

    pub fn get(&self, name: &str) -> Option<&MethodDef<T>> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MethodDef<T>> {
        self.methods.iter()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl<T> Reflect for MethodTable<T> {
    fn param_types(&self, method: &str) -> Option<&[Param]> {
        self.get(method).map(|m| m.params.as_slice())
    }
}

/// A registered provider.
pub enum Provider<T> {
    Resolver(ResolverFn<T>),
    /// The built-in provider that reads the method's example cursor
    Examples,
}

impl<T> Clone for Provider<T> {
    fn clone(&self) -> Self {
        match self {
            Provider::Resolver(f) => Provider::Resolver(Arc::clone(f)),
            Provider::Examples => Provider::Examples,
        }
    }
}

/// Lifecycle phase of a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    BeforeEach,
    AfterEach,
}

impl HookPhase {
    pub fn annotation(self) -> AnnotationId {
        match self {
            HookPhase::BeforeEach => AnnotationId::BeforeEach,
            HookPhase::AfterEach => AnnotationId::AfterEach,
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(annotations::as_str(self.annotation()))
    }
}

/// A hook bound to a method name.
pub struct Hook<T> {
    pub name: String,
    pub phase: HookPhase,
    pub body: HookFn<T>,
}

/// One applied annotation, kept for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRecord {
    pub annotation: AnnotationId,
    /// Method the annotation was applied to; `None` for class-level annotations
    pub method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Binding {
    Key(ProviderKey),
    Inferred,
}

// ============================================================================
// Builder
// ============================================================================

/// Collects a test class's metadata.
pub struct ClassBuilder<T> {
    name: String,
    config: SuiteConfig,
    methods: MethodTable<T>,
    providers: HashMap<ProviderKey, Provider<T>>,
    arguments: HashMap<String, Vec<Option<Binding>>>,
    examples: HashMap<String, Vec<ExampleSet>>,
    ignored: HashSet<String>,
    before_each: Vec<Hook<T>>,
    after_each: Vec<Hook<T>>,
    annotations: Vec<AnnotationRecord>,
}

impl<T: Send + Sync + 'static> ClassBuilder<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: SuiteConfig::default(),
            methods: MethodTable::new(),
            providers: HashMap::new(),
            arguments: HashMap::new(),
            examples: HashMap::new(),
            ignored: HashSet::new(),
            before_each: Vec::new(),
            after_each: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn config(mut self, config: SuiteConfig) -> Self {
        self.config = config;
        self
    }

    /// Declare a test method with its parameter markers.
    ///
    /// Methods are enumerated in declaration order.
    pub fn method<F, Fut, R>(mut self, name: impl Into<String>, params: impl IntoIterator<Item = Param>, body: F) -> Self
    where
        F: Fn(Arc<T>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Failure>> + Send + 'static,
        R: Into<Value> + Send + 'static,
    {
        let body: MethodFn<T> = Arc::new(move |this, args| {
            let fut = body(this, args);
            async move { fut.await.map(Into::<Value>::into) }.boxed()
        });
        self.methods.insert(MethodDef {
            name: name.into(),
            params: params.into_iter().collect(),
            body,
        });
        self
    }

    /// Register a provider for `key`; the previous provider for the same key is replaced.
    pub fn provide<F, R>(self, key: impl Into<ProviderKey>, resolver: F) -> Self
    where
        F: Fn(&mut ResolveContext<'_, T>) -> R + Send + Sync + 'static,
        R: Into<Value>,
    {
        self.provide_with(key, move |ctx| Ok(resolver(ctx).into()))
    }

    /// Register a fallible provider; its error fails the runnable that resolved it.
    pub fn provide_with<F>(mut self, key: impl Into<ProviderKey>, resolver: F) -> Self
    where
        F: Fn(&mut ResolveContext<'_, T>) -> Result<Value, Failure> + Send + Sync + 'static,
    {
        let key = key.into();
        tracing::trace!(class = %self.name, %key, "provider registered");
        self.providers.insert(key, Provider::Resolver(Arc::new(resolver)));
        self.record(AnnotationId::Provide, None);
        self
    }

    /// Register a provider that always yields a clone of `value`.
    pub fn provide_value(self, key: impl Into<ProviderKey>, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.provide(key, move |_| value.clone())
    }

    /// Bind parameter `index` of `method` to the provider registered under `key`.
    pub fn inject(self, method: impl Into<String>, index: usize, key: impl Into<ProviderKey>) -> Self {
        self.bind(method.into(), index, Binding::Key(key.into()))
    }

    /// Bind parameter `index` of `method` to the provider named by its declared type marker.
    ///
    /// The marker is looked up through [`Reflect`] when the class is built.
    pub fn inject_declared(self, method: impl Into<String>, index: usize) -> Self {
        self.bind(method.into(), index, Binding::Inferred)
    }

    fn bind(mut self, method: String, index: usize, binding: Binding) -> Self {
        let slots = self.arguments.entry(method.clone()).or_default();
        if slots.len() <= index {
            slots.resize(index + 1, None);
        }
        slots[index] = Some(binding);
        self.record(AnnotationId::Inject, Some(method));
        self
    }

    /// Append one example-set to `method`; every set becomes its own runnable.
    pub fn example<V: Into<Value>>(mut self, method: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        let method = method.into();
        self.examples
            .entry(method.clone())
            .or_default()
            .push(ExampleSet::new(values.into_iter().map(Into::into).collect()));
        self.providers.entry(ProviderKey::Example).or_insert(Provider::Examples);
        self.record(AnnotationId::Example, Some(method));
        self
    }

    /// Append several example-sets to `method`, in order.
    pub fn examples<S, V>(mut self, method: impl Into<String>, sets: impl IntoIterator<Item = S>) -> Self
    where
        S: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let method = method.into();
        for set in sets {
            self = self.example(method.clone(), set);
        }
        self.record(AnnotationId::Examples, Some(method));
        self
    }

    /// Run `hook` before every runnable of the class.
    pub fn before_each<F, Fut>(self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(Arc<T>, HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Failure>> + Send + 'static,
    {
        self.hook(name.into(), HookPhase::BeforeEach, hook)
    }

    /// Run `hook` after every runnable of the class.
    pub fn after_each<F, Fut>(self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(Arc<T>, HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Failure>> + Send + 'static,
    {
        self.hook(name.into(), HookPhase::AfterEach, hook)
    }

    fn hook<F, Fut>(mut self, name: String, phase: HookPhase, hook: F) -> Self
    where
        F: Fn(Arc<T>, HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Failure>> + Send + 'static,
    {
        let hooks = match phase {
            HookPhase::BeforeEach => &mut self.before_each,
            HookPhase::AfterEach => &mut self.after_each,
        };
        // Hook sets: one entry per method name, in registration order.
        if hooks.iter().any(|h| h.name == name) {
            tracing::debug!(class = %self.name, hook = %name, %phase, "hook already registered");
        } else {
            let body: HookFn<T> = Arc::new(move |this, ctx| hook(this, ctx).boxed());
            hooks.push(Hook {
                name: name.clone(),
                phase,
                body,
            });
        }
        self.record(phase.annotation(), Some(name));
        self
    }

    /// Exclude `method` from runnable enumeration.
    pub fn ignore(mut self, method: impl Into<String>) -> Self {
        let method = method.into();
        self.ignored.insert(method.clone());
        self.record(AnnotationId::Ignore, Some(method));
        self
    }

    fn record(&mut self, annotation: AnnotationId, method: Option<String>) {
        tracing::trace!(class = %self.name, annotation = annotations::as_str(annotation), ?method, "annotation applied");
        self.annotations.push(AnnotationRecord { annotation, method });
    }

    /// Freeze the class, inferring undeclared injection keys from the declared method signatures.
    pub fn build(self) -> Arc<ClassDef<T>> {
        self.finish(None)
    }

    /// Freeze the class, inferring undeclared injection keys through an external reflection source.
    pub fn build_with(self, reflect: &dyn Reflect) -> Arc<ClassDef<T>> {
        self.finish(Some(reflect))
    }

    #[tracing::instrument(skip_all, fields(class = %self.name))]
    fn finish(self, external: Option<&dyn Reflect>) -> Arc<ClassDef<T>> {
        let reflect: &dyn Reflect = match external {
            Some(r) => r,
            None => &self.methods,
        };

        let mut arguments: HashMap<String, Vec<Option<ProviderKey>>> = HashMap::new();
        for (method, slots) in &self.arguments {
            let keys = slots
                .iter()
                .enumerate()
                .map(|(index, binding)| match binding {
                    None => None,
                    Some(Binding::Key(key)) => Some(key.clone()),
                    Some(Binding::Inferred) => Some(infer_key(reflect, method, index)),
                })
                .collect();
            arguments.insert(method.clone(), keys);
        }

        for (method, sets) in &self.examples {
            let declared = reflect.param_types(method);
            if !self.methods.contains(method) {
                tracing::debug!(%method, "example-sets registered for an undeclared method");
            }
            let consumed = sets.iter().map(ExampleSet::len).max().unwrap_or(0);
            auto_inject_examples(arguments.entry(method.clone()).or_default(), declared, consumed);
        }

        for method in self.arguments.keys().chain(self.ignored.iter()) {
            if !self.methods.contains(method) {
                tracing::debug!(%method, "metadata registered for an undeclared method");
            }
        }

        tracing::debug!(
            methods = self.methods.len(),
            providers = self.providers.len(),
            annotations = self.annotations.len(),
            "class built"
        );

        Arc::new(ClassDef {
            name: self.name,
            config: self.config,
            methods: self.methods,
            providers: self.providers,
            arguments,
            examples: self.examples,
            ignored: self.ignored,
            before_each: self.before_each,
            after_each: self.after_each,
            annotations: self.annotations,
        })
    }
}

fn infer_key(reflect: &dyn Reflect, method: &str, index: usize) -> ProviderKey {
    match reflect
        .param_types(method)
        .and_then(|params| params.get(index))
        .and_then(Param::marker)
    {
        Some(key) => key.clone(),
        None => {
            tracing::warn!(%method, index, "no declared type to infer the injected provider from");
            ProviderKey::Undeclared
        }
    }
}

/// Bind the positions consumed by example-sets to the example provider.
///
/// Positions already bound to `Example` count first; then unbound positions whose declared marker is `Example`; then
/// the remaining unbound positions in ascending order. A position declared with a provider marker is never taken by
/// the fallback pass.
fn auto_inject_examples(slots: &mut Vec<Option<ProviderKey>>, declared: Option<&[Param]>, consumed: usize) {
    let mut bound = slots.iter().filter(|s| matches!(s, Some(ProviderKey::Example))).count();

    if let Some(params) = declared {
        for (index, param) in params.iter().enumerate() {
            if bound >= consumed {
                return;
            }
            if param.marker() == Some(&ProviderKey::Example) && slots.get(index).is_none_or(Option::is_none) {
                if slots.len() <= index {
                    slots.resize(index + 1, None);
                }
                slots[index] = Some(ProviderKey::Example);
                bound += 1;
            }
        }
    }

    let mut index = 0;
    while bound < consumed {
        if slots.len() <= index {
            slots.resize(index + 1, None);
        }
        let names_provider = declared
            .and_then(|params| params.get(index))
            .and_then(Param::marker)
            .is_some_and(|key| *key != ProviderKey::Example);
        if slots[index].is_none() && !names_provider {
            slots[index] = Some(ProviderKey::Example);
            bound += 1;
        }
        index += 1;
    }
}

// ============================================================================
// Frozen class definition
// ============================================================================

/// A built test class: shared, read-only metadata.
pub struct ClassDef<T> {
    name: String,
    config: SuiteConfig,
    methods: MethodTable<T>,
    providers: HashMap<ProviderKey, Provider<T>>,
    arguments: HashMap<String, Vec<Option<ProviderKey>>>,
    examples: HashMap<String, Vec<ExampleSet>>,
    ignored: HashSet<String>,
    before_each: Vec<Hook<T>>,
    after_each: Vec<Hook<T>>,
    annotations: Vec<AnnotationRecord>,
}

impl<T: Send + Sync + 'static> ClassDef<T> {
    pub fn builder(name: impl Into<String>) -> ClassBuilder<T> {
        ClassBuilder::new(name)
    }

    /// Construct an instance of this class with its own example cursors.
    pub fn instantiate(self: &Arc<Self>, target: T) -> Instance<T> {
        Instance::new(Arc::clone(self), target)
    }
}

impl<T> ClassDef<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    pub fn methods(&self) -> &MethodTable<T> {
        &self.methods
    }

    pub fn provider(&self, key: &ProviderKey) -> Option<&Provider<T>> {
        self.providers.get(key)
    }

    /// Bound provider keys of `method`, indexed by parameter position (sparse).
    pub fn arguments(&self, method: &str) -> &[Option<ProviderKey>] {
        self.arguments.get(method).map_or(&[], Vec::as_slice)
    }

    /// Example-sets of `method` in registration order.
    pub fn example_sets(&self, method: &str) -> &[ExampleSet] {
        self.examples.get(method).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn examples_by_method(&self) -> impl Iterator<Item = (&String, &Vec<ExampleSet>)> {
        self.examples.iter()
    }

    pub fn is_ignored(&self, method: &str) -> bool {
        self.ignored.contains(method)
    }

    pub fn hooks(&self, phase: HookPhase) -> &[Hook<T>] {
        match phase {
            HookPhase::BeforeEach => &self.before_each,
            HookPhase::AfterEach => &self.after_each,
        }
    }

    /// Every annotation applied while the class was built, in application order.
    pub fn annotations(&self) -> &[AnnotationRecord] {
        &self.annotations
    }
}

impl<T> Reflect for ClassDef<T> {
    fn param_types(&self, method: &str) -> Option<&[Param]> {
        self.methods.param_types(method)
    }
}
