//! Example cursor engine.
//!
//! Each example-bearing method owns an [`ExampleCursor`] over its example-sets (a list of sets, each a list of
//! values). Every invocation of the method consumes one set, in registration order.
//!
//! Two ways to find where one invocation ends and the next begins are supported, see
//! [`CursorMode`](crate::config::CursorMode):
//!
//! - **Explicit**: the runner calls [`ExampleCursor::begin_invocation`] (or pins a set with
//!   [`ExampleCursor::begin_invocation_at`]) and each example parameter reads the value at its slot.
//! - **Inferred**: no boundary signal. A request whose parameter index is not greater than the previous request's
//!   index starts the next set. This only works when parameters are resolved in strictly ascending order.
//!
//! Any address outside the registered data is a hard [`ResolveError::ExampleSetExhausted`].

use casebook_core::Value;
use casebook_core::conventions;

use crate::config::CursorMode;
use crate::errors::ResolveError;

/// One registered example-set: the values for a single invocation, in parameter order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExampleSet {
    values: Vec<Value>,
}

impl ExampleSet {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Name of the runnable this set produces for `method`.
    pub fn label(&self, method: &str) -> String {
        conventions::example_label(method, &self.values)
    }
}

/// What a resolver asks the cursor for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueRequest {
    /// Declared position of the parameter being resolved
    pub param_index: usize,
    /// Rank of that position among the method's example-bound positions
    pub slot: usize,
}

/// Snapshot of a cursor's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPosition {
    pub set_index: usize,
    pub value_index: usize,
    pub last_param: Option<usize>,
}

/// Progress of one method through its example-sets.
#[derive(Debug, Clone)]
pub struct ExampleCursor {
    method: String,
    sets: Vec<ExampleSet>,
    mode: CursorMode,
    set_index: usize,
    value_index: usize,
    last_param: Option<usize>,
    active: bool,
    next_set: usize,
}

impl ExampleCursor {
    pub fn new(method: impl Into<String>, sets: Vec<ExampleSet>, mode: CursorMode) -> Self {
        Self {
            method: method.into(),
            sets,
            mode,
            set_index: 0,
            value_index: 0,
            last_param: None,
            active: false,
            next_set: 0,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn mode(&self) -> CursorMode {
        self.mode
    }

    pub fn sets(&self) -> &[ExampleSet] {
        &self.sets
    }

    pub fn position(&self) -> CursorPosition {
        CursorPosition {
            set_index: self.set_index,
            value_index: self.value_index,
            last_param: self.last_param,
        }
    }

    /// The set the current (or last) invocation reads from.
    pub fn current_set(&self) -> Option<&ExampleSet> {
        self.sets.get(self.set_index)
    }

    /// Start the next invocation on the next set in registration order; the first call selects set 0.
    pub fn begin_invocation(&mut self) -> Result<usize, ResolveError> {
        let set = self.next_set;
        self.begin_invocation_at(set)
    }

    /// Start an invocation pinned to set `set`.
    pub fn begin_invocation_at(&mut self, set: usize) -> Result<usize, ResolveError> {
        if set >= self.sets.len() {
            self.active = false;
            return Err(self.exhausted(set, 0));
        }
        self.set_index = set;
        self.value_index = 0;
        self.last_param = None;
        self.active = true;
        self.next_set = set + 1;
        Ok(set)
    }

    /// Close the current invocation; further explicit reads fail until the next one begins.
    pub fn end_invocation(&mut self) {
        self.active = false;
    }

    /// Read the next example value for `request`.
    pub fn next_value(&mut self, request: ValueRequest) -> Result<Value, ResolveError> {
        match self.mode {
            CursorMode::Explicit => self.read_slot(request),
            CursorMode::Inferred => self.read_inferred(request.param_index),
        }
    }

    fn read_slot(&mut self, request: ValueRequest) -> Result<Value, ResolveError> {
        if !self.active {
            return Err(ResolveError::NoActiveInvocation {
                method: self.method.clone(),
            });
        }
        let value = self
            .sets
            .get(self.set_index)
            .and_then(|set| set.get(request.slot))
            .cloned()
            .ok_or_else(|| self.exhausted(self.set_index, request.slot))?;
        self.last_param = Some(request.param_index);
        self.value_index = request.slot + 1;
        Ok(value)
    }

    fn read_inferred(&mut self, param_index: usize) -> Result<Value, ResolveError> {
        // A non-increasing index means a new invocation cycled back to its first example parameter.
        if self.last_param.is_some_and(|last| param_index <= last) {
            self.set_index += 1;
            self.value_index = 0;
        }
        self.last_param = Some(param_index);

        let (set, slot) = (self.set_index, self.value_index);
        let value = self
            .sets
            .get(set)
            .and_then(|s| s.get(slot))
            .cloned()
            .ok_or_else(|| self.exhausted(set, slot))?;
        self.value_index += 1;
        Ok(value)
    }

    /// Rewind to the state of a freshly created cursor.
    pub fn reset(&mut self) {
        self.set_index = 0;
        self.value_index = 0;
        self.last_param = None;
        self.active = false;
        self.next_set = 0;
    }

    fn exhausted(&self, set_index: usize, value_index: usize) -> ResolveError {
        ResolveError::ExampleSetExhausted {
            method: self.method.clone(),
            set_index,
            value_index,
            available: self.sets.len(),
        }
    }
}
