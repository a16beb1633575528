//! Dynamic argument values.
//!
//! Test methods receive their positional arguments as [`Value`]s. Literal example data maps onto the scalar and list
//! variants; providers that hand out real objects (a connection pool, a temp dir guard) wrap them in [`Opaque`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A single argument value.
///
/// `Undefined` is what a parameter receives when no resolver is bound at its position, or when its provider key has
/// no registered provider (under the permissive policy).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Opaque(Opaque),
}

impl Value {
    /// Wrap an arbitrary shared object.
    pub fn opaque<U: Any + Send + Sync>(value: U) -> Self {
        Value::Opaque(Opaque::new(value))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Read a float; integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the wrapped object of an `Opaque` value as `U`.
    pub fn downcast_ref<U: Any>(&self) -> Option<&U> {
        match self {
            Value::Opaque(o) => o.downcast_ref::<U>(),
            _ => None,
        }
    }

    /// Short name of the variant, used in argument mismatch messages.
    ///
    /// ## Examples
    /// ```rust
    /// use casebook_core::Value;
    ///
    /// assert_eq!(Value::from(3).kind(), "int");
    /// assert_eq!(Value::Undefined.kind(), "undefined");
    /// ```
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Opaque(o) => o.type_name(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Opaque(o) => write!(f, "<{}>", o.type_name()),
        }
    }
}

/// A shared, type-erased object carried inside a [`Value`].
///
/// Equality is identity: two `Opaque`s are equal only when they point at the same allocation.
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    pub fn new<U: Any + Send + Sync>(value: U) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc<U: Any + Send + Sync>(value: Arc<U>) -> Self {
        Self {
            type_name: std::any::type_name::<U>(),
            inner: value,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<U: Any>(&self) -> Option<&U> {
        self.inner.downcast_ref::<U>()
    }

    /// Clone out a typed handle to the shared object.
    pub fn downcast_arc<U: Any + Send + Sync>(&self) -> Option<Arc<U>> {
        Arc::clone(&self.inner).downcast::<U>().ok()
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Opaque").field(&self.type_name).finish()
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Undefined
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! int_from {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(i: $ty) -> Self {
                Value::Int(i64::from(i))
            }
        })*
    };
}

int_from!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(f64::from(x))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Str(s.clone())
    }
}

impl From<Opaque> for Value {
    fn from(o: Opaque) -> Self {
        Value::Opaque(o)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
