use std::{fmt, sync::Arc};

use indexmap::IndexMap;

use crate::evaluator::EvalError;

/// Ordered string-keyed map used for object values and contexts.
pub type Map = IndexMap<String, Value>;

/// A structured object supplied by the host application.
///
/// Member access on a host object prefers a method of the requested name
/// over a property of the same name. Unknown members resolve to null.
///
/// # Examples
///
/// ```
/// use dotquery::{EvalError, HostObject, Value};
///
/// #[derive(Debug)]
/// struct Page {
///     title: String,
/// }
///
/// impl HostObject for Page {
///     fn type_name(&self) -> &str {
///         "page"
///     }
///
///     fn has_method(&self, name: &str) -> bool {
///         name == "slug"
///     }
///
///     fn call_method(&self, _name: &str, _args: &[Value]) -> Result<Value, EvalError> {
///         Ok(Value::from(self.title.to_lowercase().replace(' ', "-")))
///     }
///
///     fn property(&self, name: &str) -> Option<Value> {
///         (name == "title").then(|| Value::from(self.title.as_str()))
///     }
/// }
/// ```
pub trait HostObject: fmt::Debug + Send + Sync {
    /// Name reported in type errors, e.g. `"page"`.
    fn type_name(&self) -> &str;

    fn has_method(&self, _name: &str) -> bool {
        false
    }

    fn call_method(&self, name: &str, _args: &[Value]) -> Result<Value, EvalError> {
        Err(EvalError::Host(format!(
            "{} has no method '{}'",
            self.type_name(),
            name
        )))
    }

    fn property(&self, _name: &str) -> Option<Value> {
        None
    }
}

type Callable = dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync;
type Thunk = dyn Fn() -> Result<Value, EvalError> + Send + Sync;

/// A callable value: a host global, a host-provided entry or a closure.
#[derive(Clone)]
pub struct Function(Arc<Callable>);

impl Function {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Function(Arc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        (self.0)(args)
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Function(..)")
    }
}

/// A deferred value, computed every time it is read.
#[derive(Clone)]
pub struct Lazy(Arc<Thunk>);

impl Lazy {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Lazy(Arc::new(f))
    }

    pub fn force(&self) -> Result<Value, EvalError> {
        (self.0)()
    }

    pub fn ptr_eq(&self, other: &Lazy) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Lazy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Lazy(..)")
    }
}

/// A runtime value produced or consumed by queries.
///
/// `Array` and `Object` are looked up by index/key; `Host` objects are asked
/// for methods and properties. `Lazy` values are forced whenever they are
/// read through a variable or member access.
///
/// `==` on `Value` is the language's strict (`===`) equality; loose (`==`)
/// equality is [`Value::loose_eq`].
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value; the sentinel `??` and `?.` test for
    Null,

    Boolean(bool),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    Float(f64),

    String(String),

    Array(Vec<Value>),

    /// Ordered key/value map
    Object(Map),

    /// Structured object owned by the host
    Host(Arc<dyn HostObject>),

    Function(Function),

    Lazy(Lazy),
}

impl Value {
    pub fn host(object: impl HostObject + 'static) -> Self {
        Value::Host(Arc::new(object))
    }

    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Value::Function(Function::new(f))
    }

    pub fn lazy<F>(f: F) -> Self
    where
        F: Fn() -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Value::Lazy(Lazy::new(f))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Kind name used in error messages; host objects report their own.
    pub fn kind(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Host(object) => object.type_name(),
            Value::Function(_) => "function",
            Value::Lazy(_) => "lazy",
        }
    }

    /// Check if the value is truthy (for conditions)
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::String(s) => !s.is_empty() && s != "0",
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
            Value::Host(_) | Value::Function(_) | Value::Lazy(_) => true,
        }
    }

    /// Evaluates a lazy value; every other value is returned unchanged.
    pub fn force(self) -> Result<Value, EvalError> {
        match self {
            Value::Lazy(lazy) => lazy.force(),
            other => Ok(other),
        }
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as string (for joining and display)
    pub fn as_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Float(n) => n.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Null => String::new(),
            other => format!("<{}>", other.kind()),
        }
    }

    /// Coerces to `Integer` or `Float` for arithmetic.
    ///
    /// Booleans count as 1/0, null as 0 and numeric strings as their number.
    pub fn to_number(&self) -> Option<Value> {
        match self {
            Value::Integer(_) | Value::Float(_) => Some(self.clone()),
            Value::Boolean(b) => Some(Value::Integer(i64::from(*b))),
            Value::Null => Some(Value::Integer(0)),
            Value::String(s) => parse_numeric(s),
            _ => None,
        }
    }

    /// Number view used by ordering and loose equality: real numbers and
    /// numeric strings only.
    pub(crate) fn numeric(&self) -> Option<Value> {
        match self {
            Value::Integer(_) | Value::Float(_) => Some(self.clone()),
            Value::String(s) => parse_numeric(s),
            _ => None,
        }
    }

    /// Loose (`==`) equality.
    ///
    /// Null equals every falsy value, booleans compare by truthiness,
    /// numbers compare numerically (numeric strings included) and arrays and
    /// objects compare element-wise with the same rules.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, v) | (v, Value::Null) => !v.is_truthy(),
            (Value::Boolean(b), v) | (v, Value::Boolean(b)) => *b == v.is_truthy(),
            (Value::String(a), Value::String(b)) => match (parse_numeric(a), parse_numeric(b)) {
                (Some(x), Some(y)) => numbers_equal(&x, &y),
                _ => a == b,
            },
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, x)| b.get(k).is_some_and(|y| x.loose_eq(y)))
            }
            (a, b) => match (a.numeric(), b.numeric()) {
                (Some(x), Some(y)) => numbers_equal(&x, &y),
                _ => a == b,
            },
        }
    }
}

fn numbers_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x == y,
        _ => a.as_float() == b.as_float(),
    }
}

/// Parses decimal integer or float text; rejects `inf`, `NaN` and friends.
fn parse_numeric(s: &str) -> Option<Value> {
    let s = s.trim();
    if s.is_empty()
        || !s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return None;
    }
    if let Ok(n) = s.parse::<i64>() {
        return Some(Value::Integer(n));
    }
    s.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(Value::Float)
}

/// Strict (`===`) equality: same kind and same value; host objects,
/// functions and lazy values by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Host(a), Value::Host(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Lazy(a), Value::Lazy(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(map)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Object(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
