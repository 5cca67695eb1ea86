//! Name resolution for bare identifiers.
//!
//! A name is looked up in the per-call [`Context`] first, then in the
//! engine-wide [`Globals`], then matched against the `this` alias for the
//! whole context. Anything else is a miss and the caller picks the fallback.

use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    evaluator::EvalError,
    value::{Function, Map, Value},
};

/// Reserved name that resolves to the whole evaluation context.
pub const CONTEXT_ALIAS: &str = "this";

/// Variables available to one evaluation.
///
/// A context may sit on top of a parent context (closure calls do this);
/// lookups fall through to the parent and own entries shadow it.
#[derive(Debug, Clone, Default)]
pub struct Context {
    values: Map,
    parent: Option<Arc<Context>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty layer whose misses fall through to `parent`.
    pub fn nested(parent: Arc<Context>) -> Self {
        Context {
            values: Map::new(),
            parent: Some(parent),
        }
    }

    /// Builder-style insert.
    ///
    /// # Examples
    ///
    /// ```
    /// use dotquery::{Context, Value};
    ///
    /// let context = Context::new().with("offset", 10).with("name", "Ada");
    /// assert_eq!(context.get("offset"), Some(&Value::Integer(10)));
    /// ```
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        match self.values.get(name) {
            Some(value) => Some(value),
            None => self.parent.as_deref().and_then(|parent| parent.get(name)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of entries in this layer, excluding parents.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.parent.as_ref().is_none_or(|p| p.is_empty())
    }

    /// All visible entries, parents first, shadowed names replaced in place.
    pub fn to_map(&self) -> Map {
        let mut map = match &self.parent {
            Some(parent) => parent.to_map(),
            None => Map::new(),
        };
        for (name, value) in &self.values {
            map.insert(name.clone(), value.clone());
        }
        map
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Context {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            parent: None,
        }
    }
}

impl From<Map> for Context {
    fn from(values: Map) -> Self {
        Context {
            values,
            parent: None,
        }
    }
}

/// Host functions reachable from every query.
///
/// Referenced as a bare name (`site`) a global is called with no arguments;
/// called explicitly (`page('blog')`) it receives the evaluated arguments.
#[derive(Clone, Default)]
pub struct Globals {
    functions: HashMap<String, Function>,
}

impl Globals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new global function
    pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Function::new(f));
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.register(name, f);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    /// Check whether a global exists
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for Globals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("Globals").field("functions", &names).finish()
    }
}

pub struct Scope;

impl Scope {
    /// Resolves a bare name; `Ok(None)` means the name is unknown.
    ///
    /// Lazy context entries are forced on every lookup, globals are called
    /// with no arguments.
    pub fn get(name: &str, context: &Context, globals: &Globals) -> Result<Option<Value>, EvalError> {
        if let Some(value) = context.get(name) {
            return value.clone().force().map(Some);
        }
        if let Some(function) = globals.get(name) {
            return function.call(&[]).map(Some);
        }
        if name == CONTEXT_ALIAS {
            return Ok(Some(Value::Object(context.to_map())));
        }
        Ok(None)
    }
}
