use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, trace};

use crate::{
    Error,
    ast::Expr,
    cache::{Cache, QueryCache},
    evaluator::{Environment, EvalError, Interceptor, Interpreter},
    parser::{ParseError, parse},
    scope::{Context, Globals, Scope},
    value::Value,
};

/// Queries that are nothing but one name skip the parser.
static BARE_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier pattern"));

/// Evaluation limits and switches shared by every query a runner evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Maximum nesting of evaluation steps before `DepthExceeded`
    pub max_depth: usize,
    /// Unknown bare names raise `MissingIdentifier` instead of yielding null
    pub strict_variables: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            max_depth: 128,
            strict_variables: false,
        }
    }
}

impl EngineOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_strict_variables(mut self, strict: bool) -> Self {
        self.strict_variables = strict;
        self
    }
}

/// Entry point for evaluating query strings.
///
/// A runner owns the globals and interceptor every query sees and a handle
/// to a parse cache, which may be shared with other runners.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use dotquery::{Context, Globals, QueryCache, Runner, Value};
///
/// let globals = Globals::new().with("site", |_| {
///     Ok(Value::from_iter([("title", "Home")]))
/// });
/// let runner = Runner::new(globals, None, QueryCache::shared());
///
/// let context = Context::new().with("limit", 3);
/// assert_eq!(runner.run("site.title", &context).unwrap(), Value::from("Home"));
/// assert_eq!(runner.run("limit * 2", &context).unwrap(), Value::Integer(6));
/// ```
#[derive(Clone)]
pub struct Runner {
    env: Environment,
    cache: Arc<dyn Cache>,
}

impl Runner {
    pub fn new(globals: Globals, interceptor: Option<Interceptor>, cache: Arc<dyn Cache>) -> Self {
        Runner {
            env: Environment::new(Arc::new(globals), interceptor, EngineOptions::default()),
            cache,
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.env.set_options(options);
        self
    }

    pub fn options(&self) -> EngineOptions {
        self.env.options()
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    /// Evaluates `query` against `context`.
    pub fn run(&self, query: &str, context: &Context) -> Result<Value, Error> {
        if is_bare_identifier(query) {
            if let Some(value) = Scope::get(query, context, self.env.globals())? {
                trace!(query, "resolved without parsing");
                return Ok(value);
            }
        }

        let expr = self.compile(query)?;
        Ok(self.evaluate(&expr, context)?)
    }

    /// Returns the syntax tree for `query`, parsing it only on a cache miss.
    pub fn compile(&self, query: &str) -> Result<Arc<Expr>, ParseError> {
        if let Some(expr) = self.cache.get(query) {
            trace!(query, "cache hit");
            return Ok(expr);
        }

        debug!(query, "compiling query");
        let expr = Arc::new(parse(query)?);
        Ok(self.cache.insert(query, expr))
    }

    /// Evaluates an already parsed query.
    pub fn evaluate(&self, expr: &Expr, context: &Context) -> Result<Value, EvalError> {
        Interpreter::new(context, &self.env).evaluate(expr)
    }
}

impl Default for Runner {
    fn default() -> Self {
        Runner::new(Globals::new(), None, QueryCache::shared())
    }
}

fn is_bare_identifier(query: &str) -> bool {
    if !BARE_IDENTIFIER.is_match(query) {
        return false;
    }
    let keyword = ["true", "false", "null"]
        .iter()
        .any(|word| query.eq_ignore_ascii_case(word));
    !keyword && query != "AND" && query != "OR"
}
