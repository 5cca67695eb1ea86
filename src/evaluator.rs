use std::{cell::Cell, cmp::Ordering, sync::Arc};

use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::{
    ast::{ArithmeticOp, Arguments, ComparisonOp, Expr, Literal, LogicalOp, Visitor},
    methods,
    runner::EngineOptions,
    scope::{Context, Globals, Scope},
    value::{Function, Value},
};

/// Hook applied to the target of every member access before the member is
/// resolved. Returning an error aborts the evaluation.
pub type Interceptor = Arc<dyn Fn(Value) -> Result<Value, EvalError> + Send + Sync>;

/// Errors that can occur during query evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Call of a global function that is not registered
    #[error("unknown global function '{0}'")]
    UnknownGlobal(String),

    /// Member access on a value that is neither array, object nor host object
    #[error("cannot access member '{member}' on {kind}")]
    InvalidMemberTarget { member: String, kind: String },

    /// Unresolvable bare name while strict variables are enabled
    #[error("unknown identifier '{0}'")]
    MissingIdentifier(String),

    /// Arguments supplied to a member that cannot be called
    #[error("member '{member}' is a {kind} and cannot be called")]
    NotCallable { member: String, kind: String },

    /// Type mismatch or invalid operation for the given type
    #[error("type error: {0}")]
    TypeError(String),

    #[error("division by zero")]
    DivisionByZero,

    /// Nesting of the evaluation exceeded the configured limit
    #[error("maximum evaluation depth of {0} exceeded")]
    DepthExceeded(usize),

    /// Raised by a host function, method or interceptor
    #[error("{0}")]
    Host(String),
}

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Counts one level of evaluation on this thread for as long as it lives.
///
/// Thread-wide so that closures called back from host code add to the depth
/// of the evaluation that created them.
struct DepthGuard;

impl DepthGuard {
    fn enter(limit: usize) -> Result<Self, EvalError> {
        DEPTH.with(|depth| {
            let next = depth.get() + 1;
            if next > limit {
                warn!(limit, "evaluation depth limit reached");
                return Err(EvalError::DepthExceeded(limit));
            }
            depth.set(next);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get() - 1));
    }
}

/// Engine-wide pieces every evaluation shares.
#[derive(Clone, Default)]
pub struct Environment {
    globals: Arc<Globals>,
    interceptor: Option<Interceptor>,
    options: EngineOptions,
}

impl Environment {
    pub fn new(globals: Arc<Globals>, interceptor: Option<Interceptor>, options: EngineOptions) -> Self {
        Environment {
            globals,
            interceptor,
            options,
        }
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub(crate) fn set_options(&mut self, options: EngineOptions) {
        self.options = options;
    }
}

/// The default evaluator: resolves an AST against one context.
pub struct Interpreter<'a> {
    context: &'a Context,
    env: &'a Environment,
}

impl<'a> Interpreter<'a> {
    pub fn new(context: &'a Context, env: &'a Environment) -> Self {
        Interpreter { context, env }
    }

    /// Evaluates `expr` to a value.
    ///
    /// # Examples
    ///
    /// ```
    /// use dotquery::{Context, Value};
    /// use dotquery::evaluator::{Environment, Interpreter};
    /// use dotquery::parser::parse;
    ///
    /// let expr = parse("price * 2").unwrap();
    /// let context = Context::new().with("price", 21);
    /// let env = Environment::default();
    ///
    /// let result = Interpreter::new(&context, &env).evaluate(&expr).unwrap();
    /// assert_eq!(result, Value::Integer(42));
    /// ```
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        self.eval(expr)
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        let _guard = DepthGuard::enter(self.env.options.max_depth)?;
        expr.resolve(self)
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, EvalError> {
        exprs.iter().map(|expr| self.eval(expr)).collect()
    }

    fn intercept(&self, value: Value) -> Result<Value, EvalError> {
        match &self.env.interceptor {
            Some(interceptor) => interceptor(value),
            None => Ok(value),
        }
    }

    /// Reads `member` of an element on behalf of a built-in method, going
    /// through the interceptor like any other member access.
    fn read_member(&self, item: &Value, member: &str) -> Result<Value, EvalError> {
        let target = self.intercept(item.clone().force()?)?;
        self.access(&target, member, None)
    }

    fn access(&self, target: &Value, member: &str, args: Option<&[Value]>) -> Result<Value, EvalError> {
        match target {
            Value::Array(items) => {
                let entry = member.parse::<usize>().ok().and_then(|index| items.get(index));
                match entry {
                    Some(entry) => use_entry(entry, member, args),
                    None => self.builtin(target, member, args),
                }
            }
            Value::Object(map) => match map.get(member) {
                Some(entry) => use_entry(entry, member, args),
                None => self.builtin(target, member, args),
            },
            Value::Host(object) => {
                if object.has_method(member) {
                    return object.call_method(member, args.unwrap_or(&[]));
                }
                match object.property(member) {
                    Some(property) => use_entry(&property, member, args),
                    None => Ok(Value::Null),
                }
            }
            other => Err(EvalError::InvalidMemberTarget {
                member: member.to_string(),
                kind: other.kind().to_string(),
            }),
        }
    }

    fn builtin(&self, target: &Value, member: &str, args: Option<&[Value]>) -> Result<Value, EvalError> {
        let read = |item: &Value, name: &str| self.read_member(item, name);
        methods::call(target, member, args.unwrap_or(&[]), &read).unwrap_or(Ok(Value::Null))
    }
}

/// Turns a found array/object entry into the member's value.
fn use_entry(entry: &Value, member: &str, args: Option<&[Value]>) -> Result<Value, EvalError> {
    match (entry, args) {
        (Value::Function(function), Some(args)) => function.call(args),
        (Value::Lazy(lazy), _) => lazy.force(),
        (other, Some(_)) => Err(EvalError::NotCallable {
            member: member.to_string(),
            kind: other.kind().to_string(),
        }),
        (other, _) => Ok(other.clone()),
    }
}

impl Visitor for Interpreter<'_> {
    type Output = Result<Value, EvalError>;

    fn visit_literal(&mut self, literal: &Literal) -> Self::Output {
        Ok(match literal {
            Literal::Null => Value::Null,
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Integer(n) => Value::Integer(*n),
            Literal::Float(n) => Value::Float(*n),
            Literal::String(s) => Value::String(s.clone()),
        })
    }

    fn visit_variable(&mut self, name: &str) -> Self::Output {
        match Scope::get(name, self.context, &self.env.globals)? {
            Some(value) => Ok(value),
            None if self.env.options.strict_variables => {
                Err(EvalError::MissingIdentifier(name.to_string()))
            }
            None => Ok(Value::Null),
        }
    }

    fn visit_array_list(&mut self, elements: &[Expr]) -> Self::Output {
        self.eval_all(elements).map(Value::Array)
    }

    fn visit_arguments(&mut self, arguments: &Arguments) -> Self::Output {
        self.eval_all(arguments.elements()).map(Value::Array)
    }

    fn visit_member_access(
        &mut self,
        object: &Expr,
        member: &str,
        arguments: Option<&Arguments>,
        null_safe: bool,
    ) -> Self::Output {
        let target = self.eval(object)?.force()?;

        if null_safe && target.is_null() {
            trace!(member, "null-safe access on null");
            return Ok(Value::Null);
        }

        let args = match arguments {
            Some(arguments) => Some(self.eval_all(arguments.elements())?),
            None => None,
        };
        let target = self.intercept(target)?;

        self.access(&target, member, args.as_deref())
    }

    fn visit_function_call(&mut self, name: &str, arguments: &Arguments) -> Self::Output {
        let function = self
            .env
            .globals
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownGlobal(name.to_string()))?;

        let args = self.eval_all(arguments.elements())?;
        trace!(name, args = args.len(), "calling global");
        function.call(&args)
    }

    fn visit_arithmetic(&mut self, left: &Expr, op: ArithmeticOp, right: &Expr) -> Self::Output {
        let left = self.eval(left)?;
        let right = self.eval(right)?;
        apply_arithmetic(op, &left, &right)
    }

    fn visit_comparison(&mut self, left: &Expr, op: ComparisonOp, right: &Expr) -> Self::Output {
        let left = self.eval(left)?;
        let right = self.eval(right)?;
        apply_comparison(op, &left, &right)
    }

    fn visit_logical(&mut self, left: &Expr, op: LogicalOp, right: &Expr) -> Self::Output {
        // Both sides are evaluated before the operator applies; no short-circuit.
        let left = self.eval(left)?;
        let right = self.eval(right)?;
        Ok(Value::Boolean(match op {
            LogicalOp::And => left.is_truthy() && right.is_truthy(),
            LogicalOp::Or => left.is_truthy() || right.is_truthy(),
        }))
    }

    fn visit_coalescence(&mut self, left: &Expr, right: &Expr) -> Self::Output {
        let left = self.eval(left)?;
        if left.is_null() {
            self.eval(right)
        } else {
            Ok(left)
        }
    }

    fn visit_ternary(
        &mut self,
        condition: &Expr,
        true_branch: Option<&Expr>,
        false_branch: &Expr,
    ) -> Self::Output {
        let condition = self.eval(condition)?;
        match true_branch {
            Some(branch) if condition.is_truthy() => self.eval(branch),
            None if condition.is_truthy() => Ok(condition),
            _ => self.eval(false_branch),
        }
    }

    fn visit_closure(&mut self, params: &[String], body: &Arc<Expr>) -> Self::Output {
        let params: Arc<[String]> = params.into();
        let body = Arc::clone(body);
        let captured = Arc::new(self.context.clone());
        let env = self.env.clone();

        Ok(Value::Function(Function::new(move |args| {
            let mut scope = Context::nested(Arc::clone(&captured));
            for (index, param) in params.iter().enumerate() {
                scope.insert(param.clone(), args.get(index).cloned().unwrap_or(Value::Null));
            }
            debug!(params = params.len(), args = args.len(), "invoking closure");
            Interpreter::new(&scope, &env).evaluate(&body)
        })))
    }
}

/// Applies an arithmetic operator to two already evaluated operands.
pub fn apply_arithmetic(op: ArithmeticOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let not_numeric = |v: &Value| {
        EvalError::TypeError(format!(
            "cannot use {} as a number in '{}'",
            v.kind(),
            op.symbol()
        ))
    };
    let a = left.to_number().ok_or_else(|| not_numeric(left))?;
    let b = right.to_number().ok_or_else(|| not_numeric(right))?;

    match op {
        ArithmeticOp::Modulo => {
            let divisor = truncate(&b);
            if divisor == 0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Value::Integer(truncate(&a).checked_rem(divisor).unwrap_or(0)))
        }
        ArithmeticOp::Divide if b.as_float() == Some(0.0) => Err(EvalError::DivisionByZero),
        _ => Ok(match (a, b) {
            (Value::Integer(a), Value::Integer(b)) => integer_op(op, a, b),
            (Value::Float(a), Value::Float(b)) => Value::Float(float_op(op, a, b)),
            (a, b) => mixed_op(op, &a, &b),
        }),
    }
}

fn truncate(n: &Value) -> i64 {
    match n {
        Value::Integer(n) => *n,
        Value::Float(f) => f.trunc() as i64,
        _ => 0,
    }
}

fn float_op(op: ArithmeticOp, a: f64, b: f64) -> f64 {
    match op {
        ArithmeticOp::Add => a + b,
        ArithmeticOp::Subtract => a - b,
        ArithmeticOp::Multiply => a * b,
        ArithmeticOp::Divide => a / b,
        ArithmeticOp::Modulo => a % b,
    }
}

/// Integer arithmetic that stays integral; overflow falls back to floats.
fn integer_op(op: ArithmeticOp, a: i64, b: i64) -> Value {
    let exact = match op {
        ArithmeticOp::Add => a.checked_add(b),
        ArithmeticOp::Subtract => a.checked_sub(b),
        ArithmeticOp::Multiply => a.checked_mul(b),
        // Check if division is exact; if not, return Float
        ArithmeticOp::Divide => a
            .checked_rem(b)
            .filter(|rem| *rem == 0)
            .and_then(|_| a.checked_div(b)),
        ArithmeticOp::Modulo => a.checked_rem(b),
    };
    match exact {
        Some(n) => Value::Integer(n),
        None => Value::Float(float_op(op, a as f64, b as f64)),
    }
}

/// Mixed integer/float arithmetic through decimals, so that `100 * 1.1` is
/// exactly `110` rather than `110.00000000000001`.
fn mixed_op(op: ArithmeticOp, a: &Value, b: &Value) -> Value {
    let fallback = || {
        Value::Float(float_op(
            op,
            a.as_float().unwrap_or_default(),
            b.as_float().unwrap_or_default(),
        ))
    };
    let (Some(ad), Some(bd)) = (to_decimal(a), to_decimal(b)) else {
        return fallback();
    };
    let result = match op {
        ArithmeticOp::Add => ad.checked_add(bd),
        ArithmeticOp::Subtract => ad.checked_sub(bd),
        ArithmeticOp::Multiply => ad.checked_mul(bd),
        ArithmeticOp::Divide => ad.checked_div(bd),
        ArithmeticOp::Modulo => ad.checked_rem(bd),
    };
    match result {
        Some(rd) if rd.is_integer() => rd.to_i64().map(Value::Integer).unwrap_or_else(fallback),
        Some(rd) => rd.to_f64().map(Value::Float).unwrap_or_else(fallback),
        None => fallback(),
    }
}

fn to_decimal(n: &Value) -> Option<Decimal> {
    match n {
        Value::Integer(i) => Decimal::from_i64(*i),
        Value::Float(f) => Decimal::from_f64(*f),
        _ => None,
    }
}

/// Applies a comparison operator to two already evaluated operands.
pub fn apply_comparison(op: ComparisonOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let result = match op {
        ComparisonOp::Equal => left.loose_eq(right),
        ComparisonOp::NotEqual => !left.loose_eq(right),
        ComparisonOp::Identical => left == right,
        ComparisonOp::NotIdentical => left != right,
        ComparisonOp::LessThan
        | ComparisonOp::LessEqual
        | ComparisonOp::GreaterThan
        | ComparisonOp::GreaterEqual => match order(op, left, right)? {
            None => false,
            Some(ordering) => match op {
                ComparisonOp::LessThan => ordering == Ordering::Less,
                ComparisonOp::LessEqual => ordering != Ordering::Greater,
                ComparisonOp::GreaterThan => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            },
        },
    };
    Ok(Value::Boolean(result))
}

/// Natural ordering: numeric for numbers and numeric strings, lexicographic
/// for other strings. `None` when a NaN is involved.
fn order(op: ComparisonOp, left: &Value, right: &Value) -> Result<Option<Ordering>, EvalError> {
    match (left.numeric(), right.numeric()) {
        (Some(Value::Integer(a)), Some(Value::Integer(b))) => Ok(Some(a.cmp(&b))),
        (Some(a), Some(b)) => Ok(a
            .as_float()
            .zip(b.as_float())
            .and_then(|(a, b)| a.partial_cmp(&b))),
        _ => match (left, right) {
            (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
            (a, b) => Err(EvalError::TypeError(format!(
                "cannot compare {} {} {} (comparison requires numbers or strings)",
                a.kind(),
                op.symbol(),
                b.kind()
            ))),
        },
    }
}
