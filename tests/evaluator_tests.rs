// tests/evaluator_tests.rs

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use dotquery::ast::{ArithmeticOp, ComparisonOp};
use dotquery::evaluator::{
    Environment, EvalError, Interceptor, Interpreter, apply_arithmetic, apply_comparison,
};
use dotquery::parser::parse;
use dotquery::{Context, EngineOptions, Globals, HostObject, Map, Value};

fn eval_with(query: &str, context: &Context, env: &Environment) -> Result<Value, EvalError> {
    let expr = parse(query).unwrap();
    Interpreter::new(context, env).evaluate(&expr)
}

fn eval(query: &str, context: &Context) -> Result<Value, EvalError> {
    eval_with(query, context, &Environment::default())
}

fn eval_empty(query: &str) -> Value {
    eval(query, &Context::new()).unwrap()
}

fn object(entries: Vec<(&str, Value)>) -> Value {
    Value::Object(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<Map>(),
    )
}

#[derive(Debug)]
struct Page {
    title: String,
    children: Vec<Value>,
}

impl HostObject for Page {
    fn type_name(&self) -> &str {
        "page"
    }

    fn has_method(&self, name: &str) -> bool {
        matches!(name, "children" | "title" | "slug")
    }

    fn call_method(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        match name {
            "children" => Ok(Value::Array(self.children.clone())),
            "title" => Ok(Value::from(self.title.to_uppercase())),
            "slug" => {
                let separator = args.first().map(Value::as_string).unwrap_or("-".to_string());
                Ok(Value::from(self.title.to_lowercase().replace(' ', &separator)))
            }
            _ => unreachable!(),
        }
    }

    fn property(&self, name: &str) -> Option<Value> {
        match name {
            // shadowed by the method of the same name
            "title" => Some(Value::from(self.title.as_str())),
            "num" => Some(Value::from(7)),
            "later" => Some(Value::lazy(|| Ok(Value::from("forced")))),
            _ => None,
        }
    }
}

fn page(title: &str, children: Vec<Value>) -> Value {
    Value::host(Page {
        title: title.to_string(),
        children,
    })
}

// ============================================================================
// Arithmetic and comparison
// ============================================================================

#[test]
fn test_precedence() {
    assert_eq!(eval_empty("1 + 2 * 3"), Value::Integer(7));
    assert_eq!(eval_empty("(1 + 2) * 3"), Value::Integer(9));
    assert_eq!(eval_empty("10 - 4 - 3"), Value::Integer(3));
    assert_eq!(eval_empty("-2 * 3"), Value::Integer(-6));
}

#[test]
fn test_mixed_arithmetic() {
    assert_eq!(eval_empty("100 * 1.1"), Value::Integer(110));
    assert_eq!(eval_empty("7 / 2"), Value::Float(3.5));
    assert_eq!(eval_empty("1.5 + 1.5"), Value::Float(3.0));
    assert_eq!(eval_empty("'3' + 4"), Value::Integer(7));
    assert_eq!(eval_empty("null + 1"), Value::Integer(1));
    assert_eq!(eval_empty("true + true"), Value::Integer(2));
    assert_eq!(eval_empty("7 % 3"), Value::Integer(1));
}

#[test]
fn test_integer_results() {
    let result = apply_arithmetic(ArithmeticOp::Multiply, &Value::from(100), &Value::from(1.1));
    assert_eq!(result.unwrap(), Value::Integer(110));

    let exact = apply_arithmetic(ArithmeticOp::Divide, &Value::from(10), &Value::from(2));
    assert_eq!(exact.unwrap(), Value::Integer(5));
    let inexact = apply_arithmetic(ArithmeticOp::Divide, &Value::from(7), &Value::from(2));
    assert_eq!(inexact.unwrap(), Value::Float(3.5));

    let result = apply_arithmetic(ArithmeticOp::Add, &Value::from(i64::MAX), &Value::from(1));
    assert!(matches!(result.unwrap(), Value::Float(_)));
}

#[test]
fn test_modulo_truncates() {
    let result = apply_arithmetic(ArithmeticOp::Modulo, &Value::from(7.9), &Value::from(3));
    assert_eq!(result.unwrap(), Value::Integer(1));
    let zero = apply_arithmetic(ArithmeticOp::Modulo, &Value::from(7), &Value::from(0.5));
    assert_eq!(zero.unwrap_err(), EvalError::DivisionByZero);
}

#[test]
fn test_arithmetic_errors() {
    assert_eq!(eval("1 / 0", &Context::new()), Err(EvalError::DivisionByZero));
    assert_eq!(eval("1 % 0", &Context::new()), Err(EvalError::DivisionByZero));
    assert!(matches!(
        eval("'abc' * 2", &Context::new()),
        Err(EvalError::TypeError(_))
    ));
    assert!(matches!(
        eval("[1] + 1", &Context::new()),
        Err(EvalError::TypeError(_))
    ));
}

#[test]
fn test_equality() {
    assert_eq!(eval_empty("1 == 1.0"), Value::Boolean(true));
    assert_eq!(eval_empty("1 === 1.0"), Value::Boolean(false));
    assert_eq!(eval_empty("'10' == 10"), Value::Boolean(true));
    assert_eq!(eval_empty("'10' !== 10"), Value::Boolean(true));
    assert_eq!(eval_empty("null == false"), Value::Boolean(true));
    assert_eq!(eval_empty("[1, 2] === [1, 2]"), Value::Boolean(true));
}

#[test]
fn test_ordering() {
    assert_eq!(eval_empty("2 < 10"), Value::Boolean(true));
    assert_eq!(eval_empty("'2' < '10'"), Value::Boolean(true));
    assert_eq!(eval_empty("'b' > 'a'"), Value::Boolean(true));
    assert_eq!(eval_empty("2.5 >= 2"), Value::Boolean(true));
    assert!(matches!(
        eval("[1] < 2", &Context::new()),
        Err(EvalError::TypeError(_))
    ));
}

#[test]
fn test_string_ordering() {
    let result = apply_comparison(ComparisonOp::LessThan, &Value::from("apple"), &Value::from("banana"));
    assert_eq!(result.unwrap(), Value::Boolean(true));
    let numeric = apply_comparison(ComparisonOp::LessThan, &Value::from("9"), &Value::from("10"));
    assert_eq!(numeric.unwrap(), Value::Boolean(true));
}

// ============================================================================
// Logic, coalescing and ternaries
// ============================================================================

#[test]
fn test_logical_operators_return_booleans() {
    assert_eq!(eval_empty("1 && 'x'"), Value::Boolean(true));
    assert_eq!(eval_empty("0 || ''"), Value::Boolean(false));
    assert_eq!(eval_empty("true || false && false"), Value::Boolean(true));
    assert_eq!(eval_empty("true AND false OR true"), Value::Boolean(true));
}

#[test]
fn test_logical_operators_evaluate_both_sides() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let globals = Globals::new().with("tick", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Boolean(true))
    });
    let env = Environment::new(Arc::new(globals), None, EngineOptions::default());

    eval_with("true || tick()", &Context::new(), &env).unwrap();
    eval_with("false && tick()", &Context::new(), &env).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_coalescence_is_lazy() {
    let context = Context::new().with("name", "Ada");
    assert_eq!(eval("name ?? boom()", &context).unwrap(), Value::from("Ada"));
    assert_eq!(eval("missing ?? 'fallback'", &context).unwrap(), Value::from("fallback"));
    assert_eq!(eval("false ?? 'x'", &context).unwrap(), Value::Boolean(false));
    assert_eq!(
        eval("missing ?? boom()", &context),
        Err(EvalError::UnknownGlobal("boom".to_string()))
    );
}

#[test]
fn test_ternary_evaluates_one_branch() {
    let context = Context::new().with("x", 10);
    assert_eq!(
        eval("x > 5 ? 'big' : boom()", &context).unwrap(),
        Value::from("big")
    );
    assert_eq!(eval("x ?: 'none'", &context).unwrap(), Value::Integer(10));
    assert_eq!(eval("'' ?: 'none'", &context).unwrap(), Value::from("none"));
}

// ============================================================================
// Variables and globals
// ============================================================================

#[test]
fn test_variables() {
    let context = Context::new()
        .with("user", object(vec![("name", Value::from("Ada"))]))
        .with("later", Value::lazy(|| Ok(Value::from(5))));
    assert_eq!(eval("user.name", &context).unwrap(), Value::from("Ada"));
    assert_eq!(eval("later * 2", &context).unwrap(), Value::Integer(10));
    assert_eq!(eval("missing", &context).unwrap(), Value::Null);
    assert_eq!(eval("this.user.name", &context).unwrap(), Value::from("Ada"));
}

#[test]
fn test_strict_variables() {
    let env = Environment::new(
        Arc::new(Globals::new()),
        None,
        EngineOptions::default().with_strict_variables(true),
    );
    assert_eq!(
        eval_with("missing + 1", &Context::new(), &env),
        Err(EvalError::MissingIdentifier("missing".to_string()))
    );
    assert_eq!(
        eval_with("missing?.name", &Context::new(), &env),
        Err(EvalError::MissingIdentifier("missing".to_string()))
    );
}

#[test]
fn test_global_functions() {
    let globals = Globals::new()
        .with("double", |args| {
            let n = args.first().and_then(Value::as_float).unwrap_or(0.0);
            Ok(Value::from(n * 2.0))
        })
        .with("site", |_| Ok(object(vec![("title", Value::from("Home"))])));
    let env = Environment::new(Arc::new(globals), None, EngineOptions::default());
    let context = Context::new();

    assert_eq!(eval_with("double(21)", &context, &env).unwrap(), Value::Float(42.0));
    assert_eq!(eval_with("site.title", &context, &env).unwrap(), Value::from("Home"));
    assert_eq!(
        eval_with("nope(1)", &context, &env),
        Err(EvalError::UnknownGlobal("nope".to_string()))
    );
}

#[test]
fn test_unknown_global_is_reported_before_arguments() {
    let err = eval("nope(missing.field)", &Context::new()).unwrap_err();
    assert_eq!(err, EvalError::UnknownGlobal("nope".to_string()));
}

#[test]
fn test_host_errors_propagate() {
    let globals = Globals::new().with("fail", |_| Err(EvalError::Host("no access".to_string())));
    let env = Environment::new(Arc::new(globals), None, EngineOptions::default());
    assert_eq!(
        eval_with("1 + fail()", &Context::new(), &env),
        Err(EvalError::Host("no access".to_string()))
    );
}

// ============================================================================
// Member access
// ============================================================================

#[test]
fn test_arrays_and_objects() {
    let context = Context::new().with(
        "items",
        Value::Array(vec![
            object(vec![("title", Value::from("A"))]),
            object(vec![("title", Value::from("B"))]),
        ]),
    );
    assert_eq!(eval("items.first.title", &context).unwrap(), Value::from("A"));
    assert_eq!(eval("items.1.title", &context).unwrap(), Value::from("B"));
    assert_eq!(eval("items.5", &context).unwrap(), Value::Null);
    assert_eq!(eval("items.0.missing", &context).unwrap(), Value::Null);
}

#[test]
fn test_object_entries_win_over_builtins() {
    let context = Context::new().with("stats", object(vec![("count", Value::from(99))]));
    assert_eq!(eval("stats.count", &context).unwrap(), Value::Integer(99));
    assert_eq!(eval("stats.keys.first", &context).unwrap(), Value::from("count"));
}

#[test]
fn test_callable_entries() {
    let context = Context::new().with(
        "math",
        object(vec![
            (
                "add",
                Value::function(|args| {
                    let sum = args.iter().filter_map(Value::as_float).sum::<f64>();
                    Ok(Value::from(sum))
                }),
            ),
            ("deferred", Value::lazy(|| Ok(Value::from("now")))),
            ("pi", Value::from(3.14)),
        ]),
    );
    assert_eq!(eval("math.add(1, 2)", &context).unwrap(), Value::Float(3.0));
    assert_eq!(eval("math.deferred", &context).unwrap(), Value::from("now"));
    assert!(matches!(
        eval("math.add", &context).unwrap(),
        Value::Function(_)
    ));
    assert_eq!(
        eval("math.pi(1)", &context),
        Err(EvalError::NotCallable {
            member: "pi".to_string(),
            kind: "float".to_string()
        })
    );
}

#[test]
fn test_invalid_member_target() {
    let context = Context::new().with("name", "Ada");
    assert_eq!(
        eval("name.length", &context),
        Err(EvalError::InvalidMemberTarget {
            member: "length".to_string(),
            kind: "string".to_string()
        })
    );
    assert_eq!(
        eval("a.b.c", &context),
        Err(EvalError::InvalidMemberTarget {
            member: "b".to_string(),
            kind: "null".to_string()
        })
    );
}

#[test]
fn test_null_safe_chain() {
    let context = Context::new();
    assert_eq!(eval("a?.b.c", &context).unwrap(), Value::Null);
    assert_eq!(eval("a?.b(boom())", &context).unwrap(), Value::Null);
    assert_eq!(eval("a?.b.c ?? 'none'", &context).unwrap(), Value::from("none"));
}

#[test]
fn test_host_objects() {
    let context = Context::new().with(
        "page",
        page("Hello World", vec![page("Child", vec![])]),
    );
    assert_eq!(eval("page.title", &context).unwrap(), Value::from("HELLO WORLD"));
    assert_eq!(eval("page.slug", &context).unwrap(), Value::from("hello-world"));
    assert_eq!(eval("page.slug('_')", &context).unwrap(), Value::from("hello_world"));
    assert_eq!(eval("page.num", &context).unwrap(), Value::Integer(7));
    assert_eq!(eval("page.later", &context).unwrap(), Value::from("forced"));
    assert_eq!(eval("page.unknown", &context).unwrap(), Value::Null);
    assert_eq!(
        eval("page.children.first.title", &context).unwrap(),
        Value::from("CHILD")
    );
    assert!(matches!(
        eval("page.num(1)", &context),
        Err(EvalError::NotCallable { .. })
    ));
}

// ============================================================================
// Interceptor
// ============================================================================

fn deny_pages() -> Interceptor {
    Arc::new(|value: Value| {
        if let Value::Host(object) = &value
            && object.type_name() == "page"
        {
            return Err(EvalError::Host("pages are off limits".to_string()));
        }
        Ok(value)
    })
}

#[test]
fn test_interceptor_runs_before_lookup() {
    let env = Environment::new(Arc::new(Globals::new()), Some(deny_pages()), EngineOptions::default());
    let context = Context::new()
        .with("page", page("Secret", vec![]))
        .with("user", object(vec![("name", Value::from("Ada"))]));

    assert_eq!(
        eval_with("page.slug()", &context, &env),
        Err(EvalError::Host("pages are off limits".to_string()))
    );
    assert_eq!(eval_with("user.name", &context, &env).unwrap(), Value::from("Ada"));
}

#[test]
fn test_interceptor_can_replace_target() {
    let wrap: Interceptor = Arc::new(|value: Value| match value {
        Value::Host(_) => Ok(object(vec![("title", Value::from("wrapped"))])),
        other => Ok(other),
    });
    let env = Environment::new(Arc::new(Globals::new()), Some(wrap), EngineOptions::default());
    let context = Context::new().with("page", page("Real", vec![]));

    assert_eq!(eval_with("page.title", &context, &env).unwrap(), Value::from("wrapped"));
}

#[test]
fn test_interceptor_skipped_without_member_access() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let counting: Interceptor = Arc::new(move |value: Value| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    });
    let env = Environment::new(Arc::new(Globals::new()), Some(counting), EngineOptions::default());
    let context = Context::new().with("user", object(vec![("name", Value::from("Ada"))]));

    eval_with("1 + 2 * x", &context, &env).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    eval_with("user.name", &context, &env).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_interceptor_sees_builtin_member_reads() {
    let env = Environment::new(Arc::new(Globals::new()), Some(deny_pages()), EngineOptions::default());
    let context = Context::new().with("pages", Value::Array(vec![page("A", vec![])]));

    assert_eq!(
        eval_with("pages.pluck('title')", &context, &env),
        Err(EvalError::Host("pages are off limits".to_string()))
    );
}

// ============================================================================
// Closures
// ============================================================================

#[test]
fn test_closure_sees_enclosing_context() {
    let context = Context::new().with("offset", 10);
    let closure = eval("fn(x) => x + offset", &context).unwrap();
    match closure {
        Value::Function(f) => assert_eq!(f.call(&[Value::from(5)]).unwrap(), Value::Integer(15)),
        other => panic!("Expected function, got {:?}", other),
    }
}

#[test]
fn test_closure_parameters_shadow_context() {
    let context = Context::new().with("x", 100).with("offset", 10);
    let closure = eval("(x) => x + offset", &context).unwrap();
    match closure {
        Value::Function(f) => {
            assert_eq!(f.call(&[Value::from(1)]).unwrap(), Value::Integer(11));
            // missing arguments bind null
            assert_eq!(f.call(&[]).unwrap(), Value::Integer(10));
        }
        other => panic!("Expected function, got {:?}", other),
    }
}

#[test]
fn test_closures_in_builtins() {
    let context = Context::new()
        .with("min", 2)
        .with(
            "items",
            Value::Array(vec![
                object(vec![("title", Value::from("a")), ("rank", Value::from(3))]),
                object(vec![("title", Value::from("b")), ("rank", Value::from(1))]),
                object(vec![("title", Value::from("c")), ("rank", Value::from(2))]),
            ]),
        );

    assert_eq!(
        eval("items.filter(fn(i) => i.rank >= min).map(fn(i) => i.title)", &context).unwrap(),
        Value::Array(vec![Value::from("a"), Value::from("c")])
    );
    assert_eq!(
        eval("items.sort('rank').pluck('title').join('')", &context).unwrap(),
        Value::from("bca")
    );
    assert_eq!(eval("items.sum('rank')", &context).unwrap(), Value::Integer(6));
    assert_eq!(
        eval("items.any(fn(i) => i.rank > 2)", &context).unwrap(),
        Value::Boolean(true)
    );
}

// ============================================================================
// Depth limit
// ============================================================================

#[test]
fn test_depth_limit() {
    let query = vec!["1"; 200].join(" + ");
    assert_eq!(eval_empty(&vec!["1"; 50].join(" + ")), Value::Integer(50));
    assert_eq!(
        eval(&query, &Context::new()),
        Err(EvalError::DepthExceeded(128))
    );

    let env = Environment::new(
        Arc::new(Globals::new()),
        None,
        EngineOptions::default().with_max_depth(1000),
    );
    assert_eq!(eval_with(&query, &Context::new(), &env).unwrap(), Value::Integer(200));
}

#[test]
fn test_depth_resets_after_error() {
    let query = vec!["1"; 200].join(" + ");
    assert!(eval(&query, &Context::new()).is_err());
    assert_eq!(eval_empty("1 + 1"), Value::Integer(2));
}
