// tests/cli_tests.rs

use dotquery::cli::{CheckOptions, CheckResult, CliError, execute_check, json_to_value, render_ast, value_to_json};
use dotquery::{Error, EvalError, ParseError, Value};
use serde_json::json;

fn check(query: &str, input: Option<&str>) -> Result<CheckResult, CliError> {
    execute_check(&CheckOptions {
        query: query.to_string(),
        input: input.map(str::to_string),
        ..CheckOptions::default()
    })
}

fn success(result: Result<CheckResult, CliError>) -> serde_json::Value {
    match result {
        Ok(CheckResult::Success(value)) => value,
        other => panic!("Expected success, got {:?}", other),
    }
}

#[test]
fn test_check_against_json() {
    let input = r#"{"user": {"name": "Ada", "langs": ["rust", "ml"]}, "price": 100}"#;

    assert_eq!(success(check("user.name", Some(input))), json!("Ada"));
    assert_eq!(success(check("user.langs.count", Some(input))), json!(2));
    assert_eq!(success(check("price * 1.1", Some(input))), json!(110));
    assert_eq!(
        success(check("user.langs.sort.join('+')", Some(input))),
        json!("ml+rust")
    );
}

#[test]
fn test_check_without_input() {
    assert_eq!(success(check("1 + 2 * 3", None)), json!(7));
    assert_eq!(success(check("missing ?? 'fallback'", None)), json!("fallback"));
}

#[test]
fn test_syntax_only() {
    let result = execute_check(&CheckOptions {
        query: "a.b(1".to_string(),
        syntax_only: true,
        ..CheckOptions::default()
    });
    assert!(matches!(
        result,
        Err(CliError::Query(Error::Parse(ParseError::Unclosed { .. })))
    ));

    let result = execute_check(&CheckOptions {
        query: "a.b(1)".to_string(),
        syntax_only: true,
        ..CheckOptions::default()
    });
    assert!(matches!(result, Ok(CheckResult::SyntaxValid)));
}

#[test]
fn test_strict_and_depth_flags() {
    let result = execute_check(&CheckOptions {
        query: "nobody".to_string(),
        strict: true,
        ..CheckOptions::default()
    });
    assert!(matches!(
        result,
        Err(CliError::Query(Error::Eval(EvalError::MissingIdentifier(_))))
    ));

    let result = execute_check(&CheckOptions {
        query: vec!["1"; 20].join(" + "),
        max_depth: Some(8),
        ..CheckOptions::default()
    });
    assert!(matches!(
        result,
        Err(CliError::Query(Error::Eval(EvalError::DepthExceeded(8))))
    ));
}

#[test]
fn test_input_must_be_object() {
    assert!(matches!(check("x", Some("[1, 2]")), Err(CliError::ContextNotObject(kind)) if kind == "array"));
    assert!(matches!(check("x", Some("{not json")), Err(CliError::Json(_))));
}

#[test]
fn test_env_global() {
    let result = check("env('DOTQUERY_SURELY_UNSET_VARIABLE') ?? 'unset'", None);
    assert_eq!(success(result), json!("unset"));

    let path = std::env::var("PATH").unwrap_or_default();
    assert_eq!(success(check("env('PATH') ?? ''", None)), json!(path));
}

#[test]
fn test_render_ast() {
    assert_eq!(render_ast("a + b * c").unwrap(), "(a + (b * c))");
    assert!(render_ast("a +").is_err());
}

#[test]
fn test_value_conversion() {
    let value = json_to_value(json!({"a": [1, 2.5, null, true], "b": "x"}));
    match &value {
        Value::Object(map) => {
            let keys: Vec<_> = map.keys().cloned().collect();
            assert_eq!(keys, vec!["a", "b"]);
        }
        other => panic!("Expected object, got {:?}", other),
    }

    let round = value_to_json(value).unwrap();
    assert_eq!(round, json!({"a": [1, 2.5, null, true], "b": "x"}));

    let lazy = Value::lazy(|| Ok(Value::from("deferred")));
    assert_eq!(value_to_json(lazy).unwrap(), json!("deferred"));
    let function = Value::function(|_| Ok(Value::Null));
    assert_eq!(value_to_json(function).unwrap(), json!("<function>"));
}
