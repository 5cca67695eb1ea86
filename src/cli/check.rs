//! Execute queries against JSON input

use super::{CliError, json_to_value, value_to_json};
use crate::{Context, EngineOptions, Globals, QueryCache, Runner, Value, parse};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The query to execute
    pub query: String,
    /// JSON object used as the evaluation context; empty when absent
    pub input: Option<String>,
    /// Pretty-print the output
    pub pretty: bool,
    /// Only validate syntax, don't execute
    pub syntax_only: bool,
    /// Unknown names are errors instead of null
    pub strict: bool,
    pub max_depth: Option<usize>,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// Syntax validation passed
    SyntaxValid,
    /// Query executed successfully with JSON output
    Success(serde_json::Value),
}

/// Globals available to queries run from the command line.
fn cli_globals() -> Globals {
    Globals::new().with("env", |args| {
        let name = args.first().map(Value::as_string).unwrap_or_default();
        Ok(std::env::var(&name).map(Value::from).unwrap_or(Value::Null))
    })
}

fn read_context(input: Option<&str>) -> Result<Context, CliError> {
    let Some(json) = input else {
        return Ok(Context::new());
    };
    match json_to_value(serde_json::from_str(json)?) {
        Value::Object(map) => Ok(Context::from(map)),
        other => Err(CliError::ContextNotObject(other.kind().to_string())),
    }
}

/// Execute a check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    if options.syntax_only {
        parse(&options.query)?;
        return Ok(CheckResult::SyntaxValid);
    }

    let context = read_context(options.input.as_deref())?;

    let mut engine = EngineOptions::default().with_strict_variables(options.strict);
    if let Some(max_depth) = options.max_depth {
        engine = engine.with_max_depth(max_depth);
    }
    let runner = Runner::new(cli_globals(), None, QueryCache::shared()).with_options(engine);

    let result = runner.run(&options.query, &context)?;
    Ok(CheckResult::Success(value_to_json(result)?))
}
