//! Embedded query language for reading values out of an application's
//! object graph with dotted paths.
//!
//! ```
//! use dotquery::{Context, Runner, Value};
//!
//! let runner = Runner::default();
//! let context = Context::new().with("x", 10);
//! assert_eq!(runner.run("x > 5 ? 'big' : 'small'", &context).unwrap(), Value::from("big"));
//! ```
pub mod ast;
pub mod cache;
pub mod cli;
pub mod evaluator;
pub mod lexer;
mod methods;
pub mod parser;
pub mod printer;
pub mod runner;
pub mod scope;
pub mod value;

use thiserror::Error;

pub use ast::{Expr, Position, Token, Visitor};
pub use cache::{Cache, QueryCache};
pub use evaluator::{Environment, EvalError, Interceptor, Interpreter};
pub use lexer::{LexError, Lexer};
pub use parser::{ParseError, Parser, parse};
pub use printer::Printer;
pub use runner::{EngineOptions, Runner};
pub use scope::{Context, Globals, Scope};
pub use value::{Function, HostObject, Lazy, Map, Value};

/// Any failure of [`Runner::run`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
}

pub type Result<T> = std::result::Result<T, Error>;
