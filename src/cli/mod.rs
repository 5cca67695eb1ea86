//! CLI support for dotquery
//!
//! The pieces behind the `dotquery` binary, usable on their own to evaluate
//! queries against JSON documents.

mod ast;
mod check;
mod convert;

pub use ast::render_ast;
pub use check::{CheckOptions, CheckResult, execute_check};
pub use convert::{json_to_value, value_to_json};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Query(#[from] crate::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The input document must be a JSON object to serve as a context
    #[error("input must be a JSON object, got {0}")]
    ContextNotObject(String),
}

impl From<crate::ParseError> for CliError {
    fn from(e: crate::ParseError) -> Self {
        CliError::Query(e.into())
    }
}

impl From<crate::EvalError> for CliError {
    fn from(e: crate::EvalError) -> Self {
        CliError::Query(e.into())
    }
}
