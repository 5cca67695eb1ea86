//! Show how a query is grouped

use super::CliError;
use crate::{Printer, parse};

/// Parses `query` and renders it in canonical, fully parenthesized form.
pub fn render_ast(query: &str) -> Result<String, CliError> {
    let expr = parse(query)?;
    Ok(Printer::new().print(&expr))
}
