//! Canonical source rendering of parsed queries.
//!
//! [`Printer`] is a second [`Visitor`] next to the interpreter. It turns an
//! AST back into query text with every binary operation and ternary wrapped
//! in parentheses, so the output shows how a query was grouped and parses
//! back to the same tree.
//!
//! # Examples
//!
//! ```
//! use dotquery::parser::parse;
//!
//! let expr = parse("a + b * c ?? 'none'").unwrap();
//! assert_eq!(expr.to_string(), "((a + (b * c)) ?? 'none')");
//! ```

use std::{fmt, sync::Arc};

use crate::ast::{ArithmeticOp, Arguments, ComparisonOp, Expr, Literal, LogicalOp, Visitor};

#[derive(Debug, Default)]
pub struct Printer;

impl Printer {
    pub fn new() -> Self {
        Printer
    }

    pub fn print(&mut self, expr: &Expr) -> String {
        expr.resolve(self)
    }

    fn list(&mut self, exprs: &[Expr]) -> String {
        exprs
            .iter()
            .map(|expr| self.print(expr))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Closures extend as far right as they can, so they get their own
    /// parentheses when used as an operand.
    fn operand(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Closure { .. } => format!("({})", self.print(expr)),
            _ => self.print(expr),
        }
    }

    fn binary(&mut self, left: &Expr, symbol: &str, right: &Expr) -> String {
        format!("({} {} {})", self.operand(left), symbol, self.operand(right))
    }
}

fn escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\'' => result.push_str("\\'"),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            c => result.push(c),
        }
    }
    result
}

fn float(n: f64) -> String {
    let text = n.to_string();
    if text.contains('.') || !n.is_finite() {
        text
    } else {
        format!("{}.0", text)
    }
}

impl Visitor for Printer {
    type Output = String;

    fn visit_literal(&mut self, literal: &Literal) -> String {
        match literal {
            Literal::Null => "null".to_string(),
            Literal::Boolean(b) => b.to_string(),
            Literal::Integer(n) => n.to_string(),
            Literal::Float(n) => float(*n),
            Literal::String(s) => format!("'{}'", escape(s)),
        }
    }

    fn visit_variable(&mut self, name: &str) -> String {
        name.to_string()
    }

    fn visit_array_list(&mut self, elements: &[Expr]) -> String {
        format!("[{}]", self.list(elements))
    }

    fn visit_arguments(&mut self, arguments: &Arguments) -> String {
        format!("({})", self.list(arguments.elements()))
    }

    fn visit_member_access(
        &mut self,
        object: &Expr,
        member: &str,
        arguments: Option<&Arguments>,
        null_safe: bool,
    ) -> String {
        let target = match object {
            // a number followed by a dot reads as a float
            Expr::Literal(Literal::Integer(_) | Literal::Float(_)) => {
                format!("({})", self.print(object))
            }
            _ => self.operand(object),
        };
        let dot = if null_safe { "?." } else { "." };
        match arguments {
            Some(arguments) => format!("{}{}{}{}", target, dot, member, self.visit_arguments(arguments)),
            None => format!("{}{}{}", target, dot, member),
        }
    }

    fn visit_function_call(&mut self, name: &str, arguments: &Arguments) -> String {
        format!("{}{}", name, self.visit_arguments(arguments))
    }

    fn visit_arithmetic(&mut self, left: &Expr, op: ArithmeticOp, right: &Expr) -> String {
        self.binary(left, op.symbol(), right)
    }

    fn visit_comparison(&mut self, left: &Expr, op: ComparisonOp, right: &Expr) -> String {
        self.binary(left, op.symbol(), right)
    }

    fn visit_logical(&mut self, left: &Expr, op: LogicalOp, right: &Expr) -> String {
        self.binary(left, op.symbol(), right)
    }

    fn visit_coalescence(&mut self, left: &Expr, right: &Expr) -> String {
        self.binary(left, "??", right)
    }

    fn visit_ternary(
        &mut self,
        condition: &Expr,
        true_branch: Option<&Expr>,
        false_branch: &Expr,
    ) -> String {
        let condition = self.operand(condition);
        let false_branch = self.print(false_branch);
        match true_branch {
            Some(branch) => format!("({} ? {} : {})", condition, self.operand(branch), false_branch),
            None => format!("({} ?: {})", condition, false_branch),
        }
    }

    fn visit_closure(&mut self, params: &[String], body: &Arc<Expr>) -> String {
        format!("fn({}) => {}", params.join(", "), self.print(body))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Printer::new().print(self))
    }
}
