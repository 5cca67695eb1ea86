use std::sync::Arc;

use crate::ast::{ArithmeticOp, ComparisonOp, LogicalOp};

/// Literal scalar written directly in a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// Evaluated argument list of a call.
///
/// # Example
/// ```text
/// filter('listed')
/// limit(3)
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arguments(pub Vec<Expr>);

impl Arguments {
    pub fn new(elements: Vec<Expr>) -> Self {
        Arguments(elements)
    }

    pub fn elements(&self) -> &[Expr] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Abstract Syntax Tree node representing a parsed query.
///
/// Trees are built once by the parser and never mutated afterwards.
/// Closure bodies sit behind an [`Arc`] so that a closure value produced
/// during evaluation can keep its body alive after the evaluation ends.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal scalar
    ///
    /// # Example
    /// ```text
    /// 42
    /// 'listed'
    /// true
    /// ```
    Literal(Literal),

    /// Bare name resolved through the scope rules
    ///
    /// # Example
    /// ```text
    /// site
    /// this
    /// ```
    Variable(String),

    /// Array literal
    ///
    /// # Example
    /// ```text
    /// [page.title, 'fallback', 3]
    /// ```
    ArrayList(Vec<Expr>),

    /// Standalone argument list
    Arguments(Arguments),

    /// Member access, optionally called and optionally null-safe
    ///
    /// # Examples
    /// ```text
    /// site.title
    /// site.children.filter('listed')
    /// page?.parent.title
    /// ```
    MemberAccess {
        object: Box<Expr>,
        member: String,
        arguments: Option<Arguments>,
        null_safe: bool,
    },

    /// Call of a registered global function
    ///
    /// # Example
    /// ```text
    /// page('blog')
    /// ```
    FunctionCall { name: String, arguments: Arguments },

    /// Arithmetic operation
    Arithmetic {
        left: Box<Expr>,
        op: ArithmeticOp,
        right: Box<Expr>,
    },

    /// Comparison
    Comparison {
        left: Box<Expr>,
        op: ComparisonOp,
        right: Box<Expr>,
    },

    /// Logical operation
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        right: Box<Expr>,
    },

    /// Null-coalescing (`??`)
    ///
    /// # Example
    /// ```text
    /// page.subtitle ?? page.title
    /// ```
    Coalescence { left: Box<Expr>, right: Box<Expr> },

    /// Ternary; `true_branch` is absent for the Elvis form `cond ?: other`
    Ternary {
        condition: Box<Expr>,
        true_branch: Option<Box<Expr>>,
        false_branch: Box<Expr>,
    },

    /// Inline closure
    ///
    /// # Examples
    /// ```text
    /// fn(page) => page.title
    /// (a, b) => a + b
    /// ```
    Closure { params: Vec<String>, body: Arc<Expr> },
}

impl Expr {
    pub fn literal(literal: Literal) -> Self {
        Expr::Literal(literal)
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }
}
