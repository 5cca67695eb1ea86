//! # dotquery - Abstract Syntax Tree
//!
//! This module defines the Abstract Syntax Tree (AST) for dotquery, a small
//! expression language for reading values out of a host application's object
//! graph with dotted paths.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer, with source positions
//! - **[expressions]** - The closed set of expression nodes
//! - **[operators]** - Arithmetic, comparison and logical operators
//! - **[visitor]** - The [`Visitor`] trait and [`Expr::resolve`] dispatch
//!
//! ## Quick Start
//!
//! ```text
//! site.children.filter('listed').first.title
//! ```
//!
//! reads `site` from the evaluation context, calls `children` on it, filters
//! the result by the truthy `listed` member, takes the first element and
//! returns its `title`.
//!
//! ## Core Concepts
//!
//! ### Member Access
//!
//! - `a.b` - key/index lookup on arrays and objects, method-or-property lookup
//!   on host objects
//! - `a.b(1, 'x')` - member call with arguments
//! - `a?.b.c` - null-safe chain: if `a` is null the whole chain is null
//!
//! ### Operators
//!
//! From lowest to highest precedence:
//!
//! | Operators | Meaning |
//! |-----------|---------|
//! | `?:` `? :` | Elvis and full ternary |
//! | `??` | Null-coalescing |
//! | `\|\|` `OR` | Logical or (both sides always evaluated) |
//! | `&&` `AND` | Logical and (both sides always evaluated) |
//! | `==` `===` `!=` `!==` `<` `<=` `>` `>=` | Comparison |
//! | `+` `-` | Additive |
//! | `*` `/` `%` | Multiplicative |
//! | `.` `?.` | Member access |
//!
//! ### Closures
//!
//! ```text
//! page.children.map(fn(child) => child.title)
//! page.children.filter((child) => child.depth > 1)
//! ```
pub mod expressions;
pub mod operators;
pub mod tokens;
pub mod visitor;

pub use expressions::{Arguments, Expr, Literal};
pub use operators::{ArithmeticOp, ComparisonOp, LogicalOp};
pub use tokens::{Position, Token, TokenKind};
pub use visitor::Visitor;
