use std::sync::Arc;

use crate::ast::{ArithmeticOp, Arguments, ComparisonOp, Expr, Literal, LogicalOp};

/// One method per node kind.
///
/// [`Expr::resolve`] dispatches every node to exactly one of these methods.
/// Implementations decide themselves whether and when to recurse into child
/// nodes, which is what lets the evaluator skip untaken ternary branches or
/// the right side of `??`.
pub trait Visitor {
    type Output;

    fn visit_literal(&mut self, literal: &Literal) -> Self::Output;

    fn visit_variable(&mut self, name: &str) -> Self::Output;

    fn visit_array_list(&mut self, elements: &[Expr]) -> Self::Output;

    fn visit_arguments(&mut self, arguments: &Arguments) -> Self::Output;

    fn visit_member_access(
        &mut self,
        object: &Expr,
        member: &str,
        arguments: Option<&Arguments>,
        null_safe: bool,
    ) -> Self::Output;

    fn visit_function_call(&mut self, name: &str, arguments: &Arguments) -> Self::Output;

    fn visit_arithmetic(&mut self, left: &Expr, op: ArithmeticOp, right: &Expr) -> Self::Output;

    fn visit_comparison(&mut self, left: &Expr, op: ComparisonOp, right: &Expr) -> Self::Output;

    fn visit_logical(&mut self, left: &Expr, op: LogicalOp, right: &Expr) -> Self::Output;

    fn visit_coalescence(&mut self, left: &Expr, right: &Expr) -> Self::Output;

    fn visit_ternary(
        &mut self,
        condition: &Expr,
        true_branch: Option<&Expr>,
        false_branch: &Expr,
    ) -> Self::Output;

    fn visit_closure(&mut self, params: &[String], body: &Arc<Expr>) -> Self::Output;
}

impl Expr {
    /// Hands this node to the visitor method matching its kind.
    pub fn resolve<V: Visitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        match self {
            Expr::Literal(literal) => visitor.visit_literal(literal),
            Expr::Variable(name) => visitor.visit_variable(name),
            Expr::ArrayList(elements) => visitor.visit_array_list(elements),
            Expr::Arguments(arguments) => visitor.visit_arguments(arguments),
            Expr::MemberAccess {
                object,
                member,
                arguments,
                null_safe,
            } => visitor.visit_member_access(object, member, arguments.as_ref(), *null_safe),
            Expr::FunctionCall { name, arguments } => visitor.visit_function_call(name, arguments),
            Expr::Arithmetic { left, op, right } => visitor.visit_arithmetic(left, *op, right),
            Expr::Comparison { left, op, right } => visitor.visit_comparison(left, *op, right),
            Expr::Logical { left, op, right } => visitor.visit_logical(left, *op, right),
            Expr::Coalescence { left, right } => visitor.visit_coalescence(left, right),
            Expr::Ternary {
                condition,
                true_branch,
                false_branch,
            } => visitor.visit_ternary(condition, true_branch.as_deref(), false_branch),
            Expr::Closure { params, body } => visitor.visit_closure(params, body),
        }
    }
}
