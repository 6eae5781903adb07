//! Traversal of function bodies
//!
//! Walks stay inside the body they are given: nested function and class
//! definitions are separate scopes and are not entered.

use crate::ast::{Expr, Handler, Located, Stmt};

const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 1024 * 1024;

/// Visit every statement of `body` in source order (pre-order). The
/// callback also receives the handler lists of the `try` statements whose
/// protected body encloses the statement, innermost last.
pub fn statements<'a, F>(body: &'a [Located<Stmt>], f: &mut F)
where
    F: FnMut(&'a Located<Stmt>, &[&'a [Handler]]),
{
    let mut guards = Vec::new();
    visit(body, &mut guards, f);
}

fn visit<'a, F>(body: &'a [Located<Stmt>], guards: &mut Vec<&'a [Handler]>, f: &mut F)
where
    F: FnMut(&'a Located<Stmt>, &[&'a [Handler]]),
{
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
        for stmt in body {
            f(stmt, guards.as_slice());
            match &stmt.node {
                Stmt::If { body, orelse, .. }
                | Stmt::While { body, orelse, .. }
                | Stmt::For { body, orelse, .. } => {
                    visit(body, guards, f);
                    visit(orelse, guards, f);
                }
                Stmt::With { body, .. } => visit(body, guards, f),
                Stmt::Try {
                    body,
                    handlers,
                    orelse,
                    finalbody,
                } => {
                    guards.push(handlers);
                    visit(body, guards, f);
                    guards.pop();
                    for handler in handlers {
                        visit(&handler.body, guards, f);
                    }
                    visit(orelse, guards, f);
                    visit(finalbody, guards, f);
                }
                Stmt::FunctionDef(_) | Stmt::ClassDef { .. } => {}
                Stmt::Expr(_)
                | Stmt::Return(_)
                | Stmt::Assert { .. }
                | Stmt::Raise(_)
                | Stmt::Assign { .. }
                | Stmt::Global(_)
                | Stmt::Nonlocal(_)
                | Stmt::Import(_)
                | Stmt::ImportFrom { .. }
                | Stmt::Pass => {}
            }
        }
    })
}

/// Expressions held directly by a statement, excluding nested blocks
pub fn own_exprs(stmt: &Stmt) -> Vec<&Expr> {
    match stmt {
        Stmt::Expr(e) => vec![e],
        Stmt::Return(value) | Stmt::Raise(value) => value.iter().collect(),
        Stmt::Assert { test, msg } => std::iter::once(test).chain(msg.iter()).collect(),
        Stmt::Assign { targets, value } => targets.iter().chain(std::iter::once(value)).collect(),
        Stmt::If { test, .. } | Stmt::While { test, .. } => vec![test],
        Stmt::For { target, iter, .. } => vec![target, iter],
        Stmt::With { items, .. } => items.iter().collect(),
        Stmt::Try { .. }
        | Stmt::Global(_)
        | Stmt::Nonlocal(_)
        | Stmt::Import(_)
        | Stmt::ImportFrom { .. }
        | Stmt::Pass
        | Stmt::FunctionDef(_)
        | Stmt::ClassDef { .. } => Vec::new(),
    }
}

/// Visit `expr` and all of its sub-expressions, parents first. Lambda
/// bodies are not entered.
pub fn expressions<'a, F>(expr: &'a Expr, f: &mut F)
where
    F: FnMut(&'a Expr),
{
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
        f(expr);
        match expr {
            Expr::BinaryOp { left, right, .. } => {
                expressions(left, f);
                expressions(right, f);
            }
            Expr::Comparison { left, ops } => {
                expressions(left, f);
                for (_, right) in ops {
                    expressions(right, f);
                }
            }
            Expr::BooleanOp { values, .. } => {
                for value in values {
                    expressions(value, f);
                }
            }
            Expr::UnaryOp { operand, .. } => expressions(operand, f),
            Expr::Conditional { test, body, orelse } => {
                expressions(test, f);
                expressions(body, f);
                expressions(orelse, f);
            }
            Expr::Call { args, keywords, .. } => {
                for arg in args {
                    expressions(arg, f);
                }
                for (_, value) in keywords {
                    expressions(value, f);
                }
            }
            Expr::Attribute { value, .. } => expressions(value, f),
            Expr::Constant(_) | Expr::Name(_) | Expr::Lambda { .. } | Expr::Unsupported(_) => {}
        }
    })
}

/// Visit every expression of every statement in `body`, with the
/// statement that holds it.
pub fn statement_expressions<'a, F>(body: &'a [Located<Stmt>], f: &mut F)
where
    F: FnMut(&'a Located<Stmt>, &[&'a [Handler]], &'a Expr),
{
    statements(body, &mut |stmt, guards| {
        for expr in own_exprs(&stmt.node) {
            expressions(expr, &mut |e| f(stmt, guards, e));
        }
    });
}
