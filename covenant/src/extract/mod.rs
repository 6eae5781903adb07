//! Syntactic extractors
//!
//! Each extractor scans a statement list and returns the matching
//! constructs in source order, located at the statement that holds them.

pub mod walk;

use crate::ast::{Expr, Handler, Literal, Located, Location, Stmt};
use crate::contract::Marker;
use crate::exceptions::ExceptionHierarchy;
use crate::stubs::StubProvider;

/// Top-level modules whose use means network access
const NETWORK_MODULES: &[&str] = &[
    "socket", "requests", "urllib", "http", "httpx", "aiohttp", "ftplib", "smtplib",
];

/// An extracted value and where it was found
#[derive(Debug, Clone, PartialEq)]
pub struct Token<T> {
    pub value: T,
    pub loc: Location,
}

impl<T> Token<T> {
    pub fn new(value: T, loc: Location) -> Self {
        Self { value, loc }
    }
}

/// Module names of `from X import ...` statements
pub fn imports(body: &[Located<Stmt>]) -> Vec<Token<String>> {
    let mut tokens = Vec::new();
    walk::statements(body, &mut |stmt, _| {
        if let Stmt::ImportFrom { module, .. } = &stmt.node {
            tokens.push(Token::new(module.clone(), stmt.loc));
        }
    });
    tokens
}

/// Calls of `<library>.pre(...)`, rendered as source text
pub fn pre_calls(body: &[Located<Stmt>], library: &str) -> Vec<Token<String>> {
    let mut tokens = Vec::new();
    walk::statement_expressions(body, &mut |stmt, _, expr| {
        if let Expr::Call { func, .. } = expr
            && let [module, name] = func.as_slice()
            && module == library
            && name == "pre"
        {
            tokens.push(Token::new(expr.to_string(), stmt.loc));
        }
    });
    tokens
}

/// Return values that can be evaluated without any binding
pub fn returns(body: &[Located<Stmt>]) -> Vec<Token<Expr>> {
    let mut tokens = Vec::new();
    walk::statements(body, &mut |stmt, _| {
        if let Stmt::Return(Some(value)) = &stmt.node
            && value.is_static()
        {
            tokens.push(Token::new(value.clone(), stmt.loc));
        }
    });
    tokens
}

/// True when the body returns or yields anywhere
pub fn has_returns(body: &[Located<Stmt>]) -> bool {
    let mut found = false;
    walk::statements(body, &mut |stmt, _| {
        if matches!(stmt.node, Stmt::Return(_)) {
            found = true;
        }
    });
    if found {
        return true;
    }
    walk::statement_expressions(body, &mut |_, _, expr| {
        if matches!(expr, Expr::Unsupported(kind) if kind == "yield" || kind == "yield_from") {
            found = true;
        }
    });
    found
}

/// Exception raised by an expression
fn exception_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Call { func, .. } => Some(func.join(".")),
        other => other.dotted_path().map(|path| path.join(".")),
    }
}

fn is_zero(expr: &Expr) -> bool {
    matches!(expr, Expr::Constant(Literal::Int(0)))
        || matches!(expr, Expr::Constant(Literal::Float(x)) if *x == 0.0)
}

/// Exceptions an expression raises on its own
fn implicit_exception(expr: &Expr) -> Option<&'static str> {
    match expr {
        Expr::BinaryOp { op, right, .. } if matches!(op.as_str(), "/" | "//" | "%") && is_zero(right) => {
            Some("ZeroDivisionError")
        }
        Expr::Call { func, .. } if func == &["exit"] || func == &["sys", "exit"] => Some("SystemExit"),
        _ => None,
    }
}

/// True when an enclosing `try` catches `exception`
fn is_caught(exception: &str, guards: &[&[Handler]], hierarchy: &ExceptionHierarchy) -> bool {
    guards.iter().flat_map(|handlers| handlers.iter()).any(|handler| {
        handler.types.is_empty() || handler.types.iter().any(|t| hierarchy.is_subclass(exception, t))
    })
}

/// Exceptions raised in the body and not caught there: explicit `raise`,
/// `assert`, division by a literal zero and `exit()`.
pub fn exceptions(body: &[Located<Stmt>], hierarchy: &ExceptionHierarchy) -> Vec<Token<String>> {
    let mut tokens = Vec::new();
    walk::statements(body, &mut |stmt, guards| {
        let raised = match &stmt.node {
            Stmt::Raise(Some(exc)) => exception_name(exc),
            Stmt::Assert { .. } => Some("AssertionError".to_string()),
            _ => None,
        };
        if let Some(name) = raised
            && !is_caught(&name, guards, hierarchy)
        {
            tokens.push(Token::new(name, stmt.loc));
        }
        for expr in walk::own_exprs(&stmt.node) {
            walk::expressions(expr, &mut |e| {
                if let Some(name) = implicit_exception(e)
                    && !is_caught(name, guards, hierarchy)
                {
                    tokens.push(Token::new(name.to_string(), stmt.loc));
                }
            });
        }
    });
    tokens
}

/// Exceptions declared by stubs of the functions the body calls
pub fn exceptions_from_stubs(
    body: &[Located<Stmt>],
    stubs: &dyn StubProvider,
    hierarchy: &ExceptionHierarchy,
) -> Vec<Token<String>> {
    let mut tokens = Vec::new();
    walk::statement_expressions(body, &mut |stmt, guards, expr| {
        let Expr::Call { func, .. } = expr else {
            return;
        };
        let Some(raises) = stubs.raises(&func.join(".")) else {
            return;
        };
        for name in raises {
            if !is_caught(name, guards, hierarchy) {
                tokens.push(Token::new(name.clone(), stmt.loc));
            }
        }
    });
    tokens
}

/// Tested expressions of `assert` statements
pub fn asserts(body: &[Located<Stmt>]) -> Vec<Token<Expr>> {
    let mut tokens = Vec::new();
    walk::statements(body, &mut |stmt, _| {
        if let Stmt::Assert { test, .. } = &stmt.node {
            tokens.push(Token::new(test.clone(), stmt.loc));
        }
    });
    tokens
}

fn keyword<'e>(keywords: &'e [(String, Expr)], name: &str) -> Option<&'e Expr> {
    keywords.iter().find(|(k, _)| k == name).map(|(_, v)| v)
}

fn is_path(expr: &Expr, path: &[&str]) -> bool {
    expr.dotted_path().is_some_and(|p| p == path)
}

/// Marker required by a call, if any
fn call_marker(func: &[String], args: &[Expr], keywords: &[(String, Expr)]) -> Option<Marker> {
    let path: Vec<&str> = func.iter().map(String::as_str).collect();
    match path.as_slice() {
        ["print"] => match keyword(keywords, "file") {
            None => Some(Marker::Stdout),
            Some(file) if is_path(file, &["sys", "stdout"]) => Some(Marker::Stdout),
            Some(file) if is_path(file, &["sys", "stderr"]) => Some(Marker::Stderr),
            Some(_) => Some(Marker::Write),
        },
        ["sys", "stdout", _, ..] => Some(Marker::Stdout),
        ["sys", "stderr", _, ..] => Some(Marker::Stderr),
        ["open"] => {
            let mode = args.get(1).or_else(|| keyword(keywords, "mode"));
            match mode {
                None => Some(Marker::Read),
                Some(Expr::Constant(Literal::Str(mode))) => {
                    if mode.contains(['w', 'a', 'x', '+']) {
                        Some(Marker::Write)
                    } else {
                        Some(Marker::Read)
                    }
                }
                // mode unknown statically: some file I/O
                Some(_) => Some(Marker::Io),
            }
        }
        [root, ..] if NETWORK_MODULES.contains(root) => Some(Marker::Network),
        _ => None,
    }
}

/// Side effects of the body: global state, imports, standard streams,
/// files and network.
pub fn markers(body: &[Located<Stmt>]) -> Vec<Token<Marker>> {
    let mut tokens = Vec::new();
    walk::statements(body, &mut |stmt, _| {
        match &stmt.node {
            Stmt::Global(_) | Stmt::Nonlocal(_) => tokens.push(Token::new(Marker::Global, stmt.loc)),
            Stmt::Import(_) | Stmt::ImportFrom { .. } => {
                tokens.push(Token::new(Marker::Import, stmt.loc))
            }
            _ => {}
        }
        for expr in walk::own_exprs(&stmt.node) {
            walk::expressions(expr, &mut |e| {
                if let Expr::Call { func, args, keywords } = e
                    && let Some(marker) = call_marker(func, args, keywords)
                {
                    tokens.push(Token::new(marker, stmt.loc));
                }
            });
        }
    });
    tokens
}
