//! Abstract Syntax Tree definitions
//!
//! The tree is produced by an external parser and handed over as JSON;
//! nothing in this crate builds it from source text.

mod expr;
mod span;

pub use expr::*;
pub use span::*;

use serde::{Deserialize, Serialize};

use crate::contract::Contract;

/// A module is a sequence of top-level statements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Path of the source file, used only for reporting
    #[serde(default)]
    pub path: Option<String>,
    pub body: Vec<Located<Stmt>>,
}

impl Module {
    pub fn new(body: Vec<Located<Stmt>>) -> Self {
        Self { path: None, body }
    }

    /// All functions of the module in source order: top-level functions and
    /// methods of top-level classes.
    pub fn functions(&self) -> Vec<&Func> {
        let mut funcs = Vec::new();
        for stmt in &self.body {
            match &stmt.node {
                Stmt::FunctionDef(func) => funcs.push(func),
                Stmt::ClassDef { body, .. } => {
                    for inner in body {
                        if let Stmt::FunctionDef(func) = &inner.node {
                            funcs.push(func);
                        }
                    }
                }
                _ => {}
            }
        }
        funcs
    }
}

/// Function definition with its attached contracts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Func {
    pub name: String,
    #[serde(flatten)]
    pub loc: Location,
    pub body: Vec<Located<Stmt>>,
    #[serde(default)]
    pub contracts: Vec<Contract>,
}

impl Func {
    pub fn new(name: impl Into<String>, loc: Location, body: Vec<Located<Stmt>>) -> Self {
        Self {
            name: name.into(),
            loc,
            body,
            contracts: Vec::new(),
        }
    }

    pub fn with_contract(mut self, contract: Contract) -> Self {
        self.contracts.push(contract);
        self
    }
}

/// `except` clause of a `try` statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handler {
    /// Caught exception types; empty for a bare `except:`
    #[serde(default)]
    pub types: Vec<String>,
    pub body: Vec<Located<Stmt>>,
}

/// Statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    Expr(Expr),
    Return(Option<Expr>),
    Assert {
        test: Expr,
        #[serde(default)]
        msg: Option<Expr>,
    },
    /// `raise` with an optional exception; bare `raise` re-raises
    Raise(Option<Expr>),
    Assign {
        targets: Vec<Expr>,
        value: Expr,
    },
    If {
        test: Expr,
        body: Vec<Located<Stmt>>,
        #[serde(default)]
        orelse: Vec<Located<Stmt>>,
    },
    While {
        test: Expr,
        body: Vec<Located<Stmt>>,
        #[serde(default)]
        orelse: Vec<Located<Stmt>>,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Located<Stmt>>,
        #[serde(default)]
        orelse: Vec<Located<Stmt>>,
    },
    With {
        items: Vec<Expr>,
        body: Vec<Located<Stmt>>,
    },
    Try {
        body: Vec<Located<Stmt>>,
        #[serde(default)]
        handlers: Vec<Handler>,
        #[serde(default)]
        orelse: Vec<Located<Stmt>>,
        #[serde(default)]
        finalbody: Vec<Located<Stmt>>,
    },
    Global(Vec<String>),
    Nonlocal(Vec<String>),
    /// `import a.b, c`
    Import(Vec<String>),
    /// `from module import names`
    ImportFrom {
        module: String,
        names: Vec<String>,
    },
    Pass,
    FunctionDef(Func),
    ClassDef {
        name: String,
        #[serde(default)]
        bases: Vec<String>,
        body: Vec<Located<Stmt>>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn func(name: &str) -> Located<Stmt> {
        Located::at(
            Stmt::FunctionDef(Func::new(name, Location::new(1, 0), vec![Located::at(Stmt::Pass, 2, 4)])),
            1,
            0,
        )
    }

    #[test]
    fn test_functions_in_source_order() {
        let module = Module::new(vec![
            func("first"),
            Located::at(
                Stmt::ClassDef {
                    name: "Box".to_string(),
                    bases: vec![],
                    body: vec![func("method")],
                },
                3,
                0,
            ),
            func("last"),
        ]);
        let names: Vec<_> = module.functions().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["first", "method", "last"]);
    }

    #[test]
    fn test_module_from_json() {
        let json = r#"{
            "path": "m.py",
            "body": [
                {"node": {"import_from": {"module": "covenant", "names": ["post"]}}, "row": 1, "col": 0},
                {"node": {"function_def": {
                    "name": "f", "row": 3, "col": 0,
                    "body": [{"node": {"return": {"constant": {"int": 1}}}, "row": 4, "col": 4}],
                    "contracts": [{"category": "post", "args": [{"lambda": {"params": ["r"], "body": {"name": "r"}}}]}]
                }}, "row": 3, "col": 0}
            ]
        }"#;
        let module: Module = serde_json::from_str(json).unwrap();
        assert_eq!(module.path.as_deref(), Some("m.py"));
        let funcs = module.functions();
        assert_eq!(funcs.len(), 1);
        assert_eq!(funcs[0].loc, Location::new(3, 0));
        assert_eq!(funcs[0].contracts.len(), 1);
        assert_eq!(funcs[0].body[0].node, Stmt::Return(Some(Expr::int(1))));
    }
}
