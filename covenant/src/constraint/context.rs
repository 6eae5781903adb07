//! Evaluation context: names in scope for one verification attempt

use std::collections::HashMap;

use crate::smt::{Query, Sort, Term};

/// Maps in-scope identifiers to the terms they stand for.
///
/// A context is created fresh for each contract evaluation and thrown away
/// afterwards. Compilation only reads it.
#[derive(Debug, Clone, Default)]
pub struct Context {
    scope: HashMap<String, Term>,
    /// Symbolic constants introduced by `declare`, in declaration order
    symbols: Vec<(String, Sort)>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to an existing term (e.g. a concrete constant).
    pub fn bind(&mut self, name: impl Into<String>, term: Term) {
        self.scope.insert(name.into(), term);
    }

    /// Introduce a fresh symbolic constant for `name` and bind it.
    pub fn declare(&mut self, name: &str, sort: Sort) -> Term {
        let term = Term::constant(name, sort);
        self.symbols.push((name.to_string(), sort));
        self.scope.insert(name.to_string(), term.clone());
        term
    }

    pub fn get(&self, name: &str) -> Option<&Term> {
        self.scope.get(name)
    }

    /// Declare every symbolic constant of this context in `query`.
    pub fn declare_in(&self, query: &mut Query) {
        for (name, sort) in &self.symbols {
            query.declare_const(name, *sort);
        }
    }
}
