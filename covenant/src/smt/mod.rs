//! SMT-LIB2 terms and queries
//!
//! Constraint terms are kept as SMT-LIB2 text tagged with their sort. A
//! [`Query`] assembles declarations and assertions into a script that the
//! solver in [`solver`] decides.

pub mod solver;

pub use solver::{Counterexample, SmtSolver, SolverBackend, SolverError, SolverResult};

use std::fmt::Write;

use crate::error::Abstain;

/// SMT-LIB2 sorts of constraint terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sort {
    Bool,
    Int,
    Real,
    String,
}

impl Sort {
    pub fn to_smt(self) -> &'static str {
        match self {
            Sort::Bool => "Bool",
            Sort::Int => "Int",
            Sort::Real => "Real",
            Sort::String => "String",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Sort::Int | Sort::Real)
    }
}

impl std::fmt::Display for Sort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_smt())
    }
}

/// A symbolic value: SMT-LIB2 text plus its sort
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
    pub sort: Sort,
    pub smt: String,
}

impl Term {
    pub fn new(sort: Sort, smt: impl Into<String>) -> Self {
        Self {
            sort,
            smt: smt.into(),
        }
    }

    pub fn bool(b: bool) -> Self {
        Self::new(Sort::Bool, b.to_string())
    }

    pub fn int(n: i64) -> Self {
        let smt = if n >= 0 {
            n.to_string()
        } else {
            format!("(- {})", n.unsigned_abs())
        };
        Self::new(Sort::Int, smt)
    }

    /// Real literal. Non-finite values have no SMT representation.
    pub fn real(x: f64) -> Result<Self, Abstain> {
        if !x.is_finite() {
            return Err(Abstain::UnsupportedLiteral(format!("float {}", x)));
        }
        // f64 Display never uses exponent notation
        let mut digits = format!("{}", x.abs());
        if !digits.contains('.') {
            digits.push_str(".0");
        }
        let smt = if x.is_sign_negative() && x != 0.0 {
            format!("(- {})", digits)
        } else {
            digits
        };
        Ok(Self::new(Sort::Real, smt))
    }

    pub fn string(s: &str) -> Self {
        Self::new(Sort::String, quote_string(s))
    }

    /// Symbolic constant reference
    pub fn constant(name: &str, sort: Sort) -> Self {
        Self::new(sort, sanitize_name(name))
    }

    /// This term as a Real, converting Int through `to_real`.
    pub fn to_real(&self) -> Term {
        match self.sort {
            Sort::Int => Term::new(Sort::Real, format!("(to_real {})", self.smt)),
            _ => self.clone(),
        }
    }

    /// Truthiness of the value as a Bool term (zero and empty string are false).
    pub fn truthy(&self) -> Term {
        match self.sort {
            Sort::Bool => self.clone(),
            Sort::Int => Term::new(Sort::Bool, format!("(not (= {} 0))", self.smt)),
            Sort::Real => Term::new(Sort::Bool, format!("(not (= {} 0.0))", self.smt)),
            Sort::String => Term::new(Sort::Bool, format!("(not (= {} \"\"))", self.smt)),
        }
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.smt)
    }
}

/// Conjunction of boolean terms; `true` when empty.
pub fn and_all(terms: &[Term]) -> Term {
    match terms {
        [] => Term::bool(true),
        [single] => single.clone(),
        _ => {
            let parts: Vec<&str> = terms.iter().map(|t| t.smt.as_str()).collect();
            Term::new(Sort::Bool, format!("(and {})", parts.join(" ")))
        }
    }
}

/// SMT-LIB2 query builder
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Symbolic constant declarations
    declarations: Vec<String>,
    /// Assertions
    assertions: Vec<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a constant
    pub fn declare_const(&mut self, name: &str, sort: Sort) {
        self.declarations.push(format!(
            "(declare-const {} {})",
            sanitize_name(name),
            sort.to_smt()
        ));
    }

    /// Add an assertion
    pub fn assert(&mut self, term: &Term) {
        self.assertions.push(format!("(assert {})", term.smt));
    }

    /// Assert the negation of `goal`: a model is a counterexample.
    pub fn refute(&mut self, goal: &Term) {
        self.assertions.push(format!("(assert (not {}))", goal.smt));
    }

    pub fn has_declarations(&self) -> bool {
        !self.declarations.is_empty()
    }

    /// Generate SMT-LIB2 script
    pub fn generate(&self) -> String {
        let mut output = String::new();

        // String buffers never fail to write
        let _ = writeln!(output, "(set-logic ALL)");
        for decl in &self.declarations {
            let _ = writeln!(output, "{}", decl);
        }
        for assertion in &self.assertions {
            let _ = writeln!(output, "{}", assertion);
        }
        let _ = writeln!(output, "(check-sat)");
        if self.has_declarations() {
            let _ = writeln!(output, "(get-model)");
        }

        output
    }
}

/// Sanitize a name for SMT-LIB2
pub fn sanitize_name(name: &str) -> String {
    // alphanumerics and underscore only, never starting with a digit
    let mut result: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if result.chars().next().is_none_or(|c| c.is_ascii_digit()) {
        result.insert(0, '_');
    }
    result
}

/// SMT-LIB2 string literal: `"` doubles, non-printable characters escape
fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\"\""),
            ' '..='~' => out.push(c),
            _ => {
                let _ = write!(out, "\\u{{{:x}}}", c as u32);
            }
        }
    }
    out.push('"');
    out
}
