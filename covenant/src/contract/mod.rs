//! Contracts attached to functions
//!
//! A contract is a decorator call as the parser saw it: a category and the
//! argument expressions. Postconditions carry a lambda validator that
//! [`Contract::run`] checks against a candidate return value with the SMT
//! backend.

mod has;

pub use has::{Has, Marker};

use serde::{Deserialize, Serialize};

use crate::ast::Expr;
use crate::constraint::{self, Context, ops::CompareOp};
use crate::error::Abstain;
use crate::smt::{Counterexample, Query, Sort, SolverBackend, SolverResult, Term, and_all};

/// Name of the validator parameter that receives the return value
pub const RESULT_PARAM: &str = "result";

/// Contract kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Pre,
    Post,
    Raises,
    Has,
    Pure,
    Silent,
}

impl Category {
    /// Categories that declare a capability set
    pub fn is_capability(self) -> bool {
        matches!(self, Category::Has | Category::Pure | Category::Silent)
    }
}

/// A contract attached to a function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub category: Category,
    #[serde(default)]
    pub args: Vec<Expr>,
}

/// Outcome of checking a postcondition against one return value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Holds,
    Violated,
    /// Violated, with a concrete counterexample
    Explained(String),
}

impl Verdict {
    pub fn is_violation(&self) -> bool {
        !matches!(self, Verdict::Holds)
    }
}

impl Contract {
    pub fn new(category: Category, args: Vec<Expr>) -> Self {
        Self { category, args }
    }

    pub fn post(validator: Expr) -> Self {
        Self::new(Category::Post, vec![validator])
    }

    pub fn raises(exceptions: &[&str]) -> Self {
        let args = exceptions
            .iter()
            .map(|name| {
                let mut parts = name.split('.');
                let head = Expr::name(parts.next().unwrap_or_default());
                parts.fold(head, |value, attr| Expr::Attribute {
                    value: Box::new(value),
                    attr: attr.to_string(),
                })
            })
            .collect();
        Self::new(Category::Raises, args)
    }

    pub fn has(markers: &[&str]) -> Self {
        Self::new(Category::Has, markers.iter().map(|m| Expr::str(*m)).collect())
    }

    /// The lambda validator and its parameters
    fn validator(&self) -> Result<(&[String], &Expr), Abstain> {
        match self.args.first() {
            Some(Expr::Lambda { params, body }) => Ok((params.as_slice(), body.as_ref())),
            _ => Err(Abstain::MissingValidator),
        }
    }

    /// Check the validator against a candidate return value.
    ///
    /// The `result` parameter, or else the first one, receives `value`: a
    /// literal is bound as a concrete constant, anything else becomes a
    /// symbolic constant constrained equal to it. Remaining parameters are
    /// unconstrained integers. The validator holds when its negation is
    /// unsatisfiable.
    pub fn run(&self, value: &Expr, backend: &dyn SolverBackend) -> Result<Verdict, Abstain> {
        let (params, body) = self.validator()?;

        let mut ctx = Context::new();
        let mut assumptions = Vec::new();
        let bound = params
            .iter()
            .position(|p| p == RESULT_PARAM)
            .or(if params.is_empty() { None } else { Some(0) });

        for (i, param) in params.iter().enumerate() {
            if Some(i) != bound {
                ctx.declare(param, Sort::Int);
                continue;
            }
            let mut terms = constraint::compile(value, &Context::new())?;
            let Some(term) = terms.pop() else {
                return Err(Abstain::UnsupportedExpression(value.to_string()));
            };
            if value.is_literal() {
                ctx.bind(param.as_str(), term);
            } else {
                let symbol = ctx.declare(param, term.sort);
                assumptions.extend(terms);
                assumptions.push(CompareOp::Eq.apply(&symbol, &term)?);
            }
        }

        let terms = constraint::compile(body, &ctx)?;
        let truths: Vec<Term> = terms.iter().map(Term::truthy).collect();
        let goal = and_all(&truths);

        let mut query = Query::new();
        ctx.declare_in(&mut query);
        for assumption in &assumptions {
            query.assert(assumption);
        }
        query.refute(&goal);

        let result = backend.solve(&query.generate()).map_err(|e| {
            tracing::warn!(error = %e, "solver unavailable, skipping contract");
            Abstain::Solver(e.to_string())
        })?;

        match result {
            SolverResult::Unsat => Ok(Verdict::Holds),
            SolverResult::Sat(model) => {
                let counterexample = Counterexample::from_model(model);
                if counterexample.is_empty() {
                    Ok(Verdict::Violated)
                } else {
                    Ok(Verdict::Explained(format!(
                        "post contract error (counterexample: {})",
                        counterexample
                    )))
                }
            }
            SolverResult::Timeout => {
                tracing::warn!(value = %value, "solver timed out");
                Err(Abstain::Timeout)
            }
            SolverResult::Unknown => {
                tracing::debug!(value = %value, "solver returned unknown");
                Err(Abstain::Unknown)
            }
        }
    }

    /// Allowed exception names of a `raises` contract
    pub fn exceptions(&self) -> Result<Vec<String>, Abstain> {
        self.args
            .iter()
            .map(|arg| match arg {
                Expr::Constant(crate::ast::Literal::Str(name)) => Ok(name.clone()),
                other => other
                    .dotted_path()
                    .map(|path| path.join("."))
                    .ok_or_else(|| Abstain::UnsupportedExpression(other.to_string())),
            })
            .collect()
    }

    /// Marker names of a `has` contract; `pure` and `silent` declare none.
    pub fn markers(&self) -> Result<Vec<String>, Abstain> {
        if matches!(self.category, Category::Pure | Category::Silent) {
            return Ok(Vec::new());
        }
        self.args
            .iter()
            .map(|arg| match arg {
                Expr::Constant(crate::ast::Literal::Str(name)) => Ok(name.clone()),
                other => Err(Abstain::InvalidMarker(other.to_string())),
            })
            .collect()
    }

    /// Capability set declared by this contract, if it declares one
    pub fn capabilities(&self) -> Option<Result<Has, Abstain>> {
        if !self.category.is_capability() {
            return None;
        }
        Some(self.markers().and_then(|names| Has::from_names(&names)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smt::{SmtSolver, SolverError};
    use std::sync::Mutex;

    /// Backend returning a canned answer and recording the script
    struct Canned {
        answer: SolverResult,
        scripts: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(answer: SolverResult) -> Self {
            Self {
                answer,
                scripts: Mutex::new(Vec::new()),
            }
        }

        fn last_script(&self) -> String {
            self.scripts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    impl SolverBackend for Canned {
        fn solve(&self, script: &str) -> Result<SolverResult, SolverError> {
            self.scripts.lock().unwrap().push(script.to_string());
            Ok(self.answer.clone())
        }
    }

    struct Broken;

    impl SolverBackend for Broken {
        fn solve(&self, _script: &str) -> Result<SolverResult, SolverError> {
            Err(SolverError::Output("garbage".to_string()))
        }
    }

    fn positive() -> Contract {
        Contract::post(Expr::lambda(
            &["result"],
            Expr::compare(Expr::name("result"), vec![(">", Expr::int(0))]),
        ))
    }

    #[test]
    fn test_literal_is_bound_concretely() {
        let backend = Canned::new(SolverResult::Unsat);
        assert_eq!(positive().run(&Expr::int(4), &backend), Ok(Verdict::Holds));
        let script = backend.last_script();
        assert!(script.contains("(assert (not (> 4 0)))"), "{}", script);
        assert!(!script.contains("declare-const"));
    }

    #[test]
    fn test_static_value_is_symbolic_with_assumption() {
        let backend = Canned::new(SolverResult::Unsat);
        let value = Expr::binary("-", Expr::int(1), Expr::int(3));
        positive().run(&value, &backend).unwrap();
        let script = backend.last_script();
        assert!(script.contains("(declare-const result Int)"));
        assert!(script.contains("(assert (= result (- 1 3)))"));
        assert!(script.contains("(assert (not (> result 0)))"));
    }

    #[test]
    fn test_first_param_receives_value_without_result_name() {
        let backend = Canned::new(SolverResult::Unsat);
        let contract = Contract::post(Expr::lambda(
            &["r", "n"],
            Expr::compare(Expr::name("r"), vec![("!=", Expr::name("n"))]),
        ));
        contract.run(&Expr::int(2), &backend).unwrap();
        let script = backend.last_script();
        assert!(script.contains("(declare-const n Int)"));
        assert!(script.contains("(assert (not (not (= 2 n))))"), "{}", script);
    }

    #[test]
    fn test_verdicts_from_solver_answers() {
        let sat_empty = Canned::new(SolverResult::Sat(vec![]));
        assert_eq!(positive().run(&Expr::int(-1), &sat_empty), Ok(Verdict::Violated));

        let sat_model = Canned::new(SolverResult::Sat(vec![("result".to_string(), "-2".to_string())]));
        let verdict = positive()
            .run(&Expr::unary("-", Expr::int(2)), &sat_model)
            .unwrap();
        assert_eq!(
            verdict,
            Verdict::Explained("post contract error (counterexample: result = -2)".to_string())
        );
        assert!(verdict.is_violation());
    }

    #[test]
    fn test_solver_failures_abstain() {
        let timeout = Canned::new(SolverResult::Timeout);
        assert_eq!(positive().run(&Expr::int(1), &timeout), Err(Abstain::Timeout));
        let unknown = Canned::new(SolverResult::Unknown);
        assert_eq!(positive().run(&Expr::int(1), &unknown), Err(Abstain::Unknown));
        assert!(matches!(positive().run(&Expr::int(1), &Broken), Err(Abstain::Solver(_))));
    }

    #[test]
    fn test_unresolved_name_in_validator_abstains() {
        let backend = Canned::new(SolverResult::Unsat);
        let contract = Contract::post(Expr::lambda(
            &["result"],
            Expr::compare(Expr::name("result"), vec![(">", Expr::name("limit"))]),
        ));
        assert_eq!(
            contract.run(&Expr::int(1), &backend),
            Err(Abstain::UnresolvedName("limit".to_string()))
        );
        assert!(backend.last_script().is_empty());
    }

    #[test]
    fn test_missing_validator_abstains() {
        let backend = Canned::new(SolverResult::Unsat);
        let contract = Contract::new(Category::Post, vec![Expr::name("check_result")]);
        assert_eq!(contract.run(&Expr::int(1), &backend), Err(Abstain::MissingValidator));
    }

    #[test]
    fn test_exceptions() {
        let contract = Contract::raises(&["ValueError", "errors.ParseError"]);
        assert_eq!(
            contract.exceptions().unwrap(),
            ["ValueError", "errors.ParseError"]
        );
        let bad = Contract::new(Category::Raises, vec![Expr::int(1)]);
        assert!(bad.exceptions().is_err());
    }

    #[test]
    fn test_capabilities() {
        assert!(Contract::post(Expr::bool(true)).capabilities().is_none());
        let pure = Contract::new(Category::Pure, vec![]).capabilities().unwrap().unwrap();
        assert!(!pure.has_io());
        assert_eq!(Contract::has(&["io", "global"]).markers().unwrap(), ["io", "global"]);
        let net = Contract::has(&["network"]).capabilities().unwrap().unwrap();
        assert!(net.has_network());
        let bad = Contract::has(&["network", "telepathy"]).capabilities().unwrap();
        assert_eq!(bad, Err(Abstain::InvalidMarker("telepathy".to_string())));
    }

    #[test]
    fn test_run_with_z3() {
        let solver = SmtSolver::new();
        if !solver.is_available() {
            // Skip test if Z3 is not available
            return;
        }
        assert_eq!(positive().run(&Expr::int(3), &solver), Ok(Verdict::Holds));
        assert_eq!(positive().run(&Expr::int(-3), &solver), Ok(Verdict::Violated));
        let verdict = positive()
            .run(&Expr::binary("-", Expr::int(1), Expr::int(4)), &solver)
            .unwrap();
        assert!(matches!(verdict, Verdict::Explained(ref text) if text.contains("result = -3")));

        let abs_positive = Contract::post(Expr::lambda(
            &["result", "x"],
            Expr::compare(Expr::call("abs", vec![Expr::name("x")]), vec![(">=", Expr::int(0))]),
        ));
        assert_eq!(abs_positive.run(&Expr::int(0), &solver), Ok(Verdict::Holds));
    }
}
