//! SMT solver backend
//!
//! Runs z3 as a subprocess on a generated SMT-LIB2 script and reads back
//! the verdict and, for satisfiable queries, the model.

use std::io::Write;
use std::process::{Command, Stdio};

use thiserror::Error;

/// Default solver executable
pub const DEFAULT_Z3_PATH: &str = "z3";

/// Default per-query time budget in seconds
pub const DEFAULT_TIMEOUT_SECS: u32 = 5;

/// Outcome of a satisfiability check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverResult {
    /// Satisfiable, with the model as `(name, value)` pairs
    Sat(Vec<(String, String)>),
    Unsat,
    Unknown,
    Timeout,
}

/// Failures of the solver process itself
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("cannot run solver `{path}`: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("solver I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected solver output: {0}")]
    Output(String),
}

/// Anything that can decide an SMT-LIB2 script
pub trait SolverBackend: Send + Sync {
    fn solve(&self, script: &str) -> Result<SolverResult, SolverError>;
}

/// z3 subprocess solver
#[derive(Debug, Clone)]
pub struct SmtSolver {
    path: String,
    timeout: u32,
}

impl SmtSolver {
    pub fn new() -> Self {
        Self {
            path: DEFAULT_Z3_PATH.to_string(),
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set custom Z3 path
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Set timeout in seconds
    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout = seconds.max(1);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn timeout(&self) -> u32 {
        self.timeout
    }

    /// Check if the solver binary can be run
    pub fn is_available(&self) -> bool {
        Command::new(&self.path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }
}

impl Default for SmtSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverBackend for SmtSolver {
    fn solve(&self, script: &str) -> Result<SolverResult, SolverError> {
        tracing::trace!(solver = %self.path, "solving:\n{}", script);

        let mut child = Command::new(&self.path)
            .args(["-in", "-smt2"])
            .arg(format!("-T:{}", self.timeout))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SolverError::Spawn {
                path: self.path.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(script.as_bytes()) {
                // the solver quit before reading its input
                drop(stdin);
                let _ = child.kill();
                let _ = child.wait();
                return Err(e.into());
            }
        }
        let output = child.wait_with_output()?;
        parse_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse the solver's answer to `(check-sat)` and optional `(get-model)`.
pub fn parse_output(stdout: &str) -> Result<SolverResult, SolverError> {
    let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());
    let first = lines.next().unwrap_or_default();
    match first {
        "unsat" => Ok(SolverResult::Unsat),
        "unknown" => Ok(SolverResult::Unknown),
        "timeout" => Ok(SolverResult::Timeout),
        "sat" => {
            let rest: Vec<&str> = lines.collect();
            Ok(SolverResult::Sat(parse_model(&rest.join("\n"))))
        }
        other => Err(SolverError::Output(other.to_string())),
    }
}

/// S-expression of solver output
#[derive(Debug, Clone, PartialEq)]
enum SExp {
    Atom(String),
    List(Vec<SExp>),
}

impl std::fmt::Display for SExp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SExp::Atom(a) => f.write_str(a),
            SExp::List(items) => {
                // (- n) reads better as -n
                if let [SExp::Atom(minus), SExp::Atom(n)] = items.as_slice()
                    && minus == "-"
                {
                    return write!(f, "-{}", n);
                }
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '(' | ')' => tokens.push(c.to_string()),
            '"' => {
                let mut lit = String::from('"');
                while let Some(c) = chars.next() {
                    lit.push(c);
                    if c == '"' {
                        // "" is an escaped quote inside the literal
                        if chars.peek() == Some(&'"') {
                            lit.push('"');
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
                tokens.push(lit);
            }
            c if c.is_whitespace() => {}
            c => {
                let mut atom = c.to_string();
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || next == '(' || next == ')' {
                        break;
                    }
                    atom.push(next);
                    chars.next();
                }
                tokens.push(atom);
            }
        }
    }
    tokens
}

fn parse_sexps(tokens: &[String]) -> Vec<SExp> {
    let mut stack: Vec<Vec<SExp>> = vec![Vec::new()];
    for token in tokens {
        match token.as_str() {
            "(" => stack.push(Vec::new()),
            ")" => {
                if stack.len() > 1
                    && let Some(done) = stack.pop()
                    && let Some(parent) = stack.last_mut()
                {
                    parent.push(SExp::List(done));
                }
            }
            atom => {
                if let Some(top) = stack.last_mut() {
                    top.push(SExp::Atom(atom.to_string()));
                }
            }
        }
    }
    // unbalanced input keeps whatever was completed
    stack.into_iter().next().unwrap_or_default()
}

fn collect_definitions(sexp: &SExp, out: &mut Vec<(String, String)>) {
    if let SExp::List(items) = sexp {
        if let [SExp::Atom(head), SExp::Atom(name), SExp::List(params), _sort, value] = items.as_slice()
            && head == "define-fun"
            && params.is_empty()
        {
            out.push((name.clone(), value.to_string()));
            return;
        }
        for item in items {
            collect_definitions(item, out);
        }
    }
}

/// Extract constant assignments from a `(get-model)` answer, sorted by name.
pub fn parse_model(text: &str) -> Vec<(String, String)> {
    let mut model = Vec::new();
    for sexp in parse_sexps(&tokenize(text)) {
        collect_definitions(&sexp, &mut model);
    }
    model.sort();
    model
}

/// Concrete assignment falsifying a contract
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Counterexample {
    pub assignments: Vec<(String, String)>,
}

impl Counterexample {
    pub fn from_model(model: Vec<(String, String)>) -> Self {
        Self { assignments: model }
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

impl std::fmt::Display for Counterexample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (name, value)) in self.assignments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} = {}", name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unsat() {
        let out = "unsat\n(error \"line 4 column 10: model is not available\")\n";
        assert_eq!(parse_output(out).unwrap(), SolverResult::Unsat);
    }

    #[test]
    fn test_parse_timeout_and_unknown() {
        assert_eq!(parse_output("timeout\n").unwrap(), SolverResult::Timeout);
        assert_eq!(parse_output("unknown\n").unwrap(), SolverResult::Unknown);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_output("(error \"bad\")").is_err());
        assert!(parse_output("").is_err());
    }

    #[test]
    fn test_parse_sat_model() {
        let out = "sat\n(\n  (define-fun y () Int\n    (- 3))\n  (define-fun x () String\n    \"a \"\"b\"\"\")\n)\n";
        match parse_output(out).unwrap() {
            SolverResult::Sat(model) => {
                assert_eq!(
                    model,
                    vec![
                        ("x".to_string(), "\"a \"\"b\"\"\"".to_string()),
                        ("y".to_string(), "-3".to_string()),
                    ]
                );
            }
            other => panic!("expected sat, got {:?}", other),
        }
    }

    #[test]
    fn test_model_skips_functions_with_params() {
        let model = parse_model("((define-fun f ((x Int)) Int x) (define-fun k () Real (/ 1.0 2.0)))");
        assert_eq!(model, vec![("k".to_string(), "(/ 1.0 2.0)".to_string())]);
    }

    #[test]
    fn test_counterexample_display() {
        let ce = Counterexample::from_model(vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "-2".to_string()),
        ]);
        assert_eq!(ce.to_string(), "a = 1, b = -2");
        assert!(Counterexample::default().is_empty());
    }

    #[test]
    fn test_solver_builder() {
        let solver = SmtSolver::new().with_path("/opt/z3").with_timeout(0);
        assert_eq!(solver.path(), "/opt/z3");
        assert_eq!(solver.timeout(), 1);
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let solver = SmtSolver::new().with_path("/nonexistent/covenant-z3");
        assert!(!solver.is_available());
        assert!(matches!(
            solver.solve("(check-sat)"),
            Err(SolverError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_solver_exiting_before_input_is_an_error() {
        // `true` exits without reading, so a script larger than the pipe
        // buffer hits a broken pipe
        let solver = SmtSolver::new().with_path("true");
        let script = "(check-sat)\n".repeat(1 << 16);
        assert!(solver.solve(&script).is_err());
    }

    #[test]
    fn test_z3_decides_simple_query() {
        let solver = SmtSolver::new();
        if !solver.is_available() {
            // Skip test if Z3 is not available
            return;
        }
        let sat = solver
            .solve("(declare-const x Int)\n(assert (> x 2))\n(check-sat)\n(get-model)\n")
            .unwrap();
        assert!(matches!(sat, SolverResult::Sat(ref m) if m.len() == 1 && m[0].0 == "x"));
        let unsat = solver.solve("(assert (> 1 2))\n(check-sat)\n").unwrap();
        assert_eq!(unsat, SolverResult::Unsat);
    }
}
