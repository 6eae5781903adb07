//! Rule registry
//!
//! Rules are a fixed, ordered table. The order of [`RULES`] is the order in
//! which diagnostics of different rules on the same target are emitted.

mod checks;

pub use checks::{CheckAsserts, CheckImports, CheckMarkers, CheckPre, CheckRaises, CheckReturns};

use serde::{Deserialize, Serialize};

use crate::ast::{Func, Location, Module};
use crate::exceptions::ExceptionHierarchy;
use crate::smt::SolverBackend;
use crate::stubs::StubProvider;

/// What a rule runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Required {
    Func,
    Module,
}

impl std::fmt::Display for Required {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Required::Func => write!(f, "func"),
            Required::Module => write!(f, "module"),
        }
    }
}

/// A single finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: u32,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub row: u32,
    pub col: u32,
}

impl Diagnostic {
    pub fn new(code: u32, text: impl Into<String>, loc: Location) -> Self {
        Self {
            code,
            text: text.into(),
            value: None,
            row: loc.row,
            col: loc.col,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn location(&self) -> Location {
        Location::new(self.row, self.col)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: CVN{:03} {}", self.row, self.col, self.code, self.text)?;
        if let Some(value) = &self.value {
            write!(f, " ({})", value)?;
        }
        Ok(())
    }
}

/// Read-only inputs shared by all rules during one check
pub struct CheckContext<'a> {
    pub backend: &'a dyn SolverBackend,
    pub stubs: Option<&'a dyn StubProvider>,
    pub hierarchy: &'a ExceptionHierarchy,
    /// Module name of the contract library
    pub library: &'a str,
}

/// A lint rule
pub trait Rule: Sync {
    fn code(&self) -> u32;

    fn message(&self) -> &'static str;

    fn required(&self) -> Required;

    fn check_module(&self, _module: &Module, _cx: &CheckContext<'_>) -> Vec<Diagnostic> {
        Vec::new()
    }

    fn check_func(&self, _func: &Func, _cx: &CheckContext<'_>) -> Vec<Diagnostic> {
        Vec::new()
    }
}

/// All rules, in emission order
pub static RULES: &[&dyn Rule] = &[
    &CheckImports,
    &CheckPre,
    &CheckReturns,
    &CheckRaises,
    &CheckAsserts,
    &CheckMarkers,
];
