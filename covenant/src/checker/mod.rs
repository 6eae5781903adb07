//! Checker entry points
//!
//! Runs the rule registry over modules and functions. Module rules run once
//! per module, function rules once per function, in registry order.

use rayon::prelude::*;

use crate::ast::{Func, Module};
use crate::config::CheckerConfig;
use crate::exceptions::ExceptionHierarchy;
use crate::rules::{CheckContext, Diagnostic, RULES, Required};
use crate::smt::SolverBackend;
use crate::stubs::StubProvider;

/// Runs every rule of the registry
pub struct Checker {
    config: CheckerConfig,
    backend: Box<dyn SolverBackend>,
}

impl Checker {
    /// Checker with a z3 backend set up from `config`
    pub fn new(config: CheckerConfig) -> Self {
        let backend = Box::new(config.solver());
        Self { config, backend }
    }

    /// Replace the solver backend
    pub fn with_backend(mut self, backend: impl SolverBackend + 'static) -> Self {
        self.backend = Box::new(backend);
        self
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    fn context<'a>(
        &'a self,
        hierarchy: &'a ExceptionHierarchy,
        stubs: Option<&'a dyn StubProvider>,
    ) -> CheckContext<'a> {
        CheckContext {
            backend: self.backend.as_ref(),
            stubs,
            hierarchy,
            library: &self.config.library,
        }
    }

    fn keep(&self, diagnostics: Vec<Diagnostic>) -> impl Iterator<Item = Diagnostic> + '_ {
        diagnostics.into_iter().filter(|d| !self.config.is_ignored(d.code))
    }

    /// Check a module: module rules first, then each function in source
    /// order.
    pub fn check_module(&self, module: &Module, stubs: Option<&dyn StubProvider>) -> Vec<Diagnostic> {
        let hierarchy = ExceptionHierarchy::for_module(module);
        let cx = self.context(&hierarchy, stubs);

        let mut diagnostics = Vec::new();
        for rule in RULES.iter().filter(|r| r.required() == Required::Module) {
            diagnostics.extend(self.keep(rule.check_module(module, &cx)));
        }
        for func in module.functions() {
            diagnostics.extend(self.run_func_rules(func, &cx));
        }

        tracing::debug!(
            path = module.path.as_deref().unwrap_or("<module>"),
            diagnostics = diagnostics.len(),
            "checked module"
        );
        diagnostics
    }

    /// Check a single function against the builtin exception hierarchy
    pub fn check_func(&self, func: &Func, stubs: Option<&dyn StubProvider>) -> Vec<Diagnostic> {
        let hierarchy = ExceptionHierarchy::builtins();
        let cx = self.context(&hierarchy, stubs);
        self.run_func_rules(func, &cx)
    }

    fn run_func_rules(&self, func: &Func, cx: &CheckContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for rule in RULES.iter().filter(|r| r.required() == Required::Func) {
            diagnostics.extend(self.keep(rule.check_func(func, cx)));
        }
        diagnostics
    }

    /// Check modules in parallel. Results are in input order.
    pub fn check_modules(&self, modules: &[Module], stubs: Option<&dyn StubProvider>) -> Vec<Vec<Diagnostic>> {
        modules
            .par_iter()
            .map(|module| self.check_module(module, stubs))
            .collect()
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::new(CheckerConfig::default())
    }
}
