//! Checker configuration
//!
//! Loaded from a TOML file; every key is optional:
//!
//! ```toml
//! library = "covenant"
//! ignore = [31]
//!
//! [solver]
//! path = "z3"
//! timeout = 5
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CovenantError, Result};
use crate::smt::SmtSolver;
use crate::smt::solver::{DEFAULT_TIMEOUT_SECS, DEFAULT_Z3_PATH};

/// Default name of the contract library
pub const DEFAULT_LIBRARY: &str = "covenant";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckerConfig {
    /// Module name of the contract library, which must be imported qualified
    #[serde(default = "default_library")]
    pub library: String,
    /// Diagnostic codes to drop
    #[serde(default)]
    pub ignore: Vec<u32>,
    #[serde(default)]
    pub solver: SolverConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default = "default_solver_path")]
    pub path: String,
    /// Per-query time budget in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u32,
}

fn default_library() -> String {
    DEFAULT_LIBRARY.to_string()
}

fn default_solver_path() -> String {
    DEFAULT_Z3_PATH.to_string()
}

fn default_timeout() -> u32 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            path: default_solver_path(),
            timeout: default_timeout(),
        }
    }
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            library: default_library(),
            ignore: Vec::new(),
            solver: SolverConfig::default(),
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.library.is_empty() {
            return Err(CovenantError::config("library name must not be empty"));
        }
        if self.solver.timeout == 0 {
            return Err(CovenantError::config("solver timeout must be positive"));
        }
        if self.solver.path.is_empty() {
            return Err(CovenantError::config("solver path must not be empty"));
        }
        Ok(())
    }

    pub fn with_library(mut self, library: &str) -> Self {
        self.library = library.to_string();
        self
    }

    /// Set timeout in seconds
    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.solver.timeout = seconds;
        self
    }

    /// Set custom Z3 path
    pub fn with_z3_path(mut self, path: &str) -> Self {
        self.solver.path = path.to_string();
        self
    }

    pub fn with_ignored(mut self, code: u32) -> Self {
        if !self.ignore.contains(&code) {
            self.ignore.push(code);
        }
        self
    }

    pub fn is_ignored(&self, code: u32) -> bool {
        self.ignore.contains(&code)
    }

    /// Solver configured by this file
    pub fn solver(&self) -> SmtSolver {
        SmtSolver::new()
            .with_path(&self.solver.path)
            .with_timeout(self.solver.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CheckerConfig::from_toml_str("").unwrap();
        assert_eq!(config, CheckerConfig::default());
        assert_eq!(config.library, "covenant");
        assert_eq!(config.solver.path, "z3");
        assert_eq!(config.solver.timeout, 5);
    }

    #[test]
    fn test_full_file() {
        let config = CheckerConfig::from_toml_str(
            r#"
            library = "contracts"
            ignore = [31, 46]

            [solver]
            path = "/usr/local/bin/z3"
            timeout = 12
            "#,
        )
        .unwrap();
        assert_eq!(config.library, "contracts");
        assert!(config.is_ignored(31));
        assert!(!config.is_ignored(12));
        let solver = config.solver();
        assert_eq!(solver.path(), "/usr/local/bin/z3");
        assert_eq!(solver.timeout(), 12);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let err = CheckerConfig::from_toml_str("[solver]\ntimeout = 0\n").unwrap_err();
        assert!(matches!(err, CovenantError::Config { .. }));
    }

    #[test]
    fn test_malformed_toml_is_rejected() {
        let err = CheckerConfig::from_toml_str("library = [").unwrap_err();
        assert!(matches!(err, CovenantError::Toml(_)));
    }

    #[test]
    fn test_builders() {
        let config = CheckerConfig::new()
            .with_library("contracts")
            .with_timeout(2)
            .with_z3_path("z3-4.12")
            .with_ignored(1)
            .with_ignored(1);
        assert_eq!(config.library, "contracts");
        assert_eq!(config.solver.timeout, 2);
        assert_eq!(config.solver.path, "z3-4.12");
        assert_eq!(config.ignore, [1]);
        assert!(config.validate().is_ok());
        assert!(CheckerConfig::new().with_library("").validate().is_err());
    }
}
