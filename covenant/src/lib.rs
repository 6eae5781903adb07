//! Covenant Contract Checker Library
//!
//! Static verification of design-by-contract annotations: postconditions
//! are proved or refuted with an SMT solver, and rule-based checks cover
//! raised exceptions, side-effect markers, asserts and contract misuse.

pub mod ast;
pub mod checker;
pub mod config;
pub mod constraint;
pub mod contract;
pub mod error;
pub mod exceptions;
pub mod extract;
pub mod rules;
pub mod smt;
pub mod stubs;

pub use ast::{Location, Module};
pub use checker::Checker;
pub use config::CheckerConfig;
pub use error::{Abstain, CovenantError, Result};
pub use rules::Diagnostic;
