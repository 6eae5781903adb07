//! Built-in rules

use super::{CheckContext, Diagnostic, Required, Rule};
use crate::ast::{Func, Module};
use crate::contract::{Category, Verdict};
use crate::extract;

/// `from <library> import ...` hides which names are contracts
pub struct CheckImports;

impl Rule for CheckImports {
    fn code(&self) -> u32 {
        1
    }

    fn message(&self) -> &'static str {
        "do not use `from ... import` for the contract library, import it qualified"
    }

    fn required(&self) -> Required {
        Required::Module
    }

    fn check_module(&self, module: &Module, cx: &CheckContext<'_>) -> Vec<Diagnostic> {
        extract::imports(&module.body)
            .into_iter()
            .filter(|token| token.value == cx.library)
            .map(|token| Diagnostic::new(self.code(), self.message(), token.loc).with_value(token.value))
            .collect()
    }
}

/// Precondition calls left in the body of a contracted function
pub struct CheckPre;

impl Rule for CheckPre {
    fn code(&self) -> u32 {
        11
    }

    fn message(&self) -> &'static str {
        "pre contract error"
    }

    fn required(&self) -> Required {
        Required::Func
    }

    fn check_func(&self, func: &Func, cx: &CheckContext<'_>) -> Vec<Diagnostic> {
        // only contracted functions are inspected
        if func.contracts.is_empty() {
            return Vec::new();
        }
        extract::pre_calls(&func.body, cx.library)
            .into_iter()
            .map(|token| Diagnostic::new(self.code(), self.message(), token.loc).with_value(token.value))
            .collect()
    }
}

/// Return values that falsify a postcondition
pub struct CheckReturns;

impl Rule for CheckReturns {
    fn code(&self) -> u32 {
        12
    }

    fn message(&self) -> &'static str {
        "post contract error"
    }

    fn required(&self) -> Required {
        Required::Func
    }

    fn check_func(&self, func: &Func, cx: &CheckContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let contracts = func.contracts.iter().filter(|c| c.category == Category::Post);
        for contract in contracts {
            for token in extract::returns(&func.body) {
                let verdict = match contract.run(&token.value, cx.backend) {
                    Ok(verdict) => verdict,
                    Err(reason) => {
                        // remaining returns cannot be verified either
                        if reason.is_resolution() {
                            tracing::debug!(func = %func.name, %reason, "cannot resolve contract dependencies");
                        } else {
                            tracing::debug!(func = %func.name, %reason, "abstaining from postcondition");
                        }
                        break;
                    }
                };
                let text = match verdict {
                    Verdict::Holds => continue,
                    Verdict::Violated => self.message().to_string(),
                    Verdict::Explained(text) => text,
                };
                diagnostics.push(
                    Diagnostic::new(self.code(), text, token.loc).with_value(token.value.to_string()),
                );
            }
        }
        diagnostics
    }
}

/// Exceptions outside the allowed set of a `raises` contract
pub struct CheckRaises;

impl Rule for CheckRaises {
    fn code(&self) -> u32 {
        21
    }

    fn message(&self) -> &'static str {
        "raises contract error"
    }

    fn required(&self) -> Required {
        Required::Func
    }

    fn check_func(&self, func: &Func, cx: &CheckContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let contracts = func.contracts.iter().filter(|c| c.category == Category::Raises);
        for contract in contracts {
            let allowed = match contract.exceptions() {
                Ok(allowed) => allowed,
                Err(reason) => {
                    tracing::debug!(func = %func.name, %reason, "abstaining from raises contract");
                    continue;
                }
            };
            let mut tokens = extract::exceptions(&func.body, cx.hierarchy);
            if let Some(stubs) = cx.stubs {
                tokens.extend(extract::exceptions_from_stubs(&func.body, stubs, cx.hierarchy));
            }
            for token in tokens {
                if cx.hierarchy.is_allowed(&token.value, &allowed) {
                    continue;
                }
                diagnostics.push(Diagnostic::new(self.code(), self.message(), token.loc).with_value(token.value));
            }
        }
        diagnostics
    }
}

/// `assert` outside of tests
pub struct CheckAsserts;

impl Rule for CheckAsserts {
    fn code(&self) -> u32 {
        31
    }

    fn message(&self) -> &'static str {
        "assert error"
    }

    fn required(&self) -> Required {
        Required::Func
    }

    fn check_func(&self, func: &Func, _cx: &CheckContext<'_>) -> Vec<Diagnostic> {
        if func.name.starts_with("test_") {
            return Vec::new();
        }
        extract::asserts(&func.body)
            .into_iter()
            .map(|token| {
                Diagnostic::new(self.code(), self.message(), token.loc).with_value(token.value.to_string())
            })
            .collect()
    }
}

/// Side effects not covered by the declared capability set
pub struct CheckMarkers;

impl Rule for CheckMarkers {
    fn code(&self) -> u32 {
        40
    }

    fn message(&self) -> &'static str {
        "missed marker"
    }

    fn required(&self) -> Required {
        Required::Func
    }

    fn check_func(&self, func: &Func, _cx: &CheckContext<'_>) -> Vec<Diagnostic> {
        // the first capability contract decides, later ones are ignored
        let Some(declared) = func.contracts.iter().find_map(|c| c.capabilities()) else {
            return Vec::new();
        };
        let has = match declared {
            Ok(has) => has,
            Err(reason) => {
                tracing::debug!(func = %func.name, %reason, "abstaining from capability check");
                return Vec::new();
            }
        };

        let mut diagnostics = Vec::new();
        // a function without I/O must return something
        if !has.has_io() && !extract::has_returns(&func.body) {
            let io = crate::contract::Marker::Io;
            diagnostics.push(Diagnostic::new(io.code(), self.message(), func.loc).with_value(io.name()));
        }
        for token in extract::markers(&func.body) {
            if has.allows(token.value) {
                continue;
            }
            diagnostics.push(
                Diagnostic::new(token.value.code(), self.message(), token.loc).with_value(token.value.name()),
            );
        }
        diagnostics
    }
}
