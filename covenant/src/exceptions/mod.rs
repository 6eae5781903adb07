//! Exception class hierarchy
//!
//! Exceptions are identified by name. The hierarchy starts from the
//! builtin exception tree and is extended with the classes a module
//! declares, so that `raises(ValueError)` also admits a local
//! `class ParseError(ValueError)`.

use std::collections::{HashMap, HashSet};

use crate::ast::{Located, Module, Stmt};

/// Builtin exceptions as `(class, base)` pairs
const BUILTIN_EXCEPTIONS: &[(&str, &str)] = &[
    ("SystemExit", "BaseException"),
    ("KeyboardInterrupt", "BaseException"),
    ("GeneratorExit", "BaseException"),
    ("Exception", "BaseException"),
    ("ArithmeticError", "Exception"),
    ("AssertionError", "Exception"),
    ("AttributeError", "Exception"),
    ("BufferError", "Exception"),
    ("EOFError", "Exception"),
    ("ImportError", "Exception"),
    ("LookupError", "Exception"),
    ("MemoryError", "Exception"),
    ("NameError", "Exception"),
    ("OSError", "Exception"),
    ("ReferenceError", "Exception"),
    ("RuntimeError", "Exception"),
    ("StopIteration", "Exception"),
    ("StopAsyncIteration", "Exception"),
    ("SyntaxError", "Exception"),
    ("SystemError", "Exception"),
    ("TypeError", "Exception"),
    ("ValueError", "Exception"),
    ("Warning", "Exception"),
    ("FloatingPointError", "ArithmeticError"),
    ("OverflowError", "ArithmeticError"),
    ("ZeroDivisionError", "ArithmeticError"),
    ("ModuleNotFoundError", "ImportError"),
    ("IndexError", "LookupError"),
    ("KeyError", "LookupError"),
    ("UnboundLocalError", "NameError"),
    ("IOError", "OSError"),
    ("EnvironmentError", "OSError"),
    ("BlockingIOError", "OSError"),
    ("ChildProcessError", "OSError"),
    ("ConnectionError", "OSError"),
    ("FileExistsError", "OSError"),
    ("FileNotFoundError", "OSError"),
    ("InterruptedError", "OSError"),
    ("IsADirectoryError", "OSError"),
    ("NotADirectoryError", "OSError"),
    ("PermissionError", "OSError"),
    ("ProcessLookupError", "OSError"),
    ("TimeoutError", "OSError"),
    ("BrokenPipeError", "ConnectionError"),
    ("ConnectionAbortedError", "ConnectionError"),
    ("ConnectionRefusedError", "ConnectionError"),
    ("ConnectionResetError", "ConnectionError"),
    ("NotImplementedError", "RuntimeError"),
    ("RecursionError", "RuntimeError"),
    ("IndentationError", "SyntaxError"),
    ("TabError", "IndentationError"),
    ("UnicodeError", "ValueError"),
    ("UnicodeDecodeError", "UnicodeError"),
    ("UnicodeEncodeError", "UnicodeError"),
    ("UnicodeTranslateError", "UnicodeError"),
];

/// Class name to direct base names
#[derive(Debug, Clone)]
pub struct ExceptionHierarchy {
    bases: HashMap<String, Vec<String>>,
}

impl ExceptionHierarchy {
    /// The builtin hierarchy only
    pub fn builtins() -> Self {
        let mut bases: HashMap<String, Vec<String>> = HashMap::new();
        for (class, base) in BUILTIN_EXCEPTIONS {
            bases.entry(class.to_string()).or_default().push(base.to_string());
        }
        Self { bases }
    }

    /// Builtins plus every class declared in `module`
    pub fn for_module(module: &Module) -> Self {
        let mut hierarchy = Self::builtins();
        hierarchy.add_classes(&module.body);
        hierarchy
    }

    fn add_classes(&mut self, body: &[Located<Stmt>]) {
        for stmt in body {
            if let Stmt::ClassDef { name, bases, body } = &stmt.node {
                self.declare(name, bases.iter().map(String::as_str));
                self.add_classes(body);
            }
        }
    }

    /// Record `class` with the given bases. A redeclared class replaces
    /// the earlier one.
    pub fn declare<'a>(&mut self, class: &str, bases: impl IntoIterator<Item = &'a str>) {
        self.bases
            .insert(class.to_string(), bases.into_iter().map(str::to_string).collect());
    }

    /// True when `class` is `ancestor` or derives from it, directly or not.
    pub fn is_subclass(&self, class: &str, ancestor: &str) -> bool {
        let mut seen = HashSet::new();
        let mut pending = vec![class];
        while let Some(current) = pending.pop() {
            if current == ancestor {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(bases) = self.bases.get(current) {
                pending.extend(bases.iter().map(String::as_str));
            }
        }
        false
    }

    /// True when `class` matches any of `allowed`
    pub fn is_allowed(&self, class: &str, allowed: &[String]) -> bool {
        allowed.iter().any(|a| self.is_subclass(class, a))
    }
}

impl Default for ExceptionHierarchy {
    fn default() -> Self {
        Self::builtins()
    }
}
