//! Stub signatures of external functions
//!
//! A stub file declares which exceptions a called function may raise:
//!
//! ```json
//! { "json.loads": { "raises": ["ValueError"] } }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Resolves called functions to the exceptions they declare
pub trait StubProvider: Sync {
    /// Exceptions raised by `callee` (dotted name), if it has a stub
    fn raises(&self, callee: &str) -> Option<&[String]>;
}

/// Signature of one stubbed function
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StubEntry {
    #[serde(default)]
    pub raises: Vec<String>,
}

/// Stubs loaded from JSON files
#[derive(Debug, Clone, Default)]
pub struct StubsManager {
    entries: HashMap<String, StubEntry>,
}

impl StubsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge stubs from JSON text. Later entries replace earlier ones.
    pub fn load_str(&mut self, json: &str) -> Result<()> {
        let entries: HashMap<String, StubEntry> = serde_json::from_str(json)?;
        self.entries.extend(entries);
        Ok(())
    }

    /// Merge stubs from a JSON file
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let json = std::fs::read_to_string(path)?;
        self.load_str(&json)?;
        tracing::debug!(path = %path.display(), stubs = self.entries.len(), "loaded stubs");
        Ok(())
    }

    pub fn insert(&mut self, callee: impl Into<String>, raises: Vec<String>) {
        self.entries.insert(callee.into(), StubEntry { raises });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StubProvider for StubsManager {
    fn raises(&self, callee: &str) -> Option<&[String]> {
        self.entries.get(callee).map(|e| e.raises.as_slice())
    }
}
