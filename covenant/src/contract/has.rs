//! Capability set of a function: which side effects it may perform

use serde::{Deserialize, Serialize};

use crate::error::Abstain;

/// A side-effect capability, as named in `has(...)` contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    Global,
    Import,
    Io,
    Read,
    Write,
    Stdout,
    Stderr,
    Network,
}

impl Marker {
    pub const ALL: [Marker; 8] = [
        Marker::Global,
        Marker::Import,
        Marker::Io,
        Marker::Read,
        Marker::Write,
        Marker::Stdout,
        Marker::Stderr,
        Marker::Network,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Marker::Global => "global",
            Marker::Import => "import",
            Marker::Io => "io",
            Marker::Read => "read",
            Marker::Write => "write",
            Marker::Stdout => "stdout",
            Marker::Stderr => "stderr",
            Marker::Network => "network",
        }
    }

    /// Diagnostic code reported when this marker is missing
    pub fn code(self) -> u32 {
        match self {
            Marker::Global => 41,
            Marker::Import => 42,
            Marker::Io => 43,
            Marker::Read => 44,
            Marker::Write => 45,
            Marker::Stdout => 46,
            Marker::Stderr => 47,
            Marker::Network => 48,
        }
    }
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared capabilities. All false is the most restrictive set, which is
/// what `pure` and `silent` declare.
///
/// `io` implies every I/O capability (read, write, stdout, stderr,
/// network); `global` and `import` stand on their own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Has {
    io: bool,
    global: bool,
    import: bool,
    read: bool,
    write: bool,
    stdout: bool,
    stderr: bool,
    network: bool,
}

impl Has {
    pub fn new(markers: &[Marker]) -> Self {
        let mut has = Self::default();
        for marker in markers {
            match marker {
                Marker::Io => has.io = true,
                Marker::Global => has.global = true,
                Marker::Import => has.import = true,
                Marker::Read => has.read = true,
                Marker::Write => has.write = true,
                Marker::Stdout => has.stdout = true,
                Marker::Stderr => has.stderr = true,
                Marker::Network => has.network = true,
            }
        }
        has
    }

    /// Build from marker names; an unknown name abstains.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, Abstain> {
        let markers = names
            .iter()
            .map(|n| Marker::from_name(n.as_ref()).ok_or_else(|| Abstain::InvalidMarker(n.as_ref().to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(&markers))
    }

    pub fn has_global(&self) -> bool {
        self.global
    }

    pub fn has_import(&self) -> bool {
        self.import
    }

    pub fn has_read(&self) -> bool {
        self.read || self.io
    }

    pub fn has_write(&self) -> bool {
        self.write || self.io
    }

    pub fn has_stdout(&self) -> bool {
        self.stdout || self.io
    }

    pub fn has_stderr(&self) -> bool {
        self.stderr || self.io
    }

    pub fn has_network(&self) -> bool {
        self.network || self.io
    }

    /// Any I/O at all
    pub fn has_io(&self) -> bool {
        self.io || self.read || self.write || self.stdout || self.stderr || self.network
    }

    /// Whether an effect of kind `marker` is permitted. A bare `io` effect
    /// (file access of unknown direction) needs `io` itself, or both `read`
    /// and `write`.
    pub fn allows(&self, marker: Marker) -> bool {
        match marker {
            Marker::Global => self.has_global(),
            Marker::Import => self.has_import(),
            Marker::Io => self.io || (self.read && self.write),
            Marker::Read => self.has_read(),
            Marker::Write => self.has_write(),
            Marker::Stdout => self.has_stdout(),
            Marker::Stderr => self.has_stderr(),
            Marker::Network => self.has_network(),
        }
    }
}
