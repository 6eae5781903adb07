//! Error types and reporting

use thiserror::Error;

use crate::rules::Diagnostic;

/// Result type alias
pub type Result<T> = std::result::Result<T, CovenantError>;

/// Errors of the embedding layer: loading modules, stubs and configuration.
///
/// Nothing in the checking core produces these; a construct the core cannot
/// handle is an [`Abstain`].
#[derive(Debug, Error)]
pub enum CovenantError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {message}")]
    Config { message: String },
}

impl CovenantError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Reasons the checker gives up on a construct.
///
/// An abstention is neither "holds" nor "violated": the current check stops
/// silently and no diagnostic is produced for it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Abstain {
    #[error("unsupported literal of type {0}")]
    UnsupportedLiteral(String),

    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("boolean operator without operands")]
    EmptyBoolOp,

    #[error("cannot resolve name: {0}")]
    UnresolvedName(String),

    #[error("unsupported call target: {0}")]
    UnsupportedCall(String),

    #[error("{func}() takes {expected} argument(s), {found} given")]
    Arity {
        func: String,
        expected: usize,
        found: usize,
    },

    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    #[error("operator {op} cannot combine {left} and {right}")]
    SortMismatch {
        op: String,
        left: String,
        right: String,
    },

    #[error("contract has no validator")]
    MissingValidator,

    #[error("invalid capability marker: {0}")]
    InvalidMarker(String),

    #[error("solver timeout")]
    Timeout,

    #[error("solver returned unknown")]
    Unknown,

    #[error("solver error: {0}")]
    Solver(String),
}

impl Abstain {
    pub fn sort_mismatch(op: &str, left: impl std::fmt::Display, right: impl std::fmt::Display) -> Self {
        Self::SortMismatch {
            op: op.to_string(),
            left: left.to_string(),
            right: right.to_string(),
        }
    }

    /// True for failures to resolve a name or call target.
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::UnresolvedName(_) | Self::UnsupportedCall(_))
    }
}

/// Report a diagnostic with ariadne
pub fn report_diagnostic(filename: &str, source: &str, diag: &Diagnostic) -> std::io::Result<()> {
    use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};

    let start = diag.location().offset_in(source);
    let end = source
        .get(start..)
        .and_then(|rest| rest.chars().next())
        .map_or(start, |c| start + c.len_utf8());
    let label = match &diag.value {
        Some(value) => format!("{} ({})", diag.text, value),
        None => diag.text.clone(),
    };

    // spans are byte offsets, see `Location::offset_in`
    Report::build(ReportKind::Error, (filename, start..end))
        .with_config(Config::default().with_index_type(IndexType::Byte))
        .with_code(format!("CVN{:03}", diag.code))
        .with_message(&diag.text)
        .with_label(
            Label::new((filename, start..end))
                .with_message(label)
                .with_color(Color::Red),
        )
        .finish()
        .eprint((filename, Source::from(source)))
}
