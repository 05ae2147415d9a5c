use mj_span::Location;
use thiserror::Error;

/// Conditions the builder cannot recover from. Problems a program author can
/// cause are diagnostics instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("the syntax tree carries {count} syntax error(s)")]
    SyntaxErrors { count: usize },

    #[error("{what} is not supported here ({location})")]
    UnsupportedSyntax { what: String, location: Location },

    #[error("builder invariant violated: {message}")]
    Invariant { message: String },
}

impl BuildError {
    pub(crate) fn unsupported(what: impl Into<String>, location: Location) -> Self {
        Self::UnsupportedSyntax {
            what: what.into(),
            location,
        }
    }
}
