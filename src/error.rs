//! Crate-wide error taxonomy (spec §7).
use thiserror::Error;

/// A location within a parsed configuration file, used by [`ConfigError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Fatal configuration-parsing errors (spec §7 "Configuration error").
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{location}: bad value: {reason}")]
    BadValue { location: SourceLocation, reason: String },

    #[error("{location}: unknown command `{command}`")]
    UnknownCommand { location: SourceLocation, command: String },

    #[error("{location}: unexpected end of input")]
    UnexpectedEof { location: SourceLocation },
}

/// Degenerate-geometry cases that are handled locally per spec §7, exposed
/// here only so callers that want to observe them explicitly can.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("segment has zero length")]
    ZeroLengthSegment,
    #[error("lines are parallel and do not intersect")]
    ParallelLines,
}

/// Top-level crate error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unresolved control reference: {0}")]
    UnresolvedReference(String),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("duplicate name `{0}` within vehicle")]
    DuplicateName(String),
}

pub type Result<T> = std::result::Result<T, Error>;
