//! Common result and error types for the characterization workspace.

use std::path::PathBuf;

use crate::error::{
    ConfigurationError, ConsistencyViolation, ErrorKind, ReportParseError, SynthesisFailure,
};

/// The standard result type for fallible characterization operations.
pub type TechResult<T> = Result<T, TechError>;

/// Umbrella error carried across crate boundaries.
///
/// Each variant wraps exactly one taxonomy kind so callers can branch on
/// [`TechError::kind`] instead of matching on messages.
#[derive(Debug, thiserror::Error)]
pub enum TechError {
    /// See [`ConfigurationError`].
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// See [`SynthesisFailure`].
    #[error(transparent)]
    Synthesis(#[from] SynthesisFailure),

    /// See [`ReportParseError`].
    #[error(transparent)]
    ReportParse(#[from] ReportParseError),

    /// See [`ConsistencyViolation`].
    #[error(transparent)]
    Consistency(#[from] ConsistencyViolation),

    /// Reading or writing a library document failed.
    #[error("library I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl TechError {
    /// Returns the taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TechError::Configuration(_) => ErrorKind::Configuration,
            TechError::Synthesis(_) => ErrorKind::Synthesis,
            TechError::ReportParse(_) => ErrorKind::ReportParse,
            TechError::Consistency(_) => ErrorKind::Consistency,
            TechError::Io { .. } => ErrorKind::Io,
        }
    }

    /// Wraps an I/O error with the path that produced it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TechError::Io {
            path: path.into(),
            source,
        }
    }
}
