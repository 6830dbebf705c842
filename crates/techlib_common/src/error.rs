//! The four error kinds a characterization run distinguishes.
//!
//! Callers decide whether to continue or abort from the kind alone:
//!
//! - [`ConfigurationError`] aborts the whole run (corrupt or incompatible library).
//! - [`SynthesisFailure`] is local to one specialization, which is recorded as incomplete.
//! - [`ReportParseError`] is fatal for one cell and points at toolchain drift.
//! - [`ConsistencyViolation`] is a bug in the orchestration layer and aborts loudly.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;

/// Discriminant of the error taxonomy, used in run summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or incompatible library/configuration input.
    Configuration,
    /// The external synthesis run failed, timed out or produced no report.
    Synthesis,
    /// A report was produced but an expected field could not be read.
    ReportParse,
    /// An internal invariant of the library model was violated.
    Consistency,
    /// Reading or writing a library document failed.
    Io,
}

impl ErrorKind {
    /// Returns `true` if an error of this kind must stop the whole batch.
    pub fn aborts_run(self) -> bool {
        matches!(
            self,
            ErrorKind::Configuration | ErrorKind::Consistency | ErrorKind::Io
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Synthesis => "synthesis",
            ErrorKind::ReportParse => "report-parse",
            ErrorKind::Consistency => "consistency",
            ErrorKind::Io => "io",
        };
        f.write_str(s)
    }
}

/// A corrupt or incompatible technology library or run configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// A pipe or portsize parameter string on a template operation is malformed.
    #[error("malformed {field} string '{value}' on '{unit}': {reason}")]
    MalformedTemplateParameter {
        /// The template whose operation carries the string.
        unit: String,
        /// Which field was being parsed (`pipe_parameters` or `portsize_parameters`).
        field: &'static str,
        /// The offending string.
        value: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A module parameter required by the unit was left unspecialized.
    #[error("parameter '{parameter}' of '{unit}' was not specialized")]
    UnresolvedParameter {
        /// The functional unit.
        unit: String,
        /// The parameter name.
        parameter: String,
    },

    /// A functional unit required by the run is not present in any library.
    #[error("functional unit '{0}' not found in the technology libraries")]
    UnknownUnit(String),

    /// A cell selection string could not be interpreted.
    #[error("invalid cell selection '{selection}': {reason}")]
    InvalidSelection {
        /// The raw selection.
        selection: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A library document had a malformed field.
    #[error("malformed library document {path}: {reason}")]
    MalformedDocument {
        /// The document path (or `<memory>`).
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },
}

/// An external synthesis run that did not produce usable reports.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisFailure {
    /// The tool exited with a non-zero status.
    #[error("synthesis of '{unit}' failed with status {status:?}: {stderr}")]
    ToolFailed {
        /// The characterized cell.
        unit: String,
        /// Process exit code, if the process was not killed by a signal.
        status: Option<i32>,
        /// Tail of the captured standard error.
        stderr: String,
    },

    /// The tool did not finish within the configured timeout.
    #[error("synthesis of '{unit}' timed out after {seconds}s")]
    Timeout {
        /// The characterized cell.
        unit: String,
        /// The enforced timeout.
        seconds: u64,
    },

    /// The tool finished but an expected report file was not written.
    #[error("synthesis of '{unit}' produced no report at {path}")]
    MissingReport {
        /// The characterized cell.
        unit: String,
        /// The report path that was expected.
        path: PathBuf,
    },

    /// The tool could not be started or its work directory could not be prepared.
    #[error("could not run synthesis of '{unit}': {source}")]
    Spawn {
        /// The characterized cell.
        unit: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The batch was cancelled while this job was pending or running.
    #[error("synthesis of '{unit}' was cancelled")]
    Cancelled {
        /// The characterized cell.
        unit: String,
    },
}

/// A synthesis report whose expected field is present but unreadable.
#[derive(Debug, thiserror::Error)]
#[error("cannot parse '{marker}' in {report}: '{value}'")]
pub struct ReportParseError {
    /// The report file.
    pub report: PathBuf,
    /// The marker whose value failed to parse.
    pub marker: String,
    /// The raw value text.
    pub value: String,
}

/// A violated invariant of the technology library model.
#[derive(Debug, thiserror::Error)]
pub enum ConsistencyViolation {
    /// A node with this name is already registered in the library.
    #[error("duplicate node '{0}' in library")]
    DuplicateNode(String),

    /// An update targets a name the library does not hold.
    #[error("node '{0}' is not registered in library")]
    UnknownNode(String),

    /// An update carries a timestamp older than the stored one.
    #[error("timestamp regression on '{unit}': stored {stored}, incoming {incoming}")]
    TimestampRegression {
        /// The updated node.
        unit: String,
        /// The timestamp currently stored.
        stored: Timestamp,
        /// The timestamp carried by the update.
        incoming: Timestamp,
    },

    /// An update carries an operation the stored node does not declare.
    #[error("missing operation '{operation}' on '{unit}'")]
    MissingOperation {
        /// The updated node.
        unit: String,
        /// The operation name.
        operation: String,
    },

    /// An update on a template targets a plain unit, or the reverse.
    #[error("node '{0}' changed kind between template and functional unit")]
    KindMismatch(String),
}
