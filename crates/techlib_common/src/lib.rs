//! Shared foundational types used across the technology characterization workspace.
//!
//! This crate provides the four-kind error taxonomy that every stage reports
//! through, the crate-wide result alias, and the characterization timestamp.

#![warn(missing_docs)]

pub mod error;
pub mod result;
pub mod timestamp;

pub use error::{
    ConfigurationError, ConsistencyViolation, ErrorKind, ReportParseError, SynthesisFailure,
};
pub use result::{TechError, TechResult};
pub use timestamp::Timestamp;
