//! Errors raised while reading `techlib.toml`.

use std::path::PathBuf;

/// Why a run configuration was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The content is not valid TOML for the configuration schema.
    #[error("malformed configuration: {0}")]
    Parse(String),

    /// A list that the characterization flow depends on is empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// A value is outside its accepted range.
    #[error("{field}: {reason}")]
    OutOfRange {
        /// Dotted key of the offending value.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The DSP x and y width tables are not paired.
    #[error("device.dsp_x_sizes has {x} entries but device.dsp_y_sizes has {y}")]
    UnpairedDspTables {
        /// Length of `dsp_x_sizes`.
        x: usize,
        /// Length of `dsp_y_sizes`.
        y: usize,
    },
}

impl ConfigError {
    pub(crate) fn out_of_range(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::OutOfRange {
            field,
            reason: reason.into(),
        }
    }
}
