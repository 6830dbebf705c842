//! Report dialects and shared marker scanning.
//!
//! Every dialect reads `marker: value` style lines. A marker that never
//! appears leaves its field unset; a marker whose value does not parse is a
//! [`ReportParseError`].

use std::path::PathBuf;

use techlib_common::ReportParseError;
use techlib_model::{AreaModel, DeviceKind, TimeModel};

use crate::flow::ReportBundle;

/// Role of a report file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReportKind {
    /// Resource or cell-area report.
    Area,
    /// Timing report.
    Timing,
}

/// A report file read back from the work directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFile {
    /// Where the report was read from.
    pub path: PathBuf,
    /// Its contents.
    pub text: String,
}

impl ReportFile {
    /// Creates a report from its path and contents.
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// The text following `marker` on every line containing it, trimmed.
    pub fn values_after<'a>(&'a self, marker: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.text.lines().filter_map(move |line| {
            line.find(marker)
                .map(|at| line[at + marker.len()..].trim())
        })
    }

    /// Parses `raw` as a number, attributing failures to `marker`.
    pub fn number(&self, marker: &str, raw: &str) -> Result<f64, ReportParseError> {
        raw.parse::<f64>().map_err(|_| ReportParseError {
            report: self.path.clone(),
            marker: marker.to_string(),
            value: raw.to_string(),
        })
    }

    /// The first whitespace-separated token after the last occurrence of
    /// `marker`, with thousands separators removed, as a number.
    pub fn last_count(&self, marker: &str) -> Result<Option<f64>, ReportParseError> {
        let Some(raw) = self.values_after(marker).last() else {
            return Ok(None);
        };
        let token = raw.split_whitespace().next().unwrap_or("").replace(',', "");
        self.number(marker, &token).map(Some)
    }
}

/// How one vendor's reports are laid out and read.
pub trait ReportDialect: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// The device kind whose models this dialect produces.
    fn device_kind(&self) -> DeviceKind;

    /// Report files the tool is expected to write, relative to the work directory.
    fn report_files(&self) -> &'static [(ReportKind, &'static str)];

    /// Builds the area model.
    fn parse_area(&self, bundle: &ReportBundle) -> Result<AreaModel, ReportParseError>;

    /// Builds the timing model.
    fn parse_timing(&self, bundle: &ReportBundle) -> Result<TimeModel, ReportParseError>;
}
