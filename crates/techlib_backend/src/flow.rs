//! The backend flow boundary.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use techlib_common::{ReportParseError, SynthesisFailure};
use techlib_model::{AreaModel, TimeModel, WrapperCircuit};

use crate::dialect::{ReportFile, ReportKind};

/// An extra file the tool needs next to the netlist (memory init data, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryFile {
    /// File name relative to the work directory.
    pub name: String,
    /// File contents.
    pub contents: String,
}

/// One synthesis job.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    /// The characterized cell name; also names the work directory.
    pub unit: String,
    /// The top-level wrapper netlist.
    pub circuit: WrapperCircuit,
    /// Target clock period in nanoseconds.
    pub clock_period_ns: f64,
    /// Files to write next to the netlist.
    pub auxiliary_files: Vec<AuxiliaryFile>,
}

/// The artifacts of a finished synthesis run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportBundle {
    /// The characterized cell name.
    pub unit: String,
    /// The work directory the tool ran in.
    pub work_dir: PathBuf,
    /// Collected report files by role.
    pub reports: BTreeMap<ReportKind, ReportFile>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ReportBundle {
    /// The report playing `kind`, if collected.
    pub fn report(&self, kind: ReportKind) -> Option<&ReportFile> {
        self.reports.get(&kind)
    }
}

/// A logic-synthesis toolchain.
///
/// `synthesize` is the only suspension point of a characterization job and
/// must be safe to drop mid-flight: dropping the future abandons the run.
#[async_trait]
pub trait BackendFlow: Send + Sync {
    /// Runs synthesis for one wrapper netlist.
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<ReportBundle, SynthesisFailure>;

    /// Reads the area model out of a finished run.
    fn parse_area(&self, bundle: &ReportBundle) -> Result<AreaModel, ReportParseError>;

    /// Reads the timing model out of a finished run. A run without any
    /// timing path yields an execution time of 0.
    fn parse_timing(&self, bundle: &ReportBundle) -> Result<TimeModel, ReportParseError>;
}
