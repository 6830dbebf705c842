//! The generic process-based backend flow.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use techlib_common::{ReportParseError, SynthesisFailure};
use techlib_config::{BackendConfig, BackendDialect, TechConfig};
use techlib_model::{AreaModel, TimeModel};
use tracing::{debug, info, warn};

use crate::design_compiler::DesignCompiler;
use crate::dialect::{ReportDialect, ReportFile};
use crate::flow::{BackendFlow, ReportBundle, SynthesisRequest};
use crate::process::run_tool;
use crate::vivado::Vivado;
use crate::xilinx_map::XilinxMap;

/// File the wrapper netlist is written to.
pub const NETLIST_FILE: &str = "netlist.json";
/// File listing every input file, one per line.
pub const FILE_LIST: &str = "files.txt";
/// File the constraint text is written to, when configured.
pub const CONSTRAINTS_FILE: &str = "constraints.txt";

const STDERR_TAIL_LINES: usize = 20;

/// Runs a configured command once per request inside `work_root/<unit>` and
/// reads the reports named by the dialect back out of that directory.
#[derive(Debug, Clone)]
pub struct ToolFlow<D> {
    dialect: D,
    command: String,
    args: Vec<String>,
    timeout: Duration,
    work_root: PathBuf,
    constraints: Option<String>,
}

impl<D: ReportDialect> ToolFlow<D> {
    /// Creates a flow speaking `dialect` with the tool settings of `config`.
    pub fn new(dialect: D, config: &BackendConfig, work_root: impl Into<PathBuf>) -> Self {
        Self {
            dialect,
            command: config.command.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            work_root: work_root.into(),
            constraints: config.constraints.clone(),
        }
    }

    /// The report dialect.
    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    /// The work directory of `unit`.
    pub fn work_dir(&self, unit: &str) -> PathBuf {
        self.work_root.join(unit)
    }

    async fn prepare(&self, request: &SynthesisRequest, dir: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(dir).await?;
        for &(_, name) in self.dialect.report_files() {
            match tokio::fs::remove_file(dir.join(name)).await {
                Ok(()) => debug!(report = name, dir = %dir.display(), "removed previous report"),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(err),
            }
        }

        let netlist = serde_json::to_string_pretty(&request.circuit).map_err(io::Error::other)?;
        tokio::fs::write(dir.join(NETLIST_FILE), netlist).await?;

        let mut listed = vec![NETLIST_FILE.to_string()];
        for file in &request.auxiliary_files {
            tokio::fs::write(dir.join(&file.name), &file.contents).await?;
            listed.push(file.name.clone());
        }
        tokio::fs::write(dir.join(FILE_LIST), listed.join("\n") + "\n").await?;

        if let Some(constraints) = &self.constraints {
            tokio::fs::write(dir.join(CONSTRAINTS_FILE), constraints).await?;
        }
        Ok(())
    }

    fn expand_args(&self, request: &SynthesisRequest, dir: &Path) -> Vec<String> {
        let constraints = if self.constraints.is_some() {
            dir.join(CONSTRAINTS_FILE).display().to_string()
        } else {
            String::new()
        };
        let substitutions = [
            ("{top}", request.circuit.name.clone()),
            ("{files}", dir.join(FILE_LIST).display().to_string()),
            ("{clock}", request.clock_period_ns.to_string()),
            ("{constraints}", constraints),
            ("{dir}", dir.display().to_string()),
        ];
        self.args
            .iter()
            .map(|arg| {
                substitutions
                    .iter()
                    .fold(arg.clone(), |acc, (key, value)| acc.replace(key, value))
            })
            .collect()
    }
}

#[async_trait]
impl<D: ReportDialect + 'static> BackendFlow for ToolFlow<D> {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<ReportBundle, SynthesisFailure> {
        let unit = request.unit.as_str();
        let dir = self.work_dir(unit);
        self.prepare(request, &dir)
            .await
            .map_err(|source| SynthesisFailure::Spawn {
                unit: unit.to_string(),
                source,
            })?;

        let args = self.expand_args(request, &dir);
        info!(unit, dialect = self.dialect.name(), "running synthesis");
        let output = run_tool(unit, &self.command, &args, &dir, self.timeout).await?;
        if !output.success() {
            warn!(unit, status = ?output.status, "synthesis tool failed");
            return Err(SynthesisFailure::ToolFailed {
                unit: unit.to_string(),
                status: output.status,
                stderr: tail(&output.stderr, STDERR_TAIL_LINES),
            });
        }

        let mut reports = BTreeMap::new();
        for &(kind, name) in self.dialect.report_files() {
            let path = dir.join(name);
            let text = tokio::fs::read_to_string(&path).await.map_err(|_| {
                SynthesisFailure::MissingReport {
                    unit: unit.to_string(),
                    path: path.clone(),
                }
            })?;
            debug!(unit, report = %path.display(), "collected report");
            reports.insert(kind, ReportFile::new(path, text));
        }

        Ok(ReportBundle {
            unit: unit.to_string(),
            work_dir: dir,
            reports,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    fn parse_area(&self, bundle: &ReportBundle) -> Result<AreaModel, ReportParseError> {
        self.dialect.parse_area(bundle)
    }

    fn parse_timing(&self, bundle: &ReportBundle) -> Result<TimeModel, ReportParseError> {
        self.dialect.parse_timing(bundle)
    }
}

/// Builds the flow selected by `config.backend.dialect`.
pub fn flow_for_config(config: &TechConfig, work_root: impl Into<PathBuf>) -> Box<dyn BackendFlow> {
    let backend = &config.backend;
    let work_root = work_root.into();
    match backend.dialect {
        BackendDialect::DesignCompiler => Box::new(ToolFlow::new(DesignCompiler, backend, work_root)),
        BackendDialect::XilinxMap => Box::new(ToolFlow::new(XilinxMap, backend, work_root)),
        BackendDialect::Vivado => Box::new(ToolFlow::new(Vivado, backend, work_root)),
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
