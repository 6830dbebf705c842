//! `techlib characterize`: measures cells through the configured backend.
//!
//! Loads the technology document, plans and materializes the selected
//! specializations, synthesizes them on a worker pool, applies the
//! post-measurement fixes and writes the characterization document.
//! Ctrl-C cancels the batch; completed cells are still written.

use std::path::Path;
use std::sync::Arc;

use techlib_backend::{flow_for_config, BackendFlow};
use techlib_characterize::{
    device_element, BatchOutcome, BatchRunner, BatchSummary, CellSelection,
    CharacterizationSettings, Driver,
};
use techlib_common::TechResult;
use techlib_config::TechConfig;
use techlib_specialize::SpecializerSettings;
use techlib_store::{write_characterization, TechnologyManager};
use tracing::{info, warn};

use crate::pipeline::load_run_config;
use crate::{CharacterizeArgs, GlobalArgs, ReportFormat};

/// Runs the `techlib characterize` command.
///
/// Returns exit code 0 when the batch ran to the end and 1 when it was
/// cancelled. Configuration, consistency and I/O errors abort the run.
pub fn run(args: &CharacterizeArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (root, config) = load_run_config(global)?;
    let selection: CellSelection = args.cells.parse()?;

    let mut manager = TechnologyManager::new();
    manager.load(&args.technology, config.device.kind)?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| root.join(&config.run.output));
    let flow: Arc<dyn BackendFlow> = Arc::from(flow_for_config(&config, root.join(&config.run.work_dir)));

    if !global.quiet {
        eprintln!(
            "  Characterizing {} ({})",
            args.technology.display(),
            if config.device.name.is_empty() {
                "unnamed device"
            } else {
                config.device.name.as_str()
            }
        );
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime.block_on(async {
        let runner = runner(&config, flow, args.workers);
        let token = runner.cancellation_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling characterization");
                token.cancel();
            }
        });
        runner.run(manager, &selection).await
    })?;

    write_outcome(&output, &outcome, &config)?;
    info!(path = %output.display(), "wrote characterization document");

    match args.format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome.summary)?),
        ReportFormat::Text => {
            if !global.quiet {
                eprint!("{}", render_summary(&outcome.summary, &output));
            }
        }
    }
    Ok(if outcome.summary.cancelled { 1 } else { 0 })
}

/// A batch runner for `config`, with an optional worker override.
pub fn runner(config: &TechConfig, flow: Arc<dyn BackendFlow>, workers: Option<usize>) -> BatchRunner {
    let mut settings = CharacterizationSettings::from_config(config);
    if let Some(workers) = workers {
        settings.workers = workers.max(1);
    }
    BatchRunner::new(
        Driver::new(flow, settings),
        SpecializerSettings::from_config(config),
    )
}

/// Writes the completed cells of `outcome` to `path`.
pub fn write_outcome(path: &Path, outcome: &BatchOutcome, config: &TechConfig) -> TechResult<()> {
    write_characterization(path, &outcome.document(device_element(config)))
}

fn render_summary(summary: &BatchSummary, output: &Path) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "   Completed {} cells ({} synthesized)\n",
        summary.completed.len(),
        summary.synthesized
    ));
    if !summary.incomplete.is_empty() {
        out.push_str(&format!("  Incomplete {} cells\n", summary.incomplete.len()));
        for failure in &summary.incomplete {
            out.push_str(&format!(
                "    {} [{}]: {}\n",
                failure.cell, failure.kind, failure.message
            ));
        }
    }
    if let Some(ref fixes) = summary.fixes {
        out.push_str(&format!(
            "       Fixed {} trivial, {} twin, {} proxy cells (baseline {} ns)\n",
            fixes.trivial.len(),
            fixes.twins.len(),
            fixes.proxies.len(),
            fixes.baseline
        ));
    }
    if summary.cancelled {
        out.push_str("   Cancelled before completion\n");
    }
    out.push_str(&format!("       Wrote {}\n", output.display()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use techlib_backend::{ReportBundle, SynthesisRequest};
    use techlib_characterize::JobFailure;
    use techlib_common::{ErrorKind, ReportParseError, SynthesisFailure};
    use techlib_model::{
        parse_supported_types, AreaModel, DataType, DeviceKind, FunctionalUnit,
        FunctionalUnitTemplate, HdlDescription, Operation, Port, PortDirection, TimeModel,
        CLOCK_PORT,
    };
    use techlib_store::read_characterization;

    #[derive(Default)]
    struct MockFlow {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl BackendFlow for MockFlow {
        async fn synthesize(&self, request: &SynthesisRequest) -> Result<ReportBundle, SynthesisFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ReportBundle {
                unit: request.unit.clone(),
                ..ReportBundle::default()
            })
        }

        fn parse_area(&self, _bundle: &ReportBundle) -> Result<AreaModel, ReportParseError> {
            let mut area = AreaModel::for_device(DeviceKind::Fpga);
            area.set_area(12.0);
            Ok(area)
        }

        fn parse_timing(&self, _bundle: &ReportBundle) -> Result<TimeModel, ReportParseError> {
            let mut time = TimeModel::for_device(DeviceKind::Fpga);
            time.set_execution_time(1.4, 0);
            Ok(time)
        }
    }

    fn manager() -> TechnologyManager {
        let mut unit = FunctionalUnit::new("AND2");
        unit.description = Some(HdlDescription::Verilog);
        unit.ports = vec![
            Port::new(CLOCK_PORT, PortDirection::In, DataType::Bool, 1),
            Port::new("in1", PortDirection::In, DataType::Int, 32),
            Port::new("in2", PortDirection::In, DataType::Int, 32),
            Port::new("out1", PortDirection::Out, DataType::Int, 32),
        ];
        let mut op = Operation::new("bit_and_expr");
        op.commutative = true;
        op.supported_types = parse_supported_types("int:8").unwrap();
        unit.operations = vec![op];

        let mut baseline = FunctionalUnit::new("ASSIGN_VECTOR_BOOL_FU");
        let mut assign = Operation::new("ASSIGN");
        let mut time = TimeModel::for_device(DeviceKind::Fpga);
        time.set_execution_time(0.5, 0);
        assign.time = Some(time);
        baseline.operations = vec![assign];

        let mut manager = TechnologyManager::new();
        manager
            .add(FunctionalUnitTemplate::new(unit).into(), "STD_FU")
            .unwrap();
        manager.add(baseline.into(), "STD_FU").unwrap();
        manager
    }

    #[test]
    fn worker_override_is_clamped() {
        let flow: Arc<dyn BackendFlow> = Arc::new(MockFlow::default());
        let config = TechConfig::default();
        let runner = runner(&config, flow, Some(0));
        let rt = tokio::runtime::Runtime::new().unwrap();
        let outcome = rt
            .block_on(runner.run(manager(), &CellSelection::All))
            .unwrap();
        assert_eq!(outcome.summary.completed.len(), 3);
    }

    #[tokio::test]
    async fn batch_writes_completed_cells() {
        let mock = Arc::new(MockFlow::default());
        let flow: Arc<dyn BackendFlow> = mock.clone();
        let mut config = TechConfig::default();
        config.device.name = "xc7z020".to_string();

        let outcome = runner(&config, flow, Some(2))
            .run(manager(), &CellSelection::All)
            .await
            .unwrap();
        assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.summary.completed.len(), 3);
        assert!(!outcome.summary.cancelled);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("characterization.json");
        write_outcome(&path, &outcome, &config).unwrap();

        let (device, libraries) = read_characterization(&path).unwrap();
        assert_eq!(device.name, "xc7z020");
        assert!(device.parameters.contains_key("connection_time"));
        assert_eq!(libraries.len(), 1);
        assert_eq!(libraries[0].len(), 3);
    }

    #[test]
    fn summary_lists_failures() {
        let summary = BatchSummary {
            completed: vec!["AND2_8_8_8".to_string()],
            synthesized: 1,
            incomplete: vec![JobFailure {
                cell: "AND2_0_8_8".to_string(),
                kind: ErrorKind::Synthesis,
                message: "tool timed out".to_string(),
            }],
            cancelled: true,
            fixes: None,
        };
        let text = render_summary(&summary, &PathBuf::from("char.json"));
        assert!(text.contains("Completed 1 cells (1 synthesized)"));
        assert!(text.contains("AND2_0_8_8 [synthesis]: tool timed out"));
        assert!(text.contains("Cancelled"));
        assert!(text.ends_with("Wrote char.json\n"));
    }
}
