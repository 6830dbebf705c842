//! Batch characterization of a technology.
//!
//! A run plans the specializations of the selected units, registers the
//! missing instances, then characterizes every (precision, pipe, portsize)
//! group as one task. Variants of a group run in order so commutative
//! siblings can reuse the first pinned measurement; groups run concurrently
//! up to the configured worker count. The manager sits behind one coarse
//! lock taken only around lookups and updates.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use techlib_common::{
    ConfigurationError, ConsistencyViolation, ErrorKind, SynthesisFailure, TechError, TechResult,
};
use techlib_config::TechConfig;
use techlib_specialize::{
    materialize, plan_library, plan_unit, Specialization, SpecializationPlan, SpecializerSettings,
};
use techlib_store::{CharacterizationDocument, DeviceElement, TechnologyManager};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::context::CharacterizationContext;
use crate::driver::{CharacterizationJob, Driver};
use crate::fix::{fix_characterization, FixReport};
use crate::selection::CellSelection;
use crate::settings::CharacterizationSettings;

/// Device parameter recording the derived connection delay.
pub const CONNECTION_TIME_PARAMETER: &str = "connection_time";

/// A job that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    /// Specialization name.
    pub cell: String,
    /// Failure category.
    pub kind: ErrorKind,
    /// Error message.
    pub message: String,
}

/// What a batch did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Characterized cells, in completion order.
    pub completed: Vec<String>,
    /// How many completed cells ran synthesis; the rest reused a sibling.
    pub synthesized: usize,
    /// Cells left uncharacterized.
    pub incomplete: Vec<JobFailure>,
    /// Whether the batch was cancelled.
    pub cancelled: bool,
    /// Corrections applied, unless cancelled or nothing completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixes: Option<FixReport>,
}

/// The libraries after a batch, with its summary.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Every library, characterized cells updated.
    pub manager: TechnologyManager,
    /// What happened.
    pub summary: BatchSummary,
}

impl BatchOutcome {
    /// The result document: `device` plus every completed cell.
    pub fn document(&self, mut device: DeviceElement) -> CharacterizationDocument {
        if let Some(fixes) = &self.summary.fixes {
            device.parameters.insert(
                CONNECTION_TIME_PARAMETER.to_string(),
                fixes.connection_time.to_string(),
            );
        }
        let completed: BTreeSet<&str> = self.summary.completed.iter().map(String::as_str).collect();
        CharacterizationDocument {
            device,
            libraries: self
                .manager
                .export_filtered(|_, node| completed.contains(node.name())),
        }
    }
}

/// The device section of the result document.
pub fn device_element(config: &TechConfig) -> DeviceElement {
    DeviceElement {
        name: config.device.name.clone(),
        vendor: config.device.vendor.clone(),
        kind: config.device.kind,
        parameters: config.device.parameters.clone(),
    }
}

/// Fails unless the corrections will find an assignment baseline.
fn check_baseline(
    manager: &TechnologyManager,
    settings: &CharacterizationSettings,
) -> Result<(), ConfigurationError> {
    if settings.baseline_time_ns.is_some() {
        return Ok(());
    }
    let cell = manager
        .find(&settings.baseline_cell)
        .ok_or_else(|| ConfigurationError::UnknownUnit(settings.baseline_cell.clone()))?;
    if cell.unit().operation(&settings.baseline_operation).is_none() {
        return Err(ConfigurationError::UnknownUnit(format!(
            "{}/{}",
            settings.baseline_cell, settings.baseline_operation
        )));
    }
    Ok(())
}

struct Shared {
    manager: TechnologyManager,
    claimed: BTreeSet<String>,
}

/// One (precision, pipe, portsize) tuple of one unit.
struct GroupTask {
    library: String,
    commutative: bool,
    precision: u32,
    pipe: Option<String>,
    portsize: Option<String>,
    variants: Vec<Specialization>,
}

enum JobRecord {
    Completed { cell: String, synthesized: bool },
    Failed(JobFailure),
}

impl JobRecord {
    fn failed(cell: &str, err: &TechError) -> Self {
        JobRecord::Failed(JobFailure {
            cell: cell.to_string(),
            kind: err.kind(),
            message: err.to_string(),
        })
    }
}

/// Runs characterization batches.
pub struct BatchRunner {
    driver: Arc<Driver>,
    specializer: SpecializerSettings,
    cancel: CancellationToken,
}

impl BatchRunner {
    /// Creates a runner.
    pub fn new(driver: Driver, specializer: SpecializerSettings) -> Self {
        Self {
            driver: Arc::new(driver),
            specializer,
            cancel: CancellationToken::new(),
        }
    }

    /// The token aborting this runner's batches. Once raised it stays raised.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Plans the selected units and registers their missing specializations.
    pub fn prepare(
        &self,
        manager: &mut TechnologyManager,
        selection: &CellSelection,
    ) -> TechResult<Vec<SpecializationPlan>> {
        check_baseline(manager, self.driver.settings())?;
        let mut plans = Vec::new();
        match selection.component() {
            Some(component) => {
                let library = manager
                    .library_of(component)
                    .ok_or_else(|| ConfigurationError::UnknownUnit(component.to_string()))?;
                let node = manager.resolve(library, component)?;
                plans.extend(plan_unit(node, library, &self.specializer)?);
            }
            None => {
                for store in manager.libraries() {
                    plans.extend(plan_library(store, &self.specializer)?);
                }
            }
        }

        let kind = self.driver.settings().kind;
        for plan in &plans {
            let store = manager
                .library_mut(&plan.library)
                .ok_or_else(|| ConsistencyViolation::UnknownNode(plan.library.clone()))?;
            let created = materialize(store, plan, kind)?;
            if !created.is_empty() {
                debug!(source = %plan.source, created = created.len(), "registered specializations");
            }
        }
        Ok(plans)
    }

    /// Characterizes the selected cells of `manager`.
    ///
    /// Synthesis and report failures leave the cell incomplete and the batch
    /// going. Configuration and consistency errors cancel the batch and are
    /// returned once every running job has stopped.
    pub async fn run(
        &self,
        mut manager: TechnologyManager,
        selection: &CellSelection,
    ) -> TechResult<BatchOutcome> {
        let plans = self.prepare(&mut manager, selection)?;
        let settings = self.driver.settings().clone();
        info!(
            units = plans.len(),
            workers = settings.workers,
            "starting characterization batch"
        );

        let shared = Arc::new(Mutex::new(Shared {
            manager,
            claimed: BTreeSet::new(),
        }));
        let permits = Arc::new(Semaphore::new(settings.workers));
        let mut handles = Vec::new();
        for plan in &plans {
            for group in &plan.groups {
                let variants: Vec<Specialization> = group
                    .variants
                    .iter()
                    .filter(|v| selection.includes_cell(&v.name))
                    .cloned()
                    .collect();
                if variants.is_empty() {
                    continue;
                }
                let task = GroupTask {
                    library: plan.library.clone(),
                    commutative: plan.commutative,
                    precision: group.precision,
                    pipe: group.pipe.clone(),
                    portsize: group.portsize.clone(),
                    variants,
                };
                let driver = Arc::clone(&self.driver);
                let shared = Arc::clone(&shared);
                let permits = Arc::clone(&permits);
                let cancel = self.cancel.clone();
                handles.push(tokio::spawn(async move {
                    let result = run_group(&task, &driver, &shared, &permits, &cancel).await;
                    if result.is_err() {
                        cancel.cancel();
                    }
                    result
                }));
            }
        }

        let mut summary = BatchSummary::default();
        let mut fatal = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(records)) => {
                    for record in records {
                        match record {
                            JobRecord::Completed { cell, synthesized } => {
                                summary.synthesized += usize::from(synthesized);
                                summary.completed.push(cell);
                            }
                            JobRecord::Failed(failure) => summary.incomplete.push(failure),
                        }
                    }
                }
                Ok(Err(err)) => {
                    fatal.get_or_insert(err);
                }
                Err(join) if join.is_panic() => std::panic::resume_unwind(join.into_panic()),
                Err(join) => warn!(error = %join, "characterization task aborted"),
            }
        }
        if let Some(err) = fatal {
            return Err(err);
        }

        let mut manager = std::mem::take(&mut shared.lock().await.manager);
        summary.cancelled = self.cancel.is_cancelled();
        if !summary.cancelled && !summary.completed.is_empty() {
            summary.fixes = Some(fix_characterization(&mut manager, &summary.completed, &settings)?);
        }
        info!(
            completed = summary.completed.len(),
            synthesized = summary.synthesized,
            incomplete = summary.incomplete.len(),
            cancelled = summary.cancelled,
            "characterization batch finished"
        );
        Ok(BatchOutcome { manager, summary })
    }
}

async fn run_group(
    task: &GroupTask,
    driver: &Driver,
    shared: &Mutex<Shared>,
    permits: &Semaphore,
    cancel: &CancellationToken,
) -> TechResult<Vec<JobRecord>> {
    let _permit = tokio::select! {
        permit = permits.acquire() => permit.ok(),
        _ = cancel.cancelled() => None,
    };
    let mut ctx = CharacterizationContext::new(task.commutative);
    let mut records = Vec::new();

    for spec in &task.variants {
        if cancel.is_cancelled() {
            let err = TechError::from(SynthesisFailure::Cancelled {
                unit: spec.name.clone(),
            });
            records.push(JobRecord::failed(&spec.name, &err));
            continue;
        }
        let unit = {
            let mut shared = shared.lock().await;
            if !shared.claimed.insert(spec.name.clone()) {
                continue;
            }
            shared
                .manager
                .library(&task.library)
                .and_then(|l| l.unit(&spec.name))
                .cloned()
        };
        let unit = unit.ok_or_else(|| ConsistencyViolation::UnknownNode(spec.name.clone()))?;
        let job = CharacterizationJob {
            unit,
            precision: task.precision,
            pipe: task.pipe.clone(),
            portsize: task.portsize.clone(),
            pinned: spec.pinned,
        };

        let result = tokio::select! {
            result = driver.characterize(&job, &mut ctx) => result,
            _ = cancel.cancelled() => Err(SynthesisFailure::Cancelled { unit: spec.name.clone() }.into()),
        };
        match result {
            Ok(done) => {
                shared.lock().await.manager.update(&task.library, &done.node)?;
                records.push(JobRecord::Completed {
                    cell: spec.name.clone(),
                    synthesized: done.synthesized,
                });
            }
            Err(err) if err.kind().aborts_run() => return Err(err),
            Err(err) => {
                warn!(cell = %spec.name, kind = %err.kind(), error = %err, "characterization incomplete");
                records.push(JobRecord::failed(&spec.name, &err));
            }
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use techlib_backend::{BackendFlow, ReportBundle, SynthesisRequest};
    use techlib_common::ReportParseError;
    use techlib_model::{
        parse_supported_types, AreaModel, DataType, DeviceKind, FunctionalUnit,
        FunctionalUnitTemplate, HdlDescription, Operation, Port, PortDirection, TimeModel,
        CLOCK_PORT,
    };
    use techlib_store::{read_characterization, write_characterization};


    #[derive(Default)]
    struct CountingFlow {
        calls: AtomicUsize,
        fail_on: Option<&'static str>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl BackendFlow for CountingFlow {
        async fn synthesize(&self, request: &SynthesisRequest) -> Result<ReportBundle, SynthesisFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_on.is_some_and(|marker| request.unit.contains(marker)) {
                return Err(SynthesisFailure::Timeout {
                    unit: request.unit.clone(),
                    seconds: 1,
                });
            }
            Ok(ReportBundle {
                unit: request.unit.clone(),
                ..ReportBundle::default()
            })
        }

        fn parse_area(&self, _bundle: &ReportBundle) -> Result<AreaModel, ReportParseError> {
            let mut area = AreaModel::for_device(DeviceKind::Fpga);
            area.set_area(3.0);
            Ok(area)
        }

        fn parse_timing(&self, _bundle: &ReportBundle) -> Result<TimeModel, ReportParseError> {
            let mut time = TimeModel::for_device(DeviceKind::Fpga);
            time.set_execution_time(0.9, 0);
            Ok(time)
        }
    }

    fn and2() -> FunctionalUnitTemplate {
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
        op.supported_types = parse_supported_types("int:8,16").unwrap();
        unit.operations = vec![op];
        FunctionalUnitTemplate::new(unit)
    }

    fn baseline_cell() -> FunctionalUnit {
        let mut unit = FunctionalUnit::new("ASSIGN_VECTOR_BOOL_FU");
        let mut op = Operation::new("ASSIGN");
        let mut time = TimeModel::for_device(DeviceKind::Fpga);
        time.set_execution_time(0.5, 0);
        op.time = Some(time);
        unit.operations = vec![op];
        unit
    }

    fn manager() -> TechnologyManager {
        let mut manager = TechnologyManager::new();
        manager.add(and2().into(), "STD_FU").unwrap();
        manager.add(baseline_cell().into(), "STD_FU").unwrap();
        manager
    }

    fn runner(flow: Arc<CountingFlow>, workers: usize) -> BatchRunner {
        let settings = CharacterizationSettings {
            workers,
            ..CharacterizationSettings::default()
        };
        BatchRunner::new(Driver::new(flow, settings), SpecializerSettings::default())
    }

    #[tokio::test]
    async fn commutative_and2_synthesizes_once_per_tuple() {
        let flow = Arc::new(CountingFlow::default());
        let outcome = runner(flow.clone(), 2)
            .run(manager(), &CellSelection::All)
            .await
            .unwrap();

        let mut completed = outcome.summary.completed.clone();
        completed.sort();
        assert_eq!(
            completed,
            vec![
                "AND2_0_16_16",
                "AND2_0_8_8",
                "AND2_16_0_16",
                "AND2_16_16_16",
                "AND2_8_0_8",
                "AND2_8_8_8",
            ]
        );
        assert_eq!(flow.calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.summary.synthesized, 2);
        assert!(outcome.summary.incomplete.is_empty());

        let unit = outcome.manager.find("AND2_16_16_16").unwrap().unit();
        assert_eq!(unit.area.as_ref().map(AreaModel::area), Some(3.0));
        assert_eq!(unit.operations[0].execution_time(), 0.9);
        assert!(unit.is_fully_timed());
        assert_eq!(outcome.summary.fixes.as_ref().map(|f| f.baseline), Some(0.5));
    }

    #[tokio::test]
    async fn synthesis_failures_are_recorded_and_batch_continues() {
        let flow = Arc::new(CountingFlow {
            fail_on: Some("_16"),
            ..CountingFlow::default()
        });
        let outcome = runner(flow, 1)
            .run(manager(), &CellSelection::All)
            .await
            .unwrap();

        assert_eq!(outcome.summary.completed.len(), 3);
        assert_eq!(outcome.summary.incomplete.len(), 3);
        assert!(outcome
            .summary
            .incomplete
            .iter()
            .all(|f| f.kind == ErrorKind::Synthesis && f.cell.contains("_16")));
    }

    #[tokio::test]
    async fn selection_restricts_cells() {
        let flow = Arc::new(CountingFlow::default());
        let selection: CellSelection = "AND2-AND2_8_8_8".parse().unwrap();
        let outcome = runner(flow.clone(), 1)
            .run(manager(), &selection)
            .await
            .unwrap();
        assert_eq!(outcome.summary.completed, vec!["AND2_8_8_8".to_string()]);
        assert_eq!(flow.calls.load(Ordering::SeqCst), 1);
        // all six are registered, only one is characterized
        assert!(outcome.manager.find("AND2_0_16_16").is_some());
    }

    #[tokio::test]
    async fn unknown_component_is_configuration_error() {
        let flow = Arc::new(CountingFlow::default());
        let selection: CellSelection = "OR2-OR2_8_8_8".parse().unwrap();
        let err = runner(flow, 1).run(manager(), &selection).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn missing_baseline_fails_before_synthesis() {
        let flow = Arc::new(CountingFlow::default());
        let mut manager = TechnologyManager::new();
        manager.add(and2().into(), "STD_FU").unwrap();

        let err = runner(flow.clone(), 2)
            .run(manager, &CellSelection::All)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TechError::Configuration(ConfigurationError::UnknownUnit(ref name)) if name == "ASSIGN_VECTOR_BOOL_FU"
        ));
        assert_eq!(flow.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn configured_baseline_needs_no_baseline_cell() {
        let flow = Arc::new(CountingFlow::default());
        let mut manager = TechnologyManager::new();
        manager.add(and2().into(), "STD_FU").unwrap();
        let settings = CharacterizationSettings {
            workers: 2,
            baseline_time_ns: Some(0.4),
            ..CharacterizationSettings::default()
        };
        let runner = BatchRunner::new(Driver::new(flow.clone(), settings), SpecializerSettings::default());

        let outcome = runner.run(manager, &CellSelection::All).await.unwrap();
        assert_eq!(outcome.summary.completed.len(), 6);
        assert_eq!(outcome.summary.fixes.as_ref().map(|f| f.baseline), Some(0.4));
    }

    #[tokio::test]
    async fn cancellation_stops_running_jobs() {
        let flow = Arc::new(CountingFlow {
            delay: Some(Duration::from_secs(30)),
            ..CountingFlow::default()
        });
        let runner = runner(flow, 2);
        let token = runner.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            runner.run(manager(), &CellSelection::All),
        )
        .await
        .unwrap()
        .unwrap();

        assert!(outcome.summary.cancelled);
        assert!(outcome.summary.completed.is_empty());
        assert_eq!(outcome.summary.incomplete.len(), 6);
        assert!(outcome.summary.fixes.is_none());
    }

    #[tokio::test]
    async fn document_holds_completed_cells_only() {
        let flow = Arc::new(CountingFlow::default());
        let selection: CellSelection = "AND2-AND2_8_8_8,AND2-AND2_0_8_8".parse().unwrap();
        let outcome = runner(flow, 1).run(manager(), &selection).await.unwrap();

        let mut config = TechConfig::default();
        config.device.name = "xc7z020".to_string();
        let document = outcome.document(device_element(&config));
        assert!(document.device.parameters.contains_key(CONNECTION_TIME_PARAMETER));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("characterization.json");
        write_characterization(&path, &document).unwrap();
        let (device, libraries) = read_characterization(&path).unwrap();
        assert_eq!(device.name, "xc7z020");
        assert_eq!(libraries.len(), 1);
        let mut names: Vec<&str> = libraries[0].names().collect();
        names.sort();
        assert_eq!(names, vec!["AND2_0_8_8", "AND2_8_8_8"]);
    }
}
