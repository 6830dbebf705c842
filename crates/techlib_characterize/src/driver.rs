//! Characterization of one specialization.
//!
//! The [`Driver`] builds the measurement wrapper of a specialization, hands
//! it to the backend flow, and folds the measured area and timing back into
//! the unit. Commutative variants of the same tuple share one synthesis run
//! through a [`CharacterizationContext`].

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use techlib_backend::{BackendFlow, SynthesisRequest};
use techlib_common::{ConfigurationError, TechResult, Timestamp};
use techlib_model::{FunctionalUnit, HdlDescription, TechnologyNode, TimeModel};
use tracing::{debug, info, warn};

use crate::context::{CharacterizationContext, Measurement};
use crate::generator::{GeneratedOperator, GeneratorRequest, NoGenerator, OperatorGenerator};
use crate::settings::CharacterizationSettings;
use crate::wrapper::{build_wrapper, WrapperRequest};

/// One specialization to characterize.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterizationJob {
    /// The specialization as registered in its library.
    pub unit: FunctionalUnit,
    /// Operand precision.
    pub precision: u32,
    /// Selected pipe value.
    pub pipe: Option<String>,
    /// Selected port-vector size.
    pub portsize: Option<String>,
    /// Index among the unit's inputs of the constant-pinned port.
    pub pinned: Option<usize>,
}

/// The outcome of a successful job.
#[derive(Debug, Clone, PartialEq)]
pub struct Characterized {
    /// Partial node to merge into the library.
    pub node: TechnologyNode,
    /// `false` when the figures were reused from a commutative sibling.
    pub synthesized: bool,
}

/// Runs characterization jobs against one backend flow.
pub struct Driver {
    flow: Arc<dyn BackendFlow>,
    generator: Arc<dyn OperatorGenerator>,
    settings: CharacterizationSettings,
}

impl Driver {
    /// Creates a driver without an operator generator.
    pub fn new(flow: Arc<dyn BackendFlow>, settings: CharacterizationSettings) -> Self {
        Self {
            flow,
            generator: Arc::new(NoGenerator),
            settings,
        }
    }

    /// Replaces the operator generator.
    pub fn with_generator(mut self, generator: Arc<dyn OperatorGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// The run settings.
    pub fn settings(&self) -> &CharacterizationSettings {
        &self.settings
    }

    /// Characterizes one specialization.
    ///
    /// Synthesis failures and unreadable reports are returned to the caller,
    /// which records the job as incomplete; nothing is written anywhere.
    pub async fn characterize(
        &self,
        job: &CharacterizationJob,
        ctx: &mut CharacterizationContext,
    ) -> TechResult<Characterized> {
        let mut unit = job.unit.clone();
        match job.pinned {
            Some(_) if unit.template.is_some() && unit.characterizing_constant_value.is_none() => {
                unit.characterizing_constant_value = Some(self.settings.characterizing_constant.clone());
            }
            Some(_) => {}
            None => unit.characterizing_constant_value = None,
        }

        let generated = self.generate(&unit, job);
        let depth = generated.as_ref().map(|g| g.pipeline_depth);

        let reused = ctx.reusable().cloned();
        let (measurement, synthesized) = match reused {
            Some(first) => {
                debug!(unit = %unit.name, "reusing commutative measurement");
                (first, false)
            }
            None => {
                info!(unit = %unit.name, "synthesizing");
                let request = self.request(&unit, job, generated)?;
                let bundle = self.flow.synthesize(&request).await?;
                let measurement = Measurement {
                    area: self.flow.parse_area(&bundle)?,
                    time: self.flow.parse_timing(&bundle)?,
                };
                ctx.record(job.pinned, &measurement);
                (measurement, true)
            }
        };

        let base = unit.base_name().to_string();
        unit.area = Some(measurement.area.clone());
        for op in &mut unit.operations {
            let time = assemble_time(
                &base,
                op.time.as_ref(),
                &measurement.time,
                job.pipe.as_deref(),
                depth,
            )?;
            op.time = Some(time);
        }
        unit.characterization_timestamp = Timestamp::now();
        debug!(
            unit = %unit.name,
            area = measurement.area.area(),
            execution_time = measurement.time.execution_time(),
            "characterized"
        );
        Ok(Characterized {
            node: unit.into(),
            synthesized,
        })
    }

    fn generate(&self, unit: &FunctionalUnit, job: &CharacterizationJob) -> Option<GeneratedOperator> {
        if unit.description != Some(HdlDescription::Generated) {
            return None;
        }
        let request = GeneratorRequest {
            unit: unit.base_name(),
            input_width: job.precision,
            output_width: unit.outputs().next().map_or(job.precision, |p| p.width),
            pipe: job.pipe.as_deref().unwrap_or(""),
        };
        let generated = self.generator.generate(&request);
        if generated.is_none() {
            warn!(unit = %unit.name, "operator generator does not provide this unit");
        }
        generated
    }

    fn request(
        &self,
        unit: &FunctionalUnit,
        job: &CharacterizationJob,
        generated: Option<GeneratedOperator>,
    ) -> Result<SynthesisRequest, ConfigurationError> {
        let wrapper_request = WrapperRequest {
            unit,
            precision: job.precision,
            pipe: job.pipe.as_deref(),
            portsize: job.portsize.as_deref(),
            pinned: job.pinned,
            bram_bitsize_max: self.settings.bram_bitsize_max,
            port_vector_size: self.settings.port_vector_size,
            max_lut_size: self.settings.max_lut_size,
        };
        let wrapper = build_wrapper(&wrapper_request, &mut StdRng::from_entropy())?;
        let mut auxiliary_files = wrapper.auxiliary_files;
        if let Some(generated) = generated {
            auxiliary_files.extend(generated.files);
        }
        Ok(SynthesisRequest {
            unit: unit.name.clone(),
            circuit: wrapper.circuit,
            clock_period_ns: self.settings.clock_period_ns,
            auxiliary_files,
        })
    }
}

/// Folds a measured timing model into one operation.
///
/// With a pipe value `n`, a pipelined unit (`n > 0`) gets the measured delay
/// as stage period, an initiation time of 1 and `depth + 1` cycles, where
/// `depth` is the generator's reported pipeline depth or `n` when there is
/// none; a generator depth of 0 flattens the unit to a combinational one.
/// Without a pipe value, a combinational operation takes the measured delay
/// as execution time and a multi-cycle one takes it as stage period.
pub fn assemble_time(
    unit: &str,
    existing: Option<&TimeModel>,
    measured: &TimeModel,
    pipe: Option<&str>,
    depth: Option<u32>,
) -> Result<TimeModel, ConfigurationError> {
    let exec = measured.execution_time();
    let mut time = measured.clone();
    if let Some(existing) = existing {
        time.set_synthesis_dependent(existing.synthesis_dependent());
        time.set_initiation_time(existing.initiation_time());
    }

    match pipe {
        Some(pipe) => {
            let stages: u32 = pipe.trim().parse().map_err(|_| {
                ConfigurationError::MalformedTemplateParameter {
                    unit: unit.to_string(),
                    field: "pipe_parameters",
                    value: pipe.to_string(),
                    reason: "pipe value is not a number".to_string(),
                }
            })?;
            time.set_stage_period(0.0);
            time.set_execution_time(0.0, 0);
            time.set_initiation_time(0);
            if stages > 0 && depth != Some(0) {
                time.set_stage_period(exec);
                time.set_initiation_time(1);
                time.set_execution_time(exec, depth.unwrap_or(stages) + 1);
            } else if depth == Some(0) {
                time.set_execution_time(exec, 0);
            } else {
                time.set_execution_time(exec, stages);
            }
        }
        None => {
            let cycles = existing.map_or(0, TimeModel::cycles);
            if cycles == 0 {
                time.set_execution_time(exec, 0);
            } else {
                let declared = existing.map_or(exec, TimeModel::execution_time);
                time.set_execution_time(declared, cycles);
                time.set_stage_period(exec);
            }
        }
    }
    Ok(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use techlib_backend::ReportBundle;
    use techlib_common::{ReportParseError, SynthesisFailure, TechError};
    use techlib_model::{
        AreaModel, DataType, DeviceKind, Operation, Port, PortDirection, TemplateLink,
        CLOCK_PORT,
    };

    struct FixedFlow {
        calls: AtomicUsize,
        area: f64,
        delay: f64,
    }

    impl FixedFlow {
        fn new(area: f64, delay: f64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                area,
                delay,
            }
        }
    }

    #[async_trait]
    impl BackendFlow for FixedFlow {
        async fn synthesize(&self, request: &SynthesisRequest) -> Result<ReportBundle, SynthesisFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ReportBundle {
                unit: request.unit.clone(),
                ..ReportBundle::default()
            })
        }

        fn parse_area(&self, _bundle: &ReportBundle) -> Result<AreaModel, ReportParseError> {
            let mut area = AreaModel::for_device(DeviceKind::Fpga);
            area.set_area(self.area);
            Ok(area)
        }

        fn parse_timing(&self, _bundle: &ReportBundle) -> Result<TimeModel, ReportParseError> {
            let mut time = TimeModel::for_device(DeviceKind::Fpga);
            time.set_execution_time(self.delay, 0);
            Ok(time)
        }
    }

    struct FailingFlow;

    #[async_trait]
    impl BackendFlow for FailingFlow {
        async fn synthesize(&self, request: &SynthesisRequest) -> Result<ReportBundle, SynthesisFailure> {
            Err(SynthesisFailure::ToolFailed {
                unit: request.unit.clone(),
                status: Some(1),
                stderr: "license unavailable".to_string(),
            })
        }

        fn parse_area(&self, _bundle: &ReportBundle) -> Result<AreaModel, ReportParseError> {
            unreachable!()
        }

        fn parse_timing(&self, _bundle: &ReportBundle) -> Result<TimeModel, ReportParseError> {
            unreachable!()
        }
    }

    fn specialization(name: &str, parameters: &str) -> FunctionalUnit {
        let mut unit = FunctionalUnit::new(name);
        unit.template = Some(TemplateLink {
            name: "AND2".to_string(),
            parameters: parameters.to_string(),
        });
        unit.ports = vec![
            Port::new(CLOCK_PORT, PortDirection::In, DataType::Bool, 1),
            Port::new("in1", PortDirection::In, DataType::Int, 8),
            Port::new("in2", PortDirection::In, DataType::Int, 8),
            Port::new("out1", PortDirection::Out, DataType::Int, 8),
        ];
        let mut op = Operation::new("bit_and_expr");
        op.commutative = true;
        op.time = Some(TimeModel::for_device(DeviceKind::Fpga));
        unit.operations = vec![op];
        unit
    }

    fn job(unit: FunctionalUnit, pinned: Option<usize>) -> CharacterizationJob {
        CharacterizationJob {
            unit,
            precision: 8,
            pipe: None,
            portsize: None,
            pinned,
        }
    }

    fn timed(exec: f64, cycles: u32) -> TimeModel {
        let mut time = TimeModel::for_device(DeviceKind::Fpga);
        time.set_execution_time(exec, cycles);
        time
    }

    #[tokio::test]
    async fn commutative_variants_share_one_synthesis() {
        let flow = Arc::new(FixedFlow::new(12.0, 1.5));
        let driver = Driver::new(flow.clone(), CharacterizationSettings::default());
        let mut ctx = CharacterizationContext::new(true);

        let first = driver
            .characterize(&job(specialization("AND2_0_8_8", "0 8 8"), Some(1)), &mut ctx)
            .await
            .unwrap();
        let second = driver
            .characterize(&job(specialization("AND2_8_0_8", "8 0 8"), Some(2)), &mut ctx)
            .await
            .unwrap();
        let unpinned = driver
            .characterize(&job(specialization("AND2_8_8_8", "8 8 8"), None), &mut ctx)
            .await
            .unwrap();

        assert!(first.synthesized);
        assert!(!second.synthesized);
        assert!(!unpinned.synthesized);
        assert_eq!(flow.calls.load(Ordering::SeqCst), 1);

        let unit = second.node.unit();
        assert_eq!(unit.area.as_ref().map(AreaModel::area), Some(12.0));
        assert_eq!(unit.operations[0].execution_time(), 1.5);
        assert!(!unit.characterization_timestamp.is_epoch());
    }

    #[tokio::test]
    async fn pinned_template_gets_characterizing_constant() {
        let flow = Arc::new(FixedFlow::new(1.0, 1.0));
        let driver = Driver::new(flow, CharacterizationSettings::default());

        let mut ctx = CharacterizationContext::new(false);
        let pinned = driver
            .characterize(&job(specialization("AND2_0_8_8", "0 8 8"), Some(1)), &mut ctx)
            .await
            .unwrap();
        assert_eq!(
            pinned.node.unit().characterizing_constant_value.as_deref(),
            Some("6148914691236517205")
        );

        let mut unit = specialization("AND2_8_8_8", "8 8 8");
        unit.characterizing_constant_value = Some("1".to_string());
        let unpinned = driver.characterize(&job(unit, None), &mut ctx).await.unwrap();
        assert!(unpinned.node.unit().characterizing_constant_value.is_none());
    }

    #[tokio::test]
    async fn synthesis_failure_is_returned() {
        let driver = Driver::new(Arc::new(FailingFlow), CharacterizationSettings::default());
        let mut ctx = CharacterizationContext::new(true);
        let err = driver
            .characterize(&job(specialization("AND2_8_8_8", "8 8 8"), None), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, TechError::Synthesis(_)));
        assert!(ctx.reusable().is_none());
    }

    #[test]
    fn pipelined_unit_takes_depth_plus_one_cycles() {
        let time = assemble_time("mult_expr_FU", None, &timed(2.0, 0), Some("3"), None).unwrap();
        assert_eq!(time.cycles(), 4);
        assert_eq!(time.stage_period(), 2.0);
        assert_eq!(time.initiation_time(), 1);
        assert_eq!(time.execution_time(), 2.0);
    }

    #[test]
    fn generator_depth_overrides_pipe_value() {
        let time = assemble_time("mult_expr_FU", None, &timed(2.0, 0), Some("3"), Some(5)).unwrap();
        assert_eq!(time.cycles(), 6);
    }

    #[test]
    fn zero_generator_depth_flattens() {
        let time = assemble_time("mult_expr_FU", None, &timed(2.0, 0), Some("3"), Some(0)).unwrap();
        assert_eq!(time.cycles(), 0);
        assert_eq!(time.stage_period(), 0.0);
        assert_eq!(time.execution_time(), 2.0);
        assert_eq!(time.initiation_time(), 0);
    }

    #[test]
    fn zero_pipe_is_combinational() {
        let time = assemble_time("mult_expr_FU", None, &timed(2.0, 0), Some("0"), None).unwrap();
        assert_eq!(time.cycles(), 0);
        assert_eq!(time.execution_time(), 2.0);
    }

    #[test]
    fn multi_cycle_operation_keeps_latency() {
        let existing = timed(10.0, 2);
        let time = assemble_time("div_FU", Some(&existing), &timed(3.5, 0), None, None).unwrap();
        assert_eq!(time.cycles(), 2);
        assert_eq!(time.execution_time(), 10.0);
        assert_eq!(time.stage_period(), 3.5);
    }

    #[test]
    fn combinational_operation_takes_measured_delay() {
        let existing = timed(10.0, 0);
        let time = assemble_time("AND2", Some(&existing), &timed(0.7, 0), None, None).unwrap();
        assert_eq!(time.cycles(), 0);
        assert_eq!(time.execution_time(), 0.7);
    }

    #[test]
    fn malformed_pipe_value_is_configuration_error() {
        let err = assemble_time("mult_expr_FU", None, &timed(2.0, 0), Some("x"), None).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::MalformedTemplateParameter { field: "pipe_parameters", .. }
        ));
    }
}
