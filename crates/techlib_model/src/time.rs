//! Timing models measured by characterization.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::kind::DeviceKind;

/// Fields shared by every timing model flavour.
///
/// Zero is the "unset" value for every numeric field: an `initiation_time` of
/// 0 means not pipelined, `cycles` of 0 means derive the latency from
/// `execution_time` and the clock period, and `stage_period` of 0 means not
/// pipelined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingCommon {
    /// Combinational delay in nanoseconds.
    #[serde(default)]
    pub execution_time: f64,
    /// Cycles between successive issues.
    #[serde(default)]
    pub initiation_time: u32,
    /// Fixed latency in cycles.
    #[serde(default)]
    pub cycles: u32,
    /// Period of one pipeline stage in nanoseconds.
    #[serde(default)]
    pub stage_period: f64,
    /// Whether the figures depend on the synthesis context.
    #[serde(default)]
    pub synthesis_dependent: bool,
    /// Pin-to-pin delays: source pin → target pin → delay (ns).
    #[serde(default)]
    pub pin_to_pin: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Named FPGA timing figures stored in a [`LutModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LutTiming {
    /// Worst combinational path delay.
    CombinationalDelay,
    /// Minimum period estimated after mapping.
    MinimumPeriodPostMap,
    /// Minimum period measured after place and route.
    MinimumPeriodPostPar,
}

/// FPGA timing model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LutModel {
    /// Shared timing fields.
    #[serde(flatten)]
    pub common: TimingCommon,
    /// Named timing figures.
    #[serde(default)]
    pub timings: BTreeMap<LutTiming, f64>,
}

/// One liberty-style timing arc group: the delay to `output` from any of `inputs`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingGroup {
    /// The output pin.
    pub output: String,
    /// The input pins related to this arc.
    pub inputs: BTreeSet<String>,
    /// The arc delay in nanoseconds.
    pub delay: f64,
}

/// ASIC timing model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibertyModel {
    /// Shared timing fields.
    #[serde(flatten)]
    pub common: TimingCommon,
    /// Per-(output, input-set) arcs.
    #[serde(default)]
    pub timing_groups: Vec<TimingGroup>,
    /// Output drive strength.
    #[serde(default)]
    pub drive_strength: f64,
    /// Clock skew figures keyed by clock pin.
    #[serde(default)]
    pub skew: BTreeMap<String, f64>,
}

/// The measured timing of one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum TimeModel {
    /// FPGA flavour.
    Lut(LutModel),
    /// ASIC flavour.
    Liberty(LibertyModel),
}

impl TimeModel {
    /// Creates an empty model of the flavour matching the device.
    pub fn for_device(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Fpga => TimeModel::Lut(LutModel::default()),
            DeviceKind::Asic => TimeModel::Liberty(LibertyModel::default()),
        }
    }

    /// Creates an empty model of the same flavour as `self`.
    pub fn empty_like(&self) -> Self {
        match self {
            TimeModel::Lut(_) => TimeModel::Lut(LutModel::default()),
            TimeModel::Liberty(_) => TimeModel::Liberty(LibertyModel::default()),
        }
    }

    /// The shared fields.
    pub fn common(&self) -> &TimingCommon {
        match self {
            TimeModel::Lut(m) => &m.common,
            TimeModel::Liberty(m) => &m.common,
        }
    }

    /// Mutable access to the shared fields.
    pub fn common_mut(&mut self) -> &mut TimingCommon {
        match self {
            TimeModel::Lut(m) => &mut m.common,
            TimeModel::Liberty(m) => &mut m.common,
        }
    }

    /// Combinational delay in nanoseconds.
    pub fn execution_time(&self) -> f64 {
        self.common().execution_time
    }

    /// Sets the execution time together with the cycle count.
    pub fn set_execution_time(&mut self, execution_time: f64, cycles: u32) {
        let common = self.common_mut();
        common.execution_time = execution_time;
        common.cycles = cycles;
    }

    /// Fixed latency in cycles.
    pub fn cycles(&self) -> u32 {
        self.common().cycles
    }

    /// Cycles between successive issues.
    pub fn initiation_time(&self) -> u32 {
        self.common().initiation_time
    }

    /// Sets the initiation interval.
    pub fn set_initiation_time(&mut self, initiation_time: u32) {
        self.common_mut().initiation_time = initiation_time;
    }

    /// Pipeline stage period in nanoseconds.
    pub fn stage_period(&self) -> f64 {
        self.common().stage_period
    }

    /// Sets the pipeline stage period.
    pub fn set_stage_period(&mut self, stage_period: f64) {
        self.common_mut().stage_period = stage_period;
    }

    /// Whether the figures depend on the synthesis context.
    pub fn synthesis_dependent(&self) -> bool {
        self.common().synthesis_dependent
    }

    /// Marks the figures as synthesis dependent.
    pub fn set_synthesis_dependent(&mut self, value: bool) {
        self.common_mut().synthesis_dependent = value;
    }

    /// Records a pin-to-pin delay, keeping the larger value on repeats.
    pub fn add_pin_delay(&mut self, source: &str, target: &str, delay: f64) {
        let entry = self
            .common_mut()
            .pin_to_pin
            .entry(source.to_string())
            .or_default()
            .entry(target.to_string())
            .or_insert(delay);
        if *entry < delay {
            *entry = delay;
        }
    }

    /// The largest recorded pin-to-pin delay, or 0.
    pub fn max_pin_delay(&self) -> f64 {
        self.common()
            .pin_to_pin
            .values()
            .flat_map(|targets| targets.values())
            .fold(0.0, |acc: f64, &d| acc.max(d))
    }

    /// Copies the latency-related fields of `other` into a fresh model of
    /// `self`'s flavour: execution time, cycles, synthesis dependence and
    /// initiation time. Measured details are not carried over.
    pub fn carried_from(kind: DeviceKind, other: &TimeModel) -> Self {
        let mut model = TimeModel::for_device(kind);
        model.set_execution_time(other.execution_time(), other.cycles());
        model.set_synthesis_dependent(other.synthesis_dependent());
        model.set_initiation_time(other.initiation_time());
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_execution_time_sets_cycles() {
        let mut model = TimeModel::for_device(DeviceKind::Fpga);
        model.set_execution_time(2.5, 3);
        assert_eq!(model.execution_time(), 2.5);
        assert_eq!(model.cycles(), 3);
    }

    #[test]
    fn pin_delay_keeps_maximum() {
        let mut model = TimeModel::for_device(DeviceKind::Asic);
        model.add_pin_delay("in1", "out1", 0.4);
        model.add_pin_delay("in1", "out1", 0.3);
        model.add_pin_delay("in2", "out1", 0.6);
        assert_eq!(model.common().pin_to_pin["in1"]["out1"], 0.4);
        assert_eq!(model.max_pin_delay(), 0.6);
    }

    #[test]
    fn carried_from_drops_measured_details() {
        let mut source = TimeModel::Lut(LutModel {
            common: TimingCommon {
                stage_period: 3.0,
                ..TimingCommon::default()
            },
            timings: BTreeMap::from([(LutTiming::CombinationalDelay, 1.0)]),
        });
        source.set_execution_time(1.5, 2);
        source.set_initiation_time(1);
        source.set_synthesis_dependent(true);

        let copy = TimeModel::carried_from(DeviceKind::Fpga, &source);
        assert_eq!(copy.execution_time(), 1.5);
        assert_eq!(copy.cycles(), 2);
        assert_eq!(copy.initiation_time(), 1);
        assert!(copy.synthesis_dependent());
        assert_eq!(copy.stage_period(), 0.0);
        match copy {
            TimeModel::Lut(m) => assert!(m.timings.is_empty()),
            TimeModel::Liberty(_) => panic!("expected LUT model"),
        }
    }
}
