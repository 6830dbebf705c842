//! Device and default-width settings consumed by enumeration.

use std::collections::BTreeMap;

use techlib_config::TechConfig;
use techlib_model::DeviceKind;

/// Substring marking constant-driver units, which are never specialized.
pub const CONSTANT_UNIT_MARKER: &str = "constant_value";

/// Everything enumeration needs besides the unit itself.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecializerSettings {
    /// Widths used for a template type declared without precisions.
    pub template_widths: Vec<u32>,
    /// Widths used for concrete units, and for units declaring no types.
    pub concrete_widths: Vec<u32>,
    /// Unit names that yield no specializations.
    pub skip_units: Vec<String>,
    /// DSP y-width → x-width table of the device.
    pub dsp_y_to_x: BTreeMap<u32, u32>,
    /// Selects the flavour of fresh area and time models.
    pub kind: DeviceKind,
}

impl Default for SpecializerSettings {
    fn default() -> Self {
        Self::from_config(&TechConfig::default())
    }
}

impl SpecializerSettings {
    /// Builds settings from the run configuration.
    pub fn from_config(config: &TechConfig) -> Self {
        Self {
            template_widths: config.specialization.template_widths.clone(),
            concrete_widths: config.specialization.concrete_widths.clone(),
            skip_units: config.specialization.skip_units.clone(),
            dsp_y_to_x: config.device.dsp_y_to_x(),
            kind: config.device.kind,
        }
    }

    /// Returns `true` if `name` is excluded from specialization.
    pub fn skips(&self, name: &str) -> bool {
        name.contains(CONSTANT_UNIT_MARKER) || self.skip_units.iter().any(|s| s == name)
    }

    /// The DSP x-width paired with `precision` as y-width, if any.
    pub fn dsp_x(&self, precision: u32) -> Option<u32> {
        self.dsp_y_to_x.get(&precision).copied()
    }
}
