//! Run settings consumed by the driver and the corrections.

use techlib_config::TechConfig;
use techlib_model::DeviceKind;

/// Everything a characterization run reads from `techlib.toml`.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterizationSettings {
    /// Flavour of the area and time models.
    pub kind: DeviceKind,
    /// Clock period handed to the backend, in nanoseconds.
    pub clock_period_ns: f64,
    /// Concurrent synthesis jobs.
    pub workers: usize,
    /// Largest BRAM port width of the device.
    pub bram_bitsize_max: u32,
    /// Inputs of `lut_expr_FU` above this index are tied low.
    pub max_lut_size: Option<usize>,
    /// Bit pattern driven on a pinned input.
    pub characterizing_constant: String,
    /// Port-vector replica count when no portsize parameter is set.
    pub port_vector_size: u32,
    /// Cell providing the assignment baseline.
    pub baseline_cell: String,
    /// Operation of `baseline_cell` providing the assignment baseline.
    pub baseline_operation: String,
    /// Fixed baseline overriding the measured one.
    pub baseline_time_ns: Option<f64>,
    /// Share of the baseline charged as connection delay.
    pub relative_connection_offset: f64,
}

impl Default for CharacterizationSettings {
    fn default() -> Self {
        Self::from_config(&TechConfig::default())
    }
}

impl CharacterizationSettings {
    /// Builds settings from the run configuration.
    pub fn from_config(config: &TechConfig) -> Self {
        Self {
            kind: config.device.kind,
            clock_period_ns: config.run.clock_period_ns,
            workers: config.run.workers.max(1),
            bram_bitsize_max: config.device.bram_bitsize_max,
            max_lut_size: config.device.max_lut_size,
            characterizing_constant: config.specialization.characterizing_constant.clone(),
            port_vector_size: config.specialization.port_vector_size,
            baseline_cell: config.correction.baseline_cell.clone(),
            baseline_operation: config.correction.baseline_operation.clone(),
            baseline_time_ns: config.correction.baseline_time_ns,
            relative_connection_offset: config.correction.relative_connection_offset,
        }
    }
}
