//! Target technology kind.

use serde::{Deserialize, Serialize};

/// Whether characterization targets an FPGA fabric or an ASIC cell library.
///
/// Selects which [`AreaModel`](crate::AreaModel) and
/// [`TimeModel`](crate::TimeModel) variants are created for fresh units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// FPGA: CLB resource counts and LUT-based timing.
    #[default]
    Fpga,
    /// ASIC: cell area and liberty-style timing.
    Asic,
}
