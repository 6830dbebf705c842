//! Area models measured by characterization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::kind::DeviceKind;

/// The measured silicon cost of a functional unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum AreaModel {
    /// ASIC standard-cell area.
    Cell(CellModel),
    /// FPGA logic-block resource usage.
    Clb(ClbModel),
}

/// ASIC area: scalar area plus named characterization values
/// (combinational, noncombinational, interconnect, total).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellModel {
    /// The area used for allocation decisions.
    pub area: f64,
    /// Additional named area figures reported by the tool.
    #[serde(default)]
    pub characterizations: BTreeMap<String, f64>,
}

/// FPGA area: scalar area plus per-resource counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClbModel {
    /// The area used for allocation decisions.
    pub area: f64,
    /// Resource counts keyed by resource kind.
    #[serde(default)]
    pub resources: BTreeMap<ClbResource, f64>,
}

/// FPGA resource kinds tracked by [`ClbModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClbResource {
    /// Flip-flops.
    Registers,
    /// Look-up tables.
    SliceLuts,
    /// Occupied slices.
    Slice,
    /// LUT/flip-flop pairs.
    LutFfPairs,
    /// DSP blocks.
    Dsp,
    /// Block RAMs.
    Bram,
}

impl ClbResource {
    /// All resource kinds, in document order.
    pub const ALL: [ClbResource; 6] = [
        ClbResource::Registers,
        ClbResource::SliceLuts,
        ClbResource::Slice,
        ClbResource::LutFfPairs,
        ClbResource::Dsp,
        ClbResource::Bram,
    ];

    /// The attribute name used for this resource in library documents.
    pub fn as_str(self) -> &'static str {
        match self {
            ClbResource::Registers => "REGISTERS",
            ClbResource::SliceLuts => "SLICE_LUTS",
            ClbResource::Slice => "SLICE",
            ClbResource::LutFfPairs => "LUT_FF_PAIRS",
            ClbResource::Dsp => "DSP",
            ClbResource::Bram => "BRAM",
        }
    }

    /// Looks up a resource by its document attribute name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == name)
    }
}

impl AreaModel {
    /// Creates an empty model of the flavour matching the device.
    pub fn for_device(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Fpga => AreaModel::Clb(ClbModel::default()),
            DeviceKind::Asic => AreaModel::Cell(CellModel::default()),
        }
    }

    /// The scalar area.
    pub fn area(&self) -> f64 {
        match self {
            AreaModel::Cell(m) => m.area,
            AreaModel::Clb(m) => m.area,
        }
    }

    /// Overrides the scalar area, leaving detailed figures untouched.
    pub fn set_area(&mut self, area: f64) {
        match self {
            AreaModel::Cell(m) => m.area = area,
            AreaModel::Clb(m) => m.area = area,
        }
    }

    /// The resource count for `resource`, or 0 for ASIC models and unset resources.
    pub fn resource(&self, resource: ClbResource) -> f64 {
        match self {
            AreaModel::Clb(m) => m.resources.get(&resource).copied().unwrap_or(0.0),
            AreaModel::Cell(_) => 0.0,
        }
    }
}
