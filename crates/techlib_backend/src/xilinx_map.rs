//! Xilinx ISE map/trce report dialect.

use techlib_common::ReportParseError;
use techlib_model::{AreaModel, ClbModel, ClbResource, DeviceKind, LutModel, LutTiming, TimeModel};

use crate::dialect::{ReportDialect, ReportKind};
use crate::flow::ReportBundle;

const LUT_FF_PAIRS: &str = "Number of LUT Flip Flop pairs used:";
const MINIMUM_PERIOD: &str = "Minimum period:";

/// Map report markers. Several device families report the same resource
/// under different names; a later marker overrides an earlier one.
const RESOURCE_MARKERS: [(&str, ClbResource); 11] = [
    ("Number of Slice Registers:", ClbResource::Registers),
    ("Number of Slice Flip Flops:", ClbResource::Registers),
    ("Number of 4 input LUTs:", ClbResource::SliceLuts),
    ("Number of Slice LUTs:", ClbResource::SliceLuts),
    ("Number of occupied Slices:", ClbResource::Slice),
    (LUT_FF_PAIRS, ClbResource::LutFfPairs),
    ("Number of DSP48Es:", ClbResource::Dsp),
    ("Number of DSP48E1s:", ClbResource::Dsp),
    ("Number of BlockRAM/FIFO:", ClbResource::Bram),
    ("Number of RAMB36E1/FIFO36E1s:", ClbResource::Bram),
    ("Number of FIFO16/RAMB16s:", ClbResource::Bram),
];

/// Reads the `map.mrp` utilization report and the `timing.twr` trce report.
#[derive(Debug, Clone, Copy, Default)]
pub struct XilinxMap;

impl ReportDialect for XilinxMap {
    fn name(&self) -> &'static str {
        "xilinx-map"
    }

    fn device_kind(&self) -> DeviceKind {
        DeviceKind::Fpga
    }

    fn report_files(&self) -> &'static [(ReportKind, &'static str)] {
        &[(ReportKind::Area, "map.mrp"), (ReportKind::Timing, "timing.twr")]
    }

    fn parse_area(&self, bundle: &ReportBundle) -> Result<AreaModel, ReportParseError> {
        let mut model = ClbModel::default();
        if let Some(report) = bundle.report(ReportKind::Area) {
            for (marker, resource) in RESOURCE_MARKERS {
                if let Some(count) = report.last_count(marker)? {
                    model.resources.insert(resource, count);
                    if marker == LUT_FF_PAIRS {
                        model.area = count;
                    }
                }
            }
        }
        Ok(AreaModel::Clb(model))
    }

    fn parse_timing(&self, bundle: &ReportBundle) -> Result<TimeModel, ReportParseError> {
        let mut model = LutModel::default();
        if let Some(report) = bundle.report(ReportKind::Timing) {
            if let Some(raw) = report.values_after(MINIMUM_PERIOD).last() {
                let period = if raw.starts_with("No path found") {
                    0.0
                } else {
                    let token = raw.split_whitespace().next().unwrap_or("");
                    report.number(MINIMUM_PERIOD, token.trim_end_matches("ns"))?
                };
                model.timings.insert(LutTiming::MinimumPeriodPostPar, period);
                model.common.execution_time = period;
            }
        }
        Ok(TimeModel::Lut(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::ReportFile;

    fn bundle(kind: ReportKind, text: &str) -> ReportBundle {
        let mut bundle = ReportBundle::default();
        bundle.reports.insert(kind, ReportFile::new("report", text));
        bundle
    }

    #[test]
    fn map_report_resources() {
        let text = "\
Slice Logic Utilization:
  Number of Slice Registers:                    65 out of 126,800    1%
  Number of Slice LUTs:                      1,204 out of  63,400    1%
  Number of occupied Slices:                   310 out of  15,850    1%
  Number of LUT Flip Flop pairs used:        1,250
  Number of DSP48E1s:                            2 out of     240    1%
";
        let area = XilinxMap.parse_area(&bundle(ReportKind::Area, text)).unwrap();
        assert_eq!(area.area(), 1250.0);
        assert_eq!(area.resource(ClbResource::SliceLuts), 1204.0);
        assert_eq!(area.resource(ClbResource::Registers), 65.0);
        assert_eq!(area.resource(ClbResource::Dsp), 2.0);
        assert_eq!(area.resource(ClbResource::Bram), 0.0);
    }

    #[test]
    fn minimum_period_strips_unit() {
        let text = "Minimum period:   3.456ns   (Maximum frequency: 289.352MHz)\n";
        let time = XilinxMap.parse_timing(&bundle(ReportKind::Timing, text)).unwrap();
        assert_eq!(time.execution_time(), 3.456);
    }

    #[test]
    fn no_path_found_is_zero() {
        let text = "Minimum period: No path found\n";
        let time = XilinxMap.parse_timing(&bundle(ReportKind::Timing, text)).unwrap();
        assert_eq!(time.execution_time(), 0.0);
    }

    #[test]
    fn garbled_count_is_an_error() {
        let text = "Number of Slice LUTs:   many\n";
        let err = XilinxMap.parse_area(&bundle(ReportKind::Area, text)).unwrap_err();
        assert_eq!(err.value, "many");
    }
}
