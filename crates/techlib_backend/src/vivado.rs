//! Xilinx Vivado key/value report dialect.
//!
//! The synthesis script writes one `KEY=value` (or `KEY value`) line per
//! figure into `vivado.rpt`.

use techlib_common::ReportParseError;
use techlib_model::{AreaModel, ClbModel, ClbResource, DeviceKind, LutModel, LutTiming, TimeModel};

use crate::dialect::{ReportDialect, ReportFile, ReportKind};
use crate::flow::ReportBundle;

const SLICE_LUTS: &str = "XILINX_SLICE_LUTS";
const DESIGN_DELAY: &str = "XILINX_DESIGN_DELAY";

const RESOURCE_KEYS: [(&str, ClbResource); 6] = [
    ("XILINX_SLICE", ClbResource::Slice),
    ("XILINX_SLICE_REGISTERS", ClbResource::Registers),
    (SLICE_LUTS, ClbResource::SliceLuts),
    ("XILINX_LUT_FLIP_FLOP_PAIRS_USED", ClbResource::LutFfPairs),
    ("XILINX_BLOCK_RAMFIFO", ClbResource::Bram),
    ("XILINX_DSPS", ClbResource::Dsp),
];

/// Reads the key/value report written by the Vivado characterization script.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vivado;

impl ReportDialect for Vivado {
    fn name(&self) -> &'static str {
        "vivado"
    }

    fn device_kind(&self) -> DeviceKind {
        DeviceKind::Fpga
    }

    fn report_files(&self) -> &'static [(ReportKind, &'static str)] {
        &[(ReportKind::Area, "vivado.rpt"), (ReportKind::Timing, "vivado.rpt")]
    }

    fn parse_area(&self, bundle: &ReportBundle) -> Result<AreaModel, ReportParseError> {
        let mut model = ClbModel::default();
        if let Some(report) = bundle.report(ReportKind::Area) {
            for (key, resource) in RESOURCE_KEYS {
                if let Some(value) = keyed_value(report, key)? {
                    model.resources.insert(resource, value);
                    if key == SLICE_LUTS {
                        model.area = value;
                    }
                }
            }
        }
        Ok(AreaModel::Clb(model))
    }

    fn parse_timing(&self, bundle: &ReportBundle) -> Result<TimeModel, ReportParseError> {
        let mut model = LutModel::default();
        if let Some(report) = bundle.report(ReportKind::Timing) {
            if let Some(delay) = keyed_value(report, DESIGN_DELAY)? {
                model.timings.insert(LutTiming::CombinationalDelay, delay);
                model.common.execution_time = delay;
            }
        }
        Ok(TimeModel::Lut(model))
    }
}

/// The last value recorded under exactly `key`.
fn keyed_value(report: &ReportFile, key: &str) -> Result<Option<f64>, ReportParseError> {
    let mut value = None;
    for line in report.text.lines() {
        let Some(rest) = line.trim().strip_prefix(key) else {
            continue;
        };
        let raw = if let Some(after) = rest.strip_prefix('=') {
            after.trim()
        } else if rest.starts_with(char::is_whitespace) {
            rest.trim()
        } else {
            continue;
        };
        value = Some(report.number(key, raw)?);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(text: &str) -> ReportBundle {
        let mut bundle = ReportBundle::default();
        for kind in [ReportKind::Area, ReportKind::Timing] {
            bundle.reports.insert(kind, ReportFile::new("vivado.rpt", text));
        }
        bundle
    }

    #[test]
    fn key_value_report() {
        let b = bundle(
            "XILINX_SLICE=12\nXILINX_SLICE_REGISTERS 8\nXILINX_SLICE_LUTS=40\nXILINX_DSPS=1\nXILINX_DESIGN_DELAY=2.75\n",
        );
        let area = Vivado.parse_area(&b).unwrap();
        assert_eq!(area.area(), 40.0);
        assert_eq!(area.resource(ClbResource::Slice), 12.0);
        assert_eq!(area.resource(ClbResource::Registers), 8.0);
        assert_eq!(area.resource(ClbResource::Dsp), 1.0);

        let time = Vivado.parse_timing(&b).unwrap();
        assert_eq!(time.execution_time(), 2.75);
        let TimeModel::Lut(lut) = time else {
            panic!("expected a LUT model");
        };
        assert_eq!(lut.timings[&LutTiming::CombinationalDelay], 2.75);
    }

    #[test]
    fn key_prefix_does_not_match_longer_key() {
        let b = bundle("XILINX_SLICE_LUTS=40\n");
        let area = Vivado.parse_area(&b).unwrap();
        assert_eq!(area.resource(ClbResource::Slice), 0.0);
    }

    #[test]
    fn no_delay_line_means_zero() {
        let time = Vivado.parse_timing(&bundle("XILINX_SLICE=1\n")).unwrap();
        assert_eq!(time.execution_time(), 0.0);
    }

    #[test]
    fn garbled_delay_is_an_error() {
        let err = Vivado
            .parse_timing(&bundle("XILINX_DESIGN_DELAY=fast\n"))
            .unwrap_err();
        assert_eq!(err.marker, DESIGN_DELAY);
    }
}
