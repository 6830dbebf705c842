//! Synopsys Design Compiler report dialect (ASIC).

use std::collections::BTreeMap;

use techlib_common::ReportParseError;
use techlib_model::{AreaModel, CellModel, DeviceKind, LibertyModel, TimeModel};

use crate::dialect::{ReportDialect, ReportFile, ReportKind};
use crate::flow::ReportBundle;

const TOTAL_CELL_AREA: &str = "Total cell area:";
const ARRIVAL_TIME: &str = "data arrival time";

/// Area markers and the characterization names they are stored under.
/// The flag marks markers whose value may read `undefined`.
const AREA_MARKERS: [(&str, &str, bool); 5] = [
    ("Combinational area:", "combinational_area", false),
    ("Noncombinational area:", "noncombinational_area", false),
    ("Net Interconnect area:", "interconnect_area", true),
    (TOTAL_CELL_AREA, "total_cell_area", false),
    ("Total area:", "total_area", true),
];

/// Reads `area.rpt` and `timing.rpt` as written by `report_area` and `report_timing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesignCompiler;

impl ReportDialect for DesignCompiler {
    fn name(&self) -> &'static str {
        "design-compiler"
    }

    fn device_kind(&self) -> DeviceKind {
        DeviceKind::Asic
    }

    fn report_files(&self) -> &'static [(ReportKind, &'static str)] {
        &[(ReportKind::Area, "area.rpt"), (ReportKind::Timing, "timing.rpt")]
    }

    fn parse_area(&self, bundle: &ReportBundle) -> Result<AreaModel, ReportParseError> {
        let mut model = CellModel::default();
        let Some(report) = bundle.report(ReportKind::Area) else {
            return Ok(AreaModel::Cell(model));
        };
        let mut figures = BTreeMap::new();
        for (marker, name, may_be_undefined) in AREA_MARKERS {
            if let Some(value) = area_figure(report, marker, may_be_undefined)? {
                figures.insert(name.to_string(), value);
            }
        }
        if let Some(total) = figures.get("total_cell_area") {
            model.area = *total;
        }
        model.characterizations = figures;
        Ok(AreaModel::Cell(model))
    }

    fn parse_timing(&self, bundle: &ReportBundle) -> Result<TimeModel, ReportParseError> {
        let mut time = TimeModel::Liberty(LibertyModel::default());
        let Some(report) = bundle.report(ReportKind::Timing) else {
            return Ok(time);
        };
        let mut worst = 0.0_f64;
        for raw in report.values_after(ARRIVAL_TIME) {
            let token = raw.split_whitespace().next().unwrap_or("");
            worst = worst.max(report.number(ARRIVAL_TIME, token)?.abs());
        }
        time.set_execution_time(worst, 0);
        Ok(time)
    }
}

fn area_figure(
    report: &ReportFile,
    marker: &str,
    may_be_undefined: bool,
) -> Result<Option<f64>, ReportParseError> {
    let mut value = None;
    for raw in report.values_after(marker) {
        if may_be_undefined && raw.contains("undefined") {
            continue;
        }
        let token = raw.split_whitespace().next().unwrap_or("");
        value = Some(report.number(marker, token)?);
    }
    Ok(value)
}
