//! Corrections applied after measurement.
//!
//! Synthesis of a cell that reduces to wiring reports noise rather than a
//! delay, so such cells take the assignment baseline instead. Adders whose
//! pinned input is zero take the figures of their unpinned twin, and memory
//! proxies take the store delay of the BRAM they front.

use serde::Serialize;
use techlib_common::{ConfigurationError, Timestamp};
use techlib_model::{AreaModel, DeviceKind, FunctionalUnit, TechnologyNode, TimeModel};
use techlib_store::TechnologyManager;
use tracing::{debug, info, warn};

use crate::settings::CharacterizationSettings;

/// Units that always reduce to wiring.
const TRIVIAL_UNITS: &[&str] = &[
    "ASSIGN_REAL_FU",
    "ASSIGN_SIGNED_FU",
    "ASSIGN_UNSIGNED_FU",
    "ASSIGN_VECTOR_BOOL_FU",
    "addr_expr_FU",
    "fp_view_convert_expr_FU",
    "ui_view_convert_expr_FU",
    "view_convert_expr_FU",
    "assert_expr_FU",
    "IIdata_converter_FU",
    "UIdata_converter_FU",
    "IUdata_converter_FU",
    "UUdata_converter_FU",
    "IIconvert_expr_FU",
    "IUconvert_expr_FU",
    "UIconvert_expr_FU",
    "UUconvert_expr_FU",
];

const SHIFTS: &[&str] = &[
    "rshift_expr_FU",
    "ui_rshift_expr_FU",
    "lshift_expr_FU",
    "ui_lshift_expr_FU",
    "ui_lrotate_expr_FU",
    "ui_rrotate_expr_FU",
];

const VECTOR_SHIFTS: &[&str] = &[
    "vec_rshift_expr_FU",
    "ui_vec_rshift_expr_FU",
    "vec_lshift_expr_FU",
    "ui_vec_lshift_expr_FU",
    "vec1_rshift_expr_FU",
    "ui_vec1_rshift_expr_FU",
    "vec1_lshift_expr_FU",
    "ui_vec1_lshift_expr_FU",
];

const BITWISE: &[&str] = &[
    "bit_and_expr_FU",
    "ui_bit_and_expr_FU",
    "bit_ior_expr_FU",
    "ui_bit_ior_expr_FU",
];

const VECTOR_BITWISE: &[&str] = &[
    "vec_bit_and_expr_FU",
    "ui_vec_bit_and_expr_FU",
    "vec_bit_ior_expr_FU",
    "ui_vec_bit_ior_expr_FU",
];

const CONDITIONALS: &[&str] = &["cond_expr_FU", "ui_cond_expr_FU", "fp_cond_expr_FU"];

const VECTOR_CONDITIONALS: &[&str] = &["vec_cond_expr_FU", "ui_vec_cond_expr_FU"];

/// Templates whose zero-pinned variants copy their unpinned twin.
const TWIN_TEMPLATES: &[&str] = &[
    "plus_expr_FU",
    "ui_plus_expr_FU",
    "minus_expr_FU",
    "ui_minus_expr_FU",
    "ternary_alu_expr_FU",
    "ui_ternary_alu_expr_FU",
    "ternary_mm_expr_FU",
    "ui_ternary_mm_expr_FU",
    "ternary_mp_expr_FU",
    "ui_ternary_mp_expr_FU",
    "ternary_pm_expr_FU",
    "ui_ternary_pm_expr_FU",
    "ternary_plus_expr_FU",
    "ui_ternary_plus_expr_FU",
];

/// BRAM whose store delay single-port proxies take.
pub const BRAM_STD: &str = "ARRAY_1D_STD_BRAM";
/// BRAM whose store delay multi-port proxies take.
pub const BRAM_NN: &str = "ARRAY_1D_STD_BRAM_NN";
const BRAM_OPERATION: &str = "STORE";
const PROXY_CTRL_STD: &str = "BMEMORY_CTRL";
const PROXY_CTRL_NN: &str = "BMEMORY_CTRLN";
const DEFAULT_BRAM_LATENCY: &str = "2";

/// What the corrections changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FixReport {
    /// Assignment baseline in nanoseconds.
    pub baseline: f64,
    /// Connection delay derived from the baseline.
    pub connection_time: f64,
    /// Cells set to the baseline.
    pub trivial: Vec<String>,
    /// Cells that took their unpinned twin's timing.
    pub twins: Vec<String>,
    /// Proxies that took their BRAM's store delay.
    pub proxies: Vec<String>,
}

/// Returns `true` if `unit` reduces to wiring.
pub fn is_trivial(unit: &FunctionalUnit) -> bool {
    if TRIVIAL_UNITS.contains(&unit.base_name()) {
        return true;
    }
    let (Some(template), Some(parameters)) = (unit.template_name(), unit.template_parameters())
    else {
        return false;
    };
    let p: Vec<&str> = parameters.split(' ').collect();
    let zero = |i: usize| p.get(i) == Some(&"0");
    if SHIFTS.contains(&template) {
        p.len() == 3 && zero(1)
    } else if VECTOR_SHIFTS.contains(&template) {
        p.len() >= 4 && zero(2)
    } else if BITWISE.contains(&template) {
        p.len() == 3 && (zero(0) || zero(1))
    } else if VECTOR_BITWISE.contains(&template) {
        p.len() >= 5 && (zero(0) || zero(2))
    } else if CONDITIONALS.contains(&template) {
        p.len() == 4 && zero(0)
    } else if VECTOR_CONDITIONALS.contains(&template) {
        p.len() >= 6 && zero(0)
    } else {
        false
    }
}

/// The unpinned twin of a zero-pinned adder-like specialization.
fn twin_name(unit: &FunctionalUnit) -> Option<String> {
    let template = unit.template_name()?;
    let parameters = unit.template_parameters()?;
    if !TWIN_TEMPLATES.contains(&template) {
        return None;
    }
    if !(parameters.contains(" 0") || parameters.starts_with("0 ")) {
        return None;
    }
    let last = parameters.split(' ').last()?;
    let mut name = template.to_string();
    for p in parameters.split(' ') {
        name.push('_');
        name.push_str(if p == "0" { last } else { p });
    }
    Some(name)
}

/// The assignment baseline and the timestamp corrected cells take.
fn assignment_baseline(
    manager: &TechnologyManager,
    settings: &CharacterizationSettings,
) -> Result<(f64, Timestamp), ConfigurationError> {
    if let Some(fixed) = settings.baseline_time_ns {
        return Ok((fixed, Timestamp::now()));
    }
    let cell = manager
        .find(&settings.baseline_cell)
        .map(TechnologyNode::unit)
        .ok_or_else(|| ConfigurationError::UnknownUnit(settings.baseline_cell.clone()))?;
    let time = cell
        .operation(&settings.baseline_operation)
        .and_then(|op| op.time.as_ref())
        .ok_or_else(|| {
            ConfigurationError::UnknownUnit(format!(
                "{}/{}",
                settings.baseline_cell, settings.baseline_operation
            ))
        })?;
    Ok((time.execution_time(), cell.characterization_timestamp))
}

fn unit_mut<'a>(manager: &'a mut TechnologyManager, name: &str) -> Option<&'a mut FunctionalUnit> {
    let library = manager.library_of(name)?.to_string();
    match manager.library_mut(&library)?.get_mut(name)? {
        TechnologyNode::Unit(unit) => Some(unit),
        TechnologyNode::Template(_) => None,
    }
}

/// Applies every correction to the named cells.
pub fn fix_characterization(
    manager: &mut TechnologyManager,
    cells: &[String],
    settings: &CharacterizationSettings,
) -> Result<FixReport, ConfigurationError> {
    let (baseline, stamp) = assignment_baseline(manager, settings)?;
    let mut report = FixReport {
        baseline,
        connection_time: baseline * settings.relative_connection_offset,
        ..FixReport::default()
    };
    info!(
        baseline,
        connection_time = report.connection_time,
        "applying characterization corrections"
    );

    for name in cells {
        let Some(unit) = unit_mut(manager, name) else {
            continue;
        };
        if is_trivial(unit) && set_baseline(unit, baseline, stamp, settings.kind) {
            report.trivial.push(name.clone());
        }
    }

    for name in cells {
        let Some(twin) = manager.find(name).and_then(|n| twin_name(n.unit())) else {
            continue;
        };
        let Some(source) = manager.find(&twin).map(|n| n.unit().clone()) else {
            warn!(cell = %name, twin = %twin, "unpinned twin not characterized, keeping measured timing");
            continue;
        };
        if let Some(unit) = unit_mut(manager, name) {
            copy_twin(unit, &source);
            report.twins.push(name.clone());
        }
    }

    report.proxies = fix_proxies(manager, cells);
    debug!(
        trivial = report.trivial.len(),
        twins = report.twins.len(),
        proxies = report.proxies.len(),
        "corrections applied"
    );
    Ok(report)
}

/// Sets a trivial cell to unit area and baseline delay. Returns `true` if
/// anything changed.
fn set_baseline(unit: &mut FunctionalUnit, baseline: f64, stamp: Timestamp, kind: DeviceKind) -> bool {
    let area = unit.area.get_or_insert_with(|| AreaModel::for_device(kind));
    let mut changed = area.area() != 1.0;
    area.set_area(1.0);
    for op in &mut unit.operations {
        let time = op.time.get_or_insert_with(|| TimeModel::for_device(kind));
        if time.execution_time() != baseline || time.cycles() != 0 {
            time.set_execution_time(baseline, 0);
            unit.characterization_timestamp = unit.characterization_timestamp.max(stamp);
            changed = true;
        }
    }
    changed
}

fn copy_twin(unit: &mut FunctionalUnit, twin: &FunctionalUnit) {
    for op in &mut unit.operations {
        let Some(source) = twin.operation(&op.name).and_then(|o| o.time.as_ref()) else {
            continue;
        };
        if let Some(time) = op.time.as_mut() {
            time.set_execution_time(source.execution_time(), 0);
        }
    }
}

/// Which BRAM a proxy fronts, if `unit` is a proxy.
fn proxy_bram(unit: &FunctionalUnit) -> Option<String> {
    let latency = unit
        .bram_load_latency
        .as_deref()
        .unwrap_or(DEFAULT_BRAM_LATENCY);
    let suffix = if latency == DEFAULT_BRAM_LATENCY {
        String::new()
    } else {
        format!("_{latency}")
    };
    let ctrl = unit.memory_ctrl_type.as_deref();
    let name = unit.base_name();
    let multi_port = matches!(ctrl, Some("PROXYN" | "DPROXYN"))
        || name == PROXY_CTRL_NN
        || name == format!("{PROXY_CTRL_NN}{suffix}");
    let single_port = matches!(ctrl, Some("PROXY" | "DPROXY"))
        || name == PROXY_CTRL_STD
        || name == format!("{PROXY_CTRL_STD}{suffix}");
    if multi_port {
        Some(format!("{BRAM_NN}{suffix}"))
    } else if single_port {
        Some(format!("{BRAM_STD}{suffix}"))
    } else {
        None
    }
}

/// Gives every proxy among `cells` the store delay of the BRAM it fronts.
/// Returns the proxies changed.
pub fn fix_proxies(manager: &mut TechnologyManager, cells: &[String]) -> Vec<String> {
    let mut fixed = Vec::new();
    for name in cells {
        let Some(bram) = manager
            .find(name)
            .filter(|n| !n.is_template())
            .and_then(|n| proxy_bram(n.unit()))
        else {
            continue;
        };
        let store_time = manager
            .find(&bram)
            .and_then(|n| n.unit().operation(BRAM_OPERATION))
            .and_then(|op| op.time.as_ref())
            .map(TimeModel::execution_time);
        let Some(store_time) = store_time else {
            warn!(proxy = %name, bram = %bram, "no store timing for proxied BRAM");
            continue;
        };
        let Some(unit) = unit_mut(manager, name) else {
            continue;
        };
        for time in unit.operations.iter_mut().filter_map(|op| op.time.as_mut()) {
            let cycles = time.cycles();
            if cycles > 0 {
                time.set_stage_period(store_time);
            } else {
                time.set_execution_time(store_time, cycles);
            }
        }
        debug!(proxy = %name, bram = %bram, store_time, "proxy timing fixed");
        fixed.push(name.clone());
    }
    fixed
}
