//! Specialization names and positional template parameters.
//!
//! A name is `<base>_<input fields>_<output fields>[_<pipe>][_<portsize>]`
//! and the template parameters are the same fields joined by spaces.

use techlib_model::{DataType, FunctionalUnit, Port, PortDirection, PortTransform, DONE_PORT};

use crate::precision::resize_to_standard;

const MULT_UNITS: [&str; 2] = ["mult_expr_FU", "ui_mult_expr_FU"];
const WIDEN_MULT_UNITS: [&str; 2] = ["widen_mult_expr_FU", "ui_widen_mult_expr_FU"];

/// The choices identifying one specialization of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant<'a> {
    /// Operand precision.
    pub precision: u32,
    /// DSP x-width paired with the precision, if the device has one.
    pub dsp_x: Option<u32>,
    /// Index among the unit's inputs of the constant-pinned port.
    pub pinned: Option<usize>,
    /// Selected pipe value.
    pub pipe: Option<&'a str>,
    /// Selected port-vector size.
    pub portsize: Option<&'a str>,
}

/// Name and template parameters of a specialization.
///
/// Width fields are only emitted for templates; a concrete unit keeps its
/// own name, extended by the pipe and portsize values.
pub fn specialization_name(unit: &FunctionalUnit, is_template: bool, variant: &Variant<'_>) -> (String, String) {
    let mut fields: Vec<String> = Vec::new();
    if is_template {
        fields.extend(input_fields(unit, variant));
        fields.extend(output_fields(unit, variant));
    }
    fields.extend(variant.pipe.map(str::to_string));
    fields.extend(variant.portsize.map(str::to_string));

    let mut name = unit.name.clone();
    for field in &fields {
        for part in field.split(' ') {
            name.push('_');
            name.push_str(part);
        }
    }
    (name, fields.join(" "))
}

fn input_fields(unit: &FunctionalUnit, variant: &Variant<'_>) -> Vec<String> {
    let prec = variant.precision;
    unit.inputs()
        .enumerate()
        .filter(|(_, port)| port.is_specializable())
        .map(|(index, port)| {
            if port.data_type == DataType::Bool {
                "1".to_string()
            } else if let (1, Some(x), true) = (index, variant.dsp_x, is_dsp_mult(&unit.name)) {
                x.to_string()
            } else if variant.pinned != Some(index) {
                if port.data_type.is_packed_vector() {
                    format!("{prec} {}", 128 / prec.max(1))
                } else {
                    prec.to_string()
                }
            } else {
                "0".to_string()
            }
        })
        .collect()
}

fn output_fields(unit: &FunctionalUnit, variant: &Variant<'_>) -> Vec<String> {
    let prec = variant.precision;
    unit.outputs()
        .filter(|port| port.name != DONE_PORT && !port.is_memory)
        .map(|port| {
            let width = match variant.dsp_x {
                Some(x) if WIDEN_MULT_UNITS.contains(&unit.name.as_str()) => prec + x,
                Some(_) if MULT_UNITS.contains(&unit.name.as_str()) => resize_to_standard(prec),
                _ => transformed(port.transform, prec),
            };
            if port.data_type.is_packed_vector() {
                let element = transformed(port.transform, prec).max(1);
                format!("{width} {}", 128 / element)
            } else {
                width.to_string()
            }
        })
        .collect()
}

fn transformed(transform: PortTransform, prec: u32) -> u32 {
    match transform {
        PortTransform::Same => prec,
        PortTransform::Doubled => 2 * prec,
        PortTransform::Halved => prec / 2,
    }
}

fn is_dsp_mult(name: &str) -> bool {
    MULT_UNITS.contains(&name) || WIDEN_MULT_UNITS.contains(&name)
}

/// The ports of a specialization: inputs and outputs resized the same way
/// their name fields were computed. Control, memory and selector ports keep
/// their declared shape.
pub fn resized_ports(unit: &FunctionalUnit, variant: &Variant<'_>) -> Vec<Port> {
    let mut input_index = 0;
    unit.ports
        .iter()
        .map(|port| {
            let mut port = port.clone();
            let index = match port.direction {
                PortDirection::In => {
                    input_index += 1;
                    Some(input_index - 1)
                }
                PortDirection::Out => None,
            };
            if !port.is_specializable() || port.name == DONE_PORT {
                return port;
            }
            port.resize(variant.precision);
            if let (Some(1), Some(x), true) = (index, variant.dsp_x, is_dsp_mult(&unit.name)) {
                port.width = x;
            }
            if port.direction == PortDirection::Out {
                match variant.dsp_x {
                    Some(x) if WIDEN_MULT_UNITS.contains(&unit.name.as_str()) => {
                        port.width = variant.precision + x
                    }
                    Some(_) if MULT_UNITS.contains(&unit.name.as_str()) => {
                        port.width = resize_to_standard(variant.precision)
                    }
                    _ => {}
                }
            }
            port
        })
        .collect()
}
