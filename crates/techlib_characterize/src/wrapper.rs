//! Measurement wrappers.
//!
//! A wrapper instantiates one specialization and isolates it between
//! asynchronously-reset registers, so synthesis sees a register-to-register
//! path through the unit and cannot constant-propagate it away. A pinned
//! input is driven straight from the characterizing constant instead.

use rand::Rng;
use techlib_backend::AuxiliaryFile;
use techlib_common::ConfigurationError;
use techlib_model::{
    DataType, FunctionalUnit, Port, PortDirection, WrapperCircuit, CLOCK_PORT, RESET_PORT,
};

use crate::memory::{memory_setup, DeviceConstants};

/// Module parameter carrying the selected pipe value.
pub const PIPE_PARAMETER: &str = "PIPE_PARAMETER";
/// Memory-controller unit with fixed timing parameters.
pub const MC_UNIT: &str = "MC_FU";
/// Load unit with a fixed base address.
pub const MEMLOAD_UNIT: &str = "__builtin_memload";
/// Store unit with a fixed base address.
pub const MEMSTORE_UNIT: &str = "__builtin_memstore";
/// LUT unit whose mask input is driven by a fixed pattern.
pub const LUT_EXPR_UNIT: &str = "lut_expr_FU";

/// Mask driven on input 0 of `lut_expr_FU`.
const LUT_MASK: u64 = 0xFF7F_3F1F_0F07_0301;

const REGISTER: &str = "register_AR_NORETIME";
const REGISTER_INT: &str = "register_AR_NORETIME_INT";
const REGISTER_UINT: &str = "register_AR_NORETIME_UINT";
const REGISTER_REAL: &str = "register_AR_NORETIME_REAL";

/// The choices one wrapper is built for.
#[derive(Debug, Clone, Copy)]
pub struct WrapperRequest<'a> {
    /// The specialization, ports already resized.
    pub unit: &'a FunctionalUnit,
    /// Operand precision.
    pub precision: u32,
    /// Selected pipe value.
    pub pipe: Option<&'a str>,
    /// Selected port-vector size.
    pub portsize: Option<&'a str>,
    /// Index among the unit's inputs of the constant-pinned port.
    pub pinned: Option<usize>,
    /// Largest BRAM port width of the device.
    pub bram_bitsize_max: u32,
    /// Port-vector replicas when `portsize` is unset.
    pub port_vector_size: u32,
    /// `lut_expr_FU` inputs above this index are tied low.
    pub max_lut_size: Option<usize>,
}

/// A wrapper netlist and the files it needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Wrapper {
    /// The top-level netlist.
    pub circuit: WrapperCircuit,
    /// Memory init files.
    pub auxiliary_files: Vec<AuxiliaryFile>,
}

/// The wrapper module name of a unit.
pub fn wrapper_name(unit: &str) -> String {
    format!("top{unit}_wrapper").replace("__", "")
}

/// Builds the measurement wrapper of `request.unit`.
pub fn build_wrapper<R: Rng>(
    request: &WrapperRequest<'_>,
    rng: &mut R,
) -> Result<Wrapper, ConfigurationError> {
    let unit = request.unit;
    let base = unit.base_name();
    let port_vector_ports = match request.portsize {
        Some(text) => text.trim().parse::<u32>().map_err(|_| {
            ConfigurationError::MalformedTemplateParameter {
                unit: base.to_string(),
                field: "portsize_parameters",
                value: text.to_string(),
                reason: "portsize is not a number".to_string(),
            }
        })?,
        None => request.port_vector_size,
    };
    let constants = DeviceConstants::for_unit(unit, request.bram_bitsize_max, port_vector_ports);

    let mut circuit = WrapperCircuit::new(wrapper_name(&unit.name));
    let inst = circuit.add_instance(format!("{base}_inst0"), base);
    let mut auxiliary_files = Vec::new();

    if base == MC_UNIT {
        circuit.set_parameter(inst, "EXECUTION_TIME", "2");
        circuit.set_parameter(inst, "BITSIZE", "8");
        circuit.set_parameter(inst, "INITIATION_TIME", "1");
    } else if let Some(memory_type) = unit.memory_type.as_deref().filter(|m| !m.is_empty()) {
        let channels = unit.channels_type.as_deref().unwrap_or("");
        let setup = memory_setup(memory_type, channels, &constants, rng);
        for (name, value) in setup.parameters {
            circuit.set_parameter(inst, name, value);
        }
        auxiliary_files = setup.files;
    } else if base == MEMLOAD_UNIT || base == MEMSTORE_UNIT {
        circuit.set_parameter(inst, "base_address", "8");
    }

    if let Some(pipe) = request.pipe {
        circuit.set_parameter(inst, PIPE_PARAMETER, pipe);
    }
    resolve_library_parameters(&mut circuit, inst, request, &constants)?;

    let ports: Vec<Port> = unit
        .ports
        .iter()
        .map(|port| {
            let mut port = port.clone();
            port.resize_bus(
                constants.bus_data,
                constants.bus_addr,
                constants.bus_size,
                constants.bus_tag,
            );
            if port.replicas.is_some() {
                port.replicas = Some(constants.port_vector_ports);
            }
            port
        })
        .collect();

    let mut has_clock = false;
    let mut has_reset = false;
    for port in ports.iter().filter(|p| p.direction == PortDirection::In && p.is_control()) {
        circuit.add_port(&port.name, PortDirection::In, port.data_type, port.total_bits());
        circuit.connect(inst, &port.name, &port.name);
        has_clock |= port.name == CLOCK_PORT;
        has_reset |= port.name == RESET_PORT;
    }
    if !has_clock {
        circuit.add_port(CLOCK_PORT, PortDirection::In, DataType::Bool, 1);
    }
    if !has_reset {
        circuit.add_port(RESET_PORT, PortDirection::In, DataType::Bool, 1);
    }

    let is_template = unit.template.is_some();
    for (index, port) in ports
        .iter()
        .filter(|p| p.direction == PortDirection::In)
        .enumerate()
    {
        if port.is_control() {
            continue;
        }
        if base == LUT_EXPR_UNIT && index == 0 {
            let net = circuit.add_constant("constant_0", 64, LUT_MASK.to_string());
            circuit.connect(inst, &port.name, net);
        } else if base == LUT_EXPR_UNIT && request.max_lut_size.is_some_and(|max| index > max) {
            let net = circuit.add_constant(format!("constant_{index}"), port.total_bits(), "0");
            circuit.connect(inst, &port.name, net);
        } else if is_template && request.pinned == Some(index) {
            let value = unit.characterizing_constant_value.clone().ok_or_else(|| {
                ConfigurationError::UnresolvedParameter {
                    unit: unit.name.clone(),
                    parameter: "characterizing_constant_value".to_string(),
                }
            })?;
            let net = circuit.add_constant(format!("constant_{index}"), port.total_bits(), value);
            circuit.connect(inst, &port.name, net);
        } else {
            add_primary(&mut circuit, port);
            for (prefix, net) in elements(port) {
                add_register(&mut circuit, inst, port, &prefix, &net, Side::Input);
            }
        }
    }

    for port in ports.iter().filter(|p| p.direction == PortDirection::Out) {
        add_primary(&mut circuit, port);
        for (prefix, net) in elements(port) {
            add_register(&mut circuit, inst, port, &prefix, &net, Side::Output);
        }
    }

    Ok(Wrapper {
        circuit,
        auxiliary_files,
    })
}

/// Sets the library parameters the driver knows how to derive and checks
/// that every other declared parameter is a port or already set.
fn resolve_library_parameters(
    circuit: &mut WrapperCircuit,
    inst: usize,
    request: &WrapperRequest<'_>,
    constants: &DeviceConstants,
) -> Result<(), ConfigurationError> {
    let unit = request.unit;
    for parameter in &unit.library_parameters {
        match parameter.as_str() {
            "PRECISION" => {
                circuit.set_parameter(inst, "PRECISION", request.precision.max(8).to_string())
            }
            "ALIGNED_BITSIZE" => circuit.set_parameter(
                inst,
                "ALIGNED_BITSIZE",
                constants.aligned_bitsize.to_string(),
            ),
            "LSB_PARAMETER" => circuit.set_parameter(inst, "LSB_PARAMETER", "0"),
            _ => {}
        }
        let is_port = unit.ports.iter().any(|p| &p.name == parameter);
        let is_set = circuit.instances[inst].parameters.contains_key(parameter);
        if !is_port && !is_set {
            return Err(ConfigurationError::UnresolvedParameter {
                unit: unit.name.clone(),
                parameter: parameter.clone(),
            });
        }
    }
    Ok(())
}

/// Adds the primary port mirroring `port`.
fn add_primary(circuit: &mut WrapperCircuit, port: &Port) {
    match port.replicas {
        Some(replicas) => circuit.add_port_vector(
            &port.name,
            port.direction,
            port.data_type,
            port.total_bits(),
            replicas,
        ),
        None => circuit.add_port(&port.name, port.direction, port.data_type, port.total_bits()),
    }
}

/// `(register prefix, net)` for every element of a port; one entry for plain ports.
fn elements(port: &Port) -> Vec<(String, String)> {
    match port.replicas {
        Some(replicas) => (0..replicas)
            .map(|p| (format!("{}{p}", port.name), format!("{}[{p}]", port.name)))
            .collect(),
        None => vec![(port.name.clone(), port.name.clone())],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Input,
    Output,
}

fn register_for(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Int => REGISTER_INT,
        DataType::Uint => REGISTER_UINT,
        DataType::Real => REGISTER_REAL,
        _ => REGISTER,
    }
}

/// Places a register between the primary net `net` and the unit pin of
/// the same name.
fn add_register(
    circuit: &mut WrapperCircuit,
    inst: usize,
    port: &Port,
    prefix: &str,
    net: &str,
    side: Side,
) {
    let width = port.total_bits();
    let reg = circuit.add_instance(format!("{prefix}_REG"), register_for(port.data_type));
    circuit.set_parameter(reg, "BITSIZE_in1", width.to_string());
    circuit.set_parameter(reg, "BITSIZE_out1", width.to_string());
    circuit.connect(reg, CLOCK_PORT, CLOCK_PORT);
    circuit.connect(reg, RESET_PORT, RESET_PORT);
    match side {
        Side::Input => {
            let signal = circuit.add_signal(format!("{prefix}_SIGI"), port.data_type, width);
            circuit.connect(reg, "in1", net);
            circuit.connect(reg, "out1", &signal);
            circuit.connect(inst, net, signal);
        }
        Side::Output => {
            let signal = circuit.add_signal(format!("{prefix}_SIGO"), port.data_type, width);
            circuit.connect(inst, net, &signal);
            circuit.connect(reg, "in1", signal);
            circuit.connect(reg, "out1", net);
        }
    }
}
