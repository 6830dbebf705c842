//! Structural netlist of a characterization wrapper.
//!
//! A [`WrapperCircuit`] is the top-level module handed to a synthesis backend:
//! primary ports, constant drivers, internal signals and instantiated modules
//! whose pins are bound to nets by name. Emitting HDL text from it is the
//! backend's concern.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::port::{DataType, PortDirection};

/// A primary port of the wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitPort {
    /// Port name.
    pub name: String,
    /// Port direction.
    pub direction: PortDirection,
    /// Carried data type.
    pub data_type: DataType,
    /// Width in bits.
    pub width: u32,
    /// Number of replicated ports for port vectors.
    #[serde(default)]
    pub replicas: Option<u32>,
}

/// A constant driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    /// Net name of the constant.
    pub name: String,
    /// Width in bits.
    pub width: u32,
    /// Decimal or hexadecimal literal.
    pub value: String,
}

/// An internal signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Net name of the signal.
    pub name: String,
    /// Carried data type.
    pub data_type: DataType,
    /// Width in bits.
    pub width: u32,
}

/// Binding of an instance pin to a net.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinBinding {
    /// Pin name on the instantiated module (with `[i]` suffix for vector elements).
    pub pin: String,
    /// Net (port, signal or constant) name.
    pub net: String,
}

/// An instantiated module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Instance name.
    pub name: String,
    /// Module (cell) name.
    pub module: String,
    /// Module parameter overrides.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    /// Pin bindings.
    #[serde(default)]
    pub pins: Vec<PinBinding>,
}

impl Instance {
    /// The net bound to `pin`, if any.
    pub fn net_of(&self, pin: &str) -> Option<&str> {
        self.pins
            .iter()
            .find(|b| b.pin == pin)
            .map(|b| b.net.as_str())
    }
}

/// The top-level wrapper netlist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WrapperCircuit {
    /// Top module name.
    pub name: String,
    /// Primary ports.
    pub ports: Vec<CircuitPort>,
    /// Constant drivers.
    pub constants: Vec<Constant>,
    /// Internal signals.
    pub signals: Vec<Signal>,
    /// Module instances.
    pub instances: Vec<Instance>,
}

impl WrapperCircuit {
    /// Creates an empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a primary port.
    pub fn add_port(
        &mut self,
        name: impl Into<String>,
        direction: PortDirection,
        data_type: DataType,
        width: u32,
    ) {
        self.ports.push(CircuitPort {
            name: name.into(),
            direction,
            data_type,
            width,
            replicas: None,
        });
    }

    /// Adds a port vector of `replicas` ports of `width` bits each.
    pub fn add_port_vector(
        &mut self,
        name: impl Into<String>,
        direction: PortDirection,
        data_type: DataType,
        width: u32,
        replicas: u32,
    ) {
        self.ports.push(CircuitPort {
            name: name.into(),
            direction,
            data_type,
            width,
            replicas: Some(replicas),
        });
    }

    /// Adds a constant driver and returns its net name.
    pub fn add_constant(&mut self, name: impl Into<String>, width: u32, value: impl Into<String>) -> String {
        let name = name.into();
        self.constants.push(Constant {
            name: name.clone(),
            width,
            value: value.into(),
        });
        name
    }

    /// Adds an internal signal and returns its net name.
    pub fn add_signal(&mut self, name: impl Into<String>, data_type: DataType, width: u32) -> String {
        let name = name.into();
        self.signals.push(Signal {
            name: name.clone(),
            data_type,
            width,
        });
        name
    }

    /// Adds a module instance and returns its index.
    pub fn add_instance(&mut self, name: impl Into<String>, module: impl Into<String>) -> usize {
        self.instances.push(Instance {
            name: name.into(),
            module: module.into(),
            parameters: BTreeMap::new(),
            pins: Vec::new(),
        });
        self.instances.len() - 1
    }

    /// Binds `pin` of instance `index` to `net`.
    pub fn connect(&mut self, index: usize, pin: impl Into<String>, net: impl Into<String>) {
        if let Some(inst) = self.instances.get_mut(index) {
            inst.pins.push(PinBinding {
                pin: pin.into(),
                net: net.into(),
            });
        }
    }

    /// Sets a parameter on instance `index`.
    pub fn set_parameter(&mut self, index: usize, name: impl Into<String>, value: impl Into<String>) {
        if let Some(inst) = self.instances.get_mut(index) {
            inst.parameters.insert(name.into(), value.into());
        }
    }

    /// Looks up a primary port by name.
    pub fn port(&self, name: &str) -> Option<&CircuitPort> {
        self.ports.iter().find(|p| p.name == name)
    }

    /// Looks up an instance by name.
    pub fn instance(&self, name: &str) -> Option<&Instance> {
        self.instances.iter().find(|i| i.name == name)
    }

    /// Looks up a constant by net name.
    pub fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants.iter().find(|c| c.name == name)
    }
}
