//! Interface ports of a functional unit.

use serde::{Deserialize, Serialize};

/// Name of the clock input.
pub const CLOCK_PORT: &str = "clock";
/// Name of the reset input.
pub const RESET_PORT: &str = "reset";
/// Name of the start handshake input.
pub const START_PORT: &str = "start_port";
/// Name of the done handshake output.
pub const DONE_PORT: &str = "done_port";

/// Port direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    /// Input port.
    In,
    /// Output port.
    Out,
}

/// Data type carried by a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// A single bit.
    Bool,
    /// Signed integer.
    Int,
    /// Unsigned integer.
    Uint,
    /// Floating point.
    Real,
    /// Plain bit vector.
    VectorBool,
    /// Packed vector of signed integers.
    VectorInt,
    /// Packed vector of unsigned integers.
    VectorUint,
    /// Packed vector of floating-point values.
    VectorReal,
}

impl DataType {
    /// Returns `true` for packed SIMD vector types, whose element count
    /// follows `128 / width`.
    pub fn is_packed_vector(self) -> bool {
        matches!(
            self,
            DataType::VectorInt | DataType::VectorUint | DataType::VectorReal
        )
    }
}

/// Role of a port belonging to a memory bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusRole {
    /// Data lines.
    Data,
    /// Address lines.
    Addr,
    /// Access-size lines.
    Size,
    /// Transaction tag lines.
    Tag,
}

/// Width transform applied when a port is resized to a precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortTransform {
    /// The port takes the precision.
    #[default]
    Same,
    /// The port takes twice the precision (e.g. widening multiply output).
    Doubled,
    /// The port takes half the precision.
    Halved,
}

/// One interface port of a functional unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Port name.
    pub name: String,
    /// Port direction.
    pub direction: PortDirection,
    /// Carried data type.
    pub data_type: DataType,
    /// Element width in bits.
    #[serde(default)]
    pub width: u32,
    /// Number of packed elements for packed vector types, 0 otherwise.
    #[serde(default)]
    pub elements: u32,
    /// Width transform relative to the specialization precision.
    #[serde(default)]
    pub transform: PortTransform,
    /// Whether the port connects to the memory subsystem.
    #[serde(default)]
    pub is_memory: bool,
    /// Bus role, for memory bus ports.
    #[serde(default)]
    pub bus: Option<BusRole>,
    /// For port vectors, the number of replicated ports (0 = set by specialization).
    #[serde(default)]
    pub replicas: Option<u32>,
}

impl Port {
    /// Creates a plain port of the given type and width.
    pub fn new(
        name: impl Into<String>,
        direction: PortDirection,
        data_type: DataType,
        width: u32,
    ) -> Self {
        Self {
            name: name.into(),
            direction,
            data_type,
            width,
            elements: 0,
            transform: PortTransform::Same,
            is_memory: false,
            bus: None,
            replicas: None,
        }
    }

    /// Returns `true` for clock, reset and start ports.
    pub fn is_control(&self) -> bool {
        self.name == CLOCK_PORT || self.name == RESET_PORT || self.name == START_PORT
    }

    /// Returns `true` if the port takes part in width specialization and
    /// constant pinning: not a control port, not a memory port and not a
    /// `sel_*` selector.
    pub fn is_specializable(&self) -> bool {
        !self.is_control() && !self.is_memory && !self.name.starts_with("sel_")
    }

    /// The width this port takes for `precision`, honouring its transform.
    /// Boolean ports keep their width.
    pub fn width_for(&self, precision: u32) -> u32 {
        if self.data_type == DataType::Bool {
            return self.width.max(1);
        }
        match self.transform {
            PortTransform::Same => precision,
            PortTransform::Doubled => 2 * precision,
            PortTransform::Halved => precision / 2,
        }
    }

    /// Resizes the port for `precision`; packed vectors get `128 / width` elements.
    pub fn resize(&mut self, precision: u32) {
        if self.data_type == DataType::Bool {
            return;
        }
        let width = self.width_for(precision);
        self.width = width;
        self.elements = if self.data_type.is_packed_vector() && width > 0 {
            128 / width
        } else {
            0
        };
    }

    /// Resizes a memory bus port to the bus width matching its role.
    pub fn resize_bus(&mut self, data: u32, addr: u32, size: u32, tag: u32) {
        if let Some(role) = self.bus {
            self.width = match role {
                BusRole::Data => data,
                BusRole::Addr => addr,
                BusRole::Size => size,
                BusRole::Tag => tag,
            };
        }
    }

    /// Total bit count of the port (elements × width for packed vectors).
    pub fn total_bits(&self) -> u32 {
        if self.elements > 0 {
            self.elements * self.width
        } else {
            self.width
        }
    }
}
