//! Technology library data model.
//!
//! A technology library maps names to [`TechnologyNode`]s: either concrete
//! [`FunctionalUnit`]s or [`FunctionalUnitTemplate`]s wrapping a prototype unit.
//! Units carry their [`Operation`]s, an [`AreaModel`] and per-operation
//! [`TimeModel`]s, each a tagged sum over the FPGA and ASIC flavours.
//! [`WrapperCircuit`] describes the measurable top-level netlist built around
//! one unit for characterization.

#![warn(missing_docs)]

pub mod area;
pub mod attribute;
pub mod circuit;
pub mod kind;
pub mod operation;
pub mod port;
pub mod time;
pub mod unit;

pub use area::{AreaModel, CellModel, ClbModel, ClbResource};
pub use attribute::{Attribute, AttributeValue};
pub use circuit::{CircuitPort, Constant, Instance, PinBinding, Signal, WrapperCircuit};
pub use kind::DeviceKind;
pub use operation::{format_supported_types, parse_supported_types, Operation, SupportedTypes};
pub use port::{
    BusRole, DataType, Port, PortDirection, PortTransform, CLOCK_PORT, DONE_PORT, RESET_PORT,
    START_PORT,
};
pub use time::{LibertyModel, LutModel, LutTiming, TimeModel, TimingCommon, TimingGroup};
pub use unit::{FunctionalUnit, FunctionalUnitTemplate, HdlDescription, TechnologyNode, TemplateLink};
