//! Functional units, templates and the technology node sum type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use techlib_common::Timestamp;

use crate::area::AreaModel;
use crate::attribute::Attribute;
use crate::operation::Operation;
use crate::port::{Port, PortDirection};

/// How the hardware description of a unit is provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HdlDescription {
    /// Hand-written Verilog.
    Verilog,
    /// Hand-written VHDL.
    Vhdl,
    /// Hand-written SystemVerilog.
    SystemVerilog,
    /// Produced on demand by the arithmetic operator generator.
    Generated,
}

/// Back-reference from a specialization to the template it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateLink {
    /// Name of the originating template.
    pub name: String,
    /// Space-separated positional parameters (widths, pipe and portsize values).
    pub parameters: String,
}

impl TemplateLink {
    /// The positional parameters as a list.
    pub fn parameter_list(&self) -> Vec<&str> {
        self.parameters.split_whitespace().collect()
    }
}

/// One named hardware cell of the technology library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionalUnit {
    /// Unique name within the library.
    pub name: String,
    /// Present iff this unit was produced by specialization.
    #[serde(default)]
    pub template: Option<TemplateLink>,
    /// Bit pattern driven on the pinned port during characterization.
    #[serde(default)]
    pub characterizing_constant_value: Option<String>,
    /// Implemented operations, never empty after [`FunctionalUnit::normalize`].
    #[serde(default)]
    pub operations: Vec<Operation>,
    /// Measured area, absent until characterized.
    #[serde(default)]
    pub area: Option<AreaModel>,
    /// When the current figures were recorded.
    #[serde(default)]
    pub characterization_timestamp: Timestamp,
    /// Additional typed attributes (clock period, drive strength, ...).
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
    /// Interface ports, inputs first in declaration order.
    #[serde(default)]
    pub ports: Vec<Port>,
    /// Module parameters the hardware description expects to be set.
    #[serde(default)]
    pub library_parameters: Vec<String>,
    /// How the hardware description is provided, if at all.
    #[serde(default)]
    pub description: Option<HdlDescription>,
    /// Memory organisation served by a memory unit.
    #[serde(default)]
    pub memory_type: Option<String>,
    /// Channel organisation of a memory unit.
    #[serde(default)]
    pub channels_type: Option<String>,
    /// Memory controller flavour (proxy, direct, ...).
    #[serde(default)]
    pub memory_ctrl_type: Option<String>,
    /// BRAM load latency in cycles, as declared.
    #[serde(default)]
    pub bram_load_latency: Option<String>,
    /// Another unit whose timing this one reuses.
    #[serde(default)]
    pub component_timing_alias: Option<String>,
}

impl FunctionalUnit {
    /// Creates an empty unit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: None,
            characterizing_constant_value: None,
            operations: Vec::new(),
            area: None,
            characterization_timestamp: Timestamp::default(),
            attributes: BTreeMap::new(),
            ports: Vec::new(),
            library_parameters: Vec::new(),
            description: None,
            memory_type: None,
            channels_type: None,
            memory_ctrl_type: None,
            bram_load_latency: None,
            component_timing_alias: None,
        }
    }

    /// Gives a unit without operations a single operation named after itself.
    pub fn normalize(&mut self) {
        if self.operations.is_empty() {
            self.operations.push(Operation::new(self.name.clone()));
        }
    }

    /// Looks up an operation by name.
    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == name)
    }

    /// Looks up an operation by name for mutation.
    pub fn operation_mut(&mut self, name: &str) -> Option<&mut Operation> {
        self.operations.iter_mut().find(|op| op.name == name)
    }

    /// The template name if specialized, else the unit's own name.
    pub fn base_name(&self) -> &str {
        self.template.as_ref().map_or(&self.name, |t| &t.name)
    }

    /// The originating template name, if specialized.
    pub fn template_name(&self) -> Option<&str> {
        self.template.as_ref().map(|t| t.name.as_str())
    }

    /// The positional template parameters, if specialized.
    pub fn template_parameters(&self) -> Option<&str> {
        self.template.as_ref().map(|t| t.parameters.as_str())
    }

    /// Input ports in declaration order.
    pub fn inputs(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(|p| p.direction == PortDirection::In)
    }

    /// Output ports in declaration order.
    pub fn outputs(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(|p| p.direction == PortDirection::Out)
    }

    /// Number of inputs that take part in width specialization.
    pub fn specializable_arity(&self) -> usize {
        self.inputs().filter(|p| p.is_specializable()).count()
    }

    /// Returns `true` if every operation carries a timing model.
    pub fn is_fully_timed(&self) -> bool {
        self.operations.iter().all(|op| op.time.is_some())
    }

    /// A numeric attribute, if present and scalar.
    pub fn numeric_attribute(&self, name: &str) -> Option<f64> {
        self.attributes
            .get(name)
            .and_then(Attribute::value)
            .and_then(|v| v.as_f64())
    }
}

/// A parametric family of functional units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionalUnitTemplate {
    /// The prototype every specialization is copied from. Its name is the template name.
    pub prototype: FunctionalUnit,
    /// Disables constant-pinned variants during enumeration.
    #[serde(default)]
    pub no_constant_characterization: bool,
    /// Optional marker naming what the template was specialized for.
    #[serde(default)]
    pub specialized: Option<String>,
}

impl FunctionalUnitTemplate {
    /// Wraps a prototype unit.
    pub fn new(prototype: FunctionalUnit) -> Self {
        Self {
            prototype,
            no_constant_characterization: false,
            specialized: None,
        }
    }

    /// The template name.
    pub fn name(&self) -> &str {
        &self.prototype.name
    }
}

/// A library entry: a concrete unit or a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum TechnologyNode {
    /// A concrete functional unit.
    Unit(FunctionalUnit),
    /// A functional unit template.
    Template(FunctionalUnitTemplate),
}

impl TechnologyNode {
    /// The node name.
    pub fn name(&self) -> &str {
        match self {
            TechnologyNode::Unit(u) => &u.name,
            TechnologyNode::Template(t) => t.name(),
        }
    }

    /// The concrete unit, or the template's prototype.
    pub fn unit(&self) -> &FunctionalUnit {
        match self {
            TechnologyNode::Unit(u) => u,
            TechnologyNode::Template(t) => &t.prototype,
        }
    }

    /// Mutable access to the concrete unit or the template's prototype.
    pub fn unit_mut(&mut self) -> &mut FunctionalUnit {
        match self {
            TechnologyNode::Unit(u) => u,
            TechnologyNode::Template(t) => &mut t.prototype,
        }
    }

    /// The template, if this node is one.
    pub fn as_template(&self) -> Option<&FunctionalUnitTemplate> {
        match self {
            TechnologyNode::Template(t) => Some(t),
            TechnologyNode::Unit(_) => None,
        }
    }

    /// Returns `true` for templates.
    pub fn is_template(&self) -> bool {
        matches!(self, TechnologyNode::Template(_))
    }
}

impl From<FunctionalUnit> for TechnologyNode {
    fn from(unit: FunctionalUnit) -> Self {
        TechnologyNode::Unit(unit)
    }
}

impl From<FunctionalUnitTemplate> for TechnologyNode {
    fn from(template: FunctionalUnitTemplate) -> Self {
        TechnologyNode::Template(template)
    }
}
