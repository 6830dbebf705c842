//! JSON persistence of technology libraries and characterization results.
//!
//! A technology document holds a list of libraries; each library holds cell
//! and template nodes with their operations. Area figures travel as unit
//! attributes (`area` plus resource or `*_area` figures) and operation
//! timing as flat fields, so the document stays close to what a reader of
//! the library expects to see. Loading applies two derived rules:
//!
//! - a `synthesis_dependent` operation with `cycles` set gets
//!   `execution_time = cycles × clock_period × clock_period_resource_fraction`
//!   from its unit attributes;
//! - `timing_path` entries fill the pin-to-pin table and set the execution
//!   time to their maximum delay with zero cycles.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use techlib_common::{ConfigurationError, TechError, TechResult, Timestamp};
use techlib_model::{
    format_supported_types, parse_supported_types, AreaModel, Attribute, AttributeValue,
    ClbResource, DeviceKind, FunctionalUnit, FunctionalUnitTemplate, HdlDescription, LutTiming,
    Operation, Port, TechnologyNode, TemplateLink, TimeModel, TimingGroup,
};
use tracing::debug;

use crate::store::LibraryStore;

/// Unit attribute holding the scalar area.
pub const AREA_ATTRIBUTE: &str = "area";
/// Unit attribute holding the clock period used by synthesis-dependent timing.
pub const CLOCK_PERIOD_ATTRIBUTE: &str = "clock_period";
/// Unit attribute scaling the clock period for synthesis-dependent timing.
pub const CLOCK_FRACTION_ATTRIBUTE: &str = "clock_period_resource_fraction";

/// A file holding several technology libraries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnologyDocument {
    /// Libraries in document order.
    #[serde(default)]
    pub libraries: Vec<LibraryDocument>,
}

/// The serialized form of one library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryDocument {
    /// Library name.
    pub name: String,
    /// Library-level attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Attribute>,
    /// Nodes excluded from synthesis selection.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dont_use: Vec<String>,
    /// Cells and templates in library order.
    #[serde(default)]
    pub nodes: Vec<NodeElement>,
}

/// A library entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeElement {
    /// A concrete cell.
    Cell(CellElement),
    /// A template with its prototype cell.
    Template(TemplateElement),
}

/// A template entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateElement {
    /// The prototype cell; its name is the template name.
    pub prototype: CellElement,
    /// Disables constant-pinned variants.
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_constant_characterization: bool,
    /// Specialization marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialized: Option<String>,
}

/// A cell entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellElement {
    /// Cell name.
    pub name: String,
    /// Typed attributes, area figures included.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_parameters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characterizing_constant_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_ctrl_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bram_load_latency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_timing_alias: Option<String>,
    /// When the figures were recorded; absent means never.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characterization_timestamp: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<HdlDescription>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub library_parameters: Vec<String>,
    /// Implemented operations.
    #[serde(default)]
    pub operations: Vec<OperationElement>,
}

/// An operation entry with flattened timing fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationElement {
    /// Operation name.
    pub operation_name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub commutative: bool,
    /// Written only when `false`; absent means bounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounded: Option<bool>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary_inputs_registered: bool,
    /// `"T:p,p|T:*"` declaration.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub supported_types: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pipe_parameters: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub portsize_parameters: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycles: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiation_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_period: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub synthesis_dependent: bool,
    /// Pin-to-pin delays.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timing_path: Vec<TimingPathElement>,
    /// Named FPGA timing figures.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub timings: BTreeMap<LutTiming, f64>,
    /// Liberty arcs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timing_groups: Vec<TimingGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_strength: Option<f64>,
}

/// One pin-to-pin delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingPathElement {
    pub source: String,
    pub target: String,
    pub delay: f64,
}

/// Target device section of a characterization document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceElement {
    /// Device name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// FPGA or ASIC.
    #[serde(default)]
    pub kind: DeviceKind,
    /// Free-form device parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

/// The result of a characterization run: the device plus the selected cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterizationDocument {
    /// The device characterized for.
    pub device: DeviceElement,
    /// One library per source library, holding only the selected cells.
    #[serde(default)]
    pub libraries: Vec<LibraryDocument>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl LibraryDocument {
    pub(crate) fn from_store(
        store: &LibraryStore,
        filter: impl Fn(&TechnologyNode) -> bool,
    ) -> Self {
        Self {
            name: store.name().to_string(),
            attributes: store.attributes().clone(),
            dont_use: store.dont_use().map(str::to_string).collect(),
            nodes: store
                .nodes()
                .filter(|node| filter(node))
                .map(NodeElement::from_node)
                .collect(),
        }
    }

    /// Rebuilds a store, creating area and timing models of `kind`.
    pub fn into_store(self, kind: DeviceKind) -> Result<LibraryStore, String> {
        let mut store = LibraryStore::new(self.name);
        for (name, value) in self.attributes {
            store.set_attribute(name, value);
        }
        for element in self.nodes {
            let node = element.into_node(kind)?;
            store.add(node).map_err(|e| e.to_string())?;
        }
        for name in &self.dont_use {
            store.set_dont_use(name);
        }
        Ok(store)
    }
}

impl NodeElement {
    /// The serialized form of `node`.
    pub fn from_node(node: &TechnologyNode) -> Self {
        match node {
            TechnologyNode::Unit(unit) => NodeElement::Cell(CellElement::from_unit(unit)),
            TechnologyNode::Template(template) => NodeElement::Template(TemplateElement {
                prototype: CellElement::from_unit(&template.prototype),
                no_constant_characterization: template.no_constant_characterization,
                specialized: template.specialized.clone(),
            }),
        }
    }

    /// The node name.
    pub fn name(&self) -> &str {
        match self {
            NodeElement::Cell(cell) => &cell.name,
            NodeElement::Template(template) => &template.prototype.name,
        }
    }

    /// Rebuilds the node.
    pub fn into_node(self, kind: DeviceKind) -> Result<TechnologyNode, String> {
        Ok(match self {
            NodeElement::Cell(cell) => TechnologyNode::Unit(cell.into_unit(kind)?),
            NodeElement::Template(element) => {
                let mut template = FunctionalUnitTemplate::new(element.prototype.into_unit(kind)?);
                template.no_constant_characterization = element.no_constant_characterization;
                template.specialized = element.specialized;
                TechnologyNode::Template(template)
            }
        })
    }
}

impl CellElement {
    /// The serialized form of `unit`, area folded into the attributes.
    pub fn from_unit(unit: &FunctionalUnit) -> Self {
        let mut attributes = unit.attributes.clone();
        if let Some(area) = &unit.area {
            let float = |v: f64| Attribute::Value(AttributeValue::Float64(v));
            attributes.insert(AREA_ATTRIBUTE.to_string(), float(area.area()));
            match area {
                AreaModel::Clb(model) => {
                    for (resource, value) in &model.resources {
                        attributes.insert(resource.as_str().to_string(), float(*value));
                    }
                }
                AreaModel::Cell(model) => {
                    for (name, value) in &model.characterizations {
                        attributes.insert(name.clone(), float(*value));
                    }
                }
            }
        }
        let timestamp = unit.characterization_timestamp;
        Self {
            name: unit.name.clone(),
            attributes,
            template_name: unit.template_name().map(str::to_string),
            template_parameters: unit.template_parameters().map(str::to_string),
            characterizing_constant_value: unit.characterizing_constant_value.clone(),
            memory_type: unit.memory_type.clone(),
            channels_type: unit.channels_type.clone(),
            memory_ctrl_type: unit.memory_ctrl_type.clone(),
            bram_load_latency: unit.bram_load_latency.clone(),
            component_timing_alias: unit.component_timing_alias.clone(),
            characterization_timestamp: (!timestamp.is_epoch()).then_some(timestamp),
            description: unit.description,
            ports: unit.ports.clone(),
            library_parameters: unit.library_parameters.clone(),
            operations: unit.operations.iter().map(OperationElement::from_operation).collect(),
        }
    }

    /// Rebuilds the unit, splitting the area figures back out of the attributes.
    pub fn into_unit(self, kind: DeviceKind) -> Result<FunctionalUnit, String> {
        let mut unit = FunctionalUnit::new(self.name);
        let mut attributes = self.attributes;
        if let Some(area) = attributes
            .remove(AREA_ATTRIBUTE)
            .as_ref()
            .and_then(Attribute::value)
            .and_then(AttributeValue::as_f64)
        {
            let mut model = AreaModel::for_device(kind);
            model.set_area(area);
            match &mut model {
                AreaModel::Clb(clb) => {
                    for resource in ClbResource::ALL {
                        if let Some(v) = take_float(&mut attributes, resource.as_str()) {
                            clb.resources.insert(resource, v);
                        }
                    }
                }
                AreaModel::Cell(cell) => {
                    let figures: Vec<String> = attributes
                        .keys()
                        .filter(|name| name.ends_with("_area"))
                        .cloned()
                        .collect();
                    for name in figures {
                        if let Some(v) = take_float(&mut attributes, &name) {
                            cell.characterizations.insert(name, v);
                        }
                    }
                }
            }
            unit.area = Some(model);
        }
        unit.attributes = attributes;
        unit.template = self.template_name.map(|name| TemplateLink {
            name,
            parameters: self.template_parameters.unwrap_or_default(),
        });
        unit.characterizing_constant_value = self.characterizing_constant_value;
        unit.memory_type = self.memory_type;
        unit.channels_type = self.channels_type;
        unit.memory_ctrl_type = self.memory_ctrl_type;
        unit.bram_load_latency = self.bram_load_latency;
        unit.component_timing_alias = self.component_timing_alias;
        unit.characterization_timestamp = self.characterization_timestamp.unwrap_or_default();
        unit.description = self.description;
        unit.ports = self.ports;
        unit.library_parameters = self.library_parameters;

        let clock = unit.numeric_attribute(CLOCK_PERIOD_ATTRIBUTE);
        let fraction = unit.numeric_attribute(CLOCK_FRACTION_ATTRIBUTE).unwrap_or(1.0);
        for element in self.operations {
            let op = element
                .into_operation(kind, clock.map(|c| c * fraction))
                .map_err(|reason| format!("cell '{}': {reason}", unit.name))?;
            unit.operations.push(op);
        }
        Ok(unit)
    }
}

fn take_float(attributes: &mut BTreeMap<String, Attribute>, name: &str) -> Option<f64> {
    let value = attributes.get(name)?.value()?.as_f64()?;
    attributes.remove(name);
    Some(value)
}

impl OperationElement {
    /// The serialized form of `op`: cycles win over execution time, and
    /// default-valued fields are left out.
    pub fn from_operation(op: &Operation) -> Self {
        let mut element = Self {
            operation_name: op.name.clone(),
            commutative: op.commutative,
            bounded: (!op.bounded).then_some(false),
            primary_inputs_registered: op.primary_inputs_registered,
            supported_types: format_supported_types(&op.supported_types),
            pipe_parameters: op.pipe_parameters.clone(),
            portsize_parameters: op.portsize_parameters.clone(),
            ..Self::default()
        };
        let Some(time) = &op.time else {
            return element;
        };
        if time.cycles() > 0 {
            element.cycles = Some(time.cycles());
        } else if time.execution_time() != 0.0 {
            element.execution_time = Some(time.execution_time());
        }
        element.initiation_time = (time.initiation_time() != 0).then_some(time.initiation_time());
        element.stage_period = (time.stage_period() != 0.0).then_some(time.stage_period());
        element.synthesis_dependent = time.synthesis_dependent();
        element.timing_path = time
            .common()
            .pin_to_pin
            .iter()
            .flat_map(|(source, targets)| {
                targets.iter().map(move |(target, delay)| TimingPathElement {
                    source: source.clone(),
                    target: target.clone(),
                    delay: *delay,
                })
            })
            .collect();
        match time {
            TimeModel::Lut(model) => element.timings = model.timings.clone(),
            TimeModel::Liberty(model) => {
                element.timing_groups = model.timing_groups.clone();
                element.drive_strength = (model.drive_strength != 0.0).then_some(model.drive_strength);
            }
        }
        element
    }

    /// Rebuilds the operation. `scaled_clock` is the unit's clock period
    /// times its resource fraction, when declared.
    pub fn into_operation(
        self,
        kind: DeviceKind,
        scaled_clock: Option<f64>,
    ) -> Result<Operation, String> {
        let mut op = Operation::new(self.operation_name);
        op.commutative = self.commutative;
        op.bounded = self.bounded.unwrap_or(true);
        op.primary_inputs_registered = self.primary_inputs_registered;
        op.supported_types = parse_supported_types(&self.supported_types)
            .map_err(|reason| format!("operation '{}': {reason}", op.name))?;
        op.pipe_parameters = self.pipe_parameters;
        op.portsize_parameters = self.portsize_parameters;

        let mut time = TimeModel::for_device(kind);
        let cycles = self.cycles.unwrap_or(0);
        time.set_execution_time(self.execution_time.unwrap_or(0.0), cycles);
        time.set_initiation_time(self.initiation_time.unwrap_or(0));
        time.set_stage_period(self.stage_period.unwrap_or(0.0));
        time.set_synthesis_dependent(self.synthesis_dependent);
        if self.synthesis_dependent && cycles > 0 {
            let clock = scaled_clock.ok_or_else(|| {
                format!(
                    "operation '{}' is synthesis dependent but the cell has no {CLOCK_PERIOD_ATTRIBUTE}",
                    op.name
                )
            })?;
            time.set_execution_time(f64::from(cycles) * clock, cycles);
        }
        if !self.timing_path.is_empty() {
            for path in &self.timing_path {
                time.add_pin_delay(&path.source, &path.target, path.delay);
            }
            let max = time.max_pin_delay();
            time.set_execution_time(max, 0);
        }
        match &mut time {
            TimeModel::Lut(model) => model.timings = self.timings,
            TimeModel::Liberty(model) => {
                model.timing_groups = self.timing_groups;
                model.drive_strength = self.drive_strength.unwrap_or(0.0);
            }
        }
        op.time = Some(time);
        Ok(op)
    }
}

fn malformed(path: &Path, reason: impl Into<String>) -> TechError {
    ConfigurationError::MalformedDocument {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
    .into()
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> TechResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| TechError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| TechError::io(path, std::io::Error::other(e)))?;
    std::fs::write(path, json).map_err(|e| TechError::io(path, e))
}

/// Parses a technology document held in memory. `origin` names it in errors.
pub fn parse_technology(text: &str, origin: &Path, kind: DeviceKind) -> TechResult<Vec<LibraryStore>> {
    let document: TechnologyDocument =
        serde_json::from_str(text).map_err(|e| malformed(origin, e.to_string()))?;
    document
        .libraries
        .into_iter()
        .map(|lib| lib.into_store(kind).map_err(|reason| malformed(origin, reason)))
        .collect()
}

/// Loads every library of a technology document.
pub fn read_technology(path: &Path, kind: DeviceKind) -> TechResult<Vec<LibraryStore>> {
    let text = std::fs::read_to_string(path).map_err(|e| TechError::io(path, e))?;
    let libraries = parse_technology(&text, path, kind)?;
    debug!(path = %path.display(), libraries = libraries.len(), "loaded technology document");
    Ok(libraries)
}

/// Writes the given libraries as one technology document.
pub fn write_technology<'a>(
    path: &Path,
    libraries: impl IntoIterator<Item = &'a LibraryStore>,
) -> TechResult<()> {
    let document = TechnologyDocument {
        libraries: libraries.into_iter().map(LibraryStore::export).collect(),
    };
    write_json(path, &document)
}

/// Writes a characterization result document.
pub fn write_characterization(path: &Path, document: &CharacterizationDocument) -> TechResult<()> {
    write_json(path, document)?;
    debug!(path = %path.display(), "wrote characterization document");
    Ok(())
}

/// Loads a characterization result document, rebuilding its libraries with
/// the models of the recorded device kind.
pub fn read_characterization(path: &Path) -> TechResult<(DeviceElement, Vec<LibraryStore>)> {
    let text = std::fs::read_to_string(path).map_err(|e| TechError::io(path, e))?;
    let document: CharacterizationDocument =
        serde_json::from_str(&text).map_err(|e| malformed(path, e.to_string()))?;
    let kind = document.device.kind;
    let libraries = document
        .libraries
        .into_iter()
        .map(|lib| lib.into_store(kind).map_err(|reason| malformed(path, reason)))
        .collect::<TechResult<Vec<_>>>()?;
    Ok((document.device, libraries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use techlib_common::ErrorKind;
    use techlib_model::ClbModel;

    fn sample() -> &'static str {
        r#"{
          "libraries": [{
            "name": "STD_FU",
            "nodes": [
              {"kind": "cell", "name": "ADD_8",
               "attributes": {
                 "area": {"value_type": "float64", "value": 12.0},
                 "SLICE_LUTS": {"value_type": "float64", "value": 8.0},
                 "clock_period": {"value_type": "float64", "value": 4.0},
                 "clock_period_resource_fraction": {"value_type": "float64", "value": 0.5}
               },
               "operations": [
                 {"operation_name": "plus_expr", "commutative": true,
                  "supported_types": "INT:8|UINT:*", "execution_time": 1.5},
                 {"operation_name": "mult_expr", "cycles": 3, "synthesis_dependent": true},
                 {"operation_name": "minus_expr", "timing_path": [
                   {"source": "in1", "target": "out1", "delay": 0.7},
                   {"source": "in2", "target": "out1", "delay": 0.9}
                 ]}
               ]},
              {"kind": "template",
               "prototype": {"name": "mult_expr_FU",
                 "operations": [{"operation_name": "mult_expr", "pipe_parameters": "*:0,1"}]},
               "no_constant_characterization": true}
            ]
          }]
        }"#
    }

    #[test]
    fn load_applies_derived_timing_rules() {
        let libs = parse_technology(sample(), Path::new("lib.json"), DeviceKind::Fpga).unwrap();
        assert_eq!(libs.len(), 1);
        let unit = libs[0].unit("ADD_8").unwrap();
        assert_eq!(unit.area.as_ref().unwrap().area(), 12.0);
        assert_eq!(
            unit.area.as_ref().unwrap().resource(ClbResource::SliceLuts),
            8.0
        );
        assert!(!unit.attributes.contains_key("area"));

        let plus = unit.operation("plus_expr").unwrap();
        assert!(plus.commutative);
        assert!(plus.bounded);
        assert_eq!(plus.supported_types["INT"], vec![8]);
        assert_eq!(plus.execution_time(), 1.5);

        // 3 cycles at 4 ns scaled by 0.5
        assert_eq!(unit.operation("mult_expr").unwrap().execution_time(), 6.0);

        let minus = unit.operation("minus_expr").unwrap().time.as_ref().unwrap();
        assert_eq!(minus.execution_time(), 0.9);
        assert_eq!(minus.cycles(), 0);

        let template = libs[0].get("mult_expr_FU").unwrap().as_template().unwrap();
        assert!(template.no_constant_characterization);
    }

    #[test]
    fn synthesis_dependent_without_clock_is_malformed() {
        let text = r#"{"libraries": [{"name": "L", "nodes": [
            {"kind": "cell", "name": "X", "operations": [
              {"operation_name": "op", "cycles": 2, "synthesis_dependent": true}]}]}]}"#;
        let err = parse_technology(text, Path::new("x.json"), DeviceKind::Fpga).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("clock_period"));
    }

    #[test]
    fn bad_supported_types_is_malformed() {
        let text = r#"{"libraries": [{"name": "L", "nodes": [
            {"kind": "cell", "name": "X", "operations": [
              {"operation_name": "op", "supported_types": "INT"}]}]}]}"#;
        let err = parse_technology(text, Path::new("x.json"), DeviceKind::Asic).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn write_prefers_cycles_and_omits_defaults() {
        let mut op = Operation::new("mult_expr");
        let mut time = TimeModel::for_device(DeviceKind::Fpga);
        time.set_execution_time(2.0, 2);
        op.time = Some(time);
        let element = OperationElement::from_operation(&op);
        assert_eq!(element.cycles, Some(2));
        assert_eq!(element.execution_time, None);
        assert_eq!(element.bounded, None);
        assert_eq!(element.initiation_time, None);

        let json = serde_json::to_string(&element).unwrap();
        assert!(!json.contains("commutative"));
        assert!(!json.contains("bounded"));

        op.bounded = false;
        op.time = None;
        let element = OperationElement::from_operation(&op);
        assert_eq!(element.bounded, Some(false));
    }

    #[test]
    fn technology_file_survives_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("technology.json");

        let mut unit = FunctionalUnit::new("ADD_8");
        unit.area = Some(AreaModel::Clb(ClbModel {
            area: 3.0,
            resources: BTreeMap::from([(ClbResource::Registers, 4.0)]),
        }));
        unit.characterization_timestamp = Timestamp::from_unix_seconds(1_700_000_000);
        let mut store = LibraryStore::new("STD_FU");
        store.add(unit.into()).unwrap();
        store.set_dont_use("ADD_8");

        write_technology(&path, [&store]).unwrap();
        let libs = read_technology(&path, DeviceKind::Fpga).unwrap();
        let loaded = libs[0].unit("ADD_8").unwrap();
        assert_eq!(loaded.area.as_ref().unwrap().resource(ClbResource::Registers), 4.0);
        assert_eq!(loaded.characterization_timestamp.unix_seconds(), 1_700_000_000);
        assert!(libs[0].is_dont_use("ADD_8"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_technology(&dir.path().join("none.json"), DeviceKind::Fpga).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn characterization_document_keeps_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("characterization.json");
        let mut store = LibraryStore::new("STD_FU");
        store.add(FunctionalUnit::new("AND2").into()).unwrap();
        let document = CharacterizationDocument {
            device: DeviceElement {
                name: "nangate45".to_string(),
                kind: DeviceKind::Asic,
                ..DeviceElement::default()
            },
            libraries: vec![store.export()],
        };
        write_characterization(&path, &document).unwrap();
        let (device, libs) = read_characterization(&path).unwrap();
        assert_eq!(device.kind, DeviceKind::Asic);
        assert!(matches!(
            libs[0].unit("AND2").unwrap().operations[0].time,
            Some(TimeModel::Liberty(_))
        ));
    }
}
