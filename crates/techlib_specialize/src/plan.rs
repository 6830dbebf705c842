//! Specialization plans and their materialization into a library.

use std::collections::BTreeSet;

use rayon::prelude::*;
use techlib_common::{ConfigurationError, ConsistencyViolation};
use techlib_model::{
    AreaModel, DeviceKind, FunctionalUnit, Operation, TechnologyNode, TemplateLink, TimeModel,
};
use techlib_store::LibraryStore;
use tracing::debug;

use crate::naming::{resized_ports, specialization_name, Variant};
use crate::params::collect_parameters;
use crate::settings::SpecializerSettings;

/// Multiplexer primitive, never constant-pinned.
pub const MUX_GATE: &str = "MUX_GATE";
/// Demultiplexer primitive, never constant-pinned.
pub const DEMUX_GATE: &str = "DEMUX_GATE";

/// One named specialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specialization {
    /// The specialization's unit name.
    pub name: String,
    /// Space-separated positional template parameters.
    pub parameters: String,
    /// Index among the source unit's inputs of the constant-pinned port.
    pub pinned: Option<usize>,
}

/// All constant-pinning variants of one (precision, pipe, portsize) tuple,
/// in characterization order: pinned ports first, unpinned last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecializationGroup {
    /// Operand precision.
    pub precision: u32,
    /// DSP x-width paired with the precision.
    pub dsp_x: Option<u32>,
    /// Selected pipe value.
    pub pipe: Option<String>,
    /// Selected port-vector size.
    pub portsize: Option<String>,
    /// The variants.
    pub variants: Vec<Specialization>,
}

impl SpecializationGroup {
    /// The naming and resizing choices of `spec` within this group.
    pub fn variant_of(&self, spec: &Specialization) -> Variant<'_> {
        Variant {
            precision: self.precision,
            dsp_x: self.dsp_x,
            pinned: spec.pinned,
            pipe: self.pipe.as_deref(),
            portsize: self.portsize.as_deref(),
        }
    }
}

/// Everything to characterize for one template or concrete unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecializationPlan {
    /// The library holding the source node.
    pub library: String,
    /// The source template or unit name.
    pub source: String,
    /// Whether the source is a template.
    pub is_template: bool,
    /// Whether every operation of the source is commutative.
    pub commutative: bool,
    /// Number of input ports of the source, control ports included.
    pub input_count: usize,
    /// Tuple groups, precision-major, then portsize, then pipe.
    pub groups: Vec<SpecializationGroup>,
}

impl SpecializationPlan {
    /// Every specialization name, in order, duplicates included.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|g| g.variants.iter().map(|v| v.name.as_str()))
    }

    /// Number of (group, variant) entries.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.variants.len()).sum()
    }

    /// Returns `true` if nothing is to be characterized.
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.variants.is_empty())
    }
}

/// Plans the specializations of one node.
///
/// Returns `None` for units that are themselves specializations, units
/// without a hardware description, and units on the skip list.
pub fn plan_unit(
    node: &TechnologyNode,
    library: &str,
    settings: &SpecializerSettings,
) -> Result<Option<SpecializationPlan>, ConfigurationError> {
    let unit = node.unit();
    if unit.template.is_some() || unit.description.is_none() || settings.skips(&unit.name) {
        return Ok(None);
    }
    let template = node.as_template();
    let is_template = template.is_some();
    let no_constants = template.is_some_and(|t| t.no_constant_characterization);
    let params = collect_parameters(unit, is_template, settings)?;

    let input_count = unit.inputs().count();
    let single_variant = unit.specializable_arity() <= 1
        || !is_template
        || unit.name == MUX_GATE
        || unit.name == DEMUX_GATE
        || no_constants;
    let pinned_choices: Vec<Option<usize>> = if single_variant {
        vec![None]
    } else {
        unit.inputs()
            .enumerate()
            .filter(|(_, port)| port.is_specializable())
            .map(|(index, _)| Some(index))
            .chain(std::iter::once(None))
            .collect()
    };

    let mut groups = Vec::new();
    for &precision in &params.precisions {
        let pipes = slots(params.pipe_for(precision));
        let portsizes = slots(params.portsize_for(precision));
        let dsp_x = settings.dsp_x(precision);
        for portsize in &portsizes {
            for pipe in &pipes {
                let mut group = SpecializationGroup {
                    precision,
                    dsp_x,
                    pipe: pipe.clone(),
                    portsize: portsize.clone(),
                    variants: Vec::new(),
                };
                for &pinned in &pinned_choices {
                    let variant = Variant {
                        precision,
                        dsp_x,
                        pinned,
                        pipe: pipe.as_deref(),
                        portsize: portsize.as_deref(),
                    };
                    let (name, parameters) = specialization_name(unit, is_template, &variant);
                    group.variants.push(Specialization {
                        name,
                        parameters,
                        pinned,
                    });
                }
                groups.push(group);
            }
        }
    }

    debug!(unit = %unit.name, groups = groups.len(), "planned specializations");
    Ok(Some(SpecializationPlan {
        library: library.to_string(),
        source: unit.name.clone(),
        is_template,
        commutative: params.commutative,
        input_count,
        groups,
    }))
}

/// One `None` slot when nothing is declared, else one slot per value.
fn slots(values: &[String]) -> Vec<Option<String>> {
    if values.is_empty() {
        vec![None]
    } else {
        values.iter().cloned().map(Some).collect()
    }
}

/// Plans every node of a library in parallel, keeping library order.
pub fn plan_library(
    store: &LibraryStore,
    settings: &SpecializerSettings,
) -> Result<Vec<SpecializationPlan>, ConfigurationError> {
    let nodes: Vec<&TechnologyNode> = store.nodes().collect();
    let plans = nodes
        .par_iter()
        .map(|node| plan_unit(node, store.name(), settings))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(plans.into_iter().flatten().collect())
}

/// Registers every specialization of `plan` missing from `store`, returning
/// the names created. Existing nodes of the same name are reused untouched.
pub fn materialize(
    store: &mut LibraryStore,
    plan: &SpecializationPlan,
    kind: DeviceKind,
) -> Result<Vec<String>, ConsistencyViolation> {
    let source = store
        .unit(&plan.source)
        .cloned()
        .ok_or_else(|| ConsistencyViolation::UnknownNode(plan.source.clone()))?;
    let mut seen = BTreeSet::new();
    let mut created = Vec::new();
    for group in &plan.groups {
        for spec in &group.variants {
            if !seen.insert(spec.name.as_str()) || store.contains(&spec.name) {
                continue;
            }
            let instance = create_instance(&source, spec, &group.variant_of(spec), kind);
            store.add(instance.into())?;
            created.push(spec.name.clone());
        }
    }
    debug!(source = %plan.source, created = created.len(), "materialized specializations");
    Ok(created)
}

/// A fresh specialization of `source`.
///
/// Operations keep their name, flags and latency-related timing; supported
/// types are narrowed to the variant precision. Area starts empty.
pub fn create_instance(
    source: &FunctionalUnit,
    spec: &Specialization,
    variant: &Variant<'_>,
    kind: DeviceKind,
) -> FunctionalUnit {
    let mut unit = FunctionalUnit::new(spec.name.clone());
    unit.template = Some(TemplateLink {
        name: source.name.clone(),
        parameters: spec.parameters.clone(),
    });
    unit.characterizing_constant_value = source.characterizing_constant_value.clone();
    unit.memory_type = source.memory_type.clone();
    unit.channels_type = source.channels_type.clone();
    unit.memory_ctrl_type = source.memory_ctrl_type.clone();
    unit.bram_load_latency = source.bram_load_latency.clone();
    unit.description = source.description;
    unit.library_parameters = source.library_parameters.clone();
    unit.ports = resized_ports(source, variant);
    unit.operations = source
        .operations
        .iter()
        .map(|op| {
            let mut copy = Operation::new(op.name.clone());
            copy.bounded = op.bounded;
            copy.commutative = op.commutative;
            copy.time = Some(match &op.time {
                Some(time) => TimeModel::carried_from(kind, time),
                None => TimeModel::for_device(kind),
            });
            copy.supported_types = op
                .supported_types
                .keys()
                .map(|name| (name.clone(), vec![variant.precision]))
                .collect();
            copy
        })
        .collect();
    unit.area = Some(AreaModel::for_device(kind));
    unit
}

#[cfg(test)]
mod tests {
    use super::*;
    use techlib_model::{
        parse_supported_types, DataType, FunctionalUnitTemplate, HdlDescription, Port,
        PortDirection, CLOCK_PORT,
    };

    fn template(name: &str, types: &str, commutative: bool) -> FunctionalUnitTemplate {
        let mut unit = FunctionalUnit::new(name);
        unit.description = Some(HdlDescription::Verilog);
        unit.ports = vec![
            Port::new(CLOCK_PORT, PortDirection::In, DataType::Bool, 1),
            Port::new("in1", PortDirection::In, DataType::Int, 32),
            Port::new("in2", PortDirection::In, DataType::Int, 32),
            Port::new("out1", PortDirection::Out, DataType::Int, 32),
        ];
        let mut op = Operation::new("bit_and_expr");
        op.commutative = commutative;
        op.supported_types = parse_supported_types(types).unwrap();
        unit.operations = vec![op];
        FunctionalUnitTemplate::new(unit)
    }

    #[test]
    fn and2_yields_six_names() {
        let node: TechnologyNode = template("AND2", "int:8,16", true).into();
        let plan = plan_unit(&node, "STD_FU", &SpecializerSettings::default())
            .unwrap()
            .unwrap();
        assert_eq!(plan.groups.len(), 2);
        assert!(plan.commutative);
        assert_eq!(
            plan.names().collect::<Vec<_>>(),
            vec![
                "AND2_0_8_8",
                "AND2_8_0_8",
                "AND2_8_8_8",
                "AND2_0_16_16",
                "AND2_16_0_16",
                "AND2_16_16_16",
            ]
        );
        // clock is input 0, so the pinned indices are 1 and 2
        assert_eq!(plan.groups[0].variants[0].pinned, Some(1));
        assert_eq!(plan.groups[0].variants[2].pinned, None);
    }

    #[test]
    fn wildcard_type_enumerates_five_precisions() {
        let node: TechnologyNode = template("plus_expr_FU", "int:*", false).into();
        let plan = plan_unit(&node, "STD_FU", &SpecializerSettings::default())
            .unwrap()
            .unwrap();
        let precisions: Vec<u32> = plan.groups.iter().map(|g| g.precision).collect();
        assert_eq!(precisions, vec![1, 8, 16, 32, 64]);
    }

    #[test]
    fn no_constant_characterization_keeps_one_variant() {
        let mut t = template("AND2", "int:8", true);
        t.no_constant_characterization = true;
        let plan = plan_unit(&t.into(), "STD_FU", &SpecializerSettings::default())
            .unwrap()
            .unwrap();
        assert_eq!(plan.names().collect::<Vec<_>>(), vec!["AND2_8_8_8"]);
    }

    #[test]
    fn selector_and_clock_inputs_do_not_count_toward_arity() {
        let mut t = template("ui_lshift_expr_FU", "int:8,16", false);
        t.prototype.ports = vec![
            Port::new(CLOCK_PORT, PortDirection::In, DataType::Bool, 1),
            Port::new("in1", PortDirection::In, DataType::Int, 32),
            Port::new("sel_shift", PortDirection::In, DataType::Bool, 1),
            Port::new("out1", PortDirection::Out, DataType::Int, 32),
        ];
        assert_eq!(t.prototype.specializable_arity(), 1);
        let plan = plan_unit(&t.into(), "STD_FU", &SpecializerSettings::default())
            .unwrap()
            .unwrap();
        assert_eq!(plan.groups.len(), 2);
        for group in &plan.groups {
            assert_eq!(group.variants.len(), 1);
            assert_eq!(group.variants[0].pinned, None);
        }
    }

    #[test]
    fn mux_gate_is_never_pinned() {
        let node: TechnologyNode = template(MUX_GATE, "int:8,16", false).into();
        assert_eq!(node.unit().specializable_arity(), 2);
        let plan = plan_unit(&node, "STD_FU", &SpecializerSettings::default())
            .unwrap()
            .unwrap();
        assert_eq!(plan.groups.len(), 2);
        for group in &plan.groups {
            assert_eq!(group.variants.len(), 1);
            assert_eq!(group.variants[0].pinned, None);
        }
    }

    #[test]
    fn pipe_and_portsize_multiply_groups() {
        let mut t = template("mult_expr_FU", "int:32", false);
        t.prototype.operations[0].pipe_parameters = "*:0,2".to_string();
        t.prototype.operations[0].portsize_parameters = "32:2,4".to_string();
        t.no_constant_characterization = true;
        let plan = plan_unit(&t.into(), "STD_FU", &SpecializerSettings::default())
            .unwrap()
            .unwrap();
        assert_eq!(
            plan.names().collect::<Vec<_>>(),
            vec![
                "mult_expr_FU_32_32_32_0_2",
                "mult_expr_FU_32_32_32_2_2",
                "mult_expr_FU_32_32_32_0_4",
                "mult_expr_FU_32_32_32_2_4",
            ]
        );
    }

    #[test]
    fn specialized_and_skipped_units_have_no_plan() {
        let settings = SpecializerSettings::default();
        let mut unit = FunctionalUnit::new("plus_expr_FU_8_8_8");
        unit.description = Some(HdlDescription::Verilog);
        unit.template = Some(TemplateLink {
            name: "plus_expr_FU".to_string(),
            parameters: "8 8 8".to_string(),
        });
        assert!(plan_unit(&unit.into(), "L", &settings).unwrap().is_none());

        let gate: TechnologyNode = template("AND_GATE", "int:8", true).into();
        assert!(plan_unit(&gate, "L", &settings).unwrap().is_none());

        let mut bare = template("AND2", "int:8", true);
        bare.prototype.description = None;
        assert!(plan_unit(&bare.into(), "L", &settings).unwrap().is_none());
    }

    #[test]
    fn malformed_pipe_string_is_reported() {
        let mut t = template("mult_expr_FU", "int:32", false);
        t.prototype.operations[0].pipe_parameters = "16:1".to_string();
        let err = plan_unit(&t.into(), "L", &SpecializerSettings::default()).unwrap_err();
        assert!(err.to_string().contains("mult_expr_FU"));
    }

    #[test]
    fn materialize_creates_missing_instances() {
        let mut store = LibraryStore::new("STD_FU");
        let mut t = template("AND2", "int:8", true);
        let mut time = TimeModel::for_device(DeviceKind::Fpga);
        time.set_execution_time(0.0, 1);
        t.prototype.operations[0].time = Some(time);
        store.add(t.into()).unwrap();

        let plans = plan_library(&store, &SpecializerSettings::default()).unwrap();
        assert_eq!(plans.len(), 1);
        let created = materialize(&mut store, &plans[0], DeviceKind::Fpga).unwrap();
        assert_eq!(created.len(), 3);
        assert_eq!(store.len(), 4);

        let instance = store.unit("AND2_8_0_8").unwrap();
        assert_eq!(instance.template_name(), Some("AND2"));
        assert_eq!(instance.template_parameters(), Some("8 0 8"));
        assert_eq!(instance.operations[0].supported_types["int"], vec![8]);
        assert_eq!(instance.operations[0].time.as_ref().unwrap().cycles(), 1);
        assert_eq!(instance.ports[1].width, 8);
        assert!(instance.area.is_some());

        // a second pass finds everything in place
        assert!(materialize(&mut store, &plans[0], DeviceKind::Fpga)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn concrete_unit_reuses_itself() {
        let mut unit = FunctionalUnit::new("ASSIGN_SIGNED_FU");
        unit.description = Some(HdlDescription::Verilog);
        unit.normalize();
        let mut store = LibraryStore::new("STD_FU");
        store.add(unit.into()).unwrap();
        let plans = plan_library(&store, &SpecializerSettings::default()).unwrap();
        assert_eq!(plans[0].names().collect::<Vec<_>>(), vec!["ASSIGN_SIGNED_FU"]);
        assert!(materialize(&mut store, &plans[0], DeviceKind::Fpga)
            .unwrap()
            .is_empty());
    }
}
