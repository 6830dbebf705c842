//! The per-library registry of technology nodes.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use techlib_common::ConsistencyViolation;
use techlib_model::{Attribute, FunctionalUnit, TechnologyNode};
use tracing::debug;

use crate::document::LibraryDocument;

/// One named technology library: name → node map plus a `dont_use` set.
///
/// Iteration follows insertion order. The serialized form is rebuilt on each
/// [`LibraryStore::export`] call, so mutations never need to invalidate it.
#[derive(Debug, Clone, Default)]
pub struct LibraryStore {
    name: String,
    attributes: BTreeMap<String, Attribute>,
    nodes: HashMap<String, TechnologyNode>,
    order: Vec<String>,
    dont_use: BTreeSet<String>,
}

impl LibraryStore {
    /// Creates an empty library.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The library name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Library-level attributes.
    pub fn attributes(&self) -> &BTreeMap<String, Attribute> {
        &self.attributes
    }

    /// Sets a library-level attribute.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: Attribute) {
        self.attributes.insert(name.into(), value);
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if the library holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Node names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &TechnologyNode> {
        self.order.iter().filter_map(|name| self.nodes.get(name))
    }

    /// Returns `true` if a node with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Registers a new node. Units without operations are normalized first.
    pub fn add(&mut self, mut node: TechnologyNode) -> Result<(), ConsistencyViolation> {
        let name = node.name().to_string();
        if self.nodes.contains_key(&name) {
            return Err(ConsistencyViolation::DuplicateNode(name));
        }
        node.unit_mut().normalize();
        debug!(library = %self.name, node = %name, "adding node");
        self.order.push(name.clone());
        self.nodes.insert(name, node);
        Ok(())
    }

    /// Looks up a node.
    pub fn get(&self, name: &str) -> Option<&TechnologyNode> {
        self.nodes.get(name)
    }

    /// Looks up a node for in-place mutation.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut TechnologyNode> {
        self.nodes.get_mut(name)
    }

    /// Looks up a concrete unit or a template's prototype.
    pub fn unit(&self, name: &str) -> Option<&FunctionalUnit> {
        self.nodes.get(name).map(TechnologyNode::unit)
    }

    /// Merges the measured attributes of `partial` into the stored node of
    /// the same name.
    ///
    /// Copies attributes, area, per-operation timing and `bounded`, and the
    /// template/memory metadata. Pipe and portsize strings, and empty
    /// metadata fields, are only taken over when `partial` is a template.
    /// `partial` must be of the same kind, template or unit, as the stored node.
    /// Every check runs before anything is written, so a rejected update
    /// leaves the stored node untouched.
    pub fn update(&mut self, partial: &TechnologyNode) -> Result<(), ConsistencyViolation> {
        let name = partial.name();
        let stored = self
            .nodes
            .get_mut(name)
            .ok_or_else(|| ConsistencyViolation::UnknownNode(name.to_string()))?;
        let from_template = partial.is_template();
        if stored.is_template() != from_template {
            return Err(ConsistencyViolation::KindMismatch(name.to_string()));
        }
        let incoming = partial.unit();

        if stored.unit().characterization_timestamp > incoming.characterization_timestamp {
            return Err(ConsistencyViolation::TimestampRegression {
                unit: name.to_string(),
                stored: stored.unit().characterization_timestamp,
                incoming: incoming.characterization_timestamp,
            });
        }
        if let Some(op) = incoming
            .operations
            .iter()
            .find(|op| stored.unit().operation(&op.name).is_none())
        {
            return Err(ConsistencyViolation::MissingOperation {
                unit: name.to_string(),
                operation: op.name.clone(),
            });
        }

        if let (TechnologyNode::Template(target), TechnologyNode::Template(source)) =
            (&mut *stored, partial)
        {
            if source.specialized.is_some() {
                target.specialized = source.specialized.clone();
            }
        }

        let current = stored.unit_mut();
        current.attributes = incoming.attributes.clone();
        if incoming.area.is_some() {
            current.area = incoming.area.clone();
        }
        for op in &incoming.operations {
            if let Some(target) = current.operation_mut(&op.name) {
                if op.time.is_some() {
                    target.time = op.time.clone();
                }
                if from_template {
                    target.pipe_parameters = op.pipe_parameters.clone();
                    target.portsize_parameters = op.portsize_parameters.clone();
                }
                target.bounded = op.bounded;
            }
        }

        if from_template || incoming.template.is_some() {
            current.template = incoming.template.clone();
        }
        merge_field(
            &mut current.characterizing_constant_value,
            &incoming.characterizing_constant_value,
            from_template,
        );
        merge_field(&mut current.memory_type, &incoming.memory_type, from_template);
        merge_field(&mut current.channels_type, &incoming.channels_type, from_template);
        merge_field(
            &mut current.memory_ctrl_type,
            &incoming.memory_ctrl_type,
            from_template,
        );
        merge_field(
            &mut current.bram_load_latency,
            &incoming.bram_load_latency,
            from_template,
        );
        current.characterization_timestamp = incoming.characterization_timestamp;
        debug!(library = %self.name, node = %name, "updated node");
        Ok(())
    }

    /// Removes a node. Unknown names are ignored.
    pub fn remove(&mut self, name: &str) {
        if self.nodes.remove(name).is_some() {
            self.order.retain(|n| n != name);
            self.dont_use.remove(name);
        }
    }

    /// Excludes a registered node from synthesis selection. Unknown names are ignored.
    pub fn set_dont_use(&mut self, name: &str) {
        if self.nodes.contains_key(name) {
            self.dont_use.insert(name.to_string());
        }
    }

    /// Re-admits a node to synthesis selection.
    pub fn clear_dont_use(&mut self, name: &str) {
        self.dont_use.remove(name);
    }

    /// Returns `true` if the node is excluded from synthesis selection.
    pub fn is_dont_use(&self, name: &str) -> bool {
        self.dont_use.contains(name)
    }

    /// Names excluded from synthesis selection.
    pub fn dont_use(&self) -> impl Iterator<Item = &str> {
        self.dont_use.iter().map(String::as_str)
    }

    /// Builds the serialized form of the whole library.
    pub fn export(&self) -> LibraryDocument {
        LibraryDocument::from_store(self, |_| true)
    }

    /// Builds the serialized form restricted to nodes accepted by `filter`.
    pub fn export_filtered(&self, filter: impl Fn(&TechnologyNode) -> bool) -> LibraryDocument {
        LibraryDocument::from_store(self, filter)
    }
}

/// Copies `incoming` over `current` when it is set, or unconditionally for templates.
fn merge_field(current: &mut Option<String>, incoming: &Option<String>, from_template: bool) {
    if from_template || incoming.is_some() {
        *current = incoming.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use techlib_common::Timestamp;
    use techlib_model::{
        AreaModel, ClbModel, DeviceKind, FunctionalUnitTemplate, Operation, TemplateLink, TimeModel,
    };

    fn unit_with_ops(name: &str, ops: &[&str]) -> FunctionalUnit {
        let mut unit = FunctionalUnit::new(name);
        unit.operations = ops.iter().map(|op| Operation::new(*op)).collect();
        unit
    }

    fn measured(name: &str, ts: i64, exec: f64) -> TechnologyNode {
        let mut unit = unit_with_ops(name, &["plus_expr"]);
        unit.characterization_timestamp = Timestamp::from_unix_seconds(ts);
        unit.area = Some(AreaModel::Clb(ClbModel {
            area: 12.0,
            ..ClbModel::default()
        }));
        let mut time = TimeModel::for_device(DeviceKind::Fpga);
        time.set_execution_time(exec, 0);
        unit.operations[0].time = Some(time);
        unit.into()
    }

    #[test]
    fn add_rejects_duplicates() {
        let mut store = LibraryStore::new("STD_FU");
        store.add(unit_with_ops("ADD", &["plus_expr"]).into()).unwrap();
        let err = store
            .add(unit_with_ops("ADD", &["plus_expr"]).into())
            .unwrap_err();
        assert!(matches!(err, ConsistencyViolation::DuplicateNode(ref n) if n == "ADD"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn add_normalizes_empty_operations() {
        let mut store = LibraryStore::new("STD_FU");
        store.add(FunctionalUnit::new("ASSIGN_REAL_FU").into()).unwrap();
        let unit = store.unit("ASSIGN_REAL_FU").unwrap();
        assert_eq!(unit.operations.len(), 1);
        assert_eq!(unit.operations[0].name, "ASSIGN_REAL_FU");
    }

    #[test]
    fn names_follow_insertion_order() {
        let mut store = LibraryStore::new("STD_FU");
        for name in ["c", "a", "b"] {
            store.add(FunctionalUnit::new(name).into()).unwrap();
        }
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["c", "a", "b"]);
        store.remove("a");
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["c", "b"]);
    }

    #[test]
    fn update_merges_measurements() {
        let mut store = LibraryStore::new("STD_FU");
        store.add(unit_with_ops("ADD_8", &["plus_expr"]).into()).unwrap();
        store.update(&measured("ADD_8", 100, 1.25)).unwrap();
        let unit = store.unit("ADD_8").unwrap();
        assert_eq!(unit.area.as_ref().unwrap().area(), 12.0);
        assert_eq!(unit.operations[0].execution_time(), 1.25);
        assert_eq!(unit.characterization_timestamp.unix_seconds(), 100);
    }

    #[test]
    fn update_with_older_timestamp_is_rejected_and_leaves_node() {
        let mut store = LibraryStore::new("STD_FU");
        store.add(unit_with_ops("ADD_8", &["plus_expr"]).into()).unwrap();
        store.update(&measured("ADD_8", 200, 1.0)).unwrap();

        let err = store.update(&measured("ADD_8", 100, 9.0)).unwrap_err();
        assert!(matches!(err, ConsistencyViolation::TimestampRegression { .. }));
        let unit = store.unit("ADD_8").unwrap();
        assert_eq!(unit.operations[0].execution_time(), 1.0);
        assert_eq!(unit.characterization_timestamp.unix_seconds(), 200);
    }

    #[test]
    fn update_with_same_timestamp_is_idempotent() {
        let mut store = LibraryStore::new("STD_FU");
        store.add(unit_with_ops("ADD_8", &["plus_expr"]).into()).unwrap();
        let partial = measured("ADD_8", 300, 2.0);
        store.update(&partial).unwrap();
        let first = store.get("ADD_8").cloned();
        store.update(&partial).unwrap();
        assert_eq!(store.get("ADD_8").cloned(), first);
    }

    #[test]
    fn update_with_unknown_operation_is_rejected() {
        let mut store = LibraryStore::new("STD_FU");
        store.add(unit_with_ops("ADD_8", &["plus_expr"]).into()).unwrap();
        let mut partial = unit_with_ops("ADD_8", &["plus_expr", "minus_expr"]);
        partial.characterization_timestamp = Timestamp::from_unix_seconds(5);
        let err = store.update(&partial.into()).unwrap_err();
        assert!(matches!(
            err,
            ConsistencyViolation::MissingOperation { ref operation, .. } if operation == "minus_expr"
        ));
        assert!(store.unit("ADD_8").unwrap().characterization_timestamp.is_epoch());
    }

    #[test]
    fn update_of_unknown_node_is_rejected() {
        let mut store = LibraryStore::new("STD_FU");
        let err = store.update(&measured("ADD_8", 1, 1.0)).unwrap_err();
        assert!(matches!(err, ConsistencyViolation::UnknownNode(_)));
    }

    #[test]
    fn update_changing_node_kind_is_rejected() {
        let mut store = LibraryStore::new("STD_FU");
        store
            .add(FunctionalUnitTemplate::new(unit_with_ops("plus_expr_FU", &["plus_expr"])).into())
            .unwrap();
        store.add(unit_with_ops("ADD_8", &["plus_expr"]).into()).unwrap();

        let err = store.update(&measured("plus_expr_FU", 10, 1.0)).unwrap_err();
        assert!(matches!(err, ConsistencyViolation::KindMismatch(ref n) if n == "plus_expr_FU"));
        assert!(store.get("plus_expr_FU").unwrap().is_template());
        assert!(store.unit("plus_expr_FU").unwrap().area.is_none());

        let partial = FunctionalUnitTemplate::new(unit_with_ops("ADD_8", &["plus_expr"]));
        let err = store.update(&partial.into()).unwrap_err();
        assert!(matches!(err, ConsistencyViolation::KindMismatch(ref n) if n == "ADD_8"));
        assert!(!store.get("ADD_8").unwrap().is_template());
    }

    #[test]
    fn template_update_carries_pipe_parameters_and_clears_metadata() {
        let mut proto = unit_with_ops("mult_expr_FU", &["mult_expr"]);
        proto.memory_type = Some("ASYNCHRONOUS".to_string());
        proto.operations[0].pipe_parameters = "*:0".to_string();
        let mut store = LibraryStore::new("STD_FU");
        store.add(FunctionalUnitTemplate::new(proto).into()).unwrap();

        let mut incoming = unit_with_ops("mult_expr_FU", &["mult_expr"]);
        incoming.operations[0].pipe_parameters = "*:0,1,2".to_string();
        let mut template = FunctionalUnitTemplate::new(incoming);
        template.specialized = Some("xc7".to_string());
        store.update(&template.into()).unwrap();

        let node = store.get("mult_expr_FU").unwrap();
        assert_eq!(node.unit().operations[0].pipe_parameters, "*:0,1,2");
        assert_eq!(node.unit().memory_type, None);
        assert_eq!(node.as_template().unwrap().specialized.as_deref(), Some("xc7"));
    }

    #[test]
    fn unit_update_keeps_pipe_parameters_and_metadata() {
        let mut unit = unit_with_ops("ARRAY_1D_STD_BRAM", &["STORE"]);
        unit.memory_type = Some("SYNCHRONOUS_UNALIGNED".to_string());
        unit.operations[0].pipe_parameters = "*:1".to_string();
        let mut store = LibraryStore::new("STD_FU");
        store.add(unit.into()).unwrap();

        let mut incoming = unit_with_ops("ARRAY_1D_STD_BRAM", &["STORE"]);
        incoming.template = Some(TemplateLink {
            name: "ARRAY_1D_STD_BRAM".to_string(),
            parameters: String::new(),
        });
        store.update(&incoming.into()).unwrap();
        let stored = store.unit("ARRAY_1D_STD_BRAM").unwrap();
        assert_eq!(stored.operations[0].pipe_parameters, "*:1");
        assert_eq!(stored.memory_type.as_deref(), Some("SYNCHRONOUS_UNALIGNED"));
        assert!(stored.template.is_some());
    }

    #[test]
    fn dont_use_ignores_unknown_names() {
        let mut store = LibraryStore::new("STD_FU");
        store.add(FunctionalUnit::new("ADD").into()).unwrap();
        store.set_dont_use("ADD");
        store.set_dont_use("SUB");
        assert!(store.is_dont_use("ADD"));
        assert!(!store.is_dont_use("SUB"));
        store.clear_dont_use("ADD");
        assert!(!store.is_dont_use("ADD"));
        store.remove("nonexistent");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn export_reflects_latest_state() {
        let mut store = LibraryStore::new("STD_FU");
        store.add(FunctionalUnit::new("ADD").into()).unwrap();
        assert_eq!(store.export().nodes.len(), 1);
        store.add(FunctionalUnit::new("SUB").into()).unwrap();
        assert_eq!(store.export().nodes.len(), 2);
    }
}
