//! Attribute reader/writer around a single KDL object node.
//!
//! Scalars are properties of the node (`name="Crate1"`), vectors and
//! quaternions are child nodes with one argument per component
//! (`pos 1.0 2.0 3.0`). References to other objects can't be applied while
//! loading since the target may not exist yet, so they are queued as resolve
//! callbacks and run by [`ObjectArchive::resolve_objects`].

use glam::{Quat, Vec3};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use node::ObjectGuid;
use scene_core::color::{parse_hex_color, Color};
use scene_graph::{ErrorKind, ErrorRecord, ErrorReport, ObjectId, SceneGraph};

pub(crate) const OBJECT_NODE: &str = "object";

type ResolveCallback = Box<dyn FnOnce(&mut SceneGraph, Option<ObjectId>)>;

pub struct ObjectArchive {
    node: KdlNode,
    loading: bool,
    undo: bool,
    pending: Vec<(Option<ObjectGuid>, ResolveCallback)>,
    errors: ErrorReport,
}

fn value_as_f32(value: &KdlValue) -> Option<f32> {
    value
        .as_float()
        .or_else(|| value.as_integer().map(|v| v as f64))
        .map(|v| v as f32)
}

impl ObjectArchive {
    /// An empty archive to write an object into.
    pub fn saving() -> Self {
        Self::new(KdlNode::new(OBJECT_NODE), false)
    }

    /// An archive reading from an existing object node.
    pub fn loading(node: KdlNode) -> Self {
        Self::new(node, true)
    }

    fn new(node: KdlNode, loading: bool) -> Self {
        Self {
            node,
            loading,
            undo: false,
            pending: Vec::new(),
            errors: ErrorReport::new(),
        }
    }

    /// Marks the archive as restoring an undo snapshot.
    pub fn with_undo(mut self, undo: bool) -> Self {
        self.undo = undo;
        self
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_undo(&self) -> bool {
        self.undo
    }

    pub fn node(&self) -> &KdlNode {
        &self.node
    }

    /// Returns the written node, without an empty children block.
    pub fn into_node(mut self) -> KdlNode {
        if self
            .node
            .children()
            .is_some_and(|children| children.nodes().is_empty())
        {
            *self.node.children_mut() = None;
        }
        self.node
    }

    fn property(&self, key: &str) -> Option<&KdlValue> {
        self.node.get(key)
    }

    fn set_property(&mut self, key: &str, value: KdlValue) {
        self.node
            .entries_mut()
            .retain(|entry| entry.name().map(|name| name.value()) != Some(key));
        self.node.push(KdlEntry::new_prop(key, value));
    }

    fn components(&self, key: &str) -> Option<Vec<f32>> {
        let child = self.node.children()?.get(key)?;
        child
            .entries()
            .iter()
            .filter(|entry| entry.name().is_none())
            .map(|entry| value_as_f32(entry.value()))
            .collect()
    }

    fn set_components(&mut self, key: &str, values: &[f32]) {
        let mut child = KdlNode::new(key);
        for &value in values {
            child.push(KdlEntry::new(KdlValue::Float(value as f64)));
        }
        let children = self.node.children_mut().get_or_insert_with(KdlDocument::new);
        children.nodes_mut().retain(|node| node.name().value() != key);
        children.nodes_mut().push(child);
    }

    pub fn vec3(&self, key: &str) -> Option<Vec3> {
        match self.components(key)?.as_slice() {
            &[x, y, z] => Some(Vec3::new(x, y, z)),
            _ => None,
        }
    }

    pub fn set_vec3(&mut self, key: &str, value: Vec3) {
        self.set_components(key, &value.to_array());
    }

    /// Quaternions are stored as `x y z w`.
    pub fn quat(&self, key: &str) -> Option<Quat> {
        match self.components(key)?.as_slice() {
            &[x, y, z, w] => Some(Quat::from_xyzw(x, y, z, w)),
            _ => None,
        }
    }

    pub fn set_quat(&mut self, key: &str, value: Quat) {
        self.set_components(key, &value.to_array());
    }

    pub fn guid(&self, key: &str) -> Option<ObjectGuid> {
        ObjectGuid::parse(self.property(key)?.as_string()?)
    }

    pub fn set_guid(&mut self, key: &str, guid: ObjectGuid) {
        self.set_property(key, KdlValue::String(guid.to_uuid_string()));
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        i64::try_from(self.property(key)?.as_integer()?).ok()
    }

    pub fn set_int(&mut self, key: &str, value: i64) {
        self.set_property(key, KdlValue::Integer(value.into()));
    }

    pub fn float(&self, key: &str) -> Option<f32> {
        value_as_f32(self.property(key)?)
    }

    pub fn set_float(&mut self, key: &str, value: f32) {
        self.set_property(key, KdlValue::Float(value as f64));
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.property(key)?.as_string()
    }

    pub fn set_string(&mut self, key: &str, value: &str) {
        self.set_property(key, KdlValue::String(value.to_string()));
    }

    /// Colors are written as packed `0xRRGGBB` integers. Hex strings such as
    /// `"#ff8000"` are accepted when reading.
    pub fn color(&self, key: &str) -> Option<Color> {
        let value = self.property(key)?;
        if let Some(text) = value.as_string() {
            return parse_hex_color(text);
        }
        let packed = u32::try_from(value.as_integer()?).ok()?;
        Some(Color::from_rgb_u32(packed))
    }

    pub fn set_color(&mut self, key: &str, color: Color) {
        self.set_int(key, color.to_rgb_u32().into());
    }

    /// Queues `callback` to run once every object is loaded. A `None` guid
    /// means "no reference" and resolves to `None`.
    pub fn set_resolve_callback(
        &mut self,
        guid: Option<ObjectGuid>,
        callback: impl FnOnce(&mut SceneGraph, Option<ObjectId>) + 'static,
    ) {
        self.pending.push((guid, Box::new(callback)));
    }

    pub fn pending_resolves(&self) -> usize {
        self.pending.len()
    }

    /// Runs queued callbacks in registration order. References to objects
    /// that don't exist are reported and their callback is dropped.
    pub fn resolve_objects(&mut self, graph: &mut SceneGraph) {
        let owner = self.guid("id");
        for (guid, callback) in std::mem::take(&mut self.pending) {
            let Some(guid) = guid else {
                callback(graph, None);
                continue;
            };
            match graph.find_object(guid) {
                Some(id) => callback(graph, Some(id)),
                None => {
                    let mut record = ErrorRecord::warning(
                        ErrorKind::UnresolvedReference,
                        format!("Referenced object {} not found", guid.to_uuid_string()),
                    );
                    if let Some(owner) = owner {
                        record = record.with_object(owner);
                    }
                    self.errors.report(record);
                }
            }
        }
    }

    pub fn report(&mut self, record: ErrorRecord) {
        self.errors.report(record);
    }

    pub fn errors(&self) -> &ErrorReport {
        &self.errors
    }

    pub fn take_errors(&mut self) -> ErrorReport {
        std::mem::take(&mut self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node::ObjectKind;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn parse_node(text: &str) -> KdlNode {
        let doc: KdlDocument = text.parse().unwrap();
        doc.nodes()[0].clone()
    }

    #[test]
    fn test_attributes_survive_text_roundtrip() {
        let mut archive = ObjectArchive::saving();
        archive.set_string("name", "Crate1");
        archive.set_int("hide-order", 12);
        archive.set_vec3("pos", Vec3::new(1.0, -2.5, 3.0));
        archive.set_quat("rotate", Quat::from_rotation_z(0.5));
        archive.set_color("color", Color::rgb(255, 128, 0));
        archive.set_guid("id", ObjectGuid::from_u128(42));
        archive.set_float("radius", 0.75);

        let text = archive.into_node().to_string();
        let archive = ObjectArchive::loading(parse_node(&text));

        assert!(archive.is_loading());
        assert_eq!(archive.string("name"), Some("Crate1"));
        assert_eq!(archive.int("hide-order"), Some(12));
        assert_eq!(archive.vec3("pos"), Some(Vec3::new(1.0, -2.5, 3.0)));
        assert!(archive
            .quat("rotate")
            .unwrap()
            .abs_diff_eq(Quat::from_rotation_z(0.5), 1e-6));
        assert_eq!(archive.color("color"), Some(Color::rgb(255, 128, 0)));
        assert_eq!(archive.guid("id"), Some(ObjectGuid::from_u128(42)));
        assert_eq!(archive.float("radius"), Some(0.75));
        assert_eq!(archive.vec3("scale"), None);
    }

    #[test]
    fn test_setting_twice_replaces() {
        let mut archive = ObjectArchive::saving();
        archive.set_int("hide-order", 1);
        archive.set_int("hide-order", 2);
        archive.set_vec3("pos", Vec3::ONE);
        archive.set_vec3("pos", Vec3::ZERO);

        let node = archive.node();
        assert_eq!(node.entries().len(), 1);
        assert_eq!(node.children().unwrap().nodes().len(), 1);
        assert_eq!(archive.vec3("pos"), Some(Vec3::ZERO));
    }

    #[test]
    fn test_integer_components_and_hex_colors() {
        let archive = ObjectArchive::loading(parse_node("object color=\"#ff8000\" { pos 1 2 3; }"));
        assert_eq!(archive.vec3("pos"), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(archive.color("color"), Some(Color::rgb(255, 128, 0)));
    }

    #[test]
    fn test_resolve_runs_in_order_and_reports_missing() {
        let mut graph = SceneGraph::new();
        let target = graph.create_object(ObjectKind::Empty, "Target");
        let target_guid = graph.guid(target).unwrap();

        let mut archive = ObjectArchive::loading(KdlNode::new(OBJECT_NODE));
        let calls = Rc::new(RefCell::new(Vec::new()));
        for guid in [Some(target_guid), None, Some(ObjectGuid::from_u128(99))] {
            let calls = calls.clone();
            archive.set_resolve_callback(guid, move |_, id| calls.borrow_mut().push(id));
        }
        assert_eq!(archive.pending_resolves(), 3);

        archive.resolve_objects(&mut graph);
        assert_eq!(*calls.borrow(), vec![Some(target), None]);
        assert_eq!(archive.pending_resolves(), 0);
        assert_eq!(archive.errors().count(ErrorKind::UnresolvedReference), 1);
    }
}
