//! # Scene Graph
//!
//! The scene graph owns every object of an editing session and keeps their
//! spatial relationships consistent. It is both the arena and the registry:
//! objects are addressed by generation-checked [`ObjectId`] handles and can
//! be looked up by their persistent [`ObjectGuid`] or by their unique name.
//!
//! ## Key Concepts
//!
//! - **Local pose**: position, rotation and scale relative to the parent
//! - **World matrix**: computed lazily and cached per object; any change to a
//!   pose, a parent or a look-at target invalidates the cache of the object
//!   and of everything depending on it
//! - **Hierarchy**: parents own an ordered list of children, children point
//!   back at their parent; attach and detach can preserve the world transform
//! - **Look-at**: an object may aim its forward axis (+Y) at another object
//! - **Delegates**: an external owner can take over where a pose is stored
//! - **Listeners**: per-object event fan-out, safe against reentrant edits
//!
//! Everything runs on a single thread. Read-only queries like
//! [`SceneGraph::world_tm`] update the cache through interior mutability.

mod bounds;
mod delegate;
mod display;
mod error;
mod events;
mod hierarchy;
mod hit_test;
mod object;
mod pose;
mod settings;
mod state;
mod undo;
mod validate;

pub use delegate::TransformDelegate;
pub use display::DisplayContext;
pub use error::{ErrorKind, ErrorRecord, ErrorReport, SceneError, Severity};
pub use events::{ObjectEvent, ObjectListener};
pub use hit_test::{HitAxis, HitContext, HitQuery};
pub use object::SceneObject;
pub use settings::SceneSettings;
pub use undo::{MinimalState, UndoEntry, UndoHistory, UndoRecorder, UndoStep};

pub use node::{ObjectFlags, ObjectGuid, ObjectKind, UpdateFlags};

use slotmap::{KeyData, SlotMap};
use smallvec::SmallVec;
use std::{
    collections::HashMap,
    fmt::{self, Display},
};

slotmap::new_key_type! {
    /// Handle of an object inside a [`SceneGraph`]. Stale handles resolve to nothing.
    pub struct ObjectId;
}

impl From<u64> for ObjectId {
    fn from(value: u64) -> Self {
        Self(KeyData::from_ffi(value))
    }
}

impl ObjectId {
    /// Converts this object id to a [u64]
    pub fn as_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u64())
    }
}

/// Arena and registry of scene objects.
pub struct SceneGraph {
    pub(crate) objects: SlotMap<ObjectId, SceneObject>,
    guids: HashMap<ObjectGuid, ObjectId>,
    names: HashMap<String, ObjectId>,
    pub(crate) settings: SceneSettings,
    undo_recorder: Option<Box<dyn UndoRecorder>>,
    undo_suspended: u32,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::with_settings(SceneSettings::default())
    }

    pub fn with_settings(settings: SceneSettings) -> Self {
        Self {
            objects: SlotMap::with_key(),
            guids: HashMap::new(),
            names: HashMap::new(),
            settings,
            undo_recorder: None,
            undo_suspended: 0,
        }
    }

    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: SceneSettings) {
        self.settings = settings;
    }

    /// Creates an object with a fresh guid and a unique name derived from
    /// `base_name`, or from the kind's class name when `base_name` is empty.
    pub fn create_object(&mut self, kind: ObjectKind, base_name: &str) -> ObjectId {
        let base = if base_name.is_empty() {
            kind.class_name()
        } else {
            base_name
        };
        let name = self.generate_unique_name(base);
        self.register(ObjectGuid::new(), kind, name)
    }

    /// Registers an object under a known guid, as done when loading.
    pub fn insert_object(
        &mut self,
        guid: ObjectGuid,
        kind: ObjectKind,
        name: &str,
    ) -> Result<ObjectId, SceneError> {
        if self.guids.contains_key(&guid) {
            return Err(SceneError::DuplicateGuid {
                guid,
                name: name.to_string(),
            });
        }
        if !name.is_empty() && self.names.contains_key(name) {
            return Err(SceneError::NameTaken {
                name: name.to_string(),
            });
        }
        Ok(self.register(guid, kind, name.to_string()))
    }

    fn register(&mut self, guid: ObjectGuid, kind: ObjectKind, name: String) -> ObjectId {
        log::debug!("Adding {} \"{}\" ({})", kind.class_name(), name, guid);
        let id = self.objects.insert(SceneObject::new(guid, kind, name.clone()));
        self.guids.insert(guid, id);
        if !name.is_empty() {
            self.names.insert(name, id);
        }
        id
    }

    pub fn find_object(&self, guid: ObjectGuid) -> Option<ObjectId> {
        self.guids.get(&guid).copied()
    }

    pub fn find_object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.names.get(name).copied()
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    pub fn guid(&self, id: ObjectId) -> Option<ObjectGuid> {
        self.objects.get(id).map(|object| object.guid)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter()
    }

    /// Objects without a parent, in arena order.
    pub fn root_objects(&self) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, object)| object.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Builds a name from `base` that no live object uses yet. Trailing
    /// digits of `base` are replaced by the smallest free counter.
    pub fn generate_unique_name(&self, base: &str) -> String {
        let stem = base.trim_end_matches(|c: char| c.is_ascii_digit());
        let stem = if stem.is_empty() { "Object" } else { stem };
        (1..)
            .map(|counter: u32| format!("{stem}{counter}"))
            .find(|name| !self.names.contains_key(name))
            .unwrap_or_else(|| stem.to_string())
    }

    /// Renames an object. Fails if another live object already owns `name`.
    pub fn set_name(&mut self, id: ObjectId, name: &str) -> bool {
        let Some(object) = self.objects.get(id) else {
            return false;
        };
        if object.name == name {
            return false;
        }
        if self.names.get(name).is_some_and(|&owner| owner != id) {
            log::debug!("Can't rename \"{}\" to \"{}\": name in use", object.name, name);
            return false;
        }

        let entry = UndoEntry::Rename {
            object: object.guid,
            before: object.name.clone(),
            after: name.to_string(),
        };
        self.record_undo(entry);

        let Some(object) = self.objects.get_mut(id) else {
            return false;
        };
        let previous = std::mem::replace(&mut object.name, name.to_string());
        if self.names.get(&previous) == Some(&id) {
            self.names.remove(&previous);
        }
        if !name.is_empty() {
            self.names.insert(name.to_string(), id);
        }

        if !previous.is_empty() {
            self.notify_listeners(id, ObjectEvent::Rename);
        }
        true
    }

    /// Deletes an object.
    ///
    /// Children survive: they are detached keeping their world transform.
    /// Look-at links in both directions are cleared. Undo recording is
    /// suspended for the whole operation.
    pub fn delete_object(&mut self, id: ObjectId) -> bool {
        if !self.contains(id) {
            return false;
        }

        self.suspend_undo();
        self.notify_listeners(id, ObjectEvent::PreDelete);

        if self.contains(id) {
            self.detach_this(id, true);
            self.detach_all(id, true);
            self.set_look_at(id, None);
            if let Some(source) = self.objects.get(id).and_then(|o| o.look_at_source) {
                self.set_look_at(source, None);
            }

            if let Some(object) = self.objects.get_mut(id) {
                object.flags.insert(ObjectFlags::DELETED);
            }
            self.notify_listeners(id, ObjectEvent::Delete);

            if let Some(mut object) = self.objects.remove(id) {
                object.listeners.clear();
                self.guids.remove(&object.guid);
                if self.names.get(&object.name) == Some(&id) {
                    self.names.remove(&object.name);
                }
                log::debug!("Deleted \"{}\" ({})", object.name, object.guid);
            }
        }

        self.resume_undo();
        true
    }

    /// Clones an object and its subtree. The clone gets a new guid, a unique
    /// name and is attached to the source's parent.
    pub fn clone_object(&mut self, id: ObjectId) -> Option<ObjectId> {
        let parent = self.objects.get(id)?.parent;
        let clone = self.clone_subtree(id)?;
        if let Some(parent) = parent {
            self.attach_child(parent, clone, false);
        }
        Some(clone)
    }

    fn clone_subtree(&mut self, id: ObjectId) -> Option<ObjectId> {
        let source = self.objects.get(id)?;
        let kind = source.kind;
        let name = source.name.clone();
        let (pos, rotate, scale) = (source.pos(), source.rotation(), source.scale());
        let color = source.color;
        let flags = source.flags.persistent();
        let hide_order = source.hide_order;
        let children: SmallVec<[ObjectId; 8]> = source.children.iter().copied().collect();

        let clone = self.create_object(kind, &name);
        if let Some(object) = self.objects.get_mut(clone) {
            object.pos = pos;
            object.rotate = rotate;
            object.scale = scale;
            object.color = color;
            object.flags = flags;
            object.hide_order = hide_order;
        }

        for child in children {
            if let Some(child_clone) = self.clone_subtree(child) {
                self.attach_child(clone, child_clone, false);
            }
        }
        Some(clone)
    }

    pub fn clear_modified(&mut self, id: ObjectId) {
        if let Some(object) = self.objects.get_mut(id) {
            object.modified = false;
        }
    }

    /// Installs the undo sink. Mutators record entries into it whenever it
    /// reports that it is recording.
    pub fn set_undo_recorder(&mut self, recorder: Option<Box<dyn UndoRecorder>>) {
        self.undo_recorder = recorder;
    }

    /// Stops undo recording until the matching [`SceneGraph::resume_undo`].
    /// Calls nest.
    pub fn suspend_undo(&mut self) {
        self.undo_suspended += 1;
    }

    pub fn resume_undo(&mut self) {
        self.undo_suspended = self.undo_suspended.saturating_sub(1);
    }

    pub fn is_undo_recording(&self) -> bool {
        self.undo_suspended == 0
            && self
                .undo_recorder
                .as_ref()
                .is_some_and(|recorder| recorder.is_recording())
    }

    pub(crate) fn record_undo(&mut self, entry: UndoEntry) {
        if !self.is_undo_recording() {
            return;
        }
        if let Some(recorder) = self.undo_recorder.as_mut() {
            recorder.record(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_create_generates_unique_names() {
        let mut graph = SceneGraph::new();
        let a = graph.create_object(ObjectKind::Empty, "");
        let b = graph.create_object(ObjectKind::Empty, "");
        let c = graph.create_object(ObjectKind::Group, "Crate7");

        assert_eq!(graph.object(a).unwrap().name(), "Empty1");
        assert_eq!(graph.object(b).unwrap().name(), "Empty2");
        assert_eq!(graph.object(c).unwrap().name(), "Crate1");
        assert_eq!(graph.find_object_by_name("Empty2"), Some(b));
    }

    #[test]
    fn test_insert_rejects_duplicate_guid() {
        let mut graph = SceneGraph::new();
        let guid = ObjectGuid::from_u128(99);
        let id = graph.insert_object(guid, ObjectKind::Empty, "First").unwrap();
        assert_eq!(graph.find_object(guid), Some(id));

        let error = graph
            .insert_object(guid, ObjectKind::Empty, "Second")
            .unwrap_err();
        assert_eq!(
            error,
            SceneError::DuplicateGuid {
                guid,
                name: "Second".to_string()
            }
        );

        let error = graph
            .insert_object(ObjectGuid::new(), ObjectKind::Empty, "First")
            .unwrap_err();
        assert!(matches!(error, SceneError::NameTaken { .. }));
    }

    #[test]
    fn test_set_name_keeps_names_unique() {
        let mut graph = SceneGraph::new();
        let a = graph.create_object(ObjectKind::Empty, "A");
        let b = graph.create_object(ObjectKind::Empty, "B");

        assert!(!graph.set_name(b, "A1"));
        assert!(graph.set_name(b, "Lamp"));
        assert!(!graph.set_name(b, "Lamp"));
        assert_eq!(graph.find_object_by_name("Lamp"), Some(b));
        assert_eq!(graph.find_object_by_name("B1"), None);
        assert_eq!(graph.find_object_by_name("A1"), Some(a));
    }

    #[test]
    fn test_delete_keeps_children_in_place() {
        let mut graph = SceneGraph::new();
        let parent = graph.create_object(ObjectKind::Group, "");
        let child = graph.create_object(ObjectKind::Empty, "");
        graph.set_pos(parent, Vec3::new(5.0, 0.0, 0.0), UpdateFlags::empty());
        graph.attach_child(parent, child, false);
        assert_eq!(graph.world_pos(child), Vec3::new(5.0, 0.0, 0.0));

        let guid = graph.guid(parent).unwrap();
        assert!(graph.delete_object(parent));
        assert!(!graph.contains(parent));
        assert_eq!(graph.find_object(guid), None);

        let object = graph.object(child).unwrap();
        assert_eq!(object.parent(), None);
        assert!(graph.world_pos(child).abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), 1e-5));
        assert!(!graph.delete_object(parent));
    }

    #[test]
    fn test_delete_clears_look_at_links() {
        let mut graph = SceneGraph::new();
        let camera = graph.create_object(ObjectKind::Empty, "Camera");
        let target = graph.create_object(ObjectKind::Empty, "Target");
        graph.set_look_at(camera, Some(target));

        graph.delete_object(target);
        assert_eq!(graph.object(camera).unwrap().look_at(), None);
    }

    #[test]
    fn test_creating_and_cloning_notify_nobody() {
        use std::cell::RefCell;
        use std::rc::Rc;

        #[derive(Default)]
        struct Recorder {
            events: RefCell<Vec<ObjectEvent>>,
        }

        impl ObjectListener for Recorder {
            fn on_object_event(&self, _: &mut SceneGraph, _: ObjectId, event: ObjectEvent) {
                self.events.borrow_mut().push(event);
            }
        }

        let mut graph = SceneGraph::new();
        let source = graph.create_object(ObjectKind::Sphere { radius: 1.0 }, "Ball");
        let recorder = Rc::new(Recorder::default());
        graph.add_event_listener(source, &recorder);

        graph.create_object(ObjectKind::Empty, "");
        let clone = graph.clone_object(source).unwrap();
        assert!(recorder.events.borrow().is_empty());
        assert_eq!(graph.listener_count(clone), 0);
    }

    #[test]
    fn test_clone_copies_subtree() {
        let mut graph = SceneGraph::new();
        let root = graph.create_object(ObjectKind::Group, "Root");
        let group = graph.create_object(ObjectKind::Group, "Rack");
        let leaf = graph.create_object(ObjectKind::Sphere { radius: 1.0 }, "Ball");
        graph.attach_child(root, group, false);
        graph.attach_child(group, leaf, false);
        graph.set_pos(leaf, Vec3::new(0.0, 0.0, 2.0), UpdateFlags::empty());

        let clone = graph.clone_object(group).unwrap();
        let cloned = graph.object(clone).unwrap();
        assert_ne!(cloned.guid(), graph.guid(group).unwrap());
        assert_eq!(cloned.name(), "Rack2");
        assert_eq!(cloned.parent(), Some(root));
        assert_eq!(cloned.children().len(), 1);

        let leaf_clone = cloned.children()[0];
        assert_eq!(
            graph.object(leaf_clone).unwrap().pos(),
            Vec3::new(0.0, 0.0, 2.0)
        );
        assert_eq!(graph.object(root).unwrap().children().len(), 2);
    }

    #[test]
    fn test_root_objects() {
        let mut graph = SceneGraph::new();
        let a = graph.create_object(ObjectKind::Empty, "");
        let b = graph.create_object(ObjectKind::Empty, "");
        graph.attach_child(a, b, false);
        assert_eq!(graph.root_objects(), vec![a]);
    }
}
