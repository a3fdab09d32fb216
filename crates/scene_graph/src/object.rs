use crate::delegate::TransformDelegate;
use crate::events::ListenerSet;
use crate::ObjectId;
use glam::{Affine3A, Quat, Vec3};
use node::{ObjectFlags, ObjectGuid, ObjectKind};
use scene_core::{Aabb, Color};
use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Lazily computed world-space state of an object.
///
/// `in_world_space` is only meaningful while `matrix_valid` is set.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TransformCache {
    pub world_tm: Affine3A,
    pub matrix_valid: bool,
    pub in_world_space: bool,
    pub world_bounds: Aabb,
    pub bounds_valid: bool,
}

impl Default for TransformCache {
    fn default() -> Self {
        Self {
            world_tm: Affine3A::IDENTITY,
            matrix_valid: false,
            in_world_space: false,
            world_bounds: Aabb::reset(),
            bounds_valid: false,
        }
    }
}

/// A node of the scene graph.
///
/// Everything here is readable; all mutation goes through [`crate::SceneGraph`]
/// so that invalidation, notification and undo stay consistent.
pub struct SceneObject {
    pub(crate) guid: ObjectGuid,
    pub(crate) name: String,
    pub(crate) kind: ObjectKind,
    pub(crate) flags: ObjectFlags,
    pub(crate) color: Color,
    pub(crate) hide_order: u64,

    pub(crate) pos: Vec3,
    pub(crate) rotate: Quat,
    pub(crate) scale: Vec3,
    pub(crate) cache: Cell<TransformCache>,

    pub(crate) parent: Option<ObjectId>,
    pub(crate) children: Vec<ObjectId>,
    pub(crate) look_at: Option<ObjectId>,
    pub(crate) look_at_source: Option<ObjectId>,

    pub(crate) delegate: Option<Weak<dyn TransformDelegate>>,
    pub(crate) listeners: ListenerSet,
    pub(crate) modified: bool,
}

impl SceneObject {
    pub(crate) fn new(guid: ObjectGuid, kind: ObjectKind, name: String) -> Self {
        Self {
            guid,
            name,
            kind,
            flags: ObjectFlags::empty(),
            color: Color::WHITE,
            hide_order: 0,
            pos: Vec3::ZERO,
            rotate: Quat::IDENTITY,
            scale: Vec3::ONE,
            cache: Cell::new(TransformCache::default()),
            parent: None,
            children: Vec::new(),
            look_at: None,
            look_at_source: None,
            delegate: None,
            listeners: ListenerSet::default(),
            modified: false,
        }
    }

    pub fn guid(&self) -> ObjectGuid {
        self.guid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    pub fn type_tag(&self) -> u32 {
        self.kind.type_tag()
    }

    pub fn flags(&self) -> ObjectFlags {
        self.flags
    }

    pub fn check_flags(&self, flags: ObjectFlags) -> bool {
        self.flags.intersects(flags)
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn hide_order(&self) -> u64 {
        self.hide_order
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    pub fn look_at(&self) -> Option<ObjectId> {
        self.look_at
    }

    pub fn look_at_source(&self) -> Option<ObjectId> {
        self.look_at_source
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn is_hidden(&self) -> bool {
        self.flags.contains(ObjectFlags::HIDDEN)
    }

    pub fn is_frozen(&self) -> bool {
        self.flags.contains(ObjectFlags::FROZEN)
    }

    pub fn is_selected(&self) -> bool {
        self.flags.contains(ObjectFlags::SELECTED)
    }

    pub fn is_highlighted(&self) -> bool {
        self.flags.contains(ObjectFlags::HIGHLIGHT)
    }

    pub fn is_visible(&self) -> bool {
        !self.flags.contains(ObjectFlags::INVISIBLE)
    }

    /// Frozen or hidden objects can't be picked.
    pub fn is_selectable(&self) -> bool {
        !self.is_frozen() && !self.is_hidden() && self.is_visible()
    }

    pub(crate) fn delegate(&self) -> Option<Rc<dyn TransformDelegate>> {
        self.delegate.as_ref().and_then(|weak| weak.upgrade())
    }

    /// Position relative to the parent, as reported by the delegate if any.
    pub fn pos(&self) -> Vec3 {
        match self.delegate() {
            Some(delegate) => delegate.delegate_pos(self.pos),
            None => self.pos,
        }
    }

    pub fn rotation(&self) -> Quat {
        match self.delegate() {
            Some(delegate) => delegate.delegate_rotation(self.rotate),
            None => self.rotate,
        }
    }

    pub fn scale(&self) -> Vec3 {
        match self.delegate() {
            Some(delegate) => delegate.delegate_scale(self.scale),
            None => self.scale,
        }
    }

    /// The object's own position field, ignoring any delegate.
    pub fn stored_pos(&self) -> Vec3 {
        self.pos
    }

    pub fn stored_rotation(&self) -> Quat {
        self.rotate
    }

    pub fn stored_scale(&self) -> Vec3 {
        self.scale
    }

    /// Whether the cached world matrix can be used without recomputing.
    pub fn is_matrix_valid(&self) -> bool {
        self.cache.get().matrix_valid
    }

    pub(crate) fn clear_cache(&self) -> bool {
        let mut cache = self.cache.get();
        let was_valid = cache.matrix_valid;
        cache.matrix_valid = false;
        cache.in_world_space = false;
        cache.bounds_valid = false;
        self.cache.set(cache);
        was_valid
    }

    pub(crate) fn invalidate_bounds(&self) {
        let mut cache = self.cache.get();
        cache.bounds_valid = false;
        self.cache.set(cache);
    }
}

impl fmt::Debug for SceneObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneObject")
            .field("guid", &self.guid)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("flags", &self.flags)
            .field("pos", &self.pos)
            .field("rotate", &self.rotate)
            .field("scale", &self.scale)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("look_at", &self.look_at)
            .finish()
    }
}
