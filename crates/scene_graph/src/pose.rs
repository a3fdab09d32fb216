//! Pose mutators, the lazy world matrix cache and its invalidation.
//!
//! Setters return whether anything changed so callers can skip redundant
//! undo records. Invalid input is logged and ignored.

use crate::undo::{MinimalState, UndoEntry};
use crate::{ObjectEvent, ObjectId, SceneGraph};
use glam::{Affine3A, Quat, Vec3};
use node::{ObjectFlags, UpdateFlags};
use scene_core::transform::{self, LocalPose, RotationWarningLevel, ScaleWarningLevel};
use smallvec::SmallVec;

impl SceneGraph {
    pub fn set_pos(&mut self, id: ObjectId, pos: Vec3, flags: UpdateFlags) -> bool {
        let Some(object) = self.objects.get(id) else {
            return false;
        };
        if !transform::is_valid_position(pos, self.settings.max_position) {
            log::warn!(
                "Object \"{}\" was given an invalid position {pos}, ignored",
                object.name
            );
            return false;
        }

        // The move tool is very sensitive to small changes
        let epsilon = if flags.contains(UpdateFlags::MOVE_TOOL) {
            0.0
        } else {
            self.settings.position_epsilon
        };
        if transform::vectors_equal(object.pos(), pos, epsilon) {
            return false;
        }

        let delegated = object
            .delegate()
            .is_some_and(|delegate| delegate.is_position_delegated());
        if !delegated {
            self.store_transform_undo(id, "Position", flags);
        }

        let Some(object) = self.objects.get_mut(id) else {
            return false;
        };
        let mut store = true;
        if let Some(delegate) = object.delegate() {
            if !flags.contains(UpdateFlags::ANIMATED) {
                delegate.set_delegate_pos(pos);
            }
            store = !delegate.is_position_delegated();
        }
        if store {
            object.pos = pos;
        }

        self.finish_pose_change(id, flags | UpdateFlags::POSITION_CHANGED);
        true
    }

    /// The rotation is renormalized. Quaternions far from unit length are
    /// refused, as are rotation changes requested by the scale tool.
    pub fn set_rotation(&mut self, id: ObjectId, rotation: Quat, flags: UpdateFlags) -> bool {
        let Some(object) = self.objects.get(id) else {
            return false;
        };
        if !transform::is_valid_rotation(rotation) {
            log::warn!(
                "Object \"{}\" was given an invalid rotation {rotation}, ignored",
                object.name
            );
            return false;
        }
        let rotation = rotation.normalize();
        if transform::quats_equal(object.rotation(), rotation) {
            return false;
        }
        // TODO: find out which scale tool paths still emit rotations and drop this guard
        if flags.contains(UpdateFlags::SCALE_TOOL) {
            return false;
        }

        let delegated = object
            .delegate()
            .is_some_and(|delegate| delegate.is_rotation_delegated());
        if !delegated {
            self.store_transform_undo(id, "Rotate", flags);
        }

        let Some(object) = self.objects.get_mut(id) else {
            return false;
        };
        let mut store = true;
        if let Some(delegate) = object.delegate() {
            if !flags.contains(UpdateFlags::ANIMATED) {
                delegate.set_delegate_rotation(rotation);
            }
            store = !delegate.is_rotation_delegated();
        }
        if store {
            object.rotate = rotation;
        }

        self.finish_pose_change(id, flags | UpdateFlags::ROTATION_CHANGED);
        true
    }

    pub fn set_scale(&mut self, id: ObjectId, scale: Vec3, flags: UpdateFlags) -> bool {
        let Some(object) = self.objects.get(id) else {
            return false;
        };
        if !self.is_valid_scale(scale) {
            log::warn!(
                "Object \"{}\" was given an invalid scale {scale}, ignored",
                object.name
            );
            return false;
        }
        if transform::vectors_equal(object.scale(), scale, self.settings.position_epsilon) {
            return false;
        }

        let delegated = object
            .delegate()
            .is_some_and(|delegate| delegate.is_scale_delegated());
        if !delegated {
            self.store_transform_undo(id, "Scale", flags);
        }

        let Some(object) = self.objects.get_mut(id) else {
            return false;
        };
        let mut store = true;
        if let Some(delegate) = object.delegate() {
            if !flags.contains(UpdateFlags::ANIMATED) {
                delegate.set_delegate_scale(scale);
            }
            store = !delegate.is_scale_delegated();
        }
        if store {
            object.scale = scale;
        }

        self.finish_pose_change(id, flags | UpdateFlags::SCALE_CHANGED);
        true
    }

    pub(crate) fn is_valid_scale(&self, scale: Vec3) -> bool {
        scale.is_finite()
            && scale.min_element() >= self.settings.min_scale
            && scale.max_element() <= self.settings.max_scale
    }

    fn finish_pose_change(&mut self, id: ObjectId, flags: UpdateFlags) {
        if let Some(object) = self.objects.get_mut(id) {
            object.modified = true;
        }
        if !flags.contains(UpdateFlags::DO_NOT_INVALIDATE) {
            self.invalidate_tm(id, flags);
        }
    }

    fn store_transform_undo(&mut self, id: ObjectId, description: &str, flags: UpdateFlags) {
        if flags.intersects(UpdateFlags::RESTORE_UNDO | UpdateFlags::ANIMATED)
            || !self.is_undo_recording()
        {
            return;
        }
        let Some(object) = self.objects.get(id) else {
            return;
        };
        if object.flags.contains(ObjectFlags::DONT_SAVE) && !flags.is_interactive() {
            return;
        }
        let entry = UndoEntry::Transform {
            object: object.guid,
            description: description.to_string(),
            before: MinimalState::capture(object),
            after: None,
        };
        self.record_undo(entry);
    }

    /// Sets position, rotation and scale together with a single invalidation.
    pub fn set_local_trs(
        &mut self,
        id: ObjectId,
        pos: Vec3,
        rotation: Quat,
        scale: Vec3,
        flags: UpdateFlags,
    ) -> bool {
        let deferred = flags | UpdateFlags::DO_NOT_INVALIDATE;
        let pos_changed = self.set_pos(id, pos, deferred);
        let rotation_changed = self.set_rotation(id, rotation, deferred);
        let scale_changed = self.set_scale(id, scale, deferred);
        let changed = pos_changed || rotation_changed || scale_changed;

        if (changed || flags == UpdateFlags::ANIMATED)
            && !flags.contains(UpdateFlags::DO_NOT_INVALIDATE)
        {
            let mut flags = flags - UpdateFlags::POSE_CHANGED;
            flags.set(UpdateFlags::POSITION_CHANGED, pos_changed);
            flags.set(UpdateFlags::ROTATION_CHANGED, rotation_changed);
            flags.set(UpdateFlags::SCALE_CHANGED, scale_changed);
            self.invalidate_tm(id, flags);
        }
        changed
    }

    /// Sets the local pose from a matrix.
    ///
    /// While a look-at target is set only the translation is applied, the
    /// rotation being derived from the target.
    pub fn set_local_tm(&mut self, id: ObjectId, tm: &Affine3A, flags: UpdateFlags) -> bool {
        let Some(object) = self.objects.get(id) else {
            return false;
        };
        if object.look_at.is_some() {
            let changed = self.set_pos(
                id,
                Vec3::from(tm.translation),
                flags | UpdateFlags::DO_NOT_INVALIDATE,
            );
            if (changed || flags == UpdateFlags::ANIMATED)
                && !flags.contains(UpdateFlags::DO_NOT_INVALIDATE)
            {
                self.invalidate_tm(id, flags | UpdateFlags::POSITION_CHANGED);
            }
            return changed;
        }

        let pose = LocalPose::from_affine(tm);
        self.set_local_trs(id, pose.position, pose.rotation, pose.scale, flags)
    }

    /// Moves an object so that its world matrix becomes `tm`.
    pub fn set_world_tm(&mut self, id: ObjectId, tm: &Affine3A, flags: UpdateFlags) -> bool {
        let Some(object) = self.objects.get(id) else {
            return false;
        };
        let local = match object.parent {
            Some(_) => self.parent_attach_world_tm(id).inverse() * *tm,
            None => *tm,
        };
        self.set_local_tm(id, &local, flags)
    }

    pub fn set_world_pos(&mut self, id: ObjectId, pos: Vec3, flags: UpdateFlags) -> bool {
        let Some(object) = self.objects.get(id) else {
            return false;
        };
        let local = match object.parent {
            Some(_) => self.parent_attach_world_tm(id).inverse().transform_point3(pos),
            None => pos,
        };
        self.set_pos(id, local, flags)
    }

    /// World matrix of the parent, or identity for a root object.
    pub fn parent_attach_world_tm(&self, id: ObjectId) -> Affine3A {
        match self.objects.get(id).and_then(|object| object.parent) {
            Some(parent) => self.world_tm(parent),
            None => Affine3A::IDENTITY,
        }
    }

    /// Returns the world matrix, recomputing it if the cache is stale.
    ///
    /// This is a read that may update the cached state of the object and of
    /// its ancestors and look-at target.
    pub fn world_tm(&self, id: ObjectId) -> Affine3A {
        let Some(object) = self.objects.get(id) else {
            return Affine3A::IDENTITY;
        };

        let mut cache = object.cache.get();
        if !cache.matrix_valid {
            cache.world_tm = self.local_tm(id);
            cache.matrix_valid = true;
            cache.in_world_space = false;
        }
        if !cache.in_world_space {
            if let Some(parent) = object.parent {
                cache.world_tm = self.world_tm(parent) * cache.world_tm;
            }
            cache.in_world_space = true;
            cache.bounds_valid = false;
        }
        object.cache.set(cache);
        cache.world_tm
    }

    pub fn world_pos(&self, id: ObjectId) -> Vec3 {
        Vec3::from(self.world_tm(id).translation)
    }

    /// World rotation as XYZ euler angles in degrees.
    pub fn world_angles(&self, id: ObjectId) -> Vec3 {
        transform::euler_degrees(&self.world_tm(id))
    }

    /// Computes the matrix relative to the parent.
    ///
    /// With a look-at target the translation is taken from the position and
    /// the rotation aims +Y at the target; scale is ignored.
    pub fn local_tm(&self, id: ObjectId) -> Affine3A {
        let Some(object) = self.objects.get(id) else {
            return Affine3A::IDENTITY;
        };

        match object.look_at.filter(|target| self.objects.contains_key(*target)) {
            Some(target) => {
                let mut pos = object.pos();
                if object.parent.is_some() {
                    pos = self.parent_attach_world_tm(id).transform_point3(pos);
                }
                let target_pos = self.world_pos(target);
                let mut tm = transform::look_at_matrix(pos, target_pos);
                if let Some(parent) = object.parent {
                    tm = self.world_tm(parent).inverse() * tm;
                }
                tm
            }
            None => Affine3A::from_scale_rotation_translation(
                object.scale(),
                object.rotation(),
                object.pos(),
            ),
        }
    }

    /// Marks the world matrix of an object stale.
    ///
    /// Only an actual valid-to-invalid transition cascades: to the object
    /// looking at this one, to children with a valid cache, to listeners and
    /// to the parent. The delegate hook runs every time.
    pub fn invalidate_tm(&mut self, id: ObjectId, flags: UpdateFlags) {
        let Some(object) = self.objects.get(id) else {
            return;
        };

        if object.clear_cache() {
            log::trace!("Invalidating \"{}\" ({:?})", object.name, flags);
            let look_at_source = object.look_at_source;
            let children: SmallVec<[ObjectId; 8]> = object.children.iter().copied().collect();

            if let Some(source) = look_at_source {
                self.invalidate_tm(source, UpdateFlags::PARENT_CHANGED);
            }
            for child in children {
                let child_valid = self
                    .objects
                    .get(child)
                    .is_some_and(|c| c.parent == Some(id) && c.is_matrix_valid());
                if child_valid {
                    self.invalidate_tm(child, UpdateFlags::PARENT_CHANGED);
                }
            }

            self.notify_listeners(id, ObjectEvent::TransformChanged);

            if let Some(parent) = self.objects.get(id).and_then(|object| object.parent) {
                self.on_child_modified(parent);
            }
        }

        if let Some(delegate) = self.objects.get(id).and_then(|object| object.delegate()) {
            delegate.matrix_invalidated();
        }
    }

    /// Aims an object at `target`, or stops aiming with `None`.
    ///
    /// A target can only be aimed at by one object; the previous source loses
    /// its target. Targets that depend on this object are refused.
    pub fn set_look_at(&mut self, id: ObjectId, target: Option<ObjectId>) -> bool {
        let Some(object) = self.objects.get(id) else {
            return false;
        };
        if object.look_at == target {
            return false;
        }
        if let Some(target) = target {
            if !self.contains(target) {
                return false;
            }
            if self.depends_on(target, id) {
                log::debug!("\"{}\" can't look at an object depending on it", object.name);
                return false;
            }
        }

        let previous = object.look_at;
        let entry = UndoEntry::LookAt {
            object: object.guid,
            before: previous.and_then(|p| self.guid(p)),
            after: target.and_then(|t| self.guid(t)),
        };
        self.record_undo(entry);

        if let Some(previous) = previous.and_then(|p| self.objects.get_mut(p)) {
            if previous.look_at_source == Some(id) {
                previous.look_at_source = None;
            }
        }

        let mut displaced = None;
        if let Some(new_target) = target.and_then(|t| self.objects.get_mut(t)) {
            displaced = new_target.look_at_source.filter(|source| *source != id);
            new_target.look_at_source = Some(id);
        }
        if let Some(source) = displaced.and_then(|s| self.objects.get_mut(s)) {
            source.look_at = None;
        }
        if let Some(object) = self.objects.get_mut(id) {
            object.look_at = target;
        }

        if let Some(source) = displaced {
            self.invalidate_tm(source, UpdateFlags::empty());
        }
        self.invalidate_tm(id, UpdateFlags::empty());
        true
    }

    pub fn scale_warning_level(&self, id: ObjectId) -> ScaleWarningLevel {
        self.objects
            .get(id)
            .map_or(ScaleWarningLevel::None, |object| {
                transform::scale_warning_level(object.scale())
            })
    }

    pub fn rotation_warning_level(&self, id: ObjectId) -> RotationWarningLevel {
        self.objects
            .get(id)
            .map_or(RotationWarningLevel::None, |object| {
                transform::rotation_warning_level(object.rotation())
            })
    }
}
