//! Transform delegates let an external owner (an animation track, a
//! component system) decide where an object's pose actually lives.

use crate::{ObjectId, SceneGraph};
use glam::{Quat, Vec3};
use std::rc::{Rc, Weak};

/// Overrides where position, rotation and scale of an object are stored.
///
/// Pose setters forward every new value to the delegate first. When the
/// matching `is_*_delegated` returns true the object leaves its own field
/// untouched and the getters ask the delegate instead, handing it the
/// object's stored value as `base`.
///
/// All methods take `&self`; implementors use interior mutability for any
/// state they keep.
pub trait TransformDelegate {
    fn delegate_pos(&self, base: Vec3) -> Vec3;
    fn delegate_rotation(&self, base: Quat) -> Quat;
    fn delegate_scale(&self, base: Vec3) -> Vec3;

    fn set_delegate_pos(&self, pos: Vec3);
    fn set_delegate_rotation(&self, rotation: Quat);
    fn set_delegate_scale(&self, scale: Vec3);

    fn is_position_delegated(&self) -> bool;
    fn is_rotation_delegated(&self) -> bool;
    fn is_scale_delegated(&self) -> bool;

    /// Called every time the object's world matrix cache is invalidated.
    fn matrix_invalidated(&self) {}
}

impl SceneGraph {
    /// Installs or removes the transform delegate of an object. The world
    /// matrix is invalidated since the getters may now report other values.
    pub fn set_transform_delegate(
        &mut self,
        id: ObjectId,
        delegate: Option<Weak<dyn TransformDelegate>>,
    ) {
        let Some(object) = self.objects.get_mut(id) else {
            return;
        };
        object.delegate = delegate;
        self.invalidate_tm(id, Default::default());
    }

    pub fn transform_delegate(&self, id: ObjectId) -> Option<Rc<dyn TransformDelegate>> {
        self.objects.get(id).and_then(|object| object.delegate())
    }

    /// Takes the delegate out so the stored pose can be read or written
    /// directly. Invalidates only when there was one.
    pub fn suspend_delegate(&mut self, id: ObjectId) -> Option<Weak<dyn TransformDelegate>> {
        let delegate = self.objects.get_mut(id)?.delegate.take()?;
        self.invalidate_tm(id, Default::default());
        Some(delegate)
    }

    pub fn restore_delegate(
        &mut self,
        id: ObjectId,
        delegate: Option<Weak<dyn TransformDelegate>>,
    ) {
        if delegate.is_none() {
            return;
        }
        if let Some(object) = self.objects.get_mut(id) {
            object.delegate = delegate;
            self.invalidate_tm(id, Default::default());
        }
    }
}
