//! Parent/child attachment.
//!
//! `attach_child`, `detach_this` and `remove_child` are the only writers of
//! the parent pointer and child list pair. Listener callbacks run at the
//! protocol boundaries and may edit the graph; every step after a
//! notification re-resolves its handles and bails out quietly when an
//! object vanished.

use crate::undo::UndoEntry;
use crate::{ObjectEvent, ObjectId, SceneGraph};
use node::UpdateFlags;
use smallvec::SmallVec;
use std::collections::HashSet;

impl SceneGraph {
    /// Attaches `child` under `parent`, optionally preserving its world
    /// transform. A child already under another parent is moved.
    ///
    /// No-op when the child is already attached to `parent`, or when
    /// `parent`'s transform depends on the child (an ancestor, its look-at
    /// target or the parent itself).
    pub fn attach_child(
        &mut self,
        parent: ObjectId,
        child: ObjectId,
        keep_world_position: bool,
    ) -> bool {
        if !self.can_attach(parent, child) {
            return false;
        }

        let pre_event = if keep_world_position {
            ObjectEvent::PreAttachedKeepTransform
        } else {
            ObjectEvent::PreAttached
        };
        self.notify_listeners(child, pre_event);
        if !self.can_attach(parent, child) {
            return false;
        }

        let parent_delegate = self.suspend_delegate(parent);
        let child_delegate = self.suspend_delegate(child);

        let previous_parent = self.objects.get(child).and_then(|object| object.parent);
        let world = keep_world_position.then(|| self.world_tm(child));

        if !self.contains(parent) || !self.contains(child) {
            self.restore_delegate(child, child_delegate);
            self.restore_delegate(parent, parent_delegate);
            return false;
        }

        if let Some(old_parent) = previous_parent {
            self.unlink_child(old_parent, child);
        }
        if let Some(object) = self.objects.get_mut(parent) {
            object.children.push(child);
        }
        if let Some(object) = self.objects.get_mut(child) {
            object.parent = Some(parent);
        }
        self.on_child_modified(parent);

        if let Some(world) = world {
            self.suspend_undo();
            self.set_world_tm(child, &world, UpdateFlags::PARENT_CHANGED);
            self.resume_undo();
        }
        self.invalidate_tm(child, UpdateFlags::PARENT_CHANGED);

        self.restore_delegate(child, child_delegate);
        self.restore_delegate(parent, parent_delegate);

        log::debug!("Attached {child} to {parent} (keep world position: {keep_world_position})");

        if let Some(old_parent) = previous_parent {
            self.notify_listeners(old_parent, ObjectEvent::ChildDetached);
        }
        self.notify_listeners(child, ObjectEvent::Attached);
        self.notify_listeners(parent, ObjectEvent::ChildAttached);

        if let (Some(object), Some(parent_guid)) = (self.guid(child), self.guid(parent)) {
            let entry = UndoEntry::Attachment {
                object,
                parent: parent_guid,
                previous_parent: previous_parent.and_then(|p| self.guid(p)),
                keep_world_position,
                attach: true,
            };
            self.record_undo(entry);
        }
        true
    }

    /// Alias of [`SceneGraph::attach_child`] used by group-like callers.
    pub fn add_member(
        &mut self,
        parent: ObjectId,
        child: ObjectId,
        keep_world_position: bool,
    ) -> bool {
        self.attach_child(parent, child, keep_world_position)
    }

    fn can_attach(&self, parent: ObjectId, child: ObjectId) -> bool {
        let Some(object) = self.objects.get(child) else {
            return false;
        };
        if !self.contains(parent) || object.parent == Some(parent) {
            return false;
        }
        if self.depends_on(parent, child) {
            log::debug!("Can't attach \"{}\" to {parent}: it would form a cycle", object.name);
            return false;
        }
        true
    }

    /// Detaches an object from its parent, optionally preserving its world
    /// transform. No-op for root objects.
    pub fn detach_this(&mut self, id: ObjectId, keep_world_position: bool) -> bool {
        let Some(parent) = self.objects.get(id).and_then(|object| object.parent) else {
            return false;
        };

        if let (Some(object), Some(parent_guid)) = (self.guid(id), self.guid(parent)) {
            let entry = UndoEntry::Attachment {
                object,
                parent: parent_guid,
                previous_parent: None,
                keep_world_position,
                attach: false,
            };
            self.record_undo(entry);
        }

        let pre_event = if keep_world_position {
            ObjectEvent::PreDetachedKeepTransform
        } else {
            ObjectEvent::PreDetached
        };
        self.notify_listeners(id, pre_event);

        let delegate = self.suspend_delegate(id);
        let world = keep_world_position.then(|| self.world_tm(id));

        // A listener may already have moved or detached the object
        let Some(parent) = self.objects.get(id).and_then(|object| object.parent) else {
            self.restore_delegate(id, delegate);
            return false;
        };

        if let Some(object) = self.objects.get_mut(id) {
            object.parent = None;
        }
        self.unlink_child(parent, id);

        if let Some(world) = world {
            self.suspend_undo();
            self.set_world_tm(id, &world, UpdateFlags::PARENT_CHANGED);
            self.resume_undo();
        }
        self.invalidate_tm(id, UpdateFlags::PARENT_CHANGED);
        self.restore_delegate(id, delegate);

        log::debug!("Detached {id} from {parent} (keep world position: {keep_world_position})");

        self.notify_listeners(parent, ObjectEvent::ChildDetached);
        self.notify_listeners(id, ObjectEvent::Detached);
        true
    }

    /// Detaches every child, first to last.
    pub fn detach_all(&mut self, id: ObjectId, keep_world_position: bool) {
        while let Some(&first) = self.objects.get(id).and_then(|object| object.children.first()) {
            if !self.detach_this(first, keep_world_position) {
                // The child list and the child's parent disagree; drop the entry
                self.remove_child(id, first);
            }
        }
    }

    /// Removes `child` from the child list of `parent` and notifies the
    /// parent. The child's parent pointer is cleared as well if it still
    /// points at `parent`.
    pub fn remove_child(&mut self, parent: ObjectId, child: ObjectId) -> bool {
        if !self.unlink_child(parent, child) {
            return false;
        }
        let still_linked = self
            .objects
            .get(child)
            .is_some_and(|object| object.parent == Some(parent));
        if still_linked {
            if let Some(object) = self.objects.get_mut(child) {
                object.parent = None;
            }
            self.invalidate_tm(child, UpdateFlags::PARENT_CHANGED);
        }
        self.notify_listeners(parent, ObjectEvent::ChildDetached);
        true
    }

    /// Pure list removal, keeps the order of the remaining children.
    fn unlink_child(&mut self, parent: ObjectId, child: ObjectId) -> bool {
        let Some(object) = self.objects.get_mut(parent) else {
            return false;
        };
        let Some(index) = object.children.iter().position(|&c| c == child) else {
            return false;
        };
        object.children.remove(index);
        self.on_child_modified(parent);
        true
    }

    /// Applies a parent read from an archive: attach without keeping the
    /// world transform, or detach when there is none.
    pub fn resolve_parent(&mut self, id: ObjectId, parent: Option<ObjectId>) {
        let current = self.objects.get(id).and_then(|object| object.parent);
        if current == parent {
            return;
        }
        match parent {
            Some(parent) => {
                self.attach_child(parent, id, false);
            }
            None => {
                self.detach_this(id, false);
            }
        }
    }

    /// Whether computing the world matrix of `from` needs the one of `on`,
    /// through parents or look-at targets. An object depends on itself.
    pub fn depends_on(&self, from: ObjectId, on: ObjectId) -> bool {
        let mut stack: SmallVec<[ObjectId; 8]> = SmallVec::new();
        stack.push(from);
        let mut visited = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == on {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(object) = self.objects.get(current) {
                stack.extend(object.parent);
                stack.extend(object.look_at);
            }
        }
        false
    }

    pub fn is_child_of(&self, id: ObjectId, ancestor: ObjectId) -> bool {
        let mut current = self.objects.get(id).and_then(|object| object.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.objects.get(parent).and_then(|object| object.parent);
        }
        false
    }

    pub fn child_count(&self, id: ObjectId) -> usize {
        self.objects.get(id).map_or(0, |object| object.children.len())
    }

    pub fn child(&self, id: ObjectId, index: usize) -> Option<ObjectId> {
        self.objects
            .get(id)
            .and_then(|object| object.children.get(index).copied())
    }
}
