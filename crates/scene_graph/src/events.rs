//! Per-object listener fan-out.
//!
//! Listeners are held weakly in insertion order. Removing one only clears its
//! slot; slots are compacted once the outermost dispatch on that object has
//! finished, so a listener may add, remove or delete things from inside its
//! own callback without disturbing the iteration that called it.

use crate::{ObjectId, SceneGraph};
use std::rc::{Rc, Weak};
use strum::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ObjectEvent {
    Delete,
    Select,
    Unselect,
    TransformChanged,
    VisibilityChanged,
    Rename,
    ChildAttached,
    ChildDetached,
    PreDelete,
    PreAttached,
    PreAttachedKeepTransform,
    Attached,
    PreDetached,
    PreDetachedKeepTransform,
    Detached,
}

/// Receives events for the objects it has been registered on.
///
/// The graph is handed back mutably, so a listener may freely call into it,
/// including detaching or deleting the object it is being notified about.
pub trait ObjectListener {
    fn on_object_event(&self, graph: &mut SceneGraph, object: ObjectId, event: ObjectEvent);
}

type ListenerSlot = Option<Weak<dyn ObjectListener>>;

#[derive(Default)]
pub(crate) struct ListenerSet {
    slots: Vec<ListenerSlot>,
    dispatch_depth: u32,
}

impl ListenerSet {
    fn position(&self, listener: &Weak<dyn ObjectListener>) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|existing| Weak::ptr_eq(existing, listener))
        })
    }

    pub(crate) fn add(&mut self, listener: Weak<dyn ObjectListener>) -> bool {
        if self.position(&listener).is_some() {
            return false;
        }
        self.slots.push(Some(listener));
        true
    }

    pub(crate) fn remove(&mut self, listener: &Weak<dyn ObjectListener>) -> bool {
        match self.position(listener) {
            Some(index) => {
                self.slots[index] = None;
                true
            }
            None => false,
        }
    }

    /// Number of listeners that are neither removed nor dropped.
    pub(crate) fn live_count(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub(crate) fn clear(&mut self) {
        if self.dispatch_depth == 0 {
            self.slots.clear();
        } else {
            self.slots.iter_mut().for_each(|slot| *slot = None);
        }
    }

    fn compact(&mut self) {
        self.slots
            .retain(|slot| slot.as_ref().is_some_and(|weak| weak.strong_count() > 0));
    }

    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

impl SceneGraph {
    /// Registers a listener on an object. Adding the same listener twice is
    /// a no-op and returns false.
    pub fn add_event_listener<L: ObjectListener + 'static>(
        &mut self,
        id: ObjectId,
        listener: &Rc<L>,
    ) -> bool {
        let weak: Weak<dyn ObjectListener> = Rc::downgrade(listener) as Weak<dyn ObjectListener>;
        self.objects
            .get_mut(id)
            .is_some_and(|object| object.listeners.add(weak))
    }

    /// Unregisters a listener. Safe to call from inside a notification.
    pub fn remove_event_listener<L: ObjectListener + 'static>(
        &mut self,
        id: ObjectId,
        listener: &Rc<L>,
    ) -> bool {
        let weak: Weak<dyn ObjectListener> = Rc::downgrade(listener) as Weak<dyn ObjectListener>;
        self.objects
            .get_mut(id)
            .is_some_and(|object| object.listeners.remove(&weak))
    }

    pub fn listener_count(&self, id: ObjectId) -> usize {
        self.objects
            .get(id)
            .map_or(0, |object| object.listeners.live_count())
    }

    /// Dispatches `event` to the object's listeners in insertion order.
    ///
    /// Listeners registered during the dispatch are not called until the
    /// next one. If a listener deletes the object, dispatch stops.
    pub fn notify_listeners(&mut self, id: ObjectId, event: ObjectEvent) {
        let len = match self.objects.get_mut(id) {
            Some(object) => {
                object.listeners.dispatch_depth += 1;
                object.listeners.slots.len()
            }
            None => return,
        };

        for index in 0..len {
            let slot = match self.objects.get(id) {
                Some(object) => object.listeners.slots.get(index).cloned().flatten(),
                None => return,
            };
            if let Some(listener) = slot.and_then(|weak| weak.upgrade()) {
                listener.on_object_event(self, id, event);
            }
        }

        if let Some(object) = self.objects.get_mut(id) {
            object.listeners.dispatch_depth -= 1;
            if object.listeners.dispatch_depth == 0 {
                object.listeners.compact();
            }
        }
    }
}
