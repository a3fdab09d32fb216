use crate::undo::{MinimalState, UndoEntry};
use crate::{ObjectEvent, ObjectId, SceneGraph};
use node::ObjectFlags;
use scene_core::Color;

impl SceneGraph {
    /// Hides or shows an object. `hide_order` is remembered when hiding so
    /// callers can unhide in reverse order.
    pub fn set_hidden(&mut self, id: ObjectId, hidden: bool, hide_order: u64) -> bool {
        let Some(object) = self.objects.get(id) else {
            return false;
        };
        if object.is_hidden() == hidden {
            return false;
        }

        let entry = UndoEntry::Hidden {
            object: object.guid,
            before: !hidden,
            after: hidden,
        };
        self.record_undo(entry);

        let Some(object) = self.objects.get_mut(id) else {
            return false;
        };
        object.flags.set(ObjectFlags::HIDDEN, hidden);
        if hidden {
            object.hide_order = hide_order;
        }
        object.modified = true;

        self.update_visibility(id, !hidden);
        true
    }

    /// Freezing an object also drops it from the selection.
    pub fn set_frozen(&mut self, id: ObjectId, frozen: bool) -> bool {
        let Some(object) = self.objects.get(id) else {
            return false;
        };
        if object.is_frozen() == frozen {
            return false;
        }

        let entry = UndoEntry::Frozen {
            object: object.guid,
            before: !frozen,
            after: frozen,
        };
        self.record_undo(entry);

        if frozen {
            self.set_selected(id, false);
        }
        let Some(object) = self.objects.get_mut(id) else {
            return false;
        };
        object.flags.set(ObjectFlags::FROZEN, frozen);
        object.modified = true;
        true
    }

    /// Effective visibility, as computed by whoever owns layers and
    /// hide state. Only an actual change is announced.
    pub fn update_visibility(&mut self, id: ObjectId, visible: bool) {
        let Some(object) = self.objects.get_mut(id) else {
            return;
        };
        if object.is_visible() == visible {
            return;
        }
        object.flags.set(ObjectFlags::INVISIBLE, !visible);
        self.notify_listeners(id, ObjectEvent::VisibilityChanged);
    }

    pub fn set_selected(&mut self, id: ObjectId, selected: bool) -> bool {
        let Some(object) = self.objects.get_mut(id) else {
            return false;
        };
        if object.is_selected() == selected {
            return false;
        }
        object.flags.set(ObjectFlags::SELECTED, selected);
        let event = if selected {
            ObjectEvent::Select
        } else {
            ObjectEvent::Unselect
        };
        self.notify_listeners(id, event);
        true
    }

    /// Raw flag access for loaders. Hidden, frozen and selected state should
    /// go through their own setters.
    pub fn set_flags(&mut self, id: ObjectId, flags: ObjectFlags) {
        if let Some(object) = self.objects.get_mut(id) {
            object.flags.insert(flags);
        }
    }

    pub fn clear_flags(&mut self, id: ObjectId, flags: ObjectFlags) {
        if let Some(object) = self.objects.get_mut(id) {
            object.flags.remove(flags);
        }
    }

    pub fn set_highlight(&mut self, id: ObjectId, highlight: bool) {
        if let Some(object) = self.objects.get_mut(id) {
            object.flags.set(ObjectFlags::HIGHLIGHT, highlight);
        }
    }

    /// Sets the color without recording undo.
    pub fn set_color(&mut self, id: ObjectId, color: Color) {
        if let Some(object) = self.objects.get_mut(id) {
            object.color = color;
        }
    }

    /// Sets the color as a user edit, recording undo.
    pub fn change_color(&mut self, id: ObjectId, color: Color) -> bool {
        let Some(object) = self.objects.get(id) else {
            return false;
        };
        if object.color == color {
            return false;
        }

        let entry = UndoEntry::Transform {
            object: object.guid,
            description: "Color".to_string(),
            before: MinimalState::capture(object),
            after: None,
        };
        self.record_undo(entry);

        if let Some(object) = self.objects.get_mut(id) {
            object.color = color;
            object.modified = true;
        }
        true
    }
}
