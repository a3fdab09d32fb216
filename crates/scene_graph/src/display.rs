use crate::{ObjectId, SceneGraph};
use glam::Vec3;
use scene_core::{Aabb, Color};

/// Drawing surface handed to [`SceneGraph::display`].
pub trait DisplayContext {
    fn draw_wire_box(&mut self, bounds: &Aabb, color: Color);
    fn draw_line(&mut self, from: Vec3, to: Vec3, color: Color);
    fn draw_label(&mut self, at: Vec3, text: &str, color: Color);
}

impl SceneGraph {
    /// Draws an object's box, its links and its label. Hidden objects are
    /// skipped. Only caches are touched.
    pub fn display(&self, id: ObjectId, dc: &mut dyn DisplayContext) {
        let Some(object) = self.objects.get(id) else {
            return;
        };
        if object.is_hidden() || !object.is_visible() {
            return;
        }

        let color = if object.is_selected() {
            Color::SELECTED
        } else if object.is_highlighted() {
            Color::HIGHLIGHT
        } else {
            object.color
        };
        dc.draw_wire_box(&self.bound_box(id), color);

        let pos = self.world_pos(id);
        if let Some(parent) = object.parent {
            dc.draw_line(pos, self.world_pos(parent), Color::LINK_PARENT);
        }
        if let Some(target) = object.look_at {
            dc.draw_line(pos, self.world_pos(target), Color::LINK_CHILD);
        }
        dc.draw_label(pos, &object.name, color);
    }
}
