//! Undo hooks.
//!
//! The graph only produces [`UndoEntry`] values and hands them to whatever
//! [`UndoRecorder`] is installed. Entries name objects by guid and replay
//! through the public mutators, so they survive objects being detached,
//! re-attached or reloaded in between.

use crate::object::SceneObject;
use crate::{ObjectId, SceneGraph};
use glam::{Quat, Vec3};
use node::{ObjectGuid, UpdateFlags};
use scene_core::Color;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Sink for undo entries produced by mutators.
pub trait UndoRecorder {
    fn is_recording(&self) -> bool;
    fn record(&mut self, entry: UndoEntry);
}

/// The part of an object's state a transform change can touch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinimalState {
    pub pos: Vec3,
    pub rotate: Quat,
    pub scale: Vec3,
    pub color: Color,
}

impl MinimalState {
    pub fn capture(object: &SceneObject) -> Self {
        Self {
            pos: object.pos(),
            rotate: object.rotation(),
            scale: object.scale(),
            color: object.color(),
        }
    }

    fn apply(&self, graph: &mut SceneGraph, id: ObjectId) {
        graph.set_local_trs(id, self.pos, self.rotate, self.scale, UpdateFlags::REPLAY);
        graph.set_color(id, self.color);
    }
}

/// A single reversible change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UndoEntry {
    Transform {
        object: ObjectGuid,
        description: String,
        before: MinimalState,
        /// Filled in when the entry is undone
        #[serde(default, skip_serializing_if = "Option::is_none")]
        after: Option<MinimalState>,
    },
    /// An attach (`attach == true`) or a detach.
    Attachment {
        object: ObjectGuid,
        parent: ObjectGuid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        previous_parent: Option<ObjectGuid>,
        keep_world_position: bool,
        attach: bool,
    },
    LookAt {
        object: ObjectGuid,
        before: Option<ObjectGuid>,
        after: Option<ObjectGuid>,
    },
    Rename {
        object: ObjectGuid,
        before: String,
        after: String,
    },
    Hidden {
        object: ObjectGuid,
        before: bool,
        after: bool,
    },
    Frozen {
        object: ObjectGuid,
        before: bool,
        after: bool,
    },
}

impl UndoEntry {
    pub fn object(&self) -> ObjectGuid {
        match self {
            UndoEntry::Transform { object, .. }
            | UndoEntry::Attachment { object, .. }
            | UndoEntry::LookAt { object, .. }
            | UndoEntry::Rename { object, .. }
            | UndoEntry::Hidden { object, .. }
            | UndoEntry::Frozen { object, .. } => *object,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            UndoEntry::Transform { description, .. } => description,
            UndoEntry::Attachment { attach: true, .. } => "Attach",
            UndoEntry::Attachment { attach: false, .. } => "Detach",
            UndoEntry::LookAt { .. } => "Change LookAt",
            UndoEntry::Rename { .. } => "Rename",
            UndoEntry::Hidden { .. } => "Hide",
            UndoEntry::Frozen { .. } => "Freeze",
        }
    }

    /// Reverts the change. Returns false when the object is gone.
    pub fn undo(&mut self, graph: &mut SceneGraph) -> bool {
        let Some(id) = graph.find_object(self.object()) else {
            return false;
        };
        graph.suspend_undo();
        match self {
            UndoEntry::Transform { before, after, .. } => {
                *after = graph.object(id).map(MinimalState::capture);
                before.apply(graph, id);
            }
            UndoEntry::Attachment {
                parent,
                previous_parent,
                keep_world_position,
                attach,
                ..
            } => {
                if *attach {
                    match previous_parent.and_then(|guid| graph.find_object(guid)) {
                        Some(previous) => {
                            graph.attach_child(previous, id, *keep_world_position);
                        }
                        None => {
                            graph.detach_this(id, *keep_world_position);
                        }
                    }
                } else if let Some(parent) = graph.find_object(*parent) {
                    graph.attach_child(parent, id, *keep_world_position);
                }
            }
            UndoEntry::LookAt { before, .. } => {
                let target = before.and_then(|guid| graph.find_object(guid));
                graph.set_look_at(id, target);
            }
            UndoEntry::Rename { before, .. } => {
                graph.set_name(id, before);
            }
            UndoEntry::Hidden { before, .. } => {
                let order = graph.object(id).map_or(0, |object| object.hide_order());
                graph.set_hidden(id, *before, order);
            }
            UndoEntry::Frozen { before, .. } => {
                graph.set_frozen(id, *before);
            }
        }
        graph.resume_undo();
        true
    }

    /// Re-applies the change after an undo.
    pub fn redo(&self, graph: &mut SceneGraph) -> bool {
        let Some(id) = graph.find_object(self.object()) else {
            return false;
        };
        graph.suspend_undo();
        match self {
            UndoEntry::Transform { after, .. } => {
                if let Some(after) = after {
                    after.apply(graph, id);
                }
            }
            UndoEntry::Attachment {
                parent,
                keep_world_position,
                attach,
                ..
            } => {
                if *attach {
                    if let Some(parent) = graph.find_object(*parent) {
                        graph.attach_child(parent, id, *keep_world_position);
                    }
                } else {
                    graph.detach_this(id, *keep_world_position);
                }
            }
            UndoEntry::LookAt { after, .. } => {
                let target = after.and_then(|guid| graph.find_object(guid));
                graph.set_look_at(id, target);
            }
            UndoEntry::Rename { after, .. } => {
                graph.set_name(id, after);
            }
            UndoEntry::Hidden { after, .. } => {
                let order = graph.object(id).map_or(0, |object| object.hide_order());
                graph.set_hidden(id, *after, order);
            }
            UndoEntry::Frozen { after, .. } => {
                graph.set_frozen(id, *after);
            }
        }
        graph.resume_undo();
        true
    }
}

/// Entries recorded between one `begin`/`end` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoStep {
    pub description: String,
    pub entries: Vec<UndoEntry>,
}

#[derive(Default)]
struct UndoLog {
    undo: Vec<UndoStep>,
    redo: Vec<UndoStep>,
    pending: Option<UndoStep>,
    depth: u32,
}

/// A simple in-memory undo stack. Cloning yields another handle to the same
/// history, so one handle can be installed in the graph while the caller
/// keeps another to drive undo and redo.
#[derive(Clone, Default)]
pub struct UndoHistory {
    log: Rc<RefCell<UndoLog>>,
}

impl UndoHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts recording a step. Nested calls join the outer step.
    pub fn begin(&self, description: &str) {
        let mut log = self.log.borrow_mut();
        log.depth += 1;
        if log.pending.is_none() {
            log.pending = Some(UndoStep {
                description: description.to_string(),
                entries: Vec::new(),
            });
        }
    }

    /// Closes the current step. Returns true when a non-empty step was
    /// committed, which also clears the redo stack.
    pub fn end(&self) -> bool {
        let mut log = self.log.borrow_mut();
        if log.depth == 0 {
            return false;
        }
        log.depth -= 1;
        if log.depth > 0 {
            return false;
        }
        match log.pending.take() {
            Some(step) if !step.entries.is_empty() => {
                log.undo.push(step);
                log.redo.clear();
                true
            }
            _ => false,
        }
    }

    /// Drops the step being recorded without applying anything.
    pub fn cancel(&self) {
        let mut log = self.log.borrow_mut();
        log.pending = None;
        log.depth = 0;
    }

    pub fn undo(&self, graph: &mut SceneGraph) -> bool {
        let step = self.log.borrow_mut().undo.pop();
        let Some(mut step) = step else {
            return false;
        };
        log::debug!("Undo \"{}\"", step.description);
        for entry in step.entries.iter_mut().rev() {
            entry.undo(graph);
        }
        self.log.borrow_mut().redo.push(step);
        true
    }

    pub fn redo(&self, graph: &mut SceneGraph) -> bool {
        let step = self.log.borrow_mut().redo.pop();
        let Some(step) = step else {
            return false;
        };
        log::debug!("Redo \"{}\"", step.description);
        for entry in &step.entries {
            entry.redo(graph);
        }
        self.log.borrow_mut().undo.push(step);
        true
    }

    pub fn undo_len(&self) -> usize {
        self.log.borrow().undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.log.borrow().redo.len()
    }

    /// Entries recorded so far in the open step.
    pub fn pending_len(&self) -> usize {
        self.log
            .borrow()
            .pending
            .as_ref()
            .map_or(0, |step| step.entries.len())
    }

    pub fn last_step(&self) -> Option<UndoStep> {
        self.log.borrow().undo.last().cloned()
    }
}

impl UndoRecorder for UndoHistory {
    fn is_recording(&self) -> bool {
        self.log.borrow().pending.is_some()
    }

    fn record(&mut self, entry: UndoEntry) {
        if let Some(step) = self.log.borrow_mut().pending.as_mut() {
            step.entries.push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node::ObjectKind;

    fn setup() -> (SceneGraph, UndoHistory) {
        let mut graph = SceneGraph::new();
        let history = UndoHistory::new();
        graph.set_undo_recorder(Some(Box::new(history.clone())));
        (graph, history)
    }

    #[test]
    fn test_nothing_recorded_outside_a_step() {
        let (mut graph, history) = setup();
        let id = graph.create_object(ObjectKind::Empty, "");
        graph.set_pos(id, Vec3::X, UpdateFlags::empty());
        assert!(!history.end());
        assert_eq!(history.undo_len(), 0);
    }

    #[test]
    fn test_transform_undo_redo() {
        let (mut graph, history) = setup();
        let id = graph.create_object(ObjectKind::Empty, "");

        history.begin("Move");
        graph.set_local_trs(
            id,
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_z(0.5),
            Vec3::splat(2.0),
            UpdateFlags::USER_INPUT,
        );
        assert!(history.end());

        assert!(history.undo(&mut graph));
        let object = graph.object(id).unwrap();
        assert_eq!(object.pos(), Vec3::ZERO);
        assert_eq!(object.rotation(), Quat::IDENTITY);
        assert_eq!(object.scale(), Vec3::ONE);
        assert_eq!(graph.world_pos(id), Vec3::ZERO);

        assert!(history.redo(&mut graph));
        let object = graph.object(id).unwrap();
        assert_eq!(object.pos(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(object.scale(), Vec3::splat(2.0));
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.redo_len(), 0);
    }

    #[test]
    fn test_replay_does_not_record() {
        let (mut graph, history) = setup();
        let id = graph.create_object(ObjectKind::Empty, "");
        history.begin("Move");
        graph.set_pos(id, Vec3::X, UpdateFlags::empty());
        history.end();

        history.begin("Unrelated");
        history.undo(&mut graph);
        assert_eq!(history.pending_len(), 0);
        history.cancel();
    }

    #[test]
    fn test_new_step_clears_redo() {
        let (mut graph, history) = setup();
        let id = graph.create_object(ObjectKind::Empty, "");
        history.begin("First");
        graph.set_pos(id, Vec3::X, UpdateFlags::empty());
        history.end();
        history.undo(&mut graph);
        assert_eq!(history.redo_len(), 1);

        history.begin("Second");
        graph.set_pos(id, Vec3::Y, UpdateFlags::empty());
        history.end();
        assert_eq!(history.redo_len(), 0);
    }

    #[test]
    fn test_nested_begin_joins_outer_step() {
        let (mut graph, history) = setup();
        let id = graph.create_object(ObjectKind::Empty, "");
        history.begin("Outer");
        history.begin("Inner");
        graph.set_pos(id, Vec3::X, UpdateFlags::empty());
        assert!(!history.end());
        graph.set_scale(id, Vec3::splat(3.0), UpdateFlags::empty());
        assert!(history.end());

        let step = history.last_step().unwrap();
        assert_eq!(step.description, "Outer");
        assert_eq!(step.entries.len(), 2);
    }

    #[test]
    fn test_rename_and_look_at_undo() {
        let (mut graph, history) = setup();
        let camera = graph.create_object(ObjectKind::Empty, "Camera");
        let target = graph.create_object(ObjectKind::Empty, "Target");

        history.begin("Edit");
        graph.set_name(camera, "Eye");
        graph.set_look_at(camera, Some(target));
        history.end();

        history.undo(&mut graph);
        let object = graph.object(camera).unwrap();
        assert_eq!(object.name(), "Camera1");
        assert_eq!(object.look_at(), None);

        history.redo(&mut graph);
        let object = graph.object(camera).unwrap();
        assert_eq!(object.name(), "Eye");
        assert_eq!(object.look_at(), Some(target));
    }

    #[test]
    fn test_undo_of_deleted_object_is_skipped() {
        let (mut graph, history) = setup();
        let id = graph.create_object(ObjectKind::Empty, "");
        history.begin("Move");
        graph.set_pos(id, Vec3::X, UpdateFlags::empty());
        history.end();

        graph.delete_object(id);
        assert!(history.undo(&mut graph));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_entry_serde_shape() {
        let entry = UndoEntry::Attachment {
            object: ObjectGuid::from_u128(1),
            parent: ObjectGuid::from_u128(2),
            previous_parent: None,
            keep_world_position: true,
            attach: true,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "attachment");
        assert!(json.get("previous_parent").is_none());

        let back: UndoEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
