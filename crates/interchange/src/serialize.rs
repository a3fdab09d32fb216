use crate::archive::ObjectArchive;
use crate::InterchangeError;
use glam::Vec3;
use node::{ObjectFlags, ObjectKind, UpdateFlags};
use scene_core::transform;
use scene_graph::{ErrorKind, ErrorRecord, ObjectId, SceneGraph};

/// Persistent flags applied as raw bits on load. Hidden and frozen go
/// through their setters so visibility and selection follow.
const RAW_PERSISTENT: ObjectFlags = ObjectFlags::PERSISTENT
    .difference(ObjectFlags::HIDDEN.union(ObjectFlags::FROZEN));

/// Writes the object type and the parameters of its kind.
pub fn write_kind(ar: &mut ObjectArchive, kind: &ObjectKind) {
    ar.set_string("type", kind.class_name());
    match *kind {
        ObjectKind::Box { half_extents } => ar.set_vec3("half-extents", half_extents),
        ObjectKind::Sphere { radius } => ar.set_float("radius", radius),
        ObjectKind::Empty | ObjectKind::Group => {}
    }
}

/// Reads the object type. Missing kind parameters keep their defaults.
pub fn read_kind(ar: &ObjectArchive) -> Result<ObjectKind, InterchangeError> {
    let type_name = ar
        .string("type")
        .ok_or_else(|| InterchangeError::MissingField("type".into()))?;
    let mut kind = ObjectKind::from_class_name(type_name)
        .ok_or_else(|| InterchangeError::InvalidValue(format!("Unknown object type: {}", type_name)))?;

    match &mut kind {
        ObjectKind::Box { half_extents } => {
            if let Some(value) = ar.vec3("half-extents") {
                *half_extents = value;
            }
        }
        ObjectKind::Sphere { radius } => {
            if let Some(value) = ar.float("radius") {
                *radius = value;
            }
        }
        ObjectKind::Empty | ObjectKind::Group => {}
    }
    Ok(kind)
}

/// Saves an object into the archive or loads it back, depending on the
/// archive direction. The transform delegate is taken out for the whole
/// call so stored values are read and written.
///
/// Loading queues parent and look-at resolution on the archive; nothing
/// is linked until [`ObjectArchive::resolve_objects`] runs.
pub fn serialize_object(graph: &mut SceneGraph, id: ObjectId, ar: &mut ObjectArchive) {
    if !graph.contains(id) {
        return;
    }
    let delegate = graph.suspend_delegate(id);
    if ar.is_loading() {
        load_object(graph, id, ar);
    } else {
        save_object(graph, id, ar);
    }
    graph.restore_delegate(id, delegate);
}

fn save_object(graph: &SceneGraph, id: ObjectId, ar: &mut ObjectArchive) {
    let Some(object) = graph.object(id) else {
        return;
    };

    write_kind(ar, object.kind());
    ar.set_guid("id", object.guid());
    ar.set_string("name", object.name());
    ar.set_int(
        "hide-order",
        i64::try_from(object.hide_order()).unwrap_or(i64::MAX),
    );

    if let Some(parent) = object.parent().and_then(|parent| graph.guid(parent)) {
        ar.set_guid("parent", parent);
    }
    if let Some(target) = object.look_at().and_then(|target| graph.guid(target)) {
        ar.set_guid("look-at", target);
    }

    if object.pos() != Vec3::ZERO {
        ar.set_vec3("pos", object.pos());
    }
    ar.set_quat("rotate", object.rotation());
    if object.scale() != Vec3::ONE {
        ar.set_vec3("scale", object.scale());
    }
    ar.set_color("color", object.color());

    let flags = object.flags().persistent();
    if !flags.is_empty() {
        ar.set_int("flags", flags.bits().into());
    }
}

fn load_object(graph: &mut SceneGraph, id: ObjectId, ar: &mut ObjectArchive) {
    let Some(object) = graph.object(id) else {
        return;
    };
    let guid = object.guid();
    let name = ar.string("name").unwrap_or(object.name()).to_string();
    let pos = ar.vec3("pos").unwrap_or(object.pos());
    let rotate = ar.quat("rotate").unwrap_or(object.rotation());
    let scale = ar.vec3("scale").unwrap_or(object.scale());
    let color = ar.color("color").unwrap_or(object.color());
    let hide_order = ar
        .int("hide-order")
        .and_then(|order| u64::try_from(order).ok())
        .unwrap_or(object.hide_order());
    let flags = ar
        .int("flags")
        .and_then(|bits| u32::try_from(bits).ok())
        .map(ObjectFlags::from_bits_truncate)
        .unwrap_or_default();
    let parent = ar.guid("parent");
    let look_at = ar.guid("look-at");

    graph.clear_flags(id, RAW_PERSISTENT | ObjectFlags::SHARED | ObjectFlags::DELETED);
    graph.set_flags(id, flags & RAW_PERSISTENT);

    if ar.is_undo() {
        graph.detach_this(id, false);
    }
    graph.set_name(id, &name);

    if !transform::is_valid_position(pos, graph.settings().max_position) {
        ar.report(
            ErrorRecord::warning(
                ErrorKind::InvalidPosition,
                format!("Object \"{}\" has an invalid position {}", name, pos),
            )
            .with_object(guid),
        );
    }

    if !transform::is_valid_rotation(rotate) {
        ar.report(
            ErrorRecord::warning(
                ErrorKind::InvalidRotation,
                format!("Object \"{}\" has an invalid rotation {}", name, rotate),
            )
            .with_object(guid),
        );
    }

    let update = if ar.is_undo() {
        UpdateFlags::UNDO
    } else {
        UpdateFlags::empty()
    };
    graph.set_local_trs(id, pos, rotate, scale, update);
    graph.set_color(id, color);
    graph.set_frozen(id, flags.contains(ObjectFlags::FROZEN));
    graph.set_hidden(id, flags.contains(ObjectFlags::HIDDEN), hide_order);

    ar.set_resolve_callback(parent, move |graph, parent| graph.resolve_parent(id, parent));
    ar.set_resolve_callback(look_at, move |graph, target| {
        graph.set_look_at(id, target);
    });

    graph.invalidate_tm(id, UpdateFlags::empty());
    graph.clear_modified(id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;
    use node::ObjectGuid;
    use scene_core::Color;
    use scene_graph::TransformDelegate;
    use std::cell::Cell;
    use std::rc::{Rc, Weak};

    fn crate_kind() -> ObjectKind {
        ObjectKind::Box {
            half_extents: Vec3::new(0.5, 1.0, 0.5),
        }
    }

    #[test]
    fn test_save_writes_only_meaningful_attributes() {
        let mut graph = SceneGraph::new();
        let id = graph.create_object(crate_kind(), "Crate");
        graph.set_selected(id, true);
        graph.set_frozen(id, true);

        let mut ar = ObjectArchive::saving();
        serialize_object(&mut graph, id, &mut ar);

        assert_eq!(ar.string("type"), Some("Box"));
        assert_eq!(ar.string("name"), Some("Crate1"));
        assert_eq!(ar.guid("id"), graph.guid(id));
        assert_eq!(ar.vec3("pos"), None);
        assert_eq!(ar.vec3("scale"), None);
        assert_eq!(ar.quat("rotate"), Some(Quat::IDENTITY));
        assert_eq!(ar.vec3("half-extents"), Some(Vec3::new(0.5, 1.0, 0.5)));
        assert_eq!(ar.int("flags"), Some(ObjectFlags::FROZEN.bits().into()));
        assert_eq!(ar.guid("parent"), None);
        assert_eq!(read_kind(&ar).unwrap(), crate_kind());
    }

    #[test]
    fn test_load_applies_pose_and_state() {
        let mut source = SceneGraph::new();
        let id = source.create_object(crate_kind(), "Crate");
        source.set_local_trs(
            id,
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_x(0.3),
            Vec3::splat(2.0),
            UpdateFlags::empty(),
        );
        source.set_color(id, Color::rgb(10, 20, 30));
        source.set_hidden(id, true, 4);
        let mut ar = ObjectArchive::saving();
        serialize_object(&mut source, id, &mut ar);

        let mut target = SceneGraph::new();
        let loaded = target
            .insert_object(ObjectGuid::new(), read_kind(&ar).unwrap(), "")
            .unwrap();
        target.set_selected(loaded, true);
        let mut ar = ObjectArchive::loading(ar.into_node());
        serialize_object(&mut target, loaded, &mut ar);

        let object = target.object(loaded).unwrap();
        assert_eq!(object.name(), "Crate1");
        assert_eq!(object.pos(), Vec3::new(1.0, 2.0, 3.0));
        assert!(object.rotation().abs_diff_eq(Quat::from_rotation_x(0.3), 1e-6));
        assert_eq!(object.scale(), Vec3::splat(2.0));
        assert_eq!(object.color(), Color::rgb(10, 20, 30));
        assert!(object.is_hidden());
        assert_eq!(object.hide_order(), 4);
        assert!(object.is_selected());
        assert!(!object.is_modified());
        assert_eq!(ar.pending_resolves(), 2);
    }

    #[test]
    fn test_load_resolves_parent_after_the_fact() {
        let mut graph = SceneGraph::new();
        let parent = graph.create_object(ObjectKind::Group, "Rack");
        let child = graph.create_object(crate_kind(), "Crate");
        graph.attach_child(parent, child, false);
        let mut ar = ObjectArchive::saving();
        serialize_object(&mut graph, child, &mut ar);

        graph.detach_this(child, false);
        let mut ar = ObjectArchive::loading(ar.into_node());
        serialize_object(&mut graph, child, &mut ar);
        assert_eq!(graph.object(child).unwrap().parent(), None);

        ar.resolve_objects(&mut graph);
        assert_eq!(graph.object(child).unwrap().parent(), Some(parent));
        assert!(ar.errors().is_empty());
    }

    #[test]
    fn test_load_reports_invalid_position() {
        let mut graph = SceneGraph::new();
        let id = graph.create_object(ObjectKind::Empty, "");
        let mut ar = ObjectArchive::saving();
        serialize_object(&mut graph, id, &mut ar);
        ar.set_vec3("pos", Vec3::new(1.0e9, 0.0, 0.0));

        let mut ar = ObjectArchive::loading(ar.into_node());
        serialize_object(&mut graph, id, &mut ar);
        assert_eq!(ar.errors().count(ErrorKind::InvalidPosition), 1);
        assert_eq!(graph.object(id).unwrap().pos(), Vec3::ZERO);
    }

    #[test]
    fn test_load_reports_invalid_rotation() {
        let mut graph = SceneGraph::new();
        let id = graph.create_object(ObjectKind::Empty, "");
        let mut ar = ObjectArchive::saving();
        serialize_object(&mut graph, id, &mut ar);
        ar.set_quat("rotate", Quat::from_xyzw(2.0, 0.0, 0.0, 0.0));

        let mut ar = ObjectArchive::loading(ar.into_node());
        serialize_object(&mut graph, id, &mut ar);
        assert_eq!(ar.errors().count(ErrorKind::InvalidRotation), 1);
        assert_eq!(graph.object(id).unwrap().rotation(), Quat::IDENTITY);
    }

    #[derive(Default)]
    struct Offset {
        invalidations: Cell<usize>,
    }

    impl TransformDelegate for Offset {
        fn delegate_pos(&self, base: Vec3) -> Vec3 {
            base + Vec3::splat(100.0)
        }
        fn delegate_rotation(&self, base: Quat) -> Quat {
            base
        }
        fn delegate_scale(&self, base: Vec3) -> Vec3 {
            base
        }
        fn set_delegate_pos(&self, _pos: Vec3) {}
        fn set_delegate_rotation(&self, _rotation: Quat) {}
        fn set_delegate_scale(&self, _scale: Vec3) {}
        fn is_position_delegated(&self) -> bool {
            false
        }
        fn is_rotation_delegated(&self) -> bool {
            false
        }
        fn is_scale_delegated(&self) -> bool {
            false
        }
        fn matrix_invalidated(&self) {
            self.invalidations.set(self.invalidations.get() + 1);
        }
    }

    #[test]
    fn test_delegate_is_bypassed_and_restored() {
        let mut graph = SceneGraph::new();
        let id = graph.create_object(ObjectKind::Empty, "");
        graph.set_pos(id, Vec3::X, UpdateFlags::empty());
        let offset = Rc::new(Offset::default());
        let weak: Weak<dyn TransformDelegate> = Rc::downgrade(&offset) as Weak<dyn TransformDelegate>;
        graph.set_transform_delegate(id, Some(weak));
        assert_eq!(graph.object(id).unwrap().pos(), Vec3::new(101.0, 100.0, 100.0));

        let mut ar = ObjectArchive::saving();
        serialize_object(&mut graph, id, &mut ar);
        assert_eq!(ar.vec3("pos"), Some(Vec3::X));
        assert!(graph.transform_delegate(id).is_some());
    }
}
