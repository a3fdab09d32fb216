use crate::{ObjectId, SceneGraph};
use glam::Vec3;
use node::ObjectKind;
use scene_core::Aabb;
use smallvec::SmallVec;

impl SceneGraph {
    /// Bounds of an object in its own space.
    ///
    /// Groups report the union of their children's world boxes brought into
    /// group space, or a reset box when they have no children.
    pub fn local_bounds(&self, id: ObjectId) -> Aabb {
        let Some(object) = self.objects.get(id) else {
            return Aabb::reset();
        };
        match object.kind {
            ObjectKind::Empty => Aabb::zero(),
            ObjectKind::Box { half_extents } => {
                Aabb::from_center_half_size(Vec3::ZERO, half_extents)
            }
            ObjectKind::Sphere { radius } => {
                Aabb::from_center_half_size(Vec3::ZERO, Vec3::splat(radius))
            }
            ObjectKind::Group => {
                let children: SmallVec<[ObjectId; 8]> = object.children.iter().copied().collect();
                let to_local = self.world_tm(id).inverse();
                children.iter().fold(Aabb::reset(), |bounds, &child| {
                    bounds.union(&self.bound_box(child).transformed(&to_local))
                })
            }
        }
    }

    /// World-space bounding box, cached until the transform changes.
    ///
    /// Objects without volume get an uncached point box at their world
    /// position.
    pub fn bound_box(&self, id: ObjectId) -> Aabb {
        let Some(object) = self.objects.get(id) else {
            return Aabb::reset();
        };

        let world = self.world_tm(id);
        let cache = object.cache.get();
        if cache.bounds_valid {
            return cache.world_bounds;
        }

        let local = self.local_bounds(id);
        if local.is_reset() || local.is_empty() {
            return Aabb::point(Vec3::from(world.translation));
        }

        let bounds = local.transformed(&world);
        let mut cache = object.cache.get();
        cache.world_bounds = bounds;
        cache.bounds_valid = true;
        object.cache.set(cache);
        bounds
    }

    /// Called when a child moved, was attached or was detached. Groups drop
    /// their cached box and pass the news up.
    pub(crate) fn on_child_modified(&self, id: ObjectId) {
        let mut current = Some(id);
        while let Some(group) = current {
            let Some(object) = self.objects.get(group) else {
                break;
            };
            if !object.kind.is_group() {
                break;
            }
            object.invalidate_bounds();
            current = object.parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::SceneGraph;
    use glam::{Quat, Vec3};
    use node::{ObjectKind, UpdateFlags};
    use scene_core::Aabb;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_box_bounds_follow_world_transform() {
        let mut graph = SceneGraph::new();
        let id = graph.create_object(
            ObjectKind::Box {
                half_extents: Vec3::new(1.0, 2.0, 3.0),
            },
            "",
        );
        graph.set_pos(id, Vec3::new(10.0, 0.0, 0.0), UpdateFlags::empty());
        let bounds = graph.bound_box(id);
        assert_eq!(bounds.center(), Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(bounds.half_size(), Vec3::new(1.0, 2.0, 3.0));

        graph.set_rotation(id, Quat::from_rotation_z(FRAC_PI_2), UpdateFlags::empty());
        let turned = graph.bound_box(id);
        assert!(turned.half_size().abs_diff_eq(Vec3::new(2.0, 1.0, 3.0), 1e-5));
    }

    #[test]
    fn test_empty_object_gets_point_box() {
        let mut graph = SceneGraph::new();
        let id = graph.create_object(ObjectKind::Empty, "");
        graph.set_pos(id, Vec3::new(1.0, 2.0, 3.0), UpdateFlags::empty());
        assert_eq!(graph.bound_box(id), Aabb::point(Vec3::new(1.0, 2.0, 3.0)));
        assert!(!graph.object(id).unwrap().cache.get().bounds_valid);
    }

    #[test]
    fn test_group_bounds_track_children() {
        let mut graph = SceneGraph::new();
        let group = graph.create_object(ObjectKind::Group, "");
        let a = graph.create_object(ObjectKind::Sphere { radius: 1.0 }, "");
        let b = graph.create_object(ObjectKind::Sphere { radius: 1.0 }, "");
        graph.attach_child(group, a, false);
        graph.attach_child(group, b, false);
        graph.set_pos(b, Vec3::new(4.0, 0.0, 0.0), UpdateFlags::empty());

        let bounds = graph.bound_box(group);
        assert!(bounds.min.abs_diff_eq(Vec3::new(-1.0, -1.0, -1.0), 1e-5));
        assert!(bounds.max.abs_diff_eq(Vec3::new(5.0, 1.0, 1.0), 1e-5));

        graph.set_pos(b, Vec3::new(0.0, 6.0, 0.0), UpdateFlags::empty());
        let bounds = graph.bound_box(group);
        assert!(bounds.max.abs_diff_eq(Vec3::new(1.0, 7.0, 1.0), 1e-5));
    }

    #[test]
    fn test_empty_group_is_a_point() {
        let mut graph = SceneGraph::new();
        let group = graph.create_object(ObjectKind::Group, "");
        assert!(graph.local_bounds(group).is_reset());
        assert_eq!(graph.bound_box(group), Aabb::point(Vec3::ZERO));
    }
}
