//! Axis-aligned bounding box and ray implementation using glam
//!
//! Boxes are stored as a pair of corners. Two special states matter to the
//! scene code:
//!
//! - **reset**: min lies above max on some axis. This is the neutral element
//!   for [`Aabb::union`] and means "no bounds at all".
//! - **empty**: min equals max. A point box with no volume.
//!
//! World-space boxes are produced by [`Aabb::transformed`], which keeps the
//! result axis-aligned by growing it around the rotated extents.

use glam::{Affine3A, Vec3};

/// An axis-aligned bounding box represented by minimum and maximum points
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    /// The minimum corner
    pub min: Vec3,
    /// The maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Creates a new box from minimum and maximum points
    ///
    /// Note: This doesn't validate that min is actually less than max.
    /// Use `from_corners` if you need automatic ordering.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates a box from two corner points, automatically ordering them
    pub fn from_corners(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates a box from center point and half-extents
    pub fn from_center_half_size(center: Vec3, half_size: Vec3) -> Self {
        Self {
            min: center - half_size,
            max: center + half_size,
        }
    }

    /// Creates a zero-sized box at the origin
    pub fn zero() -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        }
    }

    /// Creates a zero-sized box around a single point
    pub fn point(point: Vec3) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Creates a reset box that contains nothing
    pub fn reset() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    /// Checks whether the box holds no bounds at all
    pub fn is_reset(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Checks whether the box has collapsed to a single point
    pub fn is_empty(&self) -> bool {
        self.min == self.max
    }

    /// Returns the center point of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the size of the box
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns the half-size of the box
    pub fn half_size(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Grows the box to include a point
    pub fn add_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Computes the union of two boxes
    ///
    /// A reset box acts as the identity: `Aabb::reset().union(&b) == b`.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Tests if this box touches or overlaps another
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Tests if a point is contained within the box
    ///
    /// Points on the boundary are considered contained
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Tests if another box is entirely contained within this one
    pub fn contains_bounds(&self, other: &Self) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    /// Expands the box by a given amount in all directions
    pub fn expand(&self, amount: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(amount),
            max: self.max + Vec3::splat(amount),
        }
    }

    /// Returns the eight corner points of the box
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Transforms the box by an affine matrix and returns the axis-aligned
    /// box enclosing the result
    pub fn transformed(&self, tm: &Affine3A) -> Self {
        if self.is_reset() {
            return *self;
        }

        let center = tm.transform_point3(self.center());
        let half = self.half_size();
        let x = Vec3::from(tm.matrix3.x_axis).abs();
        let y = Vec3::from(tm.matrix3.y_axis).abs();
        let z = Vec3::from(tm.matrix3.z_axis).abs();
        let extent = x * half.x + y * half.y + z * half.z;

        Self::from_center_half_size(center, extent)
    }

    /// Computes the distance from a point to the box
    ///
    /// Returns 0 if the point is inside the box
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        (point - point.clamp(self.min, self.max)).length()
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::zero()
    }
}

/// A half-line with a normalized direction
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Creates a ray, normalizing the direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Returns the point at distance `t` along the ray
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Slab test against a box. Returns the entry distance, or 0 when the
    /// origin is already inside.
    pub fn intersect_aabb(&self, bounds: &Aabb) -> Option<f32> {
        if bounds.is_reset() {
            return None;
        }

        let inv = self.direction.recip();
        let t1 = (bounds.min - self.origin) * inv;
        let t2 = (bounds.max - self.origin) * inv;
        let t_enter = t1.min(t2).max_element();
        let t_exit = t1.max(t2).min_element();

        if t_exit < 0.0 || t_enter > t_exit {
            None
        } else {
            Some(t_enter.max(0.0))
        }
    }

    /// Returns the entry distance into a sphere, or 0 when the origin is inside
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }

        let root = discriminant.sqrt();
        let t_exit = -b + root;
        if t_exit < 0.0 {
            return None;
        }
        Some((-b - root).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn test_reset_and_empty() {
        let reset = Aabb::reset();
        assert!(reset.is_reset());
        assert!(!reset.is_empty());

        let zero = Aabb::zero();
        assert!(!zero.is_reset());
        assert!(zero.is_empty());
    }

    #[test]
    fn test_union_with_reset_is_identity() {
        let b = Aabb::new(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(1.0, 3.0, 4.0));
        assert_eq!(Aabb::reset().union(&b), b);
        assert_eq!(b.union(&Aabb::reset()), b);
    }

    #[test]
    fn test_intersects_and_contains() {
        let a = Aabb::new(Vec3::ZERO, Vec3::splat(2.0));
        let b = Aabb::new(Vec3::splat(1.0), Vec3::splat(3.0));
        let c = Aabb::new(Vec3::splat(5.0), Vec3::splat(6.0));

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.contains_point(Vec3::splat(2.0)));
        assert!(!a.contains_point(Vec3::new(2.1, 1.0, 1.0)));
        assert!(a.contains_bounds(&Aabb::new(Vec3::splat(0.5), Vec3::splat(1.5))));
    }

    #[test]
    fn test_transformed_translation_and_rotation() {
        let unit = Aabb::from_center_half_size(Vec3::ZERO, Vec3::new(1.0, 2.0, 0.5));

        let moved = unit.transformed(&Affine3A::from_translation(Vec3::new(10.0, 0.0, 0.0)));
        assert_eq!(moved.center(), Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(moved.half_size(), Vec3::new(1.0, 2.0, 0.5));

        // A quarter turn around Z swaps the X and Y extents
        let turned = unit.transformed(&Affine3A::from_quat(Quat::from_rotation_z(
            std::f32::consts::FRAC_PI_2,
        )));
        assert!(turned.half_size().abs_diff_eq(Vec3::new(2.0, 1.0, 0.5), 1e-5));
    }

    #[test]
    fn test_transformed_keeps_reset() {
        let tm = Affine3A::from_translation(Vec3::ONE);
        assert!(Aabb::reset().transformed(&tm).is_reset());
    }

    #[test]
    fn test_ray_hits_box() {
        let bounds = Aabb::from_center_half_size(Vec3::new(0.0, 10.0, 0.0), Vec3::ONE);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0));

        let t = ray.intersect_aabb(&bounds).unwrap();
        assert!((t - 9.0).abs() < 1e-5);

        let away = Ray::new(Vec3::ZERO, Vec3::new(0.0, -1.0, 0.0));
        assert!(away.intersect_aabb(&bounds).is_none());
    }

    #[test]
    fn test_ray_inside_box_reports_zero() {
        let bounds = Aabb::from_center_half_size(Vec3::ZERO, Vec3::ONE);
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(ray.intersect_aabb(&bounds), Some(0.0));
    }

    #[test]
    fn test_ray_hits_sphere() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        let t = ray.intersect_sphere(Vec3::ZERO, 1.0).unwrap();
        assert!((t - 4.0).abs() < 1e-5);
        assert!(ray.intersect_sphere(Vec3::new(3.0, 0.0, 0.0), 1.0).is_none());
    }

    #[test]
    fn test_distance_to_point() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::splat(10.0));
        assert_eq!(bounds.distance_to_point(Vec3::splat(5.0)), 0.0);
        assert_eq!(bounds.distance_to_point(Vec3::new(5.0, 5.0, 13.0)), 3.0);
    }
}
